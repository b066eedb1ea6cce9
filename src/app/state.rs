//! Application state shared across routes

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::Config;
use crate::game::{ProgressRecord, RoomRegistry};
use crate::store::{MemoryProgressStore, ProgressStore, ProgressWriter, SupabaseClient, SupabaseProgressStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub progress_store: Arc<dyn ProgressStore>,
    pub rooms: Arc<RoomRegistry>,
}

impl AppState {
    /// Build state plus the progress writer that must be spawned alongside it
    pub fn new(
        config: Config,
    ) -> (Self, ProgressWriter, mpsc::UnboundedReceiver<ProgressRecord>) {
        let config = Arc::new(config);

        let progress_store: Arc<dyn ProgressStore> = match config.supabase() {
            Some((url, key)) => {
                info!("Using Supabase profile store");
                Arc::new(SupabaseProgressStore::new(SupabaseClient::new(url, key)))
            }
            None => {
                warn!("SUPABASE_URL/SUPABASE_SERVICE_ROLE_KEY not set, profiles kept in memory");
                Arc::new(MemoryProgressStore::new())
            }
        };

        // Rooms push finished sessions here without waiting on the store
        let (progress_tx, progress_rx) = mpsc::unbounded_channel();
        let rooms = Arc::new(RoomRegistry::new(progress_tx));

        let writer = ProgressWriter::new(progress_store.clone(), rooms.clone());

        (
            Self {
                config,
                progress_store,
                rooms,
            },
            writer,
            progress_rx,
        )
    }
}
