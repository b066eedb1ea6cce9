//! Background profile writer fed by the rooms

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::game::{ProgressRecord, RoomRegistry};

use super::profiles::{ProgressStore, StoredProfile};

/// Drains progress records off the rooms' hot path. Saves run one after another so
/// two records for the same profile never interleave their read and write.
#[derive(Clone)]
pub struct ProgressWriter {
    store: Arc<dyn ProgressStore>,
    rooms: Arc<RoomRegistry>,
}

impl ProgressWriter {
    pub fn new(store: Arc<dyn ProgressStore>, rooms: Arc<RoomRegistry>) -> Self {
        Self { store, rooms }
    }

    pub async fn run(self, mut records: mpsc::UnboundedReceiver<ProgressRecord>) {
        info!("Progress writer started");
        while let Some(record) = records.recv().await {
            self.save(record).await;
        }
        info!("Progress writer stopped");
    }

    /// Save one record and refresh the cached profile of a still-connected player.
    /// Failures are logged and otherwise ignored.
    pub async fn save(&self, record: ProgressRecord) -> Option<StoredProfile> {
        let Some(profile_id) = record.profile_id else {
            debug!(player = %record.name, "No profile to save");
            return None;
        };

        match self.store.save_progress(profile_id, &record).await {
            Ok(saved) => {
                info!(
                    player = %record.name,
                    xp_gained = record.score,
                    level = saved.level,
                    "Saved progress"
                );
                self.rooms.get(record.mode).with_room(|room| {
                    if let Some(player) = room.player_mut(&record.conn_id) {
                        if player.profile.profile_id == Some(profile_id) {
                            player.profile.xp = saved.xp;
                            player.profile.level = saved.level;
                            player.profile.achievements = saved.achievements.clone();
                        }
                    }
                });
                Some(saved)
            }
            Err(e) => {
                error!(player = %record.name, error = %e, "Failed to save player progress");
                None
            }
        }
    }
}
