//! Persistence collaborator for cross-session player progress

pub mod memory;
pub mod profiles;
pub mod supabase;
pub mod writer;

pub use memory::MemoryProgressStore;
pub use profiles::ProgressStore;
pub use supabase::{SupabaseClient, SupabaseProgressStore};
pub use writer::ProgressWriter;

/// Profile store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    Parse(reqwest::Error),

    #[error("No row returned from insert")]
    NoRowReturned,

    #[error("Profile not found")]
    NotFound,
}
