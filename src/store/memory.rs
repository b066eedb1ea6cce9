//! In-process profile store, used when no database is configured

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use uuid::Uuid;

use crate::game::ProgressRecord;

use super::profiles::{apply_progress, ProgressStore, StoredProfile};
use super::StoreError;

/// Profiles keyed by nickname; lost on restart
#[derive(Default)]
pub struct MemoryProgressStore {
    profiles: Mutex<HashMap<String, StoredProfile>>,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, nickname: &str) -> Option<StoredProfile> {
        self.profiles.lock().get(nickname).cloned()
    }
}

#[async_trait]
impl ProgressStore for MemoryProgressStore {
    async fn load_or_create(&self, nickname: &str) -> Result<StoredProfile, StoreError> {
        let mut profiles = self.profiles.lock();
        let profile = profiles
            .entry(nickname.to_string())
            .or_insert_with(|| StoredProfile::new(nickname));
        Ok(profile.clone())
    }

    async fn save_progress(&self, profile_id: Uuid, record: &ProgressRecord) -> Result<StoredProfile, StoreError> {
        let mut profiles = self.profiles.lock();
        let stored = profiles
            .values_mut()
            .find(|p| p.id == profile_id)
            .ok_or(StoreError::NotFound)?;

        apply_progress(stored, record).apply_to(stored);
        Ok(stored.clone())
    }
}
