//! Player profile records and progress accounting

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::{PlayerProfile, ProgressRecord};

use super::StoreError;

/// XP needed per level
pub const XP_PER_LEVEL: u64 = 1000;

pub const ACHIEVEMENT_SCORE_100: &str = "Score 100";
pub const ACHIEVEMENT_STREAK_10: &str = "Streak 10";

/// Persisted cross-session profile, keyed by nickname
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredProfile {
    pub id: Uuid,
    pub nickname: String,
    pub xp: u64,
    pub level: u32,
    pub best_score: u32,
    #[serde(default)]
    pub achievements: Vec<String>,
}

impl StoredProfile {
    pub fn new(nickname: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            nickname: nickname.to_string(),
            xp: 0,
            level: 1,
            best_score: 0,
            achievements: Vec::new(),
        }
    }
}

impl From<StoredProfile> for PlayerProfile {
    fn from(stored: StoredProfile) -> Self {
        Self {
            profile_id: Some(stored.id),
            xp: stored.xp,
            level: stored.level,
            best_score: stored.best_score,
            achievements: stored.achievements,
        }
    }
}

/// New profile for insertion
#[derive(Debug, Clone, Serialize)]
pub struct NewProfile<'a> {
    pub nickname: &'a str,
}

/// Profile update written after a session ends
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressUpdate {
    pub xp: u64,
    pub level: u32,
    pub best_score: u32,
    pub achievements: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl ProgressUpdate {
    pub fn apply_to(&self, profile: &mut StoredProfile) {
        profile.xp = self.xp;
        profile.level = self.level;
        profile.best_score = self.best_score;
        profile.achievements = self.achievements.clone();
    }
}

/// Level for a cumulative XP total
pub fn level_for_xp(xp: u64) -> u32 {
    u32::try_from(xp / XP_PER_LEVEL).unwrap_or(u32::MAX - 1) + 1
}

/// Fold a finished session into a stored profile
pub fn apply_progress(stored: &StoredProfile, record: &ProgressRecord) -> ProgressUpdate {
    let xp = stored.xp + u64::from(record.score);

    let mut achievements = stored.achievements.clone();
    for tag in &record.achievements {
        if !achievements.contains(tag) {
            achievements.push(tag.clone());
        }
    }
    let earned = [
        (record.score >= 100, ACHIEVEMENT_SCORE_100),
        (record.streak >= 10, ACHIEVEMENT_STREAK_10),
    ];
    for (qualifies, tag) in earned {
        if qualifies && !achievements.iter().any(|a| a == tag) {
            achievements.push(tag.to_string());
        }
    }

    ProgressUpdate {
        xp,
        level: stored.level.max(level_for_xp(xp)),
        best_score: stored.best_score.max(record.best_score).max(record.score),
        achievements,
        updated_at: Some(chrono::Utc::now()),
    }
}

/// Persistence collaborator for cross-session progress
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Fetch the profile for a nickname, creating it on first sight
    async fn load_or_create(&self, nickname: &str) -> Result<StoredProfile, StoreError>;

    /// Add a finished session to the profile and return the stored result
    async fn save_progress(&self, profile_id: Uuid, record: &ProgressRecord) -> Result<StoredProfile, StoreError>;
}
