//! Per-connection player entity

use std::collections::VecDeque;
use uuid::Uuid;

use crate::ws::protocol::GameMode;

use super::grid::Point;

/// Cross-session progress cached from the profile store between loads and saves
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerProfile {
    /// Store identity; `None` when the profile could not be loaded
    pub profile_id: Option<Uuid>,
    pub xp: u64,
    pub level: u32,
    pub best_score: u32,
    pub achievements: Vec<String>,
}

impl Default for PlayerProfile {
    fn default() -> Self {
        Self {
            profile_id: None,
            xp: 0,
            level: 1,
            best_score: 0,
            achievements: Vec::new(),
        }
    }
}

/// Player state in a room (authoritative)
#[derive(Debug, Clone)]
pub struct Player {
    /// Connection id, unique per room membership
    pub id: Uuid,
    pub name: String,
    pub mode: GameMode,
    pub color: String,

    /// Head at the front
    pub body: VecDeque<Point>,
    pub velocity: Point,
    pub last_move_time: u64,
    /// Set by the first direction command; until then the body is transparent to collisions
    pub has_moved: bool,

    pub score: u32,
    pub streak: u32,

    pub profile: PlayerProfile,
}

impl Player {
    pub fn new(id: Uuid, name: String, mode: GameMode, color: String) -> Self {
        Self {
            id,
            name,
            mode,
            color,
            body: VecDeque::from([Point::new(5, 5)]),
            velocity: Point::ZERO,
            last_move_time: 0,
            has_moved: false,
            score: 0,
            streak: 0,
            profile: PlayerProfile::default(),
        }
    }

    pub fn head(&self) -> Option<Point> {
        self.body.front().copied()
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    /// Owned copy of everything a save needs; never aliases the live player
    pub fn progress_record(&self) -> ProgressRecord {
        ProgressRecord {
            conn_id: self.id,
            mode: self.mode,
            profile_id: self.profile.profile_id,
            name: self.name.clone(),
            score: self.score,
            streak: self.streak,
            best_score: self.profile.best_score,
            achievements: self.profile.achievements.clone(),
        }
    }
}

/// Detached copy of a player's session result, handed to the profile store
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressRecord {
    pub conn_id: Uuid,
    pub mode: GameMode,
    pub profile_id: Option<Uuid>,
    pub name: String,
    pub score: u32,
    pub streak: u32,
    pub best_score: u32,
    pub achievements: Vec<String>,
}
