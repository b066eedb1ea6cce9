//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::ghost::Ghost;
use crate::game::grid::Point;
use crate::game::player::Player;

/// Room partition; the two rooms differ only in whether rewind is allowed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    Standard,
    Rewind,
}

impl GameMode {
    /// Anything other than exactly `"rewind"` lands in the standard room
    pub fn from_requested(mode: Option<&str>) -> Self {
        match mode {
            Some("rewind") => Self::Rewind,
            _ => Self::Standard,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Rewind => "rewind",
        }
    }

    pub fn allows_rewind(&self) -> bool {
        matches!(self, Self::Rewind)
    }
}

impl std::fmt::Display for GameMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Enter a room; everything is optional and defaulted server-side
    Join {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        color: Option<String>,
        #[serde(default)]
        mode: Option<String>,
    },

    /// Change direction
    Move { direction: Point },

    /// Trigger a time rewind (rewind room only)
    Rewind,

    /// Ping for latency measurement
    Ping {
        /// Client timestamp, echoed back
        timestamp: u64,
    },
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Full room state, once per tick
    State(RoomState),

    /// A player reached a streak of exactly five
    ChristmasMiracle {
        #[serde(rename = "playerId")]
        player_id: Uuid,
    },

    /// Someone rewound time in this room
    RewindEffect,

    /// Pong response, sent only to the pinging connection
    Pong { timestamp: u64 },
}

/// Room state broadcast after every tick
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomState {
    pub players: Vec<PlayerView>,
    pub ghosts: Vec<GhostView>,
    pub food: Point,
    pub session_high_score: u32,
    pub session_best_player: String,
}

/// Player as seen by clients (no profile store identifiers)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub id: Uuid,
    pub name: String,
    pub mode: GameMode,
    pub color: String,
    pub body: Vec<Point>,
    pub velocity: Point,
    pub score: u32,
    pub streak: u32,
    pub last_move_time: u64,
    pub has_moved: bool,
    pub xp: u64,
    pub level: u32,
    pub best_score: u32,
    pub achievements: Vec<String>,
}

impl From<&Player> for PlayerView {
    fn from(p: &Player) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            mode: p.mode,
            color: p.color.clone(),
            body: p.body.iter().copied().collect(),
            velocity: p.velocity,
            score: p.score,
            streak: p.streak,
            last_move_time: p.last_move_time,
            has_moved: p.has_moved,
            xp: p.profile.xp,
            level: p.profile.level,
            best_score: p.profile.best_score,
            achievements: p.profile.achievements.clone(),
        }
    }
}

/// Ghost as seen by clients; the remaining path stays server-side
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GhostView {
    pub body: Vec<Point>,
    pub color: String,
    pub created_at: u64,
}

impl From<&Ghost> for GhostView {
    fn from(g: &Ghost) -> Self {
        Self {
            body: g.body.clone(),
            color: g.color.clone(),
            created_at: g.created_at,
        }
    }
}
