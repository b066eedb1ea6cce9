//! Rolling per-tick history used by the rewind mechanic

use std::collections::VecDeque;
use uuid::Uuid;

use super::grid::Point;
use super::player::Player;

/// Snapshots retained before the oldest is evicted
pub const HISTORY_CAPACITY: usize = 100;

/// One player's recorded state at capture time
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotPlayer {
    pub id: Uuid,
    pub body: Vec<Point>,
    pub color: String,
}

/// Immutable copy of room state at one tick
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub players: Vec<SnapshotPlayer>,
    pub food: Point,
    pub timestamp: u64,
}

impl Snapshot {
    /// Capture owned copies of every player body
    pub fn capture<'a>(players: impl IntoIterator<Item = &'a Player>, food: Point, timestamp: u64) -> Self {
        Self {
            players: players
                .into_iter()
                .map(|p| SnapshotPlayer {
                    id: p.id,
                    body: p.body.iter().copied().collect(),
                    color: p.color.clone(),
                })
                .collect(),
            food,
            timestamp,
        }
    }

    pub fn player(&self, id: &Uuid) -> Option<&SnapshotPlayer> {
        self.players.iter().find(|p| &p.id == id)
    }
}

/// Fixed-capacity FIFO of snapshots; index 0 is the oldest
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    entries: VecDeque<Snapshot>,
    capacity: usize,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Append, evicting the oldest entry on overflow
    pub fn push(&mut self, snapshot: Snapshot) {
        self.entries.push_back(snapshot);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Snapshot> {
        self.entries.get(index)
    }

    /// Entries from `start` to the newest
    pub fn range_from(&self, start: usize) -> impl Iterator<Item = &Snapshot> {
        self.entries.iter().skip(start)
    }

    /// Keep only entries up to and including `index`
    pub fn truncate_after(&mut self, index: usize) {
        self.entries.truncate(index + 1);
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new(HISTORY_CAPACITY)
    }
}
