//! Fixed mode -> room mapping and the per-room tick driver

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

use crate::util::time::{tick_duration, unix_millis, Timer, TICK_DURATION_MILLIS};
use crate::ws::protocol::{GameMode, ServerMsg};

use super::room::{ProgressSink, Room};

/// Messages buffered per subscriber before it starts lagging
const ROOM_CHANNEL_CAPACITY: usize = 64;

/// Handle to one room: its state behind a lock plus its broadcast channel
#[derive(Clone)]
pub struct RoomHandle {
    pub mode: GameMode,
    room: Arc<Mutex<Room>>,
    events_tx: broadcast::Sender<ServerMsg>,
}

impl RoomHandle {
    pub fn new(room: Room) -> Self {
        let (events_tx, _) = broadcast::channel(ROOM_CHANNEL_CAPACITY);
        Self {
            mode: room.mode,
            room: Arc::new(Mutex::new(room)),
            events_tx,
        }
    }

    /// Run `f` with exclusive access to the room. Never hold this across an await.
    pub fn with_room<R>(&self, f: impl FnOnce(&mut Room) -> R) -> R {
        let mut room = self.room.lock();
        f(&mut room)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerMsg> {
        self.events_tx.subscribe()
    }

    /// Publish to every subscriber; nobody listening is fine
    pub fn publish(&self, msg: ServerMsg) {
        let _ = self.events_tx.send(msg);
    }

    /// One tick under the lock, then publish outside it
    pub fn tick(&self, now: u64) {
        let out = self.with_room(|room| room.tick(now));
        for msg in out {
            self.publish(msg);
        }
    }
}

/// The two rooms this deployment runs
pub struct RoomRegistry {
    standard: RoomHandle,
    rewind: RoomHandle,
}

impl RoomRegistry {
    pub fn new(progress_tx: ProgressSink) -> Self {
        Self {
            standard: RoomHandle::new(Room::new(GameMode::Standard, progress_tx.clone())),
            rewind: RoomHandle::new(Room::new(GameMode::Rewind, progress_tx)),
        }
    }

    pub fn get(&self, mode: GameMode) -> &RoomHandle {
        match mode {
            GameMode::Standard => &self.standard,
            GameMode::Rewind => &self.rewind,
        }
    }

    pub fn all(&self) -> [&RoomHandle; 2] {
        [&self.standard, &self.rewind]
    }

    pub fn total_players(&self) -> usize {
        self.all()
            .iter()
            .map(|h| h.with_room(|room| room.players.len()))
            .sum()
    }
}

/// Tick a room forever at the fixed simulation rate
pub async fn run_room(handle: RoomHandle) {
    info!(mode = %handle.mode, tick_ms = TICK_DURATION_MILLIS, "Room tick driver started");

    let mut tick_interval = interval(tick_duration());
    tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tick_interval.tick().await;

        let timer = Timer::new();
        handle.tick(unix_millis());

        let elapsed = timer.elapsed_ms();
        if elapsed > TICK_DURATION_MILLIS {
            warn!(mode = %handle.mode, elapsed_ms = elapsed, "Tick overran its period");
        }
    }
}
