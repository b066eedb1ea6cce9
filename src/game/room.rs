//! Room state and the authoritative tick

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::ws::protocol::{GameMode, GhostView, PlayerView, RoomState, ServerMsg};

use super::ghost::Ghost;
use super::grid::{random_cell, Point, TILE_COUNT};
use super::history::{HistoryBuffer, Snapshot};
use super::player::{Player, ProgressRecord};

/// Minimum time between two steps of the same snake
pub const MOVE_INTERVAL_MS: u64 = 100;
/// Snapshots replayed by a rewind (~3 s at 20 Hz)
pub const REWIND_WINDOW: usize = 60;
/// Segments removed from the initiator
pub const REWIND_COST: usize = 2;
/// Body must be longer than this to rewind
pub const REWIND_MIN_LEN: usize = 5;
pub const FOOD_SCORE: u32 = 10;
pub const MIRACLE_STREAK: u32 = 5;

/// Random samples tried before falling back to a free-cell scan
const FOOD_SAMPLE_ATTEMPTS: usize = 64;

/// Fire-and-forget channel to the profile writer
pub type ProgressSink = mpsc::UnboundedSender<ProgressRecord>;

/// Result of a rewind command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewindOutcome {
    /// Wrong room, unknown player or body too short; nothing changed
    Rejected,
    /// Cost paid, not enough history to rewind
    Skipped,
    /// Cost paid, state restored and ghosts spawned
    Rewound { ghosts: usize },
}

impl RewindOutcome {
    /// Whether clients should see the rewind effect
    pub fn triggered(&self) -> bool {
        !matches!(self, Self::Rejected)
    }
}

/// One independent simulation instance.
///
/// Players are kept in join order and every pass over them (tick, snapshot,
/// collision, broadcast) uses that order. A snake processed earlier in a tick
/// has already moved when later snakes check against it. A snake that dies is
/// respawned on the spot, and its fresh body is ignored until it moves again.
pub struct Room {
    pub mode: GameMode,
    pub players: Vec<Player>,
    pub ghosts: Vec<Ghost>,
    pub history: HistoryBuffer,
    pub food: Point,
    pub session_high_score: u32,
    pub session_best_player: String,
    rng: ChaCha8Rng,
    progress_tx: ProgressSink,
}

impl Room {
    pub fn new(mode: GameMode, progress_tx: ProgressSink) -> Self {
        Self::with_seed(mode, rand::random(), progress_tx)
    }

    /// Deterministic room, used by tests
    pub fn with_seed(mode: GameMode, seed: u64, progress_tx: ProgressSink) -> Self {
        let mut room = Self {
            mode,
            players: Vec::new(),
            ghosts: Vec::new(),
            history: HistoryBuffer::default(),
            food: Point::new(10, 10),
            session_high_score: 0,
            session_best_player: String::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            progress_tx,
        };
        room.spawn_food();
        room
    }

    pub fn player(&self, id: &Uuid) -> Option<&Player> {
        self.players.iter().find(|p| &p.id == id)
    }

    pub fn player_mut(&mut self, id: &Uuid) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| &p.id == id)
    }

    pub fn used_colors(&self) -> Vec<String> {
        self.players.iter().map(|p| p.color.clone()).collect()
    }

    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    // ------------------------------------------------------------------
    // Player lifecycle
    // ------------------------------------------------------------------

    /// Insert a player. No validation; a duplicate id replaces the old entry in place.
    pub fn add_player(&mut self, player: Player) {
        match self.players.iter_mut().find(|p| p.id == player.id) {
            Some(slot) => *slot = player,
            None => self.players.push(player),
        }
    }

    /// Flush the player's progress and drop them. No-op if absent.
    pub fn remove_player(&mut self, id: &Uuid) -> Option<Player> {
        let idx = self.players.iter().position(|p| &p.id == id)?;
        self.flush_progress(idx);
        Some(self.players.remove(idx))
    }

    /// Respawn a player in place at a random cell with a fresh session
    pub fn reset_player(&mut self, id: &Uuid, now: u64) {
        if let Some(idx) = self.players.iter().position(|p| &p.id == id) {
            respawn(&mut self.players[idx], &mut self.rng, now);
        }
    }

    /// Fresh spawn for a player not yet in the room
    pub fn prepare_spawn(&mut self, player: &mut Player, now: u64) {
        respawn(player, &mut self.rng, now);
    }

    /// Place food on a cell no snake occupies
    pub fn spawn_food(&mut self) {
        match pick_food_cell(&mut self.rng, &self.players) {
            Some(cell) => self.food = cell,
            None => warn!(mode = %self.mode, "Board full, food left in place"),
        }
    }

    fn flush_progress(&self, idx: usize) {
        let record = self.players[idx].progress_record();
        if self.progress_tx.send(record).is_err() {
            warn!(mode = %self.mode, "Progress writer gone, dropping save");
        }
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Change direction. Reversal into the neck is ignored once the snake is longer than one cell.
    pub fn apply_move(&mut self, id: &Uuid, direction: Point) -> bool {
        if !direction.is_unit_direction() {
            return false;
        }
        let Some(player) = self.player_mut(id) else {
            return false;
        };
        if player.velocity.is_reverse_of(direction) && player.len() > 1 {
            return false;
        }
        player.velocity = direction;
        player.has_moved = true;
        true
    }

    /// Pay the rewind cost and, with enough history, restore the room ~3 s back
    /// while ghosts replay the erased future.
    pub fn rewind(&mut self, initiator: &Uuid, now: u64) -> RewindOutcome {
        if !self.mode.allows_rewind() {
            return RewindOutcome::Rejected;
        }
        let Some(player) = self.player_mut(initiator) else {
            return RewindOutcome::Rejected;
        };
        if player.len() <= REWIND_MIN_LEN {
            return RewindOutcome::Rejected;
        }
        let keep = player.len() - REWIND_COST;
        player.body.truncate(keep);

        if self.history.len() < REWIND_WINDOW {
            debug!(mode = %self.mode, initiator = %initiator, "Rewind skipped, not enough history");
            return RewindOutcome::Skipped;
        }

        let target_index = self.history.len().saturating_sub(REWIND_WINDOW);
        let Some(target) = self.history.get(target_index).cloned() else {
            return RewindOutcome::Skipped;
        };

        let spawned = self.spawn_ghosts(target_index, &target, now);

        for recorded in &target.players {
            if let Some(live) = self.player_mut(&recorded.id) {
                live.body = recorded.body.iter().copied().collect();
            }
        }
        self.food = target.food;
        self.history.truncate_after(target_index);

        info!(mode = %self.mode, initiator = %initiator, ghosts = spawned, "TIME REWIND");
        RewindOutcome::Rewound { ghosts: spawned }
    }

    fn spawn_ghosts(&mut self, target_index: usize, target: &Snapshot, now: u64) -> usize {
        // Paths keyed by first appearance so ghost order is stable
        let mut order: Vec<Uuid> = Vec::new();
        let mut paths: HashMap<Uuid, Vec<Vec<Point>>> = HashMap::new();
        for snapshot in self.history.range_from(target_index) {
            for recorded in &snapshot.players {
                paths
                    .entry(recorded.id)
                    .or_insert_with(|| {
                        order.push(recorded.id);
                        Vec::new()
                    })
                    .push(recorded.body.clone());
            }
        }

        let mut spawned = 0;
        for id in order {
            let Some(path) = paths.remove(&id) else { continue };
            let color = target.player(&id).map(|p| p.color.as_str());
            if let Some(ghost) = Ghost::from_path(path, color, now) {
                self.ghosts.push(ghost);
                spawned += 1;
            }
        }
        spawned
    }

    // ------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------

    /// Run one tick: record history, move ghosts, move snakes, then emit the state.
    /// Returns messages in publish order; the room state is always last.
    pub fn tick(&mut self, now: u64) -> Vec<ServerMsg> {
        self.capture_snapshot(now);
        self.advance_ghosts();
        let mut out = self.advance_players(now);
        out.push(ServerMsg::State(self.state()));
        out
    }

    /// Append the current players and food to history
    pub fn capture_snapshot(&mut self, now: u64) {
        let snapshot = Snapshot::capture(&self.players, self.food, now);
        self.history.push(snapshot);
    }

    /// Step every ghost one frame, dropping exhausted ones
    pub fn advance_ghosts(&mut self) {
        self.ghosts.retain_mut(|ghost| ghost.advance());
    }

    /// Move every due snake, resolving walls, ghosts, snakes and food
    pub fn advance_players(&mut self, now: u64) -> Vec<ServerMsg> {
        let mut events = Vec::new();

        for idx in 0..self.players.len() {
            let (head, velocity) = {
                let p = &self.players[idx];
                if p.velocity.is_zero() || now.saturating_sub(p.last_move_time) < MOVE_INTERVAL_MS {
                    continue;
                }
                let Some(head) = p.head() else { continue };
                (head, p.velocity)
            };
            self.players[idx].last_move_time = now;

            let candidate = head.offset(velocity);
            if self.is_lethal(candidate) {
                debug!(mode = %self.mode, player = %self.players[idx].name, x = candidate.x, y = candidate.y, "Snake died");
                let id = self.players[idx].id;
                self.flush_progress(idx);
                self.reset_player(&id, now);
                continue;
            }

            let ate = candidate == self.food;
            let player = &mut self.players[idx];
            player.body.push_front(candidate);
            if ate {
                player.score += FOOD_SCORE;
                player.streak += 1;
                if player.streak == MIRACLE_STREAK {
                    events.push(ServerMsg::ChristmasMiracle { player_id: player.id });
                }
            } else {
                player.body.pop_back();
            }

            if player.score > self.session_high_score {
                self.session_high_score = player.score;
                self.session_best_player = player.name.clone();
            }
            if player.score > player.profile.best_score {
                player.profile.best_score = player.score;
            }

            if ate {
                self.spawn_food();
            }
        }

        events
    }

    fn is_lethal(&self, cell: Point) -> bool {
        if !cell.in_bounds() {
            return true;
        }
        if self.ghosts.iter().any(|g| g.occupies(cell)) {
            return true;
        }
        self.players
            .iter()
            .filter(|p| p.has_moved)
            .any(|p| p.body.iter().any(|seg| *seg == cell))
    }

    /// Wire view of the room
    pub fn state(&self) -> RoomState {
        RoomState {
            players: self.players.iter().map(PlayerView::from).collect(),
            ghosts: self.ghosts.iter().map(GhostView::from).collect(),
            food: self.food,
            session_high_score: self.session_high_score,
            session_best_player: self.session_best_player.clone(),
        }
    }
}

fn respawn(player: &mut Player, rng: &mut ChaCha8Rng, now: u64) {
    player.body.clear();
    player.body.push_back(random_cell(rng));
    player.velocity = Point::ZERO;
    player.score = 0;
    player.streak = 0;
    player.has_moved = false;
    player.last_move_time = now;
}

fn pick_food_cell(rng: &mut ChaCha8Rng, players: &[Player]) -> Option<Point> {
    let taken = |cell: Point| players.iter().any(|p| p.body.contains(&cell));

    for _ in 0..FOOD_SAMPLE_ATTEMPTS {
        let cell = random_cell(rng);
        if !taken(cell) {
            return Some(cell);
        }
    }

    let free: Vec<Point> = (0..TILE_COUNT)
        .flat_map(|y| (0..TILE_COUNT).map(move |x| Point::new(x, y)))
        .filter(|cell| !taken(*cell))
        .collect();
    free.choose(rng).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::history::HISTORY_CAPACITY;
    use tokio::sync::mpsc::UnboundedReceiver;

    const FAR_FOOD: Point = Point::new(19, 19);

    fn room(mode: GameMode) -> (Room, UnboundedReceiver<ProgressRecord>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut room = Room::with_seed(mode, 42, tx);
        room.food = FAR_FOOD;
        (room, rx)
    }

    fn cells(body: &[(i32, i32)]) -> Vec<Point> {
        body.iter().map(|&(x, y)| Point::new(x, y)).collect()
    }

    fn snake(room: &mut Room, body: &[(i32, i32)], velocity: (i32, i32)) -> Uuid {
        let id = Uuid::new_v4();
        let mut player = Player::new(id, format!("p{}", room.players.len()), room.mode, "#00FF9D".into());
        player.body = cells(body).into();
        player.velocity = Point::new(velocity.0, velocity.1);
        player.has_moved = !player.velocity.is_zero();
        player.last_move_time = 0;
        room.add_player(player);
        id
    }

    fn body_of(room: &Room, id: &Uuid) -> Vec<Point> {
        room.player(id).map(|p| p.body.iter().copied().collect()).unwrap_or_default()
    }

    fn assert_reset(room: &Room, id: &Uuid, now: u64) {
        let p = room.player(id).unwrap();
        assert_eq!(p.len(), 1);
        assert!(p.body[0].in_bounds());
        assert_eq!(p.velocity, Point::ZERO);
        assert_eq!(p.score, 0);
        assert_eq!(p.streak, 0);
        assert!(!p.has_moved);
        assert_eq!(p.last_move_time, now);
    }

    #[test]
    fn eating_grows_scores_and_respawns_food() {
        let (mut room, _rx) = room(GameMode::Standard);
        let id = snake(&mut room, &[(5, 5)], (1, 0));
        room.food = Point::new(6, 5);

        room.tick(100);

        let p = room.player(&id).unwrap();
        assert_eq!(body_of(&room, &id), cells(&[(6, 5), (5, 5)]));
        assert_eq!(p.score, 10);
        assert_eq!(p.streak, 1);
        assert_eq!(p.profile.best_score, 10);
        assert_ne!(room.food, Point::new(6, 5));
        assert!(!p.body.contains(&room.food));
        assert_eq!(room.session_high_score, 10);
        assert_eq!(room.session_best_player, "p0");
    }

    #[test]
    fn plain_step_keeps_length() {
        let (mut room, _rx) = room(GameMode::Standard);
        let id = snake(&mut room, &[(5, 5), (4, 5), (3, 5)], (1, 0));

        room.tick(100);

        assert_eq!(body_of(&room, &id), cells(&[(6, 5), (5, 5), (4, 5)]));
    }

    #[test]
    fn steps_wait_for_move_interval() {
        let (mut room, _rx) = room(GameMode::Standard);
        let id = snake(&mut room, &[(5, 5)], (0, 1));

        room.tick(50);
        assert_eq!(body_of(&room, &id), cells(&[(5, 5)]));
        room.tick(100);
        assert_eq!(body_of(&room, &id), cells(&[(5, 6)]));
        room.tick(150);
        assert_eq!(body_of(&room, &id), cells(&[(5, 6)]));
        room.tick(200);
        assert_eq!(body_of(&room, &id), cells(&[(5, 7)]));
    }

    #[test]
    fn standing_snakes_never_move() {
        let (mut room, _rx) = room(GameMode::Standard);
        let id = snake(&mut room, &[(5, 5), (5, 6)], (0, 0));

        for i in 1..10 {
            room.tick(i * 100);
        }

        assert_eq!(body_of(&room, &id), cells(&[(5, 5), (5, 6)]));
    }

    #[test]
    fn wall_hit_resets_only_that_snake() {
        let (mut room, mut rx) = room(GameMode::Standard);
        let a = snake(&mut room, &[(19, 5)], (1, 0));
        let b = snake(&mut room, &[(2, 2), (2, 1)], (0, 1));
        room.player_mut(&a).unwrap().score = 30;

        room.tick(100);

        assert_reset(&room, &a, 100);
        assert_eq!(body_of(&room, &b), cells(&[(2, 3), (2, 2)]));
        let saved = rx.try_recv().unwrap();
        assert_eq!(saved.conn_id, a);
        assert_eq!(saved.score, 30);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn top_and_left_walls_are_lethal() {
        let (mut room, _rx) = room(GameMode::Standard);
        let up = snake(&mut room, &[(4, 0)], (0, -1));
        let left = snake(&mut room, &[(0, 8)], (-1, 0));

        room.tick(100);

        assert_reset(&room, &up, 100);
        assert_reset(&room, &left, 100);
    }

    #[test]
    fn unmoved_snakes_pass_through_each_other() {
        let (mut room, mut rx) = room(GameMode::Standard);
        let a = snake(&mut room, &[(5, 5)], (1, 0));
        let b = snake(&mut room, &[(6, 5)], (-1, 0));
        room.player_mut(&a).unwrap().has_moved = false;
        room.player_mut(&b).unwrap().has_moved = false;

        room.tick(100);

        assert_eq!(body_of(&room, &a), cells(&[(6, 5)]));
        assert_eq!(body_of(&room, &b), cells(&[(5, 5)]));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn head_on_swap_kills_the_earlier_snake() {
        let (mut room, mut rx) = room(GameMode::Standard);
        let a = snake(&mut room, &[(5, 5)], (1, 0));
        let b = snake(&mut room, &[(6, 5)], (-1, 0));

        room.tick(100);

        assert_reset(&room, &a, 100);
        assert_eq!(body_of(&room, &b), cells(&[(5, 5)]));
        assert_eq!(rx.try_recv().map(|r| r.conn_id).ok(), Some(a));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn dead_snake_leaves_its_cell_free_the_same_tick() {
        let (mut room, mut rx) = room(GameMode::Standard);
        let a = snake(&mut room, &[(19, 5)], (1, 0));
        let b = snake(&mut room, &[(19, 6), (19, 7)], (0, -1));

        room.tick(100);

        assert_reset(&room, &a, 100);
        assert_eq!(body_of(&room, &b), cells(&[(19, 5), (19, 6)]));
        assert_eq!(rx.try_recv().map(|r| r.conn_id).ok(), Some(a));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn earlier_snake_wins_contested_cell() {
        let (mut room, _rx) = room(GameMode::Standard);
        let a = snake(&mut room, &[(5, 5)], (1, 0));
        let b = snake(&mut room, &[(7, 5)], (-1, 0));

        room.tick(100);

        assert_eq!(body_of(&room, &a), cells(&[(6, 5)]));
        assert_reset(&room, &b, 100);
    }

    #[test]
    fn running_into_own_body_is_lethal() {
        let (mut room, _rx) = room(GameMode::Standard);
        let id = snake(&mut room, &[(5, 5), (5, 6), (6, 6), (6, 5), (6, 4)], (1, 0));

        room.tick(100);

        assert_reset(&room, &id, 100);
    }

    #[test]
    fn ghost_body_is_lethal() {
        let (mut room, _rx) = room(GameMode::Rewind);
        let id = snake(&mut room, &[(5, 5)], (1, 0));
        let frames = vec![cells(&[(6, 5)]), cells(&[(6, 5)])];
        room.ghosts.push(Ghost::from_path(frames, Some("#FF00FF"), 0).unwrap());

        room.tick(100);

        assert_reset(&room, &id, 100);
    }

    #[test]
    fn miracle_fires_exactly_on_fifth_pickup() {
        let (mut room, _rx) = room(GameMode::Standard);
        let id = snake(&mut room, &[(1, 1)], (1, 0));

        for k in 1..=7u64 {
            room.food = Point::new(1 + k as i32, 1);
            let out = room.tick(k * 100);
            let miracles: Vec<_> = out
                .iter()
                .filter(|m| matches!(m, ServerMsg::ChristmasMiracle { player_id } if *player_id == id))
                .collect();
            assert_eq!(room.player(&id).unwrap().streak, k as u32);
            assert_eq!(miracles.len(), usize::from(k == 5), "pickup {}", k);
            assert!(matches!(out.last(), Some(ServerMsg::State(_))));
        }
        assert_eq!(room.player(&id).unwrap().len(), 8);
    }

    #[test]
    fn food_never_lands_on_a_snake() {
        let (mut room, _rx) = room(GameMode::Standard);
        let free = [Point::new(0, 0), Point::new(19, 19), Point::new(7, 13)];
        let body: Vec<(i32, i32)> = (0..TILE_COUNT)
            .flat_map(|y| (0..TILE_COUNT).map(move |x| (x, y)))
            .filter(|&(x, y)| !free.contains(&Point::new(x, y)))
            .collect();
        snake(&mut room, &body, (0, 0));

        for _ in 0..50 {
            room.spawn_food();
            assert!(free.contains(&room.food));
        }
    }

    #[test]
    fn full_board_leaves_food_in_place() {
        let (mut room, _rx) = room(GameMode::Standard);
        let body: Vec<(i32, i32)> = (0..TILE_COUNT)
            .flat_map(|y| (0..TILE_COUNT).map(move |x| (x, y)))
            .collect();
        snake(&mut room, &body, (0, 0));

        room.spawn_food();

        assert_eq!(room.food, FAR_FOOD);
    }

    #[test]
    fn history_is_captured_every_tick_and_capped() {
        let (mut room, _rx) = room(GameMode::Standard);
        snake(&mut room, &[(5, 5)], (0, 0));

        for i in 0..150u64 {
            room.tick(i);
            assert!(room.history.len() <= HISTORY_CAPACITY);
        }

        assert_eq!(room.history.len(), HISTORY_CAPACITY);
        assert_eq!(room.history.get(0).map(|s| s.timestamp), Some(50));
    }

    #[test]
    fn move_rules() {
        let (mut room, _rx) = room(GameMode::Standard);
        let single = snake(&mut room, &[(5, 5)], (0, 0));
        let long = snake(&mut room, &[(9, 9), (8, 9)], (0, 0));

        assert!(!room.apply_move(&single, Point::new(1, 1)));
        assert!(!room.player(&single).unwrap().has_moved);

        assert!(room.apply_move(&single, Point::new(1, 0)));
        assert!(room.player(&single).unwrap().has_moved);
        assert!(room.apply_move(&single, Point::new(-1, 0)));

        assert!(room.apply_move(&long, Point::new(1, 0)));
        assert!(!room.apply_move(&long, Point::new(-1, 0)));
        assert_eq!(room.player(&long).unwrap().velocity, Point::new(1, 0));

        assert!(!room.apply_move(&Uuid::new_v4(), Point::new(0, 1)));
    }

    #[test]
    fn reset_keeps_identity_and_profile() {
        let (mut room, mut rx) = room(GameMode::Standard);
        let id = snake(&mut room, &[(5, 5), (5, 6)], (0, -1));
        room.player_mut(&id).unwrap().score = 50;
        room.player_mut(&id).unwrap().profile.best_score = 50;

        room.reset_player(&id, 777);

        assert_reset(&room, &id, 777);
        assert_eq!(room.player(&id).unwrap().profile.best_score, 50);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn remove_flushes_progress_once() {
        let (mut room, mut rx) = room(GameMode::Standard);
        let id = snake(&mut room, &[(5, 5)], (0, 0));
        room.player_mut(&id).unwrap().score = 20;

        assert!(room.remove_player(&id).is_some());
        assert!(room.remove_player(&id).is_none());

        assert_eq!(rx.try_recv().map(|r| r.score).ok(), Some(20));
        assert!(rx.try_recv().is_err());
        assert!(room.players.is_empty());
    }

    #[test]
    fn session_high_score_survives_death() {
        let (mut room, _rx) = room(GameMode::Standard);
        let id = snake(&mut room, &[(18, 5)], (1, 0));
        room.food = Point::new(19, 5);

        room.tick(100);
        assert_eq!(room.session_high_score, 10);
        room.tick(200);

        assert_reset(&room, &id, 200);
        assert_eq!(room.session_high_score, 10);
        assert_eq!(room.session_best_player, "p0");
        assert_eq!(room.player(&id).unwrap().profile.best_score, 10);
    }

    #[test]
    fn rewind_needs_rewind_room_and_length() {
        let (mut standard, _rx) = room(GameMode::Standard);
        let id = snake(&mut standard, &[(0, 0), (1, 0), (2, 0), (3, 0), (4, 0), (5, 0)], (0, 0));
        assert_eq!(standard.rewind(&id, 0), RewindOutcome::Rejected);
        assert_eq!(standard.player(&id).unwrap().len(), 6);

        let (mut rewind, _rx) = room(GameMode::Rewind);
        let short = snake(&mut rewind, &[(0, 0), (1, 0), (2, 0), (3, 0), (4, 0)], (0, 0));
        assert_eq!(rewind.rewind(&short, 0), RewindOutcome::Rejected);
        assert_eq!(rewind.player(&short).unwrap().len(), 5);
        assert!(!RewindOutcome::Rejected.triggered());
    }

    #[test]
    fn rewind_without_history_still_costs_two() {
        let (mut room, _rx) = room(GameMode::Rewind);
        let id = snake(&mut room, &[(0, 0), (1, 0), (2, 0), (3, 0), (4, 0), (5, 0)], (0, 0));
        let other = snake(&mut room, &[(9, 9)], (0, 0));
        for i in 0..59 {
            room.capture_snapshot(i);
        }

        let outcome = room.rewind(&id, 60);

        assert_eq!(outcome, RewindOutcome::Skipped);
        assert!(outcome.triggered());
        assert_eq!(body_of(&room, &id), cells(&[(0, 0), (1, 0), (2, 0), (3, 0)]));
        assert_eq!(body_of(&room, &other), cells(&[(9, 9)]));
        assert_eq!(room.food, FAR_FOOD);
        assert!(room.ghosts.is_empty());
        assert_eq!(room.history.len(), 59);
    }

    #[test]
    fn rewind_restores_target_and_spawns_ghosts() {
        let (mut room, _rx) = room(GameMode::Rewind);
        let initiator = snake(&mut room, &[(0, 5), (1, 5), (2, 5), (3, 5), (4, 5), (5, 5), (6, 5), (7, 5)], (0, 0));
        let runner = snake(&mut room, &[(0, 0)], (0, 0));
        room.player_mut(&runner).unwrap().color = "#00F3FF".into();

        let mut late = None;
        for i in 0..70u64 {
            if i == 40 {
                late = Some(snake(&mut room, &[(15, 15)], (0, 0)));
            }
            let cell = Point::new((i % 20) as i32, (i / 20) as i32);
            room.player_mut(&runner).unwrap().body = [cell].into();
            room.food = Point::new(3, (i % 20) as i32);
            room.capture_snapshot(i);
        }
        let late = late.unwrap();
        room.player_mut(&late).unwrap().body = cells(&[(16, 15)]).into();

        let outcome = room.rewind(&initiator, 1_000);

        // target index = 70 - 60 = 10
        assert_eq!(outcome, RewindOutcome::Rewound { ghosts: 3 });
        assert_eq!(body_of(&room, &runner), cells(&[(10, 0)]));
        assert_eq!(room.player(&initiator).unwrap().len(), 8);
        assert_eq!(body_of(&room, &late), cells(&[(16, 15)]));
        assert_eq!(room.food, Point::new(3, 10));
        assert_eq!(room.history.len(), 11);
        assert_eq!(room.history.get(10).map(|s| s.timestamp), Some(10));

        let runner_ghost = &room.ghosts[1];
        assert_eq!(runner_ghost.body, cells(&[(10, 0)]));
        assert_eq!(runner_ghost.remaining(), 60);
        assert_eq!(runner_ghost.color, "rgba(0, 243, 255, 0.5)");
        assert_eq!(runner_ghost.created_at, 1_000);

        let late_ghost = &room.ghosts[2];
        assert_eq!(late_ghost.remaining(), 30);
        assert_eq!(late_ghost.color, "rgba(255, 255, 255, 0.5)");
    }

    #[test]
    fn ghosts_play_out_then_vanish() {
        let (mut room, _rx) = room(GameMode::Rewind);
        let frames = vec![cells(&[(1, 1)]), cells(&[(2, 1)]), cells(&[(3, 1)])];
        room.ghosts.push(Ghost::from_path(frames, Some("#FFFF00"), 0).unwrap());

        for k in 1..=3u64 {
            room.tick(k * 50);
            assert_eq!(room.ghosts.len(), 1);
            assert_eq!(room.ghosts[0].remaining(), 3 - k as usize);
        }
        assert_eq!(room.ghosts[0].body, cells(&[(3, 1)]));

        room.tick(200);
        assert!(room.ghosts.is_empty());
    }

    #[test]
    fn state_lists_players_in_join_order() {
        let (mut room, _rx) = room(GameMode::Standard);
        let a = snake(&mut room, &[(1, 1)], (0, 0));
        let b = snake(&mut room, &[(2, 2)], (0, 0));
        let c = snake(&mut room, &[(3, 3)], (0, 0));
        room.remove_player(&b);

        let state = room.state();

        let ids: Vec<Uuid> = state.players.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![a, c]);
        assert_eq!(state.food, FAR_FOOD);
    }
}
