//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::color::assign_color;
use crate::game::grid::Point;
use crate::game::{Player, PlayerProfile};
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, GameMode, ServerMsg};

/// Messages queued for one socket before room broadcasts apply backpressure
const OUTBOX_CAPACITY: usize = 128;
const DEFAULT_NAME: &str = "Guest";

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let conn_id = Uuid::new_v4();
    info!(conn_id = %conn_id, "Connection opened");

    let (ws_sink, mut ws_stream) = socket.split();
    let (outbox_tx, outbox_rx) = mpsc::channel(OUTBOX_CAPACITY);

    // Spawn writer task: outbox -> WebSocket
    let writer_handle = tokio::spawn(write_loop(conn_id, ws_sink, outbox_rx));

    let mut session = Session::new(conn_id, state, outbox_tx);
    let rate_limiter = ConnectionRateLimiter::new();

    // Reader loop: WebSocket -> room
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check_command() {
                    debug!(conn_id = %conn_id, "Rate limited client message");
                    continue;
                }

                match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(client_msg) => session.handle(client_msg).await,
                    Err(e) => {
                        warn!(conn_id = %conn_id, error = %e, "Failed to parse client message");
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(conn_id = %conn_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(conn_id = %conn_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(conn_id = %conn_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    session.leave();
    writer_handle.abort();

    let online = session.state.rooms.total_players();
    info!(conn_id = %conn_id, online, "Connection closed");
}

/// Room membership of a connection
struct Membership {
    mode: GameMode,
    forwarder: JoinHandle<()>,
}

/// Per-connection command dispatch
pub struct Session {
    conn_id: Uuid,
    state: AppState,
    outbox: mpsc::Sender<ServerMsg>,
    membership: Option<Membership>,
}

impl Session {
    pub fn new(conn_id: Uuid, state: AppState, outbox: mpsc::Sender<ServerMsg>) -> Self {
        Self {
            conn_id,
            state,
            outbox,
            membership: None,
        }
    }

    pub fn mode(&self) -> Option<GameMode> {
        self.membership.as_ref().map(|m| m.mode)
    }

    /// Apply one client command. Invalid commands are dropped silently.
    pub async fn handle(&mut self, msg: ClientMsg) {
        match msg {
            ClientMsg::Join { name, color, mode } => self.join(name, color, mode).await,
            ClientMsg::Move { direction } => self.change_direction(direction),
            ClientMsg::Rewind => self.rewind(),
            ClientMsg::Ping { timestamp } => {
                if self.outbox.try_send(ServerMsg::Pong { timestamp }).is_err() {
                    debug!(conn_id = %self.conn_id, "Outbox full, dropping pong");
                }
            }
        }
    }

    async fn join(&mut self, name: Option<String>, color: Option<String>, mode: Option<String>) {
        let name = name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| DEFAULT_NAME.to_string());
        let mode = GameMode::from_requested(mode.as_deref());

        // Rejoining moves the connection, it never duplicates it
        self.leave();

        let profile = match self.state.progress_store.load_or_create(&name).await {
            Ok(stored) => {
                info!(player = %name, mode = %mode, level = stored.level, "Loaded profile");
                Some(PlayerProfile::from(stored))
            }
            Err(e) => {
                error!(player = %name, error = %e, "Failed to load profile on join");
                None
            }
        };

        let handle = self.state.rooms.get(mode).clone();
        let conn_id = self.conn_id;
        handle.with_room(|room| {
            let used = room.used_colors();
            let color = assign_color(color.as_deref(), &used, room.rng());
            let mut player = Player::new(conn_id, name.clone(), mode, color);
            room.prepare_spawn(&mut player, unix_millis());
            if let Some(profile) = profile {
                player.profile = profile;
            }
            room.add_player(player);
        });

        let forwarder = tokio::spawn(forward_room(conn_id, handle.subscribe(), self.outbox.clone()));
        self.membership = Some(Membership { mode, forwarder });

        info!(conn_id = %conn_id, player = %name, mode = %mode, "Player joined room");
    }

    fn change_direction(&self, direction: Point) {
        let Some(mode) = self.mode() else { return };
        let accepted = self
            .state
            .rooms
            .get(mode)
            .with_room(|room| room.apply_move(&self.conn_id, direction));
        if !accepted {
            debug!(conn_id = %self.conn_id, x = direction.x, y = direction.y, "Move ignored");
        }
    }

    fn rewind(&self) {
        let Some(mode) = self.mode() else { return };
        let handle = self.state.rooms.get(mode);
        let outcome = handle.with_room(|room| room.rewind(&self.conn_id, unix_millis()));
        if outcome.triggered() {
            handle.publish(ServerMsg::RewindEffect);
        }
    }

    /// Leave the current room, flushing the player's progress
    pub fn leave(&mut self) {
        let Some(membership) = self.membership.take() else { return };
        membership.forwarder.abort();
        let removed = self
            .state
            .rooms
            .get(membership.mode)
            .with_room(|room| room.remove_player(&self.conn_id));
        if removed.is_some() {
            info!(conn_id = %self.conn_id, mode = %membership.mode, "Player left room");
        }
    }
}

/// Relay room broadcasts into this connection's outbox
async fn forward_room(
    conn_id: Uuid,
    mut room_rx: broadcast::Receiver<ServerMsg>,
    outbox: mpsc::Sender<ServerMsg>,
) {
    loop {
        match room_rx.recv().await {
            Ok(msg) => {
                if outbox.send(msg).await.is_err() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(conn_id = %conn_id, lagged_count = n, "Client lagged, skipping {} messages", n);
                // Continue - don't disconnect for lag
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!(conn_id = %conn_id, "Room channel closed");
                break;
            }
        }
    }
}

/// Drain the outbox into the socket
async fn write_loop(
    conn_id: Uuid,
    mut ws_sink: futures::stream::SplitSink<WebSocket, Message>,
    mut outbox: mpsc::Receiver<ServerMsg>,
) {
    while let Some(msg) = outbox.recv().await {
        if let Err(e) = send_msg(&mut ws_sink, &msg).await {
            debug!(conn_id = %conn_id, error = %e, "WebSocket send failed");
            break;
        }
    }
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
