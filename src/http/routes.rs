//! HTTP route definitions

use axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    response::Json,
    routing::get,
    Router,
};
use serde::Serialize;
use std::path::Path;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::app::AppState;
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;
use crate::ws::protocol::GameMode;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let public_dir = Path::new(&state.config.public_dir);
    let index_page = public_dir.join("index.html");
    let game_page = public_dir.join("game.html");

    // Anything that is not an API route is a client asset
    let assets = ServeDir::new(public_dir).not_found_service(ServeFile::new(&index_page));
    info!("Serving static files from: {}", public_dir.display());

    let mut router = Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .route_service("/", ServeFile::new(&index_page))
        .route_service("/game", ServeFile::new(&game_page))
        .fallback_service(assets)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http());

    // CORS is only needed when the client is hosted elsewhere (comma-separated origins)
    if let Some(origins) = &state.config.client_origin {
        let allowed_origins: Vec<HeaderValue> = origins
            .split(',')
            .filter_map(|s| match s.trim().parse::<HeaderValue>() {
                Ok(origin) => Some(origin),
                Err(_) => {
                    warn!(origin = s, "Ignoring invalid CLIENT_ORIGIN entry");
                    None
                }
            })
            .collect();

        router = router.layer(
            CorsLayer::new()
                .allow_origin(allowed_origins)
                .allow_methods([Method::GET, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE]),
        );
    }

    router.with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    rooms: Vec<RoomHealth>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RoomHealth {
    mode: GameMode,
    players: usize,
    ghosts: usize,
    history_len: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let rooms = state
        .rooms
        .all()
        .iter()
        .map(|handle| {
            handle.with_room(|room| RoomHealth {
                mode: room.mode,
                players: room.players.len(),
                ghosts: room.ghosts.len(),
                history_len: room.history.len(),
            })
        })
        .collect();

    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        rooms,
    })
}
