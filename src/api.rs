//! HTTP API endpoints: health, the read-only leaderboard query, and
//! per-room state snapshots for backup/restore.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::state::export::RoomExport;
use crate::state::AppState;
use crate::types::RoomId;

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub rooms: usize,
}

/// GET /api/health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let rooms = state.rooms.read().await.len();
    Json(HealthResponse { status: "ok", rooms })
}

/// GET /api/rooms/{room}/leaderboard
pub async fn room_leaderboard(
    State(state): State<Arc<AppState>>,
    Path(room): Path<RoomId>,
) -> Response {
    match state.leaderboard(&room).await {
        Ok(entries) => Json(entries).into_response(),
        Err(e) => (StatusCode::NOT_FOUND, e.to_string()).into_response(),
    }
}

/// GET /api/rooms/{room}/export
pub async fn export_room(
    State(state): State<Arc<AppState>>,
    Path(room): Path<RoomId>,
) -> Response {
    match state.export_room(&room).await {
        Some(export) => Json(export).into_response(),
        None => (StatusCode::NOT_FOUND, format!("room {room} not found")).into_response(),
    }
}

/// POST /api/rooms/{room}/import
///
/// Replaces the room's state with the posted snapshot and broadcasts the
/// restored leaderboard to connected clients.
pub async fn import_room(
    State(state): State<Arc<AppState>>,
    Path(room): Path<RoomId>,
    Json(export): Json<RoomExport>,
) -> Response {
    match state.import_room(&room, export).await {
        Ok(()) => (StatusCode::OK, "Room imported successfully").into_response(),
        Err(e) => {
            tracing::error!(room = %room, "room import failed: {}", e);
            (StatusCode::BAD_REQUEST, format!("Import failed: {e}")).into_response()
        }
    }
}
