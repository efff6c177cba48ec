pub mod handlers;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use std::sync::Arc;

use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use crate::types::RoomId;

/// Room joined when the query string names none
const DEFAULT_ROOM: &str = "lobby";

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub room: Option<String>,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let room_id = params
        .room
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_ROOM.to_string());

    tracing::info!(room = %room_id, "WebSocket connection request");
    ws.on_upgrade(move |socket| handle_socket(socket, room_id, state))
}

fn to_json(msg: &ServerMessage) -> Option<String> {
    match serde_json::to_string(msg) {
        Ok(json) => Some(json),
        Err(e) => {
            tracing::error!("Failed to serialize server message: {}", e);
            None
        }
    }
}

fn parse_error(e: serde_json::Error) -> ServerMessage {
    ServerMessage::Error {
        code: "parse-error".to_string(),
        msg: format!("Invalid message format: {}", e),
    }
}

/// Handle an individual WebSocket connection.
///
/// The transport assigns a fresh connection id per socket; the first
/// accepted client message must be `join`. Whatever ends the socket, the
/// disconnect notification runs so the registry never goes stale.
async fn handle_socket(socket: WebSocket, room_id: RoomId, state: Arc<AppState>) {
    let connection_id = ulid::Ulid::new().to_string();
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before joining so no event between the two is missed
    let mut broadcast_rx = state.subscribe(&room_id).await;

    // Phase 1: wait for a successful join. Rejected attempts surface as
    // errors and the client may retry on the same socket.
    let mut joined = false;
    while !joined {
        let reply = match receiver.next().await {
            Some(Ok(Message::Text(text))) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::Join { username, password }) => {
                    match state.join(&room_id, &username, &password, &connection_id).await {
                        Ok(outcome) => {
                            joined = true;
                            ServerMessage::Welcome {
                                room: outcome.view,
                                username: outcome.username,
                                connection_id: connection_id.clone(),
                            }
                        }
                        Err(e) => {
                            tracing::warn!(room = %room_id, "join rejected: {}", e);
                            ServerMessage::Error {
                                code: e.code().to_string(),
                                msg: e.to_string(),
                            }
                        }
                    }
                }
                Ok(_) => ServerMessage::Error {
                    code: "not-joined".to_string(),
                    msg: "join the room first".to_string(),
                },
                Err(e) => parse_error(e),
            },
            Some(Ok(Message::Ping(data))) => {
                if sender.send(Message::Pong(data)).await.is_err() {
                    return;
                }
                continue;
            }
            Some(Ok(Message::Close(_))) | None => return,
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                tracing::error!("WebSocket error: {}", e);
                return;
            }
        };

        if let Some(json) = to_json(&reply) {
            if sender.send(Message::Text(json.into())).await.is_err() {
                return;
            }
        }
    }

    // Phase 2: forward room events and dispatch client messages
    loop {
        tokio::select! {
            broadcast_msg = broadcast_rx.recv() => {
                match broadcast_msg {
                    Ok(msg) => {
                        if let Some(json) = to_json(&msg) {
                            if sender.send(Message::Text(json.into())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(connection = %connection_id, skipped, "slow consumer lagged");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }

            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("Received message: {}", text);

                        let reply = match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => {
                                handlers::handle_message(client_msg, &state, &room_id, &connection_id)
                                    .await
                            }
                            Err(e) => Some(parse_error(e)),
                        };

                        if let Some(reply) = reply {
                            if let Some(json) = to_json(&reply) {
                                if sender.send(Message::Text(json.into())).await.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!(connection = %connection_id, "WebSocket closed");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    // Disconnects are notifications, not errors: this always runs
    state.disconnect(&room_id, &connection_id).await;
}
