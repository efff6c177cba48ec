mod auth;
mod connections;
pub mod export;
mod host;
mod ledger;

pub use auth::validate_username;

use crate::error::{RoomError, RoomResult};
use crate::protocol::{PollInfo, RoomView, ServerMessage};
use crate::types::*;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

/// Buffered events per room channel before slow receivers start lagging
const CHANNEL_CAPACITY: usize = 100;

/// What a successful join produced, for the transport layer to act on
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    pub username: Username,
    pub host_reconnected: bool,
    pub view: RoomView,
}

/// Shared application state: every live room plus its broadcast channel.
///
/// The write lock on `rooms` is the per-room total order — each operation
/// locks, applies one mutation, and publishes after the state change.
/// Operations on different rooms interleave freely.
#[derive(Clone)]
pub struct AppState {
    pub rooms: Arc<RwLock<HashMap<RoomId, Room>>>,
    channels: Arc<RwLock<HashMap<RoomId, broadcast::Sender<ServerMessage>>>>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
            channels: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Subscribe to a room's event stream, creating the channel if needed
    pub async fn subscribe(&self, room_id: &str) -> broadcast::Receiver<ServerMessage> {
        let mut channels = self.channels.write().await;
        channels
            .entry(room_id.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Fire-and-forget broadcast to every connection in a room. Send errors
    /// (no receivers) are ignored; delivery is the subscribers' concern.
    pub async fn publish(&self, room_id: &str, msg: ServerMessage) {
        let channels = self.channels.read().await;
        if let Some(sender) = channels.get(room_id) {
            let _ = sender.send(msg);
        }
    }

    /// Join a room: authenticate, register the connection, and rebind the
    /// host if this username holds the role. Creates the room on first join.
    pub async fn join(
        &self,
        room_id: &str,
        username: &str,
        password: &str,
        connection_id: &str,
    ) -> RoomResult<JoinOutcome> {
        let outcome = {
            let mut rooms = self.rooms.write().await;
            let room = rooms.entry(room_id.to_string()).or_default();

            let username = room.authenticate(password, username)?;
            room.register_connection(connection_id, &username);

            let host_reconnected = room.authorize(&username);
            if host_reconnected {
                room.reconnect_host(&username, connection_id);
            }

            JoinOutcome {
                view: RoomView::from(&*room),
                username,
                host_reconnected,
            }
        };

        tracing::info!(
            room = room_id,
            username = %outcome.username,
            connection = connection_id,
            host = outcome.host_reconnected,
            "joined"
        );
        self.publish(
            room_id,
            ServerMessage::Joined {
                username: outcome.username.clone(),
                connection_id: connection_id.to_string(),
            },
        )
        .await;
        if outcome.host_reconnected {
            self.publish(
                room_id,
                ServerMessage::HostReconnected {
                    username: outcome.username.clone(),
                },
            )
            .await;
        }
        Ok(outcome)
    }

    /// Transport disconnect notification: unregister the connection and let
    /// the host transitions follow. Never fails; unknown rooms and
    /// connections are ignored.
    pub async fn disconnect(&self, room_id: &str, connection_id: &str) {
        let (username, host_went_offline) = {
            let mut rooms = self.rooms.write().await;
            let Some(room) = rooms.get_mut(room_id) else {
                return;
            };
            let was_online = room.is_host_online();
            let username = room.unregister_connection(connection_id);
            (username, was_online && !room.is_host_online())
        };
        let Some(username) = username else { return };

        tracing::info!(room = room_id, username = %username, connection = connection_id, "left");
        self.publish(
            room_id,
            ServerMessage::PeerLeft {
                username: username.clone(),
                connection_id: connection_id.to_string(),
            },
        )
        .await;
        if host_went_offline {
            self.publish(room_id, ServerMessage::HostOffline { username }).await;
        }
    }

    pub async fn claim_host(
        &self,
        room_id: &str,
        username: &str,
        connection_id: &str,
    ) -> RoomResult<()> {
        {
            let mut rooms = self.rooms.write().await;
            let room = Self::room_mut(&mut rooms, room_id)?;
            room.claim_host(username, connection_id)?;
        }
        self.publish(
            room_id,
            ServerMessage::HostChanged {
                host: username.to_string(),
            },
        )
        .await;
        Ok(())
    }

    pub async fn transfer_host(
        &self,
        room_id: &str,
        requesting: &str,
        new_host: &str,
    ) -> RoomResult<()> {
        let previous_host = {
            let mut rooms = self.rooms.write().await;
            let room = Self::room_mut(&mut rooms, room_id)?;
            let previous = room.host_username.clone();
            room.transfer_host(requesting, new_host)?;
            previous
        };
        self.publish(
            room_id,
            ServerMessage::HostTransferred {
                previous_host: previous_host.unwrap_or_default(),
                new_host: new_host.to_string(),
            },
        )
        .await;
        Ok(())
    }

    pub async fn add_question(
        &self,
        room_id: &str,
        username: &str,
        question: &str,
        options: Vec<String>,
    ) -> RoomResult<Poll> {
        let poll = {
            let mut rooms = self.rooms.write().await;
            let room = Self::room_mut(&mut rooms, room_id)?;
            room.add_question(username, question, options)?
        };
        self.publish(
            room_id,
            ServerMessage::QuestionAdded {
                poll: PollInfo::from(&poll),
            },
        )
        .await;
        Ok(poll)
    }

    pub async fn submit_vote(
        &self,
        room_id: &str,
        username: &str,
        poll_id: &str,
        vote_index: usize,
        guess_index: usize,
    ) -> RoomResult<()> {
        {
            let mut rooms = self.rooms.write().await;
            let room = Self::room_mut(&mut rooms, room_id)?;
            room.submit_vote(
                poll_id,
                Vote {
                    username: username.to_string(),
                    vote_index,
                    guess_index,
                },
            )?;
        }
        self.publish(
            room_id,
            ServerMessage::VoteRecorded {
                poll_id: poll_id.to_string(),
                username: username.to_string(),
            },
        )
        .await;
        Ok(())
    }

    /// Complete a poll and broadcast the result plus the refreshed
    /// leaderboard.
    pub async fn complete_poll(
        &self,
        room_id: &str,
        username: &str,
        poll_id: &str,
        winning_index: usize,
    ) -> RoomResult<Vec<LeaderboardEntry>> {
        let entries = {
            let mut rooms = self.rooms.write().await;
            let room = Self::room_mut(&mut rooms, room_id)?;
            room.complete_poll(username, poll_id, winning_index)?;
            room.leaderboard()
        };
        self.publish(
            room_id,
            ServerMessage::PollComplete {
                poll_id: poll_id.to_string(),
                winning_index,
            },
        )
        .await;
        self.publish(
            room_id,
            ServerMessage::Leaderboard {
                entries: entries.clone(),
            },
        )
        .await;
        Ok(entries)
    }

    /// Read-only leaderboard query
    pub async fn leaderboard(&self, room_id: &str) -> RoomResult<Vec<LeaderboardEntry>> {
        let rooms = self.rooms.read().await;
        let room = rooms
            .get(room_id)
            .ok_or_else(|| RoomError::NotFound(format!("room {room_id}")))?;
        Ok(room.leaderboard())
    }

    fn room_mut<'a>(
        rooms: &'a mut HashMap<RoomId, Room>,
        room_id: &str,
    ) -> RoomResult<&'a mut Room> {
        rooms
            .get_mut(room_id)
            .ok_or_else(|| RoomError::NotFound(format!("room {room_id}")))
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
