//! WebSocket message dispatch
//!
//! Maps client messages onto room operations. Results that every
//! participant needs arrive through the room broadcast; only
//! requester-specific replies (`welcome`, `leaderboard`, errors) come back
//! directly.

use crate::error::RoomError;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use crate::types::{ConnectionId, RoomId};
use std::sync::Arc;

fn wire_error(e: RoomError) -> ServerMessage {
    ServerMessage::Error {
        code: e.code().to_string(),
        msg: e.to_string(),
    }
}

/// Handle a client message and return an optional direct response
pub async fn handle_message(
    msg: ClientMessage,
    state: &Arc<AppState>,
    room_id: &RoomId,
    connection_id: &ConnectionId,
) -> Option<ServerMessage> {
    match msg {
        // A repeated join on a live socket re-authenticates and rebinds
        // this connection (identity switch, host rebind included).
        ClientMessage::Join { username, password } => {
            match state.join(room_id, &username, &password, connection_id).await {
                Ok(outcome) => Some(ServerMessage::Welcome {
                    room: outcome.view,
                    username: outcome.username,
                    connection_id: connection_id.clone(),
                }),
                Err(e) => Some(wire_error(e)),
            }
        }

        ClientMessage::ClaimHost { username } => {
            match state.claim_host(room_id, &username, connection_id).await {
                Ok(()) => None,
                Err(e) => Some(wire_error(e)),
            }
        }

        ClientMessage::TransferHost {
            requesting_username,
            new_username,
        } => {
            match state
                .transfer_host(room_id, &requesting_username, &new_username)
                .await
            {
                Ok(()) => None,
                Err(e) => Some(wire_error(e)),
            }
        }

        ClientMessage::AddQuestion {
            username,
            question,
            options,
        } => {
            match state
                .add_question(room_id, &username, &question, options)
                .await
            {
                Ok(_) => None,
                Err(e) => Some(wire_error(e)),
            }
        }

        ClientMessage::SubmitVote {
            username,
            poll_id,
            vote_index,
            guess_index,
        } => {
            match state
                .submit_vote(room_id, &username, &poll_id, vote_index, guess_index)
                .await
            {
                Ok(()) => None,
                Err(e) => Some(wire_error(e)),
            }
        }

        ClientMessage::CompletePoll {
            username,
            poll_id,
            winning_index,
        } => {
            match state
                .complete_poll(room_id, &username, &poll_id, winning_index)
                .await
            {
                Ok(_) => None,
                Err(e) => Some(wire_error(e)),
            }
        }

        ClientMessage::Leaderboard => match state.leaderboard(room_id).await {
            Ok(entries) => Some(ServerMessage::Leaderboard { entries }),
            Err(e) => Some(wire_error(e)),
        },
    }
}
