use crate::types::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Must be the first message on a socket; drives authentication,
    /// registration and (for the host's username) the automatic rebind.
    Join {
        username: String,
        password: String,
    },
    ClaimHost {
        username: Username,
    },
    TransferHost {
        requesting_username: Username,
        new_username: Username,
    },
    AddQuestion {
        username: Username,
        question: String,
        options: Vec<String>,
    },
    SubmitVote {
        username: Username,
        poll_id: PollId,
        vote_index: usize,
        guess_index: usize,
    },
    CompletePoll {
        username: Username,
        poll_id: PollId,
        winning_index: usize,
    },
    Leaderboard,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Sent to the joining connection only
    Welcome {
        room: RoomView,
        username: Username,
        connection_id: ConnectionId,
    },
    Joined {
        username: Username,
        connection_id: ConnectionId,
    },
    HostReconnected {
        username: Username,
    },
    HostChanged {
        host: Username,
    },
    HostTransferred {
        previous_host: Username,
        new_host: Username,
    },
    QuestionAdded {
        poll: PollInfo,
    },
    VoteRecorded {
        poll_id: PollId,
        username: Username,
    },
    PollComplete {
        poll_id: PollId,
        winning_index: usize,
    },
    Leaderboard {
        entries: Vec<LeaderboardEntry>,
    },
    HostOffline {
        username: Username,
    },
    PeerLeft {
        username: Username,
        connection_id: ConnectionId,
    },
    Error {
        code: String,
        msg: String,
    },
}

/// Public poll projection: vote tallies without per-voter guesses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollInfo {
    pub id: PollId,
    pub question: String,
    pub options: Vec<String>,
    pub vote_count: usize,
    pub winning_index: Option<usize>,
    pub is_complete: bool,
}

impl From<&Poll> for PollInfo {
    fn from(p: &Poll) -> Self {
        Self {
            id: p.id.clone(),
            question: p.question.clone(),
            options: p.options.clone(),
            vote_count: p.votes.len(),
            winning_index: p.winning_index,
            is_complete: p.is_complete(),
        }
    }
}

/// Read-only room snapshot handed to a connection right after it joins
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomView {
    pub host_username: Option<Username>,
    pub host_online: bool,
    pub participants: Vec<Username>,
    pub polls: Vec<PollInfo>,
    pub leaderboard: Vec<LeaderboardEntry>,
    pub archived_polls: u64,
}

impl From<&Room> for RoomView {
    fn from(room: &Room) -> Self {
        Self {
            host_username: room.host_username.clone(),
            host_online: room.is_host_online(),
            participants: room.participants(),
            polls: room.polls.iter().map(PollInfo::from).collect(),
            leaderboard: room.leaderboard(),
            archived_polls: room.archive.polls,
        }
    }
}
