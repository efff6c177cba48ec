use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Opaque ID types for type safety
pub type RoomId = String;
pub type ConnectionId = String;
pub type PollId = String;
pub type Username = String;

/// Maximum display-name length after trimming
pub const MAX_USERNAME_LEN: usize = 20;

/// Points awarded for correctly guessing a poll's winning option
pub const GUESS_REWARD: u64 = 10;

/// Poll count above which archival compaction kicks in
pub const ARCHIVE_TRIGGER: usize = 25;

/// Polls retained in full after compaction
pub const ARCHIVE_KEEP: usize = 20;

/// A single participant's ballot: the option they chose and the option
/// they predict will win. Only the guess is scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub username: Username,
    pub vote_index: usize,
    pub guess_index: usize,
}

/// One question instance. Votes are at most one per username; completion
/// fixes `winning_index` exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Poll {
    pub id: PollId,
    pub question: String,
    pub options: Vec<String>,
    pub votes: Vec<Vote>,
    pub winning_index: Option<usize>,
    /// Set when the poll completes; doubles as the one-shot scoring guard
    pub completed_at: Option<String>,
}

impl Poll {
    pub fn is_complete(&self) -> bool {
        self.winning_index.is_some()
    }

    /// The recorded vote for a username, if any
    pub fn vote_of(&self, username: &str) -> Option<&Vote> {
        self.votes.iter().find(|v| v.username == username)
    }
}

/// Durable per-user tally. Created lazily on the first scored vote,
/// never deleted; both counters only ever grow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub username: Username,
    pub total: u64,
    pub polls_participated: u64,
}

/// Aggregate counters for polls compacted out of the recent-history window.
/// No per-poll detail survives archival.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArchiveStats {
    pub polls: u64,
    pub votes: u64,
}

/// Host presence, derived from the connection registry on demand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HostState {
    Unclaimed,
    ClaimedOnline,
    ClaimedOffline,
}

/// Leaderboard projection of a [`ScoreRecord`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub username: Username,
    pub total: u64,
    pub polls_participated: u64,
    pub average: f64,
}

/// One voting session: the unit of replication and the sole owner of all
/// nested polls, votes, and score records.
///
/// Invariant: a set `host_connection_id` is always a key of `connections`
/// mapping to `host_username`. When the host's connection drops, the
/// connection id is cleared but the username is retained.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Room {
    /// Set by the first joiner, immutable thereafter
    pub password: Option<String>,
    pub host_username: Option<Username>,
    pub host_connection_id: Option<ConnectionId>,
    pub host_last_seen: Option<String>,
    /// Transient connection id -> durable username
    pub connections: HashMap<ConnectionId, Username>,
    /// Recent-history window, chronological, bounded by archival
    pub polls: Vec<Poll>,
    /// Insertion order is first-appearance order, the leaderboard tie-break
    pub scores: Vec<ScoreRecord>,
    pub archive: ArchiveStats,
}

impl Room {
    pub fn new() -> Self {
        Self::default()
    }

    /// A poll in the recent-history window
    pub fn poll(&self, poll_id: &str) -> Option<&Poll> {
        self.polls.iter().find(|p| p.id == poll_id)
    }

    /// The score record for a username, if they have ever been scored
    pub fn score_of(&self, username: &str) -> Option<&ScoreRecord> {
        self.scores.iter().find(|s| s.username == username)
    }
}
