use crate::types::{PollId, Username};

/// Result type for room operations
pub type RoomResult<T> = Result<T, RoomError>;

/// Everything that can go wrong applying an operation to a room.
///
/// Every variant is recoverable and leaves room state unchanged; the
/// operation loop rejects the offending request and keeps going.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RoomError {
    #[error("{0}")]
    Validation(String),

    #[error("wrong room password")]
    WrongPassword,

    #[error("only the host can {0}")]
    Permission(String),

    #[error("host role is already held by {0}")]
    HostConflict(Username),

    #[error("{0} not found")]
    NotFound(String),

    #[error("poll {0} is closed")]
    PollClosed(PollId),

    #[error("poll {0} is already complete")]
    AlreadyComplete(PollId),
}

impl RoomError {
    /// Stable machine-readable code for the wire protocol
    pub fn code(&self) -> &'static str {
        match self {
            RoomError::Validation(_) => "invalid-input",
            RoomError::WrongPassword => "wrong-password",
            RoomError::Permission(_) => "permission-denied",
            RoomError::HostConflict(_) => "host-conflict",
            RoomError::NotFound(_) => "not-found",
            RoomError::PollClosed(_) => "poll-closed",
            RoomError::AlreadyComplete(_) => "already-complete",
        }
    }
}
