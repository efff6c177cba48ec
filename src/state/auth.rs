use crate::error::{RoomError, RoomResult};
use crate::types::{Room, Username, MAX_USERNAME_LEN};

/// Validate and normalize a display name: trimmed, non-empty, bounded.
pub fn validate_username(raw: &str) -> RoomResult<Username> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(RoomError::Validation("username must not be empty".into()));
    }
    if name.chars().count() > MAX_USERNAME_LEN {
        return Err(RoomError::Validation(format!(
            "username must be at most {MAX_USERNAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

impl Room {
    /// Admit or reject a join attempt against the room password.
    ///
    /// The first joiner's password becomes the room password — that is room
    /// creation. Returns the normalized username on success. No side effects
    /// beyond password initialization; the connection registry is untouched.
    pub fn authenticate(&mut self, candidate_password: &str, username: &str) -> RoomResult<Username> {
        let username = validate_username(username)?;
        match &self.password {
            None => {
                self.password = Some(candidate_password.to_string());
                Ok(username)
            }
            Some(stored) if stored == candidate_password => Ok(username),
            Some(_) => Err(RoomError::WrongPassword),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_join_sets_password() {
        let mut room = Room::new();
        assert!(room.password.is_none());

        let name = room.authenticate("pw1", "Alice").unwrap();
        assert_eq!(name, "Alice");
        assert_eq!(room.password.as_deref(), Some("pw1"));
    }

    #[test]
    fn test_wrong_password_rejected() {
        let mut room = Room::new();
        room.authenticate("pw1", "Alice").unwrap();

        let err = room.authenticate("pw2", "Bob").unwrap_err();
        assert_eq!(err, RoomError::WrongPassword);
        assert_eq!(err.code(), "wrong-password");
        // Password unchanged by the failed attempt
        assert_eq!(room.password.as_deref(), Some("pw1"));

        assert!(room.authenticate("pw1", "Bob").is_ok());
    }

    #[test]
    fn test_username_trimmed() {
        let mut room = Room::new();
        let name = room.authenticate("pw", "  Alice  ").unwrap();
        assert_eq!(name, "Alice");
    }

    #[test]
    fn test_empty_username_rejected_before_password_init() {
        let mut room = Room::new();
        let err = room.authenticate("pw", "   ").unwrap_err();
        assert!(matches!(err, RoomError::Validation(_)));
        // Validation failure must not create the room password
        assert!(room.password.is_none());
    }

    #[test]
    fn test_overlong_username_rejected() {
        let mut room = Room::new();
        let err = room.authenticate("pw", "abcdefghijklmnopqrstu").unwrap_err();
        assert!(matches!(err, RoomError::Validation(_)));

        // Exactly at the bound is fine
        assert!(room.authenticate("pw", "abcdefghijklmnopqrst").is_ok());
    }
}
