use crate::types::{Room, Username};

impl Room {
    /// Bind a transient connection to a durable username. Overwrites any
    /// prior binding for that connection id; a connection maps to exactly
    /// one username at a time. Several connections may map to the same
    /// username — multi-device use is intentional.
    pub fn register_connection(&mut self, connection_id: &str, username: &str) {
        self.connections
            .insert(connection_id.to_string(), username.to_string());
    }

    /// Drop a binding. Must run on every transport disconnect: the host
    /// presence check reads this registry, so a stale entry would keep an
    /// absent host "online". Also clears the host's connection binding when
    /// it was the host's connection, keeping the registry/host invariant.
    pub fn unregister_connection(&mut self, connection_id: &str) -> Option<Username> {
        let username = self.connections.remove(connection_id);
        self.host_disconnected(connection_id);
        username
    }

    pub fn is_connected(&self, connection_id: &str) -> bool {
        self.connections.contains_key(connection_id)
    }

    pub fn username_of(&self, connection_id: &str) -> Option<&Username> {
        self.connections.get(connection_id)
    }

    /// Distinct usernames currently connected, sorted for stable snapshots
    pub fn participants(&self) -> Vec<Username> {
        let mut names: Vec<Username> = self.connections.values().cloned().collect();
        names.sort();
        names.dedup();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_lookup() {
        let mut room = Room::new();
        room.register_connection("c1", "Alice");

        assert!(room.is_connected("c1"));
        assert_eq!(room.username_of("c1").map(String::as_str), Some("Alice"));
        assert!(!room.is_connected("c2"));
        assert_eq!(room.username_of("c2"), None);
    }

    #[test]
    fn test_register_overwrites_binding() {
        let mut room = Room::new();
        room.register_connection("c1", "Alice");
        room.register_connection("c1", "Bob");

        assert_eq!(room.username_of("c1").map(String::as_str), Some("Bob"));
        assert_eq!(room.connections.len(), 1);
    }

    #[test]
    fn test_multiple_devices_same_username() {
        let mut room = Room::new();
        room.register_connection("c1", "Alice");
        room.register_connection("c2", "Alice");

        assert!(room.is_connected("c1"));
        assert!(room.is_connected("c2"));
        assert_eq!(room.participants(), vec!["Alice".to_string()]);
    }

    #[test]
    fn test_unregister_returns_username() {
        let mut room = Room::new();
        room.register_connection("c1", "Alice");

        assert_eq!(room.unregister_connection("c1"), Some("Alice".to_string()));
        assert!(!room.is_connected("c1"));
        assert_eq!(room.unregister_connection("c1"), None);
    }
}
