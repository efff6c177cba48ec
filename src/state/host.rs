use crate::error::{RoomError, RoomResult};
use crate::types::{HostState, Room};

impl Room {
    /// Current host state, derived from the registry on every call
    pub fn host_state(&self) -> HostState {
        match &self.host_username {
            None => HostState::Unclaimed,
            Some(_) if self.is_host_online() => HostState::ClaimedOnline,
            Some(_) => HostState::ClaimedOffline,
        }
    }

    /// True iff the host's bound connection is currently registered.
    /// Computed fresh on each call, never cached: a dropped connection must
    /// be reflected immediately.
    pub fn is_host_online(&self) -> bool {
        self.host_connection_id
            .as_deref()
            .is_some_and(|c| self.connections.contains_key(c))
    }

    /// Host-gated authorization check. Authority is bound to the durable
    /// username, not to connection liveness: a temporarily offline host
    /// retains all permissions.
    pub fn authorize(&self, username: &str) -> bool {
        self.host_username.as_deref() == Some(username)
    }

    /// Take the host role. Fails with `HostConflict` if a different username
    /// already holds it; a claim by the current holder rebinds the
    /// connection like a reconnect.
    pub fn claim_host(&mut self, username: &str, connection_id: &str) -> RoomResult<()> {
        if let Some(current) = &self.host_username {
            if current != username {
                return Err(RoomError::HostConflict(current.clone()));
            }
        }
        self.bind_host(username, connection_id);
        Ok(())
    }

    /// Rebind the host role to a newly joined connection. Fires on every
    /// successful join by the host's username; idempotent and
    /// order-independent across the host's devices — the most recently
    /// joined device wins the binding.
    pub fn reconnect_host(&mut self, username: &str, connection_id: &str) {
        self.bind_host(username, connection_id);
    }

    /// Transport disconnect notice. Host identity is durable across
    /// disconnects: only the connection binding is dropped.
    pub fn host_disconnected(&mut self, connection_id: &str) {
        if self.host_connection_id.as_deref() == Some(connection_id) {
            self.host_connection_id = None;
        }
    }

    /// Hand the role to a currently connected username. Only the current
    /// host may transfer; the new host's binding lands ClaimedOnline.
    pub fn transfer_host(&mut self, requesting: &str, new_host: &str) -> RoomResult<()> {
        if !self.authorize(requesting) {
            return Err(RoomError::Permission("transfer the host role".into()));
        }
        let connection_id = self
            .connections
            .iter()
            .find_map(|(id, name)| (name.as_str() == new_host).then(|| id.clone()))
            .ok_or_else(|| RoomError::NotFound(format!("active connection for {new_host}")))?;
        self.bind_host(new_host, &connection_id);
        Ok(())
    }

    fn bind_host(&mut self, username: &str, connection_id: &str) {
        self.host_username = Some(username.to_string());
        self.host_connection_id = Some(connection_id.to_string());
        self.host_last_seen = Some(chrono::Utc::now().to_rfc3339());
    }
}
