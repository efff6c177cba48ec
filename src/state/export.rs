//! Room snapshot export/import for backup and restoration during live
//! sessions. The persisted layout is the Room aggregate serialized as a
//! single JSON document per room.

use crate::error::{RoomError, RoomResult};
use crate::protocol::ServerMessage;
use crate::state::AppState;
use crate::types::Room;
use serde::{Deserialize, Serialize};

/// Schema version for export format compatibility
pub const EXPORT_SCHEMA_VERSION: u32 = 1;

/// A serializable snapshot of one room.
///
/// Transient identity (the connection registry and the host's connection
/// binding) is carried in the document but discarded on import: sockets do
/// not survive a restore, so connections re-register by rejoining and the
/// host rebinds through the automatic reconnect path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomExport {
    pub schema_version: u32,
    /// Export timestamp (ISO8601)
    pub exported_at: String,
    pub room: Room,
}

impl AppState {
    /// Snapshot a room as a single document
    pub async fn export_room(&self, room_id: &str) -> Option<RoomExport> {
        let rooms = self.rooms.read().await;
        rooms.get(room_id).map(|room| RoomExport {
            schema_version: EXPORT_SCHEMA_VERSION,
            exported_at: chrono::Utc::now().to_rfc3339(),
            room: room.clone(),
        })
    }

    /// Replace a room's state with an imported snapshot and broadcast the
    /// restored leaderboard to anyone already listening.
    pub async fn import_room(&self, room_id: &str, export: RoomExport) -> RoomResult<()> {
        if export.schema_version != EXPORT_SCHEMA_VERSION {
            return Err(RoomError::Validation(format!(
                "unsupported export schema version {}",
                export.schema_version
            )));
        }

        let mut room = export.room;
        room.connections.clear();
        room.host_connection_id = None;

        let entries = room.leaderboard();
        self.rooms.write().await.insert(room_id.to_string(), room);

        tracing::info!(room = room_id, "imported room snapshot");
        self.publish(room_id, ServerMessage::Leaderboard { entries }).await;
        Ok(())
    }
}
