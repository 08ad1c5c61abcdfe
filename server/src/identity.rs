use sketchparty_protocol::PlayerId;
use std::collections::HashMap;
use uuid::Uuid;

/// Transport-assigned handle, minted per socket.
pub type ConnectionHandle = Uuid;

/// Two-way map between live connections and durable player identities.
///
/// An identity can move to a new connection (reconnect); the older
/// connection then loses its binding so a late close of the superseded
/// socket cannot tear the player down.
#[derive(Debug, Default)]
pub struct IdentityRegistry {
    by_connection: HashMap<ConnectionHandle, PlayerId>,
    by_identity: HashMap<PlayerId, ConnectionHandle>,
}

impl IdentityRegistry {
    pub fn bind(&mut self, conn: ConnectionHandle, id: PlayerId) {
        if let Some(prev_id) = self.by_connection.insert(conn, id.clone()) {
            if prev_id != id && self.by_identity.get(&prev_id) == Some(&conn) {
                self.by_identity.remove(&prev_id);
            }
        }
        if let Some(prev_conn) = self.by_identity.insert(id, conn) {
            if prev_conn != conn {
                self.by_connection.remove(&prev_conn);
            }
        }
    }

    /// Unbound connections resolve to their own handle string, and may host
    /// or join lobbies under it.
    pub fn resolve_identity(&self, conn: ConnectionHandle) -> PlayerId {
        self.by_connection
            .get(&conn)
            .cloned()
            .unwrap_or_else(|| PlayerId(conn.to_string()))
    }

    pub fn resolve_connection(&self, id: &PlayerId) -> Option<ConnectionHandle> {
        self.by_identity
            .get(id)
            .copied()
            .or_else(|| self.handle_identity(id))
    }

    /// Reverse of the `resolve_identity` fallback: `id` is the handle string
    /// of a connection that is not bound to anything.
    fn handle_identity(&self, id: &PlayerId) -> Option<ConnectionHandle> {
        let conn = Uuid::parse_str(id.as_str()).ok()?;
        (conn.to_string() == id.as_str() && !self.by_connection.contains_key(&conn)).then_some(conn)
    }

    pub fn unbind(&mut self, conn: ConnectionHandle) -> Option<PlayerId> {
        let id = self.by_connection.remove(&conn)?;
        if self.by_identity.get(&id) == Some(&conn) {
            self.by_identity.remove(&id);
        }
        Some(id)
    }

    pub fn unbind_identity(&mut self, id: &PlayerId) -> Option<ConnectionHandle> {
        let Some(conn) = self.by_identity.remove(id) else {
            return self.handle_identity(id);
        };
        if self.by_connection.get(&conn) == Some(id) {
            self.by_connection.remove(&conn);
        }
        Some(conn)
    }

    pub fn is_bound(&self, conn: ConnectionHandle) -> bool {
        self.by_connection.contains_key(&conn)
    }
}
