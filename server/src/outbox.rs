use sketchparty_protocol::{PlayerId, ServerToClient};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::debug;

use crate::identity::{ConnectionHandle, IdentityRegistry};

/// Per-connection outbound queue; the socket writer task drains it.
pub type Outbox = mpsc::UnboundedSender<ServerToClient>;

#[derive(Debug, Default)]
pub struct Outboxes {
    by_connection: HashMap<ConnectionHandle, Outbox>,
}

impl Outboxes {
    pub fn register(&mut self, conn: ConnectionHandle, tx: Outbox) {
        self.by_connection.insert(conn, tx);
    }

    pub fn remove(&mut self, conn: ConnectionHandle) {
        self.by_connection.remove(&conn);
    }

    /// Fire and forget. A gone or closed connection is skipped.
    pub fn send(&self, conn: ConnectionHandle, msg: ServerToClient) -> bool {
        let Some(tx) = self.by_connection.get(&conn) else {
            debug!("[SEND] no outbox for {}", short(conn));
            return false;
        };
        if tx.send(msg).is_err() {
            debug!("[SEND] outbox closed for {}", short(conn));
            return false;
        }
        true
    }
}

/// Fan-out by player identity, resolved through the identity registry at
/// send time.
pub struct Broadcast<'a> {
    identities: &'a IdentityRegistry,
    outboxes: &'a Outboxes,
}

impl<'a> Broadcast<'a> {
    pub fn new(identities: &'a IdentityRegistry, outboxes: &'a Outboxes) -> Self {
        Self { identities, outboxes }
    }

    pub fn to_player(&self, id: &PlayerId, msg: ServerToClient) -> bool {
        match self.identities.resolve_connection(id) {
            Some(conn) => self.outboxes.send(conn, msg),
            None => {
                debug!("[SEND] {id} has no live connection");
                false
            }
        }
    }

    /// `targets` is a snapshot taken before the fan-out starts. Returns how
    /// many recipients the message reached.
    pub fn to_players(&self, targets: &[PlayerId], msg: ServerToClient) -> usize {
        let delivered = targets
            .iter()
            .filter(|id| self.to_player(id, msg.clone()))
            .count();
        debug!("[BROADCAST] {}/{} recipients", delivered, targets.len());
        delivered
    }
}

pub fn short(conn: ConnectionHandle) -> String {
    conn.to_string()[..8].to_string()
}
