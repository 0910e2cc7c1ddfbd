//! Fan-out of serialized messages to a room's connections

use std::fmt;

use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Identity of one WebSocket connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Outbound queue of one connection; its writer task drains it into the socket
pub type Outbound = mpsc::Sender<String>;

/// Result of pushing to one connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Queued,
    /// Queue full, message dropped for this connection only
    Dropped,
    /// Writer gone, connection is shutting down
    Closed,
}

/// The set of connections attached to a room, in attach order
#[derive(Debug, Default)]
pub struct ConnectionSet {
    connections: Vec<(ConnectionId, Outbound)>,
}

impl ConnectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a connection, replacing any earlier sender for the same id
    pub fn attach(&mut self, id: ConnectionId, outbound: Outbound) {
        match self.connections.iter_mut().find(|(cid, _)| *cid == id) {
            Some(entry) => entry.1 = outbound,
            None => self.connections.push((id, outbound)),
        }
    }

    pub fn detach(&mut self, id: ConnectionId) -> bool {
        let before = self.connections.len();
        self.connections.retain(|(cid, _)| *cid != id);
        self.connections.len() != before
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Send to a single connection
    pub fn send_to<T: Serialize>(&self, id: ConnectionId, msg: &T) -> Option<Delivery> {
        let (_, outbound) = self.connections.iter().find(|(cid, _)| *cid == id)?;
        let payload = encode(msg)?;
        Some(push(id, outbound, payload))
    }

    /// Send to every connection, best effort. Returns how many queued it.
    pub fn broadcast<T: Serialize>(&self, msg: &T) -> usize {
        let Some(payload) = encode(msg) else {
            return 0;
        };

        self.connections
            .iter()
            .filter(|(id, outbound)| push(*id, outbound, payload.clone()) == Delivery::Queued)
            .count()
    }
}

fn encode<T: Serialize>(msg: &T) -> Option<String> {
    match serde_json::to_string(msg) {
        Ok(json) => Some(json),
        Err(e) => {
            error!(error = %e, "Failed to serialize outbound message");
            None
        }
    }
}

fn push(id: ConnectionId, outbound: &Outbound, payload: String) -> Delivery {
    match outbound.try_send(payload) {
        Ok(()) => Delivery::Queued,
        Err(TrySendError::Full(_)) => {
            warn!(conn_id = %id, "Outbound queue full, dropping message");
            Delivery::Dropped
        }
        Err(TrySendError::Closed(_)) => {
            debug!(conn_id = %id, "Outbound queue closed");
            Delivery::Closed
        }
    }
}
