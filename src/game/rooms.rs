//! Room tasks and the registry that routes connections to them

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::RoomSettings;
use crate::ws::protocol::ClientMsg;

use super::broadcast::{ConnectionId, Outbound};
use super::room::Room;

/// Attempts at attaching before giving up on a room code
const ATTACH_ATTEMPTS: usize = 3;

/// Events a room task processes, strictly in arrival order
#[derive(Debug)]
pub enum RoomCommand {
    Connect {
        conn_id: ConnectionId,
        outbound: Outbound,
        /// Fires once the connection is attached
        ack: oneshot::Sender<()>,
    },
    Message {
        conn_id: ConnectionId,
        msg: ClientMsg,
    },
    Disconnect {
        conn_id: ConnectionId,
    },
}

/// Room-level errors
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("Room {0} closed before the connection could attach")]
    Closed(String),
}

/// Handle to a running room task
#[derive(Clone, Debug)]
pub struct RoomHandle {
    /// Distinguishes successive rooms created under one code
    pub id: Uuid,
    pub code: String,
    pub commands: mpsc::Sender<RoomCommand>,
    pub connection_count: Arc<AtomicUsize>,
}

impl RoomHandle {
    pub fn connection_count(&self) -> usize {
        self.connection_count.load(Ordering::Relaxed)
    }

    /// Queue an event for the room; `false` if the room has shut down
    pub async fn send(&self, command: RoomCommand) -> bool {
        self.commands.send(command).await.is_ok()
    }
}

/// Registry of all live rooms, keyed by room code
pub struct RoomRegistry {
    rooms: DashMap<String, RoomHandle>,
    settings: RoomSettings,
    command_buffer: usize,
}

impl RoomRegistry {
    pub fn new(settings: RoomSettings, command_buffer: usize) -> Self {
        Self {
            rooms: DashMap::new(),
            settings,
            command_buffer: command_buffer.max(1),
        }
    }

    pub fn get(&self, code: &str) -> Option<RoomHandle> {
        self.rooms.get(code).map(|r| r.value().clone())
    }

    pub fn active_rooms(&self) -> usize {
        self.rooms.len()
    }

    pub fn total_connections(&self) -> usize {
        self.rooms
            .iter()
            .map(|r| r.value().connection_count())
            .sum()
    }

    /// Handle for `code`, spawning the room task on first use
    pub fn get_or_spawn(self: &Arc<Self>, code: &str) -> RoomHandle {
        self.rooms
            .entry(code.to_string())
            .or_insert_with(|| self.spawn_room(code))
            .value()
            .clone()
    }

    /// Remove `code` only if it still points at room `id`
    pub fn remove_if_current(&self, code: &str, id: Uuid) -> bool {
        self.rooms.remove_if(code, |_, h| h.id == id).is_some()
    }

    /// Attach a connection to the room for `code`, creating it if needed.
    ///
    /// A room that is being reclaimed drops pending connects; those are
    /// retried against a fresh room.
    pub async fn attach(
        self: &Arc<Self>,
        code: &str,
        conn_id: ConnectionId,
        outbound: Outbound,
    ) -> Result<RoomHandle, RoomError> {
        for attempt in 1..=ATTACH_ATTEMPTS {
            let handle = self.get_or_spawn(code);
            let (ack_tx, ack_rx) = oneshot::channel();
            let queued = handle
                .send(RoomCommand::Connect {
                    conn_id,
                    outbound: outbound.clone(),
                    ack: ack_tx,
                })
                .await;

            if queued && ack_rx.await.is_ok() {
                return Ok(handle);
            }

            debug!(room = %code, conn_id = %conn_id, attempt, "Room closed during attach, retrying");
            self.remove_if_current(code, handle.id);
        }

        warn!(room = %code, conn_id = %conn_id, "Giving up attaching to room");
        Err(RoomError::Closed(code.to_string()))
    }

    fn spawn_room(self: &Arc<Self>, code: &str) -> RoomHandle {
        let (commands, command_rx) = mpsc::channel(self.command_buffer);
        let handle = RoomHandle {
            id: Uuid::new_v4(),
            code: code.to_string(),
            commands,
            connection_count: Arc::new(AtomicUsize::new(0)),
        };

        let seed = rand::random::<u64>();
        let task = RoomTask {
            room: Room::new(code, self.settings.clone(), seed),
            handle: handle.clone(),
            commands: command_rx,
            registry: Arc::clone(self),
        };
        info!(room = %code, room_id = %handle.id, seed, "Room created");
        tokio::spawn(task.run());

        handle
    }
}

/// The task that owns one [`Room`]
struct RoomTask {
    room: Room,
    handle: RoomHandle,
    commands: mpsc::Receiver<RoomCommand>,
    registry: Arc<RoomRegistry>,
}

impl RoomTask {
    async fn run(mut self) {
        let idle_timeout = self.registry.settings.idle_timeout;
        let idle = sleep(idle_timeout);
        tokio::pin!(idle);

        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    let Some(command) = command else { break };
                    self.apply(command);
                    if !self.room.has_connections() {
                        idle.as_mut().reset(Instant::now() + idle_timeout);
                    }
                }
                _ = &mut idle, if !self.room.has_connections() => {
                    info!(room = %self.room.code(), room_id = %self.handle.id, "Room idle, reclaiming");
                    break;
                }
            }
        }

        self.registry
            .remove_if_current(self.room.code(), self.handle.id);

        // Connects still queued lose their ack and retry elsewhere
        self.commands.close();
        while let Ok(command) = self.commands.try_recv() {
            debug!(room = %self.room.code(), command = ?command, "Dropping command for reclaimed room");
        }

        info!(room = %self.room.code(), room_id = %self.handle.id, "Room closed");
    }

    fn apply(&mut self, command: RoomCommand) {
        match command {
            RoomCommand::Connect {
                conn_id,
                outbound,
                ack,
            } => {
                self.room.connect(conn_id, outbound);
                self.publish_count();
                let _ = ack.send(());
            }
            RoomCommand::Message { conn_id, msg } => {
                self.room.handle_message(conn_id, msg);
            }
            RoomCommand::Disconnect { conn_id } => {
                self.room.disconnect(conn_id);
            }
        }

        self.publish_count();
    }

    fn publish_count(&self) {
        self.handle
            .connection_count
            .store(self.room.connection_count(), Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn registry(idle_timeout: Duration) -> Arc<RoomRegistry> {
        let settings = RoomSettings {
            idle_timeout,
            ..RoomSettings::default()
        };
        Arc::new(RoomRegistry::new(settings, 16))
    }

    #[tokio::test]
    async fn same_code_shares_one_room() {
        let registry = registry(Duration::from_secs(60));
        let a = registry.get_or_spawn("ABCD");
        let b = registry.get_or_spawn("ABCD");
        let c = registry.get_or_spawn("WXYZ");

        assert_eq!(a.id, b.id);
        assert_ne!(a.id, c.id);
        assert_eq!(registry.active_rooms(), 2);
    }

    #[tokio::test]
    async fn attach_counts_connections() {
        let registry = registry(Duration::from_secs(60));
        let (tx, mut rx) = mpsc::channel(16);

        let handle = registry.attach("ROOM", ConnectionId::new(), tx).await.unwrap();
        assert_eq!(handle.connection_count(), 1);
        assert_eq!(registry.total_connections(), 1);

        let first: serde_json::Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(first["type"], "gameState");
    }

    #[tokio::test]
    async fn empty_room_is_reclaimed_after_idle_timeout() {
        let registry = registry(Duration::from_millis(20));
        let (tx, _rx) = mpsc::channel(16);
        let conn_id = ConnectionId::new();

        let handle = registry.attach("GONE", conn_id, tx).await.unwrap();
        assert!(handle.send(RoomCommand::Disconnect { conn_id }).await);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(registry.get("GONE").is_none());
        assert!(handle.commands.is_closed());
    }

    #[tokio::test]
    async fn attach_after_reclaim_gets_fresh_room() {
        let registry = registry(Duration::from_millis(20));
        let (tx, _rx) = mpsc::channel(16);
        let conn_id = ConnectionId::new();
        let old = registry.attach("AGAIN", conn_id, tx).await.unwrap();
        assert!(old.send(RoomCommand::Disconnect { conn_id }).await);
        tokio::time::sleep(Duration::from_millis(200)).await;

        let (tx, _rx) = mpsc::channel(16);
        let fresh = registry.attach("AGAIN", ConnectionId::new(), tx).await.unwrap();
        assert_ne!(fresh.id, old.id);
    }

    #[test]
    fn stale_removal_leaves_current_room() {
        let registry = RoomRegistry::new(RoomSettings::default(), 4);
        let (commands, _rx) = mpsc::channel(1);
        let handle = RoomHandle {
            id: Uuid::new_v4(),
            code: "KEEP".into(),
            commands,
            connection_count: Arc::new(AtomicUsize::new(0)),
        };
        registry.rooms.insert("KEEP".into(), handle.clone());

        assert!(!registry.remove_if_current("KEEP", Uuid::new_v4()));
        assert!(registry.remove_if_current("KEEP", handle.id));
        assert_eq!(registry.active_rooms(), 0);
    }
}
