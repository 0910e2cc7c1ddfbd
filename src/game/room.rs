//! Room coordinator: owns one room's authoritative state

use std::collections::HashMap;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::RoomSettings;
use crate::util::time::Timer;
use crate::ws::protocol::{ClientMsg, ServerMsg};

use super::broadcast::{ConnectionId, ConnectionSet, Delivery, Outbound};
use super::color;
use super::state::{GameState, PlayerId, PlayerState};
use super::terrain;

/// Spawn x of the first player in an empty room
pub const FIRST_SPAWN_X: f64 = 50.0;
/// Gap between a new player and the current rightmost player
pub const SPAWN_SPACING: f64 = 60.0;
/// Spawn height
pub const GROUND_Y: f64 = 300.0;

/// What a handled message asks of the room afterwards
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Effect {
    /// Nothing observable changed
    Unchanged,
    /// Resend the full state to every connection
    BroadcastState,
}

/// One room's state plus the connections watching it.
///
/// Every method runs to completion on the room's own task, so no locking.
pub struct Room {
    code: String,
    settings: RoomSettings,
    state: GameState,
    connections: ConnectionSet,
    /// Which player each connection created with `join`
    bindings: HashMap<ConnectionId, PlayerId>,
    rng: ChaCha8Rng,
    /// Running since the first `startGame`
    race_clock: Option<Timer>,
}

impl Room {
    pub fn new(code: impl Into<String>, settings: RoomSettings, seed: u64) -> Self {
        Self {
            code: code.into(),
            settings,
            state: GameState::default(),
            connections: ConnectionSet::new(),
            bindings: HashMap::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            race_clock: None,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn has_connections(&self) -> bool {
        !self.connections.is_empty()
    }

    /// Player created by `conn`, if it has joined
    pub fn player_for(&self, conn: ConnectionId) -> Option<&PlayerId> {
        self.bindings.get(&conn)
    }

    /// Attach a connection: it gets the current snapshot, everyone gets the new count
    pub fn connect(&mut self, conn: ConnectionId, outbound: Outbound) {
        self.connections.attach(conn, outbound);
        info!(
            room = %self.code,
            conn_id = %conn,
            connections = self.connections.len(),
            "Connection attached"
        );

        self.connections.send_to(conn, &self.snapshot());
        self.broadcast_count();
    }

    /// Apply one inbound message and broadcast if it changed the state
    pub fn handle_message(&mut self, conn: ConnectionId, msg: ClientMsg) {
        let effect = match msg {
            ClientMsg::Join {
                player_id,
                player_color,
            } => self.join(conn, player_id, player_color),
            ClientMsg::UpdatePlayer { player } => self.update_player(player),
            ClientMsg::StartGame => self.start_game(conn),
        };

        if effect == Effect::BroadcastState {
            self.broadcast_state();
        }
    }

    /// Create a player for `conn` with a server-assigned id and color
    pub fn join(
        &mut self,
        conn: ConnectionId,
        requested_id: Option<String>,
        requested_color: Option<String>,
    ) -> Effect {
        if let Some(existing) = self.bindings.get(&conn) {
            warn!(room = %self.code, conn_id = %conn, player_id = %existing, "Connection already joined");
            self.reply_joined(conn, existing.clone());
            return Effect::Unchanged;
        }

        if requested_id.is_some() || requested_color.is_some() {
            debug!(
                room = %self.code,
                conn_id = %conn,
                requested_id = ?requested_id,
                requested_color = ?requested_color,
                "Ignoring client-requested identity"
            );
        }

        let id = self.fresh_player_id();
        let players = &self.state.players;
        let color = color::assign(
            &mut self.rng,
            |c| players.color_in_use(c),
            self.settings.color_retry_limit,
        );
        let x = players
            .max_x()
            .map_or(FIRST_SPAWN_X, |rightmost| rightmost + SPAWN_SPACING);

        self.state
            .players
            .upsert(PlayerState::spawn(id.clone(), color, x, GROUND_Y));
        self.bindings.insert(conn, id.clone());

        if self.state.host_id.is_none() {
            info!(room = %self.code, player_id = %id, "Host assigned");
            self.state.host_id = Some(id.clone());
        }
        if !self.state.has_terrain() {
            self.generate_terrain();
        }

        info!(
            room = %self.code,
            conn_id = %conn,
            player_id = %id,
            spawn_x = x,
            players = self.state.players.len(),
            "Player joined"
        );

        self.reply_joined(conn, id);
        Effect::BroadcastState
    }

    /// Replace a known player's state. Unknown ids are dropped silently.
    pub fn update_player(&mut self, mut player: PlayerState) -> Effect {
        let Some(stored) = self.state.players.get(&player.id) else {
            debug!(room = %self.code, player_id = %player.id, "Update for unknown player ignored");
            return Effect::Unchanged;
        };

        let was_finished = stored.finished;
        if was_finished {
            // finish is sticky and its time is written once
            player.finished = true;
            player.finish_time = stored.finish_time;
        } else {
            // only crossing the line during the race finishes a player
            player.finished = self.state.game_started && player.x >= self.state.finish_line;
            player.finish_time = if player.finished {
                let reported = player
                    .finish_time
                    .filter(|t| t.is_finite() && *t >= 0.0);
                Some(reported.unwrap_or_else(|| self.race_elapsed_ms()))
            } else {
                None
            };
        }

        let crossed = (!was_finished && player.finished)
            .then(|| (player.id.clone(), player.finish_time.unwrap_or_default()));
        self.state.players.upsert(player);

        if let Some((player_id, time)) = crossed {
            info!(room = %self.code, player_id = %player_id, time_ms = time, "Player finished");
            self.connections
                .broadcast(&ServerMsg::PlayerFinished { player_id, time });
        }
        Effect::BroadcastState
    }

    /// Any connection may start the race; the host check is client-side only
    pub fn start_game(&mut self, conn: ConnectionId) -> Effect {
        let from_host =
            self.state.host_id.is_some() && self.bindings.get(&conn) == self.state.host_id.as_ref();
        if !self.state.game_started {
            self.race_clock = Some(Timer::new());
            info!(room = %self.code, conn_id = %conn, from_host, "Race started");
        } else {
            debug!(room = %self.code, conn_id = %conn, "Race already started");
        }
        self.state.game_started = true;
        Effect::BroadcastState
    }

    /// Detach a connection, drop its player and hand host on if needed
    pub fn disconnect(&mut self, conn: ConnectionId) {
        if !self.connections.detach(conn) {
            debug!(room = %self.code, conn_id = %conn, "Disconnect for unknown connection");
            return;
        }

        if let Some(player_id) = self.bindings.remove(&conn) {
            self.state.players.remove(&player_id);
            info!(room = %self.code, conn_id = %conn, player_id = %player_id, "Player left");
        }

        let host_gone = self
            .state
            .host_id
            .as_ref()
            .is_some_and(|host| !self.state.players.contains(host));
        if host_gone {
            self.state.host_id = self.state.players.first_id().cloned();
            info!(room = %self.code, new_host = ?self.state.host_id, "Host reassigned");
        }

        info!(
            room = %self.code,
            conn_id = %conn,
            connections = self.connections.len(),
            "Connection detached"
        );
        self.broadcast_count();
        self.broadcast_state();
    }

    fn generate_terrain(&mut self) {
        let params = self.settings.terrain;
        self.state.terrain = terrain::generate(&params);
        self.state.finish_line = params.finish_line();
        info!(
            room = %self.code,
            samples = self.state.terrain.len(),
            finish_line = self.state.finish_line,
            "Terrain generated"
        );
    }

    fn fresh_player_id(&self) -> PlayerId {
        loop {
            let id = format!("player_{}", &Uuid::new_v4().simple().to_string()[..12]);
            if !self.state.players.contains(&id) {
                return id;
            }
        }
    }

    /// Tell `conn` which player it controls. Returns whether the reply was queued.
    fn reply_joined(&self, conn: ConnectionId, player_id: PlayerId) -> bool {
        let delivery = self.connections.send_to(
            conn,
            &ServerMsg::Joined {
                player_id: player_id.clone(),
            },
        );
        if delivery == Some(Delivery::Queued) {
            return true;
        }
        warn!(
            room = %self.code,
            conn_id = %conn,
            player_id = %player_id,
            delivery = ?delivery,
            "Joined reply not delivered"
        );
        false
    }

    fn race_elapsed_ms(&self) -> f64 {
        self.race_clock
            .as_ref()
            .map_or(0.0, |clock| clock.elapsed_ms() as f64)
    }

    fn snapshot(&self) -> ServerMsg {
        ServerMsg::GameState {
            state: self.state.clone(),
        }
    }

    fn broadcast_state(&self) {
        let delivered = self.connections.broadcast(&self.snapshot());
        debug!(room = %self.code, delivered, "State broadcast");
    }

    fn broadcast_count(&self) {
        self.connections.broadcast(&ServerMsg::PlayerCount {
            count: self.connections.len(),
        });
    }
}
