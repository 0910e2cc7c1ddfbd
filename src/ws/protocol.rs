//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};

use crate::game::{GameState, PlayerId, PlayerState};

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMsg {
    /// Request a player in the room. Identity is always assigned by the
    /// server; requested values are accepted on the wire and ignored.
    #[serde(rename_all = "camelCase")]
    Join {
        #[serde(default)]
        player_id: Option<String>,
        #[serde(default)]
        player_color: Option<String>,
    },

    /// Replace the stored state of `player.id`
    #[serde(alias = "playerUpdate")]
    UpdatePlayer { player: PlayerState },

    /// Start the race
    StartGame,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMsg {
    /// Identity assigned to the joining connection
    #[serde(rename_all = "camelCase")]
    Joined { player_id: PlayerId },

    /// Full room snapshot
    GameState { state: GameState },

    /// Current number of connections in the room
    PlayerCount { count: usize },

    /// A player crossed the finish line
    #[serde(rename_all = "camelCase")]
    PlayerFinished { player_id: PlayerId, time: f64 },
}
