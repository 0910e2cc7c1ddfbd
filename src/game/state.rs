//! Authoritative room state and its wire shape

use serde::{Deserialize, Serialize};

use super::players::PlayerRegistry;

/// Player identifier, unique within a room
pub type PlayerId = String;

/// One racer as every client sees it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    pub id: PlayerId,

    // Position
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,

    // Movement
    #[serde(default)]
    pub velocity_x: f64,
    #[serde(default)]
    pub velocity_y: f64,
    #[serde(default)]
    pub is_jumping: bool,

    pub color: String,

    // Race result
    #[serde(default)]
    pub finished: bool,
    /// Elapsed race time in milliseconds, set once when the player crosses the line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_time: Option<f64>,
}

impl PlayerState {
    /// A freshly spawned racer standing still at `(x, y)`
    pub fn spawn(id: PlayerId, color: String, x: f64, y: f64) -> Self {
        Self {
            id,
            x,
            y,
            z: 0.0,
            velocity_x: 0.0,
            velocity_y: 0.0,
            is_jumping: false,
            color,
            finished: false,
            finish_time: None,
        }
    }
}

/// One sample of the track height field
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerrainPoint {
    pub x: f64,
    pub height: f64,
}

/// Full room snapshot, resent to every connection on each change
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub players: PlayerRegistry,
    pub terrain: Vec<TerrainPoint>,
    pub finish_line: f64,
    pub game_started: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_id: Option<PlayerId>,
}

impl GameState {
    /// Terrain is generated with the first join and never again
    pub fn has_terrain(&self) -> bool {
        !self.terrain.is_empty()
    }
}
