//! Room state, its coordinator and the tasks that host rooms

pub mod broadcast;
pub mod color;
pub mod players;
pub mod room;
pub mod rooms;
pub mod state;
pub mod terrain;

pub use broadcast::{ConnectionId, ConnectionSet, Outbound};
pub use players::PlayerRegistry;
pub use room::{Effect, Room};
pub use rooms::{RoomCommand, RoomError, RoomHandle, RoomRegistry};
pub use state::{GameState, PlayerId, PlayerState, TerrainPoint};
pub use terrain::TerrainParams;
