//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::RoomRegistry;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub rooms: Arc<RoomRegistry>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);

        // Rooms are spawned lazily as connections arrive
        let rooms = Arc::new(RoomRegistry::new(
            config.room.clone(),
            config.room_command_buffer,
        ));

        Self { config, rooms }
    }
}
