//! Slope race relay server
//!
//! Hosts one authoritative game state per room code and keeps every
//! connected browser in sync:
//! - WebSocket endpoint per room for join/update/start messages
//! - Full-state rebroadcast after every change
//! - Health endpoint for hosting probes

pub mod app;
pub mod config;
pub mod game;
pub mod http;
pub mod util;
pub mod ws;
