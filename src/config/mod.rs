//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::game::TerrainParams;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Allowed client origins for CORS, comma-separated or `*`
    pub client_origin: String,

    /// Per-room behaviour
    pub room: RoomSettings,
    /// Bounded queue depth for a room's command channel
    pub room_command_buffer: usize,
    /// Max text frames per second accepted from one connection
    pub input_rate_limit: u32,
}

/// Settings shared by every room the process hosts
#[derive(Clone, Debug)]
pub struct RoomSettings {
    /// How long a room with no connections lives before it is reclaimed
    pub idle_timeout: Duration,
    /// Outbound queue depth per connection; a full queue drops broadcasts
    pub connection_buffer: usize,
    /// Max candidate draws per color source during join
    pub color_retry_limit: usize,
    /// Terrain generation constants
    pub terrain: TerrainParams,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(60),
            connection_buffer: 64,
            color_retry_limit: 32,
            terrain: TerrainParams::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        };

        let defaults = RoomSettings::default();
        let terrain = TerrainParams {
            width: parse_or("TERRAIN_WIDTH", defaults.terrain.width)?,
            segments: parse_or("TERRAIN_SEGMENTS", defaults.terrain.segments)?,
            finish_fraction: parse_or("FINISH_FRACTION", defaults.terrain.finish_fraction)?,
        };
        validate_terrain(&terrain)?;

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            client_origin: env::var("CLIENT_ORIGIN").unwrap_or_else(|_| "*".to_string()),

            room: RoomSettings {
                idle_timeout: Duration::from_secs(parse_or(
                    "ROOM_IDLE_TIMEOUT_SECS",
                    defaults.idle_timeout.as_secs(),
                )?),
                connection_buffer: parse_or("CONNECTION_BUFFER", defaults.connection_buffer)?
                    .max(1),
                color_retry_limit: parse_or("COLOR_RETRY_LIMIT", defaults.color_retry_limit)?,
                terrain,
            },
            room_command_buffer: parse_or("ROOM_COMMAND_BUFFER", 256usize)?.max(1),
            input_rate_limit: parse_or("INPUT_RATE_LIMIT", 120u32)?,
        })
    }
}

/// Reject track shapes the generator cannot produce a usable course from
fn validate_terrain(terrain: &TerrainParams) -> Result<(), ConfigError> {
    if terrain.segments == 0 {
        return Err(ConfigError::Invalid {
            var: "TERRAIN_SEGMENTS",
            value: terrain.segments.to_string(),
        });
    }
    // negated comparisons also reject NaN
    if !(terrain.width > 0.0) {
        return Err(ConfigError::Invalid {
            var: "TERRAIN_WIDTH",
            value: terrain.width.to_string(),
        });
    }
    if !(terrain.finish_fraction > 0.0 && terrain.finish_fraction <= 1.0) {
        return Err(ConfigError::Invalid {
            var: "FINISH_FRACTION",
            value: terrain.finish_fraction.to_string(),
        });
    }
    Ok(())
}

/// Read an optional variable, falling back to `default` when unset
fn parse_or<T: FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {var}: {value:?}")]
    Invalid { var: &'static str, value: String },

    #[error("Invalid server address format")]
    InvalidAddress,
}
