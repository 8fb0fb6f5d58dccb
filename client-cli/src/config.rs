//! Configuration for the noughts console client.
//!
//! Every value has a compile-time default that can be overridden by an
//! environment variable, which in turn is overridden by the matching
//! command-line flag.

use std::path::PathBuf;

/// Default game server address.
const DEFAULT_SERVER_ADDR: &str = "127.0.0.1:5555";

/// Player name used when neither the env nor the login name provides one.
const DEFAULT_PLAYER_NAME: &str = "player";

/// Default directory for rolling log files.
const DEFAULT_LOG_DIR: &str = "logs";

/// Resolved runtime settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub server_addr: String,
    pub player_name: String,
    pub log_dir: PathBuf,
}

impl Config {
    /// Merge CLI overrides on top of env/default values.
    pub fn resolve(
        server: Option<String>,
        name: Option<String>,
        log_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            server_addr: server.unwrap_or_else(get_server_addr),
            player_name: name.unwrap_or_else(get_player_name),
            log_dir: log_dir.unwrap_or_else(get_log_dir),
        }
    }
}

/// Get the game server address.
///
/// Priority:
/// 1. `NOUGHTS_SERVER_ADDR` env variable if set
/// 2. `127.0.0.1:5555` as fallback
pub fn get_server_addr() -> String {
    if let Ok(addr) = std::env::var("NOUGHTS_SERVER_ADDR") {
        return addr;
    }

    DEFAULT_SERVER_ADDR.to_string()
}

/// Get the player name.
///
/// Priority:
/// 1. `NOUGHTS_PLAYER_NAME` env variable if set
/// 2. `USER` env variable if set
/// 3. `player` as fallback
pub fn get_player_name() -> String {
    if let Ok(name) = std::env::var("NOUGHTS_PLAYER_NAME") {
        return name;
    }

    if let Ok(user) = std::env::var("USER") {
        if !user.trim().is_empty() {
            return user;
        }
    }

    DEFAULT_PLAYER_NAME.to_string()
}

/// Get the log directory.
///
/// Priority:
/// 1. `NOUGHTS_LOG_DIR` env variable if set
/// 2. `./logs` as fallback
pub fn get_log_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("NOUGHTS_LOG_DIR") {
        return PathBuf::from(dir);
    }

    PathBuf::from(DEFAULT_LOG_DIR)
}
