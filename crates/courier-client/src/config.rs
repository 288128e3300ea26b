//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/courier/config.toml` by default:
//!
//! ```toml
//! debug = false
//!
//! [server]
//! host = "127.0.0.1"
//! port = 8000
//! timeout = 5
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use courier_server::{DEFAULT_HOST, DEFAULT_PORT, ServerConfig};

/// Configuration for the courier client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Debug mode.
    pub debug: bool,

    /// Server/connection settings.
    pub server: ServerSettings,
}

/// Server/connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Host the server listens on.
    pub host: String,

    /// Port the server listens on.
    pub port: u16,

    /// Timeout for every request, in seconds.
    pub timeout: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            timeout: 5,
        }
    }
}

impl ClientConfig {
    /// Loads configuration from the default path, or defaults if absent.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content =
            std::fs::read_to_string(path).map_err(|e| format!("failed to read config: {}", e))?;
        toml::from_str(&content).map_err(|e| format!("failed to parse config: {}", e))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("courier")
    }

    /// The server configuration these settings describe.
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig::new(&self.server.host, self.server.port).with_debug(self.debug)
    }
}
