//! Configuration system
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files with `VIGIL_*` environment overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::websocket::HubConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub watcher: WatcherConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Gateway server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_connections() -> usize {
    1000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_connections: default_max_connections(),
        }
    }
}

impl ServerConfig {
    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Derive the connection hub configuration
    pub fn hub_config(&self) -> HubConfig {
        HubConfig {
            max_connections: self.max_connections,
        }
    }
}

/// Reference watcher configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WatcherConfig {
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_ms: u64,

    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_sweep_interval() -> u64 {
    1000
}

fn default_event_capacity() -> usize {
    256
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            sweep_interval_ms: default_sweep_interval(),
            event_capacity: default_event_capacity(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("vigil").join("config.toml")),
            Some(PathBuf::from("/etc/vigil/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("VIGIL_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("VIGIL_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }
        if let Ok(max) = std::env::var("VIGIL_MAX_CONNECTIONS") {
            if let Ok(m) = max.parse() {
                self.server.max_connections = m;
            }
        }

        if let Ok(interval) = std::env::var("VIGIL_SWEEP_INTERVAL_MS") {
            if let Ok(i) = interval.parse() {
                self.watcher.sweep_interval_ms = i;
            }
        }

        if let Ok(level) = std::env::var("VIGIL_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("VIGIL_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Vigil Configuration
#
# Environment variables override these settings:
# - VIGIL_HOST
# - VIGIL_PORT
# - VIGIL_MAX_CONNECTIONS
# - VIGIL_SWEEP_INTERVAL_MS
# - VIGIL_LOG_LEVEL
# - VIGIL_LOG_FORMAT

[server]
# Gateway host
host = "0.0.0.0"

# Gateway port
port = 8080

# Maximum concurrent client connections
max_connections = 1000

[watcher]
# How often the expiry sweep runs (ms)
sweep_interval_ms = 1000

# Capacity of the state-change event channel
event_capacity = 256

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
