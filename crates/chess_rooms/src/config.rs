//! Configuration management for the chess room server.
//!
//! This module handles loading, validation, and conversion of server configuration
//! from TOML files and command-line arguments.

use crate::cli::CliArgs;
use room_server::{RoomConfig, SecurityConfig, ServerConfig, StoreConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Application configuration loaded from TOML file.
///
/// This is the main configuration structure that encompasses all server settings
/// including networking, room policy, persistence and logging.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration settings
    pub server: ServerSettings,
    /// Room creation and move defaults
    #[serde(default)]
    pub rooms: RoomSettings,
    /// Room persistence settings
    #[serde(default)]
    pub store: StoreSettings,
    /// Inbound request limits
    #[serde(default)]
    pub security: SecuritySettings,
    /// Logging configuration settings
    pub logging: LoggingSettings,
}

/// Server-specific configuration settings.
/// 
/// Controls network binding, connection limits and timeouts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Network address to bind the server to (e.g., "127.0.0.1:8080")
    pub bind_address: String,
    /// Maximum number of concurrent client connections
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Idle connection timeout in seconds (0 to disable)
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout: u64,
    /// Frames buffered per connection before deliveries are dropped
    #[serde(default = "default_outbound_queue_size")]
    pub outbound_queue_size: usize,
}

/// Default for connection_timeout
pub fn default_connection_timeout() -> u64 {
    600
}

/// Default for max_connections
fn default_max_connections() -> usize {
    1000
}

fn default_outbound_queue_size() -> usize { 256 }
fn default_id_length() -> usize { 6 }
fn default_promotion() -> String { "q".to_string() }
fn default_id_generation_attempts() -> usize { 8 }
fn default_store_backend() -> String { "memory".to_string() }
fn default_store_directory() -> String { "data/rooms".to_string() }
fn default_enable_rate_limiting() -> bool { true }
fn default_max_requests_per_minute() -> u32 { 120 }
fn default_max_message_size() -> usize { 16 * 1024 }

/// Room policy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSettings {
    /// Length of generated room identifiers
    #[serde(default = "default_id_length")]
    pub id_length: usize,
    /// Promotion piece used when a client does not name one (q, r, b or n)
    #[serde(default = "default_promotion")]
    pub default_promotion: String,
    /// Attempts at a fresh generated id before giving up
    #[serde(default = "default_id_generation_attempts")]
    pub id_generation_attempts: usize,
}

/// Room persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// "memory" or "file"
    #[serde(default = "default_store_backend")]
    pub backend: String,
    /// Data directory used by the file backend
    #[serde(default = "default_store_directory")]
    pub directory: String,
}

/// Inbound request limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecuritySettings {
    #[serde(default = "default_enable_rate_limiting")]
    pub enable_rate_limiting: bool,
    #[serde(default = "default_max_requests_per_minute")]
    pub max_requests_per_minute: u32,
    /// Largest accepted frame in bytes
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
}

/// Logging system configuration.
///
/// Controls log output format and level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to output logs in JSON format
    pub json_format: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            max_connections: default_max_connections(),
            connection_timeout: default_connection_timeout(),
            outbound_queue_size: default_outbound_queue_size(),
        }
    }
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            id_length: default_id_length(),
            default_promotion: default_promotion(),
            id_generation_attempts: default_id_generation_attempts(),
        }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            directory: default_store_directory(),
        }
    }
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            enable_rate_limiting: default_enable_rate_limiting(),
            max_requests_per_minute: default_max_requests_per_minute(),
            max_message_size: default_max_message_size(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    /// 
    /// If the file doesn't exist, creates a default configuration file at the specified path
    /// and returns the default configuration.
    /// 
    /// # Arguments
    /// 
    /// * `path` - Path to the configuration file
    /// 
    /// # Returns
    /// 
    /// The loaded or default configuration, or an error if loading/creation failed.
    pub async fn load_from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            // Create default config file
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Applies command-line overrides on top of the file configuration.
    ///
    /// `--data-dir` implies the file backend.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(bind_address) = &args.bind_address {
            self.server.bind_address = bind_address.clone();
        }
        if let Some(data_dir) = &args.data_dir {
            self.store.backend = "file".to_string();
            self.store.directory = data_dir.display().to_string();
        }
        if let Some(log_level) = &args.log_level {
            self.logging.level = log_level.clone();
        }
        if args.json_logs {
            self.logging.json_format = true;
        }
    }

    /// Converts the application configuration to a room server configuration.
    ///
    /// # Returns
    ///
    /// A `ServerConfig` instance ready for use with the room server.
    pub fn to_server_config(&self) -> Result<ServerConfig, Box<dyn std::error::Error>> {
        let store = match self.store.backend.as_str() {
            "memory" => StoreConfig::Memory,
            "file" => StoreConfig::File {
                directory: PathBuf::from(&self.store.directory),
            },
            other => return Err(format!("Unknown store backend: {other}").into()),
        };

        let default_promotion = self
            .rooms
            .default_promotion
            .chars()
            .next()
            .ok_or("rooms.default_promotion cannot be empty")?;

        Ok(ServerConfig {
            bind_address: self.server.bind_address.parse()?,
            max_connections: self.server.max_connections,
            connection_timeout: self.server.connection_timeout,
            outbound_queue_size: self.server.outbound_queue_size,
            rooms: RoomConfig {
                id_length: self.rooms.id_length,
                default_promotion,
                id_generation_attempts: self.rooms.id_generation_attempts,
            },
            store,
            security: SecurityConfig {
                enable_rate_limiting: self.security.enable_rate_limiting,
                max_requests_per_minute: self.security.max_requests_per_minute,
                max_message_size: self.security.max_message_size,
            },
        })
    }

    /// Validates the configuration for consistency and correctness.
    /// 
    /// # Returns
    /// 
    /// `Ok(())` if the configuration is valid, or an error string describing the issue.
    pub fn validate(&self) -> Result<(), String> {
        // Validate bind address
        if self.server.bind_address.parse::<std::net::SocketAddr>().is_err() {
            return Err(format!(
                "Invalid bind address: {}",
                &self.server.bind_address
            ));
        }

        if self.server.max_connections == 0 {
            return Err("server.max_connections must be greater than 0".to_string());
        }

        if self.server.outbound_queue_size == 0 {
            return Err("server.outbound_queue_size must be greater than 0".to_string());
        }

        if !(4..=32).contains(&self.rooms.id_length) {
            return Err(format!(
                "rooms.id_length must be between 4 and 32, got {}",
                self.rooms.id_length
            ));
        }

        if !matches!(self.rooms.default_promotion.as_str(), "q" | "r" | "b" | "n") {
            return Err(format!(
                "rooms.default_promotion must be one of q, r, b, n, got {:?}",
                self.rooms.default_promotion
            ));
        }

        if self.rooms.id_generation_attempts == 0 {
            return Err("rooms.id_generation_attempts must be greater than 0".to_string());
        }

        match self.store.backend.as_str() {
            "memory" => {}
            "file" => {
                if self.store.directory.trim().is_empty() {
                    return Err("store.directory cannot be empty for the file backend".to_string());
                }
            }
            other => {
                return Err(format!("Invalid store backend: {other}. Must be \"memory\" or \"file\""));
            }
        }

        if self.security.max_message_size == 0 {
            return Err("security.max_message_size must be greater than 0".to_string());
        }

        // Validate log level
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        Ok(())
    }
}
