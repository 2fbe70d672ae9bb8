//! Server configuration types and defaults.
//!
//! This module contains the server configuration structure and default values
//! used to initialize and customize the room server behavior.

use std::net::SocketAddr;
use std::path::PathBuf;
use serde::{Deserialize, Serialize};

/// Configuration structure for the room server.
/// 
/// Contains all necessary parameters to configure server behavior including
/// network settings, room policy, persistence and connection limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The socket address to bind the server to
    pub bind_address: SocketAddr,
    
    /// Maximum number of concurrent connections allowed
    pub max_connections: usize,
    
    /// Idle timeout in seconds (0 to disable)
    pub connection_timeout: u64,

    /// Capacity of each connection's outbound message queue
    pub outbound_queue_size: usize,

    /// Room creation and move defaults
    pub rooms: RoomConfig,

    /// Where room records are persisted
    pub store: StoreConfig,
    
    /// Security configuration settings
    pub security: SecurityConfig,
}

/// Room policy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Length of generated room identifiers
    pub id_length: usize,

    /// Promotion piece used when a client does not specify one
    pub default_promotion: char,

    /// How many generated identifiers to try before giving up
    pub id_generation_attempts: usize,
}

/// Room store backend selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StoreConfig {
    /// Rooms live in process memory and vanish on restart
    Memory,
    /// One JSON document per room under `directory`
    File { directory: PathBuf },
}

/// Security configuration for inbound request protection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Enable rate limiting
    pub enable_rate_limiting: bool,
    
    /// Maximum requests per minute per connection
    pub max_requests_per_minute: u32,
    
    /// Maximum message size in bytes
    pub max_message_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 8080)),
            max_connections: 1000,
            connection_timeout: 600,
            outbound_queue_size: 256,
            rooms: RoomConfig::default(),
            store: StoreConfig::default(),
            security: SecurityConfig::default(),
        }
    }
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            id_length: 6,
            default_promotion: 'q',
            id_generation_attempts: 8,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Memory
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_rate_limiting: true,
            max_requests_per_minute: 120,
            max_message_size: 16 * 1024, // 16KB
        }
    }
}
