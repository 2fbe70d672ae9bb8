//! Utility functions and helper methods for the room server.
//!
//! This module provides convenient factory functions and utilities
//! for creating server instances with different configurations.

use crate::{config::ServerConfig, server::RoomServer, store::{MemoryRoomStore, RoomStore}};
use std::sync::Arc;

/// Returns the current Unix timestamp in seconds.
///
/// Falls back to zero if the system clock reports a time before the epoch.
pub fn current_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}

/// Creates a new room server with default configuration and an in-memory store.
/// 
/// This is a convenience function for quickly setting up a server
/// for development and testing.
/// 
/// # Example
/// 
/// ```rust
/// use room_server::create_server;
/// 
/// let server = create_server();
/// ```
pub fn create_server() -> RoomServer {
    create_server_with_config(ServerConfig::default())
}

/// Creates a new room server with custom configuration and an in-memory store.
/// 
/// # Example
/// 
/// ```rust
/// use room_server::{create_server_with_config, ServerConfig};
/// 
/// let config = ServerConfig {
///     bind_address: "0.0.0.0:9000".parse().unwrap(),
///     max_connections: 5000,
///     ..Default::default()
/// };
/// 
/// let server = create_server_with_config(config);
/// ```
pub fn create_server_with_config(config: ServerConfig) -> RoomServer {
    create_server_with_store(config, Arc::new(MemoryRoomStore::new()))
}

/// Creates a new room server backed by the given room store.
pub fn create_server_with_store(config: ServerConfig, store: Arc<dyn RoomStore>) -> RoomServer {
    RoomServer::new(config, store)
}
