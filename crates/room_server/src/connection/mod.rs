//! Connection management for client connections.
//!
//! This module handles the lifecycle of client connections: id assignment,
//! per-connection outbound queues, and the sink the broadcast gateway
//! delivers room events through.

pub mod client;
pub mod manager;
pub mod sink;

pub use manager::ConnectionManager;
pub use sink::ConnectionSink;

/// Type alias for connection identifiers.
/// 
/// Connection IDs are used to uniquely identify client connections
/// throughout their lifecycle on the server.
pub type ConnectionId = usize;
