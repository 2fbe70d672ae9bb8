//! Client connection representation.
//!
//! This module defines the per-connection record kept by the
//! connection manager.

use std::net::SocketAddr;
use std::time::SystemTime;
use tokio::sync::mpsc;

/// Represents an individual client connection to the server.
/// 
/// # Fields
/// 
/// * `remote_addr` - The network address of the connected client
/// * `connected_at` - Timestamp when the connection was established
/// * `outbound` - Bounded queue drained by the connection's writer task
#[derive(Debug)]
pub struct ClientConnection {
    /// The remote network address of the client
    pub remote_addr: SocketAddr,
    
    /// When this connection was established
    pub connected_at: SystemTime,

    /// Frames waiting to be written to the socket
    pub outbound: mpsc::Sender<Vec<u8>>,
}

impl ClientConnection {
    /// Creates a new client connection with the specified remote address.
    /// 
    /// # Arguments
    /// 
    /// * `remote_addr` - The network address of the connecting client
    /// * `outbound` - Sending half of the connection's outbound queue
    pub fn new(remote_addr: SocketAddr, outbound: mpsc::Sender<Vec<u8>>) -> Self {
        Self {
            remote_addr,
            connected_at: SystemTime::now(),
            outbound,
        }
    }

    /// How long this connection has been open.
    pub fn age(&self) -> std::time::Duration {
        self.connected_at.elapsed().unwrap_or_default()
    }
}
