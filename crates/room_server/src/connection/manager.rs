//! Connection manager for tracking and managing client connections.
//!
//! This module provides the central registry of live connections. Each
//! connection owns a bounded outbound queue; senders never wait on a slow
//! client, they fail fast when the queue is full.

use super::{client::ClientConnection, ConnectionId};
use crate::room::DeliveryError;
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info};

/// Central manager for all client connections.
/// 
/// The `ConnectionManager` tracks active connections, assigns unique IDs,
/// and queues outbound frames for each connection's writer task.
/// 
/// # Architecture
/// 
/// * Uses `DashMap` so delivery never awaits a lock
/// * Implements atomic connection ID generation
/// * One bounded `mpsc` queue per connection
#[derive(Debug)]
pub struct ConnectionManager {
    /// Map of connection ID to client connection information
    connections: DashMap<ConnectionId, ClientConnection>,
    
    /// Atomic counter for generating unique connection IDs
    next_id: AtomicUsize,

    /// Capacity of each outbound queue
    queue_capacity: usize,
}

impl ConnectionManager {
    /// Creates a new connection manager.
    /// 
    /// # Arguments
    /// 
    /// * `queue_capacity` - Outbound frames buffered per connection
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            connections: DashMap::new(),
            next_id: AtomicUsize::new(1),
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Adds a new connection and returns its unique ID.
    /// 
    /// # Arguments
    /// 
    /// * `remote_addr` - The network address of the connecting client
    /// 
    /// # Returns
    /// 
    /// The assigned `ConnectionId` and the receiving half of the
    /// connection's outbound queue.
    pub fn add_connection(&self, remote_addr: SocketAddr) -> (ConnectionId, mpsc::Receiver<Vec<u8>>) {
        let connection_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(self.queue_capacity);
        self.connections
            .insert(connection_id, ClientConnection::new(remote_addr, sender));
        info!("🔗 Connection {} from {}", connection_id, remote_addr);
        (connection_id, receiver)
    }

    /// Removes a connection from the manager.
    /// 
    /// Dropping the entry closes the outbound queue, which ends the
    /// connection's writer task.
    pub fn remove_connection(&self, connection_id: ConnectionId) {
        if let Some((_, connection)) = self.connections.remove(&connection_id) {
            info!(
                "❌ Connection {} from {} disconnected after {:?}",
                connection_id,
                connection.remote_addr,
                connection.age()
            );
        }
    }

    /// Queues a frame for a specific connection without waiting.
    /// 
    /// # Arguments
    /// 
    /// * `connection_id` - The target connection
    /// * `message` - The encoded frame
    pub fn send_to_connection(&self, connection_id: ConnectionId, message: Vec<u8>) -> Result<(), DeliveryError> {
        let connection = self
            .connections
            .get(&connection_id)
            .ok_or(DeliveryError::Disconnected)?;

        connection.outbound.try_send(message).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::QueueFull,
            TrySendError::Closed(_) => {
                debug!("Outbound queue for connection {} already closed", connection_id);
                DeliveryError::Disconnected
            }
        })
    }

    /// Gets the number of currently active connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn remote_addr(&self, connection_id: ConnectionId) -> Option<SocketAddr> {
        self.connections.get(&connection_id).map(|c| c.remote_addr)
    }
}
