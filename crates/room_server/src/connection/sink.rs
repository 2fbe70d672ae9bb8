//! Bridges the broadcast gateway to live WebSocket connections.

use super::{manager::ConnectionManager, ConnectionId};
use crate::room::{DeliveryError, EventSink};
use std::sync::Arc;

/// [`EventSink`] that queues frames on the connection manager.
#[derive(Clone, Debug)]
pub struct ConnectionSink {
    connection_manager: Arc<ConnectionManager>,
}

impl ConnectionSink {
    pub fn new(connection_manager: Arc<ConnectionManager>) -> Self {
        Self { connection_manager }
    }
}

impl EventSink for ConnectionSink {
    fn deliver(&self, connection: ConnectionId, payload: Vec<u8>) -> Result<(), DeliveryError> {
        self.connection_manager.send_to_connection(connection, payload)
    }
}
