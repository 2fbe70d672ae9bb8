//! Broadcast gateway.
//!
//! Fans room events out to every connection listed in the room record at the
//! moment of broadcast. Delivery is fire-and-forget per recipient: a full or
//! closed queue is logged and counted, never propagated.

use super::{MembershipSnapshot, Room, RoomId};
use crate::connection::ConnectionId;
use crate::stats::ServerStats;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("connection is gone")]
    Disconnected,

    #[error("outbound queue is full")]
    QueueFull,
}

/// Non-blocking per-connection delivery of encoded frames.
pub trait EventSink: Send + Sync + std::fmt::Debug {
    fn deliver(&self, connection: ConnectionId, payload: Vec<u8>) -> Result<(), DeliveryError>;
}

/// State changes pushed to everyone in a room.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomEvent {
    MembershipChanged(MembershipSnapshot),
    MoveApplied {
        room_id: RoomId,
        position: String,
        notation: String,
        ply: usize,
        is_finished: bool,
    },
    GameOver {
        room_id: RoomId,
        result: String,
    },
}

impl RoomEvent {
    pub fn name(&self) -> &'static str {
        match self {
            RoomEvent::MembershipChanged(_) => "membership_changed",
            RoomEvent::MoveApplied { .. } => "move_applied",
            RoomEvent::GameOver { .. } => "game_over",
        }
    }

    /// Encodes the event envelope sent on the wire.
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        let data = match self {
            RoomEvent::MembershipChanged(snapshot) => serde_json::to_value(snapshot)?,
            RoomEvent::MoveApplied { room_id, position, notation, ply, is_finished } => json!({
                "room_id": room_id,
                "position": position,
                "notation": notation,
                "ply": ply,
                "is_finished": is_finished,
            }),
            RoomEvent::GameOver { room_id, result } => json!({
                "room_id": room_id,
                "result": result,
            }),
        };

        serde_json::to_vec(&json!({
            "type": "event",
            "event": self.name(),
            "data": data,
        }))
    }
}

#[derive(Debug, Clone)]
pub struct BroadcastGateway {
    sink: Arc<dyn EventSink>,
    stats: Arc<ServerStats>,
}

impl BroadcastGateway {
    pub fn new(sink: Arc<dyn EventSink>, stats: Arc<ServerStats>) -> Self {
        Self { sink, stats }
    }

    /// Delivers `event` to every connection attached to `room`.
    ///
    /// Returns how many recipients accepted the frame.
    pub fn broadcast(&self, room: &Room, event: &RoomEvent) -> usize {
        let payload = match event.encode() {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Failed to encode {} for room {}: {}", event.name(), room.room_id, e);
                return 0;
            }
        };

        let recipients = room.connections();
        let mut delivered = 0;
        for connection in &recipients {
            match self.sink.deliver(*connection, payload.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    self.stats.record_delivery_dropped();
                    warn!(
                        "📭 Dropped {} for connection {} in room {}: {}",
                        event.name(),
                        connection,
                        room.room_id,
                        e
                    );
                }
            }
        }

        debug!(
            "📡 {} delivered to {}/{} connections in room {}",
            event.name(),
            delivered,
            recipients.len(),
            room.room_id
        );
        delivered
    }
}
