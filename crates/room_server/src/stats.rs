//! Server-wide counters.
//!
//! Lock-free counters bumped on the request path and periodically logged by
//! the application's health loop.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct ServerStats {
    rooms_created: AtomicU64,
    joins: AtomicU64,
    moves_applied: AtomicU64,
    moves_rejected: AtomicU64,
    disconnects: AtomicU64,
    deliveries_dropped: AtomicU64,
}

/// Point-in-time copy of [`ServerStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub rooms_created: u64,
    pub joins: u64,
    pub moves_applied: u64,
    pub moves_rejected: u64,
    pub disconnects: u64,
    pub deliveries_dropped: u64,
}

impl ServerStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_room_created(&self) {
        self.rooms_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_join(&self) {
        self.joins.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_move_applied(&self) {
        self.moves_applied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_move_rejected(&self) {
        self.moves_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delivery_dropped(&self) {
        self.deliveries_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            rooms_created: self.rooms_created.load(Ordering::Relaxed),
            joins: self.joins.load(Ordering::Relaxed),
            moves_applied: self.moves_applied.load(Ordering::Relaxed),
            moves_rejected: self.moves_rejected.load(Ordering::Relaxed),
            disconnects: self.disconnects.load(Ordering::Relaxed),
            deliveries_dropped: self.deliveries_dropped.load(Ordering::Relaxed),
        }
    }
}
