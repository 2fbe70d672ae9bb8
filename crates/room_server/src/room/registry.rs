//! Session registry.
//!
//! A best-effort cache from live connection to the room it last joined.
//! Nothing here is authoritative: the room record decides who holds which
//! seat, and a missing entry is recovered by scanning the store.

use super::{Role, RoomId};
use crate::connection::ConnectionId;
use dashmap::DashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Association {
    pub room_id: RoomId,
    pub role: Role,
}

#[derive(Debug, Default)]
pub struct SessionRegistry {
    associations: DashMap<ConnectionId, Association>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records (or replaces) the room a connection is attached to.
    pub fn associate(&self, connection: ConnectionId, room_id: RoomId, role: Role) {
        self.associations.insert(connection, Association { room_id, role });
    }

    pub fn lookup(&self, connection: ConnectionId) -> Option<Association> {
        self.associations.get(&connection).map(|entry| entry.clone())
    }

    pub fn remove(&self, connection: ConnectionId) -> Option<Association> {
        self.associations.remove(&connection).map(|(_, association)| association)
    }

    pub fn len(&self) -> usize {
        self.associations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.associations.is_empty()
    }
}
