use super::{RoomStore, StoreError};
use crate::room::{Room, RoomId};
use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};

/// In-process room store. Contents are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryRoomStore {
    rooms: DashMap<RoomId, Room>,
}

impl MemoryRoomStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

#[async_trait]
impl RoomStore for MemoryRoomStore {
    async fn insert(&self, room: &Room) -> Result<(), StoreError> {
        match self.rooms.entry(room.room_id.clone()) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists(room.room_id.clone())),
            Entry::Vacant(slot) => {
                slot.insert(room.clone());
                Ok(())
            }
        }
    }

    async fn load(&self, room_id: &RoomId) -> Result<Option<Room>, StoreError> {
        Ok(self.rooms.get(room_id).map(|room| room.clone()))
    }

    async fn save(&self, room: &Room) -> Result<(), StoreError> {
        self.rooms.insert(room.room_id.clone(), room.clone());
        Ok(())
    }

    async fn room_ids(&self) -> Result<Vec<RoomId>, StoreError> {
        Ok(self.rooms.iter().map(|entry| entry.key().clone()).collect())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
