//! Durable storage for room records.
//!
//! The store is the single source of truth for room state. Every record is
//! written and read as a whole; callers serialize access per room.

mod file;
mod memory;

pub use file::FileRoomStore;
pub use memory::MemoryRoomStore;

use crate::config::StoreConfig;
use crate::room::{Room, RoomId};
use async_trait::async_trait;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("room {0} already exists")]
    AlreadyExists(RoomId),

    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("room record could not be encoded or decoded: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Persistence backend for rooms, keyed by room id.
#[async_trait]
pub trait RoomStore: Send + Sync + std::fmt::Debug {
    /// Writes a new record. Fails with [`StoreError::AlreadyExists`] if the id is taken.
    async fn insert(&self, room: &Room) -> Result<(), StoreError>;

    async fn load(&self, room_id: &RoomId) -> Result<Option<Room>, StoreError>;

    /// Replaces an existing record as a single unit.
    async fn save(&self, room: &Room) -> Result<(), StoreError>;

    /// Every stored room id, in no particular order.
    async fn room_ids(&self) -> Result<Vec<RoomId>, StoreError>;

    fn backend_name(&self) -> &'static str;
}

/// Opens the backend described by `config`.
pub async fn open_store(config: &StoreConfig) -> Result<Arc<dyn RoomStore>, StoreError> {
    match config {
        StoreConfig::Memory => Ok(Arc::new(MemoryRoomStore::new())),
        StoreConfig::File { directory } => Ok(Arc::new(FileRoomStore::open(directory).await?)),
    }
}
