//! JSON-file room store.
//!
//! Each room lives in `<directory>/<room_id>.json`. Writes go to a hidden
//! temporary file first and are then moved into place, so a reader only ever
//! sees a complete record.

use super::{RoomStore, StoreError};
use crate::room::{Room, RoomId};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug)]
pub struct FileRoomStore {
    directory: PathBuf,
}

impl FileRoomStore {
    /// Opens (and creates if needed) the data directory.
    pub async fn open(directory: impl AsRef<Path>) -> Result<Self, StoreError> {
        let directory = directory.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&directory).await?;
        debug!("📁 Room store directory: {}", directory.display());
        Ok(Self { directory })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn record_path(&self, room_id: &RoomId) -> PathBuf {
        self.directory.join(format!("{room_id}.json"))
    }

    async fn write_temp(&self, room: &Room) -> Result<PathBuf, StoreError> {
        let body = serde_json::to_vec_pretty(room)?;
        let temp = self.directory.join(format!(
            ".{}.{}.tmp",
            room.room_id,
            uuid::Uuid::new_v4().simple()
        ));
        tokio::fs::write(&temp, body).await?;
        Ok(temp)
    }
}

#[async_trait]
impl RoomStore for FileRoomStore {
    async fn insert(&self, room: &Room) -> Result<(), StoreError> {
        let temp = self.write_temp(room).await?;
        // hard_link refuses to replace an existing file, which gives us create-new semantics
        let linked = tokio::fs::hard_link(&temp, self.record_path(&room.room_id)).await;
        if let Err(e) = tokio::fs::remove_file(&temp).await {
            warn!("Failed to remove temporary room file {}: {}", temp.display(), e);
        }

        match linked {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(StoreError::AlreadyExists(room.room_id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn load(&self, room_id: &RoomId) -> Result<Option<Room>, StoreError> {
        match tokio::fs::read(self.record_path(room_id)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, room: &Room) -> Result<(), StoreError> {
        let temp = self.write_temp(room).await?;
        if let Err(e) = tokio::fs::rename(&temp, self.record_path(&room.room_id)).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn room_ids(&self) -> Result<Vec<RoomId>, StoreError> {
        let mut ids = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.directory).await?;

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.starts_with('.') {
                continue;
            }
            if let Some(stem) = name.strip_suffix(".json") {
                match RoomId::parse(stem) {
                    Ok(id) => ids.push(id),
                    Err(_) => warn!("Ignoring unexpected file in room store: {}", name),
                }
            }
        }

        Ok(ids)
    }

    fn backend_name(&self) -> &'static str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::Occupant;
    use serde_json::{json, Map};
    use tempfile::TempDir;

    fn room(id: &str) -> Room {
        let mut meta = Map::new();
        meta.insert("time_control".to_string(), json!("5+0"));
        Room::new(RoomId::parse(id).unwrap(), "start".to_string(), meta)
    }

    #[tokio::test]
    async fn test_insert_creates_record_once() {
        let dir = TempDir::new().unwrap();
        let store = FileRoomStore::open(dir.path()).await.unwrap();

        store.insert(&room("r1")).await.unwrap();
        assert!(dir.path().join("r1.json").is_file());

        let again = store.insert(&room("r1")).await;
        assert!(matches!(again, Err(StoreError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_save_replaces_record() {
        let dir = TempDir::new().unwrap();
        let store = FileRoomStore::open(dir.path()).await.unwrap();

        let mut r1 = room("r1");
        store.insert(&r1).await.unwrap();
        r1.attach(Occupant::new(3, Some("alice".to_string())));
        r1.record_move("after".to_string(), "e4".to_string());
        store.save(&r1).await.unwrap();

        let loaded = store.load(&r1.room_id).await.unwrap().unwrap();
        assert_eq!(loaded, r1);
        assert_eq!(loaded.meta["time_control"], "5+0");
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = FileRoomStore::open(dir.path()).await.unwrap();
            store.insert(&room("alpha")).await.unwrap();
            store.insert(&room("beta")).await.unwrap();
        }

        let store = FileRoomStore::open(dir.path()).await.unwrap();
        let mut ids: Vec<String> = store
            .room_ids()
            .await
            .unwrap()
            .into_iter()
            .map(String::from)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["alpha", "beta"]);
        assert!(store.load(&RoomId::parse("gamma").unwrap()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_room_ids_skip_temporary_and_foreign_files() {
        let dir = TempDir::new().unwrap();
        let store = FileRoomStore::open(dir.path()).await.unwrap();
        store.insert(&room("r1")).await.unwrap();
        std::fs::write(dir.path().join(".r2.abc.tmp"), b"{}").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"hello").unwrap();

        let ids = store.room_ids().await.unwrap();
        assert_eq!(ids, vec![RoomId::parse("r1").unwrap()]);
    }

    #[tokio::test]
    async fn test_corrupt_record_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = FileRoomStore::open(dir.path()).await.unwrap();
        std::fs::write(dir.path().join("r1.json"), b"not json").unwrap();

        let result = store.load(&RoomId::parse("r1").unwrap()).await;
        assert!(matches!(result, Err(StoreError::Serialization(_))));
    }
}
