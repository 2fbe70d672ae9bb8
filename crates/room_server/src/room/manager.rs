//! Room session manager.
//!
//! Every operation that mutates a room runs under that room's lock and
//! follows the same shape: load the record from the store, validate against
//! it, write the whole record back, then broadcast. The lock is released only
//! after the broadcast so events reach clients in commit order. No operation
//! ever holds two room locks at once.

use super::{
    BroadcastGateway, EventSink, Occupant, Role, Room, RoomEvent, RoomId, RoomSnapshot,
    SessionRegistry,
};
use crate::config::RoomConfig;
use crate::connection::ConnectionId;
use crate::error::RoomError;
use crate::rules::{CandidateMove, RulesEngine};
use crate::stats::{ServerStats, StatsSnapshot};
use crate::store::{RoomStore, StoreError};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info, warn};

/// Options accepted when creating a room.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoomOptions {
    /// Stored verbatim on the room record
    #[serde(default)]
    pub meta: Map<String, Value>,
}

/// A move submission in board coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MoveRequest {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub promotion: Option<char>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinOutcome {
    pub room_id: RoomId,
    pub role: Role,
    pub position: String,
    pub move_log: Vec<String>,
    pub is_finished: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveOutcome {
    pub room_id: RoomId,
    pub position: String,
    pub notation: String,
    pub ply: usize,
    pub is_finished: bool,
    pub result: Option<String>,
}

#[derive(Debug)]
pub struct RoomSessionManager {
    store: Arc<dyn RoomStore>,
    rules: Arc<dyn RulesEngine>,
    registry: SessionRegistry,
    gateway: BroadcastGateway,
    room_locks: DashMap<RoomId, Arc<Mutex<()>>>,
    settings: RoomConfig,
    stats: Arc<ServerStats>,
}

impl RoomSessionManager {
    pub fn new(
        store: Arc<dyn RoomStore>,
        rules: Arc<dyn RulesEngine>,
        sink: Arc<dyn EventSink>,
        settings: RoomConfig,
        stats: Arc<ServerStats>,
    ) -> Self {
        Self {
            store,
            rules,
            registry: SessionRegistry::new(),
            gateway: BroadcastGateway::new(sink, stats.clone()),
            room_locks: DashMap::new(),
            settings,
            stats,
        }
    }

    /// Acquires exclusive access to one room's record.
    async fn lock_room(&self, room_id: &RoomId) -> OwnedMutexGuard<()> {
        let lock = self
            .room_locks
            .entry(room_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Unknown or malformed ids are reported as missing rooms.
    fn existing_id(raw: &str) -> Result<RoomId, RoomError> {
        RoomId::parse(raw).map_err(|_| RoomError::RoomNotFound(raw.to_string()))
    }

    async fn load_existing(&self, room_id: &RoomId) -> Result<Room, RoomError> {
        self.store
            .load(room_id)
            .await?
            .ok_or_else(|| RoomError::RoomNotFound(room_id.to_string()))
    }

    /// Creates a room with the starting position and no occupants.
    ///
    /// # Arguments
    ///
    /// * `requested` - Caller-chosen identifier; `None` or blank generates one
    /// * `options` - Free-form metadata persisted with the room
    ///
    /// # Returns
    ///
    /// The identifier of the new room, or `RoomAlreadyExists` if a
    /// caller-chosen identifier is taken.
    pub async fn create_room(
        &self,
        requested: Option<&str>,
        options: RoomOptions,
    ) -> Result<RoomId, RoomError> {
        let requested = requested.map(str::trim).filter(|raw| !raw.is_empty());

        let room_id = match requested {
            Some(raw) => {
                let room_id = RoomId::parse(raw)?;
                let room = Room::new(room_id.clone(), self.rules.initial_position(), options.meta);
                self.store.insert(&room).await?;
                room_id
            }
            None => self.insert_generated(options.meta).await?,
        };

        self.stats.record_room_created();
        info!("🏁 Room {} created", room_id);
        Ok(room_id)
    }

    async fn insert_generated(&self, meta: Map<String, Value>) -> Result<RoomId, RoomError> {
        for _ in 0..self.settings.id_generation_attempts.max(1) {
            let room_id = RoomId::generate(self.settings.id_length);
            let room = Room::new(room_id.clone(), self.rules.initial_position(), meta.clone());
            match self.store.insert(&room).await {
                Ok(()) => return Ok(room_id),
                Err(StoreError::AlreadyExists(_)) => {
                    debug!("Generated room id {} collided, retrying", room_id);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(RoomError::Internal("exhausted room id generation attempts".to_string()))
    }

    /// Attaches a connection to a room.
    ///
    /// Seats are handed out in order (first mover, then second mover); every
    /// later joiner observes. A connection already in the room keeps its
    /// role. A connection in a different room leaves that room first.
    pub async fn join_room(
        &self,
        room_id: &str,
        connection: ConnectionId,
        identity: Option<String>,
    ) -> Result<JoinOutcome, RoomError> {
        let room_id = Self::existing_id(room_id)?;
        self.load_existing(&room_id).await?;

        if let Some(previous) = self.registry.lookup(connection) {
            if previous.room_id != room_id {
                debug!("Connection {} moving from room {} to {}", connection, previous.room_id, room_id);
                self.release(connection, &previous.room_id).await?;
            }
        }

        let _guard = self.lock_room(&room_id).await;
        let mut room = self.load_existing(&room_id).await?;

        if let Some(role) = room.role_of(connection) {
            self.registry.associate(connection, room_id.clone(), role);
            return Ok(Self::join_outcome(&room, role));
        }

        let role = room.attach(Occupant::new(connection, identity));
        self.store.save(&room).await?;
        self.registry.associate(connection, room_id.clone(), role);
        self.stats.record_join();

        info!("👤 Connection {} joined room {} as {:?}", connection, room_id, role);
        self.gateway
            .broadcast(&room, &RoomEvent::MembershipChanged(room.membership()));

        Ok(Self::join_outcome(&room, role))
    }

    fn join_outcome(room: &Room, role: Role) -> JoinOutcome {
        JoinOutcome {
            room_id: room.room_id.clone(),
            role,
            position: room.position.clone(),
            move_log: room.move_log.clone(),
            is_finished: room.is_finished,
        }
    }

    /// Validates and applies a move from a seated player.
    ///
    /// The submitting seat is resolved from the stored room record, never
    /// from the session cache. Rejections leave the room untouched and are
    /// not broadcast.
    pub async fn submit_move(
        &self,
        room_id: &str,
        connection: ConnectionId,
        request: MoveRequest,
    ) -> Result<MoveOutcome, RoomError> {
        let result = self.apply_move(room_id, connection, request).await;
        match &result {
            Ok(_) => self.stats.record_move_applied(),
            Err(e) => {
                self.stats.record_move_rejected();
                debug!("Move from connection {} in room {} rejected: {}", connection, room_id, e);
            }
        }
        result
    }

    async fn apply_move(
        &self,
        room_id: &str,
        connection: ConnectionId,
        request: MoveRequest,
    ) -> Result<MoveOutcome, RoomError> {
        let room_id = Self::existing_id(room_id)?;
        // Lock entries are only created for rooms that exist
        self.load_existing(&room_id).await?;

        let _guard = self.lock_room(&room_id).await;
        let mut room = self.load_existing(&room_id).await?;

        if room.is_finished {
            return Err(RoomError::GameAlreadyFinished);
        }

        let seat = room.seat_of(connection).ok_or(RoomError::NotAPlayer)?;
        if self.rules.side_to_move(&room.position)? != seat {
            return Err(RoomError::NotYourTurn);
        }

        let candidate = CandidateMove {
            from: request.from,
            to: request.to,
            promotion: Some(request.promotion.unwrap_or(self.settings.default_promotion)),
        };
        let applied = self.rules.apply_move(&room.position, &room.move_log, &candidate)?;

        room.record_move(applied.position, applied.notation.clone());
        if let Some(terminal) = applied.terminal {
            room.finish(terminal.summary());
        }
        self.store.save(&room).await?;

        info!("♟️ Room {} ply {}: {} played {}", room_id, room.ply(), seat, applied.notation);

        self.gateway.broadcast(
            &room,
            &RoomEvent::MoveApplied {
                room_id: room_id.clone(),
                position: room.position.clone(),
                notation: applied.notation.clone(),
                ply: room.ply(),
                is_finished: room.is_finished,
            },
        );

        if let (true, Some(result)) = (room.is_finished, room.result.clone()) {
            info!("🏆 Room {} finished: {}", room_id, result);
            self.gateway
                .broadcast(&room, &RoomEvent::GameOver { room_id: room_id.clone(), result });
        }

        Ok(MoveOutcome {
            room_id,
            position: room.position,
            notation: applied.notation,
            ply: room.move_log.len(),
            is_finished: room.is_finished,
            result: room.result,
        })
    }

    /// Removes a departed connection from whatever room it was in.
    ///
    /// Never fails: a connection with no room is a no-op, and store errors
    /// are logged.
    pub async fn handle_disconnect(&self, connection: ConnectionId) {
        self.stats.record_disconnect();

        let rooms = match self.registry.remove(connection) {
            Some(association) => vec![association.room_id],
            None => match self.find_rooms_of(connection).await {
                Ok(rooms) => rooms,
                Err(e) => {
                    error!("Failed to scan rooms for connection {}: {}", connection, e);
                    return;
                }
            },
        };

        for room_id in rooms {
            if let Err(e) = self.release(connection, &room_id).await {
                error!("Failed to release connection {} from room {}: {}", connection, room_id, e);
            }
        }
    }

    /// Recovery path for a lost cache entry: O(rooms).
    async fn find_rooms_of(&self, connection: ConnectionId) -> Result<Vec<RoomId>, RoomError> {
        let mut found = Vec::new();
        for room_id in self.store.room_ids().await? {
            if let Some(room) = self.store.load(&room_id).await? {
                if room.role_of(connection).is_some() {
                    found.push(room_id);
                }
            }
        }
        Ok(found)
    }

    /// Detaches a connection from one room, persisting and broadcasting only
    /// if the record changed.
    async fn release(&self, connection: ConnectionId, room_id: &RoomId) -> Result<bool, RoomError> {
        if self.store.load(room_id).await?.is_none() {
            return Ok(false);
        }

        let _guard = self.lock_room(room_id).await;
        let Some(mut room) = self.store.load(room_id).await? else {
            return Ok(false);
        };

        if !room.detach(connection) {
            return Ok(false);
        }

        self.store.save(&room).await?;
        info!("👋 Connection {} left room {}", connection, room_id);
        self.gateway
            .broadcast(&room, &RoomEvent::MembershipChanged(room.membership()));
        Ok(true)
    }

    /// Clears every seat and observer slot in the store.
    ///
    /// Connection ids do not survive a restart, so membership persisted by a
    /// previous process refers to connections that no longer exist.
    pub async fn reset_membership(&self) -> Result<usize, RoomError> {
        let mut cleared = 0;
        for room_id in self.store.room_ids().await? {
            let _guard = self.lock_room(&room_id).await;
            let Some(mut room) = self.store.load(&room_id).await? else {
                continue;
            };
            if room.connections().is_empty() {
                continue;
            }

            room.seats = Default::default();
            room.observers.clear();
            room.touch();
            self.store.save(&room).await?;
            cleared += 1;
        }

        if cleared > 0 {
            warn!("🧹 Cleared stale membership from {} rooms", cleared);
        }
        Ok(cleared)
    }

    /// Reads the current state of a room.
    pub async fn get_room(&self, room_id: &str) -> Result<RoomSnapshot, RoomError> {
        let room_id = Self::existing_id(room_id)?;
        Ok(self.load_existing(&room_id).await?.snapshot())
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn RoomStore> {
        &self.store
    }

    pub fn rules(&self) -> &Arc<dyn RulesEngine> {
        &self.rules
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}
