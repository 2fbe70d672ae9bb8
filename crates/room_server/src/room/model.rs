//! Room data model.
//!
//! A [`Room`] is the canonical, persisted record of one game session: the
//! current position, the append-only move log, two seats and any number of
//! observers. Only the room session manager mutates it, and only while
//! holding that room's lock.

use crate::connection::ConnectionId;
use crate::error::RoomError;
use crate::utils::current_timestamp;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Opaque room identifier.
///
/// Restricted to `[A-Za-z0-9_-]{1,64}` so it is safe to use as a file name
/// and in log lines.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomId(String);

impl RoomId {
    pub const MAX_LEN: usize = 64;

    /// Validates a caller-supplied identifier.
    pub fn parse(raw: &str) -> Result<Self, RoomError> {
        let valid = !raw.is_empty()
            && raw.len() <= Self::MAX_LEN
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

        if valid {
            Ok(Self(raw.to_string()))
        } else {
            Err(RoomError::InvalidRoomId(raw.chars().take(Self::MAX_LEN).collect()))
        }
    }

    /// Generates a short lowercase alphanumeric identifier.
    ///
    /// Uniqueness is not guaranteed; callers retry on collision.
    pub fn generate(len: usize) -> Self {
        let token = uuid::Uuid::new_v4().simple().to_string();
        let len = len.clamp(1, token.len());
        Self(token[..len].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RoomId {
    type Error = RoomError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RoomId> for String {
    fn from(id: RoomId) -> Self {
        id.0
    }
}

/// One of the two player slots in a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Seat {
    FirstMover,
    SecondMover,
}

impl Seat {
    /// Seats in assignment order.
    pub const ALL: [Seat; 2] = [Seat::FirstMover, Seat::SecondMover];

    pub fn opponent(self) -> Seat {
        match self {
            Seat::FirstMover => Seat::SecondMover,
            Seat::SecondMover => Seat::FirstMover,
        }
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Seat::FirstMover => f.write_str("first-mover"),
            Seat::SecondMover => f.write_str("second-mover"),
        }
    }
}

/// What a connection is in a room: a seated player or an observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    FirstMover,
    SecondMover,
    Observer,
}

impl Role {
    pub fn seat(self) -> Option<Seat> {
        match self {
            Role::FirstMover => Some(Seat::FirstMover),
            Role::SecondMover => Some(Seat::SecondMover),
            Role::Observer => None,
        }
    }
}

impl From<Seat> for Role {
    fn from(seat: Seat) -> Self {
        match seat {
            Seat::FirstMover => Role::FirstMover,
            Seat::SecondMover => Role::SecondMover,
        }
    }
}

/// A live connection attached to a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occupant {
    pub connection: ConnectionId,
    /// Opaque identity handed over by the credential service, if any
    pub identity: Option<String>,
    pub joined_at: u64,
}

impl Occupant {
    pub fn new(connection: ConnectionId, identity: Option<String>) -> Self {
        Self {
            connection,
            identity,
            joined_at: current_timestamp(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seats {
    pub first_mover: Option<Occupant>,
    pub second_mover: Option<Occupant>,
}

impl Seats {
    pub fn get(&self, seat: Seat) -> Option<&Occupant> {
        match seat {
            Seat::FirstMover => self.first_mover.as_ref(),
            Seat::SecondMover => self.second_mover.as_ref(),
        }
    }

    fn slot_mut(&mut self, seat: Seat) -> &mut Option<Occupant> {
        match seat {
            Seat::FirstMover => &mut self.first_mover,
            Seat::SecondMover => &mut self.second_mover,
        }
    }

    pub fn seat_of(&self, connection: ConnectionId) -> Option<Seat> {
        Seat::ALL
            .into_iter()
            .find(|seat| self.get(*seat).is_some_and(|o| o.connection == connection))
    }

    pub fn first_vacant(&self) -> Option<Seat> {
        Seat::ALL.into_iter().find(|seat| self.get(*seat).is_none())
    }
}

/// The canonical record of a game session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub room_id: RoomId,
    /// Serialized position; always the result of replaying `move_log`
    pub position: String,
    pub move_log: Vec<String>,
    pub seats: Seats,
    pub observers: Vec<Occupant>,
    pub is_finished: bool,
    pub result: Option<String>,
    /// Free-form options supplied at creation
    #[serde(default)]
    pub meta: Map<String, Value>,
    pub created_at: u64,
    pub updated_at: u64,
}

impl Room {
    pub fn new(room_id: RoomId, position: String, meta: Map<String, Value>) -> Self {
        let now = current_timestamp();
        Self {
            room_id,
            position,
            move_log: Vec::new(),
            seats: Seats::default(),
            observers: Vec::new(),
            is_finished: false,
            result: None,
            meta,
            created_at: now,
            updated_at: now,
        }
    }

    /// Number of half-moves played.
    pub fn ply(&self) -> usize {
        self.move_log.len()
    }

    pub fn seat_of(&self, connection: ConnectionId) -> Option<Seat> {
        self.seats.seat_of(connection)
    }

    pub fn role_of(&self, connection: ConnectionId) -> Option<Role> {
        if let Some(seat) = self.seat_of(connection) {
            return Some(seat.into());
        }
        self.observers
            .iter()
            .any(|o| o.connection == connection)
            .then_some(Role::Observer)
    }

    /// Attaches a connection: first vacant seat in order, otherwise observer.
    ///
    /// A connection already present keeps its current role.
    pub fn attach(&mut self, occupant: Occupant) -> Role {
        if let Some(role) = self.role_of(occupant.connection) {
            return role;
        }

        let role = match self.seats.first_vacant() {
            Some(seat) => {
                *self.seats.slot_mut(seat) = Some(occupant);
                seat.into()
            }
            None => {
                self.observers.push(occupant);
                Role::Observer
            }
        };
        self.touch();
        role
    }

    /// Removes a connection from whichever seat or observer slot it holds.
    ///
    /// Returns `false` when the connection was not attached.
    pub fn detach(&mut self, connection: ConnectionId) -> bool {
        let mut changed = false;

        for seat in Seat::ALL {
            let slot = self.seats.slot_mut(seat);
            if slot.as_ref().is_some_and(|o| o.connection == connection) {
                *slot = None;
                changed = true;
            }
        }

        let before = self.observers.len();
        self.observers.retain(|o| o.connection != connection);
        changed |= self.observers.len() != before;

        if changed {
            self.touch();
        }
        changed
    }

    pub fn record_move(&mut self, position: String, notation: String) {
        self.position = position;
        self.move_log.push(notation);
        self.touch();
    }

    /// Marks the game finished. The first result recorded wins.
    pub fn finish(&mut self, result: String) {
        if self.is_finished {
            return;
        }
        self.is_finished = true;
        self.result.get_or_insert(result);
        self.touch();
    }

    pub fn touch(&mut self) {
        self.updated_at = current_timestamp();
    }

    /// Every connection attached to the room, seated players first.
    pub fn connections(&self) -> Vec<ConnectionId> {
        Seat::ALL
            .into_iter()
            .filter_map(|seat| self.seats.get(seat).map(|o| o.connection))
            .chain(self.observers.iter().map(|o| o.connection))
            .collect()
    }

    pub fn membership(&self) -> MembershipSnapshot {
        MembershipSnapshot {
            room_id: self.room_id.clone(),
            seats: SeatsView {
                first_mover: self.seats.first_mover.as_ref().map(SeatHolder::from),
                second_mover: self.seats.second_mover.as_ref().map(SeatHolder::from),
            },
            observer_count: self.observers.len(),
        }
    }

    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            room_id: self.room_id.clone(),
            position: self.position.clone(),
            move_log: self.move_log.clone(),
            membership: self.membership(),
            is_finished: self.is_finished,
            result: self.result.clone(),
            meta: self.meta.clone(),
        }
    }
}

/// Public view of who sits where. Connection handles are reduced to markers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MembershipSnapshot {
    pub room_id: RoomId,
    pub seats: SeatsView,
    pub observer_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeatsView {
    pub first_mover: Option<SeatHolder>,
    pub second_mover: Option<SeatHolder>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeatHolder {
    pub marker: String,
    pub identity: Option<String>,
}

impl From<&Occupant> for SeatHolder {
    fn from(occupant: &Occupant) -> Self {
        Self {
            marker: format!("conn-{}", occupant.connection),
            identity: occupant.identity.clone(),
        }
    }
}

/// Read-only view of a room for resynchronising clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomSnapshot {
    pub room_id: RoomId,
    pub position: String,
    pub move_log: Vec<String>,
    pub membership: MembershipSnapshot,
    pub is_finished: bool,
    pub result: Option<String>,
    pub meta: Map<String, Value>,
}
