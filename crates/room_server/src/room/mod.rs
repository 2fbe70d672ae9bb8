//! Rooms: the data model, the session registry, the broadcast gateway and
//! the session manager that ties them together.

pub mod broadcast;
pub mod manager;
pub mod model;
pub mod registry;

pub use broadcast::{BroadcastGateway, DeliveryError, EventSink, RoomEvent};
pub use manager::{JoinOutcome, MoveOutcome, MoveRequest, RoomOptions, RoomSessionManager};
pub use model::{
    MembershipSnapshot, Occupant, Role, Room, RoomId, RoomSnapshot, SeatHolder, Seat, Seats,
    SeatsView,
};
pub use registry::{Association, SessionRegistry};
