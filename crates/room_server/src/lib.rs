//! # Room Server - Authoritative Multiplayer Chess Rooms
//!
//! A WebSocket server that owns the state of two-player chess rooms. Clients
//! create and join rooms, submit moves, and receive synchronized updates;
//! the server is the only party that decides whether a move is legal and
//! what the current position is.
//!
//! ## Architecture Overview
//!
//! ### Core Components
//!
//! * **Rules Adapter** ([`rules`]) - Pure move-legality and terminal-state oracle
//! * **Room Store** ([`store`]) - Durable record of each room, in memory or on disk
//! * **Session Registry** - Best-effort cache from connection to room
//! * **Room Session Manager** ([`room::RoomSessionManager`]) - Creation, joins,
//!   moves and disconnects, serialized per room
//! * **Broadcast Gateway** - Fan-out of room events to every attached connection
//! * **Transport** - WebSocket accept loop, request guard and message routing
//!
//! ### Message Flow
//!
//! 1. Client sends a WebSocket frame with `{namespace, event, data, request_id}`
//! 2. The request guard checks frame size and the connection's rate limit
//! 3. The router decodes the payload and calls the room session manager
//! 4. The manager locks the room, validates against the stored record,
//!    persists the new record and broadcasts the resulting events
//! 5. The requesting connection receives a `reply` envelope
//!
//! ```json
//! {"namespace": "room", "event": "submit_move", "data": {"room_id": "r1", "from": "e2", "to": "e4"}}
//! ```
//!
//! ## Consistency
//!
//! Operations on one room are serialized by a per-room async mutex held for
//! the whole read-validate-write-broadcast sequence. Operations on different
//! rooms never contend. Seat ownership is always re-derived from the stored
//! room record, never from the session cache.
//!
//! ## Error Handling
//!
//! Room operations return [`RoomError`]; every variant is an expected,
//! per-request outcome reported to the caller. Store and rules failures that
//! are not the client's fault surface as a generic `"Server error"`.

// Re-export core types and functions for easy access
pub use config::{RoomConfig, SecurityConfig, ServerConfig, StoreConfig};
pub use error::{RoomError, ServerError};
pub use room::RoomSessionManager;
pub use server::RoomServer;
pub use shutdown::ShutdownState;
pub use stats::StatsSnapshot;
pub use store::{open_store, FileRoomStore, MemoryRoomStore, RoomStore, StoreError};
pub use utils::{create_server, create_server_with_config, create_server_with_store};

// Public module declarations
pub mod config;
pub mod error;
pub mod room;
pub mod rules;
pub mod security;
pub mod server;
pub mod shutdown;
pub mod stats;
pub mod store;
pub mod utils;

pub mod connection;
pub mod messaging;

#[cfg(test)]
mod tests;
