//! Message handling and routing for client-server communication.
//!
//! This module provides the wire envelopes and the routing of parsed client
//! requests to the room session manager.

pub mod router;
pub mod types;

pub use router::route_client_message;
pub use types::{ClientMessage, ServerReply};
