//! Error types and handling for the room server.
//!
//! This module defines the error types that can occur during server operations,
//! providing clear categorization of different failure modes.

use crate::rules::RulesError;
use crate::store::StoreError;

/// Enumeration of possible server errors.
/// 
/// Categorizes errors into network-related and internal server errors
/// to help with debugging and error handling.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Network-related errors such as binding failures or connection issues
    #[error("Network error: {0}")]
    Network(String),
    
    /// Internal server errors including store failures and startup issues
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Expected, per-request outcomes of a room operation.
///
/// None of these are fatal to the process. Everything except `Internal` is
/// reported verbatim to the requesting connection; `Internal` is logged and
/// surfaced as a generic failure.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("Room {0} already exists")]
    RoomAlreadyExists(String),

    #[error("Room {0} not found")]
    RoomNotFound(String),

    #[error("Invalid room id: {0}")]
    InvalidRoomId(String),

    #[error("Not a player")]
    NotAPlayer,

    #[error("Not your turn")]
    NotYourTurn,

    #[error("Illegal move: {0}")]
    IllegalMove(String),

    #[error("Game is finished")]
    GameAlreadyFinished,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RoomError {
    /// Stable machine-readable code sent alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            RoomError::RoomAlreadyExists(_) => "room_already_exists",
            RoomError::RoomNotFound(_) => "room_not_found",
            RoomError::InvalidRoomId(_) => "invalid_room_id",
            RoomError::NotAPlayer => "not_a_player",
            RoomError::NotYourTurn => "not_your_turn",
            RoomError::IllegalMove(_) => "illegal_move",
            RoomError::GameAlreadyFinished => "game_already_finished",
            RoomError::Internal(_) => "internal_error",
        }
    }

    /// The text shown to the client. Internal detail never leaves the server.
    pub fn client_message(&self) -> String {
        match self {
            RoomError::Internal(_) => "Server error".to_string(),
            other => other.to_string(),
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, RoomError::Internal(_))
    }
}

impl From<StoreError> for RoomError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AlreadyExists(room_id) => RoomError::RoomAlreadyExists(room_id.to_string()),
            other => RoomError::Internal(other.to_string()),
        }
    }
}

impl From<RulesError> for RoomError {
    fn from(err: RulesError) -> Self {
        match err {
            // A stored position the engine cannot read is our fault, not the client's.
            RulesError::InvalidPosition(detail) => {
                RoomError::Internal(format!("corrupt position: {detail}"))
            }
            other => RoomError::IllegalMove(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_errors_hide_detail() {
        let err = RoomError::Internal("disk on fire at /var/lib/rooms".to_string());
        assert_eq!(err.client_message(), "Server error");
        assert_eq!(err.code(), "internal_error");
        assert!(err.is_internal());
    }

    #[test]
    fn test_expected_errors_are_reported_verbatim() {
        assert_eq!(RoomError::NotYourTurn.client_message(), "Not your turn");
        assert_eq!(
            RoomError::RoomNotFound("r1".to_string()).client_message(),
            "Room r1 not found"
        );
        assert_eq!(RoomError::GameAlreadyFinished.code(), "game_already_finished");
    }

    #[test]
    fn test_rules_errors_map_to_illegal_move_or_internal() {
        let illegal: RoomError = RulesError::IllegalMove("e2e5".to_string()).into();
        assert!(matches!(illegal, RoomError::IllegalMove(_)));

        let square: RoomError = RulesError::InvalidSquare("z9".to_string()).into();
        assert!(matches!(square, RoomError::IllegalMove(_)));

        let corrupt: RoomError = RulesError::InvalidPosition("garbage".to_string()).into();
        assert!(corrupt.is_internal());
    }
}
