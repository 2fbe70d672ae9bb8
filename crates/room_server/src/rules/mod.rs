//! Rules engine adapter.
//!
//! The room manager treats the rules of the game as a pure oracle: given a
//! serialized position and a candidate move it answers whether the move is
//! legal, what the resulting position is, and whether the game is over.
//! The adapter holds no state between calls, so all persistence stays with
//! the room manager.

pub mod chess;

pub use chess::ChessRules;

use crate::room::Seat;
use serde::{Deserialize, Serialize};

/// A move as submitted by a client, in board coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateMove {
    /// Origin square in algebraic form, e.g. `"e2"`
    pub from: String,
    /// Destination square in algebraic form, e.g. `"e4"`
    pub to: String,
    /// Promotion piece letter (`q`, `r`, `b`, `n`). Ignored for non-promoting moves.
    pub promotion: Option<char>,
}

impl CandidateMove {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            promotion: None,
        }
    }

    pub fn with_promotion(mut self, promotion: char) -> Self {
        self.promotion = Some(promotion);
        self
    }
}

/// The result of a legal move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMove {
    /// Serialized position after the move
    pub position: String,
    /// The move in canonical notation
    pub notation: String,
    /// Set when the resulting position ends the game
    pub terminal: Option<Terminal>,
}

/// Ways a game can end on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Terminal {
    Checkmate { winner: Seat },
    Stalemate,
    InsufficientMaterial,
    FiftyMoveRule,
    ThreefoldRepetition,
}

impl Terminal {
    pub fn winner(&self) -> Option<Seat> {
        match self {
            Terminal::Checkmate { winner } => Some(*winner),
            _ => None,
        }
    }

    /// Human-readable result stored on the room.
    pub fn summary(&self) -> String {
        match self {
            Terminal::Checkmate { winner } => format!("{winner} wins by checkmate"),
            Terminal::Stalemate => "draw by stalemate".to_string(),
            Terminal::InsufficientMaterial => "draw by insufficient material".to_string(),
            Terminal::FiftyMoveRule => "draw by fifty-move rule".to_string(),
            Terminal::ThreefoldRepetition => "draw by threefold repetition".to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RulesError {
    #[error("invalid position: {0}")]
    InvalidPosition(String),

    #[error("invalid square: {0}")]
    InvalidSquare(String),

    #[error("{0} is not a legal move")]
    IllegalMove(String),

    #[error("invalid notation: {0}")]
    InvalidNotation(String),
}

/// Move-legality and terminal-state oracle consumed by the room manager.
pub trait RulesEngine: Send + Sync + std::fmt::Debug {
    /// The position every new room starts from.
    fn initial_position(&self) -> String;

    /// Which seat is due to move in `position`.
    fn side_to_move(&self, position: &str) -> Result<Seat, RulesError>;

    /// Validates `candidate` against `position` and returns the outcome.
    ///
    /// `history` is the move log that led from [`initial_position`] to
    /// `position`, used for repetition draws. An empty history means no
    /// earlier positions are known.
    ///
    /// [`initial_position`]: RulesEngine::initial_position
    fn apply_move(
        &self,
        position: &str,
        history: &[String],
        candidate: &CandidateMove,
    ) -> Result<AppliedMove, RulesError>;

    /// Replays a move log from the initial position and returns the final position.
    fn replay(&self, moves: &[String]) -> Result<String, RulesError>;
}
