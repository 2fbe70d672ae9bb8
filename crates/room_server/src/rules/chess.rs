//! Standard chess rules backed by shakmaty.
//!
//! Positions are FEN strings and notation is SAN with check and mate
//! suffixes. The first mover plays White.

use super::{AppliedMove, CandidateMove, RulesEngine, RulesError, Terminal};
use crate::room::Seat;
use shakmaty::{
    fen::Fen, san::{San, SanPlus}, uci::UciMove, CastlingMode, Chess, Color, EnPassantMode, Move,
    Position, Role, Square,
};

/// Halfmoves without a capture or pawn move after which the game is drawn.
const FIFTY_MOVE_HALFMOVES: u32 = 100;
/// Occurrences of the same position that draw the game.
const REPETITION_LIMIT: usize = 3;

#[derive(Debug, Clone, Copy, Default)]
pub struct ChessRules;

impl ChessRules {
    pub fn new() -> Self {
        Self
    }

    fn decode(position: &str) -> Result<Chess, RulesError> {
        let fen: Fen = position
            .parse()
            .map_err(|e| RulesError::InvalidPosition(format!("{e}")))?;
        fen.into_position(CastlingMode::Standard)
            .map_err(|e| RulesError::InvalidPosition(format!("{e}")))
    }

    fn encode(position: &Chess) -> String {
        Fen::from_position(position.clone(), EnPassantMode::Legal).to_string()
    }

    /// Board, side to move, castling rights and en passant square: the FEN
    /// fields that decide whether two positions repeat.
    fn repetition_key(position: &Chess) -> String {
        Self::encode(position)
            .split_whitespace()
            .take(4)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Plays a SAN move log from the standard starting position, returning
    /// every position along the way including the first.
    fn replay_positions(moves: &[String]) -> Result<Vec<Chess>, RulesError> {
        let mut positions = Vec::with_capacity(moves.len() + 1);
        let mut position = Chess::default();
        for notation in moves {
            let san_plus: SanPlus = notation
                .parse()
                .map_err(|_| RulesError::InvalidNotation(notation.clone()))?;
            let m = san_plus
                .san
                .to_move(&position)
                .map_err(|_| RulesError::InvalidNotation(notation.clone()))?;
            let next = position
                .clone()
                .play(&m)
                .map_err(|_| RulesError::InvalidNotation(notation.clone()))?;
            positions.push(position);
            position = next;
        }
        positions.push(position);
        Ok(positions)
    }

    /// Whether `after` has now occurred often enough to draw.
    fn is_repetition(before: &Chess, history: &[String], after: &Chess) -> Result<bool, RulesError> {
        let key = Self::repetition_key(after);
        let earlier = if history.is_empty() {
            vec![before.clone()]
        } else {
            Self::replay_positions(history)?
        };

        let seen = earlier
            .iter()
            .filter(|position| Self::repetition_key(position) == key)
            .count();
        Ok(seen + 1 >= REPETITION_LIMIT)
    }

    fn parse_square(raw: &str) -> Result<Square, RulesError> {
        raw.trim()
            .to_ascii_lowercase()
            .parse::<Square>()
            .map_err(|_| RulesError::InvalidSquare(raw.to_string()))
    }

    fn parse_promotion(letter: char) -> Result<Role, RulesError> {
        match Role::from_char(letter.to_ascii_lowercase()) {
            Some(role) if role != Role::King && role != Role::Pawn => Ok(role),
            _ => Err(RulesError::IllegalMove(format!("promotion to '{letter}'"))),
        }
    }

    fn seat_for(color: Color) -> Seat {
        match color {
            Color::White => Seat::FirstMover,
            Color::Black => Seat::SecondMover,
        }
    }

    /// Finds the legal move matching the submitted squares. Castling is
    /// matched on the king's origin and destination squares.
    fn find_move(position: &Chess, from: Square, to: Square, promotion: Role) -> Option<Move> {
        position.legal_moves().into_iter().find(|m| {
            match UciMove::from_move(m, CastlingMode::Standard) {
                UciMove::Normal { from: f, to: t, promotion: p } => {
                    f == from && t == to && p.map_or(true, |role| role == promotion)
                }
                _ => false,
            }
        })
    }

    fn terminal(position: &Chess, mover: Color, repeated: bool) -> Option<Terminal> {
        if position.is_checkmate() {
            Some(Terminal::Checkmate { winner: Self::seat_for(mover) })
        } else if position.is_stalemate() {
            Some(Terminal::Stalemate)
        } else if position.is_insufficient_material() {
            Some(Terminal::InsufficientMaterial)
        } else if position.halfmoves() >= FIFTY_MOVE_HALFMOVES {
            Some(Terminal::FiftyMoveRule)
        } else if repeated {
            Some(Terminal::ThreefoldRepetition)
        } else {
            None
        }
    }

    fn check_suffix(position: &Chess) -> &'static str {
        if position.is_checkmate() {
            "#"
        } else if position.is_check() {
            "+"
        } else {
            ""
        }
    }
}

impl RulesEngine for ChessRules {
    fn initial_position(&self) -> String {
        Self::encode(&Chess::default())
    }

    fn side_to_move(&self, position: &str) -> Result<Seat, RulesError> {
        Ok(Self::seat_for(Self::decode(position)?.turn()))
    }

    fn apply_move(
        &self,
        position: &str,
        history: &[String],
        candidate: &CandidateMove,
    ) -> Result<AppliedMove, RulesError> {
        let before = Self::decode(position)?;
        let from = Self::parse_square(&candidate.from)?;
        let to = Self::parse_square(&candidate.to)?;
        let promotion = match candidate.promotion {
            Some(letter) => Self::parse_promotion(letter)?,
            None => Role::Queen,
        };

        let m = Self::find_move(&before, from, to, promotion).ok_or_else(|| {
            RulesError::IllegalMove(format!("{}{}", candidate.from, candidate.to))
        })?;

        let san = San::from_move(&before, &m);
        let mover = before.turn();
        let after = before
            .clone()
            .play(&m)
            .map_err(|e| RulesError::IllegalMove(format!("{e}")))?;
        let repeated = Self::is_repetition(&before, history, &after)?;

        Ok(AppliedMove {
            position: Self::encode(&after),
            notation: format!("{san}{}", Self::check_suffix(&after)),
            terminal: Self::terminal(&after, mover, repeated),
        })
    }

    fn replay(&self, moves: &[String]) -> Result<String, RulesError> {
        let positions = Self::replay_positions(moves)?;
        positions
            .last()
            .map(Self::encode)
            .ok_or_else(|| RulesError::InvalidPosition("empty replay".to_string()))
    }
}
