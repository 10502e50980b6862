//! Collaborators the engine consults but does not implement: a legality
//! oracle and a notation formatter. Both are injected into `GameEngine` at
//! construction time.

use crate::engine::board::Position;
use crate::engine::san::SanNotation;
use crate::engine::types::{ChessError, Move};

// =========================================================================
// Legality
// =========================================================================

/// Answers "may this move be played here?". The engine treats the answer as
/// final and never second-guesses it.
pub trait LegalityOracle {
    fn validate(&self, mv: &Move, position: &Position) -> bool;
}

impl<F> LegalityOracle for F
where
    F: Fn(&Move, &Position) -> bool,
{
    fn validate(&self, mv: &Move, position: &Position) -> bool {
        self(mv, position)
    }
}

/// Accepts any move whose source square holds a piece.
#[derive(Clone, Copy, Debug, Default)]
pub struct OccupancyOracle;

impl LegalityOracle for OccupancyOracle {
    fn validate(&self, mv: &Move, position: &Position) -> bool {
        !position.is_empty(mv.from)
    }
}

/// Accepts a move when the side to move owns the piece on the source
/// square and the target is not occupied by one of its own pieces.
#[derive(Clone, Copy, Debug, Default)]
pub struct TurnOracle;

impl LegalityOracle for TurnOracle {
    fn validate(&self, mv: &Move, position: &Position) -> bool {
        if mv.from == mv.to {
            return false;
        }
        let Some(piece) = position.get(mv.from) else {
            return false;
        };
        if piece.color != position.side_to_move {
            return false;
        }
        position
            .get(mv.to)
            .map_or(true, |target| target.color != piece.color)
    }
}

// =========================================================================
// Notation
// =========================================================================

/// Turns moves into display text and back.
pub trait NotationFormatter {
    /// Text for `mv` played from `before`.
    fn format(&self, mv: &Move, before: &Position) -> String;

    /// Move described by `text` in `position`.
    fn parse(&self, text: &str, position: &Position) -> Result<Move, ChessError>;
}

/// Coordinate notation: `e2e4`, `e7e8q`.
#[derive(Clone, Copy, Debug, Default)]
pub struct CoordinateNotation;

impl NotationFormatter for CoordinateNotation {
    fn format(&self, mv: &Move, _before: &Position) -> String {
        mv.to_string()
    }

    fn parse(&self, text: &str, _position: &Position) -> Result<Move, ChessError> {
        text.parse()
    }
}

/// Which notation the engine writes and reads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NotationDialect {
    #[default]
    San,
    Coordinate,
}

impl NotationDialect {
    /// Parse from string (case-insensitive).
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "san" | "algebraic" => Some(NotationDialect::San),
            "coordinate" | "coord" | "uci" | "lan" => Some(NotationDialect::Coordinate),
            _ => None,
        }
    }

    pub fn formatter(self) -> Box<dyn NotationFormatter> {
        match self {
            NotationDialect::San => Box::new(SanNotation),
            NotationDialect::Coordinate => Box::new(CoordinateNotation),
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
