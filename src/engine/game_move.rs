//! History entries.
//!
//! A `GameMove` is an immutable record of one played move: the move itself,
//! where it sits in the game, its display text, and snapshots of the
//! position on either side of it. `StoredMove` is the flat, serializable
//! form used to persist and reload a game.

use serde::{Deserialize, Serialize};

use crate::engine::board::Position;
use crate::engine::oracle::NotationFormatter;
use crate::engine::san::SanNotation;
use crate::engine::types::{ChessError, Color, Move, Piece, PieceKind, Square};

// =========================================================================
// GameMove
// =========================================================================

/// One recorded move with its before/after snapshots.
///
/// Equality is structural. Use [`GameMove::same_ply`] to ask whether two
/// entries occupy the same slot in the game.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameMove {
    pub(crate) mv: Move,
    pub(crate) movenum: u32,
    pub(crate) is_white: bool,
    pub(crate) san: String,
    pub(crate) before: Position,
    pub(crate) after: Position,
    pub(crate) moved: Piece,
    pub(crate) captured: Option<Piece>,
}

impl GameMove {
    pub fn mv(&self) -> Move {
        self.mv
    }

    /// Full-move number, starting at 1.
    pub fn movenum(&self) -> u32 {
        self.movenum
    }

    pub fn is_white(&self) -> bool {
        self.is_white
    }

    pub fn color(&self) -> Color {
        if self.is_white {
            Color::White
        } else {
            Color::Black
        }
    }

    /// Display text produced by the formatter when the move was recorded.
    pub fn san(&self) -> &str {
        &self.san
    }

    pub fn before(&self) -> &Position {
        &self.before
    }

    pub fn after(&self) -> &Position {
        &self.after
    }

    /// The piece that made the move, as it stood before moving.
    pub fn moved(&self) -> Piece {
        self.moved
    }

    /// The piece removed by this move, including an en-passant pawn.
    pub fn captured(&self) -> Option<Piece> {
        self.captured
    }

    /// Coordinate text of the move, e.g. `e2e4`.
    pub fn algebraic(&self) -> String {
        self.mv.to_string()
    }

    /// Ply index: 1 for White's first move, 2 for Black's first, and so on.
    pub fn halfmove(&self) -> u32 {
        self.movenum.saturating_sub(1) * 2 + if self.is_white { 1 } else { 2 }
    }

    /// True when both entries sit at the same ply, whatever was played.
    pub fn same_ply(&self, other: &GameMove) -> bool {
        self.movenum == other.movenum && self.is_white == other.is_white
    }

    /// The undo of this move: swapped endpoints and swapped snapshots.
    /// Reversing twice gives back the original.
    pub fn reverse(&self) -> GameMove {
        GameMove {
            mv: self.mv.reversed(),
            movenum: self.movenum,
            is_white: self.is_white,
            san: self.san.clone(),
            before: self.after.clone(),
            after: self.before.clone(),
            moved: self.moved,
            captured: self.captured,
        }
    }

    /// Rebuild an entry from its stored form.
    ///
    /// The move text is read as coordinate notation first, then through
    /// `formatter`, then as SAN. When the stored move text is empty the SAN
    /// text is parsed instead. The record's move number and side must agree
    /// with its before position.
    pub fn from_stored(
        stored: &StoredMove,
        formatter: &dyn NotationFormatter,
    ) -> Result<GameMove, ChessError> {
        let before = Position::from_fen(&stored.fen_before)?;
        let after = Position::from_fen(&stored.fen_after)?;

        let side = if stored.is_white { Color::White } else { Color::Black };
        if before.side_to_move != side || u32::from(before.fullmove_number) != stored.movenum {
            let dots = if stored.is_white { "." } else { "..." };
            return Err(ChessError::InvalidFen(format!(
                "{} does not match move {}{dots}",
                stored.fen_before, stored.movenum
            )));
        }

        let text = if stored.mv.trim().is_empty() {
            stored.san.as_str()
        } else {
            stored.mv.as_str()
        };
        let mv = match text.parse::<Move>() {
            Ok(mv) => mv,
            Err(_) => formatter
                .parse(text, &before)
                .or_else(|_| SanNotation.parse(text, &before))?,
        };

        let moved = before.get(mv.from).ok_or(ChessError::EmptySquare(mv.from))?;
        let captured = captured_piece(&before, &mv, moved);
        let san = if stored.san.is_empty() {
            formatter.format(&mv, &before)
        } else {
            stored.san.clone()
        };

        Ok(GameMove {
            mv,
            movenum: stored.movenum,
            is_white: stored.is_white,
            san,
            before,
            after,
            moved,
            captured,
        })
    }
}

/// The piece `mv` removes from `before`: whatever stands on the target, or
/// the pawn taken en passant when a pawn moves diagonally onto the
/// en-passant square.
pub(crate) fn captured_piece(before: &Position, mv: &Move, moved: Piece) -> Option<Piece> {
    if let Some(target) = before.get(mv.to) {
        return Some(target);
    }
    en_passant_victim(before, mv, moved).and_then(|sq| before.get(sq))
}

/// Square of the pawn removed by an en-passant capture, if `mv` is one.
pub(crate) fn en_passant_victim(
    before: &Position,
    mv: &Move,
    moved: Piece,
) -> Option<Square> {
    if moved.kind != PieceKind::Pawn
        || mv.from.file() == mv.to.file()
        || before.en_passant != Some(mv.to)
        || !before.is_empty(mv.to)
    {
        return None;
    }
    let victim = Square::at(mv.to.file(), mv.from.rank());
    match before.get(victim) {
        Some(p) if p.kind == PieceKind::Pawn && p.color != moved.color => Some(victim),
        _ => None,
    }
}

// =========================================================================
// StoredMove
// =========================================================================

/// Serializable form of a history entry. Positions travel as FEN.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMove {
    #[serde(rename = "move")]
    pub mv: String,
    pub movenum: u32,
    pub is_white: bool,
    #[serde(default)]
    pub san: String,
    pub fen_before: String,
    pub fen_after: String,
}

impl From<&GameMove> for StoredMove {
    fn from(gm: &GameMove) -> Self {
        StoredMove {
            mv: gm.algebraic(),
            movenum: gm.movenum,
            is_white: gm.is_white,
            san: gm.san.clone(),
            fen_before: gm.before.to_fen(),
            fen_after: gm.after.to_fen(),
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::oracle::CoordinateNotation;

    fn sq(name: &str) -> Square {
        Square::from_algebraic(name).unwrap()
    }

    fn e2e4() -> GameMove {
        let before = Position::starting();
        let mut after = before.clone();
        after.apply_move(sq("e2"), sq("e4"), None).unwrap();
        GameMove {
            mv: Move::new(sq("e2"), sq("e4")),
            movenum: 1,
            is_white: true,
            san: "e4".into(),
            moved: before.get(sq("e2")).unwrap(),
            before,
            after,
            captured: None,
        }
    }

    fn with_ply(movenum: u32, is_white: bool) -> GameMove {
        GameMove {
            movenum,
            is_white,
            ..e2e4()
        }
    }

    #[test]
    fn halfmove_numbering() {
        assert_eq!(with_ply(1, true).halfmove(), 1);
        assert_eq!(with_ply(1, false).halfmove(), 2);
        assert_eq!(with_ply(2, true).halfmove(), 3);
        assert_eq!(with_ply(10, false).halfmove(), 20);
    }

    #[test]
    fn same_ply_ignores_contents() {
        let a = with_ply(3, false);
        let mut b = with_ply(3, false);
        b.mv = Move::new(sq("d2"), sq("d4"));
        b.san = "d4".into();
        assert!(a.same_ply(&b));
        assert_ne!(a, b);
        assert!(!a.same_ply(&with_ply(3, true)));
        assert!(!a.same_ply(&with_ply(4, false)));
    }

    #[test]
    fn reverse_swaps_endpoints_and_snapshots() {
        let gm = e2e4();
        let back = gm.reverse();
        assert_eq!(back.mv, Move::new(sq("e4"), sq("e2")));
        assert_eq!(back.before, gm.after);
        assert_eq!(back.after, gm.before);
        assert_eq!(back.movenum, 1);
        assert!(back.is_white);
        assert_eq!(back.san, "e4");
        assert_eq!(back.reverse(), gm);
    }

    #[test]
    fn algebraic_text() {
        assert_eq!(e2e4().algebraic(), "e2e4");
        assert_eq!(e2e4().color(), Color::White);
    }

    #[test]
    fn captured_piece_on_target() {
        let before =
            Position::from_fen("4k3/8/8/3p4/4P3/8/8/4K3 w - - 0 1").unwrap();
        let mv = Move::new(sq("e4"), sq("d5"));
        let moved = before.get(sq("e4")).unwrap();
        let captured = captured_piece(&before, &mv, moved).unwrap();
        assert_eq!(captured.symbol(), 'p');
    }

    #[test]
    fn captured_piece_en_passant() {
        let before =
            Position::from_fen("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 3").unwrap();
        let mv = Move::new(sq("e5"), sq("d6"));
        let moved = before.get(sq("e5")).unwrap();
        assert_eq!(en_passant_victim(&before, &mv, moved), Some(sq("d5")));
        assert_eq!(captured_piece(&before, &mv, moved).unwrap().symbol(), 'p');
    }

    #[test]
    fn captured_piece_quiet_move() {
        let before = Position::starting();
        let mv = Move::new(sq("e2"), sq("e4"));
        let moved = before.get(sq("e2")).unwrap();
        assert_eq!(captured_piece(&before, &mv, moved), None);
        assert_eq!(en_passant_victim(&before, &mv, moved), None);
    }

    #[test]
    fn stored_move_json_shape() {
        let stored = StoredMove::from(&e2e4());
        let json = serde_json::to_value(&stored).unwrap();
        assert_eq!(json["move"], "e2e4");
        assert_eq!(json["movenum"], 1);
        assert_eq!(json["isWhite"], true);
        assert_eq!(json["san"], "e4");
        assert_eq!(
            json["fenAfter"],
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 1"
        );
    }

    #[test]
    fn from_stored_rebuilds_entry() {
        let gm = e2e4();
        let stored = StoredMove::from(&gm);
        let back = GameMove::from_stored(&stored, &CoordinateNotation).unwrap();
        assert_eq!(back, gm);
    }

    #[test]
    fn from_stored_reads_san_when_move_text_missing() {
        let json = r#"{
            "move": "",
            "movenum": 1,
            "isWhite": true,
            "san": "Nf3",
            "fenBefore": "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            "fenAfter": "rnbqkbnr/pppppppp/8/8/8/5N2/PPPPPPPP/RNBQKB1R b KQkq - 1 1"
        }"#;
        let stored: StoredMove = serde_json::from_str(json).unwrap();
        let gm = GameMove::from_stored(&stored, &SanNotation).unwrap();
        assert_eq!(gm.mv(), Move::new(sq("g1"), sq("f3")));
        assert_eq!(gm.moved().symbol(), 'N');
    }

    #[test]
    fn from_stored_reads_san_under_coordinate_dialect() {
        let stored = StoredMove {
            mv: String::new(),
            movenum: 1,
            is_white: true,
            san: "Nf3".into(),
            fen_before: Position::starting().to_fen(),
            fen_after: "rnbqkbnr/pppppppp/8/8/8/5N2/PPPPPPPP/RNBQKB1R b KQkq - 1 1".into(),
        };
        let gm = GameMove::from_stored(&stored, &CoordinateNotation).unwrap();
        assert_eq!(gm.mv(), Move::new(sq("g1"), sq("f3")));
        assert_eq!(gm.san(), "Nf3");
    }

    #[test]
    fn from_stored_rejects_ply_that_disagrees_with_position() {
        let mut stored = StoredMove::from(&e2e4());
        stored.is_white = false;
        assert!(matches!(
            GameMove::from_stored(&stored, &CoordinateNotation),
            Err(ChessError::InvalidFen(_))
        ));

        let mut stored = StoredMove::from(&e2e4());
        stored.movenum = 4;
        assert!(matches!(
            GameMove::from_stored(&stored, &CoordinateNotation),
            Err(ChessError::InvalidFen(_))
        ));
    }

    #[test]
    fn from_stored_rejects_empty_source() {
        let stored = StoredMove {
            mv: "e4e5".into(),
            movenum: 1,
            is_white: true,
            san: String::new(),
            fen_before: Position::starting().to_fen(),
            fen_after: Position::starting().to_fen(),
        };
        assert_eq!(
            GameMove::from_stored(&stored, &CoordinateNotation),
            Err(ChessError::EmptySquare(sq("e4")))
        );
    }

    #[test]
    fn from_stored_rejects_bad_fen() {
        let stored = StoredMove {
            mv: "e2e4".into(),
            movenum: 1,
            is_white: true,
            san: String::new(),
            fen_before: "not a fen".into(),
            fen_after: Position::starting().to_fen(),
        };
        assert!(matches!(
            GameMove::from_stored(&stored, &CoordinateNotation),
            Err(ChessError::InvalidFen(_))
        ));
    }
}
