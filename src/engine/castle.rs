//! Companion rook moves for castling.
//!
//! Given a king move, the resolver names the rook move that completes the
//! castle. The same table serves undo: a king walking back from its castled
//! square pairs with the rook walking back to its corner.

use crate::engine::game_move::GameMove;
use crate::engine::types::{Color, Move, Piece, PieceKind, Square};

/// (king colour, king from, king to, rook from, rook to)
type CastlePair = (Color, Square, Square, Square, Square);

const CASTLE_PAIRS: [CastlePair; 4] = [
    (Color::White, Square::at(5, 1), Square::at(7, 1), Square::at(8, 1), Square::at(6, 1)),
    (Color::White, Square::at(5, 1), Square::at(3, 1), Square::at(1, 1), Square::at(4, 1)),
    (Color::Black, Square::at(5, 8), Square::at(7, 8), Square::at(8, 8), Square::at(6, 8)),
    (Color::Black, Square::at(5, 8), Square::at(3, 8), Square::at(1, 8), Square::at(4, 8)),
];

/// Stateless lookup of castle companion moves.
#[derive(Clone, Copy, Debug, Default)]
pub struct CastlePairResolver;

impl CastlePairResolver {
    /// Rook move that accompanies `gm`, forward or undone. `None` for
    /// anything that is not a castling king move.
    pub fn resolve(&self, gm: &GameMove) -> Option<Move> {
        let mv = gm.mv();
        self.resolve_forward(gm.moved(), mv.from, mv.to)
            .or_else(|| self.resolve_reverse(gm.moved(), mv.from, mv.to))
    }

    /// Rook move for a king castling `from` → `to`.
    pub fn resolve_forward(&self, piece: Piece, from: Square, to: Square) -> Option<Move> {
        if piece.kind != PieceKind::King {
            return None;
        }
        CASTLE_PAIRS
            .iter()
            .find(|(color, kf, kt, _, _)| *color == piece.color && *kf == from && *kt == to)
            .map(|&(_, _, _, rf, rt)| Move::new(rf, rt))
    }

    /// Rook move for a castled king walking back `from` → `to`.
    pub fn resolve_reverse(&self, piece: Piece, from: Square, to: Square) -> Option<Move> {
        if piece.kind != PieceKind::King {
            return None;
        }
        CASTLE_PAIRS
            .iter()
            .find(|(color, kf, kt, _, _)| *color == piece.color && *kt == from && *kf == to)
            .map(|&(_, _, _, rf, rt)| Move::new(rt, rf))
    }

    pub fn is_castle(&self, piece: Piece, from: Square, to: Square) -> bool {
        self.resolve_forward(piece, from, to).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::board::Position;

    fn sq(name: &str) -> Square {
        Square::from_algebraic(name).unwrap()
    }

    const WK: Piece = Piece::new(Color::White, PieceKind::King);
    const BK: Piece = Piece::new(Color::Black, PieceKind::King);

    #[test]
    fn forward_pairs() {
        let r = CastlePairResolver;
        assert_eq!(
            r.resolve_forward(WK, sq("e1"), sq("g1")),
            Some(Move::new(sq("h1"), sq("f1")))
        );
        assert_eq!(
            r.resolve_forward(WK, sq("e1"), sq("c1")),
            Some(Move::new(sq("a1"), sq("d1")))
        );
        assert_eq!(
            r.resolve_forward(BK, sq("e8"), sq("g8")),
            Some(Move::new(sq("h8"), sq("f8")))
        );
        assert_eq!(
            r.resolve_forward(BK, sq("e8"), sq("c8")),
            Some(Move::new(sq("a8"), sq("d8")))
        );
    }

    #[test]
    fn reverse_pairs() {
        let r = CastlePairResolver;
        assert_eq!(
            r.resolve_reverse(WK, sq("g1"), sq("e1")),
            Some(Move::new(sq("f1"), sq("h1")))
        );
        assert_eq!(
            r.resolve_reverse(BK, sq("c8"), sq("e8")),
            Some(Move::new(sq("d8"), sq("a8")))
        );
    }

    #[test]
    fn non_castles() {
        let r = CastlePairResolver;
        assert_eq!(r.resolve_forward(WK, sq("e1"), sq("f1")), None);
        // Wrong colour for the squares.
        assert_eq!(r.resolve_forward(BK, sq("e1"), sq("g1")), None);
        // A rook making the king's journey is not a castle.
        let rook = Piece::new(Color::White, PieceKind::Rook);
        assert_eq!(r.resolve_forward(rook, sq("e1"), sq("g1")), None);
        assert!(!r.is_castle(rook, sq("e1"), sq("g1")));
        assert!(r.is_castle(WK, sq("e1"), sq("g1")));
    }

    #[test]
    fn resolve_entry_and_its_reverse() {
        let before =
            Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let mut after = before.clone();
        after.apply_move(sq("e1"), sq("g1"), None).unwrap();
        after.apply_move(sq("h1"), sq("f1"), None).unwrap();
        let gm = GameMove {
            mv: Move::new(sq("e1"), sq("g1")),
            movenum: 1,
            is_white: true,
            san: "O-O".into(),
            before,
            after,
            moved: WK,
            captured: None,
        };
        let r = CastlePairResolver;
        assert_eq!(r.resolve(&gm), Some(Move::new(sq("h1"), sq("f1"))));
        assert_eq!(r.resolve(&gm.reverse()), Some(Move::new(sq("f1"), sq("h1"))));
    }
}
