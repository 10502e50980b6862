//! Standard Algebraic Notation (SAN) generation and parsing.
//!
//! SAN examples: `e4`, `Nf3`, `Bxe5`, `O-O`, `e8=Q`, `Raxd1`.
//!
//! Move legality is not known here, so disambiguation and parsing work from
//! piece geometry alone: a piece "reaches" a square when its movement
//! pattern gets there over empty squares and the square does not hold a
//! piece of its own color. Pins and checks are ignored, and no `+`/`#`
//! suffix is produced.

use crate::engine::board::Position;
use crate::engine::oracle::NotationFormatter;
use crate::engine::types::{ChessError, Color, Move, Piece, PieceKind, Square};

/// SAN formatter/parser.
#[derive(Clone, Copy, Debug, Default)]
pub struct SanNotation;

impl NotationFormatter for SanNotation {
    fn format(&self, mv: &Move, before: &Position) -> String {
        move_to_san(before, mv)
    }

    fn parse(&self, text: &str, position: &Position) -> Result<Move, ChessError> {
        parse_san(position, text)
    }
}

// =========================================================================
// SAN generation
// =========================================================================

/// Convert a move to SAN notation. Falls back to coordinate notation when
/// the source square is empty.
pub fn move_to_san(pos: &Position, mv: &Move) -> String {
    let Some(piece) = pos.get(mv.from) else {
        return mv.to_string();
    };

    // Castling.
    if piece.kind == PieceKind::King
        && mv.from.rank() == mv.to.rank()
        && mv.from.file().abs_diff(mv.to.file()) == 2
    {
        return if mv.to.file() > mv.from.file() {
            "O-O".into()
        } else {
            "O-O-O".into()
        };
    }

    let is_capture = !pos.is_empty(mv.to);
    let mut san = String::with_capacity(8);

    if piece.kind == PieceKind::Pawn {
        if is_capture || mv.from.file() != mv.to.file() {
            // Prefix with departure file on captures: "exd5".
            san.push(mv.from.file_char());
            san.push('x');
        }
        san.push_str(&mv.to.to_algebraic());

        if let Some(promo) = mv.promotion {
            san.push('=');
            san.push(promo.letter());
        }
    } else {
        san.push(piece.kind.letter());
        san.push_str(&disambiguation(pos, mv, piece));
        if is_capture {
            san.push('x');
        }
        san.push_str(&mv.to.to_algebraic());
    }

    san
}

/// File, rank, or both, when another piece of the same kind and color also
/// reaches the target square.
fn disambiguation(pos: &Position, mv: &Move, piece: Piece) -> String {
    let rivals: Vec<Square> = pos
        .pieces()
        .filter(|&(sq, p)| sq != mv.from && p == piece && reaches(pos, sq, p, mv.to))
        .map(|(sq, _)| sq)
        .collect();

    if rivals.is_empty() {
        return String::new();
    }

    let same_file = rivals.iter().any(|sq| sq.file() == mv.from.file());
    let same_rank = rivals.iter().any(|sq| sq.rank() == mv.from.rank());

    match (same_file, same_rank) {
        (false, _) => mv.from.file_char().to_string(),
        (true, false) => mv.from.rank_char().to_string(),
        (true, true) => mv.from.to_algebraic(),
    }
}

// =========================================================================
// Geometry
// =========================================================================

/// Can `piece` standing on `from` move to `to` by its movement pattern?
pub fn reaches(pos: &Position, from: Square, piece: Piece, to: Square) -> bool {
    if from == to {
        return false;
    }
    let target = pos.get(to);
    if target.is_some_and(|t| t.color == piece.color) {
        return false;
    }

    let df = to.file() as i8 - from.file() as i8;
    let dr = to.rank() as i8 - from.rank() as i8;

    match piece.kind {
        PieceKind::Knight => matches!((df.abs(), dr.abs()), (1, 2) | (2, 1)),
        PieceKind::King => df.abs() <= 1 && dr.abs() <= 1,
        PieceKind::Rook => (df == 0) != (dr == 0) && path_clear(pos, from, to),
        PieceKind::Bishop => df.abs() == dr.abs() && path_clear(pos, from, to),
        PieceKind::Queen => {
            ((df == 0) != (dr == 0) || df.abs() == dr.abs()) && path_clear(pos, from, to)
        }
        PieceKind::Pawn => {
            let dir: i8 = match piece.color {
                Color::White => 1,
                Color::Black => -1,
            };
            let start_rank = match piece.color {
                Color::White => 2,
                Color::Black => 7,
            };
            if df == 0 {
                if target.is_some() {
                    return false;
                }
                dr == dir
                    || (dr == 2 * dir
                        && from.rank() == start_rank
                        && from.offset(0, dir).is_some_and(|mid| pos.is_empty(mid)))
            } else {
                df.abs() == 1 && dr == dir && (target.is_some() || pos.en_passant == Some(to))
            }
        }
    }
}

/// Every square strictly between `from` and `to` is empty. Only meaningful
/// for straight or diagonal lines.
fn path_clear(pos: &Position, from: Square, to: Square) -> bool {
    let step_f = (to.file() as i8 - from.file() as i8).signum();
    let step_r = (to.rank() as i8 - from.rank() as i8).signum();
    let mut cur = from.offset(step_f, step_r);
    while let Some(sq) = cur {
        if sq == to {
            return true;
        }
        if !pos.is_empty(sq) {
            return false;
        }
        cur = sq.offset(step_f, step_r);
    }
    false
}

// =========================================================================
// SAN parsing
// =========================================================================

/// Parse a SAN string for the side to move in `pos`.
///
/// Accepts `e4`, `Nf3`, `Bxe5`, `O-O`, `O-O-O`, `e8=Q`, `e8Q`, `Nbd7`,
/// `R1a3`, and plain coordinate moves such as `e2e4`. Check and annotation
/// suffixes (`+`, `#`, `!`, `?`) are ignored.
pub fn parse_san(pos: &Position, san: &str) -> Result<Move, ChessError> {
    let san = san.trim().trim_end_matches(['+', '#', '!', '?']);
    if san.is_empty() {
        return Err(ChessError::InvalidMove("empty SAN string".into()));
    }

    if let Ok(mv) = san.parse::<Move>() {
        return Ok(mv);
    }

    let us = pos.side_to_move;
    let home_rank = match us {
        Color::White => 1,
        Color::Black => 8,
    };

    // Castling.
    if san == "O-O" || san == "0-0" {
        return castle(pos, us, Square::at(5, home_rank), Square::at(7, home_rank), san);
    }
    if san == "O-O-O" || san == "0-0-0" {
        return castle(pos, us, Square::at(5, home_rank), Square::at(3, home_rank), san);
    }

    let chars: Vec<char> = san.chars().collect();

    // Detect promotion: "e8=Q" or "e8Q".
    let (chars, promotion) = match chars.as_slice() {
        [body @ .., '=', p] => (body, Some(promotion_kind(*p, san)?)),
        [.., d, p] if d.is_ascii_digit() && p.is_ascii_uppercase() => {
            (&chars[..chars.len() - 1], Some(promotion_kind(*p, san)?))
        }
        all => (all, None),
    };

    // Determine piece kind.
    let (kind, rest) = match chars.first() {
        Some(&c) if "NBRQK".contains(c) => match PieceKind::from_letter(c) {
            Some(kind) => (kind, &chars[1..]),
            None => return Err(ChessError::InvalidMove(san.to_string())),
        },
        _ => (PieceKind::Pawn, chars),
    };

    // Strip capture marker 'x' and long-notation dashes.
    let rest: Vec<char> = rest
        .iter()
        .copied()
        .filter(|&c| c != 'x' && c != '-' && c != ':')
        .collect();
    if rest.len() < 2 {
        return Err(ChessError::InvalidMove(format!("SAN too short: {san}")));
    }

    let (hint, dest) = rest.split_at(rest.len() - 2);
    let dest: String = dest.iter().collect();
    let to = Square::from_algebraic(&dest)
        .map_err(|_| ChessError::InvalidMove(format!("bad destination in {san}")))?;

    let mut hint_file = None;
    let mut hint_rank = None;
    for &c in hint {
        match c {
            'a'..='h' => hint_file = Some(c as u8 - b'a' + 1),
            '1'..='8' => hint_rank = Some(c as u8 - b'0'),
            _ => return Err(ChessError::InvalidMove(san.to_string())),
        }
    }

    if promotion.is_some() && kind != PieceKind::Pawn {
        return Err(ChessError::InvalidMove(format!(
            "only pawns promote: {san}"
        )));
    }

    let piece = Piece::new(us, kind);
    let candidates: Vec<Square> = pos
        .pieces()
        .filter(|&(sq, p)| {
            p == piece
                && hint_file.map_or(true, |f| sq.file() == f)
                && hint_rank.map_or(true, |r| sq.rank() == r)
                && reaches(pos, sq, p, to)
        })
        .map(|(sq, _)| sq)
        .collect();

    match candidates.as_slice() {
        [from] => Ok(Move {
            from: *from,
            to,
            promotion,
        }),
        [] => Err(ChessError::InvalidMove(format!(
            "no {us} piece can play {san}"
        ))),
        _ => Err(ChessError::InvalidMove(format!("ambiguous SAN: {san}"))),
    }
}

fn promotion_kind(c: char, san: &str) -> Result<PieceKind, ChessError> {
    PieceKind::from_letter(c)
        .filter(|k| k.is_promotion_target())
        .ok_or_else(|| ChessError::InvalidMove(format!("invalid promotion in {san}")))
}

fn castle(
    pos: &Position,
    us: Color,
    king_from: Square,
    king_to: Square,
    san: &str,
) -> Result<Move, ChessError> {
    if pos.get(king_from) != Some(Piece::new(us, PieceKind::King)) {
        return Err(ChessError::InvalidMove(format!(
            "{san}: no {us} king on {king_from}"
        )));
    }
    Ok(Move::new(king_from, king_to))
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(name: &str) -> Square {
        Square::from_algebraic(name).unwrap()
    }

    fn mv(from: &str, to: &str) -> Move {
        Move::new(sq(from), sq(to))
    }

    fn fen(s: &str) -> Position {
        Position::from_fen(s).unwrap()
    }

    // -----------------------------------------------------------------
    // Generation
    // -----------------------------------------------------------------

    #[test]
    fn san_pawn_push() {
        assert_eq!(move_to_san(&Position::starting(), &mv("e2", "e4")), "e4");
    }

    #[test]
    fn san_knight() {
        assert_eq!(move_to_san(&Position::starting(), &mv("g1", "f3")), "Nf3");
    }

    #[test]
    fn san_pawn_capture() {
        let pos = fen("4k3/8/8/3p4/4P3/8/8/4K3 w - - 0 1");
        assert_eq!(move_to_san(&pos, &mv("e4", "d5")), "exd5");
    }

    #[test]
    fn san_en_passant() {
        let pos = fen("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 3");
        assert_eq!(move_to_san(&pos, &mv("e5", "d6")), "exd6");
    }

    #[test]
    fn san_piece_capture() {
        let pos = fen("4k3/8/8/4p3/8/2B5/8/4K3 w - - 0 1");
        assert_eq!(move_to_san(&pos, &mv("c3", "e5")), "Bxe5");
    }

    #[test]
    fn san_castling() {
        let pos = fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1");
        assert_eq!(move_to_san(&pos, &mv("e1", "g1")), "O-O");
        assert_eq!(move_to_san(&pos, &mv("e1", "c1")), "O-O-O");
    }

    #[test]
    fn san_promotion() {
        let pos = fen("8/4P3/8/8/8/8/8/k6K w - - 0 1");
        let m = Move::with_promotion(sq("e7"), sq("e8"), PieceKind::Queen);
        assert_eq!(move_to_san(&pos, &m), "e8=Q");
    }

    #[test]
    fn san_disambiguation_by_file() {
        let pos = fen("4k3/8/8/8/8/8/8/R4RK1 w - - 0 1");
        assert_eq!(move_to_san(&pos, &mv("a1", "d1")), "Rad1");
        assert_eq!(move_to_san(&pos, &mv("f1", "d1")), "Rfd1");
        assert_eq!(parse_san(&pos, "Rfd1").unwrap(), mv("f1", "d1"));
    }

    #[test]
    fn san_disambiguation_by_rank() {
        let pos = fen("4k3/8/8/R7/8/8/8/R3K3 w - - 0 1");
        assert_eq!(move_to_san(&pos, &mv("a1", "a3")), "R1a3");
    }

    #[test]
    fn san_disambiguation_by_square() {
        let pos = fen("4k3/8/8/8/8/Q1Q5/8/Q1Q1K3 w - - 0 1");
        assert_eq!(move_to_san(&pos, &mv("a1", "b2")), "Qa1b2");
    }

    #[test]
    fn san_blocked_rival_needs_no_disambiguation() {
        // The rook on h1 is blocked by the king on e1.
        let pos = fen("4k3/8/8/8/8/8/8/R3K2R w - - 0 1");
        assert_eq!(move_to_san(&pos, &mv("a1", "c1")), "Rc1");
    }

    #[test]
    fn san_empty_source_falls_back() {
        assert_eq!(move_to_san(&Position::starting(), &mv("e4", "e5")), "e4e5");
    }

    // -----------------------------------------------------------------
    // Parsing
    // -----------------------------------------------------------------

    #[test]
    fn parse_pawn_moves() {
        let pos = Position::starting();
        assert_eq!(parse_san(&pos, "e4"), Ok(mv("e2", "e4")));
        assert_eq!(parse_san(&pos, "e3"), Ok(mv("e2", "e3")));
        assert!(parse_san(&pos, "e5").is_err());
    }

    #[test]
    fn parse_black_pawn() {
        let pos = fen("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1");
        assert_eq!(parse_san(&pos, "e5"), Ok(mv("e7", "e5")));
        assert_eq!(parse_san(&pos, "Nc6"), Ok(mv("b8", "c6")));
    }

    #[test]
    fn parse_knight_with_suffix() {
        let pos = Position::starting();
        assert_eq!(parse_san(&pos, "Nf3+"), Ok(mv("g1", "f3")));
        assert_eq!(parse_san(&pos, "Nc3!?"), Ok(mv("b1", "c3")));
    }

    #[test]
    fn parse_capture() {
        let pos = fen("4k3/8/8/3p4/4P3/8/8/4K3 w - - 0 1");
        assert_eq!(parse_san(&pos, "exd5"), Ok(mv("e4", "d5")));
    }

    #[test]
    fn parse_castling() {
        let pos = fen("r3k2r/8/8/8/8/8/8/R3K2R b KQkq - 0 1");
        assert_eq!(parse_san(&pos, "O-O"), Ok(mv("e8", "g8")));
        assert_eq!(parse_san(&pos, "0-0-0"), Ok(mv("e8", "c8")));
        assert!(parse_san(&Position::from_fen("8/8/8/8/8/8/8/8").unwrap(), "O-O").is_err());
    }

    #[test]
    fn parse_promotion() {
        let pos = fen("8/4P3/8/8/8/8/8/k6K w - - 0 1");
        let expected = Move::with_promotion(sq("e7"), sq("e8"), PieceKind::Queen);
        assert_eq!(parse_san(&pos, "e8=Q"), Ok(expected));
        assert_eq!(parse_san(&pos, "e8Q"), Ok(expected));
        assert!(parse_san(&pos, "e8=K").is_err());
    }

    #[test]
    fn parse_disambiguated() {
        let pos = fen("4k3/8/8/8/8/8/8/R3K2R w - - 0 1");
        assert_eq!(parse_san(&pos, "Rad1"), Ok(mv("a1", "d1")));
        let pos = fen("4k3/8/8/R7/8/8/8/R3K3 w - - 0 1");
        assert_eq!(parse_san(&pos, "R1a3"), Ok(mv("a1", "a3")));
        assert!(parse_san(&pos, "Ra3").is_err());
    }

    #[test]
    fn parse_coordinate_fallback() {
        assert_eq!(parse_san(&Position::starting(), "g1f3"), Ok(mv("g1", "f3")));
    }

    #[test]
    fn parse_garbage() {
        let pos = Position::starting();
        for bad in ["", "+", "Z4", "Nz9", "x", "Qd"] {
            assert!(parse_san(&pos, bad).is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn generated_san_parses_back() {
        let pos = fen("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1");
        for m in [mv("e5", "f7"), mv("d5", "e6"), mv("c3", "b5"), mv("e1", "g1"), mv("f3", "h3")] {
            let san = move_to_san(&pos, &m);
            assert_eq!(parse_san(&pos, &san), Ok(m), "{san}");
        }
    }
}
