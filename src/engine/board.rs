//! Board position and its notation codec.
//!
//! `Position` stores one occupancy slot per square in rank-major order
//! (a8 first, h1 last), plus the notation metadata: side to move, castling
//! rights, en-passant target and the two move counters.

use crate::engine::types::{CastlingRights, ChessError, Color, Piece, PieceKind, Square};

/// Notation string of the standard starting position.
pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Empty-square marker in the compact board string.
pub const EMPTY_SYMBOL: char = '.';

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// A complete board snapshot.
///
/// Snapshots are plain values: cloning yields an independent copy, which is
/// what the history relies on when it stores before/after boards.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Position {
    squares: [Option<Piece>; Square::NUM],

    /// Whose turn it is.
    pub side_to_move: Color,

    /// Castling availability (K/Q/k/q).
    pub castling_rights: CastlingRights,

    /// En-passant target square (the square *behind* the double-pushed pawn).
    pub en_passant: Option<Square>,

    /// Half-move clock for the 50-move rule (reset on pawn move or capture).
    pub halfmove_clock: u16,

    /// Full-move number (starts at 1, incremented after Black moves).
    pub fullmove_number: u16,
}

impl Position {
    /// Create an empty board with no pieces.
    pub fn empty() -> Self {
        Position {
            squares: [None; Square::NUM],
            side_to_move: Color::White,
            castling_rights: CastlingRights::NONE,
            en_passant: None,
            halfmove_clock: 0,
            fullmove_number: 1,
        }
    }

    /// Standard starting position.
    pub fn starting() -> Self {
        Self::from_fen(STARTING_FEN).expect("starting FEN is always valid")
    }

    // -----------------------------------------------------------------------
    // Square access
    // -----------------------------------------------------------------------

    /// What piece (if any) is on a given square?
    #[inline]
    pub fn get(&self, sq: Square) -> Option<Piece> {
        self.squares[sq.index()]
    }

    /// Overwrite a square; `None` empties it.
    #[inline]
    pub fn set(&mut self, sq: Square, piece: Option<Piece>) {
        self.squares[sq.index()] = piece;
    }

    #[inline]
    pub fn is_empty(&self, sq: Square) -> bool {
        self.squares[sq.index()].is_none()
    }

    /// All occupied squares in index order.
    pub fn pieces(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        Square::all().filter_map(move |sq| self.get(sq).map(|p| (sq, p)))
    }

    /// Move whatever stands on `from` to `to`, replacing it with the
    /// promotion piece if one is given. A piece on `to` is overwritten.
    ///
    /// No legality check is done here. Fails without touching the board if
    /// `from` is empty.
    pub fn apply_move(
        &mut self,
        from: Square,
        to: Square,
        promotion: Option<PieceKind>,
    ) -> Result<(), ChessError> {
        let piece = self.get(from).ok_or(ChessError::EmptySquare(from))?;
        let landing = promotion
            .map(|kind| Piece::new(piece.color, kind))
            .unwrap_or(piece);
        self.set(from, None);
        self.set(to, Some(landing));
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Turn bookkeeping
    // -----------------------------------------------------------------------

    /// Advance the notation metadata after `moved` went `from` → `to`.
    ///
    /// Castling rights are dropped for any king or rook home square the move
    /// touches and a double pawn push sets the en-passant target. The
    /// counters advance and the turn passes to the other side.
    pub(crate) fn finish_turn(
        &mut self,
        from: Square,
        to: Square,
        moved: Piece,
        captured: Option<Piece>,
    ) {
        self.castling_rights.0 &= castling_mask(from) & castling_mask(to);

        self.en_passant = None;
        if moved.kind == PieceKind::Pawn
            && from.file() == to.file()
            && from.rank().abs_diff(to.rank()) == 2
        {
            self.en_passant = Some(Square::at(from.file(), (from.rank() + to.rank()) / 2));
        }

        if moved.kind == PieceKind::Pawn || captured.is_some() {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock = self.halfmove_clock.saturating_add(1);
        }

        if self.side_to_move == Color::Black {
            self.fullmove_number = self.fullmove_number.saturating_add(1);
        }
        self.side_to_move = !self.side_to_move;
    }

    // -----------------------------------------------------------------------
    // Compact board string
    // -----------------------------------------------------------------------

    /// The 64 symbols in index order, `.` for empty squares.
    pub fn to_compact(&self) -> String {
        self.squares
            .iter()
            .map(|slot| slot.map(Piece::symbol).unwrap_or(EMPTY_SYMBOL))
            .collect()
    }

    /// Parse a 64-symbol compact board. Metadata takes the defaults of
    /// [`Position::empty`].
    pub fn from_compact(s: &str) -> Result<Self, ChessError> {
        let mut pos = Position::empty();
        let mut count = 0usize;
        for (idx, ch) in s.chars().enumerate() {
            if idx >= Square::NUM {
                return Err(ChessError::InvalidFen(format!(
                    "compact board longer than {} symbols",
                    Square::NUM
                )));
            }
            pos.squares[idx] = match ch {
                EMPTY_SYMBOL => None,
                c => Some(Piece::from_symbol(c).ok_or_else(|| {
                    ChessError::InvalidFen(format!("invalid character '{c}' in compact board"))
                })?),
            };
            count += 1;
        }
        if count != Square::NUM {
            return Err(ChessError::InvalidFen(format!(
                "compact board has {count} symbols instead of {}",
                Square::NUM
            )));
        }
        Ok(pos)
    }

    // -----------------------------------------------------------------------
    // Board display (8×8 text grid)
    // -----------------------------------------------------------------------

    /// Render the board as an 8-line string (rank 8 at top), useful for debugging.
    pub fn board_string(&self) -> String {
        let mut s = String::with_capacity(200);
        for rank in (1..=8u8).rev() {
            s.push((b'0' + rank) as char);
            s.push(' ');
            for file in 1..=8u8 {
                let ch = self
                    .get(Square::at(file, rank))
                    .map(Piece::symbol)
                    .unwrap_or(EMPTY_SYMBOL);
                s.push(ch);
                if file < 8 {
                    s.push(' ');
                }
            }
            s.push('\n');
        }
        s.push_str("  a b c d e f g h");
        s
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::starting()
    }
}

/// Rights that survive a move touching `sq`. The king's home square removes
/// both of that side's rights; a rook's home square removes its own.
fn castling_mask(sq: Square) -> u8 {
    let all = CastlingRights::ALL.0;
    match (sq.file(), sq.rank()) {
        (1, 1) => all & !CastlingRights::WHITE_QUEENSIDE,
        (5, 1) => all & !(CastlingRights::WHITE_KINGSIDE | CastlingRights::WHITE_QUEENSIDE),
        (8, 1) => all & !CastlingRights::WHITE_KINGSIDE,
        (1, 8) => all & !CastlingRights::BLACK_QUEENSIDE,
        (5, 8) => all & !(CastlingRights::BLACK_KINGSIDE | CastlingRights::BLACK_QUEENSIDE),
        (8, 8) => all & !CastlingRights::BLACK_KINGSIDE,
        _ => all,
    }
}

// ---------------------------------------------------------------------------
// FEN parsing & generation
// ---------------------------------------------------------------------------

impl Position {
    /// Parse a notation string into a `Position`.
    ///
    /// The board field is required. The remaining five fields (side to move,
    /// castling, en passant, halfmove clock, fullmove number) are validated
    /// when present and default to `w - - 0 1` when absent, so a bare board
    /// field is accepted too.
    pub fn from_fen(fen: &str) -> Result<Self, ChessError> {
        let fields: Vec<&str> = fen.split_whitespace().collect();
        if fields.is_empty() || fields.len() > 6 {
            return Err(ChessError::InvalidFen(format!(
                "expected 1 to 6 fields, got {}",
                fields.len()
            )));
        }

        let mut pos = Position::empty();
        pos.squares = parse_board_field(fields[0])?;

        // ----- Field 2: Side to move -----
        if let Some(&side) = fields.get(1) {
            pos.side_to_move = match side {
                "w" => Color::White,
                "b" => Color::Black,
                other => {
                    return Err(ChessError::InvalidFen(format!(
                        "invalid side to move: '{other}'"
                    )));
                }
            };
        }

        // ----- Field 3: Castling availability -----
        if let Some(&castling) = fields.get(2) {
            pos.castling_rights = CastlingRights::from_fen(castling).ok_or_else(|| {
                ChessError::InvalidFen(format!("invalid castling string: '{castling}'"))
            })?;
        }

        // ----- Field 4: En passant target square -----
        if let Some(&ep) = fields.get(3) {
            if ep != "-" {
                let ep_sq = Square::from_algebraic(ep).map_err(|_| {
                    ChessError::InvalidFen(format!("invalid en passant square: '{ep}'"))
                })?;
                if ep_sq.rank() != 3 && ep_sq.rank() != 6 {
                    return Err(ChessError::InvalidFen(format!(
                        "en passant square {ep} is not on rank 3 or 6"
                    )));
                }
                pos.en_passant = Some(ep_sq);
            }
        }

        // ----- Field 5: Halfmove clock -----
        if let Some(&clock) = fields.get(4) {
            pos.halfmove_clock = clock.parse::<u16>().map_err(|_| {
                ChessError::InvalidFen(format!("invalid halfmove clock: '{clock}'"))
            })?;
        }

        // ----- Field 6: Fullmove number -----
        if let Some(&number) = fields.get(5) {
            pos.fullmove_number = number.parse::<u16>().map_err(|_| {
                ChessError::InvalidFen(format!("invalid fullmove number: '{number}'"))
            })?;
            if pos.fullmove_number == 0 {
                return Err(ChessError::InvalidFen(
                    "fullmove number must be >= 1".to_string(),
                ));
            }
        }

        Ok(pos)
    }

    /// Export the position as a full six-field notation string.
    pub fn to_fen(&self) -> String {
        let mut fen = self.board_fen();

        fen.push(' ');
        fen.push(self.side_to_move.fen_char());

        fen.push(' ');
        fen.push_str(&self.castling_rights.to_fen());

        fen.push(' ');
        match self.en_passant {
            Some(sq) => fen.push_str(&sq.to_algebraic()),
            None => fen.push('-'),
        }

        fen.push(' ');
        fen.push_str(&self.halfmove_clock.to_string());

        fen.push(' ');
        fen.push_str(&self.fullmove_number.to_string());

        fen
    }

    /// Only the board field: ranks 8..1 separated by '/', empty runs as digits.
    pub fn board_fen(&self) -> String {
        let mut fen = String::with_capacity(72);
        for rank in (1..=8u8).rev() {
            let mut empty_count = 0u8;
            for file in 1..=8u8 {
                match self.get(Square::at(file, rank)) {
                    Some(piece) => {
                        if empty_count > 0 {
                            fen.push((b'0' + empty_count) as char);
                            empty_count = 0;
                        }
                        fen.push(piece.symbol());
                    }
                    None => empty_count += 1,
                }
            }
            if empty_count > 0 {
                fen.push((b'0' + empty_count) as char);
            }
            if rank > 1 {
                fen.push('/');
            }
        }
        fen
    }
}

/// Expand the run-length board field into 64 slots.
fn parse_board_field(field: &str) -> Result<[Option<Piece>; Square::NUM], ChessError> {
    let ranks: Vec<&str> = field.split('/').collect();
    if ranks.len() != 8 {
        return Err(ChessError::InvalidFen(format!(
            "expected 8 ranks, got {}",
            ranks.len()
        )));
    }

    let mut squares = [None; Square::NUM];
    for (rank_idx, rank_str) in ranks.iter().enumerate() {
        let rank = 8 - rank_idx as u8; // FEN starts from rank 8
        let mut file: u8 = 1;
        for ch in rank_str.chars() {
            if file > 8 {
                return Err(ChessError::InvalidFen(format!(
                    "too many squares in rank {rank}"
                )));
            }
            if let Some(digit) = ch.to_digit(10) {
                if !(1..=8).contains(&digit) {
                    return Err(ChessError::InvalidFen(format!(
                        "invalid empty count '{ch}' in rank {rank}"
                    )));
                }
                file += digit as u8;
            } else if let Some(piece) = Piece::from_symbol(ch) {
                squares[Square::at(file, rank).index()] = Some(piece);
                file += 1;
            } else {
                return Err(ChessError::InvalidFen(format!(
                    "invalid character '{ch}' in piece placement"
                )));
            }
        }
        if file != 9 {
            return Err(ChessError::InvalidFen(format!(
                "rank {rank} has {} squares instead of 8",
                file - 1
            )));
        }
    }
    Ok(squares)
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.board_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(name: &str) -> Square {
        Square::from_algebraic(name).unwrap()
    }

    fn white(kind: PieceKind) -> Option<Piece> {
        Some(Piece::new(Color::White, kind))
    }

    fn black(kind: PieceKind) -> Option<Piece> {
        Some(Piece::new(Color::Black, kind))
    }

    // ===================================================================
    // Starting position
    // ===================================================================

    #[test]
    fn starting_position_fen() {
        assert_eq!(Position::starting().to_fen(), STARTING_FEN);
    }

    #[test]
    fn starting_position_board_field() {
        let pos = Position::from_fen(STARTING_FEN).unwrap();
        assert_eq!(pos.board_fen(), "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR");
        assert_eq!(pos.side_to_move, Color::White);
        assert_eq!(pos.castling_rights, CastlingRights::ALL);
        assert_eq!(pos.en_passant, None);
        assert_eq!(pos.halfmove_clock, 0);
        assert_eq!(pos.fullmove_number, 1);
    }

    #[test]
    fn starting_position_pieces() {
        let pos = Position::starting();
        assert_eq!(pos.get(sq("e1")), white(PieceKind::King));
        assert_eq!(pos.get(sq("d8")), black(PieceKind::Queen));
        assert_eq!(pos.get(sq("a1")), white(PieceKind::Rook));
        assert_eq!(pos.get(sq("g8")), black(PieceKind::Knight));
        assert!(pos.is_empty(sq("e4")));
        assert_eq!(pos.pieces().count(), 32);
    }

    // ===================================================================
    // FEN round trips
    // ===================================================================

    #[test]
    fn fen_round_trip_after_e4() {
        let fen = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1";
        assert_eq!(Position::from_fen(fen).unwrap().to_fen(), fen);
    }

    #[test]
    fn fen_round_trip_kiwipete() {
        let fen = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
        assert_eq!(Position::from_fen(fen).unwrap().to_fen(), fen);
    }

    #[test]
    fn fen_round_trip_endgame() {
        let fen = "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1";
        assert_eq!(Position::from_fen(fen).unwrap().to_fen(), fen);
    }

    #[test]
    fn fen_round_trip_symbol_for_symbol() {
        let pos = Position::from_fen("r3k2r/8/8/3pP3/8/8/8/R3K2R w Kq d6 4 23").unwrap();
        let again = Position::from_fen(&pos.to_fen()).unwrap();
        assert_eq!(again, pos);
    }

    #[test]
    fn fen_board_field_only_uses_defaults() {
        let pos = Position::from_fen("8/8/8/8/8/8/8/8").unwrap();
        assert_eq!(pos, Position::empty());
        assert_eq!(pos.to_fen(), "8/8/8/8/8/8/8/8 w - - 0 1");
    }

    #[test]
    fn fen_editor_boards_without_kings_are_accepted() {
        let pos = Position::from_fen("8/8/8/3q4/8/8/8/8 b - - 0 1").unwrap();
        assert_eq!(pos.get(sq("d5")), black(PieceKind::Queen));
    }

    // ===================================================================
    // FEN errors
    // ===================================================================

    #[test]
    fn fen_error_field_count() {
        assert!(Position::from_fen("").is_err());
        assert!(Position::from_fen(&format!("{STARTING_FEN} extra")).is_err());
    }

    #[test]
    fn fen_error_wrong_rank_count() {
        assert!(Position::from_fen("8/8/8/8/8/8/8 w - - 0 1").is_err());
    }

    #[test]
    fn fen_error_invalid_piece_char() {
        let err = Position::from_fen("rnbqkbnr/ppppxppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1")
            .unwrap_err();
        assert!(matches!(err, ChessError::InvalidFen(_)));
    }

    #[test]
    fn fen_error_rank_too_long() {
        assert!(Position::from_fen("rnbqkbnrr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR").is_err());
        assert!(Position::from_fen("44p/8/8/8/8/8/8/8").is_err());
    }

    #[test]
    fn fen_error_rank_too_short() {
        assert!(Position::from_fen("7/8/8/8/8/8/8/8").is_err());
    }

    #[test]
    fn fen_error_zero_and_nine_digits() {
        assert!(Position::from_fen("08/8/8/8/8/8/8/8").is_err());
        assert!(Position::from_fen("9/8/8/8/8/8/8/8").is_err());
    }

    #[test]
    fn fen_error_metadata_fields() {
        let board = "8/8/8/8/8/8/8/8";
        assert!(Position::from_fen(&format!("{board} x - - 0 1")).is_err());
        assert!(Position::from_fen(&format!("{board} w KX - 0 1")).is_err());
        assert!(Position::from_fen(&format!("{board} w - e4 0 1")).is_err());
        assert!(Position::from_fen(&format!("{board} w - z9 0 1")).is_err());
        assert!(Position::from_fen(&format!("{board} w - - abc 1")).is_err());
        assert!(Position::from_fen(&format!("{board} w - - 0 0")).is_err());
    }

    // ===================================================================
    // Compact board string
    // ===================================================================

    #[test]
    fn compact_starting() {
        let compact = Position::starting().to_compact();
        assert_eq!(compact.len(), 64);
        assert!(compact.starts_with("rnbqkbnrpppppppp........"));
        assert!(compact.ends_with("PPPPPPPPRNBQKBNR"));
    }

    #[test]
    fn compact_round_trip() {
        let pos = Position::from_fen("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R")
            .unwrap();
        assert_eq!(Position::from_compact(&pos.to_compact()).unwrap(), pos);
    }

    #[test]
    fn compact_errors() {
        assert!(Position::from_compact("").is_err());
        assert!(Position::from_compact(&".".repeat(65)).is_err());
        assert!(Position::from_compact(&format!("{}x", ".".repeat(63))).is_err());
    }

    // ===================================================================
    // apply_move
    // ===================================================================

    #[test]
    fn apply_e2e4() {
        let mut pos = Position::starting();
        pos.apply_move(sq("e2"), sq("e4"), None).unwrap();
        assert_eq!(pos.board_fen(), "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR");
    }

    #[test]
    fn apply_capture_overwrites_target() {
        let mut pos = Position::from_fen("4k3/8/8/3p4/4P3/8/8/4K3").unwrap();
        pos.apply_move(sq("e4"), sq("d5"), None).unwrap();
        assert_eq!(pos.get(sq("d5")), white(PieceKind::Pawn));
        assert!(pos.is_empty(sq("e4")));
        assert_eq!(pos.pieces().count(), 3);
    }

    #[test]
    fn apply_promotion_keeps_color() {
        let mut pos = Position::from_fen("8/8/8/8/8/8/p7/8").unwrap();
        pos.apply_move(sq("a2"), sq("a1"), Some(PieceKind::Queen))
            .unwrap();
        assert_eq!(pos.get(sq("a1")), black(PieceKind::Queen));
        assert!(pos.is_empty(sq("a2")));
    }

    #[test]
    fn apply_from_empty_square_fails_without_mutation() {
        let mut pos = Position::starting();
        let before = pos.clone();
        let err = pos.apply_move(sq("e3"), sq("e4"), None).unwrap_err();
        assert_eq!(err, ChessError::EmptySquare(sq("e3")));
        assert_eq!(pos, before);
    }

    #[test]
    fn set_and_clear() {
        let mut pos = Position::empty();
        pos.set(sq("c3"), black(PieceKind::Bishop));
        assert_eq!(pos.board_fen(), "8/8/8/8/8/2b5/8/8");
        pos.set(sq("c3"), None);
        assert!(pos.is_empty(sq("c3")));
    }

    // ===================================================================
    // Turn bookkeeping
    // ===================================================================

    #[test]
    fn finish_turn_double_push_sets_en_passant() {
        let mut pos = Position::starting();
        pos.apply_move(sq("e2"), sq("e4"), None).unwrap();
        pos.finish_turn(sq("e2"), sq("e4"), Piece::new(Color::White, PieceKind::Pawn), None);
        assert_eq!(
            pos.to_fen(),
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1"
        );
    }

    #[test]
    fn finish_turn_black_move_increments_fullmove() {
        let mut pos =
            Position::from_fen("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1")
                .unwrap();
        pos.apply_move(sq("g8"), sq("f6"), None).unwrap();
        pos.finish_turn(sq("g8"), sq("f6"), Piece::new(Color::Black, PieceKind::Knight), None);
        assert_eq!(pos.side_to_move, Color::White);
        assert_eq!(pos.fullmove_number, 2);
        assert_eq!(pos.halfmove_clock, 1);
        assert_eq!(pos.en_passant, None);
    }

    #[test]
    fn finish_turn_king_and_rook_moves_drop_rights() {
        let mut pos = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        pos.finish_turn(sq("h1"), sq("h5"), Piece::new(Color::White, PieceKind::Rook), None);
        assert_eq!(pos.castling_rights.to_fen(), "Qkq");
        pos.finish_turn(sq("e8"), sq("d8"), Piece::new(Color::Black, PieceKind::King), None);
        assert_eq!(pos.castling_rights.to_fen(), "Q");
    }

    #[test]
    fn finish_turn_rook_capture_drops_rights() {
        let mut pos = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        pos.finish_turn(
            sq("a1"),
            sq("a8"),
            Piece::new(Color::White, PieceKind::Rook),
            black(PieceKind::Rook),
        );
        assert_eq!(pos.castling_rights.to_fen(), "Kk");
        assert_eq!(pos.halfmove_clock, 0);
    }

    #[test]
    fn board_string_layout() {
        let s = Position::starting().board_string();
        let first = s.lines().next().unwrap();
        assert_eq!(first, "8 r n b q k b n r");
        assert!(s.ends_with("  a b c d e f g h"));
    }
}
