//! Stateful game controller.
//!
//! `GameEngine` owns the live position and the move history. Proposed moves
//! go through the injected legality oracle, are applied to a copy of the
//! position, and are recorded as `GameMove`s. Navigation calls move the
//! history cursor and apply the resulting replay directive to the live
//! position.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::engine::board::Position;
use crate::engine::castle::CastlePairResolver;
use crate::engine::game_move::{captured_piece, en_passant_victim, GameMove, StoredMove};
use crate::engine::history::{Direction, MoveHistory, Navigation, Replay, ReplayStep};
use crate::engine::oracle::{LegalityOracle, NotationFormatter, OccupancyOracle, TurnOracle};
use crate::engine::san::SanNotation;
use crate::engine::types::{ChessError, Color, Move, PieceKind};

// =========================================================================
// SavedGame
// =========================================================================

/// A whole game in interchange form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedGame {
    pub initial_fen: String,
    #[serde(default)]
    pub white_player: String,
    #[serde(default)]
    pub black_player: String,
    pub moves: Vec<StoredMove>,
}

// =========================================================================
// GameEngine
// =========================================================================

pub struct GameEngine {
    position: Position,
    history: MoveHistory,
    oracle: Box<dyn LegalityOracle>,
    formatter: Box<dyn NotationFormatter>,
    resolver: CastlePairResolver,

    // Metadata
    pub id: String,
    pub white_player: String,
    pub black_player: String,
    pub created_at: DateTime<Utc>,
}

impl GameEngine {
    // -----------------------------------------------------------------
    // Constructors
    // -----------------------------------------------------------------

    /// Create an engine at the standard starting position.
    pub fn new(oracle: Box<dyn LegalityOracle>, formatter: Box<dyn NotationFormatter>) -> Self {
        let position = Position::starting();
        Self {
            history: MoveHistory::new(position.clone()),
            position,
            oracle,
            formatter,
            resolver: CastlePairResolver,
            id: Uuid::new_v4().to_string(),
            white_player: "White".into(),
            black_player: "Black".into(),
            created_at: Utc::now(),
        }
    }

    /// Create an engine with the oracle and notation named in `config`.
    pub fn from_config(config: &AppConfig) -> Self {
        let oracle: Box<dyn LegalityOracle> = if config.strict_turns {
            Box::new(TurnOracle)
        } else {
            Box::new(OccupancyOracle)
        };
        Self::new(oracle, config.notation.formatter())
    }

    // -----------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------

    /// Current board position.
    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn history(&self) -> &MoveHistory {
        &self.history
    }

    /// The entry at the history cursor, `None` before the first move.
    pub fn current_move(&self) -> Option<&GameMove> {
        self.history.current()
    }

    pub fn side_to_move(&self) -> Color {
        self.position.side_to_move
    }

    /// Current position as FEN.
    pub fn to_fen(&self) -> String {
        self.position.to_fen()
    }

    pub fn formatter(&self) -> &dyn NotationFormatter {
        self.formatter.as_ref()
    }

    // -----------------------------------------------------------------
    // Make move
    // -----------------------------------------------------------------

    /// Play a move from the live position and record it.
    ///
    /// Nothing changes unless the oracle accepts the move and the source
    /// square holds a piece. If the history cursor is not at the end, the
    /// entries after it are discarded first.
    pub fn make_move(&mut self, mv: Move) -> Result<GameMove, ChessError> {
        if !self.oracle.validate(&mv, &self.position) {
            debug!(%mv, fen = %self.position.to_fen(), "move rejected by oracle");
            return Err(ChessError::IllegalMove(mv));
        }

        let before = self.position.clone();
        let moved = before.get(mv.from).ok_or(ChessError::EmptySquare(mv.from))?;
        let captured = captured_piece(&before, &mv, moved);
        let san = self.formatter.format(&mv, &before);

        let mut after = before.clone();
        if let Some(victim) = en_passant_victim(&before, &mv, moved) {
            after.set(victim, None);
        }
        after.apply_move(mv.from, mv.to, mv.promotion)?;
        if let Some(rook) = self.resolver.resolve_forward(moved, mv.from, mv.to) {
            let rook_home = after
                .get(rook.from)
                .is_some_and(|p| p.kind == PieceKind::Rook && p.color == moved.color);
            if rook_home {
                after.apply_move(rook.from, rook.to, None)?;
            }
        }
        after.finish_turn(mv.from, mv.to, moved, captured);

        let gm = GameMove {
            mv,
            movenum: u32::from(before.fullmove_number),
            is_white: before.side_to_move.is_white(),
            san,
            before,
            after,
            moved,
            captured,
        };

        let dropped = self.history.record(gm.clone())?;
        if dropped > 0 {
            info!(dropped, halfmove = gm.halfmove(), "discarded moves after cursor");
        }
        self.position = gm.after.clone();
        debug!(mv = %gm.mv, san = %gm.san, halfmove = gm.halfmove(), "move played");
        Ok(gm)
    }

    /// Parse `text` with the configured notation and play it.
    pub fn play(&mut self, text: &str) -> Result<GameMove, ChessError> {
        let mv = self.formatter.parse(text, &self.position)?;
        self.make_move(mv)
    }

    // -----------------------------------------------------------------
    // Navigation
    // -----------------------------------------------------------------

    pub fn first(&mut self) -> Navigation {
        let nav = self.history.first();
        self.apply(&nav);
        nav
    }

    pub fn last(&mut self) -> Option<Navigation> {
        let nav = self.history.last()?;
        self.apply(&nav);
        Some(nav)
    }

    pub fn next(&mut self) -> Option<Navigation> {
        let nav = self.history.next()?;
        self.apply(&nav);
        Some(nav)
    }

    pub fn previous(&mut self) -> Option<Navigation> {
        let nav = self.history.previous()?;
        self.apply(&nav);
        Some(nav)
    }

    pub fn jump_to(&mut self, target: &GameMove) -> Result<Navigation, ChessError> {
        let nav = self.history.jump_to(target)?;
        self.apply(&nav);
        Ok(nav)
    }

    pub fn jump_to_halfmove(&mut self, halfmove: u32) -> Result<Navigation, ChessError> {
        let nav = self.history.jump_to_halfmove(halfmove)?;
        self.apply(&nav);
        Ok(nav)
    }

    /// Bring the live position in line with a replay directive.
    ///
    /// Snapshots are copied in. Incremental steps are replayed on the live
    /// board and then checked against the entry's stored snapshot; the
    /// snapshot wins if the two disagree.
    pub fn apply(&mut self, nav: &Navigation) {
        self.position = match &nav.replay {
            Replay::RestoreInitial(pos) | Replay::RestoreSnapshot(pos) => pos.clone(),
            Replay::Incremental(step) => self.replay_step(step),
        };
    }

    fn replay_step(&self, step: &ReplayStep) -> Position {
        let expected = step.game_move.after();
        match self.try_step(step) {
            Ok(mut pos) => {
                pos.side_to_move = expected.side_to_move;
                pos.castling_rights = expected.castling_rights;
                pos.en_passant = expected.en_passant;
                pos.halfmove_clock = expected.halfmove_clock;
                pos.fullmove_number = expected.fullmove_number;
                if pos == *expected {
                    pos
                } else {
                    warn!(
                        mv = %step.game_move.mv(),
                        live = %pos.board_fen(),
                        stored = %expected.board_fen(),
                        "incremental replay diverged, restoring snapshot"
                    );
                    expected.clone()
                }
            }
            Err(e) => {
                warn!(mv = %step.game_move.mv(), error = %e, "incremental replay failed, restoring snapshot");
                expected.clone()
            }
        }
    }

    fn try_step(&self, step: &ReplayStep) -> Result<Position, ChessError> {
        let mut pos = self.position.clone();
        let gm = &step.game_move;
        let mv = gm.mv();

        match step.direction {
            Direction::Forward => {
                if let Some(victim) = en_passant_victim(gm.before(), &mv, gm.moved()) {
                    pos.set(victim, None);
                }
                pos.apply_move(mv.from, mv.to, mv.promotion)?;
            }
            Direction::Backward => {
                // A promoted piece walks back as the pawn it was.
                pos.apply_move(mv.from, mv.to, None)?;
                pos.set(mv.to, Some(gm.moved()));
                let played = mv.reversed();
                match en_passant_victim(gm.after(), &played, gm.moved()) {
                    Some(victim) => pos.set(victim, step.uncapture),
                    None => pos.set(mv.from, step.uncapture),
                }
            }
        }

        if let Some(rook) = step.companion {
            pos.apply_move(rook.from, rook.to, None)?;
        }
        Ok(pos)
    }

    // -----------------------------------------------------------------
    // New / load / save
    // -----------------------------------------------------------------

    /// Start over from `fen`, or from the standard position.
    pub fn new_game(&mut self, fen: Option<&str>) -> Result<(), ChessError> {
        let position = match fen {
            Some(fen) => Position::from_fen(fen)?,
            None => Position::starting(),
        };
        self.history.reset(position.clone());
        self.position = position;
        self.id = Uuid::new_v4().to_string();
        self.created_at = Utc::now();
        info!(id = %self.id, fen = %self.position.to_fen(), "new game");
        Ok(())
    }

    /// Replace the history with stored records. The cursor ends up before
    /// the first move. Nothing changes if any record is rejected.
    pub fn load_game(
        &mut self,
        initial_fen: Option<&str>,
        records: &[StoredMove],
    ) -> Result<usize, ChessError> {
        let initial = match (initial_fen, records.first()) {
            (Some(fen), _) => Position::from_fen(fen)?,
            (None, Some(first)) => Position::from_fen(&first.fen_before)?,
            (None, None) => Position::starting(),
        };

        let mut history = MoveHistory::new(initial);
        for record in records {
            history.push(GameMove::from_stored(record, self.formatter.as_ref())?)?;
        }

        self.position = history.initial_position().clone();
        self.history = history;
        info!(moves = records.len(), "game loaded");
        Ok(records.len())
    }

    /// Replay move text from `initial_fen` (or the standard position)
    /// through `make_move`, then rewind to before the first move. Move text
    /// is read as SAN or coordinates whatever the configured dialect.
    /// Nothing changes if any move fails.
    pub fn load_san(&mut self, initial_fen: Option<&str>, moves: &[&str]) -> Result<usize, ChessError> {
        let saved = (self.position.clone(), self.history.clone());
        let result = self.replay_text(initial_fen, moves);
        match result {
            Ok(n) => {
                self.first();
                info!(moves = n, "game loaded from move text");
                Ok(n)
            }
            Err(e) => {
                (self.position, self.history) = saved;
                Err(e)
            }
        }
    }

    fn replay_text(&mut self, initial_fen: Option<&str>, moves: &[&str]) -> Result<usize, ChessError> {
        let position = match initial_fen {
            Some(fen) => Position::from_fen(fen)?,
            None => Position::starting(),
        };
        self.history.reset(position.clone());
        self.position = position;
        for text in moves {
            let mv = SanNotation.parse(text, &self.position)?;
            self.make_move(mv)?;
        }
        Ok(moves.len())
    }

    /// Load a whole saved game, players included.
    pub fn load_saved(&mut self, saved: &SavedGame) -> Result<usize, ChessError> {
        let n = self.load_game(Some(&saved.initial_fen), &saved.moves)?;
        if !saved.white_player.is_empty() {
            self.white_player = saved.white_player.clone();
        }
        if !saved.black_player.is_empty() {
            self.black_player = saved.black_player.clone();
        }
        Ok(n)
    }

    pub fn stored_moves(&self) -> Vec<StoredMove> {
        self.history.entries().iter().map(StoredMove::from).collect()
    }

    pub fn saved_game(&self) -> SavedGame {
        SavedGame {
            initial_fen: self.history.initial_position().to_fen(),
            white_player: self.white_player.clone(),
            black_player: self.black_player.clone(),
            moves: self.stored_moves(),
        }
    }
}

impl Default for GameEngine {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl fmt::Debug for GameEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameEngine")
            .field("id", &self.id)
            .field("fen", &self.position.to_fen())
            .field("moves", &self.history.len())
            .field("cursor", &self.history.cursor())
            .finish_non_exhaustive()
    }
}

// =========================================================================
// Tests
// =========================================================================
