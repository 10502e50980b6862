//! Move history with a cursor and replay directives.
//!
//! `MoveHistory` never touches a live board. Each navigation call moves the
//! cursor and hands back a [`Navigation`] describing the cheapest way for
//! the caller to bring its position to the new cursor:
//!
//! - one ply forward or back: an incremental step (the move plus any castle
//!   rook move);
//! - anything else: restore a stored snapshot.
//!
//! Entries are kept in strictly increasing halfmove order. Recording a new
//! move while the cursor is not at the end drops the entries after the
//! cursor; there is no variation tree.

use crate::engine::board::Position;
use crate::engine::castle::CastlePairResolver;
use crate::engine::game_move::GameMove;
use crate::engine::types::{ChessError, Move, Piece};

// =========================================================================
// Replay directives
// =========================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// One incremental step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplayStep {
    pub direction: Direction,
    /// The entry to replay. For a backward step this is the reversed entry,
    /// so `game_move.mv()` is always the move to apply and
    /// `game_move.after()` is always the position it should produce.
    pub game_move: GameMove,
    /// Rook move that goes with a castling king move.
    pub companion: Option<Move>,
    /// Piece to put back on the vacated square when stepping back over a
    /// capture.
    pub uncapture: Option<Piece>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Replay {
    /// Show the position before the first move.
    RestoreInitial(Position),
    /// Apply a single move to the current position.
    Incremental(ReplayStep),
    /// Replace the current position with a stored snapshot.
    RestoreSnapshot(Position),
}

impl Replay {
    pub fn is_incremental(&self) -> bool {
        matches!(self, Replay::Incremental(_))
    }

    /// The position the caller should end up with.
    pub fn target_position(&self) -> &Position {
        match self {
            Replay::RestoreInitial(pos) | Replay::RestoreSnapshot(pos) => pos,
            Replay::Incremental(step) => step.game_move.after(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Replay::RestoreInitial(_) => "initial",
            Replay::Incremental(_) => "incremental",
            Replay::RestoreSnapshot(_) => "snapshot",
        }
    }
}

/// Result of a navigation call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Navigation {
    /// Halfmove distance travelled, signed.
    pub diff: i64,
    pub replay: Replay,
}

// =========================================================================
// MoveHistory
// =========================================================================

#[derive(Clone, Debug, Default)]
pub struct MoveHistory {
    initial: Position,
    entries: Vec<GameMove>,
    /// `None` means "before the first move".
    cursor: Option<usize>,
    resolver: CastlePairResolver,
}

impl MoveHistory {
    pub fn new(initial: Position) -> Self {
        Self {
            initial,
            ..Self::default()
        }
    }

    /// Forget every entry and start over from `initial`.
    pub fn reset(&mut self, initial: Position) {
        self.initial = initial;
        self.entries.clear();
        self.cursor = None;
    }

    // -----------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------

    /// Position before the first move.
    pub fn initial_position(&self) -> &Position {
        self.entries
            .first()
            .map(GameMove::before)
            .unwrap_or(&self.initial)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[GameMove] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&GameMove> {
        self.entries.get(index)
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn current(&self) -> Option<&GameMove> {
        self.cursor.and_then(|i| self.entries.get(i))
    }

    /// True when there is nothing for `next()` to step to.
    pub fn is_at_end(&self) -> bool {
        match self.cursor {
            Some(i) => i + 1 >= self.entries.len(),
            None => self.entries.is_empty(),
        }
    }

    /// Halfmove of the current entry, 0 before the first move.
    pub fn current_halfmove(&self) -> u32 {
        self.current().map_or(0, GameMove::halfmove)
    }

    /// Entries strictly before the cursor.
    pub fn to_current_slice(&self) -> &[GameMove] {
        match self.cursor {
            Some(i) => &self.entries[..i],
            None => &[],
        }
    }

    // -----------------------------------------------------------------
    // Building
    // -----------------------------------------------------------------

    /// Append without moving the cursor. Used for bulk loading.
    pub fn push(&mut self, gm: GameMove) -> Result<(), ChessError> {
        if let Some(last) = self.entries.last() {
            if gm.halfmove() <= last.halfmove() {
                return Err(out_of_order(&gm, last.halfmove()));
            }
        }
        self.entries.push(gm);
        Ok(())
    }

    /// Record a freshly played move: drop everything after the cursor,
    /// append, and put the cursor on the new entry. Returns how many
    /// entries were dropped.
    pub(crate) fn record(&mut self, gm: GameMove) -> Result<usize, ChessError> {
        let current = self.current_halfmove();
        if gm.halfmove() <= current {
            return Err(out_of_order(&gm, current));
        }
        let dropped = self.truncate_after_cursor();
        self.entries.push(gm);
        self.cursor = Some(self.entries.len() - 1);
        Ok(dropped)
    }

    /// Drop the entries after the cursor, keeping the current one. Returns
    /// how many were dropped.
    pub fn truncate_after_cursor(&mut self) -> usize {
        let keep = self.cursor.map_or(0, |i| i + 1);
        let dropped = self.entries.len().saturating_sub(keep);
        self.entries.truncate(keep);
        dropped
    }

    // -----------------------------------------------------------------
    // Navigation
    // -----------------------------------------------------------------

    /// Go to the position before the first move.
    pub fn first(&mut self) -> Navigation {
        let diff = -i64::from(self.current_halfmove());
        self.cursor = None;
        Navigation {
            diff,
            replay: Replay::RestoreInitial(self.initial_position().clone()),
        }
    }

    /// Go to the last entry. `None` when the history is empty.
    pub fn last(&mut self) -> Option<Navigation> {
        let idx = self.entries.len().checked_sub(1)?;
        let diff = self.diff_to(idx);
        self.cursor = Some(idx);
        Some(Navigation {
            diff,
            replay: Replay::RestoreSnapshot(self.entries[idx].after().clone()),
        })
    }

    /// Step one ply forward. `None` at the end of the history.
    pub fn next(&mut self) -> Option<Navigation> {
        let idx = self.cursor.map_or(0, |i| i + 1);
        let target = self.entries.get(idx)?.clone();
        let companion = self.resolver.resolve_forward(
            target.moved(),
            target.mv().from,
            target.mv().to,
        );
        self.cursor = Some(idx);
        Some(Navigation {
            diff: 1,
            replay: Replay::Incremental(ReplayStep {
                direction: Direction::Forward,
                game_move: target,
                companion,
                uncapture: None,
            }),
        })
    }

    /// Step one ply back. `None` before the first move.
    pub fn previous(&mut self) -> Option<Navigation> {
        let idx = self.cursor?;
        let current = &self.entries[idx];
        let undo = current.reverse();
        let companion = self
            .resolver
            .resolve_reverse(undo.moved(), undo.mv().from, undo.mv().to);
        let uncapture = current.captured();
        self.cursor = idx.checked_sub(1);
        Some(Navigation {
            diff: -1,
            replay: Replay::Incremental(ReplayStep {
                direction: Direction::Backward,
                game_move: undo,
                companion,
                uncapture,
            }),
        })
    }

    /// Go to the entry at the same ply as `target`.
    ///
    /// One ply forward or back is an incremental step; any other distance,
    /// including zero, restores the stored snapshot.
    pub fn jump_to(&mut self, target: &GameMove) -> Result<Navigation, ChessError> {
        let idx = self
            .entries
            .iter()
            .position(|e| e.same_ply(target))
            .ok_or_else(|| {
                ChessError::NotFound(format!(
                    "{}{} {}",
                    target.movenum(),
                    if target.is_white() { "." } else { "..." },
                    target.algebraic()
                ))
            })?;

        let diff = self.diff_to(idx);
        let next_idx = self.cursor.map_or(0, |i| i + 1);

        if diff == 1 && idx == next_idx {
            if let Some(nav) = self.next() {
                return Ok(nav);
            }
        }
        if diff == -1 && self.cursor == Some(idx + 1) {
            if let Some(nav) = self.previous() {
                return Ok(nav);
            }
        }

        self.cursor = Some(idx);
        Ok(Navigation {
            diff,
            replay: Replay::RestoreSnapshot(self.entries[idx].after().clone()),
        })
    }

    /// Go to a halfmove number; 0 is the position before the first move.
    pub fn jump_to_halfmove(&mut self, halfmove: u32) -> Result<Navigation, ChessError> {
        if halfmove == 0 {
            return Ok(self.first());
        }
        let target = self
            .entries
            .iter()
            .find(|e| e.halfmove() == halfmove)
            .cloned()
            .ok_or_else(|| ChessError::NotFound(format!("halfmove {halfmove}")))?;
        self.jump_to(&target)
    }

    fn diff_to(&self, idx: usize) -> i64 {
        i64::from(self.entries[idx].halfmove()) - i64::from(self.current_halfmove())
    }
}

fn out_of_order(gm: &GameMove, after: u32) -> ChessError {
    ChessError::OutOfOrder(format!(
        "{} (halfmove {}, expected after {after})",
        gm.algebraic(),
        gm.halfmove()
    ))
}

// =========================================================================
// Tests
// =========================================================================
