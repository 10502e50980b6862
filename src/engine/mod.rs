pub mod board;
pub mod castle;
pub mod game;
pub mod game_move;
pub mod history;
pub mod oracle;
pub mod pgn;
pub mod san;
pub mod types;

pub use board::{Position, STARTING_FEN};
pub use castle::CastlePairResolver;
pub use game::{GameEngine, SavedGame};
pub use game_move::{GameMove, StoredMove};
pub use history::{Direction, MoveHistory, Navigation, Replay, ReplayStep};
pub use oracle::{
    CoordinateNotation, LegalityOracle, NotationDialect, NotationFormatter, OccupancyOracle,
    TurnOracle,
};
pub use san::SanNotation;
pub use types::*;
