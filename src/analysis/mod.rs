//! Advisory analysis by an external UCI engine.
//!
//! Analysis reads a position and reports lines and a best move. It never
//! changes a `Position` or `MoveHistory`; callers decide what to do with
//! the results.

pub mod session;
pub mod uci;

use std::time::Duration;

pub use session::AnalysisSession;
pub use uci::{Score, UciInfo};

/// Errors talking to an analysis engine.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("could not start engine: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("engine i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("engine did not answer within {0:?}")]
    Timeout(Duration),

    #[error("engine closed its output")]
    Closed,

    #[error("unexpected engine output: {0}")]
    Protocol(String),
}
