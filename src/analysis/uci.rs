//! Parser for the `info` and `bestmove` lines a UCI engine prints.

use std::fmt;

use crate::analysis::AnalysisError;
use crate::engine::types::Move;

/// Engine evaluation from the side to move's point of view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Score {
    Centipawns(i32),
    /// Mate in this many moves; negative when the side to move is mated.
    Mate(i32),
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Score::Centipawns(cp) => write!(f, "{:+.2}", f64::from(*cp) / 100.0),
            Score::Mate(n) => write!(f, "#{n}"),
        }
    }
}

/// One parsed engine line. Fields the line did not carry are `None` or
/// empty.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UciInfo {
    pub depth: Option<u32>,
    pub seldepth: Option<u32>,
    pub time_ms: Option<u64>,
    pub nodes: Option<u64>,
    pub nps: Option<u64>,
    pub multipv: Option<u32>,
    pub score: Option<Score>,
    pub pv: Vec<String>,
    pub currmove: Option<String>,
    pub currmovenumber: Option<u32>,
    pub hashfull: Option<u32>,
    pub tbhits: Option<u64>,
    pub cpuload: Option<u32>,
    pub string: Option<String>,
    pub refutation: Vec<String>,
    pub currline: Vec<String>,
    pub bestmove: Option<String>,
    pub ponder: Option<String>,
}

impl UciInfo {
    /// Parse an `info ...` or `bestmove ...` line. Unknown `info` keys are
    /// skipped.
    pub fn parse(line: &str) -> Result<UciInfo, AnalysisError> {
        let mut tokens = line.split_whitespace().peekable();
        let mut info = UciInfo::default();

        match tokens.next() {
            Some("bestmove") => {
                let best = tokens
                    .next()
                    .ok_or_else(|| AnalysisError::Protocol(line.to_string()))?;
                info.bestmove = Some(best.to_string());
                if tokens.next() == Some("ponder") {
                    info.ponder = tokens.next().map(str::to_string);
                }
                return Ok(info);
            }
            Some("info") => {}
            _ => return Err(AnalysisError::Protocol(line.to_string())),
        }

        while let Some(key) = tokens.next() {
            match key {
                "depth" => info.depth = Some(number(tokens.next(), line)?),
                "seldepth" => info.seldepth = Some(number(tokens.next(), line)?),
                "time" => info.time_ms = Some(number(tokens.next(), line)?),
                "nodes" => info.nodes = Some(number(tokens.next(), line)?),
                "nps" => info.nps = Some(number(tokens.next(), line)?),
                "multipv" => info.multipv = Some(number(tokens.next(), line)?),
                "currmovenumber" => info.currmovenumber = Some(number(tokens.next(), line)?),
                "hashfull" => info.hashfull = Some(number(tokens.next(), line)?),
                "tbhits" => info.tbhits = Some(number(tokens.next(), line)?),
                "cpuload" => info.cpuload = Some(number(tokens.next(), line)?),
                "currmove" => info.currmove = tokens.next().map(str::to_string),
                "score" => {
                    info.score = Some(match tokens.next() {
                        Some("cp") => Score::Centipawns(number(tokens.next(), line)?),
                        Some("mate") => Score::Mate(number(tokens.next(), line)?),
                        _ => return Err(AnalysisError::Protocol(line.to_string())),
                    });
                    while matches!(tokens.peek(), Some(&"lowerbound") | Some(&"upperbound")) {
                        tokens.next();
                    }
                }
                // These run to the end of the line.
                "string" => {
                    info.string = Some(tokens.by_ref().collect::<Vec<_>>().join(" "));
                }
                "pv" => info.pv = tokens.by_ref().map(str::to_string).collect(),
                "refutation" => info.refutation = tokens.by_ref().map(str::to_string).collect(),
                "currline" => info.currline = tokens.by_ref().map(str::to_string).collect(),
                _ => {}
            }
        }

        Ok(info)
    }

    /// The `bestmove` as a move, if there is a real one.
    pub fn best_move(&self) -> Option<Move> {
        self.bestmove
            .as_deref()
            .filter(|m| *m != "(none)" && *m != "0000")
            .and_then(|m| m.parse().ok())
    }

    pub fn is_bestmove(&self) -> bool {
        self.bestmove.is_some()
    }
}

impl fmt::Display for UciInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(best) = &self.bestmove {
            write!(f, "bestmove {best}")?;
            if let Some(ponder) = &self.ponder {
                write!(f, " ponder {ponder}")?;
            }
            return Ok(());
        }
        write!(f, "depth {}", self.depth.unwrap_or(0))?;
        if let Some(score) = self.score {
            write!(f, " score {score}")?;
        }
        if !self.pv.is_empty() {
            write!(f, " pv {}", self.pv.join(" "))?;
        }
        Ok(())
    }
}

fn number<T: std::str::FromStr>(token: Option<&str>, line: &str) -> Result<T, AnalysisError> {
    token
        .and_then(|t| t.parse().ok())
        .ok_or_else(|| AnalysisError::Protocol(line.to_string()))
}
