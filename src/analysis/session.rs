//! A running UCI engine process.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::analysis::uci::UciInfo;
use crate::analysis::AnalysisError;
use crate::engine::board::Position;

/// Handle on an engine that has completed the UCI handshake.
///
/// Every read from the engine is bounded by the session timeout.
pub struct AnalysisSession {
    child: Child,
    stdin: ChildStdin,
    lines: Lines<BufReader<ChildStdout>>,
    timeout: Duration,
}

impl AnalysisSession {
    /// Start the engine at `path` and wait until it reports ready.
    pub async fn spawn(path: &str, timeout: Duration) -> Result<Self, AnalysisError> {
        Self::spawn_with_args(path, &[], timeout).await
    }

    pub async fn spawn_with_args(
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Self, AnalysisError> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(AnalysisError::Spawn)?;

        let stdin = child.stdin.take().ok_or(AnalysisError::Closed)?;
        let stdout = child.stdout.take().ok_or(AnalysisError::Closed)?;
        let mut session = AnalysisSession {
            child,
            stdin,
            lines: BufReader::new(stdout).lines(),
            timeout,
        };

        session.send("uci").await?;
        session.wait_for("uciok").await?;
        session.ready().await?;
        info!(program, "analysis engine ready");
        Ok(session)
    }

    /// `isready` / `readyok` round trip.
    pub async fn ready(&mut self) -> Result<(), AnalysisError> {
        self.send("isready").await?;
        self.wait_for("readyok").await
    }

    /// Search `position` to `depth`. Every `info` line is forwarded on `tx`
    /// as it arrives; the `bestmove` line is returned.
    pub async fn analyse(
        &mut self,
        position: &Position,
        depth: u32,
        tx: &mpsc::UnboundedSender<UciInfo>,
    ) -> Result<UciInfo, AnalysisError> {
        self.send(&format!("position fen {}", position.to_fen())).await?;
        self.ready().await?;
        self.send(&format!("go depth {depth}")).await?;

        loop {
            let line = self.read_line().await?;
            let line = line.trim();
            if line.starts_with("bestmove") {
                let best = UciInfo::parse(line)?;
                info!(bestmove = ?best.bestmove, "analysis finished");
                return Ok(best);
            }
            if line.starts_with("info") {
                match UciInfo::parse(line) {
                    // The receiver may have gone away; the search still
                    // has to run to its bestmove.
                    Ok(info) => {
                        let _ = tx.send(info);
                    }
                    Err(e) => debug!(error = %e, "skipping engine line"),
                }
            }
        }
    }

    /// Ask the engine to exit, killing it if it does not.
    pub async fn quit(mut self) -> Result<(), AnalysisError> {
        self.send("quit").await?;
        match tokio::time::timeout(self.timeout, self.child.wait()).await {
            Ok(status) => {
                status?;
            }
            Err(_) => self.child.kill().await?,
        }
        Ok(())
    }

    async fn send(&mut self, command: &str) -> Result<(), AnalysisError> {
        debug!(command, "to engine");
        self.stdin.write_all(command.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await?;
        Ok(())
    }

    async fn read_line(&mut self) -> Result<String, AnalysisError> {
        match tokio::time::timeout(self.timeout, self.lines.next_line()).await {
            Err(_) => Err(AnalysisError::Timeout(self.timeout)),
            Ok(Ok(Some(line))) => Ok(line),
            Ok(Ok(None)) => Err(AnalysisError::Closed),
            Ok(Err(e)) => Err(e.into()),
        }
    }

    async fn wait_for(&mut self, token: &str) -> Result<(), AnalysisError> {
        loop {
            if self.read_line().await?.trim() == token {
                return Ok(());
            }
        }
    }
}
