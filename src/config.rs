use crate::engine::oracle::NotationDialect;

/// Settings parsed from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Notation the engine formats and parses moves with.
    pub notation: NotationDialect,
    /// Only the side to move may move (`TurnOracle`); otherwise any piece may.
    pub strict_turns: bool,
    /// Path to a UCI engine used for analysis.
    pub engine_path: Option<String>,
    /// Search depth for `go depth N`.
    pub analysis_depth: u32,
    /// Analysis timeout in milliseconds, applied per engine reply.
    pub analysis_timeout_ms: u64,
    /// Log filter used when `RUST_LOG` is not set.
    pub log_filter: String,
}

impl AppConfig {
    /// Load configuration from environment variables with defaults.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key lookup. Unparseable values fall back
    /// to their defaults.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = AppConfig::default();
        AppConfig {
            notation: var("CHESS_NOTATION")
                .and_then(|v| NotationDialect::from_str_loose(&v))
                .unwrap_or(defaults.notation),
            strict_turns: var("CHESS_STRICT_TURNS")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.strict_turns),
            engine_path: var("CHESS_ENGINE_PATH").filter(|v| !v.trim().is_empty()),
            analysis_depth: var("CHESS_ANALYSIS_DEPTH")
                .and_then(|v| v.parse().ok())
                .filter(|&d| d > 0)
                .unwrap_or(defaults.analysis_depth),
            analysis_timeout_ms: var("CHESS_ANALYSIS_TIMEOUT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.analysis_timeout_ms),
            log_filter: var("CHESS_LOG").unwrap_or(defaults.log_filter),
        }
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            notation: NotationDialect::San,
            strict_turns: true,
            engine_path: None,
            analysis_depth: 12,
            analysis_timeout_ms: 5000,
            log_filter: "chess_history=info".to_string(),
        }
    }
}
