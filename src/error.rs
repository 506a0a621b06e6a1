//! Error kinds for the pipeline (§7). The pipeline itself never propagates
//! these outward as a hard failure — §8.8 requires the reaction handler to
//! absorb all expected aborts — but naming them lets each guard report
//! *why* it stopped, for logging and for the thin HTTP layer's responses.

use thiserror::Error;

/// Reasons the reaction pipeline can abort before writing a `KarmaEvent`.
/// Every variant here is "expected" in the sense of §7: none of them should
/// ever be escalated into a panic or a 500.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PipelineAbort {
    #[error("karma counting disabled for this chat")]
    KarmaCountingDisabled,
    #[error("message author unknown (outside retention window or never observed)")]
    UnknownAuthor,
    #[error("reactor and target are the same user")]
    SelfReaction,
    #[error("target is a bot and bot targets are disabled")]
    BotTarget,
    #[error("reactions summed to a neutral (zero) change")]
    NeutralReaction,
    #[error("reactor is not a member of the chat")]
    NotAMember,
    #[error("reactor has an active restriction")]
    RestrictedReactor,
    #[error("reactor percentile {actual:.3} is not below the required {required:.3}")]
    LowPercentile { actual: f64, required: f64 },
    #[error("rate limit exceeded: {scope} window of {window_secs}s allows {rate}")]
    RateLimited {
        scope: RateLimitScope,
        rate: f64,
        window_secs: i64,
    },
    #[error("reactor cannot change their own karma this way")]
    CantChangeKarma,
    #[error("target currently has an active restriction; cannot offend further")]
    DontOffendRestricted,
    #[error("reactor's own karma would go negative under host policy")]
    SubZeroKarma,
    #[error("database error: {0}")]
    Database(String),
    #[error("transport error: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitScope {
    Global,
    PerTarget,
}

impl std::fmt::Display for RateLimitScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RateLimitScope::Global => write!(f, "global"),
            RateLimitScope::PerTarget => write!(f, "per-target"),
        }
    }
}

impl PipelineAbort {
    /// Whether this abort should produce a user-visible transient notice
    /// (§7: `LOW_PERCENTILE` and `RATE_LIMITED` are the only two; everything
    /// else is silent).
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            PipelineAbort::LowPercentile { .. } | PipelineAbort::RateLimited { .. }
        )
    }

    /// Log level this abort should be reported at, per §7's propagation
    /// policy ("log at info" / "log at error").
    pub fn log_level(&self) -> tracing::Level {
        match self {
            PipelineAbort::Database(_) => tracing::Level::ERROR,
            PipelineAbort::NotAMember | PipelineAbort::RestrictedReactor => tracing::Level::INFO,
            _ => tracing::Level::DEBUG,
        }
    }
}

impl From<rusqlite::Error> for PipelineAbort {
    fn from(e: rusqlite::Error) -> Self {
        PipelineAbort::Database(e.to_string())
    }
}
