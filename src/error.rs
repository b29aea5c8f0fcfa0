//! Error taxonomy for the engine's fatal and cycle-level failures.
//!
//! Per-ticker transient failures are not represented here; they are caught,
//! tallied in the cycle summary, and never surfaced as errors.

use thiserror::Error;

/// Fatal configuration problems. The process refuses to start on any of
/// these; no partial cycle ever runs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration: {0}")]
    Missing(String),

    #[error("live trading flag is set; this engine only paper-trades, refusing to start")]
    LiveTradingRefused,
}

/// Decision ledger failures. Losing the audit trail is unacceptable, so these
/// propagate as cycle-level errors instead of being tallied and skipped.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("decision ledger I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("decision record could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}
