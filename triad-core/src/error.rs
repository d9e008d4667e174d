//! Error taxonomy for the engine.
//!
//! Data absence (a bucket, true open or candle range that does not exist yet) is
//! never an error: it flows as `Option` or an empty slice. Everything here is
//! fatal for the current run.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Fatal engine errors.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{symbol}: candle {candle} is not after cursor {cursor}")]
    NonMonotonic {
        symbol: String,
        cursor: DateTime<Utc>,
        candle: DateTime<Utc>,
    },

    #[error("{symbol}: expected candle at {expected}, got {got}")]
    Gap {
        symbol: String,
        expected: DateTime<Utc>,
        got: DateTime<Utc>,
    },

    #[error("{symbol}: candle {timestamp} is not on the 15m grid")]
    Misaligned {
        symbol: String,
        timestamp: DateTime<Utc>,
    },

    #[error("candle feed for {symbol} is empty")]
    EmptyFeed { symbol: String },

    #[error("candle feed for {symbol} exhausted after {served} candles")]
    FeedExhausted { symbol: String, served: usize },

    #[error("triad assets out of lockstep: expected {expected:?}, got {got:?}")]
    Desynchronized {
        expected: Option<DateTime<Utc>>,
        got: Option<DateTime<Utc>>,
    },

    #[error("invalid config: {0}")]
    Config(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, CoreError>;
