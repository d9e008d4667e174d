use crate::calendar::Scheme;
use crate::domain::Candle;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reference price taken at a scheme's fixed true-open instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrueOpen {
    pub scheme: Scheme,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
}

impl TrueOpen {
    pub(crate) fn from_candle(scheme: Scheme, candle: &Candle) -> Self {
        Self {
            scheme,
            price: candle.open,
            timestamp: candle.timestamp,
        }
    }
}
