//! CSV candle files, one per symbol.
//!
//! ```text
//! timestamp,open,high,low,close,volume
//! 2024-01-01 00:00,42000.5,42110.0,41950.0,42080.0,312.4
//! ```
//!
//! Timestamps are UTC minute labels. Rows must be strictly ascending.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::Path;
use triad_core::Candle;

#[derive(Debug, Deserialize)]
struct CandleRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

/// Reads a whole candle file in ascending order.
pub fn load_candles(path: &Path) -> Result<Vec<Candle>> {
    let mut rdr = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let mut candles: Vec<Candle> = Vec::new();
    for (line, result) in rdr.deserialize().enumerate() {
        let row: CandleRow =
            result.with_context(|| format!("{}: bad row {}", path.display(), line + 2))?;
        let Some(timestamp) = Candle::parse_minute(&row.timestamp) else {
            bail!(
                "{}: row {} has timestamp '{}', expected YYYY-MM-DD HH:MM",
                path.display(),
                line + 2,
                row.timestamp
            );
        };
        if let Some(prev) = candles.last() {
            if timestamp <= prev.timestamp {
                bail!(
                    "{}: row {} at {} is not after {}",
                    path.display(),
                    line + 2,
                    row.timestamp,
                    prev.minute_label()
                );
            }
        }
        candles.push(Candle::new(
            timestamp, row.open, row.high, row.low, row.close, row.volume,
        ));
    }
    Ok(candles)
}

/// Splits an ascending series at `at`: history before it, newest first, and
/// the candles from `at` on, oldest first.
pub fn split_at(candles: Vec<Candle>, at: DateTime<Utc>) -> (Vec<Candle>, Vec<Candle>) {
    let cut = candles.partition_point(|c| c.timestamp < at);
    let mut history = candles;
    let upcoming = history.split_off(cut);
    history.reverse();
    (history, upcoming)
}
