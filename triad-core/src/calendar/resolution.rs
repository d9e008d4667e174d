//! Candle resolutions and their period grid.
//!
//! Intraday grids are laid from the trading-day start in elapsed time and
//! clipped at the next trading day, so the last slot of a DST day can be short.

use super::{first_of_month, monday_of, trading_date, trading_day_start};
use chrono::{DateTime, Datelike, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Resolution {
    M15,
    M30,
    H1,
    H2,
    H4,
    D1,
    W1,
    Month1,
}

impl Resolution {
    /// Every resolution, finest first. These are also the PSP periods.
    pub const ALL: [Resolution; 8] = [
        Resolution::M15,
        Resolution::M30,
        Resolution::H1,
        Resolution::H2,
        Resolution::H4,
        Resolution::D1,
        Resolution::W1,
        Resolution::Month1,
    ];

    /// Coarser resolutions an instrument aggregates incrementally.
    pub const AGGREGATED: [Resolution; 7] = [
        Resolution::M30,
        Resolution::H1,
        Resolution::H2,
        Resolution::H4,
        Resolution::D1,
        Resolution::W1,
        Resolution::Month1,
    ];

    fn intraday_minutes(self) -> Option<i64> {
        match self {
            Resolution::M15 => Some(15),
            Resolution::M30 => Some(30),
            Resolution::H1 => Some(60),
            Resolution::H2 => Some(120),
            Resolution::H4 => Some(240),
            _ => None,
        }
    }

    /// Position inside `Resolution::AGGREGATED`, `None` for the base resolution.
    pub fn aggregated_index(self) -> Option<usize> {
        Self::AGGREGATED.iter().position(|r| *r == self)
    }

    /// The `[start, end)` period containing `ts`.
    pub fn period(self, ts: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let date = trading_date(ts);
        let day_start = trading_day_start(date);
        let next_day = trading_day_start(date + Duration::days(1));
        if let Some(len) = self.intraday_minutes() {
            let elapsed = (ts - day_start).num_minutes();
            let start = day_start + Duration::minutes(elapsed / len * len);
            let end = (start + Duration::minutes(len)).min(next_day);
            return (start, end);
        }
        match self {
            Resolution::D1 => (day_start, next_day),
            Resolution::W1 => {
                let monday = monday_of(date);
                (
                    trading_day_start(monday),
                    trading_day_start(monday + Duration::days(7)),
                )
            }
            _ => {
                let (y, m) = (date.year(), date.month() as i32);
                (
                    trading_day_start(first_of_month(y, m)),
                    trading_day_start(first_of_month(y, m + 1)),
                )
            }
        }
    }

    pub fn period_start(self, ts: DateTime<Utc>) -> DateTime<Utc> {
        self.period(ts).0
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Resolution::M15 => "15m",
            Resolution::M30 => "30m",
            Resolution::H1 => "1h",
            Resolution::H2 => "2h",
            Resolution::H4 => "4h",
            Resolution::D1 => "1d",
            Resolution::W1 => "1w",
            Resolution::Month1 => "1month",
        };
        f.write_str(s)
    }
}
