//! Candle: the fundamental market data unit.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Base resolution every instrument advances by.
pub const BASE_RESOLUTION_MINUTES: i64 = 15;

/// Minute-precision label format used by candle stores and reports.
pub const MINUTE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Length of one base candle.
pub fn base_step() -> Duration {
    Duration::minutes(BASE_RESOLUTION_MINUTES)
}

/// True when `ts` sits on the 15m grid with zero seconds.
pub fn on_grid(ts: DateTime<Utc>) -> bool {
    ts.timestamp() % (BASE_RESOLUTION_MINUTES * 60) == 0 && ts.timestamp_subsec_nanos() == 0
}

/// OHLCV candle opened at `timestamp` (UTC, minute precision).
///
/// Base candles are 15 minutes long. Aggregated candles keep the timestamp of
/// their first constituent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Body direction of a candle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CandleColor {
    Green,
    Red,
    Doji,
}

impl Candle {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    pub fn color(&self) -> CandleColor {
        if self.close > self.open {
            CandleColor::Green
        } else if self.close < self.open {
            CandleColor::Red
        } else {
            CandleColor::Doji
        }
    }

    /// Minute label, e.g. `2024-03-15 13:45`.
    pub fn minute_label(&self) -> String {
        self.timestamp.format(MINUTE_FORMAT).to_string()
    }

    /// Parses a minute label into a UTC instant.
    pub fn parse_minute(label: &str) -> Option<DateTime<Utc>> {
        NaiveDateTime::parse_from_str(label.trim(), MINUTE_FORMAT)
            .ok()
            .map(|naive| naive.and_utc())
    }

    pub fn is_aligned(&self) -> bool {
        on_grid(self.timestamp)
    }

    /// Extends this candle with a later one: keeps open and timestamp, takes the
    /// later close, widens high/low and sums volume.
    pub fn absorb(&mut self, later: &Candle) {
        self.high = self.high.max(later.high);
        self.low = self.low.min(later.low);
        self.close = later.close;
        self.volume += later.volume;
    }

    /// Merges an ascending run of candles into one. `None` for an empty run.
    pub fn merge(candles: &[Candle]) -> Option<Candle> {
        let (first, rest) = candles.split_first()?;
        let mut merged = *first;
        for candle in rest {
            merged.absorb(candle);
        }
        Some(merged)
    }
}

/// Signed distance of `price` from `current`, in percent of `current`.
pub fn percent_from_current(current: f64, price: f64) -> f64 {
    if current == 0.0 {
        return 0.0;
    }
    (price - current) / current * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(label: &str) -> DateTime<Utc> {
        Candle::parse_minute(label).unwrap()
    }

    fn candle(label: &str, o: f64, h: f64, l: f64, c: f64) -> Candle {
        Candle::new(at(label), o, h, l, c, 10.0)
    }

    #[test]
    fn color_follows_body() {
        assert_eq!(candle("2024-01-02 10:00", 1.0, 2.0, 0.5, 1.5).color(), CandleColor::Green);
        assert_eq!(candle("2024-01-02 10:00", 1.5, 2.0, 0.5, 1.0).color(), CandleColor::Red);
        assert_eq!(candle("2024-01-02 10:00", 1.0, 2.0, 0.5, 1.0).color(), CandleColor::Doji);
    }

    #[test]
    fn merge_keeps_first_open_and_last_close() {
        let run = [
            candle("2024-01-02 10:00", 10.0, 12.0, 9.0, 11.0),
            candle("2024-01-02 10:15", 11.0, 15.0, 10.5, 14.0),
            candle("2024-01-02 10:30", 14.0, 14.5, 8.0, 9.5),
        ];
        let merged = Candle::merge(&run).unwrap();
        assert_eq!(merged.timestamp, at("2024-01-02 10:00"));
        assert_eq!(merged.open, 10.0);
        assert_eq!(merged.high, 15.0);
        assert_eq!(merged.low, 8.0);
        assert_eq!(merged.close, 9.5);
        assert_eq!(merged.volume, 30.0);
    }

    #[test]
    fn merge_of_nothing_is_none() {
        assert!(Candle::merge(&[]).is_none());
    }

    #[test]
    fn minute_label_roundtrip() {
        let c = candle("2024-03-15 13:45", 1.0, 1.0, 1.0, 1.0);
        assert_eq!(c.minute_label(), "2024-03-15 13:45");
        assert!(Candle::parse_minute("15/03/2024").is_none());
    }

    #[test]
    fn alignment_check() {
        assert!(candle("2024-03-15 13:45", 1.0, 1.0, 1.0, 1.0).is_aligned());
        assert!(!candle("2024-03-15 13:50", 1.0, 1.0, 1.0, 1.0).is_aligned());
    }

    #[test]
    fn percent_distance_is_signed() {
        assert!((percent_from_current(100.0, 105.0) - 5.0).abs() < 1e-12);
        assert!((percent_from_current(100.0, 98.0) + 2.0).abs() < 1e-12);
        assert_eq!(percent_from_current(0.0, 5.0), 0.0);
    }
}
