//! Rolling buffer of contiguous base candles.

use crate::domain::{base_step, Candle, BASE_RESOLUTION_MINUTES};
use chrono::{DateTime, Utc};

/// Evicted slots are compacted once they outnumber live ones past this size.
const COMPACT_THRESHOLD: usize = 4096;

/// Append-only window of 15m candles with cheap eviction from the front.
///
/// Candles are contiguous, so a timestamp maps to an index arithmetically.
#[derive(Debug, Clone, Default)]
pub struct CandleBuffer {
    candles: Vec<Candle>,
    head: usize,
}

impl CandleBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a buffer from candles already in ascending order.
    pub fn from_ascending(candles: Vec<Candle>) -> Self {
        Self { candles, head: 0 }
    }

    pub fn push(&mut self, candle: Candle) {
        self.candles.push(candle);
    }

    /// Drops every candle strictly older than `horizon`.
    pub fn evict_before(&mut self, horizon: DateTime<Utc>) {
        while self.head < self.candles.len() && self.candles[self.head].timestamp < horizon {
            self.head += 1;
        }
        if self.head > COMPACT_THRESHOLD && self.head * 2 > self.candles.len() {
            self.candles.drain(..self.head);
            self.head = 0;
        }
    }

    pub fn as_slice(&self) -> &[Candle] {
        &self.candles[self.head..]
    }

    pub fn len(&self) -> usize {
        self.candles.len() - self.head
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn first(&self) -> Option<&Candle> {
        self.as_slice().first()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    /// Candles with `from <= timestamp < to`, or nothing when the buffer does
    /// not cover the whole request.
    pub fn range(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> &[Candle] {
        let (Some(first), Some(last)) = (self.first(), self.last()) else {
            return &[];
        };
        if to <= from || from < first.timestamp || to > last.timestamp + base_step() {
            return &[];
        }
        self.clamped(from, to)
    }

    /// Candles with `from <= timestamp < to`, clipped to what is buffered.
    pub(crate) fn clamped(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> &[Candle] {
        let slice = self.as_slice();
        let Some(first) = slice.first() else {
            return &[];
        };
        let index = |ts: DateTime<Utc>| -> usize {
            let minutes = (ts - first.timestamp).num_minutes();
            if minutes <= 0 {
                return 0;
            }
            let steps = (minutes + BASE_RESOLUTION_MINUTES - 1) / BASE_RESOLUTION_MINUTES;
            (steps as usize).min(slice.len())
        };
        let (i, j) = (index(from), index(to));
        if i >= j {
            return &[];
        }
        &slice[i..j]
    }
}

impl PartialEq for CandleBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn series(n: usize) -> CandleBuffer {
        let start = Candle::parse_minute("2024-03-14 00:00").unwrap();
        let mut buf = CandleBuffer::new();
        for i in 0..n {
            let ts = start + base_step() * i as i32;
            buf.push(Candle::new(ts, 1.0, 2.0, 0.5, 1.5, i as f64));
        }
        buf
    }

    fn at(label: &str) -> DateTime<Utc> {
        Candle::parse_minute(label).unwrap()
    }

    #[test]
    fn range_returns_half_open_slice() {
        let buf = series(8);
        let got = buf.range(at("2024-03-14 00:30"), at("2024-03-14 01:15"));
        assert_eq!(got.len(), 3);
        assert_eq!(got[0].timestamp, at("2024-03-14 00:30"));
        assert_eq!(got[2].timestamp, at("2024-03-14 01:00"));
    }

    #[test]
    fn range_outside_coverage_is_empty() {
        let buf = series(8);
        // Before the first candle.
        assert!(buf.range(at("2024-03-13 23:45"), at("2024-03-14 00:30")).is_empty());
        // Past the snapshot instant (last candle 01:45, now 02:00).
        assert!(buf.range(at("2024-03-14 01:00"), at("2024-03-14 02:15")).is_empty());
        assert_eq!(buf.range(at("2024-03-14 01:00"), at("2024-03-14 02:00")).len(), 4);
        // Inverted.
        assert!(buf.range(at("2024-03-14 01:00"), at("2024-03-14 00:30")).is_empty());
    }

    #[test]
    fn eviction_moves_the_front() {
        let mut buf = series(8);
        buf.evict_before(at("2024-03-14 01:00"));
        assert_eq!(buf.len(), 4);
        assert_eq!(buf.first().unwrap().timestamp, at("2024-03-14 01:00"));
        assert!(buf.range(at("2024-03-14 00:45"), at("2024-03-14 01:30")).is_empty());
        assert_eq!(buf.range(at("2024-03-14 01:15"), at("2024-03-14 01:45")).len(), 2);
    }

    #[test]
    fn compaction_keeps_contents() {
        let mut buf = series(COMPACT_THRESHOLD * 3);
        let horizon = buf.first().unwrap().timestamp + Duration::minutes(15 * (COMPACT_THRESHOLD as i64 * 2));
        buf.evict_before(horizon);
        assert_eq!(buf.len(), COMPACT_THRESHOLD);
        assert_eq!(buf.first().unwrap().timestamp, horizon);
    }
}
