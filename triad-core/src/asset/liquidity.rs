//! Per-boundary liquidity record and its sweep watermark.

use crate::calendar::{Bucket, BucketRange};
use crate::domain::Candle;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Value key of one boundary instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BoundaryId {
    pub bucket: Bucket,
    pub start: DateTime<Utc>,
}

/// Which liquidity level of a boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LevelTag {
    High,
    Half,
    Low,
}

impl LevelTag {
    pub const ALL: [LevelTag; 3] = [LevelTag::High, LevelTag::Half, LevelTag::Low];
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweptLevel {
    pub price: f64,
    pub swept: bool,
}

/// Highest high and lowest low over a run of candles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extremes {
    pub high: f64,
    pub low: f64,
}

impl Extremes {
    pub fn of(candle: &Candle) -> Self {
        Self {
            high: candle.high,
            low: candle.low,
        }
    }

    pub fn widen(&mut self, candle: &Candle) {
        self.high = self.high.max(candle.high);
        self.low = self.low.min(candle.low);
    }

    pub(crate) fn widened(current: Option<Extremes>, candle: &Candle) -> Extremes {
        match current {
            Some(mut e) => {
                e.widen(candle);
                e
            }
            None => Extremes::of(candle),
        }
    }
}

/// Liquidity of one bucket instance for one instrument.
///
/// While open, `high`/`low` follow in-bucket candles and nothing is swept.
/// Once closed, they are frozen and every later candle widens `watermark`.
/// Swept flags are derived from the watermark, so they can only turn on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryLiquidity {
    pub bucket: Bucket,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub is_closed: bool,
    pub high: SweptLevel,
    pub mid: SweptLevel,
    pub low: SweptLevel,
    /// Close of the latest in-bucket candle.
    pub close: f64,
    watermark: Option<Extremes>,
}

impl BoundaryLiquidity {
    /// New record from the first in-bucket candle seen.
    pub(crate) fn open(range: &BucketRange, candle: &Candle, now: DateTime<Utc>) -> Self {
        Self::seeded(range, candle, None, now)
    }

    /// New record from the latest in-bucket candle, with the extremes of every
    /// candle after it already known. Used by backward reconstruction.
    pub(crate) fn seeded(
        range: &BucketRange,
        candle: &Candle,
        watermark: Option<Extremes>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut liq = Self {
            bucket: range.bucket,
            start: range.start,
            end: range.end,
            is_closed: false,
            high: SweptLevel {
                price: candle.high,
                swept: false,
            },
            mid: SweptLevel {
                price: 0.0,
                swept: false,
            },
            low: SweptLevel {
                price: candle.low,
                swept: false,
            },
            close: candle.close,
            watermark,
        };
        liq.refresh(now);
        liq
    }

    pub fn id(&self) -> BoundaryId {
        BoundaryId {
            bucket: self.bucket,
            start: self.start,
        }
    }

    pub fn level(&self, tag: LevelTag) -> SweptLevel {
        match tag {
            LevelTag::High => self.high,
            LevelTag::Half => self.mid,
            LevelTag::Low => self.low,
        }
    }

    /// Extremes of every candle after the bucket's end, if any.
    pub fn watermark(&self) -> Option<Extremes> {
        self.watermark
    }

    /// Later in-bucket candle.
    pub(crate) fn extend(&mut self, candle: &Candle) {
        self.high.price = self.high.price.max(candle.high);
        self.low.price = self.low.price.min(candle.low);
        self.close = candle.close;
    }

    /// Earlier in-bucket candle, seen while scanning backward.
    pub(crate) fn extend_back(&mut self, candle: &Candle) {
        self.high.price = self.high.price.max(candle.high);
        self.low.price = self.low.price.min(candle.low);
    }

    /// Candle after the bucket's end.
    pub(crate) fn observe(&mut self, candle: &Candle) {
        self.watermark = Some(Extremes::widened(self.watermark, candle));
    }

    /// Recomputes mid, closed state and swept flags at snapshot instant `now`.
    ///
    /// `now` is the close of the latest candle, so a bucket is closed as soon
    /// as its last candle has been advanced (`end <= now`).
    pub(crate) fn refresh(&mut self, now: DateTime<Utc>) {
        self.is_closed = self.end <= now;
        self.mid.price = (self.high.price + self.low.price) / 2.0;
        match self.watermark {
            Some(w) if self.is_closed => {
                self.high.swept = w.high > self.high.price;
                self.low.swept = w.low < self.low.price;
                self.mid.swept = w.low <= self.mid.price && self.mid.price <= w.high;
            }
            _ => {
                self.high.swept = false;
                self.mid.swept = false;
                self.low.swept = false;
            }
        }
    }
}
