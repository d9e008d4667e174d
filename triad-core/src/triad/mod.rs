//! Divergence engine: three instruments advanced in lockstep.
//!
//! The triad derives everything strategies consume from the three instrument
//! states: outstanding boundaries, SMT divergences with their PSP swings,
//! liquidity targets and true-open distances. All of it is recomputed from
//! current state; nothing here is cached across ticks.

pub mod psp;
pub mod readable;
pub mod smt;
pub mod snapshot;
pub mod targets;

pub use psp::{periods_for, Psp};
pub use readable::TickReport;
pub use smt::{Smt, SmtKey};
pub use snapshot::Snapshot;
pub use targets::{Target, TargetLevel};

use crate::asset::{Asset, BoundaryId, BoundaryLiquidity};
use crate::calendar::Scheme;
use crate::domain::{percent_from_current, Candle};
use crate::error::{CoreError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::array;

/// Side of a divergence or target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    High,
    HalfHigh,
    HalfLow,
    Low,
}

impl Direction {
    /// True when price is measured by highs (a move up into the level).
    pub fn is_high_side(self) -> bool {
        matches!(self, Direction::High | Direction::HalfHigh)
    }
}

/// Half-open time interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// A closed boundary instance present in all three instruments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Boundary {
    pub id: BoundaryId,
    pub priority: u8,
    pub end: DateTime<Utc>,
    pub liquidity: [BoundaryLiquidity; 3],
}

/// Where a true-open style reference price comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpenSource {
    TrueOpen(Scheme),
    LastClose,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenDistance {
    pub source: OpenSource,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
    pub percent: f64,
}

/// Reference prices of one instrument, farthest above current price first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetOpens {
    pub symbol: String,
    pub current: f64,
    pub opens: Vec<OpenDistance>,
}

/// True opens of all three instruments for one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrueOpens {
    pub assets: Vec<AssetOpens>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Triad {
    assets: [Asset; 3],
}

impl Triad {
    /// Wraps three instrument states that share a cursor.
    pub fn new(assets: [Asset; 3]) -> Result<Self> {
        let expected = assets[0].cursor();
        if let Some(other) = assets[1..].iter().find(|a| a.cursor() != expected) {
            return Err(CoreError::Desynchronized {
                expected,
                got: other.cursor(),
            });
        }
        Ok(Self { assets })
    }

    pub fn empty(symbols: [&str; 3]) -> Self {
        Self {
            assets: symbols.map(Asset::new),
        }
    }

    /// Reconstructs each instrument from its descending feed.
    pub fn reconstruct<I>(symbols: [&str; 3], feeds: [I; 3]) -> Result<Self>
    where
        I: IntoIterator<Item = Candle>,
    {
        let [f0, f1, f2] = feeds;
        let assets = [
            Asset::reconstruct(symbols[0], f0)?,
            Asset::reconstruct(symbols[1], f1)?,
            Asset::reconstruct(symbols[2], f2)?,
        ];
        Self::new(assets)
    }

    /// Advances all three instruments by one candle each. Timestamps must
    /// match; nothing is mutated otherwise.
    pub fn advance(&mut self, candles: [Candle; 3]) -> Result<()> {
        let expected = candles[0].timestamp;
        if let Some(odd) = candles[1..].iter().find(|c| c.timestamp != expected) {
            return Err(CoreError::Desynchronized {
                expected: Some(expected),
                got: Some(odd.timestamp),
            });
        }
        for (asset, candle) in self.assets.iter_mut().zip(candles) {
            asset.advance(candle)?;
        }
        Ok(())
    }

    pub fn assets(&self) -> &[Asset; 3] {
        &self.assets
    }

    pub fn symbols(&self) -> [&str; 3] {
        array::from_fn(|i| self.assets[i].symbol())
    }

    pub fn cursor(&self) -> Option<DateTime<Utc>> {
        self.assets[0].cursor()
    }

    pub fn now(&self) -> Option<DateTime<Utc>> {
        self.assets[0].now()
    }

    /// Latest candle of each instrument.
    pub fn last_candles(&self) -> Option<[Candle; 3]> {
        let [a, b, c] = &self.assets;
        Some([*a.last_candle()?, *b.last_candle()?, *c.last_candle()?])
    }

    /// Latest close of each instrument.
    pub fn current_prices(&self) -> Option<[f64; 3]> {
        self.last_candles().map(|cs| cs.map(|c| c.close))
    }

    /// Known true opens plus the latest close for each instrument, sorted by
    /// percent distance from the latest close, descending.
    pub fn true_opens(&self) -> TrueOpens {
        let assets = self
            .assets
            .iter()
            .filter_map(|asset| {
                let last = asset.last_candle()?;
                let current = last.close;
                let mut opens: Vec<OpenDistance> = asset
                    .true_opens()
                    .map(|to| OpenDistance {
                        source: OpenSource::TrueOpen(to.scheme),
                        price: to.price,
                        timestamp: to.timestamp,
                        percent: percent_from_current(current, to.price),
                    })
                    .collect();
                opens.push(OpenDistance {
                    source: OpenSource::LastClose,
                    price: current,
                    timestamp: last.timestamp,
                    percent: 0.0,
                });
                opens.sort_by(|a, b| b.percent.total_cmp(&a.percent));
                Some(AssetOpens {
                    symbol: asset.symbol().to_string(),
                    current,
                    opens,
                })
            })
            .collect();
        TrueOpens { assets }
    }

    /// Every closed boundary instance the three instruments share, coarsest
    /// scheme first, oldest first within a scheme.
    pub fn outstanding_boundaries(&self) -> Vec<Boundary> {
        let [a, b, c] = &self.assets;
        let mut out = Vec::new();
        for scheme in Scheme::ALL {
            for first in a.liquidity_table(scheme).iter().filter(|l| l.is_closed) {
                let id = first.id();
                let (Some(second), Some(third)) = (b.boundary(&id), c.boundary(&id)) else {
                    continue;
                };
                if !(second.is_closed && third.is_closed) {
                    continue;
                }
                out.push(Boundary {
                    id,
                    priority: scheme.priority(),
                    end: first.end,
                    liquidity: [first.clone(), second.clone(), third.clone()],
                });
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::base_step;

    fn at(label: &str) -> DateTime<Utc> {
        Candle::parse_minute(label).unwrap()
    }

    fn bar(ts: DateTime<Utc>, price: f64) -> Candle {
        Candle::new(ts, price, price + 1.0, price - 1.0, price, 1.0)
    }

    #[test]
    fn advance_requires_matching_timestamps() {
        let mut triad = Triad::empty(["A", "B", "C"]);
        let t = at("2024-03-14 00:00");
        let err = triad
            .advance([bar(t, 1.0), bar(t, 1.0), bar(t + base_step(), 1.0)])
            .unwrap_err();
        assert!(matches!(err, CoreError::Desynchronized { .. }));
        assert_eq!(triad.cursor(), None);

        triad.advance([bar(t, 1.0), bar(t, 2.0), bar(t, 3.0)]).unwrap();
        assert_eq!(triad.cursor(), Some(t));
        assert_eq!(triad.current_prices(), Some([1.0, 2.0, 3.0]));
    }

    #[test]
    fn new_rejects_out_of_step_assets() {
        let mut lagging = Asset::new("C");
        lagging.advance(bar(at("2024-03-14 00:00"), 1.0)).unwrap();
        let err = Triad::new([Asset::new("A"), Asset::new("B"), lagging]).unwrap_err();
        assert!(matches!(err, CoreError::Desynchronized { .. }));
    }

    #[test]
    fn true_opens_include_last_close_sorted_descending() {
        let mut triad = Triad::empty(["A", "B", "C"]);
        // London true open at 04:00 UTC, then price rises.
        let mut ts = at("2024-03-14 03:45");
        let mut price = 100.0;
        while ts <= at("2024-03-14 05:00") {
            triad.advance([bar(ts, price), bar(ts, price), bar(ts, price)]).unwrap();
            price += 1.0;
            ts += base_step();
        }
        let opens = triad.true_opens();
        assert_eq!(opens.assets.len(), 3);
        let first = &opens.assets[0];
        assert_eq!(first.symbol, "A");
        assert_eq!(first.opens.len(), 2);
        assert_eq!(first.opens[0].source, OpenSource::LastClose);
        assert_eq!(first.opens[1].source, OpenSource::TrueOpen(Scheme::DayQuarter));
        assert!(first.opens[1].percent < 0.0);
    }

    #[test]
    fn outstanding_boundaries_are_closed_and_shared() {
        let mut triad = Triad::empty(["A", "B", "C"]);
        let mut ts = at("2024-03-13 22:00");
        while ts < at("2024-03-14 05:00") {
            triad.advance([bar(ts, 10.0), bar(ts, 20.0), bar(ts, 30.0)]).unwrap();
            ts += base_step();
        }
        let boundaries = triad.outstanding_boundaries();
        assert!(!boundaries.is_empty());
        for b in &boundaries {
            assert!(b.liquidity.iter().all(|l| l.is_closed));
            assert!(b.liquidity.iter().all(|l| l.start == b.id.start));
            assert_eq!(b.priority, b.id.bucket.scheme().priority());
        }
        // Asia closed at 04:00 UTC.
        assert!(boundaries
            .iter()
            .any(|b| b.id.bucket == crate::calendar::Bucket::DayQuarter(crate::calendar::DayQuarter::Asia)));
    }
}
