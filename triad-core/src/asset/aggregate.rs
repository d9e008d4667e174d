//! Current and previous candles at the coarser resolutions.

use crate::calendar::Resolution;
use crate::domain::Candle;
use serde::{Deserialize, Serialize};

const SLOTS: usize = Resolution::AGGREGATED.len();

/// Incrementally maintained aggregate candles, one pair per resolution in
/// `Resolution::AGGREGATED`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Aggregates {
    current: [Option<Candle>; SLOTS],
    previous: [Option<Candle>; SLOTS],
}

impl Aggregates {
    /// Folds the next base candle into every resolution, rolling over when it
    /// opens a new period.
    pub fn push(&mut self, candle: &Candle) {
        for (i, res) in Resolution::AGGREGATED.iter().enumerate() {
            let period = res.period_start(candle.timestamp);
            match self.current[i].as_mut() {
                Some(cur) if res.period_start(cur.timestamp) == period => cur.absorb(candle),
                _ => {
                    self.previous[i] = self.current[i].take();
                    self.current[i] = Some(*candle);
                }
            }
        }
    }

    /// Aggregates for the latest candle of an ascending contiguous run.
    pub fn rebuild(candles: &[Candle]) -> Self {
        let mut out = Self::default();
        let Some(last) = candles.last() else {
            return out;
        };
        for (i, res) in Resolution::AGGREGATED.iter().enumerate() {
            let current_start = res.period_start(last.timestamp);
            let split = candles.partition_point(|c| c.timestamp < current_start);
            out.current[i] = Candle::merge(&candles[split..]);
            if let Some(before) = candles[..split].last() {
                let previous_start = res.period_start(before.timestamp);
                let from = candles[..split].partition_point(|c| c.timestamp < previous_start);
                out.previous[i] = Candle::merge(&candles[from..split]);
            }
        }
        out
    }

    pub fn current(&self, res: Resolution) -> Option<&Candle> {
        res.aggregated_index().and_then(|i| self.current[i].as_ref())
    }

    pub fn previous(&self, res: Resolution) -> Option<&Candle> {
        res.aggregated_index().and_then(|i| self.previous[i].as_ref())
    }
}
