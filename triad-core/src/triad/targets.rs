//! Outstanding liquidity projected as trade targets.

use super::{Boundary, Direction, Triad};
use crate::asset::{BoundaryId, LevelTag};
use crate::domain::percent_from_current;
use serde::{Deserialize, Serialize};
use std::array;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetLevel {
    pub price: f64,
    pub percent: f64,
}

/// An unswept level all three instruments still have in front of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub priority: u8,
    pub direction: Direction,
    pub boundary: BoundaryId,
    pub levels: [TargetLevel; 3],
}

impl Target {
    /// Identity across ticks.
    pub fn key(&self) -> (Direction, BoundaryId) {
        (self.direction, self.boundary)
    }
}

impl Triad {
    /// Targets above price: unswept mids that sit above every current close,
    /// and unswept highs. Nearest first by the first instrument.
    pub fn long_targets(&self) -> Vec<Target> {
        let mut out = self.targets(true);
        out.sort_by(|a, b| a.levels[0].percent.total_cmp(&b.levels[0].percent));
        out
    }

    /// Targets below price: unswept mids under every current close, and
    /// unswept lows. Nearest first by the first instrument.
    pub fn short_targets(&self) -> Vec<Target> {
        let mut out = self.targets(false);
        out.sort_by(|a, b| b.levels[0].percent.total_cmp(&a.levels[0].percent));
        out
    }

    fn targets(&self, long: bool) -> Vec<Target> {
        let Some(current) = self.current_prices() else {
            return Vec::new();
        };
        let (half, extreme, extreme_tag) = if long {
            (Direction::HalfHigh, Direction::High, LevelTag::High)
        } else {
            (Direction::HalfLow, Direction::Low, LevelTag::Low)
        };

        let mut out = Vec::new();
        for boundary in self.outstanding_boundaries() {
            let mids = levels(&boundary, LevelTag::Half);
            let profitable = (0..3).all(|k| {
                if long {
                    mids[k].0 > current[k]
                } else {
                    mids[k].0 < current[k]
                }
            });
            if mids.iter().all(|(_, swept)| !swept) && profitable {
                out.push(target(&boundary, half, mids, current));
            }

            let extremes = levels(&boundary, extreme_tag);
            if extremes.iter().all(|(_, swept)| !swept) {
                out.push(target(&boundary, extreme, extremes, current));
            }
        }
        out
    }
}

fn target(boundary: &Boundary, direction: Direction, levels: [(f64, bool); 3], current: [f64; 3]) -> Target {
    Target {
        priority: boundary.priority,
        direction,
        boundary: boundary.id,
        levels: array::from_fn(|k| TargetLevel {
            price: levels[k].0,
            percent: percent_from_current(current[k], levels[k].0),
        }),
    }
}

fn levels(boundary: &Boundary, tag: LevelTag) -> [(f64, bool); 3] {
    array::from_fn(|k| {
        let level = boundary.liquidity[k].level(tag);
        (level.price, level.swept)
    })
}
