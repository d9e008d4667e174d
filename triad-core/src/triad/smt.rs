//! SMT: the three instruments disagree on sweeping the same level.

use super::{Boundary, Direction, Interval, Psp, Triad};
use crate::asset::{BoundaryId, BoundaryLiquidity, Extremes, LevelTag};
use crate::calendar::Resolution;
use crate::domain::Candle;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::array;
use std::collections::BTreeMap;

/// Identity of a divergence across ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SmtKey {
    pub boundary: BoundaryId,
    pub level: LevelTag,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Smt {
    pub key: SmtKey,
    pub priority: u8,
    pub direction: Direction,
    pub liquidity: [BoundaryLiquidity; 3],
    /// First post-boundary candle at which one or two instruments had swept.
    pub first_appeared: DateTime<Utc>,
    /// Post-boundary window the divergence was evaluated over.
    pub window: Interval,
    pub psps: BTreeMap<Resolution, Vec<Psp>>,
}

impl Smt {
    /// Sweep status of the divergent level per instrument.
    pub fn swept(&self) -> [bool; 3] {
        array::from_fn(|k| self.liquidity[k].level(self.key.level).swept)
    }

    /// Level price per instrument.
    pub fn level_prices(&self) -> [f64; 3] {
        array::from_fn(|k| self.liquidity[k].level(self.key.level).price)
    }

    /// PSPs of one period that have not been swept.
    pub fn active_psps(&self, period: Resolution) -> impl Iterator<Item = &Psp> {
        self.psps
            .get(&period)
            .into_iter()
            .flatten()
            .filter(|p| p.is_active())
    }

    /// Each instrument's candles inside the divergence window.
    pub fn window_candles<'a>(&self, triad: &'a Triad) -> [&'a [Candle]; 3] {
        let assets = triad.assets();
        array::from_fn(|k| assets[k].range(self.window.start, self.window.end))
    }
}

/// Half-level side from where each instrument closed the bucket. Mixed closes
/// give no half divergence.
fn half_direction(liquidity: &[BoundaryLiquidity; 3]) -> Option<Direction> {
    if liquidity.iter().all(|l| l.close < l.mid.price) {
        Some(Direction::HalfHigh)
    } else if liquidity.iter().all(|l| l.close > l.mid.price) {
        Some(Direction::HalfLow)
    } else {
        None
    }
}

fn is_swept(tag: LevelTag, liq: &BoundaryLiquidity, seen: &Extremes) -> bool {
    match tag {
        LevelTag::High => seen.high > liq.high.price,
        LevelTag::Low => seen.low < liq.low.price,
        LevelTag::Half => seen.low <= liq.mid.price && liq.mid.price <= seen.high,
    }
}

/// Divergences need one or two of three; none or all is agreement.
pub fn diverges(swept: [bool; 3]) -> bool {
    matches!(swept.iter().filter(|s| **s).count(), 1 | 2)
}

impl Triad {
    /// Divergences at one boundary, without PSPs.
    pub fn detect_smt(&self, boundary: &Boundary) -> Vec<Smt> {
        let Some(now) = self.now() else {
            return Vec::new();
        };
        let assets = self.assets();
        let windows: [&[Candle]; 3] = array::from_fn(|k| assets[k].range(boundary.end, now));

        let mut out = Vec::new();
        for tag in LevelTag::ALL {
            let swept = array::from_fn(|k| boundary.liquidity[k].level(tag).swept);
            if !diverges(swept) {
                continue;
            }
            let direction = match tag {
                LevelTag::High => Direction::High,
                LevelTag::Low => Direction::Low,
                LevelTag::Half => match half_direction(&boundary.liquidity) {
                    Some(d) => d,
                    None => continue,
                },
            };
            let Some(first_appeared) = first_divergence(tag, &boundary.liquidity, windows) else {
                continue;
            };
            out.push(Smt {
                key: SmtKey {
                    boundary: boundary.id,
                    level: tag,
                },
                priority: boundary.priority,
                direction,
                liquidity: boundary.liquidity.clone(),
                first_appeared,
                window: Interval {
                    start: boundary.end,
                    end: now,
                },
                psps: BTreeMap::new(),
            });
        }
        out
    }
}

/// Timestamp of the first window candle at which the running sweep count for
/// `tag` is one or two.
fn first_divergence(
    tag: LevelTag,
    liquidity: &[BoundaryLiquidity; 3],
    windows: [&[Candle]; 3],
) -> Option<DateTime<Utc>> {
    let len = windows.iter().map(|w| w.len()).min()?;
    let mut seen: [Option<Extremes>; 3] = [None; 3];
    for i in 0..len {
        for k in 0..3 {
            seen[k] = Some(Extremes::widened(seen[k], &windows[k][i]));
        }
        let swept = array::from_fn(|k| {
            seen[k]
                .as_ref()
                .is_some_and(|s| is_swept(tag, &liquidity[k], s))
        });
        if diverges(swept) {
            return Some(windows[0][i].timestamp);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{Bucket, DayQuarter};
    use crate::domain::base_step;

    fn at(label: &str) -> DateTime<Utc> {
        Candle::parse_minute(label).unwrap()
    }

    fn hl(ts: DateTime<Utc>, high: f64, low: f64, close: f64) -> Candle {
        Candle::new(ts, (high + low) / 2.0, high, low, close, 1.0)
    }

    fn asia(smts: &[Smt]) -> Vec<&Smt> {
        smts.iter()
            .filter(|s| s.key.boundary.bucket == Bucket::DayQuarter(DayQuarter::Asia))
            .collect()
    }

    fn run(after: &[[(f64, f64, f64); 3]], asia_close: [f64; 3]) -> Triad {
        let mut triad = Triad::empty(["A", "B", "C"]);
        let mut ts = at("2024-03-13 22:00");
        while ts < at("2024-03-14 04:00") {
            let last = ts + base_step() == at("2024-03-14 04:00");
            let cs: [Candle; 3] = array::from_fn(|k| {
                hl(ts, 100.0, 80.0, if last { asia_close[k] } else { 90.0 })
            });
            triad.advance(cs).unwrap();
            ts += base_step();
        }
        for row in after {
            triad.advance(row.map(|(h, l, c)| hl(ts, h, l, c))).unwrap();
            ts += base_step();
        }
        triad
    }

    fn all_smts(triad: &Triad) -> Vec<Smt> {
        triad
            .outstanding_boundaries()
            .iter()
            .flat_map(|b| triad.detect_smt(b))
            .collect()
    }

    #[test]
    fn diverges_only_on_one_or_two() {
        assert!(!diverges([false, false, false]));
        assert!(diverges([true, false, false]));
        assert!(diverges([true, true, false]));
        assert!(!diverges([true, true, true]));
    }

    #[test]
    fn high_divergence_records_first_appearance() {
        let triad = run(
            &[
                [(95.0, 90.0, 92.0); 3],
                [(99.0, 94.0, 96.0), (101.0, 94.0, 99.0), (99.0, 94.0, 96.0)],
                [(99.0, 94.0, 96.0), (99.0, 94.0, 96.0), (102.0, 94.0, 99.0)],
            ],
            [85.0, 85.0, 85.0],
        );
        let smts = all_smts(&triad);
        let asia = asia(&smts);
        assert_eq!(asia.len(), 1);
        let smt = asia[0];
        assert_eq!(smt.direction, Direction::High);
        assert_eq!(smt.swept(), [false, true, true]);
        assert_eq!(smt.first_appeared, at("2024-03-14 04:15"));
        assert_eq!(smt.window.start, at("2024-03-14 04:00"));
        assert_eq!(smt.window_candles(&triad)[0].len(), 3);
    }

    #[test]
    fn half_divergence_needs_consistent_closes() {
        let after = [[(91.0, 85.0, 88.0), (89.0, 85.0, 87.0), (89.0, 85.0, 87.0)]];
        // All closed below mid 90: half high.
        let triad = run(&after, [85.0, 85.0, 85.0]);
        let smts = all_smts(&triad);
        let half: Vec<_> = asia(&smts).into_iter().filter(|s| s.key.level == LevelTag::Half).collect();
        assert_eq!(half.len(), 1);
        assert_eq!(half[0].direction, Direction::HalfHigh);

        // Mixed closes: no half divergence.
        let triad = run(&after, [85.0, 95.0, 85.0]);
        let smts = all_smts(&triad);
        assert!(asia(&smts).iter().all(|s| s.key.level != LevelTag::Half));
    }
}
