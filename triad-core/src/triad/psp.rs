//! PSP: swing candles confirming an SMT, found by re-aggregating the
//! divergence window at a coarser period.
//!
//! A PSP is possible as soon as it qualifies, closed once its period has
//! elapsed, confirmed once the next closed period fails to extend it, and
//! swept (no longer active) from the first later period that does.

use super::{Interval, Smt, Triad};
use crate::calendar::{Resolution, Scheme};
use crate::domain::{base_step, Candle};
use serde::{Deserialize, Serialize};
use std::array;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Psp {
    pub period: Resolution,
    pub interval: Interval,
    /// Aggregated candle of each instrument.
    pub candles: [Candle; 3],
    pub closed: bool,
    pub confirmed: bool,
    /// Period in which some instrument first went beyond this swing.
    pub swept: Option<Interval>,
}

impl Psp {
    pub fn is_active(&self) -> bool {
        self.swept.is_none()
    }
}

/// Re-aggregation periods searched for PSPs, per boundary scale.
pub fn periods_for(scheme: Scheme) -> &'static [Resolution] {
    match scheme {
        Scheme::Quarter90m => &[Resolution::M15, Resolution::M30],
        Scheme::DayQuarter => &[Resolution::M15, Resolution::M30, Resolution::H1],
        Scheme::Weekday => &[Resolution::H1, Resolution::H2, Resolution::H4],
        Scheme::MonthWeek => &[Resolution::H4, Resolution::D1],
        Scheme::YearQuarter => &[Resolution::D1, Resolution::W1],
        Scheme::Year => &[Resolution::W1, Resolution::Month1],
    }
}

/// Splits an ascending contiguous run into period groups: (interval, first
/// index, one-past-last index).
fn group(candles: &[Candle], period: Resolution) -> Vec<(Interval, usize, usize)> {
    let mut out: Vec<(Interval, usize, usize)> = Vec::new();
    for (i, c) in candles.iter().enumerate() {
        match out.last_mut() {
            Some((interval, _, end)) if c.timestamp < interval.end => *end = i + 1,
            _ => {
                let (start, end) = period.period(c.timestamp);
                out.push((Interval { start, end }, i, i + 1));
            }
        }
    }
    out
}

impl Triad {
    /// PSPs of `smt` at one re-aggregation period, oldest first.
    pub fn detect_psp(&self, smt: &Smt, period: Resolution) -> Vec<Psp> {
        let Some(now) = self.now() else {
            return Vec::new();
        };
        let assets = self.assets();
        let windows: [&[Candle]; 3] = array::from_fn(|k| assets[k].range(smt.window.start, now));
        let len = windows.iter().map(|w| w.len()).min().unwrap_or(0);
        if len == 0 {
            return Vec::new();
        }

        // Instruments share timestamps, so one grouping serves all three.
        let groups = group(&windows[0][..len], period);
        let bars: Vec<(Interval, [Candle; 3])> = groups
            .iter()
            .filter_map(|&(interval, from, to)| {
                let [a, b, c] = array::from_fn(|k| Candle::merge(&windows[k][from..to]));
                Some((interval, [a?, b?, c?]))
            })
            .collect();

        let high_side = smt.direction.is_high_side();
        let extreme = |c: &Candle| if high_side { c.high } else { c.low };
        let beyond = |a: f64, b: f64| if high_side { a > b } else { a < b };
        let levels = smt.level_prices();
        let preceding: [Option<f64>; 3] = array::from_fn(|k| {
            assets[k]
                .range(smt.window.start - base_step(), smt.window.start)
                .first()
                .map(extreme)
        });

        let mut prior = preceding;
        let mut out = Vec::new();
        for (i, (interval, trio)) in bars.iter().enumerate() {
            let colors = trio.map(|c| c.color());
            let mixed = !(colors[0] == colors[1] && colors[1] == colors[2]);
            let swings = (0..3).any(|k| {
                let e = extreme(&trio[k]);
                beyond(e, levels[k]) || prior[k].is_some_and(|p| beyond(e, p))
            });

            if mixed && swings {
                let next = bars.get(i + 1);
                let confirmed = next.is_some_and(|(next_interval, next_trio)| {
                    next_interval.end <= now
                        && (0..3).all(|k| !beyond(extreme(&next_trio[k]), extreme(&trio[k])))
                });
                let swept = bars[i + 1..]
                    .iter()
                    .find(|(_, later)| (0..3).any(|k| beyond(extreme(&later[k]), extreme(&trio[k]))))
                    .map(|(later_interval, _)| *later_interval);
                out.push(Psp {
                    period,
                    interval: *interval,
                    candles: *trio,
                    closed: interval.end <= now,
                    confirmed,
                    swept,
                });
            }

            for k in 0..3 {
                let e = extreme(&trio[k]);
                prior[k] = Some(match prior[k] {
                    Some(p) if i > 0 && !beyond(e, p) => p,
                    _ => e,
                });
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::LevelTag;
    use crate::calendar::{Bucket, DayQuarter};
    use crate::triad::Direction;
    use chrono::{DateTime, Utc};

    fn at(label: &str) -> DateTime<Utc> {
        Candle::parse_minute(label).unwrap()
    }

    fn ohlc(ts: DateTime<Utc>, o: f64, h: f64, l: f64, c: f64) -> Candle {
        Candle::new(ts, o, h, l, c, 1.0)
    }

    /// Asia 80..100 for all, then the given 15m rows.
    fn run(after: &[[(f64, f64, f64, f64); 3]]) -> Triad {
        run_after_asia(100.0, after)
    }

    /// Like [`run`], but the last Asia candle (03:45) only reaches `last_high`.
    fn run_after_asia(last_high: f64, after: &[[(f64, f64, f64, f64); 3]]) -> Triad {
        let mut triad = Triad::empty(["A", "B", "C"]);
        let mut ts = at("2024-03-13 22:00");
        while ts < at("2024-03-14 04:00") {
            let high = if ts == at("2024-03-14 03:45") { last_high } else { 100.0 };
            let c = ohlc(ts, 90.0, high, 80.0, 85.0);
            triad.advance([c, c, c]).unwrap();
            ts += base_step();
        }
        for row in after {
            triad
                .advance(row.map(|(o, h, l, c)| ohlc(ts, o, h, l, c)))
                .unwrap();
            ts += base_step();
        }
        triad
    }

    fn asia_high(triad: &Triad) -> Smt {
        triad
            .outstanding_boundaries()
            .iter()
            .flat_map(|b| triad.detect_smt(b))
            .find(|s| {
                s.key.boundary.bucket == Bucket::DayQuarter(DayQuarter::Asia)
                    && s.key.level == LevelTag::High
            })
            .unwrap()
    }

    const UP: (f64, f64, f64, f64) = (95.0, 99.0, 94.0, 98.0);

    #[test]
    fn swing_candle_closed_confirmed_then_swept() {
        let triad = run(&[
            // 04:00 B sweeps the high with a red candle, A and C green.
            [UP, (99.0, 103.0, 95.0, 96.0), UP],
            // 04:15 nobody extends: confirms 04:00.
            [(97.0, 98.0, 93.0, 94.0), (96.0, 101.0, 93.0, 94.0), (97.0, 98.0, 93.0, 94.0)],
            // 04:30 A extends past its 04:00 high: sweeps the swing.
            [(94.0, 99.5, 93.0, 95.0), (94.0, 100.0, 93.0, 95.0), (94.0, 98.0, 93.0, 95.0)],
        ]);
        let smt = asia_high(&triad);
        assert_eq!(smt.direction, Direction::High);

        let psps = triad.detect_psp(&smt, Resolution::M15);
        let first = &psps[0];
        assert_eq!(first.interval.start, at("2024-03-14 04:00"));
        assert!(first.closed);
        assert!(first.confirmed);
        assert_eq!(first.swept.map(|iv| iv.start), Some(at("2024-03-14 04:30")));
        assert!(!first.is_active());
    }

    #[test]
    fn same_colored_candles_never_qualify() {
        let triad = run(&[
            [UP, (95.0, 103.0, 94.0, 98.0), UP],
            [UP, UP, UP],
        ]);
        let smt = asia_high(&triad);
        assert!(triad.detect_psp(&smt, Resolution::M15).is_empty());
    }

    #[test]
    fn open_period_is_not_closed() {
        let triad = run(&[[UP, (99.0, 103.0, 95.0, 96.0), UP]]);
        let smt = asia_high(&triad);
        // Hours run from 22:00 UTC, so 04:00 opens an hour that has not elapsed.
        let psps = triad.detect_psp(&smt, Resolution::H1);
        assert_eq!(psps.len(), 1);
        assert!(!psps[0].closed);
        assert!(!psps[0].confirmed);
        assert!(psps[0].is_active());
    }

    #[test]
    fn first_bar_compares_against_preceding_candle() {
        let triad = run_after_asia(
            95.0,
            &[
                // 04:00 stays under the level (100) but clears the 03:45 high (95).
                [(96.0, 97.0, 94.0, 96.5), (96.0, 97.0, 93.0, 95.0), (96.0, 97.0, 94.0, 96.5)],
                // 04:15 B sweeps the level.
                [UP, (99.0, 103.0, 95.0, 96.0), UP],
            ],
        );
        let smt = asia_high(&triad);
        assert_eq!(smt.window.start, at("2024-03-14 04:00"));

        let psps = triad.detect_psp(&smt, Resolution::M15);
        assert_eq!(psps[0].interval.start, smt.window.start);
        assert_eq!(psps[0].swept.map(|iv| iv.start), Some(at("2024-03-14 04:15")));
    }

    #[test]
    fn first_bar_below_preceding_candle_does_not_qualify() {
        let triad = run_after_asia(
            95.0,
            &[
                // 04:00 tops at 94: under both the level and the 03:45 high.
                [(92.0, 94.0, 91.0, 93.5), (92.0, 94.0, 90.0, 91.0), (92.0, 94.0, 91.0, 93.5)],
                [UP, (99.0, 103.0, 95.0, 96.0), UP],
            ],
        );
        let smt = asia_high(&triad);
        let psps = triad.detect_psp(&smt, Resolution::M15);
        assert!(psps.iter().all(|p| p.interval.start != at("2024-03-14 04:00")));
        assert_eq!(psps[0].interval.start, at("2024-03-14 04:15"));
    }

    #[test]
    fn period_table_covers_every_scheme() {
        for scheme in Scheme::ALL {
            assert!(!periods_for(scheme).is_empty());
        }
    }
}
