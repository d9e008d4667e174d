//! Replay loop: advances a triad candle by candle and drives strategies.
//!
//! Each tick is one atomic step: advance all three instruments, recompute the
//! tick state, diff it against the previous tick, then hand the result to
//! every strategy. The loop only ends at the stop time or on a fatal error.

pub mod feed;
pub mod strategy;

pub use feed::TriadFeed;
pub use strategy::{FnStrategy, Strategy};

use crate::calendar::trading_date;
use crate::diff::{DivergenceDiff, TargetDiff};
use crate::domain::Candle;
use crate::error::Result;
use crate::triad::{Snapshot, Target, TickReport, Triad, TrueOpens};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Everything derived from the triad on one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickState {
    pub snapshot: Snapshot,
    pub long_targets: Vec<Target>,
    pub short_targets: Vec<Target>,
    pub true_opens: TrueOpens,
}

impl TickState {
    pub fn capture(triad: &Triad) -> Self {
        Self {
            snapshot: triad.snapshot(),
            long_targets: triad.long_targets(),
            short_targets: triad.short_targets(),
            true_opens: triad.true_opens(),
        }
    }
}

/// What a strategy sees on one tick. Valid for that tick only.
pub struct TickContext<'a> {
    pub triad: &'a Triad,
    pub previous: &'a TickState,
    pub current: &'a TickState,
    pub divergence: &'a DivergenceDiff,
    pub targets: &'a TargetDiff,
}

impl<'a> TickContext<'a> {
    pub fn true_opens(&self) -> &'a TrueOpens {
        &self.current.true_opens
    }

    pub fn report(&self) -> TickReport<'a> {
        TickReport::new(
            self.triad,
            &self.current.snapshot,
            &self.current.long_targets,
            &self.current.short_targets,
            &self.current.true_opens,
        )
    }
}

/// Diffs between two tick states. `last` is the candle triple just advanced.
pub fn diff_ticks(last: &[Candle; 3], previous: &TickState, current: &TickState) -> (DivergenceDiff, TargetDiff) {
    let divergence = DivergenceDiff::between(&previous.snapshot, &current.snapshot);
    let targets = TargetDiff::between(
        last,
        (&previous.long_targets, &previous.short_targets),
        (&current.long_targets, &current.short_targets),
    );
    (divergence, targets)
}

/// Replays `feed` through `triad` until the cursor reaches `stop`, returning
/// each strategy's closed trades by name.
///
/// The loop returns right after the first handler call that sees the cursor
/// at or past `stop`; strategies later in the list are not called on that tick.
pub fn fronttest<T, I>(
    triad: &mut Triad,
    strategies: &[&dyn Strategy<Trade = T>],
    feed: &mut TriadFeed<I>,
    stop: DateTime<Utc>,
) -> Result<BTreeMap<String, Vec<T>>>
where
    I: Iterator<Item = Candle>,
{
    let mut active: Vec<Vec<T>> = strategies.iter().map(|_| Vec::new()).collect();
    let mut closed: Vec<Vec<T>> = strategies.iter().map(|_| Vec::new()).collect();
    let mut previous = TickState::capture(triad);
    let mut day: Option<NaiveDate> = None;
    let mut ticks = 0usize;

    loop {
        let candles = feed.next_triple()?;
        triad.advance(candles)?;
        ticks += 1;

        let cursor = candles[0].timestamp;
        let today = trading_date(cursor);
        if day != Some(today) {
            if day.is_some() {
                let closed_so_far: usize = closed.iter().map(Vec::len).sum();
                info!(day = %today, ticks, closed = closed_so_far, "replaying");
            }
            day = Some(today);
        }

        let current = TickState::capture(triad);
        let (divergence, targets) = diff_ticks(&candles, &previous, &current);
        let ctx = TickContext {
            triad,
            previous: &previous,
            current: &current,
            divergence: &divergence,
            targets: &targets,
        };

        let stopping = cursor >= stop;
        for (i, strategy) in strategies.iter().enumerate() {
            let (still, done) = strategy.handle_trades(stop, std::mem::take(&mut active[i]), &ctx);
            active[i] = still;
            closed[i].extend(done);
            if stopping {
                if !active[i].is_empty() {
                    warn!(
                        strategy = strategy.name(),
                        open = active[i].len(),
                        "trades still active at stop time"
                    );
                }
                return Ok(finish(strategies, closed, ticks, cursor));
            }
            active[i].extend(strategy.open_trades(&ctx));
        }
        if stopping {
            return Ok(finish(strategies, closed, ticks, cursor));
        }
        previous = current;
    }
}

fn finish<T>(
    strategies: &[&dyn Strategy<Trade = T>],
    closed: Vec<Vec<T>>,
    ticks: usize,
    cursor: DateTime<Utc>,
) -> BTreeMap<String, Vec<T>> {
    info!(ticks, cursor = %cursor.format(crate::domain::MINUTE_FORMAT), "replay finished");
    let mut out: BTreeMap<String, Vec<T>> = BTreeMap::new();
    for (strategy, trades) in strategies.iter().zip(closed) {
        out.entry(strategy.name().to_string()).or_default().extend(trades);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::base_step;
    use std::cell::Cell;

    fn candles_ts(label: &str) -> DateTime<Utc> {
        Candle::parse_minute(label).unwrap()
    }

    fn series(start: &str, n: usize) -> Vec<Candle> {
        let start = Candle::parse_minute(start).unwrap();
        (0..n)
            .map(|i| {
                let p = 100.0 + i as f64;
                Candle::new(start + base_step() * i as i32, p, p + 1.0, p - 1.0, p, 1.0)
            })
            .collect()
    }

    #[test]
    fn stops_on_the_tick_reaching_stop_time() {
        let candles = series("2024-03-14 00:00", 10);
        let stop = candles[1].timestamp;
        let mut triad = Triad::empty(["A", "B", "C"]);
        let mut feed = TriadFeed::new(
            ["A", "B", "C"],
            [candles.clone().into_iter(), candles.clone().into_iter(), candles.into_iter()],
        );

        let handled = Cell::new(0);
        let opened = Cell::new(0);
        let strategy = FnStrategy::new(
            "counter",
            |ctx: &TickContext<'_>| {
                opened.set(opened.get() + 1);
                vec![ctx.triad.cursor()]
            },
            |_stop, active: Vec<Option<DateTime<Utc>>>, _ctx: &TickContext<'_>| {
                handled.set(handled.get() + 1);
                (Vec::new(), active)
            },
        );
        let strategies: [&dyn Strategy<Trade = Option<DateTime<Utc>>>; 1] = [&strategy];
        let result = fronttest(&mut triad, &strategies, &mut feed, stop).unwrap();

        assert_eq!(feed.served(), 2);
        assert_eq!(handled.get(), 2);
        assert_eq!(opened.get(), 1);
        assert_eq!(result["counter"], vec![Some(candles_ts("2024-03-14 00:00"))]);
    }

    #[test]
    fn exhausted_feed_is_an_error() {
        let candles = series("2024-03-14 00:00", 2);
        let mut triad = Triad::empty(["A", "B", "C"]);
        let mut feed = TriadFeed::new(
            ["A", "B", "C"],
            [candles.clone().into_iter(), candles.clone().into_iter(), candles.into_iter()],
        );
        let strategies: [&dyn Strategy<Trade = ()>; 0] = [];
        let err = fronttest(&mut triad, &strategies, &mut feed, candles_ts("2025-01-01 00:00")).unwrap_err();
        assert!(matches!(err, crate::error::CoreError::FeedExhausted { served: 2, .. }));
    }

    #[test]
    fn no_strategies_still_stops() {
        let candles = series("2024-03-14 00:00", 5);
        let stop = candles[2].timestamp;
        let mut triad = Triad::empty(["A", "B", "C"]);
        let mut feed = TriadFeed::new(
            ["A", "B", "C"],
            [candles.clone().into_iter(), candles.clone().into_iter(), candles.into_iter()],
        );
        let result = fronttest::<(), _>(&mut triad, &[], &mut feed, stop).unwrap();
        assert!(result.is_empty());
        assert_eq!(triad.cursor(), Some(stop));
    }

    #[test]
    fn later_strategies_are_skipped_on_the_stop_tick() {
        let candles = series("2024-03-14 00:00", 4);
        let stop = candles[1].timestamp;
        let mut triad = Triad::empty(["A", "B", "C"]);
        let mut feed = TriadFeed::new(
            ["A", "B", "C"],
            [candles.clone().into_iter(), candles.clone().into_iter(), candles.into_iter()],
        );

        let first = Cell::new(0);
        let second = Cell::new(0);
        let a = FnStrategy::new(
            "a",
            |_: &TickContext<'_>| Vec::new(),
            |_stop, active: Vec<u32>, _ctx: &TickContext<'_>| {
                first.set(first.get() + 1);
                (active, Vec::new())
            },
        );
        let b = FnStrategy::new(
            "b",
            |_: &TickContext<'_>| vec![7],
            |_stop, active: Vec<u32>, _ctx: &TickContext<'_>| {
                second.set(second.get() + 1);
                (Vec::new(), active)
            },
        );
        let strategies: [&dyn Strategy<Trade = u32>; 2] = [&a, &b];
        let result = fronttest(&mut triad, &strategies, &mut feed, stop).unwrap();

        assert_eq!(first.get(), 2);
        assert_eq!(second.get(), 1);
        assert!(result["a"].is_empty());
        assert!(result["b"].is_empty());
    }
}
