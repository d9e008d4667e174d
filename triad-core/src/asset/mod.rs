//! Instrument state: rolling candles, per-scheme liquidity, true opens and
//! aggregates for one symbol.
//!
//! State moves forward one base candle at a time through [`Asset::advance`], or
//! is rebuilt in bulk from a descending feed through [`Asset::reconstruct`].
//! Both paths produce identical state for the same history.

pub mod aggregate;
pub mod buffer;
pub mod liquidity;
pub mod true_open;

pub use aggregate::Aggregates;
pub use buffer::CandleBuffer;
pub use liquidity::{BoundaryId, BoundaryLiquidity, Extremes, LevelTag, SweptLevel};
pub use true_open::TrueOpen;

use crate::calendar::{self, Bucket, BucketRange, Resolution, Scheme, SchemeRanges};
use crate::domain::{base_step, Candle};
use crate::error::{CoreError, Result};
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

const SCHEMES: usize = Scheme::ALL.len();

/// Reconstruction logs progress every this many days of history.
const PROGRESS_DAYS: i64 = 90;

#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    symbol: String,
    candles: CandleBuffer,
    liquidity: [Vec<BoundaryLiquidity>; SCHEMES],
    true_opens: [Option<TrueOpen>; SCHEMES],
    aggregates: Aggregates,
}

impl Asset {
    /// Empty state; the first advanced candle may have any aligned timestamp.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            candles: CandleBuffer::new(),
            liquidity: Default::default(),
            true_opens: [None; SCHEMES],
            aggregates: Aggregates::default(),
        }
    }

    // ── Accessors ──────────────────────────────────────────────────────

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Timestamp of the latest advanced candle.
    pub fn cursor(&self) -> Option<DateTime<Utc>> {
        self.candles.last().map(|c| c.timestamp)
    }

    /// Snapshot instant: end of the latest candle.
    pub fn now(&self) -> Option<DateTime<Utc>> {
        self.cursor().map(|ts| ts + base_step())
    }

    pub fn last_candle(&self) -> Option<&Candle> {
        self.candles.last()
    }

    /// Every buffered candle, oldest first.
    pub fn candles(&self) -> &[Candle] {
        self.candles.as_slice()
    }

    /// Buffered candles in `[from, to)`; empty unless fully covered.
    pub fn range(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> &[Candle] {
        self.candles.range(from, to)
    }

    /// Retained liquidity records of one scheme, oldest first.
    pub fn liquidity_table(&self, scheme: Scheme) -> &[BoundaryLiquidity] {
        &self.liquidity[scheme.index()]
    }

    /// Latest retained record tagged `bucket`.
    pub fn liquidity(&self, bucket: Bucket) -> Option<&BoundaryLiquidity> {
        self.liquidity_table(bucket.scheme())
            .iter()
            .rev()
            .find(|l| l.bucket == bucket)
    }

    /// Record of one specific boundary instance.
    pub fn boundary(&self, id: &BoundaryId) -> Option<&BoundaryLiquidity> {
        self.liquidity_table(id.bucket.scheme())
            .iter()
            .find(|l| l.start == id.start && l.bucket == id.bucket)
    }

    pub fn true_open(&self, scheme: Scheme) -> Option<&TrueOpen> {
        self.true_opens[scheme.index()].as_ref()
    }

    /// Known true opens, coarsest scheme first.
    pub fn true_opens(&self) -> impl Iterator<Item = &TrueOpen> {
        self.true_opens.iter().flatten()
    }

    pub fn current(&self, res: Resolution) -> Option<&Candle> {
        self.aggregates.current(res)
    }

    pub fn previous(&self, res: Resolution) -> Option<&Candle> {
        self.aggregates.previous(res)
    }

    // ── Forward ────────────────────────────────────────────────────────

    /// Advances by one base candle. The candle must sit on the 15m grid and
    /// directly follow the cursor.
    pub fn advance(&mut self, candle: Candle) -> Result<()> {
        self.check_next(&candle)?;
        let now = candle.timestamp + base_step();

        self.candles.push(candle);
        self.candles.evict_before(calendar::previous_year_start(now));

        for scheme in Scheme::ALL {
            let sr = calendar::ranges(scheme, now);
            self.roll_liquidity(scheme, &sr.ranges, &candle, now);
            self.stamp_true_open(scheme, &sr, &candle);
        }
        self.aggregates.push(&candle);
        Ok(())
    }

    fn check_next(&self, candle: &Candle) -> Result<()> {
        let ts = candle.timestamp;
        if !candle.is_aligned() {
            return Err(CoreError::Misaligned {
                symbol: self.symbol.clone(),
                timestamp: ts,
            });
        }
        let Some(cursor) = self.cursor() else {
            return Ok(());
        };
        if ts <= cursor {
            return Err(CoreError::NonMonotonic {
                symbol: self.symbol.clone(),
                cursor,
                candle: ts,
            });
        }
        let expected = cursor + base_step();
        if ts != expected {
            return Err(CoreError::Gap {
                symbol: self.symbol.clone(),
                expected,
                got: ts,
            });
        }
        Ok(())
    }

    /// Rebuilds one scheme's table in range order: stale records drop out,
    /// the candle extends records containing it and widens the watermark of
    /// records that ended before it.
    fn roll_liquidity(
        &mut self,
        scheme: Scheme,
        ranges: &[BucketRange],
        candle: &Candle,
        now: DateTime<Utc>,
    ) {
        let ts = candle.timestamp;
        let table = &mut self.liquidity[scheme.index()];
        let mut kept = Vec::with_capacity(ranges.len());
        for r in ranges {
            let existing = table
                .iter()
                .position(|l| l.start == r.start && l.end == r.end)
                .map(|i| table.swap_remove(i));
            let entry = match existing {
                Some(mut liq) => {
                    liq.bucket = r.bucket;
                    if r.contains(ts) {
                        liq.extend(candle);
                    } else if ts >= r.end {
                        liq.observe(candle);
                    }
                    Some(liq)
                }
                None if r.contains(ts) => Some(BoundaryLiquidity::open(r, candle, now)),
                None => None,
            };
            if let Some(mut liq) = entry {
                liq.refresh(now);
                kept.push(liq);
            }
        }
        *table = kept;
    }

    fn stamp_true_open(&mut self, scheme: Scheme, sr: &SchemeRanges, candle: &Candle) {
        let slot = &mut self.true_opens[scheme.index()];
        if candle.timestamp == sr.true_open {
            *slot = Some(TrueOpen::from_candle(scheme, candle));
        } else if slot.is_some_and(|t| t.timestamp != sr.true_open) {
            *slot = None;
        }
    }

    // ── Backward ───────────────────────────────────────────────────────

    /// Rebuilds state from a strictly descending feed whose first item is the
    /// live candle. Reads back to the start of the previous trading year.
    ///
    /// A running high/low of everything newer than the candle being read seeds
    /// each closed bucket's sweep watermark, so the result equals forward
    /// advancing over the same history.
    pub fn reconstruct<I>(symbol: impl Into<String>, reverse_feed: I) -> Result<Self>
    where
        I: IntoIterator<Item = Candle>,
    {
        let symbol = symbol.into();
        let mut feed = reverse_feed.into_iter();
        let latest = feed.next().ok_or_else(|| CoreError::EmptyFeed {
            symbol: symbol.clone(),
        })?;
        let now = latest.timestamp + base_step();
        let horizon = calendar::previous_year_start(now);
        let scheme_ranges: Vec<SchemeRanges> =
            Scheme::ALL.iter().map(|s| calendar::ranges(*s, now)).collect();

        let mut slots: Vec<Vec<Option<BoundaryLiquidity>>> = scheme_ranges
            .iter()
            .map(|sr| vec![None; sr.ranges.len()])
            .collect();
        let mut newer: Option<Extremes> = None;
        let mut read: Vec<Candle> = Vec::new();
        let mut next_log = latest.timestamp - Duration::days(PROGRESS_DAYS);
        let mut pending = Some(latest);

        loop {
            let candle = match pending.take() {
                Some(c) => c,
                None => feed.next().ok_or_else(|| CoreError::FeedExhausted {
                    symbol: symbol.clone(),
                    served: read.len(),
                })?,
            };
            check_previous(&symbol, read.last(), &candle)?;

            for (sr, table) in scheme_ranges.iter().zip(slots.iter_mut()) {
                for (r, slot) in sr.ranges.iter().zip(table.iter_mut()) {
                    if !r.contains(candle.timestamp) {
                        continue;
                    }
                    match slot {
                        Some(liq) => liq.extend_back(&candle),
                        None => *slot = Some(BoundaryLiquidity::seeded(r, &candle, newer, now)),
                    }
                }
            }
            newer = Some(Extremes::widened(newer, &candle));

            if candle.timestamp <= next_log {
                debug!(symbol = %symbol, reached = %candle.minute_label(), "reconstructing");
                next_log -= Duration::days(PROGRESS_DAYS);
            }

            let done = candle.timestamp <= horizon;
            read.push(candle);
            if done {
                break;
            }
        }

        read.reverse();
        let start = read.partition_point(|c| c.timestamp < horizon);
        let candles = CandleBuffer::from_ascending(read.split_off(start));

        let mut liquidity: [Vec<BoundaryLiquidity>; SCHEMES] = Default::default();
        let mut true_opens = [None; SCHEMES];
        for (i, (sr, table)) in scheme_ranges.iter().zip(slots).enumerate() {
            liquidity[i] = table
                .into_iter()
                .flatten()
                .map(|mut liq| {
                    liq.refresh(now);
                    liq
                })
                .collect();
            true_opens[i] = candles
                .range(sr.true_open, sr.true_open + base_step())
                .first()
                .map(|c| TrueOpen::from_candle(Scheme::ALL[i], c));
        }
        let aggregates = Aggregates::rebuild(candles.as_slice());

        debug!(symbol = %symbol, candles = candles.len(), "reconstructed");
        Ok(Self {
            symbol,
            candles,
            liquidity,
            true_opens,
            aggregates,
        })
    }
}

/// Checks that `candle` directly precedes `newer` in a descending feed.
fn check_previous(symbol: &str, newer: Option<&Candle>, candle: &Candle) -> Result<()> {
    if !candle.is_aligned() {
        return Err(CoreError::Misaligned {
            symbol: symbol.to_string(),
            timestamp: candle.timestamp,
        });
    }
    let Some(newer) = newer else {
        return Ok(());
    };
    if candle.timestamp >= newer.timestamp {
        return Err(CoreError::NonMonotonic {
            symbol: symbol.to_string(),
            cursor: newer.timestamp,
            candle: candle.timestamp,
        });
    }
    let expected = newer.timestamp - base_step();
    if candle.timestamp != expected {
        return Err(CoreError::Gap {
            symbol: symbol.to_string(),
            expected,
            got: candle.timestamp,
        });
    }
    Ok(())
}
