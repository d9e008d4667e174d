//! Boundary calendar: pure mapping from an instant to the nested time partitions.
//!
//! Every partition is anchored to New York trading days: trading day `D` runs
//! from `D-1 18:00` to `D 18:00` local time. Day quarters and 90 minute quarters
//! follow New York wall clock, so they stretch or shrink across DST switches.
//!
//! `ranges(scheme, now)` lists exactly the buckets an instrument keeps at `now`.
//! Rollover and invalidation of stale buckets is expressed here once, instead of
//! per scheme inside the instrument state.

pub mod buckets;
pub mod resolution;

pub use buckets::{Bucket, DayQuarter, MonthWeek, Quarter90m, Scheme, Weekday, YearQuarter, YearSlot};
pub use resolution::Resolution;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::America::New_York;
use serde::{Deserialize, Serialize};

const MINUTES_PER_DAY_QUARTER: i64 = 360;
const MINUTES_PER_90M: i64 = 90;
/// Trading day starts this many minutes before local midnight.
const DAY_START_OFFSET: i64 = -360;

// ── Trading-day helpers ────────────────────────────────────────────

/// New York wall-clock time of an instant.
pub fn local(ts: DateTime<Utc>) -> NaiveDateTime {
    ts.with_timezone(&New_York).naive_local()
}

/// Trading date an instant belongs to.
pub fn trading_date(ts: DateTime<Utc>) -> NaiveDate {
    (local(ts) + Duration::hours(6)).date()
}

/// Converts New York wall-clock time to UTC. Ambiguous times resolve to the
/// earlier instant; skipped times (spring forward) move one hour later.
pub fn ny_to_utc(naive: NaiveDateTime) -> DateTime<Utc> {
    New_York
        .from_local_datetime(&naive)
        .earliest()
        .or_else(|| {
            New_York
                .from_local_datetime(&(naive + Duration::hours(1)))
                .earliest()
        })
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
}

/// Instant at which trading day `date` starts (previous day 18:00 New York).
pub fn trading_day_start(date: NaiveDate) -> DateTime<Utc> {
    ny_to_utc(local_at(date, DAY_START_OFFSET))
}

/// Start of the trading year `now` belongs to, minus one year.
pub fn previous_year_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let year = trading_date(now).year();
    trading_day_start(first_of_month(year - 1, 1))
}

pub(crate) fn local_at(date: NaiveDate, minutes: i64) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN) + Duration::minutes(minutes)
}

pub(crate) fn days_since_monday(date: NaiveDate) -> u32 {
    date.weekday().num_days_from_monday()
}

pub(crate) fn monday_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(days_since_monday(date)))
}

/// First day of `month` in `year`; months outside 1..=12 roll over years.
pub(crate) fn first_of_month(year: i32, month: i32) -> NaiveDate {
    let y = year + (month - 1).div_euclid(12);
    let m = (month - 1).rem_euclid(12) + 1;
    // Day 1 of a month in 1..=12 always exists for years chrono can represent.
    let date = NaiveDate::from_ymd_opt(y, m as u32, 1);
    debug_assert!(date.is_some(), "first_of_month({year}, {month}) out of range");
    date.unwrap_or(NaiveDate::MIN)
}

fn day_quarter_start(date: NaiveDate, quarter: i64) -> DateTime<Utc> {
    ny_to_utc(local_at(date, DAY_START_OFFSET + quarter * MINUTES_PER_DAY_QUARTER))
}

fn slice_90m_start(date: NaiveDate, quarter: i64, slice: i64) -> DateTime<Utc> {
    ny_to_utc(local_at(
        date,
        DAY_START_OFFSET + quarter * MINUTES_PER_DAY_QUARTER + slice * MINUTES_PER_90M,
    ))
}

/// Locates `ts` inside its trading day: (date, day quarter 0..4, 90m slice 0..4).
///
/// Indices come from comparing against converted boundary instants, so a
/// bucket's classification always agrees with its range.
fn locate(ts: DateTime<Utc>) -> (NaiveDate, i64, i64) {
    let date = trading_date(ts);
    let quarter = (0..4)
        .rev()
        .find(|&k| day_quarter_start(date, k) <= ts)
        .unwrap_or(0);
    let slice = (0..4)
        .rev()
        .find(|&j| slice_90m_start(date, quarter, j) <= ts)
        .unwrap_or(0);
    (date, quarter, slice)
}

// ── Classification ─────────────────────────────────────────────────

/// Bucket of every scheme an instant falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub year_quarter: YearQuarter,
    pub month_week: MonthWeek,
    pub weekday: Weekday,
    pub day_quarter: DayQuarter,
    pub quarter_90m: Quarter90m,
}

pub fn classify(ts: DateTime<Utc>) -> Classification {
    let (date, quarter, slice) = locate(ts);
    let monday = monday_of(date);
    Classification {
        year_quarter: YearQuarter::of_month(date.month()),
        month_week: MonthWeek::of_monday(monday.day()),
        weekday: Weekday::from_days_since_monday(days_since_monday(date)),
        day_quarter: DayQuarter::ALL[quarter as usize],
        quarter_90m: Quarter90m::ALL[slice as usize],
    }
}

// ── Ranges ─────────────────────────────────────────────────────────

/// One bucket instance: `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketRange {
    pub bucket: Bucket,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl BucketRange {
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start <= ts && ts < self.end
    }
}

/// Buckets retained for one scheme at an instant, plus the instant at which the
/// scheme's true open is taken for the current occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemeRanges {
    pub ranges: Vec<BucketRange>,
    pub true_open: DateTime<Utc>,
}

/// Retained buckets of `scheme` at snapshot instant `now`, oldest first.
pub fn ranges(scheme: Scheme, now: DateTime<Utc>) -> SchemeRanges {
    match scheme {
        Scheme::Year => year_ranges(now),
        Scheme::YearQuarter => year_quarter_ranges(now),
        Scheme::MonthWeek => month_week_ranges(now),
        Scheme::Weekday => weekday_ranges(now),
        Scheme::DayQuarter => day_quarter_ranges(now),
        Scheme::Quarter90m => quarter_90m_ranges(now),
    }
}

fn range(bucket: Bucket, start: DateTime<Utc>, end: DateTime<Utc>) -> BucketRange {
    BucketRange { bucket, start, end }
}

fn year_ranges(now: DateTime<Utc>) -> SchemeRanges {
    let year = trading_date(now).year();
    let start = |y: i32| trading_day_start(first_of_month(y, 1));
    SchemeRanges {
        ranges: vec![
            range(Bucket::Year(YearSlot::Previous), start(year - 1), start(year)),
            range(Bucket::Year(YearSlot::Current), start(year), start(year + 1)),
        ],
        true_open: trading_day_start(first_of_month(year, 4)),
    }
}

fn year_quarter_ranges(now: DateTime<Utc>) -> SchemeRanges {
    let date = trading_date(now);
    let year = date.year();
    let current = YearQuarter::of_month(date.month());
    let quarter_start = |y: i32, q: u32| trading_day_start(first_of_month(y, q as i32 * 3 - 2));

    let mut out = Vec::with_capacity(5);
    if current == YearQuarter::Q1 {
        out.push(range(
            Bucket::YearQuarter(YearQuarter::Q4),
            quarter_start(year - 1, 4),
            quarter_start(year, 1),
        ));
    }
    for q in YearQuarter::ALL.iter().take(current.ordinal() as usize) {
        out.push(range(
            Bucket::YearQuarter(*q),
            quarter_start(year, q.ordinal()),
            quarter_start(year, q.ordinal() + 1),
        ));
    }
    SchemeRanges {
        ranges: out,
        true_open: trading_day_start(first_of_month(year, current.first_month() as i32 + 1)),
    }
}

fn month_week_ranges(now: DateTime<Utc>) -> SchemeRanges {
    let monday = monday_of(trading_date(now));
    let current = MonthWeek::of_monday(monday.day());
    let first_monday = monday - Duration::days(7 * i64::from(current.ordinal() - 1));

    let mut out = Vec::with_capacity(6);
    if current == MonthWeek::W1 {
        let prev_monday = first_monday - Duration::days(7);
        out.push(range(
            Bucket::MonthWeek(MonthWeek::of_monday(prev_monday.day())),
            trading_day_start(prev_monday),
            trading_day_start(first_monday),
        ));
    }
    for (i, week) in MonthWeek::ALL.iter().take(current.ordinal() as usize).enumerate() {
        let m = first_monday + Duration::days(7 * i as i64);
        out.push(range(
            Bucket::MonthWeek(*week),
            trading_day_start(m),
            trading_day_start(m + Duration::days(7)),
        ));
    }
    SchemeRanges {
        ranges: out,
        true_open: trading_day_start(first_monday + Duration::days(7)),
    }
}

fn weekday_ranges(now: DateTime<Utc>) -> SchemeRanges {
    let date = trading_date(now);
    let monday = monday_of(date);
    let today = days_since_monday(date);
    let day = |offset: i64| trading_day_start(monday + Duration::days(offset));
    let single = |offset: u32| {
        let o = i64::from(offset);
        range(
            Bucket::Weekday(Weekday::from_days_since_monday(offset)),
            day(o),
            day(o + 1),
        )
    };

    let mut out: Vec<BucketRange> = match today {
        0 => vec![
            range(Bucket::Weekday(Weekday::Thu), day(-4), day(-3)),
            range(Bucket::Weekday(Weekday::Fri), day(-3), day(-2)),
            single(0),
        ],
        1..=4 => (0..=today).map(single).collect(),
        _ => (3..=5).map(single).collect(),
    };
    out.push(range(Bucket::Weekday(Weekday::MonThu), day(0), day(4)));
    out.push(range(Bucket::Weekday(Weekday::MonFri), day(0), day(5)));
    SchemeRanges {
        ranges: out,
        true_open: day(1),
    }
}

fn day_quarter_ranges(now: DateTime<Utc>) -> SchemeRanges {
    let (date, current, _) = locate(now);
    let mut out = Vec::with_capacity(5);
    if current == 0 {
        out.push(range(
            Bucket::DayQuarter(DayQuarter::NyPm),
            ny_to_utc(local_at(date, DAY_START_OFFSET - MINUTES_PER_DAY_QUARTER)),
            day_quarter_start(date, 0),
        ));
    }
    for k in 0..=current {
        out.push(range(
            Bucket::DayQuarter(DayQuarter::ALL[k as usize]),
            day_quarter_start(date, k),
            day_quarter_start(date, k + 1),
        ));
    }
    SchemeRanges {
        ranges: out,
        true_open: day_quarter_start(date, 1),
    }
}

fn quarter_90m_ranges(now: DateTime<Utc>) -> SchemeRanges {
    let (date, quarter, current) = locate(now);
    let mut out = Vec::with_capacity(5);
    if current == 0 {
        out.push(range(
            Bucket::Quarter90m(Quarter90m::Q4),
            slice_90m_start(date, quarter, -1),
            slice_90m_start(date, quarter, 0),
        ));
    }
    for j in 0..=current {
        out.push(range(
            Bucket::Quarter90m(Quarter90m::ALL[j as usize]),
            slice_90m_start(date, quarter, j),
            slice_90m_start(date, quarter, j + 1),
        ));
    }
    SchemeRanges {
        ranges: out,
        true_open: slice_90m_start(date, quarter, 1),
    }
}
