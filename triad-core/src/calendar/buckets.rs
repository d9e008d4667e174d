//! Boundary schemes and their bucket tags.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the nested time partitions tracked per instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Scheme {
    Year,
    YearQuarter,
    MonthWeek,
    Weekday,
    DayQuarter,
    Quarter90m,
}

impl Scheme {
    pub const ALL: [Scheme; 6] = [
        Scheme::Year,
        Scheme::YearQuarter,
        Scheme::MonthWeek,
        Scheme::Weekday,
        Scheme::DayQuarter,
        Scheme::Quarter90m,
    ];

    /// Position in fixed per-scheme tables.
    pub fn index(self) -> usize {
        match self {
            Scheme::Year => 0,
            Scheme::YearQuarter => 1,
            Scheme::MonthWeek => 2,
            Scheme::Weekday => 3,
            Scheme::DayQuarter => 4,
            Scheme::Quarter90m => 5,
        }
    }

    /// Advisory priority handed to strategies. Finer scales rank higher.
    pub fn priority(self) -> u8 {
        match self {
            Scheme::Year => 1,
            Scheme::YearQuarter => 2,
            Scheme::MonthWeek => 3,
            Scheme::Weekday => 4,
            Scheme::DayQuarter => 5,
            Scheme::Quarter90m => 6,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Scheme::Year => "year",
            Scheme::YearQuarter => "year quarter",
            Scheme::MonthWeek => "month week",
            Scheme::Weekday => "weekday",
            Scheme::DayQuarter => "day quarter",
            Scheme::Quarter90m => "90m quarter",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum YearSlot {
    Previous,
    Current,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum YearQuarter {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl YearQuarter {
    pub const ALL: [YearQuarter; 4] = [
        YearQuarter::Q1,
        YearQuarter::Q2,
        YearQuarter::Q3,
        YearQuarter::Q4,
    ];

    /// Quarter of a calendar month (1..=12).
    pub fn of_month(month: u32) -> Self {
        Self::ALL[((month.clamp(1, 12) - 1) / 3) as usize]
    }

    /// First calendar month of the quarter.
    pub fn first_month(self) -> u32 {
        self.ordinal() * 3 - 2
    }

    pub fn ordinal(self) -> u32 {
        match self {
            YearQuarter::Q1 => 1,
            YearQuarter::Q2 => 2,
            YearQuarter::Q3 => 3,
            YearQuarter::Q4 => 4,
        }
    }
}

/// Trading week of a month, numbered by its Monday. `W5` is the joker week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MonthWeek {
    W1,
    W2,
    W3,
    W4,
    W5,
}

impl MonthWeek {
    pub const ALL: [MonthWeek; 5] = [
        MonthWeek::W1,
        MonthWeek::W2,
        MonthWeek::W3,
        MonthWeek::W4,
        MonthWeek::W5,
    ];

    /// Week holding a Monday on day-of-month `day` (1..=31).
    pub fn of_monday(day: u32) -> Self {
        Self::ALL[((day.clamp(1, 31) - 1) / 7) as usize]
    }

    pub fn ordinal(self) -> u32 {
        match self {
            MonthWeek::W1 => 1,
            MonthWeek::W2 => 2,
            MonthWeek::W3 => 3,
            MonthWeek::W4 => 4,
            MonthWeek::W5 => 5,
        }
    }
}

/// Trading weekday. `MonThu` and `MonFri` are composite buckets that only
/// appear in weekday ranges; `Sun` is classified but never tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Weekday {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
    MonThu,
    MonFri,
}

impl Weekday {
    /// Plain weekday from days since Monday (0..=6).
    pub fn from_days_since_monday(days: u32) -> Self {
        match days {
            0 => Weekday::Mon,
            1 => Weekday::Tue,
            2 => Weekday::Wed,
            3 => Weekday::Thu,
            4 => Weekday::Fri,
            5 => Weekday::Sat,
            _ => Weekday::Sun,
        }
    }

    /// Inclusive day span since Monday covered by the bucket.
    pub fn day_span(self) -> (u32, u32) {
        match self {
            Weekday::Mon => (0, 0),
            Weekday::Tue => (1, 1),
            Weekday::Wed => (2, 2),
            Weekday::Thu => (3, 3),
            Weekday::Fri => (4, 4),
            Weekday::Sat => (5, 5),
            Weekday::Sun => (6, 6),
            Weekday::MonThu => (0, 3),
            Weekday::MonFri => (0, 4),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DayQuarter {
    /// 18:00 to 00:00 New York.
    Asia,
    /// 00:00 to 06:00 New York.
    London,
    /// 06:00 to 12:00 New York.
    NyAm,
    /// 12:00 to 18:00 New York.
    NyPm,
}

impl DayQuarter {
    pub const ALL: [DayQuarter; 4] = [
        DayQuarter::Asia,
        DayQuarter::London,
        DayQuarter::NyAm,
        DayQuarter::NyPm,
    ];

    pub fn index(self) -> usize {
        match self {
            DayQuarter::Asia => 0,
            DayQuarter::London => 1,
            DayQuarter::NyAm => 2,
            DayQuarter::NyPm => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Quarter90m {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl Quarter90m {
    pub const ALL: [Quarter90m; 4] = [Quarter90m::Q1, Quarter90m::Q2, Quarter90m::Q3, Quarter90m::Q4];

    pub fn index(self) -> usize {
        match self {
            Quarter90m::Q1 => 0,
            Quarter90m::Q2 => 1,
            Quarter90m::Q3 => 2,
            Quarter90m::Q4 => 3,
        }
    }
}

/// A bucket tag, scoped by its scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Bucket {
    Year(YearSlot),
    YearQuarter(YearQuarter),
    MonthWeek(MonthWeek),
    Weekday(Weekday),
    DayQuarter(DayQuarter),
    Quarter90m(Quarter90m),
}

impl Bucket {
    pub fn scheme(self) -> Scheme {
        match self {
            Bucket::Year(_) => Scheme::Year,
            Bucket::YearQuarter(_) => Scheme::YearQuarter,
            Bucket::MonthWeek(_) => Scheme::MonthWeek,
            Bucket::Weekday(_) => Scheme::Weekday,
            Bucket::DayQuarter(_) => Scheme::DayQuarter,
            Bucket::Quarter90m(_) => Scheme::Quarter90m,
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bucket::Year(YearSlot::Previous) => write!(f, "previous year"),
            Bucket::Year(YearSlot::Current) => write!(f, "current year"),
            Bucket::YearQuarter(q) => write!(f, "year quarter {}", q.ordinal()),
            Bucket::MonthWeek(w) => write!(f, "month week {}", w.ordinal()),
            Bucket::Weekday(Weekday::MonThu) => write!(f, "mon-thu"),
            Bucket::Weekday(Weekday::MonFri) => write!(f, "mon-fri"),
            Bucket::Weekday(d) => write!(f, "{}", format!("{d:?}").to_lowercase()),
            Bucket::DayQuarter(DayQuarter::Asia) => write!(f, "asia"),
            Bucket::DayQuarter(DayQuarter::London) => write!(f, "london"),
            Bucket::DayQuarter(DayQuarter::NyAm) => write!(f, "ny am"),
            Bucket::DayQuarter(DayQuarter::NyPm) => write!(f, "ny pm"),
            Bucket::Quarter90m(q) => write!(f, "90m q{}", q.index() + 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_indices_are_dense() {
        for (i, scheme) in Scheme::ALL.iter().enumerate() {
            assert_eq!(scheme.index(), i);
        }
    }

    #[test]
    fn quarter_of_month() {
        assert_eq!(YearQuarter::of_month(1), YearQuarter::Q1);
        assert_eq!(YearQuarter::of_month(6), YearQuarter::Q2);
        assert_eq!(YearQuarter::of_month(7), YearQuarter::Q3);
        assert_eq!(YearQuarter::of_month(12), YearQuarter::Q4);
        assert_eq!(YearQuarter::Q3.first_month(), 7);
    }

    #[test]
    fn week_of_monday() {
        assert_eq!(MonthWeek::of_monday(1), MonthWeek::W1);
        assert_eq!(MonthWeek::of_monday(7), MonthWeek::W1);
        assert_eq!(MonthWeek::of_monday(8), MonthWeek::W2);
        assert_eq!(MonthWeek::of_monday(29), MonthWeek::W5);
    }

    #[test]
    fn bucket_labels() {
        assert_eq!(Bucket::Weekday(Weekday::Tue).to_string(), "tue");
        assert_eq!(Bucket::Weekday(Weekday::MonFri).to_string(), "mon-fri");
        assert_eq!(Bucket::DayQuarter(DayQuarter::NyAm).to_string(), "ny am");
        assert_eq!(Bucket::Year(YearSlot::Previous).to_string(), "previous year");
    }
}
