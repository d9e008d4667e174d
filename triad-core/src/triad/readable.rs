//! Plain-text rendering of one tick for terminals and notifications.

use super::{Direction, OpenSource, Psp, Smt, Snapshot, Target, Triad, TrueOpens};
use crate::asset::{BoundaryId, LevelTag};
use crate::calendar::local;
use crate::domain::MINUTE_FORMAT;
use std::fmt;

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::High => "high",
            Direction::HalfHigh => "half high",
            Direction::HalfLow => "half low",
            Direction::Low => "low",
        })
    }
}

impl fmt::Display for LevelTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LevelTag::High => "high",
            LevelTag::Half => "half",
            LevelTag::Low => "low",
        })
    }
}

/// `<bucket> <NY start>`, e.g. `asia 2024-03-13 18:00`.
impl fmt::Display for BoundaryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.bucket, local(self.start).format(MINUTE_FORMAT))
    }
}

/// Everything a strategy sees on one tick, rendered as text.
pub struct TickReport<'a> {
    pub triad: &'a Triad,
    pub snapshot: &'a Snapshot,
    pub long_targets: &'a [Target],
    pub short_targets: &'a [Target],
    pub true_opens: &'a TrueOpens,
}

impl<'a> TickReport<'a> {
    pub fn new(
        triad: &'a Triad,
        snapshot: &'a Snapshot,
        long_targets: &'a [Target],
        short_targets: &'a [Target],
        true_opens: &'a TrueOpens,
    ) -> Self {
        Self {
            triad,
            snapshot,
            long_targets,
            short_targets,
            true_opens,
        }
    }
}

fn mark(swept: bool) -> &'static str {
    if swept {
        "x"
    } else {
        "-"
    }
}

fn psp_state(psp: &Psp) -> &'static str {
    if psp.swept.is_some() {
        "swept"
    } else if psp.confirmed {
        "confirmed"
    } else if psp.closed {
        "closed"
    } else {
        "possible"
    }
}

fn write_smt(f: &mut fmt::Formatter<'_>, symbols: [&str; 3], smt: &Smt) -> fmt::Result {
    let swept = smt.swept();
    write!(f, "  [{}] {} {}:", smt.priority, smt.key.boundary, smt.direction)?;
    for k in 0..3 {
        write!(f, " {} {}", symbols[k], mark(swept[k]))?;
    }
    writeln!(
        f,
        " (since {})",
        local(smt.first_appeared).format(MINUTE_FORMAT)
    )?;
    for (period, psps) in &smt.psps {
        if psps.is_empty() {
            continue;
        }
        write!(f, "      {period}:")?;
        for psp in psps {
            write!(
                f,
                " {} {}",
                local(psp.interval.start).format(MINUTE_FORMAT),
                psp_state(psp)
            )?;
        }
        writeln!(f)?;
    }
    Ok(())
}

fn write_targets(
    f: &mut fmt::Formatter<'_>,
    symbols: [&str; 3],
    title: &str,
    targets: &[Target],
) -> fmt::Result {
    writeln!(f, "{title} targets ({})", targets.len())?;
    for t in targets {
        write!(f, "  [{}] {} {}:", t.priority, t.boundary, t.direction)?;
        for k in 0..3 {
            write!(
                f,
                " {} {:.2} ({:+.2}%)",
                symbols[k], t.levels[k].price, t.levels[k].percent
            )?;
        }
        writeln!(f)?;
    }
    Ok(())
}

impl fmt::Display for TickReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbols = self.triad.symbols();
        match self.triad.now() {
            Some(now) => writeln!(f, "Tick {} NY", local(now).format(MINUTE_FORMAT))?,
            None => return writeln!(f, "Tick: no candles"),
        }

        writeln!(f, "SMT ({})", self.snapshot.len())?;
        for smt in self.snapshot.iter() {
            write_smt(f, symbols, smt)?;
        }
        write_targets(f, symbols, "Long", self.long_targets)?;
        write_targets(f, symbols, "Short", self.short_targets)?;

        writeln!(f, "True opens")?;
        for asset in &self.true_opens.assets {
            write!(f, "  {} {:.2}:", asset.symbol, asset.current)?;
            for open in &asset.opens {
                if let OpenSource::TrueOpen(scheme) = open.source {
                    write!(f, " {} {:.2} ({:+.2}%)", scheme.label(), open.price, open.percent)?;
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
