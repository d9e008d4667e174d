//! What changed between two consecutive ticks.
//!
//! Every function here is pure: it compares two snapshots (or two target
//! lists) by value key and never looks at the triad itself.

use crate::calendar::Resolution;
use crate::domain::Candle;
use crate::triad::{Psp, Smt, SmtKey, Snapshot, Target};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// SMTs present in `new` but not in `old`.
pub fn new_signals(old: &Snapshot, new: &Snapshot) -> Vec<Smt> {
    new.iter().filter(|s| !old.contains(&s.key)).cloned().collect()
}

/// SMTs present in `old` but gone from `new`.
pub fn cancelled_signals(old: &Snapshot, new: &Snapshot) -> Vec<Smt> {
    old.iter().filter(|s| !new.contains(&s.key)).cloned().collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PspChangeKind {
    Possible,
    Closed,
    Confirmed,
    Swept,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PspChange {
    pub key: SmtKey,
    pub period: Resolution,
    /// Position of the PSP in its period list.
    pub index: usize,
    pub kind: PspChangeKind,
    pub psp: Psp,
}

/// First-time PSP state changes, comparing each (SMT, period) list
/// positionally. PSPs already swept in `old` are skipped.
pub fn psp_transitions(old: &Snapshot, new: &Snapshot) -> Vec<PspChange> {
    let mut out = Vec::new();
    for smt in new.iter() {
        let before = old.get(&smt.key);
        for (&period, psps) in &smt.psps {
            let old_list = before.and_then(|s| s.psps.get(&period));
            for (index, psp) in psps.iter().enumerate() {
                let prev = old_list.and_then(|l| l.get(index));
                let (was_closed, was_confirmed) = match prev {
                    Some(p) if p.swept.is_some() => continue,
                    Some(p) => (p.closed, p.confirmed),
                    None => (false, false),
                };
                let mut push = |kind| {
                    out.push(PspChange {
                        key: smt.key,
                        period,
                        index,
                        kind,
                        psp: psp.clone(),
                    })
                };
                if prev.is_none() && psp.swept.is_none() {
                    push(PspChangeKind::Possible);
                }
                if psp.closed && !was_closed {
                    push(PspChangeKind::Closed);
                }
                if psp.confirmed && !was_confirmed {
                    push(PspChangeKind::Confirmed);
                }
                if psp.swept.is_some() {
                    push(PspChangeKind::Swept);
                }
            }
        }
    }
    out
}

/// A previous target one instrument traded through on the last candle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReachedTarget {
    pub target: Target,
    /// Index of the reaching instrument.
    pub asset: usize,
    pub price: f64,
}

/// Old targets that vanished this tick, one entry per instrument whose last
/// candle straddles the level strictly.
pub fn targets_reached(last: &[Candle; 3], old: &[Target], new: &[Target]) -> Vec<ReachedTarget> {
    let still: HashSet<_> = new.iter().map(Target::key).collect();
    let mut out = Vec::new();
    for target in old.iter().filter(|t| !still.contains(&t.key())) {
        for (asset, candle) in last.iter().enumerate() {
            let price = target.levels[asset].price;
            if candle.low < price && price < candle.high {
                out.push(ReachedTarget {
                    target: target.clone(),
                    asset,
                    price,
                });
            }
        }
    }
    out
}

/// Targets present now that were not there last tick.
pub fn targets_appeared(old: &[Target], new: &[Target]) -> Vec<Target> {
    let before: HashSet<_> = old.iter().map(Target::key).collect();
    new.iter().filter(|t| !before.contains(&t.key())).cloned().collect()
}

/// Divergence changes of one tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DivergenceDiff {
    pub new_signals: Vec<Smt>,
    pub cancelled: Vec<Smt>,
    pub psp_changes: Vec<PspChange>,
}

impl DivergenceDiff {
    pub fn between(old: &Snapshot, new: &Snapshot) -> Self {
        Self {
            new_signals: new_signals(old, new),
            cancelled: cancelled_signals(old, new),
            psp_changes: psp_transitions(old, new),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.new_signals.is_empty() && self.cancelled.is_empty() && self.psp_changes.is_empty()
    }
}

/// Target changes of one tick, long and short side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetDiff {
    pub long_reached: Vec<ReachedTarget>,
    pub short_reached: Vec<ReachedTarget>,
    pub long_appeared: Vec<Target>,
    pub short_appeared: Vec<Target>,
}

impl TargetDiff {
    pub fn between(
        last: &[Candle; 3],
        (old_long, old_short): (&[Target], &[Target]),
        (new_long, new_short): (&[Target], &[Target]),
    ) -> Self {
        Self {
            long_reached: targets_reached(last, old_long, new_long),
            short_reached: targets_reached(last, old_short, new_short),
            long_appeared: targets_appeared(old_long, new_long),
            short_appeared: targets_appeared(old_short, new_short),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.long_reached.is_empty()
            && self.short_reached.is_empty()
            && self.long_appeared.is_empty()
            && self.short_appeared.is_empty()
    }
}
