//! Every divergence of one tick, with its PSPs.

use super::{periods_for, Smt, SmtKey, Triad};
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// All SMTs of one tick, ordered by key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Triad `now` the snapshot was taken at.
    pub at: Option<DateTime<Utc>>,
    smts: Vec<Smt>,
}

impl Snapshot {
    pub fn new(at: Option<DateTime<Utc>>, mut smts: Vec<Smt>) -> Self {
        smts.sort_by_key(|s| s.key);
        smts.dedup_by_key(|s| s.key);
        Self { at, smts }
    }

    pub fn get(&self, key: &SmtKey) -> Option<&Smt> {
        self.smts
            .binary_search_by_key(key, |s| s.key)
            .ok()
            .map(|i| &self.smts[i])
    }

    pub fn contains(&self, key: &SmtKey) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.smts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.smts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Smt> {
        self.smts.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = SmtKey> + '_ {
        self.smts.iter().map(|s| s.key)
    }

    /// Stable JSON rendering; equal snapshots give equal strings.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Triad {
    /// SMTs at every outstanding boundary, each with PSPs for the periods of
    /// its scale.
    pub fn snapshot(&self) -> Snapshot {
        let mut smts = Vec::new();
        for boundary in self.outstanding_boundaries() {
            for mut smt in self.detect_smt(&boundary) {
                for &period in periods_for(boundary.id.bucket.scheme()) {
                    smt.psps.insert(period, self.detect_psp(&smt, period));
                }
                smts.push(smt);
            }
        }
        Snapshot::new(self.now(), smts)
    }
}
