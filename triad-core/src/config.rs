//! Run configuration, loaded from TOML.
//!
//! ```toml
//! symbols = ["BTCUSDT", "ETHUSDT", "SOLUSDT"]
//!
//! [replay]
//! start = "2024-01-01 00:00"
//! stop = "2024-02-01 00:00"
//!
//! [data]
//! dir = "data"
//! ```

use crate::domain::{on_grid, BASE_RESOLUTION_MINUTES};
use crate::error::{CoreError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The three instruments, the replay window and where candles live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriadConfig {
    pub symbols: [String; 3],
    pub replay: ReplayConfig,
    #[serde(default)]
    pub data: DataConfig,
}

/// Replay window in UTC minutes (`"%Y-%m-%d %H:%M"`). The triad is
/// reconstructed at the candle before `start`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReplayConfig {
    #[serde(with = "minute")]
    pub start: DateTime<Utc>,
    #[serde(with = "minute")]
    pub stop: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    /// Directory of `<SYMBOL>.csv` candle files.
    pub dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data"),
        }
    }
}

impl DataConfig {
    pub fn csv_path(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}.csv"))
    }
}

impl TriadConfig {
    /// Parses and validates.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| CoreError::Config(format!("parse TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CoreError::Config(format!("read {}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        let [a, b, c] = &self.symbols;
        if a.is_empty() || b.is_empty() || c.is_empty() {
            return Err(CoreError::Config("symbols must not be empty".into()));
        }
        if a == b || b == c || a == c {
            return Err(CoreError::Config(format!("symbols must be distinct: {a}, {b}, {c}")));
        }
        let ReplayConfig { start, stop } = self.replay;
        if start >= stop {
            return Err(CoreError::Config(format!(
                "replay start {start} must be before stop {stop}"
            )));
        }
        for ts in [start, stop] {
            if !on_grid(ts) {
                return Err(CoreError::Config(format!(
                    "{ts} is not on the {BASE_RESOLUTION_MINUTES}m grid"
                )));
            }
        }
        Ok(())
    }

    pub fn symbols(&self) -> [&str; 3] {
        let [a, b, c] = &self.symbols;
        [a.as_str(), b.as_str(), c.as_str()]
    }
}

mod minute {
    use crate::domain::{Candle, MINUTE_FORMAT};
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&ts.format(MINUTE_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        Candle::parse_minute(&raw).ok_or_else(|| {
            <D::Error as serde::de::Error>::custom(format!("expected \"YYYY-MM-DD HH:MM\", got {raw:?}"))
        })
    }
}
