use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{ProcessingError, Result};

pub const ALL_PERIOD_KEY: &str = "all";

/// Built-in hour-of-day bands: (key, description, hours)
const BUILTIN_PERIODS: [(&str, &str, &[u8]); 7] = [
    (
        ALL_PERIOD_KEY,
        "All hours (00:00-23:00)",
        &[
            0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23,
        ],
    ),
    ("dawn", "Dawn (05:00-07:00)", &[5, 6]),
    ("morning_peak", "Morning peak (07:00-09:00)", &[7, 8]),
    ("noon", "Noon (12:00-14:00)", &[12, 13]),
    ("evening_peak", "Evening peak (17:00-19:00)", &[17, 18]),
    ("night", "Night (20:00-22:00)", &[20, 21]),
    ("midnight", "Late night (22:00-05:00)", &[22, 23, 0, 1, 2, 3, 4]),
];

/// A named set of hours of the day. `all` is the identity period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiurnalPeriod {
    pub key: String,
    pub name: String,
    hours: [bool; 24],
}

impl DiurnalPeriod {
    pub fn all() -> Self {
        // The first built-in entry is always the full day
        let (key, name, hours) = BUILTIN_PERIODS[0];
        Self::from_parts(key, name, hours)
    }

    pub fn builtin(key: &str) -> Option<Self> {
        BUILTIN_PERIODS
            .iter()
            .find(|(k, _, _)| *k == key)
            .map(|(k, name, hours)| Self::from_parts(k, name, hours))
    }

    pub fn builtin_keys() -> impl Iterator<Item = &'static str> {
        BUILTIN_PERIODS.iter().map(|(k, _, _)| *k)
    }

    /// Build a caller-defined period; hours must lie in 0..=23.
    pub fn custom(key: impl Into<String>, hours: &[u8]) -> Result<Self> {
        let key = key.into();
        if key.is_empty() {
            return Err(ProcessingError::Config(
                "Diurnal period key must not be empty".to_string(),
            ));
        }
        if hours.is_empty() {
            return Err(ProcessingError::Config(format!(
                "Diurnal period '{}' has no hours",
                key
            )));
        }
        if let Some(bad) = hours.iter().find(|h| **h > 23) {
            return Err(ProcessingError::Config(format!(
                "Hour of day must be between 0 and 23, got: {}",
                bad
            )));
        }
        let name = key.clone();
        Ok(Self::from_parts(&key, &name, hours))
    }

    fn from_parts(key: &str, name: &str, hours: &[u8]) -> Self {
        let mut mask = [false; 24];
        for &h in hours {
            mask[h as usize] = true;
        }
        Self {
            key: key.to_string(),
            name: name.to_string(),
            hours: mask,
        }
    }

    pub fn is_all(&self) -> bool {
        self.hours.iter().all(|h| *h)
    }

    pub fn contains_hour(&self, hour: u8) -> bool {
        self.hours.get(hour as usize).copied().unwrap_or(false)
    }

    pub fn hours(&self) -> Vec<u8> {
        (0u8..24).filter(|h| self.contains_hour(*h)).collect()
    }
}

impl FromStr for DiurnalPeriod {
    type Err = ProcessingError;

    fn from_str(s: &str) -> Result<Self> {
        DiurnalPeriod::builtin(s.trim())
            .ok_or_else(|| ProcessingError::Config(format!("Unknown diurnal period: '{}'", s)))
    }
}
