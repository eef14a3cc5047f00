use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{ProcessingError, Result};

/// Temporal aggregation level for bucketing readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeGranularity {
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Seasonal,
    Yearly,
}

impl TimeGranularity {
    pub const ALL: [TimeGranularity; 6] = [
        TimeGranularity::Hourly,
        TimeGranularity::Daily,
        TimeGranularity::Weekly,
        TimeGranularity::Monthly,
        TimeGranularity::Seasonal,
        TimeGranularity::Yearly,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            TimeGranularity::Hourly => "hourly",
            TimeGranularity::Daily => "daily",
            TimeGranularity::Weekly => "weekly",
            TimeGranularity::Monthly => "monthly",
            TimeGranularity::Seasonal => "seasonal",
            TimeGranularity::Yearly => "yearly",
        }
    }
}

impl FromStr for TimeGranularity {
    type Err = ProcessingError;

    fn from_str(s: &str) -> Result<Self> {
        TimeGranularity::ALL
            .iter()
            .copied()
            .find(|g| g.key() == s.trim().to_lowercase())
            .ok_or_else(|| ProcessingError::Config(format!("Unknown time granularity: '{}'", s)))
    }
}

impl std::fmt::Display for TimeGranularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Meteorological season. Ordered by the first calendar month each covers within a year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Autumn,
}

impl Season {
    pub fn from_month(month: u32) -> Self {
        match month {
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            9..=11 => Season::Autumn,
            _ => Season::Winter,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Season::Winter => "Winter",
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Autumn => "Autumn",
        }
    }
}

impl std::fmt::Display for Season {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Grouping key of a time bucket. All keys of one run share a variant, so the
/// derived ordering is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BucketKey {
    Hour(NaiveDateTime),
    Day(NaiveDate),
    Week { iso_year: i32, week: u32 },
    Month { year: i32, month: u32 },
    Season { year: i32, season: Season },
    Year(i32),
}

impl BucketKey {
    pub fn for_timestamp(granularity: TimeGranularity, timestamp: NaiveDateTime) -> Self {
        let date = timestamp.date();
        match granularity {
            TimeGranularity::Hourly => {
                let truncated = date
                    .and_hms_opt(timestamp.hour(), 0, 0)
                    .unwrap_or(timestamp);
                BucketKey::Hour(truncated)
            }
            TimeGranularity::Daily => BucketKey::Day(date),
            TimeGranularity::Weekly => {
                let iso = date.iso_week();
                BucketKey::Week {
                    iso_year: iso.year(),
                    week: iso.week(),
                }
            }
            TimeGranularity::Monthly => BucketKey::Month {
                year: date.year(),
                month: date.month(),
            },
            TimeGranularity::Seasonal => BucketKey::Season {
                year: date.year(),
                season: Season::from_month(date.month()),
            },
            TimeGranularity::Yearly => BucketKey::Year(date.year()),
        }
    }

    pub fn label(&self) -> String {
        match self {
            BucketKey::Hour(t) => t.format("%Y-%m-%d %H:00").to_string(),
            BucketKey::Day(d) => d.format("%Y-%m-%d").to_string(),
            BucketKey::Week { iso_year, week } => format!("{}-W{:02}", iso_year, week),
            BucketKey::Month { year, month } => format!("{}-{:02}", year, month),
            BucketKey::Season { year, season } => format!("{}-{}", year, season),
            BucketKey::Year(y) => y.to_string(),
        }
    }
}

/// Caller-supplied selection of which readings enter the analysis.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TimeWindow {
    #[default]
    All,
    YearMonth {
        years: Vec<i32>,
        months: Vec<u32>,
    },
    DateRange {
        start: NaiveDate,
        end: NaiveDate,
    },
}

impl TimeWindow {
    pub fn validate(&self) -> Result<()> {
        match self {
            TimeWindow::All => Ok(()),
            TimeWindow::YearMonth { years, months } => {
                if years.is_empty() || months.is_empty() {
                    return Err(ProcessingError::Config(
                        "Year/month window needs at least one year and one month".to_string(),
                    ));
                }
                if let Some(bad) = months.iter().find(|m| !(1..=12).contains(*m)) {
                    return Err(ProcessingError::Config(format!(
                        "Month must be between 1 and 12, got: {}",
                        bad
                    )));
                }
                Ok(())
            }
            TimeWindow::DateRange { start, end } => {
                if end < start {
                    return Err(ProcessingError::Config(format!(
                        "End date {} is before start date {}",
                        end, start
                    )));
                }
                Ok(())
            }
        }
    }

    pub fn contains(&self, timestamp: NaiveDateTime) -> bool {
        let date = timestamp.date();
        match self {
            TimeWindow::All => true,
            TimeWindow::YearMonth { years, months } => {
                years.contains(&date.year()) && months.contains(&date.month())
            }
            TimeWindow::DateRange { start, end } => date >= *start && date <= *end,
        }
    }
}
