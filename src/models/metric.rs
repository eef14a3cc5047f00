use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ProcessingError;
use crate::models::reading::SourceField;

/// Supported interpolation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Pm25,
    Temperature,
    Humidity,
    Pm25Variability,
    Pm25Exceed,
    WindField,
}

impl Metric {
    pub const ALL: [Metric; 6] = [
        Metric::Pm25,
        Metric::Temperature,
        Metric::Humidity,
        Metric::Pm25Variability,
        Metric::Pm25Exceed,
        Metric::WindField,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Metric::Pm25 => "pm25",
            Metric::Temperature => "temperature",
            Metric::Humidity => "humidity",
            Metric::Pm25Variability => "pm25_variability",
            Metric::Pm25Exceed => "pm25_exceed",
            Metric::WindField => "wind_field",
        }
    }

    /// Field whose per-station mean is interpolated
    pub fn value_field(&self) -> SourceField {
        match self {
            Metric::Pm25 | Metric::WindField => SourceField::Pm25,
            Metric::Temperature => SourceField::Temperature,
            Metric::Humidity => SourceField::Humidity,
            Metric::Pm25Variability => SourceField::Pm25Cv,
            Metric::Pm25Exceed => SourceField::Pm25ExceedPct,
        }
    }

    /// Every source field that must be present in the dataset for this metric to run.
    pub fn required_fields(&self) -> &'static [SourceField] {
        match self {
            Metric::Pm25 => &[SourceField::Pm25],
            Metric::Temperature => &[SourceField::Temperature],
            Metric::Humidity => &[SourceField::Humidity],
            Metric::Pm25Variability => &[SourceField::Pm25Cv],
            Metric::Pm25Exceed => &[SourceField::Pm25ExceedPct],
            Metric::WindField => &[
                SourceField::Pm25,
                SourceField::WindSpeed,
                SourceField::WindDirection,
            ],
        }
    }

    pub fn uses_wind(&self) -> bool {
        matches!(self, Metric::Pm25 | Metric::WindField)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Metric::Pm25 => "PM2.5 Spatial Distribution",
            Metric::Temperature => "Temperature Spatial Distribution",
            Metric::Humidity => "Humidity Spatial Distribution",
            Metric::Pm25Variability => "PM2.5 Coefficient of Variation",
            Metric::Pm25Exceed => "PM2.5 Exceedance Ratio",
            Metric::WindField => "Wind Vector Field",
        }
    }

    pub fn units(&self) -> &'static str {
        match self {
            Metric::Pm25 | Metric::WindField => "μg/m³",
            Metric::Temperature => "°C",
            Metric::Humidity | Metric::Pm25Variability | Metric::Pm25Exceed => "%",
        }
    }
}

impl FromStr for Metric {
    type Err = ProcessingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .iter()
            .copied()
            .find(|m| m.key() == s.trim())
            .ok_or_else(|| ProcessingError::Config(format!("Unknown metric: '{}'", s)))
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}
