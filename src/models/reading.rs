use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::utils::constants::{MAX_VALID_PM25, MIN_VALID_PM25};

/// Numeric source fields carried by a sensor reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceField {
    Pm25,
    Pm25Std,
    Pm25Cv,
    Pm25ExceedPct,
    Temperature,
    Humidity,
    DiscomfortIndex,
    WindSpeed,
    WindDirection,
}

impl SourceField {
    pub const ALL: [SourceField; 9] = [
        SourceField::Pm25,
        SourceField::Pm25Std,
        SourceField::Pm25Cv,
        SourceField::Pm25ExceedPct,
        SourceField::Temperature,
        SourceField::Humidity,
        SourceField::DiscomfortIndex,
        SourceField::WindSpeed,
        SourceField::WindDirection,
    ];

    /// Column header used by the hourly airbox exports
    pub fn column_name(&self) -> &'static str {
        match self {
            SourceField::Pm25 => "pm25_mean",
            SourceField::Pm25Std => "pm25_std",
            SourceField::Pm25Cv => "pm25_cv",
            SourceField::Pm25ExceedPct => "pm25_exceeds_35_pct",
            SourceField::Temperature => "temperature_mean",
            SourceField::Humidity => "humidity_mean",
            SourceField::DiscomfortIndex => "discomfort_index_mean",
            SourceField::WindSpeed => "WindSpeed_Mean",
            SourceField::WindDirection => "WindDirection_Mean",
        }
    }
}

/// Metric values of one reading. `None` means missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct MetricValues {
    pub pm25: Option<f64>,
    pub pm25_std: Option<f64>,
    pub pm25_cv: Option<f64>,
    pub pm25_exceed_pct: Option<f64>,
    pub temperature: Option<f64>,

    #[validate(range(min = 0.0, max = 100.0))]
    pub humidity: Option<f64>,

    pub discomfort_index: Option<f64>,

    #[validate(range(min = 0.0))]
    pub wind_speed: Option<f64>,

    pub wind_direction: Option<f64>,
}

impl MetricValues {
    pub fn get(&self, field: SourceField) -> Option<f64> {
        let value = match field {
            SourceField::Pm25 => self.pm25,
            SourceField::Pm25Std => self.pm25_std,
            SourceField::Pm25Cv => self.pm25_cv,
            SourceField::Pm25ExceedPct => self.pm25_exceed_pct,
            SourceField::Temperature => self.temperature,
            SourceField::Humidity => self.humidity,
            SourceField::DiscomfortIndex => self.discomfort_index,
            SourceField::WindSpeed => self.wind_speed,
            SourceField::WindDirection => self.wind_direction,
        };
        value.filter(|v| v.is_finite())
    }

    pub fn set(&mut self, field: SourceField, value: Option<f64>) {
        let slot = match field {
            SourceField::Pm25 => &mut self.pm25,
            SourceField::Pm25Std => &mut self.pm25_std,
            SourceField::Pm25Cv => &mut self.pm25_cv,
            SourceField::Pm25ExceedPct => &mut self.pm25_exceed_pct,
            SourceField::Temperature => &mut self.temperature,
            SourceField::Humidity => &mut self.humidity,
            SourceField::DiscomfortIndex => &mut self.discomfort_index,
            SourceField::WindSpeed => &mut self.wind_speed,
            SourceField::WindDirection => &mut self.wind_direction,
        };
        *slot = value.filter(|v| v.is_finite());
    }

    /// A missing pm2.5 value is valid; a present one must lie in [0, 500].
    pub fn has_valid_pm25(&self) -> bool {
        match self.pm25 {
            None => true,
            Some(v) if v.is_nan() => true,
            Some(v) => (MIN_VALID_PM25..=MAX_VALID_PM25).contains(&v),
        }
    }
}

/// A reading as delivered by the ingestion collaborator, before coordinate resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawReading {
    pub timestamp: NaiveDateTime,
    pub station_id: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub values: MetricValues,
}

impl RawReading {
    pub fn new(timestamp: NaiveDateTime, station_id: impl Into<String>, values: MetricValues) -> Self {
        Self {
            timestamp,
            station_id: station_id.into(),
            latitude: None,
            longitude: None,
            values,
        }
    }

    pub fn with_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }
}

/// A prepared reading whose coordinates have been resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub timestamp: NaiveDateTime,
    pub station_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub values: MetricValues,
}

impl Reading {
    pub fn new(
        timestamp: NaiveDateTime,
        station_id: impl Into<String>,
        latitude: f64,
        longitude: f64,
        values: MetricValues,
    ) -> Self {
        Self {
            timestamp,
            station_id: station_id.into(),
            latitude,
            longitude,
            values,
        }
    }

    pub fn hour(&self) -> u8 {
        self.timestamp.hour() as u8
    }

    pub fn value(&self, field: SourceField) -> Option<f64> {
        self.values.get(field)
    }
}
