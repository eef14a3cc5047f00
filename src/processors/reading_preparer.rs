use crate::error::{ProcessingError, Result};
use crate::models::{RawReading, Reading, Station, TimeWindow};
use std::collections::HashMap;
use tracing::{debug, info};

/// Row counts for each preparation stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreparationReport {
    pub input_rows: usize,
    pub outside_window: usize,
    pub invalid_pm25: usize,
    pub unresolved_coordinates: usize,
    pub overridden_coordinates: usize,
    pub retained: usize,
}

impl PreparationReport {
    pub fn summary(&self) -> String {
        format!(
            "Reading Preparation:\n\
            - Input rows: {}\n\
            - Outside time window: {}\n\
            - Invalid PM2.5 (outside 0-500): {}\n\
            - Unresolved coordinates: {}\n\
            - Coordinates from station metadata: {}\n\
            - Retained rows: {}",
            self.input_rows,
            self.outside_window,
            self.invalid_pm25,
            self.unresolved_coordinates,
            self.overridden_coordinates,
            self.retained
        )
    }
}

#[derive(Debug, Clone)]
pub struct PreparedDataset {
    pub readings: Vec<Reading>,
    pub report: PreparationReport,
}

/// Applies the ingestion contract: time window, PM2.5 validity, and
/// canonical station coordinates.
pub struct ReadingPreparer {
    window: TimeWindow,
}

impl ReadingPreparer {
    pub fn new() -> Self {
        Self {
            window: TimeWindow::All,
        }
    }

    pub fn with_window(window: TimeWindow) -> Result<Self> {
        window.validate()?;
        Ok(Self { window })
    }

    pub fn prepare(
        &self,
        raw: Vec<RawReading>,
        stations: &HashMap<String, Station>,
    ) -> Result<PreparedDataset> {
        let mut report = PreparationReport {
            input_rows: raw.len(),
            ..Default::default()
        };

        let mut candidates = Vec::with_capacity(raw.len());
        for reading in raw {
            if !self.window.contains(reading.timestamp) {
                report.outside_window += 1;
                continue;
            }
            if !reading.values.has_valid_pm25() {
                report.invalid_pm25 += 1;
                continue;
            }
            candidates.push(reading);
        }

        if candidates.is_empty() {
            return Err(ProcessingError::MissingData(
                "No readings remain in the selected time window".to_string(),
            ));
        }

        let mut readings = Vec::with_capacity(candidates.len());
        for reading in candidates {
            match self.resolve_coordinates(&reading, stations) {
                Some((latitude, longitude, overridden)) => {
                    if overridden {
                        report.overridden_coordinates += 1;
                    }
                    readings.push(Reading {
                        timestamp: reading.timestamp,
                        station_id: reading.station_id,
                        latitude,
                        longitude,
                        values: reading.values,
                    });
                }
                None => report.unresolved_coordinates += 1,
            }
        }

        if readings.is_empty() {
            return Err(ProcessingError::MissingData(
                "No station coordinates could be resolved".to_string(),
            ));
        }

        report.retained = readings.len();
        debug!(?report, "reading preparation finished");
        info!(
            "Prepared {} of {} readings",
            report.retained, report.input_rows
        );

        Ok(PreparedDataset { readings, report })
    }

    /// Station metadata wins; reading-carried coordinates are the fallback.
    fn resolve_coordinates(
        &self,
        reading: &RawReading,
        stations: &HashMap<String, Station>,
    ) -> Option<(f64, f64, bool)> {
        if let Some(station) = stations.get(&reading.station_id) {
            if station.latitude.is_finite() && station.longitude.is_finite() {
                return Some((station.latitude, station.longitude, true));
            }
        }

        match (reading.latitude, reading.longitude) {
            (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => Some((lat, lon, false)),
            _ => None,
        }
    }
}

impl Default for ReadingPreparer {
    fn default() -> Self {
        Self::new()
    }
}
