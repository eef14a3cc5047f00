use chrono::NaiveDateTime;
use std::collections::HashSet;

use crate::error::{ProcessingError, Result};
use crate::models::{Metric, Reading, SourceField, TimeGranularity};
use crate::processors::{Extent, TimeAggregator};

#[derive(Debug, Clone, PartialEq)]
pub struct FieldCoverage {
    pub field: SourceField,
    pub present: usize,
    pub total: usize,
}

impl FieldCoverage {
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.present as f64 / self.total as f64) * 100.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

#[derive(Debug)]
pub struct DatasetStatistics {
    pub total_readings: usize,
    pub unique_stations: usize,
    pub time_span: (NaiveDateTime, NaiveDateTime),
    pub extent: Extent,
    pub granularity: TimeGranularity,
    pub bucket_count: usize,
    pub field_coverage: Vec<FieldCoverage>,
    pub metric_availability: Vec<(Metric, bool)>,
    pub pm25: Option<ValueStats>,
}

/// Describes a prepared reading set without running any interpolation.
pub struct DatasetAnalyzer;

impl DatasetAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(
        &self,
        readings: &[Reading],
        granularity: TimeGranularity,
        metrics: &[Metric],
    ) -> Result<DatasetStatistics> {
        let extent = Extent::of_readings(readings)
            .ok_or_else(|| ProcessingError::MissingData("No readings to analyze".to_string()))?;

        let mut stations = HashSet::new();
        let mut first = readings[0].timestamp;
        let mut last = readings[0].timestamp;
        for reading in readings {
            stations.insert(reading.station_id.as_str());
            first = first.min(reading.timestamp);
            last = last.max(reading.timestamp);
        }

        let field_coverage: Vec<FieldCoverage> = SourceField::ALL
            .iter()
            .map(|&field| FieldCoverage {
                field,
                present: readings.iter().filter(|r| r.value(field).is_some()).count(),
                total: readings.len(),
            })
            .collect();

        let metric_availability = metrics
            .iter()
            .map(|&metric| {
                let available = metric.required_fields().iter().all(|f| {
                    field_coverage
                        .iter()
                        .any(|c| c.field == *f && c.present > 0)
                });
                (metric, available)
            })
            .collect();

        Ok(DatasetStatistics {
            total_readings: readings.len(),
            unique_stations: stations.len(),
            time_span: (first, last),
            extent,
            granularity,
            bucket_count: TimeAggregator::new(granularity).aggregate(readings).len(),
            field_coverage,
            metric_availability,
            pm25: value_stats(readings.iter().filter_map(|r| r.value(SourceField::Pm25))),
        })
    }
}

impl Default for DatasetAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

fn value_stats(values: impl Iterator<Item = f64>) -> Option<ValueStats> {
    let mut count = 0usize;
    let mut sum = 0.0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values {
        count += 1;
        sum += v;
        min = min.min(v);
        max = max.max(v);
    }
    (count > 0).then(|| ValueStats {
        min,
        max,
        mean: sum / count as f64,
    })
}

impl DatasetStatistics {
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "Dataset Summary:\n\
            - Readings: {}\n\
            - Stations: {}\n\
            - Time span: {} to {}\n\
            - Extent: {:.4}°E-{:.4}°E, {:.4}°N-{:.4}°N\n\
            - {} buckets: {}\n",
            self.total_readings,
            self.unique_stations,
            self.time_span.0,
            self.time_span.1,
            self.extent.lon_min,
            self.extent.lon_max,
            self.extent.lat_min,
            self.extent.lat_max,
            self.granularity,
            self.bucket_count
        );

        if let Some(pm25) = self.pm25 {
            summary.push_str(&format!(
                "- PM2.5: {:.1} to {:.1} μg/m³ (mean {:.1})\n",
                pm25.min, pm25.max, pm25.mean
            ));
        }

        summary.push_str("Field coverage:\n");
        for coverage in &self.field_coverage {
            summary.push_str(&format!(
                "  {:<24} {:>5.1}%\n",
                coverage.field.column_name(),
                coverage.percentage()
            ));
        }

        summary.push_str("Metrics:\n");
        for (metric, available) in &self.metric_availability {
            let status = if *available { "available" } else { "missing source data" };
            summary.push_str(&format!("  {:<18} {}\n", metric.key(), status));
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetricValues;
    use chrono::NaiveDate;

    fn reading(day: u32, station: &str, pm25: Option<f64>) -> Reading {
        let ts = NaiveDate::from_ymd_opt(2020, 1, day)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        let mut values = MetricValues::default();
        values.pm25 = pm25;
        Reading::new(ts, station, 22.6 + day as f64 * 0.01, 120.3, values)
    }

    #[test]
    fn test_analyze_dataset() {
        let readings = vec![
            reading(1, "A", Some(10.0)),
            reading(2, "B", Some(30.0)),
            reading(3, "A", None),
        ];

        let stats = DatasetAnalyzer::new()
            .analyze(
                &readings,
                TimeGranularity::Daily,
                &[Metric::Pm25, Metric::Temperature],
            )
            .unwrap();

        assert_eq!(stats.total_readings, 3);
        assert_eq!(stats.unique_stations, 2);
        assert_eq!(stats.bucket_count, 3);
        assert_eq!(stats.time_span.0.format("%d").to_string(), "01");
        assert_eq!(stats.time_span.1.format("%d").to_string(), "03");
        assert_eq!(
            stats.metric_availability,
            vec![(Metric::Pm25, true), (Metric::Temperature, false)]
        );

        let pm25 = stats.pm25.unwrap();
        assert_eq!((pm25.min, pm25.max, pm25.mean), (10.0, 30.0, 20.0));

        let coverage = &stats.field_coverage[0];
        assert_eq!(coverage.field, SourceField::Pm25);
        assert!((coverage.percentage() - 200.0 / 3.0).abs() < 1e-9);

        let summary = stats.summary();
        assert!(summary.contains("Stations: 2"));
        assert!(summary.contains("temperature        missing source data"));
    }

    #[test]
    fn test_analyze_empty_dataset() {
        let result = DatasetAnalyzer::new().analyze(&[], TimeGranularity::Daily, &[Metric::Pm25]);
        assert!(matches!(result, Err(ProcessingError::MissingData(_))));
    }
}
