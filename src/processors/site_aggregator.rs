use crate::models::{Metric, Reading, SiteValue, SourceField};
use std::collections::BTreeMap;

#[derive(Default)]
struct StationAccumulator {
    latitude: f64,
    longitude: f64,
    value_sum: f64,
    value_count: usize,
    speed_sum: f64,
    speed_count: usize,
    directions: Vec<f64>,
}

/// Collapses a bucket's readings into one [`SiteValue`] per station.
pub struct SiteAggregator;

impl SiteAggregator {
    /// Group by station id (results ordered by id). Coordinates come from the
    /// station's first reading, the target metric is the mean of non-missing
    /// values, and stations without any target value are dropped.
    pub fn aggregate(readings: &[&Reading], metric: Metric) -> Vec<SiteValue> {
        let value_field = metric.value_field();
        let with_wind = metric.uses_wind();

        let mut stations: BTreeMap<&str, StationAccumulator> = BTreeMap::new();
        for reading in readings {
            let acc = stations
                .entry(reading.station_id.as_str())
                .or_insert_with(|| StationAccumulator {
                    latitude: reading.latitude,
                    longitude: reading.longitude,
                    ..Default::default()
                });

            if let Some(v) = reading.value(value_field) {
                acc.value_sum += v;
                acc.value_count += 1;
            }

            if with_wind {
                if let Some(speed) = reading.value(SourceField::WindSpeed) {
                    acc.speed_sum += speed;
                    acc.speed_count += 1;
                }
                if let Some(direction) = reading.value(SourceField::WindDirection) {
                    acc.directions.push(direction);
                }
            }
        }

        stations
            .into_iter()
            .filter(|(_, acc)| acc.value_count > 0)
            .map(|(station_id, acc)| SiteValue {
                station_id: station_id.to_string(),
                latitude: acc.latitude,
                longitude: acc.longitude,
                value: acc.value_sum / acc.value_count as f64,
                wind_speed: (acc.speed_count > 0).then(|| acc.speed_sum / acc.speed_count as f64),
                wind_direction: aggregate_direction(&acc.directions),
                observation_count: acc.value_count,
            })
            .collect()
    }
}

/// Most frequent direction (smallest on ties), falling back to the mean when no mode exists.
pub fn aggregate_direction(directions: &[f64]) -> Option<f64> {
    modal_value(directions).or_else(|| mean(directions))
}

fn modal_value(values: &[f64]) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mut best: Option<(f64, usize)> = None;
    let mut i = 0;
    while i < sorted.len() {
        let current = sorted[i];
        let run = sorted[i..].iter().take_while(|v| **v == current).count();
        if best.map_or(true, |(_, count)| run > count) {
            best = Some((current, run));
        }
        i += run;
    }

    best.map(|(value, _)| value)
}

fn mean(values: &[f64]) -> Option<f64> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        None
    } else {
        Some(finite.iter().sum::<f64>() / finite.len() as f64)
    }
}
