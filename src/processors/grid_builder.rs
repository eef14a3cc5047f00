use crate::error::{ProcessingError, Result};
use crate::models::{Grid, Reading};
use crate::utils::constants::GRID_MARGIN_DEG;

/// Geographic extent of a set of readings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub lon_min: f64,
    pub lon_max: f64,
    pub lat_min: f64,
    pub lat_max: f64,
}

impl Extent {
    pub fn of_readings(readings: &[Reading]) -> Option<Self> {
        readings
            .iter()
            .filter(|r| r.longitude.is_finite() && r.latitude.is_finite())
            .fold(None, |acc: Option<Extent>, r| {
                Some(match acc {
                    None => Extent {
                        lon_min: r.longitude,
                        lon_max: r.longitude,
                        lat_min: r.latitude,
                        lat_max: r.latitude,
                    },
                    Some(e) => Extent {
                        lon_min: e.lon_min.min(r.longitude),
                        lon_max: e.lon_max.max(r.longitude),
                        lat_min: e.lat_min.min(r.latitude),
                        lat_max: e.lat_max.max(r.latitude),
                    },
                })
            })
    }

    pub fn expanded(&self, margin: f64) -> Self {
        Self {
            lon_min: self.lon_min - margin,
            lon_max: self.lon_max + margin,
            lat_min: self.lat_min - margin,
            lat_max: self.lat_max + margin,
        }
    }
}

pub struct GridBuilder {
    resolution: usize,
    margin: f64,
}

impl GridBuilder {
    pub fn new(resolution: usize) -> Self {
        Self {
            resolution,
            margin: GRID_MARGIN_DEG,
        }
    }

    pub fn with_margin(mut self, margin: f64) -> Self {
        self.margin = margin;
        self
    }

    /// N×N mesh over the readings' extent plus the margin.
    pub fn build(&self, readings: &[Reading]) -> Result<Grid> {
        let extent = Extent::of_readings(readings).ok_or_else(|| {
            ProcessingError::MissingData("No coordinates available to build a grid".to_string())
        })?;
        self.build_for_extent(extent)
    }

    pub fn build_for_extent(&self, extent: Extent) -> Result<Grid> {
        if self.resolution == 0 {
            return Err(ProcessingError::Config(
                "Grid resolution must be a positive integer".to_string(),
            ));
        }

        let bounds = extent.expanded(self.margin);
        let longitudes = linspace(bounds.lon_min, bounds.lon_max, self.resolution);
        let latitudes = linspace(bounds.lat_min, bounds.lat_max, self.resolution);

        Grid::from_axes(longitudes, latitudes)
    }
}

/// `n` evenly spaced values from `start` to `end` inclusive.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetricValues;
    use chrono::NaiveDate;

    fn at(lat: f64, lon: f64) -> Reading {
        let ts = NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        Reading::new(ts, "S", lat, lon, MetricValues::default())
    }

    #[test]
    fn test_linspace() {
        assert_eq!(linspace(0.0, 1.0, 5), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(linspace(3.0, 7.0, 1), vec![3.0]);
        assert!(linspace(0.0, 1.0, 0).is_empty());
    }

    #[test]
    fn test_grid_spans_extent_with_margin() {
        let readings = vec![at(22.6, 120.3), at(22.8, 120.2), at(22.7, 120.4)];
        let grid = GridBuilder::new(11).build(&readings).unwrap();

        assert_eq!(grid.shape(), (11, 11));
        assert!((grid.lon_min - 120.18).abs() < 1e-9);
        assert!((grid.lon_max - 120.42).abs() < 1e-9);
        assert!((grid.lat_min - 22.58).abs() < 1e-9);
        assert!((grid.lat_max - 22.82).abs() < 1e-9);
    }

    #[test]
    fn test_single_station_grid_is_margin_square() {
        let grid = GridBuilder::new(3).build(&[at(1.0, 2.0)]).unwrap();
        let lons = grid.longitudes().to_vec();
        assert!((lons[0] - 1.98).abs() < 1e-12);
        assert!((lons[1] - 2.0).abs() < 1e-12);
        assert!((lons[2] - 2.02).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(GridBuilder::new(0).build(&[at(1.0, 2.0)]).is_err());
        assert!(matches!(
            GridBuilder::new(10).build(&[]),
            Err(ProcessingError::MissingData(_))
        ));
    }
}
