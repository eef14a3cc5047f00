use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{ProcessingError, Result};
use crate::models::metric::Metric;
use crate::models::period::{DiurnalPeriod, ALL_PERIOD_KEY};
use crate::models::time::BucketKey;

/// One station's aggregated representative values within a bucket and diurnal period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteValue {
    pub station_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub value: f64,
    pub wind_speed: Option<f64>,
    pub wind_direction: Option<f64>,
    pub observation_count: usize,
}

impl SiteValue {
    pub fn new(station_id: impl Into<String>, latitude: f64, longitude: f64, value: f64) -> Self {
        Self {
            station_id: station_id.into(),
            latitude,
            longitude,
            value,
            wind_speed: None,
            wind_direction: None,
            observation_count: 1,
        }
    }

    pub fn with_wind(mut self, speed: f64, direction: f64) -> Self {
        self.wind_speed = Some(speed);
        self.wind_direction = Some(direction);
        self
    }

    /// Both wind speed and direction, when the station reported them
    pub fn wind(&self) -> Option<(f64, f64)> {
        match (self.wind_speed, self.wind_direction) {
            (Some(s), Some(d)) if s.is_finite() && d.is_finite() => Some((s, d)),
            _ => None,
        }
    }

    /// Eastward and northward wind vector components `(u, v)`.
    pub fn wind_components(&self) -> Option<(f64, f64)> {
        self.wind().map(|(speed, direction)| {
            let rad = direction.to_radians();
            (speed * rad.sin(), speed * rad.cos())
        })
    }
}

/// Immutable uniform mesh of (longitude, latitude) sample points.
///
/// Rows follow latitude, columns follow longitude; `lon_mesh[[r, c]] == longitudes[c]`
/// and `lat_mesh[[r, c]] == latitudes[r]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    pub lon_min: f64,
    pub lon_max: f64,
    pub lat_min: f64,
    pub lat_max: f64,
    longitudes: Array1<f64>,
    latitudes: Array1<f64>,
    lon_mesh: Array2<f64>,
    lat_mesh: Array2<f64>,
}

impl Grid {
    pub fn from_axes(longitudes: Vec<f64>, latitudes: Vec<f64>) -> Result<Self> {
        if longitudes.is_empty() || latitudes.is_empty() {
            return Err(ProcessingError::Config(
                "Grid axes must contain at least one point".to_string(),
            ));
        }
        if longitudes
            .iter()
            .chain(latitudes.iter())
            .any(|v| !v.is_finite())
        {
            return Err(ProcessingError::InvalidCoordinate(
                "Grid axes contain non-finite coordinates".to_string(),
            ));
        }

        let longitudes = Array1::from(longitudes);
        let latitudes = Array1::from(latitudes);
        let shape = (latitudes.len(), longitudes.len());
        let lon_mesh = Array2::from_shape_fn(shape, |(_, c)| longitudes[c]);
        let lat_mesh = Array2::from_shape_fn(shape, |(r, _)| latitudes[r]);

        Ok(Self {
            lon_min: longitudes.iter().copied().fold(f64::INFINITY, f64::min),
            lon_max: longitudes.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            lat_min: latitudes.iter().copied().fold(f64::INFINITY, f64::min),
            lat_max: latitudes.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            longitudes,
            latitudes,
            lon_mesh,
            lat_mesh,
        })
    }

    pub fn longitudes(&self) -> &Array1<f64> {
        &self.longitudes
    }

    pub fn latitudes(&self) -> &Array1<f64> {
        &self.latitudes
    }

    pub fn lon_mesh(&self) -> &Array2<f64> {
        &self.lon_mesh
    }

    pub fn lat_mesh(&self) -> &Array2<f64> {
        &self.lat_mesh
    }

    /// (rows, cols) = (latitude count, longitude count)
    pub fn shape(&self) -> (usize, usize) {
        (self.latitudes.len(), self.longitudes.len())
    }

    pub fn point_count(&self) -> usize {
        self.latitudes.len() * self.longitudes.len()
    }
}

/// An interpolated field aligned to a [`Grid`], with provenance.
#[derive(Debug, Clone)]
pub struct InterpolatedField {
    pub metric: Metric,
    pub bucket_key: BucketKey,
    pub bucket_label: String,
    pub period_key: String,
    pub period_name: String,
    /// Undefined cells (no station within radius) are NaN.
    pub values: Array2<f64>,
    pub grid: Arc<Grid>,
    pub station_count: usize,
    pub mean_value: f64,
    pub mean_wind_speed: Option<f64>,
    pub sites: Vec<SiteValue>,
}

impl InterpolatedField {
    /// Attach provenance to an interpolated array. The array must match the grid's shape.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        metric: Metric,
        bucket_key: BucketKey,
        bucket_label: String,
        period: &DiurnalPeriod,
        values: Array2<f64>,
        grid: Arc<Grid>,
        sites: Vec<SiteValue>,
    ) -> Result<Self> {
        if values.dim() != grid.shape() {
            return Err(ProcessingError::Interpolation(format!(
                "Field shape {:?} does not match grid shape {:?}",
                values.dim(),
                grid.shape()
            )));
        }

        let station_count = sites.len();
        let mean_value = if sites.is_empty() {
            f64::NAN
        } else {
            sites.iter().map(|s| s.value).sum::<f64>() / station_count as f64
        };

        let speeds: Vec<f64> = sites.iter().filter_map(|s| s.wind_speed).collect();
        let mean_wind_speed = (metric.uses_wind() && !speeds.is_empty())
            .then(|| speeds.iter().sum::<f64>() / speeds.len() as f64);

        Ok(Self {
            metric,
            bucket_key,
            bucket_label,
            period_key: period.key.clone(),
            period_name: period.name.clone(),
            values,
            grid,
            station_count,
            mean_value,
            mean_wind_speed,
            sites,
        })
    }

    pub fn value_at(&self, row: usize, col: usize) -> Option<f64> {
        self.values.get((row, col)).copied().filter(|v| !v.is_nan())
    }

    pub fn defined_cells(&self) -> usize {
        self.values.iter().filter(|v| !v.is_nan()).count()
    }

    /// Minimum and maximum over defined cells
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.values
            .iter()
            .filter(|v| !v.is_nan())
            .fold(None, |acc, &v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// Stable output name: `{prefix}_{metric}_{label}[_{period}]`
    pub fn output_stem(&self, prefix: &str) -> String {
        let label = self.bucket_label.replace(':', "-").replace(' ', "_");
        let mut stem = format!("{}_{}_{}", prefix, self.metric.key(), label);
        if self.period_key != ALL_PERIOD_KEY {
            stem.push('_');
            stem.push_str(&self.period_key);
        }
        stem
    }
}
