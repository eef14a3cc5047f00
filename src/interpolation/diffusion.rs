use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};
use tracing::trace;
use validator::Validate;

use crate::error::Result;
use crate::interpolation::smoothing::GaussianSmoother;
use crate::models::{Grid, SiteValue};
use crate::utils::constants::{
    DEFAULT_DIFFUSION_RADIUS, DEFAULT_SMOOTHING_SIGMA, DEFAULT_WIND_INFLUENCE, DISTANCE_DECAY,
    DISTANCE_EPSILON, WIND_SPEED_SCALE,
};

/// Tuning of the dense diffusion model. Distances are planar degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct DiffusionParams {
    #[validate(range(exclusive_min = 0.0))]
    pub radius: f64,

    #[validate(range(min = 0.0, max = 1.0))]
    pub wind_influence: f64,

    #[validate(range(exclusive_min = 0.0))]
    pub distance_decay: f64,

    #[validate(range(exclusive_min = 0.0))]
    pub sigma: f64,
}

impl Default for DiffusionParams {
    fn default() -> Self {
        Self {
            radius: DEFAULT_DIFFUSION_RADIUS,
            wind_influence: DEFAULT_WIND_INFLUENCE,
            distance_decay: DISTANCE_DECAY,
            sigma: DEFAULT_SMOOTHING_SIGMA,
        }
    }
}

/// Per-station wind terms that do not vary across the grid.
#[derive(Debug, Clone, Copy)]
struct WindBias {
    downwind_bearing: f64,
    speed_factor: f64,
}

impl WindBias {
    fn for_site(site: &SiteValue) -> Option<Self> {
        site.wind().map(|(speed, direction)| Self {
            downwind_bearing: (direction + 180.0).rem_euclid(360.0),
            speed_factor: speed_factor(speed),
        })
    }
}

/// Wind-aware inverse-distance weighting with Gaussian post-smoothing.
#[derive(Debug, Clone)]
pub struct DenseDiffusionInterpolator {
    params: DiffusionParams,
    smoother: GaussianSmoother,
}

impl DenseDiffusionInterpolator {
    pub fn new(params: DiffusionParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            smoother: GaussianSmoother::new(params.sigma),
            params,
        })
    }

    /// Smoothed field. Cells with no station within radius are NaN.
    pub fn interpolate(&self, sites: &[SiteValue], grid: &Grid, use_wind: bool) -> Array2<f64> {
        let raw = self.interpolate_unsmoothed(sites, grid, use_wind);
        self.smoother.smooth(&raw)
    }

    /// Weighted average before smoothing.
    pub fn interpolate_unsmoothed(
        &self,
        sites: &[SiteValue],
        grid: &Grid,
        use_wind: bool,
    ) -> Array2<f64> {
        let shape = grid.shape();
        let mut weighted = Array2::<f64>::zeros(shape);
        let mut total = Array2::<f64>::zeros(shape);

        for site in sites.iter().filter(|s| s.value.is_finite()) {
            let bias = if use_wind {
                WindBias::for_site(site)
            } else {
                None
            };

            Zip::from(&mut weighted)
                .and(&mut total)
                .and(grid.lon_mesh())
                .and(grid.lat_mesh())
                .par_for_each(|acc, tot, &lon, &lat| {
                    let w = self.point_weight(site, bias, lon, lat);
                    *acc += site.value * w;
                    *tot += w;
                });
        }

        trace!(sites = sites.len(), rows = shape.0, cols = shape.1, "weights accumulated");

        Zip::from(&weighted)
            .and(&total)
            .map_collect(|&sum, &weight| if weight > 0.0 { sum / weight } else { f64::NAN })
    }

    /// Weight a station contributes at a grid point.
    pub fn weight_at(&self, site: &SiteValue, lon: f64, lat: f64, use_wind: bool) -> f64 {
        let bias = if use_wind {
            WindBias::for_site(site)
        } else {
            None
        };
        self.point_weight(site, bias, lon, lat)
    }

    fn point_weight(&self, site: &SiteValue, bias: Option<WindBias>, lon: f64, lat: f64) -> f64 {
        let dx = lon - site.longitude;
        let dy = lat - site.latitude;
        let distance = (dx * dx + dy * dy).sqrt();

        let weight = base_weight(distance, self.params.radius, self.params.distance_decay);
        match bias {
            Some(bias) if weight > 0.0 => {
                let angle = angular_difference(compass_bearing(dx, dy), bias.downwind_bearing);
                weight
                    * wind_multiplier(self.params.wind_influence, angle, bias.speed_factor)
            }
            _ => weight,
        }
    }
}

/// `1 / (d + ε)^p` strictly inside the radius, zero at or beyond it.
pub fn base_weight(distance: f64, radius: f64, decay: f64) -> f64 {
    if distance < radius {
        1.0 / (distance + DISTANCE_EPSILON).powf(decay)
    } else {
        0.0
    }
}

/// Bearing in degrees clockwise from north, in [0, 360).
pub fn compass_bearing(dlon: f64, dlat: f64) -> f64 {
    dlon.atan2(dlat).to_degrees().rem_euclid(360.0)
}

/// Minimal circular difference between two bearings, in [0, 180].
pub fn angular_difference(a: f64, b: f64) -> f64 {
    let diff = (a - b).abs().rem_euclid(360.0);
    diff.min(360.0 - diff)
}

/// `1 + influence · (cos(angle) + 1)/2 · speed_factor`, always in `[1, 1 + influence]`.
pub fn wind_multiplier(influence: f64, angle_diff_deg: f64, speed_factor: f64) -> f64 {
    let wind_factor = (angle_diff_deg.to_radians().cos() + 1.0) / 2.0;
    1.0 + influence * wind_factor * speed_factor
}

/// `tanh(speed / 5)`
pub fn speed_factor(wind_speed: f64) -> f64 {
    (wind_speed / WIND_SPEED_SCALE).tanh()
}
