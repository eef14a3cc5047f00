use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use validator::Validate;

use crate::error::Result;
use crate::interpolation::DiffusionParams;
use crate::models::{DiurnalPeriod, Metric, TimeGranularity, TimeWindow};
use crate::utils::constants::{
    DEFAULT_COMPRESSION, DEFAULT_DATA_DIR, DEFAULT_DIFFUSION_RADIUS, DEFAULT_GRID_RESOLUTION,
    DEFAULT_OUTPUT_PREFIX, DEFAULT_READING_FILE_PATTERN, DEFAULT_SMOOTHING_SIGMA,
    DEFAULT_STATION_FILE, DEFAULT_WIND_INFLUENCE, DISTANCE_DECAY, SETTINGS_ENV_PREFIX,
};

/// Immutable run configuration handed to the orchestrator.
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct AnalysisConfig {
    pub granularity: TimeGranularity,

    #[validate(length(min = 1))]
    pub periods: Vec<DiurnalPeriod>,

    #[validate(length(min = 1))]
    pub metrics: Vec<Metric>,

    #[validate(range(min = 1))]
    pub grid_resolution: usize,

    #[validate(nested)]
    pub diffusion: DiffusionParams,

    #[validate(range(min = 1))]
    pub max_workers: usize,

    pub deadline: Option<Duration>,
}

impl AnalysisConfig {
    pub fn new(granularity: TimeGranularity) -> Self {
        Self {
            granularity,
            periods: vec![DiurnalPeriod::all()],
            metrics: vec![Metric::Pm25],
            grid_resolution: DEFAULT_GRID_RESOLUTION,
            diffusion: DiffusionParams::default(),
            max_workers: num_cpus::get(),
            deadline: None,
        }
    }

    pub fn with_periods(mut self, periods: Vec<DiurnalPeriod>) -> Self {
        self.periods = periods;
        self
    }

    pub fn with_metrics(mut self, metrics: Vec<Metric>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_grid_resolution(mut self, grid_resolution: usize) -> Self {
        self.grid_resolution = grid_resolution;
        self
    }

    pub fn with_diffusion(mut self, diffusion: DiffusionParams) -> Self {
        self.diffusion = diffusion;
        self
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self::new(TimeGranularity::Monthly)
    }
}

/// Layered user settings: built-in defaults, then an optional file, then `AIRBOX_*`
/// environment variables. CLI flags are applied on top by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub station_file: PathBuf,
    pub file_pattern: String,
    /// Dated directory under `output/` when unset
    pub output_dir: Option<PathBuf>,
    pub output_prefix: String,
    pub compression: String,
    pub granularity: String,
    pub periods: Vec<String>,
    pub metrics: Vec<String>,
    pub window: TimeWindow,
    pub grid_resolution: usize,
    pub radius: f64,
    pub wind_influence: f64,
    pub sigma: f64,
    pub max_workers: usize,
    pub timeout_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            station_file: PathBuf::from(DEFAULT_STATION_FILE),
            file_pattern: DEFAULT_READING_FILE_PATTERN.to_string(),
            output_dir: None,
            output_prefix: DEFAULT_OUTPUT_PREFIX.to_string(),
            compression: DEFAULT_COMPRESSION.to_string(),
            granularity: TimeGranularity::Monthly.key().to_string(),
            periods: vec![DiurnalPeriod::all().key],
            metrics: vec![Metric::Pm25.key().to_string()],
            window: TimeWindow::All,
            grid_resolution: DEFAULT_GRID_RESOLUTION,
            radius: DEFAULT_DIFFUSION_RADIUS,
            wind_influence: DEFAULT_WIND_INFLUENCE,
            sigma: DEFAULT_SMOOTHING_SIGMA,
            max_workers: num_cpus::get(),
            timeout_secs: None,
        }
    }
}

impl Settings {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Settings::default())?);

        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        let settings: Settings = builder
            .add_source(
                Environment::with_prefix(SETTINGS_ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("periods")
                    .with_list_parse_key("metrics"),
            )
            .build()?
            .try_deserialize()?;

        settings.window.validate()?;
        Ok(settings)
    }

    /// Resolve catalogue keys and range-check everything the orchestrator consumes.
    pub fn to_analysis_config(&self) -> Result<AnalysisConfig> {
        let granularity: TimeGranularity = self.granularity.parse()?;

        let mut periods: Vec<DiurnalPeriod> = Vec::new();
        for key in &self.periods {
            let period: DiurnalPeriod = key.parse()?;
            if !periods.iter().any(|p| p.key == period.key) {
                periods.push(period);
            }
        }

        let mut metrics: Vec<Metric> = Vec::new();
        for key in &self.metrics {
            let metric: Metric = key.parse()?;
            if !metrics.contains(&metric) {
                metrics.push(metric);
            }
        }

        let mut config = AnalysisConfig::new(granularity)
            .with_periods(periods)
            .with_metrics(metrics)
            .with_grid_resolution(self.grid_resolution)
            .with_diffusion(DiffusionParams {
                radius: self.radius,
                wind_influence: self.wind_influence,
                distance_decay: DISTANCE_DECAY,
                sigma: self.sigma,
            })
            .with_max_workers(self.max_workers);
        if let Some(secs) = self.timeout_secs {
            config = config.with_deadline(Duration::from_secs(secs));
        }

        config.validate()?;
        Ok(config)
    }
}
