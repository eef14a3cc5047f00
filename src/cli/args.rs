use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::analysis::Settings;
use crate::error::{ProcessingError, Result};
use crate::models::TimeWindow;

#[derive(Parser)]
#[command(name = "airbox-processor")]
#[command(about = "Wind-aware spatio-temporal interpolation of air-quality sensor networks")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,

    #[arg(
        short,
        long,
        global = true,
        help = "Settings file (TOML, JSON or YAML); AIRBOX_* environment variables override it"
    )]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Interpolate every bucket, metric and diurnal period and write one Parquet file per field
    Analyze {
        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        analysis: AnalysisArgs,

        #[arg(
            short,
            long,
            help = "Output directory [default: output/{prefix}-{YYMMDD}]"
        )]
        output_dir: Option<PathBuf>,

        #[arg(long, help = "File name prefix for field files")]
        output_prefix: Option<String>,

        #[arg(long, help = "snappy, gzip, lz4, zstd or none")]
        compression: Option<String>,

        #[arg(short, long, help = "Disable the progress bar")]
        quiet: bool,
    },

    /// Load and prepare readings, then print a dataset summary without interpolating
    Validate {
        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        analysis: AnalysisArgs,
    },

    /// Display information about a field Parquet file
    Info {
        #[arg(short, long)]
        file: PathBuf,

        #[arg(short, long, default_value = "10")]
        sample: usize,
    },
}

/// Where readings come from and which of them enter the analysis.
#[derive(Args, Debug, Clone, Default)]
pub struct DataArgs {
    #[arg(short, long, help = "Directory containing hourly reading CSV files")]
    pub data_dir: Option<PathBuf>,

    #[arg(long, help = "Station metadata CSV (deviceId, lat, lon)")]
    pub station_file: Option<PathBuf>,

    #[arg(long, help = "Only read CSV files whose name contains this text")]
    pub file_pattern: Option<String>,

    #[arg(long, value_delimiter = ',', help = "Years to include, e.g. 2020,2021")]
    pub years: Vec<i32>,

    #[arg(long, value_delimiter = ',', help = "Months to include, e.g. 1,2,12")]
    pub months: Vec<u32>,

    #[arg(long, help = "First day to include (YYYY-MM-DD)")]
    pub start_date: Option<NaiveDate>,

    #[arg(long, help = "Last day to include (YYYY-MM-DD)")]
    pub end_date: Option<NaiveDate>,
}

impl DataArgs {
    pub fn apply(&self, settings: &mut Settings) -> Result<()> {
        if let Some(dir) = &self.data_dir {
            settings.data_dir = dir.clone();
        }
        if let Some(file) = &self.station_file {
            settings.station_file = file.clone();
        }
        if let Some(pattern) = &self.file_pattern {
            settings.file_pattern = pattern.clone();
        }

        let by_month = !self.years.is_empty() || !self.months.is_empty();
        let by_range = self.start_date.is_some() || self.end_date.is_some();
        if by_month && by_range {
            return Err(ProcessingError::Config(
                "Use either --years/--months or --start-date/--end-date, not both".to_string(),
            ));
        }

        if by_month {
            settings.window = TimeWindow::YearMonth {
                years: self.years.clone(),
                months: self.months.clone(),
            };
        } else if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            settings.window = TimeWindow::DateRange { start, end };
        } else if by_range {
            return Err(ProcessingError::Config(
                "--start-date and --end-date must be given together".to_string(),
            ));
        }

        settings.window.validate()
    }
}

/// Analysis parameters. Unset flags keep the value from settings.
#[derive(Args, Debug, Clone, Default)]
pub struct AnalysisArgs {
    #[arg(
        short,
        long,
        help = "hourly, daily, weekly, monthly, seasonal or yearly"
    )]
    pub granularity: Option<String>,

    #[arg(
        short,
        long,
        value_delimiter = ',',
        help = "Diurnal periods: all, dawn, morning_peak, noon, evening_peak, night, midnight"
    )]
    pub periods: Vec<String>,

    #[arg(
        short,
        long,
        value_delimiter = ',',
        help = "Metrics: pm25, temperature, humidity, pm25_variability, pm25_exceed, wind_field"
    )]
    pub metrics: Vec<String>,

    #[arg(short, long, help = "Grid points per axis")]
    pub resolution: Option<usize>,

    #[arg(long, help = "Diffusion radius in degrees")]
    pub radius: Option<f64>,

    #[arg(long, help = "Wind influence coefficient (0.0-1.0)")]
    pub wind_influence: Option<f64>,

    #[arg(long, help = "Gaussian smoothing sigma in grid cells")]
    pub sigma: Option<f64>,

    #[arg(long)]
    pub max_workers: Option<usize>,

    #[arg(long, help = "Abort the analysis after this many seconds")]
    pub timeout: Option<u64>,
}

impl AnalysisArgs {
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(granularity) = &self.granularity {
            settings.granularity = granularity.clone();
        }
        if !self.periods.is_empty() {
            settings.periods = self.periods.clone();
        }
        if !self.metrics.is_empty() {
            settings.metrics = self.metrics.clone();
        }
        if let Some(resolution) = self.resolution {
            settings.grid_resolution = resolution;
        }
        if let Some(radius) = self.radius {
            settings.radius = radius;
        }
        if let Some(influence) = self.wind_influence {
            settings.wind_influence = influence;
        }
        if let Some(sigma) = self.sigma {
            settings.sigma = sigma;
        }
        if let Some(workers) = self.max_workers {
            settings.max_workers = workers;
        }
        if let Some(timeout) = self.timeout {
            settings.timeout_secs = Some(timeout);
        }
    }
}
