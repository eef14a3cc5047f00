/// PM2.5 validity bounds (μg/m³)
pub const MIN_VALID_PM25: f64 = 0.0;
pub const MAX_VALID_PM25: f64 = 500.0;

/// Margin added around the station extent when building the grid (degrees)
pub const GRID_MARGIN_DEG: f64 = 0.02;

/// Diffusion model constants
pub const DISTANCE_EPSILON: f64 = 1e-4;
pub const DISTANCE_DECAY: f64 = 3.0;
pub const WIND_SPEED_SCALE: f64 = 5.0;
pub const GAUSSIAN_TRUNCATE: f64 = 4.0;

/// Analysis defaults
pub const DEFAULT_GRID_RESOLUTION: usize = 300;
pub const DEFAULT_DIFFUSION_RADIUS: f64 = 0.05;
pub const DEFAULT_WIND_INFLUENCE: f64 = 0.3;
pub const DEFAULT_SMOOTHING_SIGMA: f64 = 0.5;

/// Input file conventions
pub const DEFAULT_READING_FILE_PATTERN: &str = "kaohsiung_airbox_hourly_with_wind";
pub const DEFAULT_STATION_FILE: &str = "data/Kaohsiung_iot_station.csv";
pub const DEFAULT_DATA_DIR: &str = "data";
pub const CSV_EXTENSION: &str = "csv";

/// Output conventions
pub const DEFAULT_OUTPUT_PREFIX: &str = "kaohsiung";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const DEFAULT_ROW_GROUP_SIZE: usize = 10000;

/// Environment prefix for layered settings
pub const SETTINGS_ENV_PREFIX: &str = "AIRBOX";

/// Parquet compression options
pub const COMPRESSION_SNAPPY: &str = "snappy";
pub const COMPRESSION_GZIP: &str = "gzip";
pub const COMPRESSION_LZ4: &str = "lz4";
pub const COMPRESSION_ZSTD: &str = "zstd";
pub const COMPRESSION_NONE: &str = "none";
pub const DEFAULT_COMPRESSION: &str = COMPRESSION_SNAPPY;
pub const DEFAULT_OUTPUT_DIR: &str = "output";
