use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::StringRecord;
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{ProcessingError, Result};
use crate::models::{MetricValues, RawReading, SourceField};
use crate::utils::constants::{CSV_EXTENSION, DEFAULT_READING_FILE_PATTERN};

const TIMESTAMP_COLUMN: &str = "timestamp";
const STATION_COLUMN: &str = "deviceId";
const LATITUDE_COLUMN: &str = "lat";
const LONGITUDE_COLUMN: &str = "lon";

const TIMESTAMP_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

/// Raw readings gathered from every matching file, plus what was lost on the way.
#[derive(Debug, Default)]
pub struct ReadingSet {
    pub readings: Vec<RawReading>,
    pub files_read: usize,
    pub files_skipped: usize,
    pub dropped_rows: usize,
}

/// Rows of one file.
#[derive(Debug)]
pub struct FileReadings {
    pub readings: Vec<RawReading>,
    pub dropped_rows: usize,
}

/// Reads hourly airbox exports (`timestamp, deviceId, lat, lon, pm25_mean, ...`).
pub struct ReadingReader {
    file_pattern: String,
}

impl ReadingReader {
    pub fn new() -> Self {
        Self {
            file_pattern: DEFAULT_READING_FILE_PATTERN.to_string(),
        }
    }

    pub fn with_file_pattern(mut self, pattern: &str) -> Self {
        self.file_pattern = pattern.to_string();
        self
    }

    /// CSV files in `data_dir` whose name contains the pattern, sorted by name
    pub fn discover_files(&self, data_dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(data_dir)? {
            let path = entry?.path();
            let matches = path.is_file()
                && path.extension().is_some_and(|ext| ext == CSV_EXTENSION)
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.contains(&self.file_pattern));
            if matches {
                files.push(path);
            }
        }
        files.sort();

        debug!(
            "Discovered {} reading files in {}",
            files.len(),
            data_dir.display()
        );
        Ok(files)
    }

    /// Read every matching file in parallel. Unreadable files are skipped with a
    /// warning; the call fails only if nothing could be read.
    pub fn read_all(&self, data_dir: &Path) -> Result<ReadingSet> {
        let files = self.discover_files(data_dir)?;
        if files.is_empty() {
            return Err(ProcessingError::MissingData(format!(
                "No CSV files matching '{}' in {}",
                self.file_pattern,
                data_dir.display()
            )));
        }

        let results: Vec<(PathBuf, Result<FileReadings>)> = files
            .into_par_iter()
            .map(|path| {
                let result = self.read_file(&path);
                (path, result)
            })
            .collect();

        let mut set = ReadingSet::default();
        for (path, result) in results {
            match result {
                Ok(file) => {
                    set.files_read += 1;
                    set.dropped_rows += file.dropped_rows;
                    set.readings.extend(file.readings);
                }
                Err(e) => {
                    warn!("Skipping unreadable file {}: {}", path.display(), e);
                    set.files_skipped += 1;
                }
            }
        }

        if set.files_read == 0 {
            return Err(ProcessingError::MissingData(
                "No reading file could be read".to_string(),
            ));
        }

        info!(
            "Read {} readings from {} files ({} skipped files, {} dropped rows)",
            set.readings.len(),
            set.files_read,
            set.files_skipped,
            set.dropped_rows
        );
        Ok(set)
    }

    /// Rows without a parseable timestamp or a station id are dropped.
    pub fn read_file(&self, path: &Path) -> Result<FileReadings> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)?;

        let columns = ColumnIndex::new(reader.headers()?)?;

        let mut readings = Vec::new();
        let mut dropped_rows = 0;
        let mut record = StringRecord::new();
        while reader.read_record(&mut record)? {
            match columns.parse_record(&record) {
                Some(reading) => readings.push(reading),
                None => dropped_rows += 1,
            }
        }

        debug!(
            "Loaded {} rows from {} ({} dropped)",
            readings.len(),
            path.display(),
            dropped_rows
        );
        Ok(FileReadings {
            readings,
            dropped_rows,
        })
    }
}

impl Default for ReadingReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Header positions of the columns this reader understands.
struct ColumnIndex {
    timestamp: usize,
    station: usize,
    latitude: Option<usize>,
    longitude: Option<usize>,
    fields: Vec<(SourceField, usize)>,
}

impl ColumnIndex {
    fn new(headers: &StringRecord) -> Result<Self> {
        let positions: HashMap<&str, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim(), i))
            .collect();

        let required = |name: &str| {
            positions.get(name).copied().ok_or_else(|| {
                ProcessingError::InvalidFormat(format!("Missing required column '{}'", name))
            })
        };

        Ok(Self {
            timestamp: required(TIMESTAMP_COLUMN)?,
            station: required(STATION_COLUMN)?,
            latitude: positions.get(LATITUDE_COLUMN).copied(),
            longitude: positions.get(LONGITUDE_COLUMN).copied(),
            fields: SourceField::ALL
                .iter()
                .filter_map(|&f| positions.get(f.column_name()).map(|&i| (f, i)))
                .collect(),
        })
    }

    fn parse_record(&self, record: &StringRecord) -> Option<RawReading> {
        let timestamp = parse_timestamp(record.get(self.timestamp)?)?;
        let station_id = record.get(self.station)?;
        if station_id.is_empty() {
            return None;
        }

        let mut values = MetricValues::default();
        for &(field, index) in &self.fields {
            values.set(field, record.get(index).and_then(parse_number));
        }

        let mut reading = RawReading::new(timestamp, station_id, values);
        let coordinate =
            |index: Option<usize>| index.and_then(|i| record.get(i)).and_then(parse_number);
        if let (Some(lat), Some(lon)) = (coordinate(self.latitude), coordinate(self.longitude)) {
            reading = reading.with_coordinates(lat, lon);
        }
        Some(reading)
    }
}

/// Accepts the common export layouts; offsets are dropped in favour of the local wall time.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }

    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Non-numeric, empty and non-finite cells are missing values.
pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use std::fs;
    use tempfile::TempDir;

    const HEADER: &str = "timestamp,deviceId,lat,lon,pm25_mean,pm25_std,pm25_cv,pm25_exceeds_35_pct,temperature_mean,humidity_mean,discomfort_index_mean,WindSpeed_Mean,WindDirection_Mean";

    fn write(dir: &TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, format!("{}\n{}", HEADER, body)).unwrap();
        path
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = NaiveDate::from_ymd_opt(2020, 1, 5)
            .unwrap()
            .and_hms_opt(7, 0, 0)
            .unwrap();
        assert_eq!(parse_timestamp("2020-01-05 07:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2020-01-05T07:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2020/01/05 07:00"), Some(expected));
        assert_eq!(parse_timestamp("2020-01-05T07:00:00+08:00"), Some(expected));
        assert_eq!(parse_timestamp("2020-01-05").map(|t| t.hour()), Some(0));
        assert_eq!(parse_timestamp("not a time"), None);
        assert_eq!(parse_timestamp(""), None);
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number(" 12.5 "), Some(12.5));
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("NA"), None);
        assert_eq!(parse_number("nan"), None);
    }

    #[test]
    fn test_read_file_tolerates_bad_cells() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "kaohsiung_airbox_hourly_with_wind_2020.csv",
            "2020-01-05 07:00:00,A1,22.6,120.3,15.5,1,0.1,0,20.1,70,19,2.5,45\n\
             garbage,A1,22.6,120.3,15.5,1,0.1,0,20.1,70,19,2.5,45\n\
             2020-01-05 08:00:00,A2,,,n/a,,,,,,,,\n\
             2020-01-05 09:00:00,,22.6,120.3,1,1,1,1,1,1,1,1,1\n",
        );

        let file = ReadingReader::new().read_file(&path).unwrap();
        assert_eq!(file.readings.len(), 2);
        assert_eq!(file.dropped_rows, 2);

        let first = &file.readings[0];
        assert_eq!(first.station_id, "A1");
        assert_eq!(first.latitude, Some(22.6));
        assert_eq!(first.values.pm25, Some(15.5));
        assert_eq!(first.values.wind_direction, Some(45.0));

        let second = &file.readings[1];
        assert_eq!(second.latitude, None);
        assert_eq!(second.values.pm25, None);
    }

    #[test]
    fn test_read_all_filters_by_pattern_and_skips_bad_files() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "kaohsiung_airbox_hourly_with_wind_a.csv",
            "2020-01-05 07:00:00,A1,22.6,120.3,15.5,,,,,,,,\n",
        );
        write(
            &dir,
            "kaohsiung_airbox_hourly_with_wind_b.csv",
            "2020-01-06 07:00:00,A2,22.7,120.4,25.5,,,,,,,,\n",
        );
        write(&dir, "unrelated.csv", "2020-01-06 07:00:00,X,0,0,1,,,,,,,,\n");
        fs::write(
            dir.path().join("kaohsiung_airbox_hourly_with_wind_bad.csv"),
            "no,useful,columns\n1,2,3\n",
        )
        .unwrap();

        let set = ReadingReader::new().read_all(dir.path()).unwrap();
        assert_eq!(set.files_read, 2);
        assert_eq!(set.files_skipped, 1);
        let ids: Vec<&str> = set.readings.iter().map(|r| r.station_id.as_str()).collect();
        assert_eq!(ids, vec!["A1", "A2"]);
    }

    #[test]
    fn test_read_all_without_matching_files() {
        let dir = TempDir::new().unwrap();
        write(&dir, "other.csv", "");
        assert!(matches!(
            ReadingReader::new().read_all(dir.path()),
            Err(ProcessingError::MissingData(_))
        ));
    }
}
