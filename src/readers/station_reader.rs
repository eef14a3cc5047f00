use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};
use validator::Validate;

use crate::error::Result;
use crate::models::Station;

#[derive(Debug, Deserialize)]
struct StationRow {
    #[serde(rename = "deviceId")]
    device_id: String,
    lat: Option<f64>,
    lon: Option<f64>,
}

/// Reads station metadata (`deviceId, lat, lon`, other columns ignored).
pub struct StationReader;

impl StationReader {
    pub fn new() -> Self {
        Self
    }

    /// Rows that fail to parse or carry out-of-range coordinates are skipped with a warning.
    pub fn read_stations(&self, path: &Path) -> Result<Vec<Station>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)?;

        let mut stations = Vec::new();
        for (line, row) in reader.deserialize::<StationRow>().enumerate() {
            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    warn!("Skipping station row {} in {}: {}", line + 2, path.display(), e);
                    continue;
                }
            };

            let (Some(lat), Some(lon)) = (row.lat, row.lon) else {
                warn!("Station '{}' has no coordinates, skipping", row.device_id);
                continue;
            };

            let station = Station::new(row.device_id, lat, lon);
            if let Err(e) = station.validate() {
                warn!("Station '{}' rejected: {}", station.station_id, e);
                continue;
            }
            stations.push(station);
        }

        debug!("Loaded {} stations from {}", stations.len(), path.display());
        Ok(stations)
    }

    /// Stations keyed by id. The first row wins on duplicate ids.
    pub fn read_stations_map(&self, path: &Path) -> Result<HashMap<String, Station>> {
        let stations = self.read_stations(path)?;
        let mut map = HashMap::with_capacity(stations.len());

        for station in stations {
            if map.contains_key(&station.station_id) {
                warn!("Duplicate station id '{}' ignored", station.station_id);
                continue;
            }
            map.insert(station.station_id.clone(), station);
        }

        Ok(map)
    }
}

impl Default for StationReader {
    fn default() -> Self {
        Self::new()
    }
}
