use serde::{Deserialize, Serialize};
use validator::Validate;

/// Canonical station coordinates. Authoritative over coordinates carried on readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Station {
    #[validate(length(min = 1))]
    pub station_id: String,

    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,

    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
}

impl Station {
    pub fn new(station_id: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            station_id: station_id.into(),
            latitude,
            longitude,
        }
    }

    pub fn coordinates(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_station_validation() {
        let station = Station::new("74DA38F7C", 22.7312, 120.3286);
        assert!(station.validate().is_ok());
        assert_eq!(station.coordinates(), (22.7312, 120.3286));
    }

    #[test]
    fn test_invalid_coordinates() {
        let station = Station::new("74DA38F7C", 91.0, 120.3286);
        assert!(station.validate().is_err());

        let unnamed = Station::new("", 22.7, 120.3);
        assert!(unnamed.validate().is_err());
    }
}
