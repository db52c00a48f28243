//! Location model for selected map points

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Decimal places used when deriving file identifiers from coordinates
pub const FILE_ID_PRECISION: usize = 4;

/// A selected point on the map
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Location {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
}

impl Location {
    /// Create a new location
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Identifier shared by the raw dataset file, the preprocess request and the
    /// downloaded file of this location
    #[must_use]
    pub fn file_id(&self) -> FileId {
        FileId(format!(
            "{:.prec$}_{:.prec$}",
            self.latitude,
            self.longitude,
            prec = FILE_ID_PRECISION
        ))
    }

    /// Format location as coordinates string
    #[must_use]
    pub fn format_coordinates(&self) -> String {
        format!("{:.4}, {:.4}", self.latitude, self.longitude)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let lat_ok = self.latitude.is_finite() && (-90.0..=90.0).contains(&self.latitude);
        let lon_ok = self.longitude.is_finite() && (-180.0..=180.0).contains(&self.longitude);
        if lat_ok && lon_ok {
            Ok(())
        } else {
            Err(ValidationError::CoordinateOutOfRange {
                latitude: self.latitude,
                longitude: self.longitude,
            })
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.format_coordinates())
    }
}

/// Coordinate-derived identifier, e.g. `19.6565_73.1556`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(String);

impl FileId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the raw dataset file the preprocessing service reads
    #[must_use]
    pub fn dataset_file_name(&self) -> String {
        format!("nasa_power_data_{}.csv", self.0)
    }

    /// Name of the cleaned file handed to the user
    #[must_use]
    pub fn download_file_name(&self) -> String {
        format!("cleaned_data_{}.csv", self.0)
    }
}

impl From<String> for FileId {
    fn from(value: String) -> Self {
        FileId(value)
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(10.0, 20.0, "10.0000_20.0000")]
    #[case(19.6565, 73.1556, "19.6565_73.1556")]
    #[case(-33.868_82, 151.209_29, "-33.8688_151.2093")]
    fn test_file_id_format(#[case] lat: f64, #[case] lon: f64, #[case] expected: &str) {
        assert_eq!(Location::new(lat, lon).file_id().as_str(), expected);
    }

    #[test]
    fn test_file_names() {
        let id = Location::new(10.0, 20.0).file_id();
        assert_eq!(id.dataset_file_name(), "nasa_power_data_10.0000_20.0000.csv");
        assert_eq!(id.download_file_name(), "cleaned_data_10.0000_20.0000.csv");
    }

    #[rstest]
    #[case(91.0, 0.0)]
    #[case(0.0, -180.5)]
    #[case(f64::NAN, 0.0)]
    fn test_out_of_range_rejected(#[case] lat: f64, #[case] lon: f64) {
        assert!(matches!(
            Location::new(lat, lon).validate(),
            Err(ValidationError::CoordinateOutOfRange { .. })
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(Location::new(46.8182, 8.2275).to_string(), "(46.8182, 8.2275)");
    }
}
