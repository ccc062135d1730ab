//! Coordinate model for resolved locations

use crate::{EtlError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Geographic position of a resolved location
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(try_from = "UncheckedCoordinate")]
pub struct Coordinate {
    /// Latitude in decimal degrees
    latitude: f64,
    /// Longitude in decimal degrees
    longitude: f64,
}

/// Deserialized form, validated through [`Coordinate::new`]
#[derive(Deserialize)]
struct UncheckedCoordinate {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<UncheckedCoordinate> for Coordinate {
    type Error = EtlError;

    fn try_from(raw: UncheckedCoordinate) -> Result<Self> {
        Coordinate::new(raw.latitude, raw.longitude)
    }
}

impl Coordinate {
    /// Create a coordinate, rejecting values outside the valid ranges
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(EtlError::validation(format!(
                "Latitude {latitude} is outside [-90, 90]"
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(EtlError::validation(format!(
                "Longitude {longitude} is outside [-180, 180]"
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    #[must_use]
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    #[must_use]
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Format location as coordinates string
    #[must_use]
    pub fn format_coordinates(&self) -> String {
        format!("{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.format_coordinates())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_deserialize_validates_ranges() {
        let coordinate: Coordinate =
            serde_json::from_str(r#"{"latitude": 13.0827, "longitude": 80.2707}"#).unwrap();
        assert_eq!(coordinate, Coordinate::new(13.0827, 80.2707).unwrap());

        let out_of_range =
            serde_json::from_str::<Coordinate>(r#"{"latitude": 91.0, "longitude": 0.0}"#);
        assert!(out_of_range.unwrap_err().to_string().contains("Latitude 91"));
    }

    #[test]
    fn test_coordinate_accessors() {
        let coordinate = Coordinate::new(13.0827, 80.2707).unwrap();
        assert_eq!(coordinate.latitude(), 13.0827);
        assert_eq!(coordinate.longitude(), 80.2707);
        assert_eq!(coordinate.to_string(), "(13.0827, 80.2707)");
    }

    #[rstest]
    #[case(90.0, 180.0)]
    #[case(-90.0, -180.0)]
    #[case(0.0, 0.0)]
    fn test_coordinate_bounds_are_inclusive(#[case] lat: f64, #[case] lon: f64) {
        assert!(Coordinate::new(lat, lon).is_ok());
    }

    #[rstest]
    #[case(90.5, 0.0)]
    #[case(0.0, -180.1)]
    #[case(f64::NAN, 0.0)]
    #[case(0.0, f64::INFINITY)]
    fn test_coordinate_rejects_out_of_range(#[case] lat: f64, #[case] lon: f64) {
        assert!(matches!(
            Coordinate::new(lat, lon),
            Err(EtlError::Validation { .. })
        ));
    }
}
