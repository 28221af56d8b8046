use serde::{Deserialize, Serialize};

/// Geographic position in decimal degrees (WGS84).
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CoordinateError {
    NotFinite,
    LatitudeOutOfRange,
    LongitudeOutOfRange,
}

impl std::fmt::Display for CoordinateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoordinateError::NotFinite => write!(f, "coordinate is not a finite number"),
            CoordinateError::LatitudeOutOfRange => write!(f, "latitude outside [-90, 90]"),
            CoordinateError::LongitudeOutOfRange => write!(f, "longitude outside [-180, 180]"),
        }
    }
}

impl std::error::Error for CoordinateError {}

impl LatLon {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Builds a position, rejecting values no map could place a marker at.
    pub fn checked(lat: f64, lon: f64) -> Result<Self, CoordinateError> {
        if !lat.is_finite() || !lon.is_finite() {
            return Err(CoordinateError::NotFinite);
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(CoordinateError::LatitudeOutOfRange);
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(CoordinateError::LongitudeOutOfRange);
        }
        Ok(Self { lat, lon })
    }
}
