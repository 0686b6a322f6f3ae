//! Core value types shared by the geocoder, the stores and the query executor.

use crate::compute::geohash::GeoHash;
use crate::compute::validation::validate_coordinate;
use crate::error::{GeoScanError, Result};
use bytes::Bytes;
use geo::Point;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A validated latitude/longitude pair in degrees.
///
/// # Examples
///
/// ```rust
/// use geoscan::GeoCoordinate;
///
/// let sf = GeoCoordinate::new(37.7749, -122.4194).unwrap();
/// assert_eq!(sf.latitude(), 37.7749);
///
/// assert!(GeoCoordinate::new(91.0, 0.0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "(f64, f64)", into = "(f64, f64)")]
pub struct GeoCoordinate {
    latitude: f64,
    longitude: f64,
}

impl GeoCoordinate {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        validate_coordinate(latitude, longitude)?;
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Build a coordinate from values already known to be in range.
    pub(crate) fn new_unchecked(latitude: f64, longitude: f64) -> Self {
        debug_assert!(validate_coordinate(latitude, longitude).is_ok());
        Self {
            latitude,
            longitude,
        }
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn to_point(self) -> Point {
        Point::new(self.longitude, self.latitude)
    }
}

impl fmt::Display for GeoCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.latitude, self.longitude)
    }
}

impl From<GeoCoordinate> for Point {
    fn from(coord: GeoCoordinate) -> Self {
        coord.to_point()
    }
}

impl TryFrom<Point> for GeoCoordinate {
    type Error = GeoScanError;

    fn try_from(point: Point) -> Result<Self> {
        GeoCoordinate::new(point.y(), point.x())
    }
}

impl TryFrom<(f64, f64)> for GeoCoordinate {
    type Error = GeoScanError;

    fn try_from((latitude, longitude): (f64, f64)) -> Result<Self> {
        GeoCoordinate::new(latitude, longitude)
    }
}

impl From<GeoCoordinate> for (f64, f64) {
    fn from(coord: GeoCoordinate) -> Self {
        (coord.latitude, coord.longitude)
    }
}

/// Value stored for each key: the geohash tag plus the exact location.
///
/// Serialized as `{"g": "<geohash>", "l": [lat, lng]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    #[serde(rename = "g")]
    pub geohash: String,
    #[serde(rename = "l")]
    pub location: GeoCoordinate,
}

impl LocationRecord {
    /// Tag `location` with its geohash at `precision` characters.
    pub fn new(location: GeoCoordinate, precision: usize) -> Result<Self> {
        let geohash = GeoHash::encode(&location, precision)?;
        Ok(Self {
            geohash: geohash.into_string(),
            location,
        })
    }

    pub fn to_bytes(&self) -> Result<Bytes> {
        Ok(Bytes::from(serde_json::to_vec(self)?))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// One `(key, raw value)` pair as returned by a range read.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEntry {
    pub key: String,
    pub value: Bytes,
}

impl RawEntry {
    pub fn new(key: impl Into<String>, value: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn decode(self) -> Result<StoredEntry> {
        let record = LocationRecord::from_bytes(&self.value).map_err(|e| {
            GeoScanError::InvalidRecord(format!("key '{}': {}", self.key, e))
        })?;
        Ok(StoredEntry {
            key: self.key,
            geohash: record.geohash,
            location: record.location,
        })
    }
}

/// A decoded store entry.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEntry {
    pub key: String,
    pub geohash: String,
    pub location: GeoCoordinate,
}

/// A single match delivered by the stream API.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoHit {
    pub key: String,
    pub location: GeoCoordinate,
}
