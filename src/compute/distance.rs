//! Great-circle distance and geohash cell sizing.
//!
//! Distances use the haversine formula from the `geo` crate on a sphere of
//! mean Earth radius. The same radius drives the degree conversions below so
//! that a point within `radius` meters of a center (by [`distance`]) is always
//! inside the degree box those conversions produce.

use crate::compute::geohash::MAX_BITS;
use crate::types::GeoCoordinate;
use geo::{Distance, Haversine};
use once_cell::sync::Lazy;
use std::f64::consts::FRAC_PI_2;

/// Mean Earth radius in meters (IUGG), as used by `geo::Haversine`.
pub const EARTH_MEAN_RADIUS: f64 = 6_371_008.8;

/// Length of one degree of latitude (and of longitude at the equator).
pub const METERS_PER_DEGREE: f64 = EARTH_MEAN_RADIUS * std::f64::consts::PI / 180.0;

/// Great-circle distance between two coordinates in meters.
///
/// # Examples
///
/// ```rust
/// use geoscan::{GeoCoordinate, compute::distance::distance};
///
/// let nyc = GeoCoordinate::new(40.7128, -74.0060).unwrap();
/// let la = GeoCoordinate::new(34.0522, -118.2437).unwrap();
///
/// let dist = distance(&nyc, &la);
/// assert!(dist > 3_900_000.0 && dist < 4_000_000.0); // ~3,944 km
/// assert_eq!(distance(&nyc, &nyc), 0.0);
/// ```
pub fn distance(a: &GeoCoordinate, b: &GeoCoordinate) -> f64 {
    Haversine.distance(a.to_point(), b.to_point())
}

/// Half-height in degrees of a circle of `radius_meters`.
pub fn latitude_delta_degrees(radius_meters: f64) -> f64 {
    (radius_meters / EARTH_MEAN_RADIUS).to_degrees().min(180.0)
}

/// Half-width in degrees of a circle of `radius_meters` around `center`.
///
/// Returns 180 when the circle reaches a pole, since every longitude is
/// then within range.
pub fn longitude_delta_degrees(center: &GeoCoordinate, radius_meters: f64) -> f64 {
    let angular = radius_meters / EARTH_MEAN_RADIUS;
    let latitude = center.latitude().to_radians().abs();

    if latitude + angular >= FRAC_PI_2 {
        return 180.0;
    }

    (angular.sin() / latitude.cos()).asin().to_degrees()
}

/// Dimensions of a geohash cell at a given bit precision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellSize {
    pub bits: u8,
    pub width_deg: f64,
    pub height_deg: f64,
    /// Width at the equator.
    pub width_m: f64,
    pub height_m: f64,
}

impl CellSize {
    fn for_bits(bits: u8) -> Self {
        let lng_bits = bits.div_ceil(2);
        let lat_bits = bits / 2;
        let width_deg = 360.0 / (1u64 << lng_bits) as f64;
        let height_deg = 180.0 / (1u64 << lat_bits) as f64;

        Self {
            bits,
            width_deg,
            height_deg,
            width_m: width_deg * METERS_PER_DEGREE,
            height_m: height_deg * METERS_PER_DEGREE,
        }
    }
}

/// Cell sizes indexed by bit precision, 0..=60.
pub static CELL_SIZES: Lazy<Vec<CellSize>> =
    Lazy::new(|| (0..=MAX_BITS).map(CellSize::for_bits).collect());

/// Size of a cell at `bits` precision (clamped to the table).
pub fn cell_size(bits: u8) -> CellSize {
    CELL_SIZES[bits.min(MAX_BITS) as usize]
}

/// Largest precision whose equatorial cell width and height both reach
/// `radius_meters`. Never returns 0.
///
/// # Examples
///
/// ```rust
/// use geoscan::compute::distance::{bounding_box_bits, cell_size};
///
/// let bits = bounding_box_bits(1_000.0);
/// assert!(cell_size(bits).height_m >= 1_000.0);
/// assert!(cell_size(bits + 1).height_m < 1_000.0 || cell_size(bits + 1).width_m < 1_000.0);
/// ```
pub fn bounding_box_bits(radius_meters: f64) -> u8 {
    CELL_SIZES
        .iter()
        .skip(1)
        .rev()
        .find(|cell| cell.width_m >= radius_meters && cell.height_m >= radius_meters)
        .map_or(1, |cell| cell.bits)
}

/// Largest precision at which the cell containing `center` plus its 8
/// neighbours covers every point within `radius_meters` of `center`.
///
/// Unlike [`bounding_box_bits`] this accounts for meridians converging
/// toward the poles. Never returns 0.
pub fn bounding_box_bits_at(center: &GeoCoordinate, radius_meters: f64) -> u8 {
    let lat_delta = latitude_delta_degrees(radius_meters);
    let lng_delta = longitude_delta_degrees(center, radius_meters);

    CELL_SIZES
        .iter()
        .skip(1)
        .rev()
        .find(|cell| cell.height_deg >= lat_delta && cell.width_deg >= lng_delta)
        .map_or(1, |cell| cell.bits)
}
