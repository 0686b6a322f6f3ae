//! Validation for geographic coordinates and search radii.

use crate::error::{GeoScanError, Result};

/// Validates latitude and longitude are finite and in range.
///
/// Longitude: [-180.0, 180.0], Latitude: [-90.0, 90.0]
///
/// # Examples
///
/// ```
/// use geoscan::compute::validation::validate_coordinate;
///
/// assert!(validate_coordinate(40.7128, -74.0060).is_ok());
/// assert!(validate_coordinate(95.0, -74.0).is_err());
/// assert!(validate_coordinate(40.0, 200.0).is_err());
/// ```
pub fn validate_coordinate(latitude: f64, longitude: f64) -> Result<()> {
    if !latitude.is_finite() {
        return Err(GeoScanError::InvalidLocation(format!(
            "Latitude must be finite, got: {}",
            latitude
        )));
    }

    if !longitude.is_finite() {
        return Err(GeoScanError::InvalidLocation(format!(
            "Longitude must be finite, got: {}",
            longitude
        )));
    }

    if !(-90.0..=90.0).contains(&latitude) {
        return Err(GeoScanError::InvalidLocation(format!(
            "Latitude out of range [-90.0, 90.0]: {}",
            latitude
        )));
    }

    if !(-180.0..=180.0).contains(&longitude) {
        return Err(GeoScanError::InvalidLocation(format!(
            "Longitude out of range [-180.0, 180.0]: {}",
            longitude
        )));
    }

    Ok(())
}

/// Validates a search radius against the configured maximum.
///
/// # Examples
///
/// ```
/// use geoscan::compute::validation::validate_radius;
///
/// assert!(validate_radius(1_000.0, 100_000.0).is_ok());
/// assert!(validate_radius(0.0, 100_000.0).is_err());
/// assert!(validate_radius(200_000.0, 100_000.0).is_err());
/// ```
pub fn validate_radius(radius_meters: f64, max_radius_meters: f64) -> Result<()> {
    if !radius_meters.is_finite() {
        return Err(GeoScanError::InvalidRadius(format!(
            "Radius must be finite, got: {}",
            radius_meters
        )));
    }

    if radius_meters <= 0.0 {
        return Err(GeoScanError::InvalidRadius(format!(
            "Radius must be positive, got: {}",
            radius_meters
        )));
    }

    if radius_meters > max_radius_meters {
        return Err(GeoScanError::InvalidRadius(format!(
            "Radius {} m exceeds the maximum query radius of {} m",
            radius_meters, max_radius_meters
        )));
    }

    Ok(())
}
