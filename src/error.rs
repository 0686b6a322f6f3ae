//! Error types for geoscan.

use crate::compute::range::KeyRange;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GeoScanError>;

/// Error reported by a [`RangeStore`](crate::storage::RangeStore) read.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct StoreError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap a backend error, keeping it as the error source.
    pub fn with_source<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Error)]
pub enum GeoScanError {
    #[error("invalid location: {0}")]
    InvalidLocation(String),

    #[error("invalid radius: {0}")]
    InvalidRadius(String),

    #[error("geohash precision must be between 1 and 12, got {0}")]
    InvalidPrecision(usize),

    #[error("invalid geohash: {0}")]
    InvalidGeoHash(String),

    #[error("range read {range} failed: {source}")]
    StoreReadFailure {
        range: KeyRange,
        #[source]
        source: StoreError,
    },

    #[error("invalid location record: {0}")]
    InvalidRecord(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("runtime unavailable: {0}")]
    Runtime(String),
}

impl GeoScanError {
    /// True for errors raised by the backing store rather than by the caller's input.
    pub fn is_store_failure(&self) -> bool {
        matches!(self, GeoScanError::StoreReadFailure { .. })
    }
}

impl From<geohash::GeohashError> for GeoScanError {
    fn from(err: geohash::GeohashError) -> Self {
        GeoScanError::InvalidGeoHash(err.to_string())
    }
}

impl From<serde_json::Error> for GeoScanError {
    fn from(err: serde_json::Error) -> Self {
        GeoScanError::InvalidRecord(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_failure_display() {
        let err = GeoScanError::StoreReadFailure {
            range: KeyRange::new("s0", "s1"),
            source: StoreError::new("connection reset"),
        };

        assert!(err.is_store_failure());
        assert_eq!(
            err.to_string(),
            "range read [s0, s1) failed: connection reset"
        );
    }

    #[test]
    fn test_store_error_keeps_source() {
        use std::error::Error as _;

        let io = std::io::Error::other("socket closed");
        let err = StoreError::with_source("read aborted", io);

        assert_eq!(err.message(), "read aborted");
        assert!(err.source().is_some());
    }
}
