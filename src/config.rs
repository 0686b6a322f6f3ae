//! Query configuration.

use crate::compute::geohash::MAX_PRECISION;
use crate::error::{GeoScanError, Result};
use serde::de::Error;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Settings shared by every query session built from it.
///
/// # Examples
///
/// ```rust
/// use geoscan::QueryConfig;
///
/// let config = QueryConfig::default();
/// assert_eq!(config.max_query_radius_m, 100_000.0);
/// assert_eq!(config.location_field, "g");
///
/// let json = r#"{ "max_query_radius_m": 5000.0, "default_limit": 25 }"#;
/// let config = QueryConfig::from_json(json).unwrap();
/// assert_eq!(config.default_limit, Some(25));
/// assert!(config.strict_filtering);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Largest radius a query may use, in meters
    #[serde(default = "QueryConfig::default_max_query_radius")]
    pub max_query_radius_m: f64,

    /// Name of the indexed field holding each entry's geohash
    #[serde(default = "QueryConfig::default_location_field")]
    pub location_field: String,

    /// Geohash length written by `LocationRecord::new` (1-12)
    #[serde(default = "QueryConfig::default_stored_precision")]
    pub stored_precision: usize,

    /// Per-range read limit applied when a query sets none
    #[serde(default)]
    pub default_limit: Option<usize>,

    /// Drop entries outside the exact radius
    #[serde(default = "QueryConfig::default_strict_filtering")]
    pub strict_filtering: bool,

    /// Deadline used by `QueryTimeout::with_config`
    #[serde(default = "QueryConfig::default_query_timeout_ms")]
    pub query_timeout_ms: u64,
}

impl QueryConfig {
    const fn default_max_query_radius() -> f64 {
        100_000.0
    }

    fn default_location_field() -> String {
        "g".to_string()
    }

    const fn default_stored_precision() -> usize {
        10
    }

    const fn default_strict_filtering() -> bool {
        true
    }

    const fn default_query_timeout_ms() -> u64 {
        7_000
    }

    pub fn with_max_query_radius(mut self, meters: f64) -> Self {
        self.max_query_radius_m = meters;
        self
    }

    pub fn with_default_limit(mut self, limit: usize) -> Self {
        self.default_limit = Some(limit);
        self
    }

    pub fn with_strict_filtering(mut self, strict: bool) -> Self {
        self.strict_filtering = strict;
        self
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout_ms = timeout.as_millis().min(u64::MAX as u128) as u64;
        self
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    /// Clamp `radius_meters` to the configured maximum.
    ///
    /// ```rust
    /// use geoscan::QueryConfig;
    ///
    /// let config = QueryConfig::default();
    /// assert_eq!(config.clamp_radius(250_000.0), 100_000.0);
    /// assert_eq!(config.clamp_radius(800.0), 800.0);
    /// ```
    pub fn clamp_radius(&self, radius_meters: f64) -> f64 {
        radius_meters.min(self.max_query_radius_m)
    }

    /// Validate configuration values
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !self.max_query_radius_m.is_finite() || self.max_query_radius_m <= 0.0 {
            return Err("Maximum query radius must be positive and finite".to_string());
        }

        if self.location_field.is_empty() {
            return Err("Location field must not be empty".to_string());
        }

        if !(1..=MAX_PRECISION).contains(&self.stored_precision) {
            return Err(format!(
                "Stored precision must be between 1 and {}",
                MAX_PRECISION
            ));
        }

        if self.default_limit == Some(0) {
            return Err("Default limit must be greater than zero".to_string());
        }

        if self.query_timeout_ms == 0 {
            return Err("Query timeout must be greater than zero".to_string());
        }

        Ok(())
    }

    /// Load configuration from JSON string
    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        let config: QueryConfig = serde_json::from_str(json)?;
        if let Err(e) = config.validate() {
            return Err(serde_json::Error::custom(e));
        }
        Ok(config)
    }

    /// Save configuration as JSON string
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load configuration from TOML string (requires toml feature)
    #[cfg(feature = "toml")]
    pub fn from_toml(toml_str: &str) -> std::result::Result<Self, toml::de::Error> {
        let config: QueryConfig = toml::from_str(toml_str)?;
        if let Err(e) = config.validate() {
            return Err(toml::de::Error::custom(e));
        }
        Ok(config)
    }

    /// Save configuration as TOML string (requires toml feature)
    #[cfg(feature = "toml")]
    pub fn to_toml(&self) -> std::result::Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Read a configuration file, picking the format from its extension.
    ///
    /// `.json` is always supported; `.toml` needs the `toml` feature.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => {
                Self::from_json(&contents).map_err(|e| GeoScanError::Config(e.to_string()))
            }
            #[cfg(feature = "toml")]
            Some("toml") => {
                Self::from_toml(&contents).map_err(|e| GeoScanError::Config(e.to_string()))
            }
            other => Err(GeoScanError::Config(format!(
                "Unsupported configuration format: {}",
                other.unwrap_or("<none>")
            ))),
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_query_radius_m: Self::default_max_query_radius(),
            location_field: Self::default_location_field(),
            stored_precision: Self::default_stored_precision(),
            default_limit: None,
            strict_filtering: Self::default_strict_filtering(),
            query_timeout_ms: Self::default_query_timeout_ms(),
        }
    }
}
