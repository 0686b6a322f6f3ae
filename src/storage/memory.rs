use super::{RangeReadResult, RangeStore};
use crate::compute::range::KeyRange;
use crate::config::QueryConfig;
use crate::error::{GeoScanError, Result, StoreError};
use crate::types::{GeoCoordinate, LocationRecord, RawEntry};
use bytes::Bytes;
use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Default)]
struct Index {
    /// key -> geohash, to find the index entry on update and removal
    hashes: FxHashMap<String, String>,
    /// (geohash, key) -> encoded record, ordered for range reads
    entries: BTreeMap<(String, String), Bytes>,
}

impl Index {
    fn insert(&mut self, key: String, geohash: String, value: Bytes) {
        if let Some(previous) = self.hashes.insert(key.clone(), geohash.clone()) {
            self.entries.remove(&(previous, key.clone()));
        }
        self.entries.insert((geohash, key), value);
    }

    fn remove(&mut self, key: &str) -> Option<Bytes> {
        let geohash = self.hashes.remove(key)?;
        self.entries.remove(&(geohash, key.to_string()))
    }

    fn get(&self, key: &str) -> Option<&Bytes> {
        let geohash = self.hashes.get(key)?;
        self.entries.get(&(geohash.clone(), key.to_string()))
    }

    fn range(&self, range: &KeyRange, limit: Option<usize>) -> Vec<RawEntry> {
        let lower = Bound::Included((range.start.clone(), String::new()));
        let upper = Bound::Excluded((range.end.clone(), String::new()));

        self.entries
            .range((lower, upper))
            .take(limit.unwrap_or(usize::MAX))
            .map(|((_, key), value)| RawEntry::new(key.clone(), value.clone()))
            .collect()
    }
}

/// Ordered in-memory [`RangeStore`].
///
/// Values are stored as encoded [`LocationRecord`]s and indexed by their
/// geohash, so a range read walks a `BTreeMap` in geohash order.
///
/// # Examples
///
/// ```rust
/// use geoscan::{GeoCoordinate, KeyRange, MemoryRangeStore, RangeStore};
///
/// let store = MemoryRangeStore::new();
/// store.set_location("sf", GeoCoordinate::new(37.7749, -122.4194).unwrap()).unwrap();
///
/// let read = store.query_range("g", &KeyRange::new("9q8", "9q9"), None);
/// let entries = futures::executor::block_on(read).unwrap();
/// assert_eq!(entries.len(), 1);
/// assert_eq!(entries[0].key, "sf");
/// ```
pub struct MemoryRangeStore {
    index: RwLock<Index>,
    field: String,
    precision: usize,
    reads: AtomicUsize,
    read_delay: Option<Duration>,
}

impl MemoryRangeStore {
    /// Store indexing the `"g"` field at 10-character precision.
    pub fn new() -> Self {
        let config = QueryConfig::default();
        Self::with_layout(config.location_field, config.stored_precision)
    }

    /// Store matching the field name and precision of `config`.
    ///
    /// Fails with `Config` when `config` does not validate.
    pub fn from_config(config: &QueryConfig) -> Result<Self> {
        config.validate().map_err(GeoScanError::Config)?;
        Ok(Self::with_layout(
            config.location_field.clone(),
            config.stored_precision,
        ))
    }

    fn with_layout(field: String, precision: usize) -> Self {
        Self {
            index: RwLock::new(Index::default()),
            field,
            precision,
            reads: AtomicUsize::new(0),
            read_delay: None,
        }
    }

    /// Delay every range read by `delay`, simulating a remote backend.
    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = Some(delay);
        self
    }

    /// Insert or move `key` to `location`.
    pub fn set_location(&self, key: impl Into<String>, location: GeoCoordinate) -> Result<()> {
        let record = LocationRecord::new(location, self.precision)?;
        let value = record.to_bytes()?;
        self.index.write().insert(key.into(), record.geohash, value);
        Ok(())
    }

    /// Insert a value as-is under `geohash`, bypassing record encoding.
    pub fn set_raw(&self, key: impl Into<String>, geohash: impl Into<String>, value: impl Into<Bytes>) {
        self.index.write().insert(key.into(), geohash.into(), value.into());
    }

    /// Remove `key`, returning its last location when it decoded.
    pub fn remove_location(&self, key: &str) -> Option<GeoCoordinate> {
        let value = self.index.write().remove(key)?;
        LocationRecord::from_bytes(&value)
            .ok()
            .map(|record| record.location)
    }

    pub fn get_location(&self, key: &str) -> Option<GeoCoordinate> {
        let index = self.index.read();
        let value = index.get(key)?;
        LocationRecord::from_bytes(value)
            .ok()
            .map(|record| record.location)
    }

    pub fn len(&self) -> usize {
        self.index.read().hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of range reads served so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    pub fn field(&self) -> &str {
        &self.field
    }
}

impl Default for MemoryRangeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RangeStore for MemoryRangeStore {
    fn query_range(
        &self,
        field: &str,
        range: &KeyRange,
        limit: Option<usize>,
    ) -> BoxFuture<'static, RangeReadResult> {
        self.reads.fetch_add(1, Ordering::Relaxed);

        if field != self.field {
            let error = StoreError::with_source(
                format!("no index on field '{}'", field),
                GeoScanError::Config(format!("indexed field is '{}'", self.field)),
            );
            return futures::future::ready(Err(error)).boxed();
        }

        let entries = self.index.read().range(range, limit);
        log::trace!("Range {} returned {} entries", range, entries.len());

        match self.read_delay {
            Some(delay) => async move {
                tokio::time::sleep(delay).await;
                Ok(entries)
            }
            .boxed(),
            None => futures::future::ready(Ok(entries)).boxed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    fn coord(lat: f64, lng: f64) -> GeoCoordinate {
        GeoCoordinate::new(lat, lng).unwrap()
    }

    #[test]
    fn test_set_get_remove() {
        let store = MemoryRangeStore::new();
        assert!(store.is_empty());

        store.set_location("a", coord(1.0, 2.0)).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get_location("a"), Some(coord(1.0, 2.0)));

        assert_eq!(store.remove_location("a"), Some(coord(1.0, 2.0)));
        assert_eq!(store.get_location("a"), None);
        assert_eq!(store.remove_location("a"), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_move_updates_index() {
        let store = MemoryRangeStore::new();
        store.set_location("car", coord(37.7749, -122.4194)).unwrap();
        store.set_location("car", coord(0.0, 0.0)).unwrap();

        assert_eq!(store.len(), 1);
        let old = block_on(store.query_range("g", &KeyRange::new("9", "b"), None)).unwrap();
        assert!(old.is_empty());

        let new = block_on(store.query_range("g", &KeyRange::new("s", "t"), None)).unwrap();
        assert_eq!(new.len(), 1);
    }

    #[test]
    fn test_range_order_and_bounds() {
        let store = MemoryRangeStore::new();
        store.set_raw("b", "s00", &b"{}"[..]);
        store.set_raw("a", "s01", &b"{}"[..]);
        store.set_raw("c", "s01", &b"{}"[..]);
        store.set_raw("d", "s02", &b"{}"[..]);

        let entries = block_on(store.query_range("g", &KeyRange::new("s00", "s02"), None)).unwrap();
        let keys: Vec<_> = entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);

        let limited = block_on(store.query_range("g", &KeyRange::new("s00", "s02"), Some(2))).unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(store.reads(), 2);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = QueryConfig {
            stored_precision: 0,
            ..QueryConfig::default()
        };
        assert!(matches!(
            MemoryRangeStore::from_config(&config),
            Err(GeoScanError::Config(_))
        ));
    }

    #[test]
    fn test_unknown_field_fails() {
        let store = MemoryRangeStore::new();
        let err = block_on(store.query_range("geo", &KeyRange::new("s", "t"), None)).unwrap_err();
        assert!(err.message().contains("geo"));
    }

    #[test]
    fn test_precision_follows_config() {
        let config = QueryConfig {
            stored_precision: 5,
            ..QueryConfig::default()
        };
        let store = MemoryRangeStore::from_config(&config).unwrap();
        store.set_location("x", coord(0.0, 0.0)).unwrap();

        let entries = block_on(store.query_range("g", &KeyRange::new("s0000", "s0001"), None)).unwrap();
        let record = LocationRecord::from_bytes(&entries[0].value).unwrap();
        assert_eq!(record.geohash, "s0000");
    }
}
