//! Radius queries over geohash-keyed range stores.
//!
//! A search circle is translated into at most 9 geohash key ranges, each
//! range is read concurrently from a [`RangeStore`], and the entries that
//! come back are filtered by exact great-circle distance.
//!
//! ```rust
//! use geoscan::prelude::*;
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> geoscan::Result<()> {
//! let store = Arc::new(MemoryRangeStore::new());
//! store.set_location("ferry-building", GeoCoordinate::new(37.7955, -122.3937)?)?;
//!
//! let center = GeoCoordinate::new(37.7946, -122.3999)?;
//! let session = QuerySession::new(store, GeoQuery::new(center, 1_000.0), QueryConfig::default());
//!
//! let (done_tx, done_rx) = tokio::sync::oneshot::channel();
//! session.execute(
//!     |key, location| println!("{key} at {location}"),
//!     move || {
//!         let _ = done_tx.send(());
//!     },
//!     |error| eprintln!("query failed: {error}"),
//! )?;
//! done_rx.await.ok();
//! # Ok(())
//! # }
//! ```

pub mod compute;
pub mod config;
pub mod error;
pub mod query;
pub mod storage;
pub mod types;

pub use config::QueryConfig;
pub use error::{GeoScanError, Result, StoreError};

pub use geo::{Point, Rect};

pub use compute::distance::{bounding_box_bits, bounding_box_bits_at, distance};
pub use compute::geohash::{GeoHash, Neighbors, cell_bounds, neighbor_cells};
pub use compute::range::{KeyRange, QueryPlan, merge_ranges};

pub use query::{
    CancelHandle, ExecuteStatus, GeoQuery, QuerySession, QueryState, QueryStream, QueryTimeout,
};

pub use storage::{MemoryRangeStore, RangeStore};

pub use types::{GeoCoordinate, GeoHit, LocationRecord, RawEntry, StoredEntry};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {

    pub use crate::{GeoScanError, Result};

    pub use crate::{GeoCoordinate, GeoHash, distance};

    pub use crate::{GeoQuery, QueryConfig, QuerySession, QueryState, QueryTimeout};

    pub use crate::{MemoryRangeStore, RangeStore};
}
