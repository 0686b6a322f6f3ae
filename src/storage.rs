//! Range-read store abstraction.
//!
//! The query executor only needs one capability from a backend: read every
//! entry whose indexed field falls inside a half-open key range, in key
//! order, optionally stopping after `limit` entries. Backends decide how the
//! read is carried out; the returned future must be `'static` so it can be
//! raced against cancellation on a spawned task.

use crate::compute::range::KeyRange;
use crate::error::StoreError;
use crate::types::RawEntry;
use futures::future::BoxFuture;

mod memory;

pub use memory::MemoryRangeStore;

/// Outcome of a single range read.
pub type RangeReadResult = std::result::Result<Vec<RawEntry>, StoreError>;

/// Trait for backends that can serve ordered range reads
///
/// Implementations must be safe to share across tasks; one session issues
/// up to 9 reads concurrently against the same store.
pub trait RangeStore: Send + Sync {
    /// Read entries whose `field` value lies in `range`, in ascending order
    /// of that value. `limit` keeps only the first `n` entries.
    fn query_range(
        &self,
        field: &str,
        range: &KeyRange,
        limit: Option<usize>,
    ) -> BoxFuture<'static, RangeReadResult>;
}
