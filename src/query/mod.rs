//! Radius queries over a [`RangeStore`].
//!
//! A [`QuerySession`] plans the key ranges for one circle, fans out one read
//! per range, filters what comes back and reports through callbacks (or a
//! [`QueryStream`]). A session runs at most once:
//!
//! ```text
//! Idle --execute--> Executing --all ranges read--> Completed
//!   |                   |
//!   +----cancel---------+--cancel / read failure--> Cancelled
//! ```
//!
//! # Examples
//!
//! ```rust
//! use geoscan::{GeoCoordinate, GeoQuery, MemoryRangeStore, QueryConfig, QuerySession};
//! use futures::StreamExt;
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> geoscan::Result<()> {
//! let store = Arc::new(MemoryRangeStore::new());
//! store.set_location("cafe", GeoCoordinate::new(0.001, 0.001)?)?;
//! store.set_location("airport", GeoCoordinate::new(10.0, 10.0)?)?;
//!
//! let query = GeoQuery::new(GeoCoordinate::new(0.0, 0.0)?, 1_000.0);
//! let session = QuerySession::new(store, query, QueryConfig::default());
//!
//! let hits: Vec<_> = session.into_stream()?.collect().await;
//! assert_eq!(hits.len(), 1);
//! assert_eq!(hits[0].as_ref().unwrap().key, "cafe");
//! # Ok(())
//! # }
//! ```

mod executor;
mod stream;
mod timeout;

pub use stream::QueryStream;
pub use timeout::QueryTimeout;

use crate::compute::range::QueryPlan;
use crate::config::QueryConfig;
use crate::error::{GeoScanError, Result};
use crate::storage::RangeStore;
use crate::types::GeoCoordinate;
use executor::Execution;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

/// What to search for.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoQuery {
    pub center: GeoCoordinate,
    pub radius_m: f64,
    /// Per-range read limit; falls back to `QueryConfig::default_limit`
    pub limit: Option<usize>,
    /// Exact-radius filtering; falls back to `QueryConfig::strict_filtering`
    pub strict: Option<bool>,
}

impl GeoQuery {
    pub fn new(center: GeoCoordinate, radius_m: f64) -> Self {
        Self {
            center,
            radius_m,
            limit: None,
            strict: None,
        }
    }

    /// Cap every range read at `limit` entries.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Drop (`true`) or keep (`false`) candidates outside the exact radius.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = Some(strict);
        self
    }
}

/// Lifecycle of a [`QuerySession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    Idle,
    Executing,
    Completed,
    Cancelled,
}

impl QueryState {
    /// True once the session can no longer deliver results.
    pub fn is_terminal(self) -> bool {
        matches!(self, QueryState::Completed | QueryState::Cancelled)
    }
}

impl fmt::Display for QueryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QueryState::Idle => "idle",
            QueryState::Executing => "executing",
            QueryState::Completed => "completed",
            QueryState::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// What `execute` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecuteStatus {
    /// Reads were issued for this many ranges.
    Started { ranges: usize },
    /// The session had already been executed; nothing happened.
    AlreadyStarted,
    /// The session was cancelled before it started; nothing happened.
    Cancelled,
}

/// State and cancellation signal shared by a session, its tasks and its
/// handles.
pub(crate) struct Shared {
    state: Mutex<QueryState>,
    token: CancellationToken,
}

impl Shared {
    fn new() -> Self {
        Self {
            state: Mutex::new(QueryState::Idle),
            token: CancellationToken::new(),
        }
    }

    pub(crate) fn state(&self) -> QueryState {
        *self.state.lock()
    }

    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Leave `Executing` for `next`. Returns false when another transition
    /// already won.
    pub(crate) fn finish(&self, next: QueryState) -> bool {
        let mut state = self.state.lock();
        if *state != QueryState::Executing {
            return false;
        }
        *state = next;
        drop(state);

        log::debug!("Query {}", next);
        self.token.cancel();
        true
    }

    fn cancel(&self) {
        let mut state = self.state.lock();
        if matches!(*state, QueryState::Idle | QueryState::Executing) {
            log::debug!("Query cancelled while {}", *state);
            *state = QueryState::Cancelled;
        }
        drop(state);

        self.token.cancel();
    }
}

/// Cloneable handle that cancels a session from any task or thread.
#[derive(Clone)]
pub struct CancelHandle {
    shared: Arc<Shared>,
}

impl CancelHandle {
    /// Cancel the session. Safe to call repeatedly and in any state.
    pub fn cancel(&self) {
        self.shared.cancel();
    }

    pub fn state(&self) -> QueryState {
        self.shared.state()
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.state() == QueryState::Cancelled
    }
}

impl fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelHandle")
            .field("state", &self.state())
            .finish()
    }
}

/// One radius query against one store.
///
/// Dropping the session cancels it.
pub struct QuerySession {
    store: Arc<dyn RangeStore>,
    query: GeoQuery,
    config: QueryConfig,
    shared: Arc<Shared>,
}

impl QuerySession {
    pub fn new(store: Arc<dyn RangeStore>, query: GeoQuery, config: QueryConfig) -> Self {
        Self {
            store,
            query,
            config,
            shared: Arc::new(Shared::new()),
        }
    }

    pub fn query(&self) -> &GeoQuery {
        &self.query
    }

    pub fn state(&self) -> QueryState {
        self.shared.state()
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Cancel the session. Idempotent; callbacks that have not fired yet
    /// never will.
    pub fn cancel(&self) {
        self.shared.cancel();
    }

    /// Start the query on the current tokio runtime.
    ///
    /// `on_result` runs for every matching entry, then exactly one of
    /// `on_complete` (every range read) or `on_error` (first failed read)
    /// runs, unless the session is cancelled first. Callbacks run on a
    /// runtime task, never inside this call.
    ///
    /// Returns immediately. A second call, or a call after `cancel`, does
    /// nothing and reports why through [`ExecuteStatus`].
    ///
    /// The session must outlive the query: dropping it cancels the query, so
    /// calling this on a temporary delivers nothing. Keep the session (or the
    /// [`QueryStream`] from [`into_stream`](Self::into_stream)) alive until
    /// `on_complete` or `on_error` runs.
    ///
    /// # Errors
    ///
    /// `Config` when the session's [`QueryConfig`] does not validate;
    /// `InvalidRadius` when the radius is not positive or exceeds the
    /// configured maximum; `Runtime` when called outside a tokio runtime.
    /// None of them changes the session state.
    pub fn execute<R, C, E>(&self, on_result: R, on_complete: C, on_error: E) -> Result<ExecuteStatus>
    where
        R: FnMut(&str, GeoCoordinate) + Send + 'static,
        C: FnOnce() + Send + 'static,
        E: FnOnce(GeoScanError) + Send + 'static,
    {
        let mut state = self.shared.state.lock();
        match *state {
            QueryState::Idle => {}
            QueryState::Cancelled => return Ok(ExecuteStatus::Cancelled),
            QueryState::Executing | QueryState::Completed => {
                return Ok(ExecuteStatus::AlreadyStarted);
            }
        }

        self.config.validate().map_err(GeoScanError::Config)?;
        let plan = QueryPlan::new(&self.query.center, self.query.radius_m, &self.config)?;
        let runtime = Handle::try_current().map_err(|e| GeoScanError::Runtime(e.to_string()))?;

        *state = QueryState::Executing;
        drop(state);

        let ranges = plan.len();
        let execution = Execution {
            store: Arc::clone(&self.store),
            field: self.config.location_field.clone(),
            limit: self.query.limit.or(self.config.default_limit),
            strict: self.query.strict.unwrap_or(self.config.strict_filtering),
            plan,
            shared: Arc::clone(&self.shared),
        };
        execution.spawn(&runtime, on_result, on_complete, on_error);

        Ok(ExecuteStatus::Started { ranges })
    }

    /// Execute the query and deliver results as a stream.
    ///
    /// The stream ends after the last range is read, yields one `Err` when a
    /// read fails, and ends early on cancellation. Dropping it cancels the
    /// query. A session that was already started or cancelled yields an
    /// empty stream.
    pub fn into_stream(self) -> Result<QueryStream> {
        QueryStream::start(self)
    }
}

impl Drop for QuerySession {
    fn drop(&mut self) {
        self.shared.cancel();
    }
}

impl fmt::Debug for QuerySession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuerySession")
            .field("query", &self.query)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryRangeStore;

    fn session(radius: f64) -> QuerySession {
        let center = GeoCoordinate::new(0.0, 0.0).unwrap();
        QuerySession::new(
            Arc::new(MemoryRangeStore::new()),
            GeoQuery::new(center, radius),
            QueryConfig::default(),
        )
    }

    #[test]
    fn test_query_builder() {
        let center = GeoCoordinate::new(1.0, 2.0).unwrap();
        let query = GeoQuery::new(center, 500.0).limit(20).strict(false);
        assert_eq!(query.limit, Some(20));
        assert_eq!(query.strict, Some(false));
    }

    #[test]
    fn test_cancel_before_execute() {
        let session = session(1_000.0);
        session.cancel();
        assert_eq!(session.state(), QueryState::Cancelled);

        let status = session.execute(|_, _| {}, || {}, |_| {}).unwrap();
        assert_eq!(status, ExecuteStatus::Cancelled);
        assert_eq!(session.state(), QueryState::Cancelled);
    }

    #[test]
    fn test_execute_without_runtime() {
        let session = session(1_000.0);
        let err = session.execute(|_, _| {}, || {}, |_| {}).unwrap_err();
        assert!(matches!(err, GeoScanError::Runtime(_)));
        assert_eq!(session.state(), QueryState::Idle);
    }

    #[test]
    fn test_invalid_radius_leaves_session_idle() {
        let session = session(0.0);
        let err = session.execute(|_, _| {}, || {}, |_| {}).unwrap_err();
        assert!(matches!(err, GeoScanError::InvalidRadius(_)));
        assert_eq!(session.state(), QueryState::Idle);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let center = GeoCoordinate::new(0.0, 0.0).unwrap();
        let config = QueryConfig {
            max_query_radius_m: f64::NAN,
            ..QueryConfig::default()
        };
        let session = QuerySession::new(
            Arc::new(MemoryRangeStore::new()),
            GeoQuery::new(center, 500_000_000.0),
            config,
        );

        let err = session.execute(|_, _| {}, || {}, |_| {}).unwrap_err();
        assert!(matches!(err, GeoScanError::Config(_)));
        assert_eq!(session.state(), QueryState::Idle);
    }

    #[test]
    fn test_handle_cancels_shared_state() {
        let session = session(1_000.0);
        let handle = session.cancel_handle();
        let other = handle.clone();

        other.cancel();
        other.cancel();
        assert!(handle.is_cancelled());
        assert_eq!(session.state(), QueryState::Cancelled);
        assert!(session.state().is_terminal());
    }

    #[test]
    fn test_drop_cancels() {
        let session = session(1_000.0);
        let handle = session.cancel_handle();
        drop(session);
        assert_eq!(handle.state(), QueryState::Cancelled);
    }
}
