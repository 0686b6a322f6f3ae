//! Fan-out of range reads and fan-in of their outcomes.
//!
//! Every range gets its own task that races the store read against the
//! session's cancellation token. Outcomes flow over one channel to a single
//! coordinator, which is the only place that filters entries, counts
//! resolved ranges and runs callbacks.

use super::{QueryState, Shared};
use crate::compute::distance::distance;
use crate::compute::range::{KeyRange, QueryPlan};
use crate::error::GeoScanError;
use crate::storage::{RangeReadResult, RangeStore};
use crate::types::GeoCoordinate;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

pub(crate) struct Execution {
    pub store: Arc<dyn RangeStore>,
    pub plan: QueryPlan,
    pub field: String,
    pub limit: Option<usize>,
    pub strict: bool,
    pub shared: Arc<Shared>,
}

struct RangeOutcome {
    range: KeyRange,
    result: RangeReadResult,
}

impl Execution {
    pub fn spawn<R, C, E>(self, runtime: &Handle, on_result: R, on_complete: C, on_error: E)
    where
        R: FnMut(&str, GeoCoordinate) + Send + 'static,
        C: FnOnce() + Send + 'static,
        E: FnOnce(GeoScanError) + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();

        for range in self.plan.ranges() {
            let store = Arc::clone(&self.store);
            let token = self.shared.token().clone();
            let field = self.field.clone();
            let range = range.clone();
            let limit = self.limit;
            let tx = tx.clone();

            runtime.spawn(async move {
                if token.is_cancelled() {
                    return;
                }

                let read = store.query_range(&field, &range, limit);
                let result = tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        log::trace!("Range {} aborted", range);
                        return;
                    }
                    result = read => result,
                };

                let _ = tx.send(RangeOutcome { range, result });
            });
        }
        drop(tx);

        let coordinator = Coordinator {
            shared: self.shared,
            center: *self.plan.center(),
            radius: self.plan.radius_meters(),
            strict: self.strict,
            total: self.plan.len(),
        };
        runtime.spawn(coordinator.run(rx, on_result, on_complete, on_error));
    }
}

struct Coordinator {
    shared: Arc<Shared>,
    center: GeoCoordinate,
    radius: f64,
    strict: bool,
    total: usize,
}

impl Coordinator {
    async fn run<R, C, E>(
        self,
        mut rx: mpsc::UnboundedReceiver<RangeOutcome>,
        mut on_result: R,
        on_complete: C,
        on_error: E,
    ) where
        R: FnMut(&str, GeoCoordinate) + Send + 'static,
        C: FnOnce() + Send + 'static,
        E: FnOnce(GeoScanError) + Send + 'static,
    {
        let mut on_complete = Some(on_complete);
        let mut on_error = Some(on_error);
        let mut resolved = 0;

        loop {
            let outcome = tokio::select! {
                biased;
                _ = self.shared.token().cancelled() => return,
                outcome = rx.recv() => outcome,
            };

            // every worker gone without reporting means they were aborted
            let Some(RangeOutcome { range, result }) = outcome else {
                return;
            };

            match result {
                Ok(entries) => {
                    log::trace!("Range {} read {} entries", range, entries.len());

                    for raw in entries {
                        if self.shared.is_cancelled() {
                            return;
                        }

                        let entry = match raw.decode() {
                            Ok(entry) => entry,
                            Err(e) => {
                                log::warn!("Skipping undecodable entry in {}: {}", range, e);
                                continue;
                            }
                        };

                        if !self.strict || distance(&entry.location, &self.center) <= self.radius {
                            on_result(&entry.key, entry.location);
                        }
                    }

                    resolved += 1;
                    if resolved == self.total {
                        if self.shared.finish(QueryState::Completed)
                            && let Some(on_complete) = on_complete.take()
                        {
                            on_complete();
                        }
                        return;
                    }
                }
                Err(source) => {
                    let error = GeoScanError::StoreReadFailure { range, source };
                    if self.shared.finish(QueryState::Cancelled) {
                        log::debug!("Query failed: {}", error);
                        if let Some(on_error) = on_error.take() {
                            on_error(error);
                        }
                    } else {
                        log::warn!("Dropping error after query ended: {}", error);
                    }
                    return;
                }
            }
        }
    }
}
