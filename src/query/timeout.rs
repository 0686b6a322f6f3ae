use super::CancelHandle;
use crate::config::QueryConfig;
use crate::error::{GeoScanError, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Deadline that cancels a query when it expires.
///
/// Dropping the guard disarms it, so keep it alive until the query is done.
#[derive(Debug)]
pub struct QueryTimeout {
    timer: JoinHandle<()>,
    expired: Arc<AtomicBool>,
}

impl QueryTimeout {
    pub fn start(handle: CancelHandle, duration: Duration) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| GeoScanError::Runtime(e.to_string()))?;
        let expired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&expired);

        let timer = runtime.spawn(async move {
            tokio::time::sleep(duration).await;
            if !handle.state().is_terminal() {
                log::debug!("Query timed out after {:?}", duration);
                flag.store(true, Ordering::Release);
                handle.cancel();
            }
        });

        Ok(Self { timer, expired })
    }

    /// Arm a deadline of `config.query_timeout()`.
    pub fn with_config(handle: CancelHandle, config: &QueryConfig) -> Result<Self> {
        Self::start(handle, config.query_timeout())
    }

    /// True when the deadline cancelled the query.
    pub fn expired(&self) -> bool {
        self.expired.load(Ordering::Acquire)
    }
}

impl Drop for QueryTimeout {
    fn drop(&mut self) {
        self.timer.abort();
    }
}
