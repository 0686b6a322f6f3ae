use super::{CancelHandle, QuerySession, QueryState};
use crate::error::Result;
use crate::types::GeoHit;
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// Stream of matches produced by [`QuerySession::into_stream`].
///
/// Owns its session, so dropping the stream cancels the query.
pub struct QueryStream {
    session: QuerySession,
    rx: mpsc::UnboundedReceiver<Result<GeoHit>>,
}

impl QueryStream {
    pub(super) fn start(session: QuerySession) -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let results = tx.clone();
        let errors = tx.clone();

        // the channel closes once the coordinator drops these closures
        session.execute(
            move |key, location| {
                let _ = results.send(Ok(GeoHit {
                    key: key.to_string(),
                    location,
                }));
            },
            move || drop(tx),
            move |error| {
                let _ = errors.send(Err(error));
            },
        )?;

        Ok(Self { session, rx })
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.session.cancel_handle()
    }

    pub fn state(&self) -> QueryState {
        self.session.state()
    }
}

impl Stream for QueryStream {
    type Item = Result<GeoHit>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
