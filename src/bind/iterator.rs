use futures::Stream;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::backend::{LogSubscription, SubscriptionItem};
use super::RawLog;
use crate::error::{BindError, Result};

pub(crate) type LogDecoder<T> = Box<dyn Fn(&RawLog) -> Result<T> + Send + Sync>;

enum State {
    Open(LogSubscription),
    /// The log stream ended normally
    Exhausted,
    Failed(BindError),
    Closed,
}

/// Pull-based cursor over decoded event logs.
///
/// `next` advances to the following log and reports whether one is available. Once it
/// returns `false` the iterator is finished: check [`LogIterator::error`] to tell a clean
/// end from a failure. The underlying subscription is released as soon as the iterator
/// finishes, is closed, is cancelled through its token, or is dropped.
pub struct LogIterator<T> {
    event: String,
    state: State,
    decode: LogDecoder<T>,
    current: Option<T>,
    cancel: Option<CancellationToken>,
}

impl<T> LogIterator<T> {
    pub(crate) fn new(event: impl Into<String>, subscription: LogSubscription, decode: LogDecoder<T>) -> Self {
        Self {
            event: event.into(),
            state: State::Open(subscription),
            decode,
            current: None,
            cancel: None,
        }
    }

    /// Close the iterator once `cancel` fires.
    pub(crate) fn with_cancel(mut self, cancel: Option<CancellationToken>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Advance to the next log. Returns `false` once the stream is exhausted, failed,
    /// closed or cancelled, and keeps returning `false` afterwards.
    pub async fn next(&mut self) -> bool {
        let State::Open(subscription) = &mut self.state else {
            return false;
        };
        let item = match &self.cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => None,
                item = subscription.recv() => Some(item),
            },
            None => Some(subscription.recv().await),
        };
        let Some(item) = item else {
            debug!("Iteration over {} logs cancelled", self.event);
            self.finish(State::Closed);
            return false;
        };

        match item {
            SubscriptionItem::Log(log) => match (self.decode)(&log) {
                Ok(event) => {
                    self.current = Some(event);
                    true
                }
                Err(e) => {
                    debug!("Failed to unpack {} log: {}", self.event, e);
                    self.finish(State::Failed(e));
                    false
                }
            },
            SubscriptionItem::Error(e) => {
                self.finish(State::Failed(BindError::SubscriptionFailed(e)));
                false
            }
            SubscriptionItem::Closed => {
                self.finish(State::Exhausted);
                false
            }
        }
    }

    /// The event produced by the last successful `next`.
    pub fn event(&self) -> Option<&T> {
        self.current.as_ref()
    }

    pub fn take_event(&mut self) -> Option<T> {
        self.current.take()
    }

    /// The failure that ended iteration, if any.
    pub fn error(&self) -> Option<&BindError> {
        match &self.state {
            State::Failed(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, State::Open(_))
    }

    /// Release the subscription. Safe to call any number of times.
    pub fn close(&mut self) {
        if self.is_open() {
            self.finish(State::Closed);
        }
    }

    fn finish(&mut self, next: State) {
        self.current = None;
        if let State::Open(mut subscription) = std::mem::replace(&mut self.state, next) {
            subscription.unsubscribe();
        }
    }

    fn take_error(&mut self) -> Option<BindError> {
        match std::mem::replace(&mut self.state, State::Closed) {
            State::Failed(e) => Some(e),
            other => {
                self.state = other;
                None
            }
        }
    }

    /// Adapt into a stream that yields each event and, last, the error that ended
    /// iteration if there was one.
    pub fn into_stream(self) -> impl Stream<Item = Result<T>> {
        futures::stream::unfold(Some(self), |iter| async move {
            let mut iter = iter?;
            if iter.next().await {
                let event = iter.take_event()?;
                return Some((Ok(event), Some(iter)));
            }
            iter.take_error().map(|e| (Err(e), None))
        })
    }
}

impl<T> std::fmt::Debug for LogIterator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &self.state {
            State::Open(_) => "open",
            State::Exhausted => "exhausted",
            State::Failed(_) => "failed",
            State::Closed => "closed",
        };
        f.debug_struct("LogIterator")
            .field("event", &self.event)
            .field("state", &state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn block_decoder() -> LogDecoder<u64> {
        Box::new(|log: &RawLog| {
            log.block_number
                .ok_or_else(|| BindError::mismatch("Block", "log has no block number"))
        })
    }

    fn log(block: Option<u64>) -> RawLog {
        RawLog {
            block_number: block,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_exhaustion_is_sticky() {
        let sub = LogSubscription::from_logs(vec![log(Some(1)), log(Some(2))]);
        let mut iter = LogIterator::new("Block", sub, block_decoder());

        assert!(iter.next().await);
        assert_eq!(iter.event(), Some(&1));
        assert!(iter.next().await);
        assert_eq!(iter.event(), Some(&2));
        assert!(!iter.next().await);
        assert!(!iter.next().await);
        assert!(iter.error().is_none());
        assert!(!iter.is_open());
    }

    #[tokio::test]
    async fn test_decode_failure_stops_iteration() {
        let sub = LogSubscription::from_logs(vec![log(Some(1)), log(None), log(Some(3))]);
        let mut iter = LogIterator::new("Block", sub, block_decoder());

        assert!(iter.next().await);
        assert!(!iter.next().await);
        assert!(matches!(iter.error(), Some(BindError::EventMismatch { .. })));
        assert!(!iter.next().await);
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_releases_once() {
        let released = Arc::new(AtomicUsize::new(0));
        let (log_tx, log_rx) = mpsc::channel(4);
        let (_err_tx, err_rx) = mpsc::channel(1);
        let counter = released.clone();
        let sub = LogSubscription::new(log_rx, err_rx, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        log_tx.send(log(Some(5))).await.unwrap();

        let mut iter = LogIterator::new("Block", sub, block_decoder());
        assert!(iter.next().await);
        iter.close();
        iter.close();
        assert!(!iter.next().await);
        assert!(iter.error().is_none());
        drop(iter);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancel_token_closes_and_releases() {
        let released = Arc::new(AtomicUsize::new(0));
        let (log_tx, log_rx) = mpsc::channel(4);
        let (_err_tx, err_rx) = mpsc::channel(1);
        let counter = released.clone();
        let sub = LogSubscription::new(log_rx, err_rx, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let cancel = CancellationToken::new();
        let mut iter = LogIterator::new("Block", sub, block_decoder()).with_cancel(Some(cancel.clone()));

        log_tx.send(log(Some(7))).await.unwrap();
        assert!(iter.next().await);
        assert_eq!(iter.event(), Some(&7));

        // no log pending
        cancel.cancel();
        assert!(!iter.next().await);
        assert!(!iter.is_open());
        assert!(iter.error().is_none());
        assert_eq!(released.load(Ordering::SeqCst), 1);

        log_tx.send(log(Some(8))).await.ok();
        assert!(!iter.next().await);
        drop(iter);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_backend_error_surfaces() {
        let (_log_tx, log_rx) = mpsc::channel::<RawLog>(1);
        let (err_tx, err_rx) = mpsc::channel(1);
        let sub = LogSubscription::new(log_rx, err_rx, || {});
        err_tx.send("socket closed".into()).await.unwrap();

        let mut iter = LogIterator::new("Block", sub, block_decoder());
        assert!(!iter.next().await);
        assert!(matches!(iter.error(), Some(BindError::SubscriptionFailed(_))));
    }

    #[tokio::test]
    async fn test_stream_yields_events_then_error() {
        let sub = LogSubscription::from_logs(vec![log(Some(1)), log(None)]);
        let iter = LogIterator::new("Block", sub, block_decoder());
        let items: Vec<Result<u64>> = iter.into_stream().collect().await;
        assert_eq!(items.len(), 2);
        assert_eq!(*items[0].as_ref().unwrap(), 1);
        assert!(items[1].is_err());
    }
}
