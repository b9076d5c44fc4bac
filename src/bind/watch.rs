use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::backend::{LogSubscription, SubscriptionItem};
use super::iterator::LogDecoder;
use crate::error::BindError;

/// Handle to a background task forwarding decoded events into a caller's channel.
///
/// The task stops when the handle is unsubscribed or dropped, when the cancellation
/// token passed in the watch options fires, when the sink is closed, or on the first
/// error. The error, if any, is reported once through [`Subscription::err`].
#[derive(Debug)]
pub struct Subscription {
    cancel: CancellationToken,
    errors: mpsc::Receiver<BindError>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub(crate) fn spawn<T: Send + 'static>(
        event: String,
        mut subscription: LogSubscription,
        decode: LogDecoder<T>,
        sink: mpsc::Sender<T>,
        cancel: CancellationToken,
    ) -> Self {
        let (err_tx, err_rx) = mpsc::channel(1);
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            loop {
                let item = tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    item = subscription.recv() => item,
                };

                let error = match item {
                    SubscriptionItem::Log(log) => match decode(&log) {
                        Ok(decoded) => {
                            tokio::select! {
                                biased;
                                _ = token.cancelled() => break,
                                sent = sink.send(decoded) => {
                                    if sent.is_err() {
                                        debug!("Sink for {} events closed, stopping watch", event);
                                        break;
                                    }
                                }
                            }
                            continue;
                        }
                        Err(e) => e,
                    },
                    SubscriptionItem::Error(e) => BindError::SubscriptionFailed(e),
                    SubscriptionItem::Closed => {
                        debug!("Log stream for {} ended", event);
                        break;
                    }
                };

                warn!("Watch on {} stopped: {}", event, error);
                let _ = err_tx.try_send(error);
                break;
            }
            subscription.unsubscribe();
        });

        Self {
            cancel,
            errors: err_rx,
            task: Some(task),
        }
    }

    /// Stop the watch. Safe to call repeatedly.
    pub fn unsubscribe(&mut self) {
        self.cancel.cancel();
    }

    /// Wait for the watch to end and return the error that ended it, if any. Resolves to
    /// `None` after a clean stop and on every later call.
    pub async fn err(&mut self) -> Option<BindError> {
        self.errors.recv().await
    }

    /// Unsubscribe and wait for the background task to finish.
    pub async fn shutdown(mut self) {
        self.unsubscribe();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Watch task panicked: {}", e);
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bind::RawLog;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn decoder() -> LogDecoder<u64> {
        Box::new(|log: &RawLog| {
            log.block_number
                .ok_or_else(|| BindError::mismatch("Block", "log has no block number"))
        })
    }

    fn live() -> (mpsc::Sender<RawLog>, mpsc::Sender<crate::error::BackendError>, LogSubscription, Arc<AtomicUsize>) {
        let released = Arc::new(AtomicUsize::new(0));
        let (log_tx, log_rx) = mpsc::channel(8);
        let (err_tx, err_rx) = mpsc::channel(1);
        let counter = released.clone();
        let sub = LogSubscription::new(log_rx, err_rx, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (log_tx, err_tx, sub, released)
    }

    #[tokio::test]
    async fn test_forwards_until_unsubscribed() {
        let (log_tx, _err_tx, sub, released) = live();
        let (sink, mut events) = mpsc::channel(8);
        let mut watch = Subscription::spawn("Block".into(), sub, decoder(), sink, CancellationToken::new());

        log_tx
            .send(RawLog {
                block_number: Some(9),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(events.recv().await, Some(9));

        watch.unsubscribe();
        watch.unsubscribe();
        assert!(watch.err().await.is_none());
        watch.shutdown().await;
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_reports_backend_error_once() {
        let (_log_tx, err_tx, sub, released) = live();
        let (sink, _events) = mpsc::channel::<u64>(8);
        let mut watch = Subscription::spawn("Block".into(), sub, decoder(), sink, CancellationToken::new());

        err_tx.send("node went away".into()).await.unwrap();
        assert!(matches!(watch.err().await, Some(BindError::SubscriptionFailed(_))));
        assert!(watch.err().await.is_none());
        watch.shutdown().await;
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_external_cancellation_stops_task() {
        let (_log_tx, _err_tx, sub, released) = live();
        let (sink, _events) = mpsc::channel::<u64>(8);
        let token = CancellationToken::new();
        let mut watch = Subscription::spawn("Block".into(), sub, decoder(), sink, token.clone());

        token.cancel();
        assert!(watch.err().await.is_none());
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }
}
