use alloy::primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::{PendingTx, RawLog};
use crate::error::BackendError;

/// A read-only message call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    pub from: Option<Address>,
    pub to: Address,
    pub data: Bytes,
}

/// An unsigned transaction. `to` is `None` for contract creation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxRequest {
    pub from: Address,
    pub to: Option<Address>,
    pub data: Bytes,
    pub value: U256,
    pub nonce: Option<u64>,
    pub gas_limit: Option<u64>,
    pub gas_price: Option<u128>,
    pub max_fee_per_gas: Option<u128>,
    pub max_priority_fee_per_gas: Option<u128>,
}

/// Log selection: one emitting address, a block range, and per-position topic sets.
/// An empty set matches any topic at that position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogQuery {
    pub address: Address,
    pub topics: Vec<Vec<B256>>,
    pub from_block: Option<u64>,
    pub to_block: Option<u64>,
}

impl LogQuery {
    pub fn matches(&self, log: &RawLog) -> bool {
        if log.address != self.address {
            return false;
        }
        if let Some(block) = log.block_number {
            if self.from_block.is_some_and(|from| block < from) || self.to_block.is_some_and(|to| block > to) {
                return false;
            }
        }
        self.topics.iter().enumerate().all(|(i, wanted)| {
            wanted.is_empty() || log.topics.get(i).is_some_and(|topic| wanted.contains(topic))
        })
    }
}

/// What a subscription produced next.
#[derive(Debug)]
pub enum SubscriptionItem {
    Log(RawLog),
    Error(BackendError),
    /// The backend closed the log stream
    Closed,
}

/// A live or pre-filled stream of raw logs plus a separate error channel.
///
/// Dropping or unsubscribing releases the backend resources exactly once.
pub struct LogSubscription {
    logs: mpsc::Receiver<RawLog>,
    errors: Option<mpsc::Receiver<BackendError>>,
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl LogSubscription {
    pub fn new(
        logs: mpsc::Receiver<RawLog>,
        errors: mpsc::Receiver<BackendError>,
        release: impl FnOnce() + Send + Sync + 'static,
    ) -> Self {
        Self {
            logs,
            errors: Some(errors),
            release: Some(Box::new(release)),
        }
    }

    /// A finite subscription over already collected logs, used for historical queries.
    pub fn from_logs(logs: Vec<RawLog>) -> Self {
        let (tx, rx) = mpsc::channel(logs.len().max(1));
        for log in logs {
            // capacity covers every log
            let _ = tx.try_send(log);
        }
        Self {
            logs: rx,
            errors: None,
            release: None,
        }
    }

    /// Next log or error. Buffered logs are delivered before a pending error.
    pub async fn recv(&mut self) -> SubscriptionItem {
        loop {
            let errors = &mut self.errors;
            let outcome = tokio::select! {
                biased;
                log = self.logs.recv() => Ok(log),
                err = next_error(errors) => Err(err),
            };
            match outcome {
                Ok(Some(log)) => return SubscriptionItem::Log(log),
                Ok(None) => {
                    // a backend that fails and hangs up reports the failure, not a clean end
                    if let Some(err) = self.errors.as_mut().and_then(|rx| rx.try_recv().ok()) {
                        return SubscriptionItem::Error(err);
                    }
                    return SubscriptionItem::Closed;
                }
                Err(Some(err)) => return SubscriptionItem::Error(err),
                // error side hung up; keep draining logs
                Err(None) => self.errors = None,
            }
        }
    }

    pub fn unsubscribe(&mut self) {
        self.logs.close();
        if let Some(release) = self.release.take() {
            release();
        }
    }

    pub fn is_released(&self) -> bool {
        self.release.is_none()
    }
}

impl Drop for LogSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for LogSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogSubscription")
            .field("released", &self.is_released())
            .finish()
    }
}

async fn next_error(errors: &mut Option<mpsc::Receiver<BackendError>>) -> Option<BackendError> {
    match errors {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Read capability: message calls against a block.
#[async_trait]
pub trait ContractCaller: Send + Sync {
    /// Deployed code at `address`; empty when there is none.
    async fn code_at(&self, address: Address, block: Option<u64>) -> Result<Bytes, BackendError>;

    async fn call_contract(&self, call: CallRequest, block: Option<u64>) -> Result<Bytes, BackendError>;
}

/// Write capability: signing and submitting transactions.
#[async_trait]
pub trait ContractTransactor: Send + Sync {
    async fn send_transaction(&self, tx: TxRequest) -> Result<PendingTx, BackendError>;
}

/// Log capability: historical queries and live subscriptions.
#[async_trait]
pub trait ContractFilterer: Send + Sync {
    async fn filter_logs(&self, query: LogQuery) -> Result<Vec<RawLog>, BackendError>;

    async fn subscribe_logs(&self, query: LogQuery) -> Result<LogSubscription, BackendError>;
}

/// A backend with every capability.
pub trait ContractBackend: ContractCaller + ContractTransactor + ContractFilterer {}

impl<T: ContractCaller + ContractTransactor + ContractFilterer> ContractBackend for T {}

#[async_trait]
impl<T: ContractCaller + ?Sized> ContractCaller for Arc<T> {
    async fn code_at(&self, address: Address, block: Option<u64>) -> Result<Bytes, BackendError> {
        (**self).code_at(address, block).await
    }

    async fn call_contract(&self, call: CallRequest, block: Option<u64>) -> Result<Bytes, BackendError> {
        (**self).call_contract(call, block).await
    }
}

#[async_trait]
impl<T: ContractTransactor + ?Sized> ContractTransactor for Arc<T> {
    async fn send_transaction(&self, tx: TxRequest) -> Result<PendingTx, BackendError> {
        (**self).send_transaction(tx).await
    }
}

#[async_trait]
impl<T: ContractFilterer + ?Sized> ContractFilterer for Arc<T> {
    async fn filter_logs(&self, query: LogQuery) -> Result<Vec<RawLog>, BackendError> {
        (**self).filter_logs(query).await
    }

    async fn subscribe_logs(&self, query: LogQuery) -> Result<LogSubscription, BackendError> {
        (**self).subscribe_logs(query).await
    }
}

#[async_trait]
impl<'a, T: ContractCaller + ?Sized> ContractCaller for &'a T {
    async fn code_at(&self, address: Address, block: Option<u64>) -> Result<Bytes, BackendError> {
        (**self).code_at(address, block).await
    }

    async fn call_contract(&self, call: CallRequest, block: Option<u64>) -> Result<Bytes, BackendError> {
        (**self).call_contract(call, block).await
    }
}

#[async_trait]
impl<'a, T: ContractTransactor + ?Sized> ContractTransactor for &'a T {
    async fn send_transaction(&self, tx: TxRequest) -> Result<PendingTx, BackendError> {
        (**self).send_transaction(tx).await
    }
}

#[async_trait]
impl<'a, T: ContractFilterer + ?Sized> ContractFilterer for &'a T {
    async fn filter_logs(&self, query: LogQuery) -> Result<Vec<RawLog>, BackendError> {
        (**self).filter_logs(query).await
    }

    async fn subscribe_logs(&self, query: LogQuery) -> Result<LogSubscription, BackendError> {
        (**self).subscribe_logs(query).await
    }
}
