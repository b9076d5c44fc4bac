//! In-memory backend for tests.
//!
//! Calls are answered from scripted responses keyed by selector, transactions are
//! recorded and assigned sequential nonces per sender, and logs pushed through
//! [`MockBackend::push_log`] are both kept for historical queries and fanned out to live
//! subscriptions.

use alloy::primitives::{keccak256, Address, Bytes, FixedBytes};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

use super::backend::{CallRequest, ContractCaller, ContractFilterer, ContractTransactor, LogQuery, LogSubscription, TxRequest};
use super::{PendingTx, RawLog};
use crate::error::BackendError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct MockError(pub String);

struct Watcher {
    query: LogQuery,
    logs: mpsc::Sender<RawLog>,
    errors: mpsc::Sender<BackendError>,
}

#[derive(Default)]
struct MockState {
    responses: HashMap<FixedBytes<4>, Bytes>,
    default_response: Option<Bytes>,
    call_error: Option<String>,
    send_error: Option<String>,
    subscribe_error: Option<String>,
    code: HashMap<Address, Bytes>,
    nonces: HashMap<Address, u64>,
    calls: Vec<CallRequest>,
    transactions: Vec<PendingTx>,
    logs: Vec<RawLog>,
    watchers: Vec<Watcher>,
}

#[derive(Default)]
pub struct MockBackend {
    state: Mutex<MockState>,
    released: Arc<AtomicUsize>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Answer calls whose calldata starts with `selector` with `output`.
    pub fn respond(&self, selector: FixedBytes<4>, output: impl Into<Bytes>) {
        self.state().responses.insert(selector, output.into());
    }

    /// Answer calls without a scripted response.
    pub fn respond_default(&self, output: impl Into<Bytes>) {
        self.state().default_response = Some(output.into());
    }

    pub fn fail_calls(&self, message: impl Into<String>) {
        self.state().call_error = Some(message.into());
    }

    pub fn fail_transactions(&self, message: impl Into<String>) {
        self.state().send_error = Some(message.into());
    }

    pub fn fail_subscriptions(&self, message: impl Into<String>) {
        self.state().subscribe_error = Some(message.into());
    }

    pub fn set_code(&self, address: Address, code: impl Into<Bytes>) {
        self.state().code.insert(address, code.into());
    }

    /// Record a log and deliver it to matching live subscriptions.
    pub fn push_log(&self, log: RawLog) {
        let mut state = self.state();
        state.watchers.retain(|w| !w.logs.is_closed());
        for watcher in &state.watchers {
            if watcher.query.matches(&log) && watcher.logs.try_send(log.clone()).is_err() {
                debug!("Mock subscriber lagging, dropped log");
            }
        }
        state.logs.push(log);
    }

    /// Fail every live subscription with `message`.
    pub fn break_subscriptions(&self, message: &str) {
        let mut state = self.state();
        for watcher in state.watchers.drain(..) {
            let _ = watcher.errors.try_send(Box::new(MockError(message.to_string())));
        }
    }

    pub fn calls(&self) -> Vec<CallRequest> {
        self.state().calls.clone()
    }

    pub fn transactions(&self) -> Vec<PendingTx> {
        self.state().transactions.clone()
    }

    /// Subscriptions opened on this backend that have been released.
    pub fn released_subscriptions(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContractCaller for MockBackend {
    async fn code_at(&self, address: Address, _block: Option<u64>) -> Result<Bytes, BackendError> {
        Ok(self.state().code.get(&address).cloned().unwrap_or_default())
    }

    async fn call_contract(&self, call: CallRequest, _block: Option<u64>) -> Result<Bytes, BackendError> {
        let mut state = self.state();
        state.calls.push(call.clone());
        if let Some(message) = &state.call_error {
            return Err(Box::new(MockError(message.clone())));
        }
        let response = call
            .data
            .get(..4)
            .and_then(|selector| state.responses.get(&FixedBytes::from_slice(selector)))
            .or(state.default_response.as_ref())
            .cloned()
            .unwrap_or_default();
        Ok(response)
    }
}

#[async_trait]
impl ContractTransactor for MockBackend {
    async fn send_transaction(&self, tx: TxRequest) -> Result<PendingTx, BackendError> {
        let mut state = self.state();
        if let Some(message) = &state.send_error {
            return Err(Box::new(MockError(message.clone())));
        }

        let next = state.nonces.entry(tx.from).or_insert(0);
        let nonce = tx.nonce.unwrap_or(*next);
        *next = nonce + 1;

        let mut preimage = tx.from.to_vec();
        preimage.extend(nonce.to_be_bytes());
        preimage.extend(tx.data.iter());
        let pending = PendingTx {
            hash: keccak256(preimage),
            from: tx.from,
            nonce,
            to: tx.to,
            value: tx.value,
            input: tx.data,
        };
        if let Some(address) = pending.contract_address() {
            state.code.insert(address, pending.input.clone());
        }
        state.transactions.push(pending.clone());
        Ok(pending)
    }
}

#[async_trait]
impl ContractFilterer for MockBackend {
    async fn filter_logs(&self, query: LogQuery) -> Result<Vec<RawLog>, BackendError> {
        let state = self.state();
        if let Some(message) = &state.call_error {
            return Err(Box::new(MockError(message.clone())));
        }
        Ok(state.logs.iter().filter(|log| query.matches(log)).cloned().collect())
    }

    async fn subscribe_logs(&self, query: LogQuery) -> Result<LogSubscription, BackendError> {
        let mut state = self.state();
        if let Some(message) = &state.subscribe_error {
            return Err(Box::new(MockError(message.clone())));
        }
        let (log_tx, log_rx) = mpsc::channel(64);
        let (err_tx, err_rx) = mpsc::channel(1);
        state.watchers.push(Watcher {
            query,
            logs: log_tx,
            errors: err_tx,
        });

        let released = self.released.clone();
        Ok(LogSubscription::new(log_rx, err_rx, move || {
            released.fetch_add(1, Ordering::SeqCst);
        }))
    }
}
