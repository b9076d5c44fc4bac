//! Runtime dispatch layer shared by dynamic callers and generated bindings.
//!
//! A [`BoundContract`] pairs a deployed address with a parsed ABI and a backend. What it
//! can do is decided by the backend's capabilities: [`ContractCaller`] for read calls,
//! [`ContractTransactor`] for transactions and [`ContractFilterer`] for logs.

mod backend;
mod contract;
mod iterator;
pub mod mock;
mod opts;
mod value;
mod watch;

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{Address, Bytes, TxHash, B256, U256};

pub use backend::{
    CallRequest, ContractBackend, ContractCaller, ContractFilterer, ContractTransactor, LogQuery,
    LogSubscription, SubscriptionItem, TxRequest,
};
pub use contract::{deploy_contract, BoundContract, EventBinding};
pub use iterator::LogIterator;
pub use opts::{CallOpts, FilterOpts, TransactOpts, WatchOpts};
pub use tokio_util::sync::CancellationToken;
pub use value::{AbiValue, Fields};
pub use watch::Subscription;

/// Channel half that receives events forwarded by a watch.
pub type EventSink<T> = tokio::sync::mpsc::Sender<T>;

/// A log as delivered by a backend, with its provenance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawLog {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    pub block_number: Option<u64>,
    pub block_hash: Option<B256>,
    pub transaction_hash: Option<TxHash>,
    pub transaction_index: Option<u64>,
    pub log_index: Option<u64>,
    /// Set when the log was dropped by a chain reorganisation
    pub removed: bool,
}

impl From<alloy::rpc::types::Log> for RawLog {
    fn from(log: alloy::rpc::types::Log) -> Self {
        Self {
            address: log.address(),
            topics: log.topics().to_vec(),
            data: log.data().data.clone(),
            block_number: log.block_number,
            block_hash: log.block_hash,
            transaction_hash: log.transaction_hash,
            transaction_index: log.transaction_index,
            log_index: log.log_index,
            removed: log.removed,
        }
    }
}

/// A log decoded against an event known only at runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedLog {
    pub event: String,
    /// Field names, in declaration order
    pub names: Vec<String>,
    /// Field values, in declaration order; hashed indexed fields are their topic
    pub values: Vec<DynSolValue>,
    pub raw: RawLog,
}

impl DecodedLog {
    pub fn get(&self, name: &str) -> Option<&DynSolValue> {
        self.names
            .iter()
            .position(|n| n == name)
            .and_then(|i| self.values.get(i))
    }
}

/// Handle to a submitted, not yet mined, transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTx {
    pub hash: TxHash,
    pub from: Address,
    pub nonce: u64,
    pub to: Option<Address>,
    pub value: U256,
    pub input: Bytes,
}

impl PendingTx {
    /// Address a contract-creation transaction deploys to.
    pub fn contract_address(&self) -> Option<Address> {
        match self.to {
            Some(_) => None,
            None => Some(self.from.create(self.nonce)),
        }
    }
}
