//! JSON-RPC backend and helpers for the command-line tool.

pub mod json;
pub mod provider;
pub mod utils;

use serde::{Deserialize, Serialize};

use crate::bind::{DecodedLog, PendingTx};
use json::value_to_json;

/// A decoded log as printed by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventInfo {
    pub event: String,
    pub address: String,
    pub block_number: Option<u64>,
    pub transaction_hash: Option<String>,
    pub log_index: Option<u64>,
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl From<&DecodedLog> for EventInfo {
    fn from(log: &DecodedLog) -> Self {
        Self {
            event: log.event.clone(),
            address: log.raw.address.to_checksum(None),
            block_number: log.raw.block_number,
            transaction_hash: log.raw.transaction_hash.map(|h| format!("{h:#x}")),
            log_index: log.raw.log_index,
            fields: log
                .names
                .iter()
                .cloned()
                .zip(log.values.iter().map(value_to_json))
                .collect(),
        }
    }
}

/// A submitted transaction as printed by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionInfo {
    pub hash: String,
    pub from: String,
    pub to: Option<String>,
    pub nonce: u64,
    pub value: String,
    /// Address a creation transaction deploys to
    pub contract_address: Option<String>,
    /// Block explorer page, when the network has one configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<String>,
}

impl From<&PendingTx> for TransactionInfo {
    fn from(tx: &PendingTx) -> Self {
        Self {
            hash: format!("{:#x}", tx.hash),
            from: tx.from.to_checksum(None),
            to: tx.to.map(|a| a.to_checksum(None)),
            nonce: tx.nonce,
            value: tx.value.to_string(),
            contract_address: tx.contract_address().map(|a| a.to_checksum(None)),
            explorer_url: None,
        }
    }
}
