use alloy::primitives::{Address, Bytes, U256};
use tokio_util::sync::CancellationToken;

use super::backend::TxRequest;

/// Options for read-only calls.
#[derive(Debug, Clone, Default)]
pub struct CallOpts {
    /// Sender the call is simulated from
    pub from: Option<Address>,
    /// Block to run the call against; latest when unset
    pub block_number: Option<u64>,
    pub cancel: Option<CancellationToken>,
}

impl CallOpts {
    pub fn at_block(mut self, block_number: u64) -> Self {
        self.block_number = Some(block_number);
        self
    }

    pub fn from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// Options for state-changing transactions. Signing is left to the backend, which must
/// hold a signer for `from`.
#[derive(Debug, Clone, Default)]
pub struct TransactOpts {
    pub from: Address,
    /// Nonce to use; the backend picks the next pending nonce when unset
    pub nonce: Option<u64>,
    /// Wei sent along with the transaction
    pub value: U256,
    pub gas_limit: Option<u64>,
    pub gas_price: Option<u128>,
    pub max_fee_per_gas: Option<u128>,
    pub max_priority_fee_per_gas: Option<u128>,
    pub cancel: Option<CancellationToken>,
}

impl TransactOpts {
    pub fn new(from: Address) -> Self {
        Self {
            from,
            ..Default::default()
        }
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    pub fn with_nonce(mut self, nonce: u64) -> Self {
        self.nonce = Some(nonce);
        self
    }

    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub(crate) fn request(&self, to: Option<Address>, data: Bytes) -> TxRequest {
        TxRequest {
            from: self.from,
            to,
            data,
            value: self.value,
            nonce: self.nonce,
            gas_limit: self.gas_limit,
            gas_price: self.gas_price,
            max_fee_per_gas: self.max_fee_per_gas,
            max_priority_fee_per_gas: self.max_priority_fee_per_gas,
        }
    }
}

/// Block range for historical log queries.
#[derive(Debug, Clone, Default)]
pub struct FilterOpts {
    pub start: u64,
    /// Last block to include; latest when unset
    pub end: Option<u64>,
    pub cancel: Option<CancellationToken>,
}

impl FilterOpts {
    pub fn range(start: u64, end: Option<u64>) -> Self {
        Self {
            start,
            end,
            cancel: None,
        }
    }
}

/// Options for live log subscriptions.
#[derive(Debug, Clone, Default)]
pub struct WatchOpts {
    /// First block to deliver logs from; the current head when unset
    pub start: Option<u64>,
    /// Stops the watch task when cancelled
    pub cancel: Option<CancellationToken>,
}
