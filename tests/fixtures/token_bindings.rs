// Code generated by contract-bind. DO NOT EDIT.
// Bindings for the Token contract; regenerate instead of editing.

#[allow(unused_imports)]
use contract_bind::abi::ContractMetadata;
#[allow(unused_imports)]
use contract_bind::bind::{
    deploy_contract, AbiValue, BoundContract, CallOpts, ContractCaller, ContractFilterer, ContractTransactor,
    EventBinding, EventSink, Fields, FilterOpts, LogIterator, PendingTx, RawLog, Subscription, TransactOpts,
    WatchOpts,
};
#[allow(unused_imports)]
use contract_bind::error::BindError;
#[allow(unused_imports)]
use contract_bind::primitives::{Address, Bytes, FixedBytes, B256, I256, U256};
#[allow(unused_imports)]
use contract_bind::{async_trait, DynSolValue};

/// ABI and deployment bytecode of Token.
pub static TOKEN_METADATA: ContractMetadata = ContractMetadata::from_static(
    r#"[
  {"type":"constructor","inputs":[{"name":"supply","type":"uint256"}],"stateMutability":"nonpayable"},
  {"type":"function","name":"balanceOf","inputs":[{"name":"owner","type":"address"}],"outputs":[{"name":"","type":"uint256"}],"stateMutability":"view"},
  {"type":"function","name":"approve","inputs":[{"name":"spender","type":"address"},{"name":"value","type":"uint256"}],"outputs":[{"name":"","type":"bool"}],"stateMutability":"nonpayable"},
  {"type":"event","name":"Approval","inputs":[{"name":"owner","type":"address","indexed":true},{"name":"spender","type":"address","indexed":true},{"name":"value","type":"uint256","indexed":false}],"anonymous":false},
  {"type":"event","name":"Paused","inputs":[],"anonymous":false},
  {"type":"receive","stateMutability":"payable"}
]
"#,
    Some("0x6001"),
);

/// `Approval(address,address,uint256)` event of Token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenApproval {
    pub owner: Address,
    pub spender: Address,
    pub value: U256,
    pub raw: RawLog,
}

impl EventBinding for TokenApproval {
    const EVENT: &'static str = "Approval";

    fn from_log(values: Vec<DynSolValue>, raw: RawLog) -> Result<Self, BindError> {
        let mut fields = Fields::new(values, "Approval");
        Ok(Self {
            owner: fields.next()?,
            spender: fields.next()?,
            value: fields.next()?,
            raw,
        })
    }
}

/// `Paused()` event of Token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPaused {
    pub raw: RawLog,
}

impl EventBinding for TokenPaused {
    const EVENT: &'static str = "Paused";

    fn from_log(_values: Vec<DynSolValue>, raw: RawLog) -> Result<Self, BindError> {
        Ok(Self { raw })
    }
}

/// Read-only bindings to Token.
#[async_trait]
pub trait TokenCaller {
    /// Calls `balanceOf(address)` (view).
    async fn balance_of(&self, opts: &CallOpts, owner: Address) -> Result<U256, BindError>;
}

/// Write-only bindings to Token.
#[async_trait]
pub trait TokenTransactor {
    /// Submits `approve(address,uint256)` (nonpayable).
    async fn approve(&self, opts: &TransactOpts, spender: Address, value: U256) -> Result<PendingTx, BindError>;
    /// Sends plain value to the receive function.
    async fn receive(&self, opts: &TransactOpts) -> Result<PendingTx, BindError>;
}

/// Log filtering bindings to Token.
#[async_trait]
pub trait TokenFilterer {
    /// Fetches past `Approval` logs. Each list filters one indexed field; an empty list matches anything.
    async fn filter_approval(&self, opts: &FilterOpts, owner: Vec<Address>, spender: Vec<Address>) -> Result<LogIterator<TokenApproval>, BindError>;
    /// Forwards new `Approval` logs into `sink`.
    async fn watch_approval(&self, opts: &WatchOpts, sink: EventSink<TokenApproval>, owner: Vec<Address>, spender: Vec<Address>) -> Result<Subscription, BindError>;
    /// Decodes a raw log as `Approval`.
    fn parse_approval(&self, log: &RawLog) -> Result<TokenApproval, BindError>;
    /// Fetches past `Paused` logs. Each list filters one indexed field; an empty list matches anything.
    async fn filter_paused(&self, opts: &FilterOpts) -> Result<LogIterator<TokenPaused>, BindError>;
    /// Forwards new `Paused` logs into `sink`.
    async fn watch_paused(&self, opts: &WatchOpts, sink: EventSink<TokenPaused>) -> Result<Subscription, BindError>;
    /// Decodes a raw log as `Paused`.
    fn parse_paused(&self, log: &RawLog) -> Result<TokenPaused, BindError>;
}

/// Binding to a deployed Token contract over backend `B`.
#[derive(Debug, Clone)]
pub struct Token<B> {
    contract: BoundContract<B>,
}

impl<B> Token<B> {
    /// Bind to the Token deployed at `address`.
    pub fn new(address: Address, backend: B) -> Result<Self, BindError> {
        Ok(Self {
            contract: BoundContract::bind(address, &TOKEN_METADATA, backend)?,
        })
    }

    pub fn address(&self) -> Address {
        self.contract.address()
    }

    /// Untyped access for raw calls, transactions and transfers.
    pub fn raw(&self) -> &BoundContract<B> {
        &self.contract
    }

    pub fn session(&self, call_opts: CallOpts, transact_opts: TransactOpts) -> TokenSession<'_, B> {
        TokenSession {
            contract: self,
            call_opts,
            transact_opts,
        }
    }

    pub fn caller_session(&self, call_opts: CallOpts) -> TokenCallerSession<'_, B> {
        TokenCallerSession {
            contract: self,
            call_opts,
        }
    }

    pub fn transactor_session(&self, transact_opts: TransactOpts) -> TokenTransactorSession<'_, B> {
        TokenTransactorSession {
            contract: self,
            transact_opts,
        }
    }
}

impl<B: ContractCaller> Token<B> {
    /// Bind a read-only instance.
    pub fn new_caller(address: Address, backend: B) -> Result<Self, BindError> {
        Self::new(address, backend)
    }
}

impl<B: ContractTransactor> Token<B> {
    /// Bind a write-only instance.
    pub fn new_transactor(address: Address, backend: B) -> Result<Self, BindError> {
        Self::new(address, backend)
    }
}

impl<B: ContractFilterer> Token<B> {
    /// Bind a log-filtering instance.
    pub fn new_filterer(address: Address, backend: B) -> Result<Self, BindError> {
        Self::new(address, backend)
    }
}

#[async_trait]
impl<B: ContractCaller> TokenCaller for Token<B> {
    async fn balance_of(&self, opts: &CallOpts, owner: Address) -> Result<U256, BindError> {
        let values = self.contract.call(opts, "balanceOf", vec![owner.into_dyn()]).await?;
        Fields::new(values, "balanceOf").next()
    }
}

#[async_trait]
impl<B: ContractTransactor> TokenTransactor for Token<B> {
    async fn approve(&self, opts: &TransactOpts, spender: Address, value: U256) -> Result<PendingTx, BindError> {
        self.contract.transact(opts, "approve", vec![spender.into_dyn(), value.into_dyn()]).await
    }

    async fn receive(&self, opts: &TransactOpts) -> Result<PendingTx, BindError> {
        self.contract.transfer(opts).await
    }
}

#[async_trait]
impl<B: ContractFilterer> TokenFilterer for Token<B> {
    async fn filter_approval(&self, opts: &FilterOpts, owner: Vec<Address>, spender: Vec<Address>) -> Result<LogIterator<TokenApproval>, BindError> {
        let topics = vec![
            owner.into_iter().map(AbiValue::into_dyn).collect(),
            spender.into_iter().map(AbiValue::into_dyn).collect(),
        ];
        self.contract.filter::<TokenApproval>(opts, topics).await
    }

    async fn watch_approval(&self, opts: &WatchOpts, sink: EventSink<TokenApproval>, owner: Vec<Address>, spender: Vec<Address>) -> Result<Subscription, BindError> {
        let topics = vec![
            owner.into_iter().map(AbiValue::into_dyn).collect(),
            spender.into_iter().map(AbiValue::into_dyn).collect(),
        ];
        self.contract.watch::<TokenApproval>(opts, topics, sink).await
    }

    fn parse_approval(&self, log: &RawLog) -> Result<TokenApproval, BindError> {
        self.contract.parse_log::<TokenApproval>(log)
    }

    async fn filter_paused(&self, opts: &FilterOpts) -> Result<LogIterator<TokenPaused>, BindError> {
        let topics = Vec::new();
        self.contract.filter::<TokenPaused>(opts, topics).await
    }

    async fn watch_paused(&self, opts: &WatchOpts, sink: EventSink<TokenPaused>) -> Result<Subscription, BindError> {
        let topics = Vec::new();
        self.contract.watch::<TokenPaused>(opts, topics, sink).await
    }

    fn parse_paused(&self, log: &RawLog) -> Result<TokenPaused, BindError> {
        self.contract.parse_log::<TokenPaused>(log)
    }
}

/// Token bindings with preset call and transact options.
pub struct TokenSession<'a, B> {
    pub contract: &'a Token<B>,
    pub call_opts: CallOpts,
    pub transact_opts: TransactOpts,
}

impl<'a, B: ContractCaller> TokenSession<'a, B> {
    /// Calls `balanceOf(address)` (view).
    pub async fn balance_of(&self, owner: Address) -> Result<U256, BindError> {
        self.contract.balance_of(&self.call_opts, owner).await
    }
}

impl<'a, B: ContractTransactor> TokenSession<'a, B> {
    /// Submits `approve(address,uint256)` (nonpayable).
    pub async fn approve(&self, spender: Address, value: U256) -> Result<PendingTx, BindError> {
        self.contract.approve(&self.transact_opts, spender, value).await
    }

    /// Sends plain value to the receive function.
    pub async fn receive(&self) -> Result<PendingTx, BindError> {
        self.contract.receive(&self.transact_opts).await
    }
}

/// Token read-only bindings with preset call options.
pub struct TokenCallerSession<'a, B> {
    pub contract: &'a Token<B>,
    pub call_opts: CallOpts,
}

impl<'a, B: ContractCaller> TokenCallerSession<'a, B> {
    /// Calls `balanceOf(address)` (view).
    pub async fn balance_of(&self, owner: Address) -> Result<U256, BindError> {
        self.contract.balance_of(&self.call_opts, owner).await
    }
}

/// Token write-only bindings with preset transact options.
pub struct TokenTransactorSession<'a, B> {
    pub contract: &'a Token<B>,
    pub transact_opts: TransactOpts,
}

impl<'a, B: ContractTransactor> TokenTransactorSession<'a, B> {
    /// Submits `approve(address,uint256)` (nonpayable).
    pub async fn approve(&self, spender: Address, value: U256) -> Result<PendingTx, BindError> {
        self.contract.approve(&self.transact_opts, spender, value).await
    }

    /// Sends plain value to the receive function.
    pub async fn receive(&self) -> Result<PendingTx, BindError> {
        self.contract.receive(&self.transact_opts).await
    }
}

/// Deploy a new Token and bind the created instance.
pub async fn deploy_token<B: ContractTransactor>(
    opts: &TransactOpts,
    backend: B, supply: U256,
) -> Result<(Address, PendingTx, Token<B>), BindError> {
    let (address, tx, contract) = deploy_contract(opts, &TOKEN_METADATA, backend, vec![supply.into_dyn()]).await?;
    Ok((address, tx, Token { contract }))
}
