use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{Address, Bytes, B256};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::backend::{CallRequest, ContractCaller, ContractFilterer, ContractTransactor, LogQuery, LogSubscription};
use super::iterator::{LogDecoder, LogIterator};
use super::opts::{CallOpts, FilterOpts, TransactOpts, WatchOpts};
use super::watch::Subscription;
use super::{DecodedLog, PendingTx, RawLog};
use crate::abi::{Abi, ContractMetadata, StateMutability};
use crate::error::{BindError, Result};

/// Typed event produced by generated bindings.
pub trait EventBinding: Sized + Send + 'static {
    /// Key of the event in the contract ABI
    const EVENT: &'static str;

    /// Build the event from its decoded field values, in declaration order.
    fn from_log(values: Vec<DynSolValue>, raw: RawLog) -> Result<Self>;
}

/// A deployed contract bound to an ABI and a backend.
#[derive(Debug, Clone)]
pub struct BoundContract<B> {
    address: Address,
    abi: Arc<Abi>,
    backend: B,
}

async fn cancellable<T>(cancel: Option<&CancellationToken>, fut: impl Future<Output = T>) -> Result<T> {
    match cancel {
        Some(token) => tokio::select! {
            biased;
            _ = token.cancelled() => Err(BindError::Cancelled),
            out = fut => Ok(out),
        },
        None => Ok(fut.await),
    }
}

impl<B> BoundContract<B> {
    pub fn new(address: Address, abi: Arc<Abi>, backend: B) -> Self {
        Self { address, abi, backend }
    }

    /// Bind using shared contract metadata. Fails with `AbiResolutionFailed` when the
    /// metadata's ABI does not parse.
    pub fn bind(address: Address, metadata: &ContractMetadata, backend: B) -> Result<Self> {
        Ok(Self::new(address, metadata.abi()?, backend))
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn abi(&self) -> &Arc<Abi> {
        &self.abi
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Decode a log against a named event.
    pub fn unpack_log(&self, event: &str, log: &RawLog) -> Result<DecodedLog> {
        decode_dynamic(&self.abi, event, log)
    }

    /// Decode a log into a typed event.
    pub fn parse_log<E: EventBinding>(&self, log: &RawLog) -> Result<E> {
        decode_typed(&self.abi, log)
    }

    /// Build the log query for `event`. `filters[i]` lists accepted values for the i-th
    /// indexed parameter; an empty list matches anything.
    pub fn event_query(
        &self,
        event: &str,
        filters: Vec<Vec<DynSolValue>>,
        from_block: Option<u64>,
        to_block: Option<u64>,
    ) -> Result<LogQuery> {
        let event = self.abi.event(event)?;
        let indexed: Vec<_> = event.indexed().collect();
        if filters.len() > indexed.len() {
            return Err(BindError::InvalidArgument(format!(
                "event `{}` has {} indexed parameters, {} filters given",
                event.key,
                indexed.len(),
                filters.len()
            )));
        }

        let mut topics: Vec<Vec<B256>> = Vec::with_capacity(filters.len() + 1);
        if !event.anonymous {
            topics.push(vec![event.topic()]);
        }
        for (param, values) in indexed.iter().zip(filters) {
            let words = values
                .into_iter()
                .map(|value| param.ty.encode_topic(value))
                .collect::<Result<Vec<_>>>()?;
            topics.push(words);
        }
        while topics.last().is_some_and(|t| t.is_empty()) {
            topics.pop();
        }

        Ok(LogQuery {
            address: self.address,
            topics,
            from_block,
            to_block,
        })
    }
}

fn decode_dynamic(abi: &Abi, event: &str, log: &RawLog) -> Result<DecodedLog> {
    let event = abi.event(event)?;
    let values = event.decode_log(&log.topics, &log.data)?;
    Ok(DecodedLog {
        event: event.key.clone(),
        names: event.inputs.iter().map(|p| p.param.name.clone()).collect(),
        values,
        raw: log.clone(),
    })
}

fn decode_typed<E: EventBinding>(abi: &Abi, log: &RawLog) -> Result<E> {
    let values = abi.event(E::EVENT)?.decode_log(&log.topics, &log.data)?;
    E::from_log(values, log.clone())
}

/// Cancelling a watch must not cancel the caller's token.
fn watch_token(opts: &WatchOpts) -> CancellationToken {
    opts.cancel
        .as_ref()
        .map(CancellationToken::child_token)
        .unwrap_or_default()
}

fn dynamic_decoder(abi: Arc<Abi>, event: &str) -> LogDecoder<DecodedLog> {
    let event = event.to_string();
    Box::new(move |log| decode_dynamic(&abi, &event, log))
}

fn typed_decoder<E: EventBinding>(abi: Arc<Abi>) -> LogDecoder<E> {
    Box::new(move |log| decode_typed(&abi, log))
}

impl<B: ContractCaller> BoundContract<B> {
    /// Invoke a method as a read-only call and decode its outputs.
    pub async fn call(&self, opts: &CallOpts, method: &str, args: Vec<DynSolValue>) -> Result<Vec<DynSolValue>> {
        let function = self.abi.function(method)?;
        let input = function.encode_input(args)?;
        debug!("Calling {} on {}", function.signature(), self.address);

        let request = CallRequest {
            from: opts.from,
            to: self.address,
            data: input.into(),
        };
        let output = cancellable(
            opts.cancel.as_ref(),
            self.backend.call_contract(request, opts.block_number),
        )
        .await?
        .map_err(BindError::CallFailed)?;

        if output.is_empty() && !function.outputs.is_empty() {
            let code = cancellable(opts.cancel.as_ref(), self.backend.code_at(self.address, opts.block_number))
                .await?
                .map_err(BindError::CallFailed)?;
            if code.is_empty() {
                return Err(BindError::NoCode(self.address));
            }
        }
        function.decode_output(&output)
    }
}

impl<B: ContractTransactor> BoundContract<B> {
    /// Invoke a method by submitting a transaction.
    pub async fn transact(&self, opts: &TransactOpts, method: &str, args: Vec<DynSolValue>) -> Result<PendingTx> {
        let function = self.abi.function(method)?;
        if !opts.value.is_zero() && function.state_mutability != StateMutability::Payable {
            return Err(BindError::InvalidArgument(format!(
                "`{}` is not payable but {} wei was attached",
                function.key, opts.value
            )));
        }
        let input = function.encode_input(args)?;
        debug!("Transacting {} on {}", function.signature(), self.address);
        self.raw_transact(opts, input.into()).await
    }

    /// Submit a transaction with caller-supplied calldata.
    pub async fn raw_transact(&self, opts: &TransactOpts, calldata: Bytes) -> Result<PendingTx> {
        let tx = opts.request(Some(self.address), calldata);
        let pending = cancellable(opts.cancel.as_ref(), self.backend.send_transaction(tx))
            .await?
            .map_err(BindError::SubmissionFailed)?;
        info!("Submitted transaction {} to {}", pending.hash, self.address);
        Ok(pending)
    }

    /// Send plain value, hitting the receive or fallback function.
    pub async fn transfer(&self, opts: &TransactOpts) -> Result<PendingTx> {
        self.raw_transact(opts, Bytes::new()).await
    }
}

impl<B: ContractFilterer> BoundContract<B> {
    async fn query_logs(&self, query: LogQuery, opts: &FilterOpts) -> Result<LogSubscription> {
        let logs = cancellable(opts.cancel.as_ref(), self.backend.filter_logs(query))
            .await?
            .map_err(BindError::CallFailed)?;
        debug!("Fetched {} logs from {}", logs.len(), self.address);
        Ok(LogSubscription::from_logs(logs))
    }

    async fn subscribe(&self, query: LogQuery, cancel: Option<&CancellationToken>) -> Result<LogSubscription> {
        cancellable(cancel, self.backend.subscribe_logs(query))
            .await?
            .map_err(BindError::SubscriptionFailed)
    }

    /// Historical logs of `event`, decoded dynamically.
    pub async fn filter_logs(
        &self,
        opts: &FilterOpts,
        event: &str,
        filters: Vec<Vec<DynSolValue>>,
    ) -> Result<LogIterator<DecodedLog>> {
        let query = self.event_query(event, filters, Some(opts.start), opts.end)?;
        let subscription = self.query_logs(query, opts).await?;
        Ok(LogIterator::new(event, subscription, dynamic_decoder(self.abi.clone(), event)))
    }

    /// Historical logs of a typed event.
    pub async fn filter<E: EventBinding>(
        &self,
        opts: &FilterOpts,
        filters: Vec<Vec<DynSolValue>>,
    ) -> Result<LogIterator<E>> {
        let query = self.event_query(E::EVENT, filters, Some(opts.start), opts.end)?;
        let subscription = self.query_logs(query, opts).await?;
        Ok(LogIterator::new(E::EVENT, subscription, typed_decoder(self.abi.clone())))
    }

    /// Live logs of `event` as an iterator. Cancelling `opts.cancel` closes the iterator
    /// and releases the subscription.
    pub async fn subscribe_events(
        &self,
        opts: &WatchOpts,
        event: &str,
        filters: Vec<Vec<DynSolValue>>,
    ) -> Result<LogIterator<DecodedLog>> {
        let query = self.event_query(event, filters, opts.start, None)?;
        let subscription = self.subscribe(query, opts.cancel.as_ref()).await?;
        let decode = dynamic_decoder(self.abi.clone(), event);
        Ok(LogIterator::new(event, subscription, decode).with_cancel(opts.cancel.clone()))
    }

    /// Forward live logs of `event`, decoded dynamically, into `sink`.
    pub async fn watch_logs(
        &self,
        opts: &WatchOpts,
        event: &str,
        filters: Vec<Vec<DynSolValue>>,
        sink: mpsc::Sender<DecodedLog>,
    ) -> Result<Subscription> {
        let query = self.event_query(event, filters, opts.start, None)?;
        let subscription = self.subscribe(query, opts.cancel.as_ref()).await?;
        Ok(Subscription::spawn(
            event.to_string(),
            subscription,
            dynamic_decoder(self.abi.clone(), event),
            sink,
            watch_token(opts),
        ))
    }

    /// Forward live logs of a typed event into `sink`.
    pub async fn watch<E: EventBinding>(
        &self,
        opts: &WatchOpts,
        filters: Vec<Vec<DynSolValue>>,
        sink: mpsc::Sender<E>,
    ) -> Result<Subscription> {
        let query = self.event_query(E::EVENT, filters, opts.start, None)?;
        let subscription = self.subscribe(query, opts.cancel.as_ref()).await?;
        Ok(Subscription::spawn(
            E::EVENT.to_string(),
            subscription,
            typed_decoder(self.abi.clone()),
            sink,
            watch_token(opts),
        ))
    }
}

/// Deploy a contract from its metadata and bind the result.
///
/// Constructor arguments are appended to the creation bytecode. The returned address is
/// derived from the sender and nonce, so it is known before the transaction is mined.
pub async fn deploy_contract<B: ContractTransactor>(
    opts: &TransactOpts,
    metadata: &ContractMetadata,
    backend: B,
    args: Vec<DynSolValue>,
) -> Result<(Address, PendingTx, BoundContract<B>)> {
    let abi = metadata.abi()?;
    let mut code = metadata.bytecode()?;
    match &abi.constructor {
        Some(constructor) => code.extend(constructor.encode_args(args)?),
        None if !args.is_empty() => {
            return Err(BindError::InvalidArgument(format!(
                "contract has no constructor but {} arguments were given",
                args.len()
            )))
        }
        None => {}
    }

    let tx = opts.request(None, code.into());
    let pending = cancellable(opts.cancel.as_ref(), backend.send_transaction(tx))
        .await?
        .map_err(BindError::DeploymentFailed)?;
    let address = pending.from.create(pending.nonce);
    info!("Deploying contract to {} in transaction {}", address, pending.hash);

    Ok((address, pending, BoundContract::new(address, abi, backend)))
}
