use crate::bind::{CallRequest, ContractCaller, ContractFilterer, ContractTransactor, LogQuery, LogSubscription, PendingTx, RawLog, TxRequest};
use crate::config::{Config, NetworkConfig};
use crate::error::BackendError;
use alloy::{
    eips::BlockId,
    network::{EthereumWallet, TransactionBuilder},
    primitives::Address,
    providers::{Provider, ProviderBuilder, RootProvider},
    rpc::types::{Filter, TransactionRequest},
    signers::local::PrivateKeySigner,
    transports::{
        http::{Client, Http},
        Transport,
    },
};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Contract backend over a JSON-RPC provider.
///
/// Live subscriptions poll `eth_blockNumber` and `eth_getLogs` every `poll_interval`,
/// so they work over plain HTTP.
#[derive(Debug, Clone)]
pub struct RpcBackend<P, T = Http<Client>> {
    provider: P,
    /// Sender used when a request leaves `from` unset
    default_from: Option<Address>,
    poll_interval: Duration,
    _transport: PhantomData<fn() -> T>,
}

impl<P, T> RpcBackend<P, T>
where
    P: Provider<T> + Clone + 'static,
    T: Transport + Clone,
{
    pub fn new(provider: P, poll_interval: Duration) -> Self {
        Self {
            provider,
            default_from: None,
            // tokio intervals must be non-zero
            poll_interval: poll_interval.max(Duration::from_millis(10)),
            _transport: PhantomData,
        }
    }

    pub fn with_default_from(mut self, from: Address) -> Self {
        self.default_from = Some(from);
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }
}

fn log_filter(query: &LogQuery, from_block: u64, to_block: Option<u64>) -> Filter {
    let mut filter = Filter::new().address(query.address).from_block(from_block);
    if let Some(to) = to_block {
        filter = filter.to_block(to);
    }
    for (i, topics) in query.topics.iter().enumerate().take(4) {
        let topics = topics.clone();
        filter = match i {
            0 => filter.event_signature(topics),
            1 => filter.topic1(topics),
            2 => filter.topic2(topics),
            _ => filter.topic3(topics),
        };
    }
    filter
}

#[async_trait]
impl<P, T> ContractCaller for RpcBackend<P, T>
where
    P: Provider<T> + Clone + 'static,
    T: Transport + Clone,
{
    async fn code_at(&self, address: Address, block: Option<u64>) -> Result<alloy::primitives::Bytes, BackendError> {
        let mut request = self.provider.get_code_at(address);
        if let Some(number) = block {
            request = request.block_id(BlockId::number(number));
        }
        Ok(request.await?)
    }

    async fn call_contract(&self, call: CallRequest, block: Option<u64>) -> Result<alloy::primitives::Bytes, BackendError> {
        let mut tx = TransactionRequest::default().with_to(call.to).with_input(call.data);
        if let Some(from) = call.from.or(self.default_from) {
            tx = tx.with_from(from);
        }
        let mut request = self.provider.call(&tx);
        if let Some(number) = block {
            request = request.block(BlockId::number(number));
        }
        Ok(request.await?)
    }
}

#[async_trait]
impl<P, T> ContractTransactor for RpcBackend<P, T>
where
    P: Provider<T> + Clone + 'static,
    T: Transport + Clone,
{
    async fn send_transaction(&self, tx: TxRequest) -> Result<PendingTx, BackendError> {
        let from = if tx.from.is_zero() {
            self.default_from.ok_or("transaction has no sender and no signer is configured")?
        } else {
            tx.from
        };
        let nonce = match tx.nonce {
            Some(nonce) => nonce,
            None => self.provider.get_transaction_count(from).pending().await?,
        };

        let mut request = TransactionRequest::default()
            .with_from(from)
            .with_nonce(nonce)
            .with_value(tx.value);
        request = match tx.to {
            Some(to) => request.with_to(to).with_input(tx.data.clone()),
            None => request.with_deploy_code(tx.data.clone()),
        };
        if let Some(gas) = tx.gas_limit {
            request = request.with_gas_limit(gas);
        }
        if let Some(price) = tx.gas_price {
            request = request.with_gas_price(price);
        }
        if let Some(fee) = tx.max_fee_per_gas {
            request = request.with_max_fee_per_gas(fee);
        }
        if let Some(tip) = tx.max_priority_fee_per_gas {
            request = request.with_max_priority_fee_per_gas(tip);
        }

        let pending = self.provider.send_transaction(request).await?;
        let hash = *pending.tx_hash();
        debug!("Submitted transaction {} from {} with nonce {}", hash, from, nonce);
        Ok(PendingTx {
            hash,
            from,
            nonce,
            to: tx.to,
            value: tx.value,
            input: tx.data,
        })
    }
}

#[async_trait]
impl<P, T> ContractFilterer for RpcBackend<P, T>
where
    P: Provider<T> + Clone + 'static,
    T: Transport + Clone,
{
    async fn filter_logs(&self, query: LogQuery) -> Result<Vec<RawLog>, BackendError> {
        let filter = log_filter(&query, query.from_block.unwrap_or(0), query.to_block);
        let logs = self.provider.get_logs(&filter).await?;
        Ok(logs.into_iter().map(RawLog::from).collect())
    }

    async fn subscribe_logs(&self, query: LogQuery) -> Result<LogSubscription, BackendError> {
        let mut next_block = match query.from_block {
            Some(block) => block,
            None => self.provider.get_block_number().await? + 1,
        };
        let (log_tx, log_rx) = mpsc::channel(256);
        let (err_tx, err_rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();

        let provider = self.provider.clone();
        let poll_interval = self.poll_interval;
        let stop = cancel.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            loop {
                tokio::select! {
                    _ = stop.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let head = match provider.get_block_number().await {
                    Ok(head) => head,
                    Err(e) => {
                        let _ = err_tx.try_send(e.into());
                        break;
                    }
                };
                if head < next_block {
                    continue;
                }
                let to_block = query.to_block.map_or(head, |to| to.min(head));
                let logs = match provider.get_logs(&log_filter(&query, next_block, Some(to_block))).await {
                    Ok(logs) => logs,
                    Err(e) => {
                        let _ = err_tx.try_send(e.into());
                        break;
                    }
                };
                for log in logs {
                    if log_tx.send(RawLog::from(log)).await.is_err() {
                        return;
                    }
                }

                next_block = to_block + 1;
                if query.to_block.is_some_and(|to| next_block > to) {
                    break;
                }
            }
            debug!("Log polling for {} stopped", query.address);
        });

        Ok(LogSubscription::new(log_rx, err_rx, move || cancel.cancel()))
    }
}

/// HTTP providers for every configured network.
#[derive(Debug)]
pub struct ProviderManager {
    providers: HashMap<String, RootProvider<Http<Client>>>,
    config: Config,
}

impl ProviderManager {
    pub fn new(config: Config) -> Result<Self> {
        let mut providers = HashMap::new();

        for (network_name, network_config) in &config.networks {
            let provider = Self::create_provider(network_config)
                .map_err(|e| anyhow!("Invalid RPC URL for network '{}': {}", network_name, e))?;
            providers.insert(network_name.clone(), provider);
        }

        Ok(Self { providers, config })
    }

    fn create_provider(network_config: &NetworkConfig) -> Result<RootProvider<Http<Client>>> {
        let provider = ProviderBuilder::new().on_http(network_config.rpc_url.parse()?);

        Ok(provider)
    }

    pub fn get_provider(&self, network: Option<&str>) -> Result<&RootProvider<Http<Client>>> {
        let network_name = network.unwrap_or(&self.config.default_network);
        self.providers
            .get(network_name)
            .ok_or_else(|| anyhow!("Network '{}' not found", network_name))
    }

    pub fn get_network_config(&self, network: Option<&str>) -> Result<&NetworkConfig> {
        self.config.network(network)
    }

    pub fn get_available_networks(&self) -> Vec<String> {
        let mut names: Vec<String> = self.config.networks.keys().cloned().collect();
        names.sort();
        names
    }

    /// Read-only backend for calls and log queries.
    pub fn backend(&self, network: Option<&str>) -> Result<RpcBackend<RootProvider<Http<Client>>>> {
        let provider = self.get_provider(network)?.clone();
        let poll = Duration::from_millis(self.get_network_config(network)?.poll_interval_ms);
        Ok(RpcBackend::new(provider, poll))
    }

    /// Backend that signs with `private_key` and fills nonce, gas and chain id.
    pub fn signing_backend(
        &self,
        network: Option<&str>,
        private_key: &str,
    ) -> Result<RpcBackend<impl Provider<Http<Client>> + Clone + 'static>> {
        let network_config = self.get_network_config(network)?;
        let key = private_key.trim();
        let key = key.strip_prefix("0x").unwrap_or(key);
        let signer = PrivateKeySigner::from_str(key).map_err(|e| anyhow!("Invalid private key: {}", e))?;
        let from = signer.address();

        let url = network_config
            .rpc_url
            .parse()
            .map_err(|e| anyhow!("Invalid RPC URL '{}': {}", network_config.rpc_url, e))?;
        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(EthereumWallet::from(signer))
            .on_http(url);

        let poll = Duration::from_millis(network_config.poll_interval_ms);
        Ok(RpcBackend::new(provider, poll).with_default_from(from))
    }

    /// Validates network connectivity with detailed error information
    pub async fn validate_network_connection(&self, network: Option<&str>) -> Result<u64> {
        let network_name = network.unwrap_or(&self.config.default_network);
        let provider = self
            .get_provider(network)
            .map_err(|e| anyhow!("Network '{}' is not configured: {}", network_name, e))?;

        match provider.get_block_number().await {
            Ok(head) => Ok(head),
            Err(e) => {
                warn!("Connection check failed for network {}: {}", network_name, e);
                Err(anyhow!(
                    "Cannot connect to network '{}': {}. Please check your RPC endpoint configuration and network connectivity.",
                    network_name,
                    crate::ethereum::utils::interpret_rpc_error(&e.to_string())
                ))
            }
        }
    }
}
