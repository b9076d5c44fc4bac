use alloy::primitives::{B256, U256};
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::abi::ContractMetadata;
use crate::bind::TransactOpts;
use crate::codegen::CodegenOptions;

pub const RPC_URL_ENV: &str = "CONTRACT_BIND_RPC_URL";
pub const PRIVATE_KEY_ENV: &str = "CONTRACT_BIND_PRIVATE_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub networks: HashMap<String, NetworkConfig>,
    pub default_network: String,
    pub security: SecurityConfig,
    #[serde(default)]
    pub codegen: CodegenConfig,
    #[serde(default)]
    pub contracts: Vec<ContractEntry>,
    /// Signing key, taken from the environment only and never written out
    #[serde(skip)]
    pub private_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    /// Interval between `eth_getLogs` polls for live watches
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    pub explorer_url: Option<String>,
    pub gas: GasConfig,
}

fn default_poll_interval() -> u64 {
    2_000
}

impl NetworkConfig {
    /// Block explorer page of transaction `hash`, when an explorer is configured.
    pub fn tx_url(&self, hash: B256) -> Option<String> {
        self.explorer_url
            .as_deref()
            .map(|base| format!("{}/tx/{:#x}", base.trim_end_matches('/'), hash))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GasConfig {
    pub default_gas_limit: u64,
    pub max_gas_price: Option<u64>,
    pub priority_fee: Option<u64>,
}

/// Tip used with a configured `max_gas_price` when no `priority_fee` is set (1 gwei).
const DEFAULT_PRIORITY_FEE: u64 = 1_000_000_000;

impl GasConfig {
    /// Fill the gas settings `opts` leaves unset from this network's defaults.
    ///
    /// The fee cap and tip are set together or not at all: a lone EIP-1559 fee would be
    /// re-estimated by the provider. The tip never exceeds the cap.
    pub fn apply(&self, mut opts: TransactOpts) -> TransactOpts {
        opts.gas_limit.get_or_insert(self.default_gas_limit);
        let fees_unset =
            opts.gas_price.is_none() && opts.max_fee_per_gas.is_none() && opts.max_priority_fee_per_gas.is_none();
        if let (Some(cap), true) = (self.max_gas_price, fees_unset) {
            let tip = self.priority_fee.unwrap_or(DEFAULT_PRIORITY_FEE).min(cap);
            opts.max_fee_per_gas = Some(cap.into());
            opts.max_priority_fee_per_gas = Some(tip.into());
        }
        opts
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub allow_write_operations: bool,
    /// Upper bound on value attached to a transaction, in wei
    pub max_transaction_value: Option<String>,
}

impl SecurityConfig {
    /// Reject writes when disabled and values above the configured cap.
    pub fn check_transaction(&self, value: U256) -> Result<()> {
        if !self.allow_write_operations {
            return Err(anyhow!(
                "Write operations are disabled. Pass --allow-writes or set security.allow_write_operations"
            ));
        }
        if let Some(max) = &self.max_transaction_value {
            let max = U256::from_str_radix(max.trim(), 10)
                .map_err(|_| anyhow!("Invalid security.max_transaction_value: {}", max))?;
            if value > max {
                return Err(anyhow!("Transaction value {} exceeds the configured maximum {}", value, max));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CodegenConfig {
    pub runtime_crate: String,
    pub output_dir: PathBuf,
    pub emit_deploy: bool,
}

impl Default for CodegenConfig {
    fn default() -> Self {
        let options = CodegenOptions::default();
        Self {
            runtime_crate: options.runtime_crate,
            output_dir: PathBuf::from("src/bindings"),
            emit_deploy: options.emit_deploy,
        }
    }
}

impl CodegenConfig {
    pub fn options(&self) -> CodegenOptions {
        CodegenOptions {
            runtime_crate: self.runtime_crate.clone(),
            emit_deploy: self.emit_deploy,
        }
    }
}

/// A contract to generate bindings for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractEntry {
    pub name: String,
    /// ABI JSON, or a compiler artifact holding both ABI and bytecode
    pub abi: PathBuf,
    /// Hex bytecode file
    pub bin: Option<PathBuf>,
    /// Output file; defaults to `<output_dir>/<name in snake case>.rs`
    pub output: Option<PathBuf>,
}

impl ContractEntry {
    pub async fn load_metadata(&self) -> Result<ContractMetadata> {
        load_metadata(&self.abi, self.bin.as_deref()).await
    }

    pub fn output_path(&self, codegen: &CodegenConfig) -> PathBuf {
        self.output.clone().unwrap_or_else(|| {
            codegen
                .output_dir
                .join(format!("{}.rs", crate::codegen::mapper::snake_ident(&self.name)))
        })
    }
}

/// Read an ABI (or artifact) file and an optional bytecode file.
pub async fn load_metadata(abi: &Path, bin: Option<&Path>) -> Result<ContractMetadata> {
    let text = fs::read_to_string(abi)
        .await
        .map_err(|e| anyhow!("Failed to read ABI file {:?}: {}", abi, e))?;

    let metadata = if text.trim_start().starts_with('{') {
        ContractMetadata::from_artifact(&text).map_err(|e| anyhow!("Invalid artifact {:?}: {}", abi, e))?
    } else {
        ContractMetadata::new(text, None)
    };

    match bin {
        Some(path) => {
            let code = fs::read_to_string(path)
                .await
                .map_err(|e| anyhow!("Failed to read bytecode file {:?}: {}", path, e))?;
            Ok(ContractMetadata::new(metadata.abi_json(), Some(code.trim().to_string())))
        }
        None => Ok(metadata),
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut networks = HashMap::new();

        networks.insert(
            "ethereum".to_string(),
            NetworkConfig {
                rpc_url: "https://eth.llamarpc.com".to_string(),
                chain_id: 1,
                poll_interval_ms: 12_000,
                explorer_url: Some("https://etherscan.io".to_string()),
                gas: GasConfig {
                    default_gas_limit: 100000,
                    max_gas_price: Some(50_000_000_000), // 50 Gwei
                    priority_fee: Some(2_000_000_000),   // 2 Gwei
                },
            },
        );

        networks.insert(
            "sepolia".to_string(),
            NetworkConfig {
                rpc_url: "https://rpc.sepolia.org".to_string(),
                chain_id: 11155111,
                poll_interval_ms: 12_000,
                explorer_url: Some("https://sepolia.etherscan.io".to_string()),
                gas: GasConfig {
                    default_gas_limit: 100000,
                    max_gas_price: Some(20_000_000_000), // 20 Gwei
                    priority_fee: Some(1_000_000_000),   // 1 Gwei
                },
            },
        );

        networks.insert(
            "local".to_string(),
            NetworkConfig {
                rpc_url: "http://127.0.0.1:8545".to_string(),
                chain_id: 31337,
                poll_interval_ms: default_poll_interval(),
                explorer_url: None,
                gas: GasConfig {
                    default_gas_limit: 1_000_000,
                    max_gas_price: None,
                    priority_fee: None,
                },
            },
        );

        Self {
            networks,
            default_network: "ethereum".to_string(),
            security: SecurityConfig {
                allow_write_operations: false,
                max_transaction_value: None,
            },
            codegen: CodegenConfig::default(),
            contracts: Vec::new(),
            private_key: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {:?}: {}", path, e))?;

        let config: Config =
            toml::from_str(&content).map_err(|e| anyhow!("Failed to parse config file {:?}: {}", path, e))?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).map_err(|e| anyhow!("Failed to serialize config: {}", e))?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| anyhow!("Failed to create config directory {:?}: {}", parent, e))?;
            }
        }

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {:?}: {}", path, e))?;

        Ok(())
    }

    /// Load configuration with fallback to default
    pub async fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Self {
        let mut config = match path {
            Some(path) => match Self::load_from_file(path).await {
                Ok(config) => {
                    tracing::info!("Loaded configuration from file");
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to load config file, using defaults: {}", e);
                    Self::default()
                }
            },
            None => Self::default(),
        };

        config.apply_overrides(std::env::var(RPC_URL_ENV).ok(), std::env::var(PRIVATE_KEY_ENV).ok());
        config
    }

    /// Apply environment overrides: an RPC URL for the default network and a signing key.
    pub fn apply_overrides(&mut self, rpc_url: Option<String>, private_key: Option<String>) {
        if let Some(url) = rpc_url.filter(|u| !u.trim().is_empty()) {
            match self.networks.get_mut(&self.default_network) {
                Some(network) => {
                    tracing::debug!("Using {} for network {}", RPC_URL_ENV, self.default_network);
                    network.rpc_url = url;
                }
                None => tracing::warn!(
                    "{} is set but default network '{}' is not configured",
                    RPC_URL_ENV,
                    self.default_network
                ),
            }
        }
        if let Some(key) = private_key.filter(|k| !k.trim().is_empty()) {
            tracing::debug!("Signing key loaded from {}", PRIVATE_KEY_ENV);
            self.private_key = Some(key);
        }
    }

    pub fn network(&self, name: Option<&str>) -> Result<&NetworkConfig> {
        let name = name.unwrap_or(&self.default_network);
        self.networks
            .get(name)
            .ok_or_else(|| anyhow!("Network '{}' not configured", name))
    }

    /// Get default config file path
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("contract-bind").join("config.toml"))
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        let sample_config = r#"# contract-bind configuration file
# Networks, write permissions, code generation and the contracts to bind.

# Default network to use when none is specified
default_network = "ethereum"

[networks.ethereum]
rpc_url = "https://eth.llamarpc.com"
chain_id = 1
poll_interval_ms = 12000
explorer_url = "https://etherscan.io"

[networks.ethereum.gas]
default_gas_limit = 100000
max_gas_price = 50_000_000_000  # 50 Gwei
priority_fee = 2_000_000_000    # 2 Gwei

[networks.local]
rpc_url = "http://127.0.0.1:8545"
chain_id = 31337
poll_interval_ms = 2000

[networks.local.gas]
default_gas_limit = 1000000

# Security settings
[security]
allow_write_operations = false
# max_transaction_value = "1000000000000000000"  # 1 ETH in wei

# Binding generation
[codegen]
runtime_crate = "contract_bind"
output_dir = "src/bindings"
emit_deploy = true

# [[contracts]]
# name = "Token"
# abi = "abi/Token.json"
# bin = "abi/Token.bin"

# Environment variables that can be used:
# CONTRACT_BIND_RPC_URL - RPC endpoint for the default network
# CONTRACT_BIND_PRIVATE_KEY - Hex private key used by `send`
"#;
        sample_config.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_parses() {
        let config: Config = toml::from_str(&Config::generate_sample()).unwrap();
        assert_eq!(config.default_network, "ethereum");
        assert_eq!(config.network(Some("local")).unwrap().chain_id, 31337);
        assert!(!config.security.allow_write_operations);
        assert_eq!(config.codegen.output_dir, PathBuf::from("src/bindings"));
        assert!(config.contracts.is_empty());
    }

    #[test]
    fn test_overrides() {
        let mut config = Config::default();
        config.apply_overrides(Some("http://node:8545".into()), Some("0xabc".into()));
        assert_eq!(config.network(None).unwrap().rpc_url, "http://node:8545");
        assert_eq!(config.private_key.as_deref(), Some("0xabc"));

        config.apply_overrides(Some(" ".into()), None);
        assert_eq!(config.network(None).unwrap().rpc_url, "http://node:8545");
    }

    #[test]
    fn test_transaction_limits() {
        let mut security = SecurityConfig {
            allow_write_operations: false,
            max_transaction_value: Some("1000".into()),
        };
        assert!(security.check_transaction(U256::ZERO).is_err());
        security.allow_write_operations = true;
        assert!(security.check_transaction(U256::from(1000u64)).is_ok());
        assert!(security.check_transaction(U256::from(1001u64)).is_err());
    }

    #[test]
    fn test_gas_defaults_fill_unset_fields() {
        let gas = GasConfig {
            default_gas_limit: 100_000,
            max_gas_price: Some(50_000_000_000),
            priority_fee: Some(2_000_000_000),
        };
        let opts = gas.apply(TransactOpts::default());
        assert_eq!(opts.gas_limit, Some(100_000));
        assert_eq!(opts.max_fee_per_gas, Some(50_000_000_000));
        assert_eq!(opts.max_priority_fee_per_gas, Some(2_000_000_000));
        assert_eq!(opts.gas_price, None);

        // explicit settings win
        let opts = gas.apply(TransactOpts::default().with_gas_limit(21_000));
        assert_eq!(opts.gas_limit, Some(21_000));
        let mut legacy = TransactOpts::default();
        legacy.gas_price = Some(7);
        let opts = gas.apply(legacy);
        assert_eq!(opts.gas_price, Some(7));
        assert_eq!(opts.max_fee_per_gas, None);
        assert_eq!(opts.max_priority_fee_per_gas, None);
    }

    #[test]
    fn test_gas_tip_is_capped_and_needs_a_cap() {
        let capped = GasConfig {
            default_gas_limit: 1,
            max_gas_price: Some(500),
            priority_fee: None,
        };
        let opts = capped.apply(TransactOpts::default());
        assert_eq!(opts.max_fee_per_gas, Some(500));
        assert_eq!(opts.max_priority_fee_per_gas, Some(500));

        let uncapped = GasConfig {
            default_gas_limit: 1,
            max_gas_price: None,
            priority_fee: Some(3),
        };
        let opts = uncapped.apply(TransactOpts::default());
        assert_eq!(opts.max_fee_per_gas, None);
        assert_eq!(opts.max_priority_fee_per_gas, None);
    }

    #[test]
    fn test_explorer_links() {
        let config = Config::default();
        let hash = B256::repeat_byte(0xab);
        let url = config.network(Some("sepolia")).unwrap().tx_url(hash).unwrap();
        assert_eq!(url, format!("https://sepolia.etherscan.io/tx/0x{}", "ab".repeat(32)));
        assert!(config.network(Some("local")).unwrap().tx_url(hash).is_none());

        let mut network = config.network(Some("ethereum")).unwrap().clone();
        network.explorer_url = Some("https://etherscan.io/".into());
        assert!(network.tx_url(hash).unwrap().starts_with("https://etherscan.io/tx/0x"));
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.private_key = Some("secret".into());
        config.contracts.push(ContractEntry {
            name: "Token".into(),
            abi: "Token.json".into(),
            bin: None,
            output: None,
        });
        config.save_to_file(&path).await.unwrap();

        let written = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(!written.contains("secret"));

        let loaded = Config::load_from_file(&path).await.unwrap();
        assert_eq!(loaded.contracts[0].name, "Token");
        assert_eq!(
            loaded.contracts[0].output_path(&loaded.codegen),
            PathBuf::from("src/bindings/token.rs")
        );
        assert!(loaded.private_key.is_none());
    }

    #[tokio::test]
    async fn test_load_metadata_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let abi = dir.path().join("Token.abi");
        let bin = dir.path().join("Token.bin");
        tokio::fs::write(&abi, "[]").await.unwrap();
        tokio::fs::write(&bin, "0x6001\n").await.unwrap();

        let metadata = load_metadata(&abi, Some(&bin)).await.unwrap();
        assert_eq!(metadata.abi_json(), "[]");
        assert_eq!(metadata.bin(), Some("0x6001"));

        let artifact = dir.path().join("Token.json");
        tokio::fs::write(&artifact, r#"{"abi": [], "bytecode": {"object": "0x60"}}"#).await.unwrap();
        assert_eq!(load_metadata(&artifact, None).await.unwrap().bin(), Some("0x60"));
    }
}
