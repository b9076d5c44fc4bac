//! Subcommand implementations for the `contract-bind` binary.

use anyhow::{anyhow, Result};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use contract_bind::abi::{ContractMetadata, RevertReason};
use contract_bind::bind::{BoundContract, CallOpts, FilterOpts, TransactOpts};
use contract_bind::codegen::emitter::MethodKind;
use contract_bind::codegen::Generator;
use contract_bind::config::{self, Config};
use contract_bind::ethereum::json::{encode_args, value_to_json, values_to_json};
use contract_bind::ethereum::provider::ProviderManager;
use contract_bind::ethereum::utils::{interpret_rpc_error, parse_hex_bytes, parse_value, validate_address, validate_member_name};
use contract_bind::ethereum::{EventInfo, TransactionInfo};
use contract_bind::BindError;

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_args(args: Option<&str>) -> Result<Value> {
    match args {
        Some(text) => serde_json::from_str(text).map_err(|e| anyhow!("Arguments must be JSON: {}", e)),
        None => Ok(Value::Array(Vec::new())),
    }
}

/// Attach an RPC hint to backend failures.
fn explain(err: BindError) -> anyhow::Error {
    let hint = match &err {
        BindError::CallFailed(source) | BindError::SubmissionFailed(source) | BindError::DeploymentFailed(source) => {
            Some(interpret_rpc_error(&source.to_string()))
        }
        _ => None,
    };
    match hint {
        Some(hint) => anyhow!("{} ({})", err, hint),
        None => err.into(),
    }
}

pub struct GenerateArgs {
    pub abi: Option<PathBuf>,
    pub bin: Option<PathBuf>,
    pub name: Option<String>,
    pub out: Option<PathBuf>,
}

pub async fn generate(config: &Config, args: GenerateArgs) -> Result<()> {
    let generator = Generator::new(config.codegen.options());

    if let Some(abi) = args.abi {
        let name = match args.name {
            Some(name) => name,
            None => abi
                .file_stem()
                .and_then(|s| s.to_str())
                .map(str::to_string)
                .ok_or_else(|| anyhow!("Cannot derive a contract name from {:?}; pass --name", abi))?,
        };
        let metadata = config::load_metadata(&abi, args.bin.as_deref()).await?;
        let out = args.out.unwrap_or_else(|| {
            config
                .codegen
                .output_dir
                .join(format!("{}.rs", contract_bind::codegen::mapper::snake_ident(&name)))
        });
        generator.generate_to_file(&name, &metadata, &out).await?;
        return Ok(());
    }

    if config.contracts.is_empty() {
        return Err(anyhow!("Nothing to generate: pass --abi or list contracts under [[contracts]]"));
    }
    for entry in &config.contracts {
        let metadata = entry.load_metadata().await?;
        let out = entry.output_path(&config.codegen);
        generator
            .generate_to_file(&entry.name, &metadata, &out)
            .await
            .map_err(|e| {
                if e.is_generation_error() {
                    anyhow!("ABI of {} cannot be bound: {}", entry.name, e)
                } else {
                    anyhow!("Failed to generate bindings for {}: {}", entry.name, e)
                }
            })?;
    }
    info!("Generated bindings for {} contracts", config.contracts.len());
    Ok(())
}

async fn load_abi(path: &Path) -> Result<ContractMetadata> {
    let metadata = config::load_metadata(path, None).await?;
    let _ = metadata.abi()?;
    Ok(metadata)
}

pub async fn inspect(abi_path: &Path) -> Result<()> {
    let metadata = load_abi(abi_path).await?;
    let abi = metadata.abi()?;

    let functions: Vec<Value> = abi
        .functions
        .iter()
        .map(|f| {
            let kind = match MethodKind::of(f.state_mutability) {
                MethodKind::Call => "call",
                MethodKind::Transact => "transact",
            };
            json!({
                "key": f.key,
                "signature": f.signature(),
                "selector": format!("{:#x}", f.selector()),
                "mutability": f.state_mutability.as_str(),
                "dispatch": kind,
            })
        })
        .collect();
    let events: Vec<Value> = abi
        .events
        .iter()
        .map(|e| {
            json!({
                "key": e.key,
                "signature": e.signature(),
                "topic": format!("{:#x}", e.topic()),
                "anonymous": e.anonymous,
            })
        })
        .collect();
    let errors: Vec<Value> = abi
        .errors
        .iter()
        .map(|e| json!({ "signature": e.signature(), "selector": format!("{:#x}", e.selector()) }))
        .collect();

    print_json(&json!({
        "functions": functions,
        "events": events,
        "errors": errors,
        "constructor": abi.constructor.is_some(),
        "fallback": abi.fallback.is_some(),
        "receive": abi.receive,
        "has_bytecode": metadata.bin().is_some(),
    }))
}

pub struct CallArgs<'a> {
    pub abi: &'a Path,
    pub address: &'a str,
    pub method: &'a str,
    pub args: Option<&'a str>,
    pub block: Option<u64>,
    pub from: Option<&'a str>,
}

pub async fn call(config: &Config, network: Option<&str>, args: CallArgs<'_>) -> Result<()> {
    validate_member_name(args.method)?;
    let address = validate_address(args.address)?;
    let metadata = load_abi(args.abi).await?;
    let manager = ProviderManager::new(config.clone())?;

    let contract = BoundContract::bind(address, &metadata, manager.backend(network)?)?;
    let function = contract.abi().function(args.method)?.clone();
    if !function.state_mutability.is_constant() {
        warn!("{} is {}; running it as a read-only call", function.signature(), function.state_mutability.as_str());
    }

    let values = encode_args(&function.key, &function.inputs, &parse_args(args.args)?)?;
    let mut opts = CallOpts {
        block_number: args.block,
        ..Default::default()
    };
    if let Some(from) = args.from {
        opts = opts.from(validate_address(from)?);
    }

    let outputs = contract.call(&opts, &function.key, values).await.map_err(explain)?;
    print_json(&values_to_json(&function.outputs, &outputs))
}

pub struct SendArgs<'a> {
    pub abi: &'a Path,
    pub address: &'a str,
    pub method: &'a str,
    pub args: Option<&'a str>,
    pub value: Option<&'a str>,
    pub gas_limit: Option<u64>,
}

pub async fn send(config: &Config, network: Option<&str>, args: SendArgs<'_>) -> Result<()> {
    validate_member_name(args.method)?;
    let address = validate_address(args.address)?;
    let value = args.value.map(parse_value).transpose()?.unwrap_or_default();
    config.security.check_transaction(value)?;

    let private_key = config
        .private_key
        .as_deref()
        .ok_or_else(|| anyhow!("No signing key: set {}", config::PRIVATE_KEY_ENV))?;
    let metadata = load_abi(args.abi).await?;
    let manager = ProviderManager::new(config.clone())?;
    let contract = BoundContract::bind(address, &metadata, manager.signing_backend(network, private_key)?)?;

    let function = contract.abi().function(args.method)?.clone();
    let values = encode_args(&function.key, &function.inputs, &parse_args(args.args)?)?;
    let network_config = config.network(network)?;
    let mut opts = TransactOpts::default().with_value(value);
    if let Some(gas) = args.gas_limit {
        opts = opts.with_gas_limit(gas);
    }
    let opts = network_config.gas.apply(opts);

    let pending = contract.transact(&opts, &function.key, values).await.map_err(explain)?;
    info!("Transaction {} submitted", pending.hash);
    let mut tx = TransactionInfo::from(&pending);
    tx.explorer_url = network_config.tx_url(pending.hash);
    print_json(&tx)
}

pub struct LogsArgs<'a> {
    pub abi: &'a Path,
    pub address: &'a str,
    pub event: &'a str,
    pub from_block: u64,
    pub to_block: Option<u64>,
}

pub async fn logs(config: &Config, network: Option<&str>, args: LogsArgs<'_>) -> Result<()> {
    validate_member_name(args.event)?;
    let address = validate_address(args.address)?;
    let metadata = load_abi(args.abi).await?;
    let manager = ProviderManager::new(config.clone())?;
    let contract = BoundContract::bind(address, &metadata, manager.backend(network)?)?;

    let opts = FilterOpts::range(args.from_block, args.to_block);
    let mut iter = contract.filter_logs(&opts, args.event, Vec::new()).await.map_err(explain)?;
    let mut events = Vec::new();
    while iter.next().await {
        if let Some(event) = iter.event() {
            events.push(EventInfo::from(event));
        }
    }
    if let Some(err) = iter.error() {
        return Err(anyhow!("Log iteration stopped after {} events: {}", events.len(), err));
    }
    iter.close();
    print_json(&events)
}

pub async fn decode_error(abi_path: &Path, data: &str) -> Result<()> {
    let metadata = load_abi(abi_path).await?;
    let data = parse_hex_bytes(data)?;
    let decoded = match metadata.abi()?.decode_error(&data)? {
        RevertReason::Message(message) => json!({ "kind": "Error", "message": message }),
        RevertReason::Panic(code) => json!({ "kind": "Panic", "code": format!("{code:#x}") }),
        RevertReason::Custom { name, args } => json!({
            "kind": "Custom",
            "name": name,
            "args": args.iter().map(value_to_json).collect::<Vec<_>>(),
        }),
    };
    print_json(&decoded)
}

pub async fn decode_calldata(abi_path: &Path, data: &str) -> Result<()> {
    let metadata = load_abi(abi_path).await?;
    let abi = metadata.abi()?;
    let data = parse_hex_bytes(data)?;
    let selector = data.get(..4).ok_or_else(|| anyhow!("Calldata is shorter than a selector"))?;
    let function = abi
        .function_by_selector(selector)
        .ok_or_else(|| anyhow!("No function with selector 0x{}", hex::encode(selector)))?;
    let values = function.decode_input(&data)?;
    print_json(&json!({
        "key": function.key,
        "signature": function.signature(),
        "args": values_to_json(&function.inputs, &values),
    }))
}

pub async fn networks(config: &Config) -> Result<()> {
    let manager = ProviderManager::new(config.clone())?;
    let mut entries = Vec::new();
    for name in manager.get_available_networks() {
        let network = manager.get_network_config(Some(name.as_str()))?;
        let mut entry = json!({
            "name": &name,
            "rpc_url": network.rpc_url,
            "chain_id": network.chain_id,
            "default": name == config.default_network,
        });
        match manager.validate_network_connection(Some(name.as_str())).await {
            Ok(head) => entry["block_number"] = json!(head),
            Err(e) => entry["error"] = json!(e.to_string()),
        }
        entries.push(entry);
    }
    print_json(&entries)
}
