mod commands;

use anyhow::{anyhow, Result};
use clap::{value_parser, Arg, ArgMatches, Command};
use contract_bind::config::Config;
use std::path::{Path, PathBuf};
use tracing::{error, info};

fn abi_arg() -> Arg {
    Arg::new("abi")
        .long("abi")
        .value_name("FILE")
        .value_parser(value_parser!(PathBuf))
        .help("ABI JSON file or compiler artifact")
}

fn address_arg() -> Arg {
    Arg::new("address")
        .short('a')
        .long("address")
        .value_name("ADDRESS")
        .required(true)
        .help("Contract address")
}

fn args_arg() -> Arg {
    Arg::new("args")
        .long("args")
        .value_name("JSON")
        .help("Arguments as a JSON array or an object keyed by parameter name")
}

fn cli() -> Command {
    Command::new("contract-bind")
        .version("0.1.0")
        .about("Typed Rust bindings and command-line access for EVM contracts")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .global(true)
                .help("Path to configuration file"),
        )
        .arg(
            Arg::new("network")
                .short('n')
                .long("network")
                .value_name("NETWORK")
                .global(true)
                .help("Network to use (ethereum, sepolia, local, ...)"),
        )
        .arg(
            Arg::new("rpc-url")
                .short('r')
                .long("rpc-url")
                .value_name("URL")
                .global(true)
                .help("RPC endpoint URL"),
        )
        .arg(
            Arg::new("allow-writes")
                .long("allow-writes")
                .global(true)
                .help("Allow write operations (transactions)")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .help("Generate a sample configuration file and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config-path")
                .long("config-path")
                .help("Print the default configuration file path and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .subcommand(
            Command::new("generate")
                .about("Generate bindings for one ABI, or for every [[contracts]] entry in the config")
                .arg(abi_arg())
                .arg(
                    Arg::new("bin")
                        .long("bin")
                        .value_name("FILE")
                        .value_parser(value_parser!(PathBuf))
                        .help("Hex bytecode file; enables the deploy function"),
                )
                .arg(
                    Arg::new("name")
                        .long("name")
                        .value_name("NAME")
                        .help("Contract type name; defaults to the ABI file name"),
                )
                .arg(
                    Arg::new("out")
                        .short('o')
                        .long("out")
                        .value_name("FILE")
                        .value_parser(value_parser!(PathBuf))
                        .help("Output file"),
                ),
        )
        .subcommand(
            Command::new("inspect")
                .about("Print selectors, topics and dispatch kinds of an ABI")
                .arg(abi_arg().required(true)),
        )
        .subcommand(
            Command::new("call")
                .about("Run a read-only call")
                .arg(abi_arg().required(true))
                .arg(address_arg())
                .arg(Arg::new("method").short('m').long("method").required(true).help("Method key"))
                .arg(args_arg())
                .arg(
                    Arg::new("block")
                        .long("block")
                        .value_parser(value_parser!(u64))
                        .help("Block number; latest when omitted"),
                )
                .arg(Arg::new("from").long("from").value_name("ADDRESS").help("Simulated sender")),
        )
        .subcommand(
            Command::new("send")
                .about("Sign and submit a transaction")
                .arg(abi_arg().required(true))
                .arg(address_arg())
                .arg(Arg::new("method").short('m').long("method").required(true).help("Method key"))
                .arg(args_arg())
                .arg(Arg::new("value").long("value").value_name("WEI").help("Value to send"))
                .arg(
                    Arg::new("gas-limit")
                        .long("gas-limit")
                        .value_parser(value_parser!(u64))
                        .help("Gas limit; estimated when omitted"),
                ),
        )
        .subcommand(
            Command::new("logs")
                .about("Fetch and decode past event logs")
                .arg(abi_arg().required(true))
                .arg(address_arg())
                .arg(Arg::new("event").short('e').long("event").required(true).help("Event key"))
                .arg(
                    Arg::new("from-block")
                        .long("from-block")
                        .value_parser(value_parser!(u64))
                        .default_value("0"),
                )
                .arg(Arg::new("to-block").long("to-block").value_parser(value_parser!(u64))),
        )
        .subcommand(
            Command::new("decode-calldata")
                .about("Decode transaction input against an ABI")
                .arg(abi_arg().required(true))
                .arg(Arg::new("data").long("data").value_name("HEX").required(true)),
        )
        .subcommand(Command::new("networks").about("List configured networks and check that each one responds"))
        .subcommand(
            Command::new("decode-error")
                .about("Decode revert data against an ABI")
                .arg(abi_arg().required(true))
                .arg(Arg::new("data").long("data").value_name("HEX").required(true)),
        )
}

fn path<'a>(matches: &'a ArgMatches, id: &str) -> Result<&'a Path> {
    matches
        .get_one::<PathBuf>(id)
        .map(PathBuf::as_path)
        .ok_or_else(|| anyhow!("--{} is required", id))
}

fn string<'a>(matches: &'a ArgMatches, id: &str) -> Option<&'a str> {
    matches.get_one::<String>(id).map(String::as_str)
}

fn required<'a>(matches: &'a ArgMatches, id: &str) -> Result<&'a str> {
    string(matches, id).ok_or_else(|| anyhow!("--{} is required", id))
}

async fn run(matches: &ArgMatches, config: &Config) -> Result<()> {
    let network = string(matches, "network");

    match matches.subcommand() {
        Some(("generate", sub)) => {
            commands::generate(
                config,
                commands::GenerateArgs {
                    abi: sub.get_one::<PathBuf>("abi").cloned(),
                    bin: sub.get_one::<PathBuf>("bin").cloned(),
                    name: sub.get_one::<String>("name").cloned(),
                    out: sub.get_one::<PathBuf>("out").cloned(),
                },
            )
            .await
        }
        Some(("inspect", sub)) => commands::inspect(path(sub, "abi")?).await,
        Some(("call", sub)) => {
            commands::call(
                config,
                network,
                commands::CallArgs {
                    abi: path(sub, "abi")?,
                    address: required(sub, "address")?,
                    method: required(sub, "method")?,
                    args: string(sub, "args"),
                    block: sub.get_one::<u64>("block").copied(),
                    from: string(sub, "from"),
                },
            )
            .await
        }
        Some(("send", sub)) => {
            commands::send(
                config,
                network,
                commands::SendArgs {
                    abi: path(sub, "abi")?,
                    address: required(sub, "address")?,
                    method: required(sub, "method")?,
                    args: string(sub, "args"),
                    value: string(sub, "value"),
                    gas_limit: sub.get_one::<u64>("gas-limit").copied(),
                },
            )
            .await
        }
        Some(("logs", sub)) => {
            commands::logs(
                config,
                network,
                commands::LogsArgs {
                    abi: path(sub, "abi")?,
                    address: required(sub, "address")?,
                    event: required(sub, "event")?,
                    from_block: sub.get_one::<u64>("from-block").copied().unwrap_or(0),
                    to_block: sub.get_one::<u64>("to-block").copied(),
                },
            )
            .await
        }
        Some(("decode-calldata", sub)) => commands::decode_calldata(path(sub, "abi")?, required(sub, "data")?).await,
        Some(("networks", _)) => commands::networks(config).await,
        Some(("decode-error", sub)) => commands::decode_error(path(sub, "abi")?, required(sub, "data")?).await,
        _ => Err(anyhow!("No command given; run with --help for usage")),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries command output, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let matches = cli().get_matches();

    if matches.get_flag("generate-config") {
        println!("{}", Config::generate_sample());
        return Ok(());
    }

    if matches.get_flag("config-path") {
        match Config::default_config_path() {
            Ok(path) => {
                println!("{}", path.display());
                return Ok(());
            }
            Err(e) => {
                error!("Could not determine default config path: {}", e);
                return Err(e);
            }
        }
    }

    let config_path = matches.get_one::<String>("config").map(|s| s.as_str());
    let mut config = Config::load_or_default(config_path).await;

    if let Some(network) = matches.get_one::<String>("network") {
        if !config.networks.contains_key(network) {
            return Err(anyhow!(
                "Unknown network '{}'. Configured networks: {}",
                network,
                config.networks.keys().cloned().collect::<Vec<_>>().join(", ")
            ));
        }
        config.default_network = network.clone();
    }

    if let Some(rpc_url) = matches.get_one::<String>("rpc-url") {
        if let Some(network_config) = config.networks.get_mut(&config.default_network) {
            network_config.rpc_url = rpc_url.clone();
        }
    }

    if matches.get_flag("allow-writes") {
        config.security.allow_write_operations = true;
    }

    info!("Default network: {}", config.default_network);

    if let Err(e) = run(&matches, &config).await {
        error!("{:#}", e);
        return Err(e);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        cli().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let matches = cli()
            .try_get_matches_from([
                "contract-bind",
                "call",
                "--abi",
                "Token.json",
                "-a",
                "0x00000000000000000000000000000000000000bb",
                "-m",
                "balanceOf",
                "--network",
                "local",
            ])
            .unwrap();
        assert_eq!(string(&matches, "network"), Some("local"));
        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, "call");
        assert_eq!(path(sub, "abi").unwrap(), Path::new("Token.json"));
    }
}
