use alloy::primitives::{Address, U256};
use anyhow::{anyhow, Result};
use std::str::FromStr;

/// Validates and normalizes an Ethereum address
pub fn validate_address(address: &str) -> Result<Address> {
    let address = address.trim();

    if address.is_empty() {
        return Err(anyhow!("Address cannot be empty"));
    }

    if !address.starts_with("0x") && !address.starts_with("0X") {
        return Err(anyhow!(
            "Invalid address format: '{}'. Ethereum addresses must start with '0x'",
            address
        ));
    }

    if address.len() != 42 {
        return Err(anyhow!(
            "Invalid address length: '{}'. Ethereum addresses must be exactly 42 characters (0x + 40 hex characters)",
            address
        ));
    }

    if !address[2..].chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(anyhow!(
            "Invalid address format: '{}'. Contains non-hexadecimal characters",
            address
        ));
    }

    Address::from_str(address).map_err(|e| anyhow!("Invalid Ethereum address: '{}'. Error: {}", address, e))
}

/// Validates a method or event key such as `transfer` or the overload key `transfer0`
pub fn validate_member_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    match chars.next() {
        None => return Err(anyhow!("Name cannot be empty")),
        Some(first) if !first.is_ascii_alphabetic() && first != '_' && first != '$' => {
            return Err(anyhow!(
                "Invalid name: '{}'. Names must start with a letter, underscore or dollar sign",
                name
            ))
        }
        Some(_) => {}
    }

    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$') {
        return Err(anyhow!(
            "Invalid name: '{}'. Names can only contain letters, numbers, underscores and dollar signs",
            name
        ));
    }

    Ok(())
}

/// Parses a wei amount given in decimal or as `0x` prefixed hex
pub fn parse_value(value_str: &str) -> Result<U256> {
    let value_str = value_str.trim();
    if value_str.is_empty() {
        return Err(anyhow!("Value cannot be empty"));
    }

    match value_str.strip_prefix("0x").or_else(|| value_str.strip_prefix("0X")) {
        Some(hex) => U256::from_str_radix(hex, 16).map_err(|_| anyhow!("Invalid hexadecimal value: '{}'", value_str)),
        None => U256::from_str_radix(value_str, 10).map_err(|_| {
            anyhow!(
                "Invalid numeric value: '{}'. Use decimal format or '0x' prefixed hex",
                value_str
            )
        }),
    }
}

/// Parses hex bytes such as revert data; the `0x` prefix is optional
pub fn parse_hex_bytes(data: &str) -> Result<Vec<u8>> {
    let data = data.trim();
    let body = data.strip_prefix("0x").or_else(|| data.strip_prefix("0X")).unwrap_or(data);
    hex::decode(body).map_err(|e| anyhow!("Invalid hex data '{}': {}", data, e))
}

/// Creates user-friendly error messages for common RPC errors
pub fn interpret_rpc_error(error: &str) -> String {
    if error.contains("execution reverted") {
        "The contract function reverted execution. This usually means the function's requirements were not met or an assertion failed.".to_string()
    } else if error.contains("insufficient funds") {
        "Insufficient funds to cover value and gas costs.".to_string()
    } else if error.contains("gas required exceeds allowance") {
        "Gas limit too low. Try increasing the gas limit for this transaction.".to_string()
    } else if error.contains("nonce too low") {
        "Nonce too low. Another transaction was already mined with this nonce.".to_string()
    } else if error.contains("replacement transaction underpriced") {
        "Gas price too low to replace pending transaction. Increase the gas price.".to_string()
    } else if error.contains("connection refused") || error.contains("network unreachable") {
        "Cannot connect to RPC endpoint. Check your internet connection and RPC URL configuration.".to_string()
    } else if error.contains("timeout") {
        "Request timed out. The RPC endpoint may be overloaded or unreachable.".to_string()
    } else if error.contains("rate limit") {
        "Too many requests to the RPC endpoint. Try again in a few moments or use a different endpoint.".to_string()
    } else if error.contains("method not found") {
        "The requested method is not supported by this RPC endpoint.".to_string()
    } else {
        format!("RPC error: {}", error)
    }
}
