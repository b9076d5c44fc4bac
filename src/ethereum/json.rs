//! JSON arguments and results for command-line calls.

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{Address, B256, I256, U256};
use anyhow::{anyhow, Result};
use serde_json::{Map, Value};
use std::str::FromStr;

use crate::abi::{AbiType, Param};

/// Convert call parameters given either positionally (`[a, b]`) or by name
/// (`{"to": a, "value": b}`).
pub fn encode_args(method: &str, params: &[Param], parameters: &Value) -> Result<Vec<DynSolValue>> {
    let expected = || {
        params
            .iter()
            .map(|p| format!("{}: {}", p.name, p.ty))
            .collect::<Vec<_>>()
            .join(", ")
    };

    match parameters {
        Value::Null if params.is_empty() => Ok(Vec::new()),
        Value::Array(values) => {
            if values.len() != params.len() {
                return Err(anyhow!(
                    "Parameter count mismatch for '{}': expected {}, got {}. Expected parameters: [{}]",
                    method,
                    params.len(),
                    values.len(),
                    expected()
                ));
            }
            params
                .iter()
                .zip(values)
                .enumerate()
                .map(|(i, (param, value))| {
                    json_to_value(value, &param.ty).map_err(|e| {
                        anyhow!("Invalid parameter #{} ('{}' of type '{}'): {}", i + 1, param.name, param.ty, e)
                    })
                })
                .collect()
        }
        Value::Object(fields) => params
            .iter()
            .map(|param| {
                let value = fields.get(&param.name).ok_or_else(|| {
                    anyhow!(
                        "Missing parameter '{}' of type '{}' for '{}'. Expected parameters: {{{}}}",
                        param.name,
                        param.ty,
                        method,
                        expected()
                    )
                })?;
                json_to_value(value, &param.ty)
                    .map_err(|e| anyhow!("Invalid parameter '{}' of type '{}': {}", param.name, param.ty, e))
            })
            .collect(),
        other => Err(anyhow!(
            "Parameters for '{}' must be an array or an object with fields {{{}}}, got {}",
            method,
            expected(),
            other
        )),
    }
}

fn parse_hex(text: &str) -> Result<Vec<u8>> {
    let body = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")).unwrap_or(text);
    hex::decode(body).map_err(|_| anyhow!("Invalid hex string: {}", text))
}

fn parse_uint(value: &Value) -> Result<U256> {
    let text = match value {
        Value::Number(n) if n.is_u64() => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return Err(anyhow!("Unsigned integer must be a non-negative number or string")),
    };
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => U256::from_str_radix(hex, 16),
        None => U256::from_str_radix(&text, 10),
    }
    .map_err(|_| anyhow!("Invalid unsigned integer: {}", text))
}

fn parse_int(value: &Value) -> Result<I256> {
    let text = match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return Err(anyhow!("Signed integer must be a number or string")),
    };
    I256::from_dec_str(&text).map_err(|_| anyhow!("Invalid signed integer: {}", text))
}

/// Convert one JSON value to the ABI value of type `ty`.
pub fn json_to_value(value: &Value, ty: &AbiType) -> Result<DynSolValue> {
    let as_str = |what: &str| value.as_str().ok_or_else(|| anyhow!("{} must be a string", what));

    Ok(match ty {
        AbiType::Bool => DynSolValue::Bool(value.as_bool().ok_or_else(|| anyhow!("Bool must be a boolean"))?),
        AbiType::Address => DynSolValue::Address(
            Address::from_str(as_str("Address")?.trim()).map_err(|e| anyhow!("Invalid address: {}", e))?,
        ),
        AbiType::String => DynSolValue::String(as_str("String")?.to_string()),
        AbiType::Bytes => DynSolValue::Bytes(parse_hex(as_str("Bytes")?)?),
        AbiType::FixedBytes(size) => {
            let bytes = parse_hex(as_str("Fixed bytes")?)?;
            if bytes.len() != *size {
                return Err(anyhow!("Expected {} bytes, got {}", size, bytes.len()));
            }
            let mut word = B256::ZERO;
            word[..*size].copy_from_slice(&bytes);
            DynSolValue::FixedBytes(word, *size)
        }
        AbiType::Uint(bits) => {
            let v = parse_uint(value)?;
            if v.bit_len() > *bits {
                return Err(anyhow!("{} overflows uint{}", v, bits));
            }
            DynSolValue::Uint(v, *bits)
        }
        AbiType::Int(bits) => DynSolValue::Int(parse_int(value)?, *bits),
        AbiType::Array(element) => DynSolValue::Array(
            value
                .as_array()
                .ok_or_else(|| anyhow!("Array parameter must be an array"))?
                .iter()
                .map(|item| json_to_value(item, element))
                .collect::<Result<_>>()?,
        ),
        AbiType::FixedArray(element, len) => {
            let items = value
                .as_array()
                .ok_or_else(|| anyhow!("Array parameter must be an array"))?;
            if items.len() != *len {
                return Err(anyhow!("Expected {} elements, got {}", len, items.len()));
            }
            DynSolValue::FixedArray(
                items
                    .iter()
                    .map(|item| json_to_value(item, element))
                    .collect::<Result<_>>()?,
            )
        }
        AbiType::Tuple(components) => DynSolValue::Tuple(encode_args("tuple", components, value)?),
        AbiType::Function | AbiType::Fixed { .. } => {
            return Err(anyhow!("Unsupported Solidity type: {}", ty))
        }
    })
}

/// Convert one ABI value to JSON. Integers are strings to keep full precision.
pub fn value_to_json(value: &DynSolValue) -> Value {
    match value {
        DynSolValue::Address(addr) => Value::String(addr.to_checksum(None)),
        DynSolValue::Uint(num, _) => Value::String(num.to_string()),
        DynSolValue::Int(num, _) => Value::String(num.to_string()),
        DynSolValue::Bool(b) => Value::Bool(*b),
        DynSolValue::String(s) => Value::String(s.clone()),
        DynSolValue::Bytes(bytes) => Value::String(format!("0x{}", hex::encode(bytes))),
        DynSolValue::FixedBytes(word, size) => Value::String(format!("0x{}", hex::encode(&word[..*size]))),
        DynSolValue::Function(f) => Value::String(format!("0x{}", hex::encode(f.as_slice()))),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) | DynSolValue::Tuple(items) => {
            Value::Array(items.iter().map(value_to_json).collect())
        }
        #[allow(unreachable_patterns)]
        other => Value::String(format!("{other:?}")),
    }
}

/// Named outputs become an object; a single unnamed output is returned bare.
pub fn values_to_json(params: &[Param], values: &[DynSolValue]) -> Value {
    match (params, values) {
        (_, []) => Value::Null,
        ([param], [value]) if param.name.is_empty() => value_to_json(value),
        _ if params.len() == values.len() && params.iter().all(|p| !p.name.is_empty()) => {
            let fields: Map<String, Value> = params
                .iter()
                .zip(values)
                .map(|(p, v)| (p.name.clone(), value_to_json(v)))
                .collect();
            Value::Object(fields)
        }
        _ => Value::Array(values.iter().map(value_to_json).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn transfer_params() -> Vec<Param> {
        vec![
            Param::new("to", AbiType::Address),
            Param::new("value", AbiType::Uint(256)),
        ]
    }

    #[test]
    fn test_positional_and_named_args() {
        let to = "0x00000000000000000000000000000000000000bb";
        let positional = encode_args("transfer", &transfer_params(), &json!([to, "0x10"])).unwrap();
        let named = encode_args("transfer", &transfer_params(), &json!({"value": 16, "to": to})).unwrap();
        assert_eq!(positional, named);
        assert_eq!(positional[1], DynSolValue::Uint(U256::from(16u64), 256));

        let err = encode_args("transfer", &transfer_params(), &json!([to])).unwrap_err();
        assert!(err.to_string().contains("expected 2, got 1"));
        assert!(encode_args("transfer", &transfer_params(), &json!({"to": to})).is_err());
    }

    #[test]
    fn test_decimal_strings_are_not_hex() {
        assert_eq!(parse_uint(&json!("10")).unwrap(), U256::from(10u64));
        assert_eq!(parse_uint(&json!("0x10")).unwrap(), U256::from(16u64));
        assert!(parse_uint(&json!(-1)).is_err());
    }

    #[test]
    fn test_nested_types() {
        let ty = AbiType::Tuple(vec![
            Param::new("id", AbiType::Int(32)),
            Param::new("tags", AbiType::Array(Box::new(AbiType::FixedBytes(2)))),
        ]);
        let value = json_to_value(&json!(["-5", ["0x0102"]]), &ty).unwrap();
        assert_eq!(value_to_json(&value), json!(["-5", ["0x0102"]]));

        assert!(json_to_value(&json!("0x01"), &AbiType::FixedBytes(2)).is_err());
        assert!(json_to_value(&json!(300), &AbiType::Uint(8)).is_err());
    }

    #[test]
    fn test_output_shapes() {
        let single = [Param::new("", AbiType::Bool)];
        assert_eq!(values_to_json(&single, &[DynSolValue::Bool(true)]), json!(true));

        let named = [Param::new("a", AbiType::Bool), Param::new("b", AbiType::String)];
        let values = [DynSolValue::Bool(false), DynSolValue::String("x".into())];
        assert_eq!(values_to_json(&named, &values), json!({"a": false, "b": "x"}));
        assert_eq!(values_to_json(&[], &[]), Value::Null);
    }
}
