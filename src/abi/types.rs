//! Recursive ABI type descriptors.
//!
//! `AbiType` is parsed from the `type`/`components` pair of a JSON ABI parameter and
//! lowered to alloy's [`DynSolType`] whenever bytes have to be encoded or decoded.

use alloy::dyn_abi::{DynSolType, DynSolValue};
use alloy::primitives::{keccak256, Address, Function, B256, I256, U256};
use std::fmt;

use crate::error::{BindError, Result};

/// A named, typed parameter of a function, constructor, error or tuple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Param {
    pub name: String,
    pub ty: AbiType,
    /// Solidity-level type, e.g. `struct OldChallengeLib.Participant[2]`
    pub internal_type: Option<String>,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: AbiType) -> Self {
        Self {
            name: name.into(),
            ty,
            internal_type: None,
        }
    }

    /// Struct name carried by `internalType`, without the `struct ` prefix or array dimensions.
    pub fn struct_name(&self) -> Option<&str> {
        let internal = self.internal_type.as_deref()?;
        let name = internal.strip_prefix("struct ")?;
        Some(name.split('[').next().unwrap_or(name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AbiType {
    Uint(usize),
    Int(usize),
    Address,
    Bool,
    FixedBytes(usize),
    Bytes,
    String,
    Function,
    Fixed {
        signed: bool,
        bits: usize,
        decimals: usize,
    },
    FixedArray(Box<AbiType>, usize),
    Array(Box<AbiType>),
    Tuple(Vec<Param>),
}

impl AbiType {
    /// Parse a JSON ABI type string. `components` is only consulted for `tuple` bases.
    pub fn parse(ty: &str, components: Option<Vec<Param>>, location: &str) -> Result<Self> {
        let ty = ty.trim();
        if let Some(inner) = ty.strip_suffix(']') {
            let open = inner
                .rfind('[')
                .ok_or_else(|| BindError::malformed(location, format!("unbalanced brackets in `{ty}`")))?;
            let element = Self::parse(&inner[..open], components, location)?;
            let dim = &inner[open + 1..];
            if dim.is_empty() {
                return Ok(Self::Array(Box::new(element)));
            }
            let len: usize = dim
                .parse()
                .map_err(|_| BindError::malformed(location, format!("invalid array length in `{ty}`")))?;
            if len == 0 {
                return Err(BindError::malformed(location, format!("zero-length array `{ty}`")));
            }
            return Ok(Self::FixedArray(Box::new(element), len));
        }

        match ty {
            "address" => return Ok(Self::Address),
            "bool" => return Ok(Self::Bool),
            "string" => return Ok(Self::String),
            "bytes" => return Ok(Self::Bytes),
            "function" => return Ok(Self::Function),
            "uint" => return Ok(Self::Uint(256)),
            "int" => return Ok(Self::Int(256)),
            "fixed" => {
                return Ok(Self::Fixed {
                    signed: true,
                    bits: 128,
                    decimals: 18,
                })
            }
            "ufixed" => {
                return Ok(Self::Fixed {
                    signed: false,
                    bits: 128,
                    decimals: 18,
                })
            }
            "tuple" => {
                let components = components.ok_or_else(|| {
                    BindError::malformed(location, "tuple parameter without components")
                })?;
                return Ok(Self::Tuple(components));
            }
            _ => {}
        }

        if let Some(bits) = ty.strip_prefix("uint") {
            return Ok(Self::Uint(parse_int_width(bits, ty, location)?));
        }
        if let Some(bits) = ty.strip_prefix("int") {
            return Ok(Self::Int(parse_int_width(bits, ty, location)?));
        }
        if let Some(size) = ty.strip_prefix("bytes") {
            let size: usize = size
                .parse()
                .map_err(|_| BindError::malformed(location, format!("unknown type `{ty}`")))?;
            if !(1..=32).contains(&size) {
                return Err(BindError::malformed(location, format!("invalid fixed bytes width in `{ty}`")));
            }
            return Ok(Self::FixedBytes(size));
        }
        let (signed, rest) = match ty.strip_prefix("ufixed") {
            Some(rest) => (false, Some(rest)),
            None => (true, ty.strip_prefix("fixed")),
        };
        if let Some((bits, decimals)) = rest.and_then(|rest| rest.split_once('x')) {
            let bits = parse_int_width(bits, ty, location)?;
            let decimals: usize = decimals
                .parse()
                .map_err(|_| BindError::malformed(location, format!("unknown type `{ty}`")))?;
            if decimals > 80 {
                return Err(BindError::malformed(location, format!("too many decimals in `{ty}`")));
            }
            return Ok(Self::Fixed {
                signed,
                bits,
                decimals,
            });
        }

        Err(BindError::malformed(location, format!("unknown type `{ty}`")))
    }

    /// Canonical form used in selectors and event topics.
    pub fn canonical(&self) -> String {
        match self {
            Self::Uint(bits) => format!("uint{bits}"),
            Self::Int(bits) => format!("int{bits}"),
            Self::Address => "address".to_string(),
            Self::Bool => "bool".to_string(),
            Self::FixedBytes(size) => format!("bytes{size}"),
            Self::Bytes => "bytes".to_string(),
            Self::String => "string".to_string(),
            Self::Function => "function".to_string(),
            Self::Fixed {
                signed,
                bits,
                decimals,
            } => format!("{}fixed{bits}x{decimals}", if *signed { "" } else { "u" }),
            Self::FixedArray(element, len) => format!("{}[{len}]", element.canonical()),
            Self::Array(element) => format!("{}[]", element.canonical()),
            Self::Tuple(components) => format!(
                "({})",
                components
                    .iter()
                    .map(|p| p.ty.canonical())
                    .collect::<Vec<_>>()
                    .join(",")
            ),
        }
    }

    pub fn is_dynamic(&self) -> bool {
        match self {
            Self::Bytes | Self::String | Self::Array(_) => true,
            Self::FixedArray(element, _) => element.is_dynamic(),
            Self::Tuple(components) => components.iter().any(|p| p.ty.is_dynamic()),
            _ => false,
        }
    }

    /// Value types fit in one topic word; everything else is indexed by its hash.
    pub fn is_value_type(&self) -> bool {
        matches!(
            self,
            Self::Uint(_)
                | Self::Int(_)
                | Self::Address
                | Self::Bool
                | Self::FixedBytes(_)
                | Self::Function
        )
    }

    pub fn to_dyn(&self) -> Result<DynSolType> {
        Ok(match self {
            Self::Uint(bits) => DynSolType::Uint(*bits),
            Self::Int(bits) => DynSolType::Int(*bits),
            Self::Address => DynSolType::Address,
            Self::Bool => DynSolType::Bool,
            Self::FixedBytes(size) => DynSolType::FixedBytes(*size),
            Self::Bytes => DynSolType::Bytes,
            Self::String => DynSolType::String,
            Self::Function => DynSolType::Function,
            Self::Fixed { .. } => return Err(BindError::unsupported("codec", self.canonical())),
            Self::FixedArray(element, len) => DynSolType::FixedArray(Box::new(element.to_dyn()?), *len),
            Self::Array(element) => DynSolType::Array(Box::new(element.to_dyn()?)),
            Self::Tuple(components) => DynSolType::Tuple(
                components
                    .iter()
                    .map(|p| p.ty.to_dyn())
                    .collect::<Result<Vec<_>>>()?,
            ),
        })
    }

    /// Check `value` against this type and normalise integer and byte widths.
    pub fn coerce(&self, value: DynSolValue) -> Result<DynSolValue> {
        let mismatch = |value: &DynSolValue| {
            BindError::InvalidArgument(format!(
                "expected `{}`, found {}",
                self.canonical(),
                describe(value)
            ))
        };

        match (self, value) {
            (Self::Bool, DynSolValue::Bool(b)) => Ok(DynSolValue::Bool(b)),
            (Self::Uint(bits), DynSolValue::Uint(v, _)) => {
                if v.bit_len() > *bits {
                    return Err(BindError::InvalidArgument(format!("{v} overflows uint{bits}")));
                }
                Ok(DynSolValue::Uint(v, *bits))
            }
            (Self::Int(bits), DynSolValue::Int(v, _)) => {
                if !int_fits(v, *bits) {
                    return Err(BindError::InvalidArgument(format!("{v} overflows int{bits}")));
                }
                Ok(DynSolValue::Int(v, *bits))
            }
            (Self::Address, DynSolValue::Address(a)) => Ok(DynSolValue::Address(a)),
            (Self::FixedBytes(size), DynSolValue::FixedBytes(word, n)) if *size == n => {
                Ok(DynSolValue::FixedBytes(word, n))
            }
            (Self::Bytes, DynSolValue::Bytes(b)) => Ok(DynSolValue::Bytes(b)),
            (Self::String, DynSolValue::String(s)) => Ok(DynSolValue::String(s)),
            (Self::Function, DynSolValue::Function(f)) => Ok(DynSolValue::Function(f)),
            (Self::FixedArray(element, len), DynSolValue::FixedArray(items))
            | (Self::FixedArray(element, len), DynSolValue::Array(items)) => {
                if items.len() != *len {
                    return Err(BindError::InvalidArgument(format!(
                        "expected {len} elements for `{}`, found {}",
                        self.canonical(),
                        items.len()
                    )));
                }
                let items = items
                    .into_iter()
                    .map(|item| element.coerce(item))
                    .collect::<Result<Vec<_>>>()?;
                Ok(DynSolValue::FixedArray(items))
            }
            (Self::Array(element), DynSolValue::Array(items))
            | (Self::Array(element), DynSolValue::FixedArray(items)) => {
                let items = items
                    .into_iter()
                    .map(|item| element.coerce(item))
                    .collect::<Result<Vec<_>>>()?;
                Ok(DynSolValue::Array(items))
            }
            (Self::Tuple(components), DynSolValue::Tuple(items)) => {
                if items.len() != components.len() {
                    return Err(BindError::InvalidArgument(format!(
                        "expected {} tuple fields for `{}`, found {}",
                        components.len(),
                        self.canonical(),
                        items.len()
                    )));
                }
                let items = components
                    .iter()
                    .zip(items)
                    .map(|(param, item)| param.ty.coerce(item))
                    .collect::<Result<Vec<_>>>()?;
                Ok(DynSolValue::Tuple(items))
            }
            (_, other) => Err(mismatch(&other)),
        }
    }

    /// Encode a filter value for an indexed event parameter of this type.
    pub fn encode_topic(&self, value: DynSolValue) -> Result<B256> {
        let value = self.coerce(value)?;
        if self.is_value_type() {
            return Ok(B256::from_slice(&value.abi_encode()));
        }
        let preimage = match &value {
            DynSolValue::String(s) => s.as_bytes().to_vec(),
            DynSolValue::Bytes(b) => b.clone(),
            other => in_place_encoding(other),
        };
        Ok(keccak256(preimage))
    }

    /// Decode one topic word back into a value. Hashed (non value type) parameters come
    /// back as the raw 32-byte topic.
    pub fn decode_topic(&self, topic: &B256) -> Result<DynSolValue> {
        let word = U256::from_be_bytes(topic.0);
        match self {
            Self::Bool => match word {
                w if w.is_zero() => Ok(DynSolValue::Bool(false)),
                w if w == U256::from(1u8) => Ok(DynSolValue::Bool(true)),
                _ => Err(BindError::decode("bool topic", format!("non-boolean word {topic}"))),
            },
            Self::Uint(bits) => {
                if word.bit_len() > *bits {
                    return Err(BindError::decode("uint topic", format!("value overflows uint{bits}")));
                }
                Ok(DynSolValue::Uint(word, *bits))
            }
            Self::Int(bits) => {
                let value = I256::from_raw(word);
                if !int_fits(value, *bits) {
                    return Err(BindError::decode("int topic", format!("value overflows int{bits}")));
                }
                Ok(DynSolValue::Int(value, *bits))
            }
            Self::Address => {
                if topic[..12].iter().any(|b| *b != 0) {
                    return Err(BindError::decode("address topic", "dirty high-order bytes"));
                }
                Ok(DynSolValue::Address(Address::from_word(*topic)))
            }
            Self::FixedBytes(size) => Ok(DynSolValue::FixedBytes(*topic, *size)),
            Self::Function => Ok(DynSolValue::Function(Function::from_slice(&topic[..24]))),
            _ => Ok(DynSolValue::FixedBytes(*topic, 32)),
        }
    }
}

impl fmt::Display for AbiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

fn parse_int_width(bits: &str, ty: &str, location: &str) -> Result<usize> {
    let bits: usize = bits
        .parse()
        .map_err(|_| BindError::malformed(location, format!("unknown type `{ty}`")))?;
    if bits == 0 || bits > 256 || bits % 8 != 0 {
        return Err(BindError::malformed(location, format!("invalid bit width in `{ty}`")));
    }
    Ok(bits)
}

/// Whether a two's-complement value fits in `bits` bits.
pub(crate) fn int_fits(value: I256, bits: usize) -> bool {
    if bits >= 256 {
        return true;
    }
    let high = value.into_raw() >> (bits - 1);
    high.is_zero() || high == (U256::MAX >> (bits - 1))
}

/// Solidity's in-place encoding used to hash indexed reference types.
fn in_place_encoding(value: &DynSolValue) -> Vec<u8> {
    match value {
        DynSolValue::String(s) => pad_right(s.as_bytes()),
        DynSolValue::Bytes(b) => pad_right(b),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) | DynSolValue::Tuple(items) => {
            items.iter().flat_map(in_place_encoding).collect()
        }
        other => other.abi_encode(),
    }
}

fn pad_right(bytes: &[u8]) -> Vec<u8> {
    let mut out = bytes.to_vec();
    let rem = out.len() % 32;
    if rem != 0 {
        out.resize(out.len() + 32 - rem, 0);
    }
    out
}

pub(crate) fn describe(value: &DynSolValue) -> String {
    match value {
        DynSolValue::Bool(_) => "bool".to_string(),
        DynSolValue::Uint(_, bits) => format!("uint{bits}"),
        DynSolValue::Int(_, bits) => format!("int{bits}"),
        DynSolValue::FixedBytes(_, size) => format!("bytes{size}"),
        DynSolValue::Address(_) => "address".to_string(),
        DynSolValue::Function(_) => "function".to_string(),
        DynSolValue::Bytes(_) => "bytes".to_string(),
        DynSolValue::String(_) => "string".to_string(),
        DynSolValue::Array(items) => format!("array of {}", items.len()),
        DynSolValue::FixedArray(items) => format!("fixed array of {}", items.len()),
        DynSolValue::Tuple(items) => format!("tuple of {}", items.len()),
        // only reachable when alloy's eip712 feature adds `CustomStruct`
        #[allow(unreachable_patterns)]
        _ => "unsupported value".to_string(),
    }
}
