//! Conversions between Rust values and dynamic ABI values.
//!
//! Generated bindings use these to move between their typed signatures and the dynamic
//! encoder. Integer widths up to 64 bits map to native integers, wider ones to
//! `U256`/`I256`.

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{Address, Bytes, FixedBytes, B256, I256, U256};

use crate::abi::types::{describe, int_fits};
use crate::error::{BindError, Result};

pub trait AbiValue: Sized {
    fn into_dyn(self) -> DynSolValue;

    fn from_dyn(value: DynSolValue) -> Result<Self>;
}

fn unexpected<T>(expected: &str, found: &DynSolValue) -> Result<T> {
    Err(BindError::decode(
        "value",
        format!("expected {expected}, found {}", describe(found)),
    ))
}

impl AbiValue for bool {
    fn into_dyn(self) -> DynSolValue {
        DynSolValue::Bool(self)
    }

    fn from_dyn(value: DynSolValue) -> Result<Self> {
        match value {
            DynSolValue::Bool(b) => Ok(b),
            other => unexpected("bool", &other),
        }
    }
}

macro_rules! impl_uint {
    ($($ty:ty => $bits:literal),* $(,)?) => {$(
        impl AbiValue for $ty {
            fn into_dyn(self) -> DynSolValue {
                DynSolValue::Uint(U256::from(self), $bits)
            }

            fn from_dyn(value: DynSolValue) -> Result<Self> {
                match value {
                    DynSolValue::Uint(v, _) if v.bit_len() <= $bits => Ok(v.as_limbs()[0] as $ty),
                    DynSolValue::Uint(v, _) => {
                        Err(BindError::decode("value", format!("{v} overflows {}", stringify!($ty))))
                    }
                    other => unexpected(concat!("uint", $bits), &other),
                }
            }
        }
    )*};
}

impl_uint!(u8 => 8, u16 => 16, u32 => 32, u64 => 64);

macro_rules! impl_int {
    ($($ty:ty => $bits:literal),* $(,)?) => {$(
        impl AbiValue for $ty {
            fn into_dyn(self) -> DynSolValue {
                DynSolValue::Int(i256_from_i64(self as i64), $bits)
            }

            fn from_dyn(value: DynSolValue) -> Result<Self> {
                match value {
                    DynSolValue::Int(v, _) if int_fits(v, $bits) => {
                        // low limb holds the two's complement value once it fits
                        Ok(v.into_raw().as_limbs()[0] as i64 as $ty)
                    }
                    DynSolValue::Int(v, _) => {
                        Err(BindError::decode("value", format!("{v} overflows {}", stringify!($ty))))
                    }
                    other => unexpected(concat!("int", $bits), &other),
                }
            }
        }
    )*};
}

impl_int!(i8 => 8, i16 => 16, i32 => 32, i64 => 64);

fn i256_from_i64(value: i64) -> I256 {
    if value >= 0 {
        I256::from_raw(U256::from(value as u64))
    } else {
        // -n is MAX - (n - 1) in two's complement
        I256::from_raw(U256::MAX - U256::from(value.unsigned_abs() - 1))
    }
}

impl AbiValue for U256 {
    fn into_dyn(self) -> DynSolValue {
        DynSolValue::Uint(self, 256)
    }

    fn from_dyn(value: DynSolValue) -> Result<Self> {
        match value {
            DynSolValue::Uint(v, _) => Ok(v),
            other => unexpected("uint256", &other),
        }
    }
}

impl AbiValue for I256 {
    fn into_dyn(self) -> DynSolValue {
        DynSolValue::Int(self, 256)
    }

    fn from_dyn(value: DynSolValue) -> Result<Self> {
        match value {
            DynSolValue::Int(v, _) => Ok(v),
            other => unexpected("int256", &other),
        }
    }
}

impl AbiValue for Address {
    fn into_dyn(self) -> DynSolValue {
        DynSolValue::Address(self)
    }

    fn from_dyn(value: DynSolValue) -> Result<Self> {
        match value {
            DynSolValue::Address(a) => Ok(a),
            other => unexpected("address", &other),
        }
    }
}

impl<const N: usize> AbiValue for FixedBytes<N> {
    fn into_dyn(self) -> DynSolValue {
        let mut word = B256::ZERO;
        word[..N].copy_from_slice(self.as_slice());
        DynSolValue::FixedBytes(word, N)
    }

    fn from_dyn(value: DynSolValue) -> Result<Self> {
        match value {
            DynSolValue::FixedBytes(word, size) if size == N => Ok(FixedBytes::from_slice(&word[..N])),
            other => unexpected(&format!("bytes{N}"), &other),
        }
    }
}

impl AbiValue for Bytes {
    fn into_dyn(self) -> DynSolValue {
        DynSolValue::Bytes(self.to_vec())
    }

    fn from_dyn(value: DynSolValue) -> Result<Self> {
        match value {
            DynSolValue::Bytes(b) => Ok(b.into()),
            other => unexpected("bytes", &other),
        }
    }
}

impl AbiValue for String {
    fn into_dyn(self) -> DynSolValue {
        DynSolValue::String(self)
    }

    fn from_dyn(value: DynSolValue) -> Result<Self> {
        match value {
            DynSolValue::String(s) => Ok(s),
            other => unexpected("string", &other),
        }
    }
}

impl<T: AbiValue> AbiValue for Vec<T> {
    fn into_dyn(self) -> DynSolValue {
        DynSolValue::Array(self.into_iter().map(AbiValue::into_dyn).collect())
    }

    fn from_dyn(value: DynSolValue) -> Result<Self> {
        match value {
            DynSolValue::Array(items) | DynSolValue::FixedArray(items) => {
                items.into_iter().map(T::from_dyn).collect()
            }
            other => unexpected("array", &other),
        }
    }
}

impl<T: AbiValue, const N: usize> AbiValue for [T; N] {
    fn into_dyn(self) -> DynSolValue {
        DynSolValue::FixedArray(self.into_iter().map(AbiValue::into_dyn).collect())
    }

    fn from_dyn(value: DynSolValue) -> Result<Self> {
        let items: Vec<T> = match value {
            DynSolValue::FixedArray(items) | DynSolValue::Array(items) if items.len() == N => {
                items.into_iter().map(T::from_dyn).collect::<Result<_>>()?
            }
            other => return unexpected(&format!("array of {N}"), &other),
        };
        items
            .try_into()
            .map_err(|_| BindError::decode("value", format!("expected array of {N}")))
    }
}

/// Sequential reader over decoded values, used to populate generated structs.
#[derive(Debug)]
pub struct Fields {
    context: String,
    values: std::vec::IntoIter<DynSolValue>,
}

impl Fields {
    pub fn new(values: Vec<DynSolValue>, context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            values: values.into_iter(),
        }
    }

    /// Open a tuple value that must have exactly `len` fields.
    pub fn from_tuple(value: DynSolValue, context: impl Into<String>, len: usize) -> Result<Self> {
        let context = context.into();
        match value {
            DynSolValue::Tuple(items) if items.len() == len => Ok(Self::new(items, context)),
            other => Err(BindError::decode(
                context,
                format!("expected tuple of {len}, found {}", describe(&other)),
            )),
        }
    }

    pub fn next<T: AbiValue>(&mut self) -> Result<T> {
        let value = self
            .values
            .next()
            .ok_or_else(|| BindError::decode(self.context.clone(), "missing field"))?;
        T::from_dyn(value).map_err(|e| match e {
            BindError::DecodeFailed { reason, .. } => BindError::decode(self.context.clone(), reason),
            other => other,
        })
    }
}
