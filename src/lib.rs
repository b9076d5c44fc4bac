//! Typed contract bindings for EVM contracts.
//!
//! [`codegen`] turns a contract ABI into a Rust module with one typed method per
//! function and typed filter, watch and parse helpers per event. The generated code sits
//! on the runtime in [`bind`], which can also be used directly with ABIs that are only
//! known at runtime.

pub mod abi;
pub mod bind;
pub mod codegen;
pub mod config;
pub mod error;
pub mod ethereum;

pub use alloy::dyn_abi::DynSolValue;
pub use alloy::primitives;
pub use async_trait::async_trait;
pub use error::{BindError, Result};
