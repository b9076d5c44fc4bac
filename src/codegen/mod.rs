//! Binding generation: ABI text in, Rust source out.

pub mod assembler;
pub mod emitter;
pub mod mapper;

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::abi::{decode_bytecode, Abi, ContractMetadata};
use crate::error::{BindError, Result};
use mapper::{pascal_ident, Namespace, TypeMapper};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CodegenOptions {
    /// Path the generated module imports the runtime from
    pub runtime_crate: String,
    /// Emit a `deploy_*` function when bytecode is available
    pub emit_deploy: bool,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            runtime_crate: "contract_bind".to_string(),
            emit_deploy: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Generator {
    options: CodegenOptions,
}

impl Generator {
    pub fn new(options: CodegenOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CodegenOptions {
        &self.options
    }

    /// Generate the binding module for contract `name`.
    ///
    /// Fails on the first malformed entry, unsupported type or bad bytecode; nothing is
    /// produced for a contract that fails.
    pub fn generate(&self, name: &str, metadata: &ContractMetadata) -> Result<String> {
        let abi = Abi::parse(metadata.abi_json())?;
        if let Some(bin) = metadata.bin() {
            decode_bytecode(bin)?;
        }

        let contract = pascal_ident(name);
        if contract.trim_matches('_').is_empty() {
            return Err(BindError::InvalidArgument(format!("invalid contract name `{name}`")));
        }
        let reserved = assembler::reserved_type_names(&contract);
        let mut types = TypeMapper::new(reserved.iter().map(String::as_str));
        let mut methods = Namespace::with_reserved(assembler::CLIENT_METHODS.iter().copied());
        let emitted = emitter::emit(&contract, &abi, &mut types, &mut methods)?;

        debug!(
            contract = %contract,
            calls = emitted.calls().count(),
            transacts = emitted.transacts().count(),
            events = emitted.events.len(),
            structs = types.structs().len(),
            "Emitted contract wrappers"
        );
        Ok(assembler::assemble(&contract, metadata, &emitted, types.structs(), &self.options))
    }

    /// Generate and write the module to `path`, creating parent directories.
    pub async fn generate_to_file(&self, name: &str, metadata: &ContractMetadata, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let code = self.generate(name, metadata)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, code).await?;
        info!("Wrote bindings for {} to {}", name, path.display());
        Ok(())
    }
}
