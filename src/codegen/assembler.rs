//! Composite client assembly.
//!
//! Stitches the emitted wrappers into one module: a metadata static, three role traits,
//! the client type implementing each role for backends with the matching capability,
//! the session types, and a deploy function when bytecode is available.

use crate::abi::ContractMetadata;
use crate::codegen::emitter::{dyn_args, render_output_struct, render_tuple_struct, Emitted, Returns};
use crate::codegen::mapper::{snake_ident, StructDef};
use crate::codegen::CodegenOptions;

/// Inherent methods of the generated client; wrappers never take these names.
pub const CLIENT_METHODS: &[&str] = &[
    "new",
    "new_caller",
    "new_transactor",
    "new_filterer",
    "address",
    "raw",
    "session",
    "caller_session",
    "transactor_session",
];

const IMPORTED_TYPES: &[&str] = &[
    "ContractMetadata",
    "AbiValue",
    "BoundContract",
    "CallOpts",
    "ContractCaller",
    "ContractFilterer",
    "ContractTransactor",
    "EventBinding",
    "EventSink",
    "Fields",
    "FilterOpts",
    "LogIterator",
    "PendingTx",
    "RawLog",
    "Subscription",
    "TransactOpts",
    "WatchOpts",
    "BindError",
    "Address",
    "Bytes",
    "FixedBytes",
    "B256",
    "I256",
    "U256",
    "DynSolValue",
    "Result",
    "Option",
    "String",
    "Vec",
];

/// Type names the module defines or imports itself.
pub fn reserved_type_names(contract: &str) -> Vec<String> {
    let mut names: Vec<String> = IMPORTED_TYPES.iter().map(|s| s.to_string()).collect();
    for suffix in ["", "Caller", "Transactor", "Filterer", "Session", "CallerSession", "TransactorSession"] {
        names.push(format!("{contract}{suffix}"));
    }
    names
}

/// Wrap `text` in a raw string literal with enough `#`s.
fn raw_string(text: &str) -> String {
    let mut hashes = 1;
    while text.contains(&format!("\"{}", "#".repeat(hashes))) {
        hashes += 1;
    }
    let fence = "#".repeat(hashes);
    format!("r{fence}\"{text}\"{fence}")
}

pub fn metadata_static(contract: &str) -> String {
    format!("{}_METADATA", snake_ident(contract).to_uppercase())
}

fn header(contract: &str, rt: &str) -> String {
    format!(
        r#"// Code generated by contract-bind. DO NOT EDIT.
// Bindings for the {contract} contract; regenerate instead of editing.

#[allow(unused_imports)]
use {rt}::abi::ContractMetadata;
#[allow(unused_imports)]
use {rt}::bind::{{
    deploy_contract, AbiValue, BoundContract, CallOpts, ContractCaller, ContractFilterer, ContractTransactor,
    EventBinding, EventSink, Fields, FilterOpts, LogIterator, PendingTx, RawLog, Subscription, TransactOpts,
    WatchOpts,
}};
#[allow(unused_imports)]
use {rt}::error::BindError;
#[allow(unused_imports)]
use {rt}::primitives::{{Address, Bytes, FixedBytes, B256, I256, U256}};
#[allow(unused_imports)]
use {rt}::{{async_trait, DynSolValue}};

"#
    )
}

fn fallback_receive(emitted: &Emitted) -> (String, String, String) {
    let mut decls = String::new();
    let mut impls = String::new();
    let mut session = String::new();
    if let Some(ident) = &emitted.fallback {
        decls.push_str(&format!(
            "    /// Submits arbitrary calldata to the fallback function.\n    async fn {ident}(&self, opts: &TransactOpts, calldata: Bytes) -> Result<PendingTx, BindError>;\n"
        ));
        impls.push_str(&format!(
            "\n    async fn {ident}(&self, opts: &TransactOpts, calldata: Bytes) -> Result<PendingTx, BindError> {{\n        self.contract.raw_transact(opts, calldata).await\n    }}\n"
        ));
        session.push_str(&format!(
            "\n    /// Submits arbitrary calldata to the fallback function.\n    pub async fn {ident}(&self, calldata: Bytes) -> Result<PendingTx, BindError> {{\n        self.contract.{ident}(&self.transact_opts, calldata).await\n    }}\n"
        ));
    }
    if let Some(ident) = &emitted.receive {
        decls.push_str(&format!(
            "    /// Sends plain value to the receive function.\n    async fn {ident}(&self, opts: &TransactOpts) -> Result<PendingTx, BindError>;\n"
        ));
        impls.push_str(&format!(
            "\n    async fn {ident}(&self, opts: &TransactOpts) -> Result<PendingTx, BindError> {{\n        self.contract.transfer(opts).await\n    }}\n"
        ));
        session.push_str(&format!(
            "\n    /// Sends plain value to the receive function.\n    pub async fn {ident}(&self) -> Result<PendingTx, BindError> {{\n        self.contract.{ident}(&self.transact_opts).await\n    }}\n"
        ));
    }
    (decls, impls, session)
}

fn join_blocks(blocks: impl Iterator<Item = String>) -> String {
    blocks.collect::<Vec<_>>().join("\n")
}

/// Render the complete binding module.
pub fn assemble(
    contract: &str,
    metadata: &ContractMetadata,
    emitted: &Emitted,
    structs: &[StructDef],
    options: &CodegenOptions,
) -> String {
    let meta = metadata_static(contract);
    let mut out = header(contract, &options.runtime_crate);

    let bin = match metadata.bin() {
        Some(bin) => format!("Some(\"{}\")", bin.trim()),
        None => "None".to_string(),
    };
    out.push_str(&format!(
        "/// ABI and deployment bytecode of {contract}.\npub static {meta}: ContractMetadata = ContractMetadata::from_static(\n    {},\n    {bin},\n);\n\n",
        raw_string(metadata.abi_json())
    ));

    for def in structs {
        out.push_str(&render_tuple_struct(def));
        out.push('\n');
    }
    for method in &emitted.methods {
        if let Returns::Struct(def) = &method.returns {
            out.push_str(&render_output_struct(def));
            out.push('\n');
        }
    }
    for event in &emitted.events {
        out.push_str(&event.render_struct(contract));
        out.push('\n');
    }

    let (fallback_decls, fallback_impls, fallback_session) = fallback_receive(emitted);

    // role traits
    out.push_str(&format!(
        "/// Read-only bindings to {contract}.\n#[async_trait]\npub trait {contract}Caller {{\n{}}}\n\n",
        emitted.calls().map(|m| m.render_decl()).collect::<String>()
    ));
    out.push_str(&format!(
        "/// Write-only bindings to {contract}.\n#[async_trait]\npub trait {contract}Transactor {{\n{}{}}}\n\n",
        emitted.transacts().map(|m| m.render_decl()).collect::<String>(),
        fallback_decls
    ));
    out.push_str(&format!(
        "/// Log filtering bindings to {contract}.\n#[async_trait]\npub trait {contract}Filterer {{\n{}}}\n\n",
        emitted.events.iter().map(|e| e.render_decls()).collect::<String>()
    ));

    // client
    out.push_str(&format!(
        r#"/// Binding to a deployed {contract} contract over backend `B`.
#[derive(Debug, Clone)]
pub struct {contract}<B> {{
    contract: BoundContract<B>,
}}

impl<B> {contract}<B> {{
    /// Bind to the {contract} deployed at `address`.
    pub fn new(address: Address, backend: B) -> Result<Self, BindError> {{
        Ok(Self {{
            contract: BoundContract::bind(address, &{meta}, backend)?,
        }})
    }}

    pub fn address(&self) -> Address {{
        self.contract.address()
    }}

    /// Untyped access for raw calls, transactions and transfers.
    pub fn raw(&self) -> &BoundContract<B> {{
        &self.contract
    }}

    pub fn session(&self, call_opts: CallOpts, transact_opts: TransactOpts) -> {contract}Session<'_, B> {{
        {contract}Session {{
            contract: self,
            call_opts,
            transact_opts,
        }}
    }}

    pub fn caller_session(&self, call_opts: CallOpts) -> {contract}CallerSession<'_, B> {{
        {contract}CallerSession {{
            contract: self,
            call_opts,
        }}
    }}

    pub fn transactor_session(&self, transact_opts: TransactOpts) -> {contract}TransactorSession<'_, B> {{
        {contract}TransactorSession {{
            contract: self,
            transact_opts,
        }}
    }}
}}

impl<B: ContractCaller> {contract}<B> {{
    /// Bind a read-only instance.
    pub fn new_caller(address: Address, backend: B) -> Result<Self, BindError> {{
        Self::new(address, backend)
    }}
}}

impl<B: ContractTransactor> {contract}<B> {{
    /// Bind a write-only instance.
    pub fn new_transactor(address: Address, backend: B) -> Result<Self, BindError> {{
        Self::new(address, backend)
    }}
}}

impl<B: ContractFilterer> {contract}<B> {{
    /// Bind a log-filtering instance.
    pub fn new_filterer(address: Address, backend: B) -> Result<Self, BindError> {{
        Self::new(address, backend)
    }}
}}

"#
    ));

    out.push_str(&format!(
        "#[async_trait]\nimpl<B: ContractCaller> {contract}Caller for {contract}<B> {{\n{}}}\n\n",
        join_blocks(emitted.calls().map(|m| m.render_impl()))
    ));
    out.push_str(&format!(
        "#[async_trait]\nimpl<B: ContractTransactor> {contract}Transactor for {contract}<B> {{\n{}{}}}\n\n",
        join_blocks(emitted.transacts().map(|m| m.render_impl())),
        fallback_impls
    ));
    out.push_str(&format!(
        "#[async_trait]\nimpl<B: ContractFilterer> {contract}Filterer for {contract}<B> {{\n{}}}\n\n",
        join_blocks(emitted.events.iter().map(|e| e.render_impls()))
    ));

    // sessions
    let call_session = join_blocks(emitted.calls().map(|m| m.render_session()));
    let transact_session = join_blocks(emitted.transacts().map(|m| m.render_session()));
    out.push_str(&format!(
        r#"/// {contract} bindings with preset call and transact options.
pub struct {contract}Session<'a, B> {{
    pub contract: &'a {contract}<B>,
    pub call_opts: CallOpts,
    pub transact_opts: TransactOpts,
}}

impl<'a, B: ContractCaller> {contract}Session<'a, B> {{
{call_session}}}

impl<'a, B: ContractTransactor> {contract}Session<'a, B> {{
{transact_session}{fallback_session}}}

/// {contract} read-only bindings with preset call options.
pub struct {contract}CallerSession<'a, B> {{
    pub contract: &'a {contract}<B>,
    pub call_opts: CallOpts,
}}

impl<'a, B: ContractCaller> {contract}CallerSession<'a, B> {{
{call_session}}}

/// {contract} write-only bindings with preset transact options.
pub struct {contract}TransactorSession<'a, B> {{
    pub contract: &'a {contract}<B>,
    pub transact_opts: TransactOpts,
}}

impl<'a, B: ContractTransactor> {contract}TransactorSession<'a, B> {{
{transact_session}{fallback_session}}}
"#
    ));

    if options.emit_deploy && metadata.bin().is_some() {
        let args = emitted.constructor.clone().unwrap_or_default();
        let params: String = args.iter().map(|a| format!(", {}: {}", a.ident, a.ty)).collect();
        out.push_str(&format!(
            r#"
/// Deploy a new {contract} and bind the created instance.
pub async fn deploy_{snake}<B: ContractTransactor>(
    opts: &TransactOpts,
    backend: B{params},
) -> Result<(Address, PendingTx, {contract}<B>), BindError> {{
    let (address, tx, contract) = deploy_contract(opts, &{meta}, backend, {args}).await?;
    Ok((address, tx, {contract} {{ contract }}))
}}
"#,
            snake = snake_ident(contract),
            args = dyn_args(&args),
        ));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_string_fence() {
        assert_eq!(raw_string("[]"), "r#\"[]\"#");
        assert_eq!(raw_string("a\"#b"), "r##\"a\"#b\"##");
    }

    #[test]
    fn test_reserved_names_cover_roles() {
        let names = reserved_type_names("Token");
        for expected in ["Token", "TokenCaller", "TokenTransactorSession", "U256", "RawLog"] {
            assert!(names.iter().any(|n| n == expected), "{expected}");
        }
        assert_eq!(metadata_static("Token"), "TOKEN_METADATA");
    }
}
