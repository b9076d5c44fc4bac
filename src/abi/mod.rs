//! ABI and bytecode loading.
//!
//! Parses a contract's JSON interface description into an ordered, queryable model and
//! decodes deployment bytecode. Declaration order is kept inside each category because
//! overload keys and emitted code order depend on it.

pub mod registry;
pub mod types;

use alloy::dyn_abi::{DynSolType, DynSolValue};
use alloy::primitives::{keccak256, FixedBytes, B256, U256};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use crate::error::{BindError, Result};
pub use types::{AbiType, Param};

/// Selector of the builtin `Error(string)` revert.
pub const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];
/// Selector of the builtin `Panic(uint256)` revert.
pub const PANIC_SELECTOR: [u8; 4] = [0x4e, 0x48, 0x7b, 0x71];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateMutability {
    Pure,
    View,
    NonPayable,
    Payable,
}

impl StateMutability {
    /// Read-only functions never change state and are dispatched as calls.
    pub fn is_constant(self) -> bool {
        matches!(self, Self::Pure | Self::View)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pure => "pure",
            Self::View => "view",
            Self::NonPayable => "nonpayable",
            Self::Payable => "payable",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventParam {
    pub param: Param,
    pub indexed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub name: String,
    /// Unique name within the contract; overloads get a numeric suffix
    pub key: String,
    pub inputs: Vec<Param>,
    pub outputs: Vec<Param>,
    pub state_mutability: StateMutability,
}

impl Function {
    pub fn signature(&self) -> String {
        signature(&self.name, self.inputs.iter())
    }

    pub fn selector(&self) -> FixedBytes<4> {
        selector(&self.signature())
    }

    /// Selector followed by the ABI-encoded arguments.
    pub fn encode_input(&self, args: Vec<DynSolValue>) -> Result<Vec<u8>> {
        let mut data = self.selector().to_vec();
        data.extend(encode_params(&self.inputs, args, &self.key)?);
        Ok(data)
    }

    pub fn decode_output(&self, data: &[u8]) -> Result<Vec<DynSolValue>> {
        decode_params(&self.outputs, data, &format!("output of `{}`", self.key))
    }

    pub fn decode_input(&self, data: &[u8]) -> Result<Vec<DynSolValue>> {
        let body = data
            .strip_prefix(self.selector().as_slice())
            .ok_or_else(|| BindError::decode(format!("input of `{}`", self.key), "selector mismatch"))?;
        decode_params(&self.inputs, body, &format!("input of `{}`", self.key))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub name: String,
    pub key: String,
    pub inputs: Vec<EventParam>,
    pub anonymous: bool,
}

impl Event {
    pub fn signature(&self) -> String {
        signature(&self.name, self.inputs.iter().map(|p| &p.param))
    }

    /// First topic of every non-anonymous log emitted by this event.
    pub fn topic(&self) -> B256 {
        keccak256(self.signature())
    }

    pub fn indexed(&self) -> impl Iterator<Item = &Param> {
        self.inputs.iter().filter(|p| p.indexed).map(|p| &p.param)
    }

    pub fn non_indexed(&self) -> impl Iterator<Item = &Param> {
        self.inputs.iter().filter(|p| !p.indexed).map(|p| &p.param)
    }

    /// Decode a log into its field values, in declaration order.
    pub fn decode_log(&self, topics: &[B256], data: &[u8]) -> Result<Vec<DynSolValue>> {
        let topics = if self.anonymous {
            topics
        } else {
            match topics.split_first() {
                Some((first, rest)) if *first == self.topic() => rest,
                Some((first, _)) => {
                    return Err(BindError::mismatch(
                        &self.key,
                        format!("topic {first} is not the signature hash {}", self.topic()),
                    ))
                }
                None => return Err(BindError::mismatch(&self.key, "log has no topics")),
            }
        };

        let indexed: Vec<&Param> = self.indexed().collect();
        if topics.len() != indexed.len() {
            return Err(BindError::mismatch(
                &self.key,
                format!("expected {} indexed topics, found {}", indexed.len(), topics.len()),
            ));
        }

        let body: Vec<Param> = self.non_indexed().cloned().collect();
        let mut body = decode_params(&body, data, &format!("data of event `{}`", self.key))?.into_iter();
        let mut topics = indexed.iter().zip(topics);

        let mut values = Vec::with_capacity(self.inputs.len());
        for input in &self.inputs {
            let value = if input.indexed {
                let (param, topic) = topics
                    .next()
                    .ok_or_else(|| BindError::mismatch(&self.key, "missing indexed topic"))?;
                param.ty.decode_topic(topic)?
            } else {
                body.next()
                    .ok_or_else(|| BindError::decode(format!("data of event `{}`", self.key), "missing field"))?
            };
            values.push(value);
        }
        Ok(values)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDef {
    pub name: String,
    pub inputs: Vec<Param>,
}

impl ErrorDef {
    pub fn signature(&self) -> String {
        signature(&self.name, self.inputs.iter())
    }

    pub fn selector(&self) -> FixedBytes<4> {
        selector(&self.signature())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constructor {
    pub inputs: Vec<Param>,
    pub state_mutability: StateMutability,
}

impl Constructor {
    pub fn encode_args(&self, args: Vec<DynSolValue>) -> Result<Vec<u8>> {
        encode_params(&self.inputs, args, "constructor")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiEntry {
    Function(Function),
    Event(Event),
    Error(ErrorDef),
    Constructor(Constructor),
    Fallback(StateMutability),
    Receive,
}

/// A decoded revert payload.
#[derive(Debug, Clone, PartialEq)]
pub enum RevertReason {
    Message(String),
    Panic(U256),
    Custom { name: String, args: Vec<DynSolValue> },
}

/// Structured contract interface, grouped by category in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Abi {
    pub constructor: Option<Constructor>,
    pub functions: Vec<Function>,
    pub events: Vec<Event>,
    pub errors: Vec<ErrorDef>,
    pub fallback: Option<StateMutability>,
    pub receive: bool,
}

impl Abi {
    pub fn parse(abi_text: &str) -> Result<Self> {
        Ok(Self::from_entries(parse(abi_text)?))
    }

    pub fn from_entries(entries: Vec<AbiEntry>) -> Self {
        let mut abi = Self::default();
        for entry in entries {
            match entry {
                AbiEntry::Function(f) => abi.functions.push(f),
                AbiEntry::Event(e) => abi.events.push(e),
                AbiEntry::Error(e) => abi.errors.push(e),
                AbiEntry::Constructor(c) => abi.constructor = Some(c),
                AbiEntry::Fallback(m) => abi.fallback = Some(m),
                AbiEntry::Receive => abi.receive = true,
            }
        }
        abi
    }

    pub fn function(&self, key: &str) -> Result<&Function> {
        self.functions
            .iter()
            .find(|f| f.key == key)
            .ok_or_else(|| BindError::UnknownMethod(key.to_string()))
    }

    pub fn event(&self, key: &str) -> Result<&Event> {
        self.events
            .iter()
            .find(|e| e.key == key)
            .ok_or_else(|| BindError::UnknownEvent(key.to_string()))
    }

    pub fn function_by_selector(&self, selector: &[u8]) -> Option<&Function> {
        self.functions.iter().find(|f| f.selector().as_slice() == selector)
    }

    pub fn event_by_topic(&self, topic: &B256) -> Option<&Event> {
        self.events
            .iter()
            .find(|e| !e.anonymous && e.topic() == *topic)
    }

    /// Decode revert data against the builtin reverts and declared custom errors.
    pub fn decode_error(&self, data: &[u8]) -> Result<RevertReason> {
        if data.len() < 4 {
            return Err(BindError::decode("revert data", "shorter than a selector"));
        }
        let (head, body) = data.split_at(4);
        if head == ERROR_STRING_SELECTOR {
            let message = decode_params(&[Param::new("message", AbiType::String)], body, "Error(string)")?;
            return match message.into_iter().next() {
                Some(DynSolValue::String(message)) => Ok(RevertReason::Message(message)),
                _ => Err(BindError::decode("Error(string)", "missing message")),
            };
        }
        if head == PANIC_SELECTOR {
            let code = decode_params(&[Param::new("code", AbiType::Uint(256))], body, "Panic(uint256)")?;
            return match code.into_iter().next() {
                Some(DynSolValue::Uint(code, _)) => Ok(RevertReason::Panic(code)),
                _ => Err(BindError::decode("Panic(uint256)", "missing code")),
            };
        }
        let error = self
            .errors
            .iter()
            .find(|e| e.selector().as_slice() == head)
            .ok_or_else(|| BindError::decode("revert data", format!("unknown error selector 0x{}", hex::encode(head))))?;
        let args = decode_params(&error.inputs, body, &format!("error `{}`", error.name))?;
        Ok(RevertReason::Custom {
            name: error.name.clone(),
            args,
        })
    }
}

/// Immutable per-contract metadata: the raw ABI, optional deployment bytecode and a
/// lazily parsed structured ABI shared by everything bound to the contract.
#[derive(Debug)]
pub struct ContractMetadata {
    abi: std::borrow::Cow<'static, str>,
    bin: Option<std::borrow::Cow<'static, str>>,
    parsed: OnceLock<std::result::Result<Arc<Abi>, String>>,
}

impl ContractMetadata {
    pub fn new(abi: impl Into<String>, bin: Option<String>) -> Self {
        Self {
            abi: abi.into().into(),
            bin: bin.map(Into::into),
            parsed: OnceLock::new(),
        }
    }

    /// Metadata embedded in generated code.
    pub const fn from_static(abi: &'static str, bin: Option<&'static str>) -> Self {
        Self {
            abi: std::borrow::Cow::Borrowed(abi),
            bin: match bin {
                Some(bin) => Some(std::borrow::Cow::Borrowed(bin)),
                None => None,
            },
            parsed: OnceLock::new(),
        }
    }

    /// Build metadata from a compiler artifact (`{"abi": [...], "bytecode": ...}`).
    pub fn from_artifact(json: &str) -> Result<Self> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Bytecode {
            Plain(String),
            Object { object: String },
        }

        #[derive(Deserialize)]
        struct Artifact {
            abi: serde_json::Value,
            bytecode: Option<Bytecode>,
        }

        let artifact: Artifact = serde_json::from_str(json)
            .map_err(|e| BindError::malformed(format!("line {} column {}", e.line(), e.column()), e.to_string()))?;
        let bin = artifact.bytecode.map(|b| match b {
            Bytecode::Plain(s) => s,
            Bytecode::Object { object } => object,
        });
        Ok(Self::new(artifact.abi.to_string(), bin.filter(|b| !b.is_empty() && b != "0x")))
    }

    pub fn abi_json(&self) -> &str {
        &self.abi
    }

    pub fn bin(&self) -> Option<&str> {
        self.bin.as_deref()
    }

    /// Parsed ABI, computed on first access.
    pub fn abi(&self) -> Result<Arc<Abi>> {
        self.parsed
            .get_or_init(|| Abi::parse(&self.abi).map(Arc::new).map_err(|e| e.to_string()))
            .clone()
            .map_err(BindError::AbiResolutionFailed)
    }

    pub fn bytecode(&self) -> Result<Vec<u8>> {
        match self.bin() {
            Some(bin) => decode_bytecode(bin),
            None => Err(BindError::InvalidHexEncoding("contract has no bytecode".to_string())),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawParam {
    #[serde(default)]
    name: String,
    #[serde(rename = "type")]
    ty: String,
    internal_type: Option<String>,
    components: Option<Vec<RawParam>>,
    #[serde(default)]
    indexed: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEntry {
    #[serde(rename = "type", default = "default_entry_type")]
    kind: String,
    name: Option<String>,
    #[serde(default)]
    inputs: Vec<RawParam>,
    #[serde(default)]
    outputs: Vec<RawParam>,
    state_mutability: Option<StateMutability>,
    constant: Option<bool>,
    payable: Option<bool>,
    #[serde(default)]
    anonymous: bool,
}

fn default_entry_type() -> String {
    "function".to_string()
}

impl RawEntry {
    fn mutability(&self) -> StateMutability {
        if let Some(m) = self.state_mutability {
            return m;
        }
        // pre-0.4.16 compilers only emit `constant`/`payable`
        if self.constant.unwrap_or(false) {
            StateMutability::View
        } else if self.payable.unwrap_or(false) {
            StateMutability::Payable
        } else {
            StateMutability::NonPayable
        }
    }
}

/// Parse JSON ABI text into entries, preserving declaration order.
pub fn parse(abi_text: &str) -> Result<Vec<AbiEntry>> {
    let raw: Vec<RawEntry> = serde_json::from_str(abi_text)
        .map_err(|e| BindError::malformed(format!("line {} column {}", e.line(), e.column()), e.to_string()))?;

    let taken_functions: HashSet<String> = raw
        .iter()
        .filter(|e| e.kind == "function")
        .filter_map(|e| e.name.clone())
        .collect();
    let taken_events: HashSet<String> = raw
        .iter()
        .filter(|e| e.kind == "event")
        .filter_map(|e| e.name.clone())
        .collect();
    let mut function_keys = KeyAllocator::new(taken_functions);
    let mut event_keys = KeyAllocator::new(taken_events);

    let mut entries = Vec::with_capacity(raw.len());
    for (index, entry) in raw.into_iter().enumerate() {
        let mutability = entry.mutability();
        let location = |what: &str| match &entry.name {
            Some(name) => format!("{} `{}` {}", entry.kind, name, what),
            None => format!("entry #{index} ({}) {}", entry.kind, what),
        };
        match entry.kind.as_str() {
            "function" => {
                let name = entry
                    .name
                    .clone()
                    .filter(|n| !n.is_empty())
                    .ok_or_else(|| BindError::malformed(format!("entry #{index}"), "function without a name"))?;
                let inputs = convert_params(&entry.inputs, &location("input"))?;
                let outputs = convert_params(&entry.outputs, &location("output"))?;
                entries.push(AbiEntry::Function(Function {
                    key: function_keys.allocate(&name),
                    name,
                    inputs,
                    outputs,
                    state_mutability: mutability,
                }));
            }
            "event" => {
                let name = entry
                    .name
                    .clone()
                    .filter(|n| !n.is_empty())
                    .ok_or_else(|| BindError::malformed(format!("entry #{index}"), "event without a name"))?;
                let mut inputs = Vec::with_capacity(entry.inputs.len());
                for (i, raw) in entry.inputs.iter().enumerate() {
                    inputs.push(EventParam {
                        param: convert_param(raw, &format!("{} #{i}", location("input")))?,
                        indexed: raw.indexed,
                    });
                }
                let indexed = inputs.iter().filter(|p| p.indexed).count();
                let limit = if entry.anonymous { 4 } else { 3 };
                if indexed > limit {
                    return Err(BindError::malformed(
                        location(""),
                        format!("{indexed} indexed parameters exceed the limit of {limit}"),
                    ));
                }
                entries.push(AbiEntry::Event(Event {
                    key: event_keys.allocate(&name),
                    name,
                    inputs,
                    anonymous: entry.anonymous,
                }));
            }
            "error" => {
                let name = entry
                    .name
                    .clone()
                    .ok_or_else(|| BindError::malformed(format!("entry #{index}"), "error without a name"))?;
                let inputs = convert_params(&entry.inputs, &location("input"))?;
                entries.push(AbiEntry::Error(ErrorDef { name, inputs }));
            }
            "constructor" => {
                let inputs = convert_params(&entry.inputs, &location("input"))?;
                entries.push(AbiEntry::Constructor(Constructor {
                    inputs,
                    state_mutability: mutability,
                }));
            }
            "fallback" => entries.push(AbiEntry::Fallback(mutability)),
            "receive" => entries.push(AbiEntry::Receive),
            other => {
                return Err(BindError::malformed(
                    format!("entry #{index}"),
                    format!("unknown entry type `{other}`"),
                ))
            }
        }
    }
    Ok(entries)
}

/// Decode hex deployment bytecode. A `0x` prefix is optional.
pub fn decode_bytecode(hex_text: &str) -> Result<Vec<u8>> {
    let trimmed = hex_text.trim();
    let body = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    if let Some(start) = body.find("__") {
        let placeholder: String = body[start..].chars().take(40).collect();
        return Err(BindError::InvalidHexEncoding(format!(
            "unlinked library placeholder `{placeholder}`"
        )));
    }
    hex::decode(body).map_err(|e| BindError::InvalidHexEncoding(e.to_string()))
}

/// Deterministic unique names for overloaded functions/events.
struct KeyAllocator {
    taken: HashSet<String>,
    assigned: HashSet<String>,
}

impl KeyAllocator {
    fn new(taken: HashSet<String>) -> Self {
        Self {
            taken,
            assigned: HashSet::new(),
        }
    }

    fn allocate(&mut self, name: &str) -> String {
        if self.assigned.insert(name.to_string()) {
            return name.to_string();
        }
        let mut idx = 0usize;
        loop {
            let candidate = format!("{name}{idx}");
            if !self.taken.contains(&candidate) && self.assigned.insert(candidate.clone()) {
                return candidate;
            }
            idx += 1;
        }
    }
}

fn convert_params(raw: &[RawParam], location: &str) -> Result<Vec<Param>> {
    raw.iter()
        .enumerate()
        .map(|(i, p)| convert_param(p, &format!("{location} #{i}")))
        .collect()
}

fn convert_param(raw: &RawParam, location: &str) -> Result<Param> {
    let components = match &raw.components {
        Some(components) => Some(convert_params(components, location)?),
        None => None,
    };
    Ok(Param {
        name: raw.name.clone(),
        ty: AbiType::parse(&raw.ty, components, location)?,
        internal_type: raw.internal_type.clone(),
    })
}

fn signature<'a>(name: &str, params: impl Iterator<Item = &'a Param>) -> String {
    let types: Vec<String> = params.map(|p| p.ty.canonical()).collect();
    format!("{}({})", name, types.join(","))
}

fn selector(signature: &str) -> FixedBytes<4> {
    FixedBytes::from_slice(&keccak256(signature)[..4])
}

/// ABI-encode `values` as the parameter list `params`.
pub fn encode_params(params: &[Param], values: Vec<DynSolValue>, context: &str) -> Result<Vec<u8>> {
    if params.len() != values.len() {
        return Err(BindError::InvalidArgument(format!(
            "`{context}` takes {} arguments, {} given",
            params.len(),
            values.len()
        )));
    }
    if params.is_empty() {
        return Ok(Vec::new());
    }
    let values = params
        .iter()
        .zip(values)
        .map(|(param, value)| param.ty.coerce(value))
        .collect::<Result<Vec<_>>>()?;
    Ok(DynSolValue::Tuple(values).abi_encode_params())
}

/// ABI-decode `data` as the parameter list `params`.
pub fn decode_params(params: &[Param], data: &[u8], context: &str) -> Result<Vec<DynSolValue>> {
    if params.is_empty() {
        return Ok(Vec::new());
    }
    let ty = DynSolType::Tuple(
        params
            .iter()
            .map(|p| p.ty.to_dyn())
            .collect::<Result<Vec<_>>>()?,
    );
    match ty.abi_decode_params(data) {
        Ok(DynSolValue::Tuple(values)) => Ok(values),
        Ok(other) => Err(BindError::decode(context, format!("unexpected {}", types::describe(&other)))),
        Err(e) => Err(BindError::decode(context, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{b256, Address};

    pub(crate) const ERC20_ABI: &str = r#"[
        {"type":"constructor","inputs":[{"name":"name_","type":"string"},{"name":"supply","type":"uint256"}],"stateMutability":"nonpayable"},
        {"type":"function","name":"approve","inputs":[{"name":"spender","type":"address"},{"name":"amount","type":"uint256"}],"outputs":[{"name":"","type":"bool"}],"stateMutability":"nonpayable"},
        {"type":"function","name":"balanceOf","inputs":[{"name":"account","type":"address"}],"outputs":[{"name":"","type":"uint256"}],"stateMutability":"view"},
        {"type":"function","name":"transfer","inputs":[{"name":"to","type":"address"},{"name":"amount","type":"uint256"}],"outputs":[{"name":"","type":"bool"}],"stateMutability":"nonpayable"},
        {"type":"function","name":"transfer","inputs":[{"name":"to","type":"address"},{"name":"amount","type":"uint256"},{"name":"memo","type":"bytes"}],"outputs":[],"stateMutability":"payable"},
        {"type":"event","name":"Approval","anonymous":false,"inputs":[{"name":"owner","type":"address","indexed":true},{"name":"spender","type":"address","indexed":true},{"name":"value","type":"uint256","indexed":false}]},
        {"type":"error","name":"InsufficientBalance","inputs":[{"name":"needed","type":"uint256"}]},
        {"type":"receive","stateMutability":"payable"}
    ]"#;

    #[test]
    fn test_parse_preserves_order_and_overload_keys() {
        let abi = Abi::parse(ERC20_ABI).unwrap();
        let keys: Vec<&str> = abi.functions.iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, vec!["approve", "balanceOf", "transfer", "transfer0"]);
        assert!(abi.constructor.is_some());
        assert!(abi.receive);
        assert_eq!(abi.errors.len(), 1);
    }

    #[test]
    fn test_overload_suffix_skips_declared_names() {
        let text = r#"[
            {"type":"function","name":"foo","inputs":[],"outputs":[],"stateMutability":"view"},
            {"type":"function","name":"foo","inputs":[{"name":"a","type":"uint8"}],"outputs":[],"stateMutability":"view"},
            {"type":"function","name":"foo0","inputs":[],"outputs":[],"stateMutability":"view"}
        ]"#;
        let abi = Abi::parse(text).unwrap();
        let keys: Vec<&str> = abi.functions.iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, vec!["foo", "foo1", "foo0"]);
    }

    #[test]
    fn test_known_selectors_and_topics() {
        let abi = Abi::parse(ERC20_ABI).unwrap();
        let approve = abi.function("approve").unwrap();
        assert_eq!(approve.signature(), "approve(address,uint256)");
        assert_eq!(approve.selector().as_slice(), &[0x09, 0x5e, 0xa7, 0xb3]);

        let approval = abi.event("Approval").unwrap();
        assert_eq!(approval.signature(), "Approval(address,address,uint256)");
        assert_eq!(
            approval.topic(),
            b256!("8c5be1e5ebec7d5bd14f71427d1e84f3dd0314c0f7b2291e5b200ac8c7c3b925")
        );

        assert_eq!(abi.function_by_selector(&[0x09, 0x5e, 0xa7, 0xb3]).map(|f| f.key.as_str()), Some("approve"));
        assert!(abi.function_by_selector(&[0, 0, 0, 0]).is_none());
        assert_eq!(abi.event_by_topic(&approval.topic()).map(|e| e.key.as_str()), Some("Approval"));
    }

    #[test]
    fn test_signature_hash_is_stable() {
        let first = Abi::parse(ERC20_ABI).unwrap();
        let second = Abi::parse(ERC20_ABI).unwrap();
        for (a, b) in first.events.iter().zip(&second.events) {
            assert_eq!(a.topic(), b.topic());
            assert_eq!(a.topic(), keccak256(a.signature()));
        }
    }

    #[test]
    fn test_malformed_abi() {
        assert!(matches!(parse("not json"), Err(BindError::MalformedAbi { .. })));
        let bad_type = r#"[{"type":"function","name":"f","inputs":[{"name":"x","type":"uint7"}],"outputs":[]}]"#;
        match parse(bad_type) {
            Err(BindError::MalformedAbi { location, .. }) => assert!(location.contains("`f`")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_legacy_constant_flag() {
        let text = r#"[{"type":"function","name":"owner","constant":true,"inputs":[],"outputs":[{"name":"","type":"address"}]}]"#;
        let abi = Abi::parse(text).unwrap();
        assert_eq!(abi.functions[0].state_mutability, StateMutability::View);
    }

    #[test]
    fn test_decode_bytecode() {
        assert_eq!(decode_bytecode("0x6001").unwrap(), vec![0x60, 0x01]);
        assert_eq!(decode_bytecode("6001").unwrap(), vec![0x60, 0x01]);
        assert!(matches!(decode_bytecode("0x600"), Err(BindError::InvalidHexEncoding(_))));
        assert!(matches!(decode_bytecode("0x60zz"), Err(BindError::InvalidHexEncoding(_))));
        assert!(matches!(
            decode_bytecode("0x73__$1234567890abcdef1234567890abcdef12$__"),
            Err(BindError::InvalidHexEncoding(_))
        ));
    }

    #[test]
    fn test_event_decode_and_mismatch() {
        let abi = Abi::parse(ERC20_ABI).unwrap();
        let approval = abi.event("Approval").unwrap();
        let owner = Address::repeat_byte(0xbb);
        let spender = Address::repeat_byte(0xaa);
        let data = DynSolValue::Uint(U256::from(100u64), 256).abi_encode();
        let topics = vec![approval.topic(), owner.into_word(), spender.into_word()];

        let values = approval.decode_log(&topics, &data).unwrap();
        assert_eq!(values[0], DynSolValue::Address(owner));
        assert_eq!(values[1], DynSolValue::Address(spender));
        assert_eq!(values[2], DynSolValue::Uint(U256::from(100u64), 256));

        let wrong = vec![B256::repeat_byte(1), owner.into_word(), spender.into_word()];
        assert!(matches!(
            approval.decode_log(&wrong, &data),
            Err(BindError::EventMismatch { .. })
        ));
    }

    #[test]
    fn test_truncated_output_is_decode_failure() {
        let abi = Abi::parse(ERC20_ABI).unwrap();
        let balance_of = abi.function("balanceOf").unwrap();
        assert!(matches!(
            balance_of.decode_output(&[0u8; 16]),
            Err(BindError::DecodeFailed { .. })
        ));
    }

    #[test]
    fn test_decode_custom_and_builtin_errors() {
        let abi = Abi::parse(ERC20_ABI).unwrap();
        let custom = &abi.errors[0];
        let mut data = custom.selector().to_vec();
        data.extend(DynSolValue::Uint(U256::from(7u64), 256).abi_encode());
        match abi.decode_error(&data).unwrap() {
            RevertReason::Custom { name, args } => {
                assert_eq!(name, "InsufficientBalance");
                assert_eq!(args, vec![DynSolValue::Uint(U256::from(7u64), 256)]);
            }
            other => panic!("unexpected reason: {other:?}"),
        }

        let mut data = ERROR_STRING_SELECTOR.to_vec();
        data.extend(DynSolValue::Tuple(vec![DynSolValue::String("nope".into())]).abi_encode_params());
        assert_eq!(
            abi.decode_error(&data).unwrap(),
            RevertReason::Message("nope".into())
        );
    }

    #[test]
    fn test_metadata_parses_lazily_and_reports_resolution_failure() {
        let good = ContractMetadata::new(ERC20_ABI, None);
        let first = good.abi().unwrap();
        let second = good.abi().unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let bad = ContractMetadata::new("[{", None);
        assert!(matches!(bad.abi(), Err(BindError::AbiResolutionFailed(_))));
    }

    #[test]
    fn test_metadata_from_artifact() {
        let artifact = format!(r#"{{"abi": {ERC20_ABI}, "bytecode": {{"object": "0x6001"}}}}"#);
        let metadata = ContractMetadata::from_artifact(&artifact).unwrap();
        assert_eq!(metadata.bin(), Some("0x6001"));
        assert_eq!(metadata.abi().unwrap().functions.len(), 4);
    }
}
