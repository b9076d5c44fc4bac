//! Per-method and per-event wrapper emission.
//!
//! Each ABI function becomes either a call wrapper or a transact wrapper depending on its
//! state mutability. Each event becomes a typed struct plus filter, watch and parse
//! wrappers. The wrappers only carry names and types; the assembler decides which
//! trait or session they are rendered into.

use crate::abi::{Abi, StateMutability};
use crate::codegen::mapper::{param_idents, pascal_ident, snake_ident, Namespace, StructDef, StructField, TypeMapper};
use crate::error::Result;

/// How a method is dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    /// Read-only message call, never submitted
    Call,
    /// Signed, submitted transaction
    Transact,
}

impl MethodKind {
    pub fn of(mutability: StateMutability) -> Self {
        match mutability {
            StateMutability::Pure | StateMutability::View => Self::Call,
            StateMutability::NonPayable | StateMutability::Payable => Self::Transact,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arg {
    pub ident: String,
    pub ty: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Returns {
    Unit,
    Single(String),
    /// Several outputs collected into a generated struct
    Struct(StructDef),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodWrapper {
    pub key: String,
    pub ident: String,
    pub kind: MethodKind,
    pub mutability: StateMutability,
    pub signature: String,
    pub args: Vec<Arg>,
    pub returns: Returns,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventField {
    pub ident: String,
    /// Type of the struct field; hashed indexed fields are `B256`
    pub ty: String,
    /// Type accepted in topic filters, set for indexed fields
    pub filter_ty: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventWrapper {
    pub key: String,
    pub signature: String,
    pub struct_name: String,
    pub filter_ident: String,
    pub watch_ident: String,
    pub parse_ident: String,
    pub fields: Vec<EventField>,
}

/// Everything emitted for one contract, in ABI declaration order.
#[derive(Debug, Clone, Default)]
pub struct Emitted {
    pub methods: Vec<MethodWrapper>,
    pub events: Vec<EventWrapper>,
    pub fallback: Option<String>,
    pub receive: Option<String>,
    pub constructor: Option<Vec<Arg>>,
}

impl Emitted {
    pub fn calls(&self) -> impl Iterator<Item = &MethodWrapper> {
        self.methods.iter().filter(|m| m.kind == MethodKind::Call)
    }

    pub fn transacts(&self) -> impl Iterator<Item = &MethodWrapper> {
        self.methods.iter().filter(|m| m.kind == MethodKind::Transact)
    }
}

const METHOD_LOCALS: &[&str] = &["opts", "values", "fields"];
const EVENT_LOCALS: &[&str] = &["raw", "opts", "sink", "log", "topics"];

/// Build the wrappers for `abi`. Method names are claimed from `methods` so they never
/// clash with the client's own methods.
pub fn emit(contract: &str, abi: &Abi, mapper: &mut TypeMapper, methods: &mut Namespace) -> Result<Emitted> {
    let mut emitted = Emitted::default();

    for function in &abi.functions {
        let location = |what: &str, i: usize| format!("function `{}` {} #{}", function.key, what, i);
        let suffix = &function.key[function.name.len()..];
        let ident = methods.claim(&format!("{}{}", snake_ident(&function.name), suffix));

        let mut args = Vec::with_capacity(function.inputs.len());
        for (i, (param, arg_ident)) in function
            .inputs
            .iter()
            .zip(param_idents(&function.inputs, "arg", METHOD_LOCALS))
            .enumerate()
        {
            let ty = mapper.map_param(param, &format!("{}_{}", function.key, arg_ident), &location("input", i))?;
            args.push(Arg { ident: arg_ident, ty });
        }

        let returns = match function.outputs.as_slice() {
            [] => Returns::Unit,
            [single] => Returns::Single(mapper.map_param(
                single,
                &format!("{}_output", function.key),
                &location("output", 0),
            )?),
            outputs => {
                let name = mapper.claim_type_name(&format!("{}Output", pascal_ident(&ident)));
                let mut fields = Vec::with_capacity(outputs.len());
                for (i, (param, field_ident)) in outputs.iter().zip(param_idents(outputs, "field", &[])).enumerate() {
                    let ty = mapper.map_param(param, &format!("{name}_{field_ident}"), &location("output", i))?;
                    fields.push(StructField { ident: field_ident, ty });
                }
                Returns::Struct(StructDef::new(name, function.signature(), fields))
            }
        };

        emitted.methods.push(MethodWrapper {
            key: function.key.clone(),
            ident,
            kind: MethodKind::of(function.state_mutability),
            mutability: function.state_mutability,
            signature: function.signature(),
            args,
            returns,
        });
    }

    for event in &abi.events {
        let params: Vec<_> = event.inputs.iter().map(|p| p.param.clone()).collect();
        let idents = param_idents(&params, "field", EVENT_LOCALS);
        let struct_name = mapper.claim_type_name(&format!("{}{}", pascal_ident(contract), pascal_ident(&event.key)));

        let mut fields = Vec::with_capacity(params.len());
        for (i, (input, ident)) in event.inputs.iter().zip(idents).enumerate() {
            let location = format!("event `{}` input #{}", event.key, i);
            let mapped = mapper.map_param(&input.param, &format!("{}_{}", event.key, ident), &location)?;
            let (ty, filter_ty) = match (input.indexed, input.param.ty.is_value_type()) {
                (true, true) => (mapped.clone(), Some(mapped)),
                (true, false) => ("B256".to_string(), Some(mapped)),
                (false, _) => (mapped, None),
            };
            fields.push(EventField { ident, ty, filter_ty });
        }

        let base = snake_ident(&event.key);
        emitted.events.push(EventWrapper {
            key: event.key.clone(),
            signature: event.signature(),
            struct_name,
            filter_ident: methods.claim(&format!("filter_{base}")),
            watch_ident: methods.claim(&format!("watch_{base}")),
            parse_ident: methods.claim(&format!("parse_{base}")),
            fields,
        });
    }

    if abi.fallback.is_some() {
        emitted.fallback = Some(methods.claim("fallback"));
    }
    if abi.receive {
        emitted.receive = Some(methods.claim("receive"));
    }

    if let Some(constructor) = &abi.constructor {
        let mut args = Vec::with_capacity(constructor.inputs.len());
        for (i, (param, ident)) in constructor
            .inputs
            .iter()
            .zip(param_idents(&constructor.inputs, "arg", &["opts", "backend"]))
            .enumerate()
        {
            let ty = mapper.map_param(param, &format!("constructor_{ident}"), &format!("constructor input #{i}"))?;
            args.push(Arg { ident, ty });
        }
        emitted.constructor = Some(args);
    }

    Ok(emitted)
}

fn arg_list(args: &[Arg]) -> String {
    args.iter().map(|a| format!(", {}: {}", a.ident, a.ty)).collect()
}

fn arg_names(args: &[Arg]) -> String {
    args.iter().map(|a| format!(", {}", a.ident)).collect()
}

/// `vec![a.into_dyn(), ...]` for the given arguments.
pub fn dyn_args(args: &[Arg]) -> String {
    if args.is_empty() {
        return "Vec::new()".to_string();
    }
    let items: Vec<String> = args.iter().map(|a| format!("{}.into_dyn()", a.ident)).collect();
    format!("vec![{}]", items.join(", "))
}

fn struct_literal(name: &str, fields: &[StructField], source: &str, indent: &str, extra: &str) -> String {
    let mut out = format!("{name} {{\n");
    for field in fields {
        out.push_str(&format!("{indent}    {}: {source}.next()?,\n", field.ident));
    }
    out.push_str(extra);
    out.push_str(&format!("{indent}}}"));
    out
}

impl MethodWrapper {
    fn opts_type(&self) -> &'static str {
        match self.kind {
            MethodKind::Call => "CallOpts",
            MethodKind::Transact => "TransactOpts",
        }
    }

    pub fn return_type(&self) -> String {
        match (&self.kind, &self.returns) {
            (MethodKind::Transact, _) => "PendingTx".to_string(),
            (MethodKind::Call, Returns::Unit) => "()".to_string(),
            (MethodKind::Call, Returns::Single(ty)) => ty.clone(),
            (MethodKind::Call, Returns::Struct(def)) => def.name.clone(),
        }
    }

    fn doc(&self) -> String {
        match self.kind {
            MethodKind::Call => format!("    /// Calls `{}` ({}).\n", self.signature, self.mutability.as_str()),
            MethodKind::Transact => format!("    /// Submits `{}` ({}).\n", self.signature, self.mutability.as_str()),
        }
    }

    fn head(&self) -> String {
        format!(
            "async fn {}(&self, opts: &{}{}) -> Result<{}, BindError>",
            self.ident,
            self.opts_type(),
            arg_list(&self.args),
            self.return_type()
        )
    }

    /// Declaration inside a role trait.
    pub fn render_decl(&self) -> String {
        format!("{}    {};\n", self.doc(), self.head())
    }

    /// Implementation inside a role trait impl.
    pub fn render_impl(&self) -> String {
        let body = match (&self.kind, &self.returns) {
            (MethodKind::Transact, _) => format!(
                "        self.contract.transact(opts, \"{}\", {}).await\n",
                self.key,
                dyn_args(&self.args)
            ),
            (MethodKind::Call, Returns::Unit) => format!(
                "        self.contract.call(opts, \"{}\", {}).await?;\n        Ok(())\n",
                self.key,
                dyn_args(&self.args)
            ),
            (MethodKind::Call, Returns::Single(_)) => format!(
                "        let values = self.contract.call(opts, \"{}\", {}).await?;\n        Fields::new(values, \"{}\").next()\n",
                self.key,
                dyn_args(&self.args),
                self.key
            ),
            (MethodKind::Call, Returns::Struct(def)) => format!(
                "        let values = self.contract.call(opts, \"{}\", {}).await?;\n        let mut fields = Fields::new(values, \"{}\");\n        Ok({})\n",
                self.key,
                dyn_args(&self.args),
                self.key,
                struct_literal(&def.name, &def.fields, "fields", "        ", "")
            ),
        };
        format!("    {} {{\n{}    }}\n", self.head(), body)
    }

    /// Forwarding method on a session holding preset options.
    pub fn render_session(&self) -> String {
        let opts_field = match self.kind {
            MethodKind::Call => "call_opts",
            MethodKind::Transact => "transact_opts",
        };
        format!(
            "{}    pub async fn {}(&self{}) -> Result<{}, BindError> {{\n        self.contract.{}(&self.{}{}).await\n    }}\n",
            self.doc(),
            self.ident,
            arg_list(&self.args),
            self.return_type(),
            self.ident,
            opts_field,
            arg_names(&self.args)
        )
    }
}

impl EventWrapper {
    fn filter_args(&self) -> Vec<Arg> {
        self.fields
            .iter()
            .filter_map(|f| {
                f.filter_ty.as_ref().map(|ty| Arg {
                    ident: f.ident.clone(),
                    ty: format!("Vec<{ty}>"),
                })
            })
            .collect()
    }

    fn topics(&self) -> String {
        let args = self.filter_args();
        if args.is_empty() {
            return "        let topics = Vec::new();\n".to_string();
        }
        let mut out = "        let topics = vec![\n".to_string();
        for arg in &args {
            out.push_str(&format!(
                "            {}.into_iter().map(AbiValue::into_dyn).collect(),\n",
                arg.ident
            ));
        }
        out.push_str("        ];\n");
        out
    }

    /// The typed event struct and its `EventBinding` impl.
    pub fn render_struct(&self, contract: &str) -> String {
        let mut out = format!(
            "/// `{}` event of {}.\n#[derive(Debug, Clone, PartialEq, Eq)]\npub struct {} {{\n",
            self.signature, contract, self.struct_name
        );
        for field in &self.fields {
            if field.filter_ty.as_deref().is_some_and(|ty| ty != field.ty) {
                out.push_str("    /// Indexed; holds the keccak256 topic, not the value\n");
            }
            out.push_str(&format!("    pub {}: {},\n", field.ident, field.ty));
        }
        out.push_str("    pub raw: RawLog,\n}\n\n");

        let fields: Vec<StructField> = self
            .fields
            .iter()
            .map(|f| StructField {
                ident: f.ident.clone(),
                ty: f.ty.clone(),
            })
            .collect();
        let body = if fields.is_empty() {
            "    fn from_log(_values: Vec<DynSolValue>, raw: RawLog) -> Result<Self, BindError> {\n        Ok(Self { raw })\n    }\n"
                .to_string()
        } else {
            format!(
                "    fn from_log(values: Vec<DynSolValue>, raw: RawLog) -> Result<Self, BindError> {{\n        let mut fields = Fields::new(values, \"{}\");\n        Ok({})\n    }}\n",
                self.key,
                struct_literal("Self", &fields, "fields", "        ", "            raw,\n")
            )
        };
        out.push_str(&format!(
            "impl EventBinding for {} {{\n    const EVENT: &'static str = \"{}\";\n\n{}}}\n",
            self.struct_name, self.key, body
        ));
        out
    }

    pub fn render_decls(&self) -> String {
        let args = arg_list(&self.filter_args());
        format!(
            "    /// Fetches past `{key}` logs. Each list filters one indexed field; an empty list matches anything.\n    \
             async fn {filter}(&self, opts: &FilterOpts{args}) -> Result<LogIterator<{ty}>, BindError>;\n    \
             /// Forwards new `{key}` logs into `sink`.\n    \
             async fn {watch}(&self, opts: &WatchOpts, sink: EventSink<{ty}>{args}) -> Result<Subscription, BindError>;\n    \
             /// Decodes a raw log as `{key}`.\n    \
             fn {parse}(&self, log: &RawLog) -> Result<{ty}, BindError>;\n",
            key = self.key,
            filter = self.filter_ident,
            watch = self.watch_ident,
            parse = self.parse_ident,
            ty = self.struct_name,
            args = args,
        )
    }

    pub fn render_impls(&self) -> String {
        let args = arg_list(&self.filter_args());
        let topics = self.topics();
        format!(
            "    async fn {filter}(&self, opts: &FilterOpts{args}) -> Result<LogIterator<{ty}>, BindError> {{\n\
             {topics}        self.contract.filter::<{ty}>(opts, topics).await\n    }}\n\n    \
             async fn {watch}(&self, opts: &WatchOpts, sink: EventSink<{ty}>{args}) -> Result<Subscription, BindError> {{\n\
             {topics}        self.contract.watch::<{ty}>(opts, topics, sink).await\n    }}\n\n    \
             fn {parse}(&self, log: &RawLog) -> Result<{ty}, BindError> {{\n        self.contract.parse_log::<{ty}>(log)\n    }}\n",
            filter = self.filter_ident,
            watch = self.watch_ident,
            parse = self.parse_ident,
            ty = self.struct_name,
            args = args,
            topics = topics,
        )
    }
}

/// A generated tuple struct and its `AbiValue` impl.
pub fn render_tuple_struct(def: &StructDef) -> String {
    let mut out = format!(
        "/// Solidity tuple `{}`.\n#[derive(Debug, Clone, PartialEq, Eq)]\npub struct {} {{\n",
        def.canonical, def.name
    );
    for field in &def.fields {
        out.push_str(&format!("    pub {}: {},\n", field.ident, field.ty));
    }
    out.push_str("}\n\n");

    let into_items: Vec<String> = def
        .fields
        .iter()
        .map(|f| format!("self.{}.into_dyn()", f.ident))
        .collect();
    out.push_str(&format!(
        "impl AbiValue for {name} {{\n    fn into_dyn(self) -> DynSolValue {{\n        DynSolValue::Tuple(vec![{items}])\n    }}\n\n    \
         fn from_dyn(value: DynSolValue) -> Result<Self, BindError> {{\n        let mut fields = Fields::from_tuple(value, \"{name}\", {len})?;\n        Ok({literal})\n    }}\n}}\n",
        name = def.name,
        items = into_items.join(", "),
        len = def.fields.len(),
        literal = struct_literal("Self", &def.fields, "fields", "        ", ""),
    ));
    out
}

/// A plain struct collecting several outputs of one method.
pub fn render_output_struct(def: &StructDef) -> String {
    let mut out = format!(
        "/// Outputs of `{}`.\n#[derive(Debug, Clone, PartialEq, Eq)]\npub struct {} {{\n",
        def.canonical, def.name
    );
    for field in &def.fields {
        out.push_str(&format!("    pub {}: {},\n", field.ident, field.ty));
    }
    out.push_str("}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIXED_ABI: &str = r#"[
        {"type":"function","name":"total","inputs":[],"outputs":[{"name":"","type":"uint256"}],"stateMutability":"pure"},
        {"type":"function","name":"owner","inputs":[],"outputs":[{"name":"","type":"address"}],"stateMutability":"view"},
        {"type":"function","name":"setOwner","inputs":[{"name":"owner","type":"address"}],"outputs":[],"stateMutability":"nonpayable"},
        {"type":"function","name":"deposit","inputs":[],"outputs":[],"stateMutability":"payable"},
        {"type":"function","name":"reserves","inputs":[],"outputs":[{"name":"base","type":"uint112"},{"name":"quote","type":"uint112"},{"name":"","type":"uint32"}],"stateMutability":"view"},
        {"type":"event","name":"Named","inputs":[{"name":"label","type":"string","indexed":true},{"name":"who","type":"address","indexed":true},{"name":"raw","type":"bytes","indexed":false}]}
    ]"#;

    fn emit_mixed() -> Emitted {
        let abi = Abi::parse(MIXED_ABI).unwrap();
        emit("Vault", &abi, &mut TypeMapper::default(), &mut Namespace::default()).unwrap()
    }

    #[test]
    fn test_dispatch_table() {
        assert_eq!(MethodKind::of(StateMutability::Pure), MethodKind::Call);
        assert_eq!(MethodKind::of(StateMutability::View), MethodKind::Call);
        assert_eq!(MethodKind::of(StateMutability::NonPayable), MethodKind::Transact);
        assert_eq!(MethodKind::of(StateMutability::Payable), MethodKind::Transact);

        let emitted = emit_mixed();
        let calls: Vec<&str> = emitted.calls().map(|m| m.ident.as_str()).collect();
        let transacts: Vec<&str> = emitted.transacts().map(|m| m.ident.as_str()).collect();
        assert_eq!(calls, vec!["total", "owner", "reserves"]);
        assert_eq!(transacts, vec!["set_owner", "deposit"]);

        for method in &emitted.methods {
            let rendered = method.render_impl();
            match method.kind {
                MethodKind::Call => {
                    assert!(rendered.contains("opts: &CallOpts"));
                    assert!(rendered.contains("self.contract.call("));
                }
                MethodKind::Transact => {
                    assert!(rendered.contains("opts: &TransactOpts"));
                    assert!(rendered.contains("self.contract.transact("));
                    assert!(rendered.contains("Result<PendingTx, BindError>"));
                }
            }
        }
    }

    #[test]
    fn test_return_shapes() {
        let emitted = emit_mixed();
        let by_ident = |ident: &str| emitted.methods.iter().find(|m| m.ident == ident).unwrap();

        assert_eq!(by_ident("total").return_type(), "U256");
        assert_eq!(by_ident("set_owner").return_type(), "PendingTx");
        let reserves = by_ident("reserves");
        assert_eq!(reserves.return_type(), "ReservesOutput");
        match &reserves.returns {
            Returns::Struct(def) => {
                let fields: Vec<(&str, &str)> =
                    def.fields.iter().map(|f| (f.ident.as_str(), f.ty.as_str())).collect();
                assert_eq!(fields, vec![("base", "U256"), ("quote", "U256"), ("field2", "u32")]);
            }
            other => panic!("unexpected returns: {other:?}"),
        }
        assert!(reserves.render_impl().contains("base: fields.next()?,"));
    }

    #[test]
    fn test_event_fields_and_wrappers() {
        let emitted = emit_mixed();
        let event = &emitted.events[0];
        assert_eq!(event.struct_name, "VaultNamed");
        assert_eq!(event.filter_ident, "filter_named");

        let fields: Vec<(&str, &str)> = event.fields.iter().map(|f| (f.ident.as_str(), f.ty.as_str())).collect();
        assert_eq!(fields, vec![("label", "B256"), ("who", "Address"), ("raw0", "Bytes")]);
        assert_eq!(event.fields[0].filter_ty.as_deref(), Some("String"));

        let decls = event.render_decls();
        assert!(decls.contains("label: Vec<String>, who: Vec<Address>"));
        assert!(event.render_struct("Vault").contains("const EVENT: &'static str = \"Named\";"));
        assert!(event.render_impls().contains("self.contract.watch::<VaultNamed>(opts, topics, sink)"));
    }

    #[test]
    fn test_event_without_fields() {
        let abi = Abi::parse(r#"[{"type":"event","name":"Paused","inputs":[],"anonymous":false}]"#).unwrap();
        let emitted = emit("Vault", &abi, &mut TypeMapper::default(), &mut Namespace::default()).unwrap();
        let event = &emitted.events[0];
        assert!(event.fields.is_empty());

        let rendered = event.render_struct("Vault");
        assert!(rendered.contains("pub struct VaultPaused {\n    pub raw: RawLog,\n}"));
        assert!(rendered.contains("fn from_log(_values: Vec<DynSolValue>, raw: RawLog)"));
        assert!(rendered.contains("Ok(Self { raw })"));
        assert!(!rendered.contains("let mut fields"));

        let impls = event.render_impls();
        assert!(impls.contains("async fn filter_paused(&self, opts: &FilterOpts) ->"));
        assert!(impls.contains("let topics = Vec::new();"));
    }

    #[test]
    fn test_session_forwards_preset_options() {
        let emitted = emit_mixed();
        let set_owner = emitted.methods.iter().find(|m| m.ident == "set_owner").unwrap();
        let rendered = set_owner.render_session();
        assert!(rendered.contains("pub async fn set_owner(&self, owner: Address)"));
        assert!(rendered.contains("self.contract.set_owner(&self.transact_opts, owner)"));
    }
}
