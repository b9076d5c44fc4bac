//! ABI type to Rust type mapping for generated bindings.

use convert_case::{Case, Casing};
use std::collections::HashSet;

use crate::abi::{AbiType, Param};
use crate::error::{BindError, Result};

const KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "crate", "do", "dyn",
    "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in", "let", "loop", "macro",
    "match", "mod", "move", "mut", "override", "priv", "pub", "ref", "return", "self", "Self", "static",
    "struct", "super", "trait", "true", "try", "type", "typeof", "unsafe", "unsized", "use", "virtual",
    "where", "while", "yield",
];

/// Make `ident` a legal Rust identifier.
pub fn sanitize(ident: &str) -> String {
    let mut out: String = ident
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    if KEYWORDS.contains(&out.as_str()) {
        out.push('_');
    }
    out
}

pub fn snake_ident(name: &str) -> String {
    sanitize(&name.to_case(Case::Snake))
}

pub fn pascal_ident(name: &str) -> String {
    sanitize(&name.to_case(Case::Pascal))
}

/// Type name for a struct's `internalType`: `Lib.Name` becomes `LibName`.
pub fn struct_type_name(internal: &str) -> String {
    let joined: String = internal
        .split('.')
        .filter(|s| !s.is_empty())
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect();
    sanitize(&joined)
}

/// Hands out identifiers that are unique within one scope, suffixing clashes with
/// 0, 1, ... in request order.
#[derive(Debug, Clone, Default)]
pub struct Namespace {
    taken: HashSet<String>,
}

impl Namespace {
    pub fn with_reserved<'a>(reserved: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            taken: reserved.into_iter().map(str::to_string).collect(),
        }
    }

    pub fn claim(&mut self, base: &str) -> String {
        if self.taken.insert(base.to_string()) {
            return base.to_string();
        }
        let mut idx = 0usize;
        loop {
            let candidate = format!("{base}{idx}");
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            idx += 1;
        }
    }
}

/// Field identifiers for a parameter list: snake case, `{fallback}{i}` for unnamed
/// entries, unique within the list and disjoint from `reserved`.
pub fn param_idents(params: &[Param], fallback: &str, reserved: &[&str]) -> Vec<String> {
    let mut scope = Namespace::with_reserved(reserved.iter().copied());
    params
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let ident = snake_ident(&p.name);
            let base = if ident.trim_matches('_').is_empty() {
                format!("{fallback}{i}")
            } else {
                ident
            };
            scope.claim(&base)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructField {
    pub ident: String,
    pub ty: String,
}

/// A Rust struct generated for an ABI tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructDef {
    pub name: String,
    /// Canonical ABI tuple type, e.g. `(uint256,address[])`
    pub canonical: String,
    pub fields: Vec<StructField>,
    base: String,
}

impl StructDef {
    /// A struct that is not an ABI tuple, so it is never shared with one.
    pub fn new(name: String, canonical: String, fields: Vec<StructField>) -> Self {
        Self {
            name,
            canonical,
            fields,
            base: String::new(),
        }
    }
}

pub fn native_uint(bits: usize) -> &'static str {
    match bits {
        0..=8 => "u8",
        9..=16 => "u16",
        17..=32 => "u32",
        33..=64 => "u64",
        _ => "U256",
    }
}

pub fn native_int(bits: usize) -> &'static str {
    match bits {
        0..=8 => "i8",
        9..=16 => "i16",
        17..=32 => "i32",
        33..=64 => "i64",
        _ => "I256",
    }
}

/// Maps ABI types to Rust type expressions, collecting the structs tuples need.
#[derive(Debug, Clone, Default)]
pub struct TypeMapper {
    types: Namespace,
    structs: Vec<StructDef>,
}

impl TypeMapper {
    /// `reserved` lists type names already used by the surrounding module.
    pub fn new<'a>(reserved: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            types: Namespace::with_reserved(reserved),
            structs: Vec::new(),
        }
    }

    /// Claim a free type name for a non-tuple item such as an event struct.
    pub fn claim_type_name(&mut self, base: &str) -> String {
        self.types.claim(base)
    }

    /// Map a parameter. `hint` names the struct when a tuple has no `internalType`.
    pub fn map_param(&mut self, param: &Param, hint: &str, location: &str) -> Result<String> {
        self.map(&param.ty, param.struct_name(), hint, location)
    }

    pub fn map(&mut self, ty: &AbiType, struct_name: Option<&str>, hint: &str, location: &str) -> Result<String> {
        Ok(match ty {
            AbiType::Bool => "bool".to_string(),
            AbiType::Address => "Address".to_string(),
            AbiType::String => "String".to_string(),
            AbiType::Bytes => "Bytes".to_string(),
            AbiType::FixedBytes(size) => format!("FixedBytes<{size}>"),
            AbiType::Uint(bits) => native_uint(*bits).to_string(),
            AbiType::Int(bits) => native_int(*bits).to_string(),
            AbiType::Function | AbiType::Fixed { .. } => {
                return Err(BindError::unsupported(location, ty.canonical()))
            }
            AbiType::Array(element) => format!("Vec<{}>", self.map(element, struct_name, hint, location)?),
            AbiType::FixedArray(element, len) => {
                format!("[{}; {}]", self.map(element, struct_name, hint, location)?, len)
            }
            AbiType::Tuple(components) => {
                let base = match struct_name {
                    Some(name) => struct_type_name(name),
                    None => pascal_ident(hint),
                };
                self.register(base, components, location)?
            }
        })
    }

    fn register(&mut self, base: String, components: &[Param], location: &str) -> Result<String> {
        let canonical = AbiType::Tuple(components.to_vec()).canonical();
        if let Some(existing) = self
            .structs
            .iter()
            .find(|s| s.base == base && s.canonical == canonical)
        {
            return Ok(existing.name.clone());
        }

        let name = self.types.claim(&base);
        let idents = param_idents(components, "field", &[]);
        let mut fields = Vec::with_capacity(components.len());
        for (param, ident) in components.iter().zip(idents) {
            let ty = self.map_param(param, &format!("{name}_{ident}"), &format!("{location}.{ident}"))?;
            fields.push(StructField { ident, ty });
        }

        self.structs.push(StructDef {
            name: name.clone(),
            canonical,
            fields,
            base,
        });
        Ok(name)
    }

    /// Structs in the order they were first needed.
    pub fn structs(&self) -> &[StructDef] {
        &self.structs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tuple(components: Vec<Param>) -> AbiType {
        AbiType::Tuple(components)
    }

    fn with_internal(name: &str, ty: AbiType, internal: &str) -> Param {
        Param {
            internal_type: Some(internal.to_string()),
            ..Param::new(name, ty)
        }
    }

    #[test]
    fn test_integer_cutoff() {
        let mut mapper = TypeMapper::default();
        let cases = [
            (AbiType::Uint(8), "u8"),
            (AbiType::Uint(24), "u32"),
            (AbiType::Uint(64), "u64"),
            (AbiType::Uint(72), "U256"),
            (AbiType::Uint(256), "U256"),
            (AbiType::Int(16), "i16"),
            (AbiType::Int(64), "i64"),
            (AbiType::Int(128), "I256"),
        ];
        for (ty, expected) in cases {
            assert_eq!(mapper.map(&ty, None, "x", "test").unwrap(), expected, "{ty}");
        }
    }

    #[test]
    fn test_arrays_and_bytes() {
        let mut mapper = TypeMapper::default();
        let ty = AbiType::FixedArray(Box::new(AbiType::Array(Box::new(AbiType::FixedBytes(32)))), 3);
        assert_eq!(mapper.map(&ty, None, "x", "test").unwrap(), "[Vec<FixedBytes<32>>; 3]");
        assert_eq!(mapper.map(&AbiType::Bytes, None, "x", "test").unwrap(), "Bytes");
    }

    #[test]
    fn test_unsupported_types() {
        let mut mapper = TypeMapper::default();
        let fixed = AbiType::Fixed {
            signed: true,
            bits: 128,
            decimals: 18,
        };
        match mapper.map(&fixed, None, "x", "function `f` input #0") {
            Err(BindError::UnsupportedType { location, ty }) => {
                assert_eq!(location, "function `f` input #0");
                assert_eq!(ty, "fixed128x18");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(mapper
            .map(&AbiType::Array(Box::new(AbiType::Function)), None, "x", "test")
            .is_err());
    }

    #[test]
    fn test_struct_naming_and_reuse() {
        let mut mapper = TypeMapper::new(["Bridge"]);
        let state = tuple(vec![
            Param::new("outputRoots", AbiType::FixedArray(Box::new(AbiType::FixedBytes(32)), 2)),
            Param::new("", AbiType::Uint(64)),
            Param::new("type", AbiType::Bool),
        ]);
        let param = with_internal("state", state.clone(), "struct GlobalState");
        assert_eq!(mapper.map_param(&param, "ignored", "test").unwrap(), "GlobalState");

        let as_array = with_internal("states", AbiType::Array(Box::new(state)), "struct GlobalState[]");
        assert_eq!(mapper.map_param(&as_array, "ignored", "test").unwrap(), "Vec<GlobalState>");

        assert_eq!(mapper.structs().len(), 1);
        let idents: Vec<&str> = mapper.structs()[0].fields.iter().map(|f| f.ident.as_str()).collect();
        assert_eq!(idents, vec!["output_roots", "field1", "type_"]);
    }

    #[test]
    fn test_same_name_different_layout_gets_suffix() {
        let mut mapper = TypeMapper::default();
        let a = with_internal("a", tuple(vec![Param::new("x", AbiType::Bool)]), "struct Lib.Point");
        let b = with_internal("b", tuple(vec![Param::new("x", AbiType::Address)]), "struct Lib.Point");
        assert_eq!(mapper.map_param(&a, "a", "test").unwrap(), "LibPoint");
        assert_eq!(mapper.map_param(&b, "b", "test").unwrap(), "LibPoint0");
    }

    #[test]
    fn test_synthesised_names_and_nesting() {
        let mut mapper = TypeMapper::default();
        let inner = tuple(vec![Param::new("flag", AbiType::Bool)]);
        let outer = tuple(vec![Param::new("inner", inner), Param::new("amount", AbiType::Uint(256))]);
        assert_eq!(mapper.map(&outer, None, "submit_order", "test").unwrap(), "SubmitOrder");
        let names: Vec<&str> = mapper.structs().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["SubmitOrderInner", "SubmitOrder"]);
    }

    #[test]
    fn test_identifiers() {
        assert_eq!(snake_ident("balanceOf"), "balance_of");
        assert_eq!(snake_ident("type"), "type_");
        assert_eq!(pascal_ident("approval"), "Approval");
        assert_eq!(struct_type_name("IBridge.TimeBounds"), "IBridgeTimeBounds");

        let params = vec![
            Param::new("to", AbiType::Address),
            Param::new("To", AbiType::Address),
            Param::new("", AbiType::Bool),
        ];
        assert_eq!(param_idents(&params, "arg", &["opts"]), vec!["to", "to0", "arg2"]);
    }
}
