//! Declaration descriptors: what callers hand to
//! [`Registry::declare`](crate::Registry::declare).
//!
//! Descriptors are built in code or read from JSON. A JSON descriptor is
//! classified once, by shape:
//!
//! ```text
//! { "enums": ... }                → enum
//! { "props": ... }                → struct
//! { "type": "Number", ... }       → simple type derived from a declared one
//! ```
//!
//! Struct fields accept three forms: a type handle, a compact spec string
//! (`"String|@optional|len,1,20"`), or an options object
//! (`{"type": "Number", "eql": "age2"}`).
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::compact::{self, Check, PropSpec, truthy};
use crate::error::SchemaError;
use crate::types::{SimpleType, TypeId};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Clone)]
pub enum Declaration {
    Simple(SimpleDecl),
    Enum(EnumDecl),
    Struct(StructDecl),
}

/// A simple type: either a fresh `check` predicate, or `base` naming a
/// declared simple type whose behavior is inherited.
#[derive(Clone, Default)]
pub struct SimpleDecl {
    pub name: Option<String>,
    pub base: Option<String>,
    pub check: Option<crate::types::simple::Predicate>,
    pub convert: Option<crate::types::simple::Converter>,
    pub default: Option<Value>,
    pub strict: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct EnumDecl {
    pub name: Option<String>,
    /// `(key, value)` in declared order.
    pub enums: Vec<(String, Value)>,
    pub strict: Option<bool>,
    pub default: Option<Value>,
}

#[derive(Clone, Default)]
pub struct StructDecl {
    pub name: Option<String>,
    pub props: IndexMap<String, FieldSpec>,
    pub refs: IndexMap<String, TypeSpec>,
    pub strict: Option<bool>,
}

#[derive(Clone)]
pub enum FieldSpec {
    Type(TypeId),
    Compact(String),
    Options(FieldOptions),
}

/// What a field's `type` names.
#[derive(Clone)]
pub enum TypeSpec {
    Id(TypeId),
    /// A type name, `Array<Name>`, or a whole compact spec.
    Name(String),
    Inline(Box<Declaration>),
}

/// The options-object form of a field. Unset flags fall back to whatever the
/// `type` spec string says, then to the defaults.
#[derive(Clone, Default)]
pub struct FieldOptions {
    pub ty: Option<TypeSpec>,
    pub optional: Option<bool>,
    pub required: Option<bool>,
    pub nullable: Option<bool>,
    pub checks: Vec<Check>,
    pub message: Option<String>,
    pub eql: Option<String>,
    pub space: Option<bool>,
    pub empty: Option<bool>,
    pub comment: Option<String>,
}

// ————————————————————————————————————————————————————————————————————————————
// BUILDERS
// ————————————————————————————————————————————————————————————————————————————

impl SimpleDecl {
    pub fn new(name: impl Into<String>, check: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Self {
        Self { name: Some(name.into()), check: Some(Arc::new(check)), ..Self::default() }
    }

    /// A named copy of `base` (usually with its own default).
    pub fn alias(name: impl Into<String>, base: impl Into<String>) -> Self {
        Self { name: Some(name.into()), base: Some(base.into()), ..Self::default() }
    }

    pub fn convert(mut self, convert: impl Fn(&Value) -> Value + Send + Sync + 'static) -> Self {
        self.convert = Some(Arc::new(convert));
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = Some(strict);
        self
    }

    /// Only for decls that carry their own `check`.
    pub(crate) fn into_simple(self) -> Option<SimpleType> {
        Some(SimpleType {
            check: self.check?,
            convert: self.convert,
            default: self.default.unwrap_or(Value::Null),
        })
    }
}

impl StructDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: Some(name.into()), ..Self::default() }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn prop(mut self, key: impl Into<String>, spec: impl Into<FieldSpec>) -> Self {
        self.props.insert(key.into(), spec.into());
        self
    }

    pub fn reference(mut self, name: impl Into<String>, spec: impl Into<TypeSpec>) -> Self {
        self.refs.insert(name.into(), spec.into());
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = Some(strict);
        self
    }
}

impl FieldOptions {
    pub fn new(ty: impl Into<TypeSpec>) -> Self {
        Self { ty: Some(ty.into()), ..Self::default() }
    }

    /// Options equivalent to a parsed compact spec.
    pub fn from_prop_spec(spec: PropSpec) -> Self {
        let flag = |key: &str| spec.flag(key).map(truthy);
        Self {
            optional: flag("optional"),
            required: flag("required"),
            nullable: flag("nullable"),
            space: flag("space"),
            empty: flag("empty"),
            message: spec.flag_str("message"),
            eql: spec.flag_str("eql"),
            comment: spec.flag_str("comment"),
            checks: spec.checks.clone(),
            ty: Some(TypeSpec::Name(spec.ty)),
        }
    }

    /// Takes the type from `fallback` and fills unset options from it;
    /// checks from `fallback` run first.
    pub(crate) fn or(mut self, fallback: Self) -> Self {
        self.ty = fallback.ty;
        self.optional = self.optional.or(fallback.optional);
        self.required = self.required.or(fallback.required);
        self.nullable = self.nullable.or(fallback.nullable);
        self.space = self.space.or(fallback.space);
        self.empty = self.empty.or(fallback.empty);
        self.message = self.message.or(fallback.message);
        self.eql = self.eql.or(fallback.eql);
        self.comment = self.comment.or(fallback.comment);
        let mut checks = fallback.checks;
        checks.append(&mut self.checks);
        self.checks = checks;
        self
    }

    /// `required` wins over `optional`; fields are required by default.
    pub fn is_required(&self) -> bool {
        self.required.unwrap_or(!self.optional.unwrap_or(false))
    }
}

impl From<SimpleDecl> for Declaration {
    fn from(d: SimpleDecl) -> Self {
        Self::Simple(d)
    }
}

impl From<EnumDecl> for Declaration {
    fn from(d: EnumDecl) -> Self {
        Self::Enum(d)
    }
}

impl From<StructDecl> for Declaration {
    fn from(d: StructDecl) -> Self {
        Self::Struct(d)
    }
}

impl From<&str> for FieldSpec {
    fn from(s: &str) -> Self {
        Self::Compact(s.to_string())
    }
}

impl From<String> for FieldSpec {
    fn from(s: String) -> Self {
        Self::Compact(s)
    }
}

impl From<TypeId> for FieldSpec {
    fn from(id: TypeId) -> Self {
        Self::Type(id)
    }
}

impl From<FieldOptions> for FieldSpec {
    fn from(o: FieldOptions) -> Self {
        Self::Options(o)
    }
}

impl From<&str> for TypeSpec {
    fn from(s: &str) -> Self {
        Self::Name(s.to_string())
    }
}

impl From<TypeId> for TypeSpec {
    fn from(id: TypeId) -> Self {
        Self::Id(id)
    }
}

impl From<Declaration> for TypeSpec {
    fn from(d: Declaration) -> Self {
        Self::Inline(Box::new(d))
    }
}

impl From<EnumDecl> for TypeSpec {
    fn from(d: EnumDecl) -> Self {
        Self::Inline(Box::new(d.into()))
    }
}

impl From<StructDecl> for TypeSpec {
    fn from(d: StructDecl) -> Self {
        Self::Inline(Box::new(d.into()))
    }
}

// ————————————————————————————————————————————————————————————————————————————
// JSON CLASSIFICATION
// ————————————————————————————————————————————————————————————————————————————

impl Declaration {
    /// Classifies a JSON descriptor by shape.
    pub fn from_value(value: Value) -> Result<Self, SchemaError> {
        let Value::Object(mut map) = value else {
            return Err(SchemaError::invalid(format!("a declaration must be an object, found {value}")));
        };
        let name = take_string(&mut map, "name")?;
        let strict = take_bool(&mut map, "strict");
        if let Some(enums) = map.remove("enums") {
            return Ok(Self::Enum(EnumDecl {
                name,
                enums: enum_members(enums)?,
                strict,
                default: map.remove("default"),
            }));
        }
        if let Some(props) = map.remove("props") {
            let Value::Object(props) = props else {
                return Err(SchemaError::invalid("`props` must be an object"));
            };
            let props = props
                .into_iter()
                .map(|(k, v)| -> Result<_, SchemaError> { Ok((k, FieldSpec::from_value(v)?)) })
                .collect::<Result<IndexMap<_, _>, SchemaError>>()?;
            let refs = match map.remove("refs") {
                None | Some(Value::Null) => IndexMap::new(),
                Some(Value::Object(refs)) => refs
                    .into_iter()
                    .map(|(k, v)| -> Result<_, SchemaError> { Ok((k, TypeSpec::from_value(v)?)) })
                    .collect::<Result<IndexMap<_, _>, SchemaError>>()?,
                Some(_) => return Err(SchemaError::invalid("`refs` must be an object")),
            };
            return Ok(Self::Struct(StructDecl { name, props, refs, strict }));
        }
        let Some(base) = take_string(&mut map, "type")? else {
            return Err(SchemaError::invalid(
                "expected `enums`, `props`, or a base `type` for a simple declaration",
            ));
        };
        Ok(Self::Simple(SimpleDecl {
            name,
            base: Some(base),
            default: map.remove("default"),
            strict,
            ..SimpleDecl::default()
        }))
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Simple(d) => d.name.as_deref(),
            Self::Enum(d) => d.name.as_deref(),
            Self::Struct(d) => d.name.as_deref(),
        }
    }
}

impl FieldSpec {
    pub fn from_value(value: Value) -> Result<Self, SchemaError> {
        match value {
            Value::String(s) => Ok(Self::Compact(s)),
            Value::Object(map) => FieldOptions::from_map(map).map(Self::Options),
            other => Err(SchemaError::invalid(format!("unsupported field spec {other}"))),
        }
    }
}

impl TypeSpec {
    pub fn from_value(value: Value) -> Result<Self, SchemaError> {
        match value {
            Value::String(s) => Ok(Self::Name(s)),
            other => Declaration::from_value(other).map(|d| Self::Inline(Box::new(d))),
        }
    }
}

impl FieldOptions {
    fn from_map(mut map: Map<String, Value>) -> Result<Self, SchemaError> {
        let ty = match map.remove("type") {
            Some(Value::String(s)) => Some(TypeSpec::Name(s)),
            Some(Value::Null) | None => None,
            Some(other) => Some(TypeSpec::Inline(Box::new(Declaration::from_value(other)?))),
        };
        // `{props: {...}}` directly on a field is an anonymous struct
        let ty = match (ty, map.remove("props")) {
            (None, Some(props)) => {
                let mut inline = Map::new();
                inline.insert("props".into(), props);
                if let Some(refs) = map.remove("refs") {
                    inline.insert("refs".into(), refs);
                }
                Some(TypeSpec::Inline(Box::new(Declaration::from_value(Value::Object(inline))?)))
            }
            (ty, _) => ty,
        };
        let Some(ty) = ty else {
            return Err(SchemaError::invalid("field options need a `type` or `props`"));
        };
        let checks = match map.remove("checks") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(xs)) => xs.into_iter().map(parse_check_value).collect::<Result<_, _>>()?,
            Some(other) => return Err(SchemaError::invalid(format!("`checks` must be an array, found {other}"))),
        };
        Ok(Self {
            ty: Some(ty),
            optional: take_bool(&mut map, "optional"),
            required: take_bool(&mut map, "required"),
            nullable: take_bool(&mut map, "nullable"),
            space: take_bool(&mut map, "space"),
            empty: take_bool(&mut map, "empty"),
            message: take_string(&mut map, "message")?,
            eql: take_string(&mut map, "eql")?,
            comment: take_string(&mut map, "comment")?,
            checks,
        })
    }
}

/// `["len", 4, 10]` or the compact form `"len,4,10"`.
fn parse_check_value(value: Value) -> Result<Check, SchemaError> {
    match value {
        Value::String(s) => {
            let spec = compact::parse(&format!("_|{s}"))?;
            spec.checks
                .into_iter()
                .next()
                .ok_or_else(|| SchemaError::invalid(format!("empty check rule '{s}'")))
        }
        other => Ok(serde_json::from_value(other)?),
    }
}

fn enum_members(value: Value) -> Result<Vec<(String, Value)>, SchemaError> {
    #[derive(Deserialize)]
    struct Member {
        key: String,
        value: Value,
    }
    match value {
        Value::Array(xs) => xs
            .into_iter()
            .map(|x| -> Result<_, SchemaError> {
                let m: Member = serde_json::from_value(x)?;
                Ok((m.key, m.value))
            })
            .collect(),
        Value::Object(map) => map
            .into_iter()
            .map(|(key, v)| -> Result<_, SchemaError> {
                match v {
                    Value::Object(_) => {
                        let m: Member = serde_json::from_value(v)?;
                        Ok((m.key, m.value))
                    }
                    scalar => Ok((key, scalar)),
                }
            })
            .collect(),
        other => Err(SchemaError::invalid(format!("`enums` must be an object or array, found {other}"))),
    }
}

fn take_string(map: &mut Map<String, Value>, key: &str) -> Result<Option<String>, SchemaError> {
    match map.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(SchemaError::invalid(format!("`{key}` must be a string, found {other}"))),
    }
}

fn take_bool(map: &mut Map<String, Value>, key: &str) -> Option<bool> {
    map.remove(key).map(|v| truthy(&v))
}

impl<'de> Deserialize<'de> for Declaration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(serde::de::Error::custom)
    }
}
