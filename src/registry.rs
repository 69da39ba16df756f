//! The type registry: every declared type, looked up by name or [`TypeId`].
//!
//! A registry starts with the built-in simple types (`String`, `Number`,
//! `Boolean`, `Array`, `Object`, `Int`, `Uint` and the fixed-width integer
//! names). Callers add enums and structs with [`Registry::declare`], then
//! validate through the [`TypeHandle`] returned by [`Registry::get`].
//!
//! Declaring needs `&mut self`; everything else is read-only, so a finished
//! registry can be shared across threads.
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::compact::{PropSpec, SpecCache};
use crate::declare::{Declaration, EnumDecl, FieldOptions, FieldSpec, SimpleDecl, StructDecl, TypeSpec};
use crate::error::{ErrorKind, MessageOverrides, MessageTemplates, SchemaError, ValidationError};
use crate::rules::{Rule, RuleSet};
use crate::types::simple::builtins;
use crate::types::structs::overlay;
use crate::types::{
    Binding, DataType, EnumType, FieldDescriptor, SimpleType, StructType, TypeBody, TypeDef, TypeId,
};

/// `Name` or `Name<Sub>`.
static TYPE_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\w+)(?:<(\w+)>)?$").unwrap());

/// Settings a registry is built with; every key is optional in JSON.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub strict: bool,
    pub messages: MessageOverrides,
}

// ————————————————————————————————————————————————————————————————————————————
// REGISTRY
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone)]
pub struct Registry {
    defs: Vec<TypeDef>,
    names: IndexMap<String, TypeId>,
    strict: bool,
    messages: MessageTemplates,
    rules: RuleSet,
    specs: SpecCache,
    array: TypeId,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        let mut messages = MessageTemplates::default();
        messages.merge(config.messages);
        let mut registry = Self {
            defs: Vec::new(),
            names: IndexMap::new(),
            strict: config.strict,
            messages,
            rules: RuleSet::default(),
            specs: SpecCache::new(),
            array: TypeId(0),
        };
        for decl in builtins() {
            let name = decl.name.clone().unwrap_or_default();
            if let Some(simple) = decl.into_simple() {
                registry.install(TypeDef { name, strict: None, body: TypeBody::Simple(simple) });
            }
        }
        if let Some(array) = registry.names.get("Array") {
            registry.array = *array;
        }
        registry
    }

    pub fn strict(&self) -> bool {
        self.strict
    }

    pub fn set_strict(&mut self, strict: bool) {
        self.strict = strict;
    }

    pub fn messages(&self) -> &MessageTemplates {
        &self.messages
    }

    /// Replaces the given message templates for every error built afterwards.
    pub fn set_messages(&mut self, overrides: MessageOverrides) {
        self.messages.merge(overrides);
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn register_rule(&mut self, name: impl Into<String>, rule: impl Rule + 'static) {
        self.rules.insert(name, rule);
    }

    /// Parses a compact field spec through this registry's cache.
    pub fn parse_spec(&mut self, spec: &str) -> Result<PropSpec, SchemaError> {
        self.specs.parse(spec)
    }

    // ———————————————————————————————— lookup ———————————————————————————————— //

    pub fn get(&self, name: &str) -> Option<TypeHandle<'_>> {
        self.names.get(name).map(|id| TypeHandle { registry: self, id: *id })
    }

    /// `None` for an id this registry never handed out.
    pub fn handle(&self, id: TypeId) -> Option<TypeHandle<'_>> {
        (id.0 < self.defs.len()).then_some(TypeHandle { registry: self, id })
    }

    pub fn id(&self, name: &str) -> Option<TypeId> {
        self.names.get(name).copied()
    }

    /// Named types in registration order.
    pub fn types(&self) -> impl Iterator<Item = TypeHandle<'_>> {
        self.names.values().map(|id| TypeHandle { registry: self, id: *id })
    }

    pub(crate) fn def(&self, id: TypeId) -> &TypeDef {
        &self.defs[id.0]
    }

    pub(crate) fn is_strict(&self, id: TypeId) -> bool {
        self.def(id).strict.unwrap_or(self.strict)
    }

    pub(crate) fn binding_id(&self, binding: &Binding) -> Option<TypeId> {
        match binding {
            Binding::Resolved(id) => Some(*id),
            Binding::Pending(name) => self.id(name),
        }
    }

    pub(crate) fn resolve(&self, binding: &Binding) -> Result<TypeId, ValidationError> {
        self.binding_id(binding).ok_or_else(|| {
            let ty = match binding {
                Binding::Pending(name) => name.clone(),
                Binding::Resolved(id) => id.0.to_string(),
            };
            self.error(ErrorKind::UnresolvedType { ty })
        })
    }

    pub(crate) fn error(&self, kind: ErrorKind) -> ValidationError {
        ValidationError::new(kind, &self.messages)
    }

    // ——————————————————————————————— declaring —————————————————————————————— //

    /// Declares one type. Named types are registered under their name; a
    /// later declaration with the same name replaces the earlier one.
    pub fn declare(&mut self, decl: impl Into<Declaration>) -> Result<TypeId, SchemaError> {
        match decl.into() {
            Declaration::Simple(d) => self.declare_simple(d),
            Declaration::Enum(d) => self.declare_enum(d),
            Declaration::Struct(d) => self.declare_struct(d),
        }
    }

    /// Declares in order; stops at the first failure.
    pub fn declare_all<I>(&mut self, decls: I) -> Result<Vec<TypeId>, SchemaError>
    where
        I: IntoIterator,
        I::Item: Into<Declaration>,
    {
        decls.into_iter().map(|d| self.declare(d)).collect()
    }

    /// Declares a JSON descriptor, or each element of a JSON array of them.
    pub fn declare_json(&mut self, value: Value) -> Result<Vec<TypeId>, SchemaError> {
        match value {
            Value::Array(xs) => xs
                .into_iter()
                .map(|x| Declaration::from_value(x).and_then(|d| self.declare(d)))
                .collect(),
            other => Ok(vec![self.declare(Declaration::from_value(other)?)?]),
        }
    }

    fn install(&mut self, def: TypeDef) -> TypeId {
        let id = TypeId(self.defs.len());
        let name = def.name.clone();
        debug!(name = %name, kind = ?def.data_type(), "declared type");
        self.defs.push(def);
        if !name.is_empty() {
            self.bind_name(name, id);
        }
        id
    }

    fn bind_name(&mut self, name: String, id: TypeId) -> Option<TypeId> {
        let previous = self.names.insert(name.clone(), id);
        if previous.is_some() {
            debug!(name = %name, "type name re-declared, last declaration wins");
        }
        previous
    }

    fn declare_simple(&mut self, decl: SimpleDecl) -> Result<TypeId, SchemaError> {
        let name = decl.name.clone().unwrap_or_default();
        let simple = match &decl.base {
            Some(base) => {
                let base_id = self.id(base).ok_or_else(|| SchemaError::UnknownType { name: base.clone() })?;
                let TypeBody::Simple(inherited) = &self.def(base_id).body else {
                    return Err(SchemaError::invalid(format!("'{name}' can only derive from a simple type, '{base}' is not one")));
                };
                SimpleType {
                    check: decl.check.clone().unwrap_or_else(|| inherited.check.clone()),
                    convert: decl.convert.clone().or_else(|| inherited.convert.clone()),
                    default: decl.default.clone().unwrap_or_else(|| inherited.default.clone()),
                }
            }
            None => decl
                .clone()
                .into_simple()
                .ok_or_else(|| SchemaError::invalid(format!("simple type '{name}' needs a check or a base type")))?,
        };
        Ok(self.install(TypeDef { name, strict: decl.strict, body: TypeBody::Simple(simple) }))
    }

    fn declare_enum(&mut self, decl: EnumDecl) -> Result<TypeId, SchemaError> {
        let name = decl.name.unwrap_or_default();
        let body = EnumType::new(&name, decl.enums, decl.default)?;
        Ok(self.install(TypeDef { name, strict: decl.strict, body: TypeBody::Enum(body) }))
    }

    fn declare_struct(&mut self, decl: StructDecl) -> Result<TypeId, SchemaError> {
        let name = decl.name.unwrap_or_default();
        // registered before its fields so they can refer back to it
        let id = TypeId(self.defs.len());
        self.defs.push(TypeDef {
            name: name.clone(),
            strict: decl.strict,
            body: TypeBody::Struct(StructType::default()),
        });
        let previous = if name.is_empty() { None } else { self.bind_name(name.clone(), id) };

        let built = self.build_struct(decl.props, decl.refs);
        match built {
            Ok(body) => {
                debug!(name = %name, fields = body.fields.len(), "declared struct");
                self.defs[id.0].body = TypeBody::Struct(body);
                Ok(id)
            }
            Err(err) => {
                if !name.is_empty() {
                    match previous {
                        Some(prev) => {
                            self.names.insert(name, prev);
                        }
                        None => {
                            self.names.shift_remove(&name);
                        }
                    }
                }
                Err(err)
            }
        }
    }

    fn build_struct(
        &mut self,
        props: IndexMap<String, FieldSpec>,
        ref_specs: IndexMap<String, TypeSpec>,
    ) -> Result<StructType, SchemaError> {
        let mut refs = IndexMap::new();
        for (alias, spec) in ref_specs {
            let id = match spec {
                TypeSpec::Id(id) => self.checked_id(id)?,
                TypeSpec::Inline(decl) => self.declare(*decl)?,
                TypeSpec::Name(name) => self
                    .lookup(&name, &refs)
                    .ok_or(SchemaError::UnknownType { name })?,
            };
            refs.insert(alias, id);
        }
        let fields = props
            .into_iter()
            .map(|(key, spec)| self.build_field(key, spec, &refs))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(StructType { fields, refs })
    }

    fn build_field(
        &mut self,
        key: String,
        spec: FieldSpec,
        refs: &IndexMap<String, TypeId>,
    ) -> Result<FieldDescriptor, SchemaError> {
        let mut opts = match spec {
            FieldSpec::Type(id) => FieldOptions::new(id),
            FieldSpec::Compact(text) => FieldOptions::from_prop_spec(self.specs.parse(&text)?),
            FieldSpec::Options(opts) => opts,
        };
        // a `type` string in an options object may itself carry flags and rules
        let embedded = match &opts.ty {
            Some(TypeSpec::Name(text)) if text.contains('|') => Some(text.clone()),
            _ => None,
        };
        if let Some(text) = embedded {
            let parsed = FieldOptions::from_prop_spec(self.specs.parse(&text)?);
            opts = opts.or(parsed);
        }
        let required = opts.is_required();
        let ty = opts.ty.ok_or_else(|| SchemaError::invalid(format!("field '{key}' has no type")))?;

        let (ty_name, binding, sub_type, sub_binding) = match ty {
            TypeSpec::Id(id) => {
                let id = self.checked_id(id)?;
                (self.def(id).name.clone(), Binding::Resolved(id), None, None)
            }
            TypeSpec::Inline(decl) => {
                let id = self.declare(*decl)?;
                (self.def(id).name.clone(), Binding::Resolved(id), None, None)
            }
            TypeSpec::Name(text) => {
                let caps = TYPE_NAME.captures(&text).ok_or_else(|| SchemaError::MalformedSpec {
                    spec: text.clone(),
                    reason: "expected `Name` or `Name<Sub>`",
                })?;
                let outer = caps[1].to_string();
                let binding = self.bind(&outer, refs);
                match caps.get(2) {
                    None => (outer, binding, None, None),
                    Some(sub) => {
                        if binding != Binding::Resolved(self.array) {
                            return Err(SchemaError::SubTypeOnNonArray { field: key, ty: outer });
                        }
                        let sub = sub.as_str().to_string();
                        let sub_binding = self.bind(&sub, refs);
                        (outer, binding, Some(sub), Some(sub_binding))
                    }
                }
            }
        };

        Ok(FieldDescriptor {
            key,
            ty: ty_name,
            sub_type,
            binding,
            sub_binding,
            required,
            nullable: opts.nullable.unwrap_or(false),
            checks: opts.checks,
            comment: opts.comment,
            message: opts.message,
            eql: opts.eql,
            space: opts.space.unwrap_or(false),
            empty: opts.empty.unwrap_or(false),
        })
    }

    fn checked_id(&self, id: TypeId) -> Result<TypeId, SchemaError> {
        if id.0 < self.defs.len() {
            Ok(id)
        } else {
            Err(SchemaError::UnknownType { name: format!("#{}", id.0) })
        }
    }

    /// Struct-local refs shadow registry names.
    fn lookup(&self, name: &str, refs: &IndexMap<String, TypeId>) -> Option<TypeId> {
        refs.get(name).copied().or_else(|| self.id(name))
    }

    fn bind(&self, name: &str, refs: &IndexMap<String, TypeId>) -> Binding {
        match self.lookup(name, refs) {
            Some(id) => Binding::Resolved(id),
            None => {
                debug!(name = %name, "forward reference, resolved on use");
                Binding::Pending(name.to_string())
            }
        }
    }

    // ——————————————————————————————— dispatch ——————————————————————————————— //

    pub(crate) fn create_value(&self, id: TypeId, given: Option<&Value>) -> Value {
        self.create_in(id, given, &mut Vec::new())
    }

    /// `active` is the chain of structs currently being created.
    pub(crate) fn create_in(&self, id: TypeId, given: Option<&Value>, active: &mut Vec<TypeId>) -> Value {
        match &self.def(id).body {
            TypeBody::Simple(s) => s.create(given),
            TypeBody::Enum(e) => e.create(given, self.is_strict(id)),
            TypeBody::Struct(s) => {
                active.push(id);
                let out = s.create(self, given, active);
                active.pop();
                out
            }
        }
    }

    pub(crate) fn check_value(&self, id: TypeId, value: &Value) -> bool {
        match &self.def(id).body {
            TypeBody::Simple(s) => s.check(value),
            TypeBody::Enum(e) => e.check(value, self.is_strict(id)),
            TypeBody::Struct(_) => self.extract_as(id, value, false).is_ok(),
        }
    }

    pub(crate) fn parse_value(&self, id: TypeId, value: &Value) -> Option<Value> {
        match &self.def(id).body {
            TypeBody::Simple(s) => Some(s.parse(value)),
            TypeBody::Enum(e) => e.parse(value),
            TypeBody::Struct(_) => self.extract_as(id, value, false).ok(),
        }
    }

    /// Validates `value` as type `id`. Structs recurse with their own
    /// strictness; other types coerce first when `convert` is set.
    pub(crate) fn extract_as(&self, id: TypeId, value: &Value, convert: bool) -> Result<Value, ValidationError> {
        let def = self.def(id);
        let coerced = match &def.body {
            TypeBody::Struct(s) => {
                return s.extract(self, &def.name, self.is_strict(id), value).map(Value::Object);
            }
            TypeBody::Simple(s) if convert => s.parse(value),
            TypeBody::Enum(e) if convert => e.parse(value).unwrap_or_else(|| value.clone()),
            _ => value.clone(),
        };
        if self.check_value(id, &coerced) {
            Ok(coerced)
        } else {
            Err(self.error(ErrorKind::TypeMismatch { ty: def.name.clone(), value: coerced }))
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// HANDLES
// ————————————————————————————————————————————————————————————————————————————

/// A declared type together with the registry it resolves names in.
#[derive(Debug, Clone, Copy)]
pub struct TypeHandle<'r> {
    registry: &'r Registry,
    id: TypeId,
}

impl<'r> TypeHandle<'r> {
    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'r str {
        &self.registry.def(self.id).name
    }

    pub fn data_type(&self) -> DataType {
        self.registry.def(self.id).data_type()
    }

    /// Local override, else the registry's flag.
    pub fn is_strict(&self) -> bool {
        self.registry.is_strict(self.id)
    }

    /// Default instance, or an instance built from `given`.
    pub fn create(&self, given: Option<&Value>) -> Value {
        self.registry.create_value(self.id, given)
    }

    pub fn check(&self, value: &Value) -> bool {
        self.registry.check_value(self.id, value)
    }

    /// Coerced value, or `None` when the type can't make sense of it.
    pub fn parse(&self, value: &Value) -> Option<Value> {
        self.registry.parse_value(self.id, value)
    }

    /// Validates and returns a fresh value holding only declared fields.
    pub fn extract(&self, value: &Value) -> Result<Value, ValidationError> {
        self.registry.extract_as(self.id, value, !self.is_strict())
    }

    /// Same as [`extract`](Self::extract).
    pub fn validate(&self, value: &Value) -> Result<Value, ValidationError> {
        self.extract(value)
    }

    /// Validates `value` and writes the coerced fields back into it. Keys the
    /// type doesn't declare are left alone.
    pub fn check_in_place(&self, value: &mut Value) -> Result<(), ValidationError> {
        let extracted = self.extract(value)?;
        overlay(value, extracted);
        Ok(())
    }

    pub async fn extract_then(&self, value: &Value) -> Result<Value, ValidationError> {
        self.extract(value)
    }

    pub async fn check_then(&self, mut value: Value) -> Result<Value, ValidationError> {
        self.check_in_place(&mut value)?;
        Ok(value)
    }

    pub fn as_enum(&self) -> Option<EnumHandle<'r>> {
        match &self.registry.def(self.id).body {
            TypeBody::Enum(body) => Some(EnumHandle { body, strict: self.is_strict() }),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&'r StructType> {
        match &self.registry.def(self.id).body {
            TypeBody::Struct(body) => Some(body),
            _ => None,
        }
    }
}

/// Enum lookups with the type's effective strictness applied.
#[derive(Debug, Clone, Copy)]
pub struct EnumHandle<'r> {
    body: &'r EnumType,
    strict: bool,
}

impl<'r> EnumHandle<'r> {
    pub fn has_key(&self, key: &Value) -> bool {
        self.body.has_key(key, self.strict)
    }

    pub fn has_value(&self, value: &Value) -> bool {
        self.body.has_value(value, self.strict)
    }

    pub fn value(&self, key: &Value) -> Option<Value> {
        self.body.value(key, self.strict)
    }

    pub fn key(&self, value: &Value) -> Option<String> {
        self.body.key(value, self.strict)
    }

    pub fn keys(&self) -> Vec<&'r str> {
        self.body.keys()
    }

    pub fn values(&self) -> Vec<Value> {
        self.body.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PathSegment;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn registry() -> Registry {
        let mut reg = Registry::new();
        reg.declare_json(json!([
            {"name": "Sex", "enums": {"male": 1, "female": 2}},
            {"name": "Item", "props": {"name": "String|len,1,20", "qty": "Int|min,1"}},
            {"name": "Order", "props": {
                "id": "String",
                "sex": "Sex|@optional",
                "items": "Array<Item>",
            }},
        ]))
        .unwrap();
        reg
    }

    #[test]
    fn builtins_are_declared() {
        let reg = Registry::new();
        for name in ["String", "Number", "Boolean", "Array", "Object", "Int", "Uint", "UInt8"] {
            let ty = reg.get(name).unwrap();
            assert_eq!(ty.data_type(), DataType::Simple, "{name}");
        }
        assert!(reg.get("Missing").is_none());
    }

    #[test]
    fn nested_failure_carries_full_path() {
        let reg = registry();
        let order = reg.get("Order").unwrap();
        let err = order
            .extract(&json!({"id": "o1", "items": [{"name": "a", "qty": 1}, {"name": "", "qty": 2}]}))
            .unwrap_err();
        assert_eq!(err.path.as_deref(), Some("items.1.name"));
        assert_eq!(
            err.keys,
            vec![PathSegment::Key("items".into()), PathSegment::Index(1), PathSegment::Key("name".into())]
        );
        assert!(matches!(err.kind, ErrorKind::EmptyFieldRejected { .. }));
    }

    #[test]
    fn extract_drops_undeclared_keys_and_coerces() {
        let reg = registry();
        let out = reg
            .get("Order")
            .unwrap()
            .extract(&json!({"id": " o1 ", "extra": 1, "sex": "2", "items": [{"name": "a", "qty": "3"}]}))
            .unwrap();
        assert_eq!(out, json!({"id": "o1", "sex": 2, "items": [{"name": "a", "qty": 3}]}));
    }

    #[test]
    fn strict_registry_refuses_coercion() {
        let mut reg = registry();
        reg.set_strict(true);
        let err = reg
            .get("Order")
            .unwrap()
            .extract(&json!({"id": "o1", "items": [{"name": "a", "qty": "3"}]}))
            .unwrap_err();
        assert_eq!(err.path.as_deref(), Some("items.0.qty"));
        assert!(matches!(err.kind, ErrorKind::TypeMismatch { ref ty, .. } if ty == "Int"));
    }

    #[test]
    fn forward_and_self_references_resolve_on_use() {
        let mut reg = Registry::new();
        reg.declare_json(json!({"name": "Node", "props": {
            "label": "String",
            "next": "Node|@optional",
            "tag": "Tag|@optional",
        }}))
        .unwrap();
        let node = reg.get("Node").unwrap();
        let input = json!({"label": "a", "next": {"label": "b"}});
        assert_eq!(node.extract(&input).unwrap(), input);

        let err = node.extract(&json!({"label": "a", "tag": "x"})).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::UnresolvedType { ref ty } if ty == "Tag"));

        reg.declare_json(json!({"name": "Tag", "type": "String"})).unwrap();
        let node = reg.get("Node").unwrap();
        assert!(node.extract(&json!({"label": "a", "tag": "x"})).is_ok());
    }

    #[test]
    fn sub_type_needs_array() {
        let mut reg = Registry::new();
        let err = reg.declare_json(json!({"name": "Bad", "props": {"x": "String<Int>"}})).unwrap_err();
        assert!(matches!(err, SchemaError::SubTypeOnNonArray { .. }));
        assert!(reg.get("Bad").is_none());
    }

    #[test]
    fn failed_redeclaration_keeps_previous_binding() {
        let mut reg = registry();
        let before = reg.id("Item");
        assert!(reg.declare_json(json!({"name": "Item", "props": {"x": "Number<Int>"}})).is_err());
        assert_eq!(reg.id("Item"), before);
    }

    #[test]
    fn simple_alias_inherits_check_and_default() {
        let mut reg = Registry::new();
        reg.declare(SimpleDecl::alias("Age", "Number").with_default(json!(18))).unwrap();
        let age = reg.get("Age").unwrap();
        assert_eq!(age.create(None), json!(18));
        assert!(age.check(&json!(3)));
        assert!(!age.check(&json!("3")));
        assert_eq!(age.parse(&json!("3")), Some(json!(3)));

        let err = reg.declare(SimpleDecl::alias("X", "Nope")).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownType { .. }));
    }

    #[test]
    fn local_refs_shadow_globals() {
        let mut reg = Registry::new();
        reg.declare_json(json!({
            "name": "Person",
            "refs": {"Addr": {"props": {"city": "String"}}},
            "props": {"home": "Addr"},
        }))
        .unwrap();
        assert!(reg.get("Addr").is_none());
        let person = reg.get("Person").unwrap();
        let refs: Vec<_> = person.as_struct().unwrap().refs().map(|(k, _)| k).collect();
        assert_eq!(refs, vec!["Addr"]);
        assert!(person.extract(&json!({"home": {"city": "x"}})).is_ok());
        assert!(person.extract(&json!({"home": "x"})).is_err());
    }

    #[test]
    fn handle_rejects_foreign_ids() {
        let reg = registry();
        let order = reg.id("Order").unwrap();
        assert_eq!(reg.handle(order).map(|h| h.name()), Some("Order"));
        assert!(reg.handle(TypeId(reg.defs.len())).is_none());
    }

    #[test]
    fn self_referencing_create_terminates() {
        let mut reg = Registry::new();
        reg.declare_json(json!({"name": "Tree", "props": {
            "label": "String",
            "parent": "Tree",
            "child": "Tree|@optional",
            "children": "Array<Tree>",
        }}))
        .unwrap();
        let tree = reg.get("Tree").unwrap();
        assert_eq!(tree.create(None), json!({"label": "", "parent": null, "children": []}));
    }

    #[test]
    fn struct_create_fills_defaults() {
        let reg = registry();
        let order = reg.get("Order").unwrap();
        assert_eq!(order.create(None), json!({"id": "", "sex": 1, "items": []}));
        assert_eq!(order.create(Some(&json!({"id": 7}))), json!({"id": "7", "sex": 1, "items": []}));
    }

    #[test]
    fn enum_handle_applies_strictness() {
        let mut reg = registry();
        let sex = reg.get("Sex").unwrap().as_enum().unwrap();
        assert!(sex.has_value(&json!("1")));
        assert_eq!(sex.key(&json!("2")).as_deref(), Some("female"));

        reg.set_strict(true);
        let sex = reg.get("Sex").unwrap().as_enum().unwrap();
        assert!(!sex.has_value(&json!("1")));
        assert_eq!(sex.value(&json!("male")), Some(json!(1)));
        assert_eq!(sex.keys(), vec!["male", "female"]);
    }

    #[test]
    fn check_in_place_keeps_unknown_keys() {
        let reg = registry();
        let mut doc = json!({"id": " o1 ", "note": "kept", "items": []});
        reg.get("Order").unwrap().check_in_place(&mut doc).unwrap();
        assert_eq!(doc, json!({"id": "o1", "note": "kept", "items": []}));
    }

    #[test]
    fn custom_rules_and_messages() {
        let mut reg = Registry::with_config(RegistryConfig {
            strict: false,
            messages: MessageOverrides { check: Some("{field} is odd".into()), ..Default::default() },
        });
        reg.register_rule("even", |v: &Value, _: &[Value]| -> Result<bool, ErrorKind> {
            Ok(v.as_f64().is_some_and(|f| f % 2.0 == 0.0))
        });
        reg.declare_json(json!({"name": "N", "props": {"n": "Number|even"}})).unwrap();
        let err = reg.get("N").unwrap().extract(&json!({"n": 3})).unwrap_err();
        assert_eq!(err.to_string(), "n is odd");
    }
}
