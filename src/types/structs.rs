//! Struct types and the recursive extraction walk.
//!
//! Per field, in declared order:
//! 1. optional + absent → omitted
//! 2. nullable + `null` → omitted
//! 3. absent → `RequiredFieldMissing`
//! 4. strings are trimmed unless `space`
//! 5. `""` is rejected unless `empty`
//! 6. `eql` compares against the sibling field
//! 7. check rules run in order
//! 8. the value is coerced/validated by the field's type, recursing into
//!    structs and `Array<T>` elements
//!
//! Failures carry the key (or array index) of every level they pass through.
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::trace;

use super::{Binding, TypeId};
use crate::coerce::same_value;
use crate::compact::Check;
use crate::error::{ErrorKind, PathSegment, ValidationError};
use crate::registry::Registry;

#[derive(Debug, Clone, Default)]
pub struct StructType {
    pub(crate) fields: Vec<FieldDescriptor>,
    /// Names visible only to this struct's own field declarations.
    pub(crate) refs: IndexMap<String, TypeId>,
}

/// Normalized metadata for one struct field.
#[derive(Debug, Clone, Serialize)]
pub struct FieldDescriptor {
    pub key: String,
    /// Type name as declared, without the `<Sub>` part.
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(rename = "subType", skip_serializing_if = "Option::is_none")]
    pub sub_type: Option<String>,
    #[serde(skip)]
    pub(crate) binding: Binding,
    #[serde(skip)]
    pub(crate) sub_binding: Option<Binding>,
    pub required: bool,
    pub nullable: bool,
    pub checks: Vec<Check>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eql: Option<String>,
    /// Keep surrounding whitespace.
    pub space: bool,
    /// Accept empty strings.
    pub empty: bool,
}

impl StructType {
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, key: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.key == key)
    }

    pub fn refs(&self) -> impl Iterator<Item = (&str, TypeId)> {
        self.refs.iter().map(|(k, id)| (k.as_str(), *id))
    }

    /// `active` holds the structs being created further up. A field that
    /// would re-enter one of them with nothing given is left out when optional
    /// and `null` otherwise.
    pub(crate) fn create(&self, reg: &Registry, given: Option<&Value>, active: &mut Vec<TypeId>) -> Value {
        let source = given.and_then(Value::as_object);
        let mut out = Map::new();
        for field in &self.fields {
            let given = source.and_then(|m| m.get(&field.key));
            let value = match reg.binding_id(&field.binding) {
                Some(id) if given.is_none() && active.contains(&id) => {
                    trace!(field = %field.key, ty = %field.ty, "recursive field not expanded");
                    if !field.required {
                        continue;
                    }
                    Value::Null
                }
                Some(id) => reg.create_in(id, given, active),
                None => {
                    tracing::warn!(field = %field.key, ty = %field.ty, "creating field of undeclared type");
                    Value::Null
                }
            };
            out.insert(field.key.clone(), value);
        }
        Value::Object(out)
    }

    /// `name`/`strict` describe the struct itself: the former for mismatch
    /// messages, the latter to gate coercion of its fields.
    pub(crate) fn extract(
        &self,
        reg: &Registry,
        name: &str,
        strict: bool,
        input: &Value,
    ) -> Result<Map<String, Value>, ValidationError> {
        let Some(obj) = input.as_object() else {
            let ty = if name.is_empty() { "Object" } else { name };
            return Err(reg.error(ErrorKind::TypeMismatch { ty: ty.to_string(), value: input.clone() }));
        };
        let mut out = Map::new();
        for field in &self.fields {
            match field.extract(reg, strict, obj) {
                Ok(Some(value)) => {
                    out.insert(field.key.clone(), value);
                }
                Ok(None) => {}
                Err(err) => {
                    trace!(field = %field.key, error = %err, "field rejected");
                    return Err(err.prepend(PathSegment::Key(field.key.clone())).seal_path());
                }
            }
        }
        Ok(out)
    }
}

impl FieldDescriptor {
    /// `Ok(None)` means the field is left out of the output.
    fn extract(
        &self,
        reg: &Registry,
        strict: bool,
        obj: &Map<String, Value>,
    ) -> Result<Option<Value>, ValidationError> {
        let present = obj.get(&self.key);
        if !self.required && present.is_none() {
            return Ok(None);
        }
        if self.nullable && matches!(present, Some(Value::Null)) {
            return Ok(None);
        }
        self.extract_present(reg, strict, obj, present)
            .map(Some)
            .map_err(|err| match &self.message {
                Some(message) => err.with_message(message),
                None => err,
            })
    }

    fn extract_present(
        &self,
        reg: &Registry,
        strict: bool,
        obj: &Map<String, Value>,
        present: Option<&Value>,
    ) -> Result<Value, ValidationError> {
        let Some(raw) = present else {
            return Err(reg.error(ErrorKind::RequiredFieldMissing { field: self.key.clone() }));
        };
        let value = self.normalize(raw);

        if !self.empty && value.as_str() == Some("") {
            return Err(reg.error(ErrorKind::EmptyFieldRejected { field: self.key.clone() }));
        }

        if let Some(other) = &self.eql {
            let sibling = obj.get(other).map(|s| self.normalize(s));
            if !sibling.is_some_and(|s| same_value(&s, &value)) {
                return Err(reg.error(ErrorKind::EqualityMismatch {
                    field: self.key.clone(),
                    other: other.clone(),
                }));
            }
        }

        let failed = reg.rules().first_failure(&value, &self.checks).map_err(|kind| reg.error(kind))?;
        if let Some(check) = failed {
            return Err(reg.error(ErrorKind::CheckedRuleFailed {
                field: self.key.clone(),
                rule: check.rule.clone(),
            }));
        }

        let id = reg.resolve(&self.binding)?;
        let value = reg.extract_as(id, &value, !strict && !reg.is_strict(id))?;
        let Some(sub) = &self.sub_binding else {
            return Ok(value);
        };

        let Value::Array(items) = value else {
            return Err(reg.error(ErrorKind::TypeMismatch { ty: self.ty.clone(), value }));
        };
        let sub_id = reg.resolve(sub)?;
        let convert = !strict && !reg.is_strict(sub_id);
        items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                reg.extract_as(sub_id, item, convert)
                    .map_err(|err| err.prepend(PathSegment::Index(i)))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }

    fn normalize(&self, raw: &Value) -> Value {
        match raw {
            Value::String(s) if !self.space => Value::String(s.trim().to_string()),
            other => other.clone(),
        }
    }
}

/// Writes `src` into `dst`, descending into objects and equal-length arrays so
/// keys that `src` doesn't mention survive.
pub(crate) fn overlay(dst: &mut Value, src: Value) {
    match (dst, src) {
        (Value::Object(d), Value::Object(s)) => {
            for (k, v) in s {
                match d.get_mut(&k) {
                    Some(slot) => overlay(slot, v),
                    None => {
                        d.insert(k, v);
                    }
                }
            }
        }
        (Value::Array(d), Value::Array(s)) if d.len() == s.len() => {
            for (slot, v) in d.iter_mut().zip(s) {
                overlay(slot, v);
            }
        }
        (dst, src) => *dst = src,
    }
}
