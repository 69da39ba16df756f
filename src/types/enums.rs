use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use serde_json::Value;

use crate::coerce::{number_from_f64, property_key};
use crate::error::SchemaError;

/// Scalar an enum member can carry. Numbers compare by magnitude.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Primitive {
    Bool(bool),
    Num(OrderedFloat<f64>),
    Str(String),
}

impl Primitive {
    pub fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Number(n) => n.as_f64().map(|f| Self::Num(OrderedFloat(f))),
            Value::String(s) => Some(Self::Str(s.clone())),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Bool(b) => Value::Bool(*b),
            Self::Num(f) => number_from_f64(f.0).unwrap_or(Value::Null),
            Self::Str(s) => Value::String(s.clone()),
        }
    }

    fn property_key(&self) -> String {
        property_key(&self.to_value()).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumMember {
    pub key: String,
    pub value: Primitive,
}

/// Members plus two lookup indexes. The lenient indexes are keyed by
/// [`property_key`], so `"2"` finds the member whose value is `2`.
#[derive(Debug, Clone, Default)]
pub struct EnumType {
    members: Vec<EnumMember>,
    key_maps: IndexMap<String, usize>,
    value_maps: IndexMap<String, usize>,
    default: Option<Value>,
}

impl EnumType {
    pub(crate) fn new(
        name: &str,
        members: Vec<(String, Value)>,
        default: Option<Value>,
    ) -> Result<Self, SchemaError> {
        let mut out = Self { default, ..Self::default() };
        for (key, value) in members {
            let value = Primitive::from_value(&value).ok_or_else(|| {
                SchemaError::invalid(format!("enum '{name}': member '{key}' must have a scalar value, found {value}"))
            })?;
            let index = out.members.len();
            let value_key = value.property_key();
            if out.key_maps.contains_key(&key) {
                return Err(SchemaError::DuplicateEnumMember { ty: name.to_string(), member: key });
            }
            if out.value_maps.contains_key(&value_key) {
                return Err(SchemaError::DuplicateEnumMember { ty: name.to_string(), member: value_key });
            }
            out.key_maps.insert(key.clone(), index);
            out.value_maps.insert(value_key, index);
            out.members.push(EnumMember { key, value });
        }
        Ok(out)
    }

    pub fn members(&self) -> &[EnumMember] {
        &self.members
    }

    pub fn keys(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.key.as_str()).collect()
    }

    pub fn values(&self) -> Vec<Value> {
        self.members.iter().map(|m| m.value.to_value()).collect()
    }

    fn exact_key(&self, key: &Value) -> Option<&EnumMember> {
        let key = key.as_str()?;
        self.members.iter().find(|m| m.key == key)
    }

    fn exact_value(&self, value: &Value) -> Option<&EnumMember> {
        let value = Primitive::from_value(value)?;
        self.members.iter().find(|m| m.value == value)
    }

    fn loose_key(&self, key: &Value) -> Option<&EnumMember> {
        let index = *self.key_maps.get(&property_key(key)?)?;
        self.members.get(index)
    }

    fn loose_value(&self, value: &Value) -> Option<&EnumMember> {
        let index = *self.value_maps.get(&property_key(value)?)?;
        self.members.get(index)
    }

    fn by_key(&self, key: &Value, strict: bool) -> Option<&EnumMember> {
        if strict { self.exact_key(key) } else { self.loose_key(key) }
    }

    fn by_value(&self, value: &Value, strict: bool) -> Option<&EnumMember> {
        if strict { self.exact_value(value) } else { self.loose_value(value) }
    }

    pub fn has_key(&self, key: &Value, strict: bool) -> bool {
        self.by_key(key, strict).is_some()
    }

    pub fn has_value(&self, value: &Value, strict: bool) -> bool {
        self.by_value(value, strict).is_some()
    }

    /// Value paired with `key`; `None` when there's no such member.
    pub fn value(&self, key: &Value, strict: bool) -> Option<Value> {
        self.by_key(key, strict).map(|m| m.value.to_value())
    }

    /// Key paired with `value`; `None` when there's no such member.
    pub fn key(&self, value: &Value, strict: bool) -> Option<String> {
        self.by_value(value, strict).map(|m| m.key.clone())
    }

    /// The member value `given` matches; anything else falls back to the
    /// default, then to the first member.
    pub fn create(&self, given: Option<&Value>, strict: bool) -> Value {
        match given.and_then(|v| self.by_value(v, strict)) {
            Some(member) => member.value.to_value(),
            None => self.default_value(),
        }
    }

    fn default_value(&self) -> Value {
        if let Some(d) = &self.default {
            // a default may name a member by its key
            if self.exact_value(d).is_none() {
                if let Some(m) = self.exact_key(d) {
                    return m.value.to_value();
                }
            }
            return d.clone();
        }
        self.members.first().map(|m| m.value.to_value()).unwrap_or(Value::Null)
    }

    pub fn check(&self, value: &Value, strict: bool) -> bool {
        self.has_value(value, strict)
    }

    /// `value` when it is a member value, else the member value it maps to.
    pub fn parse(&self, value: &Value) -> Option<Value> {
        if self.exact_value(value).is_some() {
            return Some(value.clone());
        }
        self.loose_value(value).map(|m| m.value.to_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sex(default: Option<Value>) -> EnumType {
        EnumType::new(
            "Sex",
            vec![("male".into(), json!(1)), ("female".into(), json!(2))],
            default,
        )
        .unwrap()
    }

    #[test]
    fn members_round_trip_in_both_modes() {
        let e = sex(None);
        for strict in [true, false] {
            for (k, v) in [("male", json!(1)), ("female", json!(2))] {
                assert!(e.has_key(&json!(k), strict));
                assert!(e.has_value(&v, strict));
                assert_eq!(e.value(&json!(k), strict), Some(v.clone()));
                assert_eq!(e.key(&v, strict).as_deref(), Some(k));
            }
        }
        assert_eq!(e.keys(), vec!["male", "female"]);
        assert_eq!(e.values(), vec![json!(1), json!(2)]);
    }

    #[test]
    fn lenient_lookups_coerce_through_property_keys() {
        let e = sex(None);
        assert!(!e.has_value(&json!("1"), true));
        assert!(e.has_value(&json!("1"), false));
        assert!(e.has_value(&json!(1.0), true));
        assert_eq!(e.parse(&json!("2")), Some(json!(2)));
        assert_eq!(e.parse(&json!(2)), Some(json!(2)));
        assert_eq!(e.parse(&json!("male")), None);
    }

    #[test]
    fn misses_are_none_in_both_modes() {
        let e = sex(None);
        assert_eq!(e.value(&json!("other"), true), None);
        assert_eq!(e.value(&json!("other"), false), None);
        assert_eq!(e.key(&json!(3), true), None);
        assert_eq!(e.key(&json!(3), false), None);
    }

    #[test]
    fn create_falls_back_for_non_members() {
        let e = sex(None);
        assert_eq!(e.create(None, true), json!(1));
        assert_eq!(e.create(Some(&json!(2)), true), json!(2));
        assert_eq!(e.create(Some(&json!(3)), true), json!(1));

        let e = sex(Some(json!(2)));
        assert_eq!(e.create(Some(&json!(3)), true), json!(2));
        let e = sex(Some(json!("female")));
        assert_eq!(e.create(None, true), json!(2));
    }

    #[test]
    fn lenient_create_returns_member_value() {
        let e = sex(None);
        assert_eq!(e.create(Some(&json!("2")), false), json!(2));
        assert_eq!(e.create(Some(&json!(2.0)), false), json!(2));
        assert_eq!(e.create(Some(&json!("2")), true), json!(1));
    }

    #[test]
    fn duplicate_members_are_rejected() {
        let dup_key = EnumType::new("E", vec![("a".into(), json!(1)), ("a".into(), json!(2))], None);
        assert!(matches!(dup_key, Err(SchemaError::DuplicateEnumMember { .. })));
        let dup_value = EnumType::new("E", vec![("a".into(), json!(1)), ("b".into(), json!("1"))], None);
        assert!(matches!(dup_value, Err(SchemaError::DuplicateEnumMember { .. })));
        let nested = EnumType::new("E", vec![("a".into(), json!([1]))], None);
        assert!(matches!(nested, Err(SchemaError::InvalidDeclaration { .. })));
    }
}
