//! Compact field specs: `"Type|@flag|@key:value|rule,arg1,arg2"`.
//!
//! ```text
//! Number|@comment:age in years|@optional|len,4,10
//!   → type     = "Number"
//!   → flags    = { comment: "age in years", optional: true }
//!   → checks   = [ ["len", "4", "10"] ]
//! ```
//!
//! - the first segment is the type name and must not be empty;
//! - `@key` sets a flag to `true`, `@key:value` sets it to a parsed scalar
//!   (first letter of the key lower-cased);
//! - anything else is a check rule, `name,a,b` or `name:a,b`;
//! - empty segments are skipped.
use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::coerce::render_number;
use crate::error::SchemaError;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// A parsed compact spec.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PropSpec {
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(flatten)]
    pub flags: IndexMap<String, Value>,
    pub checks: Vec<Check>,
}

/// One rule invocation. Serialized as `["rule", arg1, arg2, ...]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "Vec<Value>", try_from = "Vec<Value>")]
pub struct Check {
    pub rule: String,
    pub args: Vec<Value>,
}

impl Check {
    pub fn new(rule: impl Into<String>, args: impl IntoIterator<Item = Value>) -> Self {
        Self { rule: rule.into(), args: args.into_iter().collect() }
    }
}

impl From<Check> for Vec<Value> {
    fn from(check: Check) -> Self {
        std::iter::once(Value::String(check.rule)).chain(check.args).collect()
    }
}

impl TryFrom<Vec<Value>> for Check {
    type Error = String;
    fn try_from(mut xs: Vec<Value>) -> Result<Self, Self::Error> {
        if xs.is_empty() {
            return Err("check rule must not be empty".to_string());
        }
        match xs.remove(0) {
            Value::String(rule) if !rule.is_empty() => Ok(Self { rule, args: xs }),
            other => Err(format!("check rule name must be a string, found {other}")),
        }
    }
}

impl PropSpec {
    pub fn flag(&self, key: &str) -> Option<&Value> {
        self.flags.get(key)
    }

    /// Flag presence with JS-style truthiness.
    pub fn flag_bool(&self, key: &str) -> bool {
        self.flag(key).is_some_and(truthy)
    }

    pub fn flag_str(&self, key: &str) -> Option<String> {
        match self.flag(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(render_number(n)),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

pub(crate) fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

// ————————————————————————————————————————————————————————————————————————————
// PARSER
// ————————————————————————————————————————————————————————————————————————————

pub fn parse(spec: &str) -> Result<PropSpec, SchemaError> {
    let mut segments = spec.split('|');
    let ty = segments.next().unwrap_or_default();
    if ty.trim().is_empty() {
        return Err(SchemaError::MalformedSpec {
            spec: spec.to_string(),
            reason: "missing type name",
        });
    }

    let mut out = PropSpec { ty: ty.to_string(), ..PropSpec::default() };
    for segment in segments.filter(|s| !s.is_empty()) {
        if let Some(flag) = segment.strip_prefix('@') {
            let (key, value) = match flag.split_once(':') {
                Some((key, raw)) => (key, parse_scalar(raw)),
                None => (flag, Value::Bool(true)),
            };
            out.flags.insert(lower_first(key), value);
        } else {
            out.checks.push(parse_check(segment));
        }
    }
    Ok(out)
}

fn parse_check(segment: &str) -> Check {
    // `name:a,b` only when the colon comes before any comma
    let (rule, rest) = match segment.split_once(':') {
        Some((name, rest)) if !name.contains(',') => (name, Some(rest)),
        _ => match segment.split_once(',') {
            Some((name, rest)) => (name, Some(rest)),
            None => (segment, None),
        },
    };
    let args = rest
        .map(|rest| rest.split(',').map(|a| Value::String(a.to_string())).collect())
        .unwrap_or_default();
    Check { rule: rule.to_string(), args }
}

/// `true`/`on`, `false`/`off`, exact integers, exact floats, else the text.
pub fn parse_scalar(raw: &str) -> Value {
    match raw {
        "true" | "on" => return Value::Bool(true),
        "false" | "off" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(i) = raw.parse::<i64>() {
        if i.to_string() == raw {
            return Value::from(i);
        }
    }
    if let Ok(f) = raw.parse::<f64>() {
        if f.is_finite() && f.to_string() == raw {
            return Value::from(f);
        }
    }
    Value::String(raw.to_string())
}

fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ————————————————————————————————————————————————————————————————————————————
// CACHE
// ————————————————————————————————————————————————————————————————————————————

/// Memoizes [`parse`] by exact spec text. Hits are handed out as clones, so
/// callers can edit what they get back.
#[derive(Debug, Clone, Default)]
pub struct SpecCache {
    entries: HashMap<String, PropSpec>,
}

impl SpecCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(&mut self, spec: &str) -> Result<PropSpec, SchemaError> {
        if let Some(hit) = self.entries.get(spec) {
            return Ok(hit.clone());
        }
        let parsed = parse(spec)?;
        self.entries.insert(spec.to_string(), parsed.clone());
        Ok(parsed)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn optional_number_with_len_rule() {
        let spec = parse("Number|@optional|len,4,10").unwrap();
        assert_eq!(spec.ty, "Number");
        assert!(spec.flag_bool("optional"));
        assert_eq!(spec.checks, vec![Check::new("len", [json!("4"), json!("10")])]);
        assert_eq!(
            serde_json::to_value(&spec).unwrap(),
            json!({"type": "Number", "optional": true, "checks": [["len", "4", "10"]]})
        );
    }

    #[test]
    fn flags_with_values_and_colon_rules() {
        let spec = parse("String|@Comment:user name|@max:12|@ratio:0.5|regexp:^a,b$||email").unwrap();
        assert_eq!(spec.flag("comment"), Some(&json!("user name")));
        assert_eq!(spec.flag("max"), Some(&json!(12)));
        assert_eq!(spec.flag("ratio"), Some(&json!(0.5)));
        assert_eq!(spec.checks[0], Check::new("regexp", [json!("^a"), json!("b$")]));
        assert_eq!(spec.checks[1], Check::new("email", []));
    }

    #[test]
    fn scalars_only_accept_exact_numbers() {
        assert_eq!(parse_scalar("on"), json!(true));
        assert_eq!(parse_scalar("off"), json!(false));
        assert_eq!(parse_scalar("42"), json!(42));
        assert_eq!(parse_scalar("-7"), json!(-7));
        assert_eq!(parse_scalar("2.25"), json!(2.25));
        assert_eq!(parse_scalar("12abc"), json!("12abc"));
        assert_eq!(parse_scalar("012"), json!("012"));
        assert_eq!(parse_scalar("1e3"), json!("1e3"));
    }

    #[test]
    fn empty_type_segment_is_rejected() {
        assert!(matches!(parse("|@optional"), Err(SchemaError::MalformedSpec { .. })));
        assert!(matches!(parse(""), Err(SchemaError::MalformedSpec { .. })));
    }

    #[test]
    fn cached_results_are_independent_copies() {
        let mut cache = SpecCache::new();
        let mut first = cache.parse("String|@optional|len,1,3").unwrap();
        first.flags.insert("optional".into(), json!(false));
        first.checks.clear();

        let second = cache.parse("String|@optional|len,1,3").unwrap();
        assert!(second.flag_bool("optional"));
        assert_eq!(second.checks.len(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(second, cache.parse("String|@optional|len,1,3").unwrap());
    }

    #[test]
    fn checks_deserialize_from_arrays() {
        let check: Check = serde_json::from_value(json!(["range", 1, 5])).unwrap();
        assert_eq!(check, Check::new("range", [json!(1), json!(5)]));
        assert!(serde_json::from_value::<Check>(json!([])).is_err());
    }
}
