//! Named check rules referenced from field declarations (`len,4,10`,
//! `regexp:^[a-z]+$`, ...).
//!
//! A rule sees the field value after trimming and the rule's arguments as
//! written in the declaration. Compact specs always pass string arguments, so
//! the numeric rules accept numbers and numeric strings alike.
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::coerce::{as_f64_lenient, property_key, string_val};
use crate::compact::Check;
use crate::error::ErrorKind;

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$").unwrap()
});
static ALPHA: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z]+$").unwrap());
static ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9]+$").unwrap());
static NUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-+]?[0-9]+(\.[0-9]+)?$").unwrap());

pub trait Rule: Send + Sync {
    /// `Ok(false)` rejects the value; `Err` reports a broken rule invocation.
    fn test(&self, value: &Value, args: &[Value]) -> Result<bool, ErrorKind>;
}

impl<F> Rule for F
where
    F: Fn(&Value, &[Value]) -> Result<bool, ErrorKind> + Send + Sync,
{
    fn test(&self, value: &Value, args: &[Value]) -> Result<bool, ErrorKind> {
        self(value, args)
    }
}

#[derive(Clone)]
pub struct RuleSet {
    rules: IndexMap<String, Arc<dyn Rule>>,
}

impl std::fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.rules.keys()).finish()
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        let mut set = Self { rules: IndexMap::new() };
        set.insert("len", len);
        set.insert("length", len);
        set.insert("min", min);
        set.insert("max", max);
        set.insert("range", range);
        set.insert("regexp", regexp);
        set.insert("re", regexp);
        set.insert("email", email);
        set.insert("alpha", alpha);
        set.insert("alnum", alnum);
        set.insert("numeric", numeric);
        set.insert("in", one_of);
        set
    }
}

impl RuleSet {
    /// Registers (or replaces) a rule.
    pub fn insert(&mut self, name: impl Into<String>, rule: impl Rule + 'static) {
        self.rules.insert(name.into(), Arc::new(rule));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    /// Runs `checks` in order and returns the first one that rejects `value`.
    pub fn first_failure<'c>(&self, value: &Value, checks: &'c [Check]) -> Result<Option<&'c Check>, ErrorKind> {
        for check in checks {
            let rule = self
                .rules
                .get(&check.rule)
                .ok_or_else(|| ErrorKind::NoSuchRule { rule: check.rule.clone() })?;
            if !rule.test(value, &check.args)? {
                return Ok(Some(check));
            }
        }
        Ok(None)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// BUILT-IN RULES
// ————————————————————————————————————————————————————————————————————————————

fn arg(args: &[Value], i: usize) -> Option<f64> {
    args.get(i).and_then(as_f64_lenient)
}

/// `len,min[,max]`: characters of a string, elements of an array.
fn len(value: &Value, args: &[Value]) -> Result<bool, ErrorKind> {
    let n = match value {
        Value::Array(xs) => xs.len(),
        Value::Object(m) => m.len(),
        other => match string_val(other) {
            Value::String(s) => s.chars().count(),
            _ => return Ok(false),
        },
    } as f64;
    let lo = arg(args, 0).unwrap_or(0.0);
    let hi = arg(args, 1).unwrap_or(f64::INFINITY);
    Ok(lo <= n && n <= hi)
}

fn min(value: &Value, args: &[Value]) -> Result<bool, ErrorKind> {
    Ok(matches!((as_f64_lenient(value), arg(args, 0)), (Some(v), Some(lo)) if v >= lo))
}

fn max(value: &Value, args: &[Value]) -> Result<bool, ErrorKind> {
    Ok(matches!((as_f64_lenient(value), arg(args, 0)), (Some(v), Some(hi)) if v <= hi))
}

/// `range,lo[,hi]`; a missing upper bound is unbounded.
fn range(value: &Value, args: &[Value]) -> Result<bool, ErrorKind> {
    let Some(v) = as_f64_lenient(value) else { return Ok(false) };
    let lo = arg(args, 0).unwrap_or(f64::NEG_INFINITY);
    let hi = arg(args, 1).unwrap_or(f64::INFINITY);
    Ok(lo <= v && v <= hi)
}

/// `regexp:pattern`. Compact specs split arguments on `,`, so they're joined
/// back before compiling.
fn regexp(value: &Value, args: &[Value]) -> Result<bool, ErrorKind> {
    let pattern = args
        .iter()
        .map(|a| match string_val(a) {
            Value::String(s) => s,
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(",");
    Ok(matches_text(&compiled(pattern)?, value))
}

/// Compiled patterns by source text, shared by every registry.
static PATTERNS: Lazy<Mutex<HashMap<String, Regex>>> = Lazy::new(Default::default);

fn compiled(pattern: String) -> Result<Regex, ErrorKind> {
    let mut cache = PATTERNS.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(rx) = cache.get(&pattern) {
        return Ok(rx.clone());
    }
    let rx = Regex::new(&pattern).map_err(|_| ErrorKind::InvalidPattern { regexp: pattern.clone() })?;
    cache.insert(pattern, rx.clone());
    Ok(rx)
}

/// `in,a,b,c`: the value's key form is one of the arguments.
fn one_of(value: &Value, args: &[Value]) -> Result<bool, ErrorKind> {
    let Some(key) = property_key(value) else { return Ok(false) };
    Ok(args.iter().filter_map(property_key).any(|a| a == key))
}

fn email(value: &Value, _: &[Value]) -> Result<bool, ErrorKind> {
    Ok(matches_text(&EMAIL, value))
}

fn alpha(value: &Value, _: &[Value]) -> Result<bool, ErrorKind> {
    Ok(matches_text(&ALPHA, value))
}

fn alnum(value: &Value, _: &[Value]) -> Result<bool, ErrorKind> {
    Ok(matches_text(&ALNUM, value))
}

fn numeric(value: &Value, _: &[Value]) -> Result<bool, ErrorKind> {
    Ok(matches_text(&NUMERIC, value))
}

fn matches_text(rx: &Regex, value: &Value) -> bool {
    match string_val(value) {
        Value::String(s) => rx.is_match(&s),
        _ => false,
    }
}
