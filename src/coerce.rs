//! Best-effort primitive coercions shared by the built-in types.
//!
//! Every function here is total: when a value can't be coerced it comes back
//! unchanged and the type's `check` predicate gets the final word.
use serde_json::{Number, Value};

/// Largest magnitude we still render as an integer literal.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// number / boolean → string; anything else passes through.
pub fn string_val(v: &Value) -> Value {
    match v {
        Value::Number(n) => Value::String(render_number(n)),
        Value::Bool(b) => Value::String(b.to_string()),
        other => other.clone(),
    }
}

/// boolean / string → number. Strings are parsed after trimming, the empty
/// string is zero. Results that aren't finite leave the input untouched.
pub fn number_val(v: &Value) -> Value {
    match v {
        Value::Bool(b) => Value::from(if *b { 1 } else { 0 }),
        Value::String(s) => {
            let t = s.trim();
            let parsed = if t.is_empty() { Some(0.0) } else { t.parse::<f64>().ok() };
            parsed
                .and_then(number_from_f64)
                .unwrap_or_else(|| v.clone())
        }
        other => other.clone(),
    }
}

/// number → non-zero; string → `"true"` / `"on"`; anything else passes through.
pub fn bool_val(v: &Value) -> Value {
    match v {
        Value::Number(n) => Value::Bool(n.as_f64().is_some_and(|f| f != 0.0)),
        Value::String(s) => Value::Bool(s == "true" || s == "on"),
        other => other.clone(),
    }
}

/// Prefer an integer representation when the float is exact.
pub fn number_from_f64(f: f64) -> Option<Value> {
    if !f.is_finite() {
        return None;
    }
    if f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER {
        return Some(Value::from(f as i64));
    }
    Number::from_f64(f).map(Value::Number)
}

/// Integral numbers print without a fractional part (`1.0` → `"1"`).
pub fn render_number(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER => (f as i64).to_string(),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

/// The string a value collapses to when used as an object key: lenient enum
/// lookups go through this so `"1"` and `1` land on the same member.
pub fn property_key(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(render_number(n)),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some("null".to_string()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Text used when a value is substituted into an error message.
pub fn display_value(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Number(n) => render_number(n),
        other => other.to_string(),
    }
}

/// Identity comparison with numbers compared by magnitude, so `1 == 1.0`.
pub fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        _ => a == b,
    }
}

/// Numeric view of a value when it is an integral number.
pub fn as_integral(v: &Value) -> Option<f64> {
    let n = v.as_number()?;
    if n.is_i64() || n.is_u64() {
        return n.as_f64();
    }
    n.as_f64().filter(|f| f.is_finite() && f.fract() == 0.0)
}

/// Numeric view of a rule argument: numbers as-is, numeric strings parsed.
pub fn as_f64_lenient(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}
