use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::coerce::{as_integral, bool_val, number_val, string_val};
use crate::declare::SimpleDecl;

pub type Predicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;
pub type Converter = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

#[derive(Clone)]
pub struct SimpleType {
    pub(crate) check: Predicate,
    pub(crate) convert: Option<Converter>,
    pub(crate) default: Value,
}

impl fmt::Debug for SimpleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleType")
            .field("convert", &self.convert.is_some())
            .field("default", &self.default)
            .finish_non_exhaustive()
    }
}

impl SimpleType {
    pub fn check(&self, v: &Value) -> bool {
        (self.check)(v)
    }

    /// Coerced form of `v`, or `v` itself when the type has no coercion.
    pub fn parse(&self, v: &Value) -> Value {
        match &self.convert {
            Some(convert) => convert(v),
            None => v.clone(),
        }
    }

    pub fn create(&self, given: Option<&Value>) -> Value {
        match given {
            Some(v) => self.parse(v),
            None => self.default.clone(),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// BUILT-INS
// ————————————————————————————————————————————————————————————————————————————

/// The types every registry starts with.
pub fn builtins() -> Vec<SimpleDecl> {
    let mut out = vec![
        SimpleDecl::new("String", Value::is_string)
            .convert(string_val)
            .with_default(Value::String(String::new())),
        SimpleDecl::new("Number", Value::is_number)
            .convert(number_val)
            .with_default(Value::from(0)),
        SimpleDecl::new("Boolean", Value::is_boolean)
            .convert(bool_val)
            .with_default(Value::Bool(false)),
        SimpleDecl::new("Array", Value::is_array).with_default(Value::Array(Vec::new())),
        SimpleDecl::new("Object", Value::is_object).with_default(Value::Object(Map::new())),
        SimpleDecl::new("Int", |v: &Value| as_integral(v).is_some())
            .convert(number_val)
            .with_default(Value::from(0)),
        SimpleDecl::new("Uint", |v: &Value| as_integral(v).is_some_and(|f| f >= 0.0))
            .convert(number_val)
            .with_default(Value::from(0)),
    ];
    let widths: [(&str, f64, f64); 10] = [
        ("Long", i64::MIN as f64, i64::MAX as f64),
        ("Integer", i32::MIN as f64, i32::MAX as f64),
        ("Short", i16::MIN as f64, i16::MAX as f64),
        ("Byte", i8::MIN as f64, i8::MAX as f64),
        ("Int8", i8::MIN as f64, i8::MAX as f64),
        ("Int16", i16::MIN as f64, i16::MAX as f64),
        ("Int32", i32::MIN as f64, i32::MAX as f64),
        ("UInt8", 0.0, u8::MAX as f64),
        ("UInt16", 0.0, u16::MAX as f64),
        ("UInt32", 0.0, u32::MAX as f64),
    ];
    out.extend(widths.into_iter().map(|(name, lo, hi)| {
        SimpleDecl::new(name, move |v: &Value| as_integral(v).is_some_and(|f| lo <= f && f <= hi))
            .convert(number_val)
            .with_default(Value::from(0))
    }));
    out
}
