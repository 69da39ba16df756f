//! Error taxonomy.
//!
//! Two families: [`SchemaError`] for mistakes made while *declaring* types,
//! and [`ValidationError`] for input that doesn't satisfy a declared type.
//! Validation errors carry a structured [`ErrorKind`], a rendered message and
//! the path of the failing field.
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::coerce::display_value;

// ————————————————————————————————————————————————————————————————————————————
// DECLARATION ERRORS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Error, Debug)]
pub enum SchemaError {
    /// A compact field spec that can't be read, e.g. an empty type segment.
    #[error("malformed field spec '{spec}': {reason}")]
    MalformedSpec { spec: String, reason: &'static str },

    #[error("unknown type '{name}'")]
    UnknownType { name: String },

    /// `Name<Sub>` where `Name` isn't the registry's `Array`.
    #[error("field '{field}': sub-type annotation requires Array, found '{ty}'")]
    SubTypeOnNonArray { field: String, ty: String },

    #[error("invalid declaration: {reason}")]
    InvalidDeclaration { reason: String },

    #[error("enum '{ty}' declares '{member}' more than once")]
    DuplicateEnumMember { ty: String, member: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl SchemaError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidDeclaration { reason: reason.into() }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// VALIDATION ERRORS
// ————————————————————————————————————————————————————————————————————————————

/// What went wrong, with the context each kind needs.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    TypeMismatch { ty: String, value: Value },
    RequiredFieldMissing { field: String },
    CheckedRuleFailed { field: String, rule: String },
    NoSuchRule { rule: String },
    InvalidPattern { regexp: String },
    EqualityMismatch { field: String, other: String },
    EmptyFieldRejected { field: String },
    /// A forward reference that never got declared.
    UnresolvedType { ty: String },
}

/// One step of an error path: an object key or an array index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(k) => f.write_str(k),
            Self::Index(i) => write!(f, "{i}"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct ValidationError {
    pub kind: ErrorKind,
    pub message: String,
    /// Innermost segment last.
    pub keys: Vec<PathSegment>,
    /// `keys` joined with `.`, set by the outermost struct.
    pub path: Option<String>,
}

impl ValidationError {
    pub fn new(kind: ErrorKind, templates: &MessageTemplates) -> Self {
        let message = templates.render(&kind);
        Self { kind, message, keys: Vec::new(), path: None }
    }

    /// The field the error is about, when the kind names one.
    pub fn field(&self) -> Option<&str> {
        match &self.kind {
            ErrorKind::RequiredFieldMissing { field }
            | ErrorKind::CheckedRuleFailed { field, .. }
            | ErrorKind::EqualityMismatch { field, .. }
            | ErrorKind::EmptyFieldRejected { field } => Some(field.as_str()),
            _ => None,
        }
    }

    pub(crate) fn prepend(mut self, segment: PathSegment) -> Self {
        self.keys.insert(0, segment);
        self
    }

    pub(crate) fn seal_path(mut self) -> Self {
        if !self.keys.is_empty() {
            let joined = self.keys.iter().map(ToString::to_string).collect::<Vec<_>>();
            self.path = Some(joined.join("."));
        }
        self
    }

    pub(crate) fn with_message(mut self, message: &str) -> Self {
        self.message = message.to_string();
        self
    }
}

// ————————————————————————————————————————————————————————————————————————————
// MESSAGE TEMPLATES
// ————————————————————————————————————————————————————————————————————————————

/// Message text per error kind. Placeholders: `{field}`, `{type}`, `{value}`,
/// `{rule}`, `{regexp}`, `{eql}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageTemplates {
    #[serde(rename = "type")]
    pub type_: String,
    pub require: String,
    pub check: String,
    pub rule: String,
    pub regexp: String,
    pub eql: String,
    pub empty: String,
    pub unresolved: String,
}

impl Default for MessageTemplates {
    fn default() -> Self {
        Self {
            type_: "Value [{value}] is not of [{type}] type".into(),
            require: "Field [{field}] not found".into(),
            check: "Field [{field}] can not matched [{rule}] rule".into(),
            rule: "Rule [{rule}] not found".into(),
            regexp: "Can not parse RegExp [{regexp}]".into(),
            eql: "Field [{field}] does not equal field [{eql}]".into(),
            empty: "Field [{field}] can not be empty".into(),
            unresolved: "Type [{type}] is not declared".into(),
        }
    }
}

/// Partial replacement for [`MessageTemplates`]; unset entries keep their text.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageOverrides {
    #[serde(rename = "type")]
    pub type_: Option<String>,
    pub require: Option<String>,
    pub check: Option<String>,
    pub rule: Option<String>,
    pub regexp: Option<String>,
    pub eql: Option<String>,
    pub empty: Option<String>,
    pub unresolved: Option<String>,
}

impl MessageTemplates {
    pub fn merge(&mut self, overrides: MessageOverrides) {
        let MessageOverrides { type_, require, check, rule, regexp, eql, empty, unresolved } = overrides;
        let slots = [
            (&mut self.type_, type_),
            (&mut self.require, require),
            (&mut self.check, check),
            (&mut self.rule, rule),
            (&mut self.regexp, regexp),
            (&mut self.eql, eql),
            (&mut self.empty, empty),
            (&mut self.unresolved, unresolved),
        ];
        for (slot, value) in slots {
            if let Some(value) = value {
                *slot = value;
            }
        }
    }

    pub fn render(&self, kind: &ErrorKind) -> String {
        match kind {
            ErrorKind::TypeMismatch { ty, value } => fill(&self.type_, &[
                ("{type}", ty.as_str()),
                ("{value}", display_value(value).as_str()),
            ]),
            ErrorKind::RequiredFieldMissing { field } => fill(&self.require, &[("{field}", field.as_str())]),
            ErrorKind::CheckedRuleFailed { field, rule } => fill(&self.check, &[
                ("{field}", field.as_str()),
                ("{rule}", rule.as_str()),
            ]),
            ErrorKind::NoSuchRule { rule } => fill(&self.rule, &[("{rule}", rule.as_str())]),
            ErrorKind::InvalidPattern { regexp } => fill(&self.regexp, &[("{regexp}", regexp.as_str())]),
            ErrorKind::EqualityMismatch { field, other } => fill(&self.eql, &[
                ("{field}", field.as_str()),
                ("{eql}", other.as_str()),
            ]),
            ErrorKind::EmptyFieldRejected { field } => fill(&self.empty, &[("{field}", field.as_str())]),
            ErrorKind::UnresolvedType { ty } => fill(&self.unresolved, &[("{type}", ty.as_str())]),
        }
    }
}

fn fill(template: &str, pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .fold(template.to_string(), |acc, (placeholder, value)| acc.replace(placeholder, value))
}
