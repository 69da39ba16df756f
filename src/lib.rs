//! Runtime type declarations for JSON values.
//!
//! Declare simple types, enums and structs in a [`Registry`], then use the
//! returned handles to create default instances, check values, and extract
//! validated copies with coercion:
//!
//! ```
//! use json_decl::Registry;
//! use serde_json::json;
//!
//! let mut registry = Registry::new();
//! registry
//!     .declare_json(json!({
//!         "name": "User",
//!         "props": {
//!             "name": "String|len,1,20",
//!             "age": "Number|@optional",
//!         },
//!     }))
//!     .unwrap();
//!
//! let user = registry.get("User").unwrap();
//! let out = user.extract(&json!({"name": " ann ", "age": "7", "extra": true})).unwrap();
//! assert_eq!(out, json!({"name": "ann", "age": 7}));
//! ```
pub mod cli;
pub mod coerce;
pub mod compact;
pub mod declare;
pub mod error;
pub mod jq_exec;
pub mod path_de;
pub mod registry;
pub mod rules;
pub mod types;

pub use compact::{Check, PropSpec, SpecCache};
pub use declare::{Declaration, EnumDecl, FieldOptions, FieldSpec, SimpleDecl, StructDecl, TypeSpec};
pub use error::{ErrorKind, MessageOverrides, MessageTemplates, PathSegment, SchemaError, ValidationError};
pub use registry::{EnumHandle, Registry, RegistryConfig, TypeHandle};
pub use rules::{Rule, RuleSet};
pub use types::{DataType, EnumType, FieldDescriptor, Primitive, SimpleType, StructType, TypeId};
