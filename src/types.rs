//! Type definitions stored in a [`Registry`](crate::Registry).
//!
//! Three kinds, one per submodule:
//! - [`simple`]: a `check` predicate with optional coercion and a default;
//! - [`enums`]: closed key ↔ value sets;
//! - [`structs`]: ordered named fields, each bound to another type.
//!
//! Definitions live in the registry's arena and refer to each other through
//! [`TypeId`] handles, or by name when the target isn't declared yet.
pub mod simple;
pub mod enums;
pub mod structs;

use serde::Serialize;

pub use simple::SimpleType;
pub use enums::{EnumMember, EnumType, Primitive};
pub use structs::{FieldDescriptor, StructType};

/// Index of a definition in its registry's arena. Only meaningful for the
/// registry that handed it out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DataType {
    Simple,
    Enum,
    Struct,
}

#[derive(Debug, Clone)]
pub struct TypeDef {
    /// Empty for anonymous (inline) declarations.
    pub(crate) name: String,
    /// Local override of the registry's strict flag.
    pub(crate) strict: Option<bool>,
    pub(crate) body: TypeBody,
}

#[derive(Debug, Clone)]
pub enum TypeBody {
    Simple(SimpleType),
    Enum(EnumType),
    Struct(StructType),
}

impl TypeDef {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> DataType {
        match &self.body {
            TypeBody::Simple(_) => DataType::Simple,
            TypeBody::Enum(_) => DataType::Enum,
            TypeBody::Struct(_) => DataType::Struct,
        }
    }
}

/// How a field reaches its type: directly, or by a name looked up in the
/// registry on every use (forward and self references).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    Resolved(TypeId),
    Pending(String),
}
