//! Type registry: stable integer identities for every type the analysis sees.
//!
//! A [`TypeId`] belongs to exactly one category (elemental, ignored, named
//! built-in, class, compound, masked type parameter or array). Categories are
//! told apart through the registry's side tables, never by inspecting the id.

pub mod catalog;
pub mod registry;
pub mod text;

pub use registry::{TypeKey, TypeRegistry};
pub use text::TypeText;

use serde::Serialize;
use std::fmt;

/// Opaque type identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TypeId(pub u32);

impl TypeId {
    /// Resolution failed: no local, field, type or class matched.
    pub const UNRESOLVED: TypeId = TypeId(u32::MAX);
    /// Known to be untracked. Behaves like a member of the ignored range.
    pub const UNKNOWN: TypeId = TypeId(u32::MAX - 1);

    pub fn is_sentinel(self) -> bool {
        self == Self::UNRESOLVED || self == Self::UNKNOWN
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::UNRESOLVED => write!(f, "unresolved"),
            Self::UNKNOWN => write!(f, "unknown"),
            TypeId(id) => write!(f, "t{id}"),
        }
    }
}

/// Built-in value types every language maps its literals and primitives onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Elemental {
    Int,
    Float,
    Char,
    String,
    Bool,
    Lock,
    Script,
    Null,
}

impl Elemental {
    pub const ALL: [Elemental; 8] = [
        Elemental::Int,
        Elemental::Float,
        Elemental::Char,
        Elemental::String,
        Elemental::Bool,
        Elemental::Lock,
        Elemental::Script,
        Elemental::Null,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Char => "char",
            Self::String => "string",
            Self::Bool => "bool",
            Self::Lock => "lock",
            Self::Script => "script",
            Self::Null => "null",
        }
    }
}

/// Built-in call semantics attached to a type without a real declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AbstractTypeKind {
    #[default]
    None,
    Set,
    List,
    Map,
    Stack,
    PriorityQueue,
    Reference,
    Lock,
    Script,
    String,
    Other,
}

impl AbstractTypeKind {
    /// Kinds whose element accessors yield the wrapped component type.
    pub fn is_container(self) -> bool {
        matches!(
            self,
            Self::Set | Self::List | Self::Map | Self::Stack | Self::PriorityQueue
        )
    }
}
