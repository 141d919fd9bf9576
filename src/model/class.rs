use super::raw::ClassKind;
use crate::ids::{ClassId, FunctionId};
use crate::types::TypeId;
use std::collections::HashMap;

/// Resolution of one import declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportTarget {
    Class(ClassId),
    /// `import pkg.*` / C# `using Namespace;`
    Package(String),
    /// `import pkg.Outer.*` or `import static pkg.Outer.*`
    Members(ClassId),
    /// `import static pkg.Color.RED`
    EnumConstant { owner: ClassId, name: String },
    Unresolved,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub path: String,
    pub target: ImportTarget,
}

#[derive(Debug, Clone)]
pub struct Class {
    pub id: ClassId,
    pub name: String,
    /// `package.Outer.Inner`
    pub qualified_name: String,
    pub package: String,
    pub kind: ClassKind,
    pub is_abstract: bool,
    pub outer: Option<ClassId>,
    /// Index of the compilation unit the class came from.
    pub unit: usize,
    pub supertype_names: Vec<String>,
    /// Resolved supertypes, in declaration order.
    pub supertypes: Vec<ClassId>,
    /// Every ancestor once, depth-first in declaration order.
    pub ancestors: Vec<ClassId>,
    pub nested: Vec<ClassId>,
    pub fields: HashMap<String, TypeId>,
    pub field_order: Vec<String>,
    pub methods: Vec<FunctionId>,
    pub type_params: Vec<String>,
    pub masked_types: Vec<TypeId>,
    pub enum_constants: Vec<String>,
    pub type_id: TypeId,
}

impl Class {
    pub fn is_interface(&self) -> bool {
        self.kind == ClassKind::Interface
    }

    pub fn is_enum(&self) -> bool {
        self.kind == ClassKind::Enum
    }

    pub fn field_type(&self, name: &str) -> Option<TypeId> {
        self.fields.get(name).copied()
    }

    /// Position of a masked type among this class's type parameters.
    pub fn masked_position(&self, ty: TypeId) -> Option<usize> {
        self.masked_types.iter().position(|masked| *masked == ty)
    }

    pub fn has_enum_constant(&self, name: &str) -> bool {
        self.is_enum() && self.enum_constants.iter().any(|constant| constant == name)
    }
}
