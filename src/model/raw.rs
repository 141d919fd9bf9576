//! Raw declaration records produced by a front end for one compilation unit.
//!
//! Type text stays unresolved here; the model builder resolves it once every
//! unit of the program has been ingested.

use super::expr::Expr;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassKind {
    Class,
    Interface,
    Enum,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompilationUnit {
    pub path: PathBuf,
    /// Package or namespace, empty for the default package.
    pub package: String,
    pub imports: Vec<RawImport>,
    pub classes: Vec<RawClass>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImport {
    /// Dotted path without the trailing `.*`.
    pub path: String,
    pub is_static: bool,
    pub wildcard: bool,
}

/// Initializer of the form `reference.method()`, kept for lock pairing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockInitializer {
    pub reference: String,
    pub method: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawVariable {
    pub type_text: String,
    pub name: String,
    pub initializer: Option<LockInitializer>,
}

impl RawVariable {
    pub fn new(type_text: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            type_text: type_text.into(),
            name: name.into(),
            initializer: None,
        }
    }

    pub fn initialized_from(mut self, reference: &str, method: &str) -> Self {
        self.initializer = Some(LockInitializer {
            reference: reference.to_string(),
            method: method.to_string(),
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawMethod {
    pub name: String,
    /// `None` for constructors.
    pub return_type: Option<String>,
    pub params: Vec<RawVariable>,
    pub type_params: Vec<String>,
    pub locals: Vec<RawVariable>,
    /// Call-site expressions in source order.
    pub calls: Vec<Expr>,
    /// Local functions and methods of anonymous classes declared in the body.
    pub nested: Vec<RawMethod>,
    pub is_abstract: bool,
    pub is_static: bool,
    /// Entry point declared by the front end (C# event accessors).
    pub is_entry_point: bool,
}

impl RawMethod {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            return_type: Some("void".to_string()),
            params: Vec::new(),
            type_params: Vec::new(),
            locals: Vec::new(),
            calls: Vec::new(),
            nested: Vec::new(),
            is_abstract: false,
            is_static: false,
            is_entry_point: false,
        }
    }

    pub fn constructor(class_name: impl Into<String>) -> Self {
        Self {
            return_type: None,
            ..Self::new(class_name)
        }
    }

    pub fn returns(mut self, type_text: impl Into<String>) -> Self {
        self.return_type = Some(type_text.into());
        self
    }

    pub fn param(mut self, type_text: &str, name: &str) -> Self {
        self.params.push(RawVariable::new(type_text, name));
        self
    }

    pub fn local(mut self, type_text: &str, name: &str) -> Self {
        self.locals.push(RawVariable::new(type_text, name));
        self
    }

    pub fn call(mut self, expr: Expr) -> Self {
        self.calls.push(expr);
        self
    }

    pub fn nested(mut self, method: RawMethod) -> Self {
        self.nested.push(method);
        self
    }

    pub fn abstract_method(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn is_constructor(&self) -> bool {
        self.return_type.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawClass {
    pub name: String,
    pub kind: ClassKind,
    pub is_abstract: bool,
    pub type_params: Vec<String>,
    pub supertypes: Vec<String>,
    pub fields: Vec<RawVariable>,
    pub enum_constants: Vec<String>,
    pub methods: Vec<RawMethod>,
    pub nested: Vec<RawClass>,
}

impl RawClass {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ClassKind::Class,
            is_abstract: false,
            type_params: Vec::new(),
            supertypes: Vec::new(),
            fields: Vec::new(),
            enum_constants: Vec::new(),
            methods: Vec::new(),
            nested: Vec::new(),
        }
    }

    pub fn interface(name: impl Into<String>) -> Self {
        Self {
            kind: ClassKind::Interface,
            ..Self::new(name)
        }
    }

    pub fn enumeration(name: impl Into<String>, constants: &[&str]) -> Self {
        Self {
            kind: ClassKind::Enum,
            enum_constants: constants.iter().map(|c| c.to_string()).collect(),
            ..Self::new(name)
        }
    }

    pub fn abstract_class(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn extends(mut self, supertype: &str) -> Self {
        self.supertypes.push(supertype.to_string());
        self
    }

    pub fn type_param(mut self, name: &str) -> Self {
        self.type_params.push(name.to_string());
        self
    }

    pub fn field(mut self, type_text: &str, name: &str) -> Self {
        self.fields.push(RawVariable::new(type_text, name));
        self
    }

    pub fn field_var(mut self, variable: RawVariable) -> Self {
        self.fields.push(variable);
        self
    }

    pub fn method(mut self, method: RawMethod) -> Self {
        self.methods.push(method);
        self
    }

    pub fn nested_class(mut self, class: RawClass) -> Self {
        self.nested.push(class);
        self
    }
}

impl CompilationUnit {
    pub fn new(path: impl Into<PathBuf>, package: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            package: package.into(),
            imports: Vec::new(),
            classes: Vec::new(),
        }
    }

    pub fn import(mut self, path: &str) -> Self {
        let is_static = path.starts_with("static ");
        let path = path.trim_start_matches("static ").trim();
        let wildcard = path.ends_with(".*");
        self.imports.push(RawImport {
            path: path.trim_end_matches(".*").to_string(),
            is_static,
            wildcard,
        });
        self
    }

    pub fn class(mut self, class: RawClass) -> Self {
        self.classes.push(class);
        self
    }
}
