//! Language front ends.
//!
//! A front end turns one source file into a [`CompilationUnit`] and answers
//! the handful of grammar-specific questions the graph builder asks while
//! resolving call sites. The graph builder only ever sees the
//! [`LanguageFrontend`] trait.

mod csharp;
mod java;
mod tree;

pub use csharp::CSharpFrontend;
pub use java::JavaFrontend;

use crate::errors::Result;
use crate::model::{CompilationUnit, Expr, LiteralKind};
use crate::types::Elemental;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Java,
    #[serde(rename = "c#", alias = "csharp", alias = "cs")]
    CSharp,
}

impl Language {
    /// Parse a configured language name. Anything but Java and C# is
    /// unsupported.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "java" => Some(Language::Java),
            "c#" | "csharp" | "cs" => Some(Language::CSharp),
            _ => None,
        }
    }

    pub fn default_extensions(self) -> &'static [&'static str] {
        match self {
            Language::Java => &[".java"],
            Language::CSharp => &[".cs"],
        }
    }

    pub fn frontend(self) -> Box<dyn LanguageFrontend> {
        match self {
            Language::Java => Box::new(JavaFrontend),
            Language::CSharp => Box::new(CSharpFrontend),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::Java => write!(f, "Java"),
            Language::CSharp => write!(f, "C#"),
        }
    }
}

/// Effect of calling a method on a lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LockOperation {
    Acquire,
    Release,
}

pub trait LanguageFrontend: Send + Sync {
    fn language(&self) -> Language;

    /// Parse one source file. Files with syntax errors are rejected with
    /// [`Error::Parse`](crate::Error::Parse).
    fn parse_unit(&self, path: &Path, source: &str) -> Result<CompilationUnit>;

    /// Elemental type of a literal.
    fn literal_type(&self, kind: LiteralKind) -> Elemental {
        match kind {
            LiteralKind::Integer | LiteralKind::Hex => Elemental::Int,
            LiteralKind::Real => Elemental::Float,
            LiteralKind::Char => Elemental::Char,
            LiteralKind::String => Elemental::String,
            LiteralKind::Boolean | LiteralKind::Binary => Elemental::Bool,
            LiteralKind::Null => Elemental::Null,
        }
    }

    /// Argument expressions of a call or object creation.
    fn argument_list<'e>(&self, call: &'e Expr) -> &'e [Expr] {
        match call {
            Expr::Call { args, .. } | Expr::New { args, .. } => args,
            _ => &[],
        }
    }

    /// Invoked method name, `None` for anything that is not a call.
    fn method_name<'e>(&self, call: &'e Expr) -> Option<&'e str> {
        match call {
            Expr::Call { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Parse a standalone expression, used to re-read the guard of a
    /// synchronized region.
    fn generate_expression(&self, text: &str) -> Option<Expr>;

    /// Whether the textual call releases a monitor.
    fn is_unlock_call(&self, text: &str) -> bool {
        text.trim_end().ends_with("unlock()")
    }

    /// Lock vocabulary of the language's standard library.
    fn lock_operation(&self, method: &str) -> Option<LockOperation>;
}
