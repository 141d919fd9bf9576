//! Call-site expressions captured verbatim during ingestion.
//!
//! Front ends lower their grammar's expression nodes into this closed set of
//! shapes; the graph builder matches on it exhaustively.

use crate::types::TypeId;
use std::fmt;

/// Prefix of the synthetic lock fields backing `synchronized`/`lock` blocks.
pub const SYNC_LOCK_PREFIX: &str = "synchLock_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralKind {
    Integer,
    Hex,
    Real,
    Char,
    String,
    Boolean,
    Binary,
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Arithmetic, bitwise and string concatenation: typed like the first operand.
    Arithmetic,
    /// Comparisons, logical operators, `instanceof`: always `bool`.
    Comparison,
    /// `target = value`: typed like the value.
    Assignment,
    /// `cond ? a : b`: typed like the first branch.
    Conditional,
}

/// A type written inside an expression (`new T()`, `(T) x`, `T.class`).
///
/// The model builder fills in `resolved` once every class is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeName {
    pub text: String,
    pub resolved: Option<TypeId>,
}

impl TypeName {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            resolved: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(LiteralKind),
    Identifier(String),
    This,
    Super,
    ClassLiteral(TypeName),
    New {
        ty: TypeName,
        args: Vec<Expr>,
    },
    NewArray {
        ty: TypeName,
        elements: Vec<Expr>,
    },
    Cast {
        ty: TypeName,
        operand: Box<Expr>,
    },
    Paren(Box<Expr>),
    Index {
        target: Box<Expr>,
        index: Vec<Expr>,
    },
    Member {
        target: Box<Expr>,
        name: String,
    },
    Call {
        target: Option<Box<Expr>>,
        name: String,
        args: Vec<Expr>,
    },
    Operation {
        kind: OperationKind,
        operands: Vec<Expr>,
    },
    /// A shape the analysis does not model; nested expressions still count.
    Other(Vec<Expr>),
}

impl Expr {
    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Identifier(name.into())
    }

    /// Unqualified call `name(args)`.
    pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Call {
            target: None,
            name: name.into(),
            args,
        }
    }

    /// Qualified call `target.name(args)`.
    pub fn method(target: Expr, name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Call {
            target: Some(Box::new(target)),
            name: name.into(),
            args,
        }
    }

    pub fn member(target: Expr, name: impl Into<String>) -> Self {
        Expr::Member {
            target: Box::new(target),
            name: name.into(),
        }
    }

    pub fn new_object(ty: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::New {
            ty: TypeName::new(ty),
            args,
        }
    }

    /// Synthetic acquire/release of the monitor guarding a synchronized block.
    pub fn sync_lock(guard: &str, sequence: usize, acquire: bool) -> Self {
        let field = format!("{SYNC_LOCK_PREFIX}{guard}_{sequence}");
        Expr::method(
            Expr::Identifier(field),
            if acquire { "lock" } else { "unlock" },
            Vec::new(),
        )
    }

    /// Invocations (calls and object creations) anywhere in this expression.
    pub fn invocation_count(&self) -> usize {
        let own = usize::from(matches!(self, Expr::Call { .. } | Expr::New { .. }));
        own + self
            .children()
            .into_iter()
            .map(Expr::invocation_count)
            .sum::<usize>()
    }

    pub fn contains_invocation(&self) -> bool {
        self.invocation_count() > 0
    }

    /// Direct sub-expressions in evaluation order.
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Literal(_)
            | Expr::Identifier(_)
            | Expr::This
            | Expr::Super
            | Expr::ClassLiteral(_) => Vec::new(),
            Expr::New { args, .. } => args.iter().collect(),
            Expr::NewArray { elements, .. } => elements.iter().collect(),
            Expr::Cast { operand, .. } => vec![operand],
            Expr::Paren(inner) => vec![inner],
            Expr::Index { target, index } => {
                std::iter::once(&**target).chain(index.iter()).collect()
            }
            Expr::Member { target, .. } => vec![target],
            Expr::Call { target, args, .. } => {
                target.iter().map(|t| &**t).chain(args.iter()).collect()
            }
            Expr::Operation { operands, .. } => operands.iter().collect(),
            Expr::Other(inner) => inner.iter().collect(),
        }
    }

    /// Apply `f` to every embedded type name.
    pub fn visit_type_names_mut(&mut self, f: &mut dyn FnMut(&mut TypeName)) {
        match self {
            Expr::ClassLiteral(ty) => f(ty),
            Expr::New { ty, args } => {
                f(ty);
                args.iter_mut().for_each(|arg| arg.visit_type_names_mut(f));
            }
            Expr::NewArray { ty, elements } => {
                f(ty);
                elements.iter_mut().for_each(|e| e.visit_type_names_mut(f));
            }
            Expr::Cast { ty, operand } => {
                f(ty);
                operand.visit_type_names_mut(f);
            }
            Expr::Paren(inner) => inner.visit_type_names_mut(f),
            Expr::Index { target, index } => {
                target.visit_type_names_mut(f);
                index.iter_mut().for_each(|e| e.visit_type_names_mut(f));
            }
            Expr::Member { target, .. } => target.visit_type_names_mut(f),
            Expr::Call { target, args, .. } => {
                if let Some(target) = target {
                    target.visit_type_names_mut(f);
                }
                args.iter_mut().for_each(|arg| arg.visit_type_names_mut(f));
            }
            Expr::Operation { operands, .. } | Expr::Other(operands) => {
                operands.iter_mut().for_each(|e| e.visit_type_names_mut(f));
            }
            Expr::Literal(_) | Expr::Identifier(_) | Expr::This | Expr::Super => {}
        }
    }

    /// Leftmost identifier of a member chain (`Math` in `Math.floor(x)`).
    pub fn root_identifier(&self) -> Option<&str> {
        match self {
            Expr::Identifier(name) => Some(name),
            Expr::Member { target, .. } | Expr::Index { target, .. } => target.root_identifier(),
            Expr::Call {
                target: Some(target),
                ..
            } => target.root_identifier(),
            Expr::Paren(inner) => inner.root_identifier(),
            _ => None,
        }
    }

    /// Guard text of a synthetic monitor field, `None` for ordinary names.
    pub fn sync_lock_guard(name: &str) -> Option<&str> {
        let rest = name.strip_prefix(SYNC_LOCK_PREFIX)?;
        let (guard, sequence) = rest.rsplit_once('_')?;
        (!guard.is_empty() && sequence.chars().all(|c| c.is_ascii_digit())).then_some(guard)
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(kind) => write!(f, "<{kind:?}>"),
            Expr::Identifier(name) => write!(f, "{name}"),
            Expr::This => write!(f, "this"),
            Expr::Super => write!(f, "super"),
            Expr::ClassLiteral(ty) => write!(f, "{}.class", ty.text),
            Expr::New { ty, args } => {
                write!(f, "new {}(", ty.text)?;
                write_list(f, args)?;
                write!(f, ")")
            }
            Expr::NewArray { ty, .. } => write!(f, "new {}[]", ty.text),
            Expr::Cast { ty, operand } => write!(f, "({}) {operand}", ty.text),
            Expr::Paren(inner) => write!(f, "({inner})"),
            Expr::Index { target, index } => {
                write!(f, "{target}[")?;
                write_list(f, index)?;
                write!(f, "]")
            }
            Expr::Member { target, name } => write!(f, "{target}.{name}"),
            Expr::Call { target, name, args } => {
                if let Some(target) = target {
                    write!(f, "{target}.")?;
                }
                write!(f, "{name}(")?;
                write_list(f, args)?;
                write!(f, ")")
            }
            Expr::Operation { operands, .. } => {
                for (i, operand) in operands.iter().enumerate() {
                    if i > 0 {
                        write!(f, " op ")?;
                    }
                    write!(f, "{operand}")?;
                }
                Ok(())
            }
            Expr::Other(_) => write!(f, "<expr>"),
        }
    }
}
