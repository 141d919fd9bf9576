//! Tree-sitter plumbing shared by the Java and C# front ends.

use crate::errors::{Error, Result};
use crate::model::{Expr, LockInitializer, RawMethod, RawVariable};
use std::collections::VecDeque;
use std::path::Path;
use tree_sitter::{Language as TsLanguage, Node, Parser, Tree};

/// Parse `source`, rejecting trees that contain syntax errors.
pub(crate) fn parse_tree(language: &TsLanguage, path: &Path, source: &str) -> Result<Tree> {
    let mut parser = Parser::new();
    parser
        .set_language(language)
        .map_err(|e| Error::Frontend(format!("failed to load grammar: {e}")))?;
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| Error::parse(path, "parser produced no tree"))?;

    if tree.root_node().has_error() {
        let position = first_error(tree.root_node())
            .map(|node| {
                let point = node.start_position();
                format!("syntax error at line {}, column {}", point.row + 1, point.column + 1)
            })
            .unwrap_or_else(|| "syntax error".to_string());
        return Err(Error::parse(path, position));
    }
    Ok(tree)
}

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(|child| child.has_error())
        .find_map(first_error)
}

pub(crate) fn text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

pub(crate) fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

/// Named children plus the `this`/`base` keywords, which the C# grammar
/// emits as anonymous nodes when they stand alone as an expression.
pub(crate) fn operand_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    let children = node
        .children(&mut cursor)
        .filter(|child| child.is_named() || matches!(child.kind(), "this" | "base"))
        .collect();
    children
}

pub(crate) fn field_children<'t>(node: Node<'t>, field: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children_by_field_name(field, &mut cursor).collect()
}

pub(crate) fn child_of_kind<'t>(node: Node<'t>, kinds: &[&str]) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    let found = node
        .children(&mut cursor)
        .find(|child| kinds.contains(&child.kind()));
    found
}

/// Whether any direct child (named or not) is the keyword `kind`.
pub(crate) fn has_token(node: Node<'_>, kind: &str) -> bool {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).any(|child| child.kind() == kind);
    found
}

/// Text of a declared type with declarator array suffixes appended.
pub(crate) fn type_text(ty: Option<Node<'_>>, dimensions: Option<Node<'_>>, source: &str) -> String {
    let mut out = ty.map(|ty| text(ty, source).to_string()).unwrap_or_else(|| "var".to_string());
    if let Some(dimensions) = dimensions {
        out.push_str(text(dimensions, source));
    }
    out
}

/// `reference.method()` initializers, the shape read/write lock views take.
pub(crate) fn lock_initializer(value: &Expr) -> Option<LockInitializer> {
    match value {
        Expr::Call {
            target: Some(target),
            name,
            args,
        } if args.is_empty() => {
            let reference = match &**target {
                Expr::Identifier(name) => name.clone(),
                Expr::Member { target, name } if **target == Expr::This => name.clone(),
                _ => return None,
            };
            Some(LockInitializer {
                reference,
                method: name.clone(),
            })
        }
        _ => None,
    }
}

/// Everything collected while walking one method body.
pub(crate) struct Body<'t> {
    pub locals: Vec<RawVariable>,
    pub calls: Vec<Expr>,
    pub nested: Vec<RawMethod>,
    /// Lambda bodies waiting for the current statement to be recorded.
    pub deferred: VecDeque<Node<'t>>,
    sync_sequence: usize,
}

impl<'t> Body<'t> {
    pub fn new() -> Self {
        Self {
            locals: Vec::new(),
            calls: Vec::new(),
            nested: Vec::new(),
            deferred: VecDeque::new(),
            sync_sequence: 0,
        }
    }

    /// Keep `expr` as a call site if it invokes anything.
    pub fn record(&mut self, expr: Expr) {
        if expr.contains_invocation() {
            self.calls.push(expr);
        }
    }

    pub fn local(&mut self, type_text: impl Into<String>, name: impl Into<String>) {
        self.locals.push(RawVariable::new(type_text, name));
    }

    pub fn defer(&mut self, node: Node<'t>) {
        self.deferred.push_back(node);
    }

    /// Acquire and release call sites for a monitor guarded by `guard`.
    pub fn sync_pair(&mut self, guard: &str) -> (Expr, Expr) {
        let sequence = self.sync_sequence;
        self.sync_sequence += 1;
        (
            Expr::sync_lock(guard, sequence, true),
            Expr::sync_lock(guard, sequence, false),
        )
    }

    /// Single synthetic acquire or release, for `Monitor.Enter`/`Exit`.
    pub fn sync_call(&mut self, guard: &str, acquire: bool) -> Expr {
        let sequence = self.sync_sequence;
        self.sync_sequence += 1;
        Expr::sync_lock(guard, sequence, acquire)
    }

    pub fn into_method(self, mut method: RawMethod) -> RawMethod {
        method.locals.extend(self.locals);
        method.calls.extend(self.calls);
        method.nested.extend(self.nested);
        method
    }
}

/// Guard text as it will be re-parsed: whitespace collapsed.
pub(crate) fn guard_text(node: Node<'_>, source: &str) -> String {
    text(node, source).split_whitespace().collect::<Vec<_>>().join(" ")
}
