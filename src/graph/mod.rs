//! Call graph: one node per function holding its resolved call sites in
//! source order.

mod builder;
mod builtins;
mod dispatch;
mod resolver;
mod sync_lock;

pub use builder::{GraphBuild, GraphBuilder};

use crate::ids::{FunctionId, LockId};
use crate::model::{LockTable, ProgramModel};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt::{self, Write as _};

/// Resolution of one call site.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GraphEntry {
    /// Every concrete implementation the call may dispatch to. Empty for
    /// calls into library code or calls that could not be resolved.
    Calls { callees: BTreeSet<FunctionId> },
    Acquire { lock: LockId },
    Release { lock: LockId },
    /// Dynamic invocation the analysis cannot see through.
    Opaque,
}

impl GraphEntry {
    pub fn calls(callees: impl IntoIterator<Item = FunctionId>) -> Self {
        GraphEntry::Calls {
            callees: callees.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallGraphNode {
    pub function: FunctionId,
    pub entries: Vec<GraphEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallGraph {
    nodes: Vec<CallGraphNode>,
    thread_entries: Vec<FunctionId>,
}

impl CallGraph {
    pub fn new(nodes: Vec<CallGraphNode>, thread_entries: Vec<FunctionId>) -> Self {
        Self {
            nodes,
            thread_entries,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, function: FunctionId) -> Option<&CallGraphNode> {
        self.nodes.get(function.index())
    }

    pub fn nodes(&self) -> &[CallGraphNode] {
        &self.nodes
    }

    pub fn entries(&self, function: FunctionId) -> &[GraphEntry] {
        self.node(function)
            .map(|node| node.entries.as_slice())
            .unwrap_or(&[])
    }

    /// Runnable methods, traversed as additional roots.
    pub fn thread_entries(&self) -> &[FunctionId] {
        &self.thread_entries
    }

    pub fn callees(&self, function: FunctionId) -> BTreeSet<FunctionId> {
        self.entries(function)
            .iter()
            .filter_map(|entry| match entry {
                GraphEntry::Calls { callees } => Some(callees.iter().copied()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// Every caller → callee pair in the graph.
    pub fn edge_set(&self) -> BTreeSet<(FunctionId, FunctionId)> {
        self.nodes
            .iter()
            .flat_map(|node| {
                self.callees(node.function)
                    .into_iter()
                    .map(move |callee| (node.function, callee))
            })
            .collect()
    }

    /// Readable listing of every node, for `--dump-graph`.
    pub fn dump(&self, model: &ProgramModel, locks: &LockTable) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            let _ = writeln!(out, "{}", model.function_label(node.function));
            for entry in &node.entries {
                let _ = writeln!(out, "    {}", EntryDisplay { entry, model, locks });
            }
        }
        out
    }
}

struct EntryDisplay<'a> {
    entry: &'a GraphEntry,
    model: &'a ProgramModel,
    locks: &'a LockTable,
}

impl fmt::Display for EntryDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lock_name = |lock: &LockId| {
            self.locks
                .name_of(*lock)
                .map(str::to_string)
                .unwrap_or_else(|| lock.to_string())
        };
        match self.entry {
            GraphEntry::Calls { callees } if callees.is_empty() => write!(f, "call -> (external)"),
            GraphEntry::Calls { callees } => {
                let names: Vec<String> = callees
                    .iter()
                    .map(|callee| self.model.function_label(*callee))
                    .collect();
                write!(f, "call -> {}", names.join(" | "))
            }
            GraphEntry::Acquire { lock } => write!(f, "lock {}", lock_name(lock)),
            GraphEntry::Release { lock } => write!(f, "unlock {}", lock_name(lock)),
            GraphEntry::Opaque => write!(f, "opaque"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// No declaration, built-in rule or heuristic explained the call.
    CouldNotDetermine,
    /// The receiver class has no implementation of the method.
    EmptyMethodNode,
    /// A lock operation on a lock that could not be traced to a declaration.
    UnidentifiedLock,
}

/// Recoverable resolution warning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub function: FunctionId,
    pub expression: String,
}
