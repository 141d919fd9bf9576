//! Builds the call graph from a finished [`ProgramModel`].
//!
//! Functions are resolved in parallel into drafts; monitors are then
//! materialized into the lock table sequentially, in function order, so lock
//! ids do not depend on scheduling.
//!
//! ## Thread Safety
//!
//! - The model and its type registry are only read while drafts are built
//! - The wrapped-value memo is a `DashMap` shared by every worker
//! - The lock table is cloned once and only mutated by the sequential pass

use super::resolver::{Draft, LockTarget, Resolver};
use super::{CallGraph, CallGraphNode, Diagnostic, GraphEntry};
use crate::errors::{ModelError, Result};
use crate::frontend::{LanguageFrontend, LockOperation};
use crate::model::{LockTable, ProgramModel};
use crate::types::TypeId;
use dashmap::DashMap;
use rayon::prelude::*;
use tracing::{debug, info};

/// Everything the graph builder produces.
#[derive(Debug, Clone)]
pub struct GraphBuild {
    pub graph: CallGraph,
    /// Declared locks plus the monitors of synchronized regions.
    pub locks: LockTable,
    pub diagnostics: Vec<Diagnostic>,
}

/// Resolves every recorded call site of a [`ProgramModel`].
///
/// # Example
///
/// ```ignore
/// let frontend = Language::Java.frontend();
/// let build = GraphBuilder::new(&model, frontend.as_ref()).build()?;
/// println!("{}", build.graph.dump(&model, &build.locks));
/// ```
pub struct GraphBuilder<'m> {
    pub(super) model: &'m ProgramModel,
    pub(super) frontend: &'m dyn LanguageFrontend,
    wrapped_memo: DashMap<TypeId, TypeId>,
}

impl<'m> GraphBuilder<'m> {
    pub fn new(model: &'m ProgramModel, frontend: &'m dyn LanguageFrontend) -> Self {
        Self {
            model,
            frontend,
            wrapped_memo: DashMap::new(),
        }
    }

    /// Value type a container or reference wraps, shared across workers.
    pub(super) fn wrapped(&self, ty: TypeId) -> TypeId {
        if let Some(known) = self.wrapped_memo.get(&ty) {
            return *known;
        }
        let wrapped = self.model.registry().wrapped_value(ty);
        self.wrapped_memo.insert(ty, wrapped);
        wrapped
    }

    /// Build one [`CallGraphNode`] per function, in function id order.
    ///
    /// Each node lists its call sites in source order as call edges (every
    /// concrete override the receiver may dispatch to), lock acquire and
    /// release events, or opaque markers. Call sites that cannot be resolved
    /// become empty call edges plus a [`Diagnostic`].
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] when the model references a class, function or
    /// enclosing function that does not exist.
    pub fn build(&self) -> Result<GraphBuild> {
        self.validate()?;

        let drafts: Vec<_> = self
            .model
            .functions()
            .par_iter()
            .map(|function| Resolver::new(self, function).run())
            .collect();

        let mut locks = self.model.locks().clone();
        let declared = locks.len();
        let mut nodes = Vec::with_capacity(drafts.len());
        let mut diagnostics = Vec::new();
        for (function, draft) in self.model.functions().iter().zip(drafts) {
            let entries = draft
                .entries
                .into_iter()
                .map(|entry| self.materialize(entry, &mut locks))
                .collect();
            nodes.push(CallGraphNode {
                function: function.id,
                entries,
            });
            diagnostics.extend(draft.diagnostics);
        }

        let thread_entries = self.model.runnable_functions().map(|f| f.id).collect();
        let graph = CallGraph::new(nodes, thread_entries);
        info!(
            nodes = graph.len(),
            edges = graph.edge_set().len(),
            monitors = locks.len() - declared,
            diagnostics = diagnostics.len(),
            "call graph built"
        );
        Ok(GraphBuild {
            graph,
            locks,
            diagnostics,
        })
    }

    fn materialize(&self, draft: Draft, locks: &mut LockTable) -> GraphEntry {
        let (operation, target) = match draft {
            Draft::Calls(callees) => return GraphEntry::Calls { callees },
            Draft::Opaque => return GraphEntry::Opaque,
            Draft::Lock { operation, target } => (operation, target),
        };
        let lock = match target {
            LockTarget::Declared(id) => locks.canonical(id),
            LockTarget::Monitor { class, segment } => {
                let id = locks.monitor(class, &self.model.class_name(class), &segment);
                debug!(lock = %id, class = %class, segment, "monitor");
                id
            }
        };
        match operation {
            LockOperation::Acquire => GraphEntry::Acquire { lock },
            LockOperation::Release => GraphEntry::Release { lock },
        }
    }

    /// Every id a function or class refers to must exist.
    fn validate(&self) -> std::result::Result<(), ModelError> {
        let model = self.model;
        for function in model.functions() {
            if model.class(function.class).is_none() {
                return Err(ModelError::MissingClass {
                    function: function.name.clone(),
                    class: function.class.index(),
                });
            }
            if let Some(parent) = function.parent {
                if model.function(parent).is_none() {
                    return Err(ModelError::MissingParent {
                        function: model.function_label(function.id),
                        parent: parent.index(),
                    });
                }
            }
        }
        for class in model.classes() {
            if let Some(missing) = class.methods.iter().find(|id| model.function(**id).is_none()) {
                return Err(ModelError::MissingFunction {
                    class: class.qualified_name.clone(),
                    function: missing.index(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;
    use crate::frontend::Language;
    use crate::graph::DiagnosticKind;
    use crate::ids::{ClassId, FunctionId};
    use crate::model::{CompilationUnit, Expr, ModelBuilder, RawClass, RawMethod};
    use pretty_assertions::assert_eq;

    fn model(units: Vec<CompilationUnit>) -> ProgramModel {
        let mut builder = ModelBuilder::new();
        for unit in units {
            builder.ingest(unit);
        }
        builder.finish().unwrap()
    }

    fn build(model: &ProgramModel) -> GraphBuild {
        let frontend = Language::Java.frontend();
        GraphBuilder::new(model, frontend.as_ref()).build().unwrap()
    }

    fn lock_call(lock: &str, method: &str) -> Expr {
        Expr::method(Expr::ident(lock), method, vec![])
    }

    fn shapes() -> CompilationUnit {
        CompilationUnit::new("Shapes.java", "")
            .class(RawClass::interface("Shape").method(RawMethod::new("area").abstract_method()))
            .class(RawClass::new("Circle").extends("Shape").method(RawMethod::new("area")))
            .class(RawClass::new("Square").extends("Shape").method(RawMethod::new("area")))
            .class(
                RawClass::new("Canvas")
                    .field("Shape", "shape")
                    .method(RawMethod::new("paint").call(Expr::method(Expr::ident("shape"), "area", vec![]))),
            )
    }

    #[test]
    fn test_interface_call_fans_out_to_implementations() {
        let model = model(vec![shapes()]);
        let build = build(&model);
        let paint = model.function_by_name("Canvas", "paint").unwrap();
        let circle = model.function_by_name("Circle", "area").unwrap();
        let square = model.function_by_name("Square", "area").unwrap();
        assert_eq!(
            build.graph.entries(paint.id),
            &[GraphEntry::calls([circle.id, square.id])]
        );
        assert!(build.diagnostics.is_empty());
    }

    #[test]
    fn test_declared_lock_operations() {
        let unit = CompilationUnit::new("Bank.java", "").class(
            RawClass::new("Bank")
                .field("ReentrantLock", "a")
                .method(
                    RawMethod::new("transfer")
                        .call(lock_call("a", "lock"))
                        .call(Expr::call("audit", vec![]))
                        .call(lock_call("a", "unlock")),
                )
                .method(RawMethod::new("audit")),
        );
        let model = model(vec![unit]);
        let build = build(&model);
        let lock = build.locks.find("Bank.a").unwrap();
        let audit = model.function_by_name("Bank", "audit").unwrap();
        let transfer = model.function_by_name("Bank", "transfer").unwrap();
        assert_eq!(
            build.graph.entries(transfer.id),
            &[
                GraphEntry::Acquire { lock },
                GraphEntry::calls([audit.id]),
                GraphEntry::Release { lock },
            ]
        );
    }

    #[test]
    fn test_synchronized_regions_on_this_share_a_monitor() {
        let unit = CompilationUnit::new("Counter.java", "").class(
            RawClass::new("Counter")
                .method(
                    RawMethod::new("inc")
                        .call(Expr::sync_lock("this", 0, true))
                        .call(Expr::sync_lock("this", 0, false)),
                )
                .method(
                    RawMethod::new("dec")
                        .call(Expr::sync_lock("this", 1, true))
                        .call(Expr::sync_lock("this", 1, false)),
                ),
        );
        let model = model(vec![unit]);
        let build = build(&model);
        let monitor = build.locks.find("Counter.synchLock_this").unwrap();
        for name in ["inc", "dec"] {
            let function = model.function_by_name("Counter", name).unwrap();
            assert_eq!(
                build.graph.entries(function.id),
                &[
                    GraphEntry::Acquire { lock: monitor },
                    GraphEntry::Release { lock: monitor },
                ]
            );
        }
        assert_eq!(build.locks.len(), model.locks().len() + 1);
    }

    #[test]
    fn test_class_literal_guard_uses_class_monitor() {
        let unit = CompilationUnit::new("Registry.java", "app").class(
            RawClass::new("Registry").method(
                RawMethod::new("register")
                    .call(Expr::sync_lock("Registry.class", 0, true))
                    .call(Expr::sync_lock("Registry.class", 0, false)),
            ),
        );
        let model = model(vec![unit]);
        let build = build(&model);
        assert!(build.locks.find("app.Registry.synchLock_class").is_some());
    }

    #[test]
    fn test_script_receiver_is_opaque() {
        let unit = CompilationUnit::new("Plugin.java", "").class(
            RawClass::new("Plugin").field("ScriptEngine", "engine").method(
                RawMethod::new("run").call(Expr::method(
                    Expr::ident("engine"),
                    "eval",
                    vec![Expr::ident("code")],
                )),
            ),
        );
        let model = model(vec![unit]);
        let build = build(&model);
        let run = model.function_by_name("Plugin", "run").unwrap();
        assert_eq!(build.graph.entries(run.id), &[GraphEntry::Opaque]);
    }

    #[test]
    fn test_unresolved_call_is_diagnosed_and_kept() {
        let unit = CompilationUnit::new("Lost.java", "").class(
            RawClass::new("Lost")
                .method(RawMethod::new("run").call(Expr::method(Expr::ident("nobody"), "work", vec![]))),
        );
        let model = model(vec![unit]);
        let build = build(&model);
        let run = model.function_by_name("Lost", "run").unwrap();
        assert_eq!(build.graph.entries(run.id), &[GraphEntry::calls([])]);
        assert_eq!(build.diagnostics.len(), 1);
        assert_eq!(build.diagnostics[0].kind, DiagnosticKind::CouldNotDetermine);
        assert_eq!(build.diagnostics[0].function, run.id);
    }

    #[test]
    fn test_one_entry_per_invocation() {
        let inner = Expr::method(Expr::ident("shape"), "area", vec![]);
        let outer = Expr::method(
            Expr::ident("shape"),
            "area",
            vec![inner, Expr::new_object("Circle", vec![])],
        );
        let unit = shapes().class(
            RawClass::new("Nested")
                .field("Shape", "shape")
                .method(RawMethod::new("run").call(outer.clone())),
        );
        let model = model(vec![unit]);
        let build = build(&model);
        let run = model.function_by_name("Nested", "run").unwrap();
        assert_eq!(build.graph.entries(run.id).len(), outer.invocation_count());
    }

    #[test]
    fn test_build_is_deterministic() {
        let model = model(vec![shapes()]);
        let first = build(&model);
        let second = build(&model);
        assert_eq!(first.graph, second.graph);
        assert_eq!(first.graph.edge_set(), second.graph.edge_set());
    }

    #[test]
    fn test_missing_class_is_a_model_error() {
        let mut model = model(vec![shapes()]);
        model.functions[0].class = ClassId(99);
        let frontend = Language::Java.frontend();
        let err = GraphBuilder::new(&model, frontend.as_ref()).build().unwrap_err();
        assert!(matches!(
            err,
            Error::Model(ModelError::MissingClass { class: 99, .. })
        ));
    }

    #[test]
    fn test_missing_function_is_a_model_error() {
        let mut model = model(vec![shapes()]);
        model.classes[0].methods.push(FunctionId(500));
        let frontend = Language::Java.frontend();
        let err = GraphBuilder::new(&model, frontend.as_ref()).build().unwrap_err();
        assert!(matches!(
            err,
            Error::Model(ModelError::MissingFunction { function: 500, .. })
        ));
    }
}
