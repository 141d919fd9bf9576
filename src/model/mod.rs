//! Program model: classes, functions, locks and the inheritance tree of the
//! whole analyzed program.
//!
//! Front ends emit [`CompilationUnit`]s; [`ModelBuilder`] resolves them into
//! an immutable [`ProgramModel`] once every unit is known.

pub mod builder;
pub mod class;
pub mod expr;
pub mod function;
pub mod inheritance;
pub mod lock;
mod lookup;
pub mod raw;

pub use builder::ModelBuilder;
pub use class::{Class, Import, ImportTarget};
pub use expr::{Expr, LiteralKind, OperationKind, TypeName, SYNC_LOCK_PREFIX};
pub use function::{Function, LocalKey};
pub use inheritance::InheritanceTree;
pub use lock::{Lock, LockKind, LockTable};
pub use raw::{ClassKind, CompilationUnit, LockInitializer, RawClass, RawImport, RawMethod, RawVariable};

use crate::ids::{ClassId, FunctionId};
use crate::types::TypeRegistry;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::PathBuf;

#[derive(Debug, Clone, Default)]
pub struct ProgramModel {
    pub(crate) classes: Vec<Class>,
    pub(crate) functions: Vec<Function>,
    pub(crate) registry: TypeRegistry,
    pub(crate) locks: LockTable,
    pub(crate) inheritance: InheritanceTree,
    pub(crate) unit_paths: Vec<PathBuf>,
    pub(crate) unit_imports: Vec<Vec<Import>>,
    pub(crate) by_qualified: HashMap<String, ClassId>,
    pub(crate) by_simple: HashMap<String, Vec<ClassId>>,
}

impl ProgramModel {
    pub fn class(&self, id: ClassId) -> Option<&Class> {
        self.classes.get(id.index())
    }

    pub fn function(&self, id: FunctionId) -> Option<&Function> {
        self.functions.get(id.index())
    }

    pub fn classes(&self) -> &[Class] {
        &self.classes
    }

    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn locks(&self) -> &LockTable {
        &self.locks
    }

    pub fn inheritance(&self) -> &InheritanceTree {
        &self.inheritance
    }

    pub fn class_by_name(&self, qualified: &str) -> Option<&Class> {
        self.by_qualified
            .get(qualified)
            .and_then(|id| self.class(*id))
    }

    /// First function of `class` called `name`.
    pub fn function_by_name(&self, class: &str, name: &str) -> Option<&Function> {
        let class = self
            .class_by_name(class)
            .or_else(|| self.by_simple.get(class)?.first().and_then(|id| self.class(*id)))?;
        class
            .methods
            .iter()
            .filter_map(|id| self.function(*id))
            .find(|function| function.name == name)
    }

    pub fn class_name(&self, id: ClassId) -> String {
        self.class(id)
            .map(|class| class.qualified_name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    /// `Class >> method`, the label used in logs and reports.
    pub fn function_label(&self, id: FunctionId) -> String {
        match self.function(id) {
            Some(function) => format!(
                "{} >> {}",
                self.class(function.class)
                    .map(|class| class.name.as_str())
                    .unwrap_or("?"),
                function.name
            ),
            None => id.to_string(),
        }
    }

    pub fn describe_type(&self, ty: crate::types::TypeId) -> String {
        self.registry.describe(ty, &|class| self.class_name(class))
    }

    /// Entry points flagged during resolution.
    pub fn runnable_functions(&self) -> impl Iterator<Item = &Function> {
        self.functions.iter().filter(|function| function.is_runnable)
    }

    /// Registry, class and lock tables for post-mortem inspection.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "== types ({}) ==", self.registry.len());
        out.push_str(&self.registry.dump(&|class| self.class_name(class)));
        let _ = writeln!(out, "== classes ({}) ==", self.classes.len());
        for class in &self.classes {
            let supers: Vec<String> = class
                .supertypes
                .iter()
                .map(|sup| self.class_name(*sup))
                .collect();
            let _ = writeln!(
                out,
                "{:>10} {} {:?} supers=[{}] methods={}",
                class.id.to_string(),
                class.qualified_name,
                class.kind,
                supers.join(", "),
                class.methods.len()
            );
            for field in &class.field_order {
                if let Some(ty) = class.field_type(field) {
                    let _ = writeln!(out, "{:>14} {}: {}", "", field, self.describe_type(ty));
                }
            }
        }
        let _ = writeln!(out, "== locks ({}) ==", self.locks.len());
        out.push_str(&self.locks.dump());
        out
    }
}
