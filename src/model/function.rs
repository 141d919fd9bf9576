use super::expr::Expr;
use crate::ids::{ClassId, FunctionId};
use crate::types::TypeId;
use std::collections::{BTreeSet, HashMap};
use xxhash_rust::xxh64::xxh64;

/// Hash of a local variable name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalKey(pub u64);

impl LocalKey {
    pub fn of(name: &str) -> Self {
        LocalKey(xxh64(name.as_bytes(), 0))
    }
}

#[derive(Debug, Clone)]
pub struct Function {
    pub id: FunctionId,
    pub class: ClassId,
    pub name: String,
    pub params: Vec<TypeId>,
    pub return_type: TypeId,
    /// Every type assigned to each local name, parameters included.
    pub locals: HashMap<LocalKey, BTreeSet<TypeId>>,
    pub parent: Option<FunctionId>,
    pub is_abstract: bool,
    pub is_static: bool,
    pub is_constructor: bool,
    /// Thread or task entry point.
    pub is_runnable: bool,
    pub type_params: Vec<String>,
    pub calls: Vec<Expr>,
}

impl Function {
    /// Declared type of a local in this scope only. A name bound to more
    /// than one type degrades to unknown.
    pub fn local_type(&self, name: &str) -> Option<TypeId> {
        let types = self.locals.get(&LocalKey::of(name))?;
        match types.len() {
            0 => None,
            1 => types.iter().next().copied(),
            _ => Some(TypeId::UNKNOWN),
        }
    }

    pub fn bind_local(&mut self, name: &str, ty: TypeId) {
        self.locals.entry(LocalKey::of(name)).or_default().insert(ty);
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }
}
