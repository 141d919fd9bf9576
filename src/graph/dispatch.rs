//! Method lookup and virtual dispatch fan-out.
//!
//! Lookup order for a receiver class: its own methods, then its ancestors in
//! declaration order, then the same walk for each enclosing class. When the
//! receiver is an interface or no concrete definition was found, every
//! transitive subclass contributes its effective concrete implementation.

use crate::ids::{ClassId, FunctionId};
use crate::model::{Class, Function, ProgramModel};
use crate::types::{Elemental, TypeId};
use std::collections::BTreeSet;

/// Outcome of resolving one method name against a receiver class.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(super) struct Dispatch {
    /// Concrete implementations the call may reach.
    pub callees: BTreeSet<FunctionId>,
    /// Declaration found by the static lookup, abstract or not.
    pub declared: Option<FunctionId>,
}

impl Dispatch {
    pub fn is_empty(&self) -> bool {
        self.callees.is_empty() && self.declared.is_none()
    }

    /// Functions whose return types describe the call's result.
    pub fn typed_by(&self) -> Vec<FunctionId> {
        if self.callees.is_empty() {
            self.declared.into_iter().collect()
        } else {
            self.callees.iter().copied().collect()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fit {
    /// Name and arity agree.
    Loose,
    /// Every typed argument is compatible with its parameter as well.
    Strict,
}

/// Argument types of a call site. `None` matches any parameter.
pub(super) type ArgTypes = [Option<TypeId>];

fn compatible(model: &ProgramModel, param: TypeId, arg: TypeId) -> bool {
    let registry = model.registry();
    if param == arg
        || param.is_sentinel()
        || registry.is_ignored(param)
        || registry.masked_of(param).is_some()
    {
        return true;
    }
    let base = |ty: TypeId| registry.generic_base(ty).unwrap_or(ty);
    let (param, arg) = (base(param), base(arg));
    if param == arg {
        return true;
    }
    match (registry.class_of(param), registry.class_of(arg)) {
        (Some(expected), Some(given)) => model.self_and_ancestors(given).any(|c| c == expected),
        _ => matches!(
            (registry.elemental_of(param), registry.elemental_of(arg)),
            (Some(Elemental::Float), Some(Elemental::Int)) | (Some(Elemental::Int), Some(Elemental::Char))
        ),
    }
}

fn params_fit(model: &ProgramModel, params: &[TypeId], args: &ArgTypes) -> Option<Fit> {
    let registry = model.registry();
    let variadic = params
        .last()
        .and_then(|last| registry.element_of(*last));
    let arity_matches = params.len() == args.len()
        || (variadic.is_some() && args.len() + 1 >= params.len());
    if !arity_matches {
        return None;
    }

    let strict = args.iter().enumerate().all(|(position, arg)| {
        let Some(arg) = arg else {
            return true;
        };
        match params.get(position) {
            Some(param) if compatible(model, *param, *arg) => true,
            _ => variadic.is_some_and(|element| {
                position + 1 >= params.len() && compatible(model, element, *arg)
            }),
        }
    });
    Some(if strict { Fit::Strict } else { Fit::Loose })
}

/// First strict match, else the first loose one.
fn best<'m>(
    model: &'m ProgramModel,
    candidates: impl Iterator<Item = &'m Function>,
    args: &ArgTypes,
) -> Option<&'m Function> {
    let mut loose = None;
    for candidate in candidates {
        match params_fit(model, &candidate.params, args) {
            Some(Fit::Strict) => return Some(candidate),
            Some(Fit::Loose) if loose.is_none() => loose = Some(candidate),
            _ => {}
        }
    }
    loose
}

/// Methods declared directly in `class`, without local and anonymous-class
/// functions.
fn members<'m>(model: &'m ProgramModel, class: ClassId) -> impl Iterator<Item = &'m Function> {
    model
        .class(class)
        .into_iter()
        .flat_map(|class| class.methods.iter())
        .filter_map(move |id| model.function(*id))
        .filter(|function| function.parent.is_none())
}

pub(super) fn find_in_class<'m>(
    model: &'m ProgramModel,
    class: ClassId,
    name: &str,
    args: &ArgTypes,
) -> Option<&'m Function> {
    best(
        model,
        members(model, class).filter(|f| !f.is_constructor && f.name == name),
        args,
    )
}

fn find_inherited<'m>(
    model: &'m ProgramModel,
    class: ClassId,
    name: &str,
    args: &ArgTypes,
) -> Option<&'m Function> {
    model
        .self_and_ancestors(class)
        .find_map(|owner| find_in_class(model, owner, name, args))
}

/// The implementation an instance of `class` actually runs.
fn concrete_implementation<'m>(
    model: &'m ProgramModel,
    class: ClassId,
    name: &str,
    args: &ArgTypes,
) -> Option<&'m Function> {
    model
        .self_and_ancestors(class)
        .find_map(|owner| find_in_class(model, owner, name, args).filter(|f| !f.is_abstract))
}

/// Resolve `name(args)` called on an instance of `class`.
pub(super) fn resolve(model: &ProgramModel, class: ClassId, name: &str, args: &ArgTypes) -> Dispatch {
    let found = model
        .outer_chain(class)
        .find_map(|scope| find_inherited(model, scope, name, args));

    let mut dispatch = Dispatch {
        declared: found.map(|function| function.id),
        ..Dispatch::default()
    };
    if let Some(function) = found.filter(|function| !function.is_abstract) {
        dispatch.callees.insert(function.id);
    }

    let is_interface = model.class(class).is_some_and(Class::is_interface);
    if is_interface || found.is_none_or(|function| function.is_abstract) {
        for subclass in model.inheritance().transitive_subclasses(class) {
            if let Some(implementation) = concrete_implementation(model, subclass, name, args) {
                dispatch.callees.insert(implementation.id);
            }
        }
    }
    dispatch
}

/// First concrete implementation among the ancestors of `class`, the target
/// of `super.name(args)`.
pub(super) fn resolve_super<'m>(
    model: &'m ProgramModel,
    class: ClassId,
    name: &str,
    args: &ArgTypes,
) -> Option<&'m Function> {
    let ancestors = model.class(class)?.ancestors.clone();
    ancestors
        .into_iter()
        .find_map(|ancestor| find_in_class(model, ancestor, name, args).filter(|f| !f.is_abstract))
}

/// Constructor of `class` matching the arguments of `new C(args)`.
pub(super) fn constructor(model: &ProgramModel, class: ClassId, args: &ArgTypes) -> Option<FunctionId> {
    best(
        model,
        members(model, class).filter(|function| function.is_constructor),
        args,
    )
    .map(|function| function.id)
}

/// Local function visible from `function`: declared in its body or in the
/// body of an enclosing function.
pub(super) fn local_function<'m>(
    model: &'m ProgramModel,
    function: &Function,
    name: &str,
    args: &ArgTypes,
) -> Option<&'m Function> {
    let scopes: Vec<FunctionId> =
        std::iter::successors(Some(function.id), |id| model.function(*id)?.parent).collect();
    let class = model.class(function.class)?;
    best(
        model,
        class
            .methods
            .iter()
            .filter_map(|id| model.function(*id))
            .filter(|candidate| {
                candidate.name == name
                    && candidate.parent.is_some_and(|parent| scopes.contains(&parent))
            }),
        args,
    )
}
