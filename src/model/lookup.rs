//! Name lookups over the program model: classes, fields, locals and locks.

use super::class::ImportTarget;
use super::ProgramModel;
use crate::ids::{ClassId, FunctionId, LockId};
use crate::types::{TypeId, TypeKey};

/// Strip generic arguments and array suffixes from a type reference.
fn bare_name(name: &str) -> &str {
    let name = name.split('<').next().unwrap_or(name);
    name.trim_end_matches("[]").trim()
}

impl ProgramModel {
    /// `class` followed by its enclosing classes, innermost first.
    pub fn outer_chain(&self, class: ClassId) -> impl Iterator<Item = ClassId> + '_ {
        std::iter::successors(Some(class), move |current| {
            self.class(*current).and_then(|c| c.outer)
        })
    }

    /// `class` followed by its flattened ancestors.
    pub fn self_and_ancestors(&self, class: ClassId) -> impl Iterator<Item = ClassId> + '_ {
        std::iter::once(class).chain(
            self.class(class)
                .map(|c| c.ancestors.clone())
                .unwrap_or_default(),
        )
    }

    pub fn top_level(&self, class: ClassId) -> ClassId {
        self.outer_chain(class).last().unwrap_or(class)
    }

    /// Nested class `name` declared in `class` or inherited from an ancestor.
    pub fn nested_class(&self, class: ClassId, name: &str) -> Option<ClassId> {
        self.self_and_ancestors(class).find_map(|owner| {
            self.class(owner)?
                .nested
                .iter()
                .copied()
                .find(|nested| self.class(*nested).is_some_and(|n| n.name == name))
        })
    }

    /// Locate a class by simple or qualified name as seen from `from`.
    pub fn locate_class(&self, name: &str, from: Option<ClassId>) -> Option<ClassId> {
        let name = bare_name(name);
        if name.is_empty() {
            return None;
        }
        if let Some(id) = self.by_qualified.get(name) {
            return Some(*id);
        }

        match name.split_once('.') {
            Some((head, rest)) => {
                if let Some(mut current) = self.locate_simple(head, from) {
                    let mut found = true;
                    for segment in rest.split('.') {
                        match self.nested_class(current, segment) {
                            Some(next) => current = next,
                            None => {
                                found = false;
                                break;
                            }
                        }
                    }
                    if found {
                        return Some(current);
                    }
                }
                let from_class = from.and_then(|id| self.class(id))?;
                if from_class.package.is_empty() {
                    return None;
                }
                self.by_qualified
                    .get(&format!("{}.{}", from_class.package, name))
                    .copied()
            }
            None => self.locate_simple(name, from),
        }
    }

    fn locate_simple(&self, name: &str, from: Option<ClassId>) -> Option<ClassId> {
        if let Some(from) = from {
            for scope in self.outer_chain(from) {
                let class = self.class(scope)?;
                if class.name == name {
                    return Some(scope);
                }
                if let Some(nested) = self.nested_class(scope, name) {
                    return Some(nested);
                }
            }

            let origin = self.class(from)?;
            if let Some(imports) = self.unit_imports.get(origin.unit) {
                for import in imports {
                    match &import.target {
                        ImportTarget::Class(id)
                            if self.class(*id).is_some_and(|c| c.name == name) =>
                        {
                            return Some(*id);
                        }
                        _ => {}
                    }
                }
                let qualified = if origin.package.is_empty() {
                    name.to_string()
                } else {
                    format!("{}.{}", origin.package, name)
                };
                if let Some(id) = self.by_qualified.get(&qualified) {
                    return Some(*id);
                }
                for import in imports {
                    match &import.target {
                        ImportTarget::Package(package) => {
                            if let Some(id) = self.by_qualified.get(&format!("{package}.{name}")) {
                                return Some(*id);
                            }
                        }
                        ImportTarget::Members(owner) => {
                            if let Some(id) = self.nested_class(*owner, name) {
                                return Some(id);
                            }
                        }
                        _ => {}
                    }
                }
            }
        }

        let candidates = self.by_simple.get(name)?;
        if candidates.len() > 1 {
            tracing::debug!(name, count = candidates.len(), "ambiguous class name, using first");
        }
        candidates.first().copied()
    }

    /// Field `name` visible from `class`: own fields, ancestors depth-first,
    /// then the enclosing classes the same way.
    pub fn lookup_field(&self, class: ClassId, name: &str) -> Option<(ClassId, TypeId)> {
        self.outer_chain(class).find_map(|scope| self.member_field(scope, name))
    }

    /// Field of `class` or one of its ancestors, ignoring enclosing classes.
    pub fn member_field(&self, class: ClassId, name: &str) -> Option<(ClassId, TypeId)> {
        self.self_and_ancestors(class).find_map(|owner| {
            self.class(owner)?
                .field_type(name)
                .map(|ty| (owner, ty))
        })
    }

    /// Type of local `name`, walking out through enclosing functions.
    pub fn lookup_local(&self, function: FunctionId, name: &str) -> Option<TypeId> {
        let mut current = Some(function);
        while let Some(id) = current {
            let function = self.function(id)?;
            if let Some(ty) = function.local_type(name) {
                return Some(ty);
            }
            current = function.parent;
        }
        None
    }

    /// Enum owning a constant imported into the unit of `class`.
    pub fn imported_enum_constant(&self, class: ClassId, name: &str) -> Option<ClassId> {
        let unit = self.class(class)?.unit;
        self.unit_imports.get(unit)?.iter().find_map(|import| match &import.target {
            ImportTarget::EnumConstant { owner, name: constant } if constant == name => {
                Some(*owner)
            }
            ImportTarget::Members(owner)
                if self.class(*owner).is_some_and(|c| c.has_enum_constant(name)) =>
            {
                Some(*owner)
            }
            _ => None,
        })
    }

    /// Lock held in field `name` as seen from `class`.
    pub fn field_lock(&self, class: ClassId, name: &str) -> Option<LockId> {
        self.outer_chain(class).find_map(|scope| {
            self.self_and_ancestors(scope).find_map(|owner| {
                let owner = self.class(owner)?;
                self.locks
                    .find(&format!("{}.{}", owner.qualified_name, name))
            })
        })
    }

    /// Masked type for the type parameter `name` visible in `class`.
    pub fn masked_type_named(&self, class: ClassId, name: &str) -> Option<TypeId> {
        self.outer_chain(class).find_map(|scope| {
            let class = self.class(scope)?;
            let index = class.type_params.iter().position(|param| param == name)?;
            self.registry.get(&TypeKey::Masked {
                class: scope,
                index,
            })
        })
    }
}
