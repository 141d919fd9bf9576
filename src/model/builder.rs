//! Two-pass construction of the program model.
//!
//! Ingestion only records raw declarations. [`ModelBuilder::finish`] then
//! resolves every raw type text against the complete set of classes, since a
//! name used in one file may be declared in a file ingested later.

use super::class::{Class, Import, ImportTarget};
use super::function::Function;
use super::inheritance::{flatten_ancestors, InheritanceTree};
use super::raw::{CompilationUnit, RawClass, RawImport, RawMethod, RawVariable};
use super::ProgramModel;
use crate::errors::ModelError;
use crate::ids::{ClassId, FunctionId};
use crate::types::catalog;
use crate::types::{AbstractTypeKind, Elemental, TypeId, TypeKey, TypeRegistry, TypeText};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Accumulates compilation units until the whole program is known.
#[derive(Debug, Default)]
pub struct ModelBuilder {
    units: Vec<CompilationUnit>,
}

struct PendingClass {
    fields: Vec<RawVariable>,
}

struct PendingFunction {
    params: Vec<RawVariable>,
    return_type: Option<String>,
    locals: Vec<RawVariable>,
    is_entry_point: bool,
}

const RUNNABLE_CONTRACTS: &[&str] = &["Runnable", "Thread", "TimerTask"];
const CALLABLE_CONTRACTS: &[&str] = &["Callable"];

impl ModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ingest(&mut self, unit: CompilationUnit) {
        self.units.push(unit);
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// Resolve all raw declarations into a program model.
    pub fn finish(self) -> Result<ProgramModel, ModelError> {
        let mut model = ProgramModel {
            registry: TypeRegistry::new(),
            ..ProgramModel::default()
        };
        let mut pending_classes = Vec::new();
        let mut pending_functions = Vec::new();
        let mut raw_imports = Vec::new();

        for (unit_index, unit) in self.units.into_iter().enumerate() {
            model.unit_paths.push(unit.path);
            raw_imports.push(unit.imports);
            for raw in unit.classes {
                declare_class(
                    &mut model,
                    raw,
                    None,
                    unit_index,
                    &unit.package,
                    &mut pending_classes,
                    &mut pending_functions,
                );
            }
        }

        index_classes(&mut model);
        model.unit_imports = raw_imports
            .iter()
            .map(|imports| resolve_imports(&model, imports))
            .collect();

        for index in 0..model.classes.len() {
            let id = ClassId::from_index(index);
            let type_id = model.registry.register(TypeKey::Class(id));
            let masked: Vec<TypeId> = (0..model.classes[index].type_params.len())
                .map(|position| {
                    model.registry.register(TypeKey::Masked {
                        class: id,
                        index: position,
                    })
                })
                .collect();
            let class = &mut model.classes[index];
            class.type_id = type_id;
            class.masked_types = masked;
        }

        resolve_supertypes(&mut model)?;
        resolve_members(&mut model, &pending_classes, &pending_functions);
        resolve_expression_types(&mut model);
        instantiate_generic_members(&mut model);
        declare_locks(&mut model, &pending_classes, &pending_functions);
        mark_runnables(&mut model, &pending_functions);

        debug!(
            classes = model.classes.len(),
            functions = model.functions.len(),
            types = model.registry.len(),
            locks = model.locks.len(),
            "program model resolved"
        );
        Ok(model)
    }
}

fn declare_class(
    model: &mut ProgramModel,
    raw: RawClass,
    outer: Option<ClassId>,
    unit: usize,
    package: &str,
    pending_classes: &mut Vec<PendingClass>,
    pending_functions: &mut Vec<PendingFunction>,
) -> ClassId {
    let id = ClassId::from_index(model.classes.len());
    let path = match outer.and_then(|outer| model.class(outer)) {
        Some(outer) => format!("{}.{}", outer.qualified_name, raw.name),
        None if package.is_empty() => raw.name.clone(),
        None => format!("{package}.{}", raw.name),
    };

    model.classes.push(Class {
        id,
        name: raw.name,
        qualified_name: path,
        package: package.to_string(),
        kind: raw.kind,
        is_abstract: raw.is_abstract,
        outer,
        unit,
        supertype_names: raw.supertypes,
        supertypes: Vec::new(),
        ancestors: Vec::new(),
        nested: Vec::new(),
        fields: HashMap::new(),
        field_order: Vec::new(),
        methods: Vec::new(),
        type_params: raw.type_params,
        masked_types: Vec::new(),
        enum_constants: raw.enum_constants,
        type_id: TypeId::UNKNOWN,
    });
    pending_classes.push(PendingClass { fields: raw.fields });

    for method in raw.methods {
        declare_function(model, method, id, None, pending_functions);
    }
    for nested in raw.nested {
        let nested_id = declare_class(
            model,
            nested,
            Some(id),
            unit,
            package,
            pending_classes,
            pending_functions,
        );
        model.classes[id.index()].nested.push(nested_id);
    }
    id
}

fn declare_function(
    model: &mut ProgramModel,
    raw: RawMethod,
    class: ClassId,
    parent: Option<FunctionId>,
    pending: &mut Vec<PendingFunction>,
) -> FunctionId {
    let id = FunctionId::from_index(model.functions.len());
    let is_constructor = raw.is_constructor();
    model.functions.push(Function {
        id,
        class,
        name: raw.name,
        params: Vec::new(),
        return_type: TypeId::UNKNOWN,
        locals: HashMap::new(),
        parent,
        is_abstract: raw.is_abstract,
        is_static: raw.is_static,
        is_constructor,
        is_runnable: false,
        type_params: raw.type_params,
        calls: raw.calls,
    });
    pending.push(PendingFunction {
        params: raw.params,
        return_type: raw.return_type,
        locals: raw.locals,
        is_entry_point: raw.is_entry_point,
    });
    model.classes[class.index()].methods.push(id);

    for nested in raw.nested {
        declare_function(model, nested, class, Some(id), pending);
    }
    id
}

fn index_classes(model: &mut ProgramModel) {
    for class in &model.classes {
        if model
            .by_qualified
            .insert(class.qualified_name.clone(), class.id)
            .is_some()
        {
            warn!(class = %class.qualified_name, "class declared twice, keeping the later one");
        }
        model
            .by_simple
            .entry(class.name.clone())
            .or_default()
            .push(class.id);
    }
}

fn resolve_imports(model: &ProgramModel, imports: &[RawImport]) -> Vec<Import> {
    imports
        .iter()
        .map(|import| {
            let exact = model.by_qualified.get(&import.path).copied();
            let target = match (import.is_static, import.wildcard, exact) {
                (_, true, Some(class)) => ImportTarget::Members(class),
                (false, true, None) => ImportTarget::Package(import.path.clone()),
                (false, false, Some(class)) => ImportTarget::Class(class),
                (true, false, _) => {
                    let owner = import
                        .path
                        .rsplit_once('.')
                        .and_then(|(owner, member)| {
                            Some((*model.by_qualified.get(owner)?, member.to_string()))
                        });
                    match (owner, exact) {
                        (_, Some(class)) => ImportTarget::Class(class),
                        (Some((owner, member)), None)
                            if model
                                .class(owner)
                                .is_some_and(|c| c.has_enum_constant(&member)) =>
                        {
                            ImportTarget::EnumConstant {
                                owner,
                                name: member,
                            }
                        }
                        _ => ImportTarget::Unresolved,
                    }
                }
                _ => ImportTarget::Unresolved,
            };
            Import {
                path: import.path.clone(),
                target,
            }
        })
        .collect()
}

fn resolve_supertypes(model: &mut ProgramModel) -> Result<(), ModelError> {
    let supertypes: Vec<Vec<ClassId>> = model
        .classes
        .iter()
        .map(|class| {
            let mut resolved = Vec::new();
            for name in &class.supertype_names {
                match model.locate_class(name, Some(class.id)) {
                    Some(sup) if sup != class.id && !resolved.contains(&sup) => resolved.push(sup),
                    Some(_) => {}
                    None => debug!(class = %class.qualified_name, supertype = %name, "library supertype"),
                }
            }
            resolved
        })
        .collect();

    let ancestors = flatten_ancestors(&supertypes, &|id| model.class_name(id))?;
    model.inheritance = InheritanceTree::build(&supertypes);
    for ((class, supers), ancestors) in model.classes.iter_mut().zip(supertypes).zip(ancestors) {
        class.supertypes = supers;
        class.ancestors = ancestors;
    }
    Ok(())
}

/// Resolves raw type text to registered ids.
struct TypeResolver<'a> {
    model: &'a ProgramModel,
    registry: &'a mut TypeRegistry,
}

impl TypeResolver<'_> {
    fn resolve(&mut self, text: &str, scope: ClassId, method_params: &[String]) -> TypeId {
        match TypeText::parse(text) {
            Some(parsed) => self.resolve_parsed(&parsed, scope, method_params),
            None => TypeId::UNKNOWN,
        }
    }

    fn resolve_parsed(&mut self, parsed: &TypeText, scope: ClassId, method_params: &[String]) -> TypeId {
        if parsed.array_dims > 0 {
            let element = self.resolve_parsed(&parsed.element(), scope, method_params);
            return self.registry.register(TypeKey::Array(element));
        }
        if parsed.is_void() || parsed.name == "?" {
            return TypeId::UNKNOWN;
        }
        if !parsed.name.contains('.') {
            if method_params.iter().any(|param| *param == parsed.name) {
                return TypeId::UNKNOWN;
            }
            if let Some(masked) = self.masked(scope, &parsed.name) {
                return masked;
            }
        }

        let base = self.resolve_base(&parsed.name, parsed.simple_name(), scope);
        if parsed.args.is_empty() {
            return base;
        }
        let mut components: Vec<TypeId> = parsed
            .args
            .iter()
            .map(|arg| self.resolve_parsed(arg, scope, method_params))
            .collect();
        components.push(base);
        self.registry.register(TypeKey::Compound(components))
    }

    fn resolve_base(&self, name: &str, simple: &str, scope: ClassId) -> TypeId {
        if catalog::is_ignored_name(simple) {
            return self.registry.lookup_name(simple).unwrap_or(TypeId::UNKNOWN);
        }
        match catalog::abstract_kind(simple) {
            AbstractTypeKind::Lock => return self.registry.elemental(Elemental::Lock),
            AbstractTypeKind::Script => return self.registry.elemental(Elemental::Script),
            _ => {}
        }
        if let Some(class) = self.model.locate_class(name, Some(scope)) {
            return self
                .registry
                .class_type(class)
                .unwrap_or(TypeId::UNKNOWN);
        }
        self.registry.lookup_name(simple).unwrap_or(TypeId::UNKNOWN)
    }

    fn masked(&self, scope: ClassId, name: &str) -> Option<TypeId> {
        self.model.outer_chain(scope).find_map(|owner| {
            let class = self.model.class(owner)?;
            let index = class.type_params.iter().position(|param| param == name)?;
            self.registry.get(&TypeKey::Masked {
                class: owner,
                index,
            })
        })
    }
}

fn resolve_members(
    model: &mut ProgramModel,
    pending_classes: &[PendingClass],
    pending_functions: &[PendingFunction],
) {
    let mut registry = std::mem::take(&mut model.registry);

    let mut field_types = Vec::with_capacity(pending_classes.len());
    for (index, pending) in pending_classes.iter().enumerate() {
        let mut resolver = TypeResolver {
            model,
            registry: &mut registry,
        };
        let scope = ClassId::from_index(index);
        let fields: Vec<(String, TypeId)> = pending
            .fields
            .iter()
            .map(|field| (field.name.clone(), resolver.resolve(&field.type_text, scope, &[])))
            .collect();
        field_types.push(fields);
    }

    let mut signatures = Vec::with_capacity(pending_functions.len());
    for (index, pending) in pending_functions.iter().enumerate() {
        let function = &model.functions[index];
        let scope = function.class;
        let method_params = function.type_params.clone();
        let class_type = model
            .class(scope)
            .map(|class| class.type_id)
            .unwrap_or(TypeId::UNKNOWN);
        let mut resolver = TypeResolver {
            model,
            registry: &mut registry,
        };
        let params: Vec<(String, TypeId)> = pending
            .params
            .iter()
            .map(|param| (param.name.clone(), resolver.resolve(&param.type_text, scope, &method_params)))
            .collect();
        let locals: Vec<(String, TypeId)> = pending
            .locals
            .iter()
            .map(|local| (local.name.clone(), resolver.resolve(&local.type_text, scope, &method_params)))
            .collect();
        let return_type = match &pending.return_type {
            Some(text) => resolver.resolve(text, scope, &method_params),
            None => class_type,
        };
        signatures.push((params, locals, return_type));
    }

    for (class, fields) in model.classes.iter_mut().zip(field_types) {
        for (name, ty) in fields {
            if class.fields.insert(name.clone(), ty).is_none() {
                class.field_order.push(name);
            }
        }
    }
    for (function, (params, locals, return_type)) in model.functions.iter_mut().zip(signatures) {
        for (name, ty) in params {
            function.params.push(ty);
            function.bind_local(&name, ty);
        }
        for (name, ty) in locals {
            function.bind_local(&name, ty);
        }
        function.return_type = return_type;
    }

    model.registry = registry;
}

fn resolve_expression_types(model: &mut ProgramModel) {
    let mut registry = std::mem::take(&mut model.registry);
    for index in 0..model.functions.len() {
        let mut calls = std::mem::take(&mut model.functions[index].calls);
        let scope = model.functions[index].class;
        let method_params = model.functions[index].type_params.clone();
        let mut resolver = TypeResolver {
            model,
            registry: &mut registry,
        };
        for call in &mut calls {
            call.visit_type_names_mut(&mut |name| {
                name.resolved = Some(resolver.resolve(&name.text, scope, &method_params));
            });
        }
        model.functions[index].calls = calls;
    }
    model.registry = registry;
}

/// Register member types of generic classes as seen through every
/// instantiation in the registry (`Box<String>.value` is a `String`).
fn instantiate_generic_members(model: &mut ProgramModel) {
    let mut registry = std::mem::take(&mut model.registry);
    let instantiations: Vec<(ClassId, Vec<TypeId>)> = (0..registry.len())
        .filter_map(|index| {
            let (base, args) = registry.components(TypeId(index as u32))?.split_last()?;
            Some((registry.class_of(*base)?, args.to_vec()))
        })
        .collect();

    for (class, args) in instantiations {
        let Some(generic) = model.class(class) else {
            continue;
        };
        let member_types: Vec<TypeId> = generic
            .fields
            .values()
            .copied()
            .chain(
                generic
                    .methods
                    .iter()
                    .filter_map(|id| model.function(*id))
                    .map(|function| function.return_type),
            )
            .collect();
        for ty in member_types {
            registry.instantiate(ty, class, &args);
        }
    }
    model.registry = registry;
}

/// Simple type name of a declaration if it holds a lock.
fn lock_type_name(model: &ProgramModel, scope: ClassId, type_text: &str) -> Option<String> {
    let parsed = TypeText::parse(type_text)?;
    let simple = parsed.simple_name();
    if parsed.array_dims > 0 || model.locate_class(&parsed.name, Some(scope)).is_some() {
        return None;
    }
    catalog::is_lock_type_name(simple).then(|| simple.to_string())
}

fn declare_locks(
    model: &mut ProgramModel,
    pending_classes: &[PendingClass],
    pending_functions: &[PendingFunction],
) {
    let mut declarations = Vec::new();
    for (index, pending) in pending_classes.iter().enumerate() {
        let class = ClassId::from_index(index);
        for field in &pending.fields {
            if let Some(type_name) = lock_type_name(model, class, &field.type_text) {
                declarations.push((class, field, type_name));
            }
        }
    }
    for (index, pending) in pending_functions.iter().enumerate() {
        let class = model.functions[index].class;
        for local in &pending.locals {
            if let Some(type_name) = lock_type_name(model, class, &local.type_text) {
                declarations.push((class, local, type_name));
            }
        }
    }

    for (class, variable, type_name) in declarations {
        let class_name = model.class_name(class);
        model.locks.declare(
            class,
            &class_name,
            &variable.name,
            &type_name,
            variable.initializer.as_ref(),
        );
    }
    for view in model.locks.unpaired_views() {
        warn!(lock = %view.name, "read/write view without a matching read/write lock");
    }
}

fn implements_any(model: &ProgramModel, class: ClassId, contracts: &[&str]) -> bool {
    model.self_and_ancestors(class).any(|owner| {
        model.class(owner).is_some_and(|class| {
            class.supertype_names.iter().any(|name| {
                let simple = TypeText::parse(name)
                    .map(|parsed| parsed.simple_name().to_string())
                    .unwrap_or_else(|| name.clone());
                contracts.contains(&simple.as_str())
            })
        })
    })
}

fn mark_runnables(model: &mut ProgramModel, pending_functions: &[PendingFunction]) {
    let flags: Vec<bool> = model
        .functions
        .iter()
        .zip(pending_functions)
        .map(|(function, pending)| {
            if pending.is_entry_point {
                return true;
            }
            if !function.params.is_empty() {
                return false;
            }
            match function.name.as_str() {
                "run" => {
                    function.parent.is_some()
                        || implements_any(model, function.class, RUNNABLE_CONTRACTS)
                }
                "call" => implements_any(model, function.class, CALLABLE_CONTRACTS),
                _ => false,
            }
        })
        .collect();
    for (function, runnable) in model.functions.iter_mut().zip(flags) {
        function.is_runnable = runnable;
    }
}
