//! Replay of one function's call-site expressions.
//!
//! Every expression shape resolves to a set of types. Each `Call` and `New`
//! node records exactly one [`Draft`] entry, innermost first, so a call used
//! as the receiver or argument of another call is recorded before it.

use super::builder::GraphBuilder;
use super::dispatch::{self, ArgTypes};
use super::{builtins, Diagnostic, DiagnosticKind};
use crate::frontend::LockOperation;
use crate::ids::{ClassId, FunctionId, LockId};
use crate::model::{Expr, Function, OperationKind, ProgramModel, TypeName};
use crate::types::catalog::ReturnSpec;
use crate::types::{AbstractTypeKind, Elemental, TypeId, TypeRegistry};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Lock a lock operation applies to, before monitors are materialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum LockTarget {
    Declared(LockId),
    /// Monitor of `class` guarding regions keyed by `segment`.
    Monitor { class: ClassId, segment: String },
}

/// Graph entry as produced by the parallel resolution pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Draft {
    Calls(BTreeSet<FunctionId>),
    Lock {
        operation: LockOperation,
        target: LockTarget,
    },
    Opaque,
}

#[derive(Debug, Default)]
pub(super) struct FunctionDraft {
    pub entries: Vec<Draft>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(super) struct Resolved {
    pub types: BTreeSet<TypeId>,
    /// The lock held in the value, when it is one.
    pub lock: Option<LockTarget>,
    /// The expression names a type (`Math`, `Color`) rather than a value.
    pub is_type_name: bool,
}

impl Resolved {
    pub fn of(ty: TypeId) -> Self {
        Self {
            types: BTreeSet::from([ty]),
            ..Self::default()
        }
    }

    fn unknown() -> Self {
        Self::of(TypeId::UNKNOWN)
    }

    fn unresolved() -> Self {
        Self::of(TypeId::UNRESOLVED)
    }

    fn type_name(ty: TypeId) -> Self {
        Self {
            is_type_name: true,
            ..Self::of(ty)
        }
    }

    fn holding(ty: TypeId, lock: Option<LockTarget>) -> Self {
        Self {
            lock,
            ..Self::of(ty)
        }
    }

    pub fn single(&self) -> Option<TypeId> {
        match self.types.len() {
            1 => self.types.first().copied(),
            _ => None,
        }
    }

    fn is_unresolved(&self) -> bool {
        self.types.iter().all(|ty| *ty == TypeId::UNRESOLVED)
    }
}

/// Result of calling a method on one receiver type.
enum CallOutcome {
    Resolved {
        callees: BTreeSet<FunctionId>,
        types: BTreeSet<TypeId>,
    },
    Missing(DiagnosticKind),
}

impl CallOutcome {
    fn returns(ty: TypeId) -> Self {
        CallOutcome::Resolved {
            callees: BTreeSet::new(),
            types: BTreeSet::from([ty]),
        }
    }
}

/// Per-function resolution state.
///
/// A resolver only reads the model, so one runs per function on any rayon
/// worker. Plain names are looked up in this order: locals and parameters,
/// fields of the class and its ancestors, imported enum constants, built-in
/// type names, classes in scope, then constants of enclosing enums.
pub(super) struct Resolver<'b, 'm> {
    pub(super) builder: &'b GraphBuilder<'m>,
    pub(super) model: &'m ProgramModel,
    registry: &'m TypeRegistry,
    pub(super) function: &'m Function,
    draft: FunctionDraft,
    /// Cleared while peeking at an expression's type without recording.
    recording: bool,
}

impl<'b, 'm> Resolver<'b, 'm> {
    pub fn new(builder: &'b GraphBuilder<'m>, function: &'m Function) -> Self {
        let model = builder.model;
        Self {
            builder,
            model,
            registry: model.registry(),
            function,
            draft: FunctionDraft::default(),
            recording: true,
        }
    }

    /// Resolve every recorded call site of the function, in source order.
    pub fn run(mut self) -> FunctionDraft {
        let function = self.function;
        for call in &function.calls {
            self.expr(call);
        }
        self.draft
    }

    fn push(&mut self, draft: Draft) {
        if self.recording {
            self.draft.entries.push(draft);
        }
    }

    fn diagnose(&mut self, kind: DiagnosticKind, expr: &Expr) {
        if !self.recording {
            return;
        }
        let label = self.model.function_label(self.function.id);
        match kind {
            DiagnosticKind::CouldNotDetermine => {
                warn!(function = %label, call = %expr, "COULD NOT DETERMINE call target")
            }
            DiagnosticKind::EmptyMethodNode => {
                warn!(function = %label, call = %expr, "EMPTY method node")
            }
            DiagnosticKind::UnidentifiedLock => {
                warn!(function = %label, call = %expr, "lock operation on an unidentified lock")
            }
        }
        self.draft.diagnostics.push(Diagnostic {
            kind,
            function: self.function.id,
            expression: expr.to_string(),
        });
    }

    /// Type of `expr` without recording entries or diagnostics.
    pub(super) fn peek(&mut self, expr: &Expr) -> Resolved {
        let recording = std::mem::replace(&mut self.recording, false);
        let resolved = self.expr(expr);
        self.recording = recording;
        resolved
    }

    fn elemental(&self, elemental: Elemental) -> TypeId {
        self.registry.elemental(elemental)
    }

    fn class_type(&self, class: ClassId) -> TypeId {
        self.model
            .class(class)
            .map(|class| class.type_id)
            .unwrap_or(TypeId::UNKNOWN)
    }

    fn is_lock(&self, ty: TypeId) -> bool {
        self.registry.classify(ty) == AbstractTypeKind::Lock
    }

    /// User class behind a class type or a generic instantiation of one.
    pub(super) fn user_class(&self, ty: TypeId) -> Option<ClassId> {
        self.registry.class_of(ty).or_else(|| {
            self.registry
                .generic_base(ty)
                .and_then(|base| self.registry.class_of(base))
        })
    }

    fn type_args(&self, ty: TypeId) -> &'m [TypeId] {
        self.registry
            .components(ty)
            .and_then(|components| components.split_last())
            .map(|(_, args)| args)
            .unwrap_or(&[])
    }

    /// Member type as seen through the receiver's type arguments.
    fn substitute(&self, member: TypeId, class: ClassId, receiver: TypeId) -> TypeId {
        let args = self.type_args(receiver);
        if args.is_empty() {
            return member;
        }
        self.registry
            .instantiated(member, class, args)
            .unwrap_or(TypeId::UNKNOWN)
    }

    fn from_spec(&self, spec: ReturnSpec, receiver: TypeId) -> TypeId {
        match spec {
            ReturnSpec::Elemental(elemental) => self.elemental(elemental),
            ReturnSpec::SelfType => receiver,
            ReturnSpec::Unknown => TypeId::UNKNOWN,
        }
    }

    pub(super) fn expr(&mut self, expr: &Expr) -> Resolved {
        match expr {
            Expr::Literal(kind) => {
                Resolved::of(self.elemental(self.builder.frontend.literal_type(*kind)))
            }
            Expr::Identifier(name) => self.identifier(name),
            Expr::This => Resolved::of(self.class_type(self.function.class)),
            Expr::Super => {
                let parent = self
                    .model
                    .class(self.function.class)
                    .and_then(|class| class.supertypes.first().copied());
                match parent {
                    Some(parent) => Resolved::of(self.class_type(parent)),
                    None => Resolved::unknown(),
                }
            }
            Expr::ClassLiteral(_) => Resolved::unknown(),
            Expr::New { ty, .. } => self.construct(expr, ty),
            Expr::NewArray { ty, elements } => {
                for element in elements {
                    self.expr(element);
                }
                Resolved::of(ty.resolved.unwrap_or(TypeId::UNKNOWN))
            }
            Expr::Cast { ty, operand } => {
                self.expr(operand);
                Resolved::of(ty.resolved.unwrap_or(TypeId::UNKNOWN))
            }
            Expr::Paren(inner) => self.expr(inner),
            Expr::Index { target, index } => {
                let target = self.expr(target);
                for position in index {
                    self.expr(position);
                }
                if target.is_unresolved() {
                    return Resolved::unresolved();
                }
                let types = target
                    .types
                    .iter()
                    .map(|ty| self.indexed(*ty))
                    .collect();
                Resolved {
                    types,
                    ..Resolved::default()
                }
            }
            Expr::Member { target, name } => self.member(target, name),
            Expr::Call { target, .. } => self.call(expr, target.as_deref()),
            Expr::Operation { kind, operands } => self.operation(*kind, operands),
            Expr::Other(children) => {
                for child in children {
                    self.expr(child);
                }
                Resolved::unknown()
            }
        }
    }

    fn indexed(&self, ty: TypeId) -> TypeId {
        if let Some(element) = self.registry.element_of(ty) {
            return element;
        }
        match self.registry.classify(ty) {
            kind if kind.is_container() => self.builder.wrapped(ty),
            AbstractTypeKind::String => self.elemental(Elemental::Char),
            _ if self.registry.is_elemental(ty, Elemental::String) => self.elemental(Elemental::Char),
            _ => TypeId::UNKNOWN,
        }
    }

    fn operation(&mut self, kind: OperationKind, operands: &[Expr]) -> Resolved {
        let results: Vec<Resolved> = operands.iter().map(|operand| self.expr(operand)).collect();
        match kind {
            OperationKind::Comparison => Resolved::of(self.elemental(Elemental::Bool)),
            OperationKind::Assignment => results.last().cloned().unwrap_or_else(Resolved::unknown),
            OperationKind::Conditional => results.get(1).cloned().unwrap_or_else(Resolved::unknown),
            OperationKind::Arithmetic => {
                let string = self.elemental(Elemental::String);
                if results.iter().any(|result| result.types.contains(&string)) {
                    Resolved::of(string)
                } else {
                    results
                        .into_iter()
                        .next()
                        .map(|first| Resolved {
                            lock: None,
                            ..first
                        })
                        .unwrap_or_else(Resolved::unknown)
                }
            }
        }
    }

    fn identifier(&mut self, name: &str) -> Resolved {
        if let Some(guard) = Expr::sync_lock_guard(name) {
            let target = self.sync_monitor(guard);
            return Resolved::holding(self.elemental(Elemental::Lock), Some(target));
        }

        let class = self.function.class;
        if let Some(ty) = self.model.lookup_local(self.function.id, name) {
            if self.is_lock(ty) {
                let lock = self
                    .model
                    .locks()
                    .find(&format!("{}.{}", self.model.class_name(class), name))
                    .map(LockTarget::Declared);
                return Resolved::holding(ty, lock);
            }
            return Resolved::of(ty);
        }
        if let Some((_, ty)) = self.model.lookup_field(class, name) {
            if self.is_lock(ty) {
                let lock = self.model.field_lock(class, name).map(LockTarget::Declared);
                return Resolved::holding(ty, lock);
            }
            return Resolved::of(ty);
        }
        if let Some(owner) = self.model.imported_enum_constant(class, name) {
            return Resolved::of(self.class_type(owner));
        }
        if let Some(ty) = self.registry.lookup_name(name) {
            return Resolved::type_name(ty);
        }
        if let Some(found) = self.model.locate_class(name, Some(class)) {
            return Resolved::type_name(self.class_type(found));
        }
        let enclosing_enum = self.model.outer_chain(class).find(|scope| {
            self.model
                .class(*scope)
                .is_some_and(|c| c.has_enum_constant(name))
        });
        match enclosing_enum {
            Some(owner) => Resolved::of(self.class_type(owner)),
            None => Resolved::unresolved(),
        }
    }

    fn member(&mut self, target: &Expr, name: &str) -> Resolved {
        let receiver = self.expr(target);
        if receiver.is_unresolved() {
            return Resolved::unresolved();
        }
        let mut result = Resolved::default();
        for ty in receiver.types.iter().copied() {
            let member = self.member_of(ty, name, receiver.is_type_name);
            result.types.extend(member.types);
            result.is_type_name |= member.is_type_name;
            if result.lock.is_none() {
                result.lock = member.lock;
            }
        }
        result
    }

    fn member_of(&self, ty: TypeId, name: &str, static_receiver: bool) -> Resolved {
        if ty == TypeId::UNRESOLVED || self.registry.is_ignored(ty) {
            return Resolved::unknown();
        }
        if self.registry.element_of(ty).is_some() {
            return match name {
                "length" | "Length" => Resolved::of(self.elemental(Elemental::Int)),
                _ => Resolved::unknown(),
            };
        }
        if let Some(class) = self.user_class(ty) {
            return self.class_member(ty, class, name, static_receiver);
        }
        if let Some(reflected) = self.registry.reflected(ty) {
            return Resolved::of(self.from_spec(reflected.return_of(name), ty));
        }
        match (self.registry.classify(ty), name) {
            (kind, "size" | "length" | "Count" | "Length") if kind.is_container() => {
                Resolved::of(self.elemental(Elemental::Int))
            }
            _ => Resolved::unknown(),
        }
    }

    fn class_member(&self, ty: TypeId, class: ClassId, name: &str, static_receiver: bool) -> Resolved {
        let Some(info) = self.model.class(class) else {
            return Resolved::unknown();
        };
        if name == "this" {
            return Resolved::of(ty);
        }
        if info.is_enum() {
            if name == "length" {
                return Resolved::of(self.elemental(Elemental::Int));
            }
            if info.has_enum_constant(name) {
                return Resolved::of(ty);
            }
        }
        if let Some((owner, field)) = self.model.member_field(class, name) {
            if self.is_lock(field) {
                let lock = self.model.field_lock(class, name).map(LockTarget::Declared);
                return Resolved::holding(field, lock);
            }
            return Resolved::of(self.substitute(field, owner, ty));
        }
        if let Some(nested) = self.model.nested_class(class, name) {
            return Resolved::type_name(self.class_type(nested));
        }
        if static_receiver {
            debug!(class = %info.qualified_name, member = name, "unknown static member");
        }
        Resolved::unknown()
    }

    /// Argument types; anything not narrowed to one tracked type matches any
    /// parameter.
    fn arguments(&mut self, args: &[Expr]) -> Vec<Option<TypeId>> {
        args.iter()
            .map(|arg| {
                let resolved = self.expr(arg);
                resolved.single().filter(|ty| {
                    !ty.is_sentinel()
                        && !self.registry.is_ignored(*ty)
                        && !self.registry.is_elemental(*ty, Elemental::Null)
                })
            })
            .collect()
    }

    fn construct(&mut self, expr: &Expr, ty: &TypeName) -> Resolved {
        let frontend = self.builder.frontend;
        let arg_types = self.arguments(frontend.argument_list(expr));
        let ty = ty.resolved.unwrap_or(TypeId::UNKNOWN);
        let callees = self
            .user_class(ty)
            .and_then(|class| dispatch::constructor(self.model, class, &arg_types))
            .into_iter()
            .collect();
        self.push(Draft::Calls(callees));
        Resolved::of(ty)
    }

    fn call(&mut self, expr: &Expr, target: Option<&Expr>) -> Resolved {
        let frontend = self.builder.frontend;
        let name = frontend.method_name(expr).unwrap_or_default();
        let args = frontend.argument_list(expr);

        let receiver = match target {
            None => None,
            Some(Expr::Super) => {
                let arg_types = self.arguments(args);
                return self.super_call(name, &arg_types);
            }
            Some(target) => Some(self.expr(target)),
        };

        if let Some(receiver) = &receiver {
            if receiver.types.iter().any(|ty| self.is_lock(*ty)) {
                self.arguments(args);
                return self.lock_call(expr, name, receiver.lock.clone());
            }
            let scripted = receiver
                .types
                .iter()
                .any(|ty| self.registry.classify(*ty) == AbstractTypeKind::Script);
            if scripted {
                self.arguments(args);
                self.push(Draft::Opaque);
                return Resolved::unknown();
            }
        }

        let arg_types = self.arguments(args);
        match receiver {
            None => self.unqualified_call(expr, name, &arg_types),
            Some(receiver) if receiver.is_unresolved() => {
                self.fallback(expr, name, None, DiagnosticKind::CouldNotDetermine)
            }
            Some(receiver) => self.typed_call(expr, name, &arg_types, &receiver),
        }
    }

    fn lock_call(&mut self, expr: &Expr, name: &str, lock: Option<LockTarget>) -> Resolved {
        let lock_type = self.elemental(Elemental::Lock);
        let is_view_accessor = matches!(name, "readLock" | "writeLock");
        let Some(target) = lock else {
            self.diagnose(DiagnosticKind::UnidentifiedLock, expr);
            self.push(Draft::Calls(BTreeSet::new()));
            return if is_view_accessor {
                Resolved::of(lock_type)
            } else {
                Resolved::of(self.elemental(Elemental::Bool))
            };
        };

        let frontend = self.builder.frontend;
        let operation = match &target {
            LockTarget::Monitor { .. } => Some(if frontend.is_unlock_call(&expr.to_string()) {
                LockOperation::Release
            } else {
                LockOperation::Acquire
            }),
            LockTarget::Declared(_) => frontend.lock_operation(name),
        };
        match operation {
            Some(operation) => {
                self.push(Draft::Lock { operation, target });
                Resolved::of(self.elemental(Elemental::Bool))
            }
            None if is_view_accessor => {
                self.push(Draft::Calls(BTreeSet::new()));
                Resolved::holding(lock_type, Some(target))
            }
            None => {
                self.push(Draft::Calls(BTreeSet::new()));
                Resolved::of(self.elemental(Elemental::Bool))
            }
        }
    }

    fn super_call(&mut self, name: &str, args: &ArgTypes) -> Resolved {
        match dispatch::resolve_super(self.model, self.function.class, name, args) {
            Some(target) => {
                self.push(Draft::Calls(BTreeSet::from([target.id])));
                Resolved::of(target.return_type)
            }
            None => {
                self.push(Draft::Calls(BTreeSet::new()));
                debug!(method = name, "super call into library code");
                Resolved::of(builtins::by_name(self.registry, name, None).unwrap_or(TypeId::UNKNOWN))
            }
        }
    }

    fn unqualified_call(&mut self, expr: &Expr, name: &str, args: &ArgTypes) -> Resolved {
        if let Some(local) = dispatch::local_function(self.model, self.function, name, args) {
            self.push(Draft::Calls(BTreeSet::from([local.id])));
            return Resolved::of(local.return_type);
        }
        let found = dispatch::resolve(self.model, self.function.class, name, args);
        if found.is_empty() {
            return self.fallback(expr, name, None, DiagnosticKind::EmptyMethodNode);
        }
        let types = found
            .typed_by()
            .into_iter()
            .filter_map(|id| self.model.function(id))
            .map(|function| function.return_type)
            .collect();
        self.push(Draft::Calls(found.callees));
        Resolved {
            types,
            ..Resolved::default()
        }
    }

    fn typed_call(&mut self, expr: &Expr, name: &str, args: &ArgTypes, receiver: &Resolved) -> Resolved {
        let mut callees = BTreeSet::new();
        let mut types = BTreeSet::new();
        let mut missing = None;
        for ty in receiver.types.iter().copied() {
            if ty == TypeId::UNRESOLVED {
                continue;
            }
            match self.call_on(ty, name, args) {
                CallOutcome::Resolved {
                    callees: found,
                    types: returns,
                } => {
                    callees.extend(found);
                    types.extend(returns);
                }
                CallOutcome::Missing(kind) => {
                    missing.get_or_insert(kind);
                }
            }
        }

        match missing {
            Some(kind) if types.is_empty() => self.fallback(expr, name, receiver.single(), kind),
            _ => {
                self.push(Draft::Calls(callees));
                Resolved {
                    types,
                    ..Resolved::default()
                }
            }
        }
    }

    fn call_on(&self, ty: TypeId, name: &str, args: &ArgTypes) -> CallOutcome {
        let registry = self.registry;
        let by_name = || builtins::by_name(registry, name, Some(ty)).unwrap_or(TypeId::UNKNOWN);

        if registry.is_ignored(ty) || registry.masked_of(ty).is_some() {
            return CallOutcome::returns(by_name());
        }
        if let Some(class) = self.user_class(ty) {
            return self.call_on_class(ty, class, name, args);
        }
        if let Some(reflected) = registry.reflected(ty) {
            let ret = match name {
                "toString" | "ToString" => self.elemental(Elemental::String),
                _ => self.from_spec(reflected.return_of(name), ty),
            };
            return CallOutcome::returns(ret);
        }

        let kind = registry.classify(ty);
        if kind.is_container() {
            let ret = match name {
                "size" | "Count" | "count" | "length" | "indexOf" | "IndexOf" => {
                    self.elemental(Elemental::Int)
                }
                "isEmpty" | "contains" | "containsKey" | "containsValue" | "Contains"
                | "ContainsKey" | "ContainsValue" | "TryGetValue" | "TryAdd" => {
                    self.elemental(Elemental::Bool)
                }
                "entrySet" => registry.object_set(),
                "add" | "addAll" | "put" | "putAll" | "clear" | "removeAll" | "retainAll"
                | "Add" | "AddRange" | "Clear" | "Insert" | "Enqueue" | "Push" | "keySet"
                | "Keys" | "values" | "Values" | "stream" | "iterator" | "forEach" => {
                    TypeId::UNKNOWN
                }
                _ => self.builder.wrapped(ty),
            };
            return CallOutcome::returns(ret);
        }
        if kind == AbstractTypeKind::Reference {
            let ret = match name {
                "get" | "Value" | "getValue" | "join" | "Result" | "orElse" | "GetValueOrDefault" => {
                    self.builder.wrapped(ty)
                }
                _ => by_name(),
            };
            return CallOutcome::returns(ret);
        }
        if registry.element_of(ty).is_some() || registry.elemental_of(ty).is_some() {
            return CallOutcome::returns(by_name());
        }
        CallOutcome::Missing(DiagnosticKind::CouldNotDetermine)
    }

    fn call_on_class(&self, ty: TypeId, class: ClassId, name: &str, args: &ArgTypes) -> CallOutcome {
        if self.model.class(class).is_some_and(|c| c.is_enum()) {
            let special = match name {
                "values" | "GetValues" => Some(TypeId::UNKNOWN),
                "ordinal" => Some(self.elemental(Elemental::Int)),
                "name" => Some(self.elemental(Elemental::String)),
                "equals" | "Equals" => Some(self.elemental(Elemental::Bool)),
                "valueOf" => Some(ty),
                _ => None,
            };
            if let Some(ret) = special {
                return CallOutcome::returns(ret);
            }
        }

        let found = dispatch::resolve(self.model, class, name, args);
        if found.is_empty() {
            return CallOutcome::Missing(DiagnosticKind::EmptyMethodNode);
        }
        let types = found
            .typed_by()
            .into_iter()
            .filter_map(|id| self.model.function(id))
            .map(|function| self.substitute(function.return_type, function.class, ty))
            .collect();
        CallOutcome::Resolved {
            callees: found.callees,
            types,
        }
    }

    /// Name and utility-class heuristics, then a warning.
    fn fallback(&mut self, expr: &Expr, name: &str, receiver: Option<TypeId>, kind: DiagnosticKind) -> Resolved {
        self.push(Draft::Calls(BTreeSet::new()));
        if let Some(ty) = builtins::by_name(self.registry, name, receiver) {
            return Resolved::of(ty);
        }
        if let Some(ty) = expr
            .root_identifier()
            .and_then(|root| builtins::utility(self.registry, root, name))
        {
            return Resolved::of(ty);
        }
        self.diagnose(kind, expr);
        Resolved::unknown()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::Language;
    use crate::model::{CompilationUnit, ModelBuilder, RawClass, RawMethod};
    use pretty_assertions::assert_eq;

    fn model(unit: CompilationUnit) -> ProgramModel {
        let mut builder = ModelBuilder::new();
        builder.ingest(unit);
        builder.finish().unwrap()
    }

    fn resolve_in(model: &ProgramModel, class: &str, method: &str, expr: &Expr) -> (Resolved, FunctionDraft) {
        let frontend = Language::Java.frontend();
        let builder = GraphBuilder::new(model, frontend.as_ref());
        let function = model.function_by_name(class, method).unwrap();
        let mut resolver = Resolver::new(&builder, function);
        let resolved = resolver.expr(expr);
        (resolved, resolver.draft)
    }

    #[test]
    fn test_generic_field_access_is_substituted() {
        let model = model(
            CompilationUnit::new("Box.java", "")
                .class(RawClass::new("Box").type_param("T").field("T", "value"))
                .class(
                    RawClass::new("Holder")
                        .field("Box<String>", "box")
                        .method(RawMethod::new("read")),
                ),
        );
        let access = Expr::member(Expr::ident("box"), "value");
        let (resolved, _) = resolve_in(&model, "Holder", "read", &access);
        assert_eq!(
            resolved.single(),
            Some(model.registry().elemental(Elemental::String))
        );
    }

    #[test]
    fn test_identifier_resolution_order() {
        let model = model(
            CompilationUnit::new("Order.java", "").class(
                RawClass::new("Order")
                    .field("int", "total")
                    .method(RawMethod::new("run").local("String", "total")),
            ),
        );
        let registry = model.registry();
        let (local, _) = resolve_in(&model, "Order", "run", &Expr::ident("total"));
        assert_eq!(local.single(), Some(registry.elemental(Elemental::String)));

        let (class, _) = resolve_in(&model, "Order", "run", &Expr::ident("Order"));
        assert!(class.is_type_name);
        let (missing, _) = resolve_in(&model, "Order", "run", &Expr::ident("nowhere"));
        assert_eq!(missing.single(), Some(TypeId::UNRESOLVED));
    }

    #[test]
    fn test_enum_constants_and_specials() {
        let model = model(
            CompilationUnit::new("Color.java", "")
                .class(RawClass::enumeration("Color", &["RED", "GREEN"]))
                .class(RawClass::new("Paint").method(RawMethod::new("mix"))),
        );
        let color = model.class_by_name("Color").unwrap().type_id;
        let red = Expr::member(Expr::ident("Color"), "RED");
        let (resolved, _) = resolve_in(&model, "Paint", "mix", &red);
        assert_eq!(resolved.single(), Some(color));

        let ordinal = Expr::method(red.clone(), "ordinal", vec![]);
        let (resolved, draft) = resolve_in(&model, "Paint", "mix", &ordinal);
        assert_eq!(resolved.single(), Some(model.registry().elemental(Elemental::Int)));
        assert_eq!(draft.entries, vec![Draft::Calls(BTreeSet::new())]);
    }

    #[test]
    fn test_container_accessors_return_wrapped_value() {
        let model = model(
            CompilationUnit::new("Bank.java", "").class(
                RawClass::new("Bank")
                    .field("Map<String, Bank>", "branches")
                    .method(RawMethod::new("find")),
            ),
        );
        let bank = model.class_by_name("Bank").unwrap().type_id;
        let get = Expr::method(Expr::ident("branches"), "get", vec![Expr::ident("key")]);
        let (resolved, _) = resolve_in(&model, "Bank", "find", &get);
        assert_eq!(resolved.single(), Some(bank));

        let size = Expr::method(Expr::ident("branches"), "size", vec![]);
        let (resolved, _) = resolve_in(&model, "Bank", "find", &size);
        assert_eq!(resolved.single(), Some(model.registry().elemental(Elemental::Int)));
    }

    #[test]
    fn test_nested_calls_record_innermost_first() {
        let model = model(
            CompilationUnit::new("Chain.java", "").class(
                RawClass::new("Chain")
                    .method(RawMethod::new("next").returns("Chain"))
                    .method(RawMethod::new("end")),
            ),
        );
        let chain = model.class_by_name("Chain").unwrap();
        let call = Expr::method(Expr::call("next", vec![]), "end", vec![]);
        let (_, draft) = resolve_in(&model, "Chain", "end", &call);
        assert_eq!(
            draft.entries,
            vec![
                Draft::Calls(BTreeSet::from([chain.methods[0]])),
                Draft::Calls(BTreeSet::from([chain.methods[1]])),
            ]
        );
    }

    #[test]
    fn test_utility_calls_are_silent_and_unknown_calls_warn() {
        let model = model(
            CompilationUnit::new("Util.java", "").class(RawClass::new("Util").method(RawMethod::new("run"))),
        );
        let floor = Expr::method(Expr::ident("Math"), "floor", vec![Expr::ident("x")]);
        let (resolved, draft) = resolve_in(&model, "Util", "run", &floor);
        assert_eq!(resolved.single(), Some(model.registry().elemental(Elemental::Int)));
        assert!(draft.diagnostics.is_empty());

        let mystery = Expr::method(Expr::ident("ghost"), "haunt", vec![]);
        let (resolved, draft) = resolve_in(&model, "Util", "run", &mystery);
        assert_eq!(resolved.single(), Some(TypeId::UNKNOWN));
        assert_eq!(draft.entries, vec![Draft::Calls(BTreeSet::new())]);
        assert_eq!(draft.diagnostics[0].kind, DiagnosticKind::CouldNotDetermine);
        assert_eq!(draft.diagnostics[0].expression, "ghost.haunt()");
    }

    #[test]
    fn test_missing_method_on_user_class() {
        let model = model(
            CompilationUnit::new("Empty.java", "")
                .class(RawClass::new("Empty"))
                .class(RawClass::new("User").field("Empty", "e").method(RawMethod::new("run"))),
        );
        let call = Expr::method(Expr::ident("e"), "vanish", vec![]);
        let (_, draft) = resolve_in(&model, "User", "run", &call);
        assert_eq!(draft.diagnostics[0].kind, DiagnosticKind::EmptyMethodNode);
    }

    #[test]
    fn test_peek_records_nothing() {
        let model = model(
            CompilationUnit::new("Peek.java", "")
                .class(RawClass::new("Peek").method(RawMethod::new("run")))
        );
        let frontend = Language::Java.frontend();
        let builder = GraphBuilder::new(&model, frontend.as_ref());
        let function = model.function_by_name("Peek", "run").unwrap();
        let mut resolver = Resolver::new(&builder, function);
        resolver.peek(&Expr::method(Expr::ident("ghost"), "haunt", vec![]));
        assert!(resolver.draft.entries.is_empty());
        assert!(resolver.draft.diagnostics.is_empty());
    }
}
