use super::catalog::{self, ReflectedClass};
use super::{AbstractTypeKind, Elemental, TypeId};
use crate::ids::ClassId;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::ops::Range;

/// Registration key. Registering an equal key twice yields the same id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKey {
    Elemental(Elemental),
    /// Library type known by name only (`HashMap`, `Thread`, `Account[]` ...).
    Named(String),
    Class(ClassId),
    /// Generic instantiation: type arguments followed by the generic base.
    Compound(Vec<TypeId>),
    /// Type parameter `index` of `class`.
    Masked { class: ClassId, index: usize },
    Array(TypeId),
}

/// Registry of every type identity observed in one run.
///
/// Ids are allocated in the single-threaded model resolution pass. After
/// that the registry is only read, so graph building can share it freely.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    keys: Vec<TypeKey>,
    ids: HashMap<TypeKey, TypeId>,
    /// Basic names: elementals, linked aliases, ignored names, built-ins.
    names: HashMap<String, TypeId>,
    kinds: HashMap<TypeId, AbstractTypeKind>,
    reflected: HashMap<TypeId, &'static ReflectedClass>,
    ignored: Range<u32>,
    object_set: TypeId,
}

impl TypeRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            keys: Vec::new(),
            ids: HashMap::new(),
            names: HashMap::new(),
            kinds: HashMap::new(),
            reflected: HashMap::new(),
            ignored: 0..0,
            object_set: TypeId::UNKNOWN,
        };

        for elemental in Elemental::ALL {
            let id = registry.register(TypeKey::Elemental(elemental));
            registry.names.insert(elemental.name().to_string(), id);
        }
        registry.kinds.insert(
            registry.elemental(Elemental::Lock),
            AbstractTypeKind::Lock,
        );
        registry.kinds.insert(
            registry.elemental(Elemental::Script),
            AbstractTypeKind::Script,
        );
        registry.kinds.insert(
            registry.elemental(Elemental::String),
            AbstractTypeKind::String,
        );

        // The ignored names occupy one contiguous band of ids.
        let start = registry.keys.len() as u32;
        for name in catalog::IGNORED_TYPE_NAMES {
            let id = registry.register(TypeKey::Named((*name).to_string()));
            registry.names.insert((*name).to_string(), id);
        }
        registry.ignored = start..registry.keys.len() as u32;

        for name in catalog::builtin_names() {
            let id = registry.register(TypeKey::Named(name.to_string()));
            registry.names.insert(name.to_string(), id);
            let kind = catalog::abstract_kind(name);
            if kind != AbstractTypeKind::None {
                registry.kinds.insert(id, kind);
            }
        }

        for class in catalog::REFLECTED_CLASSES {
            let id = match catalog::linked_elemental(class.name) {
                Some(elemental) => Some(registry.elemental(elemental)),
                None => registry.names.get(class.name).copied(),
            };
            if let Some(id) = id {
                registry.reflected.insert(id, class);
            }
        }

        if let (Some(object), Some(set)) = (registry.names.get("Object"), registry.names.get("Set")) {
            let components = vec![*object, *set];
            registry.object_set = registry.register(TypeKey::Compound(components));
        }

        registry
    }

    /// Register a type, returning the existing id for a known key.
    pub fn register(&mut self, key: TypeKey) -> TypeId {
        if let Some(id) = self.ids.get(&key) {
            return *id;
        }
        let id = TypeId(self.keys.len() as u32);
        if let TypeKey::Compound(components) = &key {
            // Compound types behave like their generic base.
            if let Some(kind) = components.last().and_then(|base| self.kinds.get(base)) {
                self.kinds.insert(id, *kind);
            }
        }
        self.ids.insert(key.clone(), id);
        self.keys.push(key);
        id
    }

    pub fn get(&self, key: &TypeKey) -> Option<TypeId> {
        self.ids.get(key).copied()
    }

    pub fn key(&self, id: TypeId) -> Option<&TypeKey> {
        self.keys.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn classify(&self, id: TypeId) -> AbstractTypeKind {
        self.kinds.get(&id).copied().unwrap_or_default()
    }

    /// Ignored-range membership, propagated through compound components.
    pub fn is_ignored(&self, id: TypeId) -> bool {
        if id == TypeId::UNKNOWN || self.ignored.contains(&id.0) {
            return true;
        }
        match self.key(id) {
            Some(TypeKey::Compound(components)) => {
                components.iter().any(|component| self.is_ignored(*component))
            }
            Some(TypeKey::Array(element)) => self.is_ignored(*element),
            _ => false,
        }
    }

    pub fn elemental(&self, elemental: Elemental) -> TypeId {
        // Elementals are registered first, in declaration order.
        TypeId(elemental as u32)
    }

    pub fn elemental_of(&self, id: TypeId) -> Option<Elemental> {
        match self.key(id) {
            Some(TypeKey::Elemental(elemental)) => Some(*elemental),
            _ => None,
        }
    }

    pub fn is_elemental(&self, id: TypeId, elemental: Elemental) -> bool {
        id == self.elemental(elemental)
    }

    /// Resolve a basic type name: elemental aliases, ignored names, built-ins.
    pub fn lookup_name(&self, name: &str) -> Option<TypeId> {
        if let Some(elemental) = catalog::linked_elemental(name) {
            return Some(self.elemental(elemental));
        }
        self.names.get(name).copied()
    }

    pub fn class_type(&self, class: ClassId) -> Option<TypeId> {
        self.get(&TypeKey::Class(class))
    }

    pub fn class_of(&self, id: TypeId) -> Option<ClassId> {
        match self.key(id) {
            Some(TypeKey::Class(class)) => Some(*class),
            _ => None,
        }
    }

    pub fn components(&self, id: TypeId) -> Option<&[TypeId]> {
        match self.key(id) {
            Some(TypeKey::Compound(components)) => Some(components),
            _ => None,
        }
    }

    /// Generic base of a compound type.
    pub fn generic_base(&self, id: TypeId) -> Option<TypeId> {
        self.components(id).and_then(|components| components.last().copied())
    }

    /// The element a container wraps: second-to-last compound component.
    pub fn wrapped_value(&self, id: TypeId) -> TypeId {
        match self.components(id) {
            Some(components) if components.len() >= 2 => components[components.len() - 2],
            _ => TypeId::UNKNOWN,
        }
    }

    pub fn element_of(&self, id: TypeId) -> Option<TypeId> {
        match self.key(id) {
            Some(TypeKey::Array(element)) => Some(*element),
            _ => None,
        }
    }

    pub fn masked_of(&self, id: TypeId) -> Option<(ClassId, usize)> {
        match self.key(id) {
            Some(TypeKey::Masked { class, index }) => Some((*class, *index)),
            _ => None,
        }
    }

    /// Replace the type parameters of `class` inside `ty` with `args`,
    /// registering any new compound or array type this produces.
    pub fn instantiate(&mut self, ty: TypeId, class: ClassId, args: &[TypeId]) -> TypeId {
        match self.key(ty).cloned() {
            Some(TypeKey::Masked { class: owner, index }) if owner == class => {
                args.get(index).copied().unwrap_or(TypeId::UNKNOWN)
            }
            Some(TypeKey::Compound(components)) => {
                let substituted = components
                    .iter()
                    .map(|component| self.instantiate(*component, class, args))
                    .collect();
                self.register(TypeKey::Compound(substituted))
            }
            Some(TypeKey::Array(element)) => {
                let element = self.instantiate(element, class, args);
                self.register(TypeKey::Array(element))
            }
            _ => ty,
        }
    }

    /// Read-only [`instantiate`](Self::instantiate): `None` when the
    /// substituted type was never registered.
    pub fn instantiated(&self, ty: TypeId, class: ClassId, args: &[TypeId]) -> Option<TypeId> {
        match self.key(ty) {
            Some(TypeKey::Masked { class: owner, index }) if *owner == class => {
                Some(args.get(*index).copied().unwrap_or(TypeId::UNKNOWN))
            }
            Some(TypeKey::Compound(components)) => {
                let substituted = components
                    .iter()
                    .map(|component| self.instantiated(*component, class, args))
                    .collect::<Option<Vec<_>>>()?;
                self.get(&TypeKey::Compound(substituted))
            }
            Some(TypeKey::Array(element)) => {
                let element = self.instantiated(*element, class, args)?;
                self.get(&TypeKey::Array(element))
            }
            _ => Some(ty),
        }
    }

    pub fn reflected(&self, id: TypeId) -> Option<&'static ReflectedClass> {
        self.reflected.get(&id).copied()
    }

    /// `Set<Object>`, the result of `entrySet()` on any map.
    pub fn object_set(&self) -> TypeId {
        self.object_set
    }

    /// Human readable name, with class names supplied by the caller.
    pub fn describe(&self, id: TypeId, class_name: &dyn Fn(ClassId) -> String) -> String {
        if id.is_sentinel() {
            return id.to_string();
        }
        match self.key(id) {
            Some(TypeKey::Elemental(elemental)) => elemental.name().to_string(),
            Some(TypeKey::Named(name)) => name.clone(),
            Some(TypeKey::Class(class)) => class_name(*class),
            Some(TypeKey::Compound(components)) => {
                let (base, args) = components.split_last().unwrap_or((&TypeId::UNKNOWN, &[]));
                let args: Vec<String> = args
                    .iter()
                    .map(|arg| self.describe(*arg, class_name))
                    .collect();
                format!("{}<{}>", self.describe(*base, class_name), args.join(", "))
            }
            Some(TypeKey::Masked { class, index }) => format!("{}#T{}", class_name(*class), index),
            Some(TypeKey::Array(element)) => format!("{}[]", self.describe(*element, class_name)),
            None => format!("?{}", id.0),
        }
    }

    /// Every registered type, one per line, for diagnostic dumps.
    pub fn dump(&self, class_name: &dyn Fn(ClassId) -> String) -> String {
        let mut out = String::new();
        for index in 0..self.keys.len() {
            let id = TypeId(index as u32);
            let _ = writeln!(
                out,
                "{:>6} {:<40} kind={:?}{}",
                id.to_string(),
                self.describe(id, class_name),
                self.classify(id),
                if self.is_ignored(id) { " ignored" } else { "" }
            );
        }
        out
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elementals_are_registered_first() {
        let registry = TypeRegistry::new();
        for elemental in Elemental::ALL {
            let id = registry.elemental(elemental);
            assert_eq!(registry.elemental_of(id), Some(elemental));
        }
        assert_eq!(registry.lookup_name("Integer"), Some(registry.elemental(Elemental::Int)));
    }

    #[test]
    fn test_ignored_range_is_contiguous() {
        let registry = TypeRegistry::new();
        let ids: Vec<u32> = catalog::IGNORED_TYPE_NAMES
            .iter()
            .map(|name| registry.lookup_name(name).unwrap().0)
            .collect();
        let min = *ids.iter().min().unwrap();
        let max = *ids.iter().max().unwrap();
        assert_eq!((max - min + 1) as usize, ids.len());
        assert!(ids.iter().all(|id| registry.is_ignored(TypeId(*id))));
    }

    #[test]
    fn test_object_set_is_ignored_set() {
        let registry = TypeRegistry::new();
        let object_set = registry.object_set();
        assert_eq!(registry.classify(object_set), AbstractTypeKind::Set);
        assert!(registry.is_ignored(object_set));
    }

    #[test]
    fn test_reflected_string_is_on_elemental() {
        let registry = TypeRegistry::new();
        let string = registry.elemental(Elemental::String);
        assert_eq!(registry.reflected(string).map(|r| r.name), Some("String"));
        let thread = registry.lookup_name("Thread").unwrap();
        assert_eq!(registry.reflected(thread).map(|r| r.name), Some("Thread"));
    }

    #[test]
    fn test_compound_inherits_kind_of_base() {
        let mut registry = TypeRegistry::new();
        let int = registry.elemental(Elemental::Int);
        let list = registry.lookup_name("List").unwrap();
        let compound = registry.register(TypeKey::Compound(vec![int, list]));
        assert_eq!(registry.classify(compound), AbstractTypeKind::List);
        assert_eq!(registry.wrapped_value(compound), int);
        assert_eq!(registry.generic_base(compound), Some(list));
    }

    #[test]
    fn test_instantiate_masked_inside_compound() {
        let mut registry = TypeRegistry::new();
        let class = ClassId(0);
        let masked = registry.register(TypeKey::Masked { class, index: 0 });
        let list = registry.lookup_name("List").unwrap();
        let list_of_t = registry.register(TypeKey::Compound(vec![masked, list]));
        let string = registry.elemental(Elemental::String);

        assert_eq!(registry.instantiated(list_of_t, class, &[string]), None);
        let list_of_string = registry.instantiate(list_of_t, class, &[string]);
        assert_eq!(registry.wrapped_value(list_of_string), string);
        assert_eq!(
            registry.instantiated(list_of_t, class, &[string]),
            Some(list_of_string)
        );
        assert_eq!(registry.instantiated(masked, class, &[string]), Some(string));
        assert_eq!(
            registry.instantiated(masked, ClassId(1), &[string]),
            Some(masked)
        );
    }

    #[test]
    fn test_describe_compound() {
        let mut registry = TypeRegistry::new();
        let string = registry.elemental(Elemental::String);
        let int = registry.elemental(Elemental::Int);
        let map = registry.lookup_name("Map").unwrap();
        let compound = registry.register(TypeKey::Compound(vec![string, int, map]));
        let name = registry.describe(compound, &|class| class.to_string());
        assert_eq!(name, "Map<string, int>");
    }
}
