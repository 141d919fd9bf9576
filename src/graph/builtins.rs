//! Last-resort result types for calls no declaration explains.

use crate::types::{Elemental, TypeId, TypeRegistry};

/// Static utility classes whose calls are expected and never warned about.
const UTILITY_ROOTS: &[&str] = &[
    "System",
    "Arrays",
    "Collections",
    "Data",
    "Objects",
    "Console",
    "Convert",
    "Environment",
    "Thread",
    "Executors",
    "TimeUnit",
    "Interlocked",
    "Task",
];

/// Result type suggested by the method name alone.
pub(super) fn by_name(registry: &TypeRegistry, name: &str, receiver: Option<TypeId>) -> Option<TypeId> {
    let ty = match name {
        "isEmpty" | "IsEmpty" | "equals" | "Equals" | "contains" | "Contains" | "containsKey"
        | "ContainsKey" | "startsWith" | "StartsWith" | "endsWith" | "EndsWith" | "matches"
        | "equalsIgnoreCase" => registry.elemental(Elemental::Bool),
        "hashCode" | "GetHashCode" | "compareTo" | "CompareTo" => registry.elemental(Elemental::Int),
        "clone" | "Clone" => receiver.unwrap_or(TypeId::UNKNOWN),
        "valueOf" | "toString" | "ToString" | "trim" | "Trim" | "getKey" | "getValue" | "getClass"
        | "GetType" | "iterator" | "stream" | "add" | "addAll" | "put" | "putAll" | "remove"
        | "clear" | "Add" | "Clear" | "Remove" => TypeId::UNKNOWN,
        _ if name.ends_with("alue") => TypeId::UNKNOWN,
        _ => return None,
    };
    Some(ty)
}

/// Result type of a call rooted at a static utility class (`Math.floor(x)`).
pub(super) fn utility(registry: &TypeRegistry, root: &str, name: &str) -> Option<TypeId> {
    if root == "Math" {
        let elemental = match name {
            "floor" | "ceil" | "Floor" | "Ceiling" | "round" | "Round" => Elemental::Int,
            _ => Elemental::Float,
        };
        return Some(registry.elemental(elemental));
    }
    UTILITY_ROOTS
        .iter()
        .any(|prefix| root.starts_with(prefix))
        .then_some(TypeId::UNKNOWN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_heuristics() {
        let registry = TypeRegistry::new();
        let bool_ty = registry.elemental(Elemental::Bool);
        let int_ty = registry.elemental(Elemental::Int);
        assert_eq!(by_name(&registry, "isEmpty", None), Some(bool_ty));
        assert_eq!(by_name(&registry, "hashCode", None), Some(int_ty));
        assert_eq!(by_name(&registry, "intValue", None), Some(TypeId::UNKNOWN));
        assert_eq!(by_name(&registry, "clone", Some(TypeId(3))), Some(TypeId(3)));
        assert_eq!(by_name(&registry, "transfer", None), None);
    }

    #[test]
    fn test_utility_roots() {
        let registry = TypeRegistry::new();
        assert_eq!(
            utility(&registry, "Math", "floor"),
            Some(registry.elemental(Elemental::Int))
        );
        assert_eq!(
            utility(&registry, "Math", "sqrt"),
            Some(registry.elemental(Elemental::Float))
        );
        assert_eq!(utility(&registry, "System", "currentTimeMillis"), Some(TypeId::UNKNOWN));
        assert_eq!(utility(&registry, "account", "deposit"), None);
    }
}
