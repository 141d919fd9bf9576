//! Built-in knowledge about library types the analyzed program never declares.
//!
//! Covers both Java and C# names. Lookups use the simple (unqualified) name.

use super::{AbstractTypeKind, Elemental};
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Names that alias an elemental type.
static LINKED_ELEMENTALS: Lazy<HashMap<&'static str, Elemental>> = Lazy::new(|| {
    use Elemental::*;
    [
        ("int", Int),
        ("Integer", Int),
        ("long", Int),
        ("Long", Int),
        ("short", Int),
        ("Short", Int),
        ("byte", Int),
        ("Byte", Int),
        ("sbyte", Int),
        ("uint", Int),
        ("ulong", Int),
        ("ushort", Int),
        ("nint", Int),
        ("Int16", Int),
        ("Int32", Int),
        ("Int64", Int),
        ("UInt32", Int),
        ("UInt64", Int),
        ("BigInteger", Int),
        ("float", Float),
        ("Float", Float),
        ("double", Float),
        ("Double", Float),
        ("decimal", Float),
        ("Decimal", Float),
        ("Single", Float),
        ("BigDecimal", Float),
        ("char", Char),
        ("Character", Char),
        ("Char", Char),
        ("String", String),
        ("string", String),
        ("CharSequence", String),
        ("boolean", Bool),
        ("Boolean", Bool),
        ("bool", Bool),
        ("null", Null),
    ]
    .into_iter()
    .collect()
});

/// Types the analysis deliberately does not track.
pub const IGNORED_TYPE_NAMES: &[&str] = &[
    "Object",
    "object",
    "Exception",
    "RuntimeException",
    "Throwable",
    "Error",
    "Class",
    "Type",
    "Void",
    "Iterator",
    "Iterable",
    "Collection",
    "Comparable",
    "Comparator",
    "IEnumerable",
    "IEnumerator",
    "IDisposable",
    "var",
    "dynamic",
];

static ABSTRACT_KINDS: Lazy<HashMap<&'static str, AbstractTypeKind>> = Lazy::new(|| {
    use AbstractTypeKind::*;
    let families: [(AbstractTypeKind, &[&str]); 9] = [
        (
            Set,
            &[
                "Set",
                "HashSet",
                "TreeSet",
                "LinkedHashSet",
                "SortedSet",
                "NavigableSet",
                "EnumSet",
                "CopyOnWriteArraySet",
                "ConcurrentSkipListSet",
                "ISet",
            ],
        ),
        (
            List,
            &[
                "List",
                "ArrayList",
                "LinkedList",
                "Vector",
                "Queue",
                "Deque",
                "ArrayDeque",
                "BlockingQueue",
                "LinkedBlockingQueue",
                "LinkedBlockingDeque",
                "ArrayBlockingQueue",
                "ConcurrentLinkedQueue",
                "CopyOnWriteArrayList",
                "IList",
                "ICollection",
                "IReadOnlyList",
                "ConcurrentQueue",
                "ConcurrentBag",
                "BlockingCollection",
            ],
        ),
        (
            Map,
            &[
                "Map",
                "HashMap",
                "TreeMap",
                "LinkedHashMap",
                "ConcurrentHashMap",
                "ConcurrentMap",
                "SortedMap",
                "NavigableMap",
                "Hashtable",
                "WeakHashMap",
                "IdentityHashMap",
                "EnumMap",
                "Dictionary",
                "IDictionary",
                "ConcurrentDictionary",
                "SortedDictionary",
                "IReadOnlyDictionary",
            ],
        ),
        (Stack, &["Stack", "ConcurrentStack"]),
        (PriorityQueue, &["PriorityQueue", "PriorityBlockingQueue"]),
        (
            Reference,
            &[
                "AtomicReference",
                "WeakReference",
                "SoftReference",
                "Optional",
                "ThreadLocal",
                "Lazy",
                "Future",
                "CompletableFuture",
                "Task",
            ],
        ),
        (
            Lock,
            &[
                "Lock",
                "ReentrantLock",
                "ReadWriteLock",
                "ReentrantReadWriteLock",
                "ReadLock",
                "WriteLock",
                "StampedLock",
                "ReaderWriterLockSlim",
                "ReaderWriterLock",
                "Mutex",
                "Semaphore",
                "SemaphoreSlim",
                "SpinLock",
            ],
        ),
        (Script, &["Invocable", "ScriptEngine", "ScriptObjectMirror"]),
        (String, &["StringBuilder", "StringBuffer"]),
    ];

    let mut kinds = HashMap::new();
    for (kind, names) in families {
        for name in names {
            kinds.insert(*name, kind);
        }
    }
    for name in ["Thread", "Random", "AtomicInteger", "AtomicLong", "AtomicBoolean"] {
        kinds.insert(name, Other);
    }
    kinds
});

/// What a reflected method returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnSpec {
    Elemental(Elemental),
    /// The receiver's own type (builder-style methods).
    SelfType,
    Unknown,
}

/// A library class modeled only by its method-name to return-type mapping.
#[derive(Debug)]
pub struct ReflectedClass {
    pub name: &'static str,
    pub default_return: ReturnSpec,
    pub methods: &'static [(&'static str, ReturnSpec)],
}

impl ReflectedClass {
    pub fn return_of(&self, method: &str) -> ReturnSpec {
        self.methods
            .iter()
            .find(|(name, _)| *name == method)
            .map(|(_, ret)| *ret)
            .unwrap_or(self.default_return)
    }
}

const INT: ReturnSpec = ReturnSpec::Elemental(Elemental::Int);
const FLOAT: ReturnSpec = ReturnSpec::Elemental(Elemental::Float);
const CHAR: ReturnSpec = ReturnSpec::Elemental(Elemental::Char);
const STR: ReturnSpec = ReturnSpec::Elemental(Elemental::String);
const BOOL: ReturnSpec = ReturnSpec::Elemental(Elemental::Bool);

pub static REFLECTED_CLASSES: &[ReflectedClass] = &[
    ReflectedClass {
        name: "String",
        default_return: ReturnSpec::Unknown,
        methods: &[
            ("length", INT),
            ("Length", INT),
            ("charAt", CHAR),
            ("indexOf", INT),
            ("IndexOf", INT),
            ("lastIndexOf", INT),
            ("compareTo", INT),
            ("CompareTo", INT),
            ("hashCode", INT),
            ("codePointAt", INT),
            ("equals", BOOL),
            ("Equals", BOOL),
            ("equalsIgnoreCase", BOOL),
            ("isEmpty", BOOL),
            ("isBlank", BOOL),
            ("contains", BOOL),
            ("Contains", BOOL),
            ("startsWith", BOOL),
            ("StartsWith", BOOL),
            ("endsWith", BOOL),
            ("EndsWith", BOOL),
            ("matches", BOOL),
            ("substring", STR),
            ("Substring", STR),
            ("trim", STR),
            ("Trim", STR),
            ("strip", STR),
            ("toUpperCase", STR),
            ("ToUpper", STR),
            ("toLowerCase", STR),
            ("ToLower", STR),
            ("replace", STR),
            ("Replace", STR),
            ("concat", STR),
            ("format", STR),
            ("Format", STR),
            ("join", STR),
            ("Join", STR),
            ("repeat", STR),
            ("intern", STR),
            ("valueOf", STR),
        ],
    },
    ReflectedClass {
        name: "Integer",
        default_return: INT,
        methods: &[("toString", STR), ("equals", BOOL), ("Equals", BOOL)],
    },
    ReflectedClass {
        name: "StringBuilder",
        default_return: ReturnSpec::Unknown,
        methods: &[
            ("append", ReturnSpec::SelfType),
            ("Append", ReturnSpec::SelfType),
            ("AppendLine", ReturnSpec::SelfType),
            ("insert", ReturnSpec::SelfType),
            ("Insert", ReturnSpec::SelfType),
            ("reverse", ReturnSpec::SelfType),
            ("length", INT),
            ("Length", INT),
            ("charAt", CHAR),
            ("toString", STR),
            ("ToString", STR),
        ],
    },
    ReflectedClass {
        name: "StringBuffer",
        default_return: ReturnSpec::Unknown,
        methods: &[
            ("append", ReturnSpec::SelfType),
            ("insert", ReturnSpec::SelfType),
            ("reverse", ReturnSpec::SelfType),
            ("length", INT),
            ("charAt", CHAR),
            ("toString", STR),
        ],
    },
    ReflectedClass {
        name: "Thread",
        default_return: ReturnSpec::Unknown,
        methods: &[
            ("getName", STR),
            ("isAlive", BOOL),
            ("isInterrupted", BOOL),
            ("interrupted", BOOL),
            ("isDaemon", BOOL),
            ("getId", INT),
            ("getPriority", INT),
        ],
    },
    ReflectedClass {
        name: "Random",
        default_return: INT,
        methods: &[
            ("nextDouble", FLOAT),
            ("NextDouble", FLOAT),
            ("nextFloat", FLOAT),
            ("nextGaussian", FLOAT),
            ("nextBoolean", BOOL),
        ],
    },
    ReflectedClass {
        name: "AtomicInteger",
        default_return: INT,
        methods: &[("compareAndSet", BOOL), ("toString", STR)],
    },
    ReflectedClass {
        name: "AtomicLong",
        default_return: INT,
        methods: &[("compareAndSet", BOOL), ("toString", STR)],
    },
    ReflectedClass {
        name: "AtomicBoolean",
        default_return: BOOL,
        methods: &[("toString", STR)],
    },
];

/// Elemental type for a linked primitive or wrapper name.
pub fn linked_elemental(name: &str) -> Option<Elemental> {
    LINKED_ELEMENTALS.get(name).copied()
}

/// Abstract kind for a library type name, `None` when unknown.
pub fn abstract_kind(name: &str) -> AbstractTypeKind {
    ABSTRACT_KINDS
        .get(name)
        .copied()
        .unwrap_or(AbstractTypeKind::None)
}

pub fn is_ignored_name(name: &str) -> bool {
    IGNORED_TYPE_NAMES.contains(&name)
}

pub fn reflected_class(name: &str) -> Option<&'static ReflectedClass> {
    REFLECTED_CLASSES.iter().find(|class| class.name == name)
}

/// Library names registered up front as named built-in types.
pub fn builtin_names() -> impl Iterator<Item = &'static str> {
    let mut names: Vec<&'static str> = ABSTRACT_KINDS
        .iter()
        .filter(|(_, kind)| !matches!(kind, AbstractTypeKind::Lock | AbstractTypeKind::Script))
        .map(|(name, _)| *name)
        .chain(
            REFLECTED_CLASSES
                .iter()
                .map(|class| class.name)
                .filter(|name| linked_elemental(name).is_none()),
        )
        .collect();
    names.sort_unstable();
    names.dedup();
    names.into_iter()
}

/// Textual check used at ingestion: does this declared type hold a lock?
pub fn is_lock_type_name(simple_name: &str) -> bool {
    abstract_kind(simple_name) == AbstractTypeKind::Lock || simple_name.contains("Lock")
}

/// `(is_read, is_write)` flags of a lock type name.
pub fn read_write_flags(type_text: &str) -> (bool, bool) {
    (type_text.contains("Read"), type_text.contains("Write"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linked_elementals() {
        assert_eq!(linked_elemental("Integer"), Some(Elemental::Int));
        assert_eq!(linked_elemental("string"), Some(Elemental::String));
        assert_eq!(linked_elemental("double"), Some(Elemental::Float));
        assert_eq!(linked_elemental("Account"), None);
    }

    #[test]
    fn test_abstract_kinds() {
        assert_eq!(abstract_kind("ConcurrentHashMap"), AbstractTypeKind::Map);
        assert_eq!(abstract_kind("Dictionary"), AbstractTypeKind::Map);
        assert_eq!(abstract_kind("ReentrantLock"), AbstractTypeKind::Lock);
        assert_eq!(abstract_kind("Invocable"), AbstractTypeKind::Script);
        assert_eq!(abstract_kind("Account"), AbstractTypeKind::None);
    }

    #[test]
    fn test_reflected_return_falls_back_to_default() {
        let random = reflected_class("Random").unwrap();
        assert_eq!(random.return_of("nextBoolean"), BOOL);
        assert_eq!(random.return_of("nextInt"), INT);
    }

    #[test]
    fn test_builtin_names_exclude_locks_and_linked() {
        let names: Vec<_> = builtin_names().collect();
        assert!(names.contains(&"HashMap"));
        assert!(names.contains(&"Thread"));
        assert!(!names.contains(&"ReentrantLock"));
        assert!(!names.contains(&"String"));
    }

    #[test]
    fn test_read_write_flags() {
        assert_eq!(read_write_flags("ReentrantReadWriteLock"), (true, true));
        assert_eq!(read_write_flags("ReaderWriterLockSlim"), (true, true));
        assert_eq!(read_write_flags("ReentrantReadWriteLock.ReadLock"), (true, true));
        assert_eq!(read_write_flags("ReadLock"), (true, false));
    }
}
