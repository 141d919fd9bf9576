mod common;

use common::{graph, model};
use indoc::indoc;
use lockscope::{FunctionId, GraphBuild, GraphEntry, Language, LockId, ProgramModel};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::path::Path;

fn parse(language: Language, source: &str) -> ProgramModel {
    let frontend = language.frontend();
    let path = match language {
        Language::Java => "Source.java",
        Language::CSharp => "Source.cs",
    };
    model(vec![frontend.parse_unit(Path::new(path), source).unwrap()])
}

/// (acquires, releases) per lock in one function's entries.
fn lock_counts(build: &GraphBuild, function: FunctionId) -> BTreeMap<LockId, (usize, usize)> {
    let mut counts: BTreeMap<LockId, (usize, usize)> = BTreeMap::new();
    for entry in build.graph.entries(function) {
        match entry {
            GraphEntry::Acquire { lock } => counts.entry(*lock).or_default().0 += 1,
            GraphEntry::Release { lock } => counts.entry(*lock).or_default().1 += 1,
            _ => {}
        }
    }
    counts
}

fn assert_balanced(model: &ProgramModel, build: &GraphBuild) {
    for function in model.functions() {
        for (lock, (acquires, releases)) in lock_counts(build, function.id) {
            assert_eq!(
                acquires,
                releases,
                "{} is unbalanced on {:?}",
                model.function_label(function.id),
                build.locks.name_of(lock)
            );
        }
    }
}

#[test]
fn test_java_lock_forms_are_balanced() {
    let model = parse(
        Language::Java,
        indoc! {r#"
            import java.util.concurrent.locks.*;

            class Ledger {
                private final Object gate = new Object();
                private final ReentrantLock lock = new ReentrantLock();
                private final ReentrantReadWriteLock rw = new ReentrantReadWriteLock();

                synchronized void post() {
                    synchronized (gate) {
                        lock.lock();
                        audit();
                        lock.unlock();
                    }
                }

                static synchronized void reset() {
                    synchronized (Ledger.class) {}
                }

                void read() {
                    rw.readLock().lock();
                    synchronized (this) { audit(); }
                    rw.readLock().unlock();
                }

                void audit() {}
            }
        "#},
    );
    let build = graph(&model, Language::Java);

    assert_balanced(&model, &build);
    let post = model.function_by_name("Ledger", "post").unwrap().id;
    assert_eq!(lock_counts(&build, post).len(), 3);
}

#[test]
fn test_csharp_lock_forms_are_balanced() {
    let model = parse(
        Language::CSharp,
        indoc! {r#"
            using System.Threading;

            public class Registry
            {
                public void Accept(Node node) {}
            }

            public class Node
            {
                private readonly object gate = new object();
                private ReaderWriterLockSlim rw = new ReaderWriterLockSlim();
                private Registry reg;

                public void Join()
                {
                    Monitor.Enter(this);
                    reg.Accept(this);
                    Monitor.Exit(this);
                }

                public void Post()
                {
                    lock (this)
                    {
                        lock (gate)
                        {
                            rw.EnterWriteLock();
                            rw.ExitWriteLock();
                        }
                    }
                }
            }
        "#},
    );
    let build = graph(&model, Language::CSharp);

    assert_balanced(&model, &build);

    let join = model.function_by_name("Node", "Join").unwrap().id;
    let accept = model.function_by_name("Registry", "Accept").unwrap().id;
    let this_monitor = build.locks.find("Node.synchLock_this").unwrap();
    assert_eq!(lock_counts(&build, join).get(&this_monitor), Some(&(1, 1)));
    assert!(build.graph.callees(join).contains(&accept));

    let post = model.function_by_name("Node", "Post").unwrap().id;
    assert_eq!(lock_counts(&build, post).len(), 3);
}

/// One nesting level: a `synchronized` block or an explicit lock pair on
/// field `index`.
#[derive(Debug, Clone, Copy)]
struct Layer {
    index: usize,
    synchronized: bool,
}

fn layers() -> impl Strategy<Value = Vec<Layer>> {
    prop::collection::vec(
        (0usize..3, any::<bool>()).prop_map(|(index, synchronized)| Layer {
            index,
            synchronized,
        }),
        0..6,
    )
}

fn nested_body(layers: &[Layer]) -> String {
    let mut open = String::new();
    let mut close = String::new();
    for layer in layers {
        if layer.synchronized {
            open.push_str(&format!("synchronized (g{}) {{\n", layer.index));
            close.insert_str(0, "}\n");
        } else {
            open.push_str(&format!("l{}.lock();\n", layer.index));
            close.insert_str(0, &format!("l{}.unlock();\n", layer.index));
        }
    }
    format!("{open}step();\n{close}")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Straight-line bodies release every lock they acquire.
    #[test]
    fn nested_regions_stay_balanced(first in layers(), second in layers()) {
        let source = format!(
            "import java.util.concurrent.locks.ReentrantLock;\n\
             class Worker {{\n\
             Object g0 = new Object(); Object g1 = new Object(); Object g2 = new Object();\n\
             ReentrantLock l0 = new ReentrantLock(); ReentrantLock l1 = new ReentrantLock(); ReentrantLock l2 = new ReentrantLock();\n\
             void one() {{\n{}}}\n\
             void two() {{\n{}}}\n\
             void step() {{}}\n\
             }}\n",
            nested_body(&first),
            nested_body(&second)
        );
        let model = parse(Language::Java, &source);
        let build = graph(&model, Language::Java);

        for function in model.functions() {
            for (acquires, releases) in lock_counts(&build, function.id).values() {
                prop_assert_eq!(acquires, releases);
            }
        }
        let one = model.function_by_name("Worker", "one").unwrap().id;
        let acquired: usize = lock_counts(&build, one).values().map(|(a, _)| a).sum();
        prop_assert_eq!(acquired, first.len());
    }
}
