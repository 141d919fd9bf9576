mod common;

use common::{graph, model};
use indoc::indoc;
use lockscope::{CompilationUnit, DiagnosticKind, GraphEntry, Language, ProgramModel};
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;
use std::path::Path;

fn parse(language: Language, files: &[(&str, &str)]) -> ProgramModel {
    let frontend = language.frontend();
    let units: Vec<CompilationUnit> = files
        .iter()
        .map(|(path, source)| frontend.parse_unit(Path::new(path), source).unwrap())
        .collect();
    model(units)
}

fn callees_of(model: &ProgramModel, entries: &[GraphEntry]) -> Vec<BTreeSet<String>> {
    entries
        .iter()
        .filter_map(|entry| match entry {
            GraphEntry::Calls { callees } => Some(
                callees
                    .iter()
                    .map(|callee| model.function_label(*callee))
                    .collect(),
            ),
            _ => None,
        })
        .collect()
}

fn labels(list: &[&str]) -> BTreeSet<String> {
    list.iter().map(|label| label.to_string()).collect()
}

#[test]
fn test_abstract_call_reaches_every_override() {
    let model = parse(
        Language::Java,
        &[(
            "Shapes.java",
            indoc! {r#"
                abstract class Shape {
                    abstract double area();
                }

                class Circle extends Shape {
                    double area() { return 3.14; }
                }

                class Square extends Shape {
                    double area() { return 1.0; }
                }

                class Canvas {
                    private Shape shape;

                    void paint() {
                        shape.area();
                    }
                }
            "#},
        )],
    );
    let build = graph(&model, Language::Java);
    let paint = model.function_by_name("Canvas", "paint").unwrap().id;

    assert_eq!(
        callees_of(&model, build.graph.entries(paint)),
        vec![labels(&["Circle >> area", "Square >> area"])]
    );
    assert!(build.diagnostics.is_empty());
}

#[test]
fn test_super_call_targets_the_parent_implementation() {
    let model = parse(
        Language::Java,
        &[(
            "Tasks.java",
            indoc! {r#"
                class Base {
                    void start() {}
                }

                class Child extends Base {
                    void start() {
                        super.start();
                    }
                }
            "#},
        )],
    );
    let build = graph(&model, Language::Java);
    let child = model.function_by_name("Child", "start").unwrap().id;

    assert_eq!(
        callees_of(&model, build.graph.entries(child)),
        vec![labels(&["Base >> start"])]
    );
}

#[test]
fn test_runnable_implementations_become_thread_entries() {
    let model = parse(
        Language::Java,
        &[(
            "Worker.java",
            indoc! {r#"
                class Worker implements Runnable {
                    public void run() {
                        helper();
                    }

                    void helper() {}
                }
            "#},
        )],
    );
    let build = graph(&model, Language::Java);
    let run = model.function_by_name("Worker", "run").unwrap().id;

    assert!(build.graph.thread_entries().contains(&run));
    assert_eq!(build.graph.len(), model.functions().len());
}

#[test]
fn test_call_chains_resolve_through_return_types() {
    let model = parse(
        Language::Java,
        &[(
            "Store.java",
            indoc! {r#"
                class Item {
                    void touch() {}
                }

                class Store {
                    Item first() { return new Item(); }

                    void use() {
                        first().touch();
                    }
                }
            "#},
        )],
    );
    let build = graph(&model, Language::Java);
    let uses = model.function_by_name("Store", "use").unwrap().id;
    let calls = callees_of(&model, build.graph.entries(uses));

    assert!(calls.contains(&labels(&["Store >> first"])));
    assert!(calls.contains(&labels(&["Item >> touch"])));
}

#[test]
fn test_missing_method_on_user_class_is_a_diagnostic() {
    let model = parse(
        Language::Java,
        &[(
            "Holder.java",
            indoc! {r#"
                class Empty {}

                class Holder {
                    private Empty empty;

                    void run() {
                        empty.vanish();
                    }
                }
            "#},
        )],
    );
    let build = graph(&model, Language::Java);
    let run = model.function_by_name("Holder", "run").unwrap().id;

    assert_eq!(build.diagnostics.len(), 1);
    assert_eq!(build.diagnostics[0].kind, DiagnosticKind::EmptyMethodNode);
    assert_eq!(build.diagnostics[0].function, run);
    assert_eq!(callees_of(&model, build.graph.entries(run)), vec![BTreeSet::new()]);
}

#[test]
fn test_csharp_lock_regions_emit_paired_events() {
    let model = parse(
        Language::CSharp,
        &[(
            "Ledger.cs",
            indoc! {r#"
                public class Ledger
                {
                    private readonly object gate = new object();

                    public void Post()
                    {
                        lock (gate)
                        {
                            Flush();
                        }
                    }

                    private void Flush() {}
                }
            "#},
        )],
    );
    let build = graph(&model, Language::CSharp);
    let post = model.function_by_name("Ledger", "Post").unwrap().id;
    let gate = build.locks.find("Ledger.synchLock_gate").unwrap();
    let entries = build.graph.entries(post);

    assert_eq!(entries.first(), Some(&GraphEntry::Acquire { lock: gate }));
    assert_eq!(entries.last(), Some(&GraphEntry::Release { lock: gate }));
    assert_eq!(
        callees_of(&model, entries),
        vec![labels(&["Ledger >> Flush"])]
    );
}
