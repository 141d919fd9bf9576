mod common;

use common::{analyze, deadlock_names, source_tree};
use indoc::indoc;
use lockscope::config::{ConfigOverrides, LockscopeConfig};
use lockscope::pipeline;
use lockscope::Error;
use pretty_assertions::assert_eq;

#[test]
fn test_java_imports_resolve_across_packages() {
    let analysis = analyze(
        "java",
        &[
            (
                "com/shop/model/Order.java",
                indoc! {r#"
                    package com.shop.model;

                    public class Order {
                        public void confirm() {}
                    }
                "#},
            ),
            (
                "com/shop/service/Checkout.java",
                indoc! {r#"
                    package com.shop.service;

                    import com.shop.model.Order;

                    public class Checkout {
                        private Order order;

                        public void finish() {
                            order.confirm();
                        }
                    }
                "#},
            ),
        ],
    );
    let model = &analysis.model;
    let finish = model
        .function_by_name("com.shop.service.Checkout", "finish")
        .unwrap()
        .id;
    let confirm = model
        .function_by_name("com.shop.model.Order", "confirm")
        .unwrap()
        .id;

    assert!(analysis.build.graph.callees(finish).contains(&confirm));
    assert!(analysis.build.diagnostics.is_empty());
    assert_eq!(analysis.run.files, 2);
}

#[test]
fn test_csharp_file_scoped_namespace_and_using() {
    let analysis = analyze(
        "c#",
        &[
            (
                "Core/Vault.cs",
                indoc! {r#"
                    namespace Bank.Core;

                    public class Vault
                    {
                        public void Open() {}
                    }
                "#},
            ),
            (
                "Api/Teller.cs",
                indoc! {r#"
                    using Bank.Core;

                    namespace Bank.Api
                    {
                        public class Teller
                        {
                            private Vault vault;

                            public void Serve()
                            {
                                vault.Open();
                            }
                        }
                    }
                "#},
            ),
        ],
    );
    let model = &analysis.model;
    let serve = model.function_by_name("Bank.Api.Teller", "Serve").unwrap().id;
    let open = model.function_by_name("Bank.Core.Vault", "Open").unwrap().id;

    assert!(analysis.build.graph.callees(serve).contains(&open));
}

#[test]
fn test_files_with_syntax_errors_are_skipped() {
    let analysis = analyze(
        "java",
        &[
            ("Good.java", "class Good { void ok() {} }"),
            ("Bad.java", "class Bad { void broken( {"),
        ],
    );

    assert_eq!(analysis.run.files, 2);
    assert_eq!(analysis.run.skipped_files, 1);
    assert!(analysis.skipped[0].path.ends_with("Bad.java"));
    assert!(analysis.model.class_by_name("Good").is_some());
}

#[test]
fn test_no_parsable_file_is_fatal() {
    let dir = source_tree(&[("Bad.java", "class Bad { void broken( {")]);
    let config = LockscopeConfig {
        language: Some("java".to_string()),
        src_folder: Some(dir.path().to_path_buf()),
        ..LockscopeConfig::default()
    }
    .resolve(ConfigOverrides::default(), None)
    .unwrap();

    let failure = pipeline::run(&config).unwrap_err();
    assert!(matches!(failure.error, Error::NoParsableFiles(1)));
}

#[test]
fn test_ignore_patterns_exclude_files() {
    let dir = source_tree(&[
        (
            "src/Bank.java",
            indoc! {r#"
                import java.util.concurrent.locks.ReentrantLock;

                class Bank {
                    static final ReentrantLock a = new ReentrantLock();
                    static final ReentrantLock b = new ReentrantLock();

                    void forward() { a.lock(); b.lock(); b.unlock(); a.unlock(); }
                }
            "#},
        ),
        (
            "generated/Reverse.java",
            indoc! {r#"
                class Reverse {
                    void backward() { Bank.b.lock(); Bank.a.lock(); Bank.a.unlock(); Bank.b.unlock(); }
                }
            "#},
        ),
    ]);
    let base = LockscopeConfig {
        language: Some("java".to_string()),
        src_folder: Some(dir.path().to_path_buf()),
        ..LockscopeConfig::default()
    };

    let everything = pipeline::run(&base.clone().resolve(ConfigOverrides::default(), None).unwrap()).unwrap();
    assert_eq!(deadlock_names(&everything), vec![vec!["Bank.a".to_string(), "Bank.b".to_string()]]);

    let filtered = LockscopeConfig {
        ignore_patterns: vec!["**/generated/**".to_string()],
        ..base
    }
    .resolve(ConfigOverrides::default(), None)
    .unwrap();
    let analysis = pipeline::run(&filtered).unwrap();
    assert_eq!(analysis.run.files, 1);
    assert!(analysis.findings.deadlocks.is_empty());
}
