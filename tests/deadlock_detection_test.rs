mod common;

use common::{analyze, deadlock_names};
use indoc::indoc;
use pretty_assertions::assert_eq;

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|name| name.to_string()).collect()
}

#[test]
fn test_opposite_lock_order_is_one_finding() {
    let analysis = analyze(
        "java",
        &[(
            "Bank.java",
            indoc! {r#"
                import java.util.concurrent.locks.ReentrantLock;

                class Bank {
                    private final ReentrantLock a = new ReentrantLock();
                    private final ReentrantLock b = new ReentrantLock();

                    void transfer() {
                        a.lock();
                        b.lock();
                        b.unlock();
                        a.unlock();
                    }

                    void refund() {
                        b.lock();
                        a.lock();
                        a.unlock();
                        b.unlock();
                    }
                }
            "#},
        )],
    );
    assert_eq!(deadlock_names(&analysis), vec![names(&["Bank.a", "Bank.b"])]);
    assert_eq!(analysis.findings.deadlocks[0].edges.len(), 2);
}

#[test]
fn test_consistent_lock_order_is_clean() {
    let analysis = analyze(
        "java",
        &[(
            "Bank.java",
            indoc! {r#"
                import java.util.concurrent.locks.ReentrantLock;

                class Bank {
                    private final ReentrantLock a = new ReentrantLock();
                    private final ReentrantLock b = new ReentrantLock();

                    void transfer() {
                        a.lock();
                        b.lock();
                        b.unlock();
                        a.unlock();
                    }

                    void audit() {
                        a.lock();
                        b.lock();
                        b.unlock();
                        a.unlock();
                    }
                }
            "#},
        )],
    );
    assert!(analysis.findings.deadlocks.is_empty());
    assert_eq!(analysis.findings.order_edges, 1);
}

#[test]
fn test_synchronized_methods_calling_each_other() {
    let analysis = analyze(
        "java",
        &[
            (
                "app/A.java",
                indoc! {r#"
                    package app;

                    class A {
                        private B b;

                        synchronized void foo() {
                            b.bar();
                        }

                        synchronized void qux() {}
                    }
                "#},
            ),
            (
                "app/B.java",
                indoc! {r#"
                    package app;

                    class B {
                        private A a;

                        synchronized void bar() {}

                        synchronized void baz() {
                            a.qux();
                        }
                    }
                "#},
            ),
        ],
    );
    assert_eq!(
        deadlock_names(&analysis),
        vec![names(&["app.A.synchLock_this", "app.B.synchLock_this"])]
    );
    let edge = &analysis.findings.deadlocks[0].edges[0];
    assert_eq!(edge.witness.path.len(), 2);
}

#[test]
fn test_nested_synchronized_blocks_on_fields() {
    let analysis = analyze(
        "java",
        &[(
            "Transfer.java",
            indoc! {r#"
                class Transfer {
                    private final Object left = new Object();
                    private final Object right = new Object();

                    void one() {
                        synchronized (left) {
                            synchronized (right) {
                                step();
                            }
                        }
                    }

                    void two() {
                        synchronized (right) {
                            synchronized (left) {
                                step();
                            }
                        }
                    }

                    void step() {}
                }
            "#},
        )],
    );
    assert_eq!(
        deadlock_names(&analysis),
        vec![names(&["Transfer.synchLock_left", "Transfer.synchLock_right"])]
    );
}

#[test]
fn test_same_class_monitor_is_reentrant_not_a_cycle() {
    let analysis = analyze(
        "java",
        &[(
            "Account.java",
            indoc! {r#"
                class Account {
                    private int balance;

                    synchronized void deposit(int amount) {
                        balance = balance + amount;
                    }

                    synchronized void transfer(Account other, int amount) {
                        other.deposit(amount);
                    }
                }
            "#},
        )],
    );
    assert!(analysis.findings.deadlocks.is_empty());
    assert_eq!(analysis.findings.reentrancies.len(), 1);
    let lock = analysis.findings.reentrancies[0].lock;
    assert_eq!(
        analysis.build.locks.name_of(lock),
        Some("Account.synchLock_this")
    );
}

#[test]
fn test_read_write_views_share_their_lock() {
    let analysis = analyze(
        "java",
        &[(
            "Cache.java",
            indoc! {r#"
                import java.util.concurrent.locks.*;

                class Cache {
                    private final ReentrantReadWriteLock rw = new ReentrantReadWriteLock();
                    private final Lock r = rw.readLock();
                    private final ReentrantLock other = new ReentrantLock();

                    void read() {
                        r.lock();
                        other.lock();
                        other.unlock();
                        r.unlock();
                    }

                    void write() {
                        other.lock();
                        rw.writeLock().lock();
                        rw.writeLock().unlock();
                        other.unlock();
                    }
                }
            "#},
        )],
    );
    assert_eq!(
        deadlock_names(&analysis),
        vec![names(&["Cache.rw", "Cache.other"])]
    );
}

#[test]
fn test_interface_dispatch_reaches_every_implementation() {
    let analysis = analyze(
        "java",
        &[(
            "Jobs.java",
            indoc! {r#"
                import java.util.concurrent.locks.ReentrantLock;

                interface Job {
                    void execute();
                }

                class Registry {
                    static final ReentrantLock a = new ReentrantLock();
                    static final ReentrantLock b = new ReentrantLock();
                }

                class First implements Job {
                    public void execute() {
                        Registry.b.lock();
                        Registry.b.unlock();
                    }
                }

                class Second implements Job {
                    public void execute() {}
                }

                class Runner {
                    private Job job;

                    void run() {
                        Registry.a.lock();
                        job.execute();
                        Registry.a.unlock();
                    }

                    void reverse() {
                        Registry.b.lock();
                        Registry.a.lock();
                        Registry.a.unlock();
                        Registry.b.unlock();
                    }
                }
            "#},
        )],
    );
    assert_eq!(
        deadlock_names(&analysis),
        vec![names(&["Registry.a", "Registry.b"])]
    );
}

#[test]
fn test_csharp_lock_statements() {
    let analysis = analyze(
        "c#",
        &[(
            "Bank.cs",
            indoc! {r#"
                namespace Payments
                {
                    public class Bank
                    {
                        private readonly object a = new object();
                        private readonly object b = new object();

                        public void One()
                        {
                            lock (a) { lock (b) { Settle(); } }
                        }

                        public void Two()
                        {
                            lock (b) { lock (a) { Settle(); } }
                        }

                        private void Settle() {}
                    }
                }
            "#},
        )],
    );
    assert_eq!(
        deadlock_names(&analysis),
        vec![names(&["Payments.Bank.synchLock_a", "Payments.Bank.synchLock_b"])]
    );
}
