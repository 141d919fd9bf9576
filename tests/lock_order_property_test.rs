use lockscope::{detect, CallGraph, CallGraphNode, FunctionId, GraphEntry, LockId};
use proptest::prelude::*;

/// One function per sequence, acquiring the locks in order and releasing in
/// reverse.
fn graph_of(sequences: &[Vec<u32>]) -> CallGraph {
    let nodes = sequences
        .iter()
        .enumerate()
        .map(|(index, locks)| {
            let mut entries: Vec<GraphEntry> = locks
                .iter()
                .map(|lock| GraphEntry::Acquire { lock: LockId(*lock) })
                .collect();
            entries.extend(
                locks
                    .iter()
                    .rev()
                    .map(|lock| GraphEntry::Release { lock: LockId(*lock) }),
            );
            CallGraphNode {
                function: FunctionId(index as u32),
                entries,
            }
        })
        .collect();
    CallGraph::new(nodes, vec![])
}

fn ascending() -> impl Strategy<Value = Vec<u32>> {
    prop::collection::btree_set(0u32..12, 0..6).prop_map(|set| set.into_iter().collect())
}

proptest! {
    /// A global acquisition order never produces a cycle.
    #[test]
    fn global_order_is_deadlock_free(sequences in prop::collection::vec(ascending(), 1..8)) {
        let findings = detect(&graph_of(&sequences));
        prop_assert!(findings.deadlocks.is_empty());
        prop_assert!(findings.reentrancies.is_empty());
    }

    /// Inverting any one pair of locks is reported once, naming both.
    #[test]
    fn inverted_pair_is_reported(a in 0u32..12, b in 0u32..12, mut sequences in prop::collection::vec(ascending(), 0..4)) {
        prop_assume!(a != b);
        sequences.push(vec![a, b]);
        sequences.push(vec![b, a]);
        let findings = detect(&graph_of(&sequences));

        let mut expected = vec![LockId(a), LockId(b)];
        expected.sort();
        prop_assert!(findings
            .deadlocks
            .iter()
            .any(|finding| expected.iter().all(|lock| finding.locks.contains(lock))));
    }
}

#[test]
fn test_three_lock_cycle_is_one_component() {
    let findings = detect(&graph_of(&[vec![0, 1], vec![1, 2], vec![2, 0]]));
    assert_eq!(findings.deadlocks.len(), 1);
    assert_eq!(
        findings.deadlocks[0].locks,
        vec![LockId(0), LockId(1), LockId(2)]
    );
    assert_eq!(findings.deadlocks[0].edges.len(), 3);
}

#[test]
fn test_calls_carry_held_locks_into_callees() {
    let graph = CallGraph::new(
        vec![
            CallGraphNode {
                function: FunctionId(0),
                entries: vec![
                    GraphEntry::Acquire { lock: LockId(0) },
                    GraphEntry::calls([FunctionId(1)]),
                    GraphEntry::Release { lock: LockId(0) },
                ],
            },
            CallGraphNode {
                function: FunctionId(1),
                entries: vec![
                    GraphEntry::Acquire { lock: LockId(1) },
                    GraphEntry::Release { lock: LockId(1) },
                ],
            },
            CallGraphNode {
                function: FunctionId(2),
                entries: vec![
                    GraphEntry::Acquire { lock: LockId(1) },
                    GraphEntry::Acquire { lock: LockId(0) },
                    GraphEntry::Release { lock: LockId(0) },
                    GraphEntry::Release { lock: LockId(1) },
                ],
            },
        ],
        vec![],
    );
    let findings = detect(&graph);
    assert_eq!(findings.deadlocks.len(), 1);
    let edge = findings.deadlocks[0]
        .edges
        .iter()
        .find(|edge| edge.from == LockId(0))
        .unwrap();
    assert_eq!(edge.witness.held_since, FunctionId(0));
    assert_eq!(edge.witness.acquired_in, FunctionId(1));
}
