//! Held-lock traversal from one root.
//!
//! A function is summarized per entry lock stack as the set of stacks it can
//! exit with. Summaries are relative to the entry stack: a frame either
//! refers to a position of the entry stack or to a lock acquired during the
//! call, so one summary serves every caller entering with the same lock ids.

use super::lock_order::LockOrderGraph;
use super::Witness;
use crate::graph::{CallGraph, GraphEntry};
use crate::ids::{FunctionId, LockId};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::trace;

/// Lock on the held stack and the function that acquired it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Held {
    pub lock: LockId,
    pub acquired_in: FunctionId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum Frame {
    /// Position in the entry stack.
    Inherited(usize),
    Acquired(Held),
}

type Stack = Vec<Frame>;

/// What one root contributes to the findings.
#[derive(Debug, Default)]
pub struct RootOutcome {
    pub order: LockOrderGraph,
    pub reentrancies: BTreeMap<LockId, Witness>,
    pub truncated: bool,
}

pub struct Traversal<'g> {
    graph: &'g CallGraph,
    max_exit_states: usize,
    summaries: HashMap<(FunctionId, Vec<LockId>), BTreeSet<Stack>>,
    path: Vec<FunctionId>,
    outcome: RootOutcome,
}

impl<'g> Traversal<'g> {
    pub fn new(graph: &'g CallGraph, max_exit_states: usize) -> Self {
        Self {
            graph,
            max_exit_states: max_exit_states.max(1),
            summaries: HashMap::new(),
            path: Vec::new(),
            outcome: RootOutcome::default(),
        }
    }

    pub fn run(mut self, root: FunctionId) -> RootOutcome {
        self.function(root, &[]);
        self.outcome
    }

    /// Exit stacks of `function` entered holding `entry`.
    fn function(&mut self, function: FunctionId, entry: &[Held]) -> BTreeSet<Stack> {
        let identity: Stack = (0..entry.len()).map(Frame::Inherited).collect();
        if self.path.contains(&function) {
            return BTreeSet::from([identity]);
        }
        let key = (function, entry.iter().map(|held| held.lock).collect::<Vec<_>>());
        if let Some(summary) = self.summaries.get(&key) {
            return summary.clone();
        }

        self.path.push(function);
        let graph = self.graph;
        let mut states = BTreeSet::from([identity]);
        for entry_point in graph.entries(function) {
            if states.is_empty() {
                break;
            }
            let mut next = BTreeSet::new();
            for state in &states {
                self.step(function, entry, state, entry_point, &mut next);
            }
            states = self.bounded(function, next);
        }
        self.path.pop();

        self.summaries.insert(key, states.clone());
        states
    }

    fn bounded(&mut self, function: FunctionId, states: BTreeSet<Stack>) -> BTreeSet<Stack> {
        if states.len() <= self.max_exit_states {
            return states;
        }
        trace!(%function, states = states.len(), "exit states capped");
        self.outcome.truncated = true;
        states.into_iter().take(self.max_exit_states).collect()
    }

    fn step(
        &mut self,
        function: FunctionId,
        entry: &[Held],
        state: &Stack,
        graph_entry: &GraphEntry,
        next: &mut BTreeSet<Stack>,
    ) {
        match graph_entry {
            GraphEntry::Acquire { lock } => {
                let held = materialize(state, entry);
                self.acquire(function, &held, *lock);
                let mut state = state.clone();
                state.push(Frame::Acquired(Held {
                    lock: *lock,
                    acquired_in: function,
                }));
                next.insert(state);
            }
            GraphEntry::Release { lock } => {
                let mut state = state.clone();
                let position = state
                    .iter()
                    .rposition(|frame| lock_of(*frame, entry) == Some(*lock));
                if let Some(position) = position {
                    state.remove(position);
                }
                next.insert(state);
            }
            GraphEntry::Opaque => {}
            GraphEntry::Calls { callees } if callees.is_empty() => {
                next.insert(state.clone());
            }
            GraphEntry::Calls { callees } => {
                let held = materialize(state, entry);
                for callee in callees {
                    for exit in self.function(*callee, &held) {
                        next.insert(compose(state, &exit));
                    }
                }
            }
        }
    }

    fn acquire(&mut self, function: FunctionId, held: &[Held], lock: LockId) {
        let path = &self.path;
        let witness = |since: FunctionId| Witness {
            path: path.clone(),
            held_since: since,
            acquired_in: function,
        };
        if let Some(outer) = held.iter().find(|h| h.lock == lock) {
            self.outcome
                .reentrancies
                .entry(lock)
                .or_insert_with(|| witness(outer.acquired_in));
        }
        for outer in held.iter().filter(|h| h.lock != lock) {
            self.outcome
                .order
                .insert(outer.lock, lock, || witness(outer.acquired_in));
        }
    }
}

fn lock_of(frame: Frame, entry: &[Held]) -> Option<LockId> {
    match frame {
        Frame::Inherited(index) => entry.get(index).map(|held| held.lock),
        Frame::Acquired(held) => Some(held.lock),
    }
}

fn materialize(state: &Stack, entry: &[Held]) -> Vec<Held> {
    state
        .iter()
        .filter_map(|frame| match frame {
            Frame::Inherited(index) => entry.get(*index).copied(),
            Frame::Acquired(held) => Some(*held),
        })
        .collect()
}

/// Callee exit stack, expressed relative to the caller's entry stack.
fn compose(caller: &Stack, callee_exit: &Stack) -> Stack {
    callee_exit
        .iter()
        .filter_map(|frame| match frame {
            Frame::Inherited(index) => caller.get(*index).copied(),
            Frame::Acquired(held) => Some(Frame::Acquired(*held)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::CallGraphNode;
    use pretty_assertions::assert_eq;

    fn node(function: u32, entries: Vec<GraphEntry>) -> CallGraphNode {
        CallGraphNode {
            function: FunctionId(function),
            entries,
        }
    }

    fn acquire(lock: u32) -> GraphEntry {
        GraphEntry::Acquire { lock: LockId(lock) }
    }

    fn release(lock: u32) -> GraphEntry {
        GraphEntry::Release { lock: LockId(lock) }
    }

    #[test]
    fn test_nested_acquire_across_call_records_edge() {
        let graph = CallGraph::new(
            vec![
                node(0, vec![acquire(1), GraphEntry::calls([FunctionId(1)]), release(1)]),
                node(1, vec![acquire(2), release(2)]),
            ],
            vec![],
        );
        let outcome = Traversal::new(&graph, 64).run(FunctionId(0));
        let edges: Vec<_> = outcome.order.edges().collect();
        assert_eq!(edges.len(), 1);
        let (from, to, witness) = edges[0];
        assert_eq!((from, to), (LockId(1), LockId(2)));
        assert_eq!(witness.path, vec![FunctionId(0), FunctionId(1)]);
        assert_eq!(witness.held_since, FunctionId(0));
        assert_eq!(witness.acquired_in, FunctionId(1));
    }

    #[test]
    fn test_lock_released_in_callee() {
        // 0: lock(1); unlockHelper(); lock(2)   -- 1 is no longer held
        let graph = CallGraph::new(
            vec![
                node(0, vec![acquire(1), GraphEntry::calls([FunctionId(1)]), acquire(2)]),
                node(1, vec![release(1)]),
            ],
            vec![],
        );
        let outcome = Traversal::new(&graph, 64).run(FunctionId(0));
        assert!(outcome.order.is_empty());
    }

    #[test]
    fn test_release_of_unheld_lock_is_ignored() {
        let graph = CallGraph::new(
            vec![node(0, vec![release(3), acquire(1), acquire(2)])],
            vec![],
        );
        let outcome = Traversal::new(&graph, 64).run(FunctionId(0));
        assert!(outcome.order.contains(LockId(1), LockId(2)));
    }

    #[test]
    fn test_reentrant_acquire_is_not_an_order_edge() {
        let graph = CallGraph::new(
            vec![node(
                0,
                vec![acquire(1), acquire(1), release(1), acquire(2)],
            )],
            vec![],
        );
        let outcome = Traversal::new(&graph, 64).run(FunctionId(0));
        assert_eq!(outcome.reentrancies.keys().copied().collect::<Vec<_>>(), vec![LockId(1)]);
        // the outer acquisition is still held when 2 is taken
        assert!(outcome.order.contains(LockId(1), LockId(2)));
        assert!(!outcome.order.contains(LockId(1), LockId(1)));
    }

    #[test]
    fn test_opaque_ends_the_path() {
        let graph = CallGraph::new(
            vec![
                node(0, vec![acquire(1), GraphEntry::calls([FunctionId(1)]), acquire(2)]),
                node(1, vec![GraphEntry::Opaque, release(1)]),
            ],
            vec![],
        );
        let outcome = Traversal::new(&graph, 64).run(FunctionId(0));
        assert!(outcome.order.is_empty());
    }

    #[test]
    fn test_recursion_terminates_with_caller_state() {
        let graph = CallGraph::new(
            vec![
                node(0, vec![acquire(1), GraphEntry::calls([FunctionId(1)]), release(1)]),
                node(1, vec![GraphEntry::calls([FunctionId(0)]), acquire(2), release(2)]),
            ],
            vec![],
        );
        let outcome = Traversal::new(&graph, 64).run(FunctionId(0));
        assert!(outcome.order.contains(LockId(1), LockId(2)));
        assert!(outcome.reentrancies.is_empty());
    }

    #[test]
    fn test_branching_callees_are_capped() {
        let callees: Vec<FunctionId> = (1..=4).map(FunctionId).collect();
        let mut nodes = vec![node(0, vec![GraphEntry::calls(callees.clone())])];
        for callee in &callees {
            nodes.push(node(callee.0, vec![acquire(callee.0)]));
        }
        let graph = CallGraph::new(nodes, vec![]);
        let outcome = Traversal::new(&graph, 2).run(FunctionId(0));
        assert!(outcome.truncated);

        let outcome = Traversal::new(&graph, 8).run(FunctionId(0));
        assert!(!outcome.truncated);
    }
}
