//! Lock-order graph: an edge `A -> B` records that `B` was acquired somewhere
//! while `A` was held.

use super::{DeadlockFinding, OrderEdge, Witness};
use crate::ids::LockId;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockOrderGraph {
    edges: BTreeMap<(LockId, LockId), Witness>,
}

impl LockOrderGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Record `from -> to`. The first witness of an edge is kept.
    pub fn insert(&mut self, from: LockId, to: LockId, witness: impl FnOnce() -> Witness) -> bool {
        if from == to || self.edges.contains_key(&(from, to)) {
            return false;
        }
        self.edges.insert((from, to), witness());
        true
    }

    pub fn contains(&self, from: LockId, to: LockId) -> bool {
        self.edges.contains_key(&(from, to))
    }

    /// Fold `other` in; edges already present keep their witness.
    pub fn merge(&mut self, other: LockOrderGraph) {
        for (edge, witness) in other.edges {
            self.edges.entry(edge).or_insert(witness);
        }
    }

    pub fn edges(&self) -> impl Iterator<Item = (LockId, LockId, &Witness)> {
        self.edges.iter().map(|((from, to), witness)| (*from, *to, witness))
    }

    /// One finding per strongly connected component of two or more locks.
    pub fn cycles(&self) -> Vec<DeadlockFinding> {
        let mut graph = DiGraph::<LockId, ()>::new();
        let mut index: HashMap<LockId, NodeIndex> = HashMap::new();
        let mut node = |graph: &mut DiGraph<LockId, ()>, lock: LockId| {
            *index.entry(lock).or_insert_with(|| graph.add_node(lock))
        };
        for (from, to) in self.edges.keys() {
            let a = node(&mut graph, *from);
            let b = node(&mut graph, *to);
            graph.add_edge(a, b, ());
        }

        let mut findings: Vec<DeadlockFinding> = tarjan_scc(&graph)
            .into_iter()
            .filter(|component| component.len() > 1)
            .map(|component| {
                let mut locks: Vec<LockId> = component.iter().map(|n| graph[*n]).collect();
                locks.sort_unstable();
                let edges = self
                    .edges
                    .iter()
                    .filter(|((from, to), _)| {
                        locks.binary_search(from).is_ok() && locks.binary_search(to).is_ok()
                    })
                    .map(|((from, to), witness)| OrderEdge {
                        from: *from,
                        to: *to,
                        witness: witness.clone(),
                    })
                    .collect();
                DeadlockFinding { locks, edges }
            })
            .collect();
        findings.sort_by(|a, b| a.locks.cmp(&b.locks));
        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::FunctionId;
    use pretty_assertions::assert_eq;

    fn witness(function: u32) -> Witness {
        Witness {
            path: vec![FunctionId(function)],
            held_since: FunctionId(function),
            acquired_in: FunctionId(function),
        }
    }

    #[test]
    fn test_first_witness_wins() {
        let mut graph = LockOrderGraph::new();
        assert!(graph.insert(LockId(1), LockId(2), || witness(0)));
        assert!(!graph.insert(LockId(1), LockId(2), || witness(5)));
        assert!(!graph.insert(LockId(3), LockId(3), || witness(5)));
        let (_, _, kept) = graph.edges().next().unwrap();
        assert_eq!(kept, &witness(0));
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_two_lock_inversion_is_one_cycle() {
        let mut graph = LockOrderGraph::new();
        graph.insert(LockId(1), LockId(2), || witness(0));
        graph.insert(LockId(2), LockId(1), || witness(1));
        graph.insert(LockId(2), LockId(3), || witness(1));
        let cycles = graph.cycles();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].locks, vec![LockId(1), LockId(2)]);
        assert_eq!(cycles[0].edges.len(), 2);
    }

    #[test]
    fn test_consistent_order_has_no_cycle() {
        let mut graph = LockOrderGraph::new();
        graph.insert(LockId(1), LockId(2), || witness(0));
        graph.insert(LockId(2), LockId(3), || witness(0));
        graph.insert(LockId(1), LockId(3), || witness(1));
        assert!(graph.cycles().is_empty());
    }

    #[test]
    fn test_three_lock_ring_is_one_component() {
        let mut graph = LockOrderGraph::new();
        graph.insert(LockId(1), LockId(2), || witness(0));
        graph.insert(LockId(2), LockId(3), || witness(1));
        graph.insert(LockId(3), LockId(1), || witness(2));
        let cycles = graph.cycles();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].locks, vec![LockId(1), LockId(2), LockId(3)]);
    }

    #[test]
    fn test_merge_keeps_existing_witness() {
        let mut first = LockOrderGraph::new();
        first.insert(LockId(1), LockId(2), || witness(0));
        let mut second = LockOrderGraph::new();
        second.insert(LockId(1), LockId(2), || witness(7));
        second.insert(LockId(2), LockId(1), || witness(7));
        first.merge(second);
        assert_eq!(first.len(), 2);
        let (_, _, kept) = first.edges().next().unwrap();
        assert_eq!(kept.held_since, FunctionId(0));
    }
}
