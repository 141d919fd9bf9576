//! Deadlock detection over the call graph.
//!
//! Every function is a traversal root. Each root yields a partial lock-order
//! graph; partial graphs are merged in root order and every strongly
//! connected component of two or more locks becomes a [`DeadlockFinding`].
//!
//! ## Thread Safety
//!
//! - Roots are traversed on the rayon pool; each traversal owns its memo
//! - Merging happens on the calling thread, so the first witness of an edge
//!   is the one from the lowest root

mod lock_order;
mod traversal;

pub use lock_order::LockOrderGraph;
pub use traversal::{Held, RootOutcome, Traversal};

use crate::graph::CallGraph;
use crate::ids::{FunctionId, LockId};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

pub const DEFAULT_MAX_EXIT_STATES: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Distinct held-lock stacks kept per function summary.
    pub max_exit_states: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            max_exit_states: DEFAULT_MAX_EXIT_STATES,
        }
    }
}

/// Call path justifying one observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Witness {
    /// Functions from the root to the acquiring function.
    pub path: Vec<FunctionId>,
    /// Function that acquired the lock already held.
    pub held_since: FunctionId,
    pub acquired_in: FunctionId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderEdge {
    pub from: LockId,
    pub to: LockId,
    pub witness: Witness,
}

/// Locks that can be acquired in conflicting orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeadlockFinding {
    /// Sorted by id.
    pub locks: Vec<LockId>,
    pub edges: Vec<OrderEdge>,
}

/// A lock acquired while the same lock is already held.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReentrancyFinding {
    pub lock: LockId,
    pub witness: Witness,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Findings {
    pub deadlocks: Vec<DeadlockFinding>,
    pub reentrancies: Vec<ReentrancyFinding>,
    /// Some function summary hit `max_exit_states`.
    pub truncated: bool,
    /// Distinct order edges observed anywhere in the program.
    pub order_edges: usize,
}

impl Findings {
    pub fn is_clean(&self) -> bool {
        self.deadlocks.is_empty() && self.reentrancies.is_empty()
    }
}

/// Lock-order analysis of one [`CallGraph`].
///
/// # Example
///
/// ```ignore
/// let findings = Detector::new(&build.graph)
///     .with_config(DetectorConfig { max_exit_states: 16 })
///     .detect();
/// for finding in &findings.deadlocks {
///     println!("{:?}", finding.locks);
/// }
/// ```
pub struct Detector<'g> {
    graph: &'g CallGraph,
    config: DetectorConfig,
}

impl<'g> Detector<'g> {
    pub fn new(graph: &'g CallGraph) -> Self {
        Self {
            graph,
            config: DetectorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: DetectorConfig) -> Self {
        self.config = config;
        self
    }

    /// Every function in id order, then thread entries not already covered.
    fn roots(&self) -> Vec<FunctionId> {
        let mut roots: Vec<FunctionId> = self.graph.nodes().iter().map(|n| n.function).collect();
        for entry in self.graph.thread_entries() {
            if !roots.contains(entry) {
                roots.push(*entry);
            }
        }
        roots
    }

    /// Merged lock-order graph, first reentrancy witness per lock, and
    /// whether any summary hit `max_exit_states`.
    pub fn lock_order(&self) -> (LockOrderGraph, BTreeMap<LockId, Witness>, bool) {
        let max_exit_states = self.config.max_exit_states;
        let outcomes: Vec<RootOutcome> = self
            .roots()
            .into_par_iter()
            .map(|root| Traversal::new(self.graph, max_exit_states).run(root))
            .collect();

        let mut order = LockOrderGraph::new();
        let mut reentrancies = BTreeMap::new();
        let mut truncated = false;
        for outcome in outcomes {
            order.merge(outcome.order);
            for (lock, witness) in outcome.reentrancies {
                reentrancies.entry(lock).or_insert(witness);
            }
            truncated |= outcome.truncated;
        }
        (order, reentrancies, truncated)
    }

    /// Traverse from every root and report lock-order cycles.
    ///
    /// Deadlocks are sorted by their lock ids; each carries every order edge
    /// inside its component with one call path as witness. A truncated run
    /// may miss edges but never reports one that was not observed.
    pub fn detect(&self) -> Findings {
        let (order, reentrancies, truncated) = self.lock_order();
        let deadlocks = order.cycles();
        info!(
            order_edges = order.len(),
            deadlocks = deadlocks.len(),
            reentrancies = reentrancies.len(),
            truncated,
            "detection finished"
        );
        Findings {
            deadlocks,
            reentrancies: reentrancies
                .into_iter()
                .map(|(lock, witness)| ReentrancyFinding { lock, witness })
                .collect(),
            truncated,
            order_edges: order.len(),
        }
    }
}

/// Detect with the default configuration.
pub fn detect(graph: &CallGraph) -> Findings {
    Detector::new(graph).detect()
}
