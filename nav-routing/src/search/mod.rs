//! Path search engine
//!
//! Best-first searches over non-negative edge costs. Costs are supplied by an
//! [`EdgeCost`], so the same code serves plain profile routing and the
//! penalised re-searches used for alternatives.
//!
//! Every search moves through `Initialized → Expanding` and ends in one of
//! `Found`, `Exhausted` (reported as [`Error::NoRouteFound`]), `Cancelled` or
//! `DeadlineExceeded`.

pub mod alternatives;
pub mod bidirectional;
pub mod dijkstra;

use std::cmp::{Ordering, Reverse};
use std::time::{Duration, Instant};

use nav_common::{Error, Result};
use priority_queue::PriorityQueue;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::cost::EdgeCost;
use crate::graph::{EdgeIx, NodeIx, RoutingGraph};

pub use alternatives::{find_alternatives, similarity};
pub use bidirectional::shortest_path_bidirectional;
pub use dijkstra::shortest_path;

/// Lifecycle of one search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    Initialized,
    Expanding,
    Found,
    Exhausted,
    Cancelled,
    DeadlineExceeded,
}

/// Which point-to-point algorithm to run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchAlgorithm {
    /// Forward Dijkstra from the start node
    #[default]
    Dijkstra,
    /// Dijkstra from both ends meeting in the middle
    Bidirectional,
}

/// One path through the graph
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub start: NodeIx,
    pub end: NodeIx,
    /// Edges in traversal order, empty when start == end
    pub edges: Vec<EdgeIx>,
    /// Sum of edge costs in seconds, evaluated while searching
    pub duration: f64,
    /// Nodes settled to find this path
    pub settled: usize,
}

impl SearchResult {
    pub fn distance_m(&self, graph: &RoutingGraph) -> f64 {
        self.edges.iter().map(|&e| graph.edge(e).length_m).sum()
    }
}

/// Cancellation and resource limits for a search
#[derive(Debug, Clone, Default)]
pub struct SearchBudget {
    pub cancel: Option<CancellationToken>,
    pub deadline: Option<Instant>,
    pub max_expansions: Option<usize>,
}

/// Instant::now is only consulted every this many expansions
const DEADLINE_CHECK_INTERVAL: usize = 64;

impl SearchBudget {
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_max_expansions(mut self, max: usize) -> Self {
        self.max_expansions = Some(max);
        self
    }

    /// Called once per settled node
    pub(crate) fn check(&self, expansions: usize) -> Result<()> {
        if self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
            return Err(Error::Cancelled);
        }
        if self.max_expansions.is_some_and(|max| expansions > max) {
            return Err(Error::DeadlineExceeded);
        }
        if expansions % DEADLINE_CHECK_INTERVAL == 0
            && self.deadline.is_some_and(|d| Instant::now() >= d)
        {
            return Err(Error::DeadlineExceeded);
        }
        Ok(())
    }
}

/// Run the selected algorithm
pub fn search<C: EdgeCost>(
    graph: &RoutingGraph,
    cost: &C,
    start: NodeIx,
    end: NodeIx,
    budget: &SearchBudget,
    algorithm: SearchAlgorithm,
) -> Result<SearchResult> {
    match algorithm {
        SearchAlgorithm::Dijkstra => shortest_path(graph, cost, start, end, budget),
        SearchAlgorithm::Bidirectional => shortest_path_bidirectional(graph, cost, start, end, budget),
    }
}

/// Total order over non-negative costs
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Cost(pub f64);

impl Eq for Cost {}

impl PartialOrd for Cost {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cost {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// One direction of a search: tentative costs, parent edges and the queue.
///
/// Queue priorities pair the cost with a discovery sequence number, so of
/// two entries with equal cost the one discovered first pops first.
pub(crate) struct Frontier {
    dist: Vec<f64>,
    parent: Vec<Option<EdgeIx>>,
    settled: Vec<bool>,
    queue: PriorityQueue<NodeIx, Reverse<(Cost, u64)>>,
    seq: u64,
    n_settled: usize,
}

impl Frontier {
    pub(crate) fn new(n_nodes: usize, origin: NodeIx) -> Self {
        let mut frontier = Self {
            dist: vec![f64::INFINITY; n_nodes],
            parent: vec![None; n_nodes],
            settled: vec![false; n_nodes],
            queue: PriorityQueue::new(),
            seq: 0,
            n_settled: 0,
        };
        frontier.dist[origin as usize] = 0.0;
        frontier.queue.push(origin, Reverse((Cost(0.0), 0)));
        frontier
    }

    /// Settle the cheapest queued node
    pub(crate) fn pop(&mut self) -> Option<(NodeIx, f64)> {
        let (node, Reverse((Cost(d), _))) = self.queue.pop()?;
        self.settled[node as usize] = true;
        self.n_settled += 1;
        Some((node, d))
    }

    /// Cost of the next node to settle
    pub(crate) fn peek_cost(&self) -> Option<f64> {
        self.queue.peek().map(|(_, Reverse((Cost(d), _)))| *d)
    }

    /// Offer a new path to `node`. Only strict improvements replace the
    /// current label, so the first of several equal-cost paths wins.
    pub(crate) fn relax(&mut self, node: NodeIx, via: EdgeIx, cost: f64) -> bool {
        let i = node as usize;
        if self.settled[i] || cost >= self.dist[i] {
            return false;
        }
        self.dist[i] = cost;
        self.parent[i] = Some(via);
        self.seq += 1;
        self.queue.push(node, Reverse((Cost(cost), self.seq)));
        true
    }

    pub(crate) fn dist(&self, node: NodeIx) -> f64 {
        self.dist[node as usize]
    }

    pub(crate) fn parent(&self, node: NodeIx) -> Option<EdgeIx> {
        self.parent[node as usize]
    }

    pub(crate) fn is_settled(&self, node: NodeIx) -> bool {
        self.settled[node as usize]
    }

    pub(crate) fn n_settled(&self) -> usize {
        self.n_settled
    }
}

/// Record the terminal state of a search
pub(crate) fn finish(state: &mut SearchState, result: &Result<SearchResult>) {
    *state = match result {
        Ok(_) => SearchState::Found,
        Err(Error::NoRouteFound) => SearchState::Exhausted,
        Err(Error::Cancelled) => SearchState::Cancelled,
        Err(_) => SearchState::DeadlineExceeded,
    };
}
