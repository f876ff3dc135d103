//! Published graph snapshot
//!
//! Readers take an `Arc` clone once per request and keep using it even if a
//! rebuild publishes a newer graph meanwhile.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::graph::RoutingGraph;

#[derive(Debug)]
pub struct GraphHandle {
    current: RwLock<Arc<RoutingGraph>>,
    generation: AtomicU64,
}

impl GraphHandle {
    pub fn new(graph: RoutingGraph) -> Self {
        Self::from_arc(Arc::new(graph))
    }

    pub fn from_arc(graph: Arc<RoutingGraph>) -> Self {
        Self {
            current: RwLock::new(graph),
            generation: AtomicU64::new(1),
        }
    }

    /// The currently published graph
    pub fn load(&self) -> Arc<RoutingGraph> {
        Arc::clone(&self.current.read())
    }

    /// Swap in a new graph. Returns the graph it replaces and the generation
    /// this publish created.
    pub fn publish(&self, graph: Arc<RoutingGraph>) -> (Arc<RoutingGraph>, u64) {
        let (previous, generation) = {
            let mut current = self.current.write();
            let previous = std::mem::replace(&mut *current, graph);
            let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
            (previous, generation)
        };

        tracing::info!(generation, "graph snapshot published");
        (previous, generation)
    }

    /// Starts at 1, incremented by every publish
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}
