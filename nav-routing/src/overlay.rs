//! Live per-way weight overrides
//!
//! The overlay sits beside the graph: it never mutates edges, it is only read
//! when an edge cost is evaluated. The map is sharded, so writers to one way
//! only contend with readers of ways in the same shard.

use dashmap::DashMap;
use nav_common::{Error, Result};

use crate::graph::RoutingGraph;

/// Way id → cost multiplier. Missing ways have a multiplier of 1.0.
#[derive(Debug, Default)]
pub struct WeightOverlay {
    multipliers: DashMap<i64, f64>,
}

impl WeightOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a multiplier for a way, replacing any previous one.
    ///
    /// Returns how many edges of `graph` belong to that way. A way unknown
    /// to the graph is still stored and reports 0.
    pub fn set(&self, way_id: i64, multiplier: f64, graph: &RoutingGraph) -> Result<usize> {
        if !multiplier.is_finite() || multiplier <= 0.0 {
            return Err(Error::InvalidMultiplier(multiplier));
        }
        self.multipliers.insert(way_id, multiplier);

        let affected = graph.edges_of_way(way_id).len();
        tracing::debug!(way_id, multiplier, affected, "weight override set");
        Ok(affected)
    }

    pub fn get(&self, way_id: i64) -> f64 {
        self.multipliers
            .get(&way_id)
            .map(|m| *m.value())
            .unwrap_or(1.0)
    }

    /// Drop the override for one way. Returns the removed multiplier.
    pub fn reset(&self, way_id: i64) -> Option<f64> {
        self.multipliers.remove(&way_id).map(|(_, m)| m)
    }

    pub fn clear(&self) {
        self.multipliers.clear();
    }

    pub fn len(&self) -> usize {
        self.multipliers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.multipliers.is_empty()
    }

    /// Copy of every override sorted by way id
    pub fn overrides(&self) -> Vec<(i64, f64)> {
        let mut all: Vec<(i64, f64)> = self
            .multipliers
            .iter()
            .map(|entry| (*entry.key(), *entry.value()))
            .collect();
        all.sort_by_key(|(way, _)| *way);
        all
    }
}
