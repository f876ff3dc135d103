//! Engine facade: published graph, weight overlay and configuration
//!
//! All methods take `&self`; share the engine behind an `Arc` between request
//! handlers and background rebuilds.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use nav_common::Result;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::assemble::{assemble, RouteOutput};
use crate::builder::build_graph;
use crate::config::EngineConfig;
use crate::cost::{CostModel, RouteOptions};
use crate::geo::Coord;
use crate::graph::RoutingGraph;
use crate::locate::locate_for;
use crate::map_data::MapData;
use crate::overlay::WeightOverlay;
use crate::profile::Mode;
use crate::search::{find_alternatives, SearchAlgorithm, SearchBudget};
use crate::snapshot::GraphHandle;
use crate::storage::load_graph;

/// One point-to-point request
#[derive(Debug, Clone, PartialEq)]
pub struct RouteQuery {
    pub from: Coord,
    pub to: Coord,
    pub mode: Mode,
    /// Alternatives wanted besides the primary route
    pub alternatives: usize,
    pub options: RouteOptions,
    pub algorithm: SearchAlgorithm,
}

impl RouteQuery {
    pub fn new(from: Coord, to: Coord, mode: Mode) -> Self {
        Self {
            from,
            to,
            mode,
            alternatives: 0,
            options: RouteOptions::default(),
            algorithm: SearchAlgorithm::default(),
        }
    }

    pub fn with_alternatives(mut self, alternatives: usize) -> Self {
        self.alternatives = alternatives;
        self
    }

    pub fn with_options(mut self, options: RouteOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_algorithm(mut self, algorithm: SearchAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }
}

/// Snapshot of engine state for health checks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineHealth {
    pub nodes: usize,
    pub edges: usize,
    pub ways: usize,
    pub generation: u64,
    pub overrides: usize,
}

#[derive(Debug)]
pub struct Engine {
    handle: GraphHandle,
    overlay: WeightOverlay,
    config: EngineConfig,
}

impl Engine {
    pub fn new(graph: RoutingGraph, config: EngineConfig) -> Self {
        Self {
            handle: GraphHandle::new(graph),
            overlay: WeightOverlay::new(),
            config,
        }
    }

    pub fn from_map(map: &MapData, config: EngineConfig) -> Result<Self> {
        Ok(Self::new(build_graph(map)?, config))
    }

    pub fn from_file<P: AsRef<Path>>(path: P, config: EngineConfig) -> Result<Self> {
        Ok(Self::new(load_graph(path)?, config))
    }

    pub fn graph(&self) -> Arc<RoutingGraph> {
        self.handle.load()
    }

    pub fn overlay(&self) -> &WeightOverlay {
        &self.overlay
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Budget from the configured deadline and expansion limit
    pub fn default_budget(&self) -> SearchBudget {
        let mut budget = SearchBudget::unlimited();
        if let Some(timeout) = self.config.search.timeout() {
            budget = budget.with_timeout(timeout);
        }
        if let Some(max) = self.config.search.max_expansions {
            budget = budget.with_max_expansions(max);
        }
        budget
    }

    /// Primary route first, then alternatives by increasing duration.
    ///
    /// The graph snapshot is taken once, so a concurrent rebuild never mixes
    /// two graphs within a request. Overlay updates made before the call are
    /// visible.
    pub fn route(&self, query: &RouteQuery, cancel: Option<CancellationToken>) -> Result<Vec<RouteOutput>> {
        query.options.validate()?;

        let started = Instant::now();
        let graph = self.handle.load();
        let locator = &self.config.locator;
        let start = locate_for(&graph, query.from.lat, query.from.lon, query.mode, locator)?;
        let end = locate_for(&graph, query.to.lat, query.to.lon, query.mode, locator)?;

        let mut budget = self.default_budget();
        if let Some(token) = cancel {
            budget = budget.with_cancel(token);
        }

        let k = query.alternatives.min(self.config.alternatives.max_alternatives);
        let model = CostModel::new(&graph, &self.overlay, query.mode, &query.options);
        let results = find_alternatives(
            &graph,
            &model,
            start,
            end,
            k,
            &self.config.alternatives,
            &budget,
            query.algorithm,
        )?;

        let routes: Vec<RouteOutput> = results.iter().map(|r| assemble(&graph, r)).collect();

        tracing::debug!(
            mode = %query.mode,
            requested = query.alternatives,
            routes = routes.len(),
            duration_s = routes.first().map(|r| r.duration_s),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "route computed"
        );
        Ok(routes)
    }

    /// Independent queries solved in parallel, results in input order
    pub fn route_many(&self, queries: &[RouteQuery]) -> Vec<Result<Vec<RouteOutput>>> {
        queries.par_iter().map(|q| self.route(q, None)).collect()
    }

    /// Set a way's cost multiplier; returns the number of edges it covers
    pub fn update_weight(&self, way_id: i64, multiplier: f64) -> Result<usize> {
        let graph = self.handle.load();
        self.overlay.set(way_id, multiplier, &graph)
    }

    /// Build a new graph and publish it. On failure the current graph stays.
    ///
    /// Overrides are keyed by way id, so they carry over to the new graph.
    pub fn rebuild(&self, map: &MapData) -> Result<u64> {
        let graph = build_graph(map).inspect_err(|e| {
            tracing::warn!(error = %e, "graph rebuild failed, keeping current snapshot");
        })?;
        Ok(self.publish(graph))
    }

    /// Swap in `graph`; returns the new generation
    pub fn publish(&self, graph: RoutingGraph) -> u64 {
        let (_, generation) = self.handle.publish(Arc::new(graph));
        generation
    }

    pub fn health(&self) -> EngineHealth {
        let graph = self.handle.load();
        EngineHealth {
            nodes: graph.node_count(),
            edges: graph.edge_count(),
            ways: graph.way_count(),
            generation: self.handle.generation(),
            overrides: self.overlay.len(),
        }
    }
}
