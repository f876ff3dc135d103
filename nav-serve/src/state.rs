//! Shared server state and startup loading

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use nav_routing::{save_graph, Engine, MapData};

use crate::config::ServerConfig;

#[derive(Debug)]
pub struct AppState {
    pub engine: Arc<Engine>,
    /// Source for `/graph/reload`
    pub map_data_path: Option<PathBuf>,
    pub searches: SearchStats,
}

/// Counters for route searches running on the blocking pool
#[derive(Debug, Default)]
pub struct SearchStats {
    in_flight: AtomicUsize,
    cancelled: AtomicU64,
}

impl SearchStats {
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Searches stopped because their request went away
    pub fn cancelled(&self) -> u64 {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Count a search as running until the guard drops
    pub fn enter(&self) -> InFlight<'_> {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        InFlight(self)
    }

    pub fn record_cancelled(&self) {
        self.cancelled.fetch_add(1, Ordering::AcqRel);
    }
}

pub struct InFlight<'a>(&'a SearchStats);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

impl AppState {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine: Arc::new(engine),
            map_data_path: None,
            searches: SearchStats::default(),
        }
    }

    pub fn with_map_data_path(mut self, path: Option<PathBuf>) -> Self {
        self.map_data_path = path;
        self
    }

    pub fn load(config: &ServerConfig) -> Result<Self> {
        let engine = load_engine(config)?;
        Ok(Self::new(engine).with_map_data_path(config.map_data_path.clone()))
    }
}

/// Load the graph snapshot if there is one, otherwise build from map data
/// and save the snapshot for the next start.
pub fn load_engine(config: &ServerConfig) -> Result<Engine> {
    let start = Instant::now();

    if let Some(graph_path) = config.graph_data_path.as_deref().filter(|p| p.exists()) {
        match Engine::from_file(graph_path, config.engine.clone()) {
            Ok(engine) => {
                tracing::info!(
                    path = %graph_path.display(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "graph snapshot loaded"
                );
                return Ok(engine);
            }
            Err(e) if config.map_data_path.is_some() => {
                tracing::warn!(error = %e, "failed to load graph snapshot, building from map data");
            }
            Err(e) => {
                return Err(e).with_context(|| format!("failed to load graph {}", graph_path.display()))
            }
        }
    }

    let map_path = config
        .map_data_path
        .as_deref()
        .context("no graph snapshot found and no map data configured")?;
    let map = MapData::from_json_file(map_path)
        .with_context(|| format!("failed to read map data {}", map_path.display()))?;
    let engine = Engine::from_map(&map, config.engine.clone()).context("failed to build graph")?;

    if let Some(graph_path) = &config.graph_data_path {
        // A missing snapshot only slows down the next start
        if let Err(e) = save_graph(&engine.graph(), graph_path) {
            tracing::warn!(error = %e, path = %graph_path.display(), "failed to save graph snapshot");
        }
    }

    tracing::info!(
        elapsed_ms = start.elapsed().as_millis() as u64,
        nodes = engine.health().nodes,
        "graph built from map data"
    );
    Ok(engine)
}
