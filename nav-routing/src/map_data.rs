//! Extracted map data: the input the graph is built from
//!
//! OSM ingestion happens elsewhere. This module only knows the flat
//! node/way document that the extractor writes as JSON.

use std::collections::BTreeMap;
use std::path::Path;

use nav_common::{Error, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapNode {
    pub id: i64,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapWay {
    pub id: i64,
    /// Node references in way order
    pub nodes: Vec<i64>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// Nodes and tagged ways of one extract
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapData {
    pub nodes: Vec<MapNode>,
    pub ways: Vec<MapWay>,
}

impl MapData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| Error::Storage(format!("invalid map data JSON: {e}")))
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let map = Self::from_json_str(&text)?;
        tracing::info!(
            path = %path.display(),
            nodes = map.nodes.len(),
            ways = map.ways.len(),
            "loaded map data"
        );
        Ok(map)
    }

    pub fn add_node(&mut self, id: i64, lat: f64, lon: f64) -> &mut Self {
        self.nodes.push(MapNode { id, lat, lon });
        self
    }

    pub fn add_way(&mut self, id: i64, nodes: &[i64], tags: &[(&str, &str)]) -> &mut Self {
        self.ways.push(MapWay {
            id,
            nodes: nodes.to_vec(),
            tags: tags
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        });
        self
    }
}
