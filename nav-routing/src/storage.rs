//! `.navg` graph snapshots
//!
//! Layout: 4 magic bytes, a little-endian u32 format version, then the
//! bincode-encoded nodes, edges and polylines. Indexes are rebuilt on load.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use nav_common::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::geo::Coord;
use crate::graph::{Edge, Node, RoutingGraph};

pub const MAGIC: &[u8; 4] = b"NAVG";
pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct StoredGraphRef<'a> {
    nodes: &'a [Node],
    edges: &'a [Edge],
    polylines: &'a [Vec<Coord>],
}

#[derive(Deserialize)]
struct StoredGraph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    polylines: Vec<Vec<Coord>>,
}

pub fn write_graph<W: Write>(graph: &RoutingGraph, mut writer: W) -> Result<()> {
    writer.write_all(MAGIC)?;
    writer.write_all(&FORMAT_VERSION.to_le_bytes())?;

    let stored = StoredGraphRef {
        nodes: graph.nodes(),
        edges: graph.edges(),
        polylines: graph.polylines(),
    };
    bincode::serialize_into(&mut writer, &stored)
        .map_err(|e| Error::Storage(format!("failed to serialize graph: {e}")))?;
    writer.flush()?;
    Ok(())
}

pub fn read_graph<R: Read>(mut reader: R) -> Result<RoutingGraph> {
    let mut header = [0u8; 8];
    reader
        .read_exact(&mut header)
        .map_err(|_| Error::Storage("file too short for a graph header".to_string()))?;

    if &header[..4] != MAGIC {
        return Err(Error::Storage("not a graph file (bad magic)".to_string()));
    }
    let version = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    if version != FORMAT_VERSION {
        return Err(Error::Storage(format!(
            "unsupported graph format version {version}, expected {FORMAT_VERSION}"
        )));
    }

    let stored: StoredGraph = bincode::deserialize_from(reader)
        .map_err(|e| Error::Storage(format!("failed to deserialize graph: {e}")))?;
    RoutingGraph::from_parts(stored.nodes, stored.edges, stored.polylines)
}

/// Write `graph` to `path`, replacing any existing file
pub fn save_graph<P: AsRef<Path>>(graph: &RoutingGraph, path: P) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    write_graph(graph, BufWriter::new(file))?;

    tracing::info!(
        path = %path.display(),
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "graph saved"
    );
    Ok(())
}

pub fn load_graph<P: AsRef<Path>>(path: P) -> Result<RoutingGraph> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let graph = read_graph(BufReader::new(file))?;

    tracing::info!(
        path = %path.display(),
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "graph loaded"
    );
    Ok(graph)
}
