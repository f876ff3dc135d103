//! Immutable road graph
//!
//! Nodes are way intersections and endpoints. Each directed edge covers the
//! stretch of one way between two such nodes and keeps the intermediate way
//! nodes as a shared polyline. Adjacency is stored CSR-style in both
//! directions so forward and backward searches are equally cheap.

use std::collections::HashMap;

use nav_common::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::geo::Coord;
use crate::locate::{PolylineEnds, SpatialIndex};
use crate::profile::{Mode, MODE_COUNT};

/// Dense node index into [`RoutingGraph`]
pub type NodeIx = u32;
/// Dense edge index into [`RoutingGraph`]
pub type EdgeIx = u32;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// OSM node id
    pub osm_id: i64,
    pub coord: Coord,
}

/// Per-mode attributes of one directed edge
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ModeAttrs {
    pub accessible: bool,
    pub speed_kmh: f64,
    /// Surface penalty applied to traversal time
    pub penalty: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source: NodeIx,
    pub target: NodeIx,
    /// OSM way this edge was cut from
    pub way_id: i64,
    pub length_m: f64,
    /// Index of the shared polyline
    pub geom: u32,
    /// True when the edge walks its polyline backwards
    pub reversed: bool,
    /// Feature bits, see [`crate::profile::class_bits`]
    pub class_bits: u32,
    pub modes: [ModeAttrs; MODE_COUNT],
}

impl Edge {
    pub fn attrs(&self, mode: Mode) -> &ModeAttrs {
        &self.modes[mode.index()]
    }

    pub fn is_accessible(&self, mode: Mode) -> bool {
        self.modes[mode.index()].accessible
    }

    pub fn has_class(&self, bit: u32) -> bool {
        self.class_bits & (1 << bit) != 0
    }
}

/// Compressed sparse row adjacency
#[derive(Debug, Clone, Default)]
pub struct Csr {
    /// n_nodes + 1 entries
    offsets: Vec<u32>,
    edges: Vec<EdgeIx>,
}

impl Csr {
    /// Build from `(node, edge)` pairs. Edges keep their relative order per node.
    fn build(n_nodes: usize, pairs: impl Iterator<Item = (NodeIx, EdgeIx)> + Clone) -> Self {
        let mut offsets = vec![0u32; n_nodes + 1];
        for (node, _) in pairs.clone() {
            offsets[node as usize + 1] += 1;
        }
        for i in 0..n_nodes {
            offsets[i + 1] += offsets[i];
        }

        let mut cursor = offsets.clone();
        let mut edges = vec![0; offsets[n_nodes] as usize];
        for (node, edge) in pairs {
            let slot = &mut cursor[node as usize];
            edges[*slot as usize] = edge;
            *slot += 1;
        }

        Self { offsets, edges }
    }

    pub fn edges_of(&self, node: NodeIx) -> &[EdgeIx] {
        let start = self.offsets[node as usize] as usize;
        let end = self.offsets[node as usize + 1] as usize;
        &self.edges[start..end]
    }
}

/// The road network. Immutable once built; share it behind an `Arc`.
#[derive(Debug)]
pub struct RoutingGraph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    polylines: Vec<Vec<Coord>>,
    forward: Csr,
    reverse: Csr,
    node_index: HashMap<i64, NodeIx>,
    way_index: HashMap<i64, Vec<EdgeIx>>,
    spatial_index: SpatialIndex,
}

impl RoutingGraph {
    /// Assemble a graph from its stored parts, rebuilding every index.
    ///
    /// Used by the builder and when loading a snapshot, so it checks that
    /// edges only reference existing nodes and polylines.
    pub fn from_parts(nodes: Vec<Node>, edges: Vec<Edge>, polylines: Vec<Vec<Coord>>) -> Result<Self> {
        if nodes.len() > NodeIx::MAX as usize || edges.len() > EdgeIx::MAX as usize {
            return Err(Error::Storage("graph too large for 32-bit indices".to_string()));
        }

        for (ix, edge) in edges.iter().enumerate() {
            if edge.source as usize >= nodes.len() || edge.target as usize >= nodes.len() {
                return Err(Error::Storage(format!(
                    "edge {ix} references missing node ({} -> {})",
                    edge.source, edge.target
                )));
            }
            if edge.geom as usize >= polylines.len() {
                return Err(Error::Storage(format!(
                    "edge {ix} references missing polyline {}",
                    edge.geom
                )));
            }
            if !is_non_negative(edge.length_m) {
                return Err(Error::Storage(format!(
                    "edge {ix} has invalid length {}",
                    edge.length_m
                )));
            }
            for attrs in &edge.modes {
                if !is_non_negative(attrs.speed_kmh) || !is_non_negative(attrs.penalty) {
                    return Err(Error::Storage(format!(
                        "edge {ix} has invalid speed {} or penalty {}",
                        attrs.speed_kmh, attrs.penalty
                    )));
                }
            }
        }

        let bad_coord = nodes
            .iter()
            .map(|n| &n.coord)
            .chain(polylines.iter().flatten())
            .find(|c| !c.is_valid());
        if let Some(c) = bad_coord {
            return Err(Error::Storage(format!(
                "invalid coordinate ({}, {})",
                c.lat, c.lon
            )));
        }

        let n = nodes.len();
        let forward = Csr::build(
            n,
            edges.iter().enumerate().map(|(i, e)| (e.source, i as EdgeIx)),
        );
        let reverse = Csr::build(
            n,
            edges.iter().enumerate().map(|(i, e)| (e.target, i as EdgeIx)),
        );

        let node_index = nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.osm_id, i as NodeIx))
            .collect();

        let mut way_index: HashMap<i64, Vec<EdgeIx>> = HashMap::new();
        for (i, edge) in edges.iter().enumerate() {
            way_index.entry(edge.way_id).or_default().push(i as EdgeIx);
        }

        // Each polyline is snapped to through the edges walking it
        let mut ends: Vec<Option<PolylineEnds>> = vec![None; polylines.len()];
        for edge in &edges {
            let (first, last) = if edge.reversed {
                (edge.target, edge.source)
            } else {
                (edge.source, edge.target)
            };
            let modes = Mode::all()
                .iter()
                .filter(|&&mode| edge.is_accessible(mode))
                .fold(0u8, |bits, mode| bits | mode.bit());
            let entry = ends[edge.geom as usize].get_or_insert(PolylineEnds {
                first,
                last,
                modes: 0,
            });
            entry.modes |= modes;
        }
        let spatial_index = SpatialIndex::build(&polylines, ends);

        Ok(Self {
            nodes,
            edges,
            polylines,
            forward,
            reverse,
            node_index,
            way_index,
            spatial_index,
        })
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn node(&self, ix: NodeIx) -> &Node {
        &self.nodes[ix as usize]
    }

    pub fn edge(&self, ix: EdgeIx) -> &Edge {
        &self.edges[ix as usize]
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn polylines(&self) -> &[Vec<Coord>] {
        &self.polylines
    }

    /// Outgoing edges of `node` as `(edge, target)`
    pub fn neighbors(&self, node: NodeIx) -> impl Iterator<Item = (EdgeIx, NodeIx)> + '_ {
        self.forward
            .edges_of(node)
            .iter()
            .map(move |&e| (e, self.edges[e as usize].target))
    }

    /// Incoming edges of `node` as `(edge, source)`
    pub fn reverse_neighbors(&self, node: NodeIx) -> impl Iterator<Item = (EdgeIx, NodeIx)> + '_ {
        self.reverse
            .edges_of(node)
            .iter()
            .map(move |&e| (e, self.edges[e as usize].source))
    }

    pub fn node_by_osm_id(&self, osm_id: i64) -> Option<NodeIx> {
        self.node_index.get(&osm_id).copied()
    }

    /// All directed edges cut from one way, empty if the way is unknown
    pub fn edges_of_way(&self, way_id: i64) -> &[EdgeIx] {
        self.way_index
            .get(&way_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn way_count(&self) -> usize {
        self.way_index.len()
    }

    /// Shape points of an edge in traversal order, both end nodes included
    pub fn polyline(&self, edge: EdgeIx) -> impl DoubleEndedIterator<Item = Coord> + '_ {
        let edge = &self.edges[edge as usize];
        let points = &self.polylines[edge.geom as usize];
        let reversed = edge.reversed;
        let n = points.len();
        (0..n).map(move |i| if reversed { points[n - 1 - i] } else { points[i] })
    }

    pub fn spatial_index(&self) -> &SpatialIndex {
        &self.spatial_index
    }

    /// `(min, max)` corners of the node bounding box, `None` for an empty graph
    pub fn bounds(&self) -> Option<(Coord, Coord)> {
        let first = self.nodes.first()?.coord;
        let (min, max) = self.nodes.iter().fold((first, first), |(mut lo, mut hi), n| {
            lo.lat = lo.lat.min(n.coord.lat);
            lo.lon = lo.lon.min(n.coord.lon);
            hi.lat = hi.lat.max(n.coord.lat);
            hi.lon = hi.lon.max(n.coord.lon);
            (lo, hi)
        });
        Some((min, max))
    }
}

fn is_non_negative(v: f64) -> bool {
    v.is_finite() && v >= 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs() -> [ModeAttrs; MODE_COUNT] {
        let a = ModeAttrs {
            accessible: true,
            speed_kmh: 36.0,
            penalty: 1.0,
        };
        [a, a, a]
    }

    fn edge(source: NodeIx, target: NodeIx, geom: u32, reversed: bool) -> Edge {
        Edge {
            source,
            target,
            way_id: 100 + geom as i64,
            length_m: 100.0,
            geom,
            reversed,
            class_bits: 0,
            modes: attrs(),
        }
    }

    fn small_graph() -> RoutingGraph {
        let nodes = vec![
            Node { osm_id: 1, coord: Coord::new(0.0, 0.0) },
            Node { osm_id: 2, coord: Coord::new(0.0, 0.001) },
            Node { osm_id: 3, coord: Coord::new(0.001, 0.001) },
        ];
        let polylines = vec![
            vec![nodes[0].coord, Coord::new(0.0, 0.0005), nodes[1].coord],
            vec![nodes[1].coord, nodes[2].coord],
        ];
        let edges = vec![
            edge(0, 1, 0, false),
            edge(1, 0, 0, true),
            edge(1, 2, 1, false),
        ];
        RoutingGraph::from_parts(nodes, edges, polylines).unwrap()
    }

    #[test]
    fn test_csr_adjacency() {
        let g = small_graph();
        let out: Vec<_> = g.neighbors(1).collect();
        assert_eq!(out, vec![(1, 0), (2, 2)]);
        let inc: Vec<_> = g.reverse_neighbors(1).collect();
        assert_eq!(inc, vec![(0, 0)]);
        assert_eq!(g.neighbors(2).count(), 0);
    }

    #[test]
    fn test_polyline_direction() {
        let g = small_graph();
        let fwd: Vec<_> = g.polyline(0).collect();
        let rev: Vec<_> = g.polyline(1).collect();
        assert_eq!(fwd.len(), 3);
        assert_eq!(fwd.first(), Some(&g.node(0).coord));
        assert_eq!(rev.first(), Some(&g.node(1).coord));
        assert_eq!(rev[1], fwd[1]);
    }

    #[test]
    fn test_indexes() {
        let g = small_graph();
        assert_eq!(g.node_by_osm_id(3), Some(2));
        assert_eq!(g.node_by_osm_id(99), None);
        assert_eq!(g.edges_of_way(100), &[0, 1]);
        assert!(g.edges_of_way(7).is_empty());
        assert_eq!(g.way_count(), 2);
    }

    #[test]
    fn test_from_parts_rejects_dangling_edge() {
        let nodes = vec![Node { osm_id: 1, coord: Coord::new(0.0, 0.0) }];
        let err = RoutingGraph::from_parts(nodes, vec![edge(0, 5, 0, false)], vec![vec![]]);
        assert!(matches!(err, Err(Error::Storage(_))));
    }

    #[test]
    fn test_from_parts_rejects_negative_or_nan_costs() {
        let parts = || {
            let nodes = vec![
                Node { osm_id: 1, coord: Coord::new(0.0, 0.0) },
                Node { osm_id: 2, coord: Coord::new(0.0, 0.001) },
            ];
            let polylines = vec![vec![nodes[0].coord, nodes[1].coord]];
            (nodes, vec![edge(0, 1, 0, false)], polylines)
        };

        let (nodes, mut edges, polylines) = parts();
        edges[0].length_m = -5.0;
        assert!(matches!(
            RoutingGraph::from_parts(nodes, edges, polylines),
            Err(Error::Storage(_))
        ));

        let (nodes, mut edges, polylines) = parts();
        edges[0].modes[Mode::Bike.index()].speed_kmh = f64::NAN;
        assert!(matches!(
            RoutingGraph::from_parts(nodes, edges, polylines),
            Err(Error::Storage(_))
        ));

        let (nodes, mut edges, polylines) = parts();
        edges[0].modes[Mode::Car.index()].penalty = f64::NEG_INFINITY;
        assert!(matches!(
            RoutingGraph::from_parts(nodes, edges, polylines),
            Err(Error::Storage(_))
        ));

        let (nodes, edges, mut polylines) = parts();
        polylines[0][1].lat = 400.0;
        assert!(matches!(
            RoutingGraph::from_parts(nodes, edges, polylines),
            Err(Error::Storage(_))
        ));

        let (nodes, edges, polylines) = parts();
        assert!(RoutingGraph::from_parts(nodes, edges, polylines).is_ok());
    }

    #[test]
    fn test_spatial_index_covers_polylines() {
        let g = small_graph();
        // Two segments on the first polyline, one on the second
        assert_eq!(g.spatial_index().len(), 3);
    }

    #[test]
    fn test_bounds() {
        let g = small_graph();
        let (lo, hi) = g.bounds().unwrap();
        assert_eq!(lo, Coord::new(0.0, 0.0));
        assert_eq!(hi, Coord::new(0.001, 0.001));
    }
}
