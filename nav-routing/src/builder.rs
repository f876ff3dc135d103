//! Graph construction from extracted map data
//!
//! Runs every profile over every way, cuts routable ways at intersections and
//! emits one directed edge per direction that at least one mode may use.

use std::collections::{HashMap, HashSet};

use nav_common::{DataError, Result};

use crate::geo::{polyline_length, Coord};
use crate::graph::{Edge, ModeAttrs, Node, NodeIx, RoutingGraph};
use crate::map_data::MapData;
use crate::profile::{WayAttrs, MODE_COUNT};
use crate::profiles::{self, TagLookup};

/// A way that survived profiling
struct RoutableWay {
    id: i64,
    refs: Vec<i64>,
    attrs: [WayAttrs; MODE_COUNT],
    class_bits: u32,
}

/// Build a routing graph.
///
/// Fails on structurally inconsistent input: duplicate node or way ids,
/// ways referencing unknown nodes, invalid coordinates, routable ways with
/// fewer than two distinct nodes, or no routable way at all. Ways without
/// a usable highway tag are skipped.
pub fn build_graph(map: &MapData) -> Result<RoutingGraph> {
    let mut coords: HashMap<i64, Coord> = HashMap::with_capacity(map.nodes.len());
    for node in &map.nodes {
        let coord = Coord::new(node.lat, node.lon);
        if !coord.is_valid() {
            return Err(DataError::InvalidCoordinate {
                node: node.id,
                lat: node.lat,
                lon: node.lon,
            }
            .into());
        }
        if coords.insert(node.id, coord).is_some() {
            return Err(DataError::DuplicateNode(node.id).into());
        }
    }

    let mut seen_ways = HashSet::with_capacity(map.ways.len());
    let mut routable = Vec::new();
    let mut skipped = 0usize;

    for way in &map.ways {
        if !seen_ways.insert(way.id) {
            return Err(DataError::DuplicateWay(way.id).into());
        }
        if let Some(&missing) = way.nodes.iter().find(|r| !coords.contains_key(r)) {
            return Err(DataError::DanglingNodeRef {
                way: way.id,
                node: missing,
            }
            .into());
        }

        let tags = TagLookup::new(&way.tags);
        let attrs = profiles::process_way_all(&tags);
        if !attrs.iter().any(WayAttrs::is_routable) {
            skipped += 1;
            continue;
        }

        let mut refs = way.nodes.clone();
        refs.dedup();
        if refs.len() < 2 {
            return Err(DataError::DegenerateWay(way.id).into());
        }

        routable.push(RoutableWay {
            id: way.id,
            refs,
            attrs,
            class_bits: profiles::classify(&tags),
        });
    }

    if routable.is_empty() {
        return Err(DataError::Empty.into());
    }

    // Endpoints and shared nodes become graph nodes, the rest are shape points
    let mut uses: HashMap<i64, u32> = HashMap::new();
    for way in &routable {
        for r in &way.refs {
            *uses.entry(*r).or_default() += 1;
        }
    }
    let is_junction = |way: &RoutableWay, i: usize| {
        i == 0 || i == way.refs.len() - 1 || uses.get(&way.refs[i]).copied().unwrap_or(0) > 1
    };

    let mut nodes: Vec<Node> = Vec::new();
    let mut node_ix: HashMap<i64, NodeIx> = HashMap::new();
    let mut intern = |osm_id: i64, coord: Coord| -> NodeIx {
        *node_ix.entry(osm_id).or_insert_with(|| {
            nodes.push(Node { osm_id, coord });
            (nodes.len() - 1) as NodeIx
        })
    };

    let mut edges: Vec<Edge> = Vec::new();
    let mut polylines: Vec<Vec<Coord>> = Vec::new();

    for way in &routable {
        let mut start = 0;
        for i in 1..way.refs.len() {
            if !is_junction(way, i) {
                continue;
            }

            let shape: Vec<Coord> = way.refs[start..=i].iter().map(|r| coords[r]).collect();
            let from = intern(way.refs[start], shape[0]);
            let to = intern(way.refs[i], shape[shape.len() - 1]);
            let length_m = polyline_length(&shape);
            let geom = polylines.len() as u32;
            polylines.push(shape);

            let mut emit = |source: NodeIx, target: NodeIx, reversed: bool| {
                let modes = way.attrs.map(|a| {
                    let allowed = if reversed { a.access_rev } else { a.access_fwd };
                    ModeAttrs {
                        accessible: allowed && a.speed_kmh > 0.0,
                        speed_kmh: a.speed_kmh,
                        penalty: a.penalty,
                    }
                });
                if modes.iter().any(|m| m.accessible) {
                    edges.push(Edge {
                        source,
                        target,
                        way_id: way.id,
                        length_m,
                        geom,
                        reversed,
                        class_bits: way.class_bits,
                        modes,
                    });
                }
            };
            emit(from, to, false);
            emit(to, from, true);

            start = i;
        }
    }

    tracing::info!(
        nodes = nodes.len(),
        edges = edges.len(),
        ways = routable.len(),
        skipped_ways = skipped,
        "built routing graph"
    );

    RoutingGraph::from_parts(nodes, edges, polylines)
}
