//! Route assembly from a search result

use crate::geo::Coord;
use crate::graph::RoutingGraph;
use crate::search::SearchResult;

/// A finished route
#[derive(Debug, Clone, PartialEq)]
pub struct RouteOutput {
    pub distance_m: f64,
    pub duration_s: f64,
    /// Shape of the whole route in travel order
    pub geometry: Vec<Coord>,
    /// OSM ids of the snapped start and end nodes
    pub start_node: i64,
    pub end_node: i64,
    /// Ways in travel order, consecutive repeats collapsed
    pub way_ids: Vec<i64>,
}

/// Turn a path into distance, duration and geometry.
///
/// Distance is the sum of edge lengths and does not depend on the profile.
/// Each edge after the first starts on the vertex the previous one ended on,
/// so that shared vertex is emitted once.
pub fn assemble(graph: &RoutingGraph, result: &SearchResult) -> RouteOutput {
    let mut geometry = Vec::new();
    let mut way_ids: Vec<i64> = Vec::new();
    let mut distance_m = 0.0;

    for (i, &e) in result.edges.iter().enumerate() {
        let edge = graph.edge(e);
        distance_m += edge.length_m;
        if way_ids.last() != Some(&edge.way_id) {
            way_ids.push(edge.way_id);
        }

        let skip = usize::from(i > 0);
        geometry.extend(graph.polyline(e).skip(skip));
    }

    if geometry.is_empty() {
        geometry.push(graph.node(result.start).coord);
    }

    RouteOutput {
        distance_m,
        duration_s: result.duration,
        geometry,
        start_node: graph.node(result.start).osm_id,
        end_node: graph.node(result.end).osm_id,
        way_ids,
    }
}
