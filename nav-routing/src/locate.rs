//! Spatial index for snapping coordinates onto the road network
//!
//! Every segment of every polyline goes into the R-tree, so coverage is
//! judged by the distance to the road itself. A query is then routed from
//! the end of that road closer along its geometry.

use std::fmt;

use nav_common::{Error, Result};
use rstar::{PointDistance, RTree, RTreeObject, AABB};

use crate::config::LocatorConfig;
use crate::geo::Coord;
use crate::graph::{NodeIx, RoutingGraph};
use crate::profile::Mode;

/// End nodes of one polyline and the modes that may use it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolylineEnds {
    /// Node at the first shape point
    pub first: NodeIx,
    /// Node at the last shape point
    pub last: NodeIx,
    /// Bit per mode with an accessible edge along the polyline
    pub modes: u8,
}

/// One straight piece of a polyline for the R-tree
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IndexedSegment {
    pub from: [f64; 2], // [lon, lat]
    pub to: [f64; 2],
    /// Polyline index
    pub geom: u32,
    /// Position of `from` within the polyline
    pub seq: u32,
    pub modes: u8,
}

impl IndexedSegment {
    /// Parameter in `[0, 1]` of the point on the segment closest to `point`,
    /// with longitudes scaled by `lon_scale`
    fn project(&self, point: &[f64; 2], lon_scale: f64) -> f64 {
        let dx = (self.to[0] - self.from[0]) * lon_scale;
        let dy = self.to[1] - self.from[1];
        let len_2 = dx * dx + dy * dy;
        if len_2 <= 0.0 {
            return 0.0;
        }
        let px = (point[0] - self.from[0]) * lon_scale;
        let py = point[1] - self.from[1];
        ((px * dx + py * dy) / len_2).clamp(0.0, 1.0)
    }

    fn at(&self, t: f64) -> Coord {
        Coord::new(
            self.from[1] + t * (self.to[1] - self.from[1]),
            self.from[0] + t * (self.to[0] - self.from[0]),
        )
    }
}

impl RTreeObject for IndexedSegment {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.from, self.to)
    }
}

impl PointDistance for IndexedSegment {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let c = self.at(self.project(point, 1.0));
        let dx = c.lon - point[0];
        let dy = c.lat - point[1];
        dx * dx + dy * dy
    }
}

/// Where a query point lands on the network
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snap {
    /// Node the route starts or ends at
    pub node: NodeIx,
    /// Closest point on the road
    pub on_road: Coord,
    /// Great-circle distance from the query to `on_road`, meters
    pub distance_m: f64,
}

/// Spatial index over road geometry
pub struct SpatialIndex {
    tree: RTree<IndexedSegment>,
    ends: Vec<Option<PolylineEnds>>,
    /// Meters from the start of each polyline to each of its shape points
    offsets: Vec<Vec<f64>>,
}

impl fmt::Debug for SpatialIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpatialIndex")
            .field("segments", &self.tree.size())
            .finish()
    }
}

impl SpatialIndex {
    /// Build from the graph's polylines. Polylines without ends or that no
    /// mode can use are left out.
    pub fn build(polylines: &[Vec<Coord>], ends: Vec<Option<PolylineEnds>>) -> Self {
        let mut segments = Vec::new();
        let mut offsets = Vec::with_capacity(polylines.len());

        for (geom, points) in polylines.iter().enumerate() {
            let mut along = Vec::with_capacity(points.len());
            let mut total = 0.0;
            for (i, p) in points.iter().enumerate() {
                if i > 0 {
                    total += points[i - 1].distance_m(p);
                }
                along.push(total);
            }
            offsets.push(along);

            let modes = match ends.get(geom).copied().flatten() {
                Some(e) if e.modes != 0 => e.modes,
                _ => continue,
            };
            segments.extend(points.windows(2).enumerate().map(|(seq, w)| IndexedSegment {
                from: w[0].to_xy(),
                to: w[1].to_xy(),
                geom: geom as u32,
                seq: seq as u32,
                modes,
            }));
        }

        Self {
            tree: RTree::bulk_load(segments),
            ends,
            offsets,
        }
    }

    /// Number of indexed segments
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Closest road usable by `mode` (any mode if `None`).
    ///
    /// The tree orders by planar degree distance, which stretches east-west
    /// away from the equator, so the first `candidates` hits are re-ranked
    /// by haversine distance to their closest point.
    pub fn nearest(&self, coord: Coord, mode: Option<Mode>, candidates: usize) -> Option<Snap> {
        let mask = mode.map_or(u8::MAX, Mode::bit);
        let query = coord.to_xy();
        let lon_scale = coord.lat.to_radians().cos();

        let (segment, on_road, distance_m) = self
            .tree
            .nearest_neighbor_iter(&query)
            .filter(|s| s.modes & mask != 0)
            .take(candidates.max(1))
            .map(|s| {
                let on_road = s.at(s.project(&query, lon_scale));
                (s, on_road, coord.distance_m(&on_road))
            })
            .min_by(|a, b| {
                a.2.total_cmp(&b.2)
                    .then(a.0.geom.cmp(&b.0.geom))
                    .then(a.0.seq.cmp(&b.0.seq))
            })?;

        let ends = self.ends[segment.geom as usize]?;
        let offsets = &self.offsets[segment.geom as usize];
        let from = Coord::new(segment.from[1], segment.from[0]);
        let along = offsets[segment.seq as usize] + from.distance_m(&on_road);
        let total = offsets.last().copied().unwrap_or(0.0);

        let node = if along <= total - along {
            ends.first
        } else {
            ends.last
        };
        Some(Snap {
            node,
            on_road,
            distance_m,
        })
    }
}

/// Snap a coordinate to the network for any mode
pub fn locate(graph: &RoutingGraph, lat: f64, lon: f64, config: &LocatorConfig) -> Result<NodeIx> {
    snap(graph, lat, lon, None, config).map(|s| s.node)
}

/// Snap a coordinate onto a road that `mode` can use
pub fn locate_for(
    graph: &RoutingGraph,
    lat: f64,
    lon: f64,
    mode: Mode,
    config: &LocatorConfig,
) -> Result<NodeIx> {
    snap(graph, lat, lon, Some(mode), config).map(|s| s.node)
}

/// Full snap result, including the point on the road
pub fn snap(
    graph: &RoutingGraph,
    lat: f64,
    lon: f64,
    mode: Option<Mode>,
    config: &LocatorConfig,
) -> Result<Snap> {
    let coord = Coord::new(lat, lon);
    if !coord.is_valid() {
        return Err(Error::InvalidCoordinate { lat, lon });
    }

    let out_of_coverage = || Error::OutOfCoverage {
        lat,
        lon,
        max_distance_m: config.max_snap_distance_m,
    };

    let snapped = graph
        .spatial_index()
        .nearest(coord, mode, config.candidates)
        .ok_or_else(out_of_coverage)?;

    if snapped.distance_m > config.max_snap_distance_m {
        tracing::debug!(lat, lon, distance_m = snapped.distance_m, "nearest road beyond snap radius");
        return Err(out_of_coverage());
    }

    tracing::trace!(lat, lon, node = snapped.node, distance_m = snapped.distance_m, ?mode, "snapped");
    Ok(snapped)
}
