//! Profile cost model
//!
//! Combines an edge's stored per-mode attributes, the request options and
//! the live weight overlay into a traversal time.

use nav_common::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::graph::{Edge, EdgeIx, RoutingGraph};
use crate::overlay::WeightOverlay;
use crate::profile::{class_bits, Mode};

/// Outcome of evaluating one edge
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Traversal {
    /// Traversal time in seconds
    Cost(f64),
    /// The edge may not be used; searches skip it entirely
    Forbidden,
}

impl Traversal {
    pub fn seconds(self) -> Option<f64> {
        match self {
            Traversal::Cost(s) => Some(s),
            Traversal::Forbidden => None,
        }
    }
}

/// Per-request routing options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteOptions {
    pub avoid_tolls: bool,
    /// Avoid motorways and trunk roads
    pub avoid_highways: bool,
    pub avoid_ferries: bool,
    pub avoid_tunnels: bool,
    /// Speed cap in km/h
    pub max_speed_kmh: Option<f64>,
}

impl RouteOptions {
    pub fn validate(&self) -> Result<()> {
        if let Some(max) = self.max_speed_kmh {
            if !max.is_finite() || max <= 0.0 {
                return Err(Error::InvalidOption(format!(
                    "max_speed must be greater than zero, got {max}"
                )));
            }
        }
        Ok(())
    }

    fn avoids(&self, edge: &Edge) -> bool {
        (self.avoid_tolls && edge.has_class(class_bits::TOLL))
            || (self.avoid_highways && edge.has_class(class_bits::HIGHWAY))
            || (self.avoid_ferries && edge.has_class(class_bits::FERRY))
            || (self.avoid_tunnels && edge.has_class(class_bits::TUNNEL))
    }
}

/// Anything a search can ask for the cost of an edge
pub trait EdgeCost {
    /// Traversal time in seconds, `None` if the edge is forbidden
    fn cost(&self, edge: EdgeIx) -> Option<f64>;
}

/// Duration of an edge before the overlay: length over (capped) profile
/// speed, times the surface penalty.
pub fn base_duration(edge: &Edge, mode: Mode, options: &RouteOptions) -> Traversal {
    let attrs = edge.attrs(mode);
    if !attrs.accessible || options.avoids(edge) {
        return Traversal::Forbidden;
    }

    let speed_kmh = match options.max_speed_kmh {
        Some(cap) => attrs.speed_kmh.min(cap),
        None => attrs.speed_kmh,
    };
    if speed_kmh <= 0.0 {
        return Traversal::Forbidden;
    }

    Traversal::Cost(edge.length_m / (speed_kmh / 3.6) * attrs.penalty)
}

/// Full traversal cost: base duration scaled by the way's overlay multiplier
pub fn traverse_cost(
    edge: &Edge,
    mode: Mode,
    overlay: &WeightOverlay,
    options: &RouteOptions,
) -> Traversal {
    match base_duration(edge, mode, options) {
        Traversal::Cost(secs) => Traversal::Cost(secs * overlay.get(edge.way_id)),
        Traversal::Forbidden => Traversal::Forbidden,
    }
}

/// Cost model bound to one graph snapshot, profile and option set
#[derive(Debug, Clone, Copy)]
pub struct CostModel<'a> {
    pub graph: &'a RoutingGraph,
    pub overlay: &'a WeightOverlay,
    pub mode: Mode,
    pub options: &'a RouteOptions,
}

impl<'a> CostModel<'a> {
    pub fn new(
        graph: &'a RoutingGraph,
        overlay: &'a WeightOverlay,
        mode: Mode,
        options: &'a RouteOptions,
    ) -> Self {
        Self {
            graph,
            overlay,
            mode,
            options,
        }
    }

    pub fn traverse_cost(&self, edge: EdgeIx) -> Traversal {
        traverse_cost(self.graph.edge(edge), self.mode, self.overlay, self.options)
    }
}

impl EdgeCost for CostModel<'_> {
    fn cost(&self, edge: EdgeIx) -> Option<f64> {
        self.traverse_cost(edge).seconds()
    }
}
