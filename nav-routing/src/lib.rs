//! Road routing engine over OpenStreetMap-derived graphs
//!
//! Build a [`RoutingGraph`] from [`MapData`] (or load a `.navg` snapshot),
//! wrap it in an [`Engine`] and ask for routes. Live traffic or closures are
//! applied as per-way cost multipliers without touching the graph.

pub mod assemble;
pub mod builder;
pub mod config;
pub mod cost;
pub mod encoding;
pub mod engine;
pub mod geo;
pub mod graph;
pub mod locate;
pub mod map_data;
pub mod overlay;
pub mod profile;
pub mod profiles;
pub mod search;
pub mod snapshot;
pub mod storage;

pub use assemble::{assemble, RouteOutput};
pub use builder::build_graph;
pub use config::{AlternativeConfig, EngineConfig, LocatorConfig, SearchConfig};
pub use cost::{CostModel, EdgeCost, RouteOptions, Traversal};
pub use encoding::{encode_geometry, EncodedGeometry, GeometryFormat, LineString};
pub use engine::{Engine, EngineHealth, RouteQuery};
pub use geo::Coord;
pub use graph::{EdgeIx, NodeIx, RoutingGraph};
pub use locate::{locate, locate_for, snap, Snap};
pub use map_data::{MapData, MapNode, MapWay};
pub use overlay::WeightOverlay;
pub use profile::{HighwayRule, Mode, ProfileInfo, SurfaceRule};
pub use search::{SearchAlgorithm, SearchBudget, SearchResult};
pub use snapshot::GraphHandle;
pub use storage::{load_graph, save_graph};
