//! Error types for the nav-osm routing engine
//!
//! Library code returns these typed errors. The binaries wrap them with
//! `anyhow` context at the application boundary.

use thiserror::Error;

/// Structural problems found while building a graph from map data.
///
/// A build that fails with one of these never replaces the graph that is
/// currently being served.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("duplicate node id {0}")]
    DuplicateNode(i64),

    #[error("duplicate way id {0}")]
    DuplicateWay(i64),

    #[error("way {way} references unknown node {node}")]
    DanglingNodeRef { way: i64, node: i64 },

    #[error("way {0} has fewer than two distinct nodes")]
    DegenerateWay(i64),

    #[error("node {node} has invalid coordinate ({lat}, {lon})")]
    InvalidCoordinate { node: i64, lat: f64, lon: f64 },

    #[error("map data contains no routable ways")]
    Empty,
}

/// Main error type for routing operations
#[derive(Debug, Error)]
pub enum Error {
    /// Map data could not be turned into a graph
    #[error("invalid map data: {0}")]
    Data(#[from] DataError),

    /// Weight multiplier was zero, negative or not finite
    #[error("invalid multiplier {0}: must be a finite value greater than zero")]
    InvalidMultiplier(f64),

    /// No usable node within the snap radius of a query point
    #[error("no routable node within {max_distance_m} m of ({lat}, {lon})")]
    OutOfCoverage {
        lat: f64,
        lon: f64,
        max_distance_m: f64,
    },

    /// The destination is unreachable under the requested profile
    #[error("no route found")]
    NoRouteFound,

    /// The caller cancelled the search
    #[error("search cancelled")]
    Cancelled,

    /// The search ran past its deadline or expansion budget
    #[error("search deadline exceeded")]
    DeadlineExceeded,

    #[error(
        "unknown profile '{name}'{}",
        .suggestion.as_ref().map(|s| format!(", did you mean '{s}'?")).unwrap_or_default()
    )]
    UnknownProfile {
        name: String,
        suggestion: Option<String>,
    },

    #[error("invalid coordinate ({lat}, {lon})")]
    InvalidCoordinate { lat: f64, lon: f64 },

    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Graph snapshot file is corrupt, truncated or of another format
    #[error("storage error: {0}")]
    Storage(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// True for errors that end a search early without a verdict on reachability.
    pub fn is_aborted(&self) -> bool {
        matches!(self, Error::Cancelled | Error::DeadlineExceeded)
    }
}

/// Convenience result type for routing operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_profile_message_includes_suggestion() {
        let err = Error::UnknownProfile {
            name: "bikr".to_string(),
            suggestion: Some("bike".to_string()),
        };
        assert_eq!(err.to_string(), "unknown profile 'bikr', did you mean 'bike'?");

        let err = Error::UnknownProfile {
            name: "zeppelin".to_string(),
            suggestion: None,
        };
        assert_eq!(err.to_string(), "unknown profile 'zeppelin'");
    }

    #[test]
    fn test_data_error_converts() {
        let err: Error = DataError::DanglingNodeRef { way: 7, node: 42 }.into();
        assert!(matches!(err, Error::Data(_)));
        assert_eq!(
            err.to_string(),
            "invalid map data: way 7 references unknown node 42"
        );
    }

    #[test]
    fn test_is_aborted() {
        assert!(Error::Cancelled.is_aborted());
        assert!(Error::DeadlineExceeded.is_aborted());
        assert!(!Error::NoRouteFound.is_aborted());
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
