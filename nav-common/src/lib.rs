//! Common types for the nav-osm routing engine

pub mod error;
pub mod suggest;

pub use error::{DataError, Error, Result};
pub use suggest::suggest_correction;
