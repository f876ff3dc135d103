//! Engine configuration
//!
//! Every section has defaults, so an empty TOML document is a valid config.

use std::path::Path;
use std::time::Duration;

use nav_common::{Error, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub locator: LocatorConfig,
    pub search: SearchConfig,
    pub alternatives: AlternativeConfig,
}

/// Snapping of query coordinates to graph nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    /// Query points farther than this from any usable road are out of coverage
    pub max_snap_distance_m: f64,
    /// Nearest R-tree hits re-ranked by great-circle distance
    pub candidates: usize,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            max_snap_distance_m: 2_000.0,
            candidates: 16,
        }
    }
}

/// Per-search resource limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Settled nodes after which a search gives up, `None` for unbounded
    pub max_expansions: Option<usize>,
    /// Wall-clock budget for one route request, `None` for unbounded
    pub timeout_ms: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_expansions: Some(5_000_000),
            timeout_ms: Some(10_000),
        }
    }
}

impl SearchConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

/// Penalty-based alternative route policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlternativeConfig {
    /// Requests asking for more alternatives are clamped to this
    pub max_alternatives: usize,
    /// Cost factor applied to edges of already-found paths before re-searching
    pub penalty_factor: f64,
    /// Candidates sharing this fraction of length with an accepted route are rejected
    pub similarity_threshold: f64,
    /// Re-searches allowed per requested alternative
    pub max_attempts_per_alternative: usize,
    /// Candidates slower than this multiple of the primary route are rejected
    pub max_duration_ratio: f64,
}

impl Default for AlternativeConfig {
    fn default() -> Self {
        Self {
            max_alternatives: 5,
            penalty_factor: 1.5,
            similarity_threshold: 0.7,
            max_attempts_per_alternative: 4,
            max_duration_ratio: 2.0,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(Error::Config(msg.to_string()));

        if !is_positive(self.locator.max_snap_distance_m) {
            return invalid("locator.max_snap_distance_m must be positive");
        }
        if self.locator.candidates == 0 {
            return invalid("locator.candidates must be at least 1");
        }
        let alt = &self.alternatives;
        if !is_positive(alt.penalty_factor - 1.0) {
            return invalid("alternatives.penalty_factor must be greater than 1");
        }
        if !is_positive(alt.similarity_threshold) || alt.similarity_threshold > 1.0 {
            return invalid("alternatives.similarity_threshold must be in (0, 1]");
        }
        if alt.max_duration_ratio.is_nan() || alt.max_duration_ratio < 1.0 {
            return invalid("alternatives.max_duration_ratio must be at least 1");
        }
        Ok(())
    }
}

fn is_positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}
