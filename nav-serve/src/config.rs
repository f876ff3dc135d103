//! Server configuration
//!
//! Precedence, lowest first: built-in defaults, TOML file, environment
//! (`PORT`, `GRAPH_DATA_PATH`, `MAP_DATA_PATH`, `LOG_LEVEL`), CLI flags.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use nav_routing::EngineConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// `.navg` snapshot loaded at startup, written after a build from map data
    pub graph_data_path: Option<PathBuf>,
    /// Map data JSON used when no snapshot exists and by `/graph/reload`
    pub map_data_path: Option<PathBuf>,
    /// Default filter when `RUST_LOG` is unset
    pub log_level: String,
    pub log_json: bool,
    pub engine: EngineConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            graph_data_path: None,
            map_data_path: None,
            log_level: "info".to_string(),
            log_json: false,
            engine: EngineConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("invalid server config")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("in {}", path.display()))
    }

    /// Defaults, or the given file, with process environment overrides applied
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply overrides from `lookup`; empty values are ignored
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(port) = get("PORT") {
            self.port = port
                .parse()
                .with_context(|| format!("PORT must be a port number, got '{port}'"))?;
        }
        if let Some(path) = get("GRAPH_DATA_PATH") {
            self.graph_data_path = Some(PathBuf::from(path));
        }
        if let Some(path) = get("MAP_DATA_PATH") {
            self.map_data_path = Some(PathBuf::from(path));
        }
        if let Some(level) = get("LOG_LEVEL") {
            self.log_level = level;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.graph_data_path.is_none() && self.map_data_path.is_none() {
            bail!("either graph_data_path (GRAPH_DATA_PATH) or map_data_path (MAP_DATA_PATH) must be set");
        }
        self.engine.validate().context("invalid [engine] section")?;
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
