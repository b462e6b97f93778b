//! Configuration file support for deprules.
//!
//! Loads optional `.deprules/config.toml` from project root.

use serde::Deserialize;
use std::path::Path;

use tracing::warn;

use crate::transform::CutCapacity;

/// Root configuration structure
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct DeprulesConfig {
    pub transform: TransformConfig,
}

/// Knobs for the transformation passes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    /// Ignore cycles longer than this many edges.
    pub max_cycle_length: usize,
    /// Maximum hide-and-repeat rounds for pure-sink hiding.
    pub sink_depth: usize,
    /// Which edge count feeds minimum-cut capacities: "ct", "questionable"
    /// or "bad".
    pub cut_capacity: String,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            max_cycle_length: 64,
            sink_depth: 10,
            cut_capacity: "ct".to_string(),
        }
    }
}

impl DeprulesConfig {
    /// Load config from `.deprules/config.toml` in the given root directory.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load(root: &Path) -> Self {
        let config_path = root.join(".deprules").join("config.toml");
        Self::load_from_path(&config_path)
    }

    /// Load config from a specific path.
    pub fn load_from_path(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to parse config");
                    Self::default()
                }
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read config");
                Self::default()
            }
        }
    }

    /// Resolve the configured cut capacity, falling back to raw counts on
    /// an unrecognized value.
    pub fn cut_capacity(&self) -> CutCapacity {
        match self.transform.cut_capacity.as_str() {
            "questionable" => CutCapacity::Questionable,
            "bad" => CutCapacity::Bad,
            "ct" => CutCapacity::Ct,
            other => {
                warn!(value = other, "unknown cut_capacity, using ct");
                CutCapacity::Ct
            }
        }
    }
}
