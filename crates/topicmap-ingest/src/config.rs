//! Engine configuration: `topicmap.toml` plus environment overrides

use std::path::Path;

use serde::{Deserialize, Serialize};
use topicmap_core::{ExclusionSpec, GeneratorOptions, ImportOptions, DEFAULT_HISTORY_LIMIT};
use tracing::debug;

use crate::error::{IngestError, Result};

pub const CONFIG_FILE: &str = "topicmap.toml";
pub const ENV_HISTORY_LIMIT: &str = "TOPICMAP_HISTORY_LIMIT";
pub const ENV_MAX_DEPTH: &str = "TOPICMAP_MAX_DEPTH";

/// Default depth filter applied by `filter` when no flags are given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub max_depth: Option<u32>,
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Snapshots kept by the undo history (0 = unlimited).
    pub history_limit: usize,
    pub max_id_attempts: usize,
    pub slug_max_len: usize,
    pub filter: FilterConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let generator = GeneratorOptions::default();
        EngineConfig {
            history_limit: DEFAULT_HISTORY_LIMIT,
            max_id_attempts: generator.max_id_attempts,
            slug_max_len: generator.slug_max_len,
            filter: FilterConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read `topicmap.toml` and `.env` under `root`, then apply process
    /// environment overrides. Missing files mean defaults.
    pub fn load(root: &Path) -> Result<Self> {
        match dotenvy::from_path(root.join(".env")) {
            Ok(()) => debug!("Loaded .env from {}", root.display()),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(e.into()),
        }

        let path = root.join(CONFIG_FILE);
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path).map_err(|e| IngestError::io(&path, e))?;
            debug!("Loaded config from {}", path.display());
            Self::from_toml_str(&text)?
        } else {
            Self::default()
        };
        config.apply_overrides(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    /// Apply `TOPICMAP_*` overrides looked up through `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(value) = lookup(ENV_HISTORY_LIMIT) {
            self.history_limit = parse_env(ENV_HISTORY_LIMIT, &value)?;
        }
        if let Some(value) = lookup(ENV_MAX_DEPTH) {
            self.filter.max_depth = Some(parse_env(ENV_MAX_DEPTH, &value)?);
        }
        Ok(())
    }

    pub fn generator_options(&self) -> GeneratorOptions {
        GeneratorOptions {
            max_id_attempts: self.max_id_attempts,
            slug_max_len: self.slug_max_len,
        }
    }

    pub fn import_options(&self) -> ImportOptions {
        ImportOptions {
            generator: self.generator_options(),
            history_limit: self.history_limit,
        }
    }

    /// The configured default filter.
    pub fn exclusion_spec(&self) -> ExclusionSpec {
        let mut spec = ExclusionSpec::new();
        spec.max_depth = self.filter.max_depth;
        spec.excluded_classification_keys = self.filter.exclude.iter().cloned().collect();
        spec
    }
}

fn parse_env<T: std::str::FromStr>(var: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| IngestError::InvalidEnv {
        var: var.to_string(),
        value: value.to_string(),
    })
}
