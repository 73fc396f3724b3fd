use std::path::Path;

use serde::Deserialize;

use crate::coordinator::MAX_WORKERS;
use crate::enums::{ExecutorKind, Verbosity};
use crate::error::{RadiomicsError, Result, ensure_exists};
use crate::table::EXCLUDED_PREFIXES;

/// Extraction settings, loadable from TOML. Every key is optional.
///
/// ```toml
/// max_workers = 4
/// feature_prefix = "original"
/// excluded_prefixes = ["diagnostics_", "general_"]
/// verbosity = "silent"
/// executor = "tokio"
/// ```
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractionConfig {
    pub max_workers: usize,
    pub feature_prefix: String,
    pub excluded_prefixes: Vec<String>,
    pub verbosity: Verbosity,
    pub executor: ExecutorKind,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_workers: MAX_WORKERS,
            feature_prefix: "original".to_string(),
            excluded_prefixes: EXCLUDED_PREFIXES.iter().map(|p| p.to_string()).collect(),
            verbosity: Verbosity::default(),
            executor: ExecutorKind::default(),
        }
    }
}

impl ExtractionConfig {
    pub fn load(path: &Path) -> Result<Self> {
        ensure_exists(path)?;
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_workers == 0 {
            return Err(RadiomicsError::InvalidFormat(
                "max_workers must be at least 1".to_string(),
            ));
        }
        if self.feature_prefix.is_empty() {
            return Err(RadiomicsError::InvalidFormat(
                "feature_prefix must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
