use std::path::PathBuf;

use thiserror::Error;

use crate::backend::BackendError;
use crate::executor::ExecutorError;
use crate::volume_loader::VolumeReadError;

#[derive(Debug, Error)]
pub enum RadiomicsError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Mask geometry {mask:?} does not match volume geometry {volume:?}")]
    GeometryMismatch {
        mask: (usize, usize, usize),
        volume: (usize, usize, usize),
    },

    #[error("Feature backend failed for region '{region}': {source}")]
    Backend {
        region: String,
        #[source]
        source: BackendError,
    },

    #[error("Worker pool error: {0}")]
    Executor(#[from] ExecutorError),

    #[error("Volume error: {0}")]
    Volume(#[from] VolumeReadError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RadiomicsError>;

/// Fails with [`RadiomicsError::NotFound`] unless `path` exists.
pub(crate) fn ensure_exists(path: &std::path::Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(RadiomicsError::NotFound(path.to_path_buf()))
    }
}
