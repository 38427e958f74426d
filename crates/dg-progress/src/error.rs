//! Error types for progress persistence.

use std::path::PathBuf;

use thiserror::Error;

use crate::switch::SwitchRefusal;

/// Result type for progress operations.
pub type ProgressResult<T> = Result<T, ProgressError>;

/// Errors that can occur while writing progress.
#[derive(Debug, Error)]
pub enum ProgressError {
    /// Filesystem error.
    #[error("{path}: {source}")]
    Io {
        /// Path involved.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Record could not be encoded.
    #[error("cannot encode progress: {0}")]
    Encode(#[from] serde_json::Error),

    /// Record violates the scene-order invariant.
    #[error("next scene {next} must follow current scene {current}")]
    SceneOrder {
        /// Current scene id.
        current: u32,
        /// Next scene id.
        next: u32,
    },

    /// Engine switch refused.
    #[error("engine switch refused: {0}")]
    SwitchRefused(#[from] SwitchRefusal),

    /// Unknown engine name.
    #[error("unknown engine type: {0}")]
    UnknownEngine(String),
}

impl ProgressError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
