//! Error types for the orchestration core.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for conductor operations.
pub type ConductorResult<T> = Result<T, ConductorError>;

/// Errors raised while loading stories or editing the act and event catalogs.
///
/// Turn decisions themselves never fail; these cover authoring mistakes.
#[derive(Debug, Error)]
pub enum ConductorError {
    /// Story file could not be read.
    #[error("cannot read story {path}: {source}")]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Story JSON is malformed.
    #[error("invalid story: {0}")]
    Parse(#[from] serde_json::Error),

    /// Two events share an id.
    #[error("duplicate event id: {0}")]
    DuplicateEvent(String),

    /// Two acts share a number.
    #[error("duplicate act number: {0}")]
    DuplicateAct(u32),

    /// Referenced event does not exist.
    #[error("unknown event: {0}")]
    UnknownEvent(String),

    /// A predictor could not produce a prediction.
    #[error("prediction failed: {0}")]
    Prediction(String),
}
