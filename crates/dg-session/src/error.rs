//! Error types for sessions and generators.

use dg_conductor::ConductorError;
use dg_progress::{ProgressError, SwitchRefusal};
use thiserror::Error;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors that can occur while driving a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The session has not been started or resumed.
    #[error("session is not active")]
    NotActive,

    /// `start` or `resume` was called twice.
    #[error("session already started")]
    AlreadyStarted,

    /// The session was closed.
    #[error("session is closed")]
    Closed,

    /// A boundary save was requested while a turn is in progress.
    #[error("a turn is in progress")]
    MidTurn,

    /// The stored progress cannot be resumed.
    #[error("cannot resume: {0}")]
    CannotResume(String),

    /// A requested engine change is not allowed.
    #[error("engine switch refused: {0}")]
    UnsafeSwitch(SwitchRefusal),

    /// Progress persistence error.
    #[error(transparent)]
    Progress(#[from] ProgressError),

    /// Story or catalog error.
    #[error(transparent)]
    Conductor(#[from] ConductorError),
}

/// Result type for generator calls.
pub type GeneratorResult<T> = Result<T, GeneratorError>;

/// Errors a content generator may report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeneratorError {
    /// The call failed.
    #[error("generator failed: {0}")]
    Failed(String),

    /// The call returned output that could not be used.
    #[error("unusable generator output: {0}")]
    Unparseable(String),
}
