//! crates/study_tracker_core/src/error.rs
//!
//! The error taxonomy surfaced by the tracker to its callers.

use crate::ports::PortError;

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// Caller-detectable input problems, reported before any store call.
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("No authenticated account")]
    NotAuthenticated,

    /// A document store or identity provider operation failed.
    #[error("Store operation failed: {0}")]
    Store(PortError),

    #[error("Malformed record {id}: {reason}")]
    MalformedRecord { id: String, reason: String },
}

impl From<PortError> for TrackerError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::Unauthorized => TrackerError::NotAuthenticated,
            other => TrackerError::Store(other),
        }
    }
}

/// A convenience type alias for `Result<T, TrackerError>`.
pub type TrackerResult<T> = Result<T, TrackerError>;
