//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service, and how tracker
//! failures are turned into HTTP responses.

use crate::config::ConfigError;
use axum::http::StatusCode;
use study_tracker_core::{PortError, TrackerError};
use tracing::{error, warn};

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a failure to apply the database migrations.
    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// The rejection type returned by every handler.
pub type HandlerError = (StatusCode, String);

pub fn status_for(err: &TrackerError) -> StatusCode {
    match err {
        TrackerError::Validation(_) => StatusCode::BAD_REQUEST,
        TrackerError::NotAuthenticated => StatusCode::UNAUTHORIZED,
        TrackerError::MalformedRecord { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        TrackerError::Store(PortError::NotFound(_)) => StatusCode::NOT_FOUND,
        TrackerError::Store(PortError::Conflict(_)) => StatusCode::CONFLICT,
        TrackerError::Store(PortError::Unauthorized) => StatusCode::UNAUTHORIZED,
        TrackerError::Store(PortError::Unexpected(_)) => StatusCode::BAD_GATEWAY,
    }
}

/// Builds a `map_err` closure that logs the failure and maps it to a status.
pub fn reject<E>(context: &'static str) -> impl FnOnce(E) -> HandlerError
where
    E: Into<TrackerError>,
{
    move |err| {
        let err: TrackerError = err.into();
        let status = status_for(&err);
        if status.is_server_error() {
            error!("{}: {:?}", context, err);
        } else {
            warn!("{}: {}", context, err);
        }
        (status, err.to_string())
    }
}
