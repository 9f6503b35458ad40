//! Service error taxonomy and HTTP mapping.
//!
//! Every error category maps to a status code at the request boundary:
//! validation, range, and empty-batch errors are client errors (400) whose
//! message reproduces the failed check; anything else is an internal fault
//! (500) logged at error level, which the OTLP layer forwards to the
//! telemetry backend. No error is retried; failures surface once.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error as ThisError;

use crate::metrics::EmptyBatchError;
use crate::validation::ErrorKind;

#[derive(ThisError, Debug)]
pub enum Error {
    /// A validation check failed; the message reproduces the specific check
    #[error("{message}")]
    Validation { kind: ErrorKind, message: String },

    /// Numeric field outside its accepted bounds
    #[error("Invalid {field}: {value} (accepted range {min}..={max})")]
    Range { field: &'static str, value: i64, min: i64, max: i64 },

    /// Aggregation requested over zero outcomes
    #[error(transparent)]
    EmptyBatch(#[from] EmptyBatchError),

    /// Malformed request data
    #[error("{message}")]
    BadRequest { message: String },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation { .. } | Error::Range { .. } | Error::EmptyBatch(_) | Error::BadRequest { .. } => {
                StatusCode::BAD_REQUEST
            }
            Error::Internal { .. } | Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// User-safe error message, without leaking internal details
    pub fn user_message(&self) -> String {
        match self {
            Error::Validation { message, .. } => message.clone(),
            Error::Range { .. } | Error::EmptyBatch(_) => self.to_string(),
            Error::BadRequest { message } => message.clone(),
            Error::Internal { .. } | Error::Other(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Full detail goes to the logs; severity tracks who caused it.
        match &self {
            Error::Internal { .. } | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Validation { kind, .. } => {
                tracing::debug!(error_type = %kind, "Validation error: {}", self);
            }
            Error::Range { .. } | Error::EmptyBatch(_) | Error::BadRequest { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        (self.status_code(), self.user_message()).into_response()
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;
