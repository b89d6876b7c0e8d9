use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Service-level errors (startup, configuration, HTTP surface)
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("IO error")]
    Io(#[from] std::io::Error),
}

/// Errors raised while running a query handler.
///
/// Every variant is converted into a `{ "success": false, "error": ... }`
/// envelope at the dispatch boundary; callers only ever see the message.
#[derive(Error, Debug)]
pub enum QueryError {
    /// Missing or malformed input field
    #[error("{message}")]
    Validation { message: String },

    /// A host-side lookup the handler depends on came back empty or refused
    #[error("{message}")]
    Precondition { message: String },

    #[error("Query handler not found: {name}")]
    HandlerNotFound { name: String },

    /// Failure wrapped with the operation it happened in
    #[error("Failed to {operation}: {source}")]
    Operation {
        operation: &'static str,
        #[source]
        source: Box<QueryError>,
    },

    #[error("{0}")]
    Host(#[from] HostError),
}

impl QueryError {
    pub fn validation(message: impl Into<String>) -> Self {
        QueryError::Validation {
            message: message.into(),
        }
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        QueryError::Precondition {
            message: message.into(),
        }
    }

    /// Prefix the error with the operation it failed in (`Failed to {operation}: ...`)
    pub fn within(self, operation: &'static str) -> Self {
        QueryError::Operation {
            operation,
            source: Box::new(self),
        }
    }
}

/// Errors from the host platform facade
#[derive(Error, Debug)]
pub enum HostError {
    #[error("Foundry VTT is not ready")]
    NotReady,

    #[error("No Foundry VTT session connected")]
    NoSession,

    #[error("Foundry VTT disconnected while processing {operation}")]
    Disconnected { operation: String },

    #[error("Host call {operation} timed out")]
    Timeout { operation: String },

    /// Failure reported by the host itself; the message is passed through
    #[error("{message}")]
    Rejected { message: String },

    #[error("Failed to encode arguments for {operation}: {message}")]
    Encode { operation: String, message: String },

    #[error("Invalid host response for {operation}: {message}")]
    InvalidResponse { operation: String, message: String },
}

impl HostError {
    pub fn rejected(message: impl Into<String>) -> Self {
        HostError::Rejected {
            message: message.into(),
        }
    }
}

/// API error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            ServiceError::Config { .. } => "config_error",
            ServiceError::InvalidRequest { .. } => "invalid_request",
            ServiceError::Io(_) => "io_error",
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code().to_string();

        let response = ErrorResponse {
            message: self.to_string(),
            code: Some(code),
        };

        (status, Json(response)).into_response()
    }
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Result of a query handler: the response payload or a raised error
pub type QueryResult = Result<serde_json::Value, QueryError>;

/// Result of a host facade call
pub type HostResult<T> = Result<T, HostError>;
