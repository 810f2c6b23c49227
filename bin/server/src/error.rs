//! Domain error types for server operations.
//!
//! - `StartupError`: fatal problems while building the service, reported
//!   through rootcause
//! - `ApiError`: request failures, rendered as the error envelope

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use concierge_conversation::{DuplicateToolError, SessionError};
use concierge_dispatch::{DispatchError, ErrorEnvelope, ResponseFormatter};
use concierge_integration::HandlerError;
use std::fmt;

/// Errors that stop the server from starting.
#[derive(Debug)]
pub enum StartupError {
    /// Configuration could not be loaded.
    Config { details: String },
    /// A configuration value is unusable.
    InvalidConfig { field: &'static str, reason: String },
    /// The tool catalog declares a name twice.
    ToolCatalog(DuplicateToolError),
    /// A collaborator client could not be built.
    Collaborator { details: String },
    /// The listener could not be bound or the server stopped with an error.
    Serve { details: String },
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { details } => write!(f, "failed to load configuration: {details}"),
            Self::InvalidConfig { field, reason } => {
                write!(f, "invalid configuration for {field}: {reason}")
            }
            Self::ToolCatalog(e) => write!(f, "invalid tool catalog: {e}"),
            Self::Collaborator { details } => {
                write!(f, "failed to build collaborator client: {details}")
            }
            Self::Serve { details } => write!(f, "server error: {details}"),
        }
    }
}

impl std::error::Error for StartupError {}

impl From<DuplicateToolError> for StartupError {
    fn from(e: DuplicateToolError) -> Self {
        Self::ToolCatalog(e)
    }
}

/// Errors returned by request handlers.
#[derive(Debug)]
pub enum ApiError {
    /// The request body or path is malformed.
    InvalidRequest { message: String },
    /// The dispatch failed.
    Dispatch(DispatchError),
    /// A tool handler failed.
    Handler(HandlerError),
    /// A session operation failed.
    Session(SessionError),
}

impl ApiError {
    /// Creates an invalid-request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    fn status(&self) -> StatusCode {
        let code = match self {
            Self::InvalidRequest { .. } => 400,
            Self::Dispatch(e) => e.http_status(),
            Self::Handler(e) => e.http_status(),
            Self::Session(e) => e.http_status(),
        };
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn envelope(&self) -> ErrorEnvelope {
        match self {
            Self::InvalidRequest { message } => ErrorEnvelope::new(message.clone(), "InvalidRequest"),
            Self::Dispatch(e) => ResponseFormatter::render_error(e),
            Self::Handler(e) => ErrorEnvelope::new(e.to_string(), e.kind()),
            Self::Session(e) => ErrorEnvelope::new(e.to_string(), e.kind()),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRequest { message } => write!(f, "invalid request: {message}"),
            Self::Dispatch(e) => write!(f, "{e}"),
            Self::Handler(e) => write!(f, "{e}"),
            Self::Session(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<DispatchError> for ApiError {
    fn from(e: DispatchError) -> Self {
        Self::Dispatch(e)
    }
}

impl From<HandlerError> for ApiError {
    fn from(e: HandlerError) -> Self {
        Self::Handler(e)
    }
}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        Self::Session(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "request failed");
        } else {
            tracing::warn!(error = %self, status = status.as_u16(), "request rejected");
        }
        (status, Json(self.envelope())).into_response()
    }
}
