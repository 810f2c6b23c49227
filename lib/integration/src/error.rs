//! Error types for the integration crate.

use std::fmt;

/// Errors from tool handler execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// No handler is registered under this name.
    NotFound { name: String },
    /// The arguments are missing a value or hold one of the wrong shape.
    InvalidArguments { name: String, reason: String },
    /// The upstream service call failed.
    RequestFailed { status: Option<u16>, reason: String },
    /// The upstream response could not be interpreted.
    ResponseParseFailed { reason: String },
}

impl HandlerError {
    /// Creates an invalid-arguments error.
    #[must_use]
    pub fn invalid_arguments(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Returns the HTTP status for this error.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::InvalidArguments { .. } => 400,
            Self::RequestFailed { .. } | Self::ResponseParseFailed { .. } => 502,
        }
    }

    /// Returns the error type reported to clients.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "UnknownToolError",
            Self::InvalidArguments { .. } => "InvalidRequest",
            Self::RequestFailed { .. } | Self::ResponseParseFailed { .. } => "HandlerError",
        }
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { name } => write!(f, "no handler for tool '{name}'"),
            Self::InvalidArguments { name, reason } => {
                write!(f, "invalid arguments for '{name}': {reason}")
            }
            Self::RequestFailed { status, reason } => match status {
                Some(status) => {
                    write!(f, "API request failed with status code {status}: {reason}")
                }
                None => write!(f, "API request failed: {reason}"),
            },
            Self::ResponseParseFailed { reason } => {
                write!(f, "failed to parse API response: {reason}")
            }
        }
    }
}

impl std::error::Error for HandlerError {}
