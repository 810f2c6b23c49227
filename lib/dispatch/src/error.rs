//! Error types for the dispatch crate.
//!
//! Every variant maps to an HTTP status and an error type string that the
//! request boundary renders into the error envelope.

use concierge_ai::{LlmError, RetrievalError};
use std::fmt;

/// The external collaborator a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collaborator {
    /// The chat completion provider.
    Completion,
    /// The retrieval pipeline.
    Retrieval,
}

impl fmt::Display for Collaborator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completion => write!(f, "completion"),
            Self::Retrieval => write!(f, "retrieval"),
        }
    }
}

/// Errors that end a dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// A credential or collaborator configuration is missing.
    ///
    /// Raised before any collaborator is called.
    Configuration { reason: String },
    /// A collaborator failed, timed out, or returned malformed output.
    Collaborator {
        collaborator: Collaborator,
        reason: String,
    },
    /// The model selected a function that is not in the registry.
    UnknownTool { name: String },
}

impl DispatchError {
    /// Creates a configuration error.
    #[must_use]
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Returns the HTTP status for this error.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Configuration { .. } => 400,
            Self::Collaborator { .. } | Self::UnknownTool { .. } => 500,
        }
    }

    /// Returns the error type reported to clients.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "ConfigurationError",
            Self::Collaborator { .. } => "CollaboratorError",
            Self::UnknownTool { .. } => "UnknownToolError",
        }
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration { reason } => write!(f, "configuration error: {reason}"),
            Self::Collaborator {
                collaborator,
                reason,
            } => write!(f, "{collaborator} failed: {reason}"),
            Self::UnknownTool { name } => {
                write!(f, "model selected unknown tool '{name}'")
            }
        }
    }
}

impl std::error::Error for DispatchError {}

impl From<LlmError> for DispatchError {
    fn from(e: LlmError) -> Self {
        Self::Collaborator {
            collaborator: Collaborator::Completion,
            reason: e.to_string(),
        }
    }
}

impl From<RetrievalError> for DispatchError {
    fn from(e: RetrievalError) -> Self {
        match e {
            RetrievalError::MissingCredential => Self::configuration(e.to_string()),
            other => Self::Collaborator {
                collaborator: Collaborator::Retrieval,
                reason: other.to_string(),
            },
        }
    }
}
