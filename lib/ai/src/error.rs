//! Error types for the AI crate.
//!
//! - `LlmError`: Completion backend operations
//! - `RetrievalError`: Embedding and vector search operations

use std::fmt;

/// Errors from completion backend operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// Provider could not be reached.
    ProviderUnavailable { provider: String, reason: String },
    /// The provider rejected the credentials.
    Unauthorized { reason: String },
    /// Request failed.
    RequestFailed { status: Option<u16>, reason: String },
    /// Response parsing failed.
    ResponseParseFailed { reason: String },
    /// Timeout waiting for response.
    Timeout,
    /// Rate limit exceeded.
    RateLimited { retry_after_secs: Option<u64> },
    /// Invalid configuration.
    InvalidConfig { reason: String },
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProviderUnavailable { provider, reason } => {
                write!(f, "LLM provider '{provider}' unavailable: {reason}")
            }
            Self::Unauthorized { reason } => {
                write!(f, "LLM provider rejected credentials: {reason}")
            }
            Self::RequestFailed { status, reason } => match status {
                Some(status) => write!(f, "LLM request failed with status {status}: {reason}"),
                None => write!(f, "LLM request failed: {reason}"),
            },
            Self::ResponseParseFailed { reason } => {
                write!(f, "failed to parse LLM response: {reason}")
            }
            Self::Timeout => write!(f, "LLM request timed out"),
            Self::RateLimited { retry_after_secs } => {
                if let Some(secs) = retry_after_secs {
                    write!(f, "rate limited, retry after {secs}s")
                } else {
                    write!(f, "rate limited")
                }
            }
            Self::InvalidConfig { reason } => {
                write!(f, "invalid LLM configuration: {reason}")
            }
        }
    }
}

impl std::error::Error for LlmError {}

/// Errors from retrieval operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetrievalError {
    /// No retrieval credential was supplied.
    MissingCredential,
    /// Embedding the query failed.
    EmbeddingFailed { reason: String },
    /// The vector index request failed.
    QueryFailed { status: Option<u16>, reason: String },
    /// Response parsing failed.
    ResponseParseFailed { reason: String },
    /// Timeout waiting for a response.
    Timeout,
}

impl fmt::Display for RetrievalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCredential => write!(f, "no retrieval credential supplied"),
            Self::EmbeddingFailed { reason } => {
                write!(f, "failed to embed query: {reason}")
            }
            Self::QueryFailed { status, reason } => match status {
                Some(status) => write!(f, "index query failed with status {status}: {reason}"),
                None => write!(f, "index query failed: {reason}"),
            },
            Self::ResponseParseFailed { reason } => {
                write!(f, "failed to parse index response: {reason}")
            }
            Self::Timeout => write!(f, "retrieval request timed out"),
        }
    }
}

impl std::error::Error for RetrievalError {}
