//! Error types for the conversation crate.
//!
//! - `DuplicateToolError`: Registering a tool name twice (startup only)
//! - `SessionError`: Errors from session store operations

use concierge_core::SessionKey;
use std::fmt;

/// A tool with the same name is already registered.
///
/// Raised only while the registry is being built at startup; the server
/// treats it as fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateToolError {
    /// The name that was registered twice.
    pub name: String,
}

impl fmt::Display for DuplicateToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tool '{}' is already registered", self.name)
    }
}

impl std::error::Error for DuplicateToolError {}

/// Errors from session store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// No session is stored under this key.
    NotFound { session_id: SessionKey },
    /// A dispatch currently holds the session.
    Busy { session_id: SessionKey },
}

impl SessionError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::Busy { .. } => 409,
        }
    }

    /// Returns the error type reported to clients.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "SessionNotFound",
            Self::Busy { .. } => "SessionBusy",
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { session_id } => write!(f, "session not found: {session_id}"),
            Self::Busy { session_id } => {
                write!(f, "session {session_id} is handling another request")
            }
        }
    }
}

impl std::error::Error for SessionError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_tool_display() {
        let err = DuplicateToolError {
            name: "book_room".to_string(),
        };
        assert!(err.to_string().contains("book_room"));
    }

    #[test]
    fn session_error_display() {
        let err = SessionError::NotFound {
            session_id: SessionKey::parse("guest-1").expect("valid key"),
        };
        assert!(err.to_string().contains("session not found"));
        assert!(err.to_string().contains("guest-1"));
    }
}
