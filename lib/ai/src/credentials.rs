//! Per-request collaborator credentials.
//!
//! Keys arrive with each request and are passed through to the collaborators
//! untouched. They never appear in `Debug` output or logs.

use std::fmt;

/// An opaque API key.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wraps a key, returning `None` if it is blank.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            None
        } else {
            Some(Self(raw))
        }
    }

    /// Returns the raw key for use in an outbound request.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Credentials for one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Key for the completion provider. Also used for query embeddings.
    pub completion: ApiKey,
    /// Key for the vector index, when grounding is in use.
    pub retrieval: Option<ApiKey>,
}

impl Credentials {
    /// Creates credentials with only a completion key.
    #[must_use]
    pub fn new(completion: ApiKey) -> Self {
        Self {
            completion,
            retrieval: None,
        }
    }

    /// Sets the retrieval key.
    #[must_use]
    pub fn with_retrieval(mut self, retrieval: Option<ApiKey>) -> Self {
        self.retrieval = retrieval;
        self
    }
}
