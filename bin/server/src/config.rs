//! Centralized server configuration.
//!
//! This module provides strongly-typed configuration for the server,
//! loaded via the `config` crate from environment variables prefixed with
//! `CONCIERGE_`. Nested fields use `__`, for example
//! `CONCIERGE_SESSION__MAX_TURNS=20` or `CONCIERGE_OPENAI__MODEL=gpt-4o-mini`.
//!
//! Every field has a default. The one value without a usable default is
//! `CONCIERGE_RETRIEVAL__INDEX_HOST`, which is required while grounding is on.
//! Collaborator keys without a configured fallback have to come with each
//! request.

use crate::error::StartupError;
use concierge_ai::{OpenAiConfig, RetrievalConfig};
use concierge_conversation::SessionConfig;
use concierge_dispatch::DispatchConfig;
use concierge_integration::OpenMeteoConfig;
use serde::Deserialize;

/// Server configuration composed from library configs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Session memory configuration.
    #[serde(default)]
    pub session: SessionConfig,

    /// Dispatch engine configuration.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Completion provider configuration.
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Retrieval configuration.
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Weather handler configuration.
    #[serde(default)]
    pub weather: OpenMeteoConfig,

    /// Fallback collaborator keys.
    #[serde(default)]
    pub credentials: CredentialDefaults,
}

fn default_bind_address() -> String {
    "0.0.0.0:8000".to_string()
}

/// Collaborator keys used when a request does not carry its own.
#[derive(Clone, Default, Deserialize)]
pub struct CredentialDefaults {
    /// Completion and embeddings key.
    #[serde(default)]
    pub openai_api_key: Option<String>,

    /// Vector index key.
    #[serde(default)]
    pub pinecone_api_key: Option<String>,
}

impl std::fmt::Debug for CredentialDefaults {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialDefaults")
            .field("openai_api_key", &self.openai_api_key.as_ref().map(|_| "***"))
            .field("pinecone_api_key", &self.pinecone_api_key.as_ref().map(|_| "***"))
            .finish()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            session: SessionConfig::default(),
            dispatch: DispatchConfig::default(),
            openai: OpenAiConfig::default(),
            retrieval: RetrievalConfig::default(),
            weather: OpenMeteoConfig::default(),
            credentials: CredentialDefaults::default(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables and validates it.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed or a value is invalid.
    pub fn from_env() -> concierge_core::Result<Self, StartupError> {
        let loaded: Self = config::Config::builder()
            .add_source(
                config::Environment::with_prefix("CONCIERGE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| StartupError::Config {
                details: e.to_string(),
            })?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Checks values that deserialize fine but cannot work.
    ///
    /// # Errors
    ///
    /// Returns [`StartupError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> Result<(), StartupError> {
        let invalid = |field: &'static str, reason: &str| StartupError::InvalidConfig {
            field,
            reason: reason.to_string(),
        };

        if self.session.max_turns == 0 {
            return Err(invalid("session.max_turns", "must be at least 1"));
        }
        if self.session.max_sessions == 0 {
            return Err(invalid("session.max_sessions", "must be at least 1"));
        }
        if self.session.sweep_interval_seconds == 0 {
            return Err(invalid("session.sweep_interval_seconds", "must be at least 1"));
        }
        if self.dispatch.completion_timeout_ms == 0 {
            return Err(invalid("dispatch.completion_timeout_ms", "must be positive"));
        }
        if self.dispatch.grounding {
            if self.dispatch.retrieval_top_k == 0 {
                return Err(invalid("dispatch.retrieval_top_k", "must be at least 1"));
            }
            if self.dispatch.retrieval_timeout_ms == 0 {
                return Err(invalid("dispatch.retrieval_timeout_ms", "must be positive"));
            }
            if self.retrieval.index_host.trim().is_empty() {
                return Err(invalid(
                    "retrieval.index_host",
                    "required while dispatch.grounding is enabled",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grounded() -> ServerConfig {
        let mut config = ServerConfig::default();
        config.retrieval.index_host = "https://hotel.svc.pinecone.io".to_string();
        config
    }

    #[test]
    fn defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_address, "0.0.0.0:8000");
        assert_eq!(config.session.max_turns, 14);
        assert!(config.dispatch.grounding);
        assert_eq!(config.dispatch.retrieval_top_k, 2);
    }

    #[test]
    fn grounding_requires_index_host() {
        let err = ServerConfig::default().validate().unwrap_err();
        assert!(matches!(
            err,
            StartupError::InvalidConfig {
                field: "retrieval.index_host",
                ..
            }
        ));

        assert!(grounded().validate().is_ok());

        let mut ungrounded = ServerConfig::default();
        ungrounded.dispatch.grounding = false;
        assert!(ungrounded.validate().is_ok());
    }

    #[test]
    fn rejects_zero_limits() {
        let mut config = grounded();
        config.session.max_turns = 0;
        assert!(config.validate().is_err());

        let mut config = grounded();
        config.dispatch.retrieval_top_k = 0;
        assert!(config.validate().is_err());

        let mut config = grounded();
        config.dispatch.completion_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn credential_defaults_are_redacted() {
        let defaults = CredentialDefaults {
            openai_api_key: Some("sk-secret".to_string()),
            pinecone_api_key: None,
        };
        let rendered = format!("{defaults:?}");
        assert!(!rendered.contains("sk-secret"));
    }
}
