//! Shared application state.

use crate::config::{CredentialDefaults, ServerConfig};
use crate::error::{ApiError, StartupError};
use concierge_ai::{ApiKey, Credentials, OpenAiBackend, PineconeRetriever};
use concierge_conversation::{SessionStore, hotel_concierge_tools};
use concierge_dispatch::{DispatchEngine, DispatchError};
use concierge_integration::{HandlerRegistry, OpenMeteoTemperature};
use std::sync::Arc;

/// State shared by every request handler.
pub struct AppState {
    /// The dispatch engine, which owns the registry and session store.
    pub engine: DispatchEngine,
    /// Handlers for tools the service can execute itself.
    pub handlers: HandlerRegistry,
    /// Fallback collaborator keys.
    pub credential_defaults: CredentialDefaults,
}

impl AppState {
    /// Creates state from already-built parts.
    #[must_use]
    pub fn new(
        engine: DispatchEngine,
        handlers: HandlerRegistry,
        credential_defaults: CredentialDefaults,
    ) -> Self {
        Self {
            engine,
            handlers,
            credential_defaults,
        }
    }

    /// Builds the production state from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the tool catalog is inconsistent or a collaborator
    /// client cannot be built.
    pub fn from_config(
        config: &ServerConfig,
    ) -> concierge_core::Result<Self, StartupError> {
        let registry = Arc::new(hotel_concierge_tools().map_err(StartupError::from)?);
        let sessions = Arc::new(SessionStore::new(config.session.clone()));

        let completion =
            OpenAiBackend::new(config.openai.clone()).map_err(|e| StartupError::Collaborator {
                details: e.to_string(),
            })?;
        let mut engine = DispatchEngine::new(
            registry,
            sessions,
            Arc::new(completion),
            config.dispatch.clone(),
        );
        if config.dispatch.grounding {
            let retriever = PineconeRetriever::new(config.retrieval.clone()).map_err(|e| {
                StartupError::Collaborator {
                    details: e.to_string(),
                }
            })?;
            engine = engine.with_retriever(Arc::new(retriever));
        }

        let weather =
            OpenMeteoTemperature::new(config.weather.clone()).map_err(|e| StartupError::Collaborator {
                details: e.to_string(),
            })?;
        let handlers = HandlerRegistry::new().with_handler(Arc::new(weather));

        Ok(Self::new(engine, handlers, config.credentials.clone()))
    }

    /// Resolves the keys for one dispatch.
    ///
    /// A key supplied with the request wins over the configured fallback.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the completion key is missing, or the
    /// retrieval key is missing while grounding is on.
    pub fn resolve_credentials(
        &self,
        openai_api_key: Option<&str>,
        pinecone_api_key: Option<&str>,
    ) -> Result<Credentials, ApiError> {
        let pick = |supplied: Option<&str>, fallback: Option<&String>| {
            supplied
                .and_then(ApiKey::new)
                .or_else(|| fallback.and_then(|k| ApiKey::new(k.as_str())))
        };

        let completion = pick(openai_api_key, self.credential_defaults.openai_api_key.as_ref())
            .ok_or_else(|| DispatchError::configuration("Provide OPENAI API KEY"))?;
        let retrieval = pick(
            pinecone_api_key,
            self.credential_defaults.pinecone_api_key.as_ref(),
        );
        if self.engine.config().grounding && retrieval.is_none() {
            return Err(DispatchError::configuration("Provide PINECONE API KEY").into());
        }

        Ok(Credentials::new(completion).with_retrieval(retrieval))
    }
}
