//! Tool handler trait and registry.
//!
//! The dispatch engine only selects tools; a client that wants the service
//! to run one posts the invocation back, and the registry routes it to the
//! handler registered under the tool's name.

use crate::error::HandlerError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument};

/// The result of a handler execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerOutput {
    /// What the handler produced.
    pub output: JsonValue,
    /// Wall-clock time spent in the handler.
    pub latency_ms: u64,
}

/// Executes one named tool.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Returns the tool name this handler serves.
    fn name(&self) -> &str;

    /// Executes the tool.
    ///
    /// # Errors
    ///
    /// Returns an error if the arguments are unusable or the upstream call
    /// fails.
    async fn execute(&self, arguments: &Map<String, JsonValue>) -> Result<JsonValue, HandlerError>;
}

/// Name-indexed set of tool handlers.
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn ToolHandler>>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler under its own name, replacing any previous one.
    pub fn register(&mut self, handler: Arc<dyn ToolHandler>) {
        self.handlers.insert(handler.name().to_string(), handler);
    }

    /// Registers a handler, builder style.
    #[must_use]
    pub fn with_handler(mut self, handler: Arc<dyn ToolHandler>) -> Self {
        self.register(handler);
        self
    }

    /// Returns true if a handler is registered for this tool.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Returns the registered tool names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Returns the number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Executes the handler registered for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError::NotFound`] if no handler is registered, or the
    /// handler's own error.
    #[instrument(skip(self, arguments))]
    pub async fn execute(
        &self,
        name: &str,
        arguments: &Map<String, JsonValue>,
    ) -> Result<HandlerOutput, HandlerError> {
        let handler = self.handlers.get(name).ok_or_else(|| HandlerError::NotFound {
            name: name.to_string(),
        })?;

        let started = Instant::now();
        let output = handler.execute(arguments).await?;
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        debug!(latency_ms, "handler finished");

        Ok(HandlerOutput { output, latency_ms })
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handlers", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoHandler;

    #[async_trait]
    impl ToolHandler for EchoHandler {
        fn name(&self) -> &str {
            "request_room_amenity"
        }

        async fn execute(
            &self,
            arguments: &Map<String, JsonValue>,
        ) -> Result<JsonValue, HandlerError> {
            let amenity = arguments
                .get("requested_amenity")
                .and_then(JsonValue::as_str)
                .ok_or_else(|| HandlerError::invalid_arguments(self.name(), "missing requested_amenity"))?;
            Ok(json!(format!("{amenity} is on its way")))
        }
    }

    fn args(value: JsonValue) -> Map<String, JsonValue> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn executes_registered_handler() {
        let registry = HandlerRegistry::new().with_handler(Arc::new(EchoHandler));

        let output = registry
            .execute(
                "request_room_amenity",
                &args(json!({"requested_amenity": "extra pillow"})),
            )
            .await
            .expect("handler runs");

        assert_eq!(output.output, json!("extra pillow is on its way"));
    }

    #[tokio::test]
    async fn unknown_handler_is_not_found() {
        let registry = HandlerRegistry::new();
        let err = registry
            .execute("book_room", &Map::new())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            HandlerError::NotFound {
                name: "book_room".to_string()
            }
        );
    }

    #[tokio::test]
    async fn handler_errors_propagate() {
        let registry = HandlerRegistry::new().with_handler(Arc::new(EchoHandler));
        let err = registry
            .execute("request_room_amenity", &Map::new())
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::InvalidArguments { .. }));
    }

    #[test]
    fn names_are_sorted() {
        let registry = HandlerRegistry::new().with_handler(Arc::new(EchoHandler));
        assert_eq!(registry.names(), vec!["request_room_amenity"]);
        assert!(registry.contains("request_room_amenity"));
        assert_eq!(registry.len(), 1);
    }
}
