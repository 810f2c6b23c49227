//! Dispatch engine.
//!
//! One dispatch turns a guest question into either a text answer or a
//! function invocation:
//!
//! 1. Lock the session and, when grounding is on, retrieve snippets
//! 2. Send one completion request with history and the tool catalog
//! 3. Interpret the reply against the registry
//! 4. Append the user and assistant turns
//!
//! The session is only written in the last step, so a failed dispatch leaves
//! it exactly as it was. A session created for a dispatch that then fails is
//! discarded again. Nothing is retried.

use crate::error::{Collaborator, DispatchError};
use crate::result::{DispatchResult, FunctionInvocation};
use concierge_ai::{
    ChatMessage, Completion, CompletionBackend, CompletionRequest, Credentials, PromptTemplate,
    Retriever,
};
use concierge_conversation::{
    ConversationTurn, SessionGuard, SessionStore, ToolRegistry, TurnRole,
};
use concierge_core::{DispatchId, SessionKey};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Span, debug, error, info, instrument, warn};

/// Stage of a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchState {
    /// Retrieving snippets and assembling the prompt.
    CollectingContext,
    /// Waiting on the completion provider.
    AwaitingCompletion,
    /// Mapping the reply to a result.
    Interpreting,
    /// Turns appended, result returned.
    Done,
    /// Ended with an error; the session is unchanged.
    Failed,
}

impl DispatchState {
    /// Returns the state name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CollectingContext => "collecting_context",
            Self::AwaitingCompletion => "awaiting_completion",
            Self::Interpreting => "interpreting",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for DispatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for the dispatch engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Whether prompts are grounded with retrieved snippets.
    #[serde(default = "default_grounding")]
    pub grounding: bool,

    /// Number of snippets retrieved per question.
    #[serde(default = "default_retrieval_top_k")]
    pub retrieval_top_k: usize,

    /// Upper bound on the completion call, in milliseconds.
    #[serde(default = "default_completion_timeout_ms")]
    pub completion_timeout_ms: u64,

    /// Upper bound on retrieval, in milliseconds.
    #[serde(default = "default_retrieval_timeout_ms")]
    pub retrieval_timeout_ms: u64,

    /// Sampling temperature sent with every completion.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Upper bound on generated tokens. Unset leaves it to the provider.
    #[serde(default)]
    pub max_tokens: Option<u32>,

    /// System instructions. `{{context}}` is replaced with retrieved snippets.
    #[serde(default)]
    pub system_prompt: PromptTemplate,
}

fn default_grounding() -> bool {
    true
}

fn default_retrieval_top_k() -> usize {
    2
}

fn default_completion_timeout_ms() -> u64 {
    30_000
}

fn default_retrieval_timeout_ms() -> u64 {
    10_000
}

fn default_temperature() -> f32 {
    0.7
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            grounding: default_grounding(),
            retrieval_top_k: default_retrieval_top_k(),
            completion_timeout_ms: default_completion_timeout_ms(),
            retrieval_timeout_ms: default_retrieval_timeout_ms(),
            temperature: default_temperature(),
            max_tokens: None,
            system_prompt: PromptTemplate::default(),
        }
    }
}

impl DispatchConfig {
    /// Enables or disables grounding.
    #[must_use]
    pub fn with_grounding(mut self, grounding: bool) -> Self {
        self.grounding = grounding;
        self
    }

    /// Sets the completion timeout.
    #[must_use]
    pub fn with_completion_timeout(mut self, timeout: Duration) -> Self {
        self.completion_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Caps the number of generated tokens.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Sets the system prompt.
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: PromptTemplate) -> Self {
        self.system_prompt = prompt;
        self
    }

    fn completion_timeout(&self) -> Duration {
        Duration::from_millis(self.completion_timeout_ms)
    }

    fn retrieval_timeout(&self) -> Duration {
        Duration::from_millis(self.retrieval_timeout_ms)
    }
}

/// Runs dispatches against the shared registry and session store.
pub struct DispatchEngine {
    registry: Arc<ToolRegistry>,
    sessions: Arc<SessionStore>,
    completion: Arc<dyn CompletionBackend>,
    retriever: Option<Arc<dyn Retriever>>,
    config: DispatchConfig,
    functions: Vec<JsonValue>,
}

impl DispatchEngine {
    /// Creates an engine without a retriever.
    #[must_use]
    pub fn new(
        registry: Arc<ToolRegistry>,
        sessions: Arc<SessionStore>,
        completion: Arc<dyn CompletionBackend>,
        config: DispatchConfig,
    ) -> Self {
        let functions = registry.to_llm_format();
        Self {
            registry,
            sessions,
            completion,
            retriever: None,
            config,
            functions,
        }
    }

    /// Sets the retriever used for grounding.
    #[must_use]
    pub fn with_retriever(mut self, retriever: Arc<dyn Retriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    /// Returns the tool registry.
    #[must_use]
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Returns the session store.
    #[must_use]
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Returns the engine configuration.
    #[must_use]
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Answers one guest question within a session.
    ///
    /// Dispatches on the same session run one after another; dispatches on
    /// different sessions run concurrently.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::Configuration`] if grounding is on but no retriever
    ///   or retrieval credential is available. No collaborator is called.
    /// - [`DispatchError::Collaborator`] if retrieval or completion fails or
    ///   times out.
    /// - [`DispatchError::UnknownTool`] if the model selects a function that is
    ///   not registered.
    ///
    /// On error the session is left unchanged.
    #[instrument(
        skip(self, session_id, question, credentials),
        fields(
            session_id = %session_id,
            dispatch_id = tracing::field::Empty,
            provider = %self.completion.provider(),
            model = %self.completion.model(),
        )
    )]
    pub async fn run(
        &self,
        session_id: &SessionKey,
        question: &str,
        credentials: &Credentials,
    ) -> Result<DispatchResult, DispatchError> {
        let dispatch_id = DispatchId::new();
        Span::current().record("dispatch_id", tracing::field::display(&dispatch_id));

        let retriever = self.grounding_retriever(credentials)?;

        let mut session = self.sessions.lock(session_id).await;
        let outcome = self
            .dispatch(&session, question, credentials, retriever)
            .await;
        match outcome {
            Ok(result) => {
                session.append(ConversationTurn::user(question));
                session.append(ConversationTurn::assistant(result.assistant_turn_content()));
                info!(
                    state = %DispatchState::Done,
                    function_call = result.is_function_call(),
                    turns = session.state().turn_count(),
                    "dispatch complete"
                );
                Ok(result)
            }
            Err(e) => {
                warn!(state = %DispatchState::Failed, error = %e, "dispatch failed");
                session.discard();
                Err(e)
            }
        }
    }

    fn grounding_retriever(
        &self,
        credentials: &Credentials,
    ) -> Result<Option<&dyn Retriever>, DispatchError> {
        if !self.config.grounding {
            return Ok(None);
        }
        let retriever = self.retriever.as_deref().ok_or_else(|| {
            DispatchError::configuration("grounding is enabled but no retriever is configured")
        })?;
        if credentials.retrieval.is_none() {
            return Err(DispatchError::configuration(
                "Provide a retrieval API key or disable grounding",
            ));
        }
        Ok(Some(retriever))
    }

    async fn dispatch(
        &self,
        session: &SessionGuard<'_>,
        question: &str,
        credentials: &Credentials,
        retriever: Option<&dyn Retriever>,
    ) -> Result<DispatchResult, DispatchError> {
        debug!(state = %DispatchState::CollectingContext, "collecting context");
        let snippets = match retriever {
            Some(retriever) => {
                bounded(
                    Collaborator::Retrieval,
                    self.config.retrieval_timeout(),
                    retriever.search(question, self.config.retrieval_top_k, credentials),
                )
                .await??
            }
            None => Vec::new(),
        };

        let mut messages = Vec::with_capacity(session.state().turn_count() + 2);
        messages.push(ChatMessage::system(
            self.config.system_prompt.render_with_context(&snippets),
        ));
        messages.extend(session.state().turns().map(|turn| match turn.role {
            TurnRole::User => ChatMessage::user(turn.content.clone()),
            TurnRole::Assistant => ChatMessage::assistant(turn.content.clone()),
        }));
        messages.push(ChatMessage::user(question));

        let mut request = CompletionRequest::new(messages)
            .with_functions(self.functions.clone())
            .with_temperature(self.config.temperature);
        if let Some(max_tokens) = self.config.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        debug!(
            state = %DispatchState::AwaitingCompletion,
            snippets = snippets.len(),
            messages = request.messages.len(),
            "requesting completion"
        );
        let response = bounded(
            Collaborator::Completion,
            self.config.completion_timeout(),
            self.completion.complete(&request, credentials),
        )
        .await??;

        debug!(state = %DispatchState::Interpreting, model = %response.model, "interpreting completion");
        self.interpret(response.completion)
    }

    fn interpret(&self, completion: Completion) -> Result<DispatchResult, DispatchError> {
        match completion {
            Completion::Text { text } => Ok(DispatchResult::TextAnswer { text }),
            Completion::FunctionCall { name, arguments } => {
                let Some(spec) = self.registry.get(&name) else {
                    error!(function = %name, "model selected a function outside the registry");
                    return Err(DispatchError::UnknownTool { name });
                };
                let missing = spec.missing_required(&arguments);
                if !missing.is_empty() {
                    warn!(function = %name, ?missing, "function call is missing required parameters");
                }
                Ok(DispatchResult::FunctionCall(FunctionInvocation::new(
                    name, arguments,
                )))
            }
        }
    }
}

async fn bounded<T>(
    collaborator: Collaborator,
    limit: Duration,
    call: impl Future<Output = T>,
) -> Result<T, DispatchError> {
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| DispatchError::Collaborator {
            collaborator,
            reason: format!("timed out after {}ms", limit.as_millis()),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use concierge_ai::{
        ApiKey, ChatRole, CompletionResponse, LlmError, LlmProvider, RetrievalError, Snippet,
        TokenUsage,
    };
    use concierge_conversation::{ParamSpec, ParamType, SessionConfig, ToolSpec};
    use serde_json::{Map, json};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Completion backend that replays scripted replies and records requests.
    struct ScriptedBackend {
        replies: Mutex<VecDeque<Result<Completion, LlmError>>>,
        requests: Mutex<Vec<CompletionRequest>>,
        delay: Option<Duration>,
    }

    impl ScriptedBackend {
        fn new(replies: Vec<Result<Completion, LlmError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
                delay: None,
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        fn requests(&self) -> Vec<CompletionRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CompletionBackend for ScriptedBackend {
        async fn complete(
            &self,
            request: &CompletionRequest,
            _credentials: &Credentials,
        ) -> Result<CompletionResponse, LlmError> {
            self.requests.lock().unwrap().push(request.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Completion::Text { text: "ok".to_string() }))?;
            Ok(CompletionResponse {
                completion: reply,
                usage: TokenUsage::default(),
                model: "scripted".to_string(),
            })
        }

        fn provider(&self) -> LlmProvider {
            LlmProvider::OpenAiCompatible
        }

        fn model(&self) -> &str {
            "scripted"
        }
    }

    struct FakeRetriever {
        result: Result<Vec<Snippet>, RetrievalError>,
        calls: AtomicUsize,
    }

    impl FakeRetriever {
        fn returning(snippets: Vec<Snippet>) -> Self {
            Self {
                result: Ok(snippets),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing(err: RetrievalError) -> Self {
            Self {
                result: Err(err),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Retriever for FakeRetriever {
        async fn search(
            &self,
            _query: &str,
            top_k: usize,
            _credentials: &Credentials,
        ) -> Result<Vec<Snippet>, RetrievalError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(top_k, 2);
            self.result.clone()
        }
    }

    fn registry() -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        registry
            .register(
                ToolSpec::new("housekeeping_service_request", "Clean the room").with_param(
                    ParamSpec::required("room_number", ParamType::Integer, "Room number"),
                ),
            )
            .unwrap();
        Arc::new(registry)
    }

    fn key(raw: &str) -> SessionKey {
        SessionKey::parse(raw).unwrap()
    }

    fn credentials() -> Credentials {
        Credentials::new(ApiKey::new("sk-test").unwrap()).with_retrieval(ApiKey::new("pc-test"))
    }

    fn ungrounded(backend: Arc<ScriptedBackend>) -> DispatchEngine {
        DispatchEngine::new(
            registry(),
            Arc::new(SessionStore::default()),
            backend,
            DispatchConfig::default().with_grounding(false),
        )
    }

    fn text(answer: &str) -> Result<Completion, LlmError> {
        Ok(Completion::Text {
            text: answer.to_string(),
        })
    }

    fn call(name: &str, arguments: JsonValue) -> Result<Completion, LlmError> {
        let JsonValue::Object(arguments) = arguments else {
            panic!("arguments must be an object");
        };
        Ok(Completion::FunctionCall {
            name: name.to_string(),
            arguments,
        })
    }

    #[tokio::test]
    async fn follow_up_then_function_call() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            text("Sure, which room number?"),
            call("housekeeping_service_request", json!({"room_number": 305})),
        ]));
        let engine = ungrounded(Arc::clone(&backend));
        let session = key("guest-a");

        let first = engine
            .run(&session, "Please clean my room", &credentials())
            .await
            .unwrap();
        assert_eq!(first.text(), Some("Sure, which room number?"));

        let second = engine.run(&session, "305", &credentials()).await.unwrap();
        let invocation = second.invocation().expect("function call");
        assert_eq!(invocation.function_name, "housekeeping_service_request");
        assert_eq!(invocation.parameters["room_number"], 305);

        let state = engine.sessions().snapshot(&session).await.unwrap();
        let contents: Vec<_> = state.turns().map(|t| t.content.clone()).collect();
        assert_eq!(contents.len(), 4);
        assert_eq!(contents[0], "Please clean my room");
        assert_eq!(contents[2], "305");
        assert_eq!(
            contents[3],
            r#"{"function-name":"housekeeping_service_request","parameters":{"room_number":305}}"#
        );

        let requests = backend.requests();
        let roles: Vec<_> = requests[1].messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                ChatRole::System,
                ChatRole::User,
                ChatRole::Assistant,
                ChatRole::User
            ]
        );
        assert_eq!(requests[1].messages[3].content, "305");
        assert_eq!(requests[1].functions.len(), 1);
        assert_eq!(requests[1].temperature, Some(0.7));
    }

    #[tokio::test]
    async fn grounding_puts_snippets_in_system_message() {
        let backend = Arc::new(ScriptedBackend::new(vec![text(
            "Breakfast is served from 7 to 10.",
        )]));
        let retriever = Arc::new(FakeRetriever::returning(vec![
            Snippet::new("Breakfast is served from 7 to 10."),
            Snippet::new("The pool closes at 9pm."),
        ]));
        let engine = DispatchEngine::new(
            registry(),
            Arc::new(SessionStore::default()),
            Arc::clone(&backend) as Arc<dyn CompletionBackend>,
            DispatchConfig::default(),
        )
        .with_retriever(Arc::clone(&retriever) as Arc<dyn Retriever>);

        let result = engine
            .run(&key("guest-b"), "When is breakfast?", &credentials())
            .await
            .unwrap();

        assert_eq!(result.text(), Some("Breakfast is served from 7 to 10."));
        assert_eq!(retriever.calls.load(Ordering::SeqCst), 1);
        let system = &backend.requests()[0].messages[0];
        assert_eq!(system.role, ChatRole::System);
        assert!(system.content.contains("The pool closes at 9pm."));
    }

    #[tokio::test]
    async fn missing_retrieval_key_fails_before_any_call() {
        let backend = Arc::new(ScriptedBackend::new(vec![text("unused")]));
        let retriever = Arc::new(FakeRetriever::returning(Vec::new()));
        let engine = DispatchEngine::new(
            registry(),
            Arc::new(SessionStore::default()),
            Arc::clone(&backend) as Arc<dyn CompletionBackend>,
            DispatchConfig::default(),
        )
        .with_retriever(Arc::clone(&retriever) as Arc<dyn Retriever>);

        let credentials = Credentials::new(ApiKey::new("sk-test").unwrap());
        let err = engine
            .run(&key("guest-c"), "Hello", &credentials)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "ConfigurationError");
        assert_eq!(err.http_status(), 400);
        assert!(backend.requests().is_empty());
        assert_eq!(retriever.calls.load(Ordering::SeqCst), 0);
        assert!(engine.sessions().is_empty());
    }

    #[tokio::test]
    async fn retrieval_failure_leaves_session_unchanged() {
        let backend = Arc::new(ScriptedBackend::new(vec![text("unused")]));
        let engine = DispatchEngine::new(
            registry(),
            Arc::new(SessionStore::default()),
            Arc::clone(&backend) as Arc<dyn CompletionBackend>,
            DispatchConfig::default(),
        )
        .with_retriever(Arc::new(FakeRetriever::failing(RetrievalError::Timeout)));

        let session = key("guest-d");
        let err = engine
            .run(&session, "Hello", &credentials())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DispatchError::Collaborator {
                collaborator: Collaborator::Retrieval,
                ..
            }
        ));
        assert!(backend.requests().is_empty());
        assert!(engine.sessions().snapshot(&session).await.is_none());
    }

    #[tokio::test]
    async fn completion_failure_leaves_session_unchanged() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            text("Welcome!"),
            Err(LlmError::RateLimited {
                retry_after_secs: None,
            }),
        ]));
        let engine = ungrounded(backend);
        let session = key("guest-e");

        engine.run(&session, "Hi", &credentials()).await.unwrap();
        let before = engine.sessions().snapshot(&session).await.unwrap();

        let err = engine
            .run(&session, "Book a room", &credentials())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "CollaboratorError");
        assert_eq!(engine.sessions().snapshot(&session).await.unwrap(), before);
    }

    #[tokio::test]
    async fn unknown_tool_is_rejected() {
        let backend = Arc::new(ScriptedBackend::new(vec![call(
            "teleport_guest",
            json!({"destination": "moon"}),
        )]));
        let engine = ungrounded(backend);
        let session = key("guest-f");

        let err = engine
            .run(&session, "Send me to the moon", &credentials())
            .await
            .unwrap_err();

        assert_eq!(
            err,
            DispatchError::UnknownTool {
                name: "teleport_guest".to_string()
            }
        );
        assert!(engine.sessions().snapshot(&session).await.is_none());
    }

    #[tokio::test]
    async fn missing_arguments_pass_through() {
        let backend = Arc::new(ScriptedBackend::new(vec![Ok(Completion::FunctionCall {
            name: "housekeeping_service_request".to_string(),
            arguments: Map::new(),
        })]));
        let engine = ungrounded(backend);

        let result = engine
            .run(&key("guest-g"), "Clean my room", &credentials())
            .await
            .unwrap();

        assert!(result.invocation().unwrap().parameters.is_empty());
    }

    #[tokio::test]
    async fn completion_timeout_is_a_collaborator_failure() {
        let backend =
            Arc::new(ScriptedBackend::new(vec![text("too late")]).with_delay(Duration::from_millis(200)));
        let engine = DispatchEngine::new(
            registry(),
            Arc::new(SessionStore::default()),
            backend,
            DispatchConfig::default()
                .with_grounding(false)
                .with_completion_timeout(Duration::from_millis(20)),
        );
        let session = key("guest-h");

        let err = engine
            .run(&session, "Hello", &credentials())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DispatchError::Collaborator {
                collaborator: Collaborator::Completion,
                ref reason,
            } if reason.contains("timed out")
        ));
        assert!(engine.sessions().snapshot(&session).await.is_none());
    }

    #[tokio::test]
    async fn concurrent_dispatches_on_one_session_serialize() {
        let backend = Arc::new(
            ScriptedBackend::new(vec![text("first"), text("second")])
                .with_delay(Duration::from_millis(20)),
        );
        let sessions = Arc::new(SessionStore::new(SessionConfig::default()));
        let engine = DispatchEngine::new(
            registry(),
            Arc::clone(&sessions),
            Arc::clone(&backend) as Arc<dyn CompletionBackend>,
            DispatchConfig::default().with_grounding(false),
        );
        let session = key("guest-i");
        sessions
            .append(&session, ConversationTurn::user("earlier"))
            .await;

        let credentials = credentials();
        let (a, b) = tokio::join!(
            engine.run(&session, "question one", &credentials),
            engine.run(&session, "question two", &credentials),
        );
        a.unwrap();
        b.unwrap();

        let state = sessions.snapshot(&session).await.unwrap();
        assert_eq!(state.turn_count(), 5);

        // The second completion saw the first dispatch's turns.
        let requests = backend.requests();
        assert_eq!(requests[0].messages.len(), 3);
        assert_eq!(requests[1].messages.len(), 5);
    }

    #[tokio::test]
    async fn failed_first_dispatch_does_not_evict_other_sessions() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            text("Welcome!"),
            Err(LlmError::Unauthorized {
                reason: "bad key".to_string(),
            }),
        ]));
        let engine = DispatchEngine::new(
            registry(),
            Arc::new(SessionStore::new(
                SessionConfig::default().with_max_sessions(1),
            )),
            backend,
            DispatchConfig::default().with_grounding(false),
        );
        let resident = key("resident");
        let newcomer = key("newcomer");

        engine.run(&resident, "Hi", &credentials()).await.unwrap();
        let before = engine.sessions().snapshot(&resident).await.unwrap();

        engine
            .run(&newcomer, "Hello", &credentials())
            .await
            .unwrap_err();

        assert_eq!(engine.sessions().len(), 1);
        assert!(engine.sessions().snapshot(&newcomer).await.is_none());
        assert_eq!(
            engine.sessions().snapshot(&resident).await.unwrap(),
            before
        );
    }

    #[tokio::test]
    async fn request_carries_configured_limits() {
        let backend = Arc::new(ScriptedBackend::new(vec![text("ok")]));
        let engine = DispatchEngine::new(
            registry(),
            Arc::new(SessionStore::default()),
            Arc::clone(&backend) as Arc<dyn CompletionBackend>,
            DispatchConfig::default()
                .with_grounding(false)
                .with_max_tokens(256),
        );

        engine
            .run(&key("guest-k"), "Hi", &credentials())
            .await
            .unwrap();

        let request = &backend.requests()[0];
        assert_eq!(request.max_tokens, Some(256));
        assert_eq!(request.temperature, Some(0.7));
    }

    #[tokio::test]
    async fn custom_system_prompt_is_sent_verbatim() {
        let backend = Arc::new(ScriptedBackend::new(vec![text("ok")]));
        let engine = DispatchEngine::new(
            registry(),
            Arc::new(SessionStore::default()),
            Arc::clone(&backend) as Arc<dyn CompletionBackend>,
            DispatchConfig::default()
                .with_grounding(false)
                .with_system_prompt(PromptTemplate::new("Only answer about the spa.")),
        );

        engine
            .run(&key("guest-j"), "Hi", &credentials())
            .await
            .unwrap();

        assert_eq!(
            backend.requests()[0].messages[0].content,
            "Only answer about the spa."
        );
    }
}
