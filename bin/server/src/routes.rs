//! HTTP routes.
//!
//! - `POST /llm-engine`: run one dispatch
//! - `POST /tools/execute`: execute a selected tool server-side
//! - `DELETE /sessions/{session_id}`: forget a conversation
//! - `GET /health`: liveness and counts

use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    routing::{delete, get, post},
};
use concierge_core::SessionKey;
use concierge_dispatch::{ResponseEnvelope, ResponseFormatter};
use concierge_integration::HandlerError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Builds the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/llm-engine", post(llm_engine))
        .route("/tools/execute", post(execute_tool))
        .route("/sessions/{session_id}", delete(evict_session))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Body of `POST /llm-engine`.
///
/// Unknown fields, such as a legacy `cohere_api_key`, are ignored.
#[derive(Deserialize)]
pub struct EngineRequest {
    query: String,
    session_id: String,
    #[serde(default)]
    openai_api_key: Option<String>,
    #[serde(default)]
    pinecone_api_key: Option<String>,
}

/// Runs one dispatch and renders the envelope.
pub async fn llm_engine(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<EngineRequest>, JsonRejection>,
) -> Result<Json<ResponseEnvelope>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::invalid_request(e.body_text()))?;

    if request.query.trim().is_empty() {
        return Err(ApiError::invalid_request("query must not be empty"));
    }
    let session_id = parse_session_id(&request.session_id)?;
    let credentials = state.resolve_credentials(
        request.openai_api_key.as_deref(),
        request.pinecone_api_key.as_deref(),
    )?;

    let result = state
        .engine
        .run(&session_id, &request.query, &credentials)
        .await?;

    Ok(Json(ResponseFormatter::render(&request.query, &result)))
}

/// Body of `POST /tools/execute`.
#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    #[serde(rename = "function-name")]
    function_name: String,
    #[serde(default)]
    parameters: Map<String, JsonValue>,
}

/// Response of `POST /tools/execute`.
#[derive(Debug, Serialize)]
pub struct ExecuteResponse {
    success: bool,
    message: &'static str,
    data: ExecuteData,
}

#[derive(Debug, Serialize)]
struct ExecuteData {
    #[serde(rename = "function-name")]
    function_name: String,
    output: JsonValue,
}

/// Executes a registered tool through its handler.
pub async fn execute_tool(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ExecuteRequest>, JsonRejection>,
) -> Result<Json<ExecuteResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::invalid_request(e.body_text()))?;

    if !state.engine.registry().contains(&request.function_name) {
        return Err(HandlerError::NotFound {
            name: request.function_name,
        }
        .into());
    }

    let result = state
        .handlers
        .execute(&request.function_name, &request.parameters)
        .await?;

    Ok(Json(ExecuteResponse {
        success: true,
        message: "Function executed successfully",
        data: ExecuteData {
            function_name: request.function_name,
            output: result.output,
        },
    }))
}

/// Evicts a session.
pub async fn evict_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let session_id = parse_session_id(&session_id)?;
    state.engine.sessions().evict(&session_id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Response of `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    tools: usize,
    sessions: usize,
}

/// Reports liveness with registry and session counts.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        tools: state.engine.registry().len(),
        sessions: state.engine.sessions().len(),
    })
}

fn parse_session_id(raw: &str) -> Result<SessionKey, ApiError> {
    SessionKey::parse(raw)
        .map_err(|e| ApiError::invalid_request(format!("invalid session_id: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CredentialDefaults;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use concierge_ai::{
        Completion, CompletionBackend, CompletionRequest, CompletionResponse, Credentials,
        LlmError, LlmProvider, TokenUsage,
    };
    use concierge_conversation::{SessionStore, hotel_concierge_tools};
    use concierge_dispatch::{DispatchConfig, DispatchEngine};
    use concierge_integration::{HandlerRegistry, ToolHandler};
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tower::ServiceExt;

    struct ScriptedBackend {
        replies: Mutex<VecDeque<Result<Completion, LlmError>>>,
    }

    #[async_trait]
    impl CompletionBackend for ScriptedBackend {
        async fn complete(
            &self,
            _request: &CompletionRequest,
            _credentials: &Credentials,
        ) -> Result<CompletionResponse, LlmError> {
            let completion = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(LlmError::Timeout))?;
            Ok(CompletionResponse {
                completion,
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

    struct FixedTemperature;

    #[async_trait]
    impl ToolHandler for FixedTemperature {
        fn name(&self) -> &str {
            "get_current_temperature"
        }

        async fn execute(
            &self,
            _arguments: &Map<String, JsonValue>,
        ) -> Result<JsonValue, HandlerError> {
            Ok(json!("The current temperature is 30.5°C"))
        }
    }

    fn app(replies: Vec<Result<Completion, LlmError>>) -> Router {
        let engine = DispatchEngine::new(
            Arc::new(hotel_concierge_tools().unwrap()),
            Arc::new(SessionStore::default()),
            Arc::new(ScriptedBackend {
                replies: Mutex::new(replies.into()),
            }),
            DispatchConfig::default().with_grounding(false),
        );
        let handlers = HandlerRegistry::new().with_handler(Arc::new(FixedTemperature));
        router(Arc::new(AppState::new(
            engine,
            handlers,
            CredentialDefaults::default(),
        )))
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<JsonValue>,
    ) -> (StatusCode, JsonValue) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            JsonValue::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    fn engine_body(query: &str, session_id: &str) -> JsonValue {
        json!({
            "query": query,
            "session_id": session_id,
            "openai_api_key": "sk-test",
            "cohere_api_key": "ignored"
        })
    }

    #[tokio::test]
    async fn text_answer_round_trip() {
        let app = app(vec![Ok(Completion::Text {
            text: "Sure, which room number?".to_string(),
        })]);

        let (status, json) = send(
            &app,
            Method::POST,
            "/llm-engine",
            Some(engine_body("Please clean my room", "guest-1")),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json,
            json!({
                "success": true,
                "message": "Response received successfully",
                "function-call-status": false,
                "data": {"query": "Please clean my room", "answer": "Sure, which room number?"},
                "function": null
            })
        );
    }

    #[tokio::test]
    async fn function_call_round_trip() {
        let mut arguments = Map::new();
        arguments.insert("room_number".to_string(), json!(305));
        let app = app(vec![Ok(Completion::FunctionCall {
            name: "housekeeping_service_request".to_string(),
            arguments,
        })]);

        let (status, json) = send(
            &app,
            Method::POST,
            "/llm-engine",
            Some(engine_body("Clean room 305", "guest-2")),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["function-call-status"], true);
        assert!(json["data"]["answer"].is_null());
        assert_eq!(json["function"]["function-name"], "housekeeping_service_request");
        assert_eq!(json["function"]["parameters"]["room_number"], 305);

        let (_, health) = send(&app, Method::GET, "/health", None).await;
        assert_eq!(health, json!({"status": "ok", "tools": 20, "sessions": 1}));
    }

    #[tokio::test]
    async fn weather_question_selects_temperature_tool() {
        let mut arguments = Map::new();
        arguments.insert("latitude".to_string(), json!(6.9));
        arguments.insert("longitude".to_string(), json!(79.8));
        let app = app(vec![Ok(Completion::FunctionCall {
            name: "get_current_temperature".to_string(),
            arguments,
        })]);

        let (status, json) = send(
            &app,
            Method::POST,
            "/llm-engine",
            Some(engine_body(
                "What's the weather in Colombo, lat 6.9, long 79.8?",
                "guest-7",
            )),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json["function"],
            json!({
                "function-name": "get_current_temperature",
                "parameters": {"latitude": 6.9, "longitude": 79.8}
            })
        );
    }

    #[tokio::test]
    async fn missing_completion_key_is_a_configuration_error() {
        let app = app(Vec::new());

        let (status, json) = send(
            &app,
            Method::POST,
            "/llm-engine",
            Some(json!({"query": "Hello", "session_id": "guest-3"})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["type"], "ConfigurationError");
        assert!(
            json["error"]["message"]
                .as_str()
                .unwrap()
                .contains("Provide OPENAI API KEY")
        );
    }

    #[tokio::test]
    async fn collaborator_failure_renders_error_envelope() {
        let app = app(vec![Err(LlmError::Unauthorized {
            reason: "bad key".to_string(),
        })]);

        let (status, json) = send(
            &app,
            Method::POST,
            "/llm-engine",
            Some(engine_body("Hello", "guest-4")),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"]["type"], "CollaboratorError");
    }

    #[tokio::test]
    async fn malformed_requests_are_rejected() {
        let app = app(Vec::new());

        let (status, json) = send(
            &app,
            Method::POST,
            "/llm-engine",
            Some(json!({"session_id": "guest-5"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["type"], "InvalidRequest");

        let (status, _) = send(
            &app,
            Method::POST,
            "/llm-engine",
            Some(engine_body("   ", "guest-5")),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, Method::POST, "/llm-engine", Some(engine_body("Hi", " "))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn execute_tool_runs_handler() {
        let app = app(Vec::new());

        let (status, json) = send(
            &app,
            Method::POST,
            "/tools/execute",
            Some(json!({
                "function-name": "get_current_temperature",
                "parameters": {"latitude": 6.93, "longitude": 79.85}
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json["data"],
            json!({
                "function-name": "get_current_temperature",
                "output": "The current temperature is 30.5°C"
            })
        );
    }

    #[tokio::test]
    async fn execute_tool_rejects_unknown_and_unhandled_tools() {
        let app = app(Vec::new());

        let (status, json) = send(
            &app,
            Method::POST,
            "/tools/execute",
            Some(json!({"function-name": "teleport_guest"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"]["type"], "UnknownToolError");

        let (status, _) = send(
            &app,
            Method::POST,
            "/tools/execute",
            Some(json!({"function-name": "book_room", "parameters": {}})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn evicting_a_session() {
        let app = app(vec![Ok(Completion::Text {
            text: "Welcome!".to_string(),
        })]);
        send(&app, Method::POST, "/llm-engine", Some(engine_body("Hi", "guest-6"))).await;

        let (status, _) = send(&app, Method::DELETE, "/sessions/guest-6", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, json) = send(&app, Method::DELETE, "/sessions/guest-6", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"]["type"], "SessionNotFound");
    }
}
