//! OpenAI-compatible chat completions backend.
//!
//! Sends the tool catalog as `tools` with `tool_choice: "auto"` and turns the
//! first selected tool call into a [`Completion::FunctionCall`]. Providers that
//! still answer with the legacy `function_call` field are accepted too.

use crate::backend::{
    ChatMessage, Completion, CompletionBackend, CompletionRequest, CompletionResponse,
    LlmProvider, TokenUsage,
};
use crate::credentials::Credentials;
use crate::error::LlmError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode, header};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Configuration for the OpenAI backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// API base URL, without a trailing `/chat/completions`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Chat model identifier.
    #[serde(default = "default_model")]
    pub model: String,

    /// Transport-level timeout in seconds.
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_request_timeout_seconds() -> u64 {
    60
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            request_timeout_seconds: default_request_timeout_seconds(),
        }
    }
}

impl OpenAiConfig {
    /// Sets the base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

/// Chat completions client.
#[derive(Debug, Clone)]
pub struct OpenAiBackend {
    http: Client,
    config: OpenAiConfig,
}

impl OpenAiBackend {
    /// Creates a backend from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::InvalidConfig`] if the HTTP client cannot be built.
    pub fn new(config: OpenAiConfig) -> Result<Self, LlmError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| LlmError::InvalidConfig {
                reason: e.to_string(),
            })?;
        Ok(Self { http, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[derive(Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ToolDefinition<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ToolDefinition<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: &'a JsonValue,
}

#[derive(Deserialize)]
struct ChatCompletionReply {
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ToolCall>>,
    function_call: Option<FunctionCall>,
}

#[derive(Deserialize)]
struct ToolCall {
    function: FunctionCall,
}

#[derive(Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[async_trait]
impl CompletionBackend for OpenAiBackend {
    #[instrument(
        skip(self, request, credentials),
        fields(model = %self.config.model, messages = request.messages.len())
    )]
    async fn complete(
        &self,
        request: &CompletionRequest,
        credentials: &Credentials,
    ) -> Result<CompletionResponse, LlmError> {
        let body = ChatCompletionBody {
            model: &self.config.model,
            messages: &request.messages,
            tools: request
                .functions
                .iter()
                .map(|function| ToolDefinition {
                    kind: "function",
                    function,
                })
                .collect(),
            tool_choice: (!request.functions.is_empty()).then_some("auto"),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(credentials.completion.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| send_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after_secs = response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            let reason = response.text().await.unwrap_or_default();
            return Err(status_error(status, retry_after_secs, reason));
        }

        let reply: ChatCompletionReply =
            response
                .json()
                .await
                .map_err(|e| LlmError::ResponseParseFailed {
                    reason: e.to_string(),
                })?;

        let usage = reply
            .usage
            .map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();
        let model = reply.model.unwrap_or_else(|| self.config.model.clone());

        let choice = reply
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::ResponseParseFailed {
                reason: "no choices in response".to_string(),
            })?;
        let completion = interpret(choice.message)?;

        debug!(
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            function_call = matches!(completion, Completion::FunctionCall { .. }),
            "completion received"
        );

        Ok(CompletionResponse {
            completion,
            usage,
            model,
        })
    }

    fn provider(&self) -> LlmProvider {
        if self.config.base_url == default_base_url() {
            LlmProvider::OpenAi
        } else {
            LlmProvider::OpenAiCompatible
        }
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

fn send_error(err: &reqwest::Error) -> LlmError {
    if err.is_timeout() {
        LlmError::Timeout
    } else if err.is_connect() {
        LlmError::ProviderUnavailable {
            provider: "openai".to_string(),
            reason: err.to_string(),
        }
    } else {
        LlmError::RequestFailed {
            status: None,
            reason: err.to_string(),
        }
    }
}

fn status_error(status: StatusCode, retry_after_secs: Option<u64>, reason: String) -> LlmError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::Unauthorized { reason },
        StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimited { retry_after_secs },
        _ => LlmError::RequestFailed {
            status: Some(status.as_u16()),
            reason,
        },
    }
}

fn interpret(message: ReplyMessage) -> Result<Completion, LlmError> {
    let mut tool_calls = message.tool_calls.unwrap_or_default().into_iter();
    let call = match tool_calls.next() {
        Some(first) => {
            let ignored: Vec<_> = tool_calls.map(|c| c.function.name).collect();
            if !ignored.is_empty() {
                warn!(selected = %first.function.name, ?ignored, "model selected several tools, keeping the first");
            }
            Some(first.function)
        }
        None => message.function_call,
    };

    if let Some(call) = call {
        let arguments = decode_arguments(&call.name, &call.arguments)?;
        return Ok(Completion::FunctionCall {
            name: call.name,
            arguments,
        });
    }

    match message.content {
        Some(text) => Ok(Completion::Text { text }),
        None => Err(LlmError::ResponseParseFailed {
            reason: "reply has neither content nor a function call".to_string(),
        }),
    }
}

fn decode_arguments(name: &str, raw: &str) -> Result<Map<String, JsonValue>, LlmError> {
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str(raw) {
        Ok(JsonValue::Object(arguments)) => Ok(arguments),
        Ok(other) => Err(LlmError::ResponseParseFailed {
            reason: format!("arguments for '{name}' are not an object: {other}"),
        }),
        Err(e) => Err(LlmError::ResponseParseFailed {
            reason: format!("arguments for '{name}' are not valid JSON: {e}"),
        }),
    }
}
