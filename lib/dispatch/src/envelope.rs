//! Client response envelopes.
//!
//! The success envelope carries either a text answer or a function
//! invocation; `function-call-status` tells the client which. Failures use
//! a separate error envelope.

use crate::error::DispatchError;
use crate::result::{DispatchResult, FunctionInvocation};
use serde::{Deserialize, Serialize};

/// Message carried by every successful response.
pub const SUCCESS_MESSAGE: &str = "Response received successfully";

/// Payload of a successful response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseData {
    /// The question as received.
    pub query: String,
    /// The text answer, or `null` for a function call.
    pub answer: Option<String>,
}

/// Success envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    /// Always `true`.
    pub success: bool,
    /// Human-readable status message.
    pub message: String,
    /// Whether `function` is populated.
    #[serde(rename = "function-call-status")]
    pub function_call_status: bool,
    /// Query and answer.
    pub data: ResponseData,
    /// The selected function, or `null` for a text answer.
    pub function: Option<FunctionInvocation>,
}

/// Body of an error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable error message.
    pub message: String,
    /// Error type, for example `CollaboratorError`.
    #[serde(rename = "type")]
    pub kind: String,
}

/// Error envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Always `false`.
    pub success: bool,
    /// What went wrong.
    pub error: ErrorBody,
}

impl ErrorEnvelope {
    /// Creates an error envelope.
    #[must_use]
    pub fn new(message: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            success: false,
            error: ErrorBody {
                message: message.into(),
                kind: kind.into(),
            },
        }
    }
}

/// Shapes dispatch outcomes into client envelopes.
pub struct ResponseFormatter;

impl ResponseFormatter {
    /// Renders a successful dispatch.
    #[must_use]
    pub fn render(query: &str, result: &DispatchResult) -> ResponseEnvelope {
        let (answer, function) = match result {
            DispatchResult::TextAnswer { text } => (Some(text.clone()), None),
            DispatchResult::FunctionCall(invocation) => (None, Some(invocation.clone())),
        };

        ResponseEnvelope {
            success: true,
            message: SUCCESS_MESSAGE.to_string(),
            function_call_status: function.is_some(),
            data: ResponseData {
                query: query.to_string(),
                answer,
            },
            function,
        }
    }

    /// Renders a failed dispatch.
    #[must_use]
    pub fn render_error(err: &DispatchError) -> ErrorEnvelope {
        ErrorEnvelope::new(err.to_string(), err.kind())
    }
}
