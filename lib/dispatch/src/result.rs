//! Dispatch outcomes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// A function selected by the model, with its arguments passed through as
/// the model produced them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionInvocation {
    /// Name of a registered tool.
    #[serde(rename = "function-name")]
    pub function_name: String,
    /// Arguments, uninterpreted.
    pub parameters: Map<String, JsonValue>,
}

impl FunctionInvocation {
    /// Creates an invocation.
    #[must_use]
    pub fn new(function_name: impl Into<String>, parameters: Map<String, JsonValue>) -> Self {
        Self {
            function_name: function_name.into(),
            parameters,
        }
    }

    /// Returns the canonical JSON form stored in session history.
    ///
    /// `{"function-name": ..., "parameters": {...}}`, keys in that order.
    #[must_use]
    pub fn to_canonical_json(&self) -> String {
        serde_json::json!({
            "function-name": self.function_name,
            "parameters": self.parameters,
        })
        .to_string()
    }
}

/// Outcome of one successful dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DispatchResult {
    /// The model answered in text.
    TextAnswer { text: String },
    /// The model selected a registered function.
    FunctionCall(FunctionInvocation),
}

impl DispatchResult {
    /// Returns true for a function call.
    #[must_use]
    pub fn is_function_call(&self) -> bool {
        matches!(self, Self::FunctionCall(_))
    }

    /// Returns the text answer, if any.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::TextAnswer { text } => Some(text),
            Self::FunctionCall(_) => None,
        }
    }

    /// Returns the function invocation, if any.
    #[must_use]
    pub fn invocation(&self) -> Option<&FunctionInvocation> {
        match self {
            Self::TextAnswer { .. } => None,
            Self::FunctionCall(invocation) => Some(invocation),
        }
    }

    /// Returns the content of the assistant turn recorded for this result.
    #[must_use]
    pub fn assistant_turn_content(&self) -> String {
        match self {
            Self::TextAnswer { text } => text.clone(),
            Self::FunctionCall(invocation) => invocation.to_canonical_json(),
        }
    }
}
