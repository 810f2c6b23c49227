//! System prompt templates.
//!
//! Templates use `{{variable}}` placeholders. The concierge prompt has a
//! single `{{context}}` placeholder filled with retrieved snippets.

use crate::retrieval::Snippet;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Placeholder replaced by retrieved snippets.
pub const CONTEXT_VARIABLE: &str = "context";

/// Default concierge instructions.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are the concierge assistant of a residential hotel. \
Extract the relevant information from the guest's messages. \
If a value is not explicitly provided, do not guess it. \
Extracting partial information is fine: when a function needs a detail the guest has not \
given, ask the guest a follow-up question for it instead of calling the function. \
Otherwise answer from the following context:\n{{context}}";

/// A system prompt template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PromptTemplate {
    content: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM_PROMPT)
    }
}

impl PromptTemplate {
    /// Creates a template from raw content.
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }

    /// Returns the raw template content.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Renders the template with the given variables.
    ///
    /// Variables are substituted using `{{variable_name}}` syntax. Unknown
    /// placeholders are left in place.
    #[must_use]
    pub fn render(&self, variables: &HashMap<&str, String>) -> String {
        let mut result = self.content.clone();
        for (name, value) in variables {
            let placeholder = format!("{{{{{name}}}}}");
            result = result.replace(&placeholder, value);
        }
        result
    }

    /// Renders the template with retrieved snippets as context.
    ///
    /// Snippets are joined by blank lines. A template without a context
    /// placeholder gets the snippets appended.
    #[must_use]
    pub fn render_with_context(&self, snippets: &[Snippet]) -> String {
        let context = snippets
            .iter()
            .map(|s| s.text.trim())
            .collect::<Vec<_>>()
            .join("\n\n");

        if !self.content.contains(&format!("{{{{{CONTEXT_VARIABLE}}}}}")) {
            if context.is_empty() {
                return self.content.clone();
            }
            return format!("{}\n\n{context}", self.content);
        }

        let mut variables = HashMap::new();
        variables.insert(CONTEXT_VARIABLE, context);
        self.render(&variables).trim_end().to_string()
    }
}
