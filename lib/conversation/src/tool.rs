//! Tool registry for conversation mode.
//!
//! Tools are actions the language model may select instead of answering in
//! free text. The registry only describes them; executing a selected tool is
//! the job of a separately named handler outside this crate.

use crate::error::DuplicateToolError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue, json};
use std::collections::HashMap;

/// Primitive type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    /// Free text.
    String,
    /// Whole number.
    Integer,
    /// Floating point number.
    Number,
    /// Calendar date, transported as an ISO-8601 string.
    Date,
}

impl ParamType {
    /// Returns the JSON schema fragment for this type.
    #[must_use]
    pub fn json_schema(&self) -> Map<String, JsonValue> {
        let mut schema = Map::new();
        let type_name = match self {
            Self::String | Self::Date => "string",
            Self::Integer => "integer",
            Self::Number => "number",
        };
        schema.insert("type".to_string(), json!(type_name));
        if matches!(self, Self::Date) {
            schema.insert("format".to_string(), json!("date"));
        }
        schema
    }
}

/// Definition of one tool parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    /// Parameter name, as it appears in the function arguments.
    pub name: String,
    /// Parameter type.
    pub param_type: ParamType,
    /// Whether the model must obtain a value before calling the tool.
    pub required: bool,
    /// Description the model uses to extract the value.
    pub description: String,
}

impl ParamSpec {
    /// Creates a required parameter.
    #[must_use]
    pub fn required(
        name: impl Into<String>,
        param_type: ParamType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type,
            required: true,
            description: description.into(),
        }
    }

    /// Creates an optional parameter.
    #[must_use]
    pub fn optional(
        name: impl Into<String>,
        param_type: ParamType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type,
            required: false,
            description: description.into(),
        }
    }
}

/// Definition of a tool available during conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Unique tool name.
    pub name: String,
    /// Free-text description the model uses to decide applicability.
    pub description: String,
    /// Parameters in declaration order.
    pub parameters: Vec<ParamSpec>,
}

impl ToolSpec {
    /// Creates a tool with no parameters.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    /// Appends a parameter.
    #[must_use]
    pub fn with_param(mut self, param: ParamSpec) -> Self {
        self.parameters.push(param);
        self
    }

    /// Returns the names of required parameters missing from `arguments`.
    ///
    /// A `null` value counts as missing.
    #[must_use]
    pub fn missing_required<'a>(&'a self, arguments: &Map<String, JsonValue>) -> Vec<&'a str> {
        self.parameters
            .iter()
            .filter(|p| p.required)
            .filter(|p| arguments.get(&p.name).is_none_or(JsonValue::is_null))
            .map(|p| p.name.as_str())
            .collect()
    }

    /// Returns the function-calling schema for this tool.
    ///
    /// Properties keep declaration order.
    #[must_use]
    pub fn function_schema(&self) -> JsonValue {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for param in &self.parameters {
            let mut schema = param.param_type.json_schema();
            schema.insert("description".to_string(), json!(param.description));
            properties.insert(param.name.clone(), JsonValue::Object(schema));
            if param.required {
                required.push(JsonValue::String(param.name.clone()));
            }
        }

        json!({
            "name": self.name,
            "description": self.description,
            "parameters": {
                "type": "object",
                "properties": properties,
                "required": required,
            }
        })
    }
}

/// Ordered registry of tool specifications.
///
/// Registration order is preserved because some providers use a tool's
/// position as a tie-break signal.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    specs: Vec<ToolSpec>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            specs: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Registers a tool.
    ///
    /// # Errors
    ///
    /// Returns [`DuplicateToolError`] if the name is already registered.
    /// The existing entry is left untouched.
    pub fn register(&mut self, spec: ToolSpec) -> Result<(), DuplicateToolError> {
        if self.index.contains_key(&spec.name) {
            return Err(DuplicateToolError { name: spec.name });
        }
        self.index.insert(spec.name.clone(), self.specs.len());
        self.specs.push(spec);
        Ok(())
    }

    /// Gets a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ToolSpec> {
        self.index.get(name).map(|&i| &self.specs[i])
    }

    /// Returns true if a tool with this name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Returns all tools in registration order.
    #[must_use]
    pub fn list(&self) -> &[ToolSpec] {
        &self.specs
    }

    /// Returns the number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Returns whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Converts the catalog to the function schemas expected by LLM APIs.
    #[must_use]
    pub fn to_llm_format(&self) -> Vec<JsonValue> {
        self.specs.iter().map(ToolSpec::function_schema).collect()
    }
}
