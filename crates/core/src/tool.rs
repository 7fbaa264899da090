//! Tool abstractions for the unified LLM interface

use crate::{Error, Result};
use compact_str::CompactString;
use schemars::Schema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A tool for the LLM
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Tool {
    /// The name of the tool
    pub name: CompactString,

    /// The description of the tool
    pub description: String,

    /// The parameters of the tool
    pub parameters: Schema,

    /// Whether to strictly validate the parameters
    #[serde(default)]
    pub strict: bool,
}

impl Tool {
    /// Create a new tool.
    pub fn new(
        name: impl Into<CompactString>,
        description: impl Into<String>,
        parameters: Schema,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            strict: false,
        }
    }

    /// The parameter schema as JSON.
    pub fn schema(&self) -> &Value {
        self.parameters.as_value()
    }
}

/// A tool call requested by the model.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct ToolCall {
    /// The ID of the tool call, unique within a conversation
    pub id: CompactString,

    /// The name of the tool to call
    pub name: CompactString,

    /// The arguments, always a JSON object
    pub arguments: Value,
}

impl ToolCall {
    /// Create a new tool call with structured arguments.
    pub fn new(
        id: impl Into<CompactString>,
        name: impl Into<CompactString>,
        arguments: Value,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// Parse a tool call from a raw argument string.
    ///
    /// An empty string stands for no arguments. Anything that is not a JSON
    /// object fails with [`Error::MalformedToolCall`].
    pub fn parse(
        id: impl Into<CompactString>,
        name: impl Into<CompactString>,
        raw: &str,
    ) -> Result<Self> {
        let id = id.into();
        let name = name.into();
        let raw = raw.trim();
        let arguments = if raw.is_empty() {
            Value::Object(Map::new())
        } else {
            match serde_json::from_str::<Value>(raw) {
                Ok(value @ Value::Object(_)) => value,
                Ok(other) => {
                    return Err(Error::MalformedToolCall {
                        id,
                        name,
                        reason: format!("expected a JSON object, got {other}"),
                    });
                }
                Err(e) => {
                    return Err(Error::MalformedToolCall {
                        id,
                        name,
                        reason: e.to_string(),
                    });
                }
            }
        };
        Ok(Self {
            id,
            name,
            arguments,
        })
    }

    /// The arguments encoded as a JSON string.
    pub fn arguments_json(&self) -> String {
        self.arguments.to_string()
    }
}

/// Controls whether and which tool the model must call.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    /// Model may answer directly or call tools
    #[default]
    Auto,

    /// Model must call at least one tool
    Any,

    /// Model must call the named tool
    Tool(CompactString),
}

impl ToolChoice {
    /// Whether this choice forces a tool call.
    pub fn is_forced(&self) -> bool {
        !matches!(self, Self::Auto)
    }
}

impl From<&str> for ToolChoice {
    fn from(value: &str) -> Self {
        ToolChoice::Tool(value.into())
    }
}
