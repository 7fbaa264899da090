//! The conversation sent to a backend.

use crate::{Error, Message, Result, Role, Tool, ToolChoice};
use compact_str::{CompactString, format_compact};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// An ordered, append-only sequence of messages plus the tools and options
/// the backend sees.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Conversation {
    /// Messages in causal order
    messages: Vec<Message>,

    /// Tools the model may call
    #[serde(default)]
    pub tools: Vec<Tool>,

    /// Per-request options
    #[serde(default)]
    pub options: Options,
}

impl Conversation {
    /// Create an empty conversation for the given model.
    pub fn new(model: impl Into<CompactString>) -> Self {
        Self {
            messages: Vec::new(),
            tools: Vec::new(),
            options: Options {
                model: model.into(),
                ..Default::default()
            },
        }
    }

    /// Build a conversation from existing messages, validating each.
    pub fn from_messages(model: impl Into<CompactString>, messages: Vec<Message>) -> Result<Self> {
        let mut conversation = Self::new(model);
        for message in messages {
            conversation.push(message)?;
        }
        Ok(conversation)
    }

    /// Append a system message.
    pub fn system(mut self, content: impl Into<String>) -> Self {
        self.messages.push(Message::system(content.into()));
        self
    }

    /// Append a user message.
    pub fn user(mut self, content: impl Into<crate::Content>) -> Self {
        self.messages.push(Message::user(content));
        self
    }

    /// Set the available tools.
    pub fn with_tools(mut self, tools: Vec<Tool>) -> Self {
        self.tools = tools;
        self
    }

    /// Set the options.
    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// Append a message.
    ///
    /// Tool calls without an id get one assigned (`call_<message>_<n>`).
    /// A tool message must answer a call from an earlier assistant message,
    /// and call ids must be unique across the conversation.
    pub fn push(&mut self, mut message: Message) -> Result<()> {
        let index = self.messages.len();
        if !message.tool_calls.is_empty() {
            let mut seen = self.call_ids();
            for (position, call) in message.tool_calls.iter_mut().enumerate() {
                if call.id.is_empty() {
                    call.id = format_compact!("call_{index}_{position}");
                }
                if !seen.insert(call.id.clone()) {
                    return Err(Error::InvalidConversation(format!(
                        "duplicate tool call id '{}'",
                        call.id
                    )));
                }
            }
        }

        if message.role == Role::Tool {
            let Some(id) = message.tool_call_id.as_deref() else {
                return Err(Error::InvalidConversation(
                    "tool message without a tool call id".into(),
                ));
            };
            if self.tool_name_for(id).is_none() {
                return Err(Error::InvalidConversation(format!(
                    "tool message answers unknown tool call '{id}'"
                )));
            }
        }

        self.messages.push(message);
        Ok(())
    }

    fn call_ids(&self) -> BTreeSet<CompactString> {
        self.messages
            .iter()
            .flat_map(|m| m.tool_calls.iter().map(|c| c.id.clone()))
            .collect()
    }

    /// Check the conversation can be turned into a request.
    pub fn validate(&self) -> Result<()> {
        if self.messages.is_empty() {
            return Err(Error::InvalidConversation(
                "conversation has no messages".into(),
            ));
        }
        Ok(())
    }

    /// The messages in order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether there are no messages.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The latest message.
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// The latest assistant message.
    pub fn last_assistant(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == Role::Assistant)
    }

    /// Look up a tool by name.
    pub fn tool(&self, name: &str) -> Option<&Tool> {
        self.tools.iter().find(|t| t.name == name)
    }

    /// Whether any message carries image or file parts.
    pub fn is_multimodal(&self) -> bool {
        self.messages.iter().any(|m| m.content.is_multimodal())
    }

    /// The tool name of the assistant call with this id.
    pub fn tool_name_for(&self, call_id: &str) -> Option<&str> {
        self.messages
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .flat_map(|m| m.tool_calls.iter())
            .find(|c| c.id == call_id)
            .map(|c| c.name.as_str())
    }
}

/// Per-request generation options.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Options {
    /// The model id; empty means the provider's configured model
    #[serde(default)]
    pub model: CompactString,

    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Nucleus sampling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    /// Maximum completion tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Whether to stream the response
    #[serde(default)]
    pub stream: bool,

    /// Stop sequences
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,

    /// Tool choice; `None` leaves it to the backend default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,

    /// Schema for structured output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,

    /// Backend-specific fields merged into the request body
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extras: Map<String, Value>,
}

impl Options {
    /// Set the temperature.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the max tokens.
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the tool choice.
    pub fn tool_choice(mut self, choice: ToolChoice) -> Self {
        self.tool_choice = Some(choice);
        self
    }

    /// Request schema-constrained output.
    pub fn response_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = Some(format);
        self
    }

    /// Add a backend-specific body field.
    pub fn extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extras.insert(key.into(), value);
        self
    }
}

/// A JSON schema the response must conform to.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ResponseFormat {
    /// Schema name
    pub name: CompactString,

    /// The JSON schema
    pub schema: Value,

    /// Whether the backend should enforce the schema strictly
    #[serde(default)]
    pub strict: bool,
}

impl ResponseFormat {
    /// Create a strict response format.
    pub fn new(name: impl Into<CompactString>, schema: Value) -> Self {
        Self {
            name: name.into(),
            schema,
            strict: true,
        }
    }
}
