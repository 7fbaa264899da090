//! Normalized generation results.

use crate::{Message, ToolCall};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The terminal message of a request plus its metadata.
///
/// Immutable once constructed: fields are read through accessors.
#[derive(Debug, Clone)]
pub struct Response {
    message: Message,
    usage: Usage,
    stop_reason: Option<StopReason>,
    id: Option<CompactString>,
    model: Option<CompactString>,
    raw: Value,
}

impl Response {
    /// Create a response for a finalized message.
    pub fn new(message: Message, usage: Usage, stop_reason: Option<StopReason>) -> Self {
        Self {
            message,
            usage,
            stop_reason,
            id: None,
            model: None,
            raw: Value::Null,
        }
    }

    /// Attach the backend response id and model.
    pub fn with_meta(mut self, id: Option<CompactString>, model: Option<CompactString>) -> Self {
        self.id = id;
        self.model = model;
        self
    }

    /// Attach the raw backend payload.
    pub fn with_raw(mut self, raw: Value) -> Self {
        self.raw = raw;
        self
    }

    /// The terminal message.
    pub fn message(&self) -> &Message {
        &self.message
    }

    /// Consume the response, returning the message.
    pub fn into_message(self) -> Message {
        self.message
    }

    /// The text content of the terminal message.
    pub fn content(&self) -> String {
        self.message.text()
    }

    /// Tool calls requested by the terminal message.
    pub fn tool_calls(&self) -> &[ToolCall] {
        &self.message.tool_calls
    }

    /// Token usage.
    pub fn usage(&self) -> &Usage {
        &self.usage
    }

    /// Why the model stopped generating.
    pub fn stop_reason(&self) -> Option<&StopReason> {
        self.stop_reason.as_ref()
    }

    /// Backend response id.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Model that served the request.
    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    /// Raw backend payload, `Null` for streamed responses.
    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

/// The reason the model stopped generating
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The model finished naturally
    Stop,

    /// The model hit the max token limit
    Length,

    /// The model is requesting tool calls
    ToolCalls,

    /// Content was filtered
    ContentFilter,

    /// A backend-specific reason
    Other(CompactString),
}

impl StopReason {
    /// Reconcile a reported reason with the tool calls actually present.
    ///
    /// Some backends report a plain stop (or nothing) alongside tool calls.
    pub fn resolve(reported: Option<StopReason>, has_tool_calls: bool) -> StopReason {
        match reported {
            None | Some(StopReason::Stop) if has_tool_calls => StopReason::ToolCalls,
            None => StopReason::Stop,
            Some(reason) => reason,
        }
    }
}

/// Token usage statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct Usage {
    /// Number of tokens in the prompt
    pub prompt_tokens: u32,

    /// Number of tokens in the completion
    pub completion_tokens: u32,

    /// Total number of tokens used
    pub total_tokens: u32,

    /// Prompt tokens served from cache
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_tokens: Option<u32>,

    /// Completion tokens spent on reasoning
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_tokens: Option<u32>,
}

impl Usage {
    /// Usage from prompt and completion counts.
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
            cached_tokens: None,
            reasoning_tokens: None,
        }
    }

    /// Fold a partial usage report into this one.
    ///
    /// Streams report usage in pieces (prompt tokens up front, completion
    /// tokens at the end); non-zero fields of `other` win.
    pub fn merge(&mut self, other: &Usage) {
        if other.prompt_tokens > 0 {
            self.prompt_tokens = other.prompt_tokens;
        }
        if other.completion_tokens > 0 {
            self.completion_tokens = other.completion_tokens;
        }
        if other.cached_tokens.is_some() {
            self.cached_tokens = other.cached_tokens;
        }
        if other.reasoning_tokens.is_some() {
            self.reasoning_tokens = other.reasoning_tokens;
        }
        self.total_tokens = other
            .total_tokens
            .max(self.prompt_tokens + self.completion_tokens);
    }
}
