//! Streaming response abstractions for the unified LLM interface

use crate::{StopReason, Usage};
use compact_str::CompactString;

/// A partial fragment of an in-progress assistant message.
///
/// Adapters decode backend events into these; the
/// [`MessageBuilder`](crate::MessageBuilder) folds them into a message.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamChunk {
    /// Backend message id and model.
    Meta {
        /// Backend message id
        id: CompactString,
        /// Model serving the stream
        model: CompactString,
    },
    /// A text content delta.
    Content(String),
    /// A reasoning/thinking delta.
    Reasoning(String),
    /// A partial or complete tool call.
    ToolCall(ToolCallDelta),
    /// A (possibly partial) usage report.
    Usage(Usage),
    /// The reason generation stopped. Does not end the stream.
    Stop(StopReason),
    /// The terminal marker.
    Done,
}

impl StreamChunk {
    /// The content delta, if any.
    pub fn content(&self) -> Option<&str> {
        match self {
            Self::Content(text) if !text.is_empty() => Some(text),
            _ => None,
        }
    }
}

/// An incremental tool call fragment.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ToolCallDelta {
    /// Stream-assigned index of the call
    pub index: Option<u32>,

    /// The call id, usually only on the first fragment
    pub id: Option<CompactString>,

    /// The tool name, usually only on the first fragment
    pub name: Option<CompactString>,

    /// A fragment of the JSON argument string
    pub arguments: String,
}

impl ToolCallDelta {
    /// The opening fragment of a call.
    pub fn start(index: u32, id: impl Into<CompactString>, name: impl Into<CompactString>) -> Self {
        Self {
            index: Some(index),
            id: Some(id.into()),
            name: Some(name.into()),
            arguments: String::new(),
        }
    }

    /// An argument fragment for the call at `index`.
    pub fn arguments(index: u32, arguments: impl Into<String>) -> Self {
        Self {
            index: Some(index),
            arguments: arguments.into(),
            ..Default::default()
        }
    }
}
