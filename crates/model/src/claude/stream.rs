//! SSE event parsing for the Anthropic streaming Messages API.
//!
//! Anthropic streaming events differ from OpenAI's format:
//! - `message_start`: initial message metadata
//! - `content_block_start`: begin a content block (text, thinking or tool_use)
//! - `content_block_delta`: incremental content (text, thinking or input json)
//! - `content_block_stop`: end of a content block
//! - `message_delta`: final stop_reason and usage
//! - `message_stop`: end of message

use super::response::AnthropicUsage;
use crate::{RawEvent, error};
use compact_str::CompactString;
use serde::Deserialize;
use serde_json::Value;
use ucore::{Result, StreamChunk, ToolCallDelta, Usage};

/// A raw SSE event from the Anthropic streaming API.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum Event {
    /// Initial message metadata.
    #[serde(rename = "message_start")]
    MessageStart { message: MessageMeta },
    /// Begin a content block.
    #[serde(rename = "content_block_start")]
    ContentBlockStart {
        index: u32,
        content_block: ContentBlock,
    },
    /// Incremental content within a block.
    #[serde(rename = "content_block_delta")]
    ContentBlockDelta { index: u32, delta: BlockDelta },
    /// End of a content block.
    #[serde(rename = "content_block_stop")]
    ContentBlockStop {},
    /// Final message delta (stop reason + usage).
    #[serde(rename = "message_delta")]
    MessageDelta {
        delta: MessageDeltaBody,
        #[serde(default)]
        usage: Option<MessageDeltaUsage>,
    },
    /// End of message.
    #[serde(rename = "message_stop")]
    MessageStop,
    /// Ping (keep-alive).
    #[serde(rename = "ping")]
    Ping,
    /// Catch-all for unknown event types.
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct MessageMeta {
    id: CompactString,
    model: CompactString,
    #[serde(default)]
    usage: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text {
        #[serde(default)]
        text: String,
    },
    #[serde(rename = "tool_use")]
    ToolUse { id: CompactString, name: CompactString },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum BlockDelta {
    #[serde(rename = "text_delta")]
    TextDelta { text: String },
    #[serde(rename = "input_json_delta")]
    InputJsonDelta { partial_json: String },
    #[serde(rename = "thinking_delta")]
    ThinkingDelta { thinking: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct MessageDeltaBody {
    stop_reason: Option<CompactString>,
}

#[derive(Debug, Deserialize)]
struct MessageDeltaUsage {
    output_tokens: u32,
}

impl Event {
    /// Convert this Anthropic event to canonical chunks.
    ///
    /// Ping, block stop and unknown events produce nothing.
    fn into_chunks(self) -> Vec<StreamChunk> {
        match self {
            Self::MessageStart { message } => {
                let mut chunks = vec![StreamChunk::Meta {
                    id: message.id,
                    model: message.model,
                }];
                let usage = message
                    .usage
                    .and_then(|u| serde_json::from_value::<AnthropicUsage>(u).ok());
                if let Some(usage) = usage {
                    chunks.push(StreamChunk::Usage(usage.into()));
                }
                chunks
            }
            Self::ContentBlockStart {
                content_block: ContentBlock::Text { text },
                ..
            } => {
                if text.is_empty() {
                    Vec::new()
                } else {
                    vec![StreamChunk::Content(text)]
                }
            }
            Self::ContentBlockStart {
                index,
                content_block: ContentBlock::ToolUse { id, name },
            } => vec![StreamChunk::ToolCall(ToolCallDelta::start(index, id, name))],
            Self::ContentBlockDelta {
                delta: BlockDelta::TextDelta { text },
                ..
            } => vec![StreamChunk::Content(text)],
            Self::ContentBlockDelta {
                index,
                delta: BlockDelta::InputJsonDelta { partial_json },
            } => vec![StreamChunk::ToolCall(ToolCallDelta::arguments(
                index,
                partial_json,
            ))],
            Self::ContentBlockDelta {
                delta: BlockDelta::ThinkingDelta { thinking },
                ..
            } => vec![StreamChunk::Reasoning(thinking)],
            Self::MessageDelta { delta, usage } => {
                let mut chunks = Vec::new();
                if let Some(reason) = delta.stop_reason.as_deref() {
                    chunks.push(StreamChunk::Stop(super::stop_reason(reason)));
                }
                if let Some(usage) = usage {
                    chunks.push(StreamChunk::Usage(Usage::new(0, usage.output_tokens)));
                }
                chunks
            }
            Self::MessageStop => vec![StreamChunk::Done],
            Self::ContentBlockStart { .. }
            | Self::ContentBlockDelta { .. }
            | Self::ContentBlockStop {}
            | Self::Ping
            | Self::Unknown => Vec::new(),
        }
    }
}

/// Decode one SSE frame.
///
/// `error` events carry an `error` object and fail the stream.
pub fn decode(provider: &str, event: &RawEvent) -> Result<Vec<StreamChunk>> {
    let data = event.data.trim();
    if data.is_empty() || data == "[DONE]" {
        return Ok(Vec::new());
    }
    match error::event::<Event>(provider, data) {
        Ok(event) => Ok(event.into_chunks()),
        Err(e) => {
            tracing::error!("anthropic stream event failed: {e}");
            Err(e)
        }
    }
}
