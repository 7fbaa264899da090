//! Non-streaming Messages API responses.

use crate::error;
use compact_str::CompactString;
use serde::Deserialize;
use serde_json::Value;
use ucore::{Message, Response, Result, StopReason, ToolCall, Usage};

/// Raw Anthropic non-streaming response.
#[derive(Deserialize)]
struct AnthropicResponse {
    id: CompactString,
    model: CompactString,
    content: Vec<ContentBlock>,
    stop_reason: Option<CompactString>,
    usage: AnthropicUsage,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "thinking")]
    Thinking {
        #[serde(default)]
        thinking: String,
    },
    #[serde(rename = "tool_use")]
    ToolUse {
        id: CompactString,
        name: CompactString,
        input: Value,
    },
    #[serde(other)]
    Other,
}

/// Token counts shared by responses and stream events.
#[derive(Deserialize, Default)]
pub(super) struct AnthropicUsage {
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
    #[serde(default)]
    pub cache_read_input_tokens: Option<u32>,
}

impl From<AnthropicUsage> for Usage {
    fn from(usage: AnthropicUsage) -> Self {
        Usage {
            cached_tokens: usage.cache_read_input_tokens,
            ..Usage::new(usage.input_tokens, usage.output_tokens)
        }
    }
}

/// Convert an Anthropic response to the canonical `Response`.
pub fn parse(provider: &str, body: &str) -> Result<Response> {
    let (raw, value): (AnthropicResponse, _) = error::decode(provider, body)?;

    let mut content = String::new();
    let mut reasoning = String::new();
    let mut tool_calls = Vec::new();
    for block in raw.content {
        match block {
            ContentBlock::Text { text } => {
                if !content.is_empty() {
                    content.push('\n');
                }
                content.push_str(&text);
            }
            ContentBlock::Thinking { thinking } => reasoning.push_str(&thinking),
            ContentBlock::ToolUse { id, name, input } => tool_calls.push(match input {
                Value::Object(_) => ToolCall::new(id, name, input),
                Value::Null => ToolCall::new(id, name, Value::Object(Default::default())),
                other => ToolCall::parse(id, name, &other.to_string())?,
            }),
            ContentBlock::Other => {}
        }
    }

    let stop = StopReason::resolve(
        raw.stop_reason.as_deref().map(super::stop_reason),
        !tool_calls.is_empty(),
    );
    let mut message = Message::assistant(content).with_tool_calls(tool_calls);
    message.reasoning = reasoning;
    message.id = Some(raw.id.clone());

    Ok(Response::new(message, raw.usage.into(), Some(stop))
        .with_meta(Some(raw.id), Some(raw.model))
        .with_raw(value))
}
