//! `/api/chat` response objects.

use crate::{RawEvent, error};
use compact_str::CompactString;
use serde::Deserialize;
use serde_json::Value;
use ucore::{Message, Response, Result, StopReason, StreamChunk, ToolCall, ToolCallDelta, Usage};

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: CompactString,
    #[serde(default)]
    message: Option<WireMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    done_reason: Option<CompactString>,
    #[serde(default)]
    prompt_eval_count: u32,
    #[serde(default)]
    eval_count: u32,
}

#[derive(Deserialize, Default)]
struct WireMessage {
    #[serde(default)]
    content: String,
    #[serde(default)]
    thinking: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireCall>>,
}

#[derive(Deserialize)]
struct WireCall {
    function: WireFunction,
}

#[derive(Deserialize)]
struct WireFunction {
    name: CompactString,
    #[serde(default)]
    arguments: Value,
}

impl ChatResponse {
    fn usage(&self) -> Usage {
        Usage::new(self.prompt_eval_count, self.eval_count)
    }

    fn stop(&self) -> Option<StopReason> {
        self.done_reason
            .as_deref()
            .filter(|r| !r.is_empty())
            .map(super::stop_reason)
    }
}

/// Arguments are a JSON object on the wire, not an encoded string.
fn arguments_text(arguments: Value) -> String {
    match arguments {
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Parse a complete (non-streamed) response.
pub fn parse(provider: &str, body: &str) -> Result<Response> {
    let (chat, raw): (ChatResponse, _) = error::decode(provider, body)?;
    let usage = chat.usage();
    let stop = chat.stop();
    let wire = chat.message.unwrap_or_default();

    let tool_calls = wire
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|call| {
            ToolCall::parse(
                "",
                call.function.name,
                &arguments_text(call.function.arguments),
            )
        })
        .collect::<Result<Vec<_>>>()?;

    let stop = StopReason::resolve(stop, !tool_calls.is_empty());
    let mut message = Message::assistant(wire.content).with_tool_calls(tool_calls);
    message.reasoning = wire.thinking.unwrap_or_default();
    Ok(Response::new(message, usage, Some(stop))
        .with_meta(None, Some(chat.model))
        .with_raw(raw))
}

/// Decode one NDJSON line.
pub fn decode(provider: &str, event: &RawEvent) -> Result<Vec<StreamChunk>> {
    let data = event.data.trim();
    if data.is_empty() {
        return Ok(Vec::new());
    }

    let chat: ChatResponse = error::event(provider, data)?;
    let mut chunks = Vec::new();
    if chat.done {
        chunks.push(StreamChunk::Meta {
            id: CompactString::default(),
            model: chat.model.clone(),
        });
    }

    let usage = chat.usage();
    let stop = chat.stop();
    let done = chat.done;
    if let Some(wire) = chat.message {
        if let Some(thinking) = wire.thinking.filter(|t| !t.is_empty()) {
            chunks.push(StreamChunk::Reasoning(thinking));
        }
        if !wire.content.is_empty() {
            chunks.push(StreamChunk::Content(wire.content));
        }
        for call in wire.tool_calls.unwrap_or_default() {
            chunks.push(StreamChunk::ToolCall(ToolCallDelta {
                index: None,
                id: None,
                name: Some(call.function.name),
                arguments: arguments_text(call.function.arguments),
            }));
        }
    }

    if done {
        chunks.push(StreamChunk::Usage(usage));
        chunks.push(StreamChunk::Stop(stop.unwrap_or(StopReason::Stop)));
        chunks.push(StreamChunk::Done);
    }
    Ok(chunks)
}
