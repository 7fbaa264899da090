//! Chat completions responses and stream chunks.

use crate::{RawEvent, error};
use compact_str::CompactString;
use serde::Deserialize;
use ucore::{Message, Response, Result, StopReason, StreamChunk, ToolCall, ToolCallDelta, Usage};

/// A complete chat completion.
#[derive(Deserialize)]
struct Completion {
    #[serde(default)]
    id: CompactString,
    #[serde(default)]
    model: CompactString,
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct Choice {
    #[serde(default, alias = "delta")]
    message: Delta,
    #[serde(default)]
    finish_reason: Option<CompactString>,
}

/// A message or a streamed delta; both share the same fields.
#[derive(Deserialize, Default)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default, alias = "reasoning")]
    reasoning_content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireCall>>,
}

#[derive(Deserialize)]
struct WireCall {
    #[serde(default)]
    index: Option<u32>,
    #[serde(default)]
    id: Option<CompactString>,
    #[serde(default)]
    function: WireFunction,
}

#[derive(Deserialize, Default)]
struct WireFunction {
    #[serde(default)]
    name: Option<CompactString>,
    #[serde(default)]
    arguments: Option<String>,
}

#[derive(Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
    #[serde(default)]
    prompt_tokens_details: Option<PromptDetails>,
    #[serde(default)]
    completion_tokens_details: Option<CompletionDetails>,
}

#[derive(Deserialize)]
struct PromptDetails {
    #[serde(default)]
    cached_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct CompletionDetails {
    #[serde(default)]
    reasoning_tokens: Option<u32>,
}

impl From<WireUsage> for Usage {
    fn from(usage: WireUsage) -> Self {
        Usage {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage
                .total_tokens
                .max(usage.prompt_tokens + usage.completion_tokens),
            cached_tokens: usage.prompt_tokens_details.and_then(|d| d.cached_tokens),
            reasoning_tokens: usage
                .completion_tokens_details
                .and_then(|d| d.reasoning_tokens),
        }
    }
}

/// Parse a complete response body.
pub fn parse(provider: &str, body: &str) -> Result<Response> {
    let (completion, raw): (Completion, _) = error::decode(provider, body)?;
    let choice = completion.choices.into_iter().next();

    let mut message = Message::assistant("");
    let mut stop = None;
    if let Some(choice) = choice {
        let delta = choice.message;
        message.content = delta.content.unwrap_or_default().into();
        message.reasoning = delta.reasoning_content.unwrap_or_default();
        message.tool_calls = delta
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| {
                ToolCall::parse(
                    call.id.unwrap_or_default(),
                    call.function.name.unwrap_or_default(),
                    call.function.arguments.as_deref().unwrap_or_default(),
                )
            })
            .collect::<Result<Vec<_>>>()?;
        stop = choice
            .finish_reason
            .as_deref()
            .filter(|r| !r.is_empty())
            .map(super::stop_reason);
    }
    if !completion.id.is_empty() {
        message.id = Some(completion.id.clone());
    }

    let stop = StopReason::resolve(stop, !message.tool_calls.is_empty());
    let usage = completion.usage.map(Usage::from).unwrap_or_default();
    Ok(Response::new(message, usage, Some(stop))
        .with_meta(Some(completion.id), Some(completion.model))
        .with_raw(raw))
}

/// Decode one SSE frame.
pub fn decode(provider: &str, event: &RawEvent) -> Result<Vec<StreamChunk>> {
    let data = event.data.trim();
    if data == "[DONE]" {
        return Ok(vec![StreamChunk::Done]);
    }
    if data.is_empty() {
        return Ok(Vec::new());
    }

    let completion: Completion = error::event(provider, data)?;
    let mut chunks = Vec::new();
    if !completion.id.is_empty() || !completion.model.is_empty() {
        chunks.push(StreamChunk::Meta {
            id: completion.id,
            model: completion.model,
        });
    }

    if let Some(choice) = completion.choices.into_iter().next() {
        let delta = choice.message;
        if let Some(reasoning) = delta.reasoning_content.filter(|s| !s.is_empty()) {
            chunks.push(StreamChunk::Reasoning(reasoning));
        }
        if let Some(content) = delta.content.filter(|s| !s.is_empty()) {
            chunks.push(StreamChunk::Content(content));
        }
        for call in delta.tool_calls.unwrap_or_default() {
            chunks.push(StreamChunk::ToolCall(ToolCallDelta {
                index: call.index,
                id: call.id,
                name: call.function.name,
                arguments: call.function.arguments.unwrap_or_default(),
            }));
        }
        if let Some(reason) = choice.finish_reason.filter(|r| !r.is_empty()) {
            chunks.push(StreamChunk::Stop(super::stop_reason(&reason)));
        }
    }

    if let Some(usage) = completion.usage {
        chunks.push(StreamChunk::Usage(usage.into()));
    }
    Ok(chunks)
}
