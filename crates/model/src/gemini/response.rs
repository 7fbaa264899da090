//! `GenerateContentResponse` parsing, shared by complete bodies and
//! stream frames.

use crate::{RawEvent, error};
use compact_str::CompactString;
use serde::Deserialize;
use serde_json::Value;
use ucore::{Message, Response, Result, StopReason, StreamChunk, ToolCall, ToolCallDelta, Usage};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    model_version: Option<CompactString>,
    #[serde(default)]
    response_id: Option<CompactString>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<CompactString>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<WirePart>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    thought: bool,
    #[serde(default)]
    function_call: Option<FunctionCall>,
}

#[derive(Deserialize)]
struct FunctionCall {
    #[serde(default)]
    id: Option<CompactString>,
    name: CompactString,
    #[serde(default)]
    args: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
    #[serde(default)]
    cached_content_token_count: Option<u32>,
    #[serde(default)]
    thoughts_token_count: Option<u32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<CompactString>,
}

impl From<UsageMetadata> for Usage {
    fn from(usage: UsageMetadata) -> Self {
        // Thought tokens are billed as output but not counted in candidates.
        let completion = usage.candidates_token_count + usage.thoughts_token_count.unwrap_or(0);
        Usage {
            total_tokens: usage
                .total_token_count
                .max(usage.prompt_token_count + completion),
            cached_tokens: usage.cached_content_token_count,
            reasoning_tokens: usage.thoughts_token_count,
            ..Usage::new(usage.prompt_token_count, completion)
        }
    }
}

impl GenerateResponse {
    /// The stop reason reported by the first candidate, or a content
    /// filter stop when the prompt itself was blocked.
    fn stop_reason(&self) -> Option<StopReason> {
        let reported = self
            .candidates
            .first()
            .and_then(|c| c.finish_reason.as_deref())
            .filter(|r| !r.is_empty() && *r != "FINISH_REASON_UNSPECIFIED")
            .map(super::stop_reason);
        let blocked = self
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_ref())
            .map(|_| StopReason::ContentFilter);
        reported.or(blocked)
    }

    fn take_usage(&mut self) -> Usage {
        self.usage_metadata
            .take()
            .map(Usage::from)
            .unwrap_or_default()
    }

    fn into_parts(self) -> Vec<WirePart> {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts)
            .unwrap_or_default()
    }
}

/// Function call arguments as an object. Gemini omits `args` for calls
/// without parameters.
fn arguments(id: CompactString, name: CompactString, args: Value) -> Result<ToolCall> {
    match args {
        Value::Object(_) => Ok(ToolCall::new(id, name, args)),
        Value::Null => Ok(ToolCall::new(id, name, Value::Object(Default::default()))),
        other => ToolCall::parse(id, name, &other.to_string()),
    }
}

/// Parse a complete response body.
pub fn parse(provider: &str, body: &str) -> Result<Response> {
    let (mut response, raw): (GenerateResponse, _) = error::decode(provider, body)?;
    let stop = response.stop_reason();
    let id = response.response_id.clone();
    let model = response.model_version.clone();
    let usage = response.take_usage();

    let mut content = String::new();
    let mut reasoning = String::new();
    let mut tool_calls = Vec::new();
    for part in response.into_parts() {
        if let Some(call) = part.function_call {
            tool_calls.push(arguments(
                call.id.unwrap_or_default(),
                call.name,
                call.args,
            )?);
        } else if let Some(text) = part.text {
            if part.thought {
                reasoning.push_str(&text);
            } else {
                content.push_str(&text);
            }
        }
    }

    let stop = StopReason::resolve(stop, !tool_calls.is_empty());
    let mut message = Message::assistant(content).with_tool_calls(tool_calls);
    message.reasoning = reasoning;
    message.id = id.clone();
    Ok(Response::new(message, usage, Some(stop))
        .with_meta(id, model)
        .with_raw(raw))
}

/// Decode one SSE frame. The frame carrying a finish reason ends the
/// stream.
pub fn decode(provider: &str, event: &RawEvent) -> Result<Vec<StreamChunk>> {
    let data = event.data.trim();
    if data.is_empty() {
        return Ok(Vec::new());
    }

    let mut response: GenerateResponse = error::event(provider, data)?;
    let mut chunks = Vec::new();
    if response.response_id.is_some() || response.model_version.is_some() {
        chunks.push(StreamChunk::Meta {
            id: response.response_id.clone().unwrap_or_default(),
            model: response.model_version.clone().unwrap_or_default(),
        });
    }

    let stop = response.stop_reason();
    let usage = response.take_usage();
    let has_usage = usage != Usage::default();
    for part in response.into_parts() {
        if let Some(call) = part.function_call {
            let args = match call.args {
                Value::Null => String::new(),
                other => other.to_string(),
            };
            chunks.push(StreamChunk::ToolCall(ToolCallDelta {
                index: None,
                id: call.id,
                name: Some(call.name),
                arguments: args,
            }));
        } else if let Some(text) = part.text.filter(|t| !t.is_empty()) {
            chunks.push(if part.thought {
                StreamChunk::Reasoning(text)
            } else {
                StreamChunk::Content(text)
            });
        }
    }

    if has_usage {
        chunks.push(StreamChunk::Usage(usage));
    }
    if let Some(stop) = stop {
        chunks.push(StreamChunk::Stop(stop));
        chunks.push(StreamChunk::Done);
    }
    Ok(chunks)
}
