//! Responses output blocks and stream events.

use crate::{RawEvent, error};
use compact_str::CompactString;
use serde::Deserialize;
use serde_json::Value;
use ucore::{
    Error, ErrorCategory, Message, Response, Result, StopReason, StreamChunk, ToolCall,
    ToolCallDelta, Usage,
};

#[derive(Deserialize)]
struct WireResponse {
    #[serde(default)]
    id: CompactString,
    #[serde(default)]
    model: CompactString,
    #[serde(default)]
    status: Option<CompactString>,
    #[serde(default)]
    output: Vec<Item>,
    #[serde(default)]
    usage: Option<WireUsage>,
    #[serde(default)]
    incomplete_details: Option<Incomplete>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Item {
    Message {
        #[serde(default)]
        content: Vec<Output>,
    },
    FunctionCall {
        call_id: CompactString,
        name: CompactString,
        #[serde(default)]
        arguments: String,
    },
    Reasoning {
        #[serde(default)]
        summary: Vec<Summary>,
    },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Output {
    OutputText { text: String },
    Refusal { refusal: String },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct Summary {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct Incomplete {
    #[serde(default)]
    reason: Option<CompactString>,
}

#[derive(Deserialize)]
struct WireUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
    #[serde(default)]
    input_tokens_details: Option<InputDetails>,
    #[serde(default)]
    output_tokens_details: Option<OutputDetails>,
}

#[derive(Deserialize)]
struct InputDetails {
    #[serde(default)]
    cached_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct OutputDetails {
    #[serde(default)]
    reasoning_tokens: Option<u32>,
}

impl From<WireUsage> for Usage {
    fn from(usage: WireUsage) -> Self {
        Usage {
            prompt_tokens: usage.input_tokens,
            completion_tokens: usage.output_tokens,
            total_tokens: usage
                .total_tokens
                .max(usage.input_tokens + usage.output_tokens),
            cached_tokens: usage.input_tokens_details.and_then(|d| d.cached_tokens),
            reasoning_tokens: usage.output_tokens_details.and_then(|d| d.reasoning_tokens),
        }
    }
}

impl WireResponse {
    /// The stop reason implied by the response status.
    fn stop_reason(&self, refused: bool) -> Option<StopReason> {
        if refused {
            return Some(StopReason::ContentFilter);
        }
        match self.status.as_deref() {
            Some("completed") => Some(StopReason::Stop),
            Some("incomplete") => {
                let reason = self
                    .incomplete_details
                    .as_ref()
                    .and_then(|d| d.reason.as_deref());
                Some(match reason {
                    Some("max_output_tokens") => StopReason::Length,
                    Some("content_filter") => StopReason::ContentFilter,
                    Some(other) => StopReason::Other(other.into()),
                    None => StopReason::Other("incomplete".into()),
                })
            }
            Some(other) => Some(StopReason::Other(other.into())),
            None => None,
        }
    }
}

/// Parse a complete response body.
pub fn parse(provider: &str, body: &str) -> Result<Response> {
    let (response, raw): (WireResponse, _) = error::decode(provider, body)?;
    if response.status.as_deref() == Some("failed") {
        return Err(error::payload_error(provider, &raw));
    }

    let mut text = Vec::new();
    let mut reasoning = Vec::new();
    let mut calls = Vec::new();
    let mut refused = false;
    for item in &response.output {
        match item {
            Item::Message { content } => {
                for output in content {
                    match output {
                        Output::OutputText { text: t } => text.push(t.as_str()),
                        Output::Refusal { refusal } => {
                            refused = true;
                            text.push(refusal.as_str());
                        }
                        Output::Other => {}
                    }
                }
            }
            Item::FunctionCall {
                call_id,
                name,
                arguments,
            } => calls.push(ToolCall::parse(call_id.clone(), name.clone(), arguments)?),
            Item::Reasoning { summary } => {
                reasoning.extend(summary.iter().map(|s| s.text.as_str()));
            }
            Item::Other => {}
        }
    }

    let mut message = Message::assistant(text.join(""));
    message.reasoning = reasoning.join("\n");
    if !response.id.is_empty() {
        message.id = Some(response.id.clone());
    }
    let stop = StopReason::resolve(response.stop_reason(refused), !calls.is_empty());
    message.tool_calls = calls;

    let usage = response.usage.map(Usage::from).unwrap_or_default();
    Ok(Response::new(message, usage, Some(stop))
        .with_meta(Some(response.id), Some(response.model))
        .with_raw(raw))
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum Event {
    #[serde(rename = "response.created")]
    Created { response: WireResponse },
    #[serde(rename = "response.output_item.added")]
    ItemAdded { output_index: u32, item: Item },
    #[serde(rename = "response.output_text.delta")]
    TextDelta { delta: String },
    #[serde(rename = "response.refusal.delta")]
    RefusalDelta { delta: String },
    #[serde(rename = "response.reasoning_summary_text.delta")]
    ReasoningDelta { delta: String },
    #[serde(rename = "response.function_call_arguments.delta")]
    ArgumentsDelta { output_index: u32, delta: String },
    #[serde(rename = "response.completed")]
    Completed { response: WireResponse },
    #[serde(rename = "response.incomplete")]
    Incomplete { response: WireResponse },
    #[serde(rename = "response.failed")]
    Failed { response: Value },
    #[serde(rename = "error")]
    Error {
        #[serde(default)]
        code: Option<String>,
        #[serde(default)]
        message: String,
    },
    #[serde(other)]
    Other,
}

/// Decode one SSE frame.
pub fn decode(provider: &str, event: &RawEvent) -> Result<Vec<StreamChunk>> {
    let data = event.data.trim();
    if data.is_empty() || data == "[DONE]" {
        return Ok(Vec::new());
    }

    let chunks = match error::event::<Event>(provider, data)? {
        Event::Created { response } => vec![StreamChunk::Meta {
            id: response.id,
            model: response.model,
        }],
        Event::ItemAdded {
            output_index,
            item: Item::FunctionCall {
                call_id,
                name,
                arguments,
            },
        } => vec![StreamChunk::ToolCall(ToolCallDelta {
            index: Some(output_index),
            id: Some(call_id),
            name: Some(name),
            arguments,
        })],
        Event::ItemAdded { .. } => Vec::new(),
        Event::TextDelta { delta } | Event::RefusalDelta { delta } => {
            vec![StreamChunk::Content(delta)]
        }
        Event::ReasoningDelta { delta } => vec![StreamChunk::Reasoning(delta)],
        Event::ArgumentsDelta {
            output_index,
            delta,
        } => vec![StreamChunk::ToolCall(ToolCallDelta::arguments(
            output_index,
            delta,
        ))],
        Event::Completed { response } | Event::Incomplete { response } => {
            let mut chunks = Vec::new();
            if let Some(stop) = response.stop_reason(false) {
                chunks.push(StreamChunk::Stop(stop));
            }
            if let Some(usage) = response.usage {
                chunks.push(StreamChunk::Usage(usage.into()));
            }
            chunks.push(StreamChunk::Done);
            chunks
        }
        Event::Failed { response } => return Err(error::payload_error(provider, &response)),
        Event::Error { code, message } => {
            let category = code
                .as_deref()
                .and_then(ErrorCategory::from_backend)
                .unwrap_or(ErrorCategory::Unknown);
            return Err(Error::api(provider, None, category, message));
        }
        Event::Other => Vec::new(),
    };
    Ok(chunks)
}
