//! Claude (Anthropic) adapter.
//!
//! Implements the Anthropic Messages API, which differs from the OpenAI
//! chat completions format in message structure and streaming events:
//! the system prompt is top-level, tool calls and results are content
//! blocks, and `max_tokens` is mandatory.

use crate::{Adapter, RawEvent, WireRequest};
use ucore::{Conversation, Response, Result, StopReason, StreamChunk};

mod request;
mod response;
mod stream;

/// The Messages API path.
pub const PATH: &str = "/messages";

/// The Anthropic API version header value.
pub const API_VERSION: &str = "2023-06-01";

/// Default completion budget; the API has no default of its own.
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// The Claude adapter.
#[derive(Debug, Clone, Copy, Default)]
pub struct Claude;

impl Adapter for Claude {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    fn build_request(&self, conversation: &Conversation, stream: bool) -> Result<WireRequest> {
        request::build(conversation, stream)
    }

    fn parse_response(&self, body: &str) -> Result<Response> {
        response::parse(self.name(), body)
    }

    fn decode_event(&self, event: &RawEvent) -> Result<Vec<StreamChunk>> {
        stream::decode(self.name(), event)
    }
}

/// Map an Anthropic `stop_reason`.
pub(crate) fn stop_reason(reason: &str) -> StopReason {
    match reason {
        "end_turn" | "stop_sequence" | "stop" => StopReason::Stop,
        "max_tokens" => StopReason::Length,
        "tool_use" => StopReason::ToolCalls,
        "refusal" => StopReason::ContentFilter,
        other => StopReason::Other(other.into()),
    }
}
