//! OpenAI chat completions adapter.
//!
//! Covers OpenAI itself and every backend speaking the same protocol
//! (Azure OpenAI, DeepSeek, Grok, Mistral, Groq, OpenRouter, local
//! gateways). Streaming chunks are SSE `data:` lines whose
//! `choices[0].delta` carries content and `tool_calls` fragments keyed by
//! `index`; `data: [DONE]` ends the stream.

use crate::{Adapter, RawEvent, WireRequest};
use ucore::{Conversation, Response, Result, StopReason, StreamChunk};

mod request;
mod response;

/// The chat completions path.
pub const PATH: &str = "/chat/completions";

/// The chat completions adapter.
#[derive(Debug, Clone, Copy)]
pub struct Chat {
    provider: &'static str,
}

impl Chat {
    /// An adapter reporting errors as `provider`.
    pub const fn new(provider: &'static str) -> Self {
        Self { provider }
    }
}

impl Default for Chat {
    fn default() -> Self {
        Self::new("openai")
    }
}

impl Adapter for Chat {
    fn name(&self) -> &'static str {
        self.provider
    }

    fn build_request(&self, conversation: &Conversation, stream: bool) -> Result<WireRequest> {
        request::build(self.provider, conversation, stream)
    }

    fn parse_response(&self, body: &str) -> Result<Response> {
        response::parse(self.provider, body)
    }

    fn decode_event(&self, event: &RawEvent) -> Result<Vec<StreamChunk>> {
        response::decode(self.provider, event)
    }
}

/// Map a `finish_reason`.
pub(crate) fn stop_reason(reason: &str) -> StopReason {
    match reason {
        "stop" => StopReason::Stop,
        "length" => StopReason::Length,
        "tool_calls" | "function_call" => StopReason::ToolCalls,
        "content_filter" => StopReason::ContentFilter,
        other => StopReason::Other(other.into()),
    }
}
