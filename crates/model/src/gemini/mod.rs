//! Gemini (Google Generative Language) adapter.
//!
//! Requests go to `models/{model}:generateContent`, or
//! `:streamGenerateContent?alt=sse` when streaming. Every stream frame is
//! a complete `GenerateContentResponse`; the frame whose candidate carries
//! a `finishReason` ends the stream. Function calls arrive whole, without
//! stream indices.

use crate::{Adapter, RawEvent, WireRequest};
use ucore::{Conversation, Response, Result, StopReason, StreamChunk};

mod request;
mod response;

/// The Gemini adapter.
#[derive(Debug, Clone, Copy, Default)]
pub struct Gemini;

impl Adapter for Gemini {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn build_request(&self, conversation: &Conversation, stream: bool) -> Result<WireRequest> {
        request::build(conversation, stream)
    }

    fn parse_response(&self, body: &str) -> Result<Response> {
        response::parse(self.name(), body)
    }

    fn decode_event(&self, event: &RawEvent) -> Result<Vec<StreamChunk>> {
        response::decode(self.name(), event)
    }
}

/// Map a Gemini `finishReason`.
pub(crate) fn stop_reason(reason: &str) -> StopReason {
    match reason {
        "STOP" => StopReason::Stop,
        "MAX_TOKENS" => StopReason::Length,
        "SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII" => {
            StopReason::ContentFilter
        }
        other => StopReason::Other(other.into()),
    }
}
