//! Ollama adapter for the native `/api/chat` endpoint.
//!
//! Ollama streams newline-delimited JSON: one chat object per line, the
//! last with `done: true` and the token counts. Tool calls arrive whole.

use crate::{Adapter, RawEvent, WireRequest};
use ucore::{Conversation, Response, Result, StopReason, StreamChunk};

mod request;
mod response;

/// Chat endpoint path.
const PATH: &str = "/api/chat";

/// The Ollama adapter.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ollama;

impl Adapter for Ollama {
    fn name(&self) -> &'static str {
        "ollama"
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

/// Map an Ollama `done_reason`.
pub(crate) fn stop_reason(reason: &str) -> StopReason {
    match reason {
        "stop" => StopReason::Stop,
        "length" => StopReason::Length,
        other => StopReason::Other(other.into()),
    }
}
