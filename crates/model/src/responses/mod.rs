//! OpenAI responses adapter.
//!
//! The richer OpenAI endpoint: requests carry an `input` array of typed
//! items, responses carry a top-level `output` array of typed blocks
//! (`message`, `function_call`, `reasoning`) instead of choices, and the
//! stream is a sequence of named events ending with `response.completed`.

use crate::{Adapter, RawEvent, WireRequest};
use ucore::{Conversation, Response, Result, StreamChunk};

mod request;
mod response;

/// The responses path.
pub const PATH: &str = "/responses";

/// The responses adapter.
#[derive(Debug, Clone, Copy)]
pub struct Responses {
    provider: &'static str,
}

impl Responses {
    /// An adapter reporting errors as `provider`.
    pub const fn new(provider: &'static str) -> Self {
        Self { provider }
    }
}

impl Default for Responses {
    fn default() -> Self {
        Self::new("openai")
    }
}

impl Adapter for Responses {
    fn name(&self) -> &'static str {
        self.provider
    }

    fn build_request(&self, conversation: &Conversation, stream: bool) -> Result<WireRequest> {
        request::build(conversation, stream)
    }

    fn parse_response(&self, body: &str) -> Result<Response> {
        response::parse(self.provider, body)
    }

    fn decode_event(&self, event: &RawEvent) -> Result<Vec<StreamChunk>> {
        response::decode(self.provider, event)
    }
}
