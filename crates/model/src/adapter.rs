//! The per-backend adapter contract.

use serde_json::Value;
use ucore::{Conversation, Error, MessageBuilder, Response, Result, StreamChunk};

/// How a streamed response body is framed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// Server-sent events (`event:` / `data:` blocks).
    Sse,
    /// One JSON object per line.
    Ndjson,
}

/// A backend request, ready for the transport.
#[derive(Debug, Clone)]
pub struct WireRequest {
    /// Path appended to the provider base URL.
    pub path: String,
    /// Extra query parameters.
    pub query: Vec<(String, String)>,
    /// JSON body.
    pub body: Value,
    /// Whether the response is streamed.
    pub stream: bool,
    /// Framing of the streamed response.
    pub framing: Framing,
}

impl WireRequest {
    /// A POST to `path` with a JSON body.
    pub fn new(path: impl Into<String>, body: Value, stream: bool, framing: Framing) -> Self {
        Self {
            path: path.into(),
            query: Vec::new(),
            body,
            stream,
            framing,
        }
    }

    /// Add a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

/// One decoded stream frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEvent {
    /// SSE event name, if any.
    pub event: Option<String>,
    /// Frame payload.
    pub data: String,
}

impl RawEvent {
    /// A frame with data only.
    pub fn data(data: impl Into<String>) -> Self {
        Self {
            event: None,
            data: data.into(),
        }
    }
}

/// Translator between the canonical model and one backend family's wire
/// format.
///
/// Adapters are stateless: everything a call needs arrives as a parameter,
/// so a single instance serves any number of concurrent conversations.
pub trait Adapter: Send + Sync {
    /// Backend name carried by errors.
    fn name(&self) -> &'static str;

    /// Build the wire request for a conversation.
    fn build_request(&self, conversation: &Conversation, stream: bool) -> Result<WireRequest>;

    /// Parse a complete 2xx response body.
    fn parse_response(&self, body: &str) -> Result<Response>;

    /// Decode one stream frame into canonical chunks.
    ///
    /// The frame that ends the stream yields [`StreamChunk::Done`].
    fn decode_event(&self, event: &RawEvent) -> Result<Vec<StreamChunk>>;

    /// Classify a non-2xx response.
    fn parse_error(&self, status: u16, body: &str) -> Error {
        crate::error::api_error(self.name(), status, body)
    }

    /// Decode a frame and merge it into the in-progress message.
    ///
    /// Returns the content delta carried by the frame and whether the
    /// message is now final.
    fn process_stream_chunk(
        &self,
        event: &RawEvent,
        message: &mut MessageBuilder,
    ) -> Result<(Option<String>, bool)> {
        let mut delta: Option<String> = None;
        for chunk in self.decode_event(event)? {
            if let Some(text) = message.accept(&chunk)? {
                delta.get_or_insert_with(String::new).push_str(text);
            }
        }
        Ok((delta, message.is_complete()))
    }
}

/// Merge provider-specific extras into a request body.
pub(crate) fn merge_extras(body: &mut Value, conversation: &Conversation) {
    if let Value::Object(map) = body {
        for (key, value) in &conversation.options.extras {
            map.insert(key.clone(), value.clone());
        }
    }
}
