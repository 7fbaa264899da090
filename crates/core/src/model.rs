//! Model abstractions for the unified LLM interface

use crate::{Conversation, Response, Result, StreamChunk};
use futures_core::Stream;
use serde::{Deserialize, Serialize};

/// A backend able to serve a conversation.
///
/// Implementations are stateless between calls: everything a request needs
/// comes from the conversation, so one instance can serve many
/// conversations concurrently.
pub trait Model: Clone + Send + Sync {
    /// Send the conversation and wait for the complete response.
    fn send(&self, conversation: &Conversation) -> impl Future<Output = Result<Response>> + Send;

    /// Send the conversation and stream the response.
    ///
    /// A well-formed stream ends with [`StreamChunk::Done`].
    fn stream(
        &self,
        conversation: &Conversation,
    ) -> impl Stream<Item = Result<StreamChunk>> + Send;

    /// Backend name used in errors and logs.
    fn name(&self) -> &str;

    /// What this backend supports.
    fn capabilities(&self) -> Capabilities {
        Capabilities::all()
    }
}

/// Feature support of a backend and model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct Capabilities {
    /// Incremental streaming
    pub streaming: bool,
    /// Tool calling
    pub tools: bool,
    /// Schema-constrained output
    pub structured_output: bool,
    /// Image and file input
    pub multimodal: bool,
}

impl Capabilities {
    /// Everything supported.
    pub const fn all() -> Self {
        Self {
            streaming: true,
            tools: true,
            structured_output: true,
            multimodal: true,
        }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::all()
    }
}
