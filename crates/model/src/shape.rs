//! Request shape routing for backends with two endpoints.

use ucore::Conversation;

/// The request shape a conversation needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Plain chat completions.
    Chat,
    /// The richer multimodal / structured-output endpoint.
    Responses,
}

impl Shape {
    /// Pick the shape from the conversation contents alone.
    ///
    /// Image or file parts, or a requested output schema, need the richer
    /// shape; everything else goes to chat completions.
    pub fn of(conversation: &Conversation) -> Self {
        if conversation.is_multimodal() || conversation.options.response_format.is_some() {
            Self::Responses
        } else {
            Self::Chat
        }
    }
}
