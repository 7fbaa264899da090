//! Canonical model for the unified LLM interface.
//!
//! Provides the backend-agnostic shapes every provider reads and writes:
//! [`Conversation`], [`Message`], [`ToolCall`], [`Response`] and
//! [`StreamChunk`], the [`MessageBuilder`] stream merger, the typed
//! [`Error`] surface, and the [`Model`] trait implemented by providers.

pub use builder::MessageBuilder;
pub use conversation::{Conversation, Options, ResponseFormat};
pub use error::{Error, ErrorCategory, Result};
pub use message::{Content, MediaSource, Message, Part, Role};
pub use model::{Capabilities, Model};
pub use response::{Response, StopReason, Usage};
pub use stream::{StreamChunk, ToolCallDelta};
pub use tool::{Tool, ToolCall, ToolChoice};

mod builder;
mod conversation;
mod error;
mod message;
mod model;
mod response;
mod stream;
mod tool;
