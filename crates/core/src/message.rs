//! Conversation messages and multimodal content.

use crate::{Error, Result, ToolCall};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// A message in the conversation.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
pub struct Message {
    /// The role of the message
    pub role: Role,

    /// The content of the message
    #[serde(default)]
    pub content: Content,

    /// Reasoning or thinking text emitted alongside the answer
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reasoning: String,

    /// Tool calls requested by an assistant message
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,

    /// The tool call this tool message answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<CompactString>,

    /// Opaque backend-assigned id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CompactString>,

    /// Whether this tool result reports a failed call
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl Message {
    /// Create a new system message
    pub fn system(content: impl Into<Content>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            ..Default::default()
        }
    }

    /// Create a new user message
    pub fn user(content: impl Into<Content>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            ..Default::default()
        }
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<Content>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            ..Default::default()
        }
    }

    /// Create a new tool result message
    pub fn tool(content: impl Into<String>, call: impl Into<CompactString>) -> Self {
        Self {
            role: Role::Tool,
            content: Content::Text(content.into()),
            tool_call_id: Some(call.into()),
            ..Default::default()
        }
    }

    /// Create a tool result reporting a failed call
    pub fn tool_error(content: impl Into<String>, call: impl Into<CompactString>) -> Self {
        Self {
            is_error: true,
            ..Self::tool(content, call)
        }
    }

    /// Attach tool calls to this message.
    pub fn with_tool_calls(mut self, calls: Vec<ToolCall>) -> Self {
        self.tool_calls = calls;
        self
    }

    /// The concatenated text content.
    pub fn text(&self) -> String {
        self.content.text()
    }

    /// The text of a message that `backend` can only send as a string.
    ///
    /// Fails with [`Error::InvalidConversation`] when any part is an image
    /// or file, instead of dropping it.
    pub fn text_only(&self, backend: &str) -> Result<String> {
        if self.content.is_multimodal() {
            return Err(Error::InvalidConversation(format!(
                "{backend} accepts only text in {} messages",
                self.role.as_str()
            )));
        }
        Ok(self.text())
    }
}

/// The role of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The system role
    System,
    /// The user role
    #[default]
    User,
    /// The assistant role
    Assistant,
    /// The tool role
    Tool,
}

impl Role {
    /// The lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

/// Message content: a bare string or an ordered list of typed parts.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Content {
    /// Plain text.
    Text(String),
    /// Ordered multimodal parts.
    Parts(Vec<Part>),
}

impl Content {
    /// Text parts joined with newlines. Non-text parts are skipped.
    pub fn text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Parts(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    Part::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// Whether there is nothing to send.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.is_empty(),
            Self::Parts(parts) => parts.is_empty(),
        }
    }

    /// Whether any part carries a non-text modality.
    pub fn is_multimodal(&self) -> bool {
        match self {
            Self::Text(_) => false,
            Self::Parts(parts) => parts.iter().any(|p| !matches!(p, Part::Text { .. })),
        }
    }

    /// The text when the content is exactly one text part and nothing else.
    ///
    /// Backends that accept a bare string use this to flatten content;
    /// anything else must be sent as typed blocks.
    pub fn single_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Parts(parts) => match parts.as_slice() {
                [Part::Text { text }] => Some(text),
                _ => None,
            },
        }
    }

    /// The content as a list of parts.
    pub fn parts(&self) -> Vec<Part> {
        match self {
            Self::Text(text) if text.is_empty() => Vec::new(),
            Self::Text(text) => vec![Part::text(text.clone())],
            Self::Parts(parts) => parts.clone(),
        }
    }
}

impl Default for Content {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<Vec<Part>> for Content {
    fn from(parts: Vec<Part>) -> Self {
        Self::Parts(parts)
    }
}

/// A typed content part.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Part {
    /// Text.
    Text {
        /// The text
        text: String,
    },
    /// An image reference.
    Image {
        /// Where the image bytes come from
        source: MediaSource,
    },
    /// A document or other file reference.
    File {
        /// Where the file bytes come from
        source: MediaSource,
        /// Optional file name
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
}

impl Part {
    /// A text part.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// An image referenced by URL.
    pub fn image_url(url: impl Into<String>) -> Self {
        Self::Image {
            source: MediaSource::Url {
                url: url.into(),
                media_type: None,
            },
        }
    }

    /// An inline base64 image.
    pub fn image_base64(media_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self::Image {
            source: MediaSource::Base64 {
                media_type: media_type.into(),
                data: data.into(),
            },
        }
    }

    /// A file part.
    pub fn file(source: MediaSource, name: Option<String>) -> Self {
        Self::File { source, name }
    }
}

/// The bytes behind an image or file part.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MediaSource {
    /// A remote URL.
    Url {
        /// The URL
        url: String,
        /// MIME type, when known
        #[serde(default, skip_serializing_if = "Option::is_none")]
        media_type: Option<String>,
    },
    /// Inline base64 data.
    Base64 {
        /// MIME type
        media_type: String,
        /// Base64 payload
        data: String,
    },
}

impl MediaSource {
    /// The URL, or a `data:` URL for inline bytes.
    pub fn data_url(&self) -> String {
        match self {
            Self::Url { url, .. } => url.clone(),
            Self::Base64 { media_type, data } => format!("data:{media_type};base64,{data}"),
        }
    }

    /// The MIME type, when known.
    pub fn media_type(&self) -> Option<&str> {
        match self {
            Self::Url { media_type, .. } => media_type.as_deref(),
            Self::Base64 { media_type, .. } => Some(media_type),
        }
    }
}
