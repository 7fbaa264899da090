//! Typed failures raised by every layer of the engine.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result alias used across the workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by adapters, the stream merger, and the tool loop.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The backend rejected the request or returned a body that could not
    /// be understood (non-2xx status, HTML error page, malformed JSON).
    #[error("{provider} api error [{category}]: {message}")]
    ProviderApi {
        /// Backend name, e.g. `openai` or `anthropic`.
        provider: CompactString,
        /// HTTP status, when the failure came with one.
        status: Option<u16>,
        /// Normalized error category.
        category: ErrorCategory,
        /// Human readable message extracted from the body.
        message: String,
    },

    /// The backend emitted tool arguments that are not a JSON object.
    #[error("malformed arguments for tool call '{name}' ({id}): {reason}")]
    MalformedToolCall {
        /// Tool call id.
        id: CompactString,
        /// Requested tool name.
        name: CompactString,
        /// Parse failure.
        reason: String,
    },

    /// A tool raised while executing. Recovered by the tool loop as a
    /// tool-result message.
    #[error("tool '{name}' failed: {message}")]
    ToolExecution {
        /// Tool name.
        name: CompactString,
        /// Failure message.
        message: String,
    },

    /// The model kept requesting tools past the configured limit.
    #[error("tool loop exceeded {max} iterations")]
    ToolLoopExceeded {
        /// The configured maximum.
        max: usize,
    },

    /// No adapter is registered under this name.
    #[error("unknown provider '{0}'")]
    UnknownProvider(CompactString),

    /// The caller cancelled the request.
    #[error("request cancelled")]
    Cancelled,

    /// The conversation cannot be sent as-is.
    #[error("invalid conversation: {0}")]
    InvalidConversation(String),

    /// The resolved provider configuration is unusable.
    #[error("invalid provider config: {0}")]
    Config(String),

    /// The network call itself failed.
    #[error("{provider} transport error: {source}")]
    Transport {
        /// Backend name.
        provider: CompactString,
        /// Underlying transport error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// JSON encoding failure.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Build a [`Error::ProviderApi`].
    pub fn api(
        provider: impl Into<CompactString>,
        status: Option<u16>,
        category: ErrorCategory,
        message: impl Into<String>,
    ) -> Self {
        Self::ProviderApi {
            provider: provider.into(),
            status,
            category,
            message: message.into(),
        }
    }

    /// Wrap a transport failure.
    pub fn transport(
        provider: impl Into<CompactString>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Transport {
            provider: provider.into(),
            source: Box::new(source),
        }
    }

    /// The HTTP status carried by a provider error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ProviderApi { status, .. } => *status,
            _ => None,
        }
    }

    /// The category carried by a provider error.
    pub fn category(&self) -> Option<ErrorCategory> {
        match self {
            Self::ProviderApi { category, .. } => Some(*category),
            _ => None,
        }
    }
}

/// Normalized backend error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Missing or invalid credentials.
    Authentication,
    /// Credentials lack access to the resource.
    Permission,
    /// Unknown model or endpoint.
    NotFound,
    /// Too many requests or quota exhausted.
    RateLimit,
    /// The request body was rejected.
    InvalidRequest,
    /// The backend is temporarily overloaded.
    Overloaded,
    /// The backend failed internally.
    Server,
    /// A 2xx body that could not be parsed.
    InvalidResponse,
    /// The stream closed before its terminal marker.
    IncompleteStream,
    /// Anything else.
    Unknown,
}

impl ErrorCategory {
    /// Classify by HTTP status.
    pub fn from_status(status: u16) -> Self {
        match status {
            400 | 413 | 422 => Self::InvalidRequest,
            401 => Self::Authentication,
            403 => Self::Permission,
            404 => Self::NotFound,
            429 => Self::RateLimit,
            503 | 529 => Self::Overloaded,
            500..=599 => Self::Server,
            _ => Self::Unknown,
        }
    }

    /// Classify by a backend error type string such as `rate_limit_error`,
    /// `RESOURCE_EXHAUSTED` or `invalid_request_error`.
    pub fn from_backend(kind: &str) -> Option<Self> {
        let kind = kind.to_ascii_lowercase();
        let category = if kind.contains("auth") || kind.contains("api_key") {
            Self::Authentication
        } else if kind.contains("permission") {
            Self::Permission
        } else if kind.contains("not_found") {
            Self::NotFound
        } else if kind.contains("rate_limit")
            || kind.contains("resource_exhausted")
            || kind.contains("quota")
        {
            Self::RateLimit
        } else if kind.contains("overloaded") || kind.contains("unavailable") {
            Self::Overloaded
        } else if kind.contains("invalid_request") || kind.contains("invalid_argument") {
            Self::InvalidRequest
        } else if kind.contains("server_error") || kind.contains("internal") || kind == "api_error"
        {
            Self::Server
        } else {
            return None;
        };
        Some(category)
    }

    /// Snake-case name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
            Self::Permission => "permission",
            Self::NotFound => "not_found",
            Self::RateLimit => "rate_limit",
            Self::InvalidRequest => "invalid_request",
            Self::Overloaded => "overloaded",
            Self::Server => "server",
            Self::InvalidResponse => "invalid_response",
            Self::IncompleteStream => "incomplete_stream",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
