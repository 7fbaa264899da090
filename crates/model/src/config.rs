//! Provider configuration and the table of known backends.

use crate::Auth;
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ucore::{Capabilities, Error, Result};

/// Default Azure OpenAI `api-version`.
const AZURE_API_VERSION: &str = "2024-10-21";

/// Resolved configuration for one backend.
///
/// Values arrive already resolved (keys expanded, files read); nothing
/// here touches the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Symbolic backend name, e.g. `openai`, `anthropic`, `ollama`.
    pub provider: CompactString,
    /// Model identifier.
    pub model: CompactString,
    /// API key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Optional base URL override for the provider endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// API version, for backends that version through a header or query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    /// Extra static headers sent with every request.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

impl ProviderConfig {
    /// A config for `provider` serving `model`.
    pub fn new(provider: impl Into<CompactString>, model: impl Into<CompactString>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            ..Default::default()
        }
    }

    /// Set the API key.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Override the base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the API version.
    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    /// Add a static header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Resolve the backend kind from the symbolic name.
    pub fn kind(&self) -> Result<ProviderKind> {
        ProviderKind::from_name(&self.provider)
            .ok_or_else(|| Error::UnknownProvider(self.provider.clone()))
    }

    /// Check that the config can build a provider.
    pub fn validate(&self) -> Result<()> {
        let kind = self.kind()?;
        if self.model.is_empty() {
            return Err(Error::Config(format!("{}: model is required", kind.name())));
        }
        if kind.requires_key() && self.api_key.as_deref().is_none_or(str::is_empty) {
            return Err(Error::Config(format!("{}: api_key is required", kind.name())));
        }
        if kind.default_base_url().is_none() && self.base_url.is_none() {
            return Err(Error::Config(format!(
                "{}: base_url is required",
                kind.name()
            )));
        }
        Ok(())
    }

    /// The base URL requests go to.
    pub fn endpoint(&self) -> Result<&str> {
        let kind = self.kind()?;
        self.base_url
            .as_deref()
            .or(kind.default_base_url())
            .ok_or_else(|| Error::Config(format!("{}: base_url is required", kind.name())))
    }
}

/// Known backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProviderKind {
    /// OpenAI API.
    OpenAI,
    /// Azure OpenAI deployments.
    Azure,
    /// Claude (Anthropic) Messages API.
    Claude,
    /// Google Gemini API.
    Gemini,
    /// Ollama local API.
    Ollama,
    /// DeepSeek API, OpenAI-compatible.
    DeepSeek,
    /// Grok (xAI) API, OpenAI-compatible.
    Grok,
    /// Mistral API, OpenAI-compatible.
    Mistral,
    /// Groq API, OpenAI-compatible.
    Groq,
    /// OpenRouter gateway, OpenAI-compatible.
    OpenRouter,
}

impl ProviderKind {
    /// Every known kind.
    pub const ALL: [ProviderKind; 10] = [
        Self::OpenAI,
        Self::Azure,
        Self::Claude,
        Self::Gemini,
        Self::Ollama,
        Self::DeepSeek,
        Self::Grok,
        Self::Mistral,
        Self::Groq,
        Self::OpenRouter,
    ];

    /// Look up a kind by symbolic name, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        let kind = match name.trim().to_ascii_lowercase().as_str() {
            "openai" => Self::OpenAI,
            "azure" | "azure_openai" => Self::Azure,
            "anthropic" | "claude" => Self::Claude,
            "gemini" | "google" => Self::Gemini,
            "ollama" => Self::Ollama,
            "deepseek" => Self::DeepSeek,
            "grok" | "xai" => Self::Grok,
            "mistral" => Self::Mistral,
            "groq" => Self::Groq,
            "openrouter" => Self::OpenRouter,
            _ => return None,
        };
        Some(kind)
    }

    /// Canonical name, used in logs and errors.
    pub fn name(self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Azure => "azure",
            Self::Claude => "anthropic",
            Self::Gemini => "gemini",
            Self::Ollama => "ollama",
            Self::DeepSeek => "deepseek",
            Self::Grok => "grok",
            Self::Mistral => "mistral",
            Self::Groq => "groq",
            Self::OpenRouter => "openrouter",
        }
    }

    /// Default base URL. Azure has none: every deployment has its own.
    pub fn default_base_url(self) -> Option<&'static str> {
        let url = match self {
            Self::OpenAI => "https://api.openai.com/v1",
            Self::Azure => return None,
            Self::Claude => "https://api.anthropic.com/v1",
            Self::Gemini => "https://generativelanguage.googleapis.com/v1beta",
            Self::Ollama => "http://localhost:11434",
            Self::DeepSeek => "https://api.deepseek.com",
            Self::Grok => "https://api.x.ai/v1",
            Self::Mistral => "https://api.mistral.ai/v1",
            Self::Groq => "https://api.groq.com/openai/v1",
            Self::OpenRouter => "https://openrouter.ai/api/v1",
        };
        Some(url)
    }

    /// How the key is sent.
    pub fn auth(self) -> Auth {
        match self {
            Self::Azure => Auth::Header("api-key"),
            Self::Claude => Auth::Header("x-api-key"),
            Self::Gemini => Auth::Query("key"),
            Self::Ollama => Auth::None,
            _ => Auth::Bearer,
        }
    }

    /// Whether the backend refuses unauthenticated requests.
    pub fn requires_key(self) -> bool {
        self != Self::Ollama
    }

    /// What the backend supports for a model.
    pub fn capabilities(self, model: &str) -> Capabilities {
        let all = Capabilities::all();
        match self {
            Self::Claude => Capabilities {
                structured_output: false,
                ..all
            },
            Self::DeepSeek => Capabilities {
                multimodal: false,
                structured_output: false,
                ..all
            },
            Self::Groq => Capabilities {
                multimodal: model.contains("vision") || model.contains("llama-4"),
                ..all
            },
            _ => all,
        }
    }

    /// The default `api-version` for backends that require one.
    pub fn default_api_version(self) -> Option<&'static str> {
        match self {
            Self::Azure => Some(AZURE_API_VERSION),
            Self::Claude => Some(crate::claude::API_VERSION),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
