//! Provider implementation.
//!
//! A `Provider` binds one [`HttpProvider`] (endpoint and credentials) to
//! the adapter family of its backend, and implements [`Model`] on top.
//! Family dispatch is a closed enum; there is no symbolic branching at
//! request time.

use crate::{
    Adapter, Auth, Chat, Claude, Gemini, HttpProvider, Ollama, ProviderConfig, ProviderKind,
    Responses, Shape, WireRequest, http,
};
use async_stream::try_stream;
use compact_str::CompactString;
use futures_core::Stream;
use futures_util::StreamExt;
use std::borrow::Cow;
use ucore::{Capabilities, Conversation, Error, ErrorCategory, Model, Response, Result, StreamChunk};

/// The adapter family of a provider.
#[derive(Debug, Clone, Copy)]
enum Family {
    /// Chat completions, plus the responses endpoint where the backend
    /// has one.
    OpenAI {
        chat: Chat,
        responses: Option<Responses>,
    },
    /// Anthropic Messages API.
    Claude(Claude),
    /// Gemini API.
    Gemini(Gemini),
    /// Ollama native API.
    Ollama(Ollama),
}

/// A configured backend.
///
/// Cheap to clone; holds no per-call state.
#[derive(Clone)]
pub struct Provider {
    kind: ProviderKind,
    model: CompactString,
    http: HttpProvider,
    family: Family,
}

impl Provider {
    /// Construct a provider from config and a shared HTTP client.
    pub fn build(config: &ProviderConfig, client: reqwest::Client) -> Result<Self> {
        let kind = config.kind()?;
        config.validate()?;

        let key = config.api_key.as_deref().unwrap_or_default();
        let auth = match kind.auth() {
            Auth::None if !key.is_empty() => Auth::Bearer,
            auth => auth,
        };
        let mut http = HttpProvider::new(client, auth, key, config.endpoint()?)?;

        let version = config.api_version.as_deref().or(kind.default_api_version());
        match (kind, version) {
            (ProviderKind::Azure, Some(version)) => http = http.query("api-version", version),
            (ProviderKind::Claude, Some(version)) => {
                http = http.header("anthropic-version", version)?
            }
            _ => {}
        }
        for (name, value) in &config.headers {
            http = http.header(name, value)?;
        }

        let family = match kind {
            ProviderKind::Claude => Family::Claude(Claude),
            ProviderKind::Gemini => Family::Gemini(Gemini),
            ProviderKind::Ollama => Family::Ollama(Ollama),
            ProviderKind::OpenAI => Family::OpenAI {
                chat: Chat::new(kind.name()),
                responses: Some(Responses::new(kind.name())),
            },
            _ => Family::OpenAI {
                chat: Chat::new(kind.name()),
                responses: None,
            },
        };

        tracing::debug!("built {kind} provider for {} at {}", config.model, http.endpoint());
        Ok(Self {
            kind,
            model: config.model.clone(),
            http,
            family,
        })
    }

    /// The backend kind.
    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    /// The configured model.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// The transport.
    pub fn http(&self) -> &HttpProvider {
        &self.http
    }

    /// The adapter serving a conversation.
    ///
    /// Only the OpenAI family routes by shape; every other family has a
    /// single endpoint.
    pub fn adapter(&self, conversation: &Conversation) -> &dyn Adapter {
        match &self.family {
            Family::OpenAI {
                responses: Some(responses),
                ..
            } if Shape::of(conversation) == Shape::Responses => responses,
            Family::OpenAI { chat, .. } => chat,
            Family::Claude(claude) => claude,
            Family::Gemini(gemini) => gemini,
            Family::Ollama(ollama) => ollama,
        }
    }

    /// Reject conversations the backend cannot serve, and fill in the
    /// configured model when the conversation names none.
    fn prepare<'c>(&self, conversation: &'c Conversation) -> Result<Cow<'c, Conversation>> {
        conversation.validate()?;
        let caps = self.capabilities();
        if conversation.is_multimodal() && !caps.multimodal {
            return Err(Error::InvalidConversation(format!(
                "{} model '{}' does not accept image or file input",
                self.kind, self.model
            )));
        }
        if conversation.options.response_format.is_some() && !caps.structured_output {
            return Err(Error::InvalidConversation(format!(
                "{} does not support structured output",
                self.kind
            )));
        }

        if conversation.options.model.is_empty() {
            let mut owned = conversation.clone();
            owned.options.model = self.model.clone();
            return Ok(Cow::Owned(owned));
        }
        Ok(Cow::Borrowed(conversation))
    }

    /// Open a streaming request, failing on error statuses and on HTML
    /// pages served with a 2xx status.
    async fn open(
        &self,
        adapter: &dyn Adapter,
        request: &WireRequest,
    ) -> Result<reqwest::Response> {
        let provider = adapter.name();
        let response = self.http.post(provider, request).await?;
        let status = response.status().as_u16();
        let html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("text/html"));
        if (200..300).contains(&status) && !html {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::transport(provider, e))?;
        Err(adapter.parse_error(status, &body))
    }
}

impl Model for Provider {
    async fn send(&self, conversation: &Conversation) -> Result<Response> {
        let conversation = self.prepare(conversation)?;
        let adapter = self.adapter(&conversation);
        let request = adapter.build_request(&conversation, false)?;
        let (status, body) = self.http.send(adapter.name(), &request).await?;
        if !(200..300).contains(&status) {
            return Err(adapter.parse_error(status, &body));
        }
        adapter.parse_response(&body)
    }

    fn stream(
        &self,
        conversation: &Conversation,
    ) -> impl Stream<Item = Result<StreamChunk>> + Send {
        let this = self.clone();
        let conversation = conversation.clone();
        try_stream! {
            let conversation = this.prepare(&conversation)?;
            let adapter = this.adapter(&conversation);
            let provider = adapter.name();
            let request = adapter.build_request(&conversation, true)?;
            let response = this.open(adapter, &request).await?;

            let mut done = false;
            let mut frames = std::pin::pin!(http::frames(response, request.framing, provider.into()));
            while let Some(event) = frames.next().await {
                let event = event?;
                let chunks = adapter
                    .decode_event(&event)
                    .inspect_err(|e| tracing::error!("{provider} stream failed: {e}"))?;
                for chunk in chunks {
                    done = matches!(chunk, StreamChunk::Done);
                    yield chunk;
                    if done {
                        break;
                    }
                }
                if done {
                    break;
                }
            }

            if !done {
                Err::<(), Error>(Error::api(
                    provider,
                    None,
                    ErrorCategory::IncompleteStream,
                    "stream ended before the terminal marker",
                ))?;
            }
        }
    }

    fn name(&self) -> &str {
        self.kind.name()
    }

    fn capabilities(&self) -> Capabilities {
        self.kind.capabilities(&self.model)
    }
}

impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field("kind", &self.kind)
            .field("model", &self.model)
            .field("endpoint", &self.http.endpoint())
            .finish()
    }
}
