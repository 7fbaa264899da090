//! Shared HTTP transport for every backend family.
//!
//! `HttpProvider` wraps a `reqwest::Client` with pre-configured headers,
//! query parameters and a base URL. Auth differences (bearer token, custom
//! header, query key) live here and nowhere else, so the request mapping
//! in the adapters never depends on the transport.

use crate::{Framing, RawEvent, WireRequest};
use async_stream::try_stream;
use compact_str::CompactString;
use futures_core::Stream;
use futures_util::StreamExt;
use reqwest::{
    Client, Method,
    header::{self, HeaderMap, HeaderName, HeaderValue},
};
use ucore::{Error, Result};

/// How a backend expects its credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Auth {
    /// `Authorization: Bearer <key>`.
    Bearer,
    /// The key in a named header, e.g. `x-api-key`.
    Header(&'static str),
    /// The key in a named query parameter, e.g. `key`.
    Query(&'static str),
    /// No credentials.
    None,
}

/// Shared HTTP transport.
///
/// Holds a `reqwest::Client`, pre-built headers (auth + content-type),
/// static query parameters and the base URL requests are joined onto.
#[derive(Clone)]
pub struct HttpProvider {
    client: Client,
    headers: HeaderMap,
    query: Vec<(String, String)>,
    base_url: String,
}

impl HttpProvider {
    /// Create a provider with the given auth scheme.
    pub fn new(client: Client, auth: Auth, key: &str, base_url: &str) -> Result<Self> {
        match auth {
            Auth::Bearer => Self::bearer(client, key, base_url),
            Auth::Header(name) => Self::custom_header(client, name, key, base_url),
            Auth::Query(name) => Ok(Self::query_key(client, name, key, base_url)),
            Auth::None => Ok(Self::no_auth(client, base_url)),
        }
    }

    /// Create a provider with Bearer token authentication.
    pub fn bearer(client: Client, key: &str, base_url: &str) -> Result<Self> {
        let mut provider = Self::no_auth(client, base_url);
        provider
            .headers
            .insert(header::AUTHORIZATION, value(&format!("Bearer {key}"))?);
        Ok(provider)
    }

    /// Create a provider without authentication (e.g. Ollama).
    pub fn no_auth(client: Client, base_url: &str) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        Self {
            client,
            headers,
            query: Vec::new(),
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    /// Create a provider with a custom header for authentication.
    ///
    /// Used by providers that don't use Bearer tokens (e.g. Anthropic
    /// uses `x-api-key`, Azure uses `api-key`).
    pub fn custom_header(
        client: Client,
        header_name: &str,
        header_value: &str,
        base_url: &str,
    ) -> Result<Self> {
        Self::no_auth(client, base_url).header(header_name, header_value)
    }

    /// Create a provider that passes its key as a query parameter.
    pub fn query_key(client: Client, param: &str, key: &str, base_url: &str) -> Self {
        Self::no_auth(client, base_url).query(param, key)
    }

    /// Add a static header.
    pub fn header(mut self, name: &str, header_value: &str) -> Result<Self> {
        let name = name
            .parse::<HeaderName>()
            .map_err(|e| Error::Config(format!("invalid header name '{name}': {e}")))?;
        self.headers.insert(name, value(header_value)?);
        Ok(self)
    }

    /// Add a static query parameter.
    pub fn query(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_owned(), value.to_owned()));
        self
    }

    /// The full URL for a request path.
    pub fn url(&self, path: &str) -> String {
        if path.is_empty() {
            return self.base_url.clone();
        }
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Send a request and return the status and body text.
    pub async fn send(&self, provider: &str, request: &WireRequest) -> Result<(u16, String)> {
        let response = self.post(provider, request).await?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| Error::transport(provider, e))?;
        tracing::trace!("response: {text}");
        Ok((status, text))
    }

    /// Send a request and return the raw response for streaming.
    pub async fn post(&self, provider: &str, request: &WireRequest) -> Result<reqwest::Response> {
        tracing::trace!("request: {}", request.body);
        self.client
            .request(Method::POST, self.url(&request.path))
            .headers(self.headers.clone())
            .query(&self.query)
            .query(&request.query)
            .json(&request.body)
            .send()
            .await
            .map_err(|e| Error::transport(provider, e))
    }

    /// Get the base URL.
    pub fn endpoint(&self) -> &str {
        &self.base_url
    }

    /// Get a reference to the headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get the static query parameters.
    pub fn query_params(&self) -> &[(String, String)] {
        &self.query
    }
}

fn value(raw: &str) -> Result<HeaderValue> {
    raw.parse::<HeaderValue>()
        .map_err(|e| Error::Config(format!("invalid header value: {e}")))
}

/// Split a streamed response body into frames.
pub fn frames(
    response: reqwest::Response,
    framing: Framing,
    provider: CompactString,
) -> impl Stream<Item = Result<RawEvent>> + Send {
    try_stream! {
        let mut decoder = FrameDecoder::new(framing);
        let mut stream = response.bytes_stream();
        while let Some(next) = stream.next().await {
            let bytes = next.map_err(|e| Error::transport(provider.as_str(), e))?;
            tracing::trace!("chunk: {}", String::from_utf8_lossy(&bytes));
            for event in decoder.feed(&bytes) {
                yield event;
            }
        }
        for event in decoder.finish() {
            yield event;
        }
    }
}

/// Incremental frame decoder.
///
/// Network chunks split frames (and UTF-8 sequences) at arbitrary points,
/// so bytes are buffered until a full line is available.
#[derive(Debug)]
pub struct FrameDecoder {
    framing: Framing,
    buf: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl FrameDecoder {
    /// Create a decoder for the given framing.
    pub fn new(framing: Framing) -> Self {
        Self {
            framing,
            buf: Vec::new(),
            event: None,
            data: Vec::new(),
        }
    }

    /// Feed bytes, returning every frame they complete.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<RawEvent> {
        self.buf.extend_from_slice(bytes);
        let mut events = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let line = self.buf.drain(..=pos).collect::<Vec<_>>();
            let line = String::from_utf8_lossy(&line);
            self.line(line.trim_end_matches(['\n', '\r']), &mut events);
        }
        events
    }

    /// Flush whatever is left once the body ends.
    pub fn finish(&mut self) -> Vec<RawEvent> {
        let mut events = Vec::new();
        if !self.buf.is_empty() {
            let rest = std::mem::take(&mut self.buf);
            let rest = String::from_utf8_lossy(&rest);
            self.line(rest.trim_end_matches(['\n', '\r']), &mut events);
        }
        self.dispatch(&mut events);
        events
    }

    fn line(&mut self, line: &str, events: &mut Vec<RawEvent>) {
        match self.framing {
            Framing::Ndjson => {
                let line = line.trim();
                if !line.is_empty() {
                    events.push(RawEvent::data(line));
                }
            }
            Framing::Sse => {
                if line.is_empty() {
                    self.dispatch(events);
                    return;
                }
                if line.starts_with(':') {
                    return;
                }
                let (field, value) = match line.split_once(':') {
                    Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                    None => (line, ""),
                };
                match field {
                    "event" => self.event = Some(value.to_owned()),
                    "data" => self.data.push(value.to_owned()),
                    _ => {}
                }
            }
        }
    }

    fn dispatch(&mut self, events: &mut Vec<RawEvent>) {
        if self.data.is_empty() {
            self.event = None;
            return;
        }
        events.push(RawEvent {
            event: self.event.take(),
            data: self.data.join("\n"),
        });
        self.data.clear();
    }
}
