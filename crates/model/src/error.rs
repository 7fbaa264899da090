//! Error classification for backend responses.
//!
//! Backends report failures as JSON in several shapes, and some gateways
//! answer with an HTML error page instead. Everything funnels into
//! [`Error::ProviderApi`] here so a parse failure never escapes as an
//! opaque JSON error.

use scraper::{Html, Selector};
use serde::de::DeserializeOwned;
use serde_json::Value;
use ucore::{Error, ErrorCategory, Result};

/// Longest raw body quoted in an error message.
const MAX_QUOTE: usize = 512;

/// Build a [`Error::ProviderApi`] from a response status and body.
///
/// Unambiguous statuses (401, 403, 404, 429, 503, 529) decide the
/// category; otherwise the backend error type refines it.
pub fn api_error(provider: &str, status: u16, body: &str) -> Error {
    let by_status = if (200..300).contains(&status) {
        ErrorCategory::InvalidResponse
    } else {
        ErrorCategory::from_status(status)
    };

    if looks_like_html(body) {
        return Error::api(provider, Some(status), by_status, html_message(body));
    }

    let (kinds, message) = match serde_json::from_str::<Value>(body) {
        Ok(value) => extract(&value),
        Err(_) => (Vec::new(), None),
    };
    let category = match by_status {
        ErrorCategory::Unknown
        | ErrorCategory::InvalidRequest
        | ErrorCategory::Server
        | ErrorCategory::InvalidResponse => classify(&kinds).unwrap_or(by_status),
        specific => specific,
    };
    let message = message.unwrap_or_else(|| quote(body, status));
    Error::api(provider, Some(status), category, message)
}

fn classify(kinds: &[String]) -> Option<ErrorCategory> {
    kinds.iter().find_map(|kind| ErrorCategory::from_backend(kind))
}

/// Build a [`Error::ProviderApi`] from an error object carried inside an
/// otherwise successful payload or stream event.
pub fn payload_error(provider: &str, value: &Value) -> Error {
    let (kinds, message) = extract(value);
    let status = value
        .pointer("/error/code")
        .and_then(Value::as_u64)
        .and_then(|code| u16::try_from(code).ok());
    let category = classify(&kinds)
        .or_else(|| status.map(ErrorCategory::from_status))
        .unwrap_or(ErrorCategory::Unknown);
    Error::api(
        provider,
        status,
        category,
        message.unwrap_or_else(|| value.to_string()),
    )
}

/// Parse a 2xx body, returning the typed payload and the raw JSON.
///
/// HTML pages, malformed JSON and payloads carrying an `error` object are
/// all reported as provider errors.
pub fn decode<T: DeserializeOwned>(provider: &str, body: &str) -> Result<(T, Value)> {
    let value = parse_value(provider, body)?;
    check_error_payload(provider, &value)?;
    let typed = T::deserialize(&value).map_err(|e| {
        Error::api(
            provider,
            None,
            ErrorCategory::InvalidResponse,
            format!("unexpected response shape: {e}"),
        )
    })?;
    Ok((typed, value))
}

/// Parse a stream frame payload.
pub fn event<T: DeserializeOwned>(provider: &str, data: &str) -> Result<T> {
    decode(provider, data).map(|(typed, _)| typed)
}

/// Parse a body as JSON.
pub fn parse_value(provider: &str, body: &str) -> Result<Value> {
    if looks_like_html(body) {
        return Err(Error::api(
            provider,
            None,
            ErrorCategory::InvalidResponse,
            html_message(body),
        ));
    }
    serde_json::from_str(body).map_err(|e| {
        Error::api(
            provider,
            None,
            ErrorCategory::InvalidResponse,
            format!("malformed response ({e}): {}", truncate(body)),
        )
    })
}

/// Fail when a payload carries a non-null top-level `error`.
pub fn check_error_payload(provider: &str, value: &Value) -> Result<()> {
    match value.get("error") {
        None | Some(Value::Null) => Ok(()),
        Some(_) => Err(payload_error(provider, value)),
    }
}

/// Whether a body is an HTML document rather than JSON.
pub fn looks_like_html(body: &str) -> bool {
    let lower = body
        .trim_start()
        .chars()
        .take(256)
        .collect::<String>()
        .to_ascii_lowercase();
    lower.starts_with('<')
        && (lower.starts_with("<!doctype html")
            || lower.starts_with("<html")
            || lower.contains("<body"))
}

/// The most useful text of an HTML error page.
fn html_message(body: &str) -> String {
    let document = Html::parse_document(body);
    for tag in ["title", "h1"] {
        let Ok(selector) = Selector::parse(tag) else {
            continue;
        };
        if let Some(element) = document.select(&selector).next() {
            let text = element.text().collect::<Vec<_>>().join(" ");
            let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
            if !text.is_empty() {
                return text;
            }
        }
    }
    "backend returned an HTML error page".into()
}

/// Pull the backend error type and message out of the known JSON shapes.
///
/// Handles `{"error": {"type", "message"}}` (OpenAI, Anthropic),
/// `{"error": {"status", "message"}}` (Gemini), `{"error": "..."}`
/// (Ollama), bare `{"message"}` / `{"detail"}` bodies, and arrays of any
/// of these.
fn extract(value: &Value) -> (Vec<String>, Option<String>) {
    if let Value::Array(items) = value {
        return items.first().map(extract).unwrap_or_default();
    }

    let strings = |object: &Value, keys: &[&str]| {
        keys.iter()
            .filter_map(|key| object.get(key).and_then(Value::as_str))
            .map(str::to_owned)
            .collect::<Vec<_>>()
    };

    match value.get("error") {
        Some(Value::String(message)) => (Vec::new(), Some(message.clone())),
        Some(error @ Value::Object(_)) => {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_owned);
            (strings(error, &["type", "status", "code"]), message)
        }
        _ => {
            let message = ["message", "detail"].iter().find_map(|key| {
                value.get(key).map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
            });
            (strings(value, &["type"]), message)
        }
    }
}

fn quote(body: &str, status: u16) -> String {
    if body.trim().is_empty() {
        format!("empty response body (status {status})")
    } else {
        truncate(body).to_owned()
    }
}

fn truncate(body: &str) -> &str {
    let body = body.trim();
    if body.len() <= MAX_QUOTE {
        return body;
    }
    let mut end = MAX_QUOTE;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        let body = "é".repeat(MAX_QUOTE);
        let cut = truncate(&body);
        assert!(cut.len() <= MAX_QUOTE);
        assert!(cut.chars().all(|c| c == 'é'));
    }

    #[test]
    fn extract_from_array() {
        let value = serde_json::json!([{"error": {"status": "UNAVAILABLE", "message": "busy"}}]);
        let (kinds, message) = extract(&value);
        assert_eq!(kinds, vec!["UNAVAILABLE".to_owned()]);
        assert_eq!(message.as_deref(), Some("busy"));
    }
}
