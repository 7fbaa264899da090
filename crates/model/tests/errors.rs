//! Tests for backend error classification.

use serde_json::{Value, json};
use ucore::{Error, ErrorCategory};
use ullm_model::error::{api_error, decode, looks_like_html};

const GATEWAY_PAGE: &str = r#"<!DOCTYPE html>
<html>
  <head><title>502 Bad Gateway</title></head>
  <body><h1>Bad Gateway</h1><p>upstream went away</p></body>
</html>"#;

// --- status classification ---

#[test]
fn unauthorized() {
    let body = json!({
        "error": {
            "message": "Incorrect API key provided",
            "type": "invalid_request_error",
            "code": "invalid_api_key"
        }
    });
    let err = api_error("openai", 401, &body.to_string());
    assert_eq!(err.status(), Some(401));
    assert_eq!(err.category(), Some(ErrorCategory::Authentication));
    assert!(err.to_string().contains("Incorrect API key provided"));
}

#[test]
fn rate_limited() {
    let body = json!({ "error": { "message": "Rate limit reached", "type": "requests" } });
    let err = api_error("openai", 429, &body.to_string());
    assert_eq!(err.category(), Some(ErrorCategory::RateLimit));
}

#[test]
fn server_error() {
    let body = json!({ "type": "error", "error": { "type": "api_error", "message": "Internal" } });
    let err = api_error("anthropic", 500, &body.to_string());
    assert_eq!(err.category(), Some(ErrorCategory::Server));
}

#[test]
fn overloaded() {
    let body = json!({ "type": "error", "error": { "type": "overloaded_error", "message": "Overloaded" } });
    let err = api_error("anthropic", 529, &body.to_string());
    assert_eq!(err.category(), Some(ErrorCategory::Overloaded));
}

#[test]
fn backend_type_refines_bad_request() {
    let body = json!({ "error": { "type": "rate_limit_error", "message": "quota" } });
    let err = api_error("openai", 400, &body.to_string());
    assert_eq!(err.category(), Some(ErrorCategory::RateLimit));
}

#[test]
fn bare_detail_body() {
    let err = api_error("mistral", 422, r#"{"detail": "model is required"}"#);
    match err {
        Error::ProviderApi {
            category, message, ..
        } => {
            assert_eq!(category, ErrorCategory::InvalidRequest);
            assert_eq!(message, "model is required");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn plain_text_body_is_quoted() {
    let err = api_error("groq", 503, "upstream connect error");
    assert_eq!(err.category(), Some(ErrorCategory::Overloaded));
    assert!(err.to_string().contains("upstream connect error"));

    let err = api_error("groq", 500, "");
    assert!(err.to_string().contains("empty response body"));
}

// --- html ---

#[test]
fn html_error_page() {
    assert!(looks_like_html(GATEWAY_PAGE));
    let err = api_error("openrouter", 502, GATEWAY_PAGE);
    match err {
        Error::ProviderApi {
            status,
            category,
            message,
            ..
        } => {
            assert_eq!(status, Some(502));
            assert_eq!(category, ErrorCategory::Server);
            assert_eq!(message, "502 Bad Gateway");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn html_with_success_status() {
    let err = decode::<Value>("azure", GATEWAY_PAGE).unwrap_err();
    assert_eq!(err.category(), Some(ErrorCategory::InvalidResponse));
    assert!(err.to_string().contains("502 Bad Gateway"));
}

#[test]
fn malformed_success_body() {
    let err = decode::<Value>("openai", "{\"id\": ").unwrap_err();
    assert_eq!(err.category(), Some(ErrorCategory::InvalidResponse));
}

#[test]
fn json_is_not_html() {
    assert!(!looks_like_html(r#"{"error": "<body>"}"#));
}
