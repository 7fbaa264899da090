//! Tests for `Provider` against a local server serving canned responses.

use futures_util::StreamExt;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
};
use ucore::{Conversation, Error, ErrorCategory, Model, StreamChunk};
use ullm_model::{Provider, ProviderConfig, Registry};

/// Answer one request with `status`, `content_type` and `body`, then close.
async fn serve(status: &'static str, content_type: &'static str, body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        read_request(&mut socket).await;
        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: {content_type}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.expect("write");
        let _ = socket.shutdown().await;
    });
    format!("http://{addr}")
}

/// Read headers and a `content-length` body.
async fn read_request(socket: &mut TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.expect("read");
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf);
        let Some(end) = text.find("\r\n\r\n") else {
            continue;
        };
        let length = text[..end]
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if buf.len() >= end + 4 + length {
            return;
        }
    }
}

fn openai(base_url: String) -> Provider {
    Registry::new()
        .resolve(
            &ProviderConfig::new("openai", "gpt-4o")
                .api_key("k")
                .base_url(base_url),
        )
        .expect("provider")
}

fn hello() -> Conversation {
    Conversation::new("gpt-4o").user("hello")
}

#[tokio::test]
async fn send_classifies_rate_limits() {
    let url = serve(
        "429 Too Many Requests",
        "application/json",
        r#"{"error":{"message":"Rate limit reached","type":"rate_limit_error"}}"#,
    )
    .await;

    let err = openai(url).send(&hello()).await.unwrap_err();
    assert!(matches!(err, Error::ProviderApi { .. }));
    assert_eq!(err.status(), Some(429));
    assert_eq!(err.category(), Some(ErrorCategory::RateLimit));
    assert!(err.to_string().contains("Rate limit reached"));
}

#[tokio::test]
async fn send_classifies_server_errors() {
    let url = serve(
        "500 Internal Server Error",
        "text/html",
        "<html><head><title>500 Internal Server Error</title></head><body></body></html>",
    )
    .await;

    let err = openai(url).send(&hello()).await.unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert_eq!(err.category(), Some(ErrorCategory::Server));
    assert!(err.to_string().contains("500 Internal Server Error"));
}

#[tokio::test]
async fn send_parses_a_completion() {
    let url = serve(
        "200 OK",
        "application/json",
        r#"{"id":"chatcmpl-1","model":"gpt-4o","choices":[{"index":0,"message":{"role":"assistant","content":"Hi there"},"finish_reason":"stop"}],"usage":{"prompt_tokens":3,"completion_tokens":2,"total_tokens":5}}"#,
    )
    .await;

    let response = openai(url).send(&hello()).await.expect("send");
    assert_eq!(response.content(), "Hi there");
    assert_eq!(response.usage().total_tokens, 5);
}

#[tokio::test]
async fn html_stream_is_rejected() {
    let url = serve(
        "200 OK",
        "text/html; charset=utf-8",
        "<!DOCTYPE html><html><head><title>Gateway login</title></head><body></body></html>",
    )
    .await;

    let provider = openai(url);
    let conversation = hello();
    let mut stream = std::pin::pin!(provider.stream(&conversation));
    let err = stream
        .next()
        .await
        .expect("one item")
        .expect_err("html body");
    assert_eq!(err.status(), Some(200));
    assert_eq!(err.category(), Some(ErrorCategory::InvalidResponse));
    assert!(err.to_string().contains("Gateway login"));
}

#[tokio::test]
async fn stream_without_terminal_marker_is_incomplete() {
    let url = serve(
        "200 OK",
        "text/event-stream",
        "data: {\"id\":\"c1\",\"model\":\"gpt-4o\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Hel\"}}]}\n\n",
    )
    .await;

    let provider = openai(url);
    let conversation = hello();
    let items: Vec<_> = provider.stream(&conversation).collect().await;
    let (last, chunks) = items.split_last().expect("items");
    assert!(
        chunks
            .iter()
            .any(|chunk| matches!(chunk, Ok(StreamChunk::Content(text)) if text == "Hel"))
    );
    let err = last.as_ref().expect_err("truncated");
    assert_eq!(err.category(), Some(ErrorCategory::IncompleteStream));
}
