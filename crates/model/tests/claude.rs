//! Tests for the Anthropic Messages adapter.

use serde_json::json;
use ucore::{
    Conversation, Error, ErrorCategory, Message, MessageBuilder, Options, Part, StopReason, Tool,
    ToolCall, ToolChoice,
};
use ullm_model::{Adapter, Claude, RawEvent};

fn conversation_with_two_results() -> Conversation {
    let mut conversation = Conversation::new("claude-sonnet-4-5")
        .system("be brief")
        .system("answer in French")
        .user("weather in Paris and Rome?")
        .with_tools(vec![Tool::new(
            "get_weather",
            "Current weather",
            schemars::json_schema!({ "type": "object" }),
        )]);
    conversation.options.tool_choice = Some(ToolChoice::Any);
    conversation
        .push(Message::assistant("Checking").with_tool_calls(vec![
            ToolCall::new("toolu_1", "get_weather", json!({ "city": "Paris" })),
            ToolCall::new("toolu_2", "get_weather", json!({ "city": "Rome" })),
        ]))
        .unwrap();
    conversation.push(Message::tool("21C", "toolu_1")).unwrap();
    conversation.push(Message::tool("25C", "toolu_2")).unwrap();
    conversation
}

#[test]
fn system_is_lifted_and_results_are_folded() {
    let request = Claude
        .build_request(&conversation_with_two_results(), false)
        .unwrap();
    let body = &request.body;

    assert_eq!(request.path, "/messages");
    assert_eq!(body["system"], "be brief\n\nanswer in French");
    assert_eq!(body["max_tokens"], 4096);
    assert_eq!(body["tool_choice"], json!({ "type": "any" }));
    assert_eq!(body["tools"][0]["input_schema"], json!({ "type": "object" }));

    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0], json!({ "role": "user", "content": "weather in Paris and Rome?" }));
    assert_eq!(messages[1]["content"][0], json!({ "type": "text", "text": "Checking" }));
    assert_eq!(messages[1]["content"][2]["id"], "toolu_2");
    assert_eq!(
        messages[2],
        json!({
            "role": "user",
            "content": [
                { "type": "tool_result", "tool_use_id": "toolu_1", "content": "21C" },
                { "type": "tool_result", "tool_use_id": "toolu_2", "content": "25C" },
            ]
        })
    );
}

#[test]
fn tool_results_carry_media_and_error_flags() {
    let mut conversation = Conversation::new("claude-sonnet-4-5").user("screenshot both pages");
    conversation
        .push(Message::assistant("").with_tool_calls(vec![
            ToolCall::new("toolu_1", "screenshot", json!({ "page": 1 })),
            ToolCall::new("toolu_2", "screenshot", json!({ "page": 2 })),
        ]))
        .unwrap();
    conversation
        .push(Message {
            content: vec![
                Part::text("page 1"),
                Part::image_base64("image/png", "iVBOR"),
            ]
            .into(),
            ..Message::tool("", "toolu_1")
        })
        .unwrap();
    conversation
        .push(Message::tool_error(r#"{"error":"timeout"}"#, "toolu_2"))
        .unwrap();

    let request = Claude::default()
        .build_request(&conversation, false)
        .unwrap();
    assert_eq!(
        request.body["messages"][2]["content"],
        json!([
            {
                "type": "tool_result",
                "tool_use_id": "toolu_1",
                "content": [
                    { "type": "text", "text": "page 1" },
                    {
                        "type": "image",
                        "source": { "type": "base64", "media_type": "image/png", "data": "iVBOR" },
                    },
                ],
            },
            {
                "type": "tool_result",
                "tool_use_id": "toolu_2",
                "content": r#"{"error":"timeout"}"#,
                "is_error": true,
            },
        ])
    );
}

#[test]
fn system_media_is_rejected() {
    let conversation = Conversation::from_messages(
        "claude-sonnet-4-5",
        vec![
            Message::system(vec![
                Part::text("look"),
                Part::image_url("https://example.com/cat.png"),
            ]),
            Message::user("hi"),
        ],
    )
    .unwrap();
    let err = Claude::default()
        .build_request(&conversation, false)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidConversation(_)));
}

#[test]
fn explicit_max_tokens_and_images() {
    let conversation = Conversation::new("claude-sonnet-4-5")
        .user(vec![
            Part::text("what is this?"),
            Part::image_base64("image/png", "iVBOR"),
        ])
        .with_options(Options {
            model: "claude-sonnet-4-5".into(),
            ..Options::default().max_tokens(256)
        });
    let request = Claude.build_request(&conversation, true).unwrap();
    assert_eq!(request.body["max_tokens"], 256);
    assert_eq!(request.body["stream"], true);
    assert_eq!(
        request.body["messages"][0]["content"][1],
        json!({
            "type": "image",
            "source": { "type": "base64", "media_type": "image/png", "data": "iVBOR" }
        })
    );
}

#[test]
fn parse_content_blocks() {
    let body = json!({
        "id": "msg_1",
        "type": "message",
        "role": "assistant",
        "model": "claude-sonnet-4-5",
        "content": [
            { "type": "thinking", "thinking": "hmm", "signature": "sig" },
            { "type": "text", "text": "Let me check." },
            { "type": "tool_use", "id": "toolu_1", "name": "get_weather", "input": { "city": "Paris" } },
            { "type": "tool_use", "id": "toolu_2", "name": "now", "input": {} }
        ],
        "stop_reason": "tool_use",
        "usage": { "input_tokens": 20, "output_tokens": 8, "cache_read_input_tokens": 16 }
    });
    let response = Claude.parse_response(&body.to_string()).unwrap();

    assert_eq!(response.content(), "Let me check.");
    assert_eq!(response.message().reasoning, "hmm");
    assert_eq!(response.tool_calls().len(), 2);
    assert_eq!(response.tool_calls()[1].arguments, json!({}));
    assert_eq!(response.stop_reason(), Some(&StopReason::ToolCalls));
    assert_eq!(response.usage().prompt_tokens, 20);
    assert_eq!(response.usage().total_tokens, 28);
    assert_eq!(response.usage().cached_tokens, Some(16));
}

#[test]
fn stream_events() {
    let events = [
        json!({ "type": "message_start", "message": {
            "id": "msg_1", "model": "claude-sonnet-4-5", "content": [],
            "usage": { "input_tokens": 25, "output_tokens": 1 }
        } }),
        json!({ "type": "content_block_start", "index": 0, "content_block": { "type": "text", "text": "" } }),
        json!({ "type": "ping" }),
        json!({ "type": "content_block_delta", "index": 0, "delta": { "type": "text_delta", "text": "Hello" } }),
        json!({ "type": "content_block_stop", "index": 0 }),
        json!({ "type": "content_block_start", "index": 1, "content_block": {
            "type": "tool_use", "id": "toolu_1", "name": "get_weather", "input": {}
        } }),
        json!({ "type": "content_block_delta", "index": 1, "delta": { "type": "input_json_delta", "partial_json": "{\"city\": " } }),
        json!({ "type": "content_block_delta", "index": 1, "delta": { "type": "input_json_delta", "partial_json": "\"Paris\"}" } }),
        json!({ "type": "content_block_stop", "index": 1 }),
        json!({ "type": "message_delta", "delta": { "stop_reason": "tool_use" }, "usage": { "output_tokens": 15 } }),
        json!({ "type": "message_stop" }),
    ];

    let mut builder = MessageBuilder::new();
    let mut finished = false;
    for event in events {
        let raw = RawEvent {
            event: event["type"].as_str().map(str::to_owned),
            data: event.to_string(),
        };
        let (_, done) = Claude.process_stream_chunk(&raw, &mut builder).unwrap();
        finished = done;
    }
    assert!(finished);

    let response = builder.build("anthropic").unwrap();
    assert_eq!(response.content(), "Hello");
    assert_eq!(response.tool_calls()[0].arguments, json!({ "city": "Paris" }));
    assert_eq!(response.stop_reason(), Some(&StopReason::ToolCalls));
    assert_eq!(response.usage().prompt_tokens, 25);
    assert_eq!(response.usage().completion_tokens, 15);
    assert_eq!(response.usage().total_tokens, 40);
}

#[test]
fn stream_error_event() {
    let event = json!({
        "type": "error",
        "error": { "type": "overloaded_error", "message": "Overloaded" }
    });
    let err = Claude
        .decode_event(&RawEvent::data(event.to_string()))
        .unwrap_err();
    match err {
        Error::ProviderApi {
            category, message, ..
        } => {
            assert_eq!(category, ErrorCategory::Overloaded);
            assert_eq!(message, "Overloaded");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn overloaded_status() {
    let body = json!({
        "type": "error",
        "error": { "type": "overloaded_error", "message": "Overloaded" }
    });
    let err = Claude.parse_error(529, &body.to_string());
    assert_eq!(err.status(), Some(529));
    assert_eq!(err.category(), Some(ErrorCategory::Overloaded));
}
