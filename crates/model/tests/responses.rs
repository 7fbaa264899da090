//! Tests for the responses adapter.

use serde_json::json;
use ucore::{
    Conversation, Error, ErrorCategory, MediaSource, Message, MessageBuilder, Options, Part,
    ResponseFormat, StopReason, ToolCall,
};
use ullm_model::{Adapter, RawEvent, Responses};

#[test]
fn request_items_follow_conversation_order() {
    let mut conversation = Conversation::new("gpt-4.1")
        .system("be brief")
        .user(vec![
            Part::text("describe"),
            Part::image_base64("image/png", "iVBOR"),
            Part::file(
                MediaSource::Url {
                    url: "https://example.com/a.pdf".into(),
                    media_type: None,
                },
                Some("a.pdf".into()),
            ),
        ]);
    conversation
        .push(Message::assistant("looking").with_tool_calls(vec![ToolCall::new(
            "fc_1",
            "lookup",
            json!({ "q": "cat" }),
        )]))
        .unwrap();
    conversation.push(Message::tool("found", "fc_1")).unwrap();

    let request = Responses::default()
        .build_request(&conversation, false)
        .unwrap();
    assert_eq!(request.path, "/responses");
    let body = &request.body;
    assert_eq!(body["instructions"], "be brief");
    assert_eq!(
        body["input"],
        json!([
            {
                "type": "message",
                "role": "user",
                "content": [
                    { "type": "input_text", "text": "describe" },
                    { "type": "input_image", "image_url": "data:image/png;base64,iVBOR" },
                    { "type": "input_file", "file_url": "https://example.com/a.pdf", "filename": "a.pdf" },
                ]
            },
            {
                "type": "message",
                "role": "assistant",
                "content": [{ "type": "output_text", "text": "looking" }]
            },
            { "type": "function_call", "call_id": "fc_1", "name": "lookup", "arguments": "{\"q\":\"cat\"}" },
            { "type": "function_call_output", "call_id": "fc_1", "output": "found" },
        ])
    );
}

#[test]
fn tool_media_becomes_input_parts() {
    let mut conversation = Conversation::new("gpt-4.1").user("render it");
    conversation
        .push(Message::assistant("").with_tool_calls(vec![ToolCall::new(
            "fc_1",
            "render",
            json!({}),
        )]))
        .unwrap();
    conversation
        .push(Message {
            content: vec![
                Part::text("done"),
                Part::image_url("https://example.com/render.png"),
            ]
            .into(),
            ..Message::tool("", "fc_1")
        })
        .unwrap();

    let request = Responses::default()
        .build_request(&conversation, false)
        .unwrap();
    assert_eq!(
        request.body["input"][2]["output"],
        json!([
            { "type": "input_text", "text": "done" },
            { "type": "input_image", "image_url": "https://example.com/render.png" },
        ])
    );
}

#[test]
fn system_media_is_rejected() {
    let conversation = Conversation::from_messages(
        "gpt-4.1",
        vec![
            Message::system(vec![
                Part::text("look"),
                Part::image_url("https://example.com/cat.png"),
            ]),
            Message::user("hi"),
        ],
    )
    .unwrap();
    let err = Responses::default()
        .build_request(&conversation, false)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidConversation(_)));
}

#[test]
fn structured_output_uses_text_format() {
    let conversation = Conversation::new("gpt-4.1")
        .user("colors")
        .with_options(
            Options::default()
                .max_tokens(100)
                .response_format(ResponseFormat::new("colors", json!({ "type": "object" }))),
        );
    let request = Responses::default()
        .build_request(&conversation, true)
        .unwrap();
    assert_eq!(request.body["max_output_tokens"], 100);
    assert_eq!(request.body["text"]["format"]["type"], "json_schema");
    assert_eq!(request.body["text"]["format"]["name"], "colors");
    assert_eq!(request.body["stream"], true);
}

#[test]
fn parse_output_blocks() {
    let body = json!({
        "id": "resp_1",
        "model": "gpt-4.1",
        "status": "completed",
        "output": [
            { "type": "reasoning", "summary": [{ "type": "summary_text", "text": "thinking" }] },
            { "type": "message", "role": "assistant", "content": [
                { "type": "output_text", "text": "Hello", "annotations": [] }
            ] },
            { "type": "function_call", "call_id": "fc_1", "name": "lookup", "arguments": "{\"q\":1}" },
            { "type": "web_search_call", "id": "ws_1" }
        ],
        "usage": {
            "input_tokens": 10,
            "output_tokens": 4,
            "total_tokens": 14,
            "output_tokens_details": { "reasoning_tokens": 2 }
        }
    });
    let response = Responses::default()
        .parse_response(&body.to_string())
        .unwrap();
    assert_eq!(response.content(), "Hello");
    assert_eq!(response.message().reasoning, "thinking");
    assert_eq!(response.tool_calls()[0].id, "fc_1");
    assert_eq!(response.stop_reason(), Some(&StopReason::ToolCalls));
    assert_eq!(response.usage().reasoning_tokens, Some(2));
}

#[test]
fn incomplete_maps_to_length() {
    let body = json!({
        "id": "resp_2",
        "status": "incomplete",
        "incomplete_details": { "reason": "max_output_tokens" },
        "output": [{ "type": "message", "content": [{ "type": "output_text", "text": "Hel" }] }]
    });
    let response = Responses::default()
        .parse_response(&body.to_string())
        .unwrap();
    assert_eq!(response.stop_reason(), Some(&StopReason::Length));
}

#[test]
fn failed_response_is_an_error() {
    let body = json!({
        "id": "resp_3",
        "status": "failed",
        "error": null,
        "output": []
    });
    let err = Responses::default()
        .parse_response(&body.to_string())
        .unwrap_err();
    assert!(matches!(err, Error::ProviderApi { .. }));
}

#[test]
fn stream_events() {
    let events = [
        json!({ "type": "response.created", "response": { "id": "resp_1", "model": "gpt-4.1", "status": "in_progress", "output": [] } }),
        json!({ "type": "response.output_text.delta", "output_index": 0, "delta": "Hi " }),
        json!({ "type": "response.output_text.delta", "output_index": 0, "delta": "there" }),
        json!({ "type": "response.output_item.added", "output_index": 1, "item": {
            "type": "function_call", "call_id": "fc_9", "name": "lookup", "arguments": ""
        } }),
        json!({ "type": "response.function_call_arguments.delta", "output_index": 1, "delta": "{\"q\":" }),
        json!({ "type": "response.function_call_arguments.delta", "output_index": 1, "delta": "2}" }),
        json!({ "type": "response.completed", "response": {
            "id": "resp_1", "status": "completed", "output": [],
            "usage": { "input_tokens": 3, "output_tokens": 5, "total_tokens": 8 }
        } }),
    ];
    let adapter = Responses::default();
    let mut builder = MessageBuilder::new();
    let mut text = String::new();
    let mut finished = false;
    for event in events {
        let raw = RawEvent {
            event: event["type"].as_str().map(str::to_owned),
            data: event.to_string(),
        };
        let (delta, done) = adapter.process_stream_chunk(&raw, &mut builder).unwrap();
        text.push_str(delta.as_deref().unwrap_or_default());
        finished = done;
    }
    assert!(finished);
    assert_eq!(text, "Hi there");

    let response = builder.build("openai").unwrap();
    assert_eq!(response.id(), Some("resp_1"));
    assert_eq!(response.tool_calls()[0].id, "fc_9");
    assert_eq!(response.tool_calls()[0].arguments, json!({ "q": 2 }));
    assert_eq!(response.stop_reason(), Some(&StopReason::ToolCalls));
    assert_eq!(response.usage().total_tokens, 8);
}

#[test]
fn stream_error_event_fails() {
    let event = json!({ "type": "error", "code": "rate_limit_exceeded", "message": "slow down" });
    let err = Responses::default()
        .decode_event(&RawEvent::data(event.to_string()))
        .unwrap_err();
    assert_eq!(err.category(), Some(ErrorCategory::RateLimit));
}
