//! Tests for the Gemini adapter.

use serde_json::json;
use ucore::{
    Conversation, Error, ErrorCategory, MediaSource, Message, MessageBuilder, Options, Part,
    ResponseFormat, StopReason, Tool, ToolCall, ToolChoice,
};
use ullm_model::{Adapter, Gemini, RawEvent};

#[test]
fn request_shape() {
    let mut conversation = Conversation::new("gemini-2.5-flash")
        .system("be brief")
        .user(vec![
            Part::text("what is in this file?"),
            Part::file(
                MediaSource::Url {
                    url: "gs://bucket/report.pdf".into(),
                    media_type: Some("application/pdf".into()),
                },
                None,
            ),
        ])
        .with_tools(vec![Tool::new(
            "lookup",
            "Look something up",
            schemars::json_schema!({
                "$schema": "https://json-schema.org/draft/2020-12/schema",
                "type": "object",
                "additionalProperties": false,
                "properties": { "q": { "type": "string" } }
            }),
        )]);
    conversation.options.tool_choice = Some(ToolChoice::Tool("lookup".into()));
    conversation.options.temperature = Some(0.5);
    conversation
        .push(Message::assistant("").with_tool_calls(vec![ToolCall::new(
            "call_1",
            "lookup",
            json!({ "q": "report" }),
        )]))
        .unwrap();
    conversation.push(Message::tool("42", "call_1")).unwrap();

    let request = Gemini.build_request(&conversation, false).unwrap();
    assert_eq!(request.path, "/models/gemini-2.5-flash:generateContent");
    assert!(request.query.is_empty());

    let body = &request.body;
    assert_eq!(body["systemInstruction"], json!({ "parts": [{ "text": "be brief" }] }));
    assert_eq!(
        body["contents"],
        json!([
            { "role": "user", "parts": [
                { "text": "what is in this file?" },
                { "fileData": { "fileUri": "gs://bucket/report.pdf", "mimeType": "application/pdf" } },
            ] },
            { "role": "model", "parts": [
                { "functionCall": { "name": "lookup", "args": { "q": "report" } } },
            ] },
            { "role": "user", "parts": [
                { "functionResponse": { "name": "lookup", "response": { "content": 42 } } },
            ] },
        ])
    );
    assert_eq!(
        body["tools"][0]["functionDeclarations"][0]["parameters"],
        json!({ "type": "object", "properties": { "q": { "type": "string" } } })
    );
    assert_eq!(
        body["toolConfig"]["functionCallingConfig"],
        json!({ "mode": "ANY", "allowedFunctionNames": ["lookup"] })
    );
    assert_eq!(body["generationConfig"]["temperature"], 0.5);
}

#[test]
fn media_outside_user_turns_is_rejected() {
    let conversation = Conversation::from_messages(
        "gemini-2.5-flash",
        vec![
            Message::system(vec![
                Part::text("look"),
                Part::image_url("https://example.com/cat.png"),
            ]),
            Message::user("hi"),
        ],
    )
    .unwrap();
    let err = Gemini::default()
        .build_request(&conversation, false)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidConversation(_)));

    let mut conversation = Conversation::new("gemini-2.5-flash").user("draw");
    conversation
        .push(Message::assistant("").with_tool_calls(vec![ToolCall::new(
            "call_1",
            "draw",
            json!({}),
        )]))
        .unwrap();
    conversation
        .push(Message {
            content: vec![Part::image_base64("image/png", "iVBOR")].into(),
            ..Message::tool("", "call_1")
        })
        .unwrap();
    let err = Gemini::default()
        .build_request(&conversation, false)
        .unwrap_err();
    assert!(err.to_string().contains("tool messages"));
}

#[test]
fn streaming_path_and_structured_output() {
    let conversation = Conversation::new("gemini-2.5-pro").user("colors").with_options(
        Options {
            model: "gemini-2.5-pro".into(),
            ..Options::default().response_format(ResponseFormat::new(
                "colors",
                json!({ "type": "array", "title": "Colors" }),
            ))
        },
    );
    let request = Gemini.build_request(&conversation, true).unwrap();
    assert_eq!(request.path, "/models/gemini-2.5-pro:streamGenerateContent");
    assert_eq!(request.query, vec![("alt".to_owned(), "sse".to_owned())]);
    assert_eq!(
        request.body["generationConfig"]["responseMimeType"],
        "application/json"
    );
    assert_eq!(
        request.body["generationConfig"]["responseSchema"],
        json!({ "type": "array" })
    );
}

#[test]
fn parse_candidates() {
    let body = json!({
        "candidates": [{
            "content": { "role": "model", "parts": [
                { "text": "plan", "thought": true },
                { "text": "Here you go. " },
                { "functionCall": { "name": "lookup", "args": { "q": "x" } } }
            ] },
            "finishReason": "STOP"
        }],
        "usageMetadata": {
            "promptTokenCount": 7,
            "candidatesTokenCount": 5,
            "totalTokenCount": 15,
            "thoughtsTokenCount": 3
        },
        "modelVersion": "gemini-2.5-flash",
        "responseId": "r-1"
    });
    let response = Gemini.parse_response(&body.to_string()).unwrap();
    assert_eq!(response.content(), "Here you go. ");
    assert_eq!(response.message().reasoning, "plan");
    assert_eq!(response.tool_calls()[0].name, "lookup");
    assert_eq!(response.tool_calls()[0].id, "");
    assert_eq!(response.stop_reason(), Some(&StopReason::ToolCalls));
    assert_eq!(response.usage().completion_tokens, 8);
    assert_eq!(response.usage().total_tokens, 15);
    assert_eq!(response.usage().reasoning_tokens, Some(3));
    assert_eq!(response.model(), Some("gemini-2.5-flash"));
}

#[test]
fn safety_stop_is_content_filter() {
    let body = json!({
        "candidates": [{ "finishReason": "SAFETY" }],
        "modelVersion": "gemini-2.5-flash"
    });
    let response = Gemini.parse_response(&body.to_string()).unwrap();
    assert_eq!(response.stop_reason(), Some(&StopReason::ContentFilter));

    let blocked = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
    let response = Gemini.parse_response(&blocked.to_string()).unwrap();
    assert_eq!(response.stop_reason(), Some(&StopReason::ContentFilter));
}

#[test]
fn stream_ends_on_finish_reason() {
    let frames = [
        json!({ "candidates": [{ "content": { "parts": [{ "text": "Hel" }] } }], "modelVersion": "gemini-2.5-flash" }),
        json!({ "candidates": [{ "content": { "parts": [
            { "text": "lo" },
            { "functionCall": { "name": "lookup", "args": { "q": "a" } } },
            { "functionCall": { "name": "lookup", "args": { "q": "b" } } }
        ] }, "finishReason": "STOP" }],
          "usageMetadata": { "promptTokenCount": 4, "candidatesTokenCount": 6, "totalTokenCount": 10 } }),
    ];
    let mut builder = MessageBuilder::new();
    let mut finished = false;
    for frame in frames {
        let (_, done) = Gemini
            .process_stream_chunk(&RawEvent::data(frame.to_string()), &mut builder)
            .unwrap();
        finished = done;
    }
    assert!(finished);

    let response = builder.build("gemini").unwrap();
    assert_eq!(response.content(), "Hello");
    assert_eq!(response.tool_calls().len(), 2);
    assert_eq!(response.tool_calls()[1].arguments, json!({ "q": "b" }));
    assert_eq!(response.stop_reason(), Some(&StopReason::ToolCalls));
    assert_eq!(response.usage().total_tokens, 10);

    // Ids are assigned when the message joins the conversation.
    let mut conversation = Conversation::new("gemini-2.5-flash").user("hi");
    conversation.push(response.into_message()).unwrap();
    let calls = &conversation.last().unwrap().tool_calls;
    assert_eq!(calls[0].id, "call_1_0");
    assert_eq!(calls[1].id, "call_1_1");
}

#[test]
fn error_status_is_classified() {
    let body = json!({
        "error": { "code": 429, "message": "Resource has been exhausted", "status": "RESOURCE_EXHAUSTED" }
    });
    let err = Gemini.parse_error(429, &body.to_string());
    assert_eq!(err.category(), Some(ErrorCategory::RateLimit));
}
