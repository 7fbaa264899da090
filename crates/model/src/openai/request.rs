//! Chat completions request body.

use crate::{Framing, WireRequest, adapter::merge_extras};
use serde_json::{Map, Value, json};
use ucore::{
    Content, Conversation, Error, MediaSource, Message, Part, Result, Role, Tool, ToolChoice,
};

/// Build the request for a conversation.
pub fn build(provider: &str, conversation: &Conversation, stream: bool) -> Result<WireRequest> {
    let messages = conversation
        .messages()
        .iter()
        .map(|message| self::message(provider, message))
        .collect::<Result<Vec<_>>>()?;

    let options = &conversation.options;
    let mut body = Map::new();
    body.insert("model".into(), json!(options.model));
    body.insert("messages".into(), Value::Array(messages));
    if let Some(temperature) = options.temperature {
        body.insert("temperature".into(), json!(temperature));
    }
    if let Some(top_p) = options.top_p {
        body.insert("top_p".into(), json!(top_p));
    }
    if let Some(max_tokens) = options.max_tokens {
        body.insert("max_tokens".into(), json!(max_tokens));
    }
    if !options.stop.is_empty() {
        body.insert("stop".into(), json!(options.stop));
    }
    if !conversation.tools.is_empty() {
        body.insert("tools".into(), tools(&conversation.tools));
        if let Some(choice) = &options.tool_choice {
            body.insert("tool_choice".into(), tool_choice(choice));
        }
    }
    if let Some(format) = &options.response_format {
        body.insert(
            "response_format".into(),
            json!({
                "type": "json_schema",
                "json_schema": {
                    "name": format.name,
                    "schema": format.schema,
                    "strict": format.strict,
                },
            }),
        );
    }
    if stream {
        body.insert("stream".into(), json!(true));
        body.insert("stream_options".into(), json!({ "include_usage": true }));
    }

    let mut body = Value::Object(body);
    merge_extras(&mut body, conversation);
    Ok(WireRequest::new(super::PATH, body, stream, Framing::Sse))
}

fn message(provider: &str, message: &Message) -> Result<Value> {
    let value = match message.role {
        Role::System => json!({
            "role": "system",
            "content": message.text_only(provider)?,
        }),
        Role::User => json!({
            "role": "user",
            "content": content(provider, &message.content)?,
        }),
        Role::Assistant => {
            let content = if message.content.is_empty() {
                Value::Null
            } else {
                json!(message.text_only(provider)?)
            };
            let mut value = json!({ "role": "assistant", "content": content });
            if !message.tool_calls.is_empty() {
                let calls = message
                    .tool_calls
                    .iter()
                    .map(|call| {
                        json!({
                            "id": call.id,
                            "type": "function",
                            "function": {
                                "name": call.name,
                                "arguments": call.arguments_json(),
                            },
                        })
                    })
                    .collect::<Vec<_>>();
                value["tool_calls"] = json!(calls);
            }
            value
        }
        Role::Tool => json!({
            "role": "tool",
            "tool_call_id": message.tool_call_id,
            "content": message.text_only(provider)?,
        }),
    };
    Ok(value)
}

/// A bare string for single-text content, typed blocks otherwise.
fn content(provider: &str, content: &Content) -> Result<Value> {
    if let Some(text) = content.single_text() {
        return Ok(json!(text));
    }

    let blocks = content
        .parts()
        .iter()
        .map(|part| match part {
            Part::Text { text } => Ok(json!({ "type": "text", "text": text })),
            Part::Image { source } => Ok(json!({
                "type": "image_url",
                "image_url": { "url": source.data_url() },
            })),
            Part::File {
                source: source @ MediaSource::Base64 { .. },
                name,
            } => {
                let mut file = json!({ "file_data": source.data_url() });
                if let Some(name) = name {
                    file["filename"] = json!(name);
                }
                Ok(json!({ "type": "file", "file": file }))
            }
            Part::File {
                source: MediaSource::Url { url, .. },
                ..
            } => Err(Error::InvalidConversation(format!(
                "{provider} chat completions accepts files only as inline data, got {url}"
            ))),
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Value::Array(blocks))
}

fn tools(tools: &[Tool]) -> Value {
    let tools = tools
        .iter()
        .map(|tool| {
            let mut function = json!({
                "name": tool.name,
                "description": tool.description,
                "parameters": tool.schema(),
            });
            if tool.strict {
                function["strict"] = json!(true);
            }
            json!({
                "type": "function",
                "function": function,
            })
        })
        .collect::<Vec<_>>();
    json!(tools)
}

fn tool_choice(choice: &ToolChoice) -> Value {
    match choice {
        ToolChoice::Auto => json!("auto"),
        ToolChoice::Any => json!("required"),
        ToolChoice::Tool(name) => json!({
            "type": "function",
            "function": { "name": name },
        }),
    }
}
