//! Request body for the Anthropic Messages API.

use crate::{Framing, WireRequest, adapter::merge_extras};
use serde_json::{Map, Value, json};
use ucore::{Content, Conversation, MediaSource, Message, Part, Result, Role, ToolChoice};

/// Build the request, converting canonical messages to Anthropic content
/// block format.
///
/// System messages are lifted to the top-level `system` field. Runs of
/// tool results are folded into a single user turn, since the API expects
/// every result for one assistant turn in the next user message.
pub fn build(conversation: &Conversation, stream: bool) -> Result<WireRequest> {
    let mut system = Vec::new();
    let mut messages: Vec<Value> = Vec::new();
    let mut results: Vec<Value> = Vec::new();

    for message in conversation.messages() {
        if message.role != Role::Tool && !results.is_empty() {
            messages.push(json!({
                "role": "user",
                "content": std::mem::take(&mut results),
            }));
        }

        match message.role {
            Role::System => system.push(message.text_only("anthropic")?),
            Role::User => messages.push(json!({
                "role": "user",
                "content": content(&message.content),
            })),
            Role::Assistant => messages.push(assistant(message)?),
            Role::Tool => results.push(tool_result(message)),
        }
    }
    if !results.is_empty() {
        messages.push(json!({ "role": "user", "content": results }));
    }

    let options = &conversation.options;
    let mut body = Map::new();
    body.insert("model".into(), json!(options.model));
    body.insert(
        "max_tokens".into(),
        json!(options.max_tokens.unwrap_or(super::DEFAULT_MAX_TOKENS)),
    );
    if !system.is_empty() {
        body.insert("system".into(), json!(system.join("\n\n")));
    }
    body.insert("messages".into(), Value::Array(messages));
    if let Some(temperature) = options.temperature {
        body.insert("temperature".into(), json!(temperature));
    }
    if let Some(top_p) = options.top_p {
        body.insert("top_p".into(), json!(top_p));
    }
    if !options.stop.is_empty() {
        body.insert("stop_sequences".into(), json!(options.stop));
    }
    if !conversation.tools.is_empty() {
        let tools = conversation
            .tools
            .iter()
            .map(|tool| {
                json!({
                    "name": tool.name,
                    "description": tool.description,
                    "input_schema": tool.schema(),
                })
            })
            .collect::<Vec<_>>();
        body.insert("tools".into(), json!(tools));
        if let Some(choice) = &options.tool_choice {
            let choice = match choice {
                ToolChoice::Auto => json!({ "type": "auto" }),
                ToolChoice::Any => json!({ "type": "any" }),
                ToolChoice::Tool(name) => json!({ "type": "tool", "name": name }),
            };
            body.insert("tool_choice".into(), choice);
        }
    }
    if stream {
        body.insert("stream".into(), json!(true));
    }

    let mut body = Value::Object(body);
    merge_extras(&mut body, conversation);
    Ok(WireRequest::new(super::PATH, body, stream, Framing::Sse))
}

/// A `tool_result` block. Image and document parts travel as nested blocks.
fn tool_result(message: &Message) -> Value {
    let mut block = json!({
        "type": "tool_result",
        "tool_use_id": message.tool_call_id,
        "content": content(&message.content),
    });
    if message.is_error {
        block["is_error"] = json!(true);
    }
    block
}

fn assistant(message: &Message) -> Result<Value> {
    let mut content = Vec::new();
    let text = message.text_only("anthropic")?;
    if !text.is_empty() {
        content.push(json!({ "type": "text", "text": text }));
    }
    for call in &message.tool_calls {
        content.push(json!({
            "type": "tool_use",
            "id": call.id,
            "name": call.name,
            "input": call.arguments,
        }));
    }
    if content.is_empty() {
        content.push(json!({ "type": "text", "text": "" }));
    }
    Ok(json!({ "role": "assistant", "content": content }))
}

fn content(content: &Content) -> Value {
    if let Some(text) = content.single_text() {
        return json!(text);
    }

    let blocks = content
        .parts()
        .iter()
        .map(|part| match part {
            Part::Text { text } => json!({ "type": "text", "text": text }),
            Part::Image { source } => json!({ "type": "image", "source": self::source(source) }),
            Part::File { source, name } => {
                let mut block = json!({ "type": "document", "source": self::source(source) });
                if let Some(name) = name {
                    block["title"] = json!(name);
                }
                block
            }
        })
        .collect::<Vec<_>>();
    Value::Array(blocks)
}

fn source(source: &MediaSource) -> Value {
    match source {
        MediaSource::Url { url, .. } => json!({ "type": "url", "url": url }),
        MediaSource::Base64 { media_type, data } => json!({
            "type": "base64",
            "media_type": media_type,
            "data": data,
        }),
    }
}
