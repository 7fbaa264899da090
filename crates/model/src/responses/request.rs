//! Responses request body.

use crate::{Framing, WireRequest, adapter::merge_extras};
use serde_json::{Map, Value, json};
use ucore::{Content, Conversation, MediaSource, Message, Part, Result, Role, ToolChoice};

/// Build the request for a conversation.
///
/// System messages become `instructions`; everything else is an `input`
/// item in conversation order.
pub fn build(conversation: &Conversation, stream: bool) -> Result<WireRequest> {
    let mut instructions = Vec::new();
    let mut input = Vec::new();
    for message in conversation.messages() {
        match message.role {
            Role::System => instructions.push(message.text_only("openai responses")?),
            Role::User => input.push(json!({
                "type": "message",
                "role": "user",
                "content": content(&message.content),
            })),
            Role::Assistant => assistant(message, &mut input)?,
            Role::Tool => input.push(json!({
                "type": "function_call_output",
                "call_id": message.tool_call_id,
                "output": output(&message.content),
            })),
        }
    }

    let options = &conversation.options;
    let mut body = Map::new();
    body.insert("model".into(), json!(options.model));
    if !instructions.is_empty() {
        body.insert("instructions".into(), json!(instructions.join("\n\n")));
    }
    body.insert("input".into(), Value::Array(input));
    if let Some(temperature) = options.temperature {
        body.insert("temperature".into(), json!(temperature));
    }
    if let Some(top_p) = options.top_p {
        body.insert("top_p".into(), json!(top_p));
    }
    if let Some(max_tokens) = options.max_tokens {
        body.insert("max_output_tokens".into(), json!(max_tokens));
    }
    if !conversation.tools.is_empty() {
        let tools = conversation
            .tools
            .iter()
            .map(|tool| {
                json!({
                    "type": "function",
                    "name": tool.name,
                    "description": tool.description,
                    "parameters": tool.schema(),
                    "strict": tool.strict,
                })
            })
            .collect::<Vec<_>>();
        body.insert("tools".into(), json!(tools));
        if let Some(choice) = &options.tool_choice {
            let choice = match choice {
                ToolChoice::Auto => json!("auto"),
                ToolChoice::Any => json!("required"),
                ToolChoice::Tool(name) => json!({ "type": "function", "name": name }),
            };
            body.insert("tool_choice".into(), choice);
        }
    }
    if let Some(format) = &options.response_format {
        body.insert(
            "text".into(),
            json!({
                "format": {
                    "type": "json_schema",
                    "name": format.name,
                    "schema": format.schema,
                    "strict": format.strict,
                },
            }),
        );
    }
    if stream {
        body.insert("stream".into(), json!(true));
    }

    let mut body = Value::Object(body);
    merge_extras(&mut body, conversation);
    Ok(WireRequest::new(super::PATH, body, stream, Framing::Sse))
}

/// Assistant text becomes an output message; each tool call its own item.
fn assistant(message: &Message, input: &mut Vec<Value>) -> Result<()> {
    if !message.content.is_empty() {
        let text = message.text_only("openai responses")?;
        input.push(json!({
            "type": "message",
            "role": "assistant",
            "content": [{ "type": "output_text", "text": text }],
        }));
    }
    for call in &message.tool_calls {
        input.push(json!({
            "type": "function_call",
            "call_id": call.id,
            "name": call.name,
            "arguments": call.arguments_json(),
        }));
    }
    Ok(())
}

/// Tool output: a string, or input parts when the result carries media.
fn output(tool_content: &Content) -> Value {
    if tool_content.is_multimodal() {
        content(tool_content)
    } else {
        json!(tool_content.text())
    }
}

fn content(content: &Content) -> Value {
    let parts = content
        .parts()
        .iter()
        .map(|part| match part {
            Part::Text { text } => json!({ "type": "input_text", "text": text }),
            Part::Image { source } => json!({
                "type": "input_image",
                "image_url": source.data_url(),
            }),
            Part::File { source, name } => {
                let mut file = match source {
                    MediaSource::Url { url, .. } => {
                        json!({ "type": "input_file", "file_url": url })
                    }
                    MediaSource::Base64 { .. } => {
                        json!({ "type": "input_file", "file_data": source.data_url() })
                    }
                };
                if let Some(name) = name {
                    file["filename"] = json!(name);
                }
                file
            }
        })
        .collect::<Vec<_>>();
    Value::Array(parts)
}
