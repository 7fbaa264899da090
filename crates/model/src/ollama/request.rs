//! Request body for `/api/chat`.

use crate::{Framing, WireRequest, adapter::merge_extras};
use serde_json::{Map, Value, json};
use ucore::{Conversation, Error, MediaSource, Message, Part, Result, Role};

/// Build the request.
///
/// Images must be inline base64; Ollama cannot fetch URLs and has no file
/// input. `stream` is always sent because Ollama streams by default.
pub fn build(conversation: &Conversation, stream: bool) -> Result<WireRequest> {
    let messages = conversation
        .messages()
        .iter()
        .map(|message| self::message(conversation, message))
        .collect::<Result<Vec<_>>>()?;

    let options = &conversation.options;
    let mut body = Map::new();
    body.insert("model".into(), json!(options.model));
    body.insert("messages".into(), Value::Array(messages));
    body.insert("stream".into(), json!(stream));

    if !conversation.tools.is_empty() {
        let tools = conversation
            .tools
            .iter()
            .map(|tool| {
                json!({
                    "type": "function",
                    "function": {
                        "name": tool.name,
                        "description": tool.description,
                        "parameters": tool.schema(),
                    },
                })
            })
            .collect::<Vec<_>>();
        body.insert("tools".into(), json!(tools));
    }
    if let Some(format) = &options.response_format {
        body.insert("format".into(), format.schema.clone());
    }

    let mut sampling = Map::new();
    if let Some(temperature) = options.temperature {
        sampling.insert("temperature".into(), json!(temperature));
    }
    if let Some(top_p) = options.top_p {
        sampling.insert("top_p".into(), json!(top_p));
    }
    if let Some(max_tokens) = options.max_tokens {
        sampling.insert("num_predict".into(), json!(max_tokens));
    }
    if !options.stop.is_empty() {
        sampling.insert("stop".into(), json!(options.stop));
    }
    if !sampling.is_empty() {
        body.insert("options".into(), Value::Object(sampling));
    }

    let mut body = Value::Object(body);
    merge_extras(&mut body, conversation);
    Ok(WireRequest::new(super::PATH, body, stream, Framing::Ndjson))
}

fn message(conversation: &Conversation, message: &Message) -> Result<Value> {
    let mut wire = json!({ "role": message.role.as_str(), "content": message.text() });

    let mut images = Vec::new();
    for part in message.content.parts() {
        match part {
            Part::Text { .. } => {}
            Part::Image {
                source: MediaSource::Base64 { data, .. },
            } => images.push(data),
            Part::Image { .. } => {
                return Err(Error::InvalidConversation(
                    "ollama accepts only base64 images".into(),
                ));
            }
            Part::File { .. } => {
                return Err(Error::InvalidConversation(
                    "ollama does not accept file parts".into(),
                ));
            }
        }
    }
    if !images.is_empty() {
        wire["images"] = json!(images);
    }

    if !message.tool_calls.is_empty() {
        let calls = message
            .tool_calls
            .iter()
            .map(|call| {
                json!({
                    "function": { "name": call.name, "arguments": call.arguments },
                })
            })
            .collect::<Vec<_>>();
        wire["tool_calls"] = json!(calls);
    }
    if message.role == Role::Tool
        && let Some(name) = message
            .tool_call_id
            .as_deref()
            .and_then(|id| conversation.tool_name_for(id))
    {
        wire["tool_name"] = json!(name);
    }
    Ok(wire)
}
