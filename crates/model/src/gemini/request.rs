//! Gemini request body.

use crate::{Framing, WireRequest, adapter::merge_extras};
use serde_json::{Map, Value, json};
use ucore::{Content, Conversation, Error, MediaSource, Message, Part, Result, Role, ToolChoice};

/// Schema keywords the Gemini schema dialect rejects.
const UNSUPPORTED_KEYWORDS: [&str; 4] = ["$schema", "additionalProperties", "$defs", "title"];

/// Build the request for a conversation.
///
/// Assistant turns use the `model` role. Tool results are sent as
/// `functionResponse` parts in a user turn, keyed by the tool name of the
/// call they answer.
pub fn build(conversation: &Conversation, stream: bool) -> Result<WireRequest> {
    let mut system = Vec::new();
    let mut contents: Vec<Value> = Vec::new();
    let mut results: Vec<Value> = Vec::new();

    for message in conversation.messages() {
        if message.role != Role::Tool && !results.is_empty() {
            contents.push(json!({ "role": "user", "parts": std::mem::take(&mut results) }));
        }
        match message.role {
            Role::System => system.push(json!({ "text": message.text_only("gemini")? })),
            Role::User => contents.push(json!({
                "role": "user",
                "parts": parts(&message.content),
            })),
            Role::Assistant => contents.push(assistant(message)?),
            Role::Tool => results.push(function_response(conversation, message)?),
        }
    }
    if !results.is_empty() {
        contents.push(json!({ "role": "user", "parts": results }));
    }

    let options = &conversation.options;
    let mut body = Map::new();
    if !system.is_empty() {
        body.insert("systemInstruction".into(), json!({ "parts": system }));
    }
    body.insert("contents".into(), Value::Array(contents));

    let mut generation = Map::new();
    if let Some(temperature) = options.temperature {
        generation.insert("temperature".into(), json!(temperature));
    }
    if let Some(top_p) = options.top_p {
        generation.insert("topP".into(), json!(top_p));
    }
    if let Some(max_tokens) = options.max_tokens {
        generation.insert("maxOutputTokens".into(), json!(max_tokens));
    }
    if !options.stop.is_empty() {
        generation.insert("stopSequences".into(), json!(options.stop));
    }
    if let Some(format) = &options.response_format {
        generation.insert("responseMimeType".into(), json!("application/json"));
        generation.insert("responseSchema".into(), clean_schema(&format.schema));
    }
    if !generation.is_empty() {
        body.insert("generationConfig".into(), Value::Object(generation));
    }

    if !conversation.tools.is_empty() {
        let declarations = conversation
            .tools
            .iter()
            .map(|tool| {
                json!({
                    "name": tool.name,
                    "description": tool.description,
                    "parameters": clean_schema(tool.schema()),
                })
            })
            .collect::<Vec<_>>();
        body.insert(
            "tools".into(),
            json!([{ "functionDeclarations": declarations }]),
        );
        if let Some(choice) = &options.tool_choice {
            let config = match choice {
                ToolChoice::Auto => json!({ "mode": "AUTO" }),
                ToolChoice::Any => json!({ "mode": "ANY" }),
                ToolChoice::Tool(name) => json!({
                    "mode": "ANY",
                    "allowedFunctionNames": [name],
                }),
            };
            body.insert(
                "toolConfig".into(),
                json!({ "functionCallingConfig": config }),
            );
        }
    }

    let mut body = Value::Object(body);
    merge_extras(&mut body, conversation);
    let model = &options.model;
    let request = if stream {
        WireRequest::new(
            format!("/models/{model}:streamGenerateContent"),
            body,
            true,
            Framing::Sse,
        )
        .query("alt", "sse")
    } else {
        WireRequest::new(
            format!("/models/{model}:generateContent"),
            body,
            false,
            Framing::Sse,
        )
    };
    Ok(request)
}

fn assistant(message: &Message) -> Result<Value> {
    let mut parts = Vec::new();
    let text = message.text_only("gemini")?;
    if !text.is_empty() {
        parts.push(json!({ "text": text }));
    }
    for call in &message.tool_calls {
        parts.push(json!({
            "functionCall": { "name": call.name, "args": call.arguments },
        }));
    }
    Ok(json!({ "role": "model", "parts": parts }))
}

/// A tool result as a `functionResponse` part.
///
/// The response must be an object: JSON object output is passed through,
/// anything else is wrapped as `{"content": ...}`.
fn function_response(conversation: &Conversation, message: &Message) -> Result<Value> {
    let id = message.tool_call_id.as_deref().unwrap_or_default();
    let name = conversation.tool_name_for(id).ok_or_else(|| {
        Error::InvalidConversation(format!("tool result for unknown call '{id}'"))
    })?;
    let text = message.text_only("gemini")?;
    let response = match serde_json::from_str::<Value>(&text) {
        Ok(value @ Value::Object(_)) => value,
        Ok(value) => json!({ "content": value }),
        Err(_) => json!({ "content": text }),
    };
    Ok(json!({
        "functionResponse": { "name": name, "response": response },
    }))
}

fn parts(content: &Content) -> Vec<Value> {
    content
        .parts()
        .iter()
        .map(|part| match part {
            Part::Text { text } => json!({ "text": text }),
            Part::Image { source } | Part::File { source, .. } => media(source),
        })
        .collect()
}

fn media(source: &MediaSource) -> Value {
    match source {
        MediaSource::Base64 { media_type, data } => json!({
            "inlineData": { "mimeType": media_type, "data": data },
        }),
        MediaSource::Url { url, media_type } => {
            let mut file = json!({ "fileUri": url });
            if let Some(media_type) = media_type {
                file["mimeType"] = json!(media_type);
            }
            json!({ "fileData": file })
        }
    }
}

/// Strip keywords Gemini rejects, recursively.
pub fn clean_schema(schema: &Value) -> Value {
    match schema {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(key, _)| !UNSUPPORTED_KEYWORDS.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), clean_schema(value)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(clean_schema).collect()),
        other => other.clone(),
    }
}
