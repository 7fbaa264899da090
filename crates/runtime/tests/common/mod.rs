//! Scripted model and tools shared by the runtime tests.

#![allow(dead_code)]

use futures_util::{StreamExt, stream::BoxStream};
use serde_json::{Value, json};
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};
use ucore::{
    Conversation, MessageBuilder, Model, Response, Result, StopReason, StreamChunk, Tool,
    ToolCallDelta, Usage,
};
use ullm_runtime::{ToolContext, Toolbox};

/// One scripted backend turn.
pub enum Step {
    /// Answer with these chunks.
    Reply(Vec<StreamChunk>),
    /// Never answer.
    Hang,
}

/// A model that replays a script and records what it was sent.
#[derive(Clone, Default)]
pub struct Scripted {
    steps: Arc<Mutex<VecDeque<Step>>>,
    seen: Arc<Mutex<Vec<Conversation>>>,
}

impl Scripted {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            steps: Arc::new(Mutex::new(steps.into_iter().collect())),
            seen: Arc::default(),
        }
    }

    /// Conversations received, one per request.
    pub fn seen(&self) -> Vec<Conversation> {
        self.seen.lock().unwrap().clone()
    }

    fn next(&self, conversation: &Conversation) -> Step {
        self.seen.lock().unwrap().push(conversation.clone());
        self.steps
            .lock()
            .unwrap()
            .pop_front()
            .expect("script exhausted")
    }
}

impl Model for Scripted {
    async fn send(&self, conversation: &Conversation) -> Result<Response> {
        let chunks = match self.next(conversation) {
            Step::Reply(chunks) => chunks,
            Step::Hang => return std::future::pending().await,
        };

        let mut builder = MessageBuilder::new();
        for chunk in &chunks {
            builder.accept(chunk)?;
        }
        builder.build("scripted")
    }

    fn stream(
        &self,
        conversation: &Conversation,
    ) -> impl futures_util::stream::Stream<Item = Result<StreamChunk>> + Send {
        let stream: BoxStream<'static, Result<StreamChunk>> = match self.next(conversation) {
            Step::Reply(chunks) => futures_util::stream::iter(chunks.into_iter().map(Ok)).boxed(),
            Step::Hang => futures_util::stream::pending().boxed(),
        };
        stream
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// A plain text answer.
pub fn text(content: &str) -> Step {
    Step::Reply(vec![
        StreamChunk::Content(content.into()),
        StreamChunk::Usage(Usage::new(10, 5)),
        StreamChunk::Stop(StopReason::Stop),
        StreamChunk::Done,
    ])
}

/// An answer requesting the given tool calls, without backend ids.
pub fn calls(requested: &[(&str, Value)]) -> Step {
    let mut chunks: Vec<StreamChunk> = requested
        .iter()
        .enumerate()
        .map(|(index, (name, args))| {
            StreamChunk::ToolCall(ToolCallDelta {
                index: Some(index as u32),
                id: None,
                name: Some((*name).into()),
                arguments: args.to_string(),
            })
        })
        .collect();
    chunks.push(StreamChunk::Done);
    Step::Reply(chunks)
}

/// A `weather` tool requiring a `city`, recording every context it sees.
pub fn weather(contexts: Arc<Mutex<Vec<ToolContext>>>) -> Toolbox {
    let tool = Tool::new(
        "weather",
        "Current weather for a city",
        schemars::json_schema!({
            "type": "object",
            "required": ["city"],
            "properties": { "city": { "type": "string" } }
        }),
    );
    Toolbox::new().with(tool, move |args, ctx| {
        contexts.lock().unwrap().push(ctx);
        async move { anyhow::Ok(json!({ "city": args["city"], "celsius": 21 })) }
    })
}
