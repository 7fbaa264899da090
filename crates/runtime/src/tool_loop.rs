//! The multi-turn tool-call loop.
//!
//! One run sends the conversation, appends the assistant message, executes
//! any requested tools in order, appends one tool result per call, and
//! repeats until the model answers without tools or the iteration limit
//! is hit.

use crate::{Event, Observer, RunConfig, StreamSink, ToolContext, ToolExecutor, validate};
use futures_util::StreamExt;
use serde_json::{Value, json};
use std::{future::Future, pin::pin, sync::Arc};
use tokio_util::sync::CancellationToken;
use ucore::{
    Conversation, Error, Message, MessageBuilder, Model, Response, Result, ToolCall, ToolChoice,
};

/// Default bound on model requests per run.
pub const MAX_ITERATIONS: usize = 16;

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoopState {
    /// Nothing sent yet
    Idle,
    /// A request is in flight
    Requesting,
    /// Deltas are arriving
    Streaming,
    /// The assistant message is complete and appended
    Parsed,
    /// Requested tools are running
    ExecutingTools,
    /// The model answered without tools
    Done,
    /// The run failed
    Failed,
}

/// Drives one conversation through a model and a tool executor.
pub struct ToolLoop<'a, M, T> {
    model: &'a M,
    tools: &'a T,
    max_iterations: usize,
    cancel: CancellationToken,
    observers: &'a [Arc<dyn Observer>],
}

impl<'a, M: Model, T: ToolExecutor> ToolLoop<'a, M, T> {
    /// A loop with the default limit and no cancellation.
    pub fn new(model: &'a M, tools: &'a T) -> Self {
        Self {
            model,
            tools,
            max_iterations: MAX_ITERATIONS,
            cancel: CancellationToken::new(),
            observers: &[],
        }
    }

    /// A loop with the limit, token and observers of `config`.
    pub fn with_config(model: &'a M, tools: &'a T, config: &'a RunConfig) -> Self {
        Self {
            model,
            tools,
            max_iterations: config.max_iterations,
            cancel: config.cancel.clone(),
            observers: config.observers(),
        }
    }

    /// Set the maximum number of model requests.
    pub fn max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    /// Set the cancellation token.
    pub fn cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Run to completion.
    ///
    /// Streams internally when `options.stream` is set, discarding deltas.
    pub async fn run(&self, conversation: &mut Conversation) -> Result<Response> {
        let stream = conversation.options.stream;
        self.drive(conversation, stream, &mut ()).await
    }

    /// Run to completion, streaming every request and forwarding deltas to
    /// `sink`.
    pub async fn run_streaming<S: StreamSink>(
        &self,
        conversation: &mut Conversation,
        sink: &mut S,
    ) -> Result<Response> {
        self.drive(conversation, true, sink).await
    }

    async fn drive<S: StreamSink>(
        &self,
        conversation: &mut Conversation,
        stream: bool,
        sink: &mut S,
    ) -> Result<Response> {
        let choice = conversation.options.tool_choice.clone();
        let forced = choice.as_ref().is_some_and(ToolChoice::is_forced);
        let result = self.iterate(conversation, forced, stream, sink).await;
        conversation.options.tool_choice = choice;
        result
    }

    async fn iterate<S: StreamSink>(
        &self,
        conversation: &mut Conversation,
        forced: bool,
        stream: bool,
        sink: &mut S,
    ) -> Result<Response> {
        self.transition(0, LoopState::Idle);
        for iteration in 0..self.max_iterations {
            // A forced choice would never let the model finish.
            if forced && iteration > 0 {
                conversation.options.tool_choice = Some(ToolChoice::Auto);
            }

            match self.turn(conversation, iteration, stream, sink).await {
                Ok(Some(response)) => {
                    self.transition(iteration, LoopState::Done);
                    return Ok(response);
                }
                Ok(None) => {}
                Err(err) => {
                    self.transition(iteration, LoopState::Failed);
                    return Err(err);
                }
            }
        }

        tracing::warn!("tool loop gave up after {} requests", self.max_iterations);
        self.transition(self.max_iterations, LoopState::Failed);
        Err(Error::ToolLoopExceeded {
            max: self.max_iterations,
        })
    }

    /// One request plus the tools it asks for. `Some` when the model is done.
    async fn turn<S: StreamSink>(
        &self,
        conversation: &mut Conversation,
        iteration: usize,
        stream: bool,
        sink: &mut S,
    ) -> Result<Option<Response>> {
        self.transition(iteration, LoopState::Requesting);
        let response = if stream {
            self.transition(iteration, LoopState::Streaming);
            self.stream_once(conversation, sink).await?
        } else {
            self.cancellable(self.model.send(conversation)).await??
        };
        self.transition(iteration, LoopState::Parsed);

        // Read the calls back after the push so they carry assigned ids.
        conversation.push(response.message().clone())?;
        let calls = conversation
            .last()
            .map(|message| message.tool_calls.clone())
            .unwrap_or_default();
        if calls.is_empty() {
            return Ok(Some(response));
        }

        self.transition(iteration, LoopState::ExecutingTools);
        for (position, call) in calls.iter().enumerate() {
            let ctx = ToolContext {
                call_id: call.id.clone(),
                tool: call.name.clone(),
                iteration,
                position,
            };
            self.emit(&Event::ToolCalled {
                ctx: &ctx,
                arguments: &call.arguments,
            });

            let result = match self.check(conversation, call) {
                Ok(()) => self
                    .cancellable(self.tools.call(call, &ctx))
                    .await?
                    .map_err(|err| Error::ToolExecution {
                        name: call.name.clone(),
                        message: format!("{err:#}"),
                    }),
                Err(err) => Err(err),
            };
            let message = match &result {
                Ok(Value::String(text)) => Message::tool(text.clone(), call.id.clone()),
                Ok(value) => Message::tool(value.to_string(), call.id.clone()),
                Err(err) => {
                    tracing::warn!("{err} ({})", call.id);
                    let report = json!({ "error": err.to_string() }).to_string();
                    Message::tool_error(report, call.id.clone())
                }
            };
            self.emit(&Event::ToolFinished {
                ctx: &ctx,
                output: &message.text(),
                error: result.as_ref().err(),
            });
            conversation.push(message)?;
        }

        Ok(None)
    }

    /// Check arguments against the declared schema before any executor runs.
    ///
    /// Calls to undeclared tools pass through; the executor decides.
    fn check(&self, conversation: &Conversation, call: &ToolCall) -> Result<()> {
        let Some(tool) = conversation.tool(&call.name) else {
            return Ok(());
        };
        validate(tool.schema(), &call.arguments).map_err(|reason| Error::ToolExecution {
            name: call.name.clone(),
            message: format!("invalid arguments: {reason}"),
        })
    }

    /// Stream one response, forwarding content deltas to `sink`.
    async fn stream_once<S: StreamSink>(
        &self,
        conversation: &Conversation,
        sink: &mut S,
    ) -> Result<Response> {
        let mut stream = pin!(self.model.stream(conversation));
        let mut builder = MessageBuilder::new();
        while let Some(chunk) = self.cancellable(stream.next()).await? {
            let chunk = chunk?;
            tracing::trace!("chunk: {chunk:?}");
            let delta = builder.accept(&chunk)?;
            let done = builder.is_complete();
            if delta.is_some() || done {
                sink.on_chunk(builder.message(), delta, done);
            }
            if done {
                break;
            }
        }

        builder.build(self.model.name())
    }

    /// Race `future` against the cancellation token.
    async fn cancellable<F: Future>(&self, future: F) -> Result<F::Output> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::Cancelled),
            output = future => Ok(output),
        }
    }

    fn transition(&self, iteration: usize, state: LoopState) {
        tracing::debug!(iteration, ?state, "tool loop");
        self.emit(&Event::State { iteration, state });
    }

    fn emit(&self, event: &Event<'_>) {
        for observer in self.observers {
            observer.on_event(event);
        }
    }
}
