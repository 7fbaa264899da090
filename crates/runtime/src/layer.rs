//! Tower-inspired middleware over [`Execute`].
//!
//! A [`Layer`] wraps one executor into another. [`ObserveLayer`] is the
//! built-in one: it reports run lifecycle [`Event`]s, including every
//! [`LoopState`] transition of the tool loop underneath, to an
//! [`Observer`].
//!
//! ```rust,ignore
//! use ullm_runtime::{Engine, Layer, ObserveLayer, TracingObserver};
//!
//! let engine = ObserveLayer(TracingObserver).layer(Engine::new(registry, toolbox));
//! let response = engine.execute(&mut conversation, &config).await?;
//! ```

use crate::{Execute, LoopState, RunConfig, StreamSink, ToolContext};
use serde_json::Value;
use std::sync::Arc;
use ucore::{Conversation, Error, Response, Result};

/// A layer that transforms one executor into another.
///
/// Layers compose by nesting; the resulting type is fully monomorphized.
pub trait Layer<E: Execute> {
    /// The wrapped executor type produced by this layer.
    type Execute: Execute;

    /// Wrap the inner executor.
    fn layer(self, inner: E) -> Self::Execute;
}

/// A lifecycle event of one run.
#[derive(Debug)]
pub enum Event<'a> {
    /// A run was accepted.
    Started {
        /// Symbolic provider name
        provider: &'a str,
        /// Requested model
        model: &'a str,
        /// Messages in the conversation at start
        messages: usize,
    },
    /// The tool loop moved to a new state.
    State {
        /// Zero-based request counter
        iteration: usize,
        /// The state entered
        state: LoopState,
    },
    /// A tool is about to run.
    ToolCalled {
        /// The call being answered
        ctx: &'a ToolContext,
        /// Parsed arguments
        arguments: &'a Value,
    },
    /// A tool produced its result message.
    ToolFinished {
        /// The call being answered
        ctx: &'a ToolContext,
        /// Result content appended to the conversation
        output: &'a str,
        /// The failure the output reports, if any
        error: Option<&'a Error>,
    },
    /// The run completed.
    Finished {
        /// The final response
        response: &'a Response,
    },
    /// The run failed.
    Failed {
        /// The failure
        error: &'a Error,
    },
}

/// Receives run events.
pub trait Observer: Send + Sync {
    /// Handle one event.
    fn on_event(&self, event: &Event<'_>);
}

impl<F> Observer for F
where
    F: Fn(&Event<'_>) + Send + Sync,
{
    fn on_event(&self, event: &Event<'_>) {
        self(event)
    }
}

/// Reports events as structured `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn on_event(&self, event: &Event<'_>) {
        match event {
            Event::Started {
                provider,
                model,
                messages,
            } => tracing::info!(provider, model, messages, "run started"),
            Event::State { iteration, state } => {
                tracing::debug!(iteration, ?state, "loop state")
            }
            Event::ToolCalled { ctx, arguments } => tracing::debug!(
                tool = %ctx.tool,
                call_id = %ctx.call_id,
                %arguments,
                "tool called"
            ),
            Event::ToolFinished {
                ctx,
                error: Some(error),
                ..
            } => tracing::warn!(tool = %ctx.tool, call_id = %ctx.call_id, "{error}"),
            Event::ToolFinished { ctx, output, .. } => tracing::debug!(
                tool = %ctx.tool,
                call_id = %ctx.call_id,
                bytes = output.len(),
                "tool finished"
            ),
            Event::Finished { response } => tracing::info!(
                stop = ?response.stop_reason(),
                prompt_tokens = response.usage().prompt_tokens,
                completion_tokens = response.usage().completion_tokens,
                "run finished"
            ),
            Event::Failed { error } => tracing::error!("run failed: {error}"),
        }
    }
}

/// Wraps an executor with an [`Observer`].
#[derive(Debug, Clone)]
pub struct ObserveLayer<O>(pub O);

impl<E: Execute, O: Observer + 'static> Layer<E> for ObserveLayer<O> {
    type Execute = Observed<E>;

    fn layer(self, inner: E) -> Observed<E> {
        Observed {
            inner,
            observer: Arc::new(self.0),
        }
    }
}

/// An executor whose runs are reported to an observer.
#[derive(Clone)]
pub struct Observed<E> {
    inner: E,
    observer: Arc<dyn Observer>,
}

impl<E> Observed<E> {
    /// The wrapped executor.
    pub fn inner(&self) -> &E {
        &self.inner
    }

    fn start(&self, conversation: &Conversation, config: &RunConfig) -> RunConfig {
        self.observer.on_event(&Event::Started {
            provider: &config.provider.provider,
            model: &config.provider.model,
            messages: conversation.len(),
        });
        config.clone().observe_shared(self.observer.clone())
    }

    fn finish(&self, result: &Result<Response>) {
        match result {
            Ok(response) => self.observer.on_event(&Event::Finished { response }),
            Err(error) => self.observer.on_event(&Event::Failed { error }),
        }
    }
}

impl<E: Execute> Execute for Observed<E> {
    async fn execute(
        &self,
        conversation: &mut Conversation,
        config: &RunConfig,
    ) -> Result<Response> {
        let config = self.start(conversation, config);
        let result = self.inner.execute(conversation, &config).await;
        self.finish(&result);
        result
    }

    async fn execute_streaming<S: StreamSink>(
        &self,
        conversation: &mut Conversation,
        config: &RunConfig,
        sink: &mut S,
    ) -> Result<Response> {
        let config = self.start(conversation, config);
        let result = self
            .inner
            .execute_streaming(conversation, &config, sink)
            .await;
        self.finish(&result);
        result
    }
}

impl<E: std::fmt::Debug> std::fmt::Debug for Observed<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observed")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}
