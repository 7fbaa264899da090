//! The executor surface: [`Execute`], [`RunConfig`] and [`Engine`].

use crate::{MAX_ITERATIONS, Observer, StreamSink, ToolExecutor, ToolLoop};
use model::{Provider, ProviderConfig, Registry};
use std::{future::Future, sync::Arc};
use tokio_util::sync::CancellationToken;
use ucore::{Conversation, Response, Result};

/// Immutable settings for one run.
#[derive(Clone)]
pub struct RunConfig {
    /// The backend to run against.
    pub provider: ProviderConfig,
    /// Bound on model requests.
    pub max_iterations: usize,
    /// Aborts the pending request or tool when cancelled.
    pub cancel: CancellationToken,
    observers: Vec<Arc<dyn Observer>>,
}

impl RunConfig {
    /// A run against `provider` with default limits.
    pub fn new(provider: ProviderConfig) -> Self {
        Self {
            provider,
            max_iterations: MAX_ITERATIONS,
            cancel: CancellationToken::new(),
            observers: Vec::new(),
        }
    }

    /// Set the maximum number of model requests.
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    /// Set the cancellation token.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Add an observer of loop events.
    pub fn observe(self, observer: impl Observer + 'static) -> Self {
        self.observe_shared(Arc::new(observer))
    }

    /// Observers attached to this run.
    pub fn observers(&self) -> &[Arc<dyn Observer>] {
        &self.observers
    }

    pub(crate) fn observe_shared(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observers.push(observer);
        self
    }
}

impl std::fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunConfig")
            .field("provider", &self.provider.provider)
            .field("model", &self.provider.model)
            .field("max_iterations", &self.max_iterations)
            .field("cancelled", &self.cancel.is_cancelled())
            .field("observers", &self.observers.len())
            .finish()
    }
}

/// Runs a conversation to completion.
///
/// Messages produced by the run (assistant turns and tool results) are
/// appended to `conversation`; nothing already in it is modified.
pub trait Execute: Send + Sync {
    /// Run without surfacing deltas.
    fn execute(
        &self,
        conversation: &mut Conversation,
        config: &RunConfig,
    ) -> impl Future<Output = Result<Response>> + Send;

    /// Run with streaming, forwarding deltas to `sink`.
    fn execute_streaming<S: StreamSink>(
        &self,
        conversation: &mut Conversation,
        config: &RunConfig,
        sink: &mut S,
    ) -> impl Future<Output = Result<Response>> + Send;
}

/// Resolves providers through a [`Registry`] and drives the tool loop.
#[derive(Debug, Clone)]
pub struct Engine<T> {
    registry: Registry,
    tools: T,
}

impl<T: ToolExecutor> Engine<T> {
    /// Create an engine over `registry` and `tools`.
    pub fn new(registry: Registry, tools: T) -> Self {
        Self { registry, tools }
    }

    /// The provider registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The tool executor.
    pub fn tools(&self) -> &T {
        &self.tools
    }

    /// Resolve the provider, and offer the executor's tools when the
    /// conversation declares none.
    fn prepare(&self, conversation: &mut Conversation, config: &RunConfig) -> Result<Provider> {
        let provider = self.registry.resolve(&config.provider)?;
        if conversation.tools.is_empty() {
            conversation.tools = self.tools.tools();
        }
        Ok(provider)
    }
}

impl<T: ToolExecutor> Execute for Engine<T> {
    async fn execute(
        &self,
        conversation: &mut Conversation,
        config: &RunConfig,
    ) -> Result<Response> {
        let provider = self.prepare(conversation, config)?;
        ToolLoop::with_config(&provider, &self.tools, config)
            .run(conversation)
            .await
    }

    async fn execute_streaming<S: StreamSink>(
        &self,
        conversation: &mut Conversation,
        config: &RunConfig,
        sink: &mut S,
    ) -> Result<Response> {
        let provider = self.prepare(conversation, config)?;
        ToolLoop::with_config(&provider, &self.tools, config)
            .run_streaming(conversation, sink)
            .await
    }
}
