//! Tool execution seam and the closure-backed [`Toolbox`].

use crate::validate;
use compact_str::CompactString;
use serde_json::Value;
use std::{collections::BTreeMap, future::Future, pin::Pin, sync::Arc};
use ucore::{Tool, ToolCall};

/// Per-call context handed to a tool executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolContext {
    /// Id of the call being answered
    pub call_id: CompactString,
    /// Name of the requested tool
    pub tool: CompactString,
    /// Loop iteration that produced the call, starting at 0
    pub iteration: usize,
    /// Position of the call within its assistant message
    pub position: usize,
}

/// Runs the tools a model asks for.
///
/// Failures are not fatal: the tool loop turns them into error tool
/// results and keeps going. For tools declared on the conversation the
/// loop checks arguments against the schema before `call` runs.
pub trait ToolExecutor: Send + Sync {
    /// Execute one tool call.
    fn call(
        &self,
        call: &ToolCall,
        ctx: &ToolContext,
    ) -> impl Future<Output = anyhow::Result<Value>> + Send;

    /// Definitions of the tools this executor serves.
    fn tools(&self) -> Vec<Tool> {
        Vec::new()
    }
}

/// No tools. Every call fails as unknown.
impl ToolExecutor for () {
    async fn call(&self, call: &ToolCall, _ctx: &ToolContext) -> anyhow::Result<Value> {
        anyhow::bail!("tool '{}' is not available", call.name)
    }
}

/// A type-erased async tool handler.
pub type Handler = Arc<
    dyn Fn(Value, ToolContext) -> Pin<Box<dyn Future<Output = anyhow::Result<Value>> + Send>>
        + Send
        + Sync,
>;

/// Tools backed by registered async closures.
///
/// Arguments are validated against the tool's parameter schema before
/// the handler runs.
#[derive(Clone, Default)]
pub struct Toolbox {
    tools: BTreeMap<CompactString, (Tool, Handler)>,
}

impl Toolbox {
    /// Create an empty toolbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool with its handler, replacing any tool of the same name.
    pub fn register<F, Fut>(&mut self, tool: Tool, handler: F)
    where
        F: Fn(Value, ToolContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        let name = tool.name.clone();
        let handler: Handler = Arc::new(move |args, ctx| Box::pin(handler(args, ctx)));
        self.tools.insert(name, (tool, handler));
    }

    /// Builder form of [`Toolbox::register`].
    pub fn with<F, Fut>(mut self, tool: Tool, handler: F) -> Self
    where
        F: Fn(Value, ToolContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        self.register(tool, handler);
        self
    }

    /// Get a tool definition by name.
    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name).map(|(tool, _)| tool)
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether no tools are registered.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl ToolExecutor for Toolbox {
    async fn call(&self, call: &ToolCall, ctx: &ToolContext) -> anyhow::Result<Value> {
        let Some((tool, handler)) = self.tools.get(call.name.as_str()) else {
            anyhow::bail!("tool '{}' is not available", call.name);
        };

        validate::validate(tool.schema(), &call.arguments)
            .map_err(|reason| anyhow::anyhow!("invalid arguments for '{}': {reason}", call.name))?;
        handler(call.arguments.clone(), ctx.clone()).await
    }

    fn tools(&self) -> Vec<Tool> {
        self.tools.values().map(|(tool, _)| tool.clone()).collect()
    }
}

impl std::fmt::Debug for Toolbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Toolbox")
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .finish()
    }
}
