//! ullm runtime: the tool-call loop and its executor surface.
//!
//! [`ToolLoop`] drives a conversation through any [`ucore::Model`] until the
//! model answers without requesting tools. [`Engine`] resolves the model
//! from a [`model::Registry`] and implements [`Execute`], the seam that
//! [`Layer`]s such as [`ObserveLayer`] wrap.
//!
//! # Example
//!
//! ```rust,ignore
//! use ullm_runtime::{Engine, Execute, RunConfig, Toolbox};
//! use model::{ProviderConfig, Registry};
//! use ucore::Conversation;
//!
//! let engine = Engine::new(Registry::new(), toolbox);
//! let config = RunConfig::new(ProviderConfig::new("openai", "gpt-4o").api_key(key));
//! let mut conversation = Conversation::new("gpt-4o").user("What's the weather in Paris?");
//! let response = engine.execute(&mut conversation, &config).await?;
//! ```

pub use engine::{Engine, Execute, RunConfig};
pub use layer::{Event, Layer, ObserveLayer, Observed, Observer, TracingObserver};
pub use sink::StreamSink;
pub use tool::{Handler, ToolContext, ToolExecutor, Toolbox};
pub use tool_loop::{LoopState, MAX_ITERATIONS, ToolLoop};
pub use validate::validate;

mod engine;
mod layer;
mod sink;
mod tool;
mod tool_loop;
mod validate;
