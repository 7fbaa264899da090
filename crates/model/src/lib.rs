//! Backend adapters for the unified LLM interface.
//!
//! Each backend family implements [`Adapter`], translating the canonical
//! [`ucore::Conversation`] into its wire request and its wire responses
//! (complete or streamed) back into canonical [`ucore::Response`]s and
//! [`ucore::StreamChunk`]s. [`HttpProvider`] is the thin transport layer
//! (auth scheme, base URL, framing) and [`Provider`] binds the two into a
//! [`ucore::Model`]. The [`Registry`] resolves a [`ProviderConfig`] into a
//! cached [`Provider`].

pub use adapter::{Adapter, Framing, RawEvent, WireRequest};
pub use claude::Claude;
pub use config::{ProviderConfig, ProviderKind};
pub use gemini::Gemini;
pub use http::{Auth, FrameDecoder, HttpProvider};
pub use ollama::Ollama;
pub use openai::Chat;
pub use provider::Provider;
pub use registry::{Registry, RegistryEntry};
pub use responses::Responses;
pub use shape::Shape;

mod adapter;
pub mod claude;
mod config;
pub mod error;
pub mod gemini;
mod http;
pub mod ollama;
pub mod openai;
mod provider;
mod registry;
pub mod responses;
mod shape;
