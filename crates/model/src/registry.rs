//! `Registry`: a concurrent-safe cache of resolved providers.

use crate::{Provider, ProviderConfig, ProviderKind};
use compact_str::CompactString;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use ucore::{Capabilities, Result};

/// Resolves provider configs into cached [`Provider`]s.
///
/// Providers are built on first use and cached by their full config, so
/// two configs that differ only in credentials, base URL or headers get
/// separate providers. Backend aliases share an entry. Clones share the
/// cache. `resolve()` hands out a clone of the cached provider, so callers
/// never hold the lock while a request is in flight.
pub struct Registry {
    inner: Arc<RwLock<Inner>>,
}

struct Inner {
    /// Built providers keyed by kind and normalized config.
    providers: BTreeMap<(ProviderKind, ProviderConfig), Provider>,
    /// Shared HTTP client for constructing new providers.
    client: reqwest::Client,
}

/// Info about a cached provider returned by `list()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    /// Backend kind.
    pub kind: ProviderKind,
    /// Model name.
    pub model: CompactString,
}

impl Registry {
    /// An empty registry with a fresh HTTP client.
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    /// An empty registry sharing `client`.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                providers: BTreeMap::new(),
                client,
            })),
        }
    }

    /// Resolve a config into a provider, building it on first use.
    ///
    /// Unknown provider names fail with [`ucore::Error::UnknownProvider`]
    /// before anything is built.
    pub fn resolve(&self, config: &ProviderConfig) -> Result<Provider> {
        let kind = config.kind()?;
        let key = (
            kind,
            ProviderConfig {
                provider: kind.name().into(),
                ..config.clone()
            },
        );
        if let Some(provider) = self.inner.read().providers.get(&key) {
            return Ok(provider.clone());
        }

        let client = self.inner.read().client.clone();
        let provider = Provider::build(config, client)?;

        let mut inner = self.inner.write();
        let provider = inner.providers.entry(key).or_insert(provider);
        tracing::debug!("registered {kind} provider for {}", config.model);
        Ok(provider.clone())
    }

    /// What the backend named by `config` supports, without building it.
    pub fn capabilities(&self, config: &ProviderConfig) -> Result<Capabilities> {
        Ok(config.kind()?.capabilities(&config.model))
    }

    /// Whether any provider for `(kind, model)` is cached.
    pub fn contains(&self, kind: ProviderKind, model: &str) -> bool {
        self.inner
            .read()
            .providers
            .keys()
            .any(|(cached, config)| *cached == kind && config.model == model)
    }

    /// Number of cached providers.
    pub fn len(&self) -> usize {
        self.inner.read().providers.len()
    }

    /// Whether nothing is cached yet.
    pub fn is_empty(&self) -> bool {
        self.inner.read().providers.is_empty()
    }

    /// List the cached providers.
    pub fn list(&self) -> Vec<RegistryEntry> {
        self.inner
            .read()
            .providers
            .keys()
            .map(|(kind, config)| RegistryEntry {
                kind: *kind,
                model: config.model.clone(),
            })
            .collect()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("Registry")
            .field("count", &inner.providers.len())
            .finish()
    }
}

impl Clone for Registry {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
