//! Registry mapping agent keys to constructors.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use super::{AgentApp, ArtifactAgent};
use crate::error::{Result, VaiaeError};

/// Keys with this prefix resolve to an [`ArtifactAgent`] reading the given path.
pub const ARTIFACT_SCHEME: &str = "artifact:";

/// Constructor invoked when a registered key is resolved.
pub type AgentConstructor = Box<dyn Fn() -> Result<Arc<dyn AgentApp>> + Send + Sync>;

/// Registry mapping `agent_engine.instance_path` keys to agent constructors.
///
/// Callers register their agents at startup. `artifact:<path>` keys need no
/// registration.
#[derive(Default)]
pub struct AgentRegistry {
    constructors: BTreeMap<String, AgentConstructor>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor, replacing any previous one under `key`.
    pub fn register<F>(&mut self, key: impl Into<String>, constructor: F) -> &mut Self
    where
        F: Fn() -> Result<Arc<dyn AgentApp>> + Send + Sync + 'static,
    {
        self.constructors.insert(key.into(), Box::new(constructor));
        self
    }

    /// Builder-style [`register`](Self::register).
    pub fn with<F>(mut self, key: impl Into<String>, constructor: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn AgentApp>> + Send + Sync + 'static,
    {
        self.register(key, constructor);
        self
    }

    pub fn contains(&self, key: &str) -> bool {
        self.constructors.contains_key(key) || artifact_path(key).is_some()
    }

    /// Registered keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.constructors.keys().cloned().collect()
    }

    /// Build the agent registered under `key`.
    pub fn resolve(&self, key: &str) -> Result<Arc<dyn AgentApp>> {
        if let Some(constructor) = self.constructors.get(key) {
            debug!(key, "Constructing registered agent");
            return constructor();
        }
        if let Some(path) = artifact_path(key) {
            debug!(key, "Using pre-built agent artifact");
            return Ok(Arc::new(ArtifactAgent::new(path)));
        }
        Err(VaiaeError::UnregisteredAgent {
            key: key.to_string(),
            available: self.keys(),
        })
    }
}

impl std::fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRegistry")
            .field("keys", &self.keys())
            .finish()
    }
}

fn artifact_path(key: &str) -> Option<&str> {
    key.strip_prefix(ARTIFACT_SCHEME)
        .map(str::trim)
        .filter(|path| !path.is_empty())
}
