//! Agent implementations that can be deployed as agent engines.

pub mod registry;
pub mod session;

pub use registry::{AgentConstructor, AgentRegistry, ARTIFACT_SCHEME};
pub use session::{EventContent, EventPart, EventStream, QueryEvent, SessionEndpoint, SessionInfo};

use std::path::{Path, PathBuf};

use crate::error::{Result, VaiaeError};

/// Framework reported when an agent does not name one.
pub const DEFAULT_FRAMEWORK: &str = "custom";

/// Serialized agent object, staged as the engine's pickled payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentArtifact {
    pub bytes: Vec<u8>,
}

impl AgentArtifact {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }
}

/// A deployable agent implementation, looked up by key in an [`AgentRegistry`].
pub trait AgentApp: Send + Sync {
    /// Agent framework reported to the platform (e.g. `google-adk`).
    fn framework(&self) -> &str {
        DEFAULT_FRAMEWORK
    }

    /// The serialized agent to upload.
    fn artifact(&self) -> Result<AgentArtifact>;

    /// In-process endpoint used when messaging the agent locally.
    fn local_endpoint(&self) -> Option<&dyn SessionEndpoint> {
        None
    }
}

/// An agent that was serialized ahead of time and sits on disk.
#[derive(Debug, Clone)]
pub struct ArtifactAgent {
    path: PathBuf,
}

impl ArtifactAgent {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AgentApp for ArtifactAgent {
    fn artifact(&self) -> Result<AgentArtifact> {
        let bytes = std::fs::read(&self.path).map_err(|e| {
            VaiaeError::Configuration(format!(
                "Cannot read agent artifact {}: {e}",
                self.path.display()
            ))
        })?;
        Ok(AgentArtifact::new(bytes))
    }
}
