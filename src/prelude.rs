//! Convenience re-exports for common use.

pub use crate::agent::{AgentApp, AgentRegistry, ArtifactAgent, QueryEvent, SessionEndpoint};
pub use crate::client::{AgentEngine, AgentEngineClient, AgentEngineConfig, VertexAiClient};
pub use crate::config::{deep_merge, ConfigDocument, ProfileConfig, ResolvedProfile};
pub use crate::engine::{AgentEngineService, DeleteOutcome, DeployOutcome, SendRequest};
pub use crate::error::{Result, VaiaeError};
