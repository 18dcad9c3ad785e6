//! Agent engine management client trait and shared resource types.

pub mod auth;
pub mod http;
pub mod staging;
pub mod vertex;

pub use auth::{DefaultTokenSource, GcloudToken, StaticToken, TokenSource};
pub use vertex::VertexAiClient;

use std::collections::BTreeMap;

use async_trait::async_trait;
use bon::Builder;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::agent::{AgentApp, EventStream, SessionEndpoint, SessionInfo};
use crate::config::{EncryptionSpec, EnvVarValue, PscInterfaceConfig};
use crate::error::Result;

/// A deployed agent engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentEngine {
    /// Server-assigned `projects/../locations/../reasoningEngines/<id>`.
    pub resource_name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub create_time: Option<DateTime<Utc>>,
    pub update_time: Option<DateTime<Utc>>,
}

impl AgentEngine {
    pub fn new(resource_name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            resource_name: resource_name.into(),
            display_name: display_name.into(),
            description: None,
            create_time: None,
            update_time: None,
        }
    }
}

/// Deployment settings sent with create and update calls.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Builder)]
pub struct AgentEngineConfig {
    #[builder(into)]
    pub display_name: String,
    #[builder(into)]
    pub description: Option<String>,
    #[builder(into)]
    pub gcs_dir_name: Option<String>,
    #[builder(default)]
    pub requirements: Vec<String>,
    #[builder(default)]
    pub extra_packages: Vec<String>,
    #[builder(default)]
    pub env_vars: BTreeMap<String, EnvVarValue>,
    #[builder(into)]
    pub service_account: Option<String>,
    /// `gs://` URI of the staging bucket.
    #[builder(into)]
    pub staging_bucket: Option<String>,
    #[builder(default)]
    pub labels: BTreeMap<String, String>,
    pub min_instances: Option<u32>,
    pub max_instances: Option<u32>,
    pub container_concurrency: Option<u32>,
    #[builder(default)]
    pub resource_limits: BTreeMap<String, String>,
    pub encryption_spec: Option<EncryptionSpec>,
    pub psc_interface_config: Option<PscInterfaceConfig>,
    #[builder(into)]
    pub agent_framework: Option<String>,
    #[builder(into)]
    pub python_version: Option<String>,
}

/// The remote agent engine management API.
///
/// Resources are keyed by their server-assigned resource name.
#[async_trait]
pub trait AgentEngineClient: Send + Sync {
    /// List engines, optionally restricted by a platform filter expression.
    async fn list(&self, filter: Option<&str>) -> Result<Vec<AgentEngine>>;

    async fn create(&self, agent: &dyn AgentApp, config: &AgentEngineConfig)
        -> Result<AgentEngine>;

    async fn update(
        &self,
        resource_name: &str,
        agent: &dyn AgentApp,
        config: &AgentEngineConfig,
    ) -> Result<AgentEngine>;

    /// Delete an engine; `force` also removes child resources such as sessions.
    async fn delete(&self, resource_name: &str, force: bool) -> Result<()>;

    async fn create_session(&self, resource_name: &str, user_id: &str) -> Result<SessionInfo>;

    async fn stream_query(
        &self,
        resource_name: &str,
        user_id: &str,
        session_id: &str,
        message: &str,
    ) -> Result<EventStream>;
}

/// Filter expression matching engines by display name.
pub fn display_name_filter(display_name: &str) -> String {
    format!("display_name=\"{display_name}\"")
}

/// A deployed engine viewed as a [`SessionEndpoint`].
pub struct RemoteSession<'a> {
    client: &'a dyn AgentEngineClient,
    resource_name: String,
}

impl<'a> RemoteSession<'a> {
    pub fn new(client: &'a dyn AgentEngineClient, resource_name: impl Into<String>) -> Self {
        Self {
            client,
            resource_name: resource_name.into(),
        }
    }
}

#[async_trait]
impl SessionEndpoint for RemoteSession<'_> {
    async fn create_session(&self, user_id: &str) -> Result<SessionInfo> {
        self.client
            .create_session(&self.resource_name, user_id)
            .await
    }

    async fn stream_query(
        &self,
        user_id: &str,
        session_id: &str,
        message: &str,
    ) -> Result<EventStream> {
        self.client
            .stream_query(&self.resource_name, user_id, session_id, message)
            .await
    }
}
