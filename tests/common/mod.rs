//! Shared test helpers: an in-memory agent engine client and stub agents.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use vaiae::agent::{
    AgentApp, AgentArtifact, AgentRegistry, EventStream, QueryEvent, SessionEndpoint, SessionInfo,
};
use vaiae::client::{display_name_filter, AgentEngine, AgentEngineClient, AgentEngineConfig};
use vaiae::config::{ConfigDocument, ResolvedProfile};
use vaiae::error::Result;

/// A remote call observed by [`MockClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List(Option<String>),
    Create(String),
    Update(String, String),
    Delete(String, bool),
    CreateSession(String, String),
    StreamQuery {
        resource_name: String,
        user_id: String,
        session_id: String,
        message: String,
    },
}

impl Call {
    pub fn is_mutating(&self) -> bool {
        matches!(self, Call::Create(_) | Call::Update(..) | Call::Delete(..))
    }
}

/// In-memory agent engine client that records every call.
#[derive(Default)]
pub struct MockClient {
    engines: Mutex<Vec<AgentEngine>>,
    calls: Mutex<Vec<Call>>,
    reply: Mutex<Vec<QueryEvent>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an existing engine.
    pub fn with_engine(self, resource_name: &str, display_name: &str) -> Self {
        self.engines
            .lock()
            .unwrap()
            .push(AgentEngine::new(resource_name, display_name));
        self
    }

    /// Events streamed back by every query.
    pub fn with_reply(self, events: Vec<QueryEvent>) -> Self {
        *self.reply.lock().unwrap() = events;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn mutating_calls(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutating).collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl AgentEngineClient for MockClient {
    async fn list(&self, filter: Option<&str>) -> Result<Vec<AgentEngine>> {
        self.record(Call::List(filter.map(str::to_string)));
        let engines = self.engines.lock().unwrap().clone();
        Ok(match filter {
            Some(filter) => engines
                .into_iter()
                .filter(|e| display_name_filter(&e.display_name) == filter)
                .collect(),
            None => engines,
        })
    }

    async fn create(
        &self,
        _agent: &dyn AgentApp,
        config: &AgentEngineConfig,
    ) -> Result<AgentEngine> {
        self.record(Call::Create(config.display_name.clone()));
        let mut engines = self.engines.lock().unwrap();
        let engine = AgentEngine::new(
            format!(
                "projects/p/locations/l/reasoningEngines/{}",
                engines.len() + 1
            ),
            config.display_name.clone(),
        );
        engines.push(engine.clone());
        Ok(engine)
    }

    async fn update(
        &self,
        resource_name: &str,
        _agent: &dyn AgentApp,
        config: &AgentEngineConfig,
    ) -> Result<AgentEngine> {
        self.record(Call::Update(
            resource_name.to_string(),
            config.display_name.clone(),
        ));
        Ok(AgentEngine::new(resource_name, config.display_name.clone()))
    }

    async fn delete(&self, resource_name: &str, force: bool) -> Result<()> {
        self.record(Call::Delete(resource_name.to_string(), force));
        self.engines
            .lock()
            .unwrap()
            .retain(|e| e.resource_name != resource_name);
        Ok(())
    }

    async fn create_session(&self, resource_name: &str, user_id: &str) -> Result<SessionInfo> {
        self.record(Call::CreateSession(
            resource_name.to_string(),
            user_id.to_string(),
        ));
        Ok(SessionInfo {
            id: "session-1".to_string(),
            user_id: Some(user_id.to_string()),
        })
    }

    async fn stream_query(
        &self,
        resource_name: &str,
        user_id: &str,
        session_id: &str,
        message: &str,
    ) -> Result<EventStream> {
        self.record(Call::StreamQuery {
            resource_name: resource_name.to_string(),
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
            message: message.to_string(),
        });
        let events: Vec<Result<QueryEvent>> =
            self.reply.lock().unwrap().iter().cloned().map(Ok).collect();
        Ok(Box::pin(futures::stream::iter(events)))
    }
}

/// In-process endpoint that echoes the message back.
pub struct EchoEndpoint;

#[async_trait]
impl SessionEndpoint for EchoEndpoint {
    async fn create_session(&self, user_id: &str) -> Result<SessionInfo> {
        Ok(SessionInfo {
            id: "local-session".to_string(),
            user_id: Some(user_id.to_string()),
        })
    }

    async fn stream_query(
        &self,
        _user_id: &str,
        session_id: &str,
        message: &str,
    ) -> Result<EventStream> {
        let events = vec![
            Ok(QueryEvent::text("echo", format!("[{session_id}]"))),
            Ok(QueryEvent::text("echo", message.to_string())),
        ];
        Ok(Box::pin(futures::stream::iter(events)))
    }
}

/// An agent with fixed artifact bytes and, optionally, a local endpoint.
pub struct StubAgent {
    local: Option<EchoEndpoint>,
}

impl StubAgent {
    pub fn remote_only() -> Self {
        Self { local: None }
    }

    pub fn with_local() -> Self {
        Self {
            local: Some(EchoEndpoint),
        }
    }
}

impl AgentApp for StubAgent {
    fn framework(&self) -> &str {
        "google-adk"
    }

    fn artifact(&self) -> Result<AgentArtifact> {
        Ok(AgentArtifact::new(b"stub-agent".to_vec()))
    }

    fn local_endpoint(&self) -> Option<&dyn SessionEndpoint> {
        self.local.as_ref().map(|e| e as &dyn SessionEndpoint)
    }
}

/// Registry with `test.agent.main` (local-capable) and `test.agent.remote`.
pub fn test_registry() -> AgentRegistry {
    AgentRegistry::new()
        .with("test.agent.main", || {
            Ok(Arc::new(StubAgent::with_local()) as Arc<dyn AgentApp>)
        })
        .with("test.agent.remote", || {
            Ok(Arc::new(StubAgent::remote_only()) as Arc<dyn AgentApp>)
        })
}

pub const TEST_CONFIG: &str = r#"
default:
  vertex_ai:
    project: test-project
    location: us-central1
    staging_bucket: test-bucket
  display_name: test-agent
  description: Test agent
  agent_engine:
    instance_path: test.agent.main
  env_vars:
    TEST_VAR: test_value
  requirements:
    - google-cloud-aiplatform[adk,agent_engines]
  max_instances: 3

production:
  vertex_ai:
    project: prod-project
    location: europe-west1
    staging_bucket: gs://prod-bucket
  display_name: prod-agent
  agent_engine:
    instance_path: test.agent.remote

unnamed:
  vertex_ai:
    project: test-project
    location: us-central1
  agent_engine:
    instance_path: test.agent.main
"#;

pub fn test_document() -> ConfigDocument {
    ConfigDocument::from_yaml_str(".agent-engine.yml", TEST_CONFIG).unwrap()
}

pub fn test_profile(name: &str) -> ResolvedProfile {
    test_document().resolve(name, None).unwrap()
}
