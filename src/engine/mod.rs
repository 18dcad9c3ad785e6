//! Agent engine lifecycle operations driven by a resolved profile.

use std::io::Write;
use std::sync::Arc;

use futures::StreamExt;
use serde_yaml::Mapping;
use strum::Display;
use tracing::{debug, info};

use crate::agent::{AgentApp, AgentRegistry, SessionEndpoint};
use crate::client::{display_name_filter, AgentEngine, AgentEngineClient, AgentEngineConfig, RemoteSession};
use crate::config::{ProfileConfig, ResolvedProfile};
use crate::error::{Result, VaiaeError};

/// What a deploy would do for a display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum DeployAction {
    #[strum(serialize = "create")]
    Create,
    #[strum(serialize = "update")]
    Update,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployOutcome {
    DryRun(DeployAction),
    Created(AgentEngine),
    Updated(AgentEngine),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    DryRun(AgentEngine),
    Deleted(AgentEngine),
}

/// Arguments of a single message exchange.
#[derive(Debug, Clone, Default)]
pub struct SendRequest {
    pub message: String,
    pub user_id: String,
    /// Existing session to continue; a new one is created when absent.
    pub session_id: Option<String>,
    /// Talk to the agent in-process instead of the deployed engine.
    pub local: bool,
}

/// Deploy, list, delete and message agent engines for one profile.
pub struct AgentEngineService<'a> {
    profile: ResolvedProfile,
    client: &'a dyn AgentEngineClient,
    registry: &'a AgentRegistry,
}

impl<'a> AgentEngineService<'a> {
    pub fn new(
        profile: ResolvedProfile,
        client: &'a dyn AgentEngineClient,
        registry: &'a AgentRegistry,
    ) -> Self {
        Self {
            profile,
            client,
            registry,
        }
    }

    pub fn profile(&self) -> &ResolvedProfile {
        &self.profile
    }

    /// The engine whose display name matches, if any.
    pub async fn get_agent_engine(&self, display_name: &str) -> Result<Option<AgentEngine>> {
        let filter = display_name_filter(display_name);
        let engines = self.client.list(Some(&filter)).await?;
        Ok(engines.into_iter().next())
    }

    pub async fn list_agent_engines(&self) -> Result<Vec<AgentEngine>> {
        self.client.list(None).await
    }

    pub async fn delete_agent_engine(
        &self,
        name: &str,
        force: bool,
        dry_run: bool,
    ) -> Result<DeleteOutcome> {
        let engine = self
            .get_agent_engine(name)
            .await?
            .ok_or_else(|| VaiaeError::AgentEngineNotFound(name.to_string()))?;

        info!(resource_name = %engine.resource_name, force, "Deleting agent engine");
        if dry_run {
            info!(display_name = name, "Dry run: skipping delete");
            return Ok(DeleteOutcome::DryRun(engine));
        }

        self.client.delete(&engine.resource_name, force).await?;
        info!(display_name = name, "Agent engine deleted");
        Ok(DeleteOutcome::Deleted(engine))
    }

    pub async fn delete_agent_engine_from_profile(
        &self,
        force: bool,
        dry_run: bool,
    ) -> Result<DeleteOutcome> {
        let display_name = self.profile.config.require_display_name()?;
        self.delete_agent_engine(display_name, force, dry_run).await
    }

    /// Resolve the profile's agent and translate the profile into deployment settings.
    pub fn build_agent_engine_config(
        &self,
        config: &ProfileConfig,
    ) -> Result<(Arc<dyn AgentApp>, AgentEngineConfig)> {
        let display_name = config.require_display_name()?;
        let agent = self.registry.resolve(config.require_instance_path()?)?;

        let engine_config = AgentEngineConfig {
            display_name: display_name.to_string(),
            description: config.description.clone(),
            gcs_dir_name: config.gcs_dir_name.clone(),
            requirements: config.requirements.clone(),
            extra_packages: config.extra_packages.clone(),
            env_vars: config.env_vars.clone(),
            service_account: config.service_account.clone(),
            staging_bucket: config.vertex_ai.staging_bucket_uri(),
            labels: config.labels.clone(),
            min_instances: config.min_instances,
            max_instances: config.max_instances,
            container_concurrency: config.container_concurrency,
            resource_limits: config.resource_limits.clone(),
            encryption_spec: config.encryption_spec.clone(),
            psc_interface_config: config.psc_interface_config.clone(),
            agent_framework: config.agent_framework.clone(),
            python_version: config.python_version.clone(),
        };
        Ok((agent, engine_config))
    }

    /// Update the engine named `display_name` if it exists, create it otherwise.
    pub async fn create_or_update(
        &self,
        agent: &dyn AgentApp,
        config: &AgentEngineConfig,
        display_name: &str,
        dry_run: bool,
    ) -> Result<DeployOutcome> {
        info!(
            "Agent engine configuration:\n{}",
            serde_json::to_string_pretty(config)?
        );

        let existing = self.get_agent_engine(display_name).await?;
        let action = if existing.is_some() {
            DeployAction::Update
        } else {
            DeployAction::Create
        };

        if dry_run {
            info!(display_name, "Dry run: would {action} agent engine");
            return Ok(DeployOutcome::DryRun(action));
        }

        match existing {
            Some(engine) => {
                info!(resource_name = %engine.resource_name, "Updating existing agent engine");
                let updated = self
                    .client
                    .update(&engine.resource_name, agent, config)
                    .await?;
                info!(resource_name = %updated.resource_name, "Agent engine updated");
                Ok(DeployOutcome::Updated(updated))
            }
            None => {
                info!(display_name, "Creating new agent engine");
                let created = self.client.create(agent, config).await?;
                info!(resource_name = %created.resource_name, "Agent engine created");
                Ok(DeployOutcome::Created(created))
            }
        }
    }

    /// Deploy the profile, with `overrides` merged onto a copy of it first.
    pub async fn create_or_update_from_profile(
        &self,
        dry_run: bool,
        overrides: Option<&Mapping>,
    ) -> Result<DeployOutcome> {
        let profile = match overrides {
            Some(overrides) => self.profile.with_overrides(overrides)?,
            None => self.profile.clone(),
        };
        let display_name = profile.config.require_display_name()?;
        let (agent, config) = self.build_agent_engine_config(&profile.config)?;
        self.create_or_update(agent.as_ref(), &config, display_name, dry_run)
            .await
    }

    /// Send one message and write every text part of the reply to `out`.
    pub async fn send_message(&self, request: &SendRequest, out: &mut impl Write) -> Result<()> {
        if request.local {
            let agent = self
                .registry
                .resolve(self.profile.config.require_instance_path()?)?;
            let endpoint = agent.local_endpoint().ok_or_else(|| {
                VaiaeError::Unsupported("agent has no local endpoint".to_string())
            })?;
            info!("Sending message to local agent");
            exchange(endpoint, request, out).await
        } else {
            let display_name = self.profile.config.require_display_name()?;
            let engine = self
                .get_agent_engine(display_name)
                .await?
                .ok_or_else(|| VaiaeError::AgentEngineNotFound(display_name.to_string()))?;
            info!(resource_name = %engine.resource_name, "Sending message to agent engine");
            let endpoint = RemoteSession::new(self.client, engine.resource_name);
            exchange(&endpoint, request, out).await
        }
    }
}

async fn exchange(
    endpoint: &dyn SessionEndpoint,
    request: &SendRequest,
    out: &mut impl Write,
) -> Result<()> {
    let session_id = match &request.session_id {
        Some(id) => id.clone(),
        None => {
            let session = endpoint.create_session(&request.user_id).await?;
            info!(session_id = %session.id, "Created session");
            session.id
        }
    };

    let mut events = endpoint
        .stream_query(&request.user_id, &session_id, &request.message)
        .await?;
    while let Some(event) = events.next().await {
        let event = event?;
        debug!(?event, "Received event");
        for text in event.texts() {
            writeln!(out, "{text}")?;
            out.flush()?;
        }
    }
    Ok(())
}
