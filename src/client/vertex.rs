//! Vertex AI Reasoning Engine REST client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use super::auth::{DefaultTokenSource, TokenSource};
use super::http::{bearer_headers, build_client, ensure_success, parse_stream_line, LineBuffer};
use super::staging::{StagedPackage, Stager, StagingRequest};
use super::{AgentEngine, AgentEngineClient, AgentEngineConfig};
use crate::agent::{AgentApp, EventStream, QueryEvent, SessionInfo};
use crate::config::{EnvVarValue, VertexAiSettings};
use crate::error::{Result, VaiaeError};

const STORAGE_URL: &str = "https://storage.googleapis.com";
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
const PAGE_SIZE: &str = "100";

/// Client for `projects/{project}/locations/{location}/reasoningEngines`.
pub struct VertexAiClient {
    http: reqwest::Client,
    project: String,
    location: String,
    base_url: String,
    storage_url: String,
    token_source: Arc<dyn TokenSource>,
    poll_interval: Duration,
}

impl std::fmt::Debug for VertexAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VertexAiClient")
            .field("project", &self.project)
            .field("location", &self.location)
            .field("base_url", &self.base_url)
            .field("storage_url", &self.storage_url)
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

impl VertexAiClient {
    pub fn new(
        project: impl Into<String>,
        location: impl Into<String>,
        token_source: Arc<dyn TokenSource>,
    ) -> Result<Self> {
        let location = location.into();
        Ok(Self {
            http: build_client()?,
            project: project.into(),
            base_url: format!("https://{location}-aiplatform.googleapis.com/v1"),
            location,
            storage_url: STORAGE_URL.to_string(),
            token_source,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Build a client for a profile's `vertex_ai` block using ambient credentials.
    pub fn from_settings(settings: &VertexAiSettings) -> Result<Self> {
        let project = settings.require_project()?;
        let location = settings.require_location()?;
        info!(project, location, "Initializing Vertex AI client");
        if let Some(bucket) = settings.staging_bucket_uri() {
            info!(staging_bucket = %bucket, "Staging bucket configured");
        }
        Self::new(project, location, Arc::new(DefaultTokenSource::new()))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_storage_url(mut self, storage_url: impl Into<String>) -> Self {
        self.storage_url = storage_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    fn parent(&self) -> String {
        format!("projects/{}/locations/{}", self.project, self.location)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn headers(&self) -> Result<reqwest::header::HeaderMap> {
        let token = self.token_source.access_token().await?;
        Ok(bearer_headers(&token))
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let resp = self
            .http
            .get(url)
            .headers(self.headers().await?)
            .query(query)
            .send()
            .await?;
        Ok(ensure_success(resp).await?.json().await?)
    }

    async fn stage(&self, agent: &dyn AgentApp, config: &AgentEngineConfig) -> Result<StagedPackage> {
        let staging_bucket = config.staging_bucket.as_deref().ok_or_else(|| {
            VaiaeError::missing_field("vertex_ai.staging_bucket")
        })?;
        let artifact = agent.artifact()?;
        let stager = Stager::new(&self.http, &self.storage_url, self.token_source.as_ref());
        stager
            .stage(&StagingRequest {
                staging_bucket,
                gcs_dir_name: config.gcs_dir_name.as_deref(),
                artifact: &artifact,
                requirements: &config.requirements,
                extra_packages: &config.extra_packages,
            })
            .await
    }

    /// Poll a long-running operation until it reports `done`.
    async fn wait_for_operation(&self, mut operation: Operation) -> Result<Operation> {
        let url = self.url(&operation.name);
        while !operation.done {
            debug!(operation = %operation.name, "Waiting for operation");
            tokio::time::sleep(self.poll_interval).await;
            operation = self.get_json(&url, &[]).await?;
        }
        if let Some(error) = &operation.error {
            return Err(VaiaeError::Operation {
                name: operation.name.clone(),
                message: error.message.clone().unwrap_or_else(|| {
                    format!("operation failed with code {}", error.code.unwrap_or_default())
                }),
            });
        }
        Ok(operation)
    }

    async fn engine_from_operation(&self, operation: Operation) -> Result<AgentEngine> {
        let operation = self.wait_for_operation(operation).await?;
        let resource: ReasoningEngineResource = match operation.response {
            Some(response) => serde_json::from_value(response)?,
            None => {
                return Err(VaiaeError::api(
                    200,
                    format!("operation {} finished without a resource", operation.name),
                ))
            }
        };
        Ok(resource.into())
    }
}

#[async_trait]
impl AgentEngineClient for VertexAiClient {
    async fn list(&self, filter: Option<&str>) -> Result<Vec<AgentEngine>> {
        let url = self.url(&format!("{}/reasoningEngines", self.parent()));
        let mut engines = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![("pageSize", PAGE_SIZE)];
            if let Some(filter) = filter {
                query.push(("filter", filter));
            }
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }

            let page: ListResponse = self.get_json(&url, &query).await?;
            engines.extend(page.reasoning_engines.into_iter().map(AgentEngine::from));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!(count = engines.len(), ?filter, "Listed agent engines");
        Ok(engines)
    }

    async fn create(&self, agent: &dyn AgentApp, config: &AgentEngineConfig) -> Result<AgentEngine> {
        let staged = self.stage(agent, config).await?;
        let body = build_engine_body(config, agent.framework(), &staged);
        let url = self.url(&format!("{}/reasoningEngines", self.parent()));

        info!(display_name = %config.display_name, "Creating agent engine");
        let resp = self
            .http
            .post(&url)
            .headers(self.headers().await?)
            .json(&body)
            .send()
            .await?;
        let operation: Operation = ensure_success(resp).await?.json().await?;
        self.engine_from_operation(operation).await
    }

    async fn update(
        &self,
        resource_name: &str,
        agent: &dyn AgentApp,
        config: &AgentEngineConfig,
    ) -> Result<AgentEngine> {
        let staged = self.stage(agent, config).await?;
        let body = build_engine_body(config, agent.framework(), &staged);
        let mask = update_mask(&body);

        info!(resource_name, update_mask = %mask, "Updating agent engine");
        let resp = self
            .http
            .patch(self.url(resource_name))
            .headers(self.headers().await?)
            .query(&[("updateMask", mask.as_str())])
            .json(&body)
            .send()
            .await?;
        let operation: Operation = ensure_success(resp).await?.json().await?;
        self.engine_from_operation(operation).await
    }

    async fn delete(&self, resource_name: &str, force: bool) -> Result<()> {
        let mut request = self
            .http
            .delete(self.url(resource_name))
            .headers(self.headers().await?);
        if force {
            request = request.query(&[("force", "true")]);
        }
        let resp = request.send().await?;
        let operation: Operation = ensure_success(resp).await?.json().await?;
        self.wait_for_operation(operation).await?;
        Ok(())
    }

    async fn create_session(&self, resource_name: &str, user_id: &str) -> Result<SessionInfo> {
        let body = json!({
            "classMethod": "create_session",
            "input": { "user_id": user_id },
        });
        let resp = self
            .http
            .post(self.url(&format!("{resource_name}:query")))
            .headers(self.headers().await?)
            .json(&body)
            .send()
            .await?;
        let data: QueryResponse = ensure_success(resp).await?.json().await?;
        let output = data
            .output
            .ok_or_else(|| VaiaeError::api(200, "No output in create_session response"))?;
        serde_json::from_value(output)
            .map_err(|e| VaiaeError::api(200, format!("Unexpected create_session output: {e}")))
    }

    async fn stream_query(
        &self,
        resource_name: &str,
        user_id: &str,
        session_id: &str,
        message: &str,
    ) -> Result<EventStream> {
        let body = json!({
            "classMethod": "stream_query",
            "input": {
                "user_id": user_id,
                "session_id": session_id,
                "message": message,
            },
        });

        debug!(resource_name, session_id, "Streaming query");
        let resp = self
            .http
            .post(self.url(&format!("{resource_name}:streamQuery")))
            .headers(self.headers().await?)
            .query(&[("alt", "sse")])
            .json(&body)
            .send()
            .await?;
        let resp = ensure_success(resp).await?;
        Ok(event_stream(resp.bytes_stream()))
    }
}

/// Decode a streamed response body into query events.
///
/// Undecodable lines are logged and skipped. A transport failure or a line
/// that is not UTF-8 ends the stream with an error.
pub fn event_stream<S, B, E>(byte_stream: S) -> EventStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<VaiaeError> + Send + 'static,
{
    let stream = async_stream::stream! {
        let mut buffer = LineBuffer::new();
        let mut failed = false;
        futures::pin_mut!(byte_stream);

        while let Some(chunk_result) = byte_stream.next().await {
            let lines = match chunk_result {
                Ok(chunk) => buffer.push(chunk.as_ref()),
                Err(e) => Err(e.into()),
            };
            match lines {
                Ok(lines) => {
                    for line in lines {
                        if let Some(event) = decode_event(&line) {
                            yield Ok(event);
                        }
                    }
                }
                Err(e) => {
                    yield Err(e);
                    failed = true;
                    break;
                }
            }
        }

        if !failed {
            match buffer.finish() {
                Ok(Some(line)) => {
                    if let Some(event) = decode_event(&line) {
                        yield Ok(event);
                    }
                }
                Ok(None) => {}
                Err(e) => yield Err(e),
            }
        }
    };

    Box::pin(stream)
}

fn decode_event(line: &str) -> Option<QueryEvent> {
    let data = parse_stream_line(line)?;
    match serde_json::from_str::<QueryEvent>(data) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!(error = %e, "Skipping undecodable stream line");
            None
        }
    }
}

/// REST body for a reasoning engine create/update.
pub fn build_engine_body(
    config: &AgentEngineConfig,
    framework: &str,
    staged: &StagedPackage,
) -> Value {
    let mut body = Map::new();
    body.insert("displayName".into(), json!(config.display_name));
    if let Some(description) = &config.description {
        body.insert("description".into(), json!(description));
    }

    let mut package_spec = Map::new();
    package_spec.insert(
        "pickleObjectGcsUri".into(),
        json!(staged.pickle_object_gcs_uri),
    );
    if let Some(uri) = &staged.requirements_gcs_uri {
        package_spec.insert("requirementsGcsUri".into(), json!(uri));
    }
    if let Some(uri) = &staged.dependency_files_gcs_uri {
        package_spec.insert("dependencyFilesGcsUri".into(), json!(uri));
    }
    if let Some(version) = &config.python_version {
        package_spec.insert("pythonVersion".into(), json!(version));
    }

    let mut spec = Map::new();
    spec.insert("packageSpec".into(), Value::Object(package_spec));

    let deployment_spec = build_deployment_spec(config);
    if !deployment_spec.is_empty() {
        spec.insert("deploymentSpec".into(), Value::Object(deployment_spec));
    }
    if let Some(service_account) = &config.service_account {
        spec.insert("serviceAccount".into(), json!(service_account));
    }
    let framework = config.agent_framework.as_deref().unwrap_or(framework);
    spec.insert("agentFramework".into(), json!(framework));
    body.insert("spec".into(), Value::Object(spec));

    if !config.labels.is_empty() {
        body.insert("labels".into(), json!(config.labels));
    }
    if let Some(encryption) = &config.encryption_spec {
        body.insert(
            "encryptionSpec".into(),
            json!({ "kmsKeyName": encryption.kms_key_name }),
        );
    }

    Value::Object(body)
}

fn build_deployment_spec(config: &AgentEngineConfig) -> Map<String, Value> {
    let mut deployment = Map::new();

    let mut env = Vec::new();
    let mut secret_env = Vec::new();
    for (name, value) in &config.env_vars {
        match value {
            EnvVarValue::Plain(value) => env.push(json!({ "name": name, "value": value })),
            EnvVarValue::Secret { secret, version } => secret_env.push(json!({
                "name": name,
                "secretRef": { "secret": secret, "version": version },
            })),
        }
    }
    if !env.is_empty() {
        deployment.insert("env".into(), Value::Array(env));
    }
    if !secret_env.is_empty() {
        deployment.insert("secretEnv".into(), Value::Array(secret_env));
    }
    if let Some(n) = config.min_instances {
        deployment.insert("minInstances".into(), json!(n));
    }
    if let Some(n) = config.max_instances {
        deployment.insert("maxInstances".into(), json!(n));
    }
    if let Some(n) = config.container_concurrency {
        deployment.insert("containerConcurrency".into(), json!(n));
    }
    if !config.resource_limits.is_empty() {
        deployment.insert("resourceLimits".into(), json!(config.resource_limits));
    }
    if let Some(psc) = &config.psc_interface_config {
        let mut psc_json = Map::new();
        if let Some(attachment) = &psc.network_attachment {
            psc_json.insert("networkAttachment".into(), json!(attachment));
        }
        if !psc.dns_peering_configs.is_empty() {
            let peers: Vec<Value> = psc
                .dns_peering_configs
                .iter()
                .map(|p| {
                    json!({
                        "domain": p.domain,
                        "targetProject": p.target_project,
                        "targetNetwork": p.target_network,
                    })
                })
                .collect();
            psc_json.insert("dnsPeeringConfigs".into(), Value::Array(peers));
        }
        deployment.insert("pscInterfaceConfig".into(), Value::Object(psc_json));
    }

    deployment
}

/// Field mask naming every field present in an engine body.
pub fn update_mask(body: &Value) -> String {
    let mut paths = Vec::new();
    if let Some(obj) = body.as_object() {
        for (key, value) in obj {
            if key == "spec" {
                if let Some(spec) = value.as_object() {
                    paths.extend(spec.keys().map(|k| format!("spec.{}", snake_case(k))));
                }
            } else {
                paths.push(snake_case(key));
            }
        }
    }
    paths.join(",")
}

fn snake_case(camel: &str) -> String {
    let mut out = String::with_capacity(camel.len() + 4);
    for ch in camel.chars() {
        if ch.is_ascii_uppercase() {
            out.push('_');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

// Wire types

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    reasoning_engines: Vec<ReasoningEngineResource>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReasoningEngineResource {
    name: String,
    #[serde(default)]
    display_name: String,
    description: Option<String>,
    create_time: Option<DateTime<Utc>>,
    update_time: Option<DateTime<Utc>>,
}

impl From<ReasoningEngineResource> for AgentEngine {
    fn from(resource: ReasoningEngineResource) -> Self {
        Self {
            resource_name: resource.name,
            display_name: resource.display_name,
            description: resource.description,
            create_time: resource.create_time,
            update_time: resource.update_time,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Operation {
    name: String,
    #[serde(default)]
    done: bool,
    error: Option<OperationError>,
    response: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct OperationError {
    code: Option<i32>,
    message: Option<String>,
}

#[derive(Deserialize)]
struct QueryResponse {
    output: Option<Value>,
}
