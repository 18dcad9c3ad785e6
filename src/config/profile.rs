//! Typed view of a single profile record.

use std::collections::BTreeMap;

use serde::{de, Deserialize, Deserializer, Serialize};

use crate::error::{Result, VaiaeError};

/// One deployment target, as written under a profile key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    pub vertex_ai: VertexAiSettings,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub gcs_dir_name: Option<String>,
    pub agent_engine: AgentEngineSection,
    pub env_vars: BTreeMap<String, EnvVarValue>,
    pub requirements: Vec<String>,
    pub extra_packages: Vec<String>,
    pub service_account: Option<String>,
    #[serde(deserialize_with = "scalar_map")]
    pub labels: BTreeMap<String, String>,
    pub min_instances: Option<u32>,
    pub max_instances: Option<u32>,
    pub container_concurrency: Option<u32>,
    #[serde(deserialize_with = "scalar_map")]
    pub resource_limits: BTreeMap<String, String>,
    pub encryption_spec: Option<EncryptionSpec>,
    pub psc_interface_config: Option<PscInterfaceConfig>,
    pub agent_framework: Option<String>,
    pub python_version: Option<String>,
}

/// Connection settings for the Vertex AI project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VertexAiSettings {
    pub project: Option<String>,
    pub location: Option<String>,
    /// Bucket name, with or without the `gs://` scheme.
    pub staging_bucket: Option<String>,
}

impl VertexAiSettings {
    /// Staging bucket as a `gs://` URI.
    pub fn staging_bucket_uri(&self) -> Option<String> {
        self.staging_bucket
            .as_deref()
            .map(str::trim)
            .filter(|bucket| !bucket.is_empty())
            .map(|bucket| {
                if bucket.starts_with("gs://") {
                    bucket.to_string()
                } else {
                    format!("gs://{bucket}")
                }
            })
    }

    pub fn require_project(&self) -> Result<&str> {
        non_empty(self.project.as_deref()).ok_or_else(|| VaiaeError::missing_field("vertex_ai.project"))
    }

    pub fn require_location(&self) -> Result<&str> {
        non_empty(self.location.as_deref())
            .ok_or_else(|| VaiaeError::missing_field("vertex_ai.location"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentEngineSection {
    /// Registry key of the agent implementation.
    pub instance_path: Option<String>,
}

/// An environment variable value: a literal or a Secret Manager reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnvVarValue {
    Secret {
        secret: String,
        #[serde(default = "default_secret_version")]
        version: String,
    },
    Plain(#[serde(deserialize_with = "scalar_to_string")] String),
}

impl EnvVarValue {
    pub fn plain(value: impl Into<String>) -> Self {
        Self::Plain(value.into())
    }
}

impl From<&str> for EnvVarValue {
    fn from(value: &str) -> Self {
        Self::Plain(value.to_string())
    }
}

fn default_secret_version() -> String {
    "latest".to_string()
}

fn scalar_to_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    scalar_string(serde_yaml::Value::deserialize(deserializer)?).map_err(|other| {
        de::Error::custom(format!(
            "env var values must be scalars or {{secret, version}} mappings, got {other:?}"
        ))
    })
}

/// A string-valued mapping whose values may be written as unquoted numbers or booleans.
fn scalar_map<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<BTreeMap<String, serde_yaml::Value>> = Option::deserialize(deserializer)?;
    raw.unwrap_or_default()
        .into_iter()
        .map(|(key, value)| {
            scalar_string(value)
                .map(|value| (key.clone(), value))
                .map_err(|other| {
                    de::Error::custom(format!("value of '{key}' must be a scalar, got {other:?}"))
                })
        })
        .collect()
}

fn scalar_string(value: serde_yaml::Value) -> std::result::Result<String, serde_yaml::Value> {
    match value {
        serde_yaml::Value::String(s) => Ok(s),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        other => Err(other),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionSpec {
    pub kms_key_name: String,
}

/// Private Service Connect interface settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PscInterfaceConfig {
    pub network_attachment: Option<String>,
    pub dns_peering_configs: Vec<DnsPeeringConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsPeeringConfig {
    pub domain: String,
    pub target_project: String,
    pub target_network: String,
}

impl ProfileConfig {
    /// The display name, which every create/update/delete needs.
    pub fn require_display_name(&self) -> Result<&str> {
        non_empty(self.display_name.as_deref())
            .ok_or_else(|| VaiaeError::missing_field("display_name"))
    }

    pub fn require_instance_path(&self) -> Result<&str> {
        non_empty(self.agent_engine.instance_path.as_deref()).ok_or_else(|| {
            VaiaeError::MissingField("instance_path in agent_engine configuration".to_string())
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
