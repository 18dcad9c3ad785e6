//! Error types for vaiae.

use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for all vaiae operations.
#[derive(Error, Debug)]
pub enum VaiaeError {
    #[error("Configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("Error parsing YAML file {}: {source}", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error(
        "Profile '{profile}' not found in {}. Available profiles: [{}]",
        path.display(),
        available.join(", ")
    )]
    ProfileNotFound {
        profile: String,
        path: PathBuf,
        available: Vec<String>,
    },

    #[error("{0} must be provided in YAML config")]
    MissingField(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Agent '{key}' is not registered. Registered agents: [{}]", available.join(", "))]
    UnregisteredAgent { key: String, available: Vec<String> },

    #[error("Agent engine with display name '{0}' not found")]
    AgentEngineNotFound(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Operation {name} failed: {message}")]
    Operation { name: String, message: String },

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

impl VaiaeError {
    /// Create an API error from a status code and response body.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField(field.into())
    }

    /// Whether this error was raised while reading or resolving configuration.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::ConfigNotFound(_)
                | Self::Yaml { .. }
                | Self::ProfileNotFound { .. }
                | Self::MissingField(_)
                | Self::Configuration(_)
                | Self::UnregisteredAgent { .. }
        )
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, VaiaeError>;
