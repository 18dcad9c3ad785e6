//! Profile configuration (YAML document > profile > overrides).

pub mod merge;
pub mod profile;

pub use merge::{deep_merge, merged};
pub use profile::{
    AgentEngineSection, DnsPeeringConfig, EncryptionSpec, EnvVarValue, ProfileConfig,
    PscInterfaceConfig, VertexAiSettings,
};

use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};
use tracing::{debug, info};

use crate::error::{Result, VaiaeError};

/// File name searched for when no explicit path is given.
pub const CONFIG_FILE_NAME: &str = ".agent-engine.yml";

/// Profile used when none is requested.
pub const DEFAULT_PROFILE: &str = "default";

/// A parsed configuration document: profile name -> profile record.
///
/// The document is read once and never written back.
#[derive(Debug, Clone)]
pub struct ConfigDocument {
    path: PathBuf,
    profiles: Mapping,
}

/// A profile looked up in a document, with any overrides applied.
#[derive(Debug, Clone)]
pub struct ResolvedProfile {
    pub name: String,
    pub path: PathBuf,
    /// The merged YAML value the typed config was built from.
    pub raw: Value,
    pub config: ProfileConfig,
}

impl ConfigDocument {
    /// Load a document from an explicit path.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(VaiaeError::ConfigNotFound(path.to_path_buf()));
        }
        let raw = std::fs::read_to_string(path)?;
        Self::from_yaml_str(path, &raw)
    }

    /// Load from `path` when given, otherwise from the discovered file.
    pub fn load_or_discover(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let found = discover()?;
                info!(path = %found.display(), "Using configuration file");
                Self::load(&found)
            }
        }
    }

    /// Parse a document; `path` is only used for error messages.
    pub fn from_yaml_str(path: impl Into<PathBuf>, raw: &str) -> Result<Self> {
        let path = path.into();
        if raw.trim().is_empty() {
            return Ok(Self {
                path,
                profiles: Mapping::new(),
            });
        }

        let value: Value = serde_yaml::from_str(raw).map_err(|source| VaiaeError::Yaml {
            path: path.clone(),
            source,
        })?;

        let profiles = match value {
            Value::Null => Mapping::new(),
            Value::Mapping(map) => map,
            other => {
                return Err(VaiaeError::Configuration(format!(
                    "{} must map profile names to profile records, found {}",
                    path.display(),
                    value_kind(&other)
                )))
            }
        };

        Ok(Self { path, profiles })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Profile names in document order.
    pub fn profile_names(&self) -> Vec<String> {
        self.profiles.keys().map(key_to_string).collect()
    }

    /// The raw profile record, before any overrides.
    pub fn profile_value(&self, profile: &str) -> Result<&Value> {
        self.profiles
            .get(profile)
            .ok_or_else(|| VaiaeError::ProfileNotFound {
                profile: profile.to_string(),
                path: self.path.clone(),
                available: self.profile_names(),
            })
    }

    /// Look up `profile` and merge `overrides` onto a copy of it.
    pub fn resolve(&self, profile: &str, overrides: Option<&Mapping>) -> Result<ResolvedProfile> {
        let base = match self.profile_value(profile)? {
            Value::Null => Value::Mapping(Mapping::new()),
            other => other.clone(),
        };

        let resolved = ResolvedProfile::from_value(profile, &self.path, base)?;
        match overrides {
            Some(overrides) => resolved.with_overrides(overrides),
            None => Ok(resolved),
        }
    }
}

impl ResolvedProfile {
    fn from_value(name: &str, path: &Path, raw: Value) -> Result<Self> {
        let config: ProfileConfig =
            serde_yaml::from_value(raw.clone()).map_err(|source| VaiaeError::Yaml {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self {
            name: name.to_string(),
            path: path.to_path_buf(),
            raw,
            config,
        })
    }

    /// A new profile with `overrides` deep-merged on top; `self` is unchanged.
    pub fn with_overrides(&self, overrides: &Mapping) -> Result<Self> {
        if overrides.is_empty() {
            return Ok(self.clone());
        }
        debug!(profile = %self.name, keys = overrides.len(), "Applying overrides");
        let raw = merged(&self.raw, Value::Mapping(overrides.clone()));
        Self::from_value(&self.name, &self.path, raw)
    }
}

/// Find [`CONFIG_FILE_NAME`] in the current directory, then the home directory.
pub fn discover() -> Result<PathBuf> {
    let cwd = std::env::current_dir()?;
    let home = directories::BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf());
    discover_in(&cwd, home.as_deref(), CONFIG_FILE_NAME)
}

/// Search order: `cwd`, then `home`. Fails with [`VaiaeError::ConfigNotFound`]
/// naming `file_name` when neither directory has it.
pub fn discover_in(cwd: &Path, home: Option<&Path>, file_name: &str) -> Result<PathBuf> {
    let candidates = std::iter::once(cwd).chain(home);
    for dir in candidates {
        let candidate = dir.join(file_name);
        if candidate.is_file() {
            return Ok(candidate);
        }
    }
    debug!(file_name, "No configuration file in current or home directory");
    Err(VaiaeError::ConfigNotFound(PathBuf::from(file_name)))
}

fn key_to_string(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn discovery_prefers_current_directory() {
        let temp = tempdir().unwrap();
        let cwd = temp.path().join("cwd");
        let home = temp.path().join("home");
        fs::create_dir_all(&cwd).unwrap();
        fs::create_dir_all(&home).unwrap();
        fs::write(cwd.join(CONFIG_FILE_NAME), "default: {}").unwrap();
        fs::write(home.join(CONFIG_FILE_NAME), "default: {}").unwrap();

        let found = discover_in(&cwd, Some(&home), CONFIG_FILE_NAME).unwrap();
        assert_eq!(found, cwd.join(CONFIG_FILE_NAME));
    }

    #[test]
    fn discovery_falls_back_to_home() {
        let temp = tempdir().unwrap();
        let cwd = temp.path().join("cwd");
        let home = temp.path().join("home");
        fs::create_dir_all(&cwd).unwrap();
        fs::create_dir_all(&home).unwrap();
        fs::write(home.join("custom-config.yml"), "default: {}").unwrap();

        let found = discover_in(&cwd, Some(&home), "custom-config.yml").unwrap();
        assert_eq!(found, home.join("custom-config.yml"));
    }

    #[test]
    fn discovery_reports_missing_file() {
        let temp = tempdir().unwrap();
        let err = discover_in(temp.path(), None, CONFIG_FILE_NAME).unwrap_err();
        assert!(matches!(err, VaiaeError::ConfigNotFound(ref p) if p == Path::new(CONFIG_FILE_NAME)));
        assert_eq!(
            err.to_string(),
            "Configuration file not found: .agent-engine.yml"
        );
    }

    #[test]
    fn empty_document_has_no_profiles() {
        let doc = ConfigDocument::from_yaml_str("empty.yml", "").unwrap();
        assert!(doc.profile_names().is_empty());

        let doc = ConfigDocument::from_yaml_str("comments.yml", "# nothing here\n").unwrap();
        assert!(doc.profile_names().is_empty());
    }

    #[test]
    fn non_mapping_document_is_rejected() {
        let err = ConfigDocument::from_yaml_str("list.yml", "- a\n- b\n").unwrap_err();
        assert!(matches!(err, VaiaeError::Configuration(_)));
    }

    #[test]
    fn empty_profile_resolves_to_defaults() {
        let doc = ConfigDocument::from_yaml_str("doc.yml", "default:\n").unwrap();
        let resolved = doc.resolve("default", None).unwrap();
        assert_eq!(resolved.config, ProfileConfig::default());
    }
}
