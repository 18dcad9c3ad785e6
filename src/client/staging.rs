//! Upload of deployment artifacts to the Cloud Storage staging bucket.

use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::info;

use super::auth::TokenSource;
use super::http::ensure_success;
use crate::agent::AgentArtifact;
use crate::error::{Result, VaiaeError};

pub const DEFAULT_GCS_DIR_NAME: &str = "agent_engine";
pub const PICKLE_FILE: &str = "agent_engine.pkl";
pub const REQUIREMENTS_FILE: &str = "requirements.txt";
pub const DEPENDENCIES_FILE: &str = "dependencies.tar.gz";

/// `gs://` URIs of the staged package files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedPackage {
    pub pickle_object_gcs_uri: String,
    pub requirements_gcs_uri: Option<String>,
    pub dependency_files_gcs_uri: Option<String>,
}

/// Everything that gets uploaded for one deployment.
pub struct StagingRequest<'a> {
    pub staging_bucket: &'a str,
    pub gcs_dir_name: Option<&'a str>,
    pub artifact: &'a AgentArtifact,
    pub requirements: &'a [String],
    pub extra_packages: &'a [String],
}

/// Uploads objects through the Cloud Storage JSON API.
pub struct Stager<'a> {
    http: &'a reqwest::Client,
    storage_url: &'a str,
    token_source: &'a dyn TokenSource,
}

impl<'a> Stager<'a> {
    pub fn new(
        http: &'a reqwest::Client,
        storage_url: &'a str,
        token_source: &'a dyn TokenSource,
    ) -> Self {
        Self {
            http,
            storage_url,
            token_source,
        }
    }

    pub async fn stage(&self, request: &StagingRequest<'_>) -> Result<StagedPackage> {
        let (bucket, prefix) = parse_gcs_uri(request.staging_bucket)?;
        let dir = request
            .gcs_dir_name
            .map(|d| d.trim_matches('/'))
            .filter(|d| !d.is_empty())
            .unwrap_or(DEFAULT_GCS_DIR_NAME);
        let base = join_object_path(&prefix, dir);

        info!(bucket = %bucket, dir = %base, "Staging agent engine package");

        let pickle_object_gcs_uri = self
            .upload(&bucket, &format!("{base}/{PICKLE_FILE}"), request.artifact.bytes.clone())
            .await?;

        let requirements_gcs_uri = if request.requirements.is_empty() {
            None
        } else {
            let body = requirements_txt(request.requirements).into_bytes();
            Some(
                self.upload(&bucket, &format!("{base}/{REQUIREMENTS_FILE}"), body)
                    .await?,
            )
        };

        let dependency_files_gcs_uri = if request.extra_packages.is_empty() {
            None
        } else {
            let archive = build_dependencies_archive(request.extra_packages)?;
            Some(
                self.upload(&bucket, &format!("{base}/{DEPENDENCIES_FILE}"), archive)
                    .await?,
            )
        };

        Ok(StagedPackage {
            pickle_object_gcs_uri,
            requirements_gcs_uri,
            dependency_files_gcs_uri,
        })
    }

    async fn upload(&self, bucket: &str, object: &str, body: Vec<u8>) -> Result<String> {
        let token = self.token_source.access_token().await?;
        let url = format!(
            "{}/upload/storage/v1/b/{}/o",
            self.storage_url.trim_end_matches('/'),
            bucket
        );

        let resp = self
            .http
            .post(&url)
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .query(&[("uploadType", "media"), ("name", object)])
            .body(body)
            .send()
            .await?;
        ensure_success(resp).await?;

        Ok(format!("gs://{bucket}/{object}"))
    }
}

/// Split `gs://bucket/some/prefix` into `("bucket", "some/prefix")`.
pub fn parse_gcs_uri(uri: &str) -> Result<(String, String)> {
    let rest = uri.trim().strip_prefix("gs://").unwrap_or(uri.trim());
    let (bucket, prefix) = rest.split_once('/').unwrap_or((rest, ""));
    if bucket.is_empty() {
        return Err(VaiaeError::Configuration(format!(
            "Invalid staging bucket: '{uri}'"
        )));
    }
    Ok((bucket.to_string(), prefix.trim_matches('/').to_string()))
}

fn join_object_path(prefix: &str, dir: &str) -> String {
    if prefix.is_empty() {
        dir.to_string()
    } else {
        format!("{prefix}/{dir}")
    }
}

/// One requirement per line.
pub fn requirements_txt(requirements: &[String]) -> String {
    let mut out = requirements.join("\n");
    out.push('\n');
    out
}

/// Pack extra package files and directories into a gzipped tarball.
///
/// Entries are stored under their file name, directories recursively.
pub fn build_dependencies_archive(paths: &[String]) -> Result<Vec<u8>> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for raw in paths {
        let path = Path::new(raw);
        let name = path.file_name().ok_or_else(|| {
            VaiaeError::Configuration(format!("Invalid extra package path: '{raw}'"))
        })?;
        if path.is_dir() {
            builder.append_dir_all(name, path)?;
        } else if path.is_file() {
            builder.append_path_with_name(path, name)?;
        } else {
            return Err(VaiaeError::Configuration(format!(
                "Extra package not found: {raw}"
            )));
        }
    }

    let encoder = builder.into_inner()?;
    Ok(encoder.finish()?)
}
