//! Access tokens for Google Cloud APIs.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::error::{Result, VaiaeError};

/// Environment variable honoured by Google tooling for a pre-minted token.
pub const ACCESS_TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

/// Source of OAuth access tokens.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

/// A fixed token.
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Token printed by the gcloud CLI for its active account.
#[derive(Debug, Clone)]
pub struct GcloudToken {
    program: String,
}

impl GcloudToken {
    pub fn new() -> Self {
        Self {
            program: "gcloud".to_string(),
        }
    }

    /// Use a different executable (e.g. a wrapper script).
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }
}

impl Default for GcloudToken {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenSource for GcloudToken {
    async fn access_token(&self) -> Result<String> {
        debug!(program = %self.program, "Requesting access token from gcloud");
        let output = tokio::process::Command::new(&self.program)
            .args(["auth", "print-access-token"])
            .output()
            .await
            .map_err(|e| {
                VaiaeError::Authentication(format!(
                    "failed to run `{} auth print-access-token`: {e}",
                    self.program
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VaiaeError::Authentication(format!(
                "`{} auth print-access-token` failed: {}",
                self.program,
                stderr.trim()
            )));
        }

        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if token.is_empty() {
            return Err(VaiaeError::Authentication(
                "gcloud returned an empty access token".to_string(),
            ));
        }
        Ok(token)
    }
}

/// Ambient credentials: [`ACCESS_TOKEN_ENV`] first, then gcloud.
///
/// The first token obtained is reused for the rest of the process.
pub struct DefaultTokenSource {
    fallback: Arc<dyn TokenSource>,
    cached: OnceCell<String>,
}

impl DefaultTokenSource {
    pub fn new() -> Self {
        Self::with_fallback(Arc::new(GcloudToken::new()))
    }

    pub fn with_fallback(fallback: Arc<dyn TokenSource>) -> Self {
        Self {
            fallback,
            cached: OnceCell::new(),
        }
    }
}

impl Default for DefaultTokenSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenSource for DefaultTokenSource {
    async fn access_token(&self) -> Result<String> {
        let token = self
            .cached
            .get_or_try_init(|| async {
                match std::env::var(ACCESS_TOKEN_ENV) {
                    Ok(token) if !token.trim().is_empty() => {
                        debug!("Using access token from {ACCESS_TOKEN_ENV}");
                        Ok(token.trim().to_string())
                    }
                    _ => self.fallback.access_token().await,
                }
            })
            .await?;
        Ok(token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingToken(AtomicUsize);

    #[async_trait]
    impl TokenSource for CountingToken {
        async fn access_token(&self) -> Result<String> {
            let n = self.0.fetch_add(1, Ordering::SeqCst);
            Ok(format!("token-{n}"))
        }
    }

    #[tokio::test]
    async fn static_token_is_returned_verbatim() {
        let source = StaticToken::new("abc");
        assert_eq!(source.access_token().await.unwrap(), "abc");
    }

    #[tokio::test]
    async fn default_source_caches_fallback_token() {
        if std::env::var(ACCESS_TOKEN_ENV).is_ok() {
            return;
        }
        let fallback = Arc::new(CountingToken(AtomicUsize::new(0)));
        let source = DefaultTokenSource::with_fallback(fallback.clone());

        assert_eq!(source.access_token().await.unwrap(), "token-0");
        assert_eq!(source.access_token().await.unwrap(), "token-0");
        assert_eq!(fallback.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gcloud_reports_missing_program() {
        let source = GcloudToken::new().with_program("/nonexistent/gcloud-binary");
        let err = source.access_token().await.unwrap_err();
        assert!(matches!(err, VaiaeError::Authentication(_)));
    }
}
