//! Policy sources.
//!
//! # Responsibilities
//! - Define the fetch contract the watcher polls against
//! - Fetch the policy set from the control plane over HTTP
//! - Read policy definitions from a local directory
//!
//! # Design Decisions
//! - Every fetch returns a fresh owned snapshot; the watcher diffs by value
//! - Failures are typed and left to the caller; the next tick is the retry
//! - Directory mode goes through the same poll loop as the platform mode,
//!   so both sources share one reconciliation path

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::acp::schema::{AcpConfig, AcpSet};

const PLATFORM_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Error type for policy fetches.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("platform request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("platform returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("read policy directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("decode policy definition {name:?}: {source}")]
    Decode {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Contract between the watcher and whatever supplies policies.
///
/// Implementations must be safe to call repeatedly; results are compared
/// structurally across calls.
#[async_trait]
pub trait PolicySource: Send + Sync {
    /// Fetch the current policy set as a fresh snapshot.
    async fn fetch(&self) -> Result<AcpSet, FetchError>;
}

/// Control plane client fetching policies over HTTP.
pub struct PlatformClient {
    base_url: Url,
    token: String,
    client: reqwest::Client,
}

impl PlatformClient {
    /// Create a client for the given control plane URL and access token.
    pub fn new(base_url: Url, token: String) -> Self {
        Self {
            base_url,
            token,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl PolicySource for PlatformClient {
    async fn fetch(&self) -> Result<AcpSet, FetchError> {
        let endpoint = format!("{}/acps", self.base_url.as_str().trim_end_matches('/'));

        let response = self
            .client
            .get(&endpoint)
            .bearer_auth(&self.token)
            .timeout(PLATFORM_REQUEST_TIMEOUT)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }

        Ok(response.json::<AcpSet>().await?)
    }
}

/// Policy source reading one JSON definition per file from a directory.
///
/// The file stem is the policy name; files without a `.json` extension
/// are ignored.
pub struct DirSource {
    dir: PathBuf,
}

impl DirSource {
    /// Create a source for the given policy directory.
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

#[async_trait]
impl PolicySource for DirSource {
    async fn fetch(&self) -> Result<AcpSet, FetchError> {
        let mut acps = HashMap::new();

        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            let name = match path.file_stem().and_then(|s| s.to_str()) {
                Some(name) => name.to_string(),
                None => continue,
            };

            let raw = tokio::fs::read(&path).await?;
            let config: AcpConfig =
                serde_json::from_slice(&raw).map_err(|e| FetchError::Decode {
                    name: name.clone(),
                    source: e,
                })?;

            acps.insert(name, config);
        }

        Ok(acps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dir_source_reads_json_definitions() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("my-jwt.json"),
            r#"{"jwt": {"signing_secret": "s3cr3t"}}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let source = DirSource::new(dir.path().to_path_buf());
        let acps = source.fetch().await.unwrap();

        assert_eq!(acps.len(), 1);
        let config = acps.get("my-jwt").expect("policy named by file stem");
        assert_eq!(
            config.jwt.as_ref().unwrap().signing_secret.as_deref(),
            Some("s3cr3t")
        );
    }

    #[tokio::test]
    async fn test_dir_source_rejects_malformed_definition() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.json"), "{not json").unwrap();

        let source = DirSource::new(dir.path().to_path_buf());
        let err = source.fetch().await.unwrap_err();

        assert!(matches!(err, FetchError::Decode { ref name, .. } if name == "broken"));
    }
}
