//! Per-run and per-task state handed to destinations.

use reqwest::Client;
use seedcast_core::{
    build_http_client, ArtifactStore, DestinationCredentials, DestinationId, NetworkConfig, Result, RunId,
};
use std::path::PathBuf;
use std::sync::Arc;

/// Collaborator output every destination uploads: the finished torrent,
/// the rendered description and hosted screenshots.
#[derive(Debug, Clone)]
pub struct UploadPackage {
    /// Torrent file bytes
    pub torrent: Arc<[u8]>,
    /// Rendered description (BBCode or markdown)
    pub description: String,
    /// Hosted image URLs
    pub images: Vec<String>,
}

impl Default for UploadPackage {
    fn default() -> Self {
        Self {
            torrent: Arc::from(Vec::new()),
            description: String::new(),
            images: Vec::new(),
        }
    }
}

/// State shared read-only by every task of one run.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Identifier of this run
    pub run_id: RunId,
    /// Root for `cookies/`, `tmp/` and `data/`
    pub base_dir: PathBuf,
    /// Network settings
    pub network: NetworkConfig,
    /// Client for search, probe, upload and confirmation requests
    pub client: Client,
    /// Where failure artifacts go
    pub artifacts: ArtifactStore,
}

impl RunContext {
    /// Build the context, creating the HTTP client.
    pub fn new(run_id: RunId, base_dir: PathBuf, network: NetworkConfig) -> Result<Self> {
        let client = build_http_client(&network)?;
        let artifacts = ArtifactStore::new(&base_dir, &run_id);
        Ok(Self {
            run_id,
            base_dir,
            network,
            client,
            artifacts,
        })
    }
}

/// What one destination task may see.
///
/// Each task gets its own copy of the credentials; the run context is
/// shared behind an `Arc` and never mutated.
#[derive(Debug, Clone)]
pub struct TaskContext {
    /// Destination the task runs for
    pub destination: DestinationId,
    /// Credentials from the config file
    pub credentials: DestinationCredentials,
    /// Shared run state
    pub run: Arc<RunContext>,
}

impl TaskContext {
    /// Create a task context.
    #[must_use]
    pub fn new(
        destination: DestinationId,
        credentials: DestinationCredentials,
        run: Arc<RunContext>,
    ) -> Self {
        Self {
            destination,
            credentials,
            run,
        }
    }

    /// Configured API key, if non-empty.
    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.credentials
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}
