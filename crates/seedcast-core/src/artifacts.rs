//! Debug artifacts for failed logins, searches and uploads.
//!
//! Response bodies are written under `<base>/tmp/<run-id>/` so an operator
//! can see what the destination actually answered.

use crate::error::Result;
use crate::types::{DestinationId, RunId};
use std::path::{Path, PathBuf};

/// Printed whenever an artifact is written.
pub const SECRET_WARNING: &str =
    "debug artifacts may contain passkeys or session identifiers; do not share them";

/// Which step produced the artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Session validation or login failed
    FailedLogin,
    /// Search answered with something other than results
    FailedSearch,
    /// Upload was not classified as a success
    FailedUpload,
}

impl ArtifactKind {
    /// File name for this artifact on a destination.
    #[must_use]
    pub fn file_name(self, destination: &DestinationId) -> String {
        match self {
            Self::FailedLogin => format!("[{destination}]Failed_Login.html"),
            Self::FailedSearch => format!("[{destination}]Failed_Search.html"),
            Self::FailedUpload => format!("[{destination}]Failed_Upload.html"),
        }
    }
}

/// Writes artifacts for one run.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Store rooted at `<base_dir>/tmp/<run_id>`.
    #[must_use]
    pub fn new(base_dir: &Path, run_id: &RunId) -> Self {
        Self {
            dir: base_dir.join("tmp").join(run_id.as_str()),
        }
    }

    /// Directory artifacts for this run are written to.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist a response body and return where it went.
    pub async fn save(
        &self,
        destination: &DestinationId,
        kind: ArtifactKind,
        body: &str,
    ) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(kind.file_name(destination));
        tokio::fs::write(&path, body).await?;
        tracing::warn!(
            destination = %destination,
            path = %path.display(),
            "Saved response body for inspection; {}",
            SECRET_WARNING
        );
        Ok(path)
    }
}
