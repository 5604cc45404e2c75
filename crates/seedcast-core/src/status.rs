//! Per-destination outcome records.

use crate::redact::redact_text;
use crate::types::DestinationId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Result of one submission attempt, folded into a [`DestinationStatus`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadOutcome {
    /// Whether the destination accepted the upload
    pub success: bool,
    /// Identifier the destination assigned to the new torrent
    pub assigned_id: Option<String>,
    /// Human-readable summary
    pub message: String,
    /// Details page for the new torrent
    pub details_url: Option<String>,
    /// Announce URL to seed the new torrent with
    pub announce_url: Option<String>,
    /// Saved response body when the upload failed
    pub artifact: Option<PathBuf>,
}

impl UploadOutcome {
    /// A failed outcome with only a message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            assigned_id: None,
            message: message.into(),
            details_url: None,
            announce_url: None,
            artifact: None,
        }
    }
}

/// Everything one destination task decided and observed.
///
/// Created with every flag cleared. Flags only ever move from `false` to
/// `true`; the message is free to change as the task progresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct DestinationStatus {
    destination: DestinationId,
    banned: bool,
    skipped: bool,
    dupe: bool,
    uploaded: bool,
    status_message: Option<String>,
    assigned_id: Option<String>,
    details_url: Option<String>,
    announce_url: Option<String>,
    duplicates: Vec<String>,
    trumpable: Vec<String>,
    artifacts: Vec<PathBuf>,
    upload_duration_ms: Option<u64>,
}

impl DestinationStatus {
    /// Fresh status for a destination.
    #[must_use]
    pub fn new(destination: DestinationId) -> Self {
        Self {
            destination,
            banned: false,
            skipped: false,
            dupe: false,
            uploaded: false,
            status_message: None,
            assigned_id: None,
            details_url: None,
            announce_url: None,
            duplicates: Vec::new(),
            trumpable: Vec::new(),
            artifacts: Vec::new(),
            upload_duration_ms: None,
        }
    }

    /// Destination this status belongs to.
    #[must_use]
    pub fn destination(&self) -> &DestinationId {
        &self.destination
    }

    /// Release group is banned on the destination.
    #[must_use]
    pub fn banned(&self) -> bool {
        self.banned
    }

    /// Destination was skipped before upload.
    #[must_use]
    pub fn skipped(&self) -> bool {
        self.skipped
    }

    /// Likely duplicates were found.
    #[must_use]
    pub fn dupe(&self) -> bool {
        self.dupe
    }

    /// Destination accepted the upload.
    #[must_use]
    pub fn uploaded(&self) -> bool {
        self.uploaded
    }

    /// Passed eligibility and duplicate checks.
    #[must_use]
    pub fn passed(&self) -> bool {
        !self.banned && !self.skipped && !self.dupe
    }

    /// Latest status message.
    #[must_use]
    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    /// Identifier assigned by the destination.
    #[must_use]
    pub fn assigned_id(&self) -> Option<&str> {
        self.assigned_id.as_deref()
    }

    /// Details page of the uploaded torrent.
    #[must_use]
    pub fn details_url(&self) -> Option<&str> {
        self.details_url.as_deref()
    }

    /// Announce URL the new torrent should be seeded with.
    #[must_use]
    pub fn announce_url(&self) -> Option<&str> {
        self.announce_url.as_deref()
    }

    /// Names of the candidates judged duplicates.
    #[must_use]
    pub fn duplicates(&self) -> &[String] {
        &self.duplicates
    }

    /// Names of duplicates the destination marked trumpable.
    #[must_use]
    pub fn trumpable(&self) -> &[String] {
        &self.trumpable
    }

    /// Debug artifacts written while processing this destination.
    #[must_use]
    pub fn artifacts(&self) -> &[PathBuf] {
        &self.artifacts
    }

    /// Time spent in the upload request.
    #[must_use]
    pub fn upload_duration(&self) -> Option<Duration> {
        self.upload_duration_ms.map(Duration::from_millis)
    }

    /// Mark the release group as banned.
    pub fn mark_banned(&mut self, message: impl Into<String>) {
        self.banned = true;
        self.status_message = Some(message.into());
    }

    /// Mark the destination as skipped.
    pub fn mark_skipped(&mut self, message: impl Into<String>) {
        self.skipped = true;
        self.status_message = Some(message.into());
    }

    /// Flag duplicates. An empty list leaves the status untouched.
    pub fn mark_dupe(&mut self, duplicates: Vec<String>, trumpable: Vec<String>) {
        if duplicates.is_empty() {
            return;
        }
        self.dupe = true;
        self.duplicates = duplicates;
        self.trumpable = trumpable;
    }

    /// Replace the status message.
    pub fn set_message(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
    }

    /// Remember a debug artifact path.
    pub fn add_artifact(&mut self, path: PathBuf) {
        if !self.artifacts.contains(&path) {
            self.artifacts.push(path);
        }
    }

    /// Fold a submission outcome into this status.
    ///
    /// The identifier and details URL are recorded once; a later outcome
    /// cannot clear or replace them.
    pub fn record_outcome(&mut self, outcome: UploadOutcome, elapsed: Duration) {
        if outcome.success {
            self.uploaded = true;
        }
        if self.assigned_id.is_none() {
            self.assigned_id = outcome.assigned_id;
        }
        if self.details_url.is_none() {
            self.details_url = outcome.details_url;
        }
        if self.announce_url.is_none() {
            self.announce_url = outcome.announce_url;
        }
        if let Some(path) = outcome.artifact {
            self.add_artifact(path);
        }
        self.upload_duration_ms = Some(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX));
        self.status_message = Some(outcome.message);
    }

    /// Copy with secrets scrubbed from free-text fields, for export.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.status_message = copy.status_message.map(|m| redact_text(&m));
        copy.details_url = copy.details_url.map(|u| redact_text(&u));
        copy.announce_url = copy.announce_url.map(|u| redact_text(&u));
        copy
    }
}
