//! End-of-run aggregation.

use seedcast_core::{DestinationId, DestinationStatus, SECRET_WARNING};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::PathBuf;

/// Every destination's status, in the order the destinations were given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    statuses: Vec<DestinationStatus>,
}

impl RunSummary {
    /// Wrap finished statuses.
    #[must_use]
    pub fn new(statuses: Vec<DestinationStatus>) -> Self {
        Self { statuses }
    }

    /// All statuses.
    #[must_use]
    pub fn statuses(&self) -> &[DestinationStatus] {
        &self.statuses
    }

    /// Status of one destination.
    #[must_use]
    pub fn status(&self, destination: &DestinationId) -> Option<&DestinationStatus> {
        self.statuses.iter().find(|s| s.destination() == destination)
    }

    /// Destinations that were neither banned, skipped nor flagged.
    #[must_use]
    pub fn passed(&self) -> Vec<&DestinationId> {
        self.select(DestinationStatus::passed)
    }

    /// Destinations skipped or banned.
    #[must_use]
    pub fn skipped(&self) -> Vec<&DestinationId> {
        self.select(|s| s.skipped() || s.banned())
    }

    /// Destinations flagged with duplicates.
    #[must_use]
    pub fn dupes(&self) -> Vec<&DestinationId> {
        self.select(DestinationStatus::dupe)
    }

    /// Destinations the release was uploaded to.
    #[must_use]
    pub fn uploaded(&self) -> Vec<&DestinationId> {
        self.select(DestinationStatus::uploaded)
    }

    /// Artifact paths from every destination.
    #[must_use]
    pub fn artifacts(&self) -> Vec<&PathBuf> {
        self.statuses.iter().flat_map(|s| s.artifacts()).collect()
    }

    /// Statuses with secrets scrubbed, for export.
    #[must_use]
    pub fn redacted(&self) -> Vec<DestinationStatus> {
        self.statuses.iter().map(DestinationStatus::redacted).collect()
    }

    fn select(&self, keep: impl Fn(&DestinationStatus) -> bool) -> Vec<&DestinationId> {
        self.statuses
            .iter()
            .filter(|s| keep(s))
            .map(DestinationStatus::destination)
            .collect()
    }

    /// Plain-text table for the console.
    #[must_use]
    pub fn render_table(&self) -> String {
        let mark = |flag: bool| if flag { "x" } else { "" };
        let width = self
            .statuses
            .iter()
            .map(|s| s.destination().as_str().len())
            .max()
            .unwrap_or(0)
            .max("Destination".len());

        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:<width$} | {:^6} | {:^7} | {:^4} | {:^8} | Message",
            "Destination", "Banned", "Skipped", "Dupe", "Uploaded"
        );
        let _ = writeln!(out, "{}", "-".repeat(width + 44));
        for status in self.redacted() {
            let _ = writeln!(
                out,
                "{:<width$} | {:^6} | {:^7} | {:^4} | {:^8} | {}",
                status.destination().as_str(),
                mark(status.banned()),
                mark(status.skipped()),
                mark(status.dupe()),
                mark(status.uploaded()),
                status.status_message().unwrap_or_default().replace('\n', " ")
            );
        }

        let _ = writeln!(
            out,
            "\n{} of {} destination(s) uploaded.",
            self.uploaded().len(),
            self.statuses.len()
        );

        let artifacts = self.artifacts();
        if !artifacts.is_empty() {
            let _ = writeln!(out, "\nSaved responses ({SECRET_WARNING}):");
            for path in artifacts {
                let _ = writeln!(out, "  {}", path.display());
            }
        }

        out
    }
}
