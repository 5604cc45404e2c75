//! Checks that decide whether a release may go to a destination at all.

use crate::{
    context::TaskContext,
    definition::{BannedGroup, DestinationDefinition},
};
use seedcast_core::ReleaseDescriptor;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Outcome of an eligibility check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eligibility {
    /// Nothing prevents the upload
    Eligible,
    /// The release group is banned; the operator may override
    Banned {
        /// Group tag as listed by the destination
        group: String,
        /// Conditions or reason attached to the ban
        note: Option<String>,
    },
    /// The destination cannot take this release
    Skip {
        /// Why
        reason: String,
    },
}

impl Eligibility {
    /// Whether the check passed.
    #[must_use]
    pub fn is_eligible(&self) -> bool {
        matches!(self, Self::Eligible)
    }
}

/// Path of a destination's cached banned-group list.
#[must_use]
pub fn banned_groups_path(base_dir: &Path, destination: &str) -> PathBuf {
    base_dir
        .join("data")
        .join("banned")
        .join(format!("{destination}_banned_groups.json"))
}

/// Runs a definition's eligibility rules.
#[derive(Debug, Clone, Copy)]
pub struct EligibilityGate<'a> {
    definition: &'a DestinationDefinition,
}

impl<'a> EligibilityGate<'a> {
    /// Gate for one destination.
    #[must_use]
    pub fn new(definition: &'a DestinationDefinition) -> Self {
        Self { definition }
    }

    /// Banned-group check against every configured source.
    ///
    /// A release with no group tag is never banned.
    pub async fn check_banned(&self, release: &ReleaseDescriptor, ctx: &TaskContext) -> Eligibility {
        let Some(group) = release.group() else {
            return Eligibility::Eligible;
        };

        let hit = self
            .banned_groups(ctx)
            .await
            .into_iter()
            .find(|banned| normalize(&banned.name) == group);

        match hit {
            Some(banned) => {
                debug!(destination = %self.definition.id(), group = %banned.name, "release group is banned");
                Eligibility::Banned {
                    group: banned.name,
                    note: banned.note,
                }
            }
            None => Eligibility::Eligible,
        }
    }

    /// Remaining rules: API key presence and category/type allow-lists.
    #[must_use]
    pub fn check_rules(&self, release: &ReleaseDescriptor, ctx: &TaskContext) -> Eligibility {
        let rules = &self.definition.eligibility;

        if self.definition.requires_api_key() && ctx.api_key().is_none() {
            return Eligibility::Skip {
                reason: format!(
                    "Missing API key in config file for {}",
                    self.definition.id()
                ),
            };
        }

        if let Some(category) = release.category {
            if !rules.allowed_categories.is_empty() && !rules.allowed_categories.contains(&category) {
                return Eligibility::Skip {
                    reason: format!(
                        "{} does not accept {:?} uploads",
                        self.definition.name(),
                        category
                    ),
                };
            }
        }

        if let Some(release_type) = release.release_type {
            if !rules.allowed_types.is_empty() && !rules.allowed_types.contains(&release_type) {
                return Eligibility::Skip {
                    reason: format!(
                        "{} does not accept {:?} releases",
                        self.definition.name(),
                        release_type
                    ),
                };
            }
        }

        Eligibility::Eligible
    }

    /// Inline groups, then the cached list, then groups from the config file.
    pub async fn banned_groups(&self, ctx: &TaskContext) -> Vec<BannedGroup> {
        let mut groups = self.definition.eligibility.banned_groups.clone();

        if self.definition.eligibility.banned_groups_file {
            let path = banned_groups_path(&ctx.run.base_dir, self.definition.id().as_str());
            groups.extend(read_cached_list(&path).await.into_iter().map(|name| BannedGroup {
                name,
                note: None,
            }));
        }

        groups.extend(
            ctx.credentials
                .banned_groups_extra
                .iter()
                .filter(|name| !name.trim().is_empty())
                .map(|name| BannedGroup {
                    name: name.trim().to_string(),
                    note: Some("banned in local config".to_string()),
                }),
        );

        groups
    }
}

fn normalize(name: &str) -> String {
    name.trim().trim_start_matches('-').trim().to_lowercase()
}

/// Group names from a cached list; unreadable files count as empty.
async fn read_cached_list(path: &Path) -> Vec<String> {
    let contents = match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no cached banned-group list");
            return Vec::new();
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read banned-group list");
            return Vec::new();
        }
    };

    let value: Value = match serde_json::from_str(&contents) {
        Ok(value) => value,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring malformed banned-group list");
            return Vec::new();
        }
    };

    match value.get("banned_groups") {
        Some(Value::String(list)) => list
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect(),
        _ => {
            warn!(path = %path.display(), "banned-group list has no banned_groups field");
            Vec::new()
        }
    }
}
