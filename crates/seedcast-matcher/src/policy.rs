//! Per-destination duplicate policy table.
//!
//! Site policies that only hold for particular destinations live here as
//! data instead of inline conditionals in the rules. A destination
//! definition can replace its row with a `[matcher]` table.

use seedcast_core::DestinationId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

/// When Dolby Vision counts as HDR for comparison purposes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DvImplication {
    /// DV implies HDR unless the release is a web release
    #[default]
    UnlessWeb,
    /// DV always implies HDR
    Always,
    /// DV and HDR are compared independently
    Never,
}

impl DvImplication {
    /// Whether DV implies HDR for a release of this kind.
    #[must_use]
    pub fn applies(self, web_release: bool) -> bool {
        match self {
            Self::UnlessWeb => !web_release,
            Self::Always => true,
            Self::Never => false,
        }
    }
}

/// Single-result size policy: a much larger local file is not a dupe of the
/// only listed release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizeDeltaPolicy {
    /// Relative size difference at which the candidate stops being a dupe
    pub threshold: f64,
    /// Resolution substring the release must carry
    pub resolution: String,
    /// Codec substring the release must carry
    pub codec: String,
}

impl Default for SizeDeltaPolicy {
    fn default() -> Self {
        Self {
            threshold: 0.20,
            resolution: "1080".to_string(),
            codec: "x264".to_string(),
        }
    }
}

/// Rule switches for one destination.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct DestinationPolicy {
    /// Release file names match candidate files by containment, not equality
    pub substring_file_match: bool,
    /// A candidate with the same normalized name is a dupe
    pub exact_name_match: bool,
    /// 2160p `FraMeSToR` releases are always dupes
    pub framestor_exception: bool,
    /// BDMV releases match on the group tag alone
    pub disc_tag_shortcut: bool,
    /// SD releases are dupes of any HD listing
    pub sd_listing: bool,
    /// DVD releases match on the group tag alone
    pub dvd_tag_shortcut: bool,
    /// DVD releases are not dupes of HD listings
    pub dvd_hd_exempt: bool,
    /// DV to HDR implication
    pub dv_implication: DvImplication,
    /// Single-result size policy
    pub size_delta: Option<SizeDeltaPolicy>,
    /// Candidates must carry the release's group tag
    pub group_tag_required: bool,
}

/// Lookup of [`DestinationPolicy`] by destination.
#[derive(Debug, Clone, Default)]
pub struct PolicyTable {
    rows: HashMap<String, DestinationPolicy>,
}

impl PolicyTable {
    /// Empty table; every destination gets the default policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with the policies of well-known destinations.
    #[must_use]
    pub fn builtin() -> Self {
        let size_delta = Some(SizeDeltaPolicy::default());
        let mut table = Self::new();

        table.set_row(
            "AITHER",
            DestinationPolicy {
                disc_tag_shortcut: true,
                sd_listing: true,
                dvd_tag_shortcut: true,
                size_delta: size_delta.clone(),
                ..DestinationPolicy::default()
            },
        );
        table.set_row(
            "LST",
            DestinationPolicy {
                disc_tag_shortcut: true,
                dvd_tag_shortcut: true,
                ..DestinationPolicy::default()
            },
        );
        table.set_row(
            "HDB",
            DestinationPolicy {
                disc_tag_shortcut: true,
                ..DestinationPolicy::default()
            },
        );
        table.set_row(
            "BHD",
            DestinationPolicy {
                exact_name_match: true,
                framestor_exception: true,
                disc_tag_shortcut: true,
                sd_listing: true,
                dvd_hd_exempt: true,
                size_delta: size_delta.clone(),
                ..DestinationPolicy::default()
            },
        );
        table.set_row(
            "MTV",
            DestinationPolicy {
                substring_file_match: true,
                exact_name_match: true,
                framestor_exception: true,
                ..DestinationPolicy::default()
            },
        );
        for id in ["RTF", "AR"] {
            table.set_row(
                id,
                DestinationPolicy {
                    substring_file_match: true,
                    framestor_exception: true,
                    ..DestinationPolicy::default()
                },
            );
        }
        table.set_row(
            "ANT",
            DestinationPolicy {
                dv_implication: DvImplication::Always,
                ..DestinationPolicy::default()
            },
        );
        for id in ["HUNO", "OE", "ULCX"] {
            table.set_row(
                id,
                DestinationPolicy {
                    size_delta: size_delta.clone(),
                    ..DestinationPolicy::default()
                },
            );
        }
        table.set_row(
            "RF",
            DestinationPolicy {
                group_tag_required: true,
                ..DestinationPolicy::default()
            },
        );

        table
    }

    fn set_row(&mut self, id: &str, policy: DestinationPolicy) {
        self.rows.insert(id.to_string(), policy);
    }

    /// Replace the policy of one destination.
    pub fn insert(&mut self, destination: &DestinationId, policy: DestinationPolicy) {
        self.set_row(destination.as_str(), policy);
    }

    /// Policy for a destination, or the default policy.
    #[must_use]
    pub fn policy_for(&self, destination: &DestinationId) -> &DestinationPolicy {
        static DEFAULT: OnceLock<DestinationPolicy> = OnceLock::new();
        self.rows
            .get(destination.as_str())
            .unwrap_or_else(|| DEFAULT.get_or_init(DestinationPolicy::default))
    }
}
