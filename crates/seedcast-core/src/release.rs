//! Release facts and destination search candidates.
//!
//! A [`ReleaseDescriptor`] is built once per run by the metadata collaborator
//! and cloned into every destination task. Tasks may adjust their own copy
//! (naming conventions differ per site) but never see each other's.

use serde::{Deserialize, Serialize};

/// Broad content category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Category {
    /// Feature film
    Movie,
    /// Episode or season of a series
    Tv,
}

/// How the release was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReleaseType {
    /// Untouched disc streams in a new container
    Remux,
    /// Re-encoded from a higher quality source
    Encode,
    /// Untouched web stream
    WebDl,
    /// Re-encoded web stream
    WebRip,
    /// Broadcast capture
    Hdtv,
    /// Encoded from a DVD
    DvdRip,
    /// Full disc structure
    Disc,
}

impl ReleaseType {
    /// Web-sourced releases (used by the DV implies HDR rule).
    #[must_use]
    pub fn is_web(self) -> bool {
        matches!(self, Self::WebDl | Self::WebRip)
    }
}

/// Full-disc layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DiscKind {
    /// Blu-ray folder structure
    Bdmv,
    /// DVD `VIDEO_TS` structure
    Dvd,
    /// HD DVD structure
    Hddvd,
}

/// Immutable snapshot of the facts describing one release.
///
/// Every optional field means "unknown"; rules that depend on an unknown
/// field impose no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct ReleaseDescriptor {
    /// Release name as it will be uploaded
    pub name: String,
    /// Name of the source file or folder on disk
    pub source_name: Option<String>,
    /// Title of the movie or show, used as the search query
    pub title: Option<String>,
    /// Release year
    pub year: Option<u32>,
    /// TMDB identifier
    pub tmdb_id: Option<u64>,
    /// IMDb identifier without the `tt` prefix
    pub imdb_id: Option<u64>,
    /// Movie or TV
    pub category: Option<Category>,
    /// Remux, encode, WEB-DL, ...
    pub release_type: Option<ReleaseType>,
    /// Full-disc layout, when the release is a disc
    pub disc: Option<DiscKind>,
    /// Resolution label such as `1080p` or `2160p`
    pub resolution: Option<String>,
    /// Source label such as `BluRay`, `WEB` or `NTSC DVD`
    pub source: Option<String>,
    /// HDR terms such as `DV HDR10`
    pub hdr: Option<String>,
    /// Video codec/encoder such as `x264` or `H.265`
    pub video_codec: Option<String>,
    /// Season token such as `S01`
    pub season: Option<String>,
    /// Episode token such as `E02` (may list several: `E01E02`)
    pub episode: Option<String>,
    /// Whether this is a full season pack
    pub tv_pack: bool,
    /// Group tag including the leading dash, e.g. `-NTb`
    pub tag: Option<String>,
    /// Total payload size in bytes
    pub file_size: Option<u64>,
    /// File names contained in the release
    pub files: Vec<String>,
    /// Standard definition release
    pub sd: bool,
    /// Repack or proper
    pub repack: bool,
}

impl ReleaseDescriptor {
    /// Create a descriptor with only a name set.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Group tag without the leading dash, lowercased. `None` when unknown.
    #[must_use]
    pub fn group(&self) -> Option<String> {
        self.tag
            .as_deref()
            .map(|tag| tag.trim().trim_start_matches('-').trim().to_lowercase())
            .filter(|tag| !tag.is_empty())
    }

    /// DVD disc, DVD rip, or any source mentioning DVD.
    #[must_use]
    pub fn is_dvd_derived(&self) -> bool {
        self.disc == Some(DiscKind::Dvd)
            || self.release_type == Some(ReleaseType::DvdRip)
            || self
                .source
                .as_deref()
                .is_some_and(|source| source.to_uppercase().contains("DVD"))
    }
}

/// One entry from a destination's search response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateMatch {
    /// Listed torrent name
    pub name: String,
    /// Listed size in bytes
    pub size: Option<u64>,
    /// Details page link
    pub link: Option<String>,
    /// File names inside the listed torrent, when the destination exposes them
    pub files: Vec<String>,
    /// Number of files, when known
    pub file_count: Option<usize>,
    /// Destination marked this torrent as replaceable by a better release
    pub trumpable: bool,
}

impl CandidateMatch {
    /// Create a candidate with only a name set.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}
