//! Ordered duplicate rules.
//!
//! Every candidate starts out as a duplicate. Each rule either passes
//! ([`ExclusionVerdict::Continue`]) or decides: it keeps the candidate as a
//! duplicate or excludes it. The first decision wins, so the order of
//! [`RULES`] is part of the behavior.

use crate::episode::{parse_episodes, parse_season, season_episode_matches};
use crate::normalize::{comparable_name, has_web_dl_term, normalize_name, HdrTerms};
use crate::policy::DestinationPolicy;
use regex::Regex;
use seedcast_core::{CandidateMatch, Category, DiscKind, ReleaseDescriptor, ReleaseType};
use std::path::Path;
use std::sync::OnceLock;

/// Outcome of one rule for one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExclusionVerdict {
    /// Rule does not apply; evaluate the next one
    Continue,
    /// Candidate is a duplicate; stop evaluating
    Retain,
    /// Candidate is not a duplicate; stop evaluating
    Exclude(String),
}

/// Facts about the local release, derived once per evaluation.
#[derive(Debug, Clone)]
pub struct ReleaseFacts {
    /// Normalized release name
    pub name: String,
    /// Name in exact-comparison form
    pub comparable: String,
    /// Lowercased group tag without the dash
    pub group: Option<String>,
    /// Lowercased resolution
    pub resolution: Option<String>,
    /// HDR terms of the release; `None` when unknown
    pub hdr: Option<HdrTerms>,
    /// Requested season number
    pub season: Option<u32>,
    /// Requested episode numbers
    pub episodes: Vec<u32>,
    /// Base names of the release files
    pub file_names: Vec<String>,
    /// Category
    pub category: Option<Category>,
    /// Release type
    pub release_type: Option<ReleaseType>,
    /// Disc layout
    pub disc: Option<DiscKind>,
    /// DVD disc, DVD rip, or DVD source
    pub dvd_derived: bool,
    /// Standard definition
    pub sd: bool,
    /// Repack/proper
    pub repack: bool,
    /// Name says remux
    pub remux: bool,
    /// Name says UHD
    pub uhd: bool,
    /// Source file name mentions `FraMeSToR`
    pub framestor: bool,
    /// Total size in bytes
    pub file_size: Option<u64>,
    /// Lowercased codec/encoder
    pub video_codec: Option<String>,
}

impl ReleaseFacts {
    /// Derive facts from a descriptor. Absent fields stay absent.
    #[must_use]
    pub fn from_descriptor(release: &ReleaseDescriptor) -> Self {
        let lower_name = release.name.to_lowercase();
        let source_name = release
            .source_name
            .as_deref()
            .unwrap_or_default()
            .to_lowercase();

        Self {
            name: normalize_name(&release.name),
            comparable: comparable_name(&release.name),
            group: release.group(),
            resolution: release
                .resolution
                .as_deref()
                .map(str::to_lowercase)
                .filter(|r| !r.is_empty()),
            hdr: release.hdr.as_deref().map(HdrTerms::parse),
            season: parse_season(release.season.as_deref()),
            episodes: parse_episodes(release.episode.as_deref()),
            file_names: release
                .files
                .iter()
                .filter_map(|f| Path::new(f).file_name())
                .map(|f| f.to_string_lossy().into_owned())
                .collect(),
            category: release.category,
            release_type: release.release_type,
            disc: release.disc,
            dvd_derived: release.is_dvd_derived(),
            sd: release.sd,
            repack: release.repack || source_name.contains("repack"),
            remux: lower_name.contains("remux"),
            uhd: lower_name.contains("uhd"),
            framestor: source_name.contains("framestor"),
            file_size: release.file_size,
            video_codec: release.video_codec.as_deref().map(str::to_lowercase),
        }
    }

    fn is_web(&self) -> bool {
        self.release_type.is_some_and(ReleaseType::is_web)
    }

    fn resolution_contains(&self, needle: &str) -> bool {
        self.resolution.as_deref().is_some_and(|r| r.contains(needle))
    }
}

/// Everything a rule may look at.
#[derive(Debug)]
pub struct MatchContext<'a> {
    /// Local release
    pub release: &'a ReleaseFacts,
    /// Candidate under evaluation
    pub candidate: &'a CandidateMatch,
    /// Normalized candidate name
    pub normalized: String,
    /// Number of candidates the destination returned
    pub candidate_count: usize,
    /// Policy of the destination being searched
    pub policy: &'a DestinationPolicy,
}

impl<'a> MatchContext<'a> {
    /// Build the context for one candidate.
    #[must_use]
    pub fn new(
        release: &'a ReleaseFacts,
        candidate: &'a CandidateMatch,
        candidate_count: usize,
        policy: &'a DestinationPolicy,
    ) -> Self {
        Self {
            release,
            candidate,
            normalized: normalize_name(&candidate.name),
            candidate_count,
            policy,
        }
    }

    /// Whether the group tag appears as a whole word of the candidate name.
    fn carries_group(&self) -> bool {
        self.release
            .group
            .as_deref()
            .is_some_and(|group| contains_word(&self.normalized, &normalize_name(group)))
    }

    fn lists_hd(&self) -> bool {
        ["1080", "720", "2160"]
            .iter()
            .any(|res| self.candidate.name.contains(res))
    }
}

/// `needle` occurs in `haystack` with no alphanumeric neighbour on either side.
fn contains_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.match_indices(needle).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + needle.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

/// A named predicate in the rule chain.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    /// Name reported in diagnostics
    pub name: &'static str,
    /// The predicate
    pub check: fn(&MatchContext<'_>) -> ExclusionVerdict,
}

/// The rule chain, in precedence order.
pub const RULES: &[Rule] = &[
    Rule { name: "exact_file", check: exact_file },
    Rule { name: "exact_name", check: exact_name },
    // Must precede disc_tag_shortcut: a disc release never collides with a
    // single-file listing, even a 2160p FraMeSToR one.
    Rule { name: "raw_disc_extension", check: raw_disc_extension },
    Rule { name: "disc_tag_shortcut", check: disc_tag_shortcut },
    Rule { name: "sd_listing", check: sd_listing },
    Rule { name: "hdr_cross_tier", check: hdr_cross_tier },
    Rule { name: "dvd_category", check: dvd_category },
    Rule { name: "source_mismatch", check: source_mismatch },
    Rule { name: "resolution_mismatch", check: resolution_mismatch },
    Rule { name: "hdr_mismatch", check: hdr_mismatch },
    Rule { name: "dvd_hd_listing", check: dvd_hd_listing },
    Rule { name: "attribute_parity", check: attribute_parity },
    Rule { name: "season_episode", check: season_episode },
    Rule { name: "hdtv_web_listing", check: hdtv_web_listing },
    Rule { name: "size_delta", check: size_delta },
    Rule { name: "group_tag", check: group_tag },
];

/// Rules whose `Retain` means the candidate is the very same release.
pub const EXACT_RULES: &[&str] = &["exact_file", "exact_name"];

/// Run the chain. Returns the deciding rule name and verdict.
#[must_use]
pub fn evaluate(ctx: &MatchContext<'_>) -> (&'static str, ExclusionVerdict) {
    for rule in RULES {
        let verdict = (rule.check)(ctx);
        if verdict != ExclusionVerdict::Continue {
            return (rule.name, verdict);
        }
    }
    ("default", ExclusionVerdict::Retain)
}

/// Same file (by name) with the same file count as the local release.
pub fn exact_file(ctx: &MatchContext<'_>) -> ExclusionVerdict {
    if ctx.release.disc.is_some() || ctx.release.file_names.is_empty() {
        return ExclusionVerdict::Continue;
    }
    let files = &ctx.candidate.files;
    let shares_file = ctx.release.file_names.iter().any(|local| {
        if ctx.policy.substring_file_match {
            files.iter().any(|remote| local.contains(remote.as_str()))
        } else {
            files.contains(local)
        }
    });
    let count = ctx.candidate.file_count.unwrap_or(files.len());
    if shares_file && count > 0 && count == ctx.release.file_names.len() {
        ExclusionVerdict::Retain
    } else {
        ExclusionVerdict::Continue
    }
}

/// Destinations that list releases under exactly our name.
pub fn exact_name(ctx: &MatchContext<'_>) -> ExclusionVerdict {
    if ctx.policy.exact_name_match && comparable_name(&ctx.candidate.name) == ctx.release.comparable {
        ExclusionVerdict::Retain
    } else {
        ExclusionVerdict::Continue
    }
}

/// Disc releases only collide with disc listings.
pub fn raw_disc_extension(ctx: &MatchContext<'_>) -> ExclusionVerdict {
    static EXTENSION: OnceLock<Regex> = OnceLock::new();
    let extension = EXTENSION.get_or_init(|| Regex::new(r"\.\w{2,4}$").expect("valid regex"));

    if ctx.release.disc.is_none() {
        return ExclusionVerdict::Continue;
    }
    let name = ctx.candidate.name.to_lowercase();
    if name.ends_with(".m2ts") {
        ExclusionVerdict::Retain
    } else if extension.is_match(&name) {
        ExclusionVerdict::Exclude("file extension on a disc listing".to_string())
    } else {
        ExclusionVerdict::Continue
    }
}

/// `FraMeSToR` 2160p exception and BDMV group-tag shortcut.
pub fn disc_tag_shortcut(ctx: &MatchContext<'_>) -> ExclusionVerdict {
    if ctx.policy.framestor_exception
        && ctx.release.resolution_contains("2160p")
        && ctx.normalized.contains("2160p")
        && (ctx.normalized.contains("framestor") || ctx.release.framestor)
    {
        return ExclusionVerdict::Retain;
    }
    if ctx.policy.disc_tag_shortcut && ctx.release.disc == Some(DiscKind::Bdmv) {
        return tag_shortcut(ctx);
    }
    ExclusionVerdict::Continue
}

fn tag_shortcut(ctx: &MatchContext<'_>) -> ExclusionVerdict {
    match ctx.release.group.as_deref() {
        None => ExclusionVerdict::Retain,
        Some(_) if ctx.carries_group() => ExclusionVerdict::Retain,
        Some(group) => ExclusionVerdict::Exclude(format!("group '{group}' not in listing")),
    }
}

/// SD releases on destinations without SD categories.
pub fn sd_listing(ctx: &MatchContext<'_>) -> ExclusionVerdict {
    if ctx.release.sd && ctx.policy.sd_listing && ctx.lists_hd() {
        ExclusionVerdict::Retain
    } else {
        ExclusionVerdict::Continue
    }
}

/// A 1080p HDR release is not duplicated by a 2160p listing.
pub fn hdr_cross_tier(ctx: &MatchContext<'_>) -> ExclusionVerdict {
    if ctx.release.hdr.is_some_and(|hdr| !hdr.is_empty())
        && ctx.release.resolution_contains("1080p")
        && ctx.normalized.contains("2160p")
    {
        ExclusionVerdict::Exclude("1080p HDR release against a 2160p listing".to_string())
    } else {
        ExclusionVerdict::Continue
    }
}

/// DVD releases on destinations that match them by group tag.
pub fn dvd_category(ctx: &MatchContext<'_>) -> ExclusionVerdict {
    if ctx.policy.dvd_tag_shortcut && ctx.release.disc == Some(DiscKind::Dvd) {
        tag_shortcut(ctx)
    } else {
        ExclusionVerdict::Continue
    }
}

/// WEB-DL release against an HDTV listing.
pub fn source_mismatch(ctx: &MatchContext<'_>) -> ExclusionVerdict {
    if ctx.release.release_type == Some(ReleaseType::WebDl)
        && ctx.normalized.contains("hdtv")
        && !has_web_dl_term(&ctx.normalized)
    {
        ExclusionVerdict::Exclude("source mismatch: WEB-DL vs HDTV".to_string())
    } else {
        ExclusionVerdict::Continue
    }
}

/// Listing must carry our resolution.
pub fn resolution_mismatch(ctx: &MatchContext<'_>) -> ExclusionVerdict {
    if ctx.release.dvd_derived {
        return ExclusionVerdict::Continue;
    }
    match ctx.release.resolution.as_deref() {
        Some(resolution) if !ctx.normalized.contains(resolution) => {
            ExclusionVerdict::Exclude(format!("resolution '{resolution}' mismatch"))
        }
        _ => ExclusionVerdict::Continue,
    }
}

/// Listing must carry the same HDR terms.
pub fn hdr_mismatch(ctx: &MatchContext<'_>) -> ExclusionVerdict {
    let Some(ours) = ctx.release.hdr else {
        return ExclusionVerdict::Continue;
    };
    if ctx.release.dvd_derived {
        return ExclusionVerdict::Continue;
    }
    let implies = ctx.policy.dv_implication.applies(ctx.release.is_web());
    let mut listed = HdrTerms::parse(&ctx.normalized).with_dv_implying_hdr(implies);
    let mut ours = ours.with_dv_implying_hdr(implies);

    let both = HdrTerms { hdr: true, dv: true };
    let hdr_only = HdrTerms { hdr: true, dv: false };
    if listed == both {
        listed = hdr_only;
        if ours == both {
            ours = hdr_only;
        }
    }

    if listed == ours {
        ExclusionVerdict::Continue
    } else {
        ExclusionVerdict::Exclude(format!("HDR mismatch: expected {ours:?}, got {listed:?}"))
    }
}

/// DVD releases collide with HD listings unless the destination separates them.
pub fn dvd_hd_listing(ctx: &MatchContext<'_>) -> ExclusionVerdict {
    if ctx.release.disc == Some(DiscKind::Dvd) && !ctx.policy.dvd_hd_exempt && ctx.lists_hd() {
        ExclusionVerdict::Retain
    } else {
        ExclusionVerdict::Continue
    }
}

/// Repack, remux and UHD must appear on both sides.
pub fn attribute_parity(ctx: &MatchContext<'_>) -> ExclusionVerdict {
    if ctx.release.repack && !ctx.normalized.contains("repack") && ctx.carries_group() {
        return ExclusionVerdict::Exclude("listing lacks 'repack'".to_string());
    }
    if ctx.release.remux && !ctx.normalized.contains("remux") {
        return ExclusionVerdict::Exclude("listing lacks 'remux'".to_string());
    }
    if ctx.release.uhd && !ctx.normalized.contains("uhd") {
        return ExclusionVerdict::Exclude("listing lacks 'uhd'".to_string());
    }
    ExclusionVerdict::Continue
}

/// TV listings must cover our season and episode.
pub fn season_episode(ctx: &MatchContext<'_>) -> ExclusionVerdict {
    if ctx.release.category != Some(Category::Tv) {
        return ExclusionVerdict::Continue;
    }
    if season_episode_matches(&ctx.normalized, ctx.release.season, &ctx.release.episodes) {
        ExclusionVerdict::Continue
    } else {
        ExclusionVerdict::Exclude("season/episode mismatch".to_string())
    }
}

/// An HDTV release is superseded by a WEB-DL listing.
pub fn hdtv_web_listing(ctx: &MatchContext<'_>) -> ExclusionVerdict {
    if ctx.release.release_type == Some(ReleaseType::Hdtv) && has_web_dl_term(&ctx.normalized) {
        ExclusionVerdict::Retain
    } else {
        ExclusionVerdict::Continue
    }
}

/// The only listing is much smaller than ours.
#[allow(clippy::cast_precision_loss)]
pub fn size_delta(ctx: &MatchContext<'_>) -> ExclusionVerdict {
    let Some(policy) = ctx.policy.size_delta.as_ref() else {
        return ExclusionVerdict::Continue;
    };
    if ctx.candidate_count != 1 || ctx.release.disc == Some(DiscKind::Bdmv) {
        return ExclusionVerdict::Continue;
    }
    let codec_matches = ctx
        .release
        .video_codec
        .as_deref()
        .is_some_and(|codec| codec.contains(&policy.codec.to_lowercase()));
    if !codec_matches || !ctx.release.resolution_contains(&policy.resolution.to_lowercase()) {
        return ExclusionVerdict::Continue;
    }
    let (Some(ours), Some(theirs)) = (ctx.release.file_size, ctx.candidate.size) else {
        return ExclusionVerdict::Continue;
    };
    if theirs == 0 {
        return ExclusionVerdict::Continue;
    }
    let delta = (ours as f64 - theirs as f64) / theirs as f64;
    if delta >= policy.threshold {
        ExclusionVerdict::Exclude(format!("local file is {:.2}% larger", delta * 100.0))
    } else {
        ExclusionVerdict::Continue
    }
}

/// Destinations that only count same-group listings.
pub fn group_tag(ctx: &MatchContext<'_>) -> ExclusionVerdict {
    if !ctx.policy.group_tag_required {
        return ExclusionVerdict::Continue;
    }
    match ctx.release.group.as_deref() {
        None => ExclusionVerdict::Continue,
        Some(_) if ctx.carries_group() => ExclusionVerdict::Retain,
        Some(group) => ExclusionVerdict::Exclude(format!("group '{group}' not in listing")),
    }
}
