//! Name normalization and HDR term extraction.

use regex::Regex;
use std::sync::OnceLock;

/// Substrings that identify an untouched web stream in a normalized name.
pub const WEB_DL_TERMS: &[&str] = &["web-dl", "webdl", "web dl"];

/// Lowercase a release name and turn dots and underscores into single spaces.
///
/// `Show.S01E02.1080p.WEB-DL.DDP5.1.H.264-GRP` becomes
/// `show s01e02 1080p web-dl ddp5 1 h 264-grp`.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase()
        .replace(['.', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalized form used for exact-name comparison.
///
/// On top of [`normalize_name`], `DD+` becomes `DDP` and split channel layouts
/// (`ddp 5 1`) are joined to the codec (`ddp5 1`).
#[must_use]
pub fn comparable_name(name: &str) -> String {
    static AUDIO: OnceLock<Regex> = OnceLock::new();
    let audio = AUDIO.get_or_init(|| Regex::new(r"\b(ddp|dd|ac3|dts) (\d)").expect("valid regex"));

    let normalized = normalize_name(&name.replace("DD+", "DDP").replace("dd+", "ddp"));
    audio.replace_all(&normalized, "$1$2").into_owned()
}

/// Whether a normalized name carries a WEB-DL term.
#[must_use]
pub fn has_web_dl_term(normalized: &str) -> bool {
    WEB_DL_TERMS.iter().any(|term| normalized.contains(term))
}

/// HDR taxonomy reduced to two symbols.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HdrTerms {
    /// Any HDR10/HDR10+/HDR flavor
    pub hdr: bool,
    /// Dolby Vision
    pub dv: bool,
}

impl HdrTerms {
    /// Extract HDR terms from free text (a release name or an HDR field).
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let normalized = normalize_name(text);
        let mut terms = Self::default();
        for token in normalized.split(|c: char| c.is_whitespace() || c == '-') {
            match token {
                "dv" | "dovi" => terms.dv = true,
                t if t.starts_with("hdr") => terms.hdr = true,
                _ => {}
            }
        }
        if normalized.contains("dolby vision") {
            terms.dv = true;
        }
        terms
    }

    /// No HDR terms at all.
    #[must_use]
    pub fn is_empty(self) -> bool {
        !self.hdr && !self.dv
    }

    /// Add HDR when DV is present and the implication applies.
    #[must_use]
    pub fn with_dv_implying_hdr(self, implies: bool) -> Self {
        Self {
            hdr: self.hdr || (self.dv && implies),
            dv: self.dv,
        }
    }
}
