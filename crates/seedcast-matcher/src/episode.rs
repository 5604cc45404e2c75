//! Season and episode matching for TV releases.
//!
//! A candidate whose name carries no `E\d\d` token is a season pack. Season
//! packs match any requested episode of their season; episode releases must
//! share the season and at least one requested episode.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// Widest `sNN-sMM` range expanded into every season in between.
const MAX_SEASON_SPAN: u32 = 100;

/// Seasons and episodes named by a normalized release name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EpisodeTokens {
    /// Season numbers found (`s01` -> 1)
    pub seasons: BTreeSet<u32>,
    /// Episode numbers found (`e02` -> 2)
    pub episodes: BTreeSet<u32>,
}

impl EpisodeTokens {
    /// Scan the tokens of a normalized name.
    ///
    /// Hyphens split tokens too, so `s01-s03` names seasons 1 through 3 and
    /// `s01e01-e02` names two episodes.
    #[must_use]
    pub fn scan(normalized: &str) -> Self {
        static RANGE: OnceLock<Regex> = OnceLock::new();
        static SEASON: OnceLock<Regex> = OnceLock::new();
        static EPISODE: OnceLock<Regex> = OnceLock::new();
        let range = RANGE.get_or_init(|| Regex::new(r"^s(\d{1,4})-s(\d{1,4})$").expect("valid regex"));
        let season = SEASON.get_or_init(|| Regex::new(r"^s(\d{1,4})((?:e\d{2,4})*)$").expect("valid regex"));
        let episode = EPISODE.get_or_init(|| Regex::new(r"e(\d{2,4})").expect("valid regex"));

        let mut tokens = Self::default();
        for word in normalized.split_whitespace() {
            if let Some(caps) = range.captures(word) {
                let bound = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
                if let (Some(first), Some(last)) = (bound(1), bound(2)) {
                    if first <= last && last - first <= MAX_SEASON_SPAN {
                        tokens.seasons.extend(first..=last);
                    } else {
                        tokens.seasons.extend([first, last]);
                    }
                }
                continue;
            }
            for token in word.split('-').filter(|t| !t.is_empty()) {
                if let Some(caps) = season.captures(token) {
                    if let Some(number) = caps.get(1).and_then(|m| m.as_str().parse().ok()) {
                        tokens.seasons.insert(number);
                    }
                    if let Some(rest) = caps.get(2) {
                        tokens.episodes.extend(numbers(episode, rest.as_str()));
                    }
                } else if token.len() >= 3 && token.starts_with('e') && token[1..].bytes().all(|b| b.is_ascii_digit()) {
                    tokens.episodes.extend(numbers(episode, token));
                }
            }
        }
        tokens
    }

    /// No episode token: the candidate is a season pack.
    #[must_use]
    pub fn is_season_pack(&self) -> bool {
        self.episodes.is_empty()
    }
}

fn numbers<'a>(pattern: &'a Regex, text: &'a str) -> impl Iterator<Item = u32> + 'a {
    pattern
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).and_then(|m| m.as_str().parse().ok()))
}

/// Season number from a token such as `S01`. `None` when absent or malformed.
#[must_use]
pub fn parse_season(season: Option<&str>) -> Option<u32> {
    static SEASON: OnceLock<Regex> = OnceLock::new();
    let pattern = SEASON.get_or_init(|| Regex::new(r"(?i)s(\d+)").expect("valid regex"));
    pattern
        .captures(season?)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Every number in an episode token such as `E01E02`.
#[must_use]
pub fn parse_episodes(episode: Option<&str>) -> Vec<u32> {
    static DIGITS: OnceLock<Regex> = OnceLock::new();
    let pattern = DIGITS.get_or_init(|| Regex::new(r"\d+").expect("valid regex"));
    episode
        .map(|text| {
            pattern
                .find_iter(text)
                .filter_map(|m| m.as_str().parse().ok())
                .collect()
        })
        .unwrap_or_default()
}

/// Whether a normalized candidate name fits the requested season/episodes.
///
/// With no requested season there is no constraint. With no requested
/// episodes (the release is itself a season pack) only season packs of the
/// same season match.
#[must_use]
pub fn season_episode_matches(normalized: &str, season: Option<u32>, episodes: &[u32]) -> bool {
    let Some(season) = season else {
        return true;
    };
    let tokens = EpisodeTokens::scan(normalized);
    if !tokens.seasons.contains(&season) {
        return false;
    }
    if episodes.is_empty() {
        return tokens.is_season_pack();
    }
    tokens.is_season_pack() || episodes.iter().any(|e| tokens.episodes.contains(e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize_name;

    #[test]
    fn test_scan_tokens() {
        let tokens = EpisodeTokens::scan(&normalize_name("Show.S01E02E03.1080p.WEB-DL"));
        assert_eq!(tokens.seasons, BTreeSet::from([1]));
        assert_eq!(tokens.episodes, BTreeSet::from([2, 3]));

        let pack = EpisodeTokens::scan(&normalize_name("Show.S02.1080p.BluRay.x264"));
        assert!(pack.is_season_pack());
        assert_eq!(pack.seasons, BTreeSet::from([2]));
    }

    #[test]
    fn test_scan_ignores_codec_tokens() {
        let tokens = EpisodeTokens::scan(&normalize_name("Show.S01.2160p.HEVC.E-AC3.DDP5.1"));
        assert!(tokens.is_season_pack());
    }

    #[test]
    fn test_scan_multi_season_pack() {
        let tokens = EpisodeTokens::scan(&normalize_name("Show.S01-S03.1080p.WEB-DL.DDP5.1.H.264-GRP"));
        assert!(tokens.is_season_pack());
        assert_eq!(tokens.seasons, BTreeSet::from([1, 2, 3]));

        let split = EpisodeTokens::scan(&normalize_name("Show.S02-E05.720p.HDTV"));
        assert_eq!(split.seasons, BTreeSet::from([2]));
        assert_eq!(split.episodes, BTreeSet::from([5]));

        let joined = EpisodeTokens::scan(&normalize_name("Show.S01E01-E02.1080p.WEB-DL"));
        assert_eq!(joined.episodes, BTreeSet::from([1, 2]));
    }

    #[test]
    fn test_multi_season_pack_covers_inner_seasons() {
        let pack = normalize_name("Show.S01-S03.1080p.WEB-DL.DDP5.1.H.264-GRP");
        assert!(season_episode_matches(&pack, Some(1), &[2]));
        assert!(season_episode_matches(&pack, Some(2), &[]));
        assert!(season_episode_matches(&pack, Some(3), &[7]));
        assert!(!season_episode_matches(&pack, Some(4), &[1]));
    }

    #[test]
    fn test_parse_targets() {
        assert_eq!(parse_season(Some("S01")), Some(1));
        assert_eq!(parse_season(Some("garbage")), None);
        assert_eq!(parse_season(None), None);
        assert_eq!(parse_episodes(Some("E01E02")), vec![1, 2]);
        assert!(parse_episodes(None).is_empty());
    }

    #[test]
    fn test_season_pack_matches_any_episode() {
        let pack = normalize_name("Show.S01.1080p.WEB-DL.DDP5.1.H.264");
        assert!(season_episode_matches(&pack, Some(1), &[2]));
        assert!(season_episode_matches(&pack, Some(1), &[9]));
        assert!(!season_episode_matches(&pack, Some(2), &[2]));
    }

    #[test]
    fn test_episode_must_match() {
        let episode = normalize_name("Show.S01E03.1080p.WEB-DL");
        assert!(!season_episode_matches(&episode, Some(1), &[2]));
        assert!(season_episode_matches(&episode, Some(1), &[2, 3]));
    }

    #[test]
    fn test_season_pack_release_only_matches_packs() {
        let episode = normalize_name("Show.S01E03.1080p.WEB-DL");
        let pack = normalize_name("Show.S01.1080p.WEB-DL");
        assert!(!season_episode_matches(&episode, Some(1), &[]));
        assert!(season_episode_matches(&pack, Some(1), &[]));
    }

    #[test]
    fn test_no_season_is_no_constraint() {
        assert!(season_episode_matches("anything at all", None, &[4]));
    }
}
