//! Duplicate filtering over a destination's search results.

use crate::policy::PolicyTable;
use crate::rules::{evaluate, ExclusionVerdict, MatchContext, ReleaseFacts, EXACT_RULES};
use seedcast_core::{CandidateMatch, DestinationId, ReleaseDescriptor};
use tracing::debug;

/// Result of evaluating all candidates for one destination.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchReport {
    /// Candidates judged to be duplicates
    pub dupes: Vec<CandidateMatch>,
    /// Duplicates the destination marked trumpable
    pub trumpable: Vec<CandidateMatch>,
    /// Name of a duplicate that is the very same release, if any
    pub exact_match: Option<String>,
}

impl MatchReport {
    /// No duplicates were found.
    #[must_use]
    pub fn is_clear(&self) -> bool {
        self.dupes.is_empty()
    }
}

/// Decides which search results are genuine duplicates of a release.
#[derive(Debug, Clone)]
pub struct DuplicateMatcher {
    policies: PolicyTable,
}

impl Default for DuplicateMatcher {
    fn default() -> Self {
        Self::new(PolicyTable::builtin())
    }
}

impl DuplicateMatcher {
    /// Create a matcher with the given policy table.
    #[must_use]
    pub fn new(policies: PolicyTable) -> Self {
        Self { policies }
    }

    /// Policy table in use.
    #[must_use]
    pub fn policies(&self) -> &PolicyTable {
        &self.policies
    }

    /// Return only the candidates that are duplicates of `release`.
    #[must_use]
    pub fn filter(
        &self,
        candidates: &[CandidateMatch],
        release: &ReleaseDescriptor,
        destination: &DestinationId,
    ) -> Vec<CandidateMatch> {
        self.evaluate(candidates, release, destination).dupes
    }

    /// Evaluate every candidate and report duplicates, trumpable listings
    /// and exact matches.
    #[must_use]
    pub fn evaluate(
        &self,
        candidates: &[CandidateMatch],
        release: &ReleaseDescriptor,
        destination: &DestinationId,
    ) -> MatchReport {
        let facts = ReleaseFacts::from_descriptor(release);
        let policy = self.policies.policy_for(destination);
        let mut report = MatchReport::default();

        for candidate in candidates {
            let ctx = MatchContext::new(&facts, candidate, candidates.len(), policy);
            match evaluate(&ctx) {
                (rule, ExclusionVerdict::Exclude(reason)) => {
                    debug!(
                        destination = %destination,
                        rule,
                        candidate = %candidate.name,
                        "Excluding candidate: {}",
                        reason
                    );
                }
                (rule, _) => {
                    debug!(
                        destination = %destination,
                        rule,
                        candidate = %candidate.name,
                        "Candidate kept as duplicate"
                    );
                    if EXACT_RULES.contains(&rule) && report.exact_match.is_none() {
                        report.exact_match = Some(candidate.name.clone());
                    }
                    if candidate.trumpable {
                        report.trumpable.push(candidate.clone());
                    }
                    report.dupes.push(candidate.clone());
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seedcast_core::{Category, ReleaseType};

    fn id(s: &str) -> DestinationId {
        DestinationId::new(s).expect("valid id")
    }

    fn episode_release() -> ReleaseDescriptor {
        ReleaseDescriptor {
            category: Some(Category::Tv),
            release_type: Some(ReleaseType::WebDl),
            resolution: Some("1080p".to_string()),
            season: Some("S01".to_string()),
            episode: Some("E02".to_string()),
            video_codec: Some("H.264".to_string()),
            ..ReleaseDescriptor::named("Show.S01E02.1080p.WEB-DL.DDP5.1.H.264")
        }
    }

    #[test]
    fn test_season_pack_is_duplicate() {
        let matcher = DuplicateMatcher::default();
        let candidates = vec![CandidateMatch::named("Show.S01.1080p.WEB-DL.DDP5.1.H.264")];
        let dupes = matcher.filter(&candidates, &episode_release(), &id("BLU"));
        assert_eq!(dupes, candidates);
    }

    #[test]
    fn test_lower_resolution_episode_is_excluded() {
        let matcher = DuplicateMatcher::default();
        let candidates = vec![CandidateMatch::named("Show.S01E02.720p.WEB-DL.DDP5.1.H.264")];
        assert!(matcher
            .filter(&candidates, &episode_release(), &id("BLU"))
            .is_empty());
    }

    #[test]
    fn test_trumpable_and_exact_reported() {
        let matcher = DuplicateMatcher::default();
        let release = ReleaseDescriptor {
            files: vec!["Movie.2020.1080p.mkv".to_string()],
            resolution: Some("1080p".to_string()),
            ..ReleaseDescriptor::named("Movie 2020 1080p BluRay x264-GRP")
        };
        let mut exact = CandidateMatch::named("Movie.2020.1080p.BluRay.x264-GRP");
        exact.files = vec!["Movie.2020.1080p.mkv".to_string()];
        exact.trumpable = true;
        let other = CandidateMatch::named("Movie.2020.1080p.BluRay.x264-OTHER");

        let report = matcher.evaluate(&[exact.clone(), other.clone()], &release, &id("AITHER"));
        assert_eq!(report.dupes, vec![exact.clone(), other]);
        assert_eq!(report.trumpable, vec![exact]);
        assert_eq!(
            report.exact_match.as_deref(),
            Some("Movie.2020.1080p.BluRay.x264-GRP")
        );
    }

    #[test]
    fn test_empty_candidates() {
        let matcher = DuplicateMatcher::default();
        let report = matcher.evaluate(&[], &episode_release(), &id("BLU"));
        assert!(report.is_clear());
    }
}
