//! Seedcast Matcher - decides which search results duplicate a release.
//!
//! Destinations answer a search with loosely related listings. The
//! [`DuplicateMatcher`] runs each one through an ordered chain of named
//! rules ([`rules::RULES`]); a listing is a duplicate unless some rule
//! excludes it. Site-specific behavior is data in a [`PolicyTable`].
//!
//! # Example
//!
//! ```rust
//! use seedcast_core::{CandidateMatch, DestinationId, ReleaseDescriptor};
//! use seedcast_matcher::DuplicateMatcher;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let matcher = DuplicateMatcher::default();
//! let release = ReleaseDescriptor {
//!     resolution: Some("1080p".to_string()),
//!     ..ReleaseDescriptor::named("Movie 2020 1080p BluRay x264-GRP")
//! };
//! let candidates = vec![CandidateMatch::named("Movie.2020.720p.BluRay.x264-GRP")];
//! let dupes = matcher.filter(&candidates, &release, &DestinationId::new("BLU")?);
//! assert!(dupes.is_empty());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]

pub mod episode;
pub mod matcher;
pub mod normalize;
pub mod policy;
pub mod rules;

pub use matcher::{DuplicateMatcher, MatchReport};
pub use policy::{DestinationPolicy, DvImplication, PolicyTable, SizeDeltaPolicy};
pub use rules::{ExclusionVerdict, Rule, RULES};
