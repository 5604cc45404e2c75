//! Shared identifier newtypes.

use crate::error::SeedcastError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Newtype for destination identifiers with validation.
///
/// Destination IDs are the short uppercase site codes (`AITHER`, `BLU`, `RF`),
/// 2-16 characters of `A-Z`, `0-9` or `_`. Input is uppercased before
/// validation so `aither` and `AITHER` name the same destination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DestinationId(String);

impl DestinationId {
    /// Create a new `DestinationId` from a string.
    ///
    /// # Errors
    /// Returns error if the ID doesn't match the required format.
    pub fn new(id: impl Into<String>) -> Result<Self, SeedcastError> {
        let id = id.into().trim().to_uppercase();
        Self::validate(&id)?;
        Ok(Self(id))
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(id: &str) -> Result<(), SeedcastError> {
        static DESTINATION_REGEX: OnceLock<Regex> = OnceLock::new();
        let regex = DESTINATION_REGEX
            .get_or_init(|| Regex::new(r"^[A-Z0-9][A-Z0-9_]{1,15}$").expect("valid regex"));

        if regex.is_match(id) {
            Ok(())
        } else {
            Err(SeedcastError::Validation(format!(
                "invalid destination ID: must be 2-16 characters of A-Z, 0-9 or '_', got '{id}'"
            )))
        }
    }
}

impl fmt::Display for DestinationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for DestinationId {
    type Error = SeedcastError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DestinationId> for String {
    fn from(id: DestinationId) -> Self {
        id.0
    }
}

impl std::str::FromStr for DestinationId {
    type Err = SeedcastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Identifier of one orchestration run; names the artifact directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(String);

impl RunId {
    /// Create a new random `RunId` using UUID v4.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_id_valid() {
        for id in ["AITHER", "BLU", "RF", "OE", "HDB_2"] {
            assert!(DestinationId::new(id).is_ok(), "{id} should be valid");
        }
    }

    #[test]
    fn test_destination_id_uppercases() {
        let id = DestinationId::new(" aither ").expect("valid id");
        assert_eq!(id.as_str(), "AITHER");
        assert_eq!(id, "Aither".parse().expect("parse"));
    }

    #[test]
    fn test_destination_id_invalid() {
        assert!(DestinationId::new("").is_err());
        assert!(DestinationId::new("A").is_err());
        assert!(DestinationId::new("BAD-ID").is_err());
        assert!(DestinationId::new("../etc").is_err());
        assert!(DestinationId::new("ABCDEFGHIJKLMNOPQ").is_err());
    }

    #[test]
    fn test_destination_id_serde() {
        let id: DestinationId = serde_json::from_str("\"blu\"").expect("deserialize");
        assert_eq!(id.as_str(), "BLU");
        assert!(serde_json::from_str::<DestinationId>("\"no/slashes\"").is_err());
        assert_eq!(serde_json::to_string(&id).expect("serialize"), "\"BLU\"");
    }

    #[test]
    fn test_run_id_unique() {
        assert_ne!(RunId::generate(), RunId::generate());
    }
}
