//! Session validation probes.

use crate::error::{Result, SessionError};
use crate::login::extract_first_group;
use regex::Regex;
use seedcast_core::DestinationId;
use serde::{Deserialize, Serialize};

/// Probe settings as written in a destination definition.
///
/// Exactly one of `success_text`, `error_text` and `expected_status` must be
/// set; [`ValidationProbe::from_config`] enforces it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Page that only renders properly for a logged-in user
    pub url: String,
    /// Text that must appear on the page
    #[serde(default)]
    pub success_text: Option<String>,
    /// Text that must not appear on the page
    #[serde(default)]
    pub error_text: Option<String>,
    /// Status code the page must answer with
    #[serde(default)]
    pub expected_status: Option<u16>,
    /// Regex whose first group is a token the upload form needs
    #[serde(default)]
    pub token_pattern: Option<String>,
}

/// How a probe response is judged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeMarker {
    /// Body must contain the text
    SuccessText(String),
    /// Body must not contain the text
    ErrorText(String),
    /// Status must equal the code
    ExpectedStatus(u16),
}

/// A ready-to-run probe.
#[derive(Debug, Clone)]
pub struct ValidationProbe {
    /// URL fetched with the session
    pub url: String,
    /// Success criterion
    pub marker: ProbeMarker,
    /// Token extraction, if the destination needs one
    pub token_pattern: Option<Regex>,
}

impl ValidationProbe {
    /// Build a probe, rejecting zero or several markers and bad patterns.
    pub fn from_config(destination: &DestinationId, config: &ProbeConfig) -> Result<Self> {
        let config_error = |reason: String| SessionError::Configuration {
            destination: destination.to_string(),
            reason,
        };

        let mut markers = Vec::new();
        if let Some(text) = config.success_text.as_ref().filter(|t| !t.is_empty()) {
            markers.push(ProbeMarker::SuccessText(text.clone()));
        }
        if let Some(text) = config.error_text.as_ref().filter(|t| !t.is_empty()) {
            markers.push(ProbeMarker::ErrorText(text.clone()));
        }
        if let Some(code) = config.expected_status {
            markers.push(ProbeMarker::ExpectedStatus(code));
        }
        if markers.len() != 1 {
            return Err(config_error(format!(
                "probe needs exactly one of success_text, error_text or expected_status, found {}",
                markers.len()
            )));
        }
        if config.url.trim().is_empty() {
            return Err(config_error("probe url is empty".to_string()));
        }

        let token_pattern = config
            .token_pattern
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(|e| config_error(format!("invalid token_pattern: {e}")))?;

        Ok(Self {
            url: config.url.clone(),
            marker: markers.remove(0),
            token_pattern,
        })
    }

    /// Judge a probe response.
    ///
    /// `Ok` carries the extracted token, if one was requested. `Err` names
    /// the criterion that failed.
    pub fn check(&self, status: u16, body: &str) -> std::result::Result<Option<String>, String> {
        match &self.marker {
            ProbeMarker::SuccessText(text) if !body.contains(text.as_str()) => {
                return Err(format!("expected text '{text}' not found on the page"));
            }
            ProbeMarker::ErrorText(text) if body.contains(text.as_str()) => {
                return Err(format!("page contains '{text}', which means the session is not logged in"));
            }
            ProbeMarker::ExpectedStatus(code) if *code != status => {
                return Err(format!("expected HTTP {code}, got {status}"));
            }
            _ => {}
        }

        match &self.token_pattern {
            Some(pattern) => extract_first_group(pattern, body)
                .map(Some)
                .ok_or_else(|| format!("token not found with pattern '{pattern}'; the page layout may have changed")),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> DestinationId {
        DestinationId::new("ASC").expect("valid id")
    }

    fn config() -> ProbeConfig {
        ProbeConfig {
            url: "https://tracker.example/index.php".to_string(),
            ..ProbeConfig::default()
        }
    }

    #[test]
    fn test_probe_requires_exactly_one_marker() {
        assert!(matches!(
            ValidationProbe::from_config(&id(), &config()),
            Err(SessionError::Configuration { .. })
        ));

        let two = ProbeConfig {
            success_text: Some("Logout".to_string()),
            expected_status: Some(200),
            ..config()
        };
        assert!(ValidationProbe::from_config(&id(), &two).is_err());

        let one = ProbeConfig {
            error_text: Some("Forgot your password".to_string()),
            ..config()
        };
        let probe = ValidationProbe::from_config(&id(), &one).expect("valid probe");
        assert_eq!(probe.marker, ProbeMarker::ErrorText("Forgot your password".to_string()));
    }

    #[test]
    fn test_check_each_marker() {
        let success = ValidationProbe::from_config(
            &id(),
            &ProbeConfig {
                success_text: Some("Logout".to_string()),
                ..config()
            },
        )
        .expect("probe");
        assert_eq!(success.check(200, "<a>Logout</a>"), Ok(None));
        assert!(success.check(200, "<form>login</form>").is_err());

        let error = ValidationProbe::from_config(
            &id(),
            &ProbeConfig {
                error_text: Some("Forgot your password".to_string()),
                ..config()
            },
        )
        .expect("probe");
        assert!(error.check(200, "Forgot your password?").is_err());
        assert_eq!(error.check(200, "welcome back"), Ok(None));

        let status = ValidationProbe::from_config(
            &id(),
            &ProbeConfig {
                expected_status: Some(200),
                ..config()
            },
        )
        .expect("probe");
        assert_eq!(status.check(302, "").expect_err("wrong status"), "expected HTTP 200, got 302");
    }

    #[test]
    fn test_token_extraction() {
        let probe = ValidationProbe::from_config(
            &id(),
            &ProbeConfig {
                success_text: Some("Logout".to_string()),
                token_pattern: Some(r#"name="_token" value="([^"]+)""#.to_string()),
                ..config()
            },
        )
        .expect("probe");

        let page = r#"<a>Logout</a><input name="_token" value="csrf123">"#;
        assert_eq!(probe.check(200, page), Ok(Some("csrf123".to_string())));
        assert!(probe.check(200, "<a>Logout</a>").is_err());
    }

    #[test]
    fn test_bad_token_pattern_is_configuration_error() {
        let bad = ProbeConfig {
            success_text: Some("Logout".to_string()),
            token_pattern: Some("(unclosed".to_string()),
            ..config()
        };
        assert!(matches!(
            ValidationProbe::from_config(&id(), &bad),
            Err(SessionError::Configuration { .. })
        ));
    }
}
