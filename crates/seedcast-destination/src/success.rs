//! Deciding whether an upload response means the upload went through.

use crate::{
    definition::UploadSettings,
    error::{DestinationError, Result},
};
use seedcast_core::DestinationId;

/// The single criterion a destination's upload response is judged by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuccessPolicy {
    /// Response status must be one of these
    StatusCodeSet(Vec<u16>),
    /// Response body must contain this text
    RequireText(String),
    /// Response body must not contain this text
    ForbidText(String),
}

impl SuccessPolicy {
    /// Build the policy from the three optional settings.
    ///
    /// Exactly one must be set; zero or several is a configuration error
    /// reported before anything is sent.
    pub fn from_parts(
        destination: &DestinationId,
        status_codes: &[u16],
        success_text: Option<&str>,
        error_text: Option<&str>,
    ) -> Result<Self> {
        let success_text = success_text.filter(|t| !t.is_empty());
        let error_text = error_text.filter(|t| !t.is_empty());

        let mut candidates = Vec::with_capacity(3);
        if !status_codes.is_empty() {
            candidates.push(Self::StatusCodeSet(status_codes.to_vec()));
        }
        if let Some(text) = success_text {
            candidates.push(Self::RequireText(text.to_string()));
        }
        if let Some(text) = error_text {
            candidates.push(Self::ForbidText(text.to_string()));
        }

        match candidates.len() {
            1 => Ok(candidates.remove(0)),
            0 => Err(DestinationError::Configuration {
                destination: destination.to_string(),
                reason: "no upload success criterion configured; set one of \
                         success_status_codes, success_text or error_text"
                    .to_string(),
            }),
            _ => Err(DestinationError::Configuration {
                destination: destination.to_string(),
                reason: "more than one upload success criterion configured; set only one of \
                         success_status_codes, success_text or error_text"
                    .to_string(),
            }),
        }
    }

    /// Policy for an upload method's settings.
    pub fn for_settings(destination: &DestinationId, settings: &UploadSettings) -> Result<Self> {
        Self::from_parts(
            destination,
            &settings.success_status_codes,
            settings.success_text.as_deref(),
            settings.error_text.as_deref(),
        )
    }

    /// Judge a response. `Err` carries the reason it counts as a failure.
    pub fn classify(&self, status: u16, body: &str) -> std::result::Result<(), String> {
        match self {
            Self::StatusCodeSet(codes) if codes.contains(&status) => Ok(()),
            Self::StatusCodeSet(codes) => {
                let expected = codes
                    .iter()
                    .map(u16::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                Err(format!("Expected status code '{expected}', got '{status}'."))
            }
            Self::RequireText(text) if body.contains(text.as_str()) => Ok(()),
            Self::RequireText(text) => {
                Err(format!("Could not find the success text '{text}' in the response."))
            }
            Self::ForbidText(text) if body.contains(text.as_str()) => {
                Err(format!("Found the error text '{text}' in the response."))
            }
            Self::ForbidText(_) => Ok(()),
        }
    }
}
