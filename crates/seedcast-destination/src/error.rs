//! Error types for the destination subsystem.

use seedcast_core::{SeedcastError, TransportError};
use seedcast_session::SessionError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading or talking to a destination.
#[derive(Error, Debug)]
pub enum DestinationError {
    /// Destination definition not found
    #[error("destination not found: {destination}")]
    NotFound {
        /// The destination that was not found
        destination: String,
    },

    /// Failed to read a definition file
    #[error("failed to load destination definition from {path}: {source}")]
    LoadError {
        /// Path to the definition file
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse definition TOML
    #[error("failed to parse destination definition TOML in {path}: {source}")]
    ParseError {
        /// Path to the definition file
        path: String,
        /// TOML parse error
        #[source]
        source: toml::de::Error,
    },

    /// Definition is structurally invalid
    #[error("invalid destination definition for {destination}: {reason}")]
    ValidationError {
        /// Destination being validated
        destination: String,
        /// Reason for validation failure
        reason: String,
    },

    /// Definitions directory not found
    #[error("destination definitions directory not found at {path}")]
    DirectoryNotFound {
        /// Expected directory path
        path: String,
    },

    /// Settings that only fail once a request is being prepared
    #[error("configuration error for {destination}: {reason}")]
    Configuration {
        /// Destination with the bad settings
        destination: String,
        /// What is wrong
        reason: String,
    },

    /// The destination answered with something we cannot interpret
    #[error("{destination} returned an unexpected response: {reason}")]
    UpstreamProtocol {
        /// Destination that answered
        destination: String,
        /// What was expected and what arrived
        reason: String,
        /// Saved response body, if any
        artifact: Option<PathBuf>,
    },

    /// Session could not be loaded or validated
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Network failure
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// I/O error while reading cached data
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid destination ID format
    #[error("invalid destination ID: {0}")]
    InvalidId(#[from] SeedcastError),
}

impl From<reqwest::Error> for DestinationError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.into())
    }
}

impl From<DestinationError> for SeedcastError {
    fn from(err: DestinationError) -> Self {
        let message = err.to_string();
        match err {
            DestinationError::Session(e) => e.into(),
            DestinationError::Transport(e) => Self::Transport(e),
            DestinationError::Io(e) => Self::Io(e),
            DestinationError::InvalidId(e) => e,
            DestinationError::Configuration {
                destination,
                reason,
            } => Self::Configuration {
                destination,
                reason,
            },
            DestinationError::ValidationError { destination, .. }
            | DestinationError::NotFound { destination } => Self::Configuration {
                destination,
                reason: message,
            },
            DestinationError::UpstreamProtocol {
                destination,
                reason,
                ..
            } => Self::UpstreamProtocol {
                destination,
                reason,
            },
            DestinationError::LoadError { .. }
            | DestinationError::ParseError { .. }
            | DestinationError::DirectoryNotFound { .. } => Self::Internal(message),
        }
    }
}

/// Result type for destination operations.
pub type Result<T> = std::result::Result<T, DestinationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_maps_through() {
        let err = DestinationError::Configuration {
            destination: "ASC".to_string(),
            reason: "no success criterion".to_string(),
        };
        let mapped: SeedcastError = err.into();
        assert!(matches!(mapped, SeedcastError::Configuration { ref destination, .. } if destination == "ASC"));
    }

    #[test]
    fn test_not_found_message() {
        let err = DestinationError::NotFound {
            destination: "XYZ".to_string(),
        };
        assert_eq!(err.to_string(), "destination not found: XYZ");
    }
}
