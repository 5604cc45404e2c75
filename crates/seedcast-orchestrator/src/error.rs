//! Errors that end a destination task.

use seedcast_core::SeedcastError;
use seedcast_destination::DestinationError;
use seedcast_session::SessionError;
use std::path::PathBuf;
use thiserror::Error;

/// Anything that stops one destination's pipeline.
///
/// None of these escape the task: the scheduler turns them into the
/// destination's status message.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// Definition, search, eligibility or upload failure
    #[error(transparent)]
    Destination(#[from] DestinationError),

    /// Session could not be loaded or validated
    #[error(transparent)]
    Session(#[from] SessionError),

    /// No definition is loaded for the destination
    #[error("{destination} is not recognized")]
    UnknownDestination {
        /// Requested destination
        destination: String,
    },

    /// The console prompt could not be read
    #[error("failed to read operator decision: {reason}")]
    Prompt {
        /// What went wrong
        reason: String,
    },
}

impl OrchestratorError {
    /// Debug artifact the failure left behind, if any.
    #[must_use]
    pub fn artifact(&self) -> Option<&PathBuf> {
        match self {
            Self::Session(e) | Self::Destination(DestinationError::Session(e)) => e.artifact(),
            Self::Destination(DestinationError::UpstreamProtocol { artifact, .. }) => artifact.as_ref(),
            _ => None,
        }
    }
}

impl From<OrchestratorError> for SeedcastError {
    fn from(err: OrchestratorError) -> Self {
        match err {
            OrchestratorError::Destination(e) => e.into(),
            OrchestratorError::Session(e) => e.into(),
            OrchestratorError::UnknownDestination { destination } => Self::Configuration {
                reason: "no destination definition is loaded".to_string(),
                destination,
            },
            OrchestratorError::Prompt { reason } => Self::Internal(reason),
        }
    }
}

/// Result type for orchestration.
pub type Result<T> = std::result::Result<T, OrchestratorError>;
