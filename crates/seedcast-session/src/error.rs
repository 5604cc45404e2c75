//! Session error types.

use seedcast_core::{SeedcastError, TransportError};
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading, validating or refreshing a session.
#[derive(Error, Debug)]
pub enum SessionError {
    /// No stored session and no way to log in
    #[error(
        "no session for {destination} at {path}; log in with a browser and export the site's \
         cookies in Netscape format to that path"
    )]
    CookieStoreMissing {
        /// Destination without a session
        destination: String,
        /// Expected cookie file
        path: PathBuf,
    },

    /// Stored cookie file is not in Netscape format
    #[error("{path} is not a valid Netscape cookie file (line {line}: {reason}); re-export it from your browser")]
    CookieParse {
        /// Offending file
        path: PathBuf,
        /// 1-based line number
        line: usize,
        /// What is wrong with the line
        reason: String,
    },

    /// Login flow configured but credentials are missing from config
    #[error("{destination} needs a username and password in the config to log in")]
    MissingCredentials {
        /// Destination needing credentials
        destination: String,
    },

    /// Login was attempted and rejected
    #[error("login to {destination} failed: {reason}")]
    LoginFailed {
        /// Destination that rejected the login
        destination: String,
        /// Observed failure
        reason: String,
    },

    /// Probe request did not confirm a valid session
    #[error("session for {destination} is not valid: {reason}")]
    ValidationFailed {
        /// Destination whose session failed
        destination: String,
        /// Which marker failed and what was observed
        reason: String,
        /// Saved probe response, if it could be written
        artifact: Option<PathBuf>,
    },

    /// Probe, login or token settings are unusable
    #[error("invalid session configuration for {destination}: {reason}")]
    Configuration {
        /// Destination with the bad configuration
        destination: String,
        /// What is wrong
        reason: String,
    },

    /// Network failure
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// I/O failure reading or writing the session store
    #[error("session store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SessionError {
    /// Debug artifact saved for this failure, if any.
    #[must_use]
    pub fn artifact(&self) -> Option<&PathBuf> {
        match self {
            Self::ValidationFailed { artifact, .. } => artifact.as_ref(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for SessionError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.into())
    }
}

impl From<SessionError> for SeedcastError {
    fn from(err: SessionError) -> Self {
        let message = err.to_string();
        match err {
            SessionError::Transport(e) => Self::Transport(e),
            SessionError::Io(e) => Self::Io(e),
            SessionError::Configuration {
                destination,
                reason,
            } => Self::Configuration {
                destination,
                reason,
            },
            SessionError::CookieStoreMissing { destination, .. }
            | SessionError::MissingCredentials { destination }
            | SessionError::LoginFailed { destination, .. }
            | SessionError::ValidationFailed { destination, .. } => Self::Authentication {
                destination,
                reason: message,
            },
            SessionError::CookieParse { path, .. } => Self::Authentication {
                destination: path.display().to_string(),
                reason: message,
            },
        }
    }
}

/// Result type alias for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;
