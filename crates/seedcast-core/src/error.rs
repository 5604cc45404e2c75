//! Core error types for Seedcast.
//!
//! `SeedcastError` mirrors the failure taxonomy every destination task can
//! hit. All of these are caught at the task boundary and turned into a
//! status message; none of them escape to sibling destinations.

use crate::transport::TransportError;
use thiserror::Error;

/// Central error type for all Seedcast operations.
#[derive(Error, Debug)]
pub enum SeedcastError {
    /// Configuration errors (config file, definitions, success policy arity)
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A destination is configured in a way that can never work
    #[error("configuration error for {destination}: {reason}")]
    Configuration {
        /// Destination the configuration belongs to
        destination: String,
        /// What is wrong
        reason: String,
    },

    /// Missing or expired credentials
    #[error("authentication error for {destination}: {reason}")]
    Authentication {
        /// Destination that rejected the session
        destination: String,
        /// Actionable description
        reason: String,
    },

    /// Network failure talking to a destination
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Release violates a destination content rule (banned group, category)
    #[error("content rule violation for {destination}: {reason}")]
    ContentRule {
        /// Destination whose rule fired
        destination: String,
        /// Rule description
        reason: String,
    },

    /// Destination answered with something we could not interpret
    #[error("unexpected response from {destination}: {reason}")]
    UpstreamProtocol {
        /// Destination that answered
        destination: String,
        /// Verbatim detail about the response
        reason: String,
    },

    /// Validation errors (invalid identifiers, descriptor fields)
    #[error("validation error: {0}")]
    Validation(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to determine config directory path
    #[error("could not determine config directory (XDG base directories not available)")]
    NoConfigDir,

    /// Config file not found
    #[error("config file not found at {path}")]
    NotFound {
        /// Path where config was expected
        path: String,
    },

    /// Failed to parse TOML
    #[error("failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to serialize config
    #[error("failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// I/O error reading/writing config
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration value
    #[error("invalid config value for {field}: {reason}")]
    InvalidValue {
        /// Field name
        field: String,
        /// Reason for invalidity
        reason: String,
    },
}

/// Result type alias using `SeedcastError`.
pub type Result<T> = std::result::Result<T, SeedcastError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
