//! Seedcast Core - Foundation crate for the Seedcast upload pipeline.
//!
//! This crate provides shared types, error handling, configuration management
//! and HTTP plumbing that all other Seedcast crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`types`] - Identifier newtypes (`DestinationId`, `RunId`)
//! - [`release`] - Release facts and search candidates
//! - [`status`] - Per-destination status records and upload outcomes
//! - [`artifacts`] - Debug artifacts for failed probes and uploads
//! - [`redact`] - Secret scrubbing
//! - [`transport`] - HTTP client construction and error classification
//!
//! # Example
//!
//! ```rust
//! use seedcast_core::{DestinationId, DestinationStatus, ReleaseDescriptor};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let release = ReleaseDescriptor::named("Movie 2020 1080p BluRay x264-GRP");
//! let status = DestinationStatus::new(DestinationId::new("BLU")?);
//! assert!(status.passed());
//! assert!(release.group().is_none());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod artifacts;
pub mod config;
pub mod error;
pub mod redact;
pub mod release;
pub mod status;
pub mod transport;
pub mod types;

// Re-export commonly used types
pub use artifacts::{ArtifactKind, ArtifactStore, SECRET_WARNING};
pub use config::{AppConfig, DestinationCredentials, GeneralConfig, NetworkConfig};
pub use error::{ConfigError, ConfigResult, Result, SeedcastError};
pub use release::{CandidateMatch, Category, DiscKind, ReleaseDescriptor, ReleaseType};
pub use status::{DestinationStatus, UploadOutcome};
pub use transport::{build_http_client, build_no_redirect_client, TransportError, TransportErrorKind};
pub use types::{DestinationId, RunId};
