//! Seedcast Destination - definitions and behaviour of upload destinations.
//!
//! Each destination is described by one TOML file: which groups it bans,
//! how it is searched, how requests authenticate and how the upload is
//! posted. Definitions are loaded into a [`DestinationRegistry`] that hands
//! out `Arc<dyn Destination>` handles to the scheduler.
//!
//! # Modules
//!
//! - [`definition`] - TOML definition types
//! - [`loader`] - Recursive definition loading
//! - [`registry`] - Id to destination lookup
//! - [`destination`] - The [`Destination`] trait and [`ConfiguredDestination`]
//! - [`context`] - Per-run and per-task state
//! - [`eligibility`] - Banned groups, API keys and allow-lists
//! - [`search`] - UNIT3D API and HTML search backends
//! - [`auth`] - Attaching cookies or API tokens to requests
//! - [`template`] - Form field placeholders
//! - [`success`] - The upload success criterion
//! - [`submit`] - Posting the upload and classifying the response
//!
//! # Example
//!
//! ```rust
//! use seedcast_core::DestinationId;
//! use seedcast_destination::SuccessPolicy;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let id = DestinationId::new("BLU")?;
//! let policy = SuccessPolicy::from_parts(&id, &[], Some("torrentid="), None)?;
//! assert!(policy.classify(200, "details.php?torrentid=12").is_ok());
//! assert!(SuccessPolicy::from_parts(&id, &[200], Some("ok"), None).is_err());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod auth;
pub mod context;
pub mod definition;
pub mod destination;
pub mod eligibility;
pub mod error;
pub mod loader;
pub mod registry;
pub mod search;
pub mod submit;
pub mod success;
pub mod template;

pub use auth::RequestAuth;
pub use context::{RunContext, TaskContext, UploadPackage};
pub use definition::{
    AuthMethod, DestinationDefinition, PayloadEncoding, SearchMethod, UploadMethod, UploadSettings,
};
pub use destination::{ConfiguredDestination, Destination, SessionRequirements};
pub use eligibility::{Eligibility, EligibilityGate};
pub use error::{DestinationError, Result};
pub use loader::DefinitionLoader;
pub use registry::DestinationRegistry;
pub use submit::{SubmitRules, UploadPayload, UploadSubmitter};
pub use success::SuccessPolicy;
