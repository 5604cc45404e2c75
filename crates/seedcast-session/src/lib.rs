//! Seedcast Session - cookie sessions for destinations without an API.
//!
//! Many destinations only accept uploads from a logged-in browser session.
//! Operators export that session as a Netscape cookie file; this crate loads
//! it, proves it still works with a probe request, logs in again when the
//! destination allows it, and writes the session back only once it has been
//! confirmed.
//!
//! # Modules
//!
//! - [`cookie_jar`] - Netscape cookie files and `Set-Cookie` merging
//! - [`store`] - [`SessionStore`] trait and the file-backed store
//! - [`login`] - Username/password login flows
//! - [`probe`] - Validation probes with a single success marker
//! - [`authenticator`] - The load/validate/refresh/persist lifecycle
//!
//! # Example
//!
//! ```rust
//! use seedcast_core::DestinationId;
//! use seedcast_session::{ProbeConfig, ValidationProbe};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let probe = ValidationProbe::from_config(
//!     &DestinationId::new("ASC")?,
//!     &ProbeConfig {
//!         url: "https://tracker.example/index.php".to_string(),
//!         success_text: Some("Logout".to_string()),
//!         ..ProbeConfig::default()
//!     },
//! )?;
//! assert!(probe.check(200, "<a>Logout</a>").is_ok());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod authenticator;
pub mod cookie_jar;
pub mod error;
pub mod login;
pub mod probe;
pub mod store;

pub use authenticator::{LoadedSession, SessionAuthenticator, SessionState, ValidatedSession};
pub use cookie_jar::{Cookie, CookieJar, CookieLineError};
pub use error::{Result, SessionError};
pub use login::{LoginCredentials, LoginFlow, LoginOutcome, LoginSetup};
pub use probe::{ProbeConfig, ProbeMarker, ValidationProbe};
pub use store::{FileSessionStore, SessionCredential, SessionStore};
