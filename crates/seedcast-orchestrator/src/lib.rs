//! Seedcast Orchestrator - runs one release through every destination.
//!
//! For each requested destination a task walks a fixed pipeline:
//! eligibility, destination rules, duplicate search, duplicate matching,
//! the upload decision, session validation and submission. The outcome
//! lands in that destination's [`DestinationStatus`](seedcast_core::DestinationStatus).
//!
//! Unattended runs keep up to `max_concurrent_destinations` tasks in flight;
//! interactive runs take destinations one at a time so prompts never
//! interleave. A task that errors or panics only ends itself.
//!
//! # Modules
//!
//! - [`scheduler`] - [`UploadOrchestrator`] and run options
//! - [`pipeline`] - The per-destination steps
//! - [`prompt`] - Operator decisions
//! - [`summary`] - [`RunSummary`] and the end-of-run table
//! - [`error`] - Task-ending errors
//!
//! # Example
//!
//! ```rust
//! use seedcast_orchestrator::{RunMode, RunOptions};
//!
//! let options = RunOptions {
//!     mode: RunMode::Unattended,
//!     max_concurrent: 4,
//!     ..RunOptions::default()
//! };
//! assert_eq!(options.concurrency(), 4);
//! assert_eq!(RunOptions::default().concurrency(), 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod error;
pub mod pipeline;
pub mod prompt;
pub mod scheduler;
pub mod summary;

pub use error::{OrchestratorError, Result};
pub use pipeline::DRY_RUN_MESSAGE;
pub use prompt::{AutoApprove, ConsolePrompter, DecisionPrompter, Question};
pub use scheduler::{RunMode, RunOptions, UploadOrchestrator};
pub use summary::RunSummary;
