//! Command-line arguments.

use clap::{Args, Parser, Subcommand};
use seedcast_core::{AppConfig, DestinationId, SeedcastError};
use std::path::PathBuf;

/// Upload one release to many trackers.
#[derive(Debug, Parser)]
#[command(name = "seedcast", version, about)]
pub struct Cli {
    /// Config file to read instead of the platform default
    #[arg(long, global = true, env = "SEEDCAST_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Upload a release to the selected destinations
    Upload(UploadArgs),
    /// Inspect destination definitions
    #[command(subcommand)]
    Destinations(DestinationsCommand),
    /// Manage destination sessions
    #[command(subcommand)]
    Session(SessionCommand),
}

#[derive(Debug, Subcommand)]
pub enum DestinationsCommand {
    /// List every loaded destination
    List,
}

#[derive(Debug, Subcommand)]
pub enum SessionCommand {
    /// Load and probe a destination's session without uploading
    Check {
        /// Destination identifier, e.g. PTP
        destination: String,
    },
}

#[derive(Debug, Args)]
pub struct UploadArgs {
    /// Release description as JSON
    #[arg(long)]
    pub release: PathBuf,

    /// Torrent file to upload
    #[arg(long)]
    pub torrent: PathBuf,

    /// Rendered description file
    #[arg(long)]
    pub description: Option<PathBuf>,

    /// Hosted image URL, repeatable
    #[arg(long = "image")]
    pub images: Vec<String>,

    /// Destination identifier, repeatable or comma-separated
    #[arg(short = 'd', long = "destination", value_delimiter = ',')]
    pub destinations: Vec<String>,

    /// Run without prompts
    #[arg(long, env = "SEEDCAST_UNATTENDED")]
    pub unattended: bool,

    /// Run without prompts except a confirmation before each upload
    #[arg(long)]
    pub unattended_confirm: bool,

    /// Upload despite duplicates in unattended runs
    #[arg(long)]
    pub upload_dupes: bool,

    /// Stop every destination before authentication and upload
    #[arg(long, env = "SEEDCAST_DRY_RUN")]
    pub dry_run: bool,

    /// Where to write the status JSON
    #[arg(long)]
    pub status_out: Option<PathBuf>,
}

impl UploadArgs {
    /// Fold the run switches into the loaded config.
    pub fn apply(&self, config: &mut AppConfig) {
        let general = &mut config.general;
        general.unattended |= self.unattended;
        general.unattended_confirm |= self.unattended_confirm;
        general.upload_dupes |= self.upload_dupes;
        general.dry_run |= self.dry_run;
    }
}

/// Destinations for this run, in the order given, without repeats.
///
/// Falls back to the configured defaults, then to every loaded destination.
pub fn select_destinations(
    requested: &[String],
    defaults: &[String],
    available: &[DestinationId],
) -> Result<Vec<DestinationId>, SeedcastError> {
    let names = if requested.is_empty() { defaults } else { requested };
    if names.is_empty() {
        return Ok(available.to_vec());
    }

    let mut selected: Vec<DestinationId> = Vec::with_capacity(names.len());
    for name in names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
        let id = DestinationId::new(name)?;
        if !selected.contains(&id) {
            selected.push(id);
        }
    }
    Ok(selected)
}
