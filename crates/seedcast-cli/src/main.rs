//! `seedcast` - upload one release to many trackers.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod cli;
mod commands;

use clap::Parser;
use cli::Cli;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    tracing::debug!("seedcast v{}", env!("CARGO_PKG_VERSION"));

    commands::run(Cli::parse()).await
}

/// Logs go to stderr so the summary table on stdout stays clean.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,seedcast=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
