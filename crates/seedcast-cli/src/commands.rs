//! Command handlers.

use crate::cli::{select_destinations, Cli, Command, DestinationsCommand, SessionCommand, UploadArgs};
use anyhow::{bail, Context};
use seedcast_core::{AppConfig, DestinationId, ReleaseDescriptor};
use seedcast_destination::{
    AuthMethod, DefinitionLoader, DestinationDefinition, DestinationRegistry, SearchMethod, UploadPackage,
};
use seedcast_orchestrator::{RunSummary, UploadOrchestrator};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Run the parsed command.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Upload(args) => upload(args, config).await,
        Command::Destinations(DestinationsCommand::List) => list_destinations(&config),
        Command::Session(SessionCommand::Check { destination }) => check_session(&destination, &config).await,
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let mut config = match path {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => AppConfig::load().context("failed to load config")?,
    };
    config.apply_env();
    Ok(config)
}

fn load_registry(config: &AppConfig) -> anyhow::Result<DestinationRegistry> {
    let loader = match &config.general.definitions_dir {
        Some(dir) => DefinitionLoader::new(dir.clone())?,
        None => DefinitionLoader::with_default_dir()?,
    };
    let registry = DestinationRegistry::load_from(&loader)
        .with_context(|| format!("failed to load definitions from {}", loader.dir().display()))?;
    info!(count = registry.count(), dir = %loader.dir().display(), "destination definitions loaded");
    Ok(registry)
}

async fn upload(args: UploadArgs, mut config: AppConfig) -> anyhow::Result<()> {
    args.apply(&mut config);
    let registry = load_registry(&config)?;

    let release_json = tokio::fs::read_to_string(&args.release)
        .await
        .with_context(|| format!("failed to read {}", args.release.display()))?;
    let release: ReleaseDescriptor = serde_json::from_str(&release_json)
        .with_context(|| format!("{} is not a valid release description", args.release.display()))?;

    let torrent = tokio::fs::read(&args.torrent)
        .await
        .with_context(|| format!("failed to read {}", args.torrent.display()))?;
    let description = match &args.description {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => String::new(),
    };
    let package = UploadPackage {
        torrent: Arc::from(torrent),
        description,
        images: args.images.clone(),
    };

    let destinations = select_destinations(
        &args.destinations,
        &config.general.default_destinations,
        &registry.ids(),
    )?;
    if destinations.is_empty() {
        bail!("no destinations selected and no definitions loaded");
    }

    let orchestrator = UploadOrchestrator::from_config(&config, registry)?;
    let summary = orchestrator.run(&release, &package, &destinations).await;

    let status_path = args
        .status_out
        .clone()
        .unwrap_or_else(|| orchestrator.run_context().artifacts.dir().join("status.json"));
    write_status(&status_path, &summary).await?;

    print!("{}", summary.render_table());
    println!("Status written to {}", status_path.display());
    Ok(())
}

/// Write the redacted statuses as pretty JSON, creating parent directories.
async fn write_status(path: &Path, summary: &RunSummary) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_vec_pretty(&summary.redacted())?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "status written");
    Ok(())
}

fn list_destinations(config: &AppConfig) -> anyhow::Result<()> {
    let registry = load_registry(config)?;
    for definition in registry.definitions() {
        println!("{}", describe(&definition));
    }
    Ok(())
}

fn describe(definition: &DestinationDefinition) -> String {
    let auth = match &definition.auth {
        AuthMethod::ApiToken { .. } => "api-token",
        AuthMethod::Cookie { .. } => "cookie",
        AuthMethod::None => "none",
    };
    let search = match &definition.search {
        SearchMethod::Unit3dApi { .. } => "unit3d-api",
        SearchMethod::Html { .. } => "html",
        SearchMethod::None => "none",
    };
    format!(
        "{:<8} {:<24} auth={auth:<9} search={search:<10} {}",
        definition.id().as_str(),
        definition.name(),
        definition.destination.base_url
    )
}

async fn check_session(destination: &str, config: &AppConfig) -> anyhow::Result<()> {
    let id = DestinationId::new(destination)?;
    let registry = load_registry(config)?;
    let orchestrator = UploadOrchestrator::from_config(config, registry)?;

    match orchestrator.check_session(&id).await? {
        Some(session) => println!(
            "{id}: session valid ({:?}{})",
            session.state,
            if session.refreshed { ", logged in again" } else { "" }
        ),
        None => println!("{id}: authenticates per request, no session to check"),
    }
    Ok(())
}
