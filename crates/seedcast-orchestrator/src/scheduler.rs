//! Fan-out of one release across destinations.

use crate::{
    error::{OrchestratorError, Result},
    pipeline::Pipeline,
    prompt::{AutoApprove, ConsolePrompter, DecisionPrompter},
    summary::RunSummary,
};
use futures::{
    future::FutureExt,
    stream::{FuturesUnordered, StreamExt},
};
use seedcast_core::{
    build_no_redirect_client, AppConfig, DestinationCredentials, DestinationId, DestinationStatus,
    ReleaseDescriptor, RunId,
};
use seedcast_destination::{DestinationRegistry, RunContext, TaskContext, UploadPackage};
use seedcast_matcher::DuplicateMatcher;
use seedcast_session::{FileSessionStore, SessionAuthenticator, ValidatedSession};
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Whether an operator is present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunMode {
    /// Destinations run one at a time and may prompt
    #[default]
    Interactive,
    /// Destinations run concurrently without prompts
    Unattended,
}

/// Run-wide switches.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Operator presence
    pub mode: RunMode,
    /// Unattended, but ask before each upload
    pub unattended_confirm: bool,
    /// Upload despite duplicates in unattended runs
    pub upload_dupes: bool,
    /// Stop every destination before authentication and upload
    pub dry_run: bool,
    /// Destinations in flight at once in unattended runs
    pub max_concurrent: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            mode: RunMode::Interactive,
            unattended_confirm: false,
            upload_dupes: false,
            dry_run: false,
            max_concurrent: 8,
        }
    }
}

impl RunOptions {
    /// Options from the config file.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            mode: if config.general.unattended || config.general.unattended_confirm {
                RunMode::Unattended
            } else {
                RunMode::Interactive
            },
            unattended_confirm: config.general.unattended_confirm,
            upload_dupes: config.general.upload_dupes,
            dry_run: config.general.dry_run,
            max_concurrent: config.network.max_concurrent_destinations,
        }
    }

    /// Whether any prompt can appear.
    #[must_use]
    pub fn prompts(&self) -> bool {
        self.mode == RunMode::Interactive || self.unattended_confirm
    }

    /// Destinations in flight at once. Runs that prompt go one at a time
    /// so prompts never interleave.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        if self.prompts() {
            1
        } else {
            self.max_concurrent.max(1)
        }
    }
}

/// Runs the per-destination pipeline for every requested destination.
pub struct UploadOrchestrator {
    registry: DestinationRegistry,
    matcher: DuplicateMatcher,
    authenticator: SessionAuthenticator,
    prompter: Arc<dyn DecisionPrompter>,
    run: Arc<RunContext>,
    credentials: HashMap<String, DestinationCredentials>,
    options: RunOptions,
}

impl std::fmt::Debug for UploadOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadOrchestrator")
            .field("registry", &self.registry)
            .field("run_id", &self.run.run_id)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl UploadOrchestrator {
    /// Create an orchestrator.
    ///
    /// Duplicate policies come from the registry; the prompter is the
    /// console when the options allow prompts.
    #[must_use]
    pub fn new(
        registry: DestinationRegistry,
        run: Arc<RunContext>,
        authenticator: SessionAuthenticator,
        options: RunOptions,
    ) -> Self {
        let prompter: Arc<dyn DecisionPrompter> = if options.prompts() {
            Arc::new(ConsolePrompter)
        } else {
            Arc::new(AutoApprove)
        };
        Self {
            matcher: DuplicateMatcher::new(registry.policy_table()),
            registry,
            authenticator,
            prompter,
            run,
            credentials: HashMap::new(),
            options,
        }
    }

    /// Build everything a run needs from the config file.
    pub fn from_config(config: &AppConfig, registry: DestinationRegistry) -> seedcast_core::Result<Self> {
        let base_dir = config.base_dir()?;
        let run = Arc::new(RunContext::new(
            RunId::generate(),
            base_dir.clone(),
            config.network.clone(),
        )?);
        let authenticator = SessionAuthenticator::new(
            Arc::new(FileSessionStore::new(&base_dir)),
            run.client.clone(),
            build_no_redirect_client(&config.network)?,
            run.artifacts.clone(),
        );

        Ok(Self::new(registry, run, authenticator, RunOptions::from_config(config))
            .with_credentials(config.destinations.clone()))
    }

    /// Use these per-destination credentials.
    #[must_use]
    pub fn with_credentials(mut self, credentials: HashMap<String, DestinationCredentials>) -> Self {
        self.credentials = credentials;
        self
    }

    /// Use a different source of operator decisions.
    #[must_use]
    pub fn with_prompter(mut self, prompter: Arc<dyn DecisionPrompter>) -> Self {
        self.prompter = prompter;
        self
    }

    /// Shared run context.
    #[must_use]
    pub fn run_context(&self) -> &Arc<RunContext> {
        &self.run
    }

    /// Run options in effect.
    #[must_use]
    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Process `release` for each destination and collect their statuses.
    ///
    /// Every destination gets its own copy of the release. A failing or
    /// panicking destination only affects its own status. Statuses are
    /// returned in the order of `destinations`.
    pub async fn run(
        &self,
        release: &ReleaseDescriptor,
        package: &UploadPackage,
        destinations: &[DestinationId],
    ) -> RunSummary {
        let window = self.options.concurrency();
        info!(
            run_id = %self.run.run_id,
            destinations = destinations.len(),
            window,
            dry_run = self.options.dry_run,
            "starting upload run"
        );

        let mut statuses: Vec<Option<DestinationStatus>> = vec![None; destinations.len()];
        let mut pending = FuturesUnordered::new();

        for (index, id) in destinations.iter().enumerate() {
            pending.push(self.run_isolated(index, id.clone(), release.clone(), package));

            while pending.len() >= window {
                if let Some((index, status)) = pending.next().await {
                    statuses[index] = Some(status);
                }
            }
        }

        while let Some((index, status)) = pending.next().await {
            statuses[index] = Some(status);
        }

        let summary = RunSummary::new(statuses.into_iter().flatten().collect());
        info!(
            uploaded = summary.uploaded().len(),
            skipped = summary.skipped().len(),
            dupes = summary.dupes().len(),
            "upload run finished"
        );
        summary
    }

    async fn run_isolated(
        &self,
        index: usize,
        id: DestinationId,
        release: ReleaseDescriptor,
        package: &UploadPackage,
    ) -> (usize, DestinationStatus) {
        let task = AssertUnwindSafe(self.run_destination(id.clone(), release, package)).catch_unwind();
        let status = match task.await {
            Ok(status) => status,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(destination = %id, panic = %message, "destination task panicked");
                let mut status = DestinationStatus::new(id);
                status.mark_skipped(format!("internal error: {message}"));
                status
            }
        };
        (index, status)
    }

    async fn run_destination(
        &self,
        id: DestinationId,
        release: ReleaseDescriptor,
        package: &UploadPackage,
    ) -> DestinationStatus {
        let mut status = DestinationStatus::new(id.clone());

        let Some(destination) = self.registry.get(&id) else {
            warn!(destination = %id, "destination not recognized");
            status.mark_skipped(
                OrchestratorError::UnknownDestination {
                    destination: id.to_string(),
                }
                .to_string(),
            );
            return status;
        };

        let ctx = TaskContext::new(id.clone(), self.credentials_for(&id), Arc::clone(&self.run));
        let pipeline = Pipeline {
            destination: destination.as_ref(),
            ctx: &ctx,
            package,
            matcher: &self.matcher,
            authenticator: &self.authenticator,
            prompter: self.prompter.as_ref(),
            options: &self.options,
        };

        if let Err(e) = pipeline.run(release, &mut status).await {
            error!(destination = %id, error = %e, "destination task failed");
            if let Some(path) = e.artifact() {
                status.add_artifact(path.clone());
            }
            status.mark_skipped(e.to_string());
        }

        status
    }

    /// Load and probe one destination's session without uploading.
    ///
    /// Returns `None` for destinations that authenticate per request.
    pub async fn check_session(&self, id: &DestinationId) -> Result<Option<ValidatedSession>> {
        let destination = self
            .registry
            .get(id)
            .ok_or_else(|| OrchestratorError::UnknownDestination {
                destination: id.to_string(),
            })?;

        let Some(requirements) = destination.session_requirements(&self.credentials_for(id))? else {
            info!(destination = %id, "destination does not use a session");
            return Ok(None);
        };

        let loaded = self.authenticator.load(id, requirements.login.as_ref()).await?;
        let validated = self
            .authenticator
            .validate(loaded, &requirements.probe, requirements.login.as_ref())
            .await?;
        info!(destination = %id, state = ?validated.state, refreshed = validated.refreshed, "session is valid");
        Ok(Some(validated))
    }

    fn credentials_for(&self, id: &DestinationId) -> DestinationCredentials {
        self.credentials
            .get(id.as_str())
            .or_else(|| {
                self.credentials
                    .iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case(id.as_str()))
                    .map(|(_, credentials)| credentials)
            })
            .cloned()
            .unwrap_or_default()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
