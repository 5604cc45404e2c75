//! One destination's strictly ordered pipeline.

use crate::{
    error::Result,
    prompt::{DecisionPrompter, Question},
    RunMode, RunOptions,
};
use seedcast_core::{redact::redact_form, CandidateMatch, DestinationStatus, ReleaseDescriptor};
use seedcast_destination::{Destination, Eligibility, TaskContext, UploadPackage};
use seedcast_matcher::DuplicateMatcher;
use seedcast_session::SessionAuthenticator;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Message recorded when a dry run stops a destination.
pub const DRY_RUN_MESSAGE: &str = "Dry run: stopped before authentication and upload.";

/// Everything a destination task borrows from the scheduler.
pub(crate) struct Pipeline<'a> {
    pub destination: &'a dyn Destination,
    pub ctx: &'a TaskContext,
    pub package: &'a UploadPackage,
    pub matcher: &'a DuplicateMatcher,
    pub authenticator: &'a SessionAuthenticator,
    pub prompter: &'a dyn DecisionPrompter,
    pub options: &'a RunOptions,
}

impl Pipeline<'_> {
    /// Run every step, recording decisions in `status`.
    ///
    /// `release` is this task's private copy.
    pub async fn run(&self, mut release: ReleaseDescriptor, status: &mut DestinationStatus) -> Result<()> {
        let id = self.destination.id();
        self.destination.prepare(&mut release);

        if let Eligibility::Banned { group, note } =
            self.destination.check_eligibility(&release, self.ctx).await
        {
            let mut message = format!("{group} is banned from {}", self.destination.definition().name());
            if let Some(note) = &note {
                message.push_str(&format!(" ({note})"));
            }

            let overridden = self.options.mode == RunMode::Interactive
                && self
                    .prompter
                    .ask(Question::OverrideBan {
                        destination: id.clone(),
                        group,
                        note,
                    })
                    .await?;
            if !overridden {
                info!(destination = %id, "{message}");
                status.mark_banned(message);
                return Ok(());
            }
            warn!(destination = %id, "ban overridden by operator");
        }

        if let Eligibility::Skip { reason } = self.destination.check_rules(&release, self.ctx) {
            info!(destination = %id, reason = %reason, "destination skipped");
            status.mark_skipped(reason);
            return Ok(());
        }

        let success = self.destination.success_policy()?;
        debug!(destination = %id, policy = ?success, "upload success criterion");

        let requirements = self.destination.session_requirements(&self.ctx.credentials)?;
        let loaded = match &requirements {
            Some(req) => Some(self.authenticator.load(id, req.login.as_ref()).await?),
            None => None,
        };

        let candidates = self
            .destination
            .search(&release, self.ctx, loaded.as_ref().map(|l| &l.credential))
            .await?;

        let report = self.matcher.evaluate(&candidates, &release, id);
        let duplicates = names(&report.dupes);
        if !duplicates.is_empty() {
            info!(destination = %id, count = duplicates.len(), "duplicates found");
            status.mark_dupe(duplicates.clone(), names(&report.trumpable));
            let mut message = format!("Possible duplicates: {}", duplicates.join(", "));
            if let Some(exact) = &report.exact_match {
                message.push_str(&format!(" (exact match: {exact})"));
            }
            status.set_message(message);
        }

        if !self.decide(&release, &duplicates).await? {
            if duplicates.is_empty() {
                status.mark_skipped("Upload declined by operator.");
            }
            return Ok(());
        }

        if self.options.dry_run {
            let fields = self.destination.render_fields(&release, self.package, self.ctx, None);
            info!(
                destination = %id,
                fields = ?redact_form(&fields),
                "dry run, not uploading"
            );
            status.set_message(DRY_RUN_MESSAGE);
            return Ok(());
        }

        let validated = match (requirements, loaded) {
            (Some(req), Some(session)) => Some(
                self.authenticator
                    .validate(session, &req.probe, req.login.as_ref())
                    .await?,
            ),
            _ => None,
        };

        let started = Instant::now();
        let outcome = self
            .destination
            .submit(&release, self.package, self.ctx, validated.as_ref())
            .await?;
        status.record_outcome(outcome, started.elapsed());
        Ok(())
    }

    /// Whether to go ahead with the upload.
    async fn decide(&self, release: &ReleaseDescriptor, duplicates: &[String]) -> Result<bool> {
        let id = self.destination.id();
        let asks = self.options.mode == RunMode::Interactive || self.options.unattended_confirm;

        if duplicates.is_empty() {
            if !asks {
                return Ok(true);
            }
            return self
                .prompter
                .ask(Question::ConfirmUpload {
                    destination: id.clone(),
                    name: release.name.clone(),
                })
                .await;
        }

        if self.ctx.credentials.skip_dupe_check {
            info!(destination = %id, "uploading despite duplicates: dupe check disabled for destination");
            return Ok(true);
        }
        if asks {
            return self
                .prompter
                .ask(Question::UploadDuplicates {
                    destination: id.clone(),
                    duplicates: duplicates.to_vec(),
                })
                .await;
        }
        if self.options.upload_dupes {
            info!(destination = %id, "uploading despite duplicates: upload_dupes is set");
            return Ok(true);
        }
        Ok(false)
    }
}

fn names(candidates: &[CandidateMatch]) -> Vec<String> {
    candidates.iter().map(|c| c.name.clone()).collect()
}
