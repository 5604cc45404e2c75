//! The per-destination capability set the scheduler drives.

use crate::{
    auth::RequestAuth,
    context::{TaskContext, UploadPackage},
    definition::{AuthMethod, DestinationDefinition},
    eligibility::{Eligibility, EligibilityGate},
    error::{DestinationError, Result},
    search,
    submit::{SubmitRules, UploadPayload, UploadSubmitter},
    success::SuccessPolicy,
    template::TemplateValues,
};
use async_trait::async_trait;
use regex::Regex;
use seedcast_core::{
    CandidateMatch, DestinationCredentials, DestinationId, ReleaseDescriptor, UploadOutcome,
};
use seedcast_session::{
    LoginCredentials, LoginSetup, SessionCredential, ValidatedSession, ValidationProbe,
};
use tracing::debug;

/// What a cookie-authenticated destination needs from the session layer.
#[derive(Debug, Clone)]
pub struct SessionRequirements {
    /// Request that proves the session is valid
    pub probe: ValidationProbe,
    /// Automatic login, when the destination supports it
    pub login: Option<LoginSetup>,
}

/// One upload destination.
#[async_trait]
pub trait Destination: Send + Sync {
    /// Destination identifier.
    fn id(&self) -> &DestinationId;

    /// Definition the destination was built from.
    fn definition(&self) -> &DestinationDefinition;

    /// Adjust this destination's private copy of the release.
    fn prepare(&self, release: &mut ReleaseDescriptor);

    /// Session handling, or `None` for destinations without cookies.
    fn session_requirements(
        &self,
        credentials: &DestinationCredentials,
    ) -> Result<Option<SessionRequirements>>;

    /// Banned-group check.
    async fn check_eligibility(&self, release: &ReleaseDescriptor, ctx: &TaskContext) -> Eligibility;

    /// Destination-specific rules run after the banned-group check.
    fn check_rules(&self, release: &ReleaseDescriptor, ctx: &TaskContext) -> Eligibility;

    /// Search for torrents that could duplicate the release.
    async fn search(
        &self,
        release: &ReleaseDescriptor,
        ctx: &TaskContext,
        session: Option<&SessionCredential>,
    ) -> Result<Vec<CandidateMatch>>;

    /// Upload success criterion; fails when misconfigured.
    fn success_policy(&self) -> Result<SuccessPolicy>;

    /// Form fields the upload would send.
    fn render_fields(
        &self,
        release: &ReleaseDescriptor,
        package: &UploadPackage,
        ctx: &TaskContext,
        token: Option<&str>,
    ) -> Vec<(String, String)>;

    /// Post the upload.
    async fn submit(
        &self,
        release: &ReleaseDescriptor,
        package: &UploadPackage,
        ctx: &TaskContext,
        session: Option<&ValidatedSession>,
    ) -> Result<UploadOutcome>;
}

/// A destination driven entirely by its TOML definition.
#[derive(Debug, Clone)]
pub struct ConfiguredDestination {
    definition: DestinationDefinition,
}

impl ConfiguredDestination {
    /// Wrap a validated definition.
    #[must_use]
    pub fn new(definition: DestinationDefinition) -> Self {
        Self { definition }
    }

    fn configuration_error(&self, reason: impl Into<String>) -> DestinationError {
        DestinationError::Configuration {
            destination: self.definition.id().to_string(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Destination for ConfiguredDestination {
    fn id(&self) -> &DestinationId {
        self.definition.id()
    }

    fn definition(&self) -> &DestinationDefinition {
        &self.definition
    }

    fn prepare(&self, release: &mut ReleaseDescriptor) {
        for replacement in &self.definition.name_replacements {
            if replacement.from.is_empty() || !release.name.contains(&replacement.from) {
                continue;
            }
            release.name = release.name.replace(&replacement.from, &replacement.to);
            debug!(
                destination = %self.id(),
                from = %replacement.from,
                to = %replacement.to,
                "rewrote release name"
            );
        }
    }

    fn session_requirements(
        &self,
        credentials: &DestinationCredentials,
    ) -> Result<Option<SessionRequirements>> {
        let AuthMethod::Cookie { probe, login } = &self.definition.auth else {
            return Ok(None);
        };

        let probe = ValidationProbe::from_config(self.id(), probe)?;
        let login = login.as_ref().map(|flow| LoginSetup {
            flow: flow.clone(),
            credentials: match (&credentials.username, &credentials.password) {
                (Some(username), Some(password)) => Some(LoginCredentials {
                    username: username.clone(),
                    password: password.clone(),
                }),
                _ => None,
            },
        });

        Ok(Some(SessionRequirements { probe, login }))
    }

    async fn check_eligibility(&self, release: &ReleaseDescriptor, ctx: &TaskContext) -> Eligibility {
        EligibilityGate::new(&self.definition)
            .check_banned(release, ctx)
            .await
    }

    fn check_rules(&self, release: &ReleaseDescriptor, ctx: &TaskContext) -> Eligibility {
        EligibilityGate::new(&self.definition).check_rules(release, ctx)
    }

    async fn search(
        &self,
        release: &ReleaseDescriptor,
        ctx: &TaskContext,
        session: Option<&SessionCredential>,
    ) -> Result<Vec<CandidateMatch>> {
        let auth = RequestAuth::resolve(&self.definition, ctx, session)?;
        search::search(&self.definition, release, ctx, &auth).await
    }

    fn success_policy(&self) -> Result<SuccessPolicy> {
        SuccessPolicy::for_settings(self.id(), self.definition.upload.settings())
    }

    fn render_fields(
        &self,
        release: &ReleaseDescriptor,
        package: &UploadPackage,
        ctx: &TaskContext,
        token: Option<&str>,
    ) -> Vec<(String, String)> {
        TemplateValues::for_upload(
            release,
            package,
            &self.definition.ids,
            ctx.credentials.anon,
            ctx.api_key(),
            token,
        )
        .render_fields(&self.definition.upload.settings().fields)
    }

    async fn submit(
        &self,
        release: &ReleaseDescriptor,
        package: &UploadPackage,
        ctx: &TaskContext,
        session: Option<&ValidatedSession>,
    ) -> Result<UploadOutcome> {
        let settings = self.definition.upload.settings();
        let success = self.success_policy()?;
        let id_pattern = settings
            .id_pattern
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(|e| self.configuration_error(format!("upload.id_pattern: {e}")))?;

        let auth = RequestAuth::resolve(&self.definition, ctx, session.map(|s| &s.credential))?;
        let token = session.and_then(|s| s.token.as_deref().or_else(|| s.auth_key()));

        let values = TemplateValues::for_upload(
            release,
            package,
            &self.definition.ids,
            ctx.credentials.anon,
            ctx.api_key(),
            token,
        );
        let file_name = settings
            .file_name
            .as_deref()
            .map_or_else(|| format!("{}.torrent", release.name), |t| values.render(t));

        let payload = UploadPayload {
            url: settings.url.clone(),
            encoding: self.definition.upload.encoding(),
            file_field: settings.file_field.clone(),
            file_name,
            torrent: package.torrent.clone(),
            fields: values.render_fields(&settings.fields),
        };
        let rules = SubmitRules {
            success,
            id_pattern,
            confirm_url: settings.confirm_url.clone(),
            torrent_url: self.definition.destination.torrent_url.clone(),
            announce_url: ctx.credentials.announce_url.clone(),
        };

        UploadSubmitter::new(ctx.run.client.clone(), ctx.run.artifacts.clone())
            .submit(self.id(), &auth, payload, &rules)
            .await
    }
}
