//! Session lifecycle for one destination at a time.
//!
//! ```text
//! Unloaded -> Loaded -> Validated -> [Refreshed] -> Persisted
//!                 \__________\____________\__________-> Failed
//! ```
//!
//! A session is written back to the store only after a probe confirmed it.

use crate::error::{Result, SessionError};
use crate::login::{LoginOutcome, LoginSetup};
use crate::probe::ValidationProbe;
use crate::store::{SessionCredential, SessionStore};
use reqwest::header::COOKIE;
use reqwest::{Client, Url};
use seedcast_core::{ArtifactKind, ArtifactStore, DestinationId};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing read yet
    Unloaded,
    /// Read from the store
    Loaded,
    /// Confirmed by a probe
    Validated,
    /// Replaced by a fresh login
    Refreshed,
    /// Confirmed and written back to the store
    Persisted,
    /// Could not be loaded or confirmed
    Failed,
}

/// A session read from the store or produced by a login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedSession {
    /// Destination the session belongs to
    pub destination: DestinationId,
    /// Cookies and auth key
    pub credential: SessionCredential,
    /// Whether the credential came from a login during this run
    pub fresh_login: bool,
}

impl LoadedSession {
    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        if self.fresh_login {
            SessionState::Refreshed
        } else {
            SessionState::Loaded
        }
    }
}

/// A session a probe confirmed, ready for search and upload requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSession {
    /// Destination the session belongs to
    pub destination: DestinationId,
    /// Cookies and auth key, including any the probe set
    pub credential: SessionCredential,
    /// Token scraped from the probe page, for use as a form field
    pub token: Option<String>,
    /// Whether a login replaced the stored session
    pub refreshed: bool,
    /// Lifecycle state reached
    pub state: SessionState,
}

impl ValidatedSession {
    /// `Cookie` header for a request to `url`.
    #[must_use]
    pub fn cookie_header(&self, url: &Url) -> Option<String> {
        self.credential.cookies.header_for(url)
    }

    /// Auth key saved at login, if the destination uses one.
    #[must_use]
    pub fn auth_key(&self) -> Option<&str> {
        self.credential.token.as_deref()
    }
}

/// Loads, validates, refreshes and persists destination sessions.
#[derive(Clone)]
pub struct SessionAuthenticator {
    store: Arc<dyn SessionStore>,
    client: Client,
    login_client: Client,
    artifacts: ArtifactStore,
}

impl std::fmt::Debug for SessionAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionAuthenticator")
            .field("artifacts", &self.artifacts.dir())
            .finish_non_exhaustive()
    }
}

impl SessionAuthenticator {
    /// Create an authenticator.
    ///
    /// `client` is used for probes; `login_client` must not follow
    /// redirects.
    #[must_use]
    pub fn new(
        store: Arc<dyn SessionStore>,
        client: Client,
        login_client: Client,
        artifacts: ArtifactStore,
    ) -> Self {
        Self {
            store,
            client,
            login_client,
            artifacts,
        }
    }

    /// Load the stored session, logging in when there is none and the
    /// destination supports it.
    pub async fn load(
        &self,
        destination: &DestinationId,
        login: Option<&LoginSetup>,
    ) -> Result<LoadedSession> {
        if let Some(credential) = self.store.load(destination).await? {
            return Ok(LoadedSession {
                destination: destination.clone(),
                credential,
                fresh_login: false,
            });
        }

        let Some(setup) = login else {
            return Err(SessionError::CookieStoreMissing {
                destination: destination.to_string(),
                path: self.store.location(destination),
            });
        };

        info!(destination = %destination, "No stored session, attempting automatic login");
        let credential = self.login(destination, setup).await?;
        Ok(LoadedSession {
            destination: destination.clone(),
            credential,
            fresh_login: true,
        })
    }

    /// Confirm a session with a probe and persist it on success.
    ///
    /// A failed probe is retried once after a fresh login when a login flow
    /// is configured and the session did not already come from one.
    pub async fn validate(
        &self,
        session: LoadedSession,
        probe: &ValidationProbe,
        login: Option<&LoginSetup>,
    ) -> Result<ValidatedSession> {
        let LoadedSession {
            destination,
            credential,
            fresh_login,
        } = session;

        let failure = match self.probe(&destination, credential, probe).await? {
            Ok((credential, token)) => {
                return self.persist(destination, credential, token, fresh_login).await;
            }
            Err(failure) => failure,
        };

        let artifact = self.save_artifact(&destination, &failure.body).await;

        match login {
            Some(setup) if !fresh_login => {
                warn!(
                    destination = %destination,
                    reason = %failure.reason,
                    "Stored session rejected, logging in again"
                );
                let fresh = self.login(&destination, setup).await?;
                match self.probe(&destination, fresh, probe).await? {
                    Ok((credential, token)) => self.persist(destination, credential, token, true).await,
                    Err(retry) => {
                        let artifact = self.save_artifact(&destination, &retry.body).await;
                        Err(SessionError::ValidationFailed {
                            destination: destination.to_string(),
                            reason: retry.reason,
                            artifact,
                        })
                    }
                }
            }
            _ => Err(SessionError::ValidationFailed {
                destination: destination.to_string(),
                reason: format!(
                    "{}; the cookie appears to be expired or invalid, log in with a browser and export the cookies again",
                    failure.reason
                ),
                artifact,
            }),
        }
    }

    async fn probe(
        &self,
        destination: &DestinationId,
        mut credential: SessionCredential,
        probe: &ValidationProbe,
    ) -> Result<std::result::Result<(SessionCredential, Option<String>), ProbeFailure>> {
        let url = Url::parse(&probe.url).map_err(|e| SessionError::Configuration {
            destination: destination.to_string(),
            reason: format!("invalid probe URL '{}': {e}", probe.url),
        })?;

        let mut request = self.client.get(url.clone());
        if let Some(header) = credential.cookies.header_for(&url) {
            request = request.header(COOKIE, header);
        }
        let response = request.send().await?;
        let final_url = response.url().clone();
        let status = response.status().as_u16();
        let set_cookies = response.headers().clone();
        let body = response.text().await?;

        debug!(destination = %destination, status, "Probe answered");
        match probe.check(status, &body) {
            Ok(token) => {
                credential.cookies.absorb_set_cookie(&final_url, &set_cookies);
                Ok(Ok((credential, token)))
            }
            Err(reason) => Ok(Err(ProbeFailure { reason, body })),
        }
    }

    async fn login(&self, destination: &DestinationId, setup: &LoginSetup) -> Result<SessionCredential> {
        let Some(credentials) = &setup.credentials else {
            return Err(SessionError::MissingCredentials {
                destination: destination.to_string(),
            });
        };

        match setup.flow.perform(destination, &self.login_client, credentials).await? {
            LoginOutcome::Success(credential) => Ok(credential),
            LoginOutcome::Rejected { reason, body } => {
                self.save_artifact(destination, &body).await;
                Err(SessionError::LoginFailed {
                    destination: destination.to_string(),
                    reason,
                })
            }
        }
    }

    async fn persist(
        &self,
        destination: DestinationId,
        credential: SessionCredential,
        token: Option<String>,
        refreshed: bool,
    ) -> Result<ValidatedSession> {
        self.store.save(&destination, &credential).await?;
        info!(destination = %destination, refreshed, "Session validated");
        Ok(ValidatedSession {
            destination,
            credential,
            token,
            refreshed,
            state: SessionState::Persisted,
        })
    }

    async fn save_artifact(&self, destination: &DestinationId, body: &str) -> Option<PathBuf> {
        match self.artifacts.save(destination, ArtifactKind::FailedLogin, body).await {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(destination = %destination, "Could not save login artifact: {}", e);
                None
            }
        }
    }
}

#[derive(Debug)]
struct ProbeFailure {
    reason: String,
    body: String,
}
