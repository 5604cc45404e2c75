//! Persisted sessions, one per destination.

use crate::cookie_jar::CookieJar;
use crate::error::{Result, SessionError};
use async_trait::async_trait;
use seedcast_core::DestinationId;
use std::path::{Path, PathBuf};
use tracing::debug;

/// What a destination needs to recognise us: cookies, plus an optional
/// auth key scraped during login.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionCredential {
    /// Cookie jar sent with every session request
    pub cookies: CookieJar,
    /// Auth key or bearer token stored beside the cookies
    pub token: Option<String>,
}

impl SessionCredential {
    /// Credential holding only cookies.
    #[must_use]
    pub fn from_cookies(cookies: CookieJar) -> Self {
        Self {
            cookies,
            token: None,
        }
    }
}

/// Where sessions live between runs.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the stored session, or `None` if there is none.
    async fn load(&self, destination: &DestinationId) -> Result<Option<SessionCredential>>;

    /// Replace the stored session.
    async fn save(&self, destination: &DestinationId, credential: &SessionCredential) -> Result<()>;

    /// Human-readable location of the session, for error messages.
    fn location(&self, destination: &DestinationId) -> PathBuf;
}

/// Sessions as Netscape cookie files under `<base>/cookies/`.
///
/// `<DEST>.txt` holds the cookies and `<DEST>_auth.txt` an optional auth key.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    /// Store rooted at `<base_dir>/cookies`.
    #[must_use]
    pub fn new(base_dir: &Path) -> Self {
        Self {
            dir: base_dir.join("cookies"),
        }
    }

    /// Cookie file for a destination.
    #[must_use]
    pub fn cookie_path(&self, destination: &DestinationId) -> PathBuf {
        self.dir.join(format!("{destination}.txt"))
    }

    /// Auth key file for a destination.
    #[must_use]
    pub fn token_path(&self, destination: &DestinationId) -> PathBuf {
        self.dir.join(format!("{destination}_auth.txt"))
    }

    async fn read_optional(path: &Path) -> Result<Option<String>> {
        match tokio::fs::read_to_string(path).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_atomic(path: &Path, contents: &str) -> Result<()> {
        let tmp = path.with_extension("txt.tmp");
        tokio::fs::write(&tmp, contents).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self, destination: &DestinationId) -> Result<Option<SessionCredential>> {
        let path = self.cookie_path(destination);
        let Some(text) = Self::read_optional(&path).await? else {
            debug!(destination = %destination, path = %path.display(), "No stored cookies");
            return Ok(None);
        };

        let cookies = CookieJar::parse(&text).map_err(|e| SessionError::CookieParse {
            path: path.clone(),
            line: e.line,
            reason: e.reason,
        })?;
        let token = Self::read_optional(&self.token_path(destination))
            .await?
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        debug!(
            destination = %destination,
            cookies = cookies.len(),
            has_token = token.is_some(),
            "Loaded stored session"
        );
        Ok(Some(SessionCredential { cookies, token }))
    }

    async fn save(&self, destination: &DestinationId, credential: &SessionCredential) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Self::write_atomic(&self.cookie_path(destination), &credential.cookies.to_netscape()).await?;
        if let Some(token) = &credential.token {
            Self::write_atomic(&self.token_path(destination), token).await?;
        }
        debug!(destination = %destination, "Persisted session");
        Ok(())
    }

    fn location(&self, destination: &DestinationId) -> PathBuf {
        self.cookie_path(destination)
    }
}
