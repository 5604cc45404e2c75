//! Programmatic login for destinations that allow it.

use crate::cookie_jar::CookieJar;
use crate::error::{Result, SessionError};
use crate::store::SessionCredential;
use regex::Regex;
use reqwest::header::{COOKIE, LOCATION};
use reqwest::{Client, Url};
use seedcast_core::transport::MAX_REDIRECTS;
use seedcast_core::DestinationId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

fn default_username_field() -> String {
    "username".to_string()
}

fn default_password_field() -> String {
    "password".to_string()
}

/// How to log in to a destination with a username and password.
///
/// ```toml
/// [auth.login]
/// url = "https://tracker.example/login.php"
/// extra_fields = { keeplogged = "1", login = "Login" }
/// failure_markers = ["login.php?act=recover", "Forgot your password"]
/// verify_url = "https://tracker.example/torrents.php"
/// auth_key_pattern = "auth=([^&\"]+)"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginFlow {
    /// Form action the credentials are posted to
    pub url: String,

    /// Form field carrying the username
    #[serde(default = "default_username_field")]
    pub username_field: String,

    /// Form field carrying the password
    #[serde(default = "default_password_field")]
    pub password_field: String,

    /// Fixed fields the form also needs
    #[serde(default)]
    pub extra_fields: BTreeMap<String, String>,

    /// Text that only appears when the login was rejected
    #[serde(default)]
    pub failure_markers: Vec<String>,

    /// Page fetched after login to confirm it and find the auth key
    #[serde(default)]
    pub verify_url: Option<String>,

    /// Regex whose first group is the destination's auth key
    #[serde(default)]
    pub auth_key_pattern: Option<String>,
}

/// Username and password from the config file.
#[derive(Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    /// Account name
    pub username: String,
    /// Account password
    pub password: String,
}

impl std::fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// A login flow together with whatever credentials the config provides.
#[derive(Debug, Clone)]
pub struct LoginSetup {
    /// The flow to run
    pub flow: LoginFlow,
    /// Credentials, if configured
    pub credentials: Option<LoginCredentials>,
}

/// Result of running a login flow.
#[derive(Debug, Clone)]
pub enum LoginOutcome {
    /// Logged in; the credential is ready to validate and persist
    Success(SessionCredential),
    /// The destination turned the login down
    Rejected {
        /// What gave the rejection away
        reason: String,
        /// Last response body, for the debug artifact
        body: String,
    },
}

struct Page {
    url: Url,
    status: u16,
    body: String,
}

impl LoginFlow {
    /// Log in and collect the resulting cookies.
    ///
    /// `client` must not follow redirects: `Set-Cookie` on the redirect
    /// itself is usually the session.
    pub async fn perform(
        &self,
        destination: &DestinationId,
        client: &Client,
        credentials: &LoginCredentials,
    ) -> Result<LoginOutcome> {
        let auth_key_pattern = self
            .auth_key_pattern
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(|e| SessionError::Configuration {
                destination: destination.to_string(),
                reason: format!("invalid auth_key_pattern: {e}"),
            })?;
        let url = parse_url(destination, &self.url)?;

        let mut form: Vec<(String, String)> = vec![
            (self.username_field.clone(), credentials.username.clone()),
            (self.password_field.clone(), credentials.password.clone()),
        ];
        form.extend(self.extra_fields.iter().map(|(k, v)| (k.clone(), v.clone())));

        info!(destination = %destination, "Logging in");
        let mut jar = CookieJar::new();
        let response = client.post(url.clone()).form(&form).send().await?;
        let page = follow(client, &mut jar, response).await?;

        if let Some(rejection) = self.rejection(&page) {
            return Ok(rejection);
        }

        let page = match &self.verify_url {
            Some(verify) => {
                let verify = parse_url(destination, verify)?;
                let page = get_with_jar(client, &mut jar, verify).await?;
                if let Some(rejection) = self.rejection(&page) {
                    return Ok(rejection);
                }
                page
            }
            None => page,
        };

        if jar.is_empty() {
            return Ok(LoginOutcome::Rejected {
                reason: "the destination set no session cookies".to_string(),
                body: page.body,
            });
        }

        let token = match &auth_key_pattern {
            Some(pattern) => match extract_first_group(pattern, &page.body) {
                Some(token) => Some(token),
                None => {
                    return Ok(LoginOutcome::Rejected {
                        reason: format!("auth key not found with pattern '{pattern}'"),
                        body: page.body,
                    })
                }
            },
            None => None,
        };

        debug!(
            destination = %destination,
            cookies = jar.len(),
            has_token = token.is_some(),
            "Login succeeded"
        );
        Ok(LoginOutcome::Success(SessionCredential {
            cookies: jar,
            token,
        }))
    }

    fn rejection(&self, page: &Page) -> Option<LoginOutcome> {
        if !(200..300).contains(&page.status) {
            return Some(LoginOutcome::Rejected {
                reason: format!("{} answered HTTP {}", page.url, page.status),
                body: page.body.clone(),
            });
        }
        self.failure_markers
            .iter()
            .find(|marker| page.body.contains(marker.as_str()))
            .map(|marker| LoginOutcome::Rejected {
                reason: format!("page contains failure marker '{marker}'"),
                body: page.body.clone(),
            })
    }
}

/// First capture group of `pattern` in `text`, or the whole match when the
/// pattern has no groups.
pub(crate) fn extract_first_group(pattern: &Regex, text: &str) -> Option<String> {
    let captures = pattern.captures(text)?;
    captures
        .get(1)
        .or_else(|| captures.get(0))
        .map(|m| m.as_str().to_string())
}

fn parse_url(destination: &DestinationId, raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| SessionError::Configuration {
        destination: destination.to_string(),
        reason: format!("invalid URL '{raw}': {e}"),
    })
}

async fn get_with_jar(client: &Client, jar: &mut CookieJar, url: Url) -> Result<Page> {
    let mut request = client.get(url.clone());
    if let Some(header) = jar.header_for(&url) {
        request = request.header(COOKIE, header);
    }
    let response = request.send().await?;
    follow(client, jar, response).await
}

/// Absorb cookies from `response` and chase redirects by hand so every hop's
/// `Set-Cookie` lands in the jar.
async fn follow(client: &Client, jar: &mut CookieJar, mut response: reqwest::Response) -> Result<Page> {
    for _ in 0..MAX_REDIRECTS {
        let url = response.url().clone();
        jar.absorb_set_cookie(&url, response.headers());

        let next = response
            .status()
            .is_redirection()
            .then(|| response.headers().get(LOCATION))
            .flatten()
            .and_then(|v| v.to_str().ok())
            .and_then(|location| url.join(location).ok());

        let Some(next) = next else {
            let status = response.status().as_u16();
            let body = response.text().await?;
            return Ok(Page { url, status, body });
        };

        let mut request = client.get(next.clone());
        if let Some(header) = jar.header_for(&next) {
            request = request.header(COOKIE, header);
        }
        response = request.send().await?;
    }

    Err(seedcast_core::TransportError::new(
        seedcast_core::TransportErrorKind::TooManyRedirects,
        response.url().to_string(),
    )
    .into())
}
