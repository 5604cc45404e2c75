//! HTTP client construction and transport error classification.
//!
//! Every request a destination task makes goes through a client built here,
//! so every request carries the configured connect and read timeouts.
//! Failures are folded into one of eight [`TransportErrorKind`]s, each with a
//! stable operator-facing message.

use crate::config::NetworkConfig;
use crate::error::{Result, SeedcastError};
use reqwest::redirect::Policy;
use reqwest::Client;
use std::error::Error as _;
use std::time::Duration;
use thiserror::Error;

/// Redirect hops followed before a request fails as a redirect loop.
pub const MAX_REDIRECTS: usize = 10;

/// Category of a network failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// TCP/TLS connection could not be established in time
    ConnectTimeout,
    /// Connected, but the response did not arrive in time
    ReadTimeout,
    /// Connection refused, DNS failure, TLS failure
    ConnectFailure,
    /// Configured proxy rejected or could not be reached
    Proxy,
    /// Response body could not be decoded
    Decode,
    /// Redirect chain exceeded the limit
    TooManyRedirects,
    /// Server answered with an error status
    HttpStatus(u16),
    /// Anything else reqwest reports
    Request,
}

impl TransportErrorKind {
    /// Classify a reqwest error.
    #[must_use]
    pub fn classify(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            if err.is_connect() {
                Self::ConnectTimeout
            } else {
                Self::ReadTimeout
            }
        } else if err.is_connect() {
            if mentions_proxy(err) {
                Self::Proxy
            } else {
                Self::ConnectFailure
            }
        } else if err.is_decode() {
            Self::Decode
        } else if err.is_redirect() {
            Self::TooManyRedirects
        } else if let Some(status) = err.status() {
            Self::HttpStatus(status.as_u16())
        } else {
            Self::Request
        }
    }

    /// Operator-facing summary for this category.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::ConnectTimeout => "Connection timed out".to_string(),
            Self::ReadTimeout => "Read timed out".to_string(),
            Self::ConnectFailure => "Failed to connect to the server".to_string(),
            Self::Proxy => "Proxy connection failed".to_string(),
            Self::Decode => "Response decoding failed".to_string(),
            Self::TooManyRedirects => "Too many redirects".to_string(),
            Self::HttpStatus(code) => format!("HTTP error {code}"),
            Self::Request => "Request error".to_string(),
        }
    }
}

fn mentions_proxy(err: &reqwest::Error) -> bool {
    let mut source = err.source();
    while let Some(cause) = source {
        if cause.to_string().to_lowercase().contains("proxy") {
            return true;
        }
        source = cause.source();
    }
    false
}

/// A classified network failure.
#[derive(Error, Debug, Clone)]
#[error("{}: {detail}", .kind.message())]
pub struct TransportError {
    /// Failure category
    pub kind: TransportErrorKind,
    /// Underlying error text
    pub detail: String,
}

impl TransportError {
    /// Build an error of the given kind.
    pub fn new(kind: TransportErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let kind = TransportErrorKind::classify(&err);
        let url = err.url().map(|url| crate::redact::redact_text(url.as_str()));
        let detail = match url {
            Some(url) => format!("{} ({url})", err.without_url()),
            None => err.to_string(),
        };
        Self { kind, detail }
    }
}

/// Build the shared HTTP client used for search, probe, and upload requests.
///
/// Redirects are followed up to [`MAX_REDIRECTS`] hops so the final URL of an
/// upload response is available for identifier extraction.
pub fn build_http_client(network: &NetworkConfig) -> Result<Client> {
    builder(network)
        .redirect(Policy::limited(MAX_REDIRECTS))
        .build()
        .map_err(|e| SeedcastError::Internal(format!("failed to create HTTP client: {e}")))
}

/// Build a client that never follows redirects.
///
/// Login flows need this to capture `Set-Cookie` headers sent with the
/// redirect itself.
pub fn build_no_redirect_client(network: &NetworkConfig) -> Result<Client> {
    builder(network)
        .redirect(Policy::none())
        .build()
        .map_err(|e| SeedcastError::Internal(format!("failed to create HTTP client: {e}")))
}

fn builder(network: &NetworkConfig) -> reqwest::ClientBuilder {
    Client::builder()
        .connect_timeout(Duration::from_secs(network.connect_timeout_secs))
        .timeout(Duration::from_secs(network.read_timeout_secs))
        .user_agent(network.user_agent.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_network() -> NetworkConfig {
        NetworkConfig {
            connect_timeout_secs: 2,
            read_timeout_secs: 1,
            ..NetworkConfig::default()
        }
    }

    #[test]
    fn test_kind_messages_are_distinct() {
        let kinds = [
            TransportErrorKind::ConnectTimeout,
            TransportErrorKind::ReadTimeout,
            TransportErrorKind::ConnectFailure,
            TransportErrorKind::Proxy,
            TransportErrorKind::Decode,
            TransportErrorKind::TooManyRedirects,
            TransportErrorKind::HttpStatus(502),
            TransportErrorKind::Request,
        ];
        let mut messages: Vec<String> = kinds.iter().map(TransportErrorKind::message).collect();
        messages.sort();
        messages.dedup();
        assert_eq!(messages.len(), kinds.len());
        assert_eq!(TransportErrorKind::HttpStatus(502).message(), "HTTP error 502");
    }

    #[tokio::test]
    async fn test_classify_read_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let client = build_http_client(&fast_network()).expect("build client");
        let err = client
            .get(format!("{}/slow", server.uri()))
            .send()
            .await
            .expect_err("request should time out");

        let classified = TransportError::from(err);
        assert_eq!(classified.kind, TransportErrorKind::ReadTimeout);
        assert!(classified.to_string().starts_with("Read timed out"));
    }

    #[tokio::test]
    async fn test_classify_connect_failure() {
        let client = build_http_client(&fast_network()).expect("build client");
        let err = client
            .get("http://127.0.0.1:1/")
            .send()
            .await
            .expect_err("nothing listens on port 1");

        let kind = TransportErrorKind::classify(&err);
        assert!(matches!(
            kind,
            TransportErrorKind::ConnectFailure | TransportErrorKind::ConnectTimeout
        ));
    }

    #[tokio::test]
    async fn test_classify_http_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = build_http_client(&fast_network()).expect("build client");
        let err = client
            .get(server.uri())
            .send()
            .await
            .expect("response arrives")
            .error_for_status()
            .expect_err("503 is an error status");

        assert_eq!(
            TransportErrorKind::classify(&err),
            TransportErrorKind::HttpStatus(503)
        );
    }

    #[tokio::test]
    async fn test_classify_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
            .mount(&server)
            .await;

        let client = build_http_client(&fast_network()).expect("build client");
        let err = client
            .get(server.uri())
            .send()
            .await
            .expect("response arrives")
            .json::<serde_json::Value>()
            .await
            .expect_err("body is not json");

        assert_eq!(TransportErrorKind::classify(&err), TransportErrorKind::Decode);
    }

    #[tokio::test]
    async fn test_classify_redirect_loop() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/loop"))
            .respond_with(
                ResponseTemplate::new(302).insert_header("Location", "/loop"),
            )
            .mount(&server)
            .await;

        let client = build_http_client(&fast_network()).expect("build client");
        let err = client
            .get(format!("{}/loop", server.uri()))
            .send()
            .await
            .expect_err("redirect loop");

        assert_eq!(
            TransportErrorKind::classify(&err),
            TransportErrorKind::TooManyRedirects
        );
    }
}
