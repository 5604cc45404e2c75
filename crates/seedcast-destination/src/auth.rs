//! How search, upload and confirmation requests carry credentials.

use crate::{
    context::TaskContext,
    definition::{AuthMethod, DestinationDefinition, TokenPlacement},
    error::{DestinationError, Result},
};
use reqwest::{header, RequestBuilder, Url};
use seedcast_session::SessionCredential;

/// Credentials attached to an outgoing request.
#[derive(Clone, PartialEq, Eq)]
pub enum RequestAuth {
    /// Nothing attached
    None,
    /// Session cookies, sent only to URLs they match
    Session(SessionCredential),
    /// `Authorization: Bearer <token>`
    Bearer(String),
    /// Custom header
    Header {
        /// Header name
        name: String,
        /// Header value
        value: String,
    },
    /// Query parameter
    Query {
        /// Parameter name
        name: String,
        /// Parameter value
        value: String,
    },
}

impl std::fmt::Debug for RequestAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Session(credential) => f
                .debug_struct("Session")
                .field("cookies", &credential.cookies.len())
                .finish_non_exhaustive(),
            Self::Bearer(_) => f.write_str("Bearer([REDACTED])"),
            Self::Header { name, .. } => f.debug_struct("Header").field("name", name).finish_non_exhaustive(),
            Self::Query { name, .. } => f.debug_struct("Query").field("name", name).finish_non_exhaustive(),
        }
    }
}

impl RequestAuth {
    /// Pick the credentials a destination's definition asks for.
    ///
    /// Cookie destinations without a session, and token destinations without
    /// an API key, are configuration errors.
    pub fn resolve(
        definition: &DestinationDefinition,
        ctx: &TaskContext,
        session: Option<&SessionCredential>,
    ) -> Result<Self> {
        match &definition.auth {
            AuthMethod::None => Ok(Self::None),
            AuthMethod::Cookie { .. } => session.cloned().map(Self::Session).ok_or_else(|| {
                DestinationError::Configuration {
                    destination: definition.id().to_string(),
                    reason: "no session loaded for a cookie-authenticated destination".to_string(),
                }
            }),
            AuthMethod::ApiToken { placement, name } => {
                let Some(key) = ctx.api_key() else {
                    return Err(DestinationError::Configuration {
                        destination: definition.id().to_string(),
                        reason: "missing API key".to_string(),
                    });
                };
                let value = key.to_string();
                Ok(match placement {
                    TokenPlacement::Query => Self::Query {
                        name: name.clone(),
                        value,
                    },
                    TokenPlacement::Bearer => Self::Bearer(value),
                    TokenPlacement::Header => Self::Header {
                        name: name.clone(),
                        value,
                    },
                })
            }
        }
    }

    /// Attach the credentials to a request bound for `url`.
    #[must_use]
    pub fn apply(&self, request: RequestBuilder, url: &Url) -> RequestBuilder {
        match self {
            Self::None => request,
            Self::Session(credential) => match credential.cookies.header_for(url) {
                Some(cookie) => request.header(header::COOKIE, cookie),
                None => request,
            },
            Self::Bearer(token) => request.bearer_auth(token),
            Self::Header { name, value } => request.header(name.as_str(), value.as_str()),
            Self::Query { name, value } => request.query(&[(name.as_str(), value.as_str())]),
        }
    }
}
