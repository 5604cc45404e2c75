//! Destination definition types.
//!
//! One TOML file describes everything site-specific about a destination:
//! who it bans, how to search it, how to authenticate and how to upload.

use crate::error::{DestinationError, Result};
use regex::Regex;
use seedcast_core::{Category, DestinationId, ReleaseType};
use seedcast_matcher::DestinationPolicy;
use seedcast_session::{LoginFlow, ProbeConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Complete destination definition loaded from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationDefinition {
    /// Core metadata
    pub destination: DestinationMetadata,

    /// Checks run before search
    #[serde(default)]
    pub eligibility: EligibilityRules,

    /// How requests are authenticated
    pub auth: AuthMethod,

    /// How existing torrents are searched
    pub search: SearchMethod,

    /// How the upload is posted
    pub upload: UploadMethod,

    /// Site-specific ids for categories, types and resolutions
    #[serde(default)]
    pub ids: IdMaps,

    /// Adjustments applied to this destination's copy of the release name
    #[serde(default)]
    pub name_replacements: Vec<NameReplacement>,

    /// Replaces the built-in duplicate policy for this destination
    #[serde(default)]
    pub matcher: Option<DestinationPolicy>,
}

impl DestinationDefinition {
    /// Get the destination ID.
    #[must_use]
    pub fn id(&self) -> &DestinationId {
        &self.destination.id
    }

    /// Get the human-readable name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.destination.name
    }

    /// Whether the destination is authenticated with an API token.
    #[must_use]
    pub fn requires_api_key(&self) -> bool {
        matches!(self.auth, AuthMethod::ApiToken { .. })
    }

    /// Validate the definition for completeness and correctness.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| DestinationError::ValidationError {
            destination: self.destination.id.to_string(),
            reason,
        };

        if self.destination.name.is_empty() {
            return Err(invalid("destination name cannot be empty".to_string()));
        }
        if !is_http_url(&self.destination.base_url) {
            return Err(invalid(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.destination.base_url
            )));
        }

        match &self.search {
            SearchMethod::Unit3dApi { url } if !is_http_url(url) => {
                return Err(invalid("search.url must be an http(s) URL".to_string()));
            }
            SearchMethod::Html { url, selectors } => {
                if !is_http_url(url) {
                    return Err(invalid("search.url must be an http(s) URL".to_string()));
                }
                if selectors.result_item.is_empty() || selectors.name.is_empty() {
                    return Err(invalid(
                        "search.selectors needs result_item and name".to_string(),
                    ));
                }
            }
            _ => {}
        }

        if let AuthMethod::Cookie { probe, .. } = &self.auth {
            if !is_http_url(&probe.url) {
                return Err(invalid("auth.probe.url must be an http(s) URL".to_string()));
            }
        }

        let upload = self.upload.settings();
        if !is_http_url(&upload.url) {
            return Err(invalid("upload.url must be an http(s) URL".to_string()));
        }
        if upload.file_field.is_empty() {
            return Err(invalid("upload.file_field cannot be empty".to_string()));
        }
        if let Some(pattern) = &upload.id_pattern {
            Regex::new(pattern).map_err(|e| invalid(format!("upload.id_pattern: {e}")))?;
        }

        Ok(())
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://")
}

/// Core destination metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationMetadata {
    /// Short identifier, e.g. `BLU`
    pub id: DestinationId,

    /// Human-readable name
    pub name: String,

    /// Site root
    pub base_url: String,

    /// Prefix that the assigned id is appended to for the details page
    #[serde(default)]
    pub torrent_url: Option<String>,

    /// Source tag written into the torrent's info dictionary
    #[serde(default)]
    pub source_flag: Option<String>,
}

/// Checks run before search.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EligibilityRules {
    /// Groups the destination does not accept
    pub banned_groups: Vec<BannedGroup>,

    /// Also read `<base>/data/banned/<ID>_banned_groups.json`
    pub banned_groups_file: bool,

    /// Accepted categories; empty accepts all
    pub allowed_categories: Vec<Category>,

    /// Accepted release types; empty accepts all
    pub allowed_types: Vec<ReleaseType>,
}

/// A banned release group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BannedGroup {
    /// Group tag without the dash
    pub name: String,

    /// Why the group is banned, or under which conditions
    #[serde(default)]
    pub note: Option<String>,
}

/// Where an API token goes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenPlacement {
    /// Query parameter named by `name`
    #[default]
    Query,
    /// `Authorization: Bearer <token>`
    Bearer,
    /// Custom header named by `name`
    Header,
}

fn default_token_name() -> String {
    "api_token".to_string()
}

/// How requests to the destination are authenticated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "kebab-case")]
pub enum AuthMethod {
    /// API token from the config file
    ApiToken {
        /// Where the token goes
        #[serde(default)]
        placement: TokenPlacement,
        /// Query parameter or header name
        #[serde(default = "default_token_name")]
        name: String,
    },

    /// Browser session cookies
    Cookie {
        /// Request that proves the session is logged in
        probe: ProbeConfig,
        /// Automatic login, if the site allows it
        #[serde(default)]
        login: Option<LoginFlow>,
    },

    /// No authentication
    None,
}

/// CSS selectors for an HTML search results page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultSelectors {
    /// One element per listed torrent
    pub result_item: String,

    /// Element whose text is the torrent name
    pub name: String,

    /// Element whose text is the size (e.g. `4.37 GiB`)
    #[serde(default)]
    pub size: Option<String>,

    /// Anchor linking to the details page
    #[serde(default)]
    pub link: Option<String>,

    /// Element present only when there are no results
    #[serde(default)]
    pub no_results_indicator: Option<String>,
}

/// How existing torrents are searched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "kebab-case")]
pub enum SearchMethod {
    /// UNIT3D `api/torrents/filter` endpoint
    #[serde(rename = "unit3d-api")]
    Unit3dApi {
        /// Filter endpoint
        url: String,
    },

    /// Search results page scraped with CSS selectors
    Html {
        /// URL template; `{query}` is replaced with the encoded search term
        url: String,
        /// Selectors for the results
        selectors: ResultSelectors,
    },

    /// No search; duplicates cannot be checked
    None,
}

/// Upload request body encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadEncoding {
    /// `multipart/form-data` with the torrent as a file part
    Multipart,
    /// JSON object with the torrent base64-encoded
    Json,
}

fn default_file_field() -> String {
    "torrent".to_string()
}

/// Settings shared by every upload method.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadSettings {
    /// Endpoint the upload is posted to
    pub url: String,

    /// Form field carrying the torrent
    #[serde(default = "default_file_field")]
    pub file_field: String,

    /// Template for the torrent's file name
    #[serde(default)]
    pub file_name: Option<String>,

    /// Form fields; values may contain placeholders like `{name}`
    #[serde(default)]
    pub fields: BTreeMap<String, String>,

    /// Status codes that mean success
    #[serde(default)]
    pub success_status_codes: Vec<u16>,

    /// Text whose presence means success
    #[serde(default)]
    pub success_text: Option<String>,

    /// Text whose absence means success
    #[serde(default)]
    pub error_text: Option<String>,

    /// Regex whose first group is the assigned torrent id
    #[serde(default)]
    pub id_pattern: Option<String>,

    /// Request made after a successful upload; `{id}` is the assigned id
    #[serde(default)]
    pub confirm_url: Option<String>,
}

/// How the upload is posted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "kebab-case")]
pub enum UploadMethod {
    /// Multipart form post
    Multipart(UploadSettings),
    /// JSON post
    JsonApi(UploadSettings),
}

impl UploadMethod {
    /// Settings regardless of encoding.
    #[must_use]
    pub fn settings(&self) -> &UploadSettings {
        match self {
            Self::Multipart(settings) | Self::JsonApi(settings) => settings,
        }
    }

    /// Body encoding.
    #[must_use]
    pub fn encoding(&self) -> PayloadEncoding {
        match self {
            Self::Multipart(_) => PayloadEncoding::Multipart,
            Self::JsonApi(_) => PayloadEncoding::Json,
        }
    }
}

/// Site-specific ids.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IdMaps {
    /// `MOVIE`/`TV` to category id
    pub category: BTreeMap<String, String>,
    /// Release type (`REMUX`, `WEBDL`, ...) to type id
    #[serde(rename = "type")]
    pub release_type: BTreeMap<String, String>,
    /// Resolution label to resolution id
    pub resolution: BTreeMap<String, String>,
}

/// Literal substitution in the release name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameReplacement {
    /// Text to replace
    pub from: String,
    /// Replacement
    pub to: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNIT3D: &str = r#"
[destination]
id = "BLU"
name = "Blutopia"
base_url = "https://blutopia.example"
torrent_url = "https://blutopia.example/torrents/"

[eligibility]
allowed_categories = ["MOVIE", "TV"]
[[eligibility.banned_groups]]
name = "YIFY"
note = "Low quality encodes"

[auth]
method = "api-token"

[search]
method = "unit3d-api"
url = "https://blutopia.example/api/torrents/filter"

[upload]
method = "multipart"
url = "https://blutopia.example/api/torrents/upload"
success_text = '"success":true'
id_pattern = '/(\d+)\.'

[upload.fields]
name = "{name}"
category_id = "{category_id}"

[ids.category]
MOVIE = "1"
TV = "2"

[[name_replacements]]
from = "DD+"
to = "DDP"
"#;

    const COOKIE: &str = r#"
[destination]
id = "ASC"
name = "Cookie Site"
base_url = "https://cookies.example"

[auth]
method = "cookie"
[auth.probe]
url = "https://cookies.example/index.php"
success_text = "Logout"
token_pattern = 'name="token" value="([^"]+)"'

[search]
method = "html"
url = "https://cookies.example/torrents.php?search={query}"
[search.selectors]
result_item = "tr.torrent"
name = "a.name"

[upload]
method = "json-api"
url = "https://cookies.example/upload.php"
success_status_codes = [200, 201]

[matcher]
exact_name_match = true
"#;

    #[test]
    fn test_parse_unit3d_definition() {
        let def: DestinationDefinition = toml::from_str(UNIT3D).expect("parse");
        def.validate().expect("valid");

        assert_eq!(def.id().as_str(), "BLU");
        assert!(def.requires_api_key());
        assert!(matches!(
            def.auth,
            AuthMethod::ApiToken {
                placement: TokenPlacement::Query,
                ref name,
            } if name == "api_token"
        ));
        assert_eq!(def.upload.encoding(), PayloadEncoding::Multipart);
        assert_eq!(def.upload.settings().file_field, "torrent");
        assert_eq!(def.eligibility.banned_groups[0].name, "YIFY");
        assert_eq!(def.ids.category.get("TV").map(String::as_str), Some("2"));
        assert!(def.matcher.is_none());
    }

    #[test]
    fn test_parse_cookie_definition() {
        let def: DestinationDefinition = toml::from_str(COOKIE).expect("parse");
        def.validate().expect("valid");

        assert!(!def.requires_api_key());
        assert_eq!(def.upload.encoding(), PayloadEncoding::Json);
        assert_eq!(def.upload.settings().success_status_codes, vec![200, 201]);
        assert!(def.matcher.as_ref().is_some_and(|m| m.exact_name_match));
        match &def.auth {
            AuthMethod::Cookie { probe, login } => {
                assert_eq!(probe.success_text.as_deref(), Some("Logout"));
                assert!(login.is_none());
            }
            other => panic!("unexpected auth {other:?}"),
        }
    }

    #[test]
    fn test_validate_rejects_bad_id_pattern() {
        let mut def: DestinationDefinition = toml::from_str(UNIT3D).expect("parse");
        if let UploadMethod::Multipart(settings) = &mut def.upload {
            settings.id_pattern = Some("(".to_string());
        }
        assert!(matches!(
            def.validate(),
            Err(DestinationError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_relative_upload_url() {
        let mut def: DestinationDefinition = toml::from_str(UNIT3D).expect("parse");
        if let UploadMethod::Multipart(settings) = &mut def.upload {
            settings.url = "/upload".to_string();
        }
        assert!(def.validate().is_err());
    }
}
