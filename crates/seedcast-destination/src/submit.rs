//! Posting an upload and classifying the answer.
//!
//! Multipart and JSON uploads share one contract: one POST, one
//! [`SuccessPolicy`], then identifier extraction and an optional
//! confirmation request on success, or a saved artifact on failure.

use crate::{
    auth::RequestAuth,
    definition::PayloadEncoding,
    error::{DestinationError, Result},
    success::SuccessPolicy,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use regex::Regex;
use reqwest::{
    multipart::{Form, Part},
    Client, Url,
};
use seedcast_core::{ArtifactKind, ArtifactStore, DestinationId, UploadOutcome, SECRET_WARNING};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{info, warn};

/// Message recorded for a classified success.
pub const SUCCESS_MESSAGE: &str = "Torrent uploaded successfully.";

/// Message recorded for a classified failure.
pub const FAILURE_MESSAGE: &str =
    "data error: The upload appears to have failed. It may have uploaded, go check.";

/// One upload request.
#[derive(Debug, Clone)]
pub struct UploadPayload {
    /// Endpoint
    pub url: String,
    /// Body encoding
    pub encoding: PayloadEncoding,
    /// Field carrying the torrent
    pub file_field: String,
    /// File name given to the torrent part
    pub file_name: String,
    /// Torrent bytes
    pub torrent: Arc<[u8]>,
    /// Rendered form fields
    pub fields: Vec<(String, String)>,
}

/// What happens after the response arrives.
#[derive(Debug, Clone)]
pub struct SubmitRules {
    /// The success criterion
    pub success: SuccessPolicy,
    /// Regex whose first group is the assigned id
    pub id_pattern: Option<Regex>,
    /// Request made after success; `{id}` is replaced with the assigned id
    pub confirm_url: Option<String>,
    /// Prefix the assigned id is appended to
    pub torrent_url: Option<String>,
    /// Announce URL for the outward record
    pub announce_url: Option<String>,
}

/// Posts uploads.
#[derive(Debug, Clone)]
pub struct UploadSubmitter {
    client: Client,
    artifacts: ArtifactStore,
}

impl UploadSubmitter {
    /// Create a submitter. `client` should follow redirects so the final
    /// URL is available for id extraction.
    #[must_use]
    pub fn new(client: Client, artifacts: ArtifactStore) -> Self {
        Self { client, artifacts }
    }

    /// Post `payload` and classify the response.
    ///
    /// Transport failures are returned as errors; a response that does not
    /// meet the success criterion is a failed [`UploadOutcome`].
    pub async fn submit(
        &self,
        destination: &DestinationId,
        auth: &RequestAuth,
        payload: UploadPayload,
        rules: &SubmitRules,
    ) -> Result<UploadOutcome> {
        let url = Url::parse(&payload.url).map_err(|e| DestinationError::Configuration {
            destination: destination.to_string(),
            reason: format!("invalid upload url '{}': {e}", payload.url),
        })?;

        let request = auth.apply(self.client.post(url.clone()), &url);
        let request = match payload.encoding {
            PayloadEncoding::Multipart => {
                let mut form = Form::new();
                for (key, value) in payload.fields {
                    form = form.text(key, value);
                }
                let part = Part::bytes(payload.torrent.to_vec())
                    .file_name(payload.file_name)
                    .mime_str("application/x-bittorrent")?;
                request.multipart(form.part(payload.file_field, part))
            }
            PayloadEncoding::Json => {
                let mut body: Map<String, Value> = payload
                    .fields
                    .into_iter()
                    .map(|(key, value)| (key, Value::String(value)))
                    .collect();
                body.insert(
                    payload.file_field,
                    Value::String(STANDARD.encode(&payload.torrent)),
                );
                request.json(&body)
            }
        };

        let started = std::time::Instant::now();
        let response = request.send().await?;
        let final_url = response.url().clone();
        let status = response.status().as_u16();
        let body = response.text().await?;

        info!(
            destination = %destination,
            status,
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "upload response received"
        );

        match rules.success.classify(status, &body) {
            Ok(()) => Ok(self.succeeded(destination, auth, rules, &final_url, &body).await),
            Err(detail) => Ok(self.failed(destination, rules, &detail, &body).await),
        }
    }

    async fn succeeded(
        &self,
        destination: &DestinationId,
        auth: &RequestAuth,
        rules: &SubmitRules,
        final_url: &Url,
        body: &str,
    ) -> UploadOutcome {
        let assigned_id = rules
            .id_pattern
            .as_ref()
            .and_then(|pattern| extract_id(pattern, final_url.as_str()).or_else(|| extract_id(pattern, body)));

        let mut message = json_message(body).unwrap_or_else(|| SUCCESS_MESSAGE.to_string());

        if rules.id_pattern.is_some() && assigned_id.is_none() {
            warn!(destination = %destination, "upload succeeded but no torrent id was found");
            message.push_str(" Could not find the torrent id in the response.");
        }

        if let Some(template) = &rules.confirm_url {
            match (template.contains("{id}"), assigned_id.as_deref()) {
                (true, None) => {
                    message.push_str(" Confirmation step skipped: no torrent id.");
                }
                (_, id) => {
                    let target = template.replace("{id}", id.unwrap_or_default());
                    if let Err(reason) = self.confirm(auth, &target).await {
                        warn!(destination = %destination, error = %reason, "confirmation request failed");
                        message.push_str(&format!(" Confirmation request failed: {reason}"));
                    }
                }
            }
        }

        let details_url = match (&rules.torrent_url, &assigned_id) {
            (Some(prefix), Some(id)) => Some(format!("{prefix}{id}")),
            _ => None,
        };

        info!(
            destination = %destination,
            id = assigned_id.as_deref().unwrap_or("-"),
            "upload succeeded"
        );

        UploadOutcome {
            success: true,
            assigned_id,
            message,
            details_url,
            announce_url: rules.announce_url.clone(),
            artifact: None,
        }
    }

    async fn failed(
        &self,
        destination: &DestinationId,
        rules: &SubmitRules,
        detail: &str,
        body: &str,
    ) -> UploadOutcome {
        let mut message = format!("{FAILURE_MESSAGE} {detail}");
        let artifact = match self.artifacts.save(destination, ArtifactKind::FailedUpload, body).await {
            Ok(path) => {
                message.push_str(&format!(
                    " The response was saved to {}; {SECRET_WARNING}.",
                    path.display()
                ));
                Some(path)
            }
            Err(e) => {
                warn!(destination = %destination, error = %e, "failed to save upload response");
                None
            }
        };

        warn!(destination = %destination, reason = %detail, "upload failed");

        UploadOutcome {
            announce_url: rules.announce_url.clone(),
            artifact,
            ..UploadOutcome::failed(message)
        }
    }

    async fn confirm(&self, auth: &RequestAuth, target: &str) -> std::result::Result<(), String> {
        let url = Url::parse(target).map_err(|e| format!("invalid confirmation url: {e}"))?;
        let response = auth
            .apply(self.client.get(url.clone()), &url)
            .send()
            .await
            .map_err(|e| seedcast_core::TransportError::from(e).to_string())?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(format!("HTTP {}", response.status().as_u16()))
        }
    }
}

fn extract_id(pattern: &Regex, haystack: &str) -> Option<String> {
    pattern
        .captures(haystack)
        .and_then(|caps| caps.get(1).or_else(|| caps.get(0)))
        .map(|m| m.as_str().to_string())
}

/// The `message` of a JSON API response, when it has one.
fn json_message(body: &str) -> Option<String> {
    serde_json::from_str::<Value>(body)
        .ok()?
        .get("message")?
        .as_str()
        .map(str::to_string)
        .filter(|m| !m.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_id_prefers_group() {
        let pattern = Regex::new(r"torrentid=(\d+)").expect("regex");
        assert_eq!(
            extract_id(&pattern, "https://x/torrents.php?id=1&torrentid=77"),
            Some("77".to_string())
        );
        assert_eq!(extract_id(&pattern, "nothing"), None);

        let whole = Regex::new(r"\d+").expect("regex");
        assert_eq!(extract_id(&whole, "id 42"), Some("42".to_string()));
    }

    #[test]
    fn test_json_message() {
        assert_eq!(
            json_message(r#"{"success":true,"message":"Torrent uploaded"}"#).as_deref(),
            Some("Torrent uploaded")
        );
        assert_eq!(json_message("<html>"), None);
        assert_eq!(json_message(r#"{"message":""}"#), None);
    }
}
