//! Secret scrubbing for logs, previews and exported status.

use once_cell::sync::Lazy;
use regex::Regex;

const MASK: &str = "[REDACTED]";

/// Form/header keys whose values are never shown.
pub const SENSITIVE_KEYS: &[&str] = &[
    "token",
    "api_token",
    "passkey",
    "password",
    "auth",
    "cookie",
    "csrf",
    "email",
    "username",
    "user",
    "key",
    "info_hash",
];

static ANNOUNCE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/[A-Za-z0-9]{10,}/announce").expect("valid regex"));

static QUERY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([?&](?:passkey|key|token|api_token|auth|info_hash)=)[^&\s]+").expect("valid regex")
});

static HEX_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[a-fA-F0-9]{32,}\b").expect("valid regex"));

/// Mask passkeys, credential query parameters and long hex secrets in text.
#[must_use]
pub fn redact_text(text: &str) -> String {
    let text = ANNOUNCE_REGEX.replace_all(text, format!("/{MASK}/announce").as_str());
    let text = QUERY_REGEX.replace_all(&text, format!("${{1}}{MASK}").as_str());
    HEX_REGEX.replace_all(&text, MASK).into_owned()
}

/// Whether a field name carries a credential.
#[must_use]
pub fn is_sensitive_key(key: &str) -> bool {
    let key = key.to_lowercase();
    SENSITIVE_KEYS.contains(&key.as_str())
        || key.contains("password")
        || key.contains("passkey")
        || key.ends_with("token")
}

/// Copy of form fields with sensitive values masked and the rest scrubbed.
#[must_use]
pub fn redact_form(fields: &[(String, String)]) -> Vec<(String, String)> {
    fields
        .iter()
        .map(|(key, value)| {
            let value = if is_sensitive_key(key) {
                MASK.to_string()
            } else {
                redact_text(value)
            };
            (key.clone(), value)
        })
        .collect()
}
