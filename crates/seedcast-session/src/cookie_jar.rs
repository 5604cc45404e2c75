//! Netscape cookie-jar files.
//!
//! Browser export extensions write one cookie per line with seven
//! tab-separated fields:
//!
//! ```text
//! domain  include_subdomains  path  secure  expires  name  value
//! ```
//!
//! Lines prefixed with `#HttpOnly_` are HTTP-only cookies; other `#` lines
//! are comments. Expired cookies are kept on load and on save so a re-export
//! is never silently truncated, but they are not sent.

use chrono::{NaiveDateTime, Utc};
use reqwest::header::{HeaderMap, SET_COOKIE};
use reqwest::Url;
use thiserror::Error;

const HEADER: &str = "# Netscape HTTP Cookie File\n# Written by seedcast. Do not share: this file grants access to your account.\n";
const HTTP_ONLY_PREFIX: &str = "#HttpOnly_";

/// A malformed line in a cookie file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: {reason}")]
pub struct CookieLineError {
    /// 1-based line number
    pub line: usize,
    /// What is wrong with the line
    pub reason: String,
}

/// One stored cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    /// Domain, with a leading dot for domain cookies
    pub domain: String,
    /// Whether subdomains of `domain` also receive the cookie
    pub include_subdomains: bool,
    /// Path prefix
    pub path: String,
    /// Only sent over HTTPS
    pub secure: bool,
    /// Unix expiry timestamp, `None` for session cookies
    pub expires: Option<i64>,
    /// Cookie name
    pub name: String,
    /// Cookie value
    pub value: String,
    /// Marked `HttpOnly`
    pub http_only: bool,
}

impl Cookie {
    /// A session cookie for `domain` on path `/`.
    pub fn new(domain: impl Into<String>, name: impl Into<String>, value: impl Into<String>) -> Self {
        let domain = domain.into();
        Self {
            include_subdomains: domain.starts_with('.'),
            domain,
            path: "/".to_string(),
            secure: false,
            expires: None,
            name: name.into(),
            value: value.into(),
            http_only: false,
        }
    }

    /// Whether the cookie has expired at `now` (unix seconds).
    #[must_use]
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires.is_some_and(|at| at > 0 && at <= now)
    }

    /// Whether a request to `url` should carry this cookie, ignoring expiry.
    #[must_use]
    pub fn matches(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        if self.secure && url.scheme() != "https" {
            return false;
        }
        domain_matches(&self.domain, self.include_subdomains, host) && path_matches(&self.path, url.path())
    }

    fn same_slot(&self, other: &Self) -> bool {
        self.name == other.name
            && self.path == other.path
            && self.domain.trim_start_matches('.').eq_ignore_ascii_case(other.domain.trim_start_matches('.'))
    }

    fn parse_line(line: &str, number: usize) -> Result<Self, CookieLineError> {
        let (http_only, line) = match line.strip_prefix(HTTP_ONLY_PREFIX) {
            Some(rest) => (true, rest),
            None => (false, line),
        };
        let fields: Vec<&str> = line.split('\t').collect();
        // Some exporters drop the trailing tab when the value is empty.
        if fields.len() != 7 && fields.len() != 6 {
            return Err(CookieLineError {
                line: number,
                reason: format!("expected 7 tab-separated fields, found {}", fields.len()),
            });
        }

        let flag = |index: usize, label: &str| -> Result<bool, CookieLineError> {
            match fields[index].trim().to_ascii_uppercase().as_str() {
                "TRUE" => Ok(true),
                "FALSE" => Ok(false),
                other => Err(CookieLineError {
                    line: number,
                    reason: format!("{label} must be TRUE or FALSE, found '{other}'"),
                }),
            }
        };

        let expires_field = fields[4].trim();
        let expires = expires_field
            .parse::<i64>()
            .ok()
            .or_else(|| expires_field.parse::<f64>().ok().map(|f| f as i64))
            .ok_or_else(|| CookieLineError {
                line: number,
                reason: format!("expiry '{expires_field}' is not a unix timestamp"),
            })?;

        let domain = fields[0].trim().to_string();
        if domain.is_empty() {
            return Err(CookieLineError {
                line: number,
                reason: "empty domain".to_string(),
            });
        }

        Ok(Self {
            domain,
            include_subdomains: flag(1, "include_subdomains")?,
            path: fields[2].trim().to_string(),
            secure: flag(3, "secure")?,
            expires: (expires != 0).then_some(expires),
            name: fields[5].to_string(),
            value: fields.get(6).map(|v| (*v).to_string()).unwrap_or_default(),
            http_only,
        })
    }

    fn to_line(&self) -> String {
        let bool_field = |b: bool| if b { "TRUE" } else { "FALSE" };
        format!(
            "{}{}\t{}\t{}\t{}\t{}\t{}\t{}",
            if self.http_only { HTTP_ONLY_PREFIX } else { "" },
            self.domain,
            bool_field(self.include_subdomains),
            self.path,
            bool_field(self.secure),
            self.expires.unwrap_or(0),
            self.name,
            self.value
        )
    }
}

fn domain_matches(domain: &str, include_subdomains: bool, host: &str) -> bool {
    let bare = domain.trim_start_matches('.');
    if host.eq_ignore_ascii_case(bare) {
        return true;
    }
    (include_subdomains || domain.starts_with('.'))
        && host.len() > bare.len()
        && host.to_ascii_lowercase().ends_with(&format!(".{}", bare.to_ascii_lowercase()))
}

fn path_matches(cookie_path: &str, request_path: &str) -> bool {
    if cookie_path.is_empty() || cookie_path == "/" {
        return true;
    }
    match request_path.strip_prefix(cookie_path) {
        Some(rest) => rest.is_empty() || cookie_path.ends_with('/') || rest.starts_with('/'),
        None => false,
    }
}

fn default_path(url: &Url) -> String {
    let path = url.path();
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(index) => path[..index].to_string(),
    }
}

fn parse_expires(value: &str) -> Option<i64> {
    let value = value.trim();
    if let Ok(at) = chrono::DateTime::parse_from_rfc2822(value) {
        return Some(at.timestamp());
    }
    // Netscape-era servers still send `Wed, 21-Oct-2015 07:28:00 GMT`.
    NaiveDateTime::parse_from_str(value, "%a, %d-%b-%Y %H:%M:%S GMT")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%a, %d-%b-%y %H:%M:%S GMT"))
        .ok()
        .map(|at| at.and_utc().timestamp())
}

/// An in-memory cookie jar that round-trips the Netscape file format.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieJar {
    cookies: Vec<Cookie>,
}

impl CookieJar {
    /// Create an empty jar.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the contents of a Netscape cookie file.
    pub fn parse(text: &str) -> Result<Self, CookieLineError> {
        let mut jar = Self::new();
        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            if line.starts_with('#') && !line.starts_with(HTTP_ONLY_PREFIX) {
                continue;
            }
            jar.insert(Cookie::parse_line(line, index + 1)?);
        }
        Ok(jar)
    }

    /// Serialize to the Netscape file format.
    #[must_use]
    pub fn to_netscape(&self) -> String {
        let mut out = String::from(HEADER);
        out.push('\n');
        for cookie in &self.cookies {
            out.push_str(&cookie.to_line());
            out.push('\n');
        }
        out
    }

    /// Add a cookie, replacing one with the same domain, path and name.
    pub fn insert(&mut self, cookie: Cookie) {
        match self.cookies.iter_mut().find(|c| c.same_slot(&cookie)) {
            Some(existing) => *existing = cookie,
            None => self.cookies.push(cookie),
        }
    }

    fn remove_slot(&mut self, cookie: &Cookie) -> bool {
        let before = self.cookies.len();
        self.cookies.retain(|c| !c.same_slot(cookie));
        before != self.cookies.len()
    }

    /// Number of stored cookies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    /// Whether the jar holds no cookies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Iterate over stored cookies.
    pub fn iter(&self) -> impl Iterator<Item = &Cookie> {
        self.cookies.iter()
    }

    /// Value of the first cookie named `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.value.as_str())
    }

    /// `Cookie` header value for a request to `url`, if any cookie applies.
    #[must_use]
    pub fn header_for(&self, url: &Url) -> Option<String> {
        let now = Utc::now().timestamp();
        let pairs: Vec<String> = self
            .cookies
            .iter()
            .filter(|c| !c.is_expired(now) && c.matches(url))
            .map(|c| format!("{}={}", c.name, c.value))
            .collect();
        (!pairs.is_empty()).then(|| pairs.join("; "))
    }

    /// Merge `Set-Cookie` headers from a response to `url`.
    ///
    /// Returns the number of cookies added, replaced or removed.
    pub fn absorb_set_cookie(&mut self, url: &Url, headers: &HeaderMap) -> usize {
        let now = Utc::now().timestamp();
        let mut changed = 0;
        for raw in headers.get_all(SET_COOKIE).iter().filter_map(|v| v.to_str().ok()) {
            let Some((cookie, expired)) = parse_set_cookie(url, raw, now) else {
                continue;
            };
            if expired {
                if self.remove_slot(&cookie) {
                    changed += 1;
                }
            } else {
                self.insert(cookie);
                changed += 1;
            }
        }
        changed
    }
}

fn parse_set_cookie(url: &Url, raw: &str, now: i64) -> Option<(Cookie, bool)> {
    let mut parts = raw.split(';');
    let (name, value) = parts.next()?.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    let host = url.host_str()?.to_string();

    let mut cookie = Cookie {
        domain: host,
        include_subdomains: false,
        path: default_path(url),
        secure: false,
        expires: None,
        name: name.to_string(),
        value: value.trim().trim_matches('"').to_string(),
        http_only: false,
    };
    let mut max_age: Option<i64> = None;

    for attribute in parts {
        let (key, val) = match attribute.split_once('=') {
            Some((k, v)) => (k.trim(), v.trim()),
            None => (attribute.trim(), ""),
        };
        match key.to_ascii_lowercase().as_str() {
            "domain" if !val.is_empty() => {
                cookie.domain = format!(".{}", val.trim_start_matches('.'));
                cookie.include_subdomains = true;
            }
            "path" if val.starts_with('/') => cookie.path = val.to_string(),
            "expires" => cookie.expires = parse_expires(val).or(cookie.expires),
            "max-age" => max_age = val.parse().ok(),
            "secure" => cookie.secure = true,
            "httponly" => cookie.http_only = true,
            _ => {}
        }
    }

    if let Some(seconds) = max_age {
        cookie.expires = Some(now.saturating_add(seconds));
        return Some((cookie, seconds <= 0));
    }
    let expired = cookie.expires.is_some_and(|at| at <= now);
    Some((cookie, expired))
}
