//! Duplicate search backends.

use crate::{
    auth::RequestAuth,
    context::TaskContext,
    definition::{DestinationDefinition, IdMaps, ResultSelectors, SearchMethod},
    error::{DestinationError, Result},
    template::{category_key, release_type_key},
};
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use seedcast_core::{ArtifactKind, CandidateMatch, Category, DestinationId, ReleaseDescriptor};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Search a destination for torrents that could duplicate `release`.
pub async fn search(
    definition: &DestinationDefinition,
    release: &ReleaseDescriptor,
    ctx: &TaskContext,
    auth: &RequestAuth,
) -> Result<Vec<CandidateMatch>> {
    let candidates = match &definition.search {
        SearchMethod::None => {
            debug!(destination = %definition.id(), "destination has no search; skipping duplicate check");
            return Ok(Vec::new());
        }
        SearchMethod::Unit3dApi { url } => {
            let params = unit3d_params(release, &definition.ids);
            let body = fetch(definition.id(), url, &params, ctx, auth).await?;
            keep_body_on_error(definition.id(), ctx, &body, parse_unit3d(definition.id(), &body)).await?
        }
        SearchMethod::Html { url, selectors } => {
            let url = url.replace("{query}", &urlencoding::encode(&search_term(release)));
            let body = fetch(definition.id(), &url, &[], ctx, auth).await?;
            let parsed = ResultParser::new(definition.id(), selectors, &definition.destination.base_url).parse(&body);
            keep_body_on_error(definition.id(), ctx, &body, parsed).await?
        }
    };

    info!(
        destination = %definition.id(),
        count = candidates.len(),
        "search returned candidates"
    );
    Ok(candidates)
}

/// Save the body of a response we could not make sense of and point the
/// error at it.
async fn keep_body_on_error<T>(
    destination: &DestinationId,
    ctx: &TaskContext,
    body: &str,
    parsed: Result<T>,
) -> Result<T> {
    match parsed {
        Err(DestinationError::UpstreamProtocol {
            destination: name,
            reason,
            artifact: None,
        }) => {
            let artifact = match ctx.run.artifacts.save(destination, ArtifactKind::FailedSearch, body).await {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!(destination = %destination, error = %e, "failed to save search response");
                    None
                }
            };
            Err(DestinationError::UpstreamProtocol {
                destination: name,
                reason,
                artifact,
            })
        }
        other => other,
    }
}

async fn fetch(
    destination: &DestinationId,
    url: &str,
    params: &[(String, String)],
    ctx: &TaskContext,
    auth: &RequestAuth,
) -> Result<String> {
    let parsed = Url::parse(url).map_err(|e| DestinationError::Configuration {
        destination: destination.to_string(),
        reason: format!("invalid search url '{url}': {e}"),
    })?;

    let request = ctx
        .run
        .client
        .get(parsed.clone())
        .query(params)
        .timeout(Duration::from_secs(ctx.run.network.search_timeout_secs));
    let response = auth.apply(request, &parsed).send().await?.error_for_status()?;
    Ok(response.text().await?)
}

/// Search term: the title when known, otherwise the release name, plus the
/// season (and episode, unless it is a pack) for TV.
fn search_term(release: &ReleaseDescriptor) -> String {
    let mut term = release.title.clone().unwrap_or_else(|| release.name.clone());
    if release.category == Some(Category::Tv) {
        if let Some(season) = &release.season {
            term.push(' ');
            term.push_str(season);
            if !release.tv_pack {
                if let Some(episode) = &release.episode {
                    term.push_str(episode);
                }
            }
        }
    }
    term
}

fn unit3d_params(release: &ReleaseDescriptor, ids: &IdMaps) -> Vec<(String, String)> {
    let mut params = Vec::new();

    match release.tmdb_id {
        Some(tmdb) => {
            params.push(("tmdbId".to_string(), tmdb.to_string()));
            if release.category == Some(Category::Tv) {
                if let Some(season) = &release.season {
                    let mut name = season.clone();
                    if !release.tv_pack {
                        name.push_str(release.episode.as_deref().unwrap_or_default());
                    }
                    params.push(("name".to_string(), name));
                }
            }
        }
        None => params.push(("name".to_string(), search_term(release))),
    }

    let mapped = [
        ("categories[]", release.category.map(category_key).and_then(|k| ids.category.get(k))),
        (
            "types[]",
            release
                .release_type
                .map(release_type_key)
                .and_then(|k| ids.release_type.get(k)),
        ),
        (
            "resolutions[]",
            release.resolution.as_deref().and_then(|k| ids.resolution.get(k)),
        ),
    ];
    for (key, value) in mapped {
        if let Some(value) = value {
            params.push((key.to_string(), value.clone()));
        }
    }

    params
}

#[derive(Debug, Deserialize)]
struct Unit3dResponse {
    #[serde(default)]
    data: Vec<Unit3dTorrent>,
}

#[derive(Debug, Deserialize)]
struct Unit3dTorrent {
    attributes: Unit3dAttributes,
}

#[derive(Debug, Deserialize)]
struct Unit3dAttributes {
    name: String,
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    files: Vec<Unit3dFile>,
    #[serde(default)]
    trumpable: Option<bool>,
    #[serde(default)]
    details_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Unit3dFile {
    name: String,
}

/// Parse a UNIT3D `api/torrents/filter` response.
pub fn parse_unit3d(destination: &DestinationId, body: &str) -> Result<Vec<CandidateMatch>> {
    let response: Unit3dResponse =
        serde_json::from_str(body).map_err(|e| DestinationError::UpstreamProtocol {
            destination: destination.to_string(),
            reason: format!("search response was not UNIT3D JSON ({e}); the API key may be invalid"),
            artifact: None,
        })?;

    Ok(response
        .data
        .into_iter()
        .map(|torrent| {
            let attributes = torrent.attributes;
            let files: Vec<String> = attributes.files.into_iter().map(|f| f.name).collect();
            CandidateMatch {
                name: attributes.name,
                size: attributes.size,
                link: attributes.details_link,
                file_count: (!files.is_empty()).then_some(files.len()),
                files,
                trumpable: attributes.trumpable.unwrap_or(false),
            }
        })
        .collect())
}

/// Scrapes an HTML search results page.
pub struct ResultParser<'a> {
    destination: &'a DestinationId,
    selectors: &'a ResultSelectors,
    base_url: &'a str,
}

impl<'a> ResultParser<'a> {
    /// Parser for one destination's results page.
    #[must_use]
    pub fn new(destination: &'a DestinationId, selectors: &'a ResultSelectors, base_url: &'a str) -> Self {
        Self {
            destination,
            selectors,
            base_url,
        }
    }

    /// Extract candidates from `html`.
    pub fn parse(&self, html: &str) -> Result<Vec<CandidateMatch>> {
        let document = Html::parse_document(html);

        if let Some(no_results) = &self.selectors.no_results_indicator {
            let selector = self.selector(no_results)?;
            if document.select(&selector).next().is_some() {
                return Ok(Vec::new());
            }
        }

        let item_selector = self.selector(&self.selectors.result_item)?;
        let name_selector = self.selector(&self.selectors.name)?;
        let size_selector = self.selectors.size.as_deref().map(|s| self.selector(s)).transpose()?;
        let link_selector = self.selectors.link.as_deref().map(|s| self.selector(s)).transpose()?;

        let mut candidates = Vec::new();
        for item in document.select(&item_selector) {
            let Some(name) = text_of(&item, &name_selector) else {
                continue;
            };
            let size = size_selector
                .as_ref()
                .and_then(|s| text_of(&item, s))
                .and_then(|text| parse_size(&text));
            let link = link_selector
                .as_ref()
                .and_then(|s| item.select(s).next())
                .and_then(|el| el.value().attr("href"))
                .map(|href| self.absolute(href));

            candidates.push(CandidateMatch {
                name,
                size,
                link,
                ..CandidateMatch::default()
            });
        }

        Ok(candidates)
    }

    fn selector(&self, selector: &str) -> Result<Selector> {
        Selector::parse(selector).map_err(|e| DestinationError::Configuration {
            destination: self.destination.to_string(),
            reason: format!("invalid selector '{selector}': {e}"),
        })
    }

    fn absolute(&self, href: &str) -> String {
        if href.starts_with("http") {
            href.to_string()
        } else {
            format!(
                "{}/{}",
                self.base_url.trim_end_matches('/'),
                href.trim_start_matches('/')
            )
        }
    }
}

fn text_of(element: &ElementRef<'_>, selector: &Selector) -> Option<String> {
    element
        .select(selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty())
}

/// Parse a human-readable size such as `4.37 GiB` or `1,234 MB` into bytes.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn parse_size(text: &str) -> Option<u64> {
    let cleaned = text.replace(',', "");
    let mut parts = cleaned.split_whitespace();
    let number: f64 = parts.next()?.parse().ok()?;
    let multiplier: f64 = match parts.next().map(str::to_ascii_uppercase).as_deref() {
        None | Some("B") => 1.0,
        Some("KB" | "KIB") => 1024.0,
        Some("MB" | "MIB") => 1024.0 * 1024.0,
        Some("GB" | "GIB") => 1024.0 * 1024.0 * 1024.0,
        Some("TB" | "TIB") => 1024.0 * 1024.0 * 1024.0 * 1024.0,
        Some(_) => return None,
    };
    (number >= 0.0).then(|| (number * multiplier).round() as u64)
}
