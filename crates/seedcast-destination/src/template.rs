//! `{placeholder}` substitution for upload form fields.

use crate::{context::UploadPackage, definition::IdMaps};
use regex::Regex;
use seedcast_core::{Category, ReleaseDescriptor, ReleaseType};
use std::collections::BTreeMap;
use std::sync::OnceLock;

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([a-z_]+)\}").expect("valid regex"))
}

/// Serialized name used as the key into [`IdMaps::category`].
#[must_use]
pub fn category_key(category: Category) -> &'static str {
    match category {
        Category::Movie => "MOVIE",
        Category::Tv => "TV",
    }
}

/// Serialized name used as the key into [`IdMaps::release_type`].
#[must_use]
pub fn release_type_key(release_type: ReleaseType) -> &'static str {
    match release_type {
        ReleaseType::Remux => "REMUX",
        ReleaseType::Encode => "ENCODE",
        ReleaseType::WebDl => "WEBDL",
        ReleaseType::WebRip => "WEBRIP",
        ReleaseType::Hdtv => "HDTV",
        ReleaseType::DvdRip => "DVDRIP",
        ReleaseType::Disc => "DISC",
    }
}

/// Values available to field templates.
///
/// Placeholders with no value render as the empty string; unknown
/// placeholders are left untouched.
#[derive(Debug, Clone, Default)]
pub struct TemplateValues {
    values: BTreeMap<&'static str, String>,
}

impl TemplateValues {
    /// Collect values for one upload.
    #[must_use]
    pub fn for_upload(
        release: &ReleaseDescriptor,
        package: &UploadPackage,
        ids: &IdMaps,
        anon: bool,
        api_key: Option<&str>,
        token: Option<&str>,
    ) -> Self {
        let lookup = |map: &BTreeMap<String, String>, key: Option<&str>| {
            key.and_then(|k| map.get(k)).cloned().unwrap_or_default()
        };

        let mut values = BTreeMap::new();
        values.insert("name", release.name.clone());
        values.insert("description", package.description.clone());
        values.insert(
            "category_id",
            lookup(&ids.category, release.category.map(category_key)),
        );
        values.insert(
            "type_id",
            lookup(&ids.release_type, release.release_type.map(release_type_key)),
        );
        values.insert(
            "resolution_id",
            lookup(&ids.resolution, release.resolution.as_deref()),
        );
        values.insert("season", number_of(release.season.as_deref()));
        values.insert("episode", number_of(release.episode.as_deref()));
        values.insert(
            "tag",
            release
                .tag
                .as_deref()
                .map(|tag| tag.trim().trim_start_matches('-').to_string())
                .unwrap_or_default(),
        );
        values.insert("anon", if anon { "1" } else { "0" }.to_string());
        values.insert("token", token.unwrap_or_default().to_string());
        values.insert("api_key", api_key.unwrap_or_default().to_string());
        values.insert("images", package.images.join("\n"));
        values.insert("title", release.title.clone().unwrap_or_default());
        values.insert("year", release.year.map(|y| y.to_string()).unwrap_or_default());
        values.insert("tmdb", release.tmdb_id.map(|id| id.to_string()).unwrap_or_default());
        values.insert(
            "imdb",
            release
                .imdb_id
                .map(|id| format!("{id:07}"))
                .unwrap_or_default(),
        );

        Self { values }
    }

    /// Substitute every known placeholder in `template`.
    #[must_use]
    pub fn render(&self, template: &str) -> String {
        placeholder_regex()
            .replace_all(template, |caps: &regex::Captures<'_>| {
                self.values
                    .get(&caps[1])
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }

    /// Render every field of a form.
    #[must_use]
    pub fn render_fields(&self, fields: &BTreeMap<String, String>) -> Vec<(String, String)> {
        fields
            .iter()
            .map(|(key, template)| (key.clone(), self.render(template)))
            .collect()
    }
}

/// `S01` and `E02` become `1` and `2`; multi-episode tokens keep the first.
fn number_of(token: Option<&str>) -> String {
    token
        .map(|t| {
            t.trim_start_matches(|c: char| c.is_ascii_alphabetic())
                .chars()
                .take_while(char::is_ascii_digit)
                .collect::<String>()
        })
        .and_then(|digits| digits.parse::<u32>().ok())
        .map(|n| n.to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> IdMaps {
        let mut ids = IdMaps::default();
        ids.category.insert("TV".to_string(), "2".to_string());
        ids.release_type.insert("WEBDL".to_string(), "4".to_string());
        ids.resolution.insert("1080p".to_string(), "3".to_string());
        ids
    }

    fn release() -> ReleaseDescriptor {
        ReleaseDescriptor {
            name: "Show S01E02 1080p WEB-DL DDP5.1 H.264-GRP".to_string(),
            category: Some(Category::Tv),
            release_type: Some(ReleaseType::WebDl),
            resolution: Some("1080p".to_string()),
            season: Some("S01".to_string()),
            episode: Some("E02E03".to_string()),
            tag: Some("-GRP".to_string()),
            imdb_id: Some(12345),
            ..ReleaseDescriptor::default()
        }
    }

    #[test]
    fn test_render_mapped_ids_and_numbers() {
        let package = UploadPackage {
            images: vec!["https://img/1.png".to_string(), "https://img/2.png".to_string()],
            ..UploadPackage::default()
        };
        let values = TemplateValues::for_upload(&release(), &package, &ids(), true, None, Some("csrf"));

        assert_eq!(
            values.render("{category_id}/{type_id}/{resolution_id}"),
            "2/4/3"
        );
        assert_eq!(values.render("S{season}E{episode} {tag}"), "S1E2 GRP");
        assert_eq!(values.render("{anon}:{token}:{api_key}"), "1:csrf:");
        assert_eq!(values.render("tt{imdb}"), "tt0012345");
        assert_eq!(values.render("{images}"), "https://img/1.png\nhttps://img/2.png");
    }

    #[test]
    fn test_unknown_placeholders_untouched() {
        let values = TemplateValues::for_upload(
            &ReleaseDescriptor::named("x"),
            &UploadPackage::default(),
            &IdMaps::default(),
            false,
            None,
            None,
        );
        assert_eq!(values.render("{name} {mystery} {}"), "x {mystery} {}");
        assert_eq!(values.render("{category_id}"), "");
    }
}
