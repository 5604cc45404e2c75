//! Configuration management for Seedcast.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration.
///
/// This is loaded from `~/.config/seedcast/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// General run settings
    pub general: GeneralConfig,
    /// Timeouts and client settings
    pub network: NetworkConfig,
    /// Per-destination credentials keyed by destination id (`AITHER`, `BLU`, ...)
    pub destinations: HashMap<String, DestinationCredentials>,
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path, falling back to defaults if
    /// the file does not exist.
    pub fn load_from(config_path: &Path) -> ConfigResult<Self> {
        if config_path.exists() {
            tracing::debug!("Loading config from {}", config_path.display());
            let contents = fs::read_to_string(config_path)?;
            let config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `SEEDCAST_BASE_DIR`: Override the working directory for cookies and artifacts
    /// - `SEEDCAST_UNATTENDED`: Run without prompts (true/false)
    /// - `SEEDCAST_DRY_RUN`: Stop before any upload (true/false)
    /// - `SEEDCAST_MAX_CONCURRENT`: Cap on concurrent destination tasks
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;
        config.apply_env();
        Ok(config)
    }

    /// Apply `SEEDCAST_*` environment overrides on top of loaded values.
    pub fn apply_env(&mut self) {
        if let Ok(val) = std::env::var("SEEDCAST_BASE_DIR") {
            if !val.is_empty() {
                tracing::debug!("Override general.base_dir from env: {}", val);
                self.general.base_dir = Some(PathBuf::from(val));
            }
        }

        if let Ok(val) = std::env::var("SEEDCAST_UNATTENDED") {
            if let Ok(unattended) = val.parse() {
                self.general.unattended = unattended;
                tracing::debug!("Override general.unattended from env: {}", unattended);
            }
        }

        if let Ok(val) = std::env::var("SEEDCAST_DRY_RUN") {
            if let Ok(dry_run) = val.parse() {
                self.general.dry_run = dry_run;
                tracing::debug!("Override general.dry_run from env: {}", dry_run);
            }
        }

        if let Ok(val) = std::env::var("SEEDCAST_MAX_CONCURRENT") {
            if let Ok(max) = val.parse() {
                self.network.max_concurrent_destinations = max;
                tracing::debug!("Override network.max_concurrent_destinations from env: {}", max);
            }
        }
    }

    /// Save configuration to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> ConfigResult<()> {
        let config_path = Self::config_path()?;
        let config_dir = config_path
            .parent()
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "config_path".to_string(),
                reason: "no parent directory".to_string(),
            })?;

        fs::create_dir_all(config_dir)?;
        tracing::debug!("Saving config to {}", config_path.display());

        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)?;
        Ok(())
    }

    /// Credentials for a destination, if any are configured.
    #[must_use]
    pub fn credentials(&self, destination: &str) -> Option<&DestinationCredentials> {
        self.destinations.get(destination)
    }

    /// Resolve the working directory holding `cookies/`, `tmp/` and `data/`.
    ///
    /// Uses `general.base_dir` when set, the XDG data directory otherwise.
    pub fn base_dir(&self) -> ConfigResult<PathBuf> {
        match &self.general.base_dir {
            Some(dir) => Ok(dir.clone()),
            None => Self::data_dir(),
        }
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/seedcast/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs =
            ProjectDirs::from("org", "seedcast", "seedcast").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Get the data directory path.
    ///
    /// Uses XDG base directories: `~/.local/share/seedcast`
    pub fn data_dir() -> ConfigResult<PathBuf> {
        let dirs =
            ProjectDirs::from("org", "seedcast", "seedcast").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.data_dir().to_path_buf())
    }
}

/// General run settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct GeneralConfig {
    /// Working directory for cookies, artifacts and cached data
    pub base_dir: Option<PathBuf>,
    /// Directory holding destination definition TOML files
    pub definitions_dir: Option<PathBuf>,
    /// Destinations used when none are given on the command line
    pub default_destinations: Vec<String>,
    /// Run all destinations concurrently without prompting
    pub unattended: bool,
    /// Unattended, but still ask before each upload
    pub unattended_confirm: bool,
    /// Upload even when duplicates were found (unattended only)
    pub upload_dupes: bool,
    /// Stop every destination before authentication and upload
    pub dry_run: bool,
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,
    /// Timeout for a whole request/response exchange in seconds
    pub read_timeout_secs: u64,
    /// Timeout for duplicate searches in seconds
    pub search_timeout_secs: u64,
    /// User agent string
    pub user_agent: String,
    /// Maximum destinations processed at once in unattended runs
    pub max_concurrent_destinations: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
            read_timeout_secs: 30,
            search_timeout_secs: 20,
            user_agent: format!("seedcast/{}", env!("CARGO_PKG_VERSION")),
            max_concurrent_destinations: 8,
        }
    }
}

/// Credentials and per-destination switches.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DestinationCredentials {
    /// API token for API-backed destinations
    pub api_key: Option<String>,
    /// Personal announce URL (contains the passkey)
    pub announce_url: Option<String>,
    /// Login user name for destinations with a login flow
    pub username: Option<String>,
    /// Login password for destinations with a login flow
    pub password: Option<String>,
    /// Upload anonymously where supported
    pub anon: bool,
    /// Groups banned locally in addition to the destination's list
    pub banned_groups_extra: Vec<String>,
    /// Upload regardless of duplicates on this destination
    pub skip_dupe_check: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(!config.general.unattended);
        assert!(!config.general.dry_run);
        assert_eq!(config.network.connect_timeout_secs, 10);
        assert_eq!(config.network.max_concurrent_destinations, 8);
        assert!(config.destinations.is_empty());
    }

    #[test]
    fn test_config_save_load() {
        let tmp = TempDir::new().expect("create temp dir");
        let config_path = tmp.path().join("config.toml");

        let mut config = AppConfig::default();
        config.general.unattended = true;
        config.destinations.insert(
            "AITHER".to_string(),
            DestinationCredentials {
                api_key: Some("abc123".to_string()),
                ..DestinationCredentials::default()
            },
        );

        let contents = toml::to_string_pretty(&config).expect("serialize config");
        fs::write(&config_path, contents).expect("write config file");

        let loaded = AppConfig::load_from(&config_path).expect("load config");
        assert!(loaded.general.unattended);
        assert_eq!(
            loaded
                .credentials("AITHER")
                .and_then(|c| c.api_key.as_deref()),
            Some("abc123")
        );
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let tmp = TempDir::new().expect("create temp dir");
        let loaded =
            AppConfig::load_from(&tmp.path().join("absent.toml")).expect("defaults for missing file");
        assert!(!loaded.general.unattended);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[general]
unattended = true
base_dir = "/srv/seedcast"

[destinations.BLU]
api_key = "k"
banned_groups_extra = ["EVO"]
"#;

        let config: AppConfig = toml::from_str(toml_str).expect("parse partial config");
        assert!(config.general.unattended);
        assert_eq!(config.base_dir().expect("base dir"), PathBuf::from("/srv/seedcast"));
        let blu = config.credentials("BLU").expect("BLU credentials");
        assert_eq!(blu.banned_groups_extra, vec!["EVO".to_string()]);
        assert!(!blu.anon);
        // These should be defaults
        assert_eq!(config.network.read_timeout_secs, 30);
    }

    #[test]
    fn test_env_overrides() {
        std::env::set_var("SEEDCAST_DRY_RUN", "true");
        std::env::set_var("SEEDCAST_MAX_CONCURRENT", "2");

        let mut config = AppConfig::default();
        config.apply_env();
        assert!(config.general.dry_run);
        assert_eq!(config.network.max_concurrent_destinations, 2);

        std::env::remove_var("SEEDCAST_DRY_RUN");
        std::env::remove_var("SEEDCAST_MAX_CONCURRENT");
    }
}
