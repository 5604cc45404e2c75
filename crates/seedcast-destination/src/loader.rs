//! Destination definition loading from TOML files.

use crate::{
    definition::DestinationDefinition,
    error::{DestinationError, Result},
};
use seedcast_core::DestinationId;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Name of the bundled definitions directory.
pub const DEFAULT_DIR_NAME: &str = "destination-definitions";

/// Loader for destination definitions from TOML files.
#[derive(Debug, Clone)]
pub struct DefinitionLoader {
    definitions_dir: PathBuf,
}

impl DefinitionLoader {
    /// Create a loader for the given directory.
    ///
    /// # Errors
    /// Returns error if the directory doesn't exist.
    pub fn new(definitions_dir: impl Into<PathBuf>) -> Result<Self> {
        let definitions_dir = definitions_dir.into();

        if !definitions_dir.is_dir() {
            return Err(DestinationError::DirectoryNotFound {
                path: definitions_dir.display().to_string(),
            });
        }

        Ok(Self { definitions_dir })
    }

    /// Create a loader for `destination-definitions/` in the nearest
    /// enclosing workspace, falling back to the current directory.
    pub fn with_default_dir() -> Result<Self> {
        let mut current_dir = std::env::current_dir()?;

        loop {
            let cargo_toml = current_dir.join("Cargo.toml");
            if let Ok(contents) = std::fs::read_to_string(&cargo_toml) {
                if contents.contains("[workspace]") {
                    return Self::new(current_dir.join(DEFAULT_DIR_NAME));
                }
            }

            match current_dir.parent() {
                Some(parent) => current_dir = parent.to_path_buf(),
                None => break,
            }
        }

        Self::new(DEFAULT_DIR_NAME)
    }

    /// Directory definitions are read from.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.definitions_dir
    }

    /// Load a single definition by ID.
    pub fn load(&self, destination: &DestinationId) -> Result<DestinationDefinition> {
        let filename = format!("{}.toml", destination.as_str());
        let Some(path) = Self::find_file(&self.definitions_dir, &filename)? else {
            return Err(DestinationError::NotFound {
                destination: destination.to_string(),
            });
        };

        let definition = Self::load_from_path(&path)?;
        definition.validate()?;

        debug!(
            destination = %destination,
            name = %definition.name(),
            "loaded destination definition"
        );

        Ok(definition)
    }

    /// Load every definition under the directory.
    ///
    /// Invalid definitions are logged as warnings and skipped.
    pub fn load_all(&self) -> Result<Vec<DestinationDefinition>> {
        let mut definitions = Vec::new();
        Self::walk_and_load_recursive(&self.definitions_dir, &mut definitions)?;

        info!(
            count = definitions.len(),
            dir = %self.definitions_dir.display(),
            "loaded destination definitions"
        );

        Ok(definitions)
    }

    fn walk_and_load_recursive(dir: &Path, definitions: &mut Vec<DestinationDefinition>) -> Result<()> {
        let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<_>>()?;
        entries.sort();

        for path in entries {
            if path.is_dir() {
                Self::walk_and_load_recursive(&path, definitions)?;
                continue;
            }
            if path.extension().and_then(|s| s.to_str()) != Some("toml") {
                continue;
            }

            match Self::load_from_path(&path).and_then(|d| d.validate().map(|()| d)) {
                Ok(definition) => {
                    if definitions.iter().any(|d| d.id() == definition.id()) {
                        warn!(
                            path = %path.display(),
                            destination = %definition.id(),
                            "skipping duplicate destination definition"
                        );
                        continue;
                    }
                    definitions.push(definition);
                }
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "skipping invalid destination definition"
                    );
                }
            }
        }

        Ok(())
    }

    fn find_file(dir: &Path, filename: &str) -> Result<Option<PathBuf>> {
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();

            if path.is_dir() {
                if let Some(found) = Self::find_file(&path, filename)? {
                    return Ok(Some(found));
                }
            } else if path.file_name().and_then(|s| s.to_str()) == Some(filename) {
                return Ok(Some(path));
            }
        }

        Ok(None)
    }

    fn load_from_path(path: &Path) -> Result<DestinationDefinition> {
        let contents = std::fs::read_to_string(path).map_err(|e| DestinationError::LoadError {
            path: path.display().to_string(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| DestinationError::ParseError {
            path: path.display().to_string(),
            source: e,
        })
    }
}
