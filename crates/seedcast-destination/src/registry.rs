//! In-memory destination registry.

use crate::{
    definition::DestinationDefinition,
    destination::{ConfiguredDestination, Destination},
    error::Result,
    loader::DefinitionLoader,
};
use seedcast_core::DestinationId;
use seedcast_matcher::PolicyTable;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

/// Destinations available to a run, looked up by id.
#[derive(Clone, Default)]
pub struct DestinationRegistry {
    destinations: Arc<RwLock<HashMap<DestinationId, Arc<dyn Destination>>>>,
}

impl std::fmt::Debug for DestinationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DestinationRegistry")
            .field("destinations", &self.ids())
            .finish()
    }
}

impl DestinationRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every definition the loader finds.
    pub fn load_from(loader: &DefinitionLoader) -> Result<Self> {
        let registry = Self::new();
        registry.reload(loader)?;
        Ok(registry)
    }

    /// Replace the registry contents with freshly loaded definitions.
    pub fn reload(&self, loader: &DefinitionLoader) -> Result<()> {
        let definitions = loader.load_all()?;

        let mut cache = self
            .destinations
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        cache.clear();

        for definition in definitions {
            let destination: Arc<dyn Destination> = Arc::new(ConfiguredDestination::new(definition));
            cache.insert(destination.id().clone(), destination);
        }

        info!(count = cache.len(), "reloaded destination definitions");
        Ok(())
    }

    /// Add or replace a destination.
    pub fn register(&self, destination: Arc<dyn Destination>) {
        let id = destination.id().clone();
        debug!(destination = %id, "registered destination");
        self.destinations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, destination);
    }

    /// Look up a destination.
    #[must_use]
    pub fn get(&self, id: &DestinationId) -> Option<Arc<dyn Destination>> {
        self.destinations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Whether a destination is registered.
    #[must_use]
    pub fn contains(&self, id: &DestinationId) -> bool {
        self.destinations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }

    /// Registered ids, sorted.
    #[must_use]
    pub fn ids(&self) -> Vec<DestinationId> {
        let mut ids: Vec<DestinationId> = self
            .destinations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        ids
    }

    /// Definitions of every registered destination, sorted by id.
    #[must_use]
    pub fn definitions(&self) -> Vec<DestinationDefinition> {
        let cache = self.destinations.read().unwrap_or_else(PoisonError::into_inner);
        let mut definitions: Vec<DestinationDefinition> =
            cache.values().map(|d| d.definition().clone()).collect();
        definitions.sort_by(|a, b| a.id().as_str().cmp(b.id().as_str()));
        definitions
    }

    /// Built-in duplicate policies with each definition's `[matcher]`
    /// override applied.
    #[must_use]
    pub fn policy_table(&self) -> PolicyTable {
        let mut table = PolicyTable::builtin();
        let cache = self.destinations.read().unwrap_or_else(PoisonError::into_inner);
        for (id, destination) in cache.iter() {
            if let Some(policy) = &destination.definition().matcher {
                table.insert(id, policy.clone());
            }
        }
        table
    }

    /// Number of registered destinations.
    #[must_use]
    pub fn count(&self) -> usize {
        self.destinations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
