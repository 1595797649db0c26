//! Taxonomy Registry
//!
//! Loads taxonomy definition files (YAML or JSON) for one country and keeps
//! one immutable tree per entity type. The registry is built once by its
//! owning session and shared read-only afterwards.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use records_taxonomy_types::TaxonomyDefinition;

use super::tree::TaxonomyTree;
use crate::config::normalize_country;

#[derive(Debug, Clone, Default)]
pub struct TaxonomyRegistry {
    country: String,
    /// Lowercased entity type → tree
    trees: BTreeMap<String, Arc<TaxonomyTree>>,
}

impl TaxonomyRegistry {
    /// Create an empty registry for `country`
    pub fn new(country: &str) -> Self {
        Self {
            country: normalize_country(country),
            trees: BTreeMap::new(),
        }
    }

    /// Build from already-parsed definitions; other countries are ignored
    pub fn from_definitions(
        definitions: impl IntoIterator<Item = TaxonomyDefinition>,
        country: &str,
    ) -> Self {
        let mut registry = Self::new(country);
        for definition in definitions {
            registry.register(definition);
        }
        registry
    }

    /// Load every definition file in `dir` that targets `country`
    pub fn load_from_dir(dir: impl AsRef<Path>, country: &str) -> Result<Self> {
        let dir = dir.as_ref();
        let mut registry = Self::new(country);

        if !dir.exists() {
            warn!("Taxonomy directory does not exist: {:?}", dir);
            return Ok(registry);
        }

        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read taxonomy directory: {:?}", dir))?
        {
            let path = entry?.path();
            if path
                .extension()
                .is_some_and(|ext| ext == "yaml" || ext == "yml" || ext == "json")
            {
                paths.push(path);
            }
        }
        paths.sort();

        for path in paths {
            registry.load_file(&path)?;
        }

        info!(
            "Loaded {} taxonomies for country {} from {:?}",
            registry.trees.len(),
            registry.country,
            dir
        );

        Ok(registry)
    }

    /// Load one definition file. Returns whether it was registered.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<bool> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read taxonomy file: {:?}", path))?;

        let definition: TaxonomyDefinition = if path.extension().is_some_and(|ext| ext == "json")
        {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse taxonomy file: {:?}", path))?
        } else {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse taxonomy file: {:?}", path))?
        };

        debug!(
            "Parsed taxonomy {} ({}) from {:?}",
            definition.entity_type, definition.country, path
        );
        Ok(self.register(definition))
    }

    /// Add a definition if it targets this registry's country
    pub fn register(&mut self, definition: TaxonomyDefinition) -> bool {
        if normalize_country(&definition.country) != self.country {
            debug!(
                "Skipping taxonomy {} for country {} (registry is {})",
                definition.entity_type, definition.country, self.country
            );
            return false;
        }

        let key = definition.entity_type.trim().to_lowercase();
        let tree = Arc::new(TaxonomyTree::from_definition(definition));
        if self.trees.insert(key, tree).is_some() {
            warn!("Duplicate taxonomy definition replaced an earlier one");
        }
        true
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    /// Tree for `entity_type` in `country`; `None` when either does not match
    pub fn load(&self, entity_type: &str, country: &str) -> Option<Arc<TaxonomyTree>> {
        if normalize_country(country) != self.country {
            return None;
        }
        self.get(entity_type)
    }

    pub fn get(&self, entity_type: &str) -> Option<Arc<TaxonomyTree>> {
        self.trees.get(&entity_type.trim().to_lowercase()).cloned()
    }

    /// Entity type names as spelled in their definitions
    pub fn entity_types(&self) -> Vec<String> {
        self.trees
            .values()
            .map(|t| t.entity_type().to_string())
            .collect()
    }

    pub fn trees(&self) -> impl Iterator<Item = &Arc<TaxonomyTree>> {
        self.trees.values()
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }
}
