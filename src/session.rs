//! Taxonomy Session
//!
//! Owns the registry for one country and wires the components to a
//! document store.
//!
//! ```text
//! TaxonomySession
//! ├── config: TaxonomyConfig (dirs + country)
//! ├── registry: Arc<TaxonomyRegistry> (loaded once in open())
//! ├── baselines: Arc<dyn BaselineStore> (state dir)
//! └── audit: Arc<dyn AuditSink> (audit dir)
//!       │
//!       ├── resolver(entity)  → PathResolver
//!       ├── installer(store)  → InstallationOrchestrator
//!       ├── updater(store)    → UpdateSynchronizer
//!       └── migrator(store)   → MigrationMapper
//! ```

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::config::TaxonomyConfig;
use crate::migration::{AuditSink, FileAuditSink, MigrationMapper};
use crate::navigation::PathResolver;
use crate::provisioning::{
    BaselineStore, FileBaselineStore, InstallationOrchestrator, UpdateSynchronizer,
};
use crate::store::DocumentStore;
use crate::taxonomy::{TaxonomyRegistry, TaxonomyTree};

pub struct TaxonomySession {
    config: TaxonomyConfig,
    registry: Arc<TaxonomyRegistry>,
    baselines: Arc<dyn BaselineStore>,
    audit: Arc<dyn AuditSink>,
}

impl TaxonomySession {
    /// Load every definition for the configured country
    pub fn open(config: TaxonomyConfig) -> Result<Self> {
        let registry = TaxonomyRegistry::load_from_dir(&config.taxonomy_dir, &config.country)?;
        info!(
            "Opened taxonomy session for {} with {} entity type(s)",
            registry.country(),
            registry.len()
        );
        Ok(Self::with_registry(config, registry))
    }

    /// Session over an already-built registry, with file-backed state
    pub fn with_registry(config: TaxonomyConfig, registry: TaxonomyRegistry) -> Self {
        Self {
            baselines: Arc::new(FileBaselineStore::new(&config.state_dir)),
            audit: Arc::new(FileAuditSink::new(config.audit_dir.clone())),
            registry: Arc::new(registry),
            config,
        }
    }

    pub fn with_baselines(mut self, baselines: Arc<dyn BaselineStore>) -> Self {
        self.baselines = baselines;
        self
    }

    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn config(&self) -> &TaxonomyConfig {
        &self.config
    }

    pub fn country(&self) -> &str {
        self.registry.country()
    }

    pub fn registry(&self) -> &Arc<TaxonomyRegistry> {
        &self.registry
    }

    pub fn entity_types(&self) -> Vec<String> {
        self.registry.entity_types()
    }

    pub fn tree(&self, entity_type: &str) -> Option<Arc<TaxonomyTree>> {
        self.registry.get(entity_type)
    }

    pub fn resolver(&self, entity_type: &str) -> Option<PathResolver> {
        self.tree(entity_type).map(PathResolver::new)
    }

    pub fn installer(&self, store: Arc<dyn DocumentStore>) -> InstallationOrchestrator {
        InstallationOrchestrator::new(self.registry.clone(), store, self.baselines.clone())
    }

    pub fn updater(&self, store: Arc<dyn DocumentStore>) -> UpdateSynchronizer {
        UpdateSynchronizer::new(self.registry.clone(), store, self.baselines.clone())
    }

    /// Mapper with no table loaded; call `load_mapping_table` first
    pub fn migrator(&self, store: Arc<dyn DocumentStore>) -> MigrationMapper {
        MigrationMapper::new(store, self.audit.clone(), self.config.mapping_dir.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{sample_definition, trust_definition};
    use crate::provisioning::InstallOptions;
    use crate::store::InMemoryDocumentStore;

    #[test]
    fn test_open_loads_registry_for_country() {
        let dir = tempfile::tempdir().unwrap();
        let taxonomies = dir.path().join("taxonomies");
        std::fs::create_dir_all(&taxonomies).unwrap();
        std::fs::write(
            taxonomies.join("household.json"),
            serde_json::to_string(&sample_definition()).unwrap(),
        )
        .unwrap();

        let session = TaxonomySession::open(TaxonomyConfig::rooted_at(dir.path())).unwrap();
        assert_eq!(session.country(), "US");
        assert_eq!(session.entity_types(), vec!["household"]);
        assert!(session.resolver("Household").is_some());
        assert!(session.resolver("trust").is_none());

        let other = TaxonomySession::open(
            TaxonomyConfig::rooted_at(dir.path()).with_country("ca"),
        )
        .unwrap();
        assert!(other.entity_types().is_empty());
    }

    #[tokio::test]
    async fn test_install_records_baseline_in_state_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = TaxonomyConfig::rooted_at(dir.path());
        let registry =
            TaxonomyRegistry::from_definitions(vec![sample_definition(), trust_definition()], "US");
        let session = TaxonomySession::with_registry(config.clone(), registry);

        let store = Arc::new(InMemoryDocumentStore::new());
        session
            .installer(store.clone())
            .install(InstallOptions::new())
            .await
            .unwrap();

        let baselines = FileBaselineStore::new(&config.state_dir);
        assert!(baselines.path().exists());
        assert!(baselines.load("trust", "US").await.unwrap().is_some());

        let again = session
            .installer(store)
            .install(InstallOptions::new())
            .await
            .unwrap();
        assert_eq!(again.already_installed, vec!["household", "trust"]);
    }
}
