//! Update synchronizer
//!
//! Diffs the loaded trees against the live store and the recorded retention
//! baselines, then applies only what is new. Retention changes halt the
//! update for manual review unless auto-approved.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use super::baseline::{BaselineStore, RetentionChange};
use super::executor;
use super::installer::InstallationOrchestrator;
use super::plan::{ProvisioningPlan, ResourceTally};
use super::snapshot::StoreSnapshot;
use super::validated_targets;
use crate::error::{ProvisionError, ProvisionResult, ProvisionStep};
use crate::store::DocumentStore;
use crate::taxonomy::{TaxonomyRegistry, TaxonomyTree};

#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
    pub dry_run: bool,
    /// Apply even when retention rules changed since the last baseline
    pub auto_approve: bool,
    /// `None` means every entity type in the registry
    pub entity_types: Option<Vec<String>>,
}

impl UpdateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_auto_approve(mut self, auto_approve: bool) -> Self {
        self.auto_approve = auto_approve;
        self
    }

    pub fn with_entity_types<I, S>(mut self, entity_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entity_types = Some(entity_types.into_iter().map(Into::into).collect());
        self
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxonomyDiff {
    pub entity_types: Vec<String>,
    pub new_tags: Vec<String>,
    pub new_document_types: Vec<String>,
    pub new_storage_paths: Vec<String>,
    pub new_custom_fields: Vec<String>,
    pub retention_changes: Vec<RetentionChange>,
    pub has_changes: bool,
    #[serde(skip)]
    targets: Vec<Arc<TaxonomyTree>>,
    #[serde(skip)]
    plan: ProvisioningPlan,
    #[serde(skip)]
    snapshot: StoreSnapshot,
}

impl TaxonomyDiff {
    pub fn has_new_resources(&self) -> bool {
        self.plan.has_creates()
    }

    pub fn new_resources(&self) -> ResourceTally {
        self.plan.to_create()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    pub country: String,
    pub entity_types: Vec<String>,
    /// Created by this update (or that would be, on a dry run)
    pub installed: ResourceTally,
    pub retention_changes: Vec<RetentionChange>,
    /// Halted before any write; retention changes need approval
    pub requires_manual_review: bool,
    pub dry_run: bool,
}

pub struct UpdateSynchronizer {
    registry: Arc<TaxonomyRegistry>,
    store: Arc<dyn DocumentStore>,
    baselines: Arc<dyn BaselineStore>,
}

impl UpdateSynchronizer {
    pub fn new(
        registry: Arc<TaxonomyRegistry>,
        store: Arc<dyn DocumentStore>,
        baselines: Arc<dyn BaselineStore>,
    ) -> Self {
        Self {
            registry,
            store,
            baselines,
        }
    }

    /// Read-only: what `update` would do
    pub async fn detect_changes(&self, options: &UpdateOptions) -> ProvisionResult<TaxonomyDiff> {
        let country = self.registry.country();
        let targets = validated_targets(&self.registry, options.entity_types.as_deref())?;

        let snapshot = StoreSnapshot::capture(self.store.as_ref())
            .await
            .map_err(|e| ProvisionError::new(country, ProvisionStep::Snapshot, e.into()))?;
        let plan = ProvisioningPlan::build(&targets, &snapshot);

        let mut retention_changes = Vec::new();
        for tree in &targets {
            let baseline = self
                .baselines
                .load(tree.entity_type(), tree.country_code())
                .await
                .map_err(|e| {
                    ProvisionError::new(country, ProvisionStep::Baseline, e.into())
                        .for_entity(tree.entity_type())
                })?;
            // No baseline yet: the first install establishes it
            if let Some(baseline) = baseline {
                let changes = baseline.changes_against(tree).map_err(|e| {
                    ProvisionError::new(country, ProvisionStep::Baseline, e.into())
                        .for_entity(tree.entity_type())
                })?;
                retention_changes.extend(changes);
            }
        }

        let new = plan.to_create();
        let has_changes = !new.is_empty() || !retention_changes.is_empty();

        Ok(TaxonomyDiff {
            entity_types: targets.iter().map(|t| t.entity_type().to_string()).collect(),
            new_tags: new.tags,
            new_document_types: new.document_types,
            new_storage_paths: new.storage_paths,
            new_custom_fields: new.custom_fields,
            retention_changes,
            has_changes,
            targets,
            plan,
            snapshot,
        })
    }

    pub async fn update(&self, options: UpdateOptions) -> ProvisionResult<UpdateResult> {
        let country = self.registry.country().to_string();
        let diff = self.detect_changes(&options).await?;

        let mut result = UpdateResult {
            country: country.clone(),
            entity_types: diff.entity_types.clone(),
            installed: ResourceTally::default(),
            retention_changes: diff.retention_changes.clone(),
            requires_manual_review: false,
            dry_run: options.dry_run,
        };

        if !diff.has_changes {
            info!("Taxonomy is up to date for {:?}", diff.entity_types);
            return Ok(result);
        }

        if !diff.retention_changes.is_empty() && !options.auto_approve {
            info!(
                "{} retention change(s) need review; nothing applied",
                diff.retention_changes.len()
            );
            result.requires_manual_review = true;
            return Ok(result);
        }

        if options.dry_run {
            result.installed = diff.new_resources();
            return Ok(result);
        }

        let applied =
            executor::apply(self.store.as_ref(), &diff.plan, &diff.snapshot, &country).await?;
        let applied = InstallationOrchestrator::record_baselines(
            self.store.as_ref(),
            self.baselines.as_ref(),
            &diff.targets,
            applied,
            &country,
        )
        .await?;

        info!(
            "Update applied {} new resources and {} retention change(s)",
            applied.installed.total(),
            diff.retention_changes.len()
        );
        result.installed = applied.installed;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{sample_definition, trust_definition};
    use crate::provisioning::{InMemoryBaselineStore, InstallOptions, RetentionChangeKind};
    use crate::store::InMemoryDocumentStore;
    use crate::taxonomy::RetentionRule;

    struct Fixture {
        store: Arc<InMemoryDocumentStore>,
        baselines: Arc<InMemoryBaselineStore>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                store: Arc::new(InMemoryDocumentStore::new()),
                baselines: Arc::new(InMemoryBaselineStore::new()),
            }
        }

        fn registry(&self, definitions: Vec<crate::taxonomy::TaxonomyDefinition>) -> Arc<TaxonomyRegistry> {
            Arc::new(TaxonomyRegistry::from_definitions(definitions, "US"))
        }

        fn installer(&self, registry: Arc<TaxonomyRegistry>) -> InstallationOrchestrator {
            InstallationOrchestrator::new(registry, self.store.clone(), self.baselines.clone())
        }

        fn updater(&self, registry: Arc<TaxonomyRegistry>) -> UpdateSynchronizer {
            UpdateSynchronizer::new(registry, self.store.clone(), self.baselines.clone())
        }
    }

    fn household_with_longer_retention() -> crate::taxonomy::TaxonomyDefinition {
        let mut definition = sample_definition();
        definition.version = "2".to_string();
        definition
            .functions
            .get_mut("FinancialManagement")
            .unwrap()
            .services
            .get_mut("Taxation")
            .unwrap()
            .activities
            .get_mut("IncomeTaxReturns")
            .unwrap()
            .retention
            .insert("US".to_string(), RetentionRule::new(10, "IRC 6501"));
        definition
    }

    #[tokio::test]
    async fn test_detect_changes_is_read_only() {
        let fx = Fixture::new();
        let updater = fx.updater(fx.registry(vec![sample_definition()]));

        let diff = updater.detect_changes(&UpdateOptions::new()).await.unwrap();
        assert!(diff.has_changes);
        assert!(diff.new_tags.contains(&"HealthManagement".to_string()));
        assert_eq!(diff.new_storage_paths, vec!["/household"]);
        assert!(diff.retention_changes.is_empty());
        assert_eq!(fx.store.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_update_after_install_is_noop() {
        let fx = Fixture::new();
        let registry = fx.registry(vec![sample_definition()]);
        fx.installer(registry.clone())
            .install(InstallOptions::new())
            .await
            .unwrap();
        let creates = fx.store.create_calls();

        let result = fx.updater(registry).update(UpdateOptions::new()).await.unwrap();
        assert!(!result.requires_manual_review);
        assert!(result.installed.is_empty());
        assert_eq!(fx.store.create_calls(), creates);
    }

    #[tokio::test]
    async fn test_update_adds_only_new_entity_resources() {
        let fx = Fixture::new();
        fx.installer(fx.registry(vec![sample_definition()]))
            .install(InstallOptions::new())
            .await
            .unwrap();

        let registry = fx.registry(vec![sample_definition(), trust_definition()]);
        let result = fx.updater(registry).update(UpdateOptions::new()).await.unwrap();

        assert_eq!(result.installed.storage_paths, vec!["/trust"]);
        assert_eq!(result.installed.custom_fields, vec!["Trust Name"]);
        assert!(!result.installed.document_types.contains(&"Form1040".to_string()));
        assert_eq!(fx.baselines.len().await, 2);
    }

    #[tokio::test]
    async fn test_retention_change_requires_review() {
        let fx = Fixture::new();
        fx.installer(fx.registry(vec![sample_definition()]))
            .install(InstallOptions::new())
            .await
            .unwrap();

        let updater = fx.updater(fx.registry(vec![household_with_longer_retention()]));
        let diff = updater.detect_changes(&UpdateOptions::new()).await.unwrap();
        assert!(diff.has_changes);
        assert!(!diff.has_new_resources());
        assert_eq!(diff.retention_changes.len(), 1);
        assert_eq!(diff.retention_changes[0].kind(), RetentionChangeKind::Changed);

        let halted = updater.update(UpdateOptions::new()).await.unwrap();
        assert!(halted.requires_manual_review);
        let before = fx.baselines.load("household", "US").await.unwrap().unwrap();
        assert_eq!(before.version, "1");

        let approved = updater
            .update(UpdateOptions::new().with_auto_approve(true))
            .await
            .unwrap();
        assert!(!approved.requires_manual_review);
        let after = fx.baselines.load("household", "US").await.unwrap().unwrap();
        assert_eq!(after.version, "2");

        let settled = updater.detect_changes(&UpdateOptions::new()).await.unwrap();
        assert!(!settled.has_changes);
    }

    #[tokio::test]
    async fn test_dry_run_update_writes_nothing() {
        let fx = Fixture::new();
        let result = fx
            .updater(fx.registry(vec![trust_definition()]))
            .update(UpdateOptions::new().with_dry_run(true))
            .await
            .unwrap();
        assert!(result.dry_run);
        assert_eq!(result.installed.custom_fields, vec!["Trust Name"]);
        assert_eq!(fx.store.create_calls(), 0);
        assert!(fx.baselines.is_empty().await);
    }
}
