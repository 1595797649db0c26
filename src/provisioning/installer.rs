//! Installation orchestrator

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::baseline::{BaselineStore, RetentionBaseline};
use super::executor::{self, Applied};
use super::plan::{ProvisioningPlan, ResourceTally};
use super::snapshot::StoreSnapshot;
use super::validated_targets;
use crate::error::{
    PersistError, ProvisionError, ProvisionFailure, ProvisionResult, ProvisionStep,
};
use crate::store::DocumentStore;
use crate::taxonomy::{TaxonomyRegistry, TaxonomyTree};

#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    /// Reinstall entity types whose baseline already matches the tree version
    pub force: bool,
    /// Plan only, write nothing
    pub dry_run: bool,
    /// `None` means every entity type in the registry
    pub entity_types: Option<Vec<String>>,
}

impl InstallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
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
pub struct InstallResult {
    pub country: String,
    /// Entity types processed by this call
    pub entity_types: Vec<String>,
    pub installed: ResourceTally,
    pub skipped: ResourceTally,
    /// Baseline matched the tree version; not processed without `force`
    pub already_installed: Vec<String>,
    pub dry_run: bool,
}

pub struct InstallationOrchestrator {
    registry: Arc<TaxonomyRegistry>,
    store: Arc<dyn DocumentStore>,
    baselines: Arc<dyn BaselineStore>,
}

impl InstallationOrchestrator {
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

    fn fail(&self, step: ProvisionStep, failure: ProvisionFailure) -> ProvisionError {
        ProvisionError::new(self.registry.country(), step, failure)
    }

    /// Split targets into those to process and those already at this version
    async fn partition_installed(
        &self,
        targets: Vec<Arc<TaxonomyTree>>,
    ) -> ProvisionResult<(Vec<Arc<TaxonomyTree>>, Vec<String>)> {
        let mut pending = Vec::new();
        let mut already_installed = Vec::new();

        for tree in targets {
            let baseline = self
                .baselines
                .load(tree.entity_type(), tree.country_code())
                .await
                .map_err(|e| {
                    self.fail(ProvisionStep::Baseline, e.into())
                        .for_entity(tree.entity_type())
                })?;

            match baseline {
                Some(b) if b.version == tree.version() => {
                    info!(
                        "{} v{} already installed, skipping (use force to reinstall)",
                        tree.entity_type(),
                        b.version
                    );
                    already_installed.push(tree.entity_type().to_string());
                }
                _ => pending.push(tree),
            }
        }
        Ok((pending, already_installed))
    }

    /// Record a baseline per tree; on failure the whole call is undone,
    /// including baselines already written by this call
    pub(crate) async fn record_baselines(
        store: &dyn DocumentStore,
        baselines: &dyn BaselineStore,
        trees: &[Arc<TaxonomyTree>],
        applied: Applied,
        country: &str,
    ) -> ProvisionResult<Applied> {
        let fail = |entity_type: &str, e: PersistError, rolled_back: usize| {
            ProvisionError::new(country, ProvisionStep::Baseline, e.into())
                .for_entity(entity_type)
                .with_rolled_back(rolled_back)
        };

        let mut pending = Vec::with_capacity(trees.len());
        for tree in trees {
            let staged = match RetentionBaseline::capture(tree) {
                Ok(baseline) => baselines
                    .load(tree.entity_type(), tree.country_code())
                    .await
                    .map(|previous| (baseline, previous)),
                Err(e) => Err(e),
            };
            match staged {
                Ok(entry) => pending.push(entry),
                Err(e) => {
                    warn!("Failed to stage retention baseline for {}: {}", tree.entity_type(), e);
                    let rolled_back = applied.rollback(store).await;
                    return Err(fail(tree.entity_type(), e, rolled_back));
                }
            }
        }

        let mut written: Vec<(String, String, Option<RetentionBaseline>)> = Vec::new();
        for (baseline, previous) in pending {
            let (entity_type, baseline_country) =
                (baseline.entity_type.clone(), baseline.country.clone());
            if let Err(e) = baselines.save(baseline).await {
                warn!("Failed to record retention baseline for {}: {}", entity_type, e);
                restore_baselines(baselines, written).await;
                let rolled_back = applied.rollback(store).await;
                return Err(fail(&entity_type, e, rolled_back));
            }
            written.push((entity_type, baseline_country, previous));
        }
        Ok(applied)
    }

    pub async fn install(&self, options: InstallOptions) -> ProvisionResult<InstallResult> {
        let country = self.registry.country().to_string();
        let targets = validated_targets(&self.registry, options.entity_types.as_deref())?;

        let (targets, already_installed) = if options.force {
            (targets, Vec::new())
        } else {
            self.partition_installed(targets).await?
        };
        let entity_types: Vec<String> =
            targets.iter().map(|t| t.entity_type().to_string()).collect();

        let snapshot = StoreSnapshot::capture(self.store.as_ref())
            .await
            .map_err(|e| self.fail(ProvisionStep::Snapshot, e.into()))?;
        let plan = ProvisioningPlan::build(&targets, &snapshot);
        debug!("Install plan has {} entries", plan.entries().len());

        if options.dry_run {
            return Ok(InstallResult {
                country,
                entity_types,
                installed: plan.to_create(),
                skipped: plan.to_skip(),
                already_installed,
                dry_run: true,
            });
        }

        let applied = executor::apply(self.store.as_ref(), &plan, &snapshot, &country).await?;
        let applied = Self::record_baselines(
            self.store.as_ref(),
            self.baselines.as_ref(),
            &targets,
            applied,
            &country,
        )
        .await?;

        info!(
            "Installed {} resources ({} skipped) for {:?} in {}",
            applied.installed.total(),
            applied.skipped.total(),
            entity_types,
            country
        );

        Ok(InstallResult {
            country,
            entity_types,
            installed: applied.installed,
            skipped: applied.skipped,
            already_installed,
            dry_run: false,
        })
    }
}

/// Put back whatever each written key held before; newest first
async fn restore_baselines(
    baselines: &dyn BaselineStore,
    written: Vec<(String, String, Option<RetentionBaseline>)>,
) {
    for (entity_type, country, previous) in written.into_iter().rev() {
        let restored = match previous {
            Some(baseline) => baselines.save(baseline).await,
            None => baselines.remove(&entity_type, &country).await,
        };
        if let Err(e) = restored {
            warn!("Failed to restore retention baseline for {}: {}", entity_type, e);
        }
    }
}
