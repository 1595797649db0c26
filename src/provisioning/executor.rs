//! Applies a provisioning plan against the store

use tracing::debug;

use super::journal::{Compensation, CompensationJournal};
use super::plan::{PlanAction, PlanEntry, ProvisioningPlan, ResourceTally};
use super::snapshot::StoreSnapshot;
use crate::error::{
    ProvisionError, ProvisionFailure, ProvisionResult, ProvisionStep, StoreError, StoreResult,
};
use crate::store::{CustomFieldType, DocumentStore, ResourceId, ResourceKind};

/// Outcome of a fully applied plan. Holds the journal so a later step (the
/// baseline write) can still undo everything.
pub(crate) struct Applied {
    pub installed: ResourceTally,
    pub skipped: ResourceTally,
    journal: CompensationJournal,
}

impl Applied {
    pub async fn rollback(self, store: &dyn DocumentStore) -> usize {
        self.journal.rollback(store).await
    }

    #[cfg(test)]
    pub fn journal(&self) -> &CompensationJournal {
        &self.journal
    }
}

async fn create(store: &dyn DocumentStore, entry: &PlanEntry) -> StoreResult<ResourceId> {
    let color = match &entry.action {
        PlanAction::Create { color } => color.as_deref(),
        PlanAction::Skip => None,
    };
    let id = match entry.kind {
        ResourceKind::Tag => store.get_or_create_tag(&entry.name, color).await?.id,
        ResourceKind::DocumentType => store.get_or_create_document_type(&entry.name).await?.id,
        ResourceKind::StoragePath => store.get_or_create_storage_path(&entry.name).await?.id,
        ResourceKind::CustomField => {
            store
                .create_custom_field(&entry.name, CustomFieldType::String)
                .await?
                .id
        }
        ResourceKind::Document => {
            return Err(StoreError::InvalidResponse(
                "documents are never provisioned".to_string(),
            ))
        }
    };
    Ok(id)
}

/// Create every planned resource in order. On the first failure the journal
/// is replayed and the post-rollback error is returned.
pub(crate) async fn apply(
    store: &dyn DocumentStore,
    plan: &ProvisioningPlan,
    snapshot: &StoreSnapshot,
    country: &str,
) -> ProvisionResult<Applied> {
    let mut journal = CompensationJournal::new();
    let mut installed = ResourceTally::default();
    let mut skipped = ResourceTally::default();

    for entry in plan.entries() {
        if !entry.is_create() {
            debug!("Skipping existing {} '{}'", entry.kind, entry.name);
            skipped.push(entry.kind, entry.name.clone());
            continue;
        }

        match create(store, entry).await {
            // get-or-create handed back something that predates this call
            Ok(id) if snapshot.owns_id(entry.kind, id) => {
                debug!("{} '{}' already existed as {}", entry.kind, entry.name, id);
                skipped.push(entry.kind, entry.name.clone());
            }
            Ok(id) => {
                debug!("Created {} '{}' ({}) for {}", entry.kind, entry.name, id, entry.entity_type);
                if let Some(compensation) = Compensation::for_created(entry.kind, id) {
                    journal.push(compensation);
                }
                installed.push(entry.kind, entry.name.clone());
            }
            Err(e) => {
                let rolled_back = journal.rollback(store).await;
                return Err(ProvisionError::new(
                    country,
                    ProvisionStep::for_kind(entry.kind),
                    ProvisionFailure::Store(e),
                )
                .for_entity(entry.entity_type.clone())
                .with_rolled_back(rolled_back));
            }
        }
    }

    Ok(Applied {
        installed,
        skipped,
        journal,
    })
}
