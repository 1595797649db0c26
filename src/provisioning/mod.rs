//! Provisioning
//!
//! Pushes taxonomy trees into the external document store as tags, document
//! types, storage paths and custom fields.
//!
//! ```text
//! validate ─► snapshot ─► plan ─► apply ─► record baseline
//!   (no writes)  (once)    (skip-detection)  │
//!                                            └─ failure: replay journal in reverse
//! ```
//!
//! - `snapshot`: one upfront read of existing resources, indexed by lowercase name
//! - `plan`: what each entity type needs, with create/skip decided per resource
//! - `journal`: compensation log replayed LIFO on failure
//! - `executor`: applies a plan against the store
//! - `baseline`: last-provisioned retention rules per entity type
//! - `installer` / `updater`: the two entry points
//!
//! Calls against one store must not run concurrently: skip-detection trusts
//! the snapshot plus what this call has already created.

mod baseline;
mod executor;
mod installer;
mod journal;
mod plan;
mod snapshot;
mod updater;

pub use baseline::{
    BaselineStore, FileBaselineStore, InMemoryBaselineStore, RetentionBaseline, RetentionChange,
    RetentionChangeKind,
};
pub use installer::{InstallOptions, InstallResult, InstallationOrchestrator};
pub use journal::{Compensation, CompensationJournal};
pub use plan::{PlanAction, PlanEntry, ProvisioningPlan, ResourceTally};
pub use snapshot::StoreSnapshot;
pub use updater::{TaxonomyDiff, UpdateOptions, UpdateResult, UpdateSynchronizer};

use std::sync::Arc;

use crate::error::{ProvisionError, ProvisionFailure, ProvisionResult, ProvisionStep};
use crate::navigation::humanize_identifier;
use crate::taxonomy::{check_completeness, TaxonomyRegistry, TaxonomyTree};

/// Tag colours, cycled by the number of tags planned in the current call
pub const TAG_PALETTE: [&str; 6] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b",
];

pub fn tag_color(index: usize) -> &'static str {
    TAG_PALETTE[index % TAG_PALETTE.len()]
}

/// Trust-like and person-like entity types carry a name field
pub fn needs_custom_field(entity_type: &str) -> bool {
    let lower = entity_type.trim().to_lowercase();
    lower.contains("trust") || matches!(lower.as_str(), "individual" | "person" | "personal")
}

/// `"trust"` → `"Trust Name"`, `"family_trust"` → `"Family Trust Name"`
pub fn custom_field_name(entity_type: &str) -> String {
    let title = entity_type
        .split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(humanize_identifier)
        .collect::<Vec<_>>()
        .join(" ");
    format!("{} Name", title)
}

/// One storage path per entity type
pub fn storage_path_for(entity_type: &str) -> String {
    format!("/{}", entity_type.trim().trim_matches('/'))
}

/// Resolve requested entity types (or all of them) to trees, then refuse the
/// whole call if any tree is incomplete. Nothing has been written yet.
pub(crate) fn validated_targets(
    registry: &TaxonomyRegistry,
    requested: Option<&[String]>,
) -> ProvisionResult<Vec<Arc<TaxonomyTree>>> {
    let country = registry.country();

    let targets: Vec<Arc<TaxonomyTree>> = match requested {
        Some(names) => names
            .iter()
            .map(|name| {
                registry.get(name).ok_or_else(|| {
                    ProvisionError::new(
                        country,
                        ProvisionStep::Validate,
                        ProvisionFailure::UnknownEntityType(name.clone()),
                    )
                    .for_entity(name.clone())
                })
            })
            .collect::<ProvisionResult<_>>()?,
        None => registry.trees().cloned().collect(),
    };

    let issues: Vec<_> = targets.iter().flat_map(|t| check_completeness(t)).collect();
    if !issues.is_empty() {
        let first_entity = issues[0].entity_type.clone();
        let single_entity = issues.iter().all(|i| i.entity_type == first_entity);
        let err = ProvisionError::new(
            country,
            ProvisionStep::Validate,
            ProvisionFailure::Incomplete(issues),
        );
        return Err(if single_entity {
            err.for_entity(first_entity)
        } else {
            err
        });
    }

    Ok(targets)
}
