//! Provisioning plan
//!
//! Decides, for every resource each target tree needs, whether it must be
//! created or already exists. Install, dry-run and change detection all use
//! the same plan, so they agree on what "new" means.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;

use super::snapshot::StoreSnapshot;
use super::{custom_field_name, needs_custom_field, storage_path_for, tag_color};
use crate::store::ResourceKind;
use crate::taxonomy::TaxonomyTree;

/// Resource names per category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResourceTally {
    pub tags: Vec<String>,
    pub document_types: Vec<String>,
    pub storage_paths: Vec<String>,
    pub custom_fields: Vec<String>,
}

impl ResourceTally {
    pub fn push(&mut self, kind: ResourceKind, name: impl Into<String>) {
        match kind {
            ResourceKind::Tag => self.tags.push(name.into()),
            ResourceKind::DocumentType => self.document_types.push(name.into()),
            ResourceKind::StoragePath => self.storage_paths.push(name.into()),
            ResourceKind::CustomField => self.custom_fields.push(name.into()),
            ResourceKind::Document => {}
        }
    }

    pub fn tag_count(&self) -> usize {
        self.tags.len()
    }

    pub fn document_type_count(&self) -> usize {
        self.document_types.len()
    }

    pub fn storage_path_count(&self) -> usize {
        self.storage_paths.len()
    }

    pub fn custom_field_count(&self) -> usize {
        self.custom_fields.len()
    }

    pub fn total(&self) -> usize {
        self.tag_count()
            + self.document_type_count()
            + self.storage_path_count()
            + self.custom_field_count()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanAction {
    Create { color: Option<String> },
    /// Exists in the store, or an earlier entry of this plan creates it
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanEntry {
    pub entity_type: String,
    pub kind: ResourceKind,
    pub name: String,
    pub action: PlanAction,
}

impl PlanEntry {
    pub fn is_create(&self) -> bool {
        matches!(self.action, PlanAction::Create { .. })
    }
}

/// Ordered per entity type: tags, document types, storage path, custom field
#[derive(Debug, Clone, Default)]
pub struct ProvisioningPlan {
    entries: Vec<PlanEntry>,
}

/// Snapshot plus everything planned earlier in this call
struct Running<'s> {
    snapshot: &'s StoreSnapshot,
    planned: HashSet<(ResourceKind, String)>,
}

impl Running<'_> {
    /// Record `name`; true when it already exists or is already planned
    fn seen(&mut self, kind: ResourceKind, name: &str) -> bool {
        let fresh = self.planned.insert((kind, name.to_lowercase()));
        self.snapshot.contains(kind, name) || !fresh
    }
}

impl ProvisioningPlan {
    pub fn build(trees: &[Arc<TaxonomyTree>], snapshot: &StoreSnapshot) -> Self {
        let mut running = Running {
            snapshot,
            planned: HashSet::new(),
        };
        let mut entries = Vec::new();
        let mut tags_created = 0usize;

        for tree in trees {
            let entity_type = tree.entity_type();
            // Returns whether the entry is a create
            let mut add = |kind: ResourceKind, name: String, color: Option<String>| {
                let create = !running.seen(kind, &name);
                let action = if create {
                    PlanAction::Create { color }
                } else {
                    PlanAction::Skip
                };
                entries.push(PlanEntry {
                    entity_type: entity_type.to_string(),
                    kind,
                    name,
                    action,
                });
                create
            };

            // Each function's tag, then its activities and document types
            for (function, members) in tree.all_tag_categories() {
                for name in std::iter::once(function).chain(members) {
                    let color = tag_color(tags_created).to_string();
                    if add(ResourceKind::Tag, name, Some(color)) {
                        tags_created += 1;
                    }
                }
            }

            for name in tree.all_document_types() {
                add(ResourceKind::DocumentType, name, None);
            }

            add(ResourceKind::StoragePath, storage_path_for(entity_type), None);

            if needs_custom_field(entity_type) {
                add(ResourceKind::CustomField, custom_field_name(entity_type), None);
            }
        }

        Self { entries }
    }

    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    pub fn creates(&self) -> impl Iterator<Item = &PlanEntry> {
        self.entries.iter().filter(|e| e.is_create())
    }

    pub fn has_creates(&self) -> bool {
        self.creates().next().is_some()
    }

    /// Names this plan would create
    pub fn to_create(&self) -> ResourceTally {
        let mut tally = ResourceTally::default();
        for entry in self.creates() {
            tally.push(entry.kind, entry.name.clone());
        }
        tally
    }

    /// Names this plan skips
    pub fn to_skip(&self) -> ResourceTally {
        let mut tally = ResourceTally::default();
        for entry in self.entries.iter().filter(|e| !e.is_create()) {
            tally.push(entry.kind, entry.name.clone());
        }
        tally
    }
}
