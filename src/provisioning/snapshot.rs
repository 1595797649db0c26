//! Upfront view of existing store resources

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::error::StoreResult;
use crate::store::{DocumentStore, ResourceId, ResourceKind};

/// Lowercase name → id for one resource kind, plus every id seen
#[derive(Debug, Clone, Default)]
struct NameSet {
    by_name: HashMap<String, ResourceId>,
    ids: HashSet<ResourceId>,
}

impl NameSet {
    fn from_pairs<'a>(pairs: impl Iterator<Item = (&'a str, ResourceId)>) -> Self {
        let mut set = Self::default();
        for (name, id) in pairs {
            set.by_name.entry(name.to_lowercase()).or_insert(id);
            set.ids.insert(id);
        }
        set
    }

    fn id_of(&self, name: &str) -> Option<ResourceId> {
        self.by_name.get(&name.to_lowercase()).copied()
    }

    fn has_id(&self, id: ResourceId) -> bool {
        self.ids.contains(&id)
    }
}

/// Resources that existed before the current call, fetched exactly once
#[derive(Debug, Clone, Default)]
pub struct StoreSnapshot {
    tags: NameSet,
    document_types: NameSet,
    storage_paths: NameSet,
    custom_fields: NameSet,
}

impl StoreSnapshot {
    pub async fn capture(store: &dyn DocumentStore) -> StoreResult<Self> {
        let tags = store.list_tags().await?;
        let document_types = store.list_document_types().await?;
        let storage_paths = store.list_storage_paths().await?;
        let custom_fields = store.list_custom_fields().await?;

        debug!(
            "Snapshot: {} tags, {} document types, {} storage paths, {} custom fields",
            tags.len(),
            document_types.len(),
            storage_paths.len(),
            custom_fields.len()
        );

        Ok(Self {
            tags: NameSet::from_pairs(tags.iter().map(|t| (t.name.as_str(), t.id))),
            document_types: NameSet::from_pairs(
                document_types.iter().map(|d| (d.name.as_str(), d.id)),
            ),
            storage_paths: NameSet::from_pairs(
                storage_paths.iter().map(|s| (s.name.as_str(), s.id)),
            ),
            custom_fields: NameSet::from_pairs(
                custom_fields.iter().map(|c| (c.name.as_str(), c.id)),
            ),
        })
    }

    fn set(&self, kind: ResourceKind) -> Option<&NameSet> {
        match kind {
            ResourceKind::Tag => Some(&self.tags),
            ResourceKind::DocumentType => Some(&self.document_types),
            ResourceKind::StoragePath => Some(&self.storage_paths),
            ResourceKind::CustomField => Some(&self.custom_fields),
            ResourceKind::Document => None,
        }
    }

    /// Id of an existing resource with this name, ignoring case
    pub fn existing(&self, kind: ResourceKind, name: &str) -> Option<ResourceId> {
        self.set(kind)?.id_of(name)
    }

    pub fn contains(&self, kind: ResourceKind, name: &str) -> bool {
        self.existing(kind, name).is_some()
    }

    /// The id predates this call
    pub fn owns_id(&self, kind: ResourceKind, id: ResourceId) -> bool {
        self.set(kind).is_some_and(|set| set.has_id(id))
    }

    pub fn len(&self, kind: ResourceKind) -> usize {
        self.set(kind).map_or(0, |set| set.by_name.len())
    }
}
