//! Compensation journal
//!
//! Every resource created by an install/update call pushes the action that
//! undoes it. On failure the journal is replayed newest-first. A compensation
//! that itself fails is logged and skipped so the rest still run.

use tracing::{info, warn};

use crate::store::{DocumentStore, ResourceId, ResourceKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compensation {
    DeleteTag(ResourceId),
    DeleteDocumentType(ResourceId),
    DeleteStoragePath(ResourceId),
    DeleteCustomField(ResourceId),
}

impl Compensation {
    /// Undo action for a freshly created resource
    pub fn for_created(kind: ResourceKind, id: ResourceId) -> Option<Self> {
        match kind {
            ResourceKind::Tag => Some(Compensation::DeleteTag(id)),
            ResourceKind::DocumentType => Some(Compensation::DeleteDocumentType(id)),
            ResourceKind::StoragePath => Some(Compensation::DeleteStoragePath(id)),
            ResourceKind::CustomField => Some(Compensation::DeleteCustomField(id)),
            ResourceKind::Document => None,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            Compensation::DeleteTag(_) => ResourceKind::Tag,
            Compensation::DeleteDocumentType(_) => ResourceKind::DocumentType,
            Compensation::DeleteStoragePath(_) => ResourceKind::StoragePath,
            Compensation::DeleteCustomField(_) => ResourceKind::CustomField,
        }
    }

    pub fn id(&self) -> ResourceId {
        match *self {
            Compensation::DeleteTag(id)
            | Compensation::DeleteDocumentType(id)
            | Compensation::DeleteStoragePath(id)
            | Compensation::DeleteCustomField(id) => id,
        }
    }

    async fn run(&self, store: &dyn DocumentStore) -> crate::error::StoreResult<()> {
        match *self {
            Compensation::DeleteTag(id) => store.delete_tag(id).await,
            Compensation::DeleteDocumentType(id) => store.delete_document_type(id).await,
            Compensation::DeleteStoragePath(id) => store.delete_storage_path(id).await,
            Compensation::DeleteCustomField(id) => store.delete_custom_field(id).await,
        }
    }
}

/// Ordered stack of compensations owned by one in-flight call
#[derive(Debug, Default)]
pub struct CompensationJournal {
    entries: Vec<Compensation>,
}

impl CompensationJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, compensation: Compensation) {
        self.entries.push(compensation);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Compensation] {
        &self.entries
    }

    /// Ids created this call for one kind, in creation order
    pub fn created(&self, kind: ResourceKind) -> Vec<ResourceId> {
        self.entries
            .iter()
            .filter(|c| c.kind() == kind)
            .map(Compensation::id)
            .collect()
    }

    /// Replay newest-first. Returns how many compensations succeeded.
    pub async fn rollback(self, store: &dyn DocumentStore) -> usize {
        let mut undone = 0;
        for compensation in self.entries.into_iter().rev() {
            match compensation.run(store).await {
                Ok(()) => {
                    info!(
                        "Rolled back {} {}",
                        compensation.kind(),
                        compensation.id()
                    );
                    undone += 1;
                }
                Err(e) => {
                    warn!(
                        "Rollback of {} {} failed, continuing: {}",
                        compensation.kind(),
                        compensation.id(),
                        e
                    );
                }
            }
        }
        undone
    }
}
