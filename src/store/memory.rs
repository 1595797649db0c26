//! In-process document store
//!
//! Used by the test suites, by dry-run demos, and anywhere a throwaway store
//! is handy. Failures can be injected per resource name (creation), per id
//! (deletion) and per document (update) to exercise rollback paths.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{
    CustomField, CustomFieldType, Document, DocumentStore, DocumentType, DocumentUpdate,
    ResourceId, ResourceKind, StoragePath, Tag,
};
use crate::error::{StoreError, StoreResult};

#[derive(Debug, Default)]
struct State {
    next_id: ResourceId,
    tags: BTreeMap<ResourceId, Tag>,
    document_types: BTreeMap<ResourceId, DocumentType>,
    storage_paths: BTreeMap<ResourceId, StoragePath>,
    custom_fields: BTreeMap<ResourceId, CustomField>,
    documents: BTreeMap<ResourceId, Document>,
}

impl State {
    fn allocate(&mut self) -> ResourceId {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    state: RwLock<State>,
    fail_create: HashSet<String>,
    fail_delete: HashSet<ResourceId>,
    fail_update: HashSet<ResourceId>,
    creates: AtomicUsize,
    deletes: AtomicUsize,
    updates: AtomicUsize,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creating any resource with this name (case-insensitive) fails
    pub fn fail_on_create(mut self, name: &str) -> Self {
        self.fail_create.insert(name.to_lowercase());
        self
    }

    /// Deleting the resource with this id fails
    pub fn fail_on_delete(mut self, id: ResourceId) -> Self {
        self.fail_delete.insert(id);
        self
    }

    /// Updating this document fails
    pub fn fail_on_update(mut self, document_id: ResourceId) -> Self {
        self.fail_update.insert(document_id);
        self
    }

    pub fn with_tag(mut self, name: &str) -> Self {
        let state = self.state.get_mut();
        let id = state.allocate();
        state.tags.insert(
            id,
            Tag {
                id,
                name: name.to_string(),
                color: None,
            },
        );
        self
    }

    pub fn with_document_type(mut self, name: &str) -> Self {
        let state = self.state.get_mut();
        let id = state.allocate();
        state.document_types.insert(
            id,
            DocumentType {
                id,
                name: name.to_string(),
            },
        );
        self
    }

    pub fn with_storage_path(mut self, path: &str) -> Self {
        let state = self.state.get_mut();
        let id = state.allocate();
        state.storage_paths.insert(
            id,
            StoragePath {
                id,
                name: path.to_string(),
                path: path.to_string(),
            },
        );
        self
    }

    pub fn with_custom_field(mut self, name: &str, data_type: CustomFieldType) -> Self {
        let state = self.state.get_mut();
        let id = state.allocate();
        state.custom_fields.insert(
            id,
            CustomField {
                id,
                name: name.to_string(),
                data_type,
            },
        );
        self
    }

    /// Seed a document carrying a legacy flat type
    pub fn with_document(mut self, title: &str, document_type: Option<&str>) -> Self {
        let state = self.state.get_mut();
        let id = state.allocate();
        state.documents.insert(
            id,
            Document {
                id,
                title: title.to_string(),
                document_type: document_type.map(str::to_string),
                tags: Vec::new(),
            },
        );
        self
    }

    /// Add a document after construction, returning its id
    pub async fn insert_document(
        &self,
        title: &str,
        document_type: Option<&str>,
        tags: Vec<ResourceId>,
    ) -> ResourceId {
        let mut state = self.state.write().await;
        let id = state.allocate();
        state.documents.insert(
            id,
            Document {
                id,
                title: title.to_string(),
                document_type: document_type.map(str::to_string),
                tags,
            },
        );
        id
    }

    /// Successful creations since construction
    pub fn create_calls(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    /// Successful deletions since construction
    pub fn delete_calls(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    /// Attempted document updates, failed ones included
    pub fn update_calls(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    /// Names of the tags on a document, in tag-id order
    pub async fn document_tag_names(&self, id: ResourceId) -> Vec<String> {
        let state = self.state.read().await;
        state
            .documents
            .get(&id)
            .map(|doc| {
                doc.tags
                    .iter()
                    .filter_map(|tag_id| state.tags.get(tag_id).map(|t| t.name.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn check_create(&self, kind: ResourceKind, name: &str) -> StoreResult<()> {
        if self.fail_create.contains(&name.to_lowercase()) {
            return Err(StoreError::CreateFailed {
                kind,
                name: name.to_string(),
                message: "injected failure".to_string(),
            });
        }
        self.creates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn check_delete(&self, kind: ResourceKind, id: ResourceId) -> StoreResult<()> {
        if self.fail_delete.contains(&id) {
            return Err(StoreError::DeleteFailed {
                kind,
                id,
                message: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    fn deleted(&self, kind: ResourceKind, id: ResourceId, found: bool) -> StoreResult<()> {
        if !found {
            return Err(StoreError::NotFound { kind, id });
        }
        self.deletes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn find_by_name<'a, T>(
    items: &'a BTreeMap<ResourceId, T>,
    name: &str,
    name_of: impl Fn(&T) -> &str,
) -> Option<&'a T> {
    let wanted = name.to_lowercase();
    items.values().find(|item| name_of(item).to_lowercase() == wanted)
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get_or_create_tag(&self, name: &str, color: Option<&str>) -> StoreResult<Tag> {
        let mut state = self.state.write().await;
        if let Some(tag) = find_by_name(&state.tags, name, |t| &t.name) {
            return Ok(tag.clone());
        }

        self.check_create(ResourceKind::Tag, name)?;
        let id = state.allocate();
        let tag = Tag {
            id,
            name: name.to_string(),
            color: color.map(str::to_string),
        };
        state.tags.insert(id, tag.clone());
        Ok(tag)
    }

    async fn get_or_create_document_type(&self, name: &str) -> StoreResult<DocumentType> {
        let mut state = self.state.write().await;
        if let Some(dt) = find_by_name(&state.document_types, name, |d| &d.name) {
            return Ok(dt.clone());
        }

        self.check_create(ResourceKind::DocumentType, name)?;
        let id = state.allocate();
        let dt = DocumentType {
            id,
            name: name.to_string(),
        };
        state.document_types.insert(id, dt.clone());
        Ok(dt)
    }

    async fn get_or_create_storage_path(&self, path: &str) -> StoreResult<StoragePath> {
        let mut state = self.state.write().await;
        if let Some(sp) = find_by_name(&state.storage_paths, path, |s| &s.name) {
            return Ok(sp.clone());
        }

        self.check_create(ResourceKind::StoragePath, path)?;
        let id = state.allocate();
        let sp = StoragePath {
            id,
            name: path.to_string(),
            path: path.to_string(),
        };
        state.storage_paths.insert(id, sp.clone());
        Ok(sp)
    }

    async fn create_custom_field(
        &self,
        name: &str,
        data_type: CustomFieldType,
    ) -> StoreResult<CustomField> {
        let mut state = self.state.write().await;
        self.check_create(ResourceKind::CustomField, name)?;
        let id = state.allocate();
        let field = CustomField {
            id,
            name: name.to_string(),
            data_type,
        };
        state.custom_fields.insert(id, field.clone());
        Ok(field)
    }

    async fn delete_tag(&self, id: ResourceId) -> StoreResult<()> {
        self.check_delete(ResourceKind::Tag, id)?;
        let mut state = self.state.write().await;
        let found = state.tags.remove(&id).is_some();
        if found {
            for doc in state.documents.values_mut() {
                doc.tags.retain(|t| *t != id);
            }
        }
        self.deleted(ResourceKind::Tag, id, found)
    }

    async fn delete_document_type(&self, id: ResourceId) -> StoreResult<()> {
        self.check_delete(ResourceKind::DocumentType, id)?;
        let found = self.state.write().await.document_types.remove(&id).is_some();
        self.deleted(ResourceKind::DocumentType, id, found)
    }

    async fn delete_storage_path(&self, id: ResourceId) -> StoreResult<()> {
        self.check_delete(ResourceKind::StoragePath, id)?;
        let found = self.state.write().await.storage_paths.remove(&id).is_some();
        self.deleted(ResourceKind::StoragePath, id, found)
    }

    async fn delete_custom_field(&self, id: ResourceId) -> StoreResult<()> {
        self.check_delete(ResourceKind::CustomField, id)?;
        let found = self.state.write().await.custom_fields.remove(&id).is_some();
        self.deleted(ResourceKind::CustomField, id, found)
    }

    async fn list_tags(&self) -> StoreResult<Vec<Tag>> {
        Ok(self.state.read().await.tags.values().cloned().collect())
    }

    async fn list_document_types(&self) -> StoreResult<Vec<DocumentType>> {
        Ok(self.state.read().await.document_types.values().cloned().collect())
    }

    async fn list_storage_paths(&self) -> StoreResult<Vec<StoragePath>> {
        Ok(self.state.read().await.storage_paths.values().cloned().collect())
    }

    async fn list_custom_fields(&self) -> StoreResult<Vec<CustomField>> {
        Ok(self.state.read().await.custom_fields.values().cloned().collect())
    }

    async fn get_documents(&self) -> StoreResult<Vec<Document>> {
        Ok(self.state.read().await.documents.values().cloned().collect())
    }

    async fn get_document(&self, id: ResourceId) -> StoreResult<Option<Document>> {
        Ok(self.state.read().await.documents.get(&id).cloned())
    }

    async fn update_document(
        &self,
        id: ResourceId,
        update: DocumentUpdate,
    ) -> StoreResult<Document> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        if self.fail_update.contains(&id) {
            return Err(StoreError::UpdateFailed {
                id,
                message: "injected failure".to_string(),
            });
        }

        let mut state = self.state.write().await;
        let doc = state
            .documents
            .get_mut(&id)
            .ok_or(StoreError::NotFound {
                kind: ResourceKind::Document,
                id,
            })?;
        if let Some(tags) = update.tags {
            doc.tags = tags;
        }
        Ok(doc.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_or_create_is_case_insensitive() {
        let store = InMemoryDocumentStore::new().with_tag("Banking");

        let existing = store.get_or_create_tag("banking", Some("#000000")).await.unwrap();
        assert_eq!(existing.name, "Banking");
        assert_eq!(store.create_calls(), 0);

        let created = store.get_or_create_tag("Insurance", Some("#ffffff")).await.unwrap();
        assert_eq!(created.color.as_deref(), Some("#ffffff"));
        assert_eq!(store.create_calls(), 1);
        assert_eq!(store.list_tags().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_injected_create_failure() {
        let store = InMemoryDocumentStore::new().fail_on_create("Form1040");
        let err = store.get_or_create_document_type("form1040").await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::CreateFailed {
                kind: ResourceKind::DocumentType,
                ..
            }
        ));
        assert!(store.list_document_types().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_tag_detaches_from_documents() {
        let store = InMemoryDocumentStore::new();
        let tag = store.get_or_create_tag("Taxes", None).await.unwrap();
        let doc = store.insert_document("1040", Some("Tax"), vec![tag.id]).await;

        store.delete_tag(tag.id).await.unwrap();
        let doc = store.get_document(doc).await.unwrap().unwrap();
        assert!(doc.tags.is_empty());

        let err = store.delete_tag(tag.id).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_injected_delete_failure_keeps_resource() {
        let store = InMemoryDocumentStore::new();
        let path = store.get_or_create_storage_path("/trust").await.unwrap();
        let store = store.fail_on_delete(path.id);

        assert!(store.delete_storage_path(path.id).await.is_err());
        assert_eq!(store.list_storage_paths().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_document() {
        let store = InMemoryDocumentStore::new().with_document("Scan 1", Some("Medical"));
        let doc = store.get_documents().await.unwrap().remove(0);

        let updated = store
            .update_document(doc.id, DocumentUpdate::tags(vec![42]))
            .await
            .unwrap();
        assert_eq!(updated.tags, vec![42]);
        assert_eq!(updated.document_type.as_deref(), Some("Medical"));
        assert_eq!(store.update_calls(), 1);

        let store = store.fail_on_update(doc.id);
        assert!(store
            .update_document(doc.id, DocumentUpdate::default())
            .await
            .is_err());
        assert_eq!(store.update_calls(), 2);
    }
}
