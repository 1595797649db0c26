//! External Document Store
//!
//! The taxonomy is provisioned into (and documents are migrated inside) an
//! external document-management system. Everything this crate needs from it
//! goes through [`DocumentStore`]:
//!
//! - [`HttpDocumentStore`] talks to a Paperless-style REST API
//! - [`InMemoryDocumentStore`] keeps everything in process, with failure
//!   injection for rollback tests and dry runs
//!
//! Calls are awaited one at a time by the callers in this crate. The store
//! owns any timeout/retry policy; nothing above it retries.

mod http;
mod memory;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use http::HttpDocumentStore;
pub use memory::InMemoryDocumentStore;

use crate::error::StoreResult;

/// Identifier of any resource in the external store
pub type ResourceId = records_taxonomy_types::DocumentId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Tag,
    DocumentType,
    StoragePath,
    CustomField,
    Document,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Tag => write!(f, "tag"),
            ResourceKind::DocumentType => write!(f, "document type"),
            ResourceKind::StoragePath => write!(f, "storage path"),
            ResourceKind::CustomField => write!(f, "custom field"),
            ResourceKind::Document => write!(f, "document"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: ResourceId,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentType {
    pub id: ResourceId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoragePath {
    pub id: ResourceId,
    pub name: String,
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomFieldType {
    String,
    Date,
    Integer,
    Monetary,
    Boolean,
    Url,
    /// Any type this crate never creates
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomField {
    pub id: ResourceId,
    pub name: String,
    pub data_type: CustomFieldType,
}

/// A stored document as seen by the migration layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: ResourceId,
    pub title: String,
    /// Legacy flat document type, by name
    pub document_type: Option<String>,
    pub tags: Vec<ResourceId>,
}

/// Partial document update; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<ResourceId>>,
}

impl DocumentUpdate {
    pub fn tags(tags: Vec<ResourceId>) -> Self {
        Self { tags: Some(tags) }
    }
}

/// Boundary to the external document-management system
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Existing tag with this name (case-insensitive), or a new one
    async fn get_or_create_tag(&self, name: &str, color: Option<&str>) -> StoreResult<Tag>;

    async fn get_or_create_document_type(&self, name: &str) -> StoreResult<DocumentType>;

    async fn get_or_create_storage_path(&self, path: &str) -> StoreResult<StoragePath>;

    async fn create_custom_field(
        &self,
        name: &str,
        data_type: CustomFieldType,
    ) -> StoreResult<CustomField>;

    async fn delete_tag(&self, id: ResourceId) -> StoreResult<()>;

    async fn delete_document_type(&self, id: ResourceId) -> StoreResult<()>;

    async fn delete_storage_path(&self, id: ResourceId) -> StoreResult<()>;

    async fn delete_custom_field(&self, id: ResourceId) -> StoreResult<()>;

    async fn list_tags(&self) -> StoreResult<Vec<Tag>>;

    async fn list_document_types(&self) -> StoreResult<Vec<DocumentType>>;

    async fn list_storage_paths(&self) -> StoreResult<Vec<StoragePath>>;

    async fn list_custom_fields(&self) -> StoreResult<Vec<CustomField>>;

    async fn get_documents(&self) -> StoreResult<Vec<Document>>;

    /// Fetch one document
    async fn get_document(&self, id: ResourceId) -> StoreResult<Option<Document>> {
        Ok(self.get_documents().await?.into_iter().find(|d| d.id == id))
    }

    async fn update_document(&self, id: ResourceId, update: DocumentUpdate)
        -> StoreResult<Document>;
}
