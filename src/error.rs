//! Error handling for the records taxonomy
//!
//! One `thiserror` enum per concern. File loaders (registry, mapping
//! tables, config) return `anyhow::Result` with context instead.

use std::fmt;

use thiserror::Error;

use crate::store::{ResourceId, ResourceKind};
use crate::taxonomy::CompletenessIssue;

/// Errors raised by a [`DocumentStore`](crate::store::DocumentStore)
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Document store rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Failed to create {kind} '{name}': {message}")]
    CreateFailed {
        kind: ResourceKind,
        name: String,
        message: String,
    },

    #[error("Failed to delete {kind} {id}: {message}")]
    DeleteFailed {
        kind: ResourceKind,
        id: ResourceId,
        message: String,
    },

    #[error("Failed to update document {id}: {message}")]
    UpdateFailed { id: ResourceId, message: String },

    #[error("{kind} {id} not found")]
    NotFound { kind: ResourceKind, id: ResourceId },

    #[error("Invalid response from document store: {0}")]
    InvalidResponse(String),

    #[error("Invalid document store URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Errors from the file-backed audit sink and retention baseline store
#[derive(Error, Debug)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Phase of an install/update call in which a failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionStep {
    Validate,
    Snapshot,
    Tags,
    DocumentTypes,
    StoragePaths,
    CustomFields,
    Baseline,
}

impl ProvisionStep {
    /// Step in which resources of `kind` are created
    pub fn for_kind(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Tag => ProvisionStep::Tags,
            ResourceKind::DocumentType => ProvisionStep::DocumentTypes,
            ResourceKind::StoragePath => ProvisionStep::StoragePaths,
            ResourceKind::CustomField | ResourceKind::Document => ProvisionStep::CustomFields,
        }
    }
}

impl fmt::Display for ProvisionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProvisionStep::Validate => write!(f, "validate"),
            ProvisionStep::Snapshot => write!(f, "snapshot"),
            ProvisionStep::Tags => write!(f, "tags"),
            ProvisionStep::DocumentTypes => write!(f, "document-types"),
            ProvisionStep::StoragePaths => write!(f, "storage-paths"),
            ProvisionStep::CustomFields => write!(f, "custom-fields"),
            ProvisionStep::Baseline => write!(f, "baseline"),
        }
    }
}

/// Underlying cause of a [`ProvisionError`]
#[derive(Error, Debug)]
pub enum ProvisionFailure {
    #[error("unknown entity type '{0}'")]
    UnknownEntityType(String),

    #[error("taxonomy incomplete: {}", join_issues(.0))]
    Incomplete(Vec<CompletenessIssue>),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("retention baseline: {0}")]
    Baseline(#[from] PersistError),
}

fn join_issues(issues: &[CompletenessIssue]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Install/update failure, reported only after rollback has finished
#[derive(Error, Debug)]
#[error(
    "{step} failed for {entity} (country {country}, {rolled_back} resource(s) rolled back): {source}",
    entity = .entity_type.as_deref().unwrap_or("all entity types")
)]
pub struct ProvisionError {
    pub country: String,
    pub entity_type: Option<String>,
    pub step: ProvisionStep,
    pub rolled_back: usize,
    #[source]
    pub source: ProvisionFailure,
}

impl ProvisionError {
    pub fn new(country: impl Into<String>, step: ProvisionStep, source: ProvisionFailure) -> Self {
        Self {
            country: country.into(),
            entity_type: None,
            step,
            rolled_back: 0,
            source,
        }
    }

    pub fn for_entity(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    pub fn with_rolled_back(mut self, rolled_back: usize) -> Self {
        self.rolled_back = rolled_back;
        self
    }

    /// Failed before anything was written
    pub fn is_validation(&self) -> bool {
        self.step == ProvisionStep::Validate
    }
}

/// Structural migration failures. Per-document problems never surface here;
/// they are recorded in the audit log instead.
#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("no mapping table loaded")]
    NoMappingTable,

    #[error("mapping table for entity type '{entity_type}' not found in {dir}")]
    MappingTableMissing { entity_type: String, dir: String },

    #[error(transparent)]
    MappingTable(#[from] anyhow::Error),

    #[error("document {0} not found")]
    DocumentNotFound(ResourceId),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("audit sink: {0}")]
    Audit(#[from] PersistError),
}

/// Result type aliases for convenience
pub type StoreResult<T> = Result<T, StoreError>;
pub type PersistResult<T> = Result<T, PersistError>;
pub type ProvisionResult<T> = Result<T, ProvisionError>;
