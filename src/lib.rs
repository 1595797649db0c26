//! Records Taxonomy
//!
//! Compliance-aware organisation of household, individual and trust records.
//! Documents are filed under a four-level hierarchy per entity type:
//!
//! ```text
//! Function ──► Service ──► Activity ──► DocumentType
//! ```
//!
//! with retention rules (years, authority, date basis) per country on every
//! activity.
//!
//! ## Components
//!
//! - `taxonomy`: immutable trees loaded from definition files, one registry
//!   per country
//! - `navigation`: path parsing, validation, autocomplete and keyword search
//! - `provisioning`: installs a taxonomy into an external document store with
//!   skip-detection and full rollback, and keeps it in sync afterwards
//! - `migration`: maps documents carrying legacy flat types onto the
//!   hierarchy, with an audited manual-review queue
//! - `store`: the document-store boundary (HTTP and in-memory)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use records_taxonomy::{InMemoryDocumentStore, InstallOptions, TaxonomyConfig, TaxonomySession};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let session = TaxonomySession::open(TaxonomyConfig::from_env())?;
//! let store = Arc::new(InMemoryDocumentStore::new());
//!
//! let result = session.installer(store).install(InstallOptions::new()).await?;
//! println!("created {} resources", result.installed.total());
//!
//! let resolver = session.resolver("household").expect("household taxonomy");
//! assert!(resolver.validate("HealthManagement/MedicalCare/Consultations").valid);
//! # Ok(())
//! # }
//! ```

// Core error handling
pub mod error;

pub mod config;

pub mod taxonomy;

pub mod navigation;

// External document store boundary
pub mod store;

pub mod provisioning;

pub mod migration;

pub mod session;

#[cfg(test)]
mod fixtures;

pub use config::{DocumentStoreConfig, TaxonomyConfig};
pub use error::{
    MigrationError, PersistError, ProvisionError, ProvisionFailure, ProvisionStep, StoreError,
};
pub use migration::{
    AuditSink, DocumentMappingEntry, FileAuditSink, InMemoryAuditSink, ManualReviewItem,
    MappingMethod, MappingTable, MigrationMapper, MigrationResult,
};
pub use navigation::{AutocompleteOptions, PathResolver, SearchHit};
pub use provisioning::{
    BaselineStore, FileBaselineStore, InMemoryBaselineStore, InstallOptions, InstallResult,
    InstallationOrchestrator, TaxonomyDiff, UpdateOptions, UpdateResult, UpdateSynchronizer,
};
pub use session::TaxonomySession;
pub use store::{DocumentStore, HttpDocumentStore, InMemoryDocumentStore};
pub use taxonomy::{ActivityPath, TaxonomyRegistry, TaxonomyTree};
