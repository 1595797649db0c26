//! Records Taxonomy Types
//!
//! Serde structures for everything that crosses a boundary:
//!
//! - `definition`: taxonomy definition files (Function → Service → Activity)
//! - `mapping`: legacy flat-type → hierarchical path mapping tables
//! - `audit`: per-document migration records and run results

pub mod audit;
pub mod definition;
pub mod mapping;

pub use audit::{DocumentMappingEntry, MappingMethod, MigrationResult};
pub use definition::{
    ActivityDef, DateBasis, DefinitionMetadata, FunctionDef, RetentionRule, ServiceDef,
    TaxonomyDefinition,
};
pub use mapping::{Confidence, MigrationMapping, AMBIGUOUS_PATH};

/// Identifier of a document (or any resource) in the external store
pub type DocumentId = u64;
