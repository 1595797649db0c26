//! Legacy migration
//!
//! Documents from a flat-typed archive are mapped onto `Function/Service/
//! Activity` paths via a per-entity-type mapping table. High and medium
//! confidence rows are applied automatically; ambiguous and low confidence
//! rows go to a reviewer when the table offers alternatives.
//!
//! Every run is persisted through an [`AuditSink`] keyed by its UTC start
//! timestamp, so the review queue survives the process.

mod audit;
mod mapper;
mod mapping;

pub use audit::{AuditSink, FileAuditSink, InMemoryAuditSink};
pub use mapper::{ManualReviewItem, MigrationMapper};
pub use mapping::MappingTable;

pub use records_taxonomy_types::{
    Confidence, DocumentMappingEntry, MappingMethod, MigrationMapping, MigrationResult,
    AMBIGUOUS_PATH,
};
