//! Taxonomy Tree
//!
//! Four-level hierarchy per entity type:
//!
//! ```text
//! Function ──► Service ──► Activity ──► DocumentType
//!                              │
//!                    retention: country → rule
//! ```
//!
//! Trees are built once from a [`TaxonomyDefinition`] and never mutated.
//! Every level keeps a lowercase name index so lookups are case-insensitive
//! without rescanning siblings.
//!
//! Navigation failures are data: an unknown name yields an empty slice or
//! `None`, never an error.

mod completeness;
mod path;
mod registry;
mod tree;

pub use completeness::{check_completeness, CompletenessIssue, IssueKind};
pub use path::{ActivityPath, ParseActivityPathError};
pub use registry::TaxonomyRegistry;
pub use tree::{ActivityNode, FunctionNode, NameIndex, ServiceNode, TaxonomyTree};

pub use records_taxonomy_types::{DateBasis, RetentionRule, TaxonomyDefinition};
