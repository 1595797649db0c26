//! Path Navigation
//!
//! Read-side queries over one [`TaxonomyTree`](crate::taxonomy::TaxonomyTree):
//!
//! - `resolver`: parse / validate / resolve-path / autocomplete
//! - `search`: keyword search with relevance scoring
//! - `naming`: hierarchical tag sets and storage-path strings
//!
//! Paths are slash-separated `Function/Service/Activity[/DocumentType]`,
//! matched case-insensitively segment by segment.

mod naming;
mod resolver;
mod search;

pub use naming::{generate_storage_path, humanize_identifier};
pub use resolver::{
    Autocomplete, AutocompleteOptions, ParsedPath, PathResolution, PathResolver, PathValidation,
    ResolvedPath, SuggestionKind,
};
pub use search::{MatchKind, SearchHit, SearchLevel, MAX_SEARCH_RESULTS};
