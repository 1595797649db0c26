//! Path parsing, validation and completion

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::taxonomy::{ActivityNode, FunctionNode, RetentionRule, ServiceNode, TaxonomyTree};

/// Minimum Jaro-Winkler score for a "did you mean" suggestion
const SUGGESTION_THRESHOLD: f64 = 0.8;

/// Function / Service / Activity / DocumentType
const MAX_SEGMENTS: usize = 4;

pub struct PathResolver {
    tree: Arc<TaxonomyTree>,
}

/// Whatever part of a path matched, with canonical spellings
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResolvedPath {
    pub function: Option<String>,
    pub service: Option<String>,
    pub activity: Option<String>,
    pub document_type: Option<String>,
    /// Set once an activity is reached
    pub document_types: Vec<String>,
    pub retention: BTreeMap<String, RetentionRule>,
}

impl ResolvedPath {
    /// Number of matched levels
    pub fn depth(&self) -> usize {
        [
            self.function.is_some(),
            self.service.is_some(),
            self.activity.is_some(),
            self.document_type.is_some(),
        ]
        .iter()
        .filter(|matched| **matched)
        .count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedPath {
    #[serde(flatten)]
    pub resolved: ResolvedPath,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathValidation {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Closest sibling of the first unmatched segment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved: Option<ResolvedPath>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathResolution {
    pub suggestions: Vec<String>,
    /// Canonical names of the exactly-matched prefix
    pub matched: Vec<String>,
    /// Levels still to fill: 3 function, 2 service, 1 activity, 0 document type
    pub remaining: usize,
    /// Suggestions came from substring matching, not an exact descent
    pub fuzzy: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SuggestionKind {
    Function,
    Service,
    Activity,
    DocumentType,
}

impl SuggestionKind {
    pub fn from_remaining(remaining: usize) -> Self {
        match remaining {
            3.. => SuggestionKind::Function,
            2 => SuggestionKind::Service,
            1 => SuggestionKind::Activity,
            0 => SuggestionKind::DocumentType,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AutocompleteOptions {
    pub limit: usize,
    pub fuzzy: bool,
}

impl Default for AutocompleteOptions {
    fn default() -> Self {
        Self {
            limit: 10,
            fuzzy: true,
        }
    }
}

impl AutocompleteOptions {
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn exact_only(mut self) -> Self {
        self.fuzzy = false;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Autocomplete {
    pub suggestions: Vec<String>,
    pub kind: SuggestionKind,
    pub matched: Vec<String>,
    pub remaining: usize,
}

struct WalkFailure {
    error: String,
    suggestion: Option<String>,
}

/// Outcome of matching a path's segments level by level
#[derive(Default)]
struct Walk<'t> {
    function: Option<&'t FunctionNode>,
    service: Option<&'t ServiceNode>,
    activity: Option<&'t ActivityNode>,
    document_type: Option<&'t str>,
    failure: Option<WalkFailure>,
}

impl<'t> Walk<'t> {
    fn fail(mut self, error: String, suggestion: Option<String>) -> Self {
        self.failure = Some(WalkFailure { error, suggestion });
        self
    }

    fn resolved(&self) -> ResolvedPath {
        ResolvedPath {
            function: self.function.map(|f| f.name.clone()),
            service: self.service.map(|s| s.name.clone()),
            activity: self.activity.map(|a| a.name.clone()),
            document_type: self.document_type.map(str::to_string),
            document_types: self
                .activity
                .map(|a| a.document_types.clone())
                .unwrap_or_default(),
            retention: self
                .activity
                .map(|a| a.retention.clone())
                .unwrap_or_default(),
        }
    }
}

/// Completion cursor: the level the next segment is matched against
#[derive(Clone, Copy)]
enum Level<'t> {
    Functions(&'t TaxonomyTree),
    Services(&'t FunctionNode),
    Activities(&'t ServiceNode),
    DocumentTypes(&'t ActivityNode),
}

impl<'t> Level<'t> {
    fn remaining(&self) -> usize {
        match self {
            Level::Functions(_) => 3,
            Level::Services(_) => 2,
            Level::Activities(_) => 1,
            Level::DocumentTypes(_) => 0,
        }
    }

    fn names(&self) -> Vec<&'t str> {
        match *self {
            Level::Functions(tree) => tree.functions().iter().map(|f| f.name.as_str()).collect(),
            Level::Services(function) => {
                function.services().iter().map(|s| s.name.as_str()).collect()
            }
            Level::Activities(service) => {
                service.activities().iter().map(|a| a.name.as_str()).collect()
            }
            Level::DocumentTypes(activity) => {
                activity.document_types.iter().map(String::as_str).collect()
            }
        }
    }

    /// Exact (case-insensitive) match: canonical name and the next level
    fn descend(&self, segment: &str) -> Option<(&'t str, Option<Level<'t>>)> {
        match *self {
            Level::Functions(tree) => tree
                .function(segment)
                .map(|f| (f.name.as_str(), Some(Level::Services(f)))),
            Level::Services(function) => function
                .service(segment)
                .map(|s| (s.name.as_str(), Some(Level::Activities(s)))),
            Level::Activities(service) => service
                .activity(segment)
                .map(|a| (a.name.as_str(), Some(Level::DocumentTypes(a)))),
            Level::DocumentTypes(activity) => activity.document_type(segment).map(|dt| (dt, None)),
        }
    }
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Closest name by Jaro-Winkler, if close enough to be worth suggesting
fn closest<'a>(segment: &str, names: impl IntoIterator<Item = &'a str>) -> Option<String> {
    let wanted = segment.to_lowercase();
    names
        .into_iter()
        .map(|name| (name, strsim::jaro_winkler(&wanted, &name.to_lowercase())))
        .filter(|(_, score)| *score >= SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(name, _)| name.to_string())
}

/// Names containing `segment` (case-insensitive), most similar first
fn substring_candidates(segment: &str, names: &[&str]) -> Vec<String> {
    let wanted = segment.to_lowercase();
    let mut scored: Vec<(&str, f64)> = names
        .iter()
        .filter(|name| name.to_lowercase().contains(&wanted))
        .map(|name| (*name, strsim::jaro_winkler(&wanted, &name.to_lowercase())))
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.into_iter().map(|(name, _)| name.to_string()).collect()
}

impl PathResolver {
    pub fn new(tree: Arc<TaxonomyTree>) -> Self {
        Self { tree }
    }

    pub fn tree(&self) -> &TaxonomyTree {
        &self.tree
    }

    fn walk(&self, path: &str) -> Walk<'_> {
        let segments = segments(path);
        let mut walk = Walk::default();

        if segments.is_empty() {
            return walk.fail("Empty path".to_string(), None);
        }
        if segments.len() > MAX_SEGMENTS {
            return walk.fail(
                format!(
                    "Too many segments: {} (expected at most {})",
                    segments.len(),
                    MAX_SEGMENTS
                ),
                None,
            );
        }

        let tree = self.tree.as_ref();

        let Some(function) = tree.function(segments[0]) else {
            let suggestion = closest(segments[0], tree.functions().iter().map(|f| f.name.as_str()));
            return walk.fail(format!("Invalid function: {}", segments[0]), suggestion);
        };
        walk.function = Some(function);

        let Some(&segment) = segments.get(1) else {
            return walk;
        };
        let Some(service) = function.service(segment) else {
            let suggestion = closest(segment, function.services().iter().map(|s| s.name.as_str()));
            return walk.fail(
                format!("Invalid service: {} for function {}", segment, function.name),
                suggestion,
            );
        };
        walk.service = Some(service);

        let Some(&segment) = segments.get(2) else {
            return walk;
        };
        let Some(activity) = service.activity(segment) else {
            let suggestion =
                closest(segment, service.activities().iter().map(|a| a.name.as_str()));
            return walk.fail(
                format!("Invalid activity: {} for service {}", segment, service.name),
                suggestion,
            );
        };
        walk.activity = Some(activity);

        let Some(&segment) = segments.get(3) else {
            return walk;
        };
        let Some(document_type) = activity.document_type(segment) else {
            let suggestion = closest(segment, activity.document_types.iter().map(String::as_str));
            return walk.fail(
                format!(
                    "Invalid document type: {} for activity {}",
                    segment, activity.name
                ),
                suggestion,
            );
        };
        walk.document_type = Some(document_type);
        walk
    }

    /// Resolve as much of `path` as matches; partial fields survive an error
    pub fn parse(&self, path: &str) -> ParsedPath {
        let walk = self.walk(path);
        ParsedPath {
            resolved: walk.resolved(),
            valid: walk.failure.is_none(),
            error: walk.failure.map(|f| f.error),
        }
    }

    pub fn validate(&self, path: &str) -> PathValidation {
        let walk = self.walk(path);
        match walk.failure {
            None => PathValidation {
                valid: true,
                error: None,
                suggestion: None,
                resolved: Some(walk.resolved()),
            },
            Some(failure) => PathValidation {
                valid: false,
                error: Some(failure.error),
                suggestion: failure.suggestion,
                resolved: None,
            },
        }
    }

    /// Match the exact prefix of `partial`, then suggest the next level.
    ///
    /// A segment with no exact match yields the substring candidates at that
    /// level without descending.
    pub fn resolve_path(&self, partial: &str) -> PathResolution {
        let mut level = Level::Functions(self.tree.as_ref());
        let mut matched = Vec::new();

        for segment in segments(partial) {
            match level.descend(segment) {
                Some((name, next)) => {
                    matched.push(name.to_string());
                    match next {
                        Some(next) => level = next,
                        None => {
                            // Complete path down to a document type
                            return PathResolution {
                                suggestions: Vec::new(),
                                matched,
                                remaining: 0,
                                fuzzy: false,
                            };
                        }
                    }
                }
                None => {
                    return PathResolution {
                        suggestions: substring_candidates(segment, &level.names()),
                        matched,
                        remaining: level.remaining(),
                        fuzzy: true,
                    };
                }
            }
        }

        PathResolution {
            suggestions: level.names().into_iter().map(str::to_string).collect(),
            matched,
            remaining: level.remaining(),
            fuzzy: false,
        }
    }

    pub fn autocomplete(&self, partial: &str, options: AutocompleteOptions) -> Autocomplete {
        let resolution = self.resolve_path(partial);
        let suggestions = if resolution.fuzzy && !options.fuzzy {
            Vec::new()
        } else {
            resolution
                .suggestions
                .into_iter()
                .take(options.limit)
                .collect()
        };

        Autocomplete {
            suggestions,
            kind: SuggestionKind::from_remaining(resolution.remaining),
            matched: resolution.matched,
            remaining: resolution.remaining,
        }
    }
}
