//! Completeness check run before any provisioning write

use std::fmt;

use serde::Serialize;

use super::path::ActivityPath;
use super::tree::TaxonomyTree;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    NoActivities,
    NoDocumentTypes,
    NoRetention,
    /// Rules exist but none has both `years` and `authority`
    IncompleteRetention,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueKind::NoActivities => write!(f, "taxonomy defines no activities"),
            IssueKind::NoDocumentTypes => write!(f, "activity has no document types"),
            IssueKind::NoRetention => write!(f, "activity has no retention rules"),
            IssueKind::IncompleteRetention => {
                write!(f, "no retention rule has both years and authority")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletenessIssue {
    pub entity_type: String,
    pub path: Option<ActivityPath>,
    pub kind: IssueKind,
}

impl CompletenessIssue {
    pub fn new(entity_type: impl Into<String>, path: Option<ActivityPath>, kind: IssueKind) -> Self {
        Self {
            entity_type: entity_type.into(),
            path,
            kind,
        }
    }
}

impl fmt::Display for CompletenessIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{}: {}: {}", self.entity_type, path, self.kind),
            None => write!(f, "{}: {}", self.entity_type, self.kind),
        }
    }
}

/// Every incomplete activity in `tree`; empty means the tree may be provisioned
pub fn check_completeness(tree: &TaxonomyTree) -> Vec<CompletenessIssue> {
    let entity_type = tree.entity_type();
    let paths = tree.activity_paths();

    if paths.is_empty() {
        return vec![CompletenessIssue::new(entity_type, None, IssueKind::NoActivities)];
    }

    let mut issues = Vec::new();
    for (path, activity) in paths {
        if activity.document_types.is_empty() {
            issues.push(CompletenessIssue::new(
                entity_type,
                Some(path.clone()),
                IssueKind::NoDocumentTypes,
            ));
        }
        if activity.retention.is_empty() {
            issues.push(CompletenessIssue::new(
                entity_type,
                Some(path),
                IssueKind::NoRetention,
            ));
        } else if !activity.retention.values().any(|r| r.is_complete()) {
            issues.push(CompletenessIssue::new(
                entity_type,
                Some(path),
                IssueKind::IncompleteRetention,
            ));
        }
    }
    issues
}
