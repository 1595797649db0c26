//! Migration audit records
//!
//! The log is append-only. The one permitted mutation is backfilling
//! `new_path` on a manual entry once a reviewer has picked a path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::DocumentId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingMethod {
    Automatic,
    Manual,
    Failed,
}

impl std::fmt::Display for MappingMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MappingMethod::Automatic => write!(f, "automatic"),
            MappingMethod::Manual => write!(f, "manual"),
            MappingMethod::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMappingEntry {
    pub document_id: DocumentId,
    pub original_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_path: Option<String>,
    pub method: MappingMethod,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DocumentMappingEntry {
    pub fn automatic(
        document_id: DocumentId,
        original_type: Option<String>,
        new_path: impl Into<String>,
    ) -> Self {
        Self {
            document_id,
            original_type,
            new_path: Some(new_path.into()),
            method: MappingMethod::Automatic,
            timestamp: Utc::now(),
            error: None,
        }
    }

    /// Awaiting a reviewer; `new_path` is filled in when resolved
    pub fn manual(document_id: DocumentId, original_type: Option<String>) -> Self {
        Self {
            document_id,
            original_type,
            new_path: None,
            method: MappingMethod::Manual,
            timestamp: Utc::now(),
            error: None,
        }
    }

    pub fn failed(
        document_id: DocumentId,
        original_type: Option<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            document_id,
            original_type,
            new_path: None,
            method: MappingMethod::Failed,
            timestamp: Utc::now(),
            error: Some(error.into()),
        }
    }

    pub fn with_new_path(mut self, path: impl Into<String>) -> Self {
        self.new_path = Some(path.into());
        self
    }

    pub fn is_pending_review(&self) -> bool {
        self.method == MappingMethod::Manual && self.new_path.is_none()
    }
}

/// Aggregate outcome of one migration run, persisted under `run_id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationResult {
    pub run_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub total: usize,
    pub auto_mapped: usize,
    pub manual_review: usize,
    pub failed: usize,
    /// Manual entries resolved by a reviewer after the run
    #[serde(default)]
    pub reviewed: usize,
    #[serde(default)]
    pub log: Vec<DocumentMappingEntry>,
}

impl MigrationResult {
    pub fn new(run_id: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id: run_id.into(),
            entity_type: None,
            started_at,
            completed_at: None,
            total: 0,
            auto_mapped: 0,
            manual_review: 0,
            failed: 0,
            reviewed: 0,
            log: Vec::new(),
        }
    }

    pub fn with_entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    /// Append an entry and bump the matching counter
    pub fn record(&mut self, entry: DocumentMappingEntry) {
        self.total += 1;
        match entry.method {
            MappingMethod::Automatic => self.auto_mapped += 1,
            MappingMethod::Manual => self.manual_review += 1,
            MappingMethod::Failed => self.failed += 1,
        }
        self.log.push(entry);
    }

    pub fn complete(&mut self) {
        self.completed_at = Some(Utc::now());
    }

    pub fn pending_review(&self) -> impl Iterator<Item = &DocumentMappingEntry> {
        self.log.iter().filter(|e| e.is_pending_review())
    }

    /// Backfill the pending manual entry for `document_id` with the chosen
    /// path. Returns false when there is nothing pending for it.
    pub fn resolve_review(&mut self, document_id: DocumentId, path: impl Into<String>) -> bool {
        let Some(entry) = self
            .log
            .iter_mut()
            .find(|e| e.document_id == document_id && e.is_pending_review())
        else {
            return false;
        };
        entry.new_path = Some(path.into());
        self.manual_review = self.manual_review.saturating_sub(1);
        self.reviewed += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_keeps_counts_balanced() {
        let mut result = MigrationResult::new("20240101T000000.000Z", Utc::now());
        result.record(DocumentMappingEntry::automatic(1, Some("Medical".into()), "A/B/C"));
        result.record(DocumentMappingEntry::manual(2, Some("Misc".into())));
        result.record(DocumentMappingEntry::failed(3, None, "no mapping found"));
        result.record(DocumentMappingEntry::failed(4, Some("X".into()), "no mapping found"));

        assert_eq!(result.total, 4);
        assert_eq!(result.auto_mapped, 1);
        assert_eq!(result.manual_review, 1);
        assert_eq!(result.failed, 2);
        assert_eq!(
            result.auto_mapped + result.manual_review + result.failed,
            result.log.len()
        );
        assert_eq!(result.log[2].document_id, 3);
    }

    #[test]
    fn test_pending_review() {
        let mut result = MigrationResult::new("run", Utc::now());
        result.record(DocumentMappingEntry::manual(7, None));
        result.record(DocumentMappingEntry::manual(8, None).with_new_path("A/B/C"));

        let pending: Vec<_> = result.pending_review().map(|e| e.document_id).collect();
        assert_eq!(pending, vec![7]);
    }

    #[test]
    fn test_resolve_review_backfills_once() {
        let mut result = MigrationResult::new("run", Utc::now());
        result.record(DocumentMappingEntry::manual(7, Some("Misc".into())));

        assert!(result.resolve_review(7, "A/B/C"));
        assert_eq!(result.log[0].new_path.as_deref(), Some("A/B/C"));
        assert_eq!(result.manual_review, 0);
        assert_eq!(result.reviewed, 1);
        assert!(!result.resolve_review(7, "D/E/F"));
        assert!(!result.resolve_review(8, "A/B/C"));
    }

    #[test]
    fn test_entry_wire_format() {
        let entry = DocumentMappingEntry::failed(9, Some("Tax".into()), "skipped by user");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["documentId"], 9);
        assert_eq!(json["method"], "failed");
        assert_eq!(json["error"], "skipped by user");
        assert!(json.get("newPath").is_none());
    }
}
