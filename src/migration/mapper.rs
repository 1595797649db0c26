//! Migration mapper
//!
//! Moves documents typed with a legacy flat type onto the hierarchy by
//! tagging them with each segment of their mapped path. Per-document
//! problems become `failed` audit entries; only structural problems (no
//! mapping table, store unreachable while listing) abort a run.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use records_taxonomy_types::{DocumentMappingEntry, MappingMethod, MigrationResult};

use super::audit::AuditSink;
use super::mapping::MappingTable;
use crate::error::{MigrationError, StoreResult};
use crate::store::{Document, DocumentStore, DocumentUpdate, ResourceId};

const RUN_ID_FORMAT: &str = "%Y%m%dT%H%M%S%.3fZ";

/// A document awaiting a reviewer, with the paths it could move to
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualReviewItem {
    pub document: Document,
    pub original_type: Option<String>,
    pub alternatives: Vec<String>,
}

pub struct MigrationMapper {
    store: Arc<dyn DocumentStore>,
    audit: Arc<dyn AuditSink>,
    mapping_dir: PathBuf,
    table: Option<MappingTable>,
    entity_type: Option<String>,
    last_run: Option<MigrationResult>,
}

impl MigrationMapper {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        audit: Arc<dyn AuditSink>,
        mapping_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            audit,
            mapping_dir: mapping_dir.into(),
            table: None,
            entity_type: None,
            last_run: None,
        }
    }

    pub fn with_mapping_table(mut self, table: MappingTable) -> Self {
        self.set_mapping_table(table);
        self
    }

    pub fn set_mapping_table(&mut self, table: MappingTable) {
        self.table = Some(table);
    }

    pub fn mapping_dir(&self) -> &Path {
        &self.mapping_dir
    }

    pub fn mapping_table(&self) -> Option<&MappingTable> {
        self.table.as_ref()
    }

    pub fn last_run(&self) -> Option<&MigrationResult> {
        self.last_run.as_ref()
    }

    /// Load `<mapping dir>/<entity_type>.{yaml,yml,json}`, replacing any
    /// table already loaded
    pub fn load_mapping_table(&mut self, entity_type: &str) -> Result<usize, MigrationError> {
        let path = MappingTable::locate(&self.mapping_dir, entity_type).ok_or_else(|| {
            MigrationError::MappingTableMissing {
                entity_type: entity_type.to_string(),
                dir: self.mapping_dir.display().to_string(),
            }
        })?;

        let table = MappingTable::load_file(&path)?;
        let count = table.len();
        info!("Loaded {} flat-type mappings for {}", count, entity_type);

        self.table = Some(table);
        self.entity_type = Some(entity_type.trim().to_lowercase());
        Ok(count)
    }

    fn table(&self) -> Result<&MappingTable, MigrationError> {
        self.table.as_ref().ok_or(MigrationError::NoMappingTable)
    }

    fn alternatives_for(&self, flat_type: Option<&str>) -> Vec<String> {
        match (self.table.as_ref(), flat_type) {
            (Some(table), Some(flat_type)) => table
                .get(flat_type)
                .map(|m| m.alternatives.clone())
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// Tag the document with every segment of `path`, keeping its existing tags
    async fn apply_path(&self, document: &Document, path: &str) -> StoreResult<()> {
        let mut tags = document.tags.clone();
        for segment in path.split('/').map(str::trim).filter(|s| !s.is_empty()) {
            let tag = self.store.get_or_create_tag(segment, None).await?;
            if !tags.contains(&tag.id) {
                tags.push(tag.id);
            }
        }
        self.store
            .update_document(document.id, DocumentUpdate::tags(tags))
            .await?;
        Ok(())
    }

    async fn map_document(&self, table: &MappingTable, document: &Document) -> DocumentMappingEntry {
        let original_type = document.document_type.clone();

        let Some(flat_type) = original_type.as_deref() else {
            return DocumentMappingEntry::failed(
                document.id,
                None,
                "document has no document type",
            );
        };

        let Some(mapping) = table.get(flat_type) else {
            return DocumentMappingEntry::failed(document.id, original_type, "no mapping found");
        };

        if mapping.needs_review() {
            if mapping.has_alternatives() {
                return DocumentMappingEntry::manual(document.id, original_type);
            }
            let reason = if mapping.is_ambiguous() {
                "ambiguous mapping with no alternatives"
            } else {
                "low confidence mapping with no alternatives"
            };
            return DocumentMappingEntry::failed(document.id, original_type, reason);
        }

        match self.apply_path(document, &mapping.hierarchical_path).await {
            Ok(()) => DocumentMappingEntry::automatic(
                document.id,
                original_type,
                mapping.hierarchical_path.clone(),
            ),
            Err(e) => {
                warn!("Failed to tag document {}: {}", document.id, e);
                DocumentMappingEntry::failed(document.id, original_type, e.to_string())
            }
        }
    }

    pub async fn migrate_document(
        &self,
        id: ResourceId,
    ) -> Result<DocumentMappingEntry, MigrationError> {
        let table = self.table()?;
        let document = self
            .store
            .get_document(id)
            .await?
            .ok_or(MigrationError::DocumentNotFound(id))?;
        Ok(self.map_document(table, &document).await)
    }

    /// Map every document in the store and persist the run to the audit sink
    pub async fn migrate_all_documents(&mut self) -> Result<MigrationResult, MigrationError> {
        let table = self.table()?;
        let started_at = Utc::now();
        let run_id = self.next_run_id(started_at).await?;

        let mut result = MigrationResult::new(run_id, started_at);
        if let Some(entity_type) = &self.entity_type {
            result = result.with_entity_type(entity_type.clone());
        }

        let documents = self.store.get_documents().await?;
        for document in &documents {
            let entry = self.map_document(table, document).await;
            debug!(
                "Document {} ({:?}): {}",
                entry.document_id, entry.original_type, entry.method
            );
            result.record(entry);
        }
        result.complete();

        self.audit.save(&result).await?;
        info!(
            "Migration {}: {} documents, {} automatic, {} manual review, {} failed",
            result.run_id, result.total, result.auto_mapped, result.manual_review, result.failed
        );

        self.last_run = Some(result.clone());
        Ok(result)
    }

    /// Timestamp run id, suffixed `-NNN` when a run with that id is already
    /// on record. The suffix keeps ids in start order.
    async fn next_run_id(&self, started_at: DateTime<Utc>) -> Result<String, MigrationError> {
        let base = started_at.format(RUN_ID_FORMAT).to_string();
        let mut run_id = base.clone();
        let mut attempt = 0u32;
        while self.audit.load(&run_id).await?.is_some() {
            attempt += 1;
            run_id = format!("{}-{:03}", base, attempt);
        }
        Ok(run_id)
    }

    /// Latest run for the loaded entity type. A table set directly carries
    /// no entity type and sees the latest run of any kind.
    async fn latest_run(&self) -> Result<Option<MigrationResult>, MigrationError> {
        let Some(entity_type) = self.entity_type.as_deref() else {
            return match &self.last_run {
                Some(run) => Ok(Some(run.clone())),
                None => Ok(self.audit.latest().await?),
            };
        };

        match &self.last_run {
            Some(run)
                if run
                    .entity_type
                    .as_deref()
                    .is_some_and(|e| e.eq_ignore_ascii_case(entity_type)) =>
            {
                Ok(Some(run.clone()))
            }
            _ => Ok(self.audit.latest_for(entity_type).await?),
        }
    }

    /// Let `chooser` pick a path for one document. `None` skips it untouched.
    pub async fn prompt_manual_review<F>(
        &mut self,
        id: ResourceId,
        chooser: F,
    ) -> Result<DocumentMappingEntry, MigrationError>
    where
        F: FnOnce(&Document, &[String]) -> Option<String>,
    {
        let document = self
            .store
            .get_document(id)
            .await?
            .ok_or(MigrationError::DocumentNotFound(id))?;
        let original_type = document.document_type.clone();
        let alternatives = self.alternatives_for(original_type.as_deref());

        let Some(path) = chooser(&document, &alternatives) else {
            debug!("Document {} skipped by reviewer", id);
            return Ok(DocumentMappingEntry::failed(id, original_type, "skipped by user"));
        };

        if let Err(e) = self.apply_path(&document, &path).await {
            warn!("Failed to tag reviewed document {}: {}", id, e);
            return Ok(DocumentMappingEntry::failed(id, original_type, e.to_string()));
        }

        let entry = DocumentMappingEntry::manual(id, original_type).with_new_path(path.clone());

        if let Some(mut run) = self.latest_run().await? {
            if run.resolve_review(id, &path) {
                self.audit.save(&run).await?;
                debug!("Backfilled review of document {} in run {}", id, run.run_id);
            }
            self.last_run = Some(run);
        }

        Ok(entry)
    }

    /// Manual entries of the latest run still awaiting a reviewer, joined
    /// against the live documents
    pub async fn get_documents_for_manual_review(
        &self,
    ) -> Result<Vec<ManualReviewItem>, MigrationError> {
        let Some(run) = self.latest_run().await? else {
            return Ok(Vec::new());
        };

        let mut items = Vec::new();
        for entry in run
            .log
            .iter()
            .filter(|e| e.method == MappingMethod::Manual && e.new_path.is_none())
        {
            match self.store.get_document(entry.document_id).await? {
                Some(document) => items.push(ManualReviewItem {
                    document,
                    original_type: entry.original_type.clone(),
                    alternatives: self.alternatives_for(entry.original_type.as_deref()),
                }),
                None => debug!("Document {} no longer exists", entry.document_id),
            }
        }
        Ok(items)
    }
}
