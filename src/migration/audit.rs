//! Durable migration audit records, one per run

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use records_taxonomy_types::MigrationResult;

use crate::error::PersistResult;

const FILE_PREFIX: &str = "migration-";
const FILE_SUFFIX: &str = ".json";

/// Where migration results are kept, addressable by run id
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Store (or overwrite) the record for `result.run_id`; returns its key
    async fn save(&self, result: &MigrationResult) -> PersistResult<String>;

    async fn load(&self, run_id: &str) -> PersistResult<Option<MigrationResult>>;

    /// Most recent run. Run ids are timestamps, so this is the greatest id.
    async fn latest(&self) -> PersistResult<Option<MigrationResult>>;

    /// Most recent run recorded against `entity_type` (case-insensitive)
    async fn latest_for(&self, entity_type: &str) -> PersistResult<Option<MigrationResult>>;
}

fn ran_for(result: &MigrationResult, entity_type: &str) -> bool {
    result
        .entity_type
        .as_deref()
        .is_some_and(|e| e.eq_ignore_ascii_case(entity_type))
}

/// One `migration-<run id>.json` per run in the audit directory
pub struct FileAuditSink {
    dir: PathBuf,
}

impl FileAuditSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_for(&self, run_id: &str) -> PathBuf {
        self.dir.join(format!("{}{}{}", FILE_PREFIX, run_id, FILE_SUFFIX))
    }

    async fn read(path: &Path) -> PersistResult<MigrationResult> {
        let content = tokio::fs::read(path).await?;
        Ok(serde_json::from_slice(&content)?)
    }

    /// Run ids present in the directory, newest first
    async fn run_ids(&self) -> PersistResult<Vec<String>> {
        if !tokio::fs::try_exists(&self.dir).await? {
            return Ok(Vec::new());
        }

        let mut run_ids = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some(run_id) = name
                .strip_prefix(FILE_PREFIX)
                .and_then(|rest| rest.strip_suffix(FILE_SUFFIX))
            {
                run_ids.push(run_id.to_string());
            }
        }
        run_ids.sort_unstable_by(|a, b| b.cmp(a));
        Ok(run_ids)
    }
}

#[async_trait]
impl AuditSink for FileAuditSink {
    async fn save(&self, result: &MigrationResult) -> PersistResult<String> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.file_for(&result.run_id);
        tokio::fs::write(&path, serde_json::to_vec_pretty(result)?).await?;
        debug!("Wrote migration audit {:?}", path);
        Ok(result.run_id.clone())
    }

    async fn load(&self, run_id: &str) -> PersistResult<Option<MigrationResult>> {
        let path = self.file_for(run_id);
        if !tokio::fs::try_exists(&path).await? {
            return Ok(None);
        }
        Ok(Some(Self::read(&path).await?))
    }

    async fn latest(&self) -> PersistResult<Option<MigrationResult>> {
        match self.run_ids().await?.first() {
            Some(run_id) => self.load(run_id).await,
            None => Ok(None),
        }
    }

    async fn latest_for(&self, entity_type: &str) -> PersistResult<Option<MigrationResult>> {
        for run_id in self.run_ids().await? {
            let result = Self::read(&self.file_for(&run_id)).await?;
            if ran_for(&result, entity_type) {
                return Ok(Some(result));
            }
        }
        Ok(None)
    }
}

#[derive(Default)]
pub struct InMemoryAuditSink {
    runs: RwLock<BTreeMap<String, MigrationResult>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.runs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.runs.read().await.is_empty()
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditSink {
    async fn save(&self, result: &MigrationResult) -> PersistResult<String> {
        self.runs
            .write()
            .await
            .insert(result.run_id.clone(), result.clone());
        Ok(result.run_id.clone())
    }

    async fn load(&self, run_id: &str) -> PersistResult<Option<MigrationResult>> {
        Ok(self.runs.read().await.get(run_id).cloned())
    }

    async fn latest(&self) -> PersistResult<Option<MigrationResult>> {
        Ok(self.runs.read().await.values().next_back().cloned())
    }

    async fn latest_for(&self, entity_type: &str) -> PersistResult<Option<MigrationResult>> {
        Ok(self
            .runs
            .read()
            .await
            .values()
            .rev()
            .find(|r| ran_for(r, entity_type))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use records_taxonomy_types::DocumentMappingEntry;

    fn run(run_id: &str) -> MigrationResult {
        let mut result = MigrationResult::new(run_id, Utc::now());
        result.record(DocumentMappingEntry::manual(1, Some("Misc".into())));
        result.complete();
        result
    }

    #[tokio::test]
    async fn test_file_sink_latest_by_run_id() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileAuditSink::new(dir.path().join("audit"));
        assert!(sink.latest().await.unwrap().is_none());

        sink.save(&run("20240101T000000.000Z")).await.unwrap();
        let key = sink.save(&run("20240301T120000.500Z")).await.unwrap();
        sink.save(&run("20240201T000000.000Z")).await.unwrap();
        std::fs::write(sink.dir().join("notes.txt"), "ignored").unwrap();

        assert_eq!(key, "20240301T120000.500Z");
        let latest = sink.latest().await.unwrap().unwrap();
        assert_eq!(latest.run_id, "20240301T120000.500Z");
        assert_eq!(latest.log.len(), 1);

        assert!(sink
            .load("20240101T000000.000Z")
            .await
            .unwrap()
            .is_some());
        assert!(sink.load("19990101T000000.000Z").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_latest_for_skips_other_entity_types() {
        let dir = tempfile::tempdir().unwrap();
        let file_sink = FileAuditSink::new(dir.path());
        let memory_sink = InMemoryAuditSink::new();
        let sinks: [&dyn AuditSink; 2] = [&file_sink, &memory_sink];

        for sink in sinks {
            assert!(sink.latest_for("household").await.unwrap().is_none());
            sink.save(&run("20240101T000000.000Z").with_entity_type("household"))
                .await
                .unwrap();
            sink.save(&run("20240102T000000.000Z").with_entity_type("trust"))
                .await
                .unwrap();
            sink.save(&run("20240103T000000.000Z")).await.unwrap();

            let household = sink.latest_for("Household").await.unwrap().unwrap();
            assert_eq!(household.run_id, "20240101T000000.000Z");
            let trust = sink.latest_for("trust").await.unwrap().unwrap();
            assert_eq!(trust.run_id, "20240102T000000.000Z");
            assert!(sink.latest_for("individual").await.unwrap().is_none());
            assert_eq!(
                sink.latest().await.unwrap().unwrap().run_id,
                "20240103T000000.000Z"
            );
        }
    }

    #[tokio::test]
    async fn test_in_memory_sink() {
        let sink = InMemoryAuditSink::new();
        sink.save(&run("b")).await.unwrap();
        sink.save(&run("a")).await.unwrap();
        assert_eq!(sink.len().await, 2);
        assert_eq!(sink.latest().await.unwrap().unwrap().run_id, "b");
    }
}
