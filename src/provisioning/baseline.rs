//! Retention baselines
//!
//! The live definition says nothing about which retention rules were in
//! force when a tree was last provisioned. After every successful install or
//! update the rules are recorded here, fingerprinted with SHA-256, so change
//! detection has something to diff against.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::PersistResult;
use crate::taxonomy::{RetentionRule, TaxonomyTree};

const BASELINE_FILE: &str = "retention-baselines.json";

/// Activity path → country → rule
pub type RetentionRules = BTreeMap<String, BTreeMap<String, RetentionRule>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetentionBaseline {
    pub entity_type: String,
    pub country: String,
    pub version: String,
    pub rules: RetentionRules,
    pub fingerprint: String,
    pub recorded_at: DateTime<Utc>,
}

fn fingerprint(rules: &RetentionRules) -> PersistResult<String> {
    let canonical = serde_json::to_vec(rules)?;
    Ok(hex::encode(Sha256::digest(&canonical)))
}

fn rules_of(tree: &TaxonomyTree) -> RetentionRules {
    tree.activity_paths()
        .into_iter()
        .map(|(path, activity)| (path.to_string(), activity.retention.clone()))
        .collect()
}

fn key(entity_type: &str, country: &str) -> String {
    format!(
        "{}/{}",
        country.trim().to_uppercase(),
        entity_type.trim().to_lowercase()
    )
}

impl RetentionBaseline {
    pub fn capture(tree: &TaxonomyTree) -> PersistResult<Self> {
        let rules = rules_of(tree);
        Ok(Self {
            entity_type: tree.entity_type().to_string(),
            country: tree.country_code().to_string(),
            version: tree.version().to_string(),
            fingerprint: fingerprint(&rules)?,
            rules,
            recorded_at: Utc::now(),
        })
    }

    fn key(&self) -> String {
        key(&self.entity_type, &self.country)
    }

    /// Every rule added, removed or changed since this baseline
    pub fn changes_against(&self, tree: &TaxonomyTree) -> PersistResult<Vec<RetentionChange>> {
        let current = rules_of(tree);
        if fingerprint(&current)? == self.fingerprint {
            return Ok(Vec::new());
        }

        let empty = BTreeMap::new();
        let mut changes = Vec::new();
        let paths: std::collections::BTreeSet<&String> =
            self.rules.keys().chain(current.keys()).collect();

        for path in paths {
            let before = self.rules.get(path).unwrap_or(&empty);
            let after = current.get(path).unwrap_or(&empty);
            let countries: std::collections::BTreeSet<&String> =
                before.keys().chain(after.keys()).collect();

            for country in countries {
                let previous = before.get(country);
                let now = after.get(country);
                if previous != now {
                    changes.push(RetentionChange {
                        entity_type: tree.entity_type().to_string(),
                        path: path.clone(),
                        country: country.clone(),
                        previous: previous.cloned(),
                        current: now.cloned(),
                    });
                }
            }
        }
        Ok(changes)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RetentionChangeKind {
    Added,
    Removed,
    Changed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetentionChange {
    pub entity_type: String,
    pub path: String,
    pub country: String,
    pub previous: Option<RetentionRule>,
    pub current: Option<RetentionRule>,
}

impl RetentionChange {
    pub fn kind(&self) -> RetentionChangeKind {
        match (&self.previous, &self.current) {
            (None, _) => RetentionChangeKind::Added,
            (_, None) => RetentionChangeKind::Removed,
            _ => RetentionChangeKind::Changed,
        }
    }
}

#[async_trait]
pub trait BaselineStore: Send + Sync {
    async fn load(&self, entity_type: &str, country: &str)
        -> PersistResult<Option<RetentionBaseline>>;

    async fn save(&self, baseline: RetentionBaseline) -> PersistResult<()>;

    /// Drop the baseline for an entity type; absent keys are not an error
    async fn remove(&self, entity_type: &str, country: &str) -> PersistResult<()>;
}

/// All baselines in one JSON file under the state directory
pub struct FileBaselineStore {
    path: PathBuf,
}

impl FileBaselineStore {
    pub fn new(state_dir: impl AsRef<Path>) -> Self {
        Self {
            path: state_dir.as_ref().join(BASELINE_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> PersistResult<BTreeMap<String, RetentionBaseline>> {
        if !tokio::fs::try_exists(&self.path).await? {
            return Ok(BTreeMap::new());
        }
        let content = tokio::fs::read(&self.path).await?;
        Ok(serde_json::from_slice(&content)?)
    }

    /// Replace the file via a sibling temp file so readers never see a torn write
    async fn write_all(&self, all: &BTreeMap<String, RetentionBaseline>) -> PersistResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let staging = self.path.with_extension("json.tmp");
        tokio::fs::write(&staging, serde_json::to_vec_pretty(all)?).await?;
        tokio::fs::rename(&staging, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl BaselineStore for FileBaselineStore {
    async fn load(
        &self,
        entity_type: &str,
        country: &str,
    ) -> PersistResult<Option<RetentionBaseline>> {
        Ok(self.read_all().await?.remove(&key(entity_type, country)))
    }

    async fn save(&self, baseline: RetentionBaseline) -> PersistResult<()> {
        let mut all = self.read_all().await?;
        debug!(
            "Recording retention baseline for {} ({}) v{}",
            baseline.entity_type, baseline.country, baseline.version
        );
        all.insert(baseline.key(), baseline);
        self.write_all(&all).await
    }

    async fn remove(&self, entity_type: &str, country: &str) -> PersistResult<()> {
        let mut all = self.read_all().await?;
        if all.remove(&key(entity_type, country)).is_some() {
            self.write_all(&all).await?;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryBaselineStore {
    baselines: RwLock<BTreeMap<String, RetentionBaseline>>,
}

impl InMemoryBaselineStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.baselines.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.baselines.read().await.is_empty()
    }
}

#[async_trait]
impl BaselineStore for InMemoryBaselineStore {
    async fn load(
        &self,
        entity_type: &str,
        country: &str,
    ) -> PersistResult<Option<RetentionBaseline>> {
        Ok(self
            .baselines
            .read()
            .await
            .get(&key(entity_type, country))
            .cloned())
    }

    async fn save(&self, baseline: RetentionBaseline) -> PersistResult<()> {
        self.baselines.write().await.insert(baseline.key(), baseline);
        Ok(())
    }

    async fn remove(&self, entity_type: &str, country: &str) -> PersistResult<()> {
        self.baselines
            .write()
            .await
            .remove(&key(entity_type, country));
        Ok(())
    }
}
