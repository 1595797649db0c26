//! Flat-type mapping tables

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use records_taxonomy_types::MigrationMapping;

const EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];

/// Mapping rows indexed by lowercase flat type
#[derive(Debug, Clone, Default)]
pub struct MappingTable {
    rows: Vec<MigrationMapping>,
    index: HashMap<String, usize>,
}

impl MappingTable {
    pub fn from_rows(rows: Vec<MigrationMapping>) -> Self {
        let mut index = HashMap::new();
        for (i, row) in rows.iter().enumerate() {
            let key = row.flat_type.trim().to_lowercase();
            if index.insert(key, i).is_some() {
                warn!("Duplicate mapping for flat type '{}', last one wins", row.flat_type);
            }
        }
        Self { rows, index }
    }

    /// Parse a YAML or JSON array of mapping rows
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read mapping table: {:?}", path))?;

        let rows: Vec<MigrationMapping> = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse mapping table: {:?}", path))?
        } else {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse mapping table: {:?}", path))?
        };

        debug!("Loaded {} mappings from {:?}", rows.len(), path);
        Ok(Self::from_rows(rows))
    }

    /// `<dir>/<entity_type>.yaml|yml|json`, whichever exists first
    pub fn locate(dir: &Path, entity_type: &str) -> Option<PathBuf> {
        let stem = entity_type.trim().to_lowercase();
        EXTENSIONS
            .iter()
            .map(|ext| dir.join(format!("{}.{}", stem, ext)))
            .find(|candidate| candidate.is_file())
    }

    pub fn get(&self, flat_type: &str) -> Option<&MigrationMapping> {
        self.index
            .get(&flat_type.trim().to_lowercase())
            .map(|i| &self.rows[*i])
    }

    pub fn rows(&self) -> &[MigrationMapping] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}
