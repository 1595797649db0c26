//! Runtime configuration
//!
//! Everything is read from the environment, optionally seeded from a `.env`
//! file via `from_env()`.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

pub const DEFAULT_COUNTRY: &str = "US";
const DEFAULT_STORE_TIMEOUT_SECS: u64 = 30;

/// Where definitions, mapping tables and run state live, and which country
/// the session provisions for
#[derive(Debug, Clone)]
pub struct TaxonomyConfig {
    pub taxonomy_dir: PathBuf,
    pub mapping_dir: PathBuf,
    pub audit_dir: PathBuf,
    /// Holds the retention baseline file
    pub state_dir: PathBuf,
    pub country: String,
}

impl Default for TaxonomyConfig {
    fn default() -> Self {
        Self {
            taxonomy_dir: env_path("TAXONOMY_DIR", "taxonomies"),
            mapping_dir: env_path("TAXONOMY_MAPPING_DIR", "mappings"),
            audit_dir: env_path("TAXONOMY_AUDIT_DIR", ".taxonomy/audit"),
            state_dir: env_path("TAXONOMY_STATE_DIR", ".taxonomy/state"),
            country: normalize_country(
                &std::env::var("TAXONOMY_COUNTRY").unwrap_or_else(|_| DEFAULT_COUNTRY.to_string()),
            ),
        }
    }
}

impl TaxonomyConfig {
    /// Load `.env` (if present) then read the environment
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::default()
    }

    /// All paths relative to `root`, country left at its default
    pub fn rooted_at(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            taxonomy_dir: root.join("taxonomies"),
            mapping_dir: root.join("mappings"),
            audit_dir: root.join(".taxonomy").join("audit"),
            state_dir: root.join(".taxonomy").join("state"),
            country: DEFAULT_COUNTRY.to_string(),
        }
    }

    pub fn with_country(mut self, country: &str) -> Self {
        self.country = normalize_country(country);
        self
    }

    pub fn with_taxonomy_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.taxonomy_dir = dir.into();
        self
    }

    pub fn with_mapping_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.mapping_dir = dir.into();
        self
    }

    pub fn with_audit_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.audit_dir = dir.into();
        self
    }

    pub fn with_state_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.state_dir = dir.into();
        self
    }
}

/// Connection settings for the HTTP document store
#[derive(Debug, Clone)]
pub struct DocumentStoreConfig {
    pub base_url: String,
    pub token: Option<String>,
    /// Passed to the HTTP client; the orchestration layer never retries
    pub timeout: Duration,
}

impl DocumentStoreConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            timeout: Duration::from_secs(DEFAULT_STORE_TIMEOUT_SECS),
        }
    }

    /// Read `DOCUMENT_STORE_URL` (required), `DOCUMENT_STORE_TOKEN` and
    /// `DOCUMENT_STORE_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let base_url = std::env::var("DOCUMENT_STORE_URL")
            .context("DOCUMENT_STORE_URL environment variable not set")?;
        let timeout = std::env::var("DOCUMENT_STORE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_STORE_TIMEOUT_SECS);

        Ok(Self {
            base_url,
            token: std::env::var("DOCUMENT_STORE_TOKEN")
                .ok()
                .filter(|t| !t.trim().is_empty()),
            timeout: Duration::from_secs(timeout),
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

fn env_path(var: &str, default: &str) -> PathBuf {
    std::env::var(var)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(default))
}

pub(crate) fn normalize_country(country: &str) -> String {
    country.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rooted_at() {
        let config = TaxonomyConfig::rooted_at("/srv/records");
        assert_eq!(config.taxonomy_dir, PathBuf::from("/srv/records/taxonomies"));
        assert_eq!(config.mapping_dir, PathBuf::from("/srv/records/mappings"));
        assert_eq!(
            config.audit_dir,
            PathBuf::from("/srv/records/.taxonomy/audit")
        );
        assert_eq!(config.country, "US");
    }

    #[test]
    fn test_country_is_normalized() {
        let config = TaxonomyConfig::rooted_at("/tmp").with_country(" gb ");
        assert_eq!(config.country, "GB");
    }

    #[test]
    fn test_store_config_defaults() {
        let config = DocumentStoreConfig::new("http://localhost:8000").with_token("abc");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.token.as_deref(), Some("abc"));
    }
}
