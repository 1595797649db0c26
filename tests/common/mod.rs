//! Shared setup: a session over the repository's taxonomies and mapping
//! tables, with in-memory baselines and audit records.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use records_taxonomy::{InMemoryAuditSink, InMemoryBaselineStore, TaxonomyConfig, TaxonomySession};

pub const ENTITY_TYPES: [&str; 3] = ["household", "individual", "trust"];

pub fn repo_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

pub struct TestSession {
    pub session: TaxonomySession,
    pub baselines: Arc<InMemoryBaselineStore>,
    pub audit: Arc<InMemoryAuditSink>,
    _scratch: tempfile::TempDir,
}

/// US session over `taxonomies/` and `mappings/`; nothing touches the repo
pub fn open_session() -> TestSession {
    let scratch = tempfile::tempdir().expect("scratch dir");
    let config = TaxonomyConfig::rooted_at(repo_root())
        .with_country("US")
        .with_audit_dir(scratch.path().join("audit"))
        .with_state_dir(scratch.path().join("state"));

    let baselines = Arc::new(InMemoryBaselineStore::new());
    let audit = Arc::new(InMemoryAuditSink::new());
    let session = TaxonomySession::open(config)
        .expect("open session")
        .with_baselines(baselines.clone())
        .with_audit_sink(audit.clone());

    TestSession {
        session,
        baselines,
        audit,
        _scratch: scratch,
    }
}
