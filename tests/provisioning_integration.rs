//! Install and update against an in-memory document store

mod common;

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use common::{open_session, repo_root};
use records_taxonomy::provisioning::RetentionChangeKind;
use records_taxonomy::{
    BaselineStore, DocumentStore, InMemoryBaselineStore, InMemoryDocumentStore, InstallOptions, ProvisionStep,
    TaxonomyConfig, TaxonomySession, UpdateOptions,
};

async fn tag_names(store: &InMemoryDocumentStore) -> Vec<String> {
    store
        .list_tags()
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.name)
        .collect()
}

async fn assert_store_empty_except_tags(store: &InMemoryDocumentStore, tags: &[&str]) {
    assert_eq!(tag_names(store).await, tags);
    assert!(store.list_document_types().await.unwrap().is_empty());
    assert!(store.list_storage_paths().await.unwrap().is_empty());
    assert!(store.list_custom_fields().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_install_everything_into_empty_store() {
    let ts = open_session();
    let store = Arc::new(InMemoryDocumentStore::new());

    let result = ts
        .session
        .installer(store.clone())
        .install(InstallOptions::new())
        .await
        .unwrap();

    assert_eq!(result.country, "US");
    assert_eq!(result.entity_types, vec!["household", "individual", "trust"]);
    assert_eq!(
        result.installed.storage_paths,
        vec!["/household", "/individual", "/trust"]
    );
    assert_eq!(
        result.installed.custom_fields,
        vec!["Individual Name", "Trust Name"]
    );
    assert!(result.skipped.is_empty());

    let expected_types: BTreeSet<String> = ts
        .session
        .registry()
        .trees()
        .flat_map(|tree| tree.all_document_types())
        .collect();
    let stored_types: BTreeSet<String> = store
        .list_document_types()
        .await
        .unwrap()
        .into_iter()
        .map(|dt| dt.name)
        .collect();
    assert_eq!(stored_types, expected_types);
    assert_eq!(store.list_tags().await.unwrap().len(), result.installed.tag_count());
    assert_eq!(ts.baselines.len().await, 3);
}

#[tokio::test]
async fn test_colliding_tag_is_skipped_not_created() {
    let ts = open_session();
    let store = Arc::new(InMemoryDocumentStore::new().with_tag("HealthManagement"));

    let result = ts
        .session
        .installer(store.clone())
        .install(InstallOptions::new().with_entity_types(["household"]))
        .await
        .unwrap();

    assert!(result.skipped.tags.contains(&"HealthManagement".to_string()));
    assert!(!result.installed.tags.contains(&"HealthManagement".to_string()));
    let names = tag_names(&store).await;
    assert_eq!(
        names.iter().filter(|n| n.as_str() == "HealthManagement").count(),
        1
    );
}

#[tokio::test]
async fn test_failure_partway_rolls_back_everything_created() {
    let ts = open_session();
    let store = Arc::new(InMemoryDocumentStore::new().fail_on_create("Form1041"));

    let err = ts
        .session
        .installer(store.clone())
        .install(InstallOptions::new())
        .await
        .unwrap_err();

    assert_eq!(err.step, ProvisionStep::DocumentTypes);
    assert_eq!(err.entity_type.as_deref(), Some("trust"));
    assert_eq!(err.country, "US");
    assert!(err.rolled_back > 0);
    assert_eq!(err.rolled_back, store.create_calls());
    assert_eq!(store.delete_calls(), store.create_calls());

    assert_store_empty_except_tags(&store, &[]).await;
    assert!(ts.baselines.is_empty().await);
}

#[tokio::test]
async fn test_rollback_keeps_preexisting_colliding_tag() {
    let ts = open_session();
    let store = Arc::new(
        InMemoryDocumentStore::new()
            .with_tag("taxation")
            .fail_on_create("Trust Name"),
    );

    let err = ts
        .session
        .installer(store.clone())
        .install(InstallOptions::new())
        .await
        .unwrap_err();

    assert_eq!(err.step, ProvisionStep::CustomFields);
    assert_store_empty_except_tags(&store, &["taxation"]).await;
}

#[tokio::test]
async fn test_update_installs_only_new_entity_types() {
    let ts = open_session();
    let store = Arc::new(InMemoryDocumentStore::new());

    ts.session
        .installer(store.clone())
        .install(InstallOptions::new().with_entity_types(["household"]))
        .await
        .unwrap();

    let updater = ts.session.updater(store.clone());
    let diff = updater.detect_changes(&UpdateOptions::new()).await.unwrap();
    assert!(diff.has_changes);
    assert_eq!(diff.new_storage_paths, vec!["/individual", "/trust"]);
    assert!(!diff.new_tags.contains(&"HealthManagement".to_string()));
    assert!(diff.retention_changes.is_empty());

    let result = updater.update(UpdateOptions::new()).await.unwrap();
    assert!(!result.requires_manual_review);
    assert_eq!(result.installed.storage_paths, diff.new_storage_paths);
    assert_eq!(result.installed.tags, diff.new_tags);

    let settled = updater.detect_changes(&UpdateOptions::new()).await.unwrap();
    assert!(!settled.has_changes);
}

fn copy_taxonomies(to: &Path) {
    let dir = to.join("taxonomies");
    std::fs::create_dir_all(&dir).unwrap();
    for entry in std::fs::read_dir(repo_root().join("taxonomies")).unwrap() {
        let entry = entry.unwrap();
        std::fs::copy(entry.path(), dir.join(entry.file_name())).unwrap();
    }
}

fn session_at(root: &Path, baselines: Arc<InMemoryBaselineStore>) -> TaxonomySession {
    TaxonomySession::open(TaxonomyConfig::rooted_at(root).with_country("US"))
        .unwrap()
        .with_baselines(baselines)
}

#[tokio::test]
async fn test_retention_change_halts_until_approved() {
    let root = tempfile::tempdir().unwrap();
    copy_taxonomies(root.path());
    let baselines = Arc::new(InMemoryBaselineStore::new());
    let store = Arc::new(InMemoryDocumentStore::new());

    session_at(root.path(), baselines.clone())
        .installer(store.clone())
        .install(InstallOptions::new())
        .await
        .unwrap();

    let household = root.path().join("taxonomies").join("household.yaml");
    let revised = std::fs::read_to_string(&household)
        .unwrap()
        .replace("authority: Household practice", "authority: Household practice (revised)")
        .replace("version: \"2024.1\"", "version: \"2024.2\"");
    std::fs::write(&household, revised).unwrap();

    let session = session_at(root.path(), baselines.clone());
    let updater = session.updater(store.clone());
    let creates = store.create_calls();

    let diff = updater.detect_changes(&UpdateOptions::new()).await.unwrap();
    assert!(diff.has_changes);
    assert!(!diff.has_new_resources());
    assert_eq!(diff.retention_changes.len(), 1);
    let change = &diff.retention_changes[0];
    assert_eq!(change.entity_type, "household");
    assert_eq!(change.path, "HouseholdOperations/Utilities/UtilityBills");
    assert_eq!(change.kind(), RetentionChangeKind::Changed);

    let halted = updater.update(UpdateOptions::new()).await.unwrap();
    assert!(halted.requires_manual_review);
    assert_eq!(store.create_calls(), creates);
    let before = baselines.load("household", "US").await.unwrap().unwrap();
    assert_eq!(before.version, "2024.1");

    let approved = updater
        .update(UpdateOptions::new().with_auto_approve(true))
        .await
        .unwrap();
    assert!(!approved.requires_manual_review);
    assert_eq!(approved.retention_changes.len(), 1);
    let after = baselines.load("household", "US").await.unwrap().unwrap();
    assert_eq!(after.version, "2024.2");

    // The new version is now the installed one
    let again = session
        .installer(store)
        .install(InstallOptions::new().with_entity_types(["household"]))
        .await
        .unwrap();
    assert_eq!(again.already_installed, vec!["household"]);
}
