//! Health check and relationship validation against faulty storage.

use std::sync::Arc;
use wellness_core::model::{EntityKind, Relation, User};
use wellness_core::store::{MemoryBackend, StorageBackend, Transaction, UserBundle, PROBE_DISPLAY_NAME};
use wellness_core::testing::{FlakyBackend, StrippingBackend};
use wellness_core::{StoreConfig, WellnessStore};

async fn open(backend: Arc<dyn StorageBackend>) -> WellnessStore {
    WellnessStore::open(backend, &StoreConfig::new(".")).await.unwrap()
}

#[tokio::test]
async fn test_healthy_store_with_existing_users() {
    let store = open(Arc::new(MemoryBackend::new())).await;
    store
        .save(Transaction::new().create_user(UserBundle::new(User::new("Avery").unwrap())))
        .await
        .unwrap();
    let before = store.snapshot().await;

    let report = store.health_check().await;

    assert!(report.healthy, "{:?}", report.issues);
    assert_eq!(store.snapshot().await, before);
}

#[tokio::test]
async fn test_validate_relationships_passes() {
    let store = open(Arc::new(MemoryBackend::new())).await;
    store.validate_relationships().await.unwrap();
    assert!(store.users().await.is_empty());
}

#[tokio::test]
async fn test_failing_writes_reported_not_raised() {
    let backend = Arc::new(FlakyBackend::new());
    let store = open(backend.clone()).await;
    backend.fail_always();

    let report = store.health_check().await;

    assert!(!report.healthy);
    // Round trip plus one issue per relationship
    assert_eq!(report.issues.len(), 1 + Relation::ALL.len());
    assert!(report.issues[0].starts_with("round trip failed"));
    assert!(store.users().await.is_empty());
}

#[tokio::test]
async fn test_lost_marbles_name_the_relationship() {
    let store = open(Arc::new(StrippingBackend::new(EntityKind::MoodMarble))).await;

    let err = store
        .validate_relation(Relation::MoodJarMarbles)
        .await
        .unwrap_err();
    assert_eq!(err.relation, Relation::MoodJarMarbles);
    assert!(err.to_string().contains("mood_jar.marbles"));

    let report = store.health_check().await;
    assert!(!report.healthy);
    assert_eq!(report.issues.len(), 1, "{:?}", report.issues);
    assert!(report.issues[0].contains("mood_jar.marbles"));

    // Probes are cleaned up even when validation fails
    assert!(store.users().await.is_empty());
}

#[tokio::test]
async fn test_interrupted_check_purged_on_open() {
    let backend = Arc::new(MemoryBackend::new());
    {
        let store = open(backend.clone()).await;
        for name in ["Leftover", "Kept"] {
            let bundle = UserBundle::new(User::new(name).unwrap());
            store.save(Transaction::new().create_user(bundle)).await.unwrap();
        }
    }

    // A health check that died mid-run leaves its flagged user behind
    let bytes = backend.document().await.unwrap();
    let mut document: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    for node in document["graph"]["nodes"].as_array_mut().unwrap() {
        if node["record"]["display_name"] == "Leftover" {
            node["record"]["probe"] = true.into();
        }
    }
    backend.write(&serde_json::to_vec(&document).unwrap()).await.unwrap();

    let store = open(backend.clone()).await;
    let users = store.users().await;
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].display_name(), "Kept");
    assert_eq!(store.reload_from_backend().await.unwrap().users().len(), 1);
}

#[tokio::test]
async fn test_reserved_name_cannot_hide_a_real_user() {
    let backend = Arc::new(MemoryBackend::new());
    let store = open(backend.clone()).await;

    let bundle = UserBundle::new(User::new(PROBE_DISPLAY_NAME).unwrap());
    assert!(store.save(Transaction::new().create_user(bundle)).await.is_err());
    let bundle = UserBundle::new(User::new("Avery").unwrap());
    store.save(Transaction::new().create_user(bundle)).await.unwrap();

    let reopened = open(backend).await;
    assert_eq!(reopened.users().await.len(), 1);
}
