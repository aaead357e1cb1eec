//! Round trips through real storage: file backend, cascade delete,
//! commit atomicity and the schema gate.

use chrono::{Duration, TimeZone, Utc};
use std::sync::Arc;
use tempfile::TempDir;
use wellness_core::model::{EmotionKind, EntityRef, MoodMarble, PantherLevel, PhysicalData, Relation, User};
use wellness_core::store::{FileBackend, MemoryBackend, StorageBackend, Transaction, UserBundle, SCHEMA_VERSION};
use wellness_core::testing::{assert_user_gone, FlakyBackend, TestHarness};
use wellness_core::{ActivityKind, MigrationError, SleepQuality, StoreConfig, StoreError, WellnessStore};

fn config(dir: &TempDir) -> StoreConfig {
    StoreConfig::new(dir.path())
}

#[tokio::test]
async fn test_user_graph_survives_reopen() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = config(&temp_dir);

    let bundle = UserBundle::new(User::new("Avery").unwrap().with_nickname("Ave"))
        .with_physical_data(PhysicalData::new(172.0, 64.5, 4).unwrap());
    let handles = bundle.handles();
    let original = {
        let store = WellnessStore::open_file(&config).await.unwrap();
        let mut tx = Transaction::new().create_user(bundle);
        for (emotion, intensity) in [
            (EmotionKind::Happy, 0.8),
            (EmotionKind::Grateful, 0.9),
            (EmotionKind::Peaceful, 0.7),
        ] {
            tx = tx.add_marble(handles.mood_jar, MoodMarble::new(emotion, intensity).unwrap());
        }
        store
            .save(tx.award_experience(handles.progress, 150))
            .await
            .unwrap();
        store.user_graph(handles.user).await.unwrap()
    };

    let store = WellnessStore::open_file(&config).await.unwrap();
    let reloaded = store.user_graph(handles.user).await.unwrap();

    assert_eq!(reloaded, original);
    assert_eq!(reloaded.user.nickname(), Some("Ave"));
    assert_eq!(reloaded.physical.height_cm(), 172.0);
    assert_eq!(reloaded.mood.len(), 3);
    let current = reloaded.mood.current_mood().unwrap();
    assert_eq!(current.emotion, EmotionKind::Peaceful);
    assert_eq!(current.intensity, 0.7);
    assert_eq!(reloaded.progress.experience_points(), 150);
    assert_eq!(reloaded.progress.current_level(), PantherLevel::Young);
}

#[tokio::test]
async fn test_document_carries_schema_version() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = config(&temp_dir);
    let store = WellnessStore::open_file(&config).await.unwrap();
    store
        .save(Transaction::new().create_user(UserBundle::new(User::new("Sol").unwrap())))
        .await
        .unwrap();

    let raw = std::fs::read(config.store_path()).unwrap();
    let document: serde_json::Value = serde_json::from_slice(&raw).unwrap();
    assert_eq!(document["schema_version"], SCHEMA_VERSION);
    assert!(document["graph"]["nodes"].is_array());
}

#[tokio::test]
async fn test_incompatible_schema_blocks_open() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = config(&temp_dir);
    std::fs::write(
        config.store_path(),
        br#"{"schema_version": 0, "saved_at": "2025-01-01T00:00:00Z", "graph": {"nodes": []}}"#,
    )
    .unwrap();

    let err = WellnessStore::open_file(&config).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::Migration(MigrationError::Incompatible { expected, found: 0 }) if expected == SCHEMA_VERSION
    ));
}

#[tokio::test]
async fn test_corrupt_graph_refused() {
    let backend = Arc::new(MemoryBackend::with_document(format!(
        r#"{{"schema_version": {SCHEMA_VERSION}, "saved_at": "2025-01-01T00:00:00Z", "graph": {{"nodes": [{{"record": {{"kind": "journal_entry"}}}}]}}}}"#
    )));
    let err = WellnessStore::open(backend, &StoreConfig::new(".")).await.unwrap_err();
    assert!(matches!(err, StoreError::Corrupt(_)));
}

#[tokio::test]
async fn test_invalid_stored_record_refused() {
    let harness = TestHarness::new().await.unwrap();
    let user = harness.user("Avery").await.unwrap().user;
    let bed = Utc.with_ymd_and_hms(2026, 1, 1, 22, 0, 0).unwrap();
    harness
        .tracker
        .log_sleep(user, bed, bed + Duration::hours(8), SleepQuality::Good, None)
        .await
        .unwrap();

    // Move the wake time to before bed time behind the store's back
    let bytes = harness.backend.document().await.unwrap();
    let mut document: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    let nodes = document["graph"]["nodes"].as_array_mut().unwrap();
    let sleep = nodes
        .iter_mut()
        .find(|node| node["record"]["kind"] == "sleep_data")
        .unwrap();
    sleep["record"]["wake_time"] = serde_json::json!("2025-12-31T06:00:00Z");
    harness
        .backend
        .write(&serde_json::to_vec(&document).unwrap())
        .await
        .unwrap();

    let err = harness.reopen().await.unwrap_err();
    assert!(matches!(err, StoreError::Corrupt(_)));
}

#[tokio::test]
async fn test_delete_user_cascades_everywhere() {
    let harness = TestHarness::new().await.unwrap();
    let handles = harness.user("Avery").await.unwrap();
    let user = handles.user;

    harness
        .tracker
        .log_activity(user, ActivityKind::Swimming, 45, 400.0)
        .await
        .unwrap();
    harness.tracker.add_mood(user, EmotionKind::Tired, 0.3).await.unwrap();
    harness
        .tracker
        .check_in_emotion(user, EmotionKind::Stressed, 0.7, &[("Why?", "Deadlines")])
        .await
        .unwrap();
    harness.tracker.write_journal(user, "Long day").await.unwrap();
    let other = harness.user("Sol").await.unwrap().user;

    let owned: Vec<EntityRef> = harness
        .store()
        .snapshot()
        .await
        .subtree(EntityRef::User(user));
    assert_eq!(owned.len(), 9);

    let removed = harness.tracker.delete_user(user).await.unwrap();

    assert_eq!(removed.len(), owned.len());
    assert_user_gone(&harness, user, &owned).await;
    assert_eq!(harness.record_count(other).await, 4);
}

#[tokio::test]
async fn test_failed_write_leaves_committed_state() {
    let backend = Arc::new(FlakyBackend::new());
    let store = WellnessStore::open(backend.clone(), &StoreConfig::new(".")).await.unwrap();
    let bundle = UserBundle::new(User::new("Avery").unwrap());
    let handles = bundle.handles();
    store.save(Transaction::new().create_user(bundle)).await.unwrap();
    let before = store.snapshot().await;
    let document_before = backend.document().await;

    backend.fail_next(1);
    let err = store
        .save(
            Transaction::new()
                .add_marble(handles.mood_jar, MoodMarble::new(EmotionKind::Happy, 0.4).unwrap())
                .award_experience(handles.progress, 40),
        )
        .await
        .unwrap_err();

    assert!(err.is_commit_failure());
    assert_eq!(store.snapshot().await, before);
    assert_eq!(backend.document().await, document_before);
    assert!(store.children(handles.mood_jar, Relation::MoodJarMarbles).await.is_empty());
    assert_eq!(store.progress(handles.user).await.unwrap().experience_points(), 0);

    // The next write goes through
    store
        .save(Transaction::new().award_experience(handles.progress, 40))
        .await
        .unwrap();
    assert_eq!(store.progress(handles.user).await.unwrap().experience_points(), 40);
}

#[tokio::test]
async fn test_reopen_recomputes_levels_for_new_thresholds() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let backend = Arc::new(FileBackend::new(temp_dir.path().join("wellness.json")));
    let bundle = UserBundle::new(User::new("Avery").unwrap());
    let handles = bundle.handles();
    {
        let store = WellnessStore::open(backend.clone(), &StoreConfig::new(".")).await.unwrap();
        store
            .save(Transaction::new().create_user(bundle).award_experience(handles.progress, 150))
            .await
            .unwrap();
    }

    let stricter = StoreConfig::new(".").with_thresholds(wellness_core::LevelThresholds::new(200, 800).unwrap());
    let store = WellnessStore::open(backend, &stricter).await.unwrap();

    let progress = store.progress(handles.user).await.unwrap();
    assert_eq!(progress.experience_points(), 150);
    assert_eq!(progress.current_level(), PantherLevel::Cub);
}
