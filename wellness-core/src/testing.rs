//! Testing utilities for the wellness core.
//!
//! This module provides tools for integration testing:
//! - `FixedClock` for deterministic days and timestamps
//! - `FlakyBackend` and `StrippingBackend` for injecting storage faults
//! - `TestHarness` for scripted tracker scenarios
//! - Assertion helpers for verifying store state

use crate::clock::Clock;
use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::model::{EntityKind, EntityRef, PantherLevel, UserId};
use crate::store::{Criteria, MemoryBackend, StorageBackend, UserHandles, WellnessStore};
use crate::tracker::Tracker;
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use std::io;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct FixedClock {
    millis: Arc<AtomicI64>,
}

impl FixedClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            millis: Arc::new(AtomicI64::new(now.timestamp_millis())),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        self.millis.store(now.timestamp_millis(), Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        self.millis.fetch_add(by.num_milliseconds(), Ordering::SeqCst);
    }

    pub fn advance_days(&self, days: i64) {
        self.advance(Duration::days(days));
    }
}

impl Default for FixedClock {
    fn default() -> Self {
        Self::at(Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).single().unwrap_or_default())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.millis.load(Ordering::SeqCst)).unwrap_or_default()
    }

    /// Days follow UTC so tests do not depend on the host time zone.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// In-memory backend whose writes can be made to fail.
#[derive(Debug, Default)]
pub struct FlakyBackend {
    inner: MemoryBackend,
    failures: AtomicUsize,
}

impl FlakyBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` writes.
    pub fn fail_next(&self, count: usize) {
        self.failures.store(count, Ordering::SeqCst);
    }

    /// Fail every write until [`FlakyBackend::heal`].
    pub fn fail_always(&self) {
        self.failures.store(usize::MAX, Ordering::SeqCst);
    }

    pub fn heal(&self) {
        self.failures.store(0, Ordering::SeqCst);
    }

    pub async fn document(&self) -> Option<Vec<u8>> {
        self.inner.document().await
    }
}

#[async_trait]
impl StorageBackend for FlakyBackend {
    async fn read(&self) -> io::Result<Option<Vec<u8>>> {
        self.inner.read().await
    }

    async fn write(&self, bytes: &[u8]) -> io::Result<()> {
        let armed = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| match n {
                0 => None,
                usize::MAX => Some(usize::MAX),
                n => Some(n - 1),
            })
            .is_ok();
        if armed {
            return Err(io::Error::other("injected write failure"));
        }
        self.inner.write(bytes).await
    }

    fn describe(&self) -> String {
        "flaky memory".to_string()
    }
}

/// In-memory backend that silently drops every record of one kind (and
/// the links to it) on write, simulating a storage layer that loses data.
#[derive(Debug)]
pub struct StrippingBackend {
    inner: MemoryBackend,
    kind: EntityKind,
}

impl StrippingBackend {
    pub fn new(kind: EntityKind) -> Self {
        Self {
            inner: MemoryBackend::new(),
            kind,
        }
    }

    fn strip(&self, bytes: &[u8]) -> io::Result<Vec<u8>> {
        let mut document: serde_json::Value = serde_json::from_slice(bytes)?;
        let kind = self.kind.name();
        if let Some(nodes) = document
            .pointer_mut("/graph/nodes")
            .and_then(serde_json::Value::as_array_mut)
        {
            nodes.retain(|node| node["record"]["kind"] != kind);
            for node in nodes.iter_mut() {
                if let Some(children) = node
                    .get_mut("children")
                    .and_then(serde_json::Value::as_array_mut)
                {
                    children.retain(|child| child["kind"] != kind);
                }
            }
        }
        Ok(serde_json::to_vec(&document)?)
    }
}

#[async_trait]
impl StorageBackend for StrippingBackend {
    async fn read(&self) -> io::Result<Option<Vec<u8>>> {
        self.inner.read().await
    }

    async fn write(&self, bytes: &[u8]) -> io::Result<()> {
        let stripped = self.strip(bytes)?;
        self.inner.write(&stripped).await
    }

    fn describe(&self) -> String {
        format!("memory without {}", self.kind)
    }
}

/// A tracker over an in-memory store on a fixed clock.
pub struct TestHarness {
    pub backend: Arc<MemoryBackend>,
    pub clock: FixedClock,
    pub tracker: Tracker<FixedClock>,
    config: StoreConfig,
}

impl TestHarness {
    pub async fn new() -> Result<Self, StoreError> {
        Self::with_config(StoreConfig::new(".")).await
    }

    pub async fn with_config(config: StoreConfig) -> Result<Self, StoreError> {
        let backend = Arc::new(MemoryBackend::new());
        let store = WellnessStore::open(backend.clone(), &config).await?;
        let clock = FixedClock::default();
        let tracker = Tracker::with_clock(Arc::new(store), clock.clone()).with_rewards(config.rewards);
        Ok(Self {
            backend,
            clock,
            tracker,
            config,
        })
    }

    pub fn store(&self) -> &WellnessStore {
        self.tracker.store()
    }

    /// Register a user.
    pub async fn user(&self, name: &str) -> Result<UserHandles, StoreError> {
        self.tracker.register(name, None).await
    }

    /// Open a second store over the same backend, as after a restart.
    pub async fn reopen(&self) -> Result<WellnessStore, StoreError> {
        WellnessStore::open(self.backend.clone(), &self.config).await
    }

    pub fn next_day(&self) {
        self.clock.advance_days(1);
    }

    pub async fn level(&self, user: UserId) -> Option<PantherLevel> {
        self.store().progress(user).await.ok().map(|p| p.current_level())
    }

    /// Records in `user`'s subtree, the user included.
    pub async fn record_count(&self, user: UserId) -> usize {
        self.store().fetch(&Criteria::all().within_user(user)).await.len()
    }
}

/// Assert that nothing owned by `user` remains, in memory or in storage.
pub async fn assert_user_gone(harness: &TestHarness, user: UserId, owned: &[EntityRef]) {
    assert_eq!(harness.record_count(user).await, 0, "Expected no records under {user}");
    let reloaded = harness
        .store()
        .reload_from_backend()
        .await
        .expect("reload should succeed");
    for entity in owned {
        assert!(harness.store().get(*entity).await.is_none(), "Expected {entity} to be deleted");
        assert!(!reloaded.contains(*entity), "Expected {entity} to be gone from storage");
    }
}

/// Assert the user's panther level.
pub async fn assert_level(harness: &TestHarness, user: UserId, level: PantherLevel) {
    assert_eq!(harness.level(user).await, Some(level), "Expected panther level {}", level.name());
}
