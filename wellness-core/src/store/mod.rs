//! Persistence gateway for the entity graph.
//!
//! A [`WellnessStore`] holds the committed graph in memory and mirrors it to a
//! [`StorageBackend`]. Writers go through [`WellnessStore::save`]: the
//! transaction is applied to a staged copy, the copy is written to the
//! backend, and only then does it replace the visible graph. A failure at
//! any step leaves the committed state exactly as it was.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use wellness_core::model::User;
//! use wellness_core::store::{MemoryBackend, Transaction, UserBundle, WellnessStore};
//! use wellness_core::StoreConfig;
//!
//! # async fn example() -> Result<(), wellness_core::StoreError> {
//! let store = WellnessStore::open(Arc::new(MemoryBackend::new()), &StoreConfig::default()).await?;
//! let bundle = UserBundle::new(User::new("Avery")?);
//! let handles = bundle.handles();
//! store.save(Transaction::new().create_user(bundle)).await?;
//! store.save(Transaction::new().award_experience(handles.progress, 150)).await?;
//! # Ok(())
//! # }
//! ```

mod backend;
mod criteria;
mod graph;
mod health;
pub mod migration;
mod transaction;
mod view;

pub use backend::{FileBackend, MemoryBackend, StorageBackend};
pub use criteria::Criteria;
pub use graph::EntityGraph;
pub use health::{HealthReport, PROBE_DISPLAY_NAME};
pub use migration::{MigrationGuard, SchemaStatus, SCHEMA_VERSION};
pub use transaction::{CommitReceipt, Mutation, ProgressEvent, Transaction, UserBundle, UserHandles};
pub use view::{EmotionCheckIn, UserGraph};

use crate::config::StoreConfig;
use crate::error::{CommitError, GraphError, PreconditionError, StoreError, ValidationError};
use crate::model::{
    Cardinality, EntityKind, EntityRef, MoodMarble, PantherProgress, ProgressId, Record, Relation,
    User, UserId,
};
use crate::mood::{overflow, MoodJarView};
use crate::progression::ProgressionEngine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// The persisted document.
#[derive(Debug, Serialize, Deserialize)]
struct StoreDocument {
    schema_version: u32,
    saved_at: DateTime<Utc>,
    graph: EntityGraph,
}

/// Transactional access to the entity graph.
pub struct WellnessStore {
    backend: Arc<dyn StorageBackend>,
    state: RwLock<EntityGraph>,
    engine: ProgressionEngine,
    mood_retention: usize,
}

impl WellnessStore {
    /// Open a store over `backend`.
    ///
    /// Runs the migration guard before touching the graph, rebuilds the
    /// ownership index, brings stored levels in line with the configured
    /// thresholds, and purges probe records left by an interrupted check.
    pub async fn open(backend: Arc<dyn StorageBackend>, config: &StoreConfig) -> Result<Self, StoreError> {
        let bytes = backend.read().await?;
        let status = MigrationGuard::new().check(bytes.as_deref())?;

        let graph = match bytes {
            Some(bytes) => {
                let document: StoreDocument = serde_json::from_slice(&bytes).map_err(StoreError::Corrupt)?;
                document.graph
            }
            None => EntityGraph::new(),
        };

        info!(
            backend = %backend.describe(),
            ?status,
            records = graph.len(),
            users = graph.users().len(),
            "opened wellness store"
        );

        let store = Self {
            backend,
            state: RwLock::new(graph),
            engine: ProgressionEngine::new(config.thresholds),
            mood_retention: config.mood_retention.max(1),
        };

        let purged = store.purge_probes().await?;
        if purged > 0 {
            warn!(purged, "removed probe users left by an interrupted health check");
        }
        store.reconcile_levels().await?;
        Ok(store)
    }

    /// Open the JSON file store described by `config`.
    pub async fn open_file(config: &StoreConfig) -> Result<Self, StoreError> {
        let backend = Arc::new(FileBackend::new(config.store_path()));
        Self::open(backend, config).await
    }

    pub fn engine(&self) -> &ProgressionEngine {
        &self.engine
    }

    pub fn mood_retention(&self) -> usize {
        self.mood_retention
    }

    /// Where the document lives.
    pub fn location(&self) -> String {
        self.backend.describe()
    }

    /// Apply `tx` all-or-nothing.
    pub async fn save(&self, tx: Transaction) -> Result<CommitReceipt, StoreError> {
        let mut receipt = CommitReceipt::new();
        let count = tx.len();
        self.commit_with(|graph| {
            for mutation in tx.into_mutations() {
                self.apply(graph, mutation, &mut receipt)?;
            }
            Ok(())
        })
        .await?;

        debug!(
            mutations = count,
            inserted = receipt.inserted.len(),
            updated = receipt.updated.len(),
            removed = receipt.removed.len(),
            evicted = receipt.evicted.len(),
            "committed transaction"
        );
        Ok(receipt)
    }

    /// Delete `entity` and everything it owns.
    pub async fn delete(&self, entity: impl Into<EntityRef>) -> Result<Vec<EntityRef>, StoreError> {
        let receipt = self.save(Transaction::new().delete(entity)).await?;
        Ok(receipt.removed)
    }

    /// Records matching `criteria`. No side effects.
    pub async fn fetch(&self, criteria: &Criteria) -> Vec<Record> {
        criteria.select(&*self.state.read().await)
    }

    pub async fn get(&self, entity: impl Into<EntityRef>) -> Option<Record> {
        self.state.read().await.get(entity.into()).cloned()
    }

    pub async fn user(&self, id: UserId) -> Option<User> {
        self.state
            .read()
            .await
            .get(id.into())
            .and_then(Record::as_user)
            .cloned()
    }

    /// All users, oldest first.
    pub async fn users(&self) -> Vec<User> {
        let graph = self.state.read().await;
        graph
            .users()
            .into_iter()
            .filter_map(|id| graph.get(id.into()).and_then(Record::as_user).cloned())
            .collect()
    }

    /// Owner of `entity`, derived from the owner's collection.
    pub async fn owner_of(&self, entity: impl Into<EntityRef>) -> Option<EntityRef> {
        self.state.read().await.owner_of(entity.into())
    }

    /// Children of `parent` through `relation`, in insertion order.
    pub async fn children(&self, parent: impl Into<EntityRef>, relation: Relation) -> Vec<Record> {
        self.state
            .read()
            .await
            .children_of(parent.into(), relation)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Ids of `user` and its one-to-one children.
    pub async fn handles(&self, user: UserId) -> Result<UserHandles, StoreError> {
        Ok(handles_in(&*self.state.read().await, user)?)
    }

    /// `user` and everything it owns.
    pub async fn user_graph(&self, user: UserId) -> Result<UserGraph, StoreError> {
        let graph = self.state.read().await;
        Ok(UserGraph::assemble(&graph, user, self.mood_retention)?)
    }

    pub async fn mood_jar(&self, user: UserId) -> Result<MoodJarView, StoreError> {
        let graph = self.state.read().await;
        Ok(view::mood_jar_view(&graph, user, self.mood_retention)?)
    }

    pub async fn progress(&self, user: UserId) -> Result<PantherProgress, StoreError> {
        let graph = self.state.read().await;
        let handles = handles_in(&graph, user)?;
        Ok(ledger(&graph, handles.progress)?)
    }

    /// Copy of the committed graph.
    pub async fn snapshot(&self) -> EntityGraph {
        self.state.read().await.clone()
    }

    /// Read and decode the graph as the backend currently holds it.
    pub async fn reload_from_backend(&self) -> Result<EntityGraph, StoreError> {
        let Some(bytes) = self.backend.read().await? else {
            return Ok(EntityGraph::new());
        };
        MigrationGuard::new().check(Some(&bytes))?;
        let document: StoreDocument = serde_json::from_slice(&bytes).map_err(StoreError::Corrupt)?;
        Ok(document.graph)
    }

    /// Stage, write, publish. Holds the write lock throughout so writers
    /// are serialized and readers only see published graphs.
    async fn commit_with<T>(
        &self,
        stage: impl FnOnce(&mut EntityGraph) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut state = self.state.write().await;
        let mut staged = state.clone();
        let out = stage(&mut staged)?;
        staged.check_complete()?;
        self.persist(&staged).await?;
        *state = staged;
        Ok(out)
    }

    async fn persist(&self, graph: &EntityGraph) -> Result<(), CommitError> {
        let document = StoreDocument {
            schema_version: SCHEMA_VERSION,
            saved_at: Utc::now(),
            graph: graph.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&document)?;
        if let Err(e) = self.backend.write(&bytes).await {
            warn!(backend = %self.backend.describe(), error = %e, "store write failed");
            return Err(e.into());
        }
        Ok(())
    }

    fn apply(
        &self,
        graph: &mut EntityGraph,
        mutation: Mutation,
        receipt: &mut CommitReceipt,
    ) -> Result<(), StoreError> {
        match mutation {
            Mutation::Insert { parent: None, record } => {
                check_reserved(&record)?;
                receipt.inserted.push(graph.insert_root(record)?);
            }
            Mutation::Insert {
                parent: Some(parent),
                record,
            } => {
                check_reserved(&record)?;
                receipt.inserted.push(graph.insert_child(parent, record)?);
                if parent.kind() == EntityKind::MoodJar {
                    self.evict_marbles(graph, parent, receipt)?;
                }
            }
            Mutation::Update(record) => {
                if matches!(
                    record.kind(),
                    EntityKind::PhysicalActivity
                        | EntityKind::JournalEntry
                        | EntityKind::MoodMarble
                        | EntityKind::PantherProgress
                ) {
                    return Err(PreconditionError::Immutable { kind: record.kind() }.into());
                }
                check_reserved(&record)?;
                receipt.updated.push(graph.update(record)?);
            }
            Mutation::Delete(entity) => {
                let required = Relation::owning(entity.kind()).is_some_and(|r| {
                    r.parent_kind() == EntityKind::User && r.cardinality() == Cardinality::One
                });
                if required {
                    return Err(PreconditionError::RequiredRecord(entity).into());
                }
                let removed = graph.remove(entity)?;
                if removed.len() > 1 {
                    info!(%entity, cascaded = removed.len() - 1, "cascading delete");
                }
                receipt.removed.extend(removed);
            }
            Mutation::AddMarble { jar, marble } => {
                let jar = EntityRef::from(jar);
                receipt.inserted.push(graph.insert_child(jar, marble.into())?);
                self.evict_marbles(graph, jar, receipt)?;
            }
            Mutation::AwardExperience { progress, points } => {
                let mut updated = ledger(graph, progress)?;
                let gain = self.engine.add_experience(&mut updated, points)?;
                if gain.leveled_up() {
                    info!(level = gain.level.name(), total = gain.total, "panther leveled up");
                }
                receipt.updated.push(graph.update(updated.into())?);
                receipt.progress.push(ProgressEvent::Experience(gain));
            }
            Mutation::RecordDailyActivity { progress, today } => {
                let mut updated = ledger(graph, progress)?;
                let streak = self.engine.update_daily_activity(&mut updated, today);
                if streak.counted() {
                    receipt.updated.push(graph.update(updated.into())?);
                }
                receipt.progress.push(ProgressEvent::Streak(streak));
            }
        }
        Ok(())
    }

    /// Drop the oldest marbles beyond the retention bound.
    fn evict_marbles(
        &self,
        graph: &mut EntityGraph,
        jar: EntityRef,
        receipt: &mut CommitReceipt,
    ) -> Result<(), GraphError> {
        let marbles: Vec<EntityRef> = graph
            .child_refs(jar)
            .iter()
            .filter(|c| c.kind() == EntityKind::MoodMarble)
            .copied()
            .collect();
        let excess = overflow(marbles.len(), self.mood_retention);
        if excess == 0 {
            return Ok(());
        }
        debug!(%jar, evicted = excess, retention = self.mood_retention, "evicting oldest marbles");
        for marble in &marbles[..excess] {
            receipt.evicted.extend(graph.remove(*marble)?);
        }
        Ok(())
    }

    /// Recompute every stored level against the configured thresholds.
    async fn reconcile_levels(&self) -> Result<(), StoreError> {
        let stale: Vec<ProgressId> = {
            let graph = self.state.read().await;
            graph
                .records()
                .filter_map(Record::as_progress)
                .filter(|p| self.engine.level_for(p.experience_points()) != p.current_level())
                .map(PantherProgress::id)
                .collect()
        };
        if stale.is_empty() {
            return Ok(());
        }

        info!(count = stale.len(), "recomputing stored panther levels");
        self.commit_with(|graph| {
            for id in stale {
                let mut progress = ledger(graph, id)?;
                self.engine.recompute_level(&mut progress);
                graph.update(progress.into())?;
            }
            Ok(())
        })
        .await
    }
}

impl std::fmt::Debug for WellnessStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WellnessStore")
            .field("backend", &self.backend.describe())
            .field("engine", &self.engine)
            .field("mood_retention", &self.mood_retention)
            .finish_non_exhaustive()
    }
}

/// Only health-check users may carry the probe display name.
fn check_reserved(record: &Record) -> Result<(), ValidationError> {
    match record.as_user() {
        Some(user) if !user.is_probe() && user.display_name() == PROBE_DISPLAY_NAME => {
            Err(ValidationError::Reserved { field: "display_name" })
        }
        _ => Ok(()),
    }
}

/// Ids of `user` and its one-to-one children.
fn handles_in(graph: &EntityGraph, user: UserId) -> Result<UserHandles, GraphError> {
    let root = EntityRef::User(user);
    if !graph.contains(root) {
        return Err(GraphError::NotFound(root));
    }
    let child = |relation: Relation| {
        graph
            .single_child(root, relation)
            .map(Record::entity_ref)
            .ok_or(GraphError::Incomplete { user: root, relation })
    };

    match (
        child(Relation::UserPhysicalData)?,
        child(Relation::UserMoodJar)?,
        child(Relation::UserProgress)?,
    ) {
        (EntityRef::PhysicalData(physical), EntityRef::MoodJar(mood_jar), EntityRef::PantherProgress(progress)) => {
            Ok(UserHandles {
                user,
                physical,
                mood_jar,
                progress,
            })
        }
        _ => Err(GraphError::Incomplete {
            user: root,
            relation: Relation::UserPhysicalData,
        }),
    }
}

fn ledger(graph: &EntityGraph, id: ProgressId) -> Result<PantherProgress, GraphError> {
    let entity = EntityRef::from(id);
    graph
        .get(entity)
        .and_then(Record::as_progress)
        .cloned()
        .ok_or(GraphError::NotFound(entity))
}

/// Marbles of a jar, oldest first.
fn marbles_in(graph: &EntityGraph, jar: EntityRef) -> Vec<MoodMarble> {
    graph
        .children_of(jar, Relation::MoodJarMarbles)
        .into_iter()
        .filter_map(Record::as_marble)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::*;
    use chrono::NaiveDate;

    async fn store() -> WellnessStore {
        WellnessStore::open(Arc::new(MemoryBackend::new()), &StoreConfig::new("."))
            .await
            .unwrap()
    }

    async fn store_with_user(store: &WellnessStore) -> UserHandles {
        let bundle = UserBundle::new(User::new("Avery").unwrap());
        let handles = bundle.handles();
        store.save(Transaction::new().create_user(bundle)).await.unwrap();
        handles
    }

    #[tokio::test]
    async fn test_create_user_and_fetch_handles() {
        let store = store().await;
        let handles = store_with_user(&store).await;

        assert_eq!(store.handles(handles.user).await.unwrap(), handles);
        assert_eq!(store.users().await.len(), 1);
        assert_eq!(
            store.owner_of(handles.mood_jar).await,
            Some(EntityRef::User(handles.user))
        );
    }

    #[tokio::test]
    async fn test_user_without_singletons_rejected() {
        let store = store().await;
        let user = User::new("Lonely").unwrap();
        let err = store
            .save(Transaction::new().insert_root(user))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Graph(GraphError::Incomplete { .. })));
        assert!(store.users().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_mutation_rolls_back_whole_transaction() {
        let store = store().await;
        let handles = store_with_user(&store).await;

        let entry = JournalEntry::new("Walked by the river").unwrap();
        let err = store
            .save(
                Transaction::new()
                    .insert(handles.user, entry)
                    .award_experience(handles.progress, -5),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            StoreError::Precondition(PreconditionError::NegativeExperience(-5))
        ));
        let journal = store.children(handles.user, Relation::UserJournal).await;
        assert!(journal.is_empty());
    }

    #[tokio::test]
    async fn test_award_experience_commits_ledger() {
        let store = store().await;
        let handles = store_with_user(&store).await;

        let receipt = store
            .save(Transaction::new().award_experience(handles.progress, 150))
            .await
            .unwrap();

        let gain = receipt.experience().unwrap();
        assert!(gain.leveled_up());
        let progress = store.progress(handles.user).await.unwrap();
        assert_eq!(progress.experience_points(), 150);
        assert_eq!(progress.current_level(), PantherLevel::Young);
        assert_eq!(store.engine().progress_percentage(&progress), 0.125);
    }

    #[tokio::test]
    async fn test_daily_activity_same_day_is_noop() {
        let store = store().await;
        let handles = store_with_user(&store).await;
        let today = NaiveDate::from_ymd_opt(2026, 4, 2).unwrap();

        store
            .save(Transaction::new().record_daily_activity(handles.progress, today))
            .await
            .unwrap();
        let receipt = store
            .save(Transaction::new().record_daily_activity(handles.progress, today))
            .await
            .unwrap();

        assert!(receipt.updated.is_empty());
        assert_eq!(receipt.streak(), Some(crate::progression::StreakUpdate::AlreadyCounted));
        let progress = store.progress(handles.user).await.unwrap();
        assert_eq!(progress.total_wellness_activities(), 1);
        assert_eq!(progress.consecutive_days(), 1);
    }

    #[tokio::test]
    async fn test_required_children_cannot_be_deleted() {
        let store = store().await;
        let handles = store_with_user(&store).await;

        for entity in [
            EntityRef::from(handles.physical),
            EntityRef::from(handles.mood_jar),
            EntityRef::from(handles.progress),
        ] {
            let err = store.delete(entity).await.unwrap_err();
            assert!(matches!(
                err,
                StoreError::Precondition(PreconditionError::RequiredRecord(_))
            ));
        }
        assert!(store.handles(handles.user).await.is_ok());
    }

    #[tokio::test]
    async fn test_reserved_name_rejected_and_user_survives_reopen() {
        let backend = Arc::new(MemoryBackend::new());
        let config = StoreConfig::new(".");
        let store = WellnessStore::open(backend.clone(), &config).await.unwrap();

        let reserved = UserBundle::new(User::new(PROBE_DISPLAY_NAME).unwrap());
        let err = store
            .save(Transaction::new().create_user(reserved))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::Reserved { field: "display_name" })
        ));

        let handles = store_with_user(&store).await;
        let mut renamed = store.user(handles.user).await.unwrap();
        renamed.rename(PROBE_DISPLAY_NAME).unwrap();
        let err = store.save(Transaction::new().update(renamed)).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::Reserved { .. })
        ));

        let reopened = WellnessStore::open(backend, &config).await.unwrap();
        let users = reopened.users().await;
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].display_name(), "Avery");
    }

    #[tokio::test]
    async fn test_progress_cannot_be_overwritten() {
        let store = store().await;
        let handles = store_with_user(&store).await;
        let progress = store.progress(handles.user).await.unwrap();

        let err = store.save(Transaction::new().update(progress)).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Precondition(PreconditionError::Immutable {
                kind: EntityKind::PantherProgress
            })
        ));
    }

    #[tokio::test]
    async fn test_marble_retention_evicts_in_same_commit() {
        let config = StoreConfig::new(".").with_mood_retention(2);
        let store = WellnessStore::open(Arc::new(MemoryBackend::new()), &config)
            .await
            .unwrap();
        let handles = store_with_user(&store).await;

        let mut first = None;
        for intensity in [0.1, 0.2, 0.3] {
            let marble = MoodMarble::new(EmotionKind::Neutral, intensity).unwrap();
            first.get_or_insert(marble.id());
            store
                .save(Transaction::new().add_marble(handles.mood_jar, marble))
                .await
                .unwrap();
        }

        let jar = store.mood_jar(handles.user).await.unwrap();
        assert_eq!(jar.len(), 2);
        assert_eq!(jar.marbles()[0].intensity(), 0.2);
        assert!(store.get(first.unwrap()).await.is_none());
    }

    #[tokio::test]
    async fn test_fetch_has_no_side_effects() {
        let store = store().await;
        let handles = store_with_user(&store).await;
        let before = store.snapshot().await;

        let found = store
            .fetch(&Criteria::all().within_user(handles.user))
            .await;

        assert_eq!(found.len(), 4);
        assert_eq!(store.snapshot().await, before);
    }
}
