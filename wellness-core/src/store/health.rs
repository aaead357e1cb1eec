//! Relationship validation and the store health check.
//!
//! Both work by committing probe records, re-reading the document from the
//! backend, and deleting the probes again. Probe users are flagged as such
//! and carry a reserved display name no other user may take, so that
//! [`WellnessStore::open`] can purge any left behind by an interrupted run.

use super::{Criteria, Transaction, UserBundle, WellnessStore};
use crate::error::{RelationshipIntegrityError, StoreError};
use crate::model::{
    ActivityKind, EmotionData, EmotionKind, EmotionResponse, EntityKind, EntityRef, JournalEntry,
    MoodMarble, PhysicalActivity, Record, Relation, SleepData, SleepQuality, SocialPlan, User,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Display name reserved for probe users.
pub const PROBE_DISPLAY_NAME: &str = "__wellness_probe__";

/// Result of [`WellnessStore::health_check`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub healthy: bool,
    pub issues: Vec<String>,
    pub checked_at: DateTime<Utc>,
}

/// Probe transaction and the parent/child link it exercises.
struct Probe {
    user: EntityRef,
    parent: EntityRef,
    child: EntityRef,
    tx: Transaction,
}

impl Probe {
    fn build(relation: Relation) -> Result<Self, StoreError> {
        let bundle = UserBundle::new(User::new(PROBE_DISPLAY_NAME)?.into_probe());
        let handles = bundle.handles();
        let user = EntityRef::User(handles.user);
        let tx = Transaction::new().create_user(bundle);

        let probe = |parent: EntityRef, child: Record, tx: Transaction| Probe {
            user,
            parent,
            child: child.entity_ref(),
            tx: tx.insert(parent, child),
        };

        let now = Utc::now();
        Ok(match relation {
            Relation::UserPhysicalData => Probe {
                user,
                parent: user,
                child: handles.physical.into(),
                tx,
            },
            Relation::UserMoodJar => Probe {
                user,
                parent: user,
                child: handles.mood_jar.into(),
                tx,
            },
            Relation::UserProgress => Probe {
                user,
                parent: user,
                child: handles.progress.into(),
                tx,
            },
            Relation::UserEmotions => probe(user, EmotionData::new(EmotionKind::Neutral, 0.5)?.into(), tx),
            Relation::UserSleep => {
                let sleep = SleepData::new(now - Duration::hours(8), now, SleepQuality::Fair)?;
                probe(user, sleep.into(), tx)
            }
            Relation::UserJournal => probe(user, JournalEntry::new("probe")?.into(), tx),
            Relation::UserSocialPlans => probe(user, SocialPlan::new("probe", now.date_naive())?.into(), tx),
            Relation::PhysicalDataActivities => {
                let activity = PhysicalActivity::new(ActivityKind::Other, 1, 0.0)?;
                probe(handles.physical.into(), activity.into(), tx)
            }
            Relation::EmotionResponses => {
                let emotion = EmotionData::new(EmotionKind::Neutral, 0.5)?;
                let emotion_ref = EntityRef::from(emotion.id);
                let tx = tx.insert(user, emotion);
                probe(emotion_ref, EmotionResponse::new("probe?", "probe")?.into(), tx)
            }
            Relation::MoodJarMarbles => {
                let marble = MoodMarble::new(EmotionKind::Neutral, 0.5)?;
                probe(handles.mood_jar.into(), marble.into(), tx)
            }
        })
    }
}

impl WellnessStore {
    /// Round-trip one instance of `relation` through the backend and check
    /// both directions of the link. The probe is removed on every path.
    pub async fn validate_relation(&self, relation: Relation) -> Result<(), RelationshipIntegrityError> {
        let probe = Probe::build(relation)
            .map_err(|e| RelationshipIntegrityError::new(relation, format!("could not build probe: {e}")))?;
        let (user, parent, child) = (probe.user, probe.parent, probe.child);

        let (result, created) = match self.save(probe.tx).await {
            Ok(receipt) => (self.verify_link(relation, parent, child).await, receipt.inserted),
            Err(e) => (
                Err(RelationshipIntegrityError::new(
                    relation,
                    format!("probe commit failed: {e}"),
                )),
                Vec::new(),
            ),
        };
        let cleanup = self.remove_probe(relation, user, &created).await;

        result.and(cleanup)
    }

    /// Validate every declared relationship, stopping at the first failure.
    pub async fn validate_relationships(&self) -> Result<(), RelationshipIntegrityError> {
        for relation in Relation::ALL {
            self.validate_relation(relation).await?;
        }
        Ok(())
    }

    /// Write, read back and delete a throwaway record, then validate every
    /// relationship. Never fails; problems become issues in the report.
    pub async fn health_check(&self) -> HealthReport {
        let mut issues = Vec::new();

        match self.check_round_trip().await {
            Ok(true) => {}
            Ok(false) => issues.push("round trip failed: committed record missing from storage".to_string()),
            Err(e) => issues.push(format!("round trip failed: {e}")),
        }
        for relation in Relation::ALL {
            if let Err(e) = self.validate_relation(relation).await {
                issues.push(e.to_string());
            }
        }

        let report = HealthReport {
            healthy: issues.is_empty(),
            issues,
            checked_at: Utc::now(),
        };
        if report.healthy {
            info!(backend = %self.location(), "health check passed");
        } else {
            warn!(backend = %self.location(), issues = report.issues.len(), "health check found problems");
        }
        report
    }

    /// Delete users flagged as probes. Returns how many were removed.
    pub async fn purge_probes(&self) -> Result<usize, StoreError> {
        let probes: Vec<EntityRef> = self
            .fetch(&Criteria::all().kind(EntityKind::User))
            .await
            .iter()
            .filter_map(Record::as_user)
            .filter(|u| u.is_probe())
            .map(|u| EntityRef::User(u.id()))
            .collect();
        if probes.is_empty() {
            return Ok(0);
        }

        let count = probes.len();
        let tx = probes.into_iter().fold(Transaction::new(), |tx, user| tx.delete(user));
        self.save(tx).await?;
        Ok(count)
    }

    /// Whether a freshly committed probe could be read back from storage.
    async fn check_round_trip(&self) -> Result<bool, StoreError> {
        let bundle = UserBundle::new(User::new(PROBE_DISPLAY_NAME)?.into_probe());
        let user = EntityRef::User(bundle.handles().user);

        let read_back = match self.save(Transaction::new().create_user(bundle)).await {
            Ok(_) => self.reload_from_backend().await.map(|graph| graph.contains(user)),
            Err(e) => Err(e),
        };
        let deleted = self.remove_if_present(user).await;

        let found = read_back?;
        deleted?;
        Ok(found)
    }

    async fn verify_link(
        &self,
        relation: Relation,
        parent: EntityRef,
        child: EntityRef,
    ) -> Result<(), RelationshipIntegrityError> {
        let fail = |reason: String| RelationshipIntegrityError::new(relation, reason);
        let graph = self
            .reload_from_backend()
            .await
            .map_err(|e| fail(format!("could not re-read store: {e}")))?;

        if !graph.child_refs(parent).contains(&child) {
            return Err(fail(format!("{child} missing from {parent}'s collection after reload")));
        }
        match graph.owner_of(child) {
            Some(owner) if owner == parent => Ok(()),
            Some(owner) => Err(fail(format!("{child} reports owner {owner}, expected {parent}"))),
            None => Err(fail(format!("{child} has no owner after reload"))),
        }
    }

    async fn remove_probe(
        &self,
        relation: Relation,
        user: EntityRef,
        created: &[EntityRef],
    ) -> Result<(), RelationshipIntegrityError> {
        let fail = |reason: String| RelationshipIntegrityError::new(relation, reason);
        self.remove_if_present(user)
            .await
            .map_err(|e| fail(format!("probe cleanup failed: {e}")))?;

        let graph = self
            .reload_from_backend()
            .await
            .map_err(|e| fail(format!("could not re-read store after cleanup: {e}")))?;
        match created.iter().find(|r| graph.contains(**r)) {
            Some(survivor) => Err(fail(format!("{survivor} survived probe deletion"))),
            None => Ok(()),
        }
    }

    async fn remove_if_present(&self, user: EntityRef) -> Result<(), StoreError> {
        if self.get(user).await.is_some() {
            self.delete(user).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::store::MemoryBackend;
    use std::sync::Arc;

    async fn store() -> WellnessStore {
        WellnessStore::open(Arc::new(MemoryBackend::new()), &StoreConfig::new("."))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_every_relation_validates() {
        let store = store().await;
        for relation in Relation::ALL {
            store.validate_relation(relation).await.unwrap();
        }
        assert!(store.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_health_check_on_empty_store() {
        let store = store().await;
        let report = store.health_check().await;
        assert!(report.healthy, "{:?}", report.issues);
        assert!(report.issues.is_empty());
        assert!(store.users().await.is_empty());
    }

    #[tokio::test]
    async fn test_open_purges_leftover_probes() {
        let backend = Arc::new(MemoryBackend::new());
        {
            let store = WellnessStore::open(backend.clone(), &StoreConfig::new("."))
                .await
                .unwrap();
            let bundle = UserBundle::new(User::new(PROBE_DISPLAY_NAME).unwrap().into_probe());
            store.save(Transaction::new().create_user(bundle)).await.unwrap();
            let kept = UserBundle::new(User::new("Kept").unwrap());
            store.save(Transaction::new().create_user(kept)).await.unwrap();
        }

        let store = WellnessStore::open(backend, &StoreConfig::new(".")).await.unwrap();
        let users = store.users().await;
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].display_name(), "Kept");
    }
}
