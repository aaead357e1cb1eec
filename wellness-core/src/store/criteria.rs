//! Fetch criteria for [`super::WellnessStore::fetch`].

use super::graph::EntityGraph;
use crate::model::{EntityKind, EntityRef, Record, UserId};
use chrono::{DateTime, Utc};

/// Filter over stored records. Every set field must match.
///
/// With `owned_by` set, results come in the owner's collection order.
/// Otherwise they are ordered by timestamp, then by reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Criteria {
    kind: Option<EntityKind>,
    id: Option<EntityRef>,
    owned_by: Option<EntityRef>,
    within_user: Option<UserId>,
    since: Option<DateTime<Utc>>,
    until: Option<DateTime<Utc>>,
    limit: Option<usize>,
}

impl Criteria {
    /// Matches every record.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn kind(mut self, kind: EntityKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn id(mut self, entity: impl Into<EntityRef>) -> Self {
        self.id = Some(entity.into());
        self
    }

    /// Direct children of `owner`.
    pub fn owned_by(mut self, owner: impl Into<EntityRef>) -> Self {
        self.owned_by = Some(owner.into());
        self
    }

    /// Anything in `user`'s subtree, the user included.
    pub fn within_user(mut self, user: UserId) -> Self {
        self.within_user = Some(user);
        self
    }

    /// Inclusive lower bound. Records without a timestamp never match.
    pub fn since(mut self, at: DateTime<Utc>) -> Self {
        self.since = Some(at);
        self
    }

    /// Exclusive upper bound. Records without a timestamp never match.
    pub fn until(mut self, at: DateTime<Utc>) -> Self {
        self.until = Some(at);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub(crate) fn matches(&self, graph: &EntityGraph, record: &Record) -> bool {
        let entity = record.entity_ref();
        if self.kind.is_some_and(|k| record.kind() != k) {
            return false;
        }
        if self.id.is_some_and(|id| id != entity) {
            return false;
        }
        if self
            .owned_by
            .is_some_and(|owner| graph.owner_of(entity) != Some(owner))
        {
            return false;
        }
        if self
            .within_user
            .is_some_and(|user| graph.root_of(entity) != Some(user))
        {
            return false;
        }
        if self.since.is_some() || self.until.is_some() {
            let Some(at) = record.timestamp() else {
                return false;
            };
            if self.since.is_some_and(|since| at < since) || self.until.is_some_and(|until| at >= until) {
                return false;
            }
        }
        true
    }

    /// Run the criteria against `graph`.
    pub(crate) fn select(&self, graph: &EntityGraph) -> Vec<Record> {
        let mut selected: Vec<&Record> = match self.owned_by {
            Some(owner) => graph
                .child_refs(owner)
                .iter()
                .filter_map(|c| graph.get(*c))
                .filter(|r| self.matches(graph, r))
                .collect(),
            None => {
                let mut all: Vec<&Record> = graph.records().filter(|r| self.matches(graph, r)).collect();
                all.sort_by_key(|r| (r.timestamp(), r.entity_ref()));
                all
            }
        };
        if let Some(limit) = self.limit {
            selected.truncate(limit);
        }
        selected.into_iter().cloned().collect()
    }
}
