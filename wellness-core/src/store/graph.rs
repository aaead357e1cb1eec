//! The entity graph: an arena of records keyed by [`EntityRef`].
//!
//! Ownership is a single ordered `parent -> children` map. The reverse
//! `child -> owner` index is derived from it and is never written directly,
//! so the two directions of a relationship cannot disagree.

use crate::error::GraphError;
use crate::model::{Cardinality, EntityKind, EntityRef, Record, Relation, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Arena of records plus their ownership links.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(into = "GraphDocument", try_from = "GraphDocument")]
pub struct EntityGraph {
    records: HashMap<EntityRef, Record>,
    children: HashMap<EntityRef, Vec<EntityRef>>,
    /// Derived from `children`.
    owners: HashMap<EntityRef, EntityRef>,
}

impl EntityGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, entity: EntityRef) -> bool {
        self.records.contains_key(&entity)
    }

    pub fn get(&self, entity: EntityRef) -> Option<&Record> {
        self.records.get(&entity)
    }

    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    /// Owner of `entity`, derived from the parent's collection.
    pub fn owner_of(&self, entity: EntityRef) -> Option<EntityRef> {
        self.owners.get(&entity).copied()
    }

    /// Children of `parent` in insertion order.
    pub fn child_refs(&self, parent: EntityRef) -> &[EntityRef] {
        self.children.get(&parent).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Children of `parent` through one relationship, in insertion order.
    pub fn children_of(&self, parent: EntityRef, relation: Relation) -> Vec<&Record> {
        self.child_refs(parent)
            .iter()
            .filter(|c| c.kind() == relation.child_kind())
            .filter_map(|c| self.records.get(c))
            .collect()
    }

    /// The single child of a one-to-one relationship.
    pub fn single_child(&self, parent: EntityRef, relation: Relation) -> Option<&Record> {
        self.child_refs(parent)
            .iter()
            .find(|c| c.kind() == relation.child_kind())
            .and_then(|c| self.records.get(c))
    }

    /// The user at the top of `entity`'s ownership chain.
    pub fn root_of(&self, entity: EntityRef) -> Option<UserId> {
        let mut current = entity;
        while let Some(owner) = self.owner_of(current) {
            current = owner;
        }
        match current {
            EntityRef::User(id) if self.contains(current) => Some(id),
            _ => None,
        }
    }

    /// All users, oldest first.
    pub fn users(&self) -> Vec<UserId> {
        let mut users: Vec<_> = self
            .records
            .values()
            .filter_map(Record::as_user)
            .map(|u| (u.created_at(), u.id()))
            .collect();
        users.sort();
        users.into_iter().map(|(_, id)| id).collect()
    }

    /// `root` followed by everything it owns, depth first.
    pub fn subtree(&self, root: EntityRef) -> Vec<EntityRef> {
        let mut out = Vec::new();
        if !self.contains(root) {
            return out;
        }
        let mut stack = vec![root];
        while let Some(entity) = stack.pop() {
            out.push(entity);
            stack.extend(self.child_refs(entity).iter().rev().copied());
        }
        out
    }

    /// Insert a user. Only users may be stored without an owner.
    pub fn insert_root(&mut self, record: Record) -> Result<EntityRef, GraphError> {
        let entity = record.entity_ref();
        if record.kind() != EntityKind::User {
            return Err(GraphError::MissingOwner(entity));
        }
        if self.contains(entity) {
            return Err(GraphError::Duplicate(entity));
        }
        self.records.insert(entity, record);
        Ok(entity)
    }

    /// Append `record` to `parent`'s collection.
    pub fn insert_child(&mut self, parent: EntityRef, record: Record) -> Result<EntityRef, GraphError> {
        let child = record.entity_ref();
        if self.contains(child) {
            return Err(GraphError::Duplicate(child));
        }
        if !self.contains(parent) {
            return Err(GraphError::NotFound(parent));
        }
        let relation = self.check_link(parent, child)?;
        if relation.cardinality() == Cardinality::One && self.single_child(parent, relation).is_some() {
            return Err(GraphError::SlotOccupied { parent, relation });
        }

        self.records.insert(child, record);
        self.children.entry(parent).or_default().push(child);
        self.owners.insert(child, parent);
        Ok(child)
    }

    /// Replace an existing record in place. Ownership is unchanged.
    pub fn update(&mut self, record: Record) -> Result<EntityRef, GraphError> {
        let entity = record.entity_ref();
        let slot = self.records.get_mut(&entity).ok_or(GraphError::NotFound(entity))?;
        *slot = record;
        Ok(entity)
    }

    /// Remove `entity` and everything it owns. Returns the removed refs,
    /// parent first.
    pub fn remove(&mut self, entity: EntityRef) -> Result<Vec<EntityRef>, GraphError> {
        if !self.contains(entity) {
            return Err(GraphError::NotFound(entity));
        }
        if let Some(owner) = self.owners.get(&entity).copied() {
            if let Some(siblings) = self.children.get_mut(&owner) {
                siblings.retain(|c| *c != entity);
                if siblings.is_empty() {
                    self.children.remove(&owner);
                }
            }
        }

        let removed = self.subtree(entity);
        for r in &removed {
            self.records.remove(r);
            self.children.remove(r);
            self.owners.remove(r);
        }
        Ok(removed)
    }

    /// Every user owns exactly one of each one-to-one child.
    pub fn check_complete(&self) -> Result<(), GraphError> {
        for user in self.users() {
            let parent = EntityRef::User(user);
            for relation in Relation::ALL {
                if relation.parent_kind() == EntityKind::User
                    && relation.cardinality() == Cardinality::One
                    && self.single_child(parent, relation).is_none()
                {
                    return Err(GraphError::Incomplete { user: parent, relation });
                }
            }
        }
        Ok(())
    }

    fn check_link(&self, parent: EntityRef, child: EntityRef) -> Result<Relation, GraphError> {
        Relation::owning(child.kind())
            .filter(|r| r.parent_kind() == parent.kind())
            .ok_or(GraphError::InvalidParent { parent, child })
    }

    fn from_document(doc: GraphDocument) -> Result<Self, GraphError> {
        let mut graph = EntityGraph::new();
        for node in &doc.nodes {
            let entity = node.record.entity_ref();
            if graph.records.insert(entity, node.record.clone()).is_some() {
                return Err(GraphError::Duplicate(entity));
            }
        }

        for node in doc.nodes {
            let parent = node.record.entity_ref();
            for child in node.children {
                if !graph.contains(child) {
                    return Err(GraphError::NotFound(child));
                }
                let relation = graph.check_link(parent, child)?;
                if graph.owners.insert(child, parent).is_some() {
                    return Err(GraphError::MultipleOwners(child));
                }
                if relation.cardinality() == Cardinality::One
                    && graph.single_child(parent, relation).is_some()
                {
                    return Err(GraphError::SlotOccupied { parent, relation });
                }
                graph.children.entry(parent).or_default().push(child);
            }
        }

        for (entity, record) in &graph.records {
            if record.kind() != EntityKind::User && !graph.owners.contains_key(entity) {
                return Err(GraphError::MissingOwner(*entity));
            }
        }
        graph.check_complete()?;
        Ok(graph)
    }

    fn to_document(&self) -> GraphDocument {
        let nodes = self
            .users()
            .into_iter()
            .flat_map(|user| self.subtree(EntityRef::User(user)))
            .filter_map(|entity| {
                self.records.get(&entity).map(|record| GraphNode {
                    record: record.clone(),
                    children: self.child_refs(entity).to_vec(),
                })
            })
            .collect();
        GraphDocument { nodes }
    }
}

/// Serialized form: a node list, each record with its ordered children.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct GraphDocument {
    nodes: Vec<GraphNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GraphNode {
    record: Record,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    children: Vec<EntityRef>,
}

impl From<EntityGraph> for GraphDocument {
    fn from(graph: EntityGraph) -> Self {
        graph.to_document()
    }
}

impl TryFrom<GraphDocument> for EntityGraph {
    type Error = GraphError;

    fn try_from(doc: GraphDocument) -> Result<Self, Self::Error> {
        EntityGraph::from_document(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::*;

    struct Fixture {
        graph: EntityGraph,
        user_id: UserId,
        user: EntityRef,
        physical: EntityRef,
        jar: EntityRef,
    }

    fn fixture() -> Fixture {
        let mut graph = EntityGraph::new();
        let avery = User::new("Avery").unwrap();
        let user_id = avery.id();
        let user = graph.insert_root(avery.into()).unwrap();
        let physical = graph.insert_child(user, PhysicalData::unset().into()).unwrap();
        let jar = graph.insert_child(user, MoodJar::new().into()).unwrap();
        graph.insert_child(user, PantherProgress::new().into()).unwrap();
        Fixture {
            graph,
            user_id,
            user,
            physical,
            jar,
        }
    }

    #[test]
    fn test_owner_is_derived() {
        let mut f = fixture();
        let marble = MoodMarble::new(EmotionKind::Happy, 0.5).unwrap();
        let marble_ref = f.graph.insert_child(f.jar, marble.into()).unwrap();

        assert_eq!(f.graph.owner_of(marble_ref), Some(f.jar));
        assert_eq!(f.graph.owner_of(f.jar), Some(f.user));
        assert!(f.graph.child_refs(f.jar).contains(&marble_ref));
        assert_eq!(f.graph.root_of(marble_ref), Some(f.user_id));
    }

    #[test]
    fn test_insert_rejects_wrong_parent() {
        let mut f = fixture();
        let marble = MoodMarble::new(EmotionKind::Sad, 0.3).unwrap();
        let err = f.graph.insert_child(f.physical, marble.into()).unwrap_err();
        assert!(matches!(err, GraphError::InvalidParent { .. }));
    }

    #[test]
    fn test_insert_rejects_second_singleton() {
        let mut f = fixture();
        let err = f.graph.insert_child(f.user, MoodJar::new().into()).unwrap_err();
        assert_eq!(
            err,
            GraphError::SlotOccupied {
                parent: f.user,
                relation: Relation::UserMoodJar
            }
        );
    }

    #[test]
    fn test_non_user_root_rejected() {
        let mut graph = EntityGraph::new();
        let err = graph.insert_root(MoodJar::new().into()).unwrap_err();
        assert!(matches!(err, GraphError::MissingOwner(_)));
    }

    #[test]
    fn test_remove_cascades() {
        let mut f = fixture();
        let activity = PhysicalActivity::new(ActivityKind::Yoga, 30, 120.0).unwrap();
        f.graph.insert_child(f.physical, activity.into()).unwrap();
        let emotion = EmotionData::new(EmotionKind::Anxious, 0.4).unwrap();
        let emotion_ref = f.graph.insert_child(f.user, emotion.into()).unwrap();
        f.graph
            .insert_child(emotion_ref, EmotionResponse::new("Why?", "Deadline").unwrap().into())
            .unwrap();
        assert_eq!(f.graph.len(), 7);

        let removed = f.graph.remove(f.user).unwrap();

        assert_eq!(removed.len(), 7);
        assert_eq!(removed[0], f.user);
        assert!(f.graph.is_empty());
        assert!(f.graph.owner_of(emotion_ref).is_none());
    }

    #[test]
    fn test_remove_child_detaches_from_parent() {
        let mut f = fixture();
        let plan = SocialPlan::new("Coffee", chrono::NaiveDate::from_ymd_opt(2026, 2, 1).unwrap()).unwrap();
        let plan_ref = f.graph.insert_child(f.user, plan.into()).unwrap();

        f.graph.remove(plan_ref).unwrap();

        assert!(!f.graph.child_refs(f.user).contains(&plan_ref));
        assert!(f.graph.get(plan_ref).is_none());
    }

    #[test]
    fn test_check_complete() {
        let mut graph = EntityGraph::new();
        let user = graph.insert_root(User::new("Sol").unwrap().into()).unwrap();
        graph.insert_child(user, PhysicalData::unset().into()).unwrap();
        let err = graph.check_complete().unwrap_err();
        assert!(matches!(err, GraphError::Incomplete { .. }));
    }

    #[test]
    fn test_serde_round_trip_preserves_order() {
        let mut f = fixture();
        let mut marbles = Vec::new();
        for (emotion, intensity) in [
            (EmotionKind::Happy, 0.8),
            (EmotionKind::Grateful, 0.9),
            (EmotionKind::Peaceful, 0.7),
        ] {
            let marble = MoodMarble::new(emotion, intensity).unwrap();
            marbles.push(f.graph.insert_child(f.jar, marble.into()).unwrap());
        }

        let json = serde_json::to_string(&f.graph).unwrap();
        let restored: EntityGraph = serde_json::from_str(&json).unwrap();

        assert_eq!(restored, f.graph);
        assert_eq!(restored.child_refs(f.jar), marbles.as_slice());
        assert_eq!(restored.owner_of(marbles[2]), Some(f.jar));
    }

    #[test]
    fn test_document_with_orphan_rejected() {
        let f = fixture();
        let mut value = serde_json::to_value(&f.graph).unwrap();
        let orphan = MoodMarble::new(EmotionKind::Tired, 0.2).unwrap();
        value["nodes"]
            .as_array_mut()
            .unwrap()
            .push(serde_json::json!({ "record": Record::from(orphan) }));

        let result: Result<EntityGraph, _> = serde_json::from_value(value);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("without an owner"), "{err}");
    }

    #[test]
    fn test_document_with_dangling_child_rejected() {
        let f = fixture();
        let mut value = serde_json::to_value(&f.graph).unwrap();
        let ghost = EntityRef::from(MarbleId::new());
        value["nodes"][0]["children"]
            .as_array_mut()
            .unwrap()
            .push(serde_json::to_value(ghost).unwrap());

        let result: Result<EntityGraph, _> = serde_json::from_value(value);
        assert!(result.is_err());
    }
}
