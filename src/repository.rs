// Copyright (c) 2025 - Cowboy AI, Inc.
//! Typed access to a graph transaction
//!
//! [`Repository`] wraps one [`GraphTransaction`] and speaks in entities rather
//! than nodes. Validation, projection and the façade all work through it, so
//! every check runs against the same transactional view that is persisted.

use tracing::debug;
use uuid::Uuid;

use crate::errors::{RegistryError, RegistryResult};
use crate::graph::{
    AccessMode, Direction, Entity, GraphTransaction, NodeKind, PropertyFilter, RelationshipType,
};

pub struct Repository {
    tx: Box<dyn GraphTransaction>,
}

impl Repository {
    pub fn new(tx: Box<dyn GraphTransaction>) -> Self {
        Self { tx }
    }

    pub fn mode(&self) -> AccessMode {
        self.tx.mode()
    }

    pub async fn get<E: Entity>(&mut self, id: Uuid) -> RegistryResult<Option<E>> {
        match self.tx.node(E::KIND, id).await? {
            Some(node) => Ok(Some(E::from_node(node)?)),
            None => Ok(None),
        }
    }

    /// Load the target of a read, update or delete
    pub async fn require<E: Entity>(&mut self, id: Uuid) -> RegistryResult<E> {
        self.get(id).await?.ok_or(RegistryError::NotFound { kind: E::KIND, id })
    }

    /// Load an entity referenced by another one
    pub async fn reference<E: Entity>(&mut self, id: Uuid) -> RegistryResult<E> {
        self.get(id)
            .await?
            .ok_or(RegistryError::DanglingReference { kind: E::KIND, id })
    }

    pub async fn exists<E: Entity>(&mut self, id: Uuid) -> RegistryResult<bool> {
        Ok(self.tx.node(E::KIND, id).await?.is_some())
    }

    /// Entities matching an equality filter, in id order
    pub async fn find<E: Entity>(&mut self, filter: &PropertyFilter) -> RegistryResult<Vec<E>> {
        self.tx
            .nodes(E::KIND, filter)
            .await?
            .into_iter()
            .map(|node| E::from_node(node).map_err(RegistryError::from))
            .collect()
    }

    pub async fn all<E: Entity>(&mut self) -> RegistryResult<Vec<E>> {
        self.find(&PropertyFilter::new()).await
    }

    /// Persist an entity and rewrite the edges it owns
    pub async fn save<E: Entity>(&mut self, entity: &E) -> RegistryResult<()> {
        let id = entity.id();
        self.tx.put_node(entity.to_node()?).await?;
        for rel in E::LINKS {
            for edge in self.tx.edges(id, *rel, Direction::Both).await? {
                self.tx.unrelate(edge.from, edge.rel, edge.to).await?;
            }
        }
        for edge in entity.links() {
            self.tx.relate(edge).await?;
        }
        debug!("Saved {} {}", E::KIND, id);
        Ok(())
    }

    /// Detach-delete a node
    pub async fn remove(&mut self, kind: NodeKind, id: Uuid) -> RegistryResult<bool> {
        let removed = self.tx.delete_node(kind, id).await?;
        debug!("Removed {} {}: {}", kind, id, removed);
        Ok(removed)
    }

    /// Ids on the far side of `rel` edges
    pub async fn neighbours(
        &mut self,
        id: Uuid,
        rel: RelationshipType,
        direction: Direction,
    ) -> RegistryResult<Vec<Uuid>> {
        let mut ids: Vec<Uuid> = self
            .tx
            .edges(id, rel, direction)
            .await?
            .into_iter()
            .map(|edge| edge.other(id))
            .collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    /// Targets of outgoing `rel` edges, decoded as `E`
    pub async fn children<E: Entity>(
        &mut self,
        parent: Uuid,
        rel: RelationshipType,
    ) -> RegistryResult<Vec<E>> {
        self.related(parent, rel, Direction::Outgoing).await
    }

    /// Sources of incoming `rel` edges, decoded as `E`
    pub async fn parents<E: Entity>(
        &mut self,
        child: Uuid,
        rel: RelationshipType,
    ) -> RegistryResult<Vec<E>> {
        self.related(child, rel, Direction::Incoming).await
    }

    async fn related<E: Entity>(
        &mut self,
        id: Uuid,
        rel: RelationshipType,
        direction: Direction,
    ) -> RegistryResult<Vec<E>> {
        let mut found = Vec::new();
        for other in self.neighbours(id, rel, direction).await? {
            if let Some(entity) = self.get::<E>(other).await? {
                found.push(entity);
            }
        }
        Ok(found)
    }

    pub async fn commit(self) -> RegistryResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    pub async fn rollback(self) -> RegistryResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
