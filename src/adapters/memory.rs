// Copyright (c) 2025 - Cowboy AI, Inc.
//! In-memory graph store
//!
//! Committed state is an immutable snapshot behind an `Arc`. Read
//! transactions clone the `Arc` and never wait on writers. Write transactions
//! hold the single writer lock for their whole lifetime, mutate a private
//! copy-on-write version of the snapshot and publish it on commit, so
//! validate-then-persist sequences are serialized.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use crate::graph::{
    AccessMode, Direction, Edge, GraphStore, GraphTransaction, Node, NodeKind, PropertyFilter,
    RelationshipType, StoreError, StoreResult,
};

#[derive(Debug, Clone, Default)]
struct GraphState {
    nodes: HashMap<Uuid, Node>,
    edges: BTreeMap<(Uuid, RelationshipType, Uuid), Edge>,
}

impl GraphState {
    fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

/// Graph store held entirely in process memory
#[derive(Debug, Clone, Default)]
pub struct MemoryGraphStore {
    committed: Arc<RwLock<Arc<GraphState>>>,
    writer: Arc<Mutex<()>>,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed nodes
    pub async fn node_count(&self) -> usize {
        self.committed.read().await.node_count()
    }

    /// Number of committed edges
    pub async fn edge_count(&self) -> usize {
        self.committed.read().await.edges.len()
    }
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    async fn begin(&self, mode: AccessMode) -> StoreResult<Box<dyn GraphTransaction>> {
        // The writer lock is taken before the snapshot so that a write always
        // starts from the latest committed state.
        let writer = match mode {
            AccessMode::Write => Some(self.writer.clone().lock_owned().await),
            AccessMode::Read => None,
        };
        let state = self.committed.read().await.clone();
        Ok(Box::new(MemoryTransaction {
            mode,
            state,
            committed: self.committed.clone(),
            _writer: writer,
        }))
    }

    async fn initialize(&self) -> StoreResult<()> {
        info!("In-memory graph store ready");
        Ok(())
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

struct MemoryTransaction {
    mode: AccessMode,
    state: Arc<GraphState>,
    committed: Arc<RwLock<Arc<GraphState>>>,
    _writer: Option<OwnedMutexGuard<()>>,
}

impl MemoryTransaction {
    fn writable(&mut self) -> StoreResult<&mut GraphState> {
        match self.mode {
            AccessMode::Write => Ok(Arc::make_mut(&mut self.state)),
            AccessMode::Read => Err(StoreError::ReadOnly),
        }
    }
}

#[async_trait]
impl GraphTransaction for MemoryTransaction {
    fn mode(&self) -> AccessMode {
        self.mode
    }

    async fn node(&mut self, kind: NodeKind, id: Uuid) -> StoreResult<Option<Node>> {
        Ok(self
            .state
            .nodes
            .get(&id)
            .filter(|n| n.kind == kind)
            .cloned())
    }

    async fn nodes(&mut self, kind: NodeKind, filter: &PropertyFilter) -> StoreResult<Vec<Node>> {
        let mut found: Vec<Node> = self
            .state
            .nodes
            .values()
            .filter(|n| n.kind == kind && filter.matches(n))
            .cloned()
            .collect();
        found.sort_by_key(|n| n.id);
        Ok(found)
    }

    async fn put_node(&mut self, node: Node) -> StoreResult<()> {
        let state = self.writable()?;
        if let Some(existing) = state.nodes.get(&node.id) {
            if existing.kind != node.kind {
                return Err(StoreError::Constraint {
                    kind: node.kind,
                    key: format!("id={}", node.id),
                });
            }
        }
        state.nodes.insert(node.id, node);
        Ok(())
    }

    async fn delete_node(&mut self, kind: NodeKind, id: Uuid) -> StoreResult<bool> {
        let state = self.writable()?;
        match state.nodes.get(&id) {
            Some(node) if node.kind == kind => {}
            _ => return Ok(false),
        }
        state.nodes.remove(&id);
        state
            .edges
            .retain(|(from, _, to), _| *from != id && *to != id);
        Ok(true)
    }

    async fn edges(
        &mut self,
        id: Uuid,
        rel: RelationshipType,
        direction: Direction,
    ) -> StoreResult<Vec<Edge>> {
        let mut found = Vec::new();
        if matches!(direction, Direction::Outgoing | Direction::Both) {
            found.extend(
                self.state
                    .edges
                    .range((id, rel, Uuid::nil())..=(id, rel, Uuid::from_u128(u128::MAX)))
                    .map(|(_, edge)| edge.clone()),
            );
        }
        if matches!(direction, Direction::Incoming | Direction::Both) {
            found.extend(
                self.state
                    .edges
                    .values()
                    .filter(|e| e.rel == rel && e.to == id && e.from != id)
                    .cloned(),
            );
        }
        Ok(found)
    }

    async fn relate(&mut self, edge: Edge) -> StoreResult<()> {
        let state = self.writable()?;
        for endpoint in [edge.from, edge.to] {
            if !state.nodes.contains_key(&endpoint) {
                return Err(StoreError::MissingEndpoint(endpoint));
            }
        }
        state.edges.insert((edge.from, edge.rel, edge.to), edge);
        Ok(())
    }

    async fn unrelate(&mut self, from: Uuid, rel: RelationshipType, to: Uuid) -> StoreResult<bool> {
        let state = self.writable()?;
        Ok(state.edges.remove(&(from, rel, to)).is_some())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryTransaction {
            mode,
            state,
            committed,
            _writer,
        } = *self;
        if mode == AccessMode::Write {
            let nodes = state.node_count();
            *committed.write().await = state;
            debug!("Committed in-memory snapshot with {} nodes", nodes);
        }
        drop(_writer);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        Ok(())
    }
}
