// Copyright (c) 2025 - Cowboy AI, Inc.
//! Graph Model and Storage Seam
//!
//! The registry persists entities as labelled nodes and typed edges. This
//! module defines that vocabulary and the collaborator traits every storage
//! backend implements:
//!
//! ```text
//! GraphStore ──begin(mode)──▶ GraphTransaction
//!                              ├─ node / nodes / put_node / delete_node
//!                              ├─ edges / relate / unrelate
//!                              └─ commit / rollback
//! ```
//!
//! A node carries the full serialized entity as its property map, so backends
//! stay agnostic of entity types. Typed access lives in
//! [`crate::repository::Repository`].

mod entity;

pub use entity::Entity;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Node labels in the federation graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeKind {
    Provider,
    Region,
    IdentityProvider,
    UserGroup,
    Project,
    Sla,
    Service,
    Quota,
    Flavor,
    Image,
    Network,
}

impl NodeKind {
    pub const ALL: [NodeKind; 11] = [
        NodeKind::Provider,
        NodeKind::Region,
        NodeKind::IdentityProvider,
        NodeKind::UserGroup,
        NodeKind::Project,
        NodeKind::Sla,
        NodeKind::Service,
        NodeKind::Quota,
        NodeKind::Flavor,
        NodeKind::Image,
        NodeKind::Network,
    ];

    /// Graph label for this node kind
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Provider => "Provider",
            NodeKind::Region => "Region",
            NodeKind::IdentityProvider => "IdentityProvider",
            NodeKind::UserGroup => "UserGroup",
            NodeKind::Project => "Project",
            NodeKind::Sla => "SLA",
            NodeKind::Service => "Service",
            NodeKind::Quota => "Quota",
            NodeKind::Flavor => "Flavor",
            NodeKind::Image => "Image",
            NodeKind::Network => "Network",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Edge types in the federation graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RelationshipType {
    /// Provider owns a region
    HasRegion,
    /// Provider owns a project
    HasProject,
    /// Provider trusts an identity provider (carries `idp_name`, `protocol`)
    Trusts,
    /// Region hosts a service
    Hosts,
    /// Identity provider asserts a user group
    HasUserGroup,
    /// User group holds an SLA
    HoldsSla,
    /// SLA grants a project
    Grants,
    /// Service is limited by a quota
    LimitedBy,
    /// Quota applies to a project
    AppliesTo,
    /// Service offers a flavor, image or network
    Offers,
    /// Project may use a private flavor, image or network
    CanUse,
}

impl RelationshipType {
    pub const ALL: [RelationshipType; 11] = [
        RelationshipType::HasRegion,
        RelationshipType::HasProject,
        RelationshipType::Trusts,
        RelationshipType::Hosts,
        RelationshipType::HasUserGroup,
        RelationshipType::HoldsSla,
        RelationshipType::Grants,
        RelationshipType::LimitedBy,
        RelationshipType::AppliesTo,
        RelationshipType::Offers,
        RelationshipType::CanUse,
    ];

    /// Graph relationship type name
    pub fn type_name(&self) -> &'static str {
        match self {
            RelationshipType::HasRegion => "HAS_REGION",
            RelationshipType::HasProject => "HAS_PROJECT",
            RelationshipType::Trusts => "TRUSTS",
            RelationshipType::Hosts => "HOSTS",
            RelationshipType::HasUserGroup => "HAS_USER_GROUP",
            RelationshipType::HoldsSla => "HOLDS_SLA",
            RelationshipType::Grants => "GRANTS",
            RelationshipType::LimitedBy => "LIMITED_BY",
            RelationshipType::AppliesTo => "APPLIES_TO",
            RelationshipType::Offers => "OFFERS",
            RelationshipType::CanUse => "CAN_USE",
        }
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Which side of an edge the queried node sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Queried node is the edge source
    Outgoing,
    /// Queried node is the edge target
    Incoming,
    Both,
}

/// Stored node: a kind, an id and the serialized entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    pub id: Uuid,
    pub properties: Map<String, Value>,
}

impl Node {
    pub fn property(&self, key: &str) -> &Value {
        self.properties.get(key).unwrap_or(&Value::Null)
    }
}

/// Stored edge; `(from, rel, to)` is unique
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub from: Uuid,
    pub rel: RelationshipType,
    pub to: Uuid,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl Edge {
    pub fn new(from: Uuid, rel: RelationshipType, to: Uuid) -> Self {
        Self {
            from,
            rel,
            to,
            properties: Map::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Endpoint opposite to `id`
    pub fn other(&self, id: Uuid) -> Uuid {
        if self.from == id {
            self.to
        } else {
            self.from
        }
    }
}

/// Equality filter on top-level node properties
///
/// A `null` expected value matches an absent property.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyFilter {
    equals: BTreeMap<String, Value>,
}

impl PropertyFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.equals.insert(key.into(), value.into());
        self
    }

    /// Equality on a reference property (stored as its string form)
    pub fn id_eq(self, key: impl Into<String>, id: Uuid) -> Self {
        self.eq(key, id.to_string())
    }

    /// Equality on an optional reference property
    pub fn opt_id_eq(self, key: impl Into<String>, id: Option<Uuid>) -> Self {
        match id {
            Some(id) => self.id_eq(key, id),
            None => self.eq(key, Value::Null),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.equals.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.equals.iter()
    }

    pub fn matches(&self, node: &Node) -> bool {
        self.equals
            .iter()
            .all(|(key, expected)| node.property(key) == expected)
    }
}

/// Access mode of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Consistent snapshot, never blocked by writers
    Read,
    /// Serialized with every other write transaction
    Write,
}

/// Errors raised by storage backends
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to encode or decode node: {0}")]
    Codec(String),

    #[error("Constraint violated on {kind}: {key}")]
    Constraint { kind: NodeKind, key: String },

    #[error("Edge endpoint {0} does not exist")]
    MissingEndpoint(Uuid),

    #[error("Write attempted in a read transaction")]
    ReadOnly,
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Codec(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// One transaction against the graph
///
/// Results of `nodes` are ordered by id, which for v7 ids is creation order.
#[async_trait]
pub trait GraphTransaction: Send {
    fn mode(&self) -> AccessMode;

    async fn node(&mut self, kind: NodeKind, id: Uuid) -> StoreResult<Option<Node>>;

    async fn nodes(&mut self, kind: NodeKind, filter: &PropertyFilter) -> StoreResult<Vec<Node>>;

    /// Insert or replace a node
    async fn put_node(&mut self, node: Node) -> StoreResult<()>;

    /// Delete a node together with every incident edge
    async fn delete_node(&mut self, kind: NodeKind, id: Uuid) -> StoreResult<bool>;

    async fn edges(
        &mut self,
        id: Uuid,
        rel: RelationshipType,
        direction: Direction,
    ) -> StoreResult<Vec<Edge>>;

    /// Insert or replace an edge; both endpoints must exist
    async fn relate(&mut self, edge: Edge) -> StoreResult<()>;

    async fn unrelate(&mut self, from: Uuid, rel: RelationshipType, to: Uuid) -> StoreResult<bool>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;

    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}

/// Storage collaborator owning durability and transactions
#[async_trait]
pub trait GraphStore: Send + Sync + 'static {
    async fn begin(&self, mode: AccessMode) -> StoreResult<Box<dyn GraphTransaction>>;

    /// Install constraints and indexes; idempotent
    async fn initialize(&self) -> StoreResult<()>;

    async fn health_check(&self) -> StoreResult<()>;

    fn name(&self) -> &str;
}
