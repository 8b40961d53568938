// Copyright (c) 2025 - Cowboy AI, Inc.

//! Neo4j Graph Store
//!
//! Persists the federation graph in Neo4j.
//!
//! # Graph Model
//!
//! Every node carries two labels: `:Entity` and its kind label (`:Provider`,
//! `:Region`, `:SLA`, ...). Node properties are:
//! - `id`: entity id (unique across all `:Entity` nodes)
//! - `data`: the serialized entity, the source of truth when reading
//! - every scalar top-level attribute, copied for filtering and browsing
//!
//! Relationships use the registry relationship types (`HAS_REGION`,
//! `TRUSTS`, `GRANTS`, ...) with their properties serialized in `data`.
//!
//! # Write serialization
//!
//! A write transaction first touches the `(:RegistryLock {id: 'registry'})`
//! node. Neo4j holds the resulting write lock until commit or rollback, so
//! validate-then-persist sequences never interleave.
//!
//! # Example
//!
//! ```rust,no_run
//! use fed_registry::adapters::Neo4jGraphStore;
//! use fed_registry::config::Neo4jConfig;
//! use fed_registry::graph::GraphStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Neo4jGraphStore::connect(&Neo4jConfig::from_env()?).await?;
//!     store.initialize().await?;
//!     store.health_check().await?;
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use neo4rs::{query, ConfigBuilder, Graph, Query, Row, Txn};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Neo4jConfig;
use crate::graph::{
    AccessMode, Direction, Edge, GraphStore, GraphTransaction, Node, NodeKind, PropertyFilter,
    RelationshipType, StoreError, StoreResult,
};

const LOCK_QUERY: &str =
    "MERGE (l:RegistryLock {id: 'registry'}) SET l.held_at = timestamp() RETURN l.id";

/// Federation-wide unique attributes: `(constraint name, label, property)`
const UNIQUE_PROPERTIES: [(&str, &str, &str); 4] = [
    ("provider_name", "Provider", "name"),
    ("identity_provider_endpoint", "IdentityProvider", "endpoint"),
    ("service_endpoint", "Service", "endpoint"),
    ("sla_doc_uuid", "SLA", "doc_uuid"),
];

/// Graph store backed by a Neo4j database
pub struct Neo4jGraphStore {
    graph: Arc<Graph>,
    database: String,
}

impl Neo4jGraphStore {
    /// Connect to Neo4j
    pub async fn connect(config: &Neo4jConfig) -> StoreResult<Self> {
        info!("Connecting to Neo4j at {}", config.uri);

        let neo4j_config = ConfigBuilder::default()
            .uri(config.uri.as_str())
            .user(config.user.as_str())
            .password(config.password.as_str())
            .db(config.database())
            .build()
            .map_err(|e| StoreError::Unavailable(format!("Invalid Neo4j configuration: {}", e)))?;

        let graph = Graph::connect(neo4j_config)
            .await
            .map_err(|e| StoreError::Unavailable(format!("Failed to connect to Neo4j: {}", e)))?;

        Ok(Self {
            graph: Arc::new(graph),
            database: config.database().to_string(),
        })
    }
}

#[async_trait]
impl GraphStore for Neo4jGraphStore {
    async fn begin(&self, mode: AccessMode) -> StoreResult<Box<dyn GraphTransaction>> {
        let mut txn = self.graph.start_txn().await.map_err(unavailable)?;
        if mode == AccessMode::Write {
            txn.run(query(LOCK_QUERY)).await.map_err(unavailable)?;
        }
        Ok(Box::new(Neo4jTransaction { txn, mode }))
    }

    async fn initialize(&self) -> StoreResult<()> {
        info!("Initializing Neo4j schema in database {}", self.database);

        let mut statements = vec![
            "CREATE CONSTRAINT entity_id IF NOT EXISTS FOR (n:Entity) REQUIRE n.id IS UNIQUE"
                .to_string(),
            "CREATE CONSTRAINT registry_lock_id IF NOT EXISTS FOR (l:RegistryLock) REQUIRE l.id IS UNIQUE"
                .to_string(),
        ];
        for kind in NodeKind::ALL {
            statements.push(format!(
                "CREATE INDEX {}_id IF NOT EXISTS FOR (n:{}) ON (n.id)",
                kind.label().to_lowercase(),
                kind.label()
            ));
        }
        for (name, label, property) in UNIQUE_PROPERTIES {
            statements.push(format!(
                "CREATE CONSTRAINT {} IF NOT EXISTS FOR (n:{}) REQUIRE n.{} IS UNIQUE",
                name, label, property
            ));
        }

        for statement in statements {
            self.graph
                .run(Query::new(statement))
                .await
                .map_err(unavailable)?;
        }

        info!("Neo4j schema initialization complete");
        Ok(())
    }

    async fn health_check(&self) -> StoreResult<()> {
        self.graph.run(query("RETURN 1")).await.map_err(|e| {
            StoreError::Unavailable(format!("Neo4j health check failed: {}", e))
        })?;

        debug!("Neo4j health check passed");
        Ok(())
    }

    fn name(&self) -> &str {
        "neo4j"
    }
}

struct Neo4jTransaction {
    txn: Txn,
    mode: AccessMode,
}

impl Neo4jTransaction {
    fn ensure_writable(&self) -> StoreResult<()> {
        match self.mode {
            AccessMode::Write => Ok(()),
            AccessMode::Read => Err(StoreError::ReadOnly),
        }
    }

    async fn rows(&mut self, q: Query) -> StoreResult<Vec<Row>> {
        let mut stream = self.txn.execute(q).await.map_err(unavailable)?;
        let mut rows = Vec::new();
        while let Some(row) = stream.next(self.txn.handle()).await.map_err(unavailable)? {
            rows.push(row);
        }
        Ok(rows)
    }

    async fn nodes_matching(&mut self, q: Query, kind: NodeKind) -> StoreResult<Vec<Node>> {
        self.rows(q)
            .await?
            .iter()
            .map(|row| node_from_row(row, kind))
            .collect()
    }
}

#[async_trait]
impl GraphTransaction for Neo4jTransaction {
    fn mode(&self) -> AccessMode {
        self.mode
    }

    async fn node(&mut self, kind: NodeKind, id: Uuid) -> StoreResult<Option<Node>> {
        let q = Query::new(format!(
            "MATCH (n:{} {{id: $id}}) RETURN n.id AS id, n.data AS data",
            kind.label()
        ))
        .param("id", id.to_string());
        Ok(self.nodes_matching(q, kind).await?.into_iter().next())
    }

    async fn nodes(&mut self, kind: NodeKind, filter: &PropertyFilter) -> StoreResult<Vec<Node>> {
        let (clause, params) = where_clause(filter);
        let mut q = Query::new(format!(
            "MATCH (n:{}){} RETURN n.id AS id, n.data AS data ORDER BY n.id",
            kind.label(),
            clause
        ));
        for (name, value) in params {
            q = bind_scalar(q, &name, value);
        }

        // Non-scalar and null expectations are not pushed down; the filter is
        // re-applied on the decoded nodes.
        let mut found: Vec<Node> = self
            .nodes_matching(q, kind)
            .await?
            .into_iter()
            .filter(|n| filter.matches(n))
            .collect();
        found.sort_by_key(|n| n.id);
        Ok(found)
    }

    async fn put_node(&mut self, node: Node) -> StoreResult<()> {
        self.ensure_writable()?;
        let data = serde_json::to_string(&node.properties)?;

        let mut statement = format!(
            "MERGE (n:Entity {{id: $id}}) SET n = {{id: $id, data: $data}}, n:{}",
            node.kind.label()
        );
        let mut scalars = Vec::new();
        for (key, value) in &node.properties {
            if key == "id" || key == "data" || !is_identifier(key) {
                continue;
            }
            if matches!(value, Value::String(_) | Value::Bool(_) | Value::Number(_)) {
                statement.push_str(&format!(", n.`{}` = $p{}", key, scalars.len()));
                scalars.push(value.clone());
            }
        }

        let mut q = Query::new(statement)
            .param("id", node.id.to_string())
            .param("data", data);
        for (i, value) in scalars.into_iter().enumerate() {
            q = bind_scalar(q, &format!("p{}", i), value);
        }

        self.txn.run(q).await.map_err(|e| constraint_or_unavailable(e, node.kind, node.id))?;
        debug!("Stored {} {}", node.kind, node.id);
        Ok(())
    }

    async fn delete_node(&mut self, kind: NodeKind, id: Uuid) -> StoreResult<bool> {
        self.ensure_writable()?;
        let q = Query::new(format!(
            "MATCH (n:{} {{id: $id}}) DETACH DELETE n RETURN count(*) AS deleted",
            kind.label()
        ))
        .param("id", id.to_string());
        let rows = self.rows(q).await?;
        let deleted = rows
            .first()
            .and_then(|row| row.get::<i64>("deleted").ok())
            .unwrap_or(0);
        Ok(deleted > 0)
    }

    async fn edges(
        &mut self,
        id: Uuid,
        rel: RelationshipType,
        direction: Direction,
    ) -> StoreResult<Vec<Edge>> {
        let pattern = match direction {
            Direction::Outgoing => "(n:Entity {id: $id})-[r:{rel}]->(m:Entity)",
            Direction::Incoming => "(n:Entity {id: $id})<-[r:{rel}]-(m:Entity)",
            Direction::Both => "(n:Entity {id: $id})-[r:{rel}]-(m:Entity)",
        }
        .replace("{rel}", rel.type_name());
        let q = Query::new(format!(
            "MATCH {} RETURN startNode(r).id AS from, endNode(r).id AS to, r.data AS data",
            pattern
        ))
        .param("id", id.to_string());

        self.rows(q)
            .await?
            .iter()
            .map(|row| edge_from_row(row, rel))
            .collect()
    }

    async fn relate(&mut self, edge: Edge) -> StoreResult<()> {
        self.ensure_writable()?;
        let q = Query::new(format!(
            "MATCH (a:Entity {{id: $from}}), (b:Entity {{id: $to}}) \
             MERGE (a)-[r:{}]->(b) SET r.data = $data RETURN count(r) AS related",
            edge.rel.type_name()
        ))
        .param("from", edge.from.to_string())
        .param("to", edge.to.to_string())
        .param("data", serde_json::to_string(&edge.properties)?);

        let related = self
            .rows(q)
            .await?
            .first()
            .and_then(|row| row.get::<i64>("related").ok())
            .unwrap_or(0);
        if related == 0 {
            return Err(StoreError::MissingEndpoint(edge.from));
        }
        Ok(())
    }

    async fn unrelate(&mut self, from: Uuid, rel: RelationshipType, to: Uuid) -> StoreResult<bool> {
        self.ensure_writable()?;
        let q = Query::new(format!(
            "MATCH (:Entity {{id: $from}})-[r:{}]->(:Entity {{id: $to}}) \
             DELETE r RETURN count(*) AS removed",
            rel.type_name()
        ))
        .param("from", from.to_string())
        .param("to", to.to_string());

        let removed = self
            .rows(q)
            .await?
            .first()
            .and_then(|row| row.get::<i64>("removed").ok())
            .unwrap_or(0);
        Ok(removed > 0)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.txn.commit().await.map_err(unavailable)
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        if let Err(e) = self.txn.rollback().await {
            warn!("Neo4j rollback failed: {}", e);
            return Err(unavailable(e));
        }
        Ok(())
    }
}

fn unavailable(err: neo4rs::Error) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

fn constraint_or_unavailable(err: neo4rs::Error, kind: NodeKind, id: Uuid) -> StoreError {
    let message = err.to_string();
    if message.contains("ConstraintValidationFailed") || message.contains("already exists with") {
        StoreError::Constraint {
            kind,
            key: violated_key(&message).unwrap_or_else(|| format!("id={}", id)),
        }
    } else {
        unavailable(err)
    }
}

/// `property=value` out of a Neo4j uniqueness failure such as
/// ``Node(12) already exists with label `Provider` and property `name` = 'site1'``
fn violated_key(message: &str) -> Option<String> {
    let rest = &message[message.find("property `")? + "property `".len()..];
    let property = &rest[..rest.find('`')?];
    let value = rest[property.len() + 1..]
        .trim_start()
        .strip_prefix('=')?
        .trim()
        .trim_end_matches(|c: char| c == ')' || c == '}' || c == '"')
        .trim_matches('\'');
    Some(format!("{}={}", property, value))
}

fn bind_scalar(q: Query, name: &str, value: Value) -> Query {
    match value {
        Value::String(s) => q.param(name, s),
        Value::Bool(b) => q.param(name, b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => q.param(name, i),
            None => q.param(name, n.as_f64().unwrap_or_default()),
        },
        _ => q,
    }
}

fn is_identifier(key: &str) -> bool {
    !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// `WHERE` clause for the scalar part of a filter
fn where_clause(filter: &PropertyFilter) -> (String, Vec<(String, Value)>) {
    let mut conditions = Vec::new();
    let mut params = Vec::new();
    for (key, value) in filter.iter() {
        if !is_identifier(key)
            || !matches!(value, Value::String(_) | Value::Bool(_) | Value::Number(_))
        {
            continue;
        }
        let name = format!("f{}", params.len());
        conditions.push(format!("n.`{}` = ${}", key, name));
        params.push((name, value.clone()));
    }
    if conditions.is_empty() {
        (String::new(), params)
    } else {
        (format!(" WHERE {}", conditions.join(" AND ")), params)
    }
}

fn parse_id(raw: &str) -> StoreResult<Uuid> {
    Uuid::parse_str(raw).map_err(|e| StoreError::Codec(format!("invalid id {}: {}", raw, e)))
}

fn node_from_row(row: &Row, kind: NodeKind) -> StoreResult<Node> {
    let id: String = row
        .get("id")
        .map_err(|e| StoreError::Codec(format!("missing node id: {}", e)))?;
    let data: String = row
        .get("data")
        .map_err(|e| StoreError::Codec(format!("missing node data: {}", e)))?;
    let properties: Map<String, Value> = serde_json::from_str(&data)?;
    Ok(Node {
        kind,
        id: parse_id(&id)?,
        properties,
    })
}

fn edge_from_row(row: &Row, rel: RelationshipType) -> StoreResult<Edge> {
    let from: String = row
        .get("from")
        .map_err(|e| StoreError::Codec(format!("missing edge source: {}", e)))?;
    let to: String = row
        .get("to")
        .map_err(|e| StoreError::Codec(format!("missing edge target: {}", e)))?;
    let properties = match row.get::<String>("data") {
        Ok(data) => serde_json::from_str(&data)?,
        Err(_) => Map::new(),
    };
    Ok(Edge {
        from: parse_id(&from)?,
        rel,
        to: parse_id(&to)?,
        properties,
    })
}
