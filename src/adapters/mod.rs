// Copyright (c) 2025 - Cowboy AI, Inc.

//! Graph store implementations
//!
//! Concrete backends for the [`GraphStore`](crate::graph::GraphStore) seam.

pub mod memory;

pub use memory::MemoryGraphStore;

#[cfg(feature = "neo4j")]
pub mod neo4j;

#[cfg(feature = "neo4j")]
pub use neo4j::Neo4jGraphStore;
