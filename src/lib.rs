// Copyright (c) 2025 - Cowboy AI, Inc.
//! Federation registry
//!
//! A graph-shaped catalog of the cloud providers taking part in a federation:
//! their regions, services, projects, quotas and catalog entries, the
//! identity providers they trust, and which user groups may use which
//! projects through SLAs.
//!
//! All access goes through [`FederationRegistry`], which validates writes
//! against the stored graph and filters reads by the caller's
//! [`CallerScope`]. Storage is pluggable behind [`graph::GraphStore`]; an
//! in-memory store is always available and a Neo4j store is enabled with the
//! `neo4j` feature.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod errors;
pub mod graph;
pub mod projection;
pub mod repository;
pub mod service;
pub mod validation;

// Re-export commonly used types
pub use adapters::MemoryGraphStore;
#[cfg(feature = "neo4j")]
pub use adapters::Neo4jGraphStore;
pub use config::{ConfigError, Neo4jConfig, RegistryConfig, RetryPolicy};
pub use errors::{RegistryError, RegistryResult};
pub use graph::{GraphStore, NodeKind, PropertyFilter, RelationshipType};
pub use projection::{CallerScope, EffectiveQuota};
pub use service::{
    CascadeReport, FederationRegistry, ListQuery, OnboardingReport, ProviderManifest, SyncReport,
};
pub use validation::{DeleteOptions, Relink};
