// Copyright (c) 2025 - Cowboy AI, Inc.
//! Read/Write Façade for the Federation Registry
//!
//! This module is the only entry point of the registry. It composes the
//! entity schema, the validation layer and the projection engine on top of a
//! [`GraphStore`](crate::graph::GraphStore). Whole providers are written
//! from a manifest with `onboard_provider` and brought back in line with
//! `sync_provider`.
//!
//! # Architecture
//!
//! ```text
//! Client Request
//!     ↓
//! Façade (this module)
//!     ↓
//! write: Validation Layer ──reject──▶ RegistryError
//!     ↓ accept
//! Repository (entity ⇄ node + owned edges)
//!     ↓
//! GraphStore transaction (memory or Neo4j)
//!
//! read: Projection Engine (caller → visible scope)
//!     ↓
//! Repository queries, filtered by scope
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use fed_registry::{CallerScope, FederationRegistry, MemoryGraphStore};
//! use fed_registry::domain::{Provider, ProviderSpec, ProviderType};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = FederationRegistry::new(MemoryGraphStore::new());
//!     registry.initialize().await?;
//!
//!     let site = Provider::new(ProviderSpec::new("site1", ProviderType::Openstack).public())?;
//!     let site = registry.create(site).await?;
//!
//!     let visible: Provider = registry.read(site.id, &CallerScope::Anonymous).await?;
//!     Ok(())
//! }
//! ```

mod onboarding;
mod registry;
mod sync;

pub use onboarding::{
    FlavorManifest, ImageManifest, NetworkManifest, OnboardingReport, ProjectManifest,
    ProviderManifest, QuotaManifest, RegionManifest, ServiceManifest, SlaManifest, TrustManifest,
    UserGroupManifest,
};
pub use registry::{CascadeReport, FederationRegistry, ListQuery, Managed};
pub use sync::SyncReport;
