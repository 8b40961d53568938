// Copyright (c) 2025 - Cowboy AI, Inc.
//! Federation Entity Schema
//!
//! Typed definitions of every entity the registry stores, with constructors
//! that reject structurally invalid input before anything reaches storage.
//!
//! # Entities
//!
//! - [`Provider`] - Cloud site, owns Regions and Projects, trusts Identity Providers
//! - [`Region`] - Region of a Provider, hosts Services
//! - [`IdentityProvider`] - Token issuer shared between Providers
//! - [`UserGroup`] - Group asserted by an Identity Provider
//! - [`Sla`] - Grant of one Project to one User Group
//! - [`Project`] - Tenant space inside a Provider
//! - [`Service`] - Compute, block-storage, network or identity endpoint
//! - [`Quota`] - Service default or per-project limits
//! - [`Flavor`], [`Image`], [`Network`] - Service catalogs, public or private
//!
//! # Value Objects
//!
//! - [`Endpoint`] - Canonical http(s) URL
//! - [`Location`] - Site, country and coordinates of a Region
//! - [`AuthMethod`] - Provider ↔ Identity Provider trust link
//! - [`Visibility`] - Public or private-to-projects catalog mode
//!
//! Cross-entity rules (uniqueness, parent existence, ownership) are not checked
//! here; see [`crate::validation`].

pub mod catalog;
pub mod endpoint;
pub mod identity;
pub mod project;
pub mod provider;
pub mod quota;
pub mod region;
pub mod schema;
pub mod service;

pub use catalog::{
    CatalogEntry, Flavor, FlavorPatch, FlavorSpec, Image, ImagePatch, ImageSpec, Network,
    NetworkPatch, NetworkSpec, OsType, Visibility,
};
pub use endpoint::Endpoint;
pub use identity::{
    IdentityProvider, IdentityProviderPatch, IdentityProviderSpec, Sla, SlaPatch, SlaSpec,
    UserGroup, UserGroupPatch, UserGroupSpec,
};
pub use project::{Project, ProjectPatch, ProjectSpec};
pub use provider::{
    AuthMethod, Provider, ProviderPatch, ProviderSpec, ProviderStatus, ProviderType,
};
pub use quota::{Quota, QuotaLimits, QuotaPatch, QuotaSpec};
pub use region::{Location, Region, RegionPatch, RegionSpec};
pub use schema::{SchemaResult, SchemaViolation};
pub use service::{Service, ServiceKind, ServicePatch, ServiceSpec, ServiceType};

/// Entities that accept a typed partial update
///
/// Applying a patch never mutates `self`; it yields the proposed entity, with
/// the same structural checks as the constructor re-run on the result.
pub trait Patchable: Sized {
    type Patch: Send + Sync + 'static;

    fn apply(&self, patch: Self::Patch) -> SchemaResult<Self>;
}
