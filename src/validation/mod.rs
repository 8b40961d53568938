// Copyright (c) 2025 - Cowboy AI, Inc.
//! Validation Layer
//!
//! Cross-entity rules checked against the current graph, inside the write
//! transaction that will persist the change:
//!
//! - **create**: parent existence ([`RegistryError::DanglingReference`]),
//!   composite-key uniqueness ([`RegistryError::Conflict`]) and cross-entity
//!   invariants ([`RegistryError::InvariantViolation`])
//! - **update**: the create checks excluding the entity itself, plus
//!   refusal of changes that would break ownership
//! - **delete**: a [`CascadePlan`] of removals and re-links. Strictly owned
//!   children always cascade; crossing a boundary shared with another
//!   still-valid parent is refused unless forced.
//!
//! Structural checks on a single entity happen earlier, in the constructors
//! of [`crate::domain`].

mod identity;
mod resources;
mod topology;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::{Flavor, Image, Network, Quota, Region, Service};
use crate::errors::{RegistryError, RegistryResult};
use crate::graph::{Direction, Entity, NodeKind, PropertyFilter, RelationshipType};
use crate::repository::Repository;

/// Options of a delete request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOptions {
    /// Cross shared ownership boundaries instead of refusing
    pub force: bool,
}

impl DeleteOptions {
    pub fn forced() -> Self {
        Self { force: true }
    }
}

/// Adjustment of a surviving entity made by a cascade
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Relink {
    /// Drop the provider's trust link to a deleted identity provider
    DropTrust {
        provider_id: Uuid,
        identity_provider_id: Uuid,
    },
    /// Remove a deleted project from a private catalog entry
    Unshare {
        kind: NodeKind,
        entry_id: Uuid,
        project_id: Uuid,
    },
}

/// Everything a delete will remove or adjust
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadePlan {
    pub target_kind: NodeKind,
    pub target_id: Uuid,

    /// Nodes to detach-delete, target last
    pub removals: Vec<(NodeKind, Uuid)>,

    /// Adjustments applied before any removal
    pub relinks: Vec<Relink>,
}

impl CascadePlan {
    pub fn new(target_kind: NodeKind, target_id: Uuid) -> Self {
        Self {
            target_kind,
            target_id,
            removals: Vec::new(),
            relinks: Vec::new(),
        }
    }

    pub fn remove(&mut self, kind: NodeKind, id: Uuid) {
        if !self.removals.contains(&(kind, id)) {
            self.removals.push((kind, id));
        }
    }

    pub fn relink(&mut self, relink: Relink) {
        if !self.relinks.contains(&relink) {
            self.relinks.push(relink);
        }
    }

    pub fn removes(&self, kind: NodeKind, id: Uuid) -> bool {
        self.removals.contains(&(kind, id))
    }

    /// Close the plan with the target itself
    fn finish(mut self) -> Self {
        let target = (self.target_kind, self.target_id);
        self.removals.retain(|r| *r != target);
        self.removals.push(target);
        self
    }

    /// Refuse a shared-boundary crossing unless forced
    fn cross(&self, options: DeleteOptions, reason: String) -> RegistryResult<()> {
        if options.force {
            warn!(
                "Forced delete of {} {}: {}",
                self.target_kind, self.target_id, reason
            );
            Ok(())
        } else {
            Err(RegistryError::invariant(format!(
                "cannot delete {} {}: {}",
                self.target_kind, self.target_id, reason
            )))
        }
    }
}

/// Cross-entity rules of one entity kind
#[async_trait]
pub trait Validated: Entity {
    /// Parent existence, uniqueness and invariants; `exclude` skips the
    /// entity itself in uniqueness checks
    async fn check_create(&self, repo: &mut Repository, exclude: Option<Uuid>)
        -> RegistryResult<()>;

    async fn check_update(&self, current: &Self, repo: &mut Repository) -> RegistryResult<()> {
        self.check_create(repo, Some(current.id())).await
    }

    /// Leaves remove nothing but themselves
    async fn plan_delete(
        &self,
        _repo: &mut Repository,
        _options: DeleteOptions,
    ) -> RegistryResult<CascadePlan> {
        Ok(CascadePlan::new(Self::KIND, self.id()))
    }
}

pub async fn validate_create<E: Validated>(
    entity: &E,
    repo: &mut Repository,
) -> RegistryResult<()> {
    if repo.exists::<E>(entity.id()).await? {
        return Err(RegistryError::conflict(E::KIND, format!("id={}", entity.id())));
    }
    entity.check_create(repo, None).await?;
    debug!("Create of {} {} accepted", E::KIND, entity.id());
    Ok(())
}

pub async fn validate_update<E: Validated>(
    current: &E,
    proposed: &E,
    repo: &mut Repository,
) -> RegistryResult<()> {
    if current.id() != proposed.id() {
        return Err(RegistryError::invariant(format!(
            "{} id cannot change ({} -> {})",
            E::KIND,
            current.id(),
            proposed.id()
        )));
    }
    proposed.check_update(current, repo).await?;
    debug!("Update of {} {} accepted", E::KIND, current.id());
    Ok(())
}

pub async fn validate_delete<E: Validated>(
    entity: &E,
    repo: &mut Repository,
    options: DeleteOptions,
) -> RegistryResult<CascadePlan> {
    let plan = entity.plan_delete(repo, options).await?.finish();
    debug!(
        "Delete of {} {} planned: {} removals, {} relinks",
        E::KIND,
        entity.id(),
        plan.removals.len(),
        plan.relinks.len()
    );
    Ok(plan)
}

/// Fail with a conflict when another entity matches `filter`
async fn ensure_unique<E: Entity>(
    repo: &mut Repository,
    filter: PropertyFilter,
    exclude: Option<Uuid>,
    key: impl Into<String>,
) -> RegistryResult<()> {
    let clash = repo
        .find::<E>(&filter)
        .await?
        .into_iter()
        .any(|other| Some(other.id()) != exclude);
    if clash {
        return Err(RegistryError::conflict(E::KIND, key));
    }
    Ok(())
}

/// Provider owning a service, through its region
async fn service_provider(repo: &mut Repository, service: &Service) -> RegistryResult<Uuid> {
    Ok(repo.reference::<Region>(service.region_id).await?.provider_id)
}

/// Whether a service carries quotas or catalog entries
async fn service_has_dependents(repo: &mut Repository, service_id: Uuid) -> RegistryResult<bool> {
    for rel in [RelationshipType::LimitedBy, RelationshipType::Offers] {
        if !repo
            .neighbours(service_id, rel, Direction::Outgoing)
            .await?
            .is_empty()
        {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Remove a service with its quotas and catalog entries
async fn cascade_service(
    repo: &mut Repository,
    plan: &mut CascadePlan,
    service_id: Uuid,
) -> RegistryResult<()> {
    for quota in repo
        .children::<Quota>(service_id, RelationshipType::LimitedBy)
        .await?
    {
        plan.remove(NodeKind::Quota, quota.id);
    }
    for flavor in repo
        .children::<Flavor>(service_id, RelationshipType::Offers)
        .await?
    {
        plan.remove(NodeKind::Flavor, flavor.id);
    }
    for image in repo
        .children::<Image>(service_id, RelationshipType::Offers)
        .await?
    {
        plan.remove(NodeKind::Image, image.id);
    }
    for network in repo
        .children::<Network>(service_id, RelationshipType::Offers)
        .await?
    {
        plan.remove(NodeKind::Network, network.id);
    }
    plan.remove(NodeKind::Service, service_id);
    Ok(())
}

/// Remove a region with its services
async fn cascade_region(
    repo: &mut Repository,
    plan: &mut CascadePlan,
    region_id: Uuid,
) -> RegistryResult<()> {
    for service in repo
        .children::<Service>(region_id, RelationshipType::Hosts)
        .await?
    {
        cascade_service(repo, plan, service.id).await?;
    }
    plan.remove(NodeKind::Region, region_id);
    Ok(())
}
