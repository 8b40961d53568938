// Copyright (c) 2025 - Cowboy AI, Inc.
//! Visibility / Projection Engine
//!
//! Computes, for one caller, which part of the federation graph it may see.
//!
//! ```text
//! caller groups ──HOLDS_SLA──▶ SLAs ──GRANTS──▶ projects ◀──HAS_PROJECT── providers
//!                                                                  ∪ public providers
//! ```
//!
//! Projection is a pure function of the stored graph and the caller scope:
//! [`VisibleScope::resolve`] walks the graph once per request and every
//! [`Visible::is_visible`] decision afterwards is a set lookup. Nothing is
//! cached across requests.

mod catalog;

pub use catalog::{catalog_for_project, effective_quota, EffectiveQuota};

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;
use uuid::Uuid;

use crate::domain::{
    CatalogEntry, Flavor, IdentityProvider, Image, Network, Project, Provider, Quota, Region,
    Service, Sla, UserGroup,
};
use crate::errors::RegistryResult;
use crate::graph::{Direction, Entity, PropertyFilter, RelationshipType};
use crate::repository::Repository;

/// Identity of the caller as supplied by the authentication collaborator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", content = "groups", rename_all = "snake_case")]
pub enum CallerScope {
    /// No identity: public providers and their infrastructure only
    #[default]
    Anonymous,
    /// Member of the given user groups
    UserGroups(BTreeSet<Uuid>),
    /// Administrative caller seeing the whole graph
    Unrestricted,
}

impl CallerScope {
    pub fn groups(groups: impl IntoIterator<Item = Uuid>) -> Self {
        CallerScope::UserGroups(groups.into_iter().collect())
    }
}

/// The authorized subgraph of one caller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibleScope {
    unrestricted: bool,
    pub groups: BTreeSet<Uuid>,
    pub slas: BTreeSet<Uuid>,
    pub projects: BTreeSet<Uuid>,
    pub providers: BTreeSet<Uuid>,
    pub regions: BTreeSet<Uuid>,
    pub services: BTreeSet<Uuid>,
    pub identity_providers: BTreeSet<Uuid>,
}

impl VisibleScope {
    pub fn unrestricted() -> Self {
        Self {
            unrestricted: true,
            ..Self::default()
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        self.unrestricted
    }

    /// Walk the graph from the caller's groups
    pub async fn resolve(repo: &mut Repository, caller: &CallerScope) -> RegistryResult<Self> {
        let groups = match caller {
            CallerScope::Unrestricted => return Ok(Self::unrestricted()),
            CallerScope::Anonymous => BTreeSet::new(),
            CallerScope::UserGroups(groups) => groups.clone(),
        };

        let mut scope = Self::default();
        for group in &groups {
            if !repo.exists::<UserGroup>(*group).await? {
                continue;
            }
            scope.groups.insert(*group);
            scope.identity_providers.extend(
                repo.neighbours(*group, RelationshipType::HasUserGroup, Direction::Incoming)
                    .await?,
            );
            scope.slas.extend(
                repo.neighbours(*group, RelationshipType::HoldsSla, Direction::Outgoing)
                    .await?,
            );
        }
        for sla in &scope.slas {
            scope.projects.extend(
                repo.neighbours(*sla, RelationshipType::Grants, Direction::Outgoing)
                    .await?,
            );
        }
        for project in &scope.projects {
            scope.providers.extend(
                repo.neighbours(*project, RelationshipType::HasProject, Direction::Incoming)
                    .await?,
            );
        }
        scope.providers.extend(
            repo.find::<Provider>(&PropertyFilter::new().eq("is_public", true))
                .await?
                .into_iter()
                .map(|p| p.id),
        );

        for provider in &scope.providers {
            scope.identity_providers.extend(
                repo.neighbours(*provider, RelationshipType::Trusts, Direction::Outgoing)
                    .await?,
            );
            scope.regions.extend(
                repo.neighbours(*provider, RelationshipType::HasRegion, Direction::Outgoing)
                    .await?,
            );
        }
        for region in &scope.regions {
            scope.services.extend(
                repo.neighbours(*region, RelationshipType::Hosts, Direction::Outgoing)
                    .await?,
            );
        }

        debug!(
            "Resolved caller scope: {} groups, {} projects, {} providers",
            scope.groups.len(),
            scope.projects.len(),
            scope.providers.len()
        );
        Ok(scope)
    }

    fn sees(&self, set: &BTreeSet<Uuid>, id: Uuid) -> bool {
        self.unrestricted || set.contains(&id)
    }

    pub fn sees_project(&self, id: Uuid) -> bool {
        self.sees(&self.projects, id)
    }

    pub fn sees_service(&self, id: Uuid) -> bool {
        self.sees(&self.services, id)
    }

    pub fn sees_provider(&self, id: Uuid) -> bool {
        self.sees(&self.providers, id)
    }
}

/// Entities whose visibility derives from the caller scope
pub trait Visible: Entity {
    fn is_visible(&self, scope: &VisibleScope) -> bool;
}

impl Visible for Provider {
    fn is_visible(&self, scope: &VisibleScope) -> bool {
        scope.sees_provider(self.id)
    }
}

impl Visible for Region {
    fn is_visible(&self, scope: &VisibleScope) -> bool {
        scope.sees(&scope.regions, self.id)
    }
}

impl Visible for Service {
    fn is_visible(&self, scope: &VisibleScope) -> bool {
        scope.sees_service(self.id)
    }
}

impl Visible for IdentityProvider {
    fn is_visible(&self, scope: &VisibleScope) -> bool {
        scope.sees(&scope.identity_providers, self.id)
    }
}

impl Visible for Project {
    fn is_visible(&self, scope: &VisibleScope) -> bool {
        scope.sees_project(self.id)
    }
}

impl Visible for UserGroup {
    fn is_visible(&self, scope: &VisibleScope) -> bool {
        scope.sees(&scope.groups, self.id)
    }
}

impl Visible for Sla {
    fn is_visible(&self, scope: &VisibleScope) -> bool {
        scope.sees(&scope.slas, self.id)
    }
}

impl Visible for Quota {
    fn is_visible(&self, scope: &VisibleScope) -> bool {
        scope.sees_service(self.service_id)
            && self.project_id.map_or(true, |p| scope.sees_project(p))
    }
}

fn entry_visible<E: CatalogEntry>(entry: &E, scope: &VisibleScope) -> bool {
    scope.sees_service(entry.service_id())
        && (entry.visibility().is_public()
            || entry
                .visibility()
                .projects()
                .into_iter()
                .any(|p| scope.sees_project(p)))
}

impl Visible for Flavor {
    fn is_visible(&self, scope: &VisibleScope) -> bool {
        entry_visible(self, scope)
    }
}

impl Visible for Image {
    fn is_visible(&self, scope: &VisibleScope) -> bool {
        entry_visible(self, scope)
    }
}

impl Visible for Network {
    fn is_visible(&self, scope: &VisibleScope) -> bool {
        entry_visible(self, scope)
    }
}
