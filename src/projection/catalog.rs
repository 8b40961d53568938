// Copyright (c) 2025 - Cowboy AI, Inc.
//! Per-project resolution: effective quotas and usable catalogs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::VisibleScope;
use crate::domain::{CatalogEntry, Project, Quota, Region, Service};
use crate::errors::{RegistryError, RegistryResult};
use crate::graph::{Entity, NodeKind, PropertyFilter, RelationshipType};
use crate::repository::Repository;

/// Quota in force for a (project, service) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", content = "quota", rename_all = "snake_case")]
pub enum EffectiveQuota {
    /// Override defined for the project
    Project(Quota),
    /// Default of the service
    ServiceDefault(Quota),
    /// Neither exists
    Unbounded,
}

impl EffectiveQuota {
    pub fn quota(&self) -> Option<&Quota> {
        match self {
            EffectiveQuota::Project(q) | EffectiveQuota::ServiceDefault(q) => Some(q),
            EffectiveQuota::Unbounded => None,
        }
    }
}

async fn visible_project(
    repo: &mut Repository,
    scope: &VisibleScope,
    project_id: Uuid,
) -> RegistryResult<Project> {
    let not_found = RegistryError::NotFound {
        kind: NodeKind::Project,
        id: project_id,
    };
    if !scope.sees_project(project_id) {
        return Err(not_found);
    }
    repo.get::<Project>(project_id).await?.ok_or(not_found)
}

/// Per-project quota, else the service default, else unbounded
pub async fn effective_quota(
    repo: &mut Repository,
    scope: &VisibleScope,
    project_id: Uuid,
    service_id: Uuid,
) -> RegistryResult<EffectiveQuota> {
    visible_project(repo, scope, project_id).await?;
    let not_found = RegistryError::NotFound {
        kind: NodeKind::Service,
        id: service_id,
    };
    if !scope.sees_service(service_id) || !repo.exists::<Service>(service_id).await? {
        return Err(not_found);
    }

    let by_service = PropertyFilter::new().id_eq("service_id", service_id);
    if let Some(quota) = repo
        .find::<Quota>(&by_service.clone().id_eq("project_id", project_id))
        .await?
        .into_iter()
        .next()
    {
        return Ok(EffectiveQuota::Project(quota));
    }
    if let Some(quota) = repo
        .find::<Quota>(&by_service.opt_id_eq("project_id", None))
        .await?
        .into_iter()
        .next()
    {
        return Ok(EffectiveQuota::ServiceDefault(quota));
    }
    Ok(EffectiveQuota::Unbounded)
}

/// Entries usable by a project: public entries of its provider's services
/// plus private entries shared with the project, in id order
pub async fn catalog_for_project<E: CatalogEntry + Entity>(
    repo: &mut Repository,
    scope: &VisibleScope,
    project_id: Uuid,
) -> RegistryResult<Vec<E>> {
    let project = visible_project(repo, scope, project_id).await?;

    let mut entries = Vec::new();
    for region in repo
        .children::<Region>(project.provider_id, RelationshipType::HasRegion)
        .await?
    {
        for service in repo
            .children::<Service>(region.id, RelationshipType::Hosts)
            .await?
        {
            if service.service_type() != E::OFFERED_BY {
                continue;
            }
            entries.extend(
                repo.children::<E>(service.id, RelationshipType::Offers)
                    .await?
                    .into_iter()
                    .filter(|entry| {
                        entry.visibility().is_public()
                            || entry.visibility().is_shared_with(project_id)
                    }),
            );
        }
    }
    entries.sort_by_key(|entry| entry.id());
    Ok(entries)
}
