// Copyright (c) 2025 - Cowboy AI, Inc.
//! Rules for Providers, Regions, Projects and Services

use async_trait::async_trait;
use uuid::Uuid;

use super::{
    cascade_region, cascade_service, ensure_unique, service_has_dependents, service_provider,
    CascadePlan, DeleteOptions, Validated,
};
use crate::domain::{
    CatalogEntry, Flavor, IdentityProvider, Image, Network, Project, Provider, Quota, Region,
    Service, Sla, UserGroup,
};
use crate::errors::{RegistryError, RegistryResult};
use crate::graph::{Direction, Entity, NodeKind, PropertyFilter, RelationshipType};
use crate::repository::Repository;

#[async_trait]
impl Validated for Provider {
    async fn check_create(
        &self,
        repo: &mut Repository,
        exclude: Option<Uuid>,
    ) -> RegistryResult<()> {
        ensure_unique::<Provider>(
            repo,
            PropertyFilter::new().eq("name", self.name.as_str()),
            exclude,
            format!("name={}", self.name),
        )
        .await?;
        for link in &self.identity_providers {
            repo.reference::<IdentityProvider>(link.identity_provider_id)
                .await?;
        }
        Ok(())
    }

    async fn check_update(&self, current: &Self, repo: &mut Repository) -> RegistryResult<()> {
        self.check_create(repo, Some(current.id)).await?;

        let dropped: Vec<Uuid> = current
            .identity_providers
            .iter()
            .map(|l| l.identity_provider_id)
            .filter(|idp| !self.trusts(*idp))
            .collect();
        if dropped.is_empty() {
            return Ok(());
        }
        for project in repo
            .children::<Project>(self.id, RelationshipType::HasProject)
            .await?
        {
            for sla in repo
                .parents::<Sla>(project.id, RelationshipType::Grants)
                .await?
            {
                let group = repo.reference::<UserGroup>(sla.user_group_id).await?;
                if dropped.contains(&group.identity_provider_id) {
                    return Err(RegistryError::invariant(format!(
                        "provider {} still needs its trust in identity provider {} for SLA {}",
                        self.name, group.identity_provider_id, sla.doc_uuid
                    )));
                }
            }
        }
        Ok(())
    }

    async fn plan_delete(
        &self,
        repo: &mut Repository,
        options: DeleteOptions,
    ) -> RegistryResult<CascadePlan> {
        let mut plan = CascadePlan::new(NodeKind::Provider, self.id);
        for region in repo
            .children::<Region>(self.id, RelationshipType::HasRegion)
            .await?
        {
            cascade_region(repo, &mut plan, region.id).await?;
        }
        for project in repo
            .children::<Project>(self.id, RelationshipType::HasProject)
            .await?
        {
            for quota in repo
                .parents::<Quota>(project.id, RelationshipType::AppliesTo)
                .await?
            {
                plan.remove(NodeKind::Quota, quota.id);
            }
            let slas = repo
                .parents::<Sla>(project.id, RelationshipType::Grants)
                .await?;
            if !slas.is_empty() {
                plan.cross(
                    options,
                    format!("project {} is granted by {} SLA(s)", project.name, slas.len()),
                )?;
                for sla in slas {
                    plan.remove(NodeKind::Sla, sla.id);
                }
            }
            plan.remove(NodeKind::Project, project.id);
        }
        // Trust links go with the provider node; identity providers survive.
        Ok(plan)
    }
}

#[async_trait]
impl Validated for Region {
    async fn check_create(
        &self,
        repo: &mut Repository,
        exclude: Option<Uuid>,
    ) -> RegistryResult<()> {
        repo.reference::<Provider>(self.provider_id).await?;
        ensure_unique::<Region>(
            repo,
            PropertyFilter::new()
                .id_eq("provider_id", self.provider_id)
                .eq("name", self.name.as_str()),
            exclude,
            format!("provider_id={}, name={}", self.provider_id, self.name),
        )
        .await
    }

    async fn check_update(&self, current: &Self, repo: &mut Repository) -> RegistryResult<()> {
        self.check_create(repo, Some(current.id)).await?;
        if self.provider_id != current.provider_id
            && !repo
                .neighbours(self.id, RelationshipType::Hosts, Direction::Outgoing)
                .await?
                .is_empty()
        {
            return Err(RegistryError::invariant(format!(
                "region {} hosts services and cannot move to another provider",
                current.name
            )));
        }
        Ok(())
    }

    async fn plan_delete(
        &self,
        repo: &mut Repository,
        _options: DeleteOptions,
    ) -> RegistryResult<CascadePlan> {
        let mut plan = CascadePlan::new(NodeKind::Region, self.id);
        cascade_region(repo, &mut plan, self.id).await?;
        Ok(plan)
    }
}

#[async_trait]
impl Validated for Project {
    async fn check_create(
        &self,
        repo: &mut Repository,
        exclude: Option<Uuid>,
    ) -> RegistryResult<()> {
        repo.reference::<Provider>(self.provider_id).await?;
        ensure_unique::<Project>(
            repo,
            PropertyFilter::new()
                .id_eq("provider_id", self.provider_id)
                .eq("uuid", self.uuid.as_str()),
            exclude,
            format!("provider_id={}, uuid={}", self.provider_id, self.uuid),
        )
        .await?;
        ensure_unique::<Project>(
            repo,
            PropertyFilter::new()
                .id_eq("provider_id", self.provider_id)
                .eq("name", self.name.as_str()),
            exclude,
            format!("provider_id={}, name={}", self.provider_id, self.name),
        )
        .await
    }

    async fn check_update(&self, current: &Self, repo: &mut Repository) -> RegistryResult<()> {
        self.check_create(repo, Some(current.id)).await?;
        if self.provider_id == current.provider_id {
            return Ok(());
        }
        for (rel, direction, what) in [
            (RelationshipType::Grants, Direction::Incoming, "SLAs"),
            (RelationshipType::AppliesTo, Direction::Incoming, "quotas"),
            (RelationshipType::CanUse, Direction::Outgoing, "private catalog entries"),
        ] {
            if !repo.neighbours(self.id, rel, direction).await?.is_empty() {
                return Err(RegistryError::invariant(format!(
                    "project {} is referenced by {} and cannot move to another provider",
                    current.name, what
                )));
            }
        }
        Ok(())
    }

    async fn plan_delete(
        &self,
        repo: &mut Repository,
        options: DeleteOptions,
    ) -> RegistryResult<CascadePlan> {
        let mut plan = CascadePlan::new(NodeKind::Project, self.id);
        for quota in repo
            .parents::<Quota>(self.id, RelationshipType::AppliesTo)
            .await?
        {
            plan.remove(NodeKind::Quota, quota.id);
        }

        let slas = repo.parents::<Sla>(self.id, RelationshipType::Grants).await?;
        if !slas.is_empty() {
            plan.cross(options, format!("granted by {} SLA(s)", slas.len()))?;
            for sla in slas {
                plan.remove(NodeKind::Sla, sla.id);
            }
        }

        let flavors = repo.children::<Flavor>(self.id, RelationshipType::CanUse).await?;
        unshare_all(&mut plan, self.id, &flavors, options)?;
        let images = repo.children::<Image>(self.id, RelationshipType::CanUse).await?;
        unshare_all(&mut plan, self.id, &images, options)?;
        let networks = repo.children::<Network>(self.id, RelationshipType::CanUse).await?;
        unshare_all(&mut plan, self.id, &networks, options)?;
        Ok(plan)
    }
}

/// Drop a deleted project from private entries; entries left unshared go too
fn unshare_all<E: CatalogEntry + Entity>(
    plan: &mut CascadePlan,
    project_id: Uuid,
    entries: &[E],
    options: DeleteOptions,
) -> RegistryResult<()> {
    for entry in entries {
        match entry.visibility().without_project(project_id) {
            Some(_) => plan.relink(super::Relink::Unshare {
                kind: E::KIND,
                entry_id: entry.id(),
                project_id,
            }),
            None => {
                plan.cross(
                    options,
                    format!("{} {} is private to this project only", E::KIND, entry.uuid()),
                )?;
                plan.remove(E::KIND, entry.id());
            }
        }
    }
    Ok(())
}

#[async_trait]
impl Validated for Service {
    async fn check_create(
        &self,
        repo: &mut Repository,
        exclude: Option<Uuid>,
    ) -> RegistryResult<()> {
        repo.reference::<Region>(self.region_id).await?;
        ensure_unique::<Service>(
            repo,
            PropertyFilter::new().eq("endpoint", self.endpoint.as_str()),
            exclude,
            format!("endpoint={}", self.endpoint),
        )
        .await
    }

    async fn check_update(&self, current: &Self, repo: &mut Repository) -> RegistryResult<()> {
        self.check_create(repo, Some(current.id)).await?;

        let kind_changed = self.service_type() != current.service_type();
        let provider_changed = self.region_id != current.region_id
            && service_provider(repo, self).await? != service_provider(repo, current).await?;
        if (kind_changed || provider_changed) && service_has_dependents(repo, self.id).await? {
            return Err(RegistryError::invariant(format!(
                "service {} carries quotas or catalog entries; its kind and provider are fixed",
                current.endpoint
            )));
        }
        Ok(())
    }

    async fn plan_delete(
        &self,
        repo: &mut Repository,
        _options: DeleteOptions,
    ) -> RegistryResult<CascadePlan> {
        let mut plan = CascadePlan::new(NodeKind::Service, self.id);
        cascade_service(repo, &mut plan, self.id).await?;
        Ok(plan)
    }
}
