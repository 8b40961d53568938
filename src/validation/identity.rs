// Copyright (c) 2025 - Cowboy AI, Inc.
//! Rules for Identity Providers, User Groups and SLAs

use async_trait::async_trait;
use uuid::Uuid;

use super::{ensure_unique, CascadePlan, DeleteOptions, Relink, Validated};
use crate::domain::{IdentityProvider, Project, Provider, Sla, UserGroup};
use crate::errors::{RegistryError, RegistryResult};
use crate::graph::{NodeKind, PropertyFilter, RelationshipType};
use crate::repository::Repository;

#[async_trait]
impl Validated for IdentityProvider {
    async fn check_create(
        &self,
        repo: &mut Repository,
        exclude: Option<Uuid>,
    ) -> RegistryResult<()> {
        ensure_unique::<IdentityProvider>(
            repo,
            PropertyFilter::new().eq("endpoint", self.endpoint.as_str()),
            exclude,
            format!("endpoint={}", self.endpoint),
        )
        .await
    }

    async fn plan_delete(
        &self,
        repo: &mut Repository,
        options: DeleteOptions,
    ) -> RegistryResult<CascadePlan> {
        let mut plan = CascadePlan::new(NodeKind::IdentityProvider, self.id);
        for group in repo
            .children::<UserGroup>(self.id, RelationshipType::HasUserGroup)
            .await?
        {
            for sla in repo
                .children::<Sla>(group.id, RelationshipType::HoldsSla)
                .await?
            {
                plan.remove(NodeKind::Sla, sla.id);
            }
            plan.remove(NodeKind::UserGroup, group.id);
        }

        let trusting = repo
            .parents::<Provider>(self.id, RelationshipType::Trusts)
            .await?;
        if !trusting.is_empty() {
            let names: Vec<&str> = trusting.iter().map(|p| p.name.as_str()).collect();
            plan.cross(options, format!("trusted by {}", names.join(", ")))?;
            for provider in &trusting {
                plan.relink(Relink::DropTrust {
                    provider_id: provider.id,
                    identity_provider_id: self.id,
                });
            }
        }
        Ok(plan)
    }
}

#[async_trait]
impl Validated for UserGroup {
    async fn check_create(
        &self,
        repo: &mut Repository,
        exclude: Option<Uuid>,
    ) -> RegistryResult<()> {
        repo.reference::<IdentityProvider>(self.identity_provider_id)
            .await?;
        ensure_unique::<UserGroup>(
            repo,
            PropertyFilter::new()
                .id_eq("identity_provider_id", self.identity_provider_id)
                .eq("name", self.name.as_str()),
            exclude,
            format!(
                "identity_provider_id={}, name={}",
                self.identity_provider_id, self.name
            ),
        )
        .await
    }

    async fn check_update(&self, current: &Self, repo: &mut Repository) -> RegistryResult<()> {
        self.check_create(repo, Some(current.id)).await?;
        if self.identity_provider_id == current.identity_provider_id {
            return Ok(());
        }
        for sla in repo
            .children::<Sla>(self.id, RelationshipType::HoldsSla)
            .await?
        {
            let project = repo.reference::<Project>(sla.project_id).await?;
            let provider = repo.reference::<Provider>(project.provider_id).await?;
            if !provider.trusts(self.identity_provider_id) {
                return Err(RegistryError::invariant(format!(
                    "SLA {} grants project {} of provider {}, which does not trust identity provider {}",
                    sla.doc_uuid, project.name, provider.name, self.identity_provider_id
                )));
            }
        }
        Ok(())
    }

    async fn plan_delete(
        &self,
        repo: &mut Repository,
        _options: DeleteOptions,
    ) -> RegistryResult<CascadePlan> {
        let mut plan = CascadePlan::new(NodeKind::UserGroup, self.id);
        for sla in repo
            .children::<Sla>(self.id, RelationshipType::HoldsSla)
            .await?
        {
            plan.remove(NodeKind::Sla, sla.id);
        }
        Ok(plan)
    }
}

#[async_trait]
impl Validated for Sla {
    async fn check_create(
        &self,
        repo: &mut Repository,
        exclude: Option<Uuid>,
    ) -> RegistryResult<()> {
        let group = repo.reference::<UserGroup>(self.user_group_id).await?;
        let project = repo.reference::<Project>(self.project_id).await?;

        ensure_unique::<Sla>(
            repo,
            PropertyFilter::new()
                .id_eq("user_group_id", self.user_group_id)
                .id_eq("project_id", self.project_id),
            exclude,
            format!(
                "user_group_id={}, project_id={}",
                self.user_group_id, self.project_id
            ),
        )
        .await?;
        ensure_unique::<Sla>(
            repo,
            PropertyFilter::new().eq("doc_uuid", self.doc_uuid.as_str()),
            exclude,
            format!("doc_uuid={}", self.doc_uuid),
        )
        .await?;

        let provider = repo.reference::<Provider>(project.provider_id).await?;
        if !provider.trusts(group.identity_provider_id) {
            return Err(RegistryError::invariant(format!(
                "provider {} does not trust the identity provider of user group {}",
                provider.name, group.name
            )));
        }
        Ok(())
    }
}
