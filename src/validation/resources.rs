// Copyright (c) 2025 - Cowboy AI, Inc.
//! Rules for Quotas and catalog entries (Flavors, Images, Networks)

use async_trait::async_trait;
use uuid::Uuid;

use super::{ensure_unique, service_provider, Validated};
use crate::domain::{CatalogEntry, Flavor, Image, Network, Project, Quota, Service, ServiceType};
use crate::errors::{RegistryError, RegistryResult};
use crate::graph::{Entity, PropertyFilter};
use crate::repository::Repository;

#[async_trait]
impl Validated for Quota {
    async fn check_create(
        &self,
        repo: &mut Repository,
        exclude: Option<Uuid>,
    ) -> RegistryResult<()> {
        let service = repo.reference::<Service>(self.service_id).await?;
        if service.service_type() == ServiceType::Identity {
            return Err(RegistryError::invariant(format!(
                "identity service {} carries no quotas",
                service.endpoint
            )));
        }
        if self.limits.service_type() != service.service_type() {
            return Err(RegistryError::invariant(format!(
                "{} limits cannot apply to {} service {}",
                self.limits.service_type(),
                service.service_type(),
                service.endpoint
            )));
        }

        if let Some(project_id) = self.project_id {
            let project = repo.reference::<Project>(project_id).await?;
            if project.provider_id != service_provider(repo, &service).await? {
                return Err(RegistryError::invariant(format!(
                    "project {} does not belong to the provider of service {}",
                    project.name, service.endpoint
                )));
            }
        }

        let scope = match self.project_id {
            Some(project_id) => format!("project_id={}", project_id),
            None => "default".to_string(),
        };
        ensure_unique::<Quota>(
            repo,
            PropertyFilter::new()
                .id_eq("service_id", self.service_id)
                .opt_id_eq("project_id", self.project_id),
            exclude,
            format!("service_id={}, {}", self.service_id, scope),
        )
        .await
    }
}

/// Shared rules of flavors, images and networks
async fn check_catalog_entry<E: CatalogEntry + Entity>(
    entry: &E,
    repo: &mut Repository,
    exclude: Option<Uuid>,
) -> RegistryResult<()> {
    let service = repo.reference::<Service>(entry.service_id()).await?;
    if service.service_type() != E::OFFERED_BY {
        return Err(RegistryError::invariant(format!(
            "{} must be offered by a {} service, not {} service {}",
            E::KIND,
            E::OFFERED_BY,
            service.service_type(),
            service.endpoint
        )));
    }

    ensure_unique::<E>(
        repo,
        PropertyFilter::new()
            .id_eq("service_id", entry.service_id())
            .eq("uuid", entry.uuid()),
        exclude,
        format!("service_id={}, uuid={}", entry.service_id(), entry.uuid()),
    )
    .await?;

    let provider_id = service_provider(repo, &service).await?;
    for project_id in entry.visibility().projects() {
        let project = repo.reference::<Project>(project_id).await?;
        if project.provider_id != provider_id {
            return Err(RegistryError::invariant(format!(
                "{} {} cannot be shared with project {} of another provider",
                E::KIND,
                entry.uuid(),
                project.name
            )));
        }
    }
    Ok(())
}

macro_rules! validated_catalog_entry {
    ($entity:ty) => {
        #[async_trait]
        impl Validated for $entity {
            async fn check_create(
                &self,
                repo: &mut Repository,
                exclude: Option<Uuid>,
            ) -> RegistryResult<()> {
                check_catalog_entry(self, repo, exclude).await
            }
        }
    };
}

validated_catalog_entry!(Flavor);
validated_catalog_entry!(Image);
validated_catalog_entry!(Network);
