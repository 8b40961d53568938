// Copyright (c) 2025 - Cowboy AI, Inc.
//! Re-synchronising a stored provider with its manifest
//!
//! The manifest is the provider's full desired state. Stored entities are
//! matched to manifest entries by their natural key (project uuid, region
//! name, service endpoint, quota project, catalog entry uuid, SLA document);
//! matched ones are patched in place, unmatched manifest entries are created
//! and stored entities the manifest no longer lists are deleted through the
//! validation layer with default options. Deletions never cross a shared
//! boundary: a removal that would need `force` fails the whole sync.
//!
//! Identity providers and user groups are shared with other providers and are
//! never removed here; only the trust links and SLAs of this provider follow
//! the manifest.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};
use uuid::Uuid;

use super::onboarding::{
    resolve_identity_provider, resolve_user_group, ProjectsByUuid, ProviderManifest,
    ServiceManifest, SlaManifest,
};
use super::registry::apply_plan;
use super::FederationRegistry;
use crate::domain::{
    CatalogEntry, Flavor, Image, Network, Project, Provider, Quota, Region, Service, Sla,
};
use crate::errors::{RegistryError, RegistryResult};
use crate::graph::{GraphStore, NodeKind, RelationshipType};
use crate::repository::Repository;
use crate::validation::{
    validate_create, validate_delete, validate_update, DeleteOptions, Validated,
};

/// What a sync created, patched and removed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub provider_id: Uuid,
    pub created: Vec<(NodeKind, Uuid)>,
    pub updated: Vec<(NodeKind, Uuid)>,
    /// Every removed node, cascaded ones included
    pub removed: Vec<(NodeKind, Uuid)>,
}

impl SyncReport {
    pub fn created_ids(&self, kind: NodeKind) -> Vec<Uuid> {
        ids_of(&self.created, kind)
    }

    pub fn updated_ids(&self, kind: NodeKind) -> Vec<Uuid> {
        ids_of(&self.updated, kind)
    }

    pub fn removed_ids(&self, kind: NodeKind) -> Vec<Uuid> {
        ids_of(&self.removed, kind)
    }

    /// Nothing differed between the manifest and the stored graph
    pub fn is_unchanged(&self) -> bool {
        self.created.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }
}

fn ids_of(entries: &[(NodeKind, Uuid)], kind: NodeKind) -> Vec<Uuid> {
    entries
        .iter()
        .filter(|(k, _)| *k == kind)
        .map(|(_, id)| *id)
        .collect()
}

impl<S: GraphStore> FederationRegistry<S> {
    /// Bring a stored provider in line with `manifest`, atomically
    pub async fn sync_provider(
        &self,
        provider_id: Uuid,
        manifest: ProviderManifest,
    ) -> RegistryResult<SyncReport> {
        let report = self
            .write("sync", move |repo| Box::pin(sync(repo, provider_id, manifest)))
            .await?;
        info!(
            "Synchronised provider {}: {} created, {} updated, {} removed",
            provider_id,
            report.created.len(),
            report.updated.len(),
            report.removed.len()
        );
        Ok(report)
    }
}

/// An entity rebuilt from a manifest, taking over a stored identity
trait Resync: Validated + PartialEq + Sized {
    /// `None` when the rebuilt entity equals the stored one
    fn adopt(self, current: &Self) -> Option<Self>;
}

macro_rules! resync {
    ($($entity:ty),+ $(,)?) => {
        $(
            impl Resync for $entity {
                fn adopt(mut self, current: &Self) -> Option<Self> {
                    self.id = current.id;
                    self.created_at = current.created_at;
                    self.updated_at = current.updated_at;
                    if self == *current {
                        return None;
                    }
                    self.updated_at = Utc::now();
                    Some(self)
                }
            }
        )+
    };
}

resync!(Provider, Region, Service, Project, Quota, Flavor, Image, Network, Sla);

/// Create `proposed`, or patch `current` into it
async fn upsert<E: Resync>(
    repo: &mut Repository,
    current: Option<&E>,
    proposed: E,
    report: &mut SyncReport,
) -> RegistryResult<Uuid> {
    match current {
        None => {
            let id = proposed.id();
            validate_create(&proposed, repo).await?;
            repo.save(&proposed).await?;
            report.created.push((E::KIND, id));
            Ok(id)
        }
        Some(current) => {
            match proposed.adopt(current) {
                Some(next) => {
                    validate_update(current, &next, repo).await?;
                    repo.save(&next).await?;
                    report.updated.push((E::KIND, current.id()));
                }
                None => debug!("{} {} unchanged", E::KIND, current.id()),
            }
            Ok(current.id())
        }
    }
}

/// Delete an entity the manifest no longer lists
async fn retire<E: Validated>(
    repo: &mut Repository,
    entity: &E,
    report: &mut SyncReport,
) -> RegistryResult<()> {
    let plan = validate_delete(entity, repo, DeleteOptions::default()).await?;
    apply_plan(repo, &plan).await?;
    report.removed.extend(plan.removals);
    Ok(())
}

async fn sync(
    repo: &mut Repository,
    provider_id: Uuid,
    manifest: ProviderManifest,
) -> RegistryResult<SyncReport> {
    let mut report = SyncReport {
        provider_id,
        ..Default::default()
    };
    let current = repo.require::<Provider>(provider_id).await?;

    // Identity providers and groups first: SLAs and trust links need them
    let mut trusted = Vec::with_capacity(manifest.identity_providers.len());
    let mut desired_slas: BTreeMap<String, (Uuid, &SlaManifest)> = BTreeMap::new();
    for trust in &manifest.identity_providers {
        let (idp_id, created) = resolve_identity_provider(repo, trust).await?;
        if created {
            report.created.push((NodeKind::IdentityProvider, idp_id));
        }
        trusted.push(idp_id);
        for group in &trust.user_groups {
            let (group_id, created) = resolve_user_group(repo, idp_id, group).await?;
            if created {
                report.created.push((NodeKind::UserGroup, group_id));
            }
            for sla in &group.slas {
                let doc_uuid = sla.doc_uuid.trim().to_string();
                if desired_slas.insert(doc_uuid, (group_id, sla)).is_some() {
                    return Err(RegistryError::invariant(format!(
                        "SLA {} appears more than once in the manifest",
                        sla.doc_uuid
                    )));
                }
            }
        }
    }

    // SLAs leaving the manifest, or moving to another group, go before the
    // trust links they rely on
    let stored_projects = repo
        .children::<Project>(provider_id, RelationshipType::HasProject)
        .await?;
    let mut slas = BTreeMap::new();
    for project in &stored_projects {
        for sla in repo
            .parents::<Sla>(project.id, RelationshipType::Grants)
            .await?
        {
            match desired_slas.get(&sla.doc_uuid) {
                Some((group_id, _)) if *group_id == sla.user_group_id => {
                    slas.insert(sla.doc_uuid.clone(), sla);
                }
                _ => retire(repo, &sla, &mut report).await?,
            }
        }
    }

    upsert(repo, Some(&current), manifest.provider(&trusted)?, &mut report).await?;

    let mut stale_projects: BTreeMap<String, Project> = stored_projects
        .into_iter()
        .map(|project| (project.uuid.clone(), project))
        .collect();
    let mut projects = ProjectsByUuid::new();
    for project_manifest in &manifest.projects {
        let proposed = project_manifest.project(provider_id)?;
        let uuid = proposed.uuid.clone();
        let stored = stale_projects.remove(&uuid);
        let id = upsert(repo, stored.as_ref(), proposed, &mut report).await?;
        projects.insert(uuid, id);
    }

    // Services are matched by endpoint across the provider, so one may move
    // between regions
    let stored_regions = repo
        .children::<Region>(provider_id, RelationshipType::HasRegion)
        .await?;
    let mut stale_services = BTreeMap::new();
    for region in &stored_regions {
        for service in repo
            .children::<Service>(region.id, RelationshipType::Hosts)
            .await?
        {
            stale_services.insert(service.endpoint.as_str().to_string(), service);
        }
    }
    let mut stale_regions: BTreeMap<String, Region> = stored_regions
        .into_iter()
        .map(|region| (region.name.clone(), region))
        .collect();

    for region_manifest in &manifest.regions {
        let proposed = region_manifest.region(provider_id)?;
        let stored = stale_regions.remove(&proposed.name);
        let region_id = upsert(repo, stored.as_ref(), proposed, &mut report).await?;

        for service_manifest in &region_manifest.services {
            let proposed = service_manifest.service(region_id)?;
            let stored = stale_services.remove(proposed.endpoint.as_str());
            let service_id = upsert(repo, stored.as_ref(), proposed, &mut report).await?;
            sync_service(repo, service_id, service_manifest, &projects, &mut report).await?;
        }
    }
    for service in stale_services.into_values() {
        retire(repo, &service, &mut report).await?;
    }
    for region in stale_regions.into_values() {
        retire(repo, &region, &mut report).await?;
    }

    for (doc_uuid, (group_id, sla_manifest)) in &desired_slas {
        let proposed = sla_manifest.sla(*group_id, &projects)?;
        let stored = slas.remove(doc_uuid);
        upsert(repo, stored.as_ref(), proposed, &mut report).await?;
    }

    // Last, once no SLA, quota or private entry points at them any more
    for project in stale_projects.into_values() {
        retire(repo, &project, &mut report).await?;
    }

    Ok(report)
}

/// Quotas keyed by project, catalog entries keyed by uuid
async fn sync_service(
    repo: &mut Repository,
    service_id: Uuid,
    manifest: &ServiceManifest,
    projects: &ProjectsByUuid,
    report: &mut SyncReport,
) -> RegistryResult<()> {
    let mut stale_quotas = repo
        .children::<Quota>(service_id, RelationshipType::LimitedBy)
        .await?;
    for quota_manifest in &manifest.quotas {
        let proposed = quota_manifest.quota(service_id, projects)?;
        let stored = stale_quotas
            .iter()
            .position(|quota| quota.project_id == proposed.project_id)
            .map(|index| stale_quotas.swap_remove(index));
        upsert(repo, stored.as_ref(), proposed, report).await?;
    }
    for quota in stale_quotas {
        retire(repo, &quota, report).await?;
    }

    let flavors = manifest
        .flavors
        .iter()
        .map(|m| m.flavor(service_id, projects))
        .collect::<RegistryResult<Vec<_>>>()?;
    sync_entries(repo, service_id, flavors, report).await?;

    let images = manifest
        .images
        .iter()
        .map(|m| m.image(service_id, projects))
        .collect::<RegistryResult<Vec<_>>>()?;
    sync_entries(repo, service_id, images, report).await?;

    let networks = manifest
        .networks
        .iter()
        .map(|m| m.network(service_id, projects))
        .collect::<RegistryResult<Vec<_>>>()?;
    sync_entries(repo, service_id, networks, report).await
}

async fn sync_entries<E: Resync + CatalogEntry>(
    repo: &mut Repository,
    service_id: Uuid,
    desired: Vec<E>,
    report: &mut SyncReport,
) -> RegistryResult<()> {
    let mut stale: BTreeMap<String, E> = repo
        .children::<E>(service_id, RelationshipType::Offers)
        .await?
        .into_iter()
        .map(|entry| (entry.uuid().to_string(), entry))
        .collect();
    for proposed in desired {
        let stored = stale.remove(proposed.uuid());
        upsert(repo, stored.as_ref(), proposed, report).await?;
    }
    for entry in stale.into_values() {
        retire(repo, &entry, report).await?;
    }
    Ok(())
}
