// Copyright (c) 2025 - Cowboy AI, Inc.
//! Provider onboarding from a single manifest
//!
//! A manifest describes a provider with everything it brings into the
//! federation. The whole manifest is applied in one write transaction: any
//! rejected piece rolls back everything created before it.
//!
//! Projects are referenced inside the manifest by their provider-side uuid:
//! per-project quotas, private catalog entries and SLAs name the projects they
//! apply to that way.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};
use uuid::Uuid;

use super::FederationRegistry;
use crate::domain::{
    AuthMethod, Endpoint, Flavor, FlavorSpec, IdentityProvider, IdentityProviderSpec, Image,
    ImageSpec, Location, Network, NetworkSpec, OsType, Project, ProjectSpec, Provider,
    ProviderSpec, ProviderStatus, ProviderType, Quota, QuotaLimits, QuotaSpec, Region,
    RegionSpec, Service, ServiceKind, ServiceSpec, Sla, SlaSpec, UserGroup, UserGroupSpec,
    Visibility,
};
use crate::errors::{RegistryError, RegistryResult};
use crate::graph::{GraphStore, PropertyFilter};
use crate::repository::Repository;
use crate::validation::{validate_create, Validated};

/// Ids of the provider's projects keyed by their provider-side uuid
pub(super) type ProjectsByUuid = BTreeMap<String, Uuid>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderManifest {
    pub name: String,
    pub provider_type: ProviderType,
    #[serde(default)]
    pub status: ProviderStatus,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub support_emails: Vec<String>,
    #[serde(default)]
    pub regions: Vec<RegionManifest>,
    #[serde(default)]
    pub projects: Vec<ProjectManifest>,
    #[serde(default)]
    pub identity_providers: Vec<TrustManifest>,
}

impl ProviderManifest {
    /// The provider node, trusting `trusted` in the order of
    /// `identity_providers`
    pub(super) fn provider(&self, trusted: &[Uuid]) -> RegistryResult<Provider> {
        let mut spec = ProviderSpec::new(self.name.as_str(), self.provider_type);
        spec.status = self.status;
        spec.is_public = self.is_public;
        spec.description = self.description.clone();
        spec.support_emails = self.support_emails.clone();
        for (trust, idp_id) in self.identity_providers.iter().zip(trusted) {
            spec = spec.trusting(AuthMethod::new(
                *idp_id,
                trust.idp_name.as_str(),
                trust.protocol.as_str(),
            )?);
        }
        Ok(Provider::new(spec)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionManifest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub services: Vec<ServiceManifest>,
}

impl RegionManifest {
    pub(super) fn region(&self, provider_id: Uuid) -> RegistryResult<Region> {
        let mut spec = RegionSpec::new(provider_id, self.name.as_str());
        spec.description = self.description.clone();
        spec.location = self.location.clone();
        Ok(Region::new(spec)?)
    }
}

/// A service with the quotas and catalog entries it carries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceManifest {
    pub endpoint: String,
    pub kind: ServiceKind,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub quotas: Vec<QuotaManifest>,
    #[serde(default)]
    pub flavors: Vec<FlavorManifest>,
    #[serde(default)]
    pub images: Vec<ImageManifest>,
    #[serde(default)]
    pub networks: Vec<NetworkManifest>,
}

impl ServiceManifest {
    pub(super) fn service(&self, region_id: Uuid) -> RegistryResult<Service> {
        let mut spec = ServiceSpec::new(region_id, self.endpoint.as_str(), self.kind.clone());
        spec.description = self.description.clone();
        Ok(Service::new(spec)?)
    }
}

/// Quota of a service; without `project_uuid` it is the service default
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaManifest {
    #[serde(default)]
    pub project_uuid: Option<String>,
    #[serde(default)]
    pub per_user: bool,
    #[serde(default)]
    pub description: Option<String>,
    pub limits: QuotaLimits,
}

impl QuotaManifest {
    pub(super) fn quota(
        &self,
        service_id: Uuid,
        projects: &ProjectsByUuid,
    ) -> RegistryResult<Quota> {
        let mut spec = QuotaSpec::default_for(service_id, self.limits.clone());
        if let Some(uuid) = &self.project_uuid {
            spec.project_id = Some(project_id(projects, uuid, "quota")?);
        }
        spec.per_user = self.per_user;
        spec.description = self.description.clone();
        Ok(Quota::new(spec)?)
    }
}

/// Flavor of a compute service
///
/// `projects` lists the uuids of the projects a private flavor is shared
/// with; an empty list makes the flavor public. Images and networks follow
/// the same rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlavorManifest {
    pub name: String,
    pub uuid: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub projects: Vec<String>,
    #[serde(default)]
    pub vcpus: Option<i64>,
    #[serde(default)]
    pub ram: Option<i64>,
    #[serde(default)]
    pub disk: Option<i64>,
    #[serde(default)]
    pub gpus: Option<i64>,
    #[serde(default)]
    pub gpu_model: Option<String>,
    #[serde(default)]
    pub gpu_vendor: Option<String>,
    #[serde(default)]
    pub infiniband: bool,
}

impl FlavorManifest {
    pub(super) fn flavor(
        &self,
        service_id: Uuid,
        projects: &ProjectsByUuid,
    ) -> RegistryResult<Flavor> {
        let visibility = visibility(&self.projects, projects, "flavor")?;
        let mut spec =
            FlavorSpec::new(service_id, self.name.as_str(), self.uuid.as_str(), visibility);
        spec.description = self.description.clone();
        spec.vcpus = self.vcpus;
        spec.ram = self.ram;
        spec.disk = self.disk;
        spec.gpus = self.gpus;
        spec.gpu_model = self.gpu_model.clone();
        spec.gpu_vendor = self.gpu_vendor.clone();
        spec.infiniband = self.infiniband;
        Ok(Flavor::new(spec)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageManifest {
    pub name: String,
    pub uuid: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub projects: Vec<String>,
    #[serde(default)]
    pub os_type: Option<OsType>,
    #[serde(default)]
    pub os_distro: Option<String>,
    #[serde(default)]
    pub os_version: Option<String>,
    #[serde(default)]
    pub architecture: Option<String>,
    #[serde(default)]
    pub cuda_support: bool,
    #[serde(default)]
    pub gpu_driver: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ImageManifest {
    pub(super) fn image(
        &self,
        service_id: Uuid,
        projects: &ProjectsByUuid,
    ) -> RegistryResult<Image> {
        let visibility = visibility(&self.projects, projects, "image")?;
        let mut spec =
            ImageSpec::new(service_id, self.name.as_str(), self.uuid.as_str(), visibility);
        spec.description = self.description.clone();
        spec.os_type = self.os_type;
        spec.os_distro = self.os_distro.clone();
        spec.os_version = self.os_version.clone();
        spec.architecture = self.architecture.clone();
        spec.cuda_support = self.cuda_support;
        spec.gpu_driver = self.gpu_driver;
        spec.tags = self.tags.clone();
        Ok(Image::new(spec)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkManifest {
    pub name: String,
    pub uuid: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub projects: Vec<String>,
    #[serde(default)]
    pub mtu: Option<i64>,
    #[serde(default)]
    pub is_router_external: bool,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub proxy_host: Option<String>,
    #[serde(default)]
    pub proxy_user: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NetworkManifest {
    pub(super) fn network(
        &self,
        service_id: Uuid,
        projects: &ProjectsByUuid,
    ) -> RegistryResult<Network> {
        let visibility = visibility(&self.projects, projects, "network")?;
        let mut spec =
            NetworkSpec::new(service_id, self.name.as_str(), self.uuid.as_str(), visibility);
        spec.description = self.description.clone();
        spec.mtu = self.mtu;
        spec.is_router_external = self.is_router_external;
        spec.is_default = self.is_default;
        spec.proxy_host = self.proxy_host.clone();
        spec.proxy_user = self.proxy_user.clone();
        spec.tags = self.tags.clone();
        Ok(Network::new(spec)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectManifest {
    pub name: String,
    pub uuid: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl ProjectManifest {
    pub(super) fn project(&self, provider_id: Uuid) -> RegistryResult<Project> {
        let mut spec = ProjectSpec::new(provider_id, self.name.as_str(), self.uuid.as_str());
        spec.description = self.description.clone();
        Ok(Project::new(spec)?)
    }
}

/// An identity provider trusted by the onboarded provider
///
/// Matched to an existing identity provider by endpoint, created otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustManifest {
    pub endpoint: String,
    pub group_claim: String,
    #[serde(default)]
    pub description: Option<String>,
    pub idp_name: String,
    pub protocol: String,
    #[serde(default)]
    pub user_groups: Vec<UserGroupManifest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserGroupManifest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub slas: Vec<SlaManifest>,
}

/// SLA granting one of the manifest's projects, named by its uuid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlaManifest {
    pub doc_uuid: String,
    pub project_uuid: String,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub description: Option<String>,
}

impl SlaManifest {
    pub(super) fn sla(
        &self,
        user_group_id: Uuid,
        projects: &ProjectsByUuid,
    ) -> RegistryResult<Sla> {
        let what = format!("SLA {}", self.doc_uuid);
        let mut spec = SlaSpec::new(
            user_group_id,
            project_id(projects, &self.project_uuid, &what)?,
            self.doc_uuid.as_str(),
            self.start_date,
        );
        spec.end_date = self.end_date;
        spec.description = self.description.clone();
        Ok(Sla::new(spec)?)
    }
}

/// Ids of everything an onboarding created or reused
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnboardingReport {
    pub provider_id: Uuid,
    pub regions: Vec<Uuid>,
    pub services: Vec<Uuid>,
    pub projects: Vec<Uuid>,
    pub quotas: Vec<Uuid>,
    pub flavors: Vec<Uuid>,
    pub images: Vec<Uuid>,
    pub networks: Vec<Uuid>,
    pub identity_providers_created: Vec<Uuid>,
    pub identity_providers_reused: Vec<Uuid>,
    pub user_groups_created: Vec<Uuid>,
    pub user_groups_reused: Vec<Uuid>,
    pub slas: Vec<Uuid>,
}

impl<S: GraphStore> FederationRegistry<S> {
    /// Create a provider with its regions, services, projects, trusted
    /// identity providers, user groups and SLAs, atomically
    pub async fn onboard_provider(
        &self,
        manifest: ProviderManifest,
    ) -> RegistryResult<OnboardingReport> {
        let name = manifest.name.clone();
        let report = self
            .write("onboard", move |repo| Box::pin(onboard(repo, manifest)))
            .await?;
        info!(
            "Onboarded provider {} with {} regions, {} projects, {} SLAs",
            name,
            report.regions.len(),
            report.projects.len(),
            report.slas.len()
        );
        Ok(report)
    }
}

/// Insert through the validation layer within the open transaction
async fn insert<E: Validated>(repo: &mut Repository, entity: E) -> RegistryResult<Uuid> {
    validate_create(&entity, repo).await?;
    repo.save(&entity).await?;
    Ok(entity.id())
}

async fn onboard(
    repo: &mut Repository,
    manifest: ProviderManifest,
) -> RegistryResult<OnboardingReport> {
    let mut report = OnboardingReport::default();

    let mut trusted = Vec::with_capacity(manifest.identity_providers.len());
    for trust in &manifest.identity_providers {
        let (idp_id, created) = resolve_identity_provider(repo, trust).await?;
        record(
            idp_id,
            created,
            &mut report.identity_providers_created,
            &mut report.identity_providers_reused,
        );
        trusted.push(idp_id);
    }

    let provider_id = insert(repo, manifest.provider(&trusted)?).await?;
    report.provider_id = provider_id;

    let mut projects = ProjectsByUuid::new();
    for project_manifest in &manifest.projects {
        let project = project_manifest.project(provider_id)?;
        let (uuid, id) = (project.uuid.clone(), project.id);
        insert(repo, project).await?;
        projects.insert(uuid, id);
        report.projects.push(id);
    }

    for region_manifest in &manifest.regions {
        let region_id = insert(repo, region_manifest.region(provider_id)?).await?;
        report.regions.push(region_id);

        for service_manifest in &region_manifest.services {
            let service_id = insert(repo, service_manifest.service(region_id)?).await?;
            report.services.push(service_id);

            for quota in &service_manifest.quotas {
                report
                    .quotas
                    .push(insert(repo, quota.quota(service_id, &projects)?).await?);
            }
            for flavor in &service_manifest.flavors {
                report
                    .flavors
                    .push(insert(repo, flavor.flavor(service_id, &projects)?).await?);
            }
            for image in &service_manifest.images {
                report
                    .images
                    .push(insert(repo, image.image(service_id, &projects)?).await?);
            }
            for network in &service_manifest.networks {
                report
                    .networks
                    .push(insert(repo, network.network(service_id, &projects)?).await?);
            }
        }
    }

    for (trust, idp_id) in manifest.identity_providers.iter().zip(trusted) {
        for group_manifest in &trust.user_groups {
            let (group_id, created) = resolve_user_group(repo, idp_id, group_manifest).await?;
            record(
                group_id,
                created,
                &mut report.user_groups_created,
                &mut report.user_groups_reused,
            );
            for sla_manifest in &group_manifest.slas {
                report
                    .slas
                    .push(insert(repo, sla_manifest.sla(group_id, &projects)?).await?);
            }
        }
    }

    Ok(report)
}

fn record(id: Uuid, created: bool, created_ids: &mut Vec<Uuid>, reused_ids: &mut Vec<Uuid>) {
    let ids = if created { created_ids } else { reused_ids };
    if !ids.contains(&id) {
        ids.push(id);
    }
}

/// Project named by uuid in a manifest
pub(super) fn project_id(
    projects: &ProjectsByUuid,
    uuid: &str,
    what: &str,
) -> RegistryResult<Uuid> {
    projects.get(uuid.trim()).copied().ok_or_else(|| {
        RegistryError::invariant(format!(
            "{} names project uuid {} which the manifest does not declare",
            what, uuid
        ))
    })
}

fn visibility(
    uuids: &[String],
    projects: &ProjectsByUuid,
    what: &str,
) -> RegistryResult<Visibility> {
    if uuids.is_empty() {
        return Ok(Visibility::Public);
    }
    let ids = uuids
        .iter()
        .map(|uuid| project_id(projects, uuid, what))
        .collect::<RegistryResult<Vec<_>>>()?;
    Ok(Visibility::private(ids)?)
}

/// Existing identity provider with the canonical endpoint, or a new one;
/// `true` when created
pub(super) async fn resolve_identity_provider(
    repo: &mut Repository,
    trust: &TrustManifest,
) -> RegistryResult<(Uuid, bool)> {
    let endpoint = Endpoint::new(&trust.endpoint)?;
    let existing = repo
        .find::<IdentityProvider>(&PropertyFilter::new().eq("endpoint", endpoint.as_str()))
        .await?
        .into_iter()
        .next();
    if let Some(idp) = existing {
        debug!("Reusing identity provider {} for {}", idp.id, endpoint);
        return Ok((idp.id, false));
    }

    let mut spec = IdentityProviderSpec::new(endpoint.as_str(), trust.group_claim.as_str());
    spec.description = trust.description.clone();
    let id = insert(repo, IdentityProvider::new(spec)?).await?;
    Ok((id, true))
}

/// Existing group of that name under the identity provider, or a new one;
/// `true` when created
pub(super) async fn resolve_user_group(
    repo: &mut Repository,
    identity_provider_id: Uuid,
    manifest: &UserGroupManifest,
) -> RegistryResult<(Uuid, bool)> {
    let existing = repo
        .find::<UserGroup>(
            &PropertyFilter::new()
                .id_eq("identity_provider_id", identity_provider_id)
                .eq("name", manifest.name.trim()),
        )
        .await?
        .into_iter()
        .next();
    if let Some(group) = existing {
        return Ok((group.id, false));
    }

    let mut spec = UserGroupSpec::new(identity_provider_id, manifest.name.as_str());
    spec.description = manifest.description.clone();
    let id = insert(repo, UserGroup::new(spec)?).await?;
    Ok((id, true))
}
