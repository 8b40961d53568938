// Copyright (c) 2025 - Cowboy AI, Inc.
//! Test Fixtures for fed-registry
//!
//! Builds a small federation through the public façade:
//!
//! ```text
//! idp.example ──▶ researchers ──SLA──▶ p1 ◀── site1 ──▶ r1 ──▶ nova, neutron
//!      ▲                                        │
//!      └──────────────── TRUSTS ────────────────┘
//! ```
//!
//! Fixed names and dates keep assertions readable; ids are assigned by the
//! entity constructors.

#![allow(dead_code)]

use chrono::NaiveDate;
use uuid::Uuid;

use fed_registry::domain::{
    AuthMethod, IdentityProvider, IdentityProviderSpec, Project, ProjectSpec, Provider,
    ProviderSpec, ProviderType, Region, RegionSpec, Service, ServiceKind, ServiceSpec, Sla,
    SlaSpec, UserGroup, UserGroupSpec,
};
use fed_registry::{FederationRegistry, MemoryGraphStore};

pub const IDP_ENDPOINT: &str = "https://idp.example/";
pub const COMPUTE_ENDPOINT: &str = "https://compute.site1.example/";
pub const NETWORK_ENDPOINT: &str = "https://network.site1.example/";
pub const PROJECT_UUID: &str = "a7f2b1c4e5d64b8f9a0b1c2d3e4f5a6b";
pub const SLA_DOC: &str = "sla-site1-researchers";

/// Ids of the fixture federation
#[derive(Debug, Clone, Copy)]
pub struct Federation {
    pub identity_provider: Uuid,
    pub user_group: Uuid,
    pub provider: Uuid,
    pub region: Uuid,
    pub compute: Uuid,
    pub network: Uuid,
    pub project: Uuid,
    pub sla: Uuid,
}

pub fn registry() -> FederationRegistry<MemoryGraphStore> {
    FederationRegistry::new(MemoryGraphStore::new())
}

pub fn sla_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).expect("Invalid fixture date")
}

/// A provider trusting `idp`, not yet stored
pub fn provider(name: &str, idp: Uuid) -> Provider {
    Provider::new(
        ProviderSpec::new(name, ProviderType::Openstack)
            .trusting(AuthMethod::new(idp, "egi", "openid").expect("Invalid auth method")),
    )
    .expect("Invalid provider fixture")
}

pub async fn federation(registry: &FederationRegistry<MemoryGraphStore>) -> Federation {
    let idp = registry
        .create(
            IdentityProvider::new(IdentityProviderSpec::new(IDP_ENDPOINT, "groups"))
                .expect("Invalid identity provider fixture"),
        )
        .await
        .expect("Failed to create identity provider");
    let group = registry
        .create(UserGroup::new(UserGroupSpec::new(idp.id, "researchers")).expect("Invalid group"))
        .await
        .expect("Failed to create user group");

    let site = registry
        .create(provider("site1", idp.id))
        .await
        .expect("Failed to create provider");
    let region = registry
        .create(Region::new(RegionSpec::new(site.id, "r1")).expect("Invalid region"))
        .await
        .expect("Failed to create region");
    let compute = registry
        .create(
            Service::new(ServiceSpec::new(region.id, COMPUTE_ENDPOINT, ServiceKind::nova()))
                .expect("Invalid service"),
        )
        .await
        .expect("Failed to create compute service");
    let network = registry
        .create(
            Service::new(ServiceSpec::new(region.id, NETWORK_ENDPOINT, ServiceKind::neutron()))
                .expect("Invalid service"),
        )
        .await
        .expect("Failed to create network service");
    let project = registry
        .create(Project::new(ProjectSpec::new(site.id, "p1", PROJECT_UUID)).expect("Invalid project"))
        .await
        .expect("Failed to create project");
    let sla = registry
        .create(
            Sla::new(SlaSpec::new(group.id, project.id, SLA_DOC, sla_start()))
                .expect("Invalid SLA"),
        )
        .await
        .expect("Failed to create SLA");

    Federation {
        identity_provider: idp.id,
        user_group: group.id,
        provider: site.id,
        region: region.id,
        compute: compute.id,
        network: network.id,
        project: project.id,
        sla: sla.id,
    }
}
