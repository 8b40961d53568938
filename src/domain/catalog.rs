// Copyright (c) 2025 - Cowboy AI, Inc.
//! Service catalogs: Flavors, Images and Networks
//!
//! Every catalog entry is offered by one service and is either public
//! (usable federation-wide) or private to a non-empty set of projects. The two
//! modes are mutually exclusive by construction: [`Visibility`] is a tagged
//! variant, so a public entry cannot carry a project list.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use super::schema::{optional_text, positive, required_text, SchemaResult, SchemaViolation};
use super::service::ServiceType;
use super::Patchable;

/// Public or private visibility of a catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Private { projects: BTreeSet<Uuid> },
}

impl Visibility {
    /// Private visibility; at least one project is required
    pub fn private(projects: impl IntoIterator<Item = Uuid>) -> SchemaResult<Self> {
        let visibility = Visibility::Private {
            projects: projects.into_iter().collect(),
        };
        visibility.check()?;
        Ok(visibility)
    }

    pub fn is_public(&self) -> bool {
        matches!(self, Visibility::Public)
    }

    /// Projects the entry is shared with (empty when public)
    pub fn projects(&self) -> Vec<Uuid> {
        match self {
            Visibility::Public => Vec::new(),
            Visibility::Private { projects } => projects.iter().copied().collect(),
        }
    }

    pub fn is_shared_with(&self, project_id: Uuid) -> bool {
        match self {
            Visibility::Public => false,
            Visibility::Private { projects } => projects.contains(&project_id),
        }
    }

    /// Remove one project; `None` when no project would be left
    pub fn without_project(&self, project_id: Uuid) -> Option<Self> {
        match self {
            Visibility::Public => Some(Visibility::Public),
            Visibility::Private { projects } => {
                let remaining: BTreeSet<Uuid> =
                    projects.iter().copied().filter(|p| *p != project_id).collect();
                if remaining.is_empty() {
                    None
                } else {
                    Some(Visibility::Private {
                        projects: remaining,
                    })
                }
            }
        }
    }

    fn check(&self) -> SchemaResult<()> {
        match self {
            Visibility::Private { projects } if projects.is_empty() => {
                Err(SchemaViolation::PrivateWithoutProjects)
            }
            _ => Ok(()),
        }
    }
}

/// Behaviour shared by flavors, images and networks
pub trait CatalogEntry {
    /// Kind of service allowed to offer this entry
    const OFFERED_BY: ServiceType;

    fn service_id(&self) -> Uuid;
    fn uuid(&self) -> &str;
    fn visibility(&self) -> &Visibility;
    fn with_visibility(&self, visibility: Visibility) -> Self;
}

macro_rules! catalog_entry {
    ($entity:ty, $offered_by:expr) => {
        impl CatalogEntry for $entity {
            const OFFERED_BY: ServiceType = $offered_by;

            fn service_id(&self) -> Uuid {
                self.service_id
            }

            fn uuid(&self) -> &str {
                &self.uuid
            }

            fn visibility(&self) -> &Visibility {
                &self.visibility
            }

            fn with_visibility(&self, visibility: Visibility) -> Self {
                let mut next = self.clone();
                next.visibility = visibility;
                next.updated_at = Utc::now();
                next
            }
        }
    };
}

catalog_entry!(Flavor, ServiceType::Compute);
catalog_entry!(Image, ServiceType::Compute);
catalog_entry!(Network, ServiceType::Network);

// ============================================================================
// Flavor
// ============================================================================

/// Input for [`Flavor::new`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlavorSpec {
    pub service_id: Uuid,
    pub name: String,
    pub uuid: String,
    pub visibility: Visibility,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub vcpus: Option<i64>,
    /// MiB
    #[serde(default)]
    pub ram: Option<i64>,
    /// GiB
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

impl FlavorSpec {
    pub fn new(
        service_id: Uuid,
        name: impl Into<String>,
        uuid: impl Into<String>,
        visibility: Visibility,
    ) -> Self {
        Self {
            service_id,
            name: name.into(),
            uuid: uuid.into(),
            visibility,
            description: None,
            vcpus: None,
            ram: None,
            disk: None,
            gpus: None,
            gpu_model: None,
            gpu_vendor: None,
            infiniband: false,
        }
    }
}

/// Virtual machine flavor offered by a compute service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flavor {
    pub id: Uuid,
    pub service_id: Uuid,
    pub name: String,
    pub uuid: String,
    pub visibility: Visibility,
    pub description: Option<String>,
    pub vcpus: Option<i64>,
    pub ram: Option<i64>,
    pub disk: Option<i64>,
    pub gpus: Option<i64>,
    pub gpu_model: Option<String>,
    pub gpu_vendor: Option<String>,
    pub infiniband: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Flavor {
    pub fn new(spec: FlavorSpec) -> SchemaResult<Self> {
        let now = Utc::now();
        let flavor = Self {
            id: Uuid::now_v7(),
            service_id: spec.service_id,
            name: required_text("name", spec.name)?,
            uuid: required_text("uuid", spec.uuid)?,
            visibility: spec.visibility,
            description: optional_text(spec.description),
            vcpus: spec.vcpus,
            ram: spec.ram,
            disk: spec.disk,
            gpus: spec.gpus,
            gpu_model: optional_text(spec.gpu_model),
            gpu_vendor: optional_text(spec.gpu_vendor),
            infiniband: spec.infiniband,
            created_at: now,
            updated_at: now,
        };
        flavor.check()?;
        Ok(flavor)
    }

    fn check(&self) -> SchemaResult<()> {
        self.visibility.check()?;
        positive("vcpus", self.vcpus)?;
        positive("ram", self.ram)?;
        super::schema::non_negative("disk", self.disk)?;
        super::schema::non_negative("gpus", self.gpus)?;
        if self.gpus.unwrap_or(0) == 0 && (self.gpu_model.is_some() || self.gpu_vendor.is_some()) {
            return Err(SchemaViolation::InvalidValue {
                field: "gpu_model",
                reason: "GPU details given for a flavor without GPUs".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlavorPatch {
    pub name: Option<String>,
    pub visibility: Option<Visibility>,
    pub description: Option<String>,
    pub vcpus: Option<i64>,
    pub ram: Option<i64>,
    pub disk: Option<i64>,
    pub gpus: Option<i64>,
    /// `Some(None)` clears the model
    pub gpu_model: Option<Option<String>>,
    pub gpu_vendor: Option<Option<String>>,
    pub infiniband: Option<bool>,
}

impl Patchable for Flavor {
    type Patch = FlavorPatch;

    fn apply(&self, patch: FlavorPatch) -> SchemaResult<Self> {
        let mut next = self.clone();
        if let Some(name) = patch.name {
            next.name = required_text("name", name)?;
        }
        if let Some(visibility) = patch.visibility {
            next.visibility = visibility;
        }
        if let Some(description) = patch.description {
            next.description = optional_text(Some(description));
        }
        next.vcpus = patch.vcpus.or(next.vcpus);
        next.ram = patch.ram.or(next.ram);
        next.disk = patch.disk.or(next.disk);
        next.gpus = patch.gpus.or(next.gpus);
        if let Some(gpu_model) = patch.gpu_model {
            next.gpu_model = optional_text(gpu_model);
        }
        if let Some(gpu_vendor) = patch.gpu_vendor {
            next.gpu_vendor = optional_text(gpu_vendor);
        }
        if let Some(infiniband) = patch.infiniband {
            next.infiniband = infiniband;
        }
        next.check()?;
        next.updated_at = Utc::now();
        Ok(next)
    }
}

// ============================================================================
// Image
// ============================================================================

/// Operating system family of an image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OsType {
    Linux,
    Windows,
}

/// Input for [`Image::new`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSpec {
    pub service_id: Uuid,
    pub name: String,
    pub uuid: String,
    pub visibility: Visibility,
    #[serde(default)]
    pub description: Option<String>,
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

impl ImageSpec {
    pub fn new(
        service_id: Uuid,
        name: impl Into<String>,
        uuid: impl Into<String>,
        visibility: Visibility,
    ) -> Self {
        Self {
            service_id,
            name: name.into(),
            uuid: uuid.into(),
            visibility,
            description: None,
            os_type: None,
            os_distro: None,
            os_version: None,
            architecture: None,
            cuda_support: false,
            gpu_driver: false,
            tags: Vec::new(),
        }
    }
}

/// Virtual machine image offered by a compute service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub id: Uuid,
    pub service_id: Uuid,
    pub name: String,
    pub uuid: String,
    pub visibility: Visibility,
    pub description: Option<String>,
    pub os_type: Option<OsType>,
    pub os_distro: Option<String>,
    pub os_version: Option<String>,
    pub architecture: Option<String>,
    pub cuda_support: bool,
    pub gpu_driver: bool,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Image {
    pub fn new(spec: ImageSpec) -> SchemaResult<Self> {
        spec.visibility.check()?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::now_v7(),
            service_id: spec.service_id,
            name: required_text("name", spec.name)?,
            uuid: required_text("uuid", spec.uuid)?,
            visibility: spec.visibility,
            description: optional_text(spec.description),
            os_type: spec.os_type,
            os_distro: optional_text(spec.os_distro),
            os_version: optional_text(spec.os_version),
            architecture: optional_text(spec.architecture),
            cuda_support: spec.cuda_support,
            gpu_driver: spec.gpu_driver,
            tags: clean_tags(spec.tags)?,
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImagePatch {
    pub name: Option<String>,
    pub visibility: Option<Visibility>,
    pub description: Option<String>,
    pub os_distro: Option<String>,
    pub os_version: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl Patchable for Image {
    type Patch = ImagePatch;

    fn apply(&self, patch: ImagePatch) -> SchemaResult<Self> {
        let mut next = self.clone();
        if let Some(name) = patch.name {
            next.name = required_text("name", name)?;
        }
        if let Some(visibility) = patch.visibility {
            visibility.check()?;
            next.visibility = visibility;
        }
        if let Some(description) = patch.description {
            next.description = optional_text(Some(description));
        }
        if let Some(os_distro) = patch.os_distro {
            next.os_distro = optional_text(Some(os_distro));
        }
        if let Some(os_version) = patch.os_version {
            next.os_version = optional_text(Some(os_version));
        }
        if let Some(tags) = patch.tags {
            next.tags = clean_tags(tags)?;
        }
        next.updated_at = Utc::now();
        Ok(next)
    }
}

// ============================================================================
// Network
// ============================================================================

/// Input for [`Network::new`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSpec {
    pub service_id: Uuid,
    pub name: String,
    pub uuid: String,
    pub visibility: Visibility,
    #[serde(default)]
    pub description: Option<String>,
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

impl NetworkSpec {
    pub fn new(
        service_id: Uuid,
        name: impl Into<String>,
        uuid: impl Into<String>,
        visibility: Visibility,
    ) -> Self {
        Self {
            service_id,
            name: name.into(),
            uuid: uuid.into(),
            visibility,
            description: None,
            mtu: None,
            is_router_external: false,
            is_default: false,
            proxy_host: None,
            proxy_user: None,
            tags: Vec::new(),
        }
    }
}

/// Network offered by a network service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    pub id: Uuid,
    pub service_id: Uuid,
    pub name: String,
    pub uuid: String,
    pub visibility: Visibility,
    pub description: Option<String>,
    pub mtu: Option<i64>,
    pub is_router_external: bool,
    pub is_default: bool,
    pub proxy_host: Option<String>,
    pub proxy_user: Option<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Network {
    pub fn new(spec: NetworkSpec) -> SchemaResult<Self> {
        let now = Utc::now();
        let network = Self {
            id: Uuid::now_v7(),
            service_id: spec.service_id,
            name: required_text("name", spec.name)?,
            uuid: required_text("uuid", spec.uuid)?,
            visibility: spec.visibility,
            description: optional_text(spec.description),
            mtu: spec.mtu,
            is_router_external: spec.is_router_external,
            is_default: spec.is_default,
            proxy_host: optional_text(spec.proxy_host),
            proxy_user: optional_text(spec.proxy_user),
            tags: clean_tags(spec.tags)?,
            created_at: now,
            updated_at: now,
        };
        network.check()?;
        Ok(network)
    }

    fn check(&self) -> SchemaResult<()> {
        self.visibility.check()?;
        positive("mtu", self.mtu)?;
        if self.proxy_user.is_some() && self.proxy_host.is_none() {
            return Err(SchemaViolation::MissingField("proxy_host"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkPatch {
    pub name: Option<String>,
    pub visibility: Option<Visibility>,
    pub description: Option<String>,
    pub mtu: Option<i64>,
    pub is_router_external: Option<bool>,
    pub is_default: Option<bool>,
    pub tags: Option<Vec<String>>,
}

impl Patchable for Network {
    type Patch = NetworkPatch;

    fn apply(&self, patch: NetworkPatch) -> SchemaResult<Self> {
        let mut next = self.clone();
        if let Some(name) = patch.name {
            next.name = required_text("name", name)?;
        }
        if let Some(visibility) = patch.visibility {
            next.visibility = visibility;
        }
        if let Some(description) = patch.description {
            next.description = optional_text(Some(description));
        }
        next.mtu = patch.mtu.or(next.mtu);
        if let Some(is_router_external) = patch.is_router_external {
            next.is_router_external = is_router_external;
        }
        if let Some(is_default) = patch.is_default {
            next.is_default = is_default;
        }
        if let Some(tags) = patch.tags {
            next.tags = clean_tags(tags)?;
        }
        next.check()?;
        next.updated_at = Utc::now();
        Ok(next)
    }
}

fn clean_tags(tags: Vec<String>) -> SchemaResult<Vec<String>> {
    let tags: Vec<String> = tags
        .into_iter()
        .map(|t| required_text("tags", t))
        .collect::<SchemaResult<_>>()?;
    super::schema::unique_entries("tags", tags.iter())?;
    Ok(tags)
}
