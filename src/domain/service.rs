// Copyright (c) 2025 - Cowboy AI, Inc.
//! Service Entity
//!
//! Services are polymorphic over their kind (compute, block storage, network,
//! object store, identity). They behave identically under validation and projection and only
//! differ in carried data, so the kind is a tagged variant rather than a type
//! hierarchy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::endpoint::Endpoint;
use super::schema::{optional_text, required_text, SchemaResult};
use super::Patchable;

/// Discriminant of [`ServiceKind`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceType {
    Compute,
    BlockStorage,
    Network,
    ObjectStore,
    Identity,
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceType::Compute => write!(f, "compute"),
            ServiceType::BlockStorage => write!(f, "block-storage"),
            ServiceType::Network => write!(f, "network"),
            ServiceType::ObjectStore => write!(f, "object-store"),
            ServiceType::Identity => write!(f, "identity"),
        }
    }
}

/// Kind of a service with its kind-specific payload
///
/// `name` is the service software identifier, e.g. `org.openstack.nova`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServiceKind {
    Compute { name: String },
    BlockStorage { name: String },
    Network { name: String },
    ObjectStore { name: String },
    Identity { name: String },
}

impl ServiceKind {
    pub fn nova() -> Self {
        ServiceKind::Compute {
            name: "org.openstack.nova".to_string(),
        }
    }

    pub fn cinder() -> Self {
        ServiceKind::BlockStorage {
            name: "org.openstack.cinder".to_string(),
        }
    }

    pub fn neutron() -> Self {
        ServiceKind::Network {
            name: "org.openstack.neutron".to_string(),
        }
    }

    pub fn swift() -> Self {
        ServiceKind::ObjectStore {
            name: "org.openstack.swift".to_string(),
        }
    }

    pub fn keystone() -> Self {
        ServiceKind::Identity {
            name: "org.openstack.keystone".to_string(),
        }
    }

    pub fn service_type(&self) -> ServiceType {
        match self {
            ServiceKind::Compute { .. } => ServiceType::Compute,
            ServiceKind::BlockStorage { .. } => ServiceType::BlockStorage,
            ServiceKind::Network { .. } => ServiceType::Network,
            ServiceKind::ObjectStore { .. } => ServiceType::ObjectStore,
            ServiceKind::Identity { .. } => ServiceType::Identity,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ServiceKind::Compute { name }
            | ServiceKind::BlockStorage { name }
            | ServiceKind::Network { name }
            | ServiceKind::ObjectStore { name }
            | ServiceKind::Identity { name } => name,
        }
    }

    fn check(&self) -> SchemaResult<()> {
        required_text("kind.name", self.name()).map(|_| ())
    }
}

/// Input for [`Service::new`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSpec {
    pub region_id: Uuid,
    pub endpoint: String,
    pub kind: ServiceKind,
    #[serde(default)]
    pub description: Option<String>,
}

impl ServiceSpec {
    pub fn new(region_id: Uuid, endpoint: impl Into<String>, kind: ServiceKind) -> Self {
        Self {
            region_id,
            endpoint: endpoint.into(),
            kind,
            description: None,
        }
    }
}

/// Service exposed by a region
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: Uuid,
    pub region_id: Uuid,
    /// Unique federation-wide
    pub endpoint: Endpoint,
    pub kind: ServiceKind,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Service {
    pub fn new(spec: ServiceSpec) -> SchemaResult<Self> {
        spec.kind.check()?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::now_v7(),
            region_id: spec.region_id,
            endpoint: Endpoint::new(&spec.endpoint)?,
            kind: spec.kind,
            description: optional_text(spec.description),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn service_type(&self) -> ServiceType {
        self.kind.service_type()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServicePatch {
    pub region_id: Option<Uuid>,
    pub endpoint: Option<String>,
    pub kind: Option<ServiceKind>,
    pub description: Option<String>,
}

impl Patchable for Service {
    type Patch = ServicePatch;

    fn apply(&self, patch: ServicePatch) -> SchemaResult<Self> {
        let mut next = self.clone();
        if let Some(region_id) = patch.region_id {
            next.region_id = region_id;
        }
        if let Some(endpoint) = patch.endpoint {
            next.endpoint = Endpoint::new(endpoint)?;
        }
        if let Some(kind) = patch.kind {
            kind.check()?;
            next.kind = kind;
        }
        if let Some(description) = patch.description {
            next.description = optional_text(Some(description));
        }
        next.updated_at = Utc::now();
        Ok(next)
    }
}
