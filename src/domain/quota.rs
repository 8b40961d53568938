// Copyright (c) 2025 - Cowboy AI, Inc.
//! Quota Entity
//!
//! A quota is either the default of a service (no project) or an override for
//! one project on that service. Limits are optional: `None` means the limit is
//! not configured. Negative limits are rejected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::schema::{non_negative, optional_text, SchemaResult};
use super::service::ServiceType;
use super::Patchable;

/// Limits payload, tagged by the kind of service it applies to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum QuotaLimits {
    Compute {
        cores: Option<i64>,
        instances: Option<i64>,
        /// MiB
        ram: Option<i64>,
    },
    BlockStorage {
        /// GiB
        gigabytes: Option<i64>,
        per_volume_gigabytes: Option<i64>,
        volumes: Option<i64>,
    },
    Network {
        public_ips: Option<i64>,
        networks: Option<i64>,
        ports: Option<i64>,
        security_groups: Option<i64>,
        security_group_rules: Option<i64>,
    },
    ObjectStore {
        bytes: Option<i64>,
        containers: Option<i64>,
        objects: Option<i64>,
    },
}

impl QuotaLimits {
    pub fn compute(cores: Option<i64>, instances: Option<i64>, ram: Option<i64>) -> Self {
        QuotaLimits::Compute {
            cores,
            instances,
            ram,
        }
    }

    pub fn block_storage(
        gigabytes: Option<i64>,
        per_volume_gigabytes: Option<i64>,
        volumes: Option<i64>,
    ) -> Self {
        QuotaLimits::BlockStorage {
            gigabytes,
            per_volume_gigabytes,
            volumes,
        }
    }

    pub fn network() -> Self {
        QuotaLimits::Network {
            public_ips: None,
            networks: None,
            ports: None,
            security_groups: None,
            security_group_rules: None,
        }
    }

    pub fn object_store(
        bytes: Option<i64>,
        containers: Option<i64>,
        objects: Option<i64>,
    ) -> Self {
        QuotaLimits::ObjectStore {
            bytes,
            containers,
            objects,
        }
    }

    /// Kind of service these limits apply to
    pub fn service_type(&self) -> ServiceType {
        match self {
            QuotaLimits::Compute { .. } => ServiceType::Compute,
            QuotaLimits::BlockStorage { .. } => ServiceType::BlockStorage,
            QuotaLimits::Network { .. } => ServiceType::Network,
            QuotaLimits::ObjectStore { .. } => ServiceType::ObjectStore,
        }
    }

    /// Every limit as `(field, value)`
    pub fn entries(&self) -> Vec<(&'static str, Option<i64>)> {
        match self {
            QuotaLimits::Compute {
                cores,
                instances,
                ram,
            } => vec![("cores", *cores), ("instances", *instances), ("ram", *ram)],
            QuotaLimits::BlockStorage {
                gigabytes,
                per_volume_gigabytes,
                volumes,
            } => vec![
                ("gigabytes", *gigabytes),
                ("per_volume_gigabytes", *per_volume_gigabytes),
                ("volumes", *volumes),
            ],
            QuotaLimits::Network {
                public_ips,
                networks,
                ports,
                security_groups,
                security_group_rules,
            } => vec![
                ("public_ips", *public_ips),
                ("networks", *networks),
                ("ports", *ports),
                ("security_groups", *security_groups),
                ("security_group_rules", *security_group_rules),
            ],
            QuotaLimits::ObjectStore {
                bytes,
                containers,
                objects,
            } => vec![
                ("bytes", *bytes),
                ("containers", *containers),
                ("objects", *objects),
            ],
        }
    }

    /// Limit by field name
    pub fn get(&self, field: &str) -> Option<i64> {
        self.entries()
            .into_iter()
            .find(|(name, _)| *name == field)
            .and_then(|(_, value)| value)
    }

    fn check(&self) -> SchemaResult<()> {
        for (field, value) in self.entries() {
            non_negative(field, value)?;
        }
        Ok(())
    }
}

/// Input for [`Quota::new`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaSpec {
    pub service_id: Uuid,
    /// `None` makes this the service default
    #[serde(default)]
    pub project_id: Option<Uuid>,
    #[serde(default)]
    pub per_user: bool,
    #[serde(default)]
    pub description: Option<String>,
    pub limits: QuotaLimits,
}

impl QuotaSpec {
    /// Default quota of a service
    pub fn default_for(service_id: Uuid, limits: QuotaLimits) -> Self {
        Self {
            service_id,
            project_id: None,
            per_user: false,
            description: None,
            limits,
        }
    }

    /// Override for one project on a service
    pub fn for_project(service_id: Uuid, project_id: Uuid, limits: QuotaLimits) -> Self {
        Self {
            project_id: Some(project_id),
            ..Self::default_for(service_id, limits)
        }
    }
}

/// Resource limits on a service, optionally for one project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quota {
    pub id: Uuid,
    pub service_id: Uuid,
    pub project_id: Option<Uuid>,
    /// Limits apply to each user rather than to the whole project
    pub per_user: bool,
    pub description: Option<String>,
    pub limits: QuotaLimits,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Quota {
    pub fn new(spec: QuotaSpec) -> SchemaResult<Self> {
        spec.limits.check()?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::now_v7(),
            service_id: spec.service_id,
            project_id: spec.project_id,
            per_user: spec.per_user,
            description: optional_text(spec.description),
            limits: spec.limits,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_default(&self) -> bool {
        self.project_id.is_none()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuotaPatch {
    pub service_id: Option<Uuid>,
    /// `Some(None)` turns the quota into the service default
    pub project_id: Option<Option<Uuid>>,
    pub per_user: Option<bool>,
    pub description: Option<String>,
    pub limits: Option<QuotaLimits>,
}

impl Patchable for Quota {
    type Patch = QuotaPatch;

    fn apply(&self, patch: QuotaPatch) -> SchemaResult<Self> {
        let mut next = self.clone();
        if let Some(service_id) = patch.service_id {
            next.service_id = service_id;
        }
        if let Some(project_id) = patch.project_id {
            next.project_id = project_id;
        }
        if let Some(per_user) = patch.per_user {
            next.per_user = per_user;
        }
        if let Some(description) = patch.description {
            next.description = optional_text(Some(description));
        }
        if let Some(limits) = patch.limits {
            limits.check()?;
            next.limits = limits;
        }
        next.updated_at = Utc::now();
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SchemaViolation;

    #[test]
    fn test_negative_limit_rejected() {
        let spec = QuotaSpec::default_for(
            Uuid::now_v7(),
            QuotaLimits::compute(Some(-4), None, None),
        );
        assert_eq!(
            Quota::new(spec),
            Err(SchemaViolation::NegativeLimit {
                field: "cores",
                value: -4
            })
        );
    }

    #[test]
    fn test_unconfigured_limits_allowed() {
        let quota = Quota::new(QuotaSpec::default_for(Uuid::now_v7(), QuotaLimits::network()))
            .unwrap();
        assert!(quota.is_default());
        assert_eq!(quota.limits.service_type(), ServiceType::Network);
        assert_eq!(quota.limits.get("ports"), None);
    }

    #[test]
    fn test_limit_lookup() {
        let limits = QuotaLimits::block_storage(Some(1000), Some(100), Some(10));
        assert_eq!(limits.get("gigabytes"), Some(1000));
        assert_eq!(limits.get("volumes"), Some(10));
        assert_eq!(limits.get("cores"), None);
    }

    #[test]
    fn test_object_store_limits() {
        let limits = QuotaLimits::object_store(None, Some(1000), None);
        assert_eq!(limits.service_type(), ServiceType::ObjectStore);
        assert_eq!(limits.get("containers"), Some(1000));

        let json = serde_json::to_value(&limits).unwrap();
        assert_eq!(json["type"], "object-store");

        let negative = QuotaSpec::default_for(
            Uuid::now_v7(),
            QuotaLimits::object_store(Some(-1), None, None),
        );
        assert_eq!(
            Quota::new(negative),
            Err(SchemaViolation::NegativeLimit {
                field: "bytes",
                value: -1
            })
        );
    }

    #[test]
    fn test_patch_rejects_negative_limit() {
        let quota = Quota::new(QuotaSpec::default_for(
            Uuid::now_v7(),
            QuotaLimits::compute(Some(8), None, None),
        ))
        .unwrap();
        let result = quota.apply(QuotaPatch {
            limits: Some(QuotaLimits::compute(None, Some(-1), None)),
            ..Default::default()
        });
        assert!(result.is_err());
    }
}
