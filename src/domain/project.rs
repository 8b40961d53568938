// Copyright (c) 2025 - Cowboy AI, Inc.
//! Project Entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::schema::{optional_text, required_text, SchemaResult};
use super::Patchable;

/// Input for [`Project::new`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSpec {
    pub provider_id: Uuid,
    pub name: String,
    /// Project identifier inside the provider
    pub uuid: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl ProjectSpec {
    pub fn new(provider_id: Uuid, name: impl Into<String>, uuid: impl Into<String>) -> Self {
        Self {
            provider_id,
            name: name.into(),
            uuid: uuid.into(),
            description: None,
        }
    }
}

/// Tenant space inside a provider
///
/// Name and provider-side UUID are each unique within the owning provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub name: String,
    pub uuid: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn new(spec: ProjectSpec) -> SchemaResult<Self> {
        let now = Utc::now();
        Ok(Self {
            id: Uuid::now_v7(),
            provider_id: spec.provider_id,
            name: required_text("name", spec.name)?,
            uuid: required_text("uuid", spec.uuid)?,
            description: optional_text(spec.description),
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectPatch {
    pub provider_id: Option<Uuid>,
    pub name: Option<String>,
    pub uuid: Option<String>,
    pub description: Option<String>,
}

impl Patchable for Project {
    type Patch = ProjectPatch;

    fn apply(&self, patch: ProjectPatch) -> SchemaResult<Self> {
        let mut next = self.clone();
        if let Some(provider_id) = patch.provider_id {
            next.provider_id = provider_id;
        }
        if let Some(name) = patch.name {
            next.name = required_text("name", name)?;
        }
        if let Some(uuid) = patch.uuid {
            next.uuid = required_text("uuid", uuid)?;
        }
        if let Some(description) = patch.description {
            next.description = optional_text(Some(description));
        }
        next.updated_at = Utc::now();
        Ok(next)
    }
}
