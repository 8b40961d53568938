// Copyright (c) 2025 - Cowboy AI, Inc.
//! Identity entities: Identity Providers, User Groups and SLAs
//!
//! ```text
//! IdentityProvider ──HAS_USER_GROUP──▶ UserGroup ──HOLDS_SLA──▶ SLA ──GRANTS──▶ Project
//! ```
//!
//! An SLA is the grant record: it links exactly one user group to exactly one
//! project and carries the validity window of the signed agreement.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::endpoint::Endpoint;
use super::schema::{optional_text, required_text, SchemaResult, SchemaViolation};
use super::Patchable;

/// Input for [`IdentityProvider::new`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityProviderSpec {
    pub endpoint: String,
    pub group_claim: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl IdentityProviderSpec {
    pub fn new(endpoint: impl Into<String>, group_claim: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            group_claim: group_claim.into(),
            description: None,
        }
    }
}

/// Token issuer trusted by one or more providers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityProvider {
    pub id: Uuid,
    /// Issuer URL, unique federation-wide
    pub endpoint: Endpoint,
    /// Token claim holding the caller's groups
    pub group_claim: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IdentityProvider {
    pub fn new(spec: IdentityProviderSpec) -> SchemaResult<Self> {
        let now = Utc::now();
        Ok(Self {
            id: Uuid::now_v7(),
            endpoint: Endpoint::new(&spec.endpoint)?,
            group_claim: required_text("group_claim", spec.group_claim)?,
            description: optional_text(spec.description),
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityProviderPatch {
    pub endpoint: Option<String>,
    pub group_claim: Option<String>,
    pub description: Option<String>,
}

impl Patchable for IdentityProvider {
    type Patch = IdentityProviderPatch;

    fn apply(&self, patch: IdentityProviderPatch) -> SchemaResult<Self> {
        let mut next = self.clone();
        if let Some(endpoint) = patch.endpoint {
            next.endpoint = Endpoint::new(endpoint)?;
        }
        if let Some(group_claim) = patch.group_claim {
            next.group_claim = required_text("group_claim", group_claim)?;
        }
        if let Some(description) = patch.description {
            next.description = optional_text(Some(description));
        }
        next.updated_at = Utc::now();
        Ok(next)
    }
}

/// Input for [`UserGroup::new`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserGroupSpec {
    pub identity_provider_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl UserGroupSpec {
    pub fn new(identity_provider_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            identity_provider_id,
            name: name.into(),
            description: None,
        }
    }
}

/// Group of users as asserted by an identity provider's group claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserGroup {
    pub id: Uuid,
    pub identity_provider_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserGroup {
    pub fn new(spec: UserGroupSpec) -> SchemaResult<Self> {
        let now = Utc::now();
        Ok(Self {
            id: Uuid::now_v7(),
            identity_provider_id: spec.identity_provider_id,
            name: required_text("name", spec.name)?,
            description: optional_text(spec.description),
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserGroupPatch {
    pub identity_provider_id: Option<Uuid>,
    pub name: Option<String>,
    pub description: Option<String>,
}

impl Patchable for UserGroup {
    type Patch = UserGroupPatch;

    fn apply(&self, patch: UserGroupPatch) -> SchemaResult<Self> {
        let mut next = self.clone();
        if let Some(identity_provider_id) = patch.identity_provider_id {
            next.identity_provider_id = identity_provider_id;
        }
        if let Some(name) = patch.name {
            next.name = required_text("name", name)?;
        }
        if let Some(description) = patch.description {
            next.description = optional_text(Some(description));
        }
        next.updated_at = Utc::now();
        Ok(next)
    }
}

/// Input for [`Sla::new`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlaSpec {
    pub user_group_id: Uuid,
    pub project_id: Uuid,
    pub doc_uuid: String,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub description: Option<String>,
}

impl SlaSpec {
    pub fn new(
        user_group_id: Uuid,
        project_id: Uuid,
        doc_uuid: impl Into<String>,
        start_date: NaiveDate,
    ) -> Self {
        Self {
            user_group_id,
            project_id,
            doc_uuid: doc_uuid.into(),
            start_date,
            end_date: None,
            description: None,
        }
    }
}

/// Grant of a project to a user group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sla {
    pub id: Uuid,
    pub user_group_id: Uuid,
    pub project_id: Uuid,
    /// Identifier of the signed agreement document
    pub doc_uuid: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Sla {
    pub fn new(spec: SlaSpec) -> SchemaResult<Self> {
        let now = Utc::now();
        let sla = Self {
            id: Uuid::now_v7(),
            user_group_id: spec.user_group_id,
            project_id: spec.project_id,
            doc_uuid: required_text("doc_uuid", spec.doc_uuid)?,
            start_date: spec.start_date,
            end_date: spec.end_date,
            description: optional_text(spec.description),
            created_at: now,
            updated_at: now,
        };
        sla.check()?;
        Ok(sla)
    }

    fn check(&self) -> SchemaResult<()> {
        match self.end_date {
            Some(end) if end < self.start_date => Err(SchemaViolation::InvalidValue {
                field: "end_date",
                reason: format!("{} is before start date {}", end, self.start_date),
            }),
            _ => Ok(()),
        }
    }

    /// Whether the agreement covers the given day
    pub fn is_active_on(&self, day: NaiveDate) -> bool {
        self.start_date <= day && self.end_date.map_or(true, |end| day <= end)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlaPatch {
    pub user_group_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub doc_uuid: Option<String>,
    pub start_date: Option<NaiveDate>,
    /// `Some(None)` removes the end date
    pub end_date: Option<Option<NaiveDate>>,
    pub description: Option<String>,
}

impl Patchable for Sla {
    type Patch = SlaPatch;

    fn apply(&self, patch: SlaPatch) -> SchemaResult<Self> {
        let mut next = self.clone();
        if let Some(user_group_id) = patch.user_group_id {
            next.user_group_id = user_group_id;
        }
        if let Some(project_id) = patch.project_id {
            next.project_id = project_id;
        }
        if let Some(doc_uuid) = patch.doc_uuid {
            next.doc_uuid = required_text("doc_uuid", doc_uuid)?;
        }
        if let Some(start_date) = patch.start_date {
            next.start_date = start_date;
        }
        if let Some(end_date) = patch.end_date {
            next.end_date = end_date;
        }
        if let Some(description) = patch.description {
            next.description = optional_text(Some(description));
        }
        next.check()?;
        next.updated_at = Utc::now();
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_identity_provider_canonical_endpoint() {
        let idp = IdentityProvider::new(IdentityProviderSpec::new(
            "https://idp.example",
            "groups",
        ))
        .unwrap();
        assert_eq!(idp.endpoint.as_str(), "https://idp.example/");
    }

    #[test]
    fn test_identity_provider_requires_group_claim() {
        let result = IdentityProvider::new(IdentityProviderSpec::new("https://idp.example/", " "));
        assert_eq!(result, Err(SchemaViolation::MissingField("group_claim")));
    }

    #[test]
    fn test_sla_dates() {
        let mut spec = SlaSpec::new(Uuid::now_v7(), Uuid::now_v7(), "doc-1", day(2026, 1, 1));
        spec.end_date = Some(day(2025, 12, 31));
        assert!(matches!(
            Sla::new(spec.clone()),
            Err(SchemaViolation::InvalidValue { field: "end_date", .. })
        ));

        spec.end_date = Some(day(2026, 12, 31));
        let sla = Sla::new(spec).unwrap();
        assert!(sla.is_active_on(day(2026, 6, 1)));
        assert!(!sla.is_active_on(day(2027, 1, 1)));
    }

    #[test]
    fn test_sla_patch_rechecks_dates() {
        let sla = Sla::new(SlaSpec::new(Uuid::now_v7(), Uuid::now_v7(), "doc-1", day(2026, 1, 1)))
            .unwrap();
        let result = sla.apply(SlaPatch {
            end_date: Some(Some(day(2025, 1, 1))),
            ..Default::default()
        });
        assert!(result.is_err());
    }
}
