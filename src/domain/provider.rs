// Copyright (c) 2025 - Cowboy AI, Inc.
//! Provider Entity and its Identity Provider trust links
//!
//! A Provider is a cloud site participating in the federation. It owns Regions
//! and Projects and trusts one or more Identity Providers. Each trust is an
//! [`AuthMethod`]: a relationship entity carrying the name the provider uses
//! for the identity provider and the federation protocol in use.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::schema::{email, optional_text, required_text, unique_entries, SchemaResult};
use super::Patchable;

/// IaaS type of a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderType {
    Openstack,
    Kubernetes,
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderType::Openstack => write!(f, "openstack"),
            ProviderType::Kubernetes => write!(f, "kubernetes"),
        }
    }
}

/// Operational status of a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderStatus {
    #[default]
    Active,
    Maintenance,
    Removed,
}

/// Trust link from a provider to an identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthMethod {
    /// Trusted identity provider
    pub identity_provider_id: Uuid,

    /// Name under which the provider knows this identity provider
    pub idp_name: String,

    /// Federation protocol (e.g. `openid`)
    pub protocol: String,
}

impl AuthMethod {
    pub fn new(
        identity_provider_id: Uuid,
        idp_name: impl Into<String>,
        protocol: impl Into<String>,
    ) -> SchemaResult<Self> {
        Ok(Self {
            identity_provider_id,
            idp_name: required_text("idp_name", idp_name)?,
            protocol: required_text("protocol", protocol)?,
        })
    }
}

/// Input for [`Provider::new`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSpec {
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
    pub identity_providers: Vec<AuthMethod>,
}

impl ProviderSpec {
    pub fn new(name: impl Into<String>, provider_type: ProviderType) -> Self {
        Self {
            name: name.into(),
            provider_type,
            status: ProviderStatus::default(),
            is_public: false,
            description: None,
            support_emails: Vec::new(),
            identity_providers: Vec::new(),
        }
    }

    pub fn public(mut self) -> Self {
        self.is_public = true;
        self
    }

    pub fn trusting(mut self, auth_method: AuthMethod) -> Self {
        self.identity_providers.push(auth_method);
        self
    }
}

/// Cloud provider participating in the federation
///
/// # Invariants
/// - Name is non-blank (federation-wide uniqueness is checked transactionally)
/// - Support e-mails are well formed
/// - Each identity provider is trusted at most once
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub id: Uuid,
    pub name: String,
    pub provider_type: ProviderType,
    pub status: ProviderStatus,
    pub is_public: bool,
    pub description: Option<String>,
    pub support_emails: Vec<String>,
    pub identity_providers: Vec<AuthMethod>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Provider {
    /// Create a new provider with validation
    pub fn new(spec: ProviderSpec) -> SchemaResult<Self> {
        let now = Utc::now();
        let provider = Self {
            id: Uuid::now_v7(),
            name: required_text("name", spec.name)?,
            provider_type: spec.provider_type,
            status: spec.status,
            is_public: spec.is_public,
            description: optional_text(spec.description),
            support_emails: spec
                .support_emails
                .iter()
                .map(|e| email("support_emails", e))
                .collect::<SchemaResult<_>>()?,
            identity_providers: spec.identity_providers,
            created_at: now,
            updated_at: now,
        };
        provider.check()?;
        Ok(provider)
    }

    fn check(&self) -> SchemaResult<()> {
        for link in &self.identity_providers {
            required_text("idp_name", link.idp_name.as_str())?;
            required_text("protocol", link.protocol.as_str())?;
        }
        unique_entries(
            "identity_providers",
            self.identity_providers.iter().map(|l| l.identity_provider_id),
        )
    }

    /// Trust link to the given identity provider, if any
    pub fn trust_for(&self, identity_provider_id: Uuid) -> Option<&AuthMethod> {
        self.identity_providers
            .iter()
            .find(|l| l.identity_provider_id == identity_provider_id)
    }

    pub fn trusts(&self, identity_provider_id: Uuid) -> bool {
        self.trust_for(identity_provider_id).is_some()
    }

    /// Drop the trust link to an identity provider
    pub fn without_trust(&self, identity_provider_id: Uuid) -> Self {
        let mut next = self.clone();
        next.identity_providers
            .retain(|l| l.identity_provider_id != identity_provider_id);
        next.updated_at = Utc::now();
        next
    }
}

/// Partial update of a [`Provider`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderPatch {
    pub name: Option<String>,
    pub provider_type: Option<ProviderType>,
    pub status: Option<ProviderStatus>,
    pub is_public: Option<bool>,
    pub description: Option<String>,
    pub support_emails: Option<Vec<String>>,
    /// Replaces the whole set of trust links
    pub identity_providers: Option<Vec<AuthMethod>>,
}

impl Patchable for Provider {
    type Patch = ProviderPatch;

    fn apply(&self, patch: ProviderPatch) -> SchemaResult<Self> {
        let mut next = self.clone();
        if let Some(name) = patch.name {
            next.name = required_text("name", name)?;
        }
        if let Some(provider_type) = patch.provider_type {
            next.provider_type = provider_type;
        }
        if let Some(status) = patch.status {
            next.status = status;
        }
        if let Some(is_public) = patch.is_public {
            next.is_public = is_public;
        }
        if let Some(description) = patch.description {
            next.description = optional_text(Some(description));
        }
        if let Some(emails) = patch.support_emails {
            next.support_emails = emails
                .iter()
                .map(|e| email("support_emails", e))
                .collect::<SchemaResult<_>>()?;
        }
        if let Some(links) = patch.identity_providers {
            next.identity_providers = links;
        }
        next.check()?;
        next.updated_at = Utc::now();
        Ok(next)
    }
}
