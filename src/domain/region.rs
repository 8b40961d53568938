// Copyright (c) 2025 - Cowboy AI, Inc.
//! Region Entity and its physical Location

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::schema::{optional_text, required_text, SchemaResult, SchemaViolation};
use super::Patchable;

/// Physical site hosting a region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub site: String,
    pub country: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Location {
    pub fn new(site: impl Into<String>, country: impl Into<String>) -> SchemaResult<Self> {
        Ok(Self {
            site: required_text("location.site", site)?,
            country: required_text("location.country", country)?,
            latitude: None,
            longitude: None,
        })
    }

    /// Attach coordinates, rejecting values outside the WGS84 range
    pub fn at(mut self, latitude: f64, longitude: f64) -> SchemaResult<Self> {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self.check()?;
        Ok(self)
    }

    fn check(&self) -> SchemaResult<()> {
        required_text("location.site", self.site.as_str())?;
        required_text("location.country", self.country.as_str())?;
        if let Some(lat) = self.latitude {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(SchemaViolation::InvalidValue {
                    field: "location.latitude",
                    reason: format!("{} is outside [-90, 90]", lat),
                });
            }
        }
        if let Some(lon) = self.longitude {
            if !(-180.0..=180.0).contains(&lon) {
                return Err(SchemaViolation::InvalidValue {
                    field: "location.longitude",
                    reason: format!("{} is outside [-180, 180]", lon),
                });
            }
        }
        Ok(())
    }
}

/// Input for [`Region::new`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionSpec {
    pub provider_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<Location>,
}

impl RegionSpec {
    pub fn new(provider_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            provider_id,
            name: name.into(),
            description: None,
            location: None,
        }
    }
}

/// Region of a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub location: Option<Location>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Region {
    pub fn new(spec: RegionSpec) -> SchemaResult<Self> {
        if let Some(location) = &spec.location {
            location.check()?;
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::now_v7(),
            provider_id: spec.provider_id,
            name: required_text("name", spec.name)?,
            description: optional_text(spec.description),
            location: spec.location,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial update of a [`Region`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegionPatch {
    pub provider_id: Option<Uuid>,
    pub name: Option<String>,
    pub description: Option<String>,
    /// `Some(None)` clears the location
    pub location: Option<Option<Location>>,
}

impl Patchable for Region {
    type Patch = RegionPatch;

    fn apply(&self, patch: RegionPatch) -> SchemaResult<Self> {
        let mut next = self.clone();
        if let Some(provider_id) = patch.provider_id {
            next.provider_id = provider_id;
        }
        if let Some(name) = patch.name {
            next.name = required_text("name", name)?;
        }
        if let Some(description) = patch.description {
            next.description = optional_text(Some(description));
        }
        if let Some(location) = patch.location {
            if let Some(location) = &location {
                location.check()?;
            }
            next.location = location;
        }
        next.updated_at = Utc::now();
        Ok(next)
    }
}
