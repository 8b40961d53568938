// Copyright (c) 2025 - Cowboy AI, Inc.
//! Endpoint Value Object with URL Validation Invariants

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

use super::schema::SchemaViolation;

/// Service or issuer endpoint
///
/// Invariants:
/// - Absolute `http` or `https` URL
/// - Has a host
/// - Carries no embedded credentials
///
/// The URL is stored in canonical form (lower-case host, explicit root path),
/// so `https://IDP.example` and `https://idp.example/` are the same endpoint
/// for uniqueness purposes.
///
/// ```rust
/// use fed_registry::domain::Endpoint;
///
/// let a = Endpoint::new("https://IDP.example").unwrap();
/// let b = Endpoint::new("https://idp.example/").unwrap();
/// assert_eq!(a, b);
/// assert!(Endpoint::new("ftp://idp.example/").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Endpoint(Url);

impl Endpoint {
    /// Parse and validate an endpoint
    pub fn new(value: impl AsRef<str>) -> Result<Self, SchemaViolation> {
        let raw = value.as_ref().trim();
        let invalid = |reason: &str| SchemaViolation::InvalidEndpoint {
            value: raw.to_string(),
            reason: reason.to_string(),
        };

        if raw.is_empty() {
            return Err(SchemaViolation::MissingField("endpoint"));
        }

        let url = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(invalid("scheme must be http or https"));
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(invalid("missing host"));
        }
        if !url.username().is_empty() || url.password().is_some() {
            return Err(invalid("credentials are not allowed in endpoints"));
        }

        Ok(Self(url))
    }

    /// Canonical string form
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Host part of the endpoint
    pub fn host(&self) -> &str {
        self.0.host_str().unwrap_or_default()
    }

    pub fn url(&self) -> &Url {
        &self.0
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Endpoint {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl TryFrom<String> for Endpoint {
    type Error = SchemaViolation;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for Endpoint {
    type Error = SchemaViolation;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Endpoint> for String {
    fn from(value: Endpoint) -> Self {
        value.0.into()
    }
}
