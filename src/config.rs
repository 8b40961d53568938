// Copyright (c) 2025 - Cowboy AI, Inc.
//! Registry and storage configuration
//!
//! Both structures have sensible defaults and can be overridden from the
//! environment:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `FED_REG_READ_RETRIES` | `RegistryConfig::read_retry.attempts` |
//! | `FED_REG_READ_BACKOFF_MS` | `RegistryConfig::read_retry.backoff_ms` |
//! | `FED_REG_MAX_PAGE_SIZE` | `RegistryConfig::max_page_size` |
//! | `NEO4J_URI` | `Neo4jConfig::uri` |
//! | `NEO4J_USER` | `Neo4jConfig::user` |
//! | `NEO4J_PASSWORD` | `Neo4jConfig::password` |
//! | `NEO4J_DATABASE` | `Neo4jConfig::database` |

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Configuration loading errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?} ({reason})")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Retry policy for read transactions hitting an unavailable store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first one; at least 1
    pub attempts: u32,

    /// Delay between attempts
    pub backoff_ms: u64,
}

impl RetryPolicy {
    /// Never retry
    pub fn none() -> Self {
        Self {
            attempts: 1,
            backoff_ms: 0,
        }
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff_ms: 50,
        }
    }
}

/// Façade configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub read_retry: RetryPolicy,

    /// Upper bound applied to every list `limit`
    pub max_page_size: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            read_retry: RetryPolicy::default(),
            max_page_size: 1000,
        }
    }
}

impl RegistryConfig {
    /// Load from the process environment, falling back to defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let attempts = parse_or(&lookup, "FED_REG_READ_RETRIES", defaults.read_retry.attempts)?;
        if attempts == 0 {
            return Err(ConfigError::InvalidValue {
                var: "FED_REG_READ_RETRIES",
                value: "0".to_string(),
                reason: "at least one attempt is required".to_string(),
            });
        }
        let max_page_size = parse_or(&lookup, "FED_REG_MAX_PAGE_SIZE", defaults.max_page_size)?;
        if max_page_size == 0 {
            return Err(ConfigError::InvalidValue {
                var: "FED_REG_MAX_PAGE_SIZE",
                value: "0".to_string(),
                reason: "page size must be positive".to_string(),
            });
        }
        Ok(Self {
            read_retry: RetryPolicy {
                attempts,
                backoff_ms: parse_or(
                    &lookup,
                    "FED_REG_READ_BACKOFF_MS",
                    defaults.read_retry.backoff_ms,
                )?,
            },
            max_page_size,
        })
    }
}

/// Neo4j connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Neo4jConfig {
    /// Neo4j URI (e.g., "bolt://localhost:7687")
    pub uri: String,

    pub user: String,

    pub password: String,

    /// Optional database name (defaults to "neo4j")
    pub database: Option<String>,
}

impl Neo4jConfig {
    pub fn new(
        uri: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            uri: uri.into(),
            user: user.into(),
            password: password.into(),
            database: None,
        }
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Database name, "neo4j" when unset
    pub fn database(&self) -> &str {
        self.database.as_deref().unwrap_or("neo4j")
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let uri = lookup("NEO4J_URI").unwrap_or(defaults.uri);
        if !(uri.starts_with("bolt://") || uri.starts_with("neo4j://") || uri.contains("+s://")) {
            return Err(ConfigError::InvalidValue {
                var: "NEO4J_URI",
                value: uri,
                reason: "expected a bolt:// or neo4j:// URI".to_string(),
            });
        }
        Ok(Self {
            uri,
            user: lookup("NEO4J_USER").unwrap_or(defaults.user),
            password: lookup("NEO4J_PASSWORD").unwrap_or(defaults.password),
            database: lookup("NEO4J_DATABASE").filter(|d| !d.trim().is_empty()),
        })
    }
}

impl Default for Neo4jConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: "".to_string(),
            database: None,
        }
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            var,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}
