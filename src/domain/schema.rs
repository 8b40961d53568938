// Copyright (c) 2025 - Cowboy AI, Inc.
//! Structural schema checks shared by every entity constructor
//!
//! These functions are pure: they look at one input value and nothing else.
//! Cross-entity rules live in [`crate::validation`].

use std::collections::BTreeSet;
use std::fmt::Display;
use thiserror::Error;

/// Malformed single-entity input
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaViolation {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("Limit {field} cannot be negative: {value}")]
    NegativeLimit { field: &'static str, value: i64 },

    #[error("Invalid endpoint {value}: {reason}")]
    InvalidEndpoint { value: String, reason: String },

    #[error("Duplicate {field}: {value}")]
    Duplicate { field: &'static str, value: String },

    #[error("Private entry must be shared with at least one project")]
    PrivateWithoutProjects,
}

/// Schema check result
pub type SchemaResult<T> = Result<T, SchemaViolation>;

/// Trim a required text field, rejecting blank input
pub fn required_text(field: &'static str, value: impl Into<String>) -> SchemaResult<String> {
    let value = value.into();
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(SchemaViolation::MissingField(field));
    }
    Ok(trimmed.to_string())
}

/// Normalise an optional text field: blank becomes `None`
pub fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Reject negative limits; `None` means "not configured"
pub fn non_negative(field: &'static str, value: Option<i64>) -> SchemaResult<()> {
    match value {
        Some(v) if v < 0 => Err(SchemaViolation::NegativeLimit { field, value: v }),
        _ => Ok(()),
    }
}

/// Require a strictly positive number when present
pub fn positive(field: &'static str, value: Option<i64>) -> SchemaResult<()> {
    match value {
        Some(v) if v <= 0 => Err(SchemaViolation::InvalidValue {
            field,
            reason: format!("must be positive, got {}", v),
        }),
        _ => Ok(()),
    }
}

/// Reject a list holding the same key twice
pub fn unique_entries<K, I>(field: &'static str, keys: I) -> SchemaResult<()>
where
    K: Ord + Display,
    I: IntoIterator<Item = K>,
{
    let mut seen = BTreeSet::new();
    for key in keys {
        if seen.contains(&key) {
            return Err(SchemaViolation::Duplicate {
                field,
                value: key.to_string(),
            });
        }
        seen.insert(key);
    }
    Ok(())
}

/// Minimal e-mail shape check: one `@` with text on both sides
pub fn email(field: &'static str, value: &str) -> SchemaResult<String> {
    let value = value.trim();
    match value.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
            Ok(value.to_string())
        }
        _ => Err(SchemaViolation::InvalidValue {
            field,
            reason: format!("not an e-mail address: {}", value),
        }),
    }
}
