// Copyright (c) 2025 - Cowboy AI, Inc.
//! Error types for registry operations
//!
//! Every façade call fails with exactly one [`RegistryError`] kind. The
//! transport layer maps these kinds onto responses; nothing below the façade
//! swallows or generalises them.

use thiserror::Error;
use uuid::Uuid;

use crate::domain::SchemaViolation;
use crate::graph::{NodeKind, StoreError};

/// Errors surfaced by the registry façade
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Malformed single-entity input, rejected before any transaction
    #[error("Schema violation: {0}")]
    SchemaViolation(#[from] SchemaViolation),

    /// Uniqueness or cardinality breach detected inside the transaction
    #[error("Conflict: {kind} with {key} already exists")]
    Conflict { kind: NodeKind, key: String },

    /// A required parent or related entity is absent
    #[error("Dangling reference: {kind} {id} does not exist")]
    DanglingReference { kind: NodeKind, id: Uuid },

    /// A cross-entity rule would be broken by the requested mutation
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Read, update or delete target is absent (or not visible to the caller)
    #[error("{kind} {id} not found")]
    NotFound { kind: NodeKind, id: Uuid },

    /// The storage collaborator could not start or commit a transaction
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// The storage collaborator rejected the operation in a way retrying
    /// cannot fix
    #[error("Storage fault: {0}")]
    StorageFault(String),
}

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

impl RegistryError {
    pub(crate) fn conflict(kind: NodeKind, key: impl Into<String>) -> Self {
        RegistryError::Conflict {
            kind,
            key: key.into(),
        }
    }

    pub(crate) fn invariant(message: impl Into<String>) -> Self {
        RegistryError::InvariantViolation(message.into())
    }

    /// Whether a read may be retried after this error
    pub fn is_transient(&self) -> bool {
        matches!(self, RegistryError::StorageUnavailable(_))
    }
}

impl From<StoreError> for RegistryError {
    fn from(err: StoreError) -> Self {
        match &err {
            StoreError::Constraint { kind, key } => RegistryError::Conflict {
                kind: *kind,
                key: key.clone(),
            },
            StoreError::Unavailable(_) => RegistryError::StorageUnavailable(err.to_string()),
            StoreError::Codec(_) | StoreError::MissingEndpoint(_) | StoreError::ReadOnly => {
                RegistryError::StorageFault(err.to_string())
            }
        }
    }
}
