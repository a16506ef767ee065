//! Comment Service Error Types
//!
//! This module defines error types for the comment layer: backends, detector,
//! bridge router and migration engine.
//!
//! `CommentNotFound` and `PermissionDenied` surface to the caller and are never
//! retried. `AmbiguousRepresentation` is fatal only to the affected record
//! inside a migration batch; the run logs, skips and continues.

use crate::db::StoreError;
use thiserror::Error;

/// Comment operation errors
#[derive(Error, Debug)]
pub enum CommentError {
    /// Comment not found by id (in the addressed backend, or in any backend
    /// when raised by the bridge)
    #[error("Comment not found: {id}")]
    CommentNotFound { id: String },

    /// Insufficient permission on the underlying document, propagated from
    /// the store
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The detector cannot classify a stored comment
    #[error("Cannot determine representation of comment {id}: {reason}")]
    AmbiguousRepresentation { id: String, reason: String },

    /// Operation not supported by the addressed backend
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// No migration registered under this id
    #[error("Unknown migration: {id}")]
    UnknownMigration { id: String },

    /// A migration run for this id is already in progress
    #[error("Migration already running: {id}")]
    MigrationAlreadyRunning { id: String },

    /// Store operation failed
    #[error("Store operation failed: {0}")]
    Store(StoreError),
}

impl CommentError {
    /// Create a comment not found error
    pub fn comment_not_found(id: impl Into<String>) -> Self {
        Self::CommentNotFound { id: id.into() }
    }

    /// Create an ambiguous representation error
    pub fn ambiguous(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::AmbiguousRepresentation {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Create an unsupported operation error
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedOperation(msg.into())
    }

    /// Create an unknown migration error
    pub fn unknown_migration(id: impl Into<String>) -> Self {
        Self::UnknownMigration { id: id.into() }
    }

    /// Create an already running error
    pub fn migration_already_running(id: impl Into<String>) -> Self {
        Self::MigrationAlreadyRunning { id: id.into() }
    }
}

impl From<StoreError> for CommentError {
    fn from(err: StoreError) -> Self {
        match err {
            // Security failures keep their identity across the layer boundary
            StoreError::PermissionDenied { id, principal } => {
                Self::PermissionDenied(format!("{} on document {}", principal, id))
            }
            other => Self::Store(other),
        }
    }
}
