//! Store Error Types
//!
//! This module defines error types for document store and relation graph
//! operations. Service-layer failures (detection, migration, routing) live in
//! `services::error`.

use thiserror::Error;

/// Store operation errors
///
/// Covers document repository and relation graph failures. `PermissionDenied`
/// is raised by the store's ACL walk and surfaced to callers unchanged; the
/// comment layer never re-implements permission checks.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Document not found by id
    #[error("Document not found: {id}")]
    DocumentNotFound { id: String },

    /// Caller lacks the required permission on the document
    #[error("Permission denied for {principal} on document {id}")]
    PermissionDenied { id: String, principal: String },

    /// Attempt to create a document with an id that already exists
    #[error("Document already exists: {id}")]
    DocumentAlreadyExists { id: String },

    /// Move would corrupt the hierarchy (missing target, cycle)
    #[error("Invalid move: {context}")]
    InvalidMove { context: String },

    /// Backend-specific failure
    #[error("Store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Create a document not found error
    pub fn document_not_found(id: impl Into<String>) -> Self {
        Self::DocumentNotFound { id: id.into() }
    }

    /// Create a permission denied error
    pub fn permission_denied(id: impl Into<String>, principal: impl Into<String>) -> Self {
        Self::PermissionDenied {
            id: id.into(),
            principal: principal.into(),
        }
    }

    /// Create an already exists error
    pub fn document_already_exists(id: impl Into<String>) -> Self {
        Self::DocumentAlreadyExists { id: id.into() }
    }

    /// Create an invalid move error
    pub fn invalid_move(context: impl Into<String>) -> Self {
        Self::InvalidMove {
            context: context.into(),
        }
    }

    /// Create a backend error
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}
