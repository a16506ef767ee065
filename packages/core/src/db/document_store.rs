//! DocumentStore Trait - Repository Abstraction Layer
//!
//! This module defines the `DocumentStore` trait that abstracts the document
//! repository the comment backends run against. The trait keeps the comment
//! layer independent of any concrete repository; the in-memory implementation
//! in [`crate::db::MemoryDocumentStore`] doubles as the test harness.
//!
//! # Design Decisions
//!
//! 1. **Async-First**: all methods are async so network-backed repositories
//!    fit behind the same trait as embedded ones
//! 2. **Session-Scoped**: every call takes a [`Session`]; ACL enforcement
//!    happens inside the store against the session's principal
//! 3. **Structured Queries**: filtering goes through [`DocumentQuery`], a
//!    builder-style filter over type, name, parent and property equality

use crate::db::StoreError;
use crate::models::{Document, DocumentRef};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Identity a store call runs as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub name: String,
    /// Admins bypass ACL checks entirely.
    pub is_admin: bool,
}

/// Per-call security context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub principal: Principal,
}

impl Session {
    /// Session for an ordinary named user.
    pub fn user(name: impl Into<String>) -> Self {
        Self {
            principal: Principal {
                name: name.into(),
                is_admin: false,
            },
        }
    }

    /// Administrative session; bypasses ACLs. Migration runs use this.
    pub fn admin() -> Self {
        Self {
            principal: Principal {
                name: "admin".to_string(),
                is_admin: true,
            },
        }
    }
}

/// Property equality predicate for [`DocumentQuery`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyEquals {
    pub namespace: String,
    pub field: String,
    pub value: serde_json::Value,
}

/// Structured document filter
///
/// All set fields must match (conjunction). Results are security-filtered:
/// documents the session cannot read are silently dropped, never errored.
///
/// # Examples
///
/// ```rust
/// # use remark_core::db::DocumentQuery;
/// # use serde_json::json;
/// // All comments replying to a given document
/// let query = DocumentQuery::new()
///     .with_doc_type("comment")
///     .with_property_equals("comment", "parentId", json!("doc-123"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentQuery {
    /// Filter by document type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,

    /// Filter by document name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Filter by immediate parent id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    /// Property equality predicates (all must match)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub property_equals: Vec<PropertyEquals>,

    /// Limit number of results
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,

    /// Offset for pagination
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
}

impl DocumentQuery {
    /// Create a new empty query
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter by document type
    pub fn with_doc_type(mut self, doc_type: impl Into<String>) -> Self {
        self.doc_type = Some(doc_type.into());
        self
    }

    /// Filter by document name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Filter by immediate parent id
    pub fn with_parent_id(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Add a property equality predicate (can be called multiple times)
    pub fn with_property_equals(
        mut self,
        namespace: impl Into<String>,
        field: impl Into<String>,
        value: serde_json::Value,
    ) -> Self {
        self.property_equals.push(PropertyEquals {
            namespace: namespace.into(),
            field: field.into(),
            value,
        });
        self
    }

    /// Set result limit
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set result offset
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// Abstraction over the document repository
///
/// Implementations must be `Send + Sync`. All mutating operations enforce the
/// session's effective permission on the touched documents and fail with
/// [`StoreError::PermissionDenied`]; read operations either fail (direct get)
/// or security-filter (query, children).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create a new document. Fails with `DocumentAlreadyExists` on id clash
    /// and `PermissionDenied` without write access to the parent.
    async fn create_document(&self, session: &Session, doc: Document)
        -> Result<Document, StoreError>;

    /// Load a document by reference.
    async fn get_document(
        &self,
        session: &Session,
        doc_ref: &DocumentRef,
    ) -> Result<Document, StoreError>;

    /// Save an existing document. Emits an update event carrying the
    /// notification-suppression marker from the document's `context_data`.
    async fn save_document(&self, session: &Session, doc: Document)
        -> Result<Document, StoreError>;

    /// Remove a document and its whole subtree.
    async fn remove_document(
        &self,
        session: &Session,
        doc_ref: &DocumentRef,
    ) -> Result<(), StoreError>;

    /// Re-parent documents under `new_parent` (`None` = top level).
    async fn move_documents(
        &self,
        session: &Session,
        refs: &[DocumentRef],
        new_parent: Option<&DocumentRef>,
    ) -> Result<(), StoreError>;

    /// Whether a document exists (regardless of read permission).
    async fn exists(&self, session: &Session, doc_ref: &DocumentRef) -> Result<bool, StoreError>;

    /// Run a structured query; results are security-filtered for the session.
    async fn query(
        &self,
        session: &Session,
        query: &DocumentQuery,
    ) -> Result<Vec<Document>, StoreError>;

    /// Children of a parent (`None` = top-level documents), security-filtered.
    async fn get_children(
        &self,
        session: &Session,
        parent: Option<&DocumentRef>,
    ) -> Result<Vec<Document>, StoreError>;

    /// Create a proxy document pointing at `target` under `parent`.
    async fn create_proxy(
        &self,
        session: &Session,
        target: &DocumentRef,
        parent: Option<&DocumentRef>,
    ) -> Result<Document, StoreError>;
}
