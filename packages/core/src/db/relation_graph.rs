//! RelationGraph Trait - Triple Store Abstraction
//!
//! The oldest comment representation keeps reply linkage as RDF-style triples
//! `(commentResource, repliesTo, documentResource)` in a graph store. This
//! module defines the minimal contract the comment layer needs from it:
//! statement existence checks, pattern queries and removal.
//!
//! Resources are `(namespace, local_name)` pairs; documents map to resources
//! with the document id as local name.

use crate::db::StoreError;
use crate::models::DocumentRef;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A graph resource identified by namespace and local name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub namespace: String,
    pub local_name: String,
}

impl Resource {
    pub fn new(namespace: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            local_name: local_name.into(),
        }
    }

    /// Resource standing for a document: the document id is the local name.
    pub fn for_document(namespace: &str, doc_ref: &DocumentRef) -> Self {
        Self::new(namespace, doc_ref.id.clone())
    }

    /// Document reference this resource stands for.
    pub fn to_document_ref(&self) -> DocumentRef {
        DocumentRef::new(self.local_name.clone())
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.namespace, self.local_name)
    }
}

/// A single triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statement {
    pub subject: Resource,
    pub predicate: Resource,
    pub object: Resource,
}

impl Statement {
    pub fn new(subject: Resource, predicate: Resource, object: Resource) -> Self {
        Self {
            subject,
            predicate,
            object,
        }
    }
}

/// Abstraction over the relation/triple store
///
/// Pattern arguments are optional: `None` matches any resource in that
/// position, mirroring the usual triple-store wildcard query.
#[async_trait]
pub trait RelationGraph: Send + Sync {
    /// Add a statement. Adding an existing statement is a no-op.
    async fn add(&self, statement: Statement) -> Result<(), StoreError>;

    /// Whether at least one statement matches the pattern.
    async fn has_statement(
        &self,
        subject: Option<&Resource>,
        predicate: Option<&Resource>,
        object: Option<&Resource>,
    ) -> Result<bool, StoreError>;

    /// All statements matching the pattern, in insertion order.
    async fn get_statements(
        &self,
        subject: Option<&Resource>,
        predicate: Option<&Resource>,
        object: Option<&Resource>,
    ) -> Result<Vec<Statement>, StoreError>;

    /// Remove the given statements; unknown statements are ignored.
    async fn remove(&self, statements: &[Statement]) -> Result<(), StoreError>;
}
