//! Representation Detector
//!
//! Stored comments carry no version tag; which backend owns a comment is
//! inferred purely from the shape of the stored data. The detector is the one
//! place that classification lives - the bridge and the migrator both dispatch
//! on its verdict instead of re-deriving shape heuristics locally.
//!
//! # Decision Order
//!
//! First match wins, deterministically and without side effects:
//!
//! 1. Parent-link property set AND the immediate container is a hidden comment
//!    container -> `Property`
//! 2. Reply triple in the graph (with the given document, or any outbound
//!    reply triple when the document is not supplied) -> `Relation`
//! 3. Otherwise -> `Secured`
//!
//! The container check in rule 1 is mandatory: tree-backed comments may carry
//! the parent-link property too (written for backward compatibility), so the
//! property alone identifies nothing.

use crate::db::{DocumentStore, RelationGraph, Session, StoreError};
use crate::models::{Document, DocumentRef, COMMENT_NAMESPACE};
use crate::services::{CommentError, CommentStorageConfig};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The physical layout a stored comment belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Representation {
    Relation,
    Property,
    Secured,
}

impl std::fmt::Display for Representation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Representation::Relation => "RELATION",
            Representation::Property => "PROPERTY",
            Representation::Secured => "SECURED",
        };
        f.write_str(name)
    }
}

/// Structural classifier for stored comment documents.
pub struct RepresentationDetector {
    store: Arc<dyn DocumentStore>,
    graph: Arc<dyn RelationGraph>,
    config: CommentStorageConfig,
}

impl RepresentationDetector {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        graph: Arc<dyn RelationGraph>,
        config: CommentStorageConfig,
    ) -> Self {
        Self {
            store,
            graph,
            config,
        }
    }

    /// Classify a stored comment document.
    ///
    /// `commented_doc` narrows the relation check to the triple against that
    /// document; without it any outbound reply triple counts.
    ///
    /// Fails with `AmbiguousRepresentation` when the parent-link property is
    /// set but the immediate container cannot be resolved (orphaned record):
    /// such a record cannot be told apart from a half-deleted one.
    pub async fn detect(
        &self,
        comment_doc: &Document,
        commented_doc: Option<&Document>,
    ) -> Result<Representation, CommentError> {
        if comment_doc.property(COMMENT_NAMESPACE, "parentId").is_some() {
            match &comment_doc.parent_id {
                Some(parent_id) => {
                    // Container resolution is part of classification, not an
                    // access decision, so it runs as admin.
                    match self
                        .store
                        .get_document(&Session::admin(), &DocumentRef::new(parent_id.clone()))
                        .await
                    {
                        Ok(container)
                            if container.doc_type == self.config.hidden_container_type =>
                        {
                            return Ok(Representation::Property);
                        }
                        Ok(_) => {}
                        Err(StoreError::DocumentNotFound { .. }) => {
                            return Err(CommentError::ambiguous(
                                &comment_doc.id,
                                format!("container {} cannot be resolved", parent_id),
                            ));
                        }
                        Err(err) => return Err(err.into()),
                    }
                }
                None => {
                    return Err(CommentError::ambiguous(
                        &comment_doc.id,
                        "parent-link property set but the record has no container",
                    ));
                }
            }
        }

        let subject = self
            .config
            .document_resource(&DocumentRef::new(comment_doc.id.clone()));
        let predicate = self.config.replies_to_predicate();
        let object = commented_doc.map(|doc| self.config.document_resource(&doc.doc_ref()));
        if self
            .graph
            .has_statement(Some(&subject), Some(&predicate), object.as_ref())
            .await?
        {
            return Ok(Representation::Relation);
        }

        Ok(Representation::Secured)
    }
}
