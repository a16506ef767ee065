//! Comment Domain Object
//!
//! A `Comment` is the domain-level view of a comment record. Physically every
//! comment is a [`Document`] of the configured comment type whose fields live
//! in the `"comment"` property namespace; external-entity comments additionally
//! carry an `"externalEntity"` namespace.
//!
//! Which backend owns a given comment is never recorded here: representation is
//! structural and inferred by the detector from the stored document and the
//! relation graph.

use crate::models::{Document, DocumentRef};
use crate::services::CommentError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Property namespace holding comment fields on the stored document.
pub const COMMENT_NAMESPACE: &str = "comment";

/// Property namespace holding external-entity linkage fields.
pub const EXTERNAL_ENTITY_NAMESPACE: &str = "externalEntity";

/// Domain-level comment.
///
/// `parent_id` is the document or comment this comment replies to.
/// `ancestor_ids` is the reply chain, nearest first, ending at the commented
/// document. For a top-level comment it is exactly `[parent_id]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub parent_id: String,
    pub author: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    #[serde(default)]
    pub ancestor_ids: Vec<String>,
    /// External entity this comment mirrors, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    /// Origin system of an external comment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

impl Comment {
    /// Create a new comment replying to `parent_id`.
    pub fn new(
        parent_id: impl Into<String>,
        author: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        let parent_id = parent_id.into();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            ancestor_ids: vec![parent_id.clone()],
            parent_id,
            author: author.into(),
            text: text.into(),
            created_at: now,
            modified_at: now,
            entity_id: None,
            origin: None,
        }
    }

    /// Attach external-entity linkage.
    pub fn with_external_entity(
        mut self,
        entity_id: impl Into<String>,
        origin: impl Into<String>,
    ) -> Self {
        self.entity_id = Some(entity_id.into());
        self.origin = Some(origin.into());
        self
    }

    /// Read a comment out of its stored document.
    ///
    /// Relation-backed documents store no parent-link property; for those the
    /// caller supplies the reply target recovered from the graph via
    /// `parent_hint`. Fails with `CommentNotFound` when the document does not
    /// carry a comment namespace at all.
    pub fn from_document(doc: &Document, parent_hint: Option<&str>) -> Result<Self, CommentError> {
        let bag_present = doc
            .properties
            .get(COMMENT_NAMESPACE)
            .map(|bag| bag.is_object())
            .unwrap_or(false);
        if !bag_present {
            return Err(CommentError::comment_not_found(&doc.id));
        }

        let parent_id = doc
            .string_property(COMMENT_NAMESPACE, "parentId")
            .or(parent_hint)
            .unwrap_or_default()
            .to_string();

        let ancestor_ids = doc
            .property(COMMENT_NAMESPACE, "ancestorIds")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_else(|| {
                if parent_id.is_empty() {
                    Vec::new()
                } else {
                    vec![parent_id.clone()]
                }
            });

        Ok(Self {
            id: doc.id.clone(),
            parent_id,
            author: doc
                .string_property(COMMENT_NAMESPACE, "author")
                .unwrap_or_default()
                .to_string(),
            text: doc
                .string_property(COMMENT_NAMESPACE, "text")
                .unwrap_or_default()
                .to_string(),
            created_at: doc.created_at,
            modified_at: doc.modified_at,
            ancestor_ids,
            entity_id: doc
                .string_property(EXTERNAL_ENTITY_NAMESPACE, "entityId")
                .map(String::from),
            origin: doc
                .string_property(EXTERNAL_ENTITY_NAMESPACE, "origin")
                .map(String::from),
        })
    }

    /// Write comment fields onto a stored document.
    ///
    /// When `link_parent` is false the parent-link property is left off the
    /// record entirely (the relation representation keeps reply linkage in the
    /// graph, not on the document).
    pub fn write_properties(&self, doc: &mut Document, link_parent: bool) {
        if link_parent {
            doc.set_property(
                COMMENT_NAMESPACE,
                "parentId",
                serde_json::json!(self.parent_id),
            );
        } else {
            doc.remove_property(COMMENT_NAMESPACE, "parentId");
        }
        doc.set_property(COMMENT_NAMESPACE, "author", serde_json::json!(self.author));
        doc.set_property(COMMENT_NAMESPACE, "text", serde_json::json!(self.text));
        doc.set_property(
            COMMENT_NAMESPACE,
            "ancestorIds",
            serde_json::json!(self.ancestor_ids),
        );
        if let Some(entity_id) = &self.entity_id {
            doc.set_property(
                EXTERNAL_ENTITY_NAMESPACE,
                "entityId",
                serde_json::json!(entity_id),
            );
        }
        if let Some(origin) = &self.origin {
            doc.set_property(
                EXTERNAL_ENTITY_NAMESPACE,
                "origin",
                serde_json::json!(origin),
            );
        }
    }
}

/// One page of a paged comment listing.
///
/// `total` is the size of the full (unpaged) result, not of this page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentPage {
    pub comments: Vec<Comment>,
    pub total: usize,
}

/// Root of a comment thread: either the commented document itself (for a
/// top-level comment) or the top-most comment of the reply chain.
#[derive(Debug, Clone)]
pub enum ThreadRoot {
    Document(Document),
    Comment(Comment),
}

impl ThreadRoot {
    pub fn id(&self) -> &str {
        match self {
            ThreadRoot::Document(doc) => &doc.id,
            ThreadRoot::Comment(comment) => &comment.id,
        }
    }

    pub fn doc_ref(&self) -> DocumentRef {
        DocumentRef::new(self.id().to_string())
    }
}
