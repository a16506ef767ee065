//! Backend Strategy Implementations
//!
//! The three physical comment layouts behind the [`crate::services::CommentBackend`]
//! contract:
//!
//! - [`RelationBackend`] - comment documents in a top-level hidden holding
//!   container, reply linkage as graph triples (oldest layout)
//! - [`PropertyBackend`] - comment documents in hidden unsecured containers
//!   under the commented document's root ancestor, reply linkage as a
//!   parent-link property
//! - [`TreeBackend`] - comments as ordinary secured children of the commented
//!   document or the reply target (current layout)
//!
//! This module also hosts the hierarchy helpers the backends and the migrator
//! share: loading comment documents, paging, root-ancestor resolution,
//! container management, and thread walking.

mod property;
mod relation;
mod tree;

pub use property::PropertyBackend;
pub use relation::RelationBackend;
pub use tree::TreeBackend;

use crate::db::{DocumentStore, Session, StoreError};
use crate::models::{Comment, CommentPage, Document, DocumentRef, ThreadRoot};
use crate::services::{CommentError, CommentStorageConfig};

/// Hop limit for parent-chain walks; a chain longer than this is treated as
/// corrupt rather than looped over forever.
const MAX_ANCESTOR_DEPTH: usize = 256;

/// Load a document and require it to be a comment record.
pub(crate) async fn load_comment_document(
    store: &dyn DocumentStore,
    session: &Session,
    config: &CommentStorageConfig,
    id: &str,
) -> Result<Document, CommentError> {
    match store.get_document(session, &DocumentRef::new(id)).await {
        Ok(doc) if doc.doc_type == config.comment_type => Ok(doc),
        Ok(_) => Err(CommentError::comment_not_found(id)),
        Err(StoreError::DocumentNotFound { .. }) => Err(CommentError::comment_not_found(id)),
        Err(err) => Err(err.into()),
    }
}

/// Sort comments by creation time and cut one page out.
///
/// `total` reports the size of the full result. A `page_size` of zero yields
/// an empty page (with the total still filled in).
pub(crate) fn page_comments(
    mut comments: Vec<Comment>,
    page_size: usize,
    page_index: usize,
    sort_ascending: bool,
) -> CommentPage {
    comments.sort_by(|a, b| {
        let ord = a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id));
        if sort_ascending {
            ord
        } else {
            ord.reverse()
        }
    });
    let total = comments.len();
    let start = page_index.saturating_mul(page_size).min(total);
    let end = start.saturating_add(page_size).min(total);
    CommentPage {
        comments: comments[start..end].to_vec(),
        total,
    }
}

/// Walk up the hierarchy to the top-level ancestor of a document.
pub(crate) async fn root_ancestor(
    store: &dyn DocumentStore,
    session: &Session,
    doc: &Document,
) -> Result<Document, CommentError> {
    let mut current = doc.clone();
    for _ in 0..MAX_ANCESTOR_DEPTH {
        let Some(parent_id) = current.parent_id.clone() else {
            return Ok(current);
        };
        current = store
            .get_document(session, &DocumentRef::new(parent_id))
            .await?;
    }
    Err(CommentError::ambiguous(
        &doc.id,
        "ancestor chain exceeds maximum depth",
    ))
}

/// Find the hidden comment container under `parent`, creating it on demand.
///
/// Containers are infrastructure, so management runs as admin regardless of
/// the calling session.
pub(crate) async fn find_or_create_container(
    store: &dyn DocumentStore,
    config: &CommentStorageConfig,
    parent: Option<&DocumentRef>,
) -> Result<Document, CommentError> {
    let admin = Session::admin();
    let children = store.get_children(&admin, parent).await?;
    if let Some(existing) = children
        .into_iter()
        .find(|d| d.doc_type == config.hidden_container_type && d.name == config.container_name)
    {
        return Ok(existing);
    }
    let container = Document::new(
        config.container_name.clone(),
        config.hidden_container_type.clone(),
        parent.map(|p| p.id.clone()),
    );
    Ok(store.create_document(&admin, container).await?)
}

/// Reply ancestor chain for a comment attached to `target`: the target first,
/// then the target's own chain when the target is itself a comment.
pub(crate) fn compute_ancestor_ids(config: &CommentStorageConfig, target: &Document) -> Vec<String> {
    let mut ids = vec![target.id.clone()];
    if target.doc_type == config.comment_type {
        if let Some(ancestors) = target
            .property(crate::models::COMMENT_NAMESPACE, "ancestorIds")
            .and_then(|v| v.as_array())
        {
            ids.extend(ancestors.iter().filter_map(|v| v.as_str().map(String::from)));
        }
    }
    ids
}

/// Resolve the root of the thread a comment belongs to.
///
/// The reply target of a top-level comment is the commented document; for a
/// reply the walk climbs the comment chain to its top-most comment.
pub(crate) async fn resolve_thread_root(
    store: &dyn DocumentStore,
    session: &Session,
    config: &CommentStorageConfig,
    comment: &Comment,
) -> Result<ThreadRoot, CommentError> {
    let parent = store
        .get_document(session, &DocumentRef::new(comment.parent_id.clone()))
        .await?;
    if parent.doc_type != config.comment_type {
        return Ok(ThreadRoot::Document(parent));
    }
    let mut current = parent;
    for _ in 0..MAX_ANCESTOR_DEPTH {
        let current_comment = Comment::from_document(&current, None)?;
        if current_comment.parent_id.is_empty() {
            return Ok(ThreadRoot::Comment(current_comment));
        }
        let parent = store
            .get_document(
                session,
                &DocumentRef::new(current_comment.parent_id.clone()),
            )
            .await?;
        if parent.doc_type != config.comment_type {
            return Ok(ThreadRoot::Comment(current_comment));
        }
        current = parent;
    }
    Err(CommentError::ambiguous(
        &comment.id,
        "reply chain exceeds maximum depth",
    ))
}

/// Resolve the non-comment document a comment's thread ultimately hangs on.
pub(crate) async fn resolve_ancestor_ref(
    store: &dyn DocumentStore,
    session: &Session,
    config: &CommentStorageConfig,
    comment: &Comment,
) -> Result<DocumentRef, CommentError> {
    let mut parent_id = comment.parent_id.clone();
    for _ in 0..MAX_ANCESTOR_DEPTH {
        let parent = store
            .get_document(session, &DocumentRef::new(parent_id))
            .await?;
        if parent.doc_type != config.comment_type {
            return Ok(parent.doc_ref());
        }
        let parent_comment = Comment::from_document(&parent, None)?;
        if parent_comment.parent_id.is_empty() {
            return Err(CommentError::ambiguous(
                &comment.id,
                "reply chain ends at a comment without a target",
            ));
        }
        parent_id = parent_comment.parent_id;
    }
    Err(CommentError::ambiguous(
        &comment.id,
        "reply chain exceeds maximum depth",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn comment_at(id: &str, offset_secs: i64) -> Comment {
        let mut c = Comment::new("doc-1", "alice", format!("comment {}", id));
        c.id = id.to_string();
        c.created_at = Utc::now() + Duration::seconds(offset_secs);
        c
    }

    #[test]
    fn test_page_comments_ascending() {
        let comments = vec![comment_at("b", 1), comment_at("c", 2), comment_at("a", 0)];
        let page = page_comments(comments, 2, 0, true);
        assert_eq!(page.total, 3);
        assert_eq!(page.comments.len(), 2);
        assert_eq!(page.comments[0].id, "a");
        assert_eq!(page.comments[1].id, "b");
    }

    #[test]
    fn test_page_comments_descending_last_page() {
        let comments = vec![comment_at("a", 0), comment_at("b", 1), comment_at("c", 2)];
        let page = page_comments(comments, 2, 1, false);
        assert_eq!(page.total, 3);
        assert_eq!(page.comments.len(), 1);
        assert_eq!(page.comments[0].id, "a");
    }

    #[test]
    fn test_page_comments_out_of_range() {
        let page = page_comments(vec![comment_at("a", 0)], 10, 5, true);
        assert_eq!(page.total, 1);
        assert!(page.comments.is_empty());
    }
}
