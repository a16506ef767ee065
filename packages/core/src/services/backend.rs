//! CommentBackend Trait - The Uniform Storage Contract
//!
//! One contract, four implementations: the three physical layouts
//! ([`crate::services::RelationBackend`], [`crate::services::PropertyBackend`],
//! [`crate::services::TreeBackend`]) and the routing bridge
//! ([`crate::services::BridgeCommentService`]) that composes them.
//!
//! Every operation takes a [`Session`]; permission enforcement stays in the
//! document store and surfaces here as `CommentError::PermissionDenied`.

use crate::db::Session;
use crate::models::{Comment, CommentPage, DocumentRef, ThreadRoot};
use crate::services::CommentError;
use async_trait::async_trait;

/// Optional abilities a backend may or may not have.
///
/// Callers probe capabilities instead of downcasting to a concrete backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Comments carry their reply target as a parent-link property on the
    /// record itself (false for the relation layout and for the bridge,
    /// whose contents are mixed).
    CommentsLinkedWithProperty,

    /// Comments mirroring external entities can be addressed by entity id.
    ExternalComments,
}

/// Uniform contract over one comment storage layout
///
/// A backend only ever answers for comments stored in its own layout:
/// `get_comment` on a comment owned by a different layout fails with
/// `CommentNotFound`, which is what lets the bridge probe backends in turn.
#[async_trait]
pub trait CommentBackend: Send + Sync {
    /// Store a new comment replying to `target`.
    async fn create_comment(
        &self,
        session: &Session,
        target: &DocumentRef,
        comment: Comment,
    ) -> Result<Comment, CommentError>;

    /// Load a comment owned by this backend.
    async fn get_comment(&self, session: &Session, id: &str) -> Result<Comment, CommentError>;

    /// Rewrite the author/text of an existing comment.
    async fn update_comment(
        &self,
        session: &Session,
        id: &str,
        comment: Comment,
    ) -> Result<Comment, CommentError>;

    /// Remove a comment (and, in tree layout, its replies).
    async fn delete_comment(&self, session: &Session, id: &str) -> Result<(), CommentError>;

    /// All comments on a document, unordered.
    async fn get_comments(
        &self,
        session: &Session,
        document_id: &str,
    ) -> Result<Vec<Comment>, CommentError>;

    /// One page of the comments on a document, sorted by creation time.
    async fn get_comments_paged(
        &self,
        session: &Session,
        document_id: &str,
        page_size: usize,
        page_index: usize,
        sort_ascending: bool,
    ) -> Result<CommentPage, CommentError>;

    /// The documents a comment is attached to. Usually one; proxies make it
    /// possible for the same underlying content to be commented through
    /// several records.
    async fn get_documents_for_comment(
        &self,
        session: &Session,
        comment_id: &str,
    ) -> Result<Vec<DocumentRef>, CommentError>;

    /// Root of the thread a comment belongs to: the commented document for a
    /// top-level comment, the top-most comment of the reply chain otherwise.
    async fn get_thread_root(
        &self,
        session: &Session,
        comment_id: &str,
    ) -> Result<ThreadRoot, CommentError>;

    /// The non-comment document the comment's thread ultimately hangs on.
    async fn get_ancestor_ref(
        &self,
        session: &Session,
        comment_id: &str,
    ) -> Result<DocumentRef, CommentError>;

    /// Look up the comment mirroring an external entity.
    async fn get_external_comment(
        &self,
        _session: &Session,
        _entity_id: &str,
    ) -> Result<Comment, CommentError> {
        Err(CommentError::unsupported(
            "external comments are not supported by this backend",
        ))
    }

    /// Rewrite the comment mirroring an external entity.
    async fn update_external_comment(
        &self,
        _session: &Session,
        _entity_id: &str,
        _comment: Comment,
    ) -> Result<Comment, CommentError> {
        Err(CommentError::unsupported(
            "external comments are not supported by this backend",
        ))
    }

    /// Remove the comment mirroring an external entity.
    async fn delete_external_comment(
        &self,
        _session: &Session,
        _entity_id: &str,
    ) -> Result<(), CommentError> {
        Err(CommentError::unsupported(
            "external comments are not supported by this backend",
        ))
    }

    /// Whether this backend has the given capability.
    fn has_capability(&self, capability: Capability) -> bool;
}
