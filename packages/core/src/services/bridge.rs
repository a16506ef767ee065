//! Bridge Comment Router
//!
//! During a migration window the store legitimately contains comments in all
//! three representations at once. The bridge keeps the comment API correct
//! over that mixed state:
//!
//! - reads fan out to all three backends and return the de-duplicated union
//!   (identity by comment id, ordering unspecified)
//! - operations targeting an existing comment classify it through the
//!   detector and dispatch to exactly one backend
//! - operations creating data always go to the tree backend, so nothing new
//!   is ever written in a deprecated representation
//!
//! The fan-out is deliberate and must not be optimized away by assuming a
//! single populated backend.

use crate::db::{DocumentStore, RelationGraph, Session, StoreError};
use crate::models::{Comment, CommentPage, Document, DocumentRef, ThreadRoot};
use crate::services::backend::{Capability, CommentBackend};
use crate::services::{
    CommentError, CommentStorageConfig, PropertyBackend, RelationBackend, Representation,
    RepresentationDetector, TreeBackend,
};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;

pub struct BridgeCommentService {
    relation: RelationBackend,
    property: PropertyBackend,
    tree: TreeBackend,
    detector: RepresentationDetector,
    store: Arc<dyn DocumentStore>,
    config: CommentStorageConfig,
}

impl BridgeCommentService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        graph: Arc<dyn RelationGraph>,
        config: CommentStorageConfig,
    ) -> Self {
        Self {
            relation: RelationBackend::new(store.clone(), graph.clone(), config.clone()),
            property: PropertyBackend::new(store.clone(), config.clone()),
            tree: TreeBackend::new(store.clone(), config.clone()),
            detector: RepresentationDetector::new(store.clone(), graph, config.clone()),
            store,
            config,
        }
    }

    fn backends(&self) -> [&dyn CommentBackend; 3] {
        [&self.relation, &self.property, &self.tree]
    }

    /// Load the stored document of an existing comment, or `CommentNotFound`.
    async fn load_comment_document(
        &self,
        session: &Session,
        id: &str,
    ) -> Result<Document, CommentError> {
        match self
            .store
            .get_document(session, &DocumentRef::new(id))
            .await
        {
            Ok(doc) if doc.doc_type == self.config.comment_type => Ok(doc),
            Ok(_) => Err(CommentError::comment_not_found(id)),
            Err(StoreError::DocumentNotFound { .. }) => Err(CommentError::comment_not_found(id)),
            Err(err) => Err(err.into()),
        }
    }

    /// Classify an existing comment and hand back the owning backend.
    async fn owning_backend(
        &self,
        session: &Session,
        id: &str,
    ) -> Result<(Representation, &dyn CommentBackend), CommentError> {
        let doc = self.load_comment_document(session, id).await?;
        let representation = self.detector.detect(&doc, None).await?;
        let backend: &dyn CommentBackend = match representation {
            Representation::Relation => &self.relation,
            Representation::Property => &self.property,
            Representation::Secured => &self.tree,
        };
        Ok((representation, backend))
    }

    fn dedup_comments(comments: Vec<Comment>) -> Vec<Comment> {
        let mut seen = HashSet::new();
        comments
            .into_iter()
            .filter(|c| seen.insert(c.id.clone()))
            .collect()
    }
}

#[async_trait]
impl CommentBackend for BridgeCommentService {
    async fn create_comment(
        &self,
        session: &Session,
        target: &DocumentRef,
        comment: Comment,
    ) -> Result<Comment, CommentError> {
        // New data never lands in a deprecated representation
        self.tree.create_comment(session, target, comment).await
    }

    async fn get_comment(&self, session: &Session, id: &str) -> Result<Comment, CommentError> {
        for backend in self.backends() {
            match backend.get_comment(session, id).await {
                Ok(comment) => return Ok(comment),
                Err(CommentError::CommentNotFound { .. }) => continue,
                Err(err) => return Err(err),
            }
        }
        Err(CommentError::comment_not_found(id))
    }

    async fn update_comment(
        &self,
        session: &Session,
        id: &str,
        comment: Comment,
    ) -> Result<Comment, CommentError> {
        let (_, backend) = self.owning_backend(session, id).await?;
        backend.update_comment(session, id, comment).await
    }

    async fn delete_comment(&self, session: &Session, id: &str) -> Result<(), CommentError> {
        let (representation, backend) = self.owning_backend(session, id).await?;
        if representation == Representation::Relation {
            // No consistent removal protocol exists for relation comments via
            // the bridge (store record plus graph triple); refuse instead of
            // leaving half-deleted state behind.
            return Err(CommentError::unsupported(
                "deleting a relation-represented comment through the bridge",
            ));
        }
        backend.delete_comment(session, id).await
    }

    async fn get_comments(
        &self,
        session: &Session,
        document_id: &str,
    ) -> Result<Vec<Comment>, CommentError> {
        let mut merged = Vec::new();
        for backend in self.backends() {
            merged.extend(backend.get_comments(session, document_id).await?);
        }
        Ok(Self::dedup_comments(merged))
    }

    async fn get_comments_paged(
        &self,
        session: &Session,
        document_id: &str,
        page_size: usize,
        page_index: usize,
        sort_ascending: bool,
    ) -> Result<CommentPage, CommentError> {
        let mut merged = Vec::new();
        for backend in self.backends() {
            let page = backend
                .get_comments_paged(session, document_id, page_size, page_index, sort_ascending)
                .await?;
            merged.extend(page.comments);
        }
        let comments = Self::dedup_comments(merged);
        let total = comments.len();
        Ok(CommentPage { comments, total })
    }

    async fn get_documents_for_comment(
        &self,
        session: &Session,
        comment_id: &str,
    ) -> Result<Vec<DocumentRef>, CommentError> {
        let mut merged = Vec::new();
        for backend in self.backends() {
            match backend.get_documents_for_comment(session, comment_id).await {
                Ok(refs) => merged.extend(refs),
                Err(CommentError::CommentNotFound { .. }) => continue,
                Err(err) => return Err(err),
            }
        }
        let mut seen = HashSet::new();
        Ok(merged
            .into_iter()
            .filter(|r| seen.insert(r.id.clone()))
            .collect())
    }

    async fn get_thread_root(
        &self,
        session: &Session,
        comment_id: &str,
    ) -> Result<ThreadRoot, CommentError> {
        let (_, backend) = self.owning_backend(session, comment_id).await?;
        backend.get_thread_root(session, comment_id).await
    }

    async fn get_ancestor_ref(
        &self,
        session: &Session,
        comment_id: &str,
    ) -> Result<DocumentRef, CommentError> {
        let (_, backend) = self.owning_backend(session, comment_id).await?;
        backend.get_ancestor_ref(session, comment_id).await
    }

    async fn get_external_comment(
        &self,
        session: &Session,
        entity_id: &str,
    ) -> Result<Comment, CommentError> {
        self.tree.get_external_comment(session, entity_id).await
    }

    async fn update_external_comment(
        &self,
        session: &Session,
        entity_id: &str,
        comment: Comment,
    ) -> Result<Comment, CommentError> {
        self.tree
            .update_external_comment(session, entity_id, comment)
            .await
    }

    async fn delete_external_comment(
        &self,
        session: &Session,
        entity_id: &str,
    ) -> Result<(), CommentError> {
        self.tree.delete_external_comment(session, entity_id).await
    }

    fn has_capability(&self, capability: Capability) -> bool {
        match capability {
            // The bridge fronts mixed content; the property link cannot be
            // relied on across it
            Capability::CommentsLinkedWithProperty => false,
            Capability::ExternalComments => self.tree.has_capability(capability),
        }
    }
}
