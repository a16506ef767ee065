//! Relation Backend (oldest layout)
//!
//! Comments are ordinary documents parked in one top-level hidden holding
//! container; the link to the commented document is a graph triple
//! `(comment, repliesTo, document)`. The comment record itself carries no
//! parent-link property, which is exactly what the detector keys on.
//!
//! Listing requires a graph query by object followed by resolving each subject
//! back to its document; subjects whose document is gone or unreadable are
//! logged and skipped.

use crate::db::{DocumentStore, RelationGraph, Session, Statement, StoreError};
use crate::models::{Comment, CommentPage, Document, DocumentRef, ThreadRoot};
use crate::services::backend::{Capability, CommentBackend};
use crate::services::backends::{
    find_or_create_container, load_comment_document, page_comments, resolve_ancestor_ref,
    resolve_thread_root,
};
use crate::services::{CommentError, CommentStorageConfig};
use async_trait::async_trait;
use std::sync::Arc;

pub struct RelationBackend {
    store: Arc<dyn DocumentStore>,
    graph: Arc<dyn RelationGraph>,
    config: CommentStorageConfig,
}

impl RelationBackend {
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

    /// The reply statement of a comment, or `CommentNotFound` when the comment
    /// is not relation-backed.
    async fn reply_statement(&self, comment_id: &str) -> Result<Statement, CommentError> {
        let subject = self
            .config
            .document_resource(&DocumentRef::new(comment_id));
        let predicate = self.config.replies_to_predicate();
        self.graph
            .get_statements(Some(&subject), Some(&predicate), None)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| CommentError::comment_not_found(comment_id))
    }

    async fn load_owned(
        &self,
        session: &Session,
        id: &str,
    ) -> Result<(Document, Statement), CommentError> {
        let doc = load_comment_document(self.store.as_ref(), session, &self.config, id).await?;
        let statement = self.reply_statement(id).await?;
        Ok((doc, statement))
    }
}

#[async_trait]
impl CommentBackend for RelationBackend {
    async fn create_comment(
        &self,
        session: &Session,
        target: &DocumentRef,
        comment: Comment,
    ) -> Result<Comment, CommentError> {
        // Readability of the target is the only gate; the holding container
        // is open infrastructure.
        let target_doc = self.store.get_document(session, target).await?;

        let container = find_or_create_container(self.store.as_ref(), &self.config, None).await?;

        let mut comment = comment;
        comment.parent_id = target_doc.id.clone();
        comment.ancestor_ids = vec![target_doc.id.clone()];

        let mut doc = Document::new(
            comment.id.clone(),
            self.config.comment_type.clone(),
            Some(container.id.clone()),
        );
        doc.id = comment.id.clone();
        doc.created_at = comment.created_at;
        comment.write_properties(&mut doc, false);
        doc.modified_at = comment.modified_at;
        self.store.create_document(session, doc).await?;

        self.graph
            .add(Statement::new(
                self.config
                    .document_resource(&DocumentRef::new(comment.id.clone())),
                self.config.replies_to_predicate(),
                self.config.document_resource(target),
            ))
            .await?;

        Ok(comment)
    }

    async fn get_comment(&self, session: &Session, id: &str) -> Result<Comment, CommentError> {
        let (doc, statement) = self.load_owned(session, id).await?;
        Comment::from_document(&doc, Some(&statement.object.local_name))
    }

    async fn update_comment(
        &self,
        session: &Session,
        id: &str,
        comment: Comment,
    ) -> Result<Comment, CommentError> {
        let (mut doc, statement) = self.load_owned(session, id).await?;
        let mut comment = comment;
        comment.id = id.to_string();
        comment.parent_id = statement.object.local_name.clone();
        comment.ancestor_ids = vec![comment.parent_id.clone()];
        comment.write_properties(&mut doc, false);
        let saved = self.store.save_document(session, doc).await?;
        Comment::from_document(&saved, Some(&statement.object.local_name))
    }

    async fn delete_comment(&self, session: &Session, id: &str) -> Result<(), CommentError> {
        let (doc, _) = self.load_owned(session, id).await?;
        let subject = self.config.document_resource(&DocumentRef::new(id));
        let statements = self
            .graph
            .get_statements(Some(&subject), Some(&self.config.replies_to_predicate()), None)
            .await?;
        self.store.remove_document(session, &doc.doc_ref()).await?;
        self.graph.remove(&statements).await?;
        Ok(())
    }

    async fn get_comments(
        &self,
        session: &Session,
        document_id: &str,
    ) -> Result<Vec<Comment>, CommentError> {
        let object = self
            .config
            .document_resource(&DocumentRef::new(document_id));
        let statements = self
            .graph
            .get_statements(None, Some(&self.config.replies_to_predicate()), Some(&object))
            .await?;

        let mut comments = Vec::with_capacity(statements.len());
        for statement in statements {
            let comment_ref = statement.subject.to_document_ref();
            match self.store.get_document(session, &comment_ref).await {
                Ok(doc) => comments.push(Comment::from_document(&doc, Some(document_id))?),
                Err(StoreError::DocumentNotFound { .. })
                | Err(StoreError::PermissionDenied { .. }) => {
                    tracing::debug!(
                        "Skipping unresolvable relation comment {} on {}",
                        comment_ref.id,
                        document_id
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(comments)
    }

    async fn get_comments_paged(
        &self,
        session: &Session,
        document_id: &str,
        page_size: usize,
        page_index: usize,
        sort_ascending: bool,
    ) -> Result<CommentPage, CommentError> {
        let comments = self.get_comments(session, document_id).await?;
        Ok(page_comments(comments, page_size, page_index, sort_ascending))
    }

    async fn get_documents_for_comment(
        &self,
        _session: &Session,
        comment_id: &str,
    ) -> Result<Vec<DocumentRef>, CommentError> {
        let subject = self
            .config
            .document_resource(&DocumentRef::new(comment_id));
        let statements = self
            .graph
            .get_statements(Some(&subject), Some(&self.config.replies_to_predicate()), None)
            .await?;
        Ok(statements
            .into_iter()
            .map(|s| s.object.to_document_ref())
            .collect())
    }

    async fn get_thread_root(
        &self,
        session: &Session,
        comment_id: &str,
    ) -> Result<ThreadRoot, CommentError> {
        let comment = self.get_comment(session, comment_id).await?;
        resolve_thread_root(self.store.as_ref(), session, &self.config, &comment).await
    }

    async fn get_ancestor_ref(
        &self,
        session: &Session,
        comment_id: &str,
    ) -> Result<DocumentRef, CommentError> {
        let comment = self.get_comment(session, comment_id).await?;
        resolve_ancestor_ref(self.store.as_ref(), session, &self.config, &comment).await
    }

    fn has_capability(&self, capability: Capability) -> bool {
        match capability {
            Capability::CommentsLinkedWithProperty => false,
            Capability::ExternalComments => false,
        }
    }
}
