//! Tree Backend (current layout)
//!
//! Comments are ordinary hierarchical children of the commented document (a
//! reply is a child of the comment it replies to). No local ACL is written, so
//! standard inheritance secures comments exactly like any other child record.
//! Listing walks the subtree.
//!
//! This backend also owns external-entity comments: records mirroring an
//! entity in another system, addressed by `externalEntity.entityId`.

use crate::db::{DocumentQuery, DocumentStore, Session, StoreError};
use crate::models::{
    Comment, CommentPage, Document, DocumentRef, ThreadRoot, EXTERNAL_ENTITY_NAMESPACE,
};
use crate::services::backend::{Capability, CommentBackend};
use crate::services::backends::{
    compute_ancestor_ids, load_comment_document, page_comments, resolve_ancestor_ref,
    resolve_thread_root,
};
use crate::services::{CommentError, CommentStorageConfig};
use async_trait::async_trait;
use std::sync::Arc;

pub struct TreeBackend {
    store: Arc<dyn DocumentStore>,
    config: CommentStorageConfig,
}

impl TreeBackend {
    pub fn new(store: Arc<dyn DocumentStore>, config: CommentStorageConfig) -> Self {
        Self { store, config }
    }

    /// Whether a comment document is tree-backed: it is an ordinary child of
    /// a non-hidden parent. Hidden-container placement belongs to the other
    /// two layouts.
    async fn is_owned(&self, doc: &Document) -> Result<bool, CommentError> {
        let Some(parent_id) = &doc.parent_id else {
            return Ok(false);
        };
        match self
            .store
            .get_document(&Session::admin(), &DocumentRef::new(parent_id.clone()))
            .await
        {
            Ok(parent) => Ok(parent.doc_type != self.config.hidden_container_type),
            Err(StoreError::DocumentNotFound { .. }) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    async fn load_owned(&self, session: &Session, id: &str) -> Result<Document, CommentError> {
        let doc = load_comment_document(self.store.as_ref(), session, &self.config, id).await?;
        if self.is_owned(&doc).await? {
            Ok(doc)
        } else {
            Err(CommentError::comment_not_found(id))
        }
    }

    /// Collect the comment subtree under `parent_ref`, replies included.
    async fn collect_comments(
        &self,
        session: &Session,
        parent_ref: &DocumentRef,
    ) -> Result<Vec<Comment>, CommentError> {
        let mut comments = Vec::new();
        let mut frontier = vec![parent_ref.clone()];
        while let Some(current) = frontier.pop() {
            let children = self.store.get_children(session, Some(&current)).await?;
            for child in children {
                if child.doc_type == self.config.comment_type {
                    frontier.push(child.doc_ref());
                    comments.push(Comment::from_document(&child, None)?);
                }
            }
        }
        Ok(comments)
    }

    /// Find the stored document of an external comment by entity id.
    async fn find_external(
        &self,
        session: &Session,
        entity_id: &str,
    ) -> Result<Document, CommentError> {
        let query = DocumentQuery::new()
            .with_doc_type(self.config.comment_type.clone())
            .with_property_equals(
                EXTERNAL_ENTITY_NAMESPACE,
                "entityId",
                serde_json::json!(entity_id),
            );
        for doc in self.store.query(session, &query).await? {
            if self.is_owned(&doc).await? {
                return Ok(doc);
            }
        }
        Err(CommentError::comment_not_found(entity_id))
    }
}

#[async_trait]
impl CommentBackend for TreeBackend {
    async fn create_comment(
        &self,
        session: &Session,
        target: &DocumentRef,
        comment: Comment,
    ) -> Result<Comment, CommentError> {
        let target_doc = self.store.get_document(session, target).await?;

        let mut comment = comment;
        comment.parent_id = target_doc.id.clone();
        comment.ancestor_ids = compute_ancestor_ids(&self.config, &target_doc);

        let mut doc = Document::new(
            comment.id.clone(),
            self.config.comment_type.clone(),
            Some(target_doc.id.clone()),
        );
        doc.id = comment.id.clone();
        doc.created_at = comment.created_at;
        // acl stays None: the comment inherits the target's security
        comment.write_properties(&mut doc, true);
        doc.modified_at = comment.modified_at;
        self.store.create_document(session, doc).await?;

        Ok(comment)
    }

    async fn get_comment(&self, session: &Session, id: &str) -> Result<Comment, CommentError> {
        let doc = self.load_owned(session, id).await?;
        Comment::from_document(&doc, None)
    }

    async fn update_comment(
        &self,
        session: &Session,
        id: &str,
        comment: Comment,
    ) -> Result<Comment, CommentError> {
        let mut doc = self.load_owned(session, id).await?;
        let existing = Comment::from_document(&doc, None)?;
        let mut comment = comment;
        comment.id = id.to_string();
        comment.parent_id = existing.parent_id;
        comment.ancestor_ids = existing.ancestor_ids;
        comment.write_properties(&mut doc, true);
        let saved = self.store.save_document(session, doc).await?;
        Comment::from_document(&saved, None)
    }

    async fn delete_comment(&self, session: &Session, id: &str) -> Result<(), CommentError> {
        let doc = self.load_owned(session, id).await?;
        // Cascade removes the reply subtree with it
        self.store.remove_document(session, &doc.doc_ref()).await?;
        Ok(())
    }

    async fn get_comments(
        &self,
        session: &Session,
        document_id: &str,
    ) -> Result<Vec<Comment>, CommentError> {
        self.collect_comments(session, &DocumentRef::new(document_id))
            .await
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
        session: &Session,
        comment_id: &str,
    ) -> Result<Vec<DocumentRef>, CommentError> {
        let comment = self.get_comment(session, comment_id).await?;
        Ok(vec![
            resolve_ancestor_ref(self.store.as_ref(), session, &self.config, &comment).await?,
        ])
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

    async fn get_external_comment(
        &self,
        session: &Session,
        entity_id: &str,
    ) -> Result<Comment, CommentError> {
        let doc = self.find_external(session, entity_id).await?;
        Comment::from_document(&doc, None)
    }

    async fn update_external_comment(
        &self,
        session: &Session,
        entity_id: &str,
        comment: Comment,
    ) -> Result<Comment, CommentError> {
        let doc = self.find_external(session, entity_id).await?;
        self.update_comment(session, &doc.id, comment).await
    }

    async fn delete_external_comment(
        &self,
        session: &Session,
        entity_id: &str,
    ) -> Result<(), CommentError> {
        let doc = self.find_external(session, entity_id).await?;
        self.delete_comment(session, &doc.id).await
    }

    fn has_capability(&self, capability: Capability) -> bool {
        match capability {
            Capability::CommentsLinkedWithProperty => true,
            Capability::ExternalComments => true,
        }
    }
}
