//! Property Backend (intermediate layout)
//!
//! Comments are ordinary documents under a hidden, unsecured `Comments`
//! container created on demand beneath the *root ancestor* of the commented
//! document, and carry their reply target as the `comment.parentId` property.
//! Listing is a plain store query by that property.
//!
//! Ownership is property AND placement: tree comments may also carry the
//! parent-link property for backward compatibility, so every candidate is
//! additionally checked to live in a hidden container.

use crate::db::{DocumentQuery, DocumentStore, Session, StoreError};
use crate::models::{Comment, CommentPage, Document, DocumentRef, ThreadRoot, COMMENT_NAMESPACE};
use crate::services::backend::{Capability, CommentBackend};
use crate::services::backends::{
    compute_ancestor_ids, find_or_create_container, load_comment_document, page_comments,
    resolve_ancestor_ref, resolve_thread_root, root_ancestor,
};
use crate::services::{CommentError, CommentStorageConfig};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

pub struct PropertyBackend {
    store: Arc<dyn DocumentStore>,
    config: CommentStorageConfig,
}

impl PropertyBackend {
    pub fn new(store: Arc<dyn DocumentStore>, config: CommentStorageConfig) -> Self {
        Self { store, config }
    }

    /// Whether a comment document is property-backed: parent-link property set
    /// and the immediate container is a hidden comment container.
    async fn is_owned(&self, doc: &Document) -> Result<bool, CommentError> {
        if doc.property(COMMENT_NAMESPACE, "parentId").is_none() {
            return Ok(false);
        }
        let Some(parent_id) = &doc.parent_id else {
            return Ok(false);
        };
        match self
            .store
            .get_document(&Session::admin(), &DocumentRef::new(parent_id.clone()))
            .await
        {
            Ok(container) => Ok(container.doc_type == self.config.hidden_container_type),
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
}

#[async_trait]
impl CommentBackend for PropertyBackend {
    async fn create_comment(
        &self,
        session: &Session,
        target: &DocumentRef,
        comment: Comment,
    ) -> Result<Comment, CommentError> {
        let target_doc = self.store.get_document(session, target).await?;
        let root = root_ancestor(self.store.as_ref(), session, &target_doc).await?;
        let container =
            find_or_create_container(self.store.as_ref(), &self.config, Some(&root.doc_ref()))
                .await?;

        let mut comment = comment;
        comment.parent_id = target_doc.id.clone();
        comment.ancestor_ids = compute_ancestor_ids(&self.config, &target_doc);

        let mut doc = Document::new(
            comment.id.clone(),
            self.config.comment_type.clone(),
            Some(container.id.clone()),
        );
        doc.id = comment.id.clone();
        doc.created_at = comment.created_at;
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
        // Reply linkage is immutable on update
        comment.parent_id = existing.parent_id;
        comment.ancestor_ids = existing.ancestor_ids;
        comment.write_properties(&mut doc, true);
        let saved = self.store.save_document(session, doc).await?;
        Comment::from_document(&saved, None)
    }

    async fn delete_comment(&self, session: &Session, id: &str) -> Result<(), CommentError> {
        let doc = self.load_owned(session, id).await?;
        self.store.remove_document(session, &doc.doc_ref()).await?;
        Ok(())
    }

    async fn get_comments(
        &self,
        session: &Session,
        document_id: &str,
    ) -> Result<Vec<Comment>, CommentError> {
        let query = DocumentQuery::new()
            .with_doc_type(self.config.comment_type.clone())
            .with_property_equals(
                COMMENT_NAMESPACE,
                "parentId",
                serde_json::json!(document_id),
            );
        let candidates = self.store.query(session, &query).await?;

        // One container lookup per distinct container, not per comment
        let mut container_types: HashMap<String, String> = HashMap::new();
        let mut comments = Vec::new();
        for doc in candidates {
            let Some(parent_id) = doc.parent_id.clone() else {
                continue;
            };
            let container_type = match container_types.get(&parent_id) {
                Some(t) => t.clone(),
                None => {
                    let t = match self
                        .store
                        .get_document(&Session::admin(), &DocumentRef::new(parent_id.clone()))
                        .await
                    {
                        Ok(container) => container.doc_type,
                        Err(StoreError::DocumentNotFound { .. }) => String::new(),
                        Err(err) => return Err(err.into()),
                    };
                    container_types.insert(parent_id.clone(), t.clone());
                    t
                }
            };
            if container_type == self.config.hidden_container_type {
                comments.push(Comment::from_document(&doc, None)?);
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
        session: &Session,
        comment_id: &str,
    ) -> Result<Vec<DocumentRef>, CommentError> {
        let comment = self.get_comment(session, comment_id).await?;
        Ok(vec![DocumentRef::new(comment.parent_id)])
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
            Capability::CommentsLinkedWithProperty => true,
            Capability::ExternalComments => false,
        }
    }
}
