//! In-Memory Store Implementations
//!
//! Reference implementations of [`DocumentStore`] and [`RelationGraph`] backed
//! by process memory. They are the test harness for the whole comment layer
//! and define the behavioral contract a production repository must meet:
//!
//! - ACL enforcement walks up the hierarchy; the nearest document with a local
//!   ACL decides, admins bypass, a chain with no ACL is open
//! - query results are security-filtered, never security-errored
//! - every committed mutation broadcasts a [`DocumentEvent`]; update events
//!   carry the notification-suppression marker from the write context

use crate::db::events::DocumentEvent;
use crate::db::{DocumentQuery, DocumentStore, RelationGraph, Resource, Session, Statement, StoreError};
use crate::models::{ContextData, Document, DocumentRef, Permission};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::{broadcast, RwLock};

const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// In-memory, ACL-enforcing document repository.
pub struct MemoryDocumentStore {
    documents: RwLock<HashMap<String, Document>>,
    events: broadcast::Sender<DocumentEvent>,
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            documents: RwLock::new(HashMap::new()),
            events,
        }
    }

    /// Subscribe to store events. Slow subscribers may observe `Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<DocumentEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: DocumentEvent) {
        // No subscribers is fine; events are best-effort.
        let _ = self.events.send(event);
    }

    /// Effective permission walk: nearest local ACL on the ancestor chain
    /// decides, first matching entry wins, no matching entry means denied.
    /// A chain without any local ACL is open.
    fn allowed(
        docs: &HashMap<String, Document>,
        doc_id: &str,
        session: &Session,
        required: Permission,
    ) -> bool {
        if session.principal.is_admin {
            return true;
        }
        let mut current = docs.get(doc_id);
        while let Some(doc) = current {
            if let Some(acl) = &doc.acl {
                return acl
                    .entries
                    .iter()
                    .find(|e| e.principal == session.principal.name && e.permission.covers(required))
                    .map(|e| e.granted)
                    .unwrap_or(false);
            }
            current = doc.parent_id.as_deref().and_then(|pid| docs.get(pid));
        }
        true
    }

    fn check(
        docs: &HashMap<String, Document>,
        doc_id: &str,
        session: &Session,
        required: Permission,
    ) -> Result<(), StoreError> {
        if Self::allowed(docs, doc_id, session, required) {
            Ok(())
        } else {
            Err(StoreError::permission_denied(
                doc_id,
                session.principal.name.clone(),
            ))
        }
    }

    fn matches(doc: &Document, query: &DocumentQuery) -> bool {
        if let Some(doc_type) = &query.doc_type {
            if &doc.doc_type != doc_type {
                return false;
            }
        }
        if let Some(name) = &query.name {
            if &doc.name != name {
                return false;
            }
        }
        if let Some(parent_id) = &query.parent_id {
            if doc.parent_id.as_deref() != Some(parent_id.as_str()) {
                return false;
            }
        }
        query.property_equals.iter().all(|pred| {
            doc.property(&pred.namespace, &pred.field)
                .map(|v| v == &pred.value)
                .unwrap_or(false)
        })
    }

    fn collect_subtree(docs: &HashMap<String, Document>, root_id: &str, out: &mut Vec<String>) {
        out.push(root_id.to_string());
        let children: Vec<String> = docs
            .values()
            .filter(|d| d.parent_id.as_deref() == Some(root_id))
            .map(|d| d.id.clone())
            .collect();
        for child in children {
            Self::collect_subtree(docs, &child, out);
        }
    }

    fn is_descendant_of(docs: &HashMap<String, Document>, doc_id: &str, ancestor_id: &str) -> bool {
        let mut current = docs.get(doc_id).and_then(|d| d.parent_id.clone());
        while let Some(pid) = current {
            if pid == ancestor_id {
                return true;
            }
            current = docs.get(&pid).and_then(|d| d.parent_id.clone());
        }
        false
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn create_document(
        &self,
        session: &Session,
        mut doc: Document,
    ) -> Result<Document, StoreError> {
        let mut docs = self.documents.write().await;
        if docs.contains_key(&doc.id) {
            return Err(StoreError::document_already_exists(&doc.id));
        }
        if let Some(parent_id) = doc.parent_id.clone() {
            if docs.contains_key(&parent_id) {
                Self::check(&docs, &parent_id, session, Permission::Write)?;
            }
        }
        doc.context_data = ContextData::default();
        docs.insert(doc.id.clone(), doc.clone());
        drop(docs);
        self.emit(DocumentEvent::Created(doc.clone()));
        Ok(doc)
    }

    async fn get_document(
        &self,
        session: &Session,
        doc_ref: &DocumentRef,
    ) -> Result<Document, StoreError> {
        let docs = self.documents.read().await;
        let doc = docs
            .get(&doc_ref.id)
            .ok_or_else(|| StoreError::document_not_found(&doc_ref.id))?;
        Self::check(&docs, &doc_ref.id, session, Permission::Read)?;
        Ok(doc.clone())
    }

    async fn save_document(
        &self,
        session: &Session,
        doc: Document,
    ) -> Result<Document, StoreError> {
        let notifications_disabled = doc.context_data.disable_notifications;
        let mut docs = self.documents.write().await;
        if !docs.contains_key(&doc.id) {
            return Err(StoreError::document_not_found(&doc.id));
        }
        Self::check(&docs, &doc.id, session, Permission::Write)?;
        let mut stored = doc.clone();
        stored.context_data = ContextData::default();
        docs.insert(stored.id.clone(), stored.clone());
        drop(docs);
        self.emit(DocumentEvent::Updated {
            document: stored.clone(),
            notifications_disabled,
        });
        Ok(stored)
    }

    async fn remove_document(
        &self,
        session: &Session,
        doc_ref: &DocumentRef,
    ) -> Result<(), StoreError> {
        let mut docs = self.documents.write().await;
        if !docs.contains_key(&doc_ref.id) {
            return Err(StoreError::document_not_found(&doc_ref.id));
        }
        Self::check(&docs, &doc_ref.id, session, Permission::Write)?;
        let mut subtree = Vec::new();
        Self::collect_subtree(&docs, &doc_ref.id, &mut subtree);
        for id in &subtree {
            docs.remove(id);
        }
        drop(docs);
        self.emit(DocumentEvent::Removed {
            id: doc_ref.id.clone(),
        });
        Ok(())
    }

    async fn move_documents(
        &self,
        session: &Session,
        refs: &[DocumentRef],
        new_parent: Option<&DocumentRef>,
    ) -> Result<(), StoreError> {
        let mut docs = self.documents.write().await;
        if let Some(parent) = new_parent {
            if !docs.contains_key(&parent.id) {
                return Err(StoreError::invalid_move(format!(
                    "move target does not exist: {}",
                    parent.id
                )));
            }
            Self::check(&docs, &parent.id, session, Permission::Write)?;
        }
        for doc_ref in refs {
            if !docs.contains_key(&doc_ref.id) {
                return Err(StoreError::document_not_found(&doc_ref.id));
            }
            Self::check(&docs, &doc_ref.id, session, Permission::Write)?;
            if let Some(parent) = new_parent {
                if parent.id == doc_ref.id
                    || Self::is_descendant_of(&docs, &parent.id, &doc_ref.id)
                {
                    return Err(StoreError::invalid_move(format!(
                        "cannot move {} under its own subtree",
                        doc_ref.id
                    )));
                }
            }
        }
        for doc_ref in refs {
            if let Some(doc) = docs.get_mut(&doc_ref.id) {
                doc.parent_id = new_parent.map(|p| p.id.clone());
            }
        }
        drop(docs);
        self.emit(DocumentEvent::Moved {
            ids: refs.iter().map(|r| r.id.clone()).collect(),
            new_parent_id: new_parent.map(|p| p.id.clone()),
        });
        Ok(())
    }

    async fn exists(&self, _session: &Session, doc_ref: &DocumentRef) -> Result<bool, StoreError> {
        Ok(self.documents.read().await.contains_key(&doc_ref.id))
    }

    async fn query(
        &self,
        session: &Session,
        query: &DocumentQuery,
    ) -> Result<Vec<Document>, StoreError> {
        let docs = self.documents.read().await;
        let mut hits: Vec<Document> = docs
            .values()
            .filter(|d| Self::matches(d, query))
            .filter(|d| Self::allowed(&docs, &d.id, session, Permission::Read))
            .cloned()
            .collect();
        // Stable order independent of map iteration
        hits.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        let offset = query.offset.unwrap_or(0);
        let mut hits: Vec<Document> = hits.into_iter().skip(offset).collect();
        if let Some(limit) = query.limit {
            hits.truncate(limit);
        }
        Ok(hits)
    }

    async fn get_children(
        &self,
        session: &Session,
        parent: Option<&DocumentRef>,
    ) -> Result<Vec<Document>, StoreError> {
        let docs = self.documents.read().await;
        let parent_id = parent.map(|p| p.id.as_str());
        let mut children: Vec<Document> = docs
            .values()
            .filter(|d| d.parent_id.as_deref() == parent_id)
            .filter(|d| Self::allowed(&docs, &d.id, session, Permission::Read))
            .cloned()
            .collect();
        children.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(children)
    }

    async fn create_proxy(
        &self,
        session: &Session,
        target: &DocumentRef,
        parent: Option<&DocumentRef>,
    ) -> Result<Document, StoreError> {
        let target_doc = self.get_document(session, target).await?;
        let mut proxy = Document::new(
            target_doc.name.clone(),
            target_doc.doc_type.clone(),
            parent.map(|p| p.id.clone()),
        );
        proxy.proxy_target_id = Some(target.id.clone());
        self.create_document(session, proxy).await
    }
}

/// In-memory triple store.
pub struct MemoryRelationGraph {
    statements: RwLock<Vec<Statement>>,
}

impl Default for MemoryRelationGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRelationGraph {
    pub fn new() -> Self {
        Self {
            statements: RwLock::new(Vec::new()),
        }
    }

    fn matches(
        stmt: &Statement,
        subject: Option<&Resource>,
        predicate: Option<&Resource>,
        object: Option<&Resource>,
    ) -> bool {
        subject.map(|s| &stmt.subject == s).unwrap_or(true)
            && predicate.map(|p| &stmt.predicate == p).unwrap_or(true)
            && object.map(|o| &stmt.object == o).unwrap_or(true)
    }
}

#[async_trait]
impl RelationGraph for MemoryRelationGraph {
    async fn add(&self, statement: Statement) -> Result<(), StoreError> {
        let mut statements = self.statements.write().await;
        if !statements.contains(&statement) {
            statements.push(statement);
        }
        Ok(())
    }

    async fn has_statement(
        &self,
        subject: Option<&Resource>,
        predicate: Option<&Resource>,
        object: Option<&Resource>,
    ) -> Result<bool, StoreError> {
        let statements = self.statements.read().await;
        Ok(statements
            .iter()
            .any(|s| Self::matches(s, subject, predicate, object)))
    }

    async fn get_statements(
        &self,
        subject: Option<&Resource>,
        predicate: Option<&Resource>,
        object: Option<&Resource>,
    ) -> Result<Vec<Statement>, StoreError> {
        let statements = self.statements.read().await;
        Ok(statements
            .iter()
            .filter(|s| Self::matches(s, subject, predicate, object))
            .cloned()
            .collect())
    }

    async fn remove(&self, to_remove: &[Statement]) -> Result<(), StoreError> {
        let mut statements = self.statements.write().await;
        statements.retain(|s| !to_remove.contains(s));
        Ok(())
    }
}
