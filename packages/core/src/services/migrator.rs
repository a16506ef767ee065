//! Comment Storage Migration Engine
//!
//! Two forward-only, batched, resumable steps move every comment one
//! representation ahead:
//!
//! 1. `RelationToProperty` - rewrite each relation-backed comment into the
//!    property layout (set the parent-link property, move into the hidden
//!    container under the target's root ancestor, remove the graph triple)
//! 2. `PropertyToSecured` - rewrite each property-backed comment into the tree
//!    layout (drop the local ACL, re-parent under the reply target) and remove
//!    the now-empty hidden containers
//!
//! # Guarantees
//!
//! - the global state is never cached: [`CommentsMigrator::probe_state`]
//!   re-queries the live store on every call and is safe mid-migration
//! - per-record rewrite order (save, move, remove old artifact last) keeps any
//!   crash window re-runnable; rewriting an already-migrated comment is a
//!   no-op
//! - a record-level failure is logged and skipped; a run never aborts on one
//!   bad record
//! - cancellation is cooperative and honored only at batch boundaries; an
//!   in-flight batch always completes
//! - every rewrite carries the notification-suppression marker so a migration
//!   run does not fire a notification per touched comment

use crate::db::{DocumentQuery, DocumentStore, RelationGraph, Session, Statement, StoreError};
use crate::models::{Document, DocumentRef, COMMENT_NAMESPACE};
use crate::services::backends::{compute_ancestor_ids, find_or_create_container, root_ancestor};
use crate::services::{CommentError, CommentStorageConfig};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

/// Id the comment storage migration registers under in the driver.
pub const COMMENT_STORAGE_MIGRATION_ID: &str = "comment-storage";

/// Global migration state, ordered and forward-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MigrationState {
    /// At least one comment is still relation-backed
    Relation,
    /// No relation comments left, but unsecured property comments remain
    Property,
    /// Everything lives in the secured tree layout
    Secured,
}

impl std::fmt::Display for MigrationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MigrationState::Relation => "RELATION",
            MigrationState::Property => "PROPERTY",
            MigrationState::Secured => "SECURED",
        };
        f.write_str(name)
    }
}

/// One forward migration step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationStep {
    RelationToProperty,
    PropertyToSecured,
}

impl MigrationStep {
    /// Stable identifier used by the external driver.
    pub fn id(&self) -> &'static str {
        match self {
            MigrationStep::RelationToProperty => "relation-to-property",
            MigrationStep::PropertyToSecured => "property-to-secured",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "relation-to-property" => Some(MigrationStep::RelationToProperty),
            "property-to-secured" => Some(MigrationStep::PropertyToSecured),
            _ => None,
        }
    }
}

/// Transient context owned by one migration run.
///
/// Progress reporting is infallible by construction; a misbehaving sink can
/// never throw back into the migration loop. `total == -1` means the total is
/// not yet known.
pub trait MigrationContext: Send + Sync {
    fn report_progress(&self, message: &str, num: i64, total: i64);

    /// Ask the run to stop at the next batch boundary.
    fn request_shutdown(&self);

    fn is_shutdown_requested(&self) -> bool;
}

/// Default context: progress goes to the log, shutdown is an atomic flag.
#[derive(Default)]
pub struct LoggingMigrationContext {
    shutdown: AtomicBool,
}

impl LoggingMigrationContext {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MigrationContext for LoggingMigrationContext {
    fn report_progress(&self, message: &str, num: i64, total: i64) {
        tracing::info!("{}: {}/{}", message, num, total);
    }

    fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}

/// The comment storage migration state machine.
///
/// Runs directly against the store contracts, bypassing the bridge: migration
/// enumerates the *old* representation itself and rewrites record by record
/// as admin.
pub struct CommentsMigrator {
    store: std::sync::Arc<dyn DocumentStore>,
    graph: std::sync::Arc<dyn RelationGraph>,
    config: CommentStorageConfig,
}

impl CommentsMigrator {
    pub fn new(
        store: std::sync::Arc<dyn DocumentStore>,
        graph: std::sync::Arc<dyn RelationGraph>,
        config: CommentStorageConfig,
    ) -> Self {
        Self {
            store,
            graph,
            config,
        }
    }

    /// Compute the current global state by probing the live store.
    ///
    /// Pure read, never cached, safe to call concurrently with a running step.
    pub async fn probe_state(&self) -> Result<MigrationState, CommentError> {
        if self
            .graph
            .has_statement(None, Some(&self.config.replies_to_predicate()), None)
            .await?
        {
            return Ok(MigrationState::Relation);
        }
        let session = Session::admin();
        if !self.unsecured_comments(&session).await?.is_empty() {
            return Ok(MigrationState::Property);
        }
        Ok(MigrationState::Secured)
    }

    /// Execute one migration step in batches of `config.batch_size`.
    ///
    /// Idempotent: running a step with nothing left to migrate reports
    /// `Initializing: 0/-1` followed by `Done ...: 0/0` and changes nothing.
    pub async fn run_step(
        &self,
        step: MigrationStep,
        ctx: &dyn MigrationContext,
    ) -> Result<(), CommentError> {
        let session = Session::admin();
        ctx.report_progress("Initializing", 0, -1);
        match step {
            MigrationStep::RelationToProperty => {
                self.run_relation_to_property(&session, ctx).await
            }
            MigrationStep::PropertyToSecured => self.run_property_to_secured(&session, ctx).await,
        }
    }

    async fn run_relation_to_property(
        &self,
        session: &Session,
        ctx: &dyn MigrationContext,
    ) -> Result<(), CommentError> {
        let statements = self
            .graph
            .get_statements(None, Some(&self.config.replies_to_predicate()), None)
            .await?;
        let total = statements.len() as i64;
        tracing::info!("Relation to Property migration: {} comments to rewrite", total);

        for (i, statement) in statements.iter().enumerate() {
            if i > 0 && i % self.config.batch_size == 0 && ctx.is_shutdown_requested() {
                tracing::warn!(
                    "Relation to Property migration cancelled after {} of {} comments",
                    i,
                    total
                );
                return Ok(());
            }
            if let Err(err) = self.migrate_relation_statement(session, statement).await {
                tracing::error!(
                    "Skipping relation comment {}: {}",
                    statement.subject.local_name,
                    err
                );
            }
            let processed = i as i64 + 1;
            if i % self.config.batch_size == 0 || processed == total {
                ctx.report_progress(
                    "Migrating comments from Relation to Property",
                    processed,
                    total,
                );
            }
        }
        ctx.report_progress("Done Migrating from Relation to Property", total, total);
        Ok(())
    }

    async fn run_property_to_secured(
        &self,
        session: &Session,
        ctx: &dyn MigrationContext,
    ) -> Result<(), CommentError> {
        let comments = self.unsecured_comments(session).await?;
        let total = comments.len() as i64;
        tracing::info!("Property to Secured migration: {} comments to rewrite", total);

        for (i, doc) in comments.into_iter().enumerate() {
            if i > 0 && i % self.config.batch_size == 0 && ctx.is_shutdown_requested() {
                tracing::warn!(
                    "Property to Secured migration cancelled after {} of {} comments",
                    i,
                    total
                );
                return Ok(());
            }
            let id = doc.id.clone();
            if let Err(err) = self.migrate_property_comment(session, doc).await {
                tracing::error!("Skipping property comment {}: {}", id, err);
            }
            let processed = i as i64 + 1;
            if i % self.config.batch_size == 0 || processed == total {
                ctx.report_progress(
                    "Migrating comments from Property to Secured",
                    processed,
                    total,
                );
            }
        }

        self.remove_empty_containers(session).await?;
        ctx.report_progress("Done Migrating from Property to Secured", total, total);
        Ok(())
    }

    /// Rewrite one relation-backed comment into the property layout.
    ///
    /// Order matters for crash safety: property write, move, and only then
    /// statement removal. A re-run over a half-done record repeats harmless
    /// writes and finishes the removal.
    async fn migrate_relation_statement(
        &self,
        session: &Session,
        statement: &Statement,
    ) -> Result<(), CommentError> {
        let comment_ref = statement.subject.to_document_ref();
        let target_ref = statement.object.to_document_ref();

        let mut comment_doc = match self.store.get_document(session, &comment_ref).await {
            Ok(doc) => doc,
            Err(StoreError::DocumentNotFound { .. }) => {
                tracing::warn!(
                    "Removing dangling reply statement: comment {} is gone",
                    comment_ref.id
                );
                self.graph.remove(std::slice::from_ref(statement)).await?;
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };
        let target_doc = match self.store.get_document(session, &target_ref).await {
            Ok(doc) => doc,
            Err(StoreError::DocumentNotFound { .. }) => {
                tracing::warn!(
                    "Removing dangling reply statement: target {} of comment {} is gone",
                    target_ref.id,
                    comment_ref.id
                );
                self.graph.remove(std::slice::from_ref(statement)).await?;
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };

        let ancestor_ids = compute_ancestor_ids(&self.config, &target_doc);
        comment_doc.set_property(
            COMMENT_NAMESPACE,
            "parentId",
            serde_json::json!(target_doc.id),
        );
        comment_doc.set_property(
            COMMENT_NAMESPACE,
            "ancestorIds",
            serde_json::json!(ancestor_ids),
        );
        comment_doc.disable_notifications();
        self.store.save_document(session, comment_doc).await?;

        let root = root_ancestor(self.store.as_ref(), session, &target_doc).await?;
        let container =
            find_or_create_container(self.store.as_ref(), &self.config, Some(&root.doc_ref()))
                .await?;
        self.store
            .move_documents(session, &[comment_ref], Some(&container.doc_ref()))
            .await?;

        self.graph.remove(std::slice::from_ref(statement)).await?;
        Ok(())
    }

    /// Rewrite one property-backed comment into the tree layout.
    async fn migrate_property_comment(
        &self,
        session: &Session,
        mut doc: Document,
    ) -> Result<(), CommentError> {
        let Some(target_id) = doc
            .string_property(COMMENT_NAMESPACE, "parentId")
            .map(String::from)
        else {
            // A hidden-container comment without the parent-link property is
            // either still relation-backed or a genuine orphan; only the
            // latter may be removed.
            let subject = self.config.document_resource(&doc.doc_ref());
            if self
                .graph
                .has_statement(Some(&subject), Some(&self.config.replies_to_predicate()), None)
                .await?
            {
                tracing::warn!(
                    "Skipping comment {}: still relation-backed, not yet migrated",
                    doc.id
                );
                return Ok(());
            }
            tracing::warn!("Removing orphaned comment {}: no reply target recorded", doc.id);
            self.store.remove_document(session, &doc.doc_ref()).await?;
            return Ok(());
        };
        let target_ref = DocumentRef::new(target_id);
        if !self.store.exists(session, &target_ref).await? {
            tracing::warn!(
                "Removing orphaned comment {}: reply target {} is gone",
                doc.id,
                target_ref.id
            );
            self.store.remove_document(session, &doc.doc_ref()).await?;
            return Ok(());
        }

        let comment_ref = doc.doc_ref();
        // Dropping the local ACL hands security over to inheritance
        doc.acl = None;
        doc.disable_notifications();
        self.store.save_document(session, doc).await?;
        self.store
            .move_documents(session, &[comment_ref], Some(&target_ref))
            .await?;
        Ok(())
    }

    /// Hidden comment containers, store-wide.
    async fn hidden_containers(&self, session: &Session) -> Result<Vec<Document>, CommentError> {
        let query = DocumentQuery::new()
            .with_doc_type(self.config.hidden_container_type.clone())
            .with_name(self.config.container_name.clone());
        Ok(self.store.query(session, &query).await?)
    }

    /// Comment documents still parked in hidden containers.
    async fn unsecured_comments(&self, session: &Session) -> Result<Vec<Document>, CommentError> {
        let mut comments = Vec::new();
        for container in self.hidden_containers(session).await? {
            let children = self
                .store
                .get_children(session, Some(&container.doc_ref()))
                .await?;
            comments.extend(
                children
                    .into_iter()
                    .filter(|d| d.doc_type == self.config.comment_type),
            );
        }
        Ok(comments)
    }

    /// Remove hidden containers that are empty after migration; non-empty
    /// ones are logged and left alone.
    async fn remove_empty_containers(&self, session: &Session) -> Result<(), CommentError> {
        for container in self.hidden_containers(session).await? {
            let children = self
                .store
                .get_children(session, Some(&container.doc_ref()))
                .await?;
            if children.is_empty() {
                tracing::debug!("Removing empty comment container {}", container.id);
                self.store
                    .remove_document(session, &container.doc_ref())
                    .await?;
            } else {
                tracing::warn!(
                    "Comment container {} still holds {} documents, leaving it in place",
                    container.id,
                    children.len()
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryDocumentStore, MemoryRelationGraph};
    use std::sync::Arc;

    #[test]
    fn test_step_id_roundtrip() {
        for step in [
            MigrationStep::RelationToProperty,
            MigrationStep::PropertyToSecured,
        ] {
            assert_eq!(MigrationStep::from_id(step.id()), Some(step));
        }
        assert_eq!(MigrationStep::from_id("secured-to-relation"), None);
    }

    #[test]
    fn test_states_are_ordered_forward() {
        assert!(MigrationState::Relation < MigrationState::Property);
        assert!(MigrationState::Property < MigrationState::Secured);
    }

    #[test]
    fn test_logging_context_shutdown_flag() {
        let ctx = LoggingMigrationContext::new();
        assert!(!ctx.is_shutdown_requested());
        ctx.request_shutdown();
        assert!(ctx.is_shutdown_requested());
        // reporting never fails
        ctx.report_progress("Initializing", 0, -1);
    }

    #[tokio::test]
    async fn test_probe_on_empty_store_is_secured() {
        let migrator = CommentsMigrator::new(
            Arc::new(MemoryDocumentStore::new()),
            Arc::new(MemoryRelationGraph::new()),
            CommentStorageConfig::default(),
        );
        assert_eq!(
            migrator.probe_state().await.unwrap(),
            MigrationState::Secured
        );
    }
}
