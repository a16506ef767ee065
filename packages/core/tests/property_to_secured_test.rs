//! Property → Secured Migration Tests
//!
//! Drives the second migration step: comments leave their hidden containers
//! and become ordinary secured children of the documents they reply to, local
//! ACLs are dropped, orphans are removed, and emptied containers disappear.

use anyhow::Result;
use remark_core::db::{
    DocumentEvent, DocumentQuery, DocumentStore, MemoryDocumentStore, MemoryRelationGraph,
    RelationGraph, Session,
};
use remark_core::models::{Acl, AclEntry, Comment, Document, DocumentRef, Permission};
use remark_core::services::{
    CommentBackend, CommentStorageConfig, CommentsMigrator, MigrationContext, MigrationState,
    MigrationStep, PropertyBackend, RelationBackend, TreeBackend,
};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct RecordingContext {
    reports: Mutex<Vec<(String, i64, i64)>>,
    shutdown: std::sync::atomic::AtomicBool,
}

impl RecordingContext {
    fn reports(&self) -> Vec<(String, i64, i64)> {
        self.reports.lock().unwrap().clone()
    }
}

impl MigrationContext for RecordingContext {
    fn report_progress(&self, message: &str, num: i64, total: i64) {
        self.reports
            .lock()
            .unwrap()
            .push((message.to_string(), num, total));
    }

    fn request_shutdown(&self) {
        self.shutdown
            .store(true, std::sync::atomic::Ordering::SeqCst);
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown.load(std::sync::atomic::Ordering::SeqCst)
    }
}

struct Fixture {
    store: Arc<MemoryDocumentStore>,
    graph: Arc<MemoryRelationGraph>,
    relation: RelationBackend,
    property: PropertyBackend,
    tree: TreeBackend,
    migrator: CommentsMigrator,
    config: CommentStorageConfig,
}

fn fixture() -> Fixture {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
    let store = Arc::new(MemoryDocumentStore::new());
    let graph = Arc::new(MemoryRelationGraph::new());
    let config = CommentStorageConfig::default();
    Fixture {
        store: store.clone(),
        graph: graph.clone(),
        relation: RelationBackend::new(store.clone(), graph.clone(), config.clone()),
        property: PropertyBackend::new(store.clone(), config.clone()),
        tree: TreeBackend::new(store.clone(), config.clone()),
        migrator: CommentsMigrator::new(store, graph, config.clone()),
        config,
    }
}

fn session() -> Session {
    Session::user("migrator-test")
}

async fn hidden_container_ids(fixture: &Fixture) -> Result<Vec<String>> {
    let query = DocumentQuery::new()
        .with_doc_type(fixture.config.hidden_container_type.clone())
        .with_name(fixture.config.container_name.clone());
    Ok(fixture
        .store
        .query(&Session::admin(), &query)
        .await?
        .into_iter()
        .map(|d| d.id)
        .collect())
}

#[tokio::test]
async fn test_comments_become_secured_children() -> Result<()> {
    let fixture = fixture();
    let page = fixture
        .store
        .create_document(&session(), Document::new("page", "text", None))
        .await?;

    let top = fixture
        .property
        .create_comment(
            &session(),
            &page.doc_ref(),
            Comment::new(page.id.clone(), "alice", "top"),
        )
        .await?;
    let reply = fixture
        .property
        .create_comment(
            &session(),
            &DocumentRef::new(top.id.clone()),
            Comment::new(top.id.clone(), "bob", "reply"),
        )
        .await?;

    // One comment carries a hand-written local ACL from the property era
    let admin = Session::admin();
    let mut acled = fixture
        .store
        .get_document(&admin, &DocumentRef::new(top.id.clone()))
        .await?;
    acled.acl = Some(Acl::new(vec![
        AclEntry::allow("alice", Permission::Everything),
        AclEntry::allow("bob", Permission::Read),
    ]));
    fixture.store.save_document(&admin, acled).await?;

    assert_eq!(fixture.migrator.probe_state().await?, MigrationState::Property);

    let ctx = RecordingContext::default();
    fixture
        .migrator
        .run_step(MigrationStep::PropertyToSecured, &ctx)
        .await?;

    assert_eq!(
        ctx.reports(),
        vec![
            ("Initializing".to_string(), 0, -1),
            ("Migrating comments from Property to Secured".to_string(), 1, 2),
            ("Migrating comments from Property to Secured".to_string(), 2, 2),
            ("Done Migrating from Property to Secured".to_string(), 2, 2),
        ]
    );
    assert_eq!(fixture.migrator.probe_state().await?, MigrationState::Secured);

    // Placement: top under the page, reply under top, both without local ACLs
    let top_doc = fixture
        .store
        .get_document(&admin, &DocumentRef::new(top.id.clone()))
        .await?;
    assert_eq!(top_doc.parent_id.as_deref(), Some(page.id.as_str()));
    assert!(top_doc.acl.is_none());
    let reply_doc = fixture
        .store
        .get_document(&admin, &DocumentRef::new(reply.id.clone()))
        .await?;
    assert_eq!(reply_doc.parent_id.as_deref(), Some(top.id.as_str()));
    assert!(reply_doc.acl.is_none());

    // The emptied container is gone and the tree backend now owns the thread
    assert!(hidden_container_ids(&fixture).await?.is_empty());
    let comments = fixture.tree.get_comments(&session(), &page.id).await?;
    assert_eq!(comments.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_orphaned_comments_are_removed() -> Result<()> {
    let fixture = fixture();
    let page = fixture
        .store
        .create_document(&session(), Document::new("page", "text", None))
        .await?;
    let doomed = fixture
        .store
        .create_document(&session(), Document::new("doomed", "text", None))
        .await?;

    let kept = fixture
        .property
        .create_comment(
            &session(),
            &page.doc_ref(),
            Comment::new(page.id.clone(), "alice", "kept"),
        )
        .await?;
    let orphan = fixture
        .property
        .create_comment(
            &session(),
            &doomed.doc_ref(),
            Comment::new(doomed.id.clone(), "bob", "orphaned"),
        )
        .await?;
    fixture
        .store
        .remove_document(&session(), &doomed.doc_ref())
        .await?;

    let ctx = RecordingContext::default();
    fixture
        .migrator
        .run_step(MigrationStep::PropertyToSecured, &ctx)
        .await?;

    assert_eq!(fixture.migrator.probe_state().await?, MigrationState::Secured);
    let admin = Session::admin();
    assert!(fixture
        .store
        .exists(&admin, &DocumentRef::new(kept.id.clone()))
        .await?);
    assert!(!fixture
        .store
        .exists(&admin, &DocumentRef::new(orphan.id.clone()))
        .await?);
    Ok(())
}

#[tokio::test]
async fn test_non_empty_containers_are_left_in_place() -> Result<()> {
    let fixture = fixture();
    let page = fixture
        .store
        .create_document(&session(), Document::new("page", "text", None))
        .await?;
    fixture
        .property
        .create_comment(
            &session(),
            &page.doc_ref(),
            Comment::new(page.id.clone(), "alice", "hello"),
        )
        .await?;

    // Park a non-comment stray inside the container
    let container_id = hidden_container_ids(&fixture).await?.remove(0);
    fixture
        .store
        .create_document(
            &Session::admin(),
            Document::new("stray", "text", Some(container_id.clone())),
        )
        .await?;

    let ctx = RecordingContext::default();
    fixture
        .migrator
        .run_step(MigrationStep::PropertyToSecured, &ctx)
        .await?;

    // The comment migrated but the container stays because of the stray
    assert_eq!(fixture.migrator.probe_state().await?, MigrationState::Secured);
    assert_eq!(hidden_container_ids(&fixture).await?, vec![container_id]);
    Ok(())
}

#[tokio::test]
async fn test_empty_run_cadence() -> Result<()> {
    let fixture = fixture();
    let ctx = RecordingContext::default();
    fixture
        .migrator
        .run_step(MigrationStep::PropertyToSecured, &ctx)
        .await?;
    assert_eq!(
        ctx.reports(),
        vec![
            ("Initializing".to_string(), 0, -1),
            ("Done Migrating from Property to Secured".to_string(), 0, 0),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_relation_comments_survive_out_of_order_run() -> Result<()> {
    let fixture = fixture();
    let page = fixture
        .store
        .create_document(&session(), Document::new("page", "text", None))
        .await?;
    let relation_comment = fixture
        .relation
        .create_comment(
            &session(),
            &page.doc_ref(),
            Comment::new(page.id.clone(), "alice", "still relation-backed"),
        )
        .await?;

    // Running step 2 before step 1: the relation comment sits in a hidden
    // container without the parent-link property, but it is not an orphan
    let ctx = RecordingContext::default();
    fixture
        .migrator
        .run_step(MigrationStep::PropertyToSecured, &ctx)
        .await?;

    let admin = Session::admin();
    assert!(fixture
        .store
        .exists(&admin, &DocumentRef::new(relation_comment.id.clone()))
        .await?);
    assert_eq!(fixture.graph.get_statements(None, None, None).await?.len(), 1);
    assert_eq!(fixture.migrator.probe_state().await?, MigrationState::Relation);

    // The in-order runs then migrate it cleanly
    let ctx = RecordingContext::default();
    fixture
        .migrator
        .run_step(MigrationStep::RelationToProperty, &ctx)
        .await?;
    let ctx = RecordingContext::default();
    fixture
        .migrator
        .run_step(MigrationStep::PropertyToSecured, &ctx)
        .await?;
    assert_eq!(fixture.migrator.probe_state().await?, MigrationState::Secured);
    let comments = fixture.tree.get_comments(&session(), &page.id).await?;
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].id, relation_comment.id);
    Ok(())
}

#[tokio::test]
async fn test_full_run_cadence_across_batches() -> Result<()> {
    let fixture = fixture();
    let mut pages = Vec::new();
    for name in ["page-a", "page-b", "page-c"] {
        let page = fixture
            .store
            .create_document(&session(), Document::new(name, "text", None))
            .await?;
        for i in 0..50 {
            fixture
                .property
                .create_comment(
                    &session(),
                    &page.doc_ref(),
                    Comment::new(page.id.clone(), "alice", format!("comment {i}")),
                )
                .await?;
        }
        pages.push(page);
    }

    let ctx = RecordingContext::default();
    fixture
        .migrator
        .run_step(MigrationStep::PropertyToSecured, &ctx)
        .await?;

    assert_eq!(
        ctx.reports(),
        vec![
            ("Initializing".to_string(), 0, -1),
            ("Migrating comments from Property to Secured".to_string(), 1, 150),
            ("Migrating comments from Property to Secured".to_string(), 51, 150),
            ("Migrating comments from Property to Secured".to_string(), 101, 150),
            ("Migrating comments from Property to Secured".to_string(), 150, 150),
            ("Done Migrating from Property to Secured".to_string(), 150, 150),
        ]
    );

    assert_eq!(fixture.migrator.probe_state().await?, MigrationState::Secured);
    assert!(hidden_container_ids(&fixture).await?.is_empty());
    for page in &pages {
        let comments = fixture.tree.get_comments(&session(), &page.id).await?;
        assert_eq!(comments.len(), 50, "page {}", page.id);
    }
    Ok(())
}

#[tokio::test]
async fn test_rewrites_suppress_notifications() -> Result<()> {
    let fixture = fixture();
    let page = fixture
        .store
        .create_document(&session(), Document::new("page", "text", None))
        .await?;
    fixture
        .property
        .create_comment(
            &session(),
            &page.doc_ref(),
            Comment::new(page.id.clone(), "alice", "hello"),
        )
        .await?;

    let mut events = fixture.store.subscribe();
    while events.try_recv().is_ok() {}

    let ctx = RecordingContext::default();
    fixture
        .migrator
        .run_step(MigrationStep::PropertyToSecured, &ctx)
        .await?;

    let mut updated = 0;
    while let Ok(event) = events.try_recv() {
        if let DocumentEvent::Updated {
            notifications_disabled,
            ..
        } = event
        {
            assert!(notifications_disabled);
            updated += 1;
        }
    }
    assert_eq!(updated, 1);
    Ok(())
}
