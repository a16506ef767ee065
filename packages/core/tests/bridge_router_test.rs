//! Bridge Router Tests
//!
//! End-to-end coverage of the mixed-representation router: fan-out reads over
//! a store holding one comment per representation, detector-driven dispatch of
//! targeted writes, tree-only creation, and the explicitly unsupported
//! relation deletion.

use anyhow::Result;
use remark_core::db::{DocumentStore, MemoryDocumentStore, MemoryRelationGraph, Session};
use remark_core::models::{Comment, Document, ThreadRoot};
use remark_core::services::{
    BridgeCommentService, Capability, CommentBackend, CommentError, CommentStorageConfig,
    PropertyBackend, RelationBackend, Representation, RepresentationDetector, TreeBackend,
};
use std::sync::Arc;

struct Harness {
    store: Arc<MemoryDocumentStore>,
    relation: RelationBackend,
    property: PropertyBackend,
    tree: TreeBackend,
    bridge: BridgeCommentService,
    detector: RepresentationDetector,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryDocumentStore::new());
    let graph = Arc::new(MemoryRelationGraph::new());
    let config = CommentStorageConfig::default();
    Harness {
        store: store.clone(),
        relation: RelationBackend::new(store.clone(), graph.clone(), config.clone()),
        property: PropertyBackend::new(store.clone(), config.clone()),
        tree: TreeBackend::new(store.clone(), config.clone()),
        bridge: BridgeCommentService::new(store.clone(), graph.clone(), config.clone()),
        detector: RepresentationDetector::new(store, graph, config),
    }
}

fn session() -> Session {
    Session::user("alice")
}

async fn create_page(harness: &Harness, name: &str) -> Result<Document> {
    Ok(harness
        .store
        .create_document(&session(), Document::new(name, "text", None))
        .await?)
}

/// One comment per representation on the same document.
async fn mixed_comments(harness: &Harness, page: &Document) -> Result<[Comment; 3]> {
    let relation = harness
        .relation
        .create_comment(
            &session(),
            &page.doc_ref(),
            Comment::new(page.id.clone(), "alice", "relation era"),
        )
        .await?;
    let property = harness
        .property
        .create_comment(
            &session(),
            &page.doc_ref(),
            Comment::new(page.id.clone(), "bob", "property era"),
        )
        .await?;
    let tree = harness
        .tree
        .create_comment(
            &session(),
            &page.doc_ref(),
            Comment::new(page.id.clone(), "carol", "secured era"),
        )
        .await?;
    Ok([relation, property, tree])
}

async fn detect(harness: &Harness, comment: &Comment) -> Result<Representation> {
    let doc = harness
        .store
        .get_document(&session(), &remark_core::models::DocumentRef::new(comment.id.clone()))
        .await?;
    Ok(harness.detector.detect(&doc, None).await?)
}

#[tokio::test]
async fn test_roundtrip_classification_per_backend() -> Result<()> {
    let harness = harness();
    let page = create_page(&harness, "page").await?;
    let [relation, property, tree] = mixed_comments(&harness, &page).await?;

    assert_eq!(detect(&harness, &relation).await?, Representation::Relation);
    assert_eq!(detect(&harness, &property).await?, Representation::Property);
    assert_eq!(detect(&harness, &tree).await?, Representation::Secured);
    Ok(())
}

#[tokio::test]
async fn test_reads_merge_all_representations_without_duplicates() -> Result<()> {
    let harness = harness();
    let page = create_page(&harness, "page").await?;
    let created = mixed_comments(&harness, &page).await?;

    let comments = harness.bridge.get_comments(&session(), &page.id).await?;
    assert_eq!(comments.len(), 3);
    let mut ids: Vec<&str> = comments.iter().map(|c| c.id.as_str()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 3);
    for comment in &created {
        assert!(ids.contains(&comment.id.as_str()));
    }

    let page_result = harness
        .bridge
        .get_comments_paged(&session(), &page.id, 10, 0, true)
        .await?;
    assert_eq!(page_result.total, 3);
    assert_eq!(page_result.comments.len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_get_comment_probes_backends_in_turn() -> Result<()> {
    let harness = harness();
    let page = create_page(&harness, "page").await?;
    let [relation, _, tree] = mixed_comments(&harness, &page).await?;

    let loaded = harness.bridge.get_comment(&session(), &relation.id).await?;
    assert_eq!(loaded.text, "relation era");
    let loaded = harness.bridge.get_comment(&session(), &tree.id).await?;
    assert_eq!(loaded.text, "secured era");

    let err = harness
        .bridge
        .get_comment(&session(), "missing")
        .await
        .unwrap_err();
    assert!(matches!(err, CommentError::CommentNotFound { .. }));
    Ok(())
}

#[tokio::test]
async fn test_create_through_bridge_lands_in_tree_layout() -> Result<()> {
    let harness = harness();
    let page = create_page(&harness, "page").await?;

    let created = harness
        .bridge
        .create_comment(
            &session(),
            &page.doc_ref(),
            Comment::new(page.id.clone(), "dave", "new write"),
        )
        .await?;

    assert_eq!(detect(&harness, &created).await?, Representation::Secured);
    // The tree backend answers for it directly
    let loaded = harness.tree.get_comment(&session(), &created.id).await?;
    assert_eq!(loaded.text, "new write");
    Ok(())
}

#[tokio::test]
async fn test_delete_dispatches_to_owning_backend_only() -> Result<()> {
    let harness = harness();
    let page = create_page(&harness, "page").await?;
    let [relation, property, tree] = mixed_comments(&harness, &page).await?;

    harness
        .bridge
        .delete_comment(&session(), &property.id)
        .await?;

    // Only the property comment is gone
    let remaining = harness.bridge.get_comments(&session(), &page.id).await?;
    let ids: Vec<&str> = remaining.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(remaining.len(), 2);
    assert!(ids.contains(&relation.id.as_str()));
    assert!(ids.contains(&tree.id.as_str()));

    let err = harness
        .bridge
        .get_comment(&session(), &property.id)
        .await
        .unwrap_err();
    assert!(matches!(err, CommentError::CommentNotFound { .. }));
    Ok(())
}

#[tokio::test]
async fn test_relation_delete_through_bridge_is_unsupported() -> Result<()> {
    let harness = harness();
    let page = create_page(&harness, "page").await?;
    let [relation, _, _] = mixed_comments(&harness, &page).await?;

    let err = harness
        .bridge
        .delete_comment(&session(), &relation.id)
        .await
        .unwrap_err();
    assert!(matches!(err, CommentError::UnsupportedOperation(_)));

    // The comment is untouched
    assert!(harness
        .bridge
        .get_comment(&session(), &relation.id)
        .await
        .is_ok());
    Ok(())
}

#[tokio::test]
async fn test_update_routes_through_detector() -> Result<()> {
    let harness = harness();
    let page = create_page(&harness, "page").await?;
    let [relation, property, _] = mixed_comments(&harness, &page).await?;

    let mut updated = property.clone();
    updated.text = "edited".to_string();
    let saved = harness
        .bridge
        .update_comment(&session(), &property.id, updated)
        .await?;
    assert_eq!(saved.text, "edited");
    assert_eq!(detect(&harness, &saved).await?, Representation::Property);

    // Relation comments update in place too, staying relation-backed
    let mut updated = relation.clone();
    updated.text = "still old layout".to_string();
    harness
        .bridge
        .update_comment(&session(), &relation.id, updated)
        .await?;
    let reloaded = harness.bridge.get_comment(&session(), &relation.id).await?;
    assert_eq!(reloaded.text, "still old layout");
    assert_eq!(detect(&harness, &reloaded).await?, Representation::Relation);
    Ok(())
}

#[tokio::test]
async fn test_thread_walks_over_replies() -> Result<()> {
    let harness = harness();
    let page = create_page(&harness, "page").await?;
    let top = harness
        .bridge
        .create_comment(
            &session(),
            &page.doc_ref(),
            Comment::new(page.id.clone(), "alice", "top"),
        )
        .await?;
    let reply = harness
        .bridge
        .create_comment(
            &session(),
            &remark_core::models::DocumentRef::new(top.id.clone()),
            Comment::new(top.id.clone(), "bob", "reply"),
        )
        .await?;

    match harness.bridge.get_thread_root(&session(), &reply.id).await? {
        ThreadRoot::Comment(root) => assert_eq!(root.id, top.id),
        ThreadRoot::Document(_) => panic!("reply thread should root at the top comment"),
    }
    match harness.bridge.get_thread_root(&session(), &top.id).await? {
        ThreadRoot::Document(doc) => assert_eq!(doc.id, page.id),
        ThreadRoot::Comment(_) => panic!("top-level comment should root at the document"),
    }

    let ancestor = harness.bridge.get_ancestor_ref(&session(), &reply.id).await?;
    assert_eq!(ancestor.id, page.id);
    assert_eq!(reply.ancestor_ids, vec![top.id.clone(), page.id.clone()]);

    let docs = harness
        .bridge
        .get_documents_for_comment(&session(), &reply.id)
        .await?;
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].id, page.id);
    Ok(())
}

#[tokio::test]
async fn test_external_comments_route_to_tree_backend() -> Result<()> {
    let harness = harness();
    let page = create_page(&harness, "page").await?;

    let external = harness
        .bridge
        .create_comment(
            &session(),
            &page.doc_ref(),
            Comment::new(page.id.clone(), "sync-bot", "mirrored").with_external_entity("e-42", "tracker"),
        )
        .await?;

    let loaded = harness
        .bridge
        .get_external_comment(&session(), "e-42")
        .await?;
    assert_eq!(loaded.id, external.id);
    assert_eq!(loaded.origin.as_deref(), Some("tracker"));

    let mut updated = loaded.clone();
    updated.text = "mirrored v2".to_string();
    harness
        .bridge
        .update_external_comment(&session(), "e-42", updated)
        .await?;
    assert_eq!(
        harness
            .bridge
            .get_external_comment(&session(), "e-42")
            .await?
            .text,
        "mirrored v2"
    );

    harness
        .bridge
        .delete_external_comment(&session(), "e-42")
        .await?;
    let err = harness
        .bridge
        .get_external_comment(&session(), "e-42")
        .await
        .unwrap_err();
    assert!(matches!(err, CommentError::CommentNotFound { .. }));
    Ok(())
}

#[tokio::test]
async fn test_capability_flags() {
    let harness = harness();
    assert!(!harness
        .relation
        .has_capability(Capability::CommentsLinkedWithProperty));
    assert!(harness
        .property
        .has_capability(Capability::CommentsLinkedWithProperty));
    assert!(harness
        .tree
        .has_capability(Capability::CommentsLinkedWithProperty));
    // The bridge fronts mixed content
    assert!(!harness
        .bridge
        .has_capability(Capability::CommentsLinkedWithProperty));
    assert!(harness.bridge.has_capability(Capability::ExternalComments));
    assert!(!harness.property.has_capability(Capability::ExternalComments));
}
