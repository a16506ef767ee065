//! Store Layer
//!
//! This module defines the storage contracts the comment subsystem is built
//! against, plus in-memory reference implementations used by the test suite:
//!
//! - `DocumentStore` - ACL-enforced document repository (external collaborator)
//! - `RelationGraph` - triple store backing the oldest comment representation
//! - `DocumentEvent` - update/move/remove events broadcast by the store,
//!   carrying the notification-suppression marker from the write context
//!
//! Production deployments plug their real repository and graph store in behind
//! these traits; nothing in `services` depends on a concrete implementation.

mod document_store;
mod error;
pub mod events;
mod memory_store;
mod relation_graph;

pub use document_store::{DocumentQuery, DocumentStore, Principal, PropertyEquals, Session};
pub use error::StoreError;
pub use events::DocumentEvent;
pub use memory_store::{MemoryDocumentStore, MemoryRelationGraph};
pub use relation_graph::{RelationGraph, Resource, Statement};
