//! Remark Comment Storage Core
//!
//! This crate provides the comment storage backends, the bridge router and the
//! forward-only storage migration engine for the Remark comment subsystem.
//!
//! # Architecture
//!
//! - **Three representations**: comments historically lived in three incompatible
//!   physical layouts (relation triples, parent-link properties, secured tree).
//!   Each layout is a [`services::CommentBackend`] implementation.
//! - **Structural detection**: stored comments carry no version tag; the owning
//!   backend is inferred from the shape of the record by the detector.
//! - **Bridge router**: a fourth `CommentBackend` that stays correct over a store
//!   containing mixed-representation data while steering all new writes to the
//!   newest representation.
//! - **Batched migration**: two idempotent, resumable migration steps move every
//!   comment forward one representation at a time, with progress reporting and
//!   cooperative cancellation.
//!
//! # Modules
//!
//! - [`models`] - Data structures (Document, Comment, ACL)
//! - [`db`] - Store abstractions (document store, relation graph, events)
//! - [`services`] - Backends, detector, bridge router, migrator, migration driver

pub mod db;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use db::*;
pub use models::*;
pub use services::*;
