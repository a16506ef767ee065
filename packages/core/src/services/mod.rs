//! Comment Services
//!
//! This module contains the comment-layer business logic:
//!
//! - `CommentBackend` - the uniform contract over the three physical layouts
//! - `RelationBackend` / `PropertyBackend` / `TreeBackend` - the layouts
//! - `RepresentationDetector` - structural classification of stored comments
//! - `BridgeCommentService` - mixed-representation router
//! - `CommentsMigrator` - batched forward-only migration steps
//! - `MigrationService` - async driver exposing status and step execution
//!
//! Services coordinate between the store layer and the comment domain model;
//! none of them caches store state between calls.

pub mod backend;
pub mod backends;
pub mod bridge;
pub mod config;
pub mod detector;
pub mod error;
pub mod migration_service;
pub mod migrator;

pub use backend::{Capability, CommentBackend};
pub use backends::{PropertyBackend, RelationBackend, TreeBackend};
pub use bridge::BridgeCommentService;
pub use config::CommentStorageConfig;
pub use detector::{Representation, RepresentationDetector};
pub use error::CommentError;
pub use migration_service::{MigrationService, MigrationStatus};
pub use migrator::{
    CommentsMigrator, LoggingMigrationContext, MigrationContext, MigrationState, MigrationStep,
    COMMENT_STORAGE_MIGRATION_ID,
};
