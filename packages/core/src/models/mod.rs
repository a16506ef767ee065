//! Data Models
//!
//! This module contains the core data structures used throughout Remark:
//!
//! - `Document` - Generic stored record with namespaced JSON properties and ACL
//! - `Comment` - The comment domain object, mapped onto a `Document`
//!
//! Comments never get their own table or schema: they are ordinary documents
//! whose comment-specific fields live in the `"comment"` property namespace.

mod comment;
mod document;

pub use comment::{Comment, CommentPage, ThreadRoot, COMMENT_NAMESPACE, EXTERNAL_ENTITY_NAMESPACE};
pub use document::{Acl, AclEntry, ContextData, Document, DocumentRef, Permission};
