//! Document Events
//!
//! This module defines the events broadcast by the document store when data
//! changes, following the observer pattern so that notification delivery and
//! audit trails can subscribe without coupling to the store implementation.
//!
//! # Suppression Marker
//!
//! Update events carry `notifications_disabled`, copied from the write's
//! transient `ContextData`. Bulk migration rewrites set the marker so that
//! downstream sinks can drop the per-record noise; the events themselves are
//! still emitted, which lets tests assert that every migration write was
//! flagged.

use crate::models::Document;

/// Events emitted by the document store
///
/// One event per committed operation, emitted after the operation succeeds.
#[derive(Debug, Clone)]
pub enum DocumentEvent {
    /// A new document was created
    Created(Document),

    /// An existing document was saved
    Updated {
        document: Document,
        /// True when the write carried the suppression marker.
        notifications_disabled: bool,
    },

    /// Documents were re-parented
    Moved {
        ids: Vec<String>,
        new_parent_id: Option<String>,
    },

    /// A document (and its subtree) was removed
    Removed { id: String },
}

impl DocumentEvent {
    /// Get a string representation of the event type
    pub fn event_type(&self) -> &str {
        match self {
            DocumentEvent::Created(_) => "document:created",
            DocumentEvent::Updated { .. } => "document:updated",
            DocumentEvent::Moved { .. } => "document:moved",
            DocumentEvent::Removed { .. } => "document:removed",
        }
    }
}
