//! Document Data Structures
//!
//! This module defines the generic `Document` record that every comment backend
//! stores comments as, plus the ACL types enforced by the document store.
//!
//! # Namespaced Properties
//!
//! All domain-specific data lives in the `properties` field as a two-level JSON
//! object: `properties[namespace][field]`. Backends read and write their fields
//! through [`Document::property`] / [`Document::set_property`] and never touch
//! foreign namespaces.
//!
//! # ACL Model
//!
//! A document either carries a local ACL (`acl: Some(..)`) or inherits from its
//! nearest ancestor that has one (`acl: None`). A store with no ACL anywhere on
//! the ancestor chain is open. Enforcement happens in the document store, not
//! here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lightweight reference to a document by id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRef {
    pub id: String,
}

impl DocumentRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl std::fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.id)
    }
}

impl From<&Document> for DocumentRef {
    fn from(doc: &Document) -> Self {
        Self::new(doc.id.clone())
    }
}

/// Permission level granted or denied by an ACL entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Permission {
    Read,
    Write,
    Everything,
}

impl Permission {
    /// Whether a grant of `self` satisfies a request for `required`.
    pub fn covers(&self, required: Permission) -> bool {
        match self {
            Permission::Everything => true,
            Permission::Write => !matches!(required, Permission::Everything),
            Permission::Read => matches!(required, Permission::Read),
        }
    }
}

/// One ACL entry: a grant or denial for a principal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AclEntry {
    pub principal: String,
    pub permission: Permission,
    pub granted: bool,
}

impl AclEntry {
    pub fn allow(principal: impl Into<String>, permission: Permission) -> Self {
        Self {
            principal: principal.into(),
            permission,
            granted: true,
        }
    }

    pub fn deny(principal: impl Into<String>, permission: Permission) -> Self {
        Self {
            principal: principal.into(),
            permission,
            granted: false,
        }
    }
}

/// Local access control list of a document.
///
/// `entries` are evaluated first-match-wins per principal; a principal with no
/// matching entry is denied once a local ACL exists (local ACLs are closed).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Acl {
    pub entries: Vec<AclEntry>,
}

impl Acl {
    pub fn new(entries: Vec<AclEntry>) -> Self {
        Self { entries }
    }
}

/// Transient per-write context attached to a document.
///
/// Not persisted and not compared; carries markers that alter how the store
/// treats one specific write. The migration engine uses `disable_notifications`
/// to keep bulk rewrites from spamming update events.
#[derive(Debug, Clone, Default)]
pub struct ContextData {
    /// Suppress update-event side effects for this write.
    pub disable_notifications: bool,
}

/// Generic stored record.
///
/// Comments, comment containers and commented documents are all `Document`s;
/// only `doc_type` and the property namespaces differ.
///
/// # Fields
///
/// - `id`: uuid string, unique across the store
/// - `name`: human-readable name (unique only within a parent by convention)
/// - `doc_type`: type name (e.g. `"comment"`, `"hiddenFolder"`)
/// - `parent_id`: immediate container, `None` for top-level documents
/// - `properties`: namespaced JSON bags, `properties[namespace][field]`
/// - `acl`: local ACL; `None` means inherit from the nearest ancestor
/// - `proxy_target_id`: set when this record is a proxy of another document
/// - `context_data`: transient write markers, never persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub name: String,
    pub doc_type: String,
    pub parent_id: Option<String>,
    pub properties: serde_json::Value,
    pub acl: Option<Acl>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_target_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    #[serde(skip, default)]
    pub context_data: ContextData,
}

impl Document {
    /// Create a new document with a generated uuid id.
    pub fn new(name: impl Into<String>, doc_type: impl Into<String>, parent_id: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            doc_type: doc_type.into(),
            parent_id,
            properties: serde_json::json!({}),
            acl: None,
            proxy_target_id: None,
            created_at: now,
            modified_at: now,
            context_data: ContextData::default(),
        }
    }

    /// Read a property out of a namespace bag. `None` when the namespace or
    /// the field is absent, or when the stored value is JSON null.
    pub fn property(&self, namespace: &str, field: &str) -> Option<&serde_json::Value> {
        self.properties
            .get(namespace)
            .and_then(|bag| bag.get(field))
            .filter(|v| !v.is_null())
    }

    /// Read a string property out of a namespace bag.
    pub fn string_property(&self, namespace: &str, field: &str) -> Option<&str> {
        self.property(namespace, field).and_then(|v| v.as_str())
    }

    /// Set a property inside a namespace bag, creating the bag on demand.
    pub fn set_property(&mut self, namespace: &str, field: &str, value: serde_json::Value) {
        if !self.properties.is_object() {
            self.properties = serde_json::json!({});
        }
        let root = self.properties.as_object_mut().unwrap();
        let bag = root
            .entry(namespace.to_string())
            .or_insert_with(|| serde_json::json!({}));
        if !bag.is_object() {
            *bag = serde_json::json!({});
        }
        bag.as_object_mut()
            .unwrap()
            .insert(field.to_string(), value);
        self.modified_at = Utc::now();
    }

    /// Remove a property from a namespace bag, if present.
    pub fn remove_property(&mut self, namespace: &str, field: &str) {
        if let Some(bag) = self
            .properties
            .as_object_mut()
            .and_then(|root| root.get_mut(namespace))
            .and_then(|bag| bag.as_object_mut())
        {
            if bag.remove(field).is_some() {
                self.modified_at = Utc::now();
            }
        }
    }

    /// Whether this record is a proxy of another document.
    pub fn is_proxy(&self) -> bool {
        self.proxy_target_id.is_some()
    }

    pub fn doc_ref(&self) -> DocumentRef {
        DocumentRef::new(self.id.clone())
    }

    /// Mark the next write of this document as notification-suppressed.
    pub fn disable_notifications(&mut self) {
        self.context_data.disable_notifications = true;
    }
}
