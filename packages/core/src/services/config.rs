//! Comment Storage Configuration
//!
//! Type names, graph namespaces and migration batch size for the comment
//! subsystem. Deployments tune these through their configuration layer; the
//! defaults match the reference deployment.

use crate::db::Resource;
use crate::models::DocumentRef;
use serde::{Deserialize, Serialize};

/// Configuration shared by the backends, the detector and the migrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommentStorageConfig {
    /// Document type of comment records
    pub comment_type: String,

    /// Document type of hidden, unsecured comment containers
    pub hidden_container_type: String,

    /// Name of hidden comment containers
    pub container_name: String,

    /// Graph namespace of document resources
    pub document_namespace: String,

    /// Graph namespace of the reply predicate
    pub relation_namespace: String,

    /// Local name of the reply predicate
    pub replies_to_local_name: String,

    /// Number of comments rewritten per migration batch
    pub batch_size: usize,
}

impl Default for CommentStorageConfig {
    fn default() -> Self {
        Self {
            comment_type: "comment".to_string(),
            hidden_container_type: "hiddenFolder".to_string(),
            container_name: "Comments".to_string(),
            document_namespace: "urn:remark:document:".to_string(),
            relation_namespace: "urn:remark:relation:".to_string(),
            replies_to_local_name: "repliesTo".to_string(),
            batch_size: 50,
        }
    }
}

impl CommentStorageConfig {
    /// The reply predicate resource.
    pub fn replies_to_predicate(&self) -> Resource {
        Resource::new(
            self.relation_namespace.clone(),
            self.replies_to_local_name.clone(),
        )
    }

    /// Graph resource standing for a document.
    pub fn document_resource(&self, doc_ref: &DocumentRef) -> Resource {
        Resource::for_document(&self.document_namespace, doc_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CommentStorageConfig::default();
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.replies_to_predicate().local_name, "repliesTo");
    }

    #[test]
    fn test_partial_deserialization_falls_back_to_defaults() {
        let config: CommentStorageConfig =
            serde_json::from_str(r#"{"batchSize": 10}"#).unwrap();
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.comment_type, "comment");
    }

    #[test]
    fn test_document_resource_uses_id_as_local_name() {
        let config = CommentStorageConfig::default();
        let resource = config.document_resource(&DocumentRef::new("d-1"));
        assert_eq!(resource.local_name, "d-1");
        assert_eq!(resource.namespace, "urn:remark:document:");
    }
}
