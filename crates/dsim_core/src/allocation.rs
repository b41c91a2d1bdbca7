//! Id allocation responses.

use crate::key::Key;
use serde::{Deserialize, Serialize};

/// Partition a key lives in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionId {
    /// Database id; always empty.
    pub database_id: String,
    /// Namespace, empty when none.
    pub namespace_id: String,
    /// Project id, empty when it cannot be resolved.
    pub project_id: String,
}

/// Final path element of an allocated key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathElement {
    /// Allocated id.
    pub id: i64,
    /// Always `"id"`.
    pub id_type: String,
    /// Entity kind.
    pub kind: String,
}

/// Metadata reported for one allocated key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyMetadata {
    /// Partition of the key.
    pub partition_id: PartitionId,
    /// Path of the key's final element.
    pub path: Vec<PathElement>,
}

/// Keys produced by `allocate_ids`, with per-key metadata in the same order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocateIdsResponse {
    /// Allocated keys.
    pub keys: Vec<Key>,
    /// Metadata per key.
    pub metadata: Vec<KeyMetadata>,
}

impl AllocateIdsResponse {
    pub(crate) fn with_capacity(count: usize) -> Self {
        Self {
            keys: Vec::with_capacity(count),
            metadata: Vec::with_capacity(count),
        }
    }

    pub(crate) fn push(&mut self, key: Key, project_id: &str, id: i64) {
        self.metadata.push(KeyMetadata {
            partition_id: PartitionId {
                database_id: String::new(),
                namespace_id: key.namespace().unwrap_or_default().to_string(),
                project_id: project_id.to_string(),
            },
            path: vec![PathElement {
                id,
                id_type: "id".to_string(),
                kind: key.kind().to_string(),
            }],
        });
        self.keys.push(key);
    }
}
