//! Mutation commands and their results.

use crate::entity::{EntityWrite, MutationMode};
use crate::key::Key;
use dsim_codec::Timestamp;
use serde::{Deserialize, Serialize};

/// A queued write, replayed against the table on commit.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingMutation {
    /// Save entities in insert mode.
    Insert(Vec<EntityWrite>),
    /// Save entities in update mode.
    Update(Vec<EntityWrite>),
    /// Save entities in upsert mode.
    Upsert(Vec<EntityWrite>),
    /// Delete keys.
    Delete(Vec<Key>),
}

impl PendingMutation {
    /// Wraps `writes` in the command matching `mode`.
    #[must_use]
    pub fn save(mode: MutationMode, writes: Vec<EntityWrite>) -> Self {
        match mode {
            MutationMode::Insert => PendingMutation::Insert(writes),
            MutationMode::Update => PendingMutation::Update(writes),
            MutationMode::Upsert => PendingMutation::Upsert(writes),
        }
    }

    /// Number of entities or keys carried.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            PendingMutation::Insert(w) | PendingMutation::Update(w) | PendingMutation::Upsert(w) => {
                w.len()
            }
            PendingMutation::Delete(keys) => keys.len(),
        }
    }

    /// Whether the command carries nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Outcome of writing or deleting one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationResult {
    /// Completed key of a saved entity; `None` for deletes.
    pub key: Option<Key>,
    /// Store-wide write sequence number.
    pub version: u64,
    /// Always `false`; conflicts are not detected.
    pub conflict_detected: bool,
    /// When the slot was first written; `None` for deletes.
    pub create_time: Option<Timestamp>,
    /// When this write happened.
    pub update_time: Timestamp,
}

/// Aggregated outcome of a save, delete, or commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitResponse {
    /// One result per entity or key, in input order.
    pub mutation_results: Vec<MutationResult>,
    /// Number of mutations applied.
    pub index_updates: usize,
}

impl CommitResponse {
    /// Builds a response from individual results.
    #[must_use]
    pub fn from_results(mutation_results: Vec<MutationResult>) -> Self {
        let index_updates = mutation_results.len();
        Self {
            mutation_results,
            index_updates,
        }
    }

    /// Appends the results of `other`.
    pub fn extend(&mut self, other: CommitResponse) {
        self.index_updates += other.index_updates;
        self.mutation_results.extend(other.mutation_results);
    }

    /// Completed keys of the saved entities, in input order.
    pub fn keys(&self) -> impl Iterator<Item = &Key> + '_ {
        self.mutation_results.iter().filter_map(|r| r.key.as_ref())
    }
}
