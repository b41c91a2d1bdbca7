//! Datastore capability trait.

use crate::allocation::AllocateIdsResponse;
use crate::datastore::Datastore;
use crate::entity::{Entity, EntityWrite, MutationMode};
use crate::error::CoreResult;
use crate::key::Key;
use crate::mutation::CommitResponse;
use crate::query::{Query, QueryInfo};
use crate::transaction::{Transaction, TransactionOptions};

/// The operations a datastore offers to calling code.
///
/// Code written against this trait runs unchanged on the in-memory
/// [`Datastore`] and on any other implementation.
///
/// # Invariants
///
/// - `get` with an empty key list fails with `InvalidArgument`
/// - `save` assigns ids to incomplete keys and reports the completed keys
/// - `delete` of an absent key succeeds
/// - Implementations must be `Send + Sync`
///
/// # Implementors
///
/// - [`Datastore`] - In-memory emulation
pub trait DatastoreBackend: Send + Sync {
    /// Transaction handle type.
    type Transaction<'a>
    where
        Self: 'a;

    /// Allocates `count` complete keys shaped like `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if `key` is malformed.
    fn allocate_ids(&self, key: &Key, count: usize) -> CoreResult<AllocateIdsResponse>;

    /// Looks up entities by key.
    ///
    /// # Errors
    ///
    /// Returns an error if `keys` is empty or a key is malformed.
    fn get(&self, keys: &[Key]) -> CoreResult<Vec<Entity>>;

    /// Writes entities in their declared modes.
    ///
    /// # Errors
    ///
    /// Returns an error if any key is malformed.
    fn save(&self, writes: Vec<EntityWrite>) -> CoreResult<CommitResponse>;

    /// Writes entities in insert mode.
    ///
    /// # Errors
    ///
    /// As for [`DatastoreBackend::save`].
    fn insert(&self, writes: Vec<EntityWrite>) -> CoreResult<CommitResponse> {
        self.save(tag(writes, MutationMode::Insert))
    }

    /// Writes entities in update mode.
    ///
    /// # Errors
    ///
    /// As for [`DatastoreBackend::save`].
    fn update(&self, writes: Vec<EntityWrite>) -> CoreResult<CommitResponse> {
        self.save(tag(writes, MutationMode::Update))
    }

    /// Writes entities in upsert mode.
    ///
    /// # Errors
    ///
    /// As for [`DatastoreBackend::save`].
    fn upsert(&self, writes: Vec<EntityWrite>) -> CoreResult<CommitResponse> {
        self.save(tag(writes, MutationMode::Upsert))
    }

    /// Deletes entities.
    ///
    /// # Errors
    ///
    /// Returns an error if any key is malformed.
    fn delete(&self, keys: &[Key]) -> CoreResult<CommitResponse>;

    /// Applies partial updates.
    ///
    /// # Errors
    ///
    /// Implementations may not support merging.
    fn merge(&self, writes: Vec<EntityWrite>) -> CoreResult<CommitResponse>;

    /// Runs a query.
    ///
    /// # Errors
    ///
    /// Returns an error if the query is invalid.
    fn run_query(&self, query: &Query) -> CoreResult<(Vec<Entity>, QueryInfo)>;

    /// Opens a transaction handle.
    fn transaction(&self, options: TransactionOptions) -> Self::Transaction<'_>;

    /// Removes all data.
    fn wipe(&self);
}

fn tag(writes: Vec<EntityWrite>, mode: MutationMode) -> Vec<EntityWrite> {
    writes.into_iter().map(|w| w.with_method(mode)).collect()
}

impl DatastoreBackend for Datastore {
    type Transaction<'a> = Transaction<'a>;

    fn allocate_ids(&self, key: &Key, count: usize) -> CoreResult<AllocateIdsResponse> {
        Datastore::allocate_ids(self, key, count)
    }

    fn get(&self, keys: &[Key]) -> CoreResult<Vec<Entity>> {
        Datastore::get(self, keys)
    }

    fn save(&self, writes: Vec<EntityWrite>) -> CoreResult<CommitResponse> {
        Datastore::save(self, writes)
    }

    fn delete(&self, keys: &[Key]) -> CoreResult<CommitResponse> {
        Datastore::delete(self, keys)
    }

    fn merge(&self, writes: Vec<EntityWrite>) -> CoreResult<CommitResponse> {
        Datastore::merge(self, writes)
    }

    fn run_query(&self, query: &Query) -> CoreResult<(Vec<Entity>, QueryInfo)> {
        Datastore::run_query(self, query)
    }

    fn transaction(&self, options: TransactionOptions) -> Transaction<'_> {
        Datastore::transaction(self, options)
    }

    fn wipe(&self) {
        Datastore::wipe(self);
    }
}
