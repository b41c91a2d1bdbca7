//! Async adapter over a synchronous backend.

use crate::allocation::AllocateIdsResponse;
use crate::backend::DatastoreBackend;
use crate::entity::{Entity, EntityWrite};
use crate::error::CoreResult;
use crate::key::Key;
use crate::mutation::CommitResponse;
use crate::query::{Query, QueryInfo};
use crate::transaction::TransactionOptions;

/// Delivers backend results asynchronously.
///
/// Each call runs the backend operation to completion, then yields once to
/// the tokio scheduler before handing back the result. Nothing can observe
/// the store between the call and the computation.
#[derive(Debug, Default)]
pub struct DeferredDatastore<B> {
    inner: B,
}

impl<B: DatastoreBackend> DeferredDatastore<B> {
    /// Wraps `inner`.
    pub fn new(inner: B) -> Self {
        Self { inner }
    }

    /// The wrapped backend.
    pub fn inner(&self) -> &B {
        &self.inner
    }

    /// Unwraps the backend.
    pub fn into_inner(self) -> B {
        self.inner
    }

    async fn deliver<T>(result: T) -> T {
        tokio::task::yield_now().await;
        result
    }

    /// See [`DatastoreBackend::allocate_ids`].
    ///
    /// # Errors
    ///
    /// As for the backend.
    pub async fn allocate_ids(&self, key: &Key, count: usize) -> CoreResult<AllocateIdsResponse> {
        Self::deliver(self.inner.allocate_ids(key, count)).await
    }

    /// See [`DatastoreBackend::get`].
    ///
    /// # Errors
    ///
    /// As for the backend.
    pub async fn get(&self, keys: &[Key]) -> CoreResult<Vec<Entity>> {
        Self::deliver(self.inner.get(keys)).await
    }

    /// See [`DatastoreBackend::save`].
    ///
    /// # Errors
    ///
    /// As for the backend.
    pub async fn save(&self, writes: Vec<EntityWrite>) -> CoreResult<CommitResponse> {
        Self::deliver(self.inner.save(writes)).await
    }

    /// See [`DatastoreBackend::insert`].
    ///
    /// # Errors
    ///
    /// As for the backend.
    pub async fn insert(&self, writes: Vec<EntityWrite>) -> CoreResult<CommitResponse> {
        Self::deliver(self.inner.insert(writes)).await
    }

    /// See [`DatastoreBackend::update`].
    ///
    /// # Errors
    ///
    /// As for the backend.
    pub async fn update(&self, writes: Vec<EntityWrite>) -> CoreResult<CommitResponse> {
        Self::deliver(self.inner.update(writes)).await
    }

    /// See [`DatastoreBackend::upsert`].
    ///
    /// # Errors
    ///
    /// As for the backend.
    pub async fn upsert(&self, writes: Vec<EntityWrite>) -> CoreResult<CommitResponse> {
        Self::deliver(self.inner.upsert(writes)).await
    }

    /// See [`DatastoreBackend::delete`].
    ///
    /// # Errors
    ///
    /// As for the backend.
    pub async fn delete(&self, keys: &[Key]) -> CoreResult<CommitResponse> {
        Self::deliver(self.inner.delete(keys)).await
    }

    /// See [`DatastoreBackend::merge`].
    ///
    /// # Errors
    ///
    /// As for the backend.
    pub async fn merge(&self, writes: Vec<EntityWrite>) -> CoreResult<CommitResponse> {
        Self::deliver(self.inner.merge(writes)).await
    }

    /// See [`DatastoreBackend::run_query`].
    ///
    /// # Errors
    ///
    /// As for the backend.
    pub async fn run_query(&self, query: &Query) -> CoreResult<(Vec<Entity>, QueryInfo)> {
        Self::deliver(self.inner.run_query(query)).await
    }

    /// Opens a transaction on the backend. Handles are synchronous.
    pub fn transaction(&self, options: TransactionOptions) -> B::Transaction<'_> {
        self.inner.transaction(options)
    }

    /// See [`DatastoreBackend::wipe`].
    pub async fn wipe(&self) {
        self.inner.wipe();
        Self::deliver(()).await;
    }
}
