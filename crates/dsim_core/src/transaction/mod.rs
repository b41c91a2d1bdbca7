//! Transactions that queue writes until commit.
//!
//! A [`Transaction`] records every write as a [`PendingMutation`] and
//! replays the queue on [`Transaction::commit`]. There is no isolation:
//! - Reads go straight to the store and see writes made outside the handle
//! - Queued writes are invisible, even to the handle itself, until commit
//! - Nothing detects conflicts between concurrent handles

mod state;

pub use state::{TransactionMode, TransactionOptions, TransactionState};

use crate::datastore::Datastore;
use crate::entity::{Entity, EntityWrite, MutationMode};
use crate::error::{CoreError, CoreResult};
use crate::key::{Key, KeyCodec};
use crate::mutation::{CommitResponse, PendingMutation};
use crate::query::{Query, QueryInfo};
use crate::types::TransactionId;
use tracing::debug;

/// A single-use transaction handle.
#[derive(Debug)]
pub struct Transaction<'a> {
    store: &'a Datastore,
    id: TransactionId,
    mode: TransactionMode,
    state: TransactionState,
    skip_commit: bool,
    pending: Vec<PendingMutation>,
}

impl<'a> Transaction<'a> {
    pub(crate) fn new(store: &'a Datastore, options: TransactionOptions) -> Self {
        Self {
            store,
            id: options.id.unwrap_or_else(TransactionId::random),
            mode: options.mode,
            state: TransactionState::Open,
            skip_commit: false,
            pending: Vec::new(),
        }
    }

    /// Returns the transaction id.
    #[must_use]
    pub fn id(&self) -> &TransactionId {
        &self.id
    }

    /// Returns the access mode.
    #[must_use]
    pub fn mode(&self) -> TransactionMode {
        self.mode
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Whether the handle still accepts operations.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state == TransactionState::Open
    }

    /// Queued mutations in submission order.
    #[must_use]
    pub fn pending(&self) -> &[PendingMutation] {
        &self.pending
    }

    /// Begins or resumes the transaction context and returns the handle.
    ///
    /// Applies the mode and, when given, the id from `options`. The table is
    /// not touched.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidOperation` if the handle is closed.
    pub fn run(mut self, options: TransactionOptions) -> CoreResult<Self> {
        self.state.ensure_open()?;
        self.mode = options.mode;
        if let Some(id) = options.id {
            self.id = id;
        }
        debug!(id = %self.id, mode = ?self.mode, "transaction running");
        Ok(self)
    }

    /// Reads entities from the store, bypassing the queue.
    ///
    /// # Errors
    ///
    /// See [`Datastore::get`].
    pub fn get(&self, keys: &[Key]) -> CoreResult<Vec<Entity>> {
        self.store.get(keys)
    }

    /// Runs a query against the store, bypassing the queue.
    ///
    /// # Errors
    ///
    /// See [`Datastore::run_query`].
    pub fn run_query(&self, query: &Query) -> CoreResult<(Vec<Entity>, QueryInfo)> {
        self.store.run_query(query)
    }

    /// Queues one command per entity, following each entity's declared mode.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidOperation` on a closed handle or
    /// `InvalidArgument` if any key is malformed. Nothing is queued on
    /// failure.
    pub fn save(&mut self, writes: Vec<EntityWrite>) -> CoreResult<()> {
        let writes = self.prepare(writes)?;
        self.pending.extend(
            writes
                .into_iter()
                .map(|w| PendingMutation::save(w.mode(), vec![w])),
        );
        Ok(())
    }

    /// Queues an insert.
    ///
    /// # Errors
    ///
    /// As for [`Transaction::save`].
    pub fn insert(&mut self, writes: Vec<EntityWrite>) -> CoreResult<()> {
        self.enqueue(MutationMode::Insert, writes)
    }

    /// Queues an update.
    ///
    /// # Errors
    ///
    /// As for [`Transaction::save`].
    pub fn update(&mut self, writes: Vec<EntityWrite>) -> CoreResult<()> {
        self.enqueue(MutationMode::Update, writes)
    }

    /// Queues an upsert.
    ///
    /// # Errors
    ///
    /// As for [`Transaction::save`].
    pub fn upsert(&mut self, writes: Vec<EntityWrite>) -> CoreResult<()> {
        self.enqueue(MutationMode::Upsert, writes)
    }

    /// Queues a delete.
    ///
    /// # Errors
    ///
    /// As for [`Transaction::save`].
    pub fn delete(&mut self, keys: &[Key]) -> CoreResult<()> {
        self.state.ensure_open()?;
        let keys = keys
            .iter()
            .map(KeyCodec::canonicalize)
            .collect::<CoreResult<Vec<_>>>()?;
        self.pending.push(PendingMutation::Delete(keys));
        Ok(())
    }

    /// Applies the queue in submission order.
    ///
    /// A rolled-back handle commits as a no-op.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidOperation` if the handle was already committed.
    pub fn commit(&mut self) -> CoreResult<CommitResponse> {
        if self.skip_commit {
            debug!(id = %self.id, "commit skipped");
            return Ok(CommitResponse::default());
        }
        self.state.ensure_open()?;

        let pending = std::mem::take(&mut self.pending);
        let commands = pending.len();
        match self.store.apply(pending) {
            Ok(response) => {
                self.state = TransactionState::Committed;
                debug!(id = %self.id, commands, mutations = response.index_updates, "transaction committed");
                Ok(response)
            }
            Err(err) => {
                self.state = TransactionState::RolledBack;
                Err(err)
            }
        }
    }

    /// Discards the queue without touching the table.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidOperation` if the handle was already committed.
    pub fn rollback(&mut self) -> CoreResult<()> {
        if self.state == TransactionState::Committed {
            return Err(CoreError::invalid_operation(
                "transaction already committed",
            ));
        }
        let discarded = self.pending.len();
        self.pending.clear();
        self.state = TransactionState::RolledBack;
        self.skip_commit = true;
        debug!(id = %self.id, discarded, "transaction rolled back");
        Ok(())
    }

    fn enqueue(&mut self, mode: MutationMode, writes: Vec<EntityWrite>) -> CoreResult<()> {
        let writes = self.prepare(writes)?;
        self.pending.push(PendingMutation::save(
            mode,
            writes.into_iter().map(|w| w.with_method(mode)).collect(),
        ));
        Ok(())
    }

    fn prepare(&self, writes: Vec<EntityWrite>) -> CoreResult<Vec<EntityWrite>> {
        self.state.ensure_open()?;
        writes
            .into_iter()
            .map(|mut write| {
                write.key = KeyCodec::canonicalize(&write.key)?;
                Ok(write)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Properties;
    use crate::key::Identifier;
    use dsim_codec::Value;

    fn write(id: i64, n: i64) -> EntityWrite {
        let mut data = Properties::new();
        data.insert("n".into(), Value::Integer(n));
        EntityWrite::new(Key::new("Person", id), data)
    }

    #[test]
    fn new_transaction_is_open() {
        let db = Datastore::new();
        let txn = db.transaction(TransactionOptions::default());
        assert!(txn.is_open());
        assert_eq!(txn.mode(), TransactionMode::ReadWrite);
        assert!(txn.pending().is_empty());
    }

    #[test]
    fn writes_invisible_until_commit() {
        let db = Datastore::new();
        let mut txn = db.transaction(TransactionOptions::default());
        txn.upsert(vec![write(1, 1)]).unwrap();

        assert!(txn.get(&[Key::new("Person", 1)]).unwrap().is_empty());
        let response = txn.commit().unwrap();

        assert_eq!(response.index_updates, 1);
        assert_eq!(db.get(&[Key::new("Person", 1)]).unwrap().len(), 1);
        assert_eq!(txn.state(), TransactionState::Committed);
    }

    #[test]
    fn reads_see_outside_writes() {
        let db = Datastore::new();
        let txn = db.transaction(TransactionOptions::default());
        db.save(vec![write(1, 1)]).unwrap();
        assert_eq!(txn.get(&[Key::new("Person", 1)]).unwrap().len(), 1);
    }

    #[test]
    fn save_queues_one_command_per_entity() {
        let db = Datastore::new();
        let mut txn = db.transaction(TransactionOptions::default());
        txn.save(vec![
            write(1, 1).with_method(MutationMode::Insert),
            write(2, 2),
        ])
        .unwrap();

        assert_eq!(txn.pending().len(), 2);
        assert!(matches!(txn.pending()[0], PendingMutation::Insert(_)));
        assert!(matches!(txn.pending()[1], PendingMutation::Upsert(_)));
    }

    #[test]
    fn queue_replays_in_order() {
        let db = Datastore::new();
        let mut txn = db.transaction(TransactionOptions::default());
        txn.insert(vec![write(1, 1)]).unwrap();
        txn.delete(&[Key::new("Person", 1)]).unwrap();
        txn.update(vec![write(2, 2)]).unwrap();
        let response = txn.commit().unwrap();

        assert_eq!(response.mutation_results.len(), 3);
        assert!(db.get(&[Key::new("Person", 1)]).unwrap().is_empty());
        assert_eq!(db.len(), 1);
    }

    #[test]
    fn rollback_discards_and_commit_becomes_noop() {
        let db = Datastore::new();
        let mut txn = db.transaction(TransactionOptions::default());
        txn.upsert(vec![write(1, 1)]).unwrap();
        txn.rollback().unwrap();

        assert!(txn.pending().is_empty());
        assert_eq!(txn.state(), TransactionState::RolledBack);
        assert_eq!(txn.commit().unwrap(), CommitResponse::default());
        assert!(db.is_empty());
    }

    #[test]
    fn double_commit_fails() {
        let db = Datastore::new();
        let mut txn = db.transaction(TransactionOptions::default());
        txn.commit().unwrap();
        let err = txn.commit().unwrap_err();
        assert!(matches!(err, CoreError::InvalidOperation { .. }));
        assert!(txn.rollback().is_err());
    }

    #[test]
    fn closed_handle_rejects_writes() {
        let db = Datastore::new();
        let mut txn = db.transaction(TransactionOptions::default());
        txn.rollback().unwrap();
        assert!(txn.upsert(vec![write(1, 1)]).is_err());
        assert!(txn.delete(&[Key::new("Person", 1)]).is_err());
    }

    #[test]
    fn malformed_keys_fail_at_enqueue() {
        let db = Datastore::new();
        let mut txn = db.transaction(TransactionOptions::default());
        let bad = EntityWrite::new(
            Key::new("Person", Identifier::Int("x".into())),
            Properties::new(),
        );
        assert!(txn.save(vec![write(1, 1), bad]).unwrap_err().is_invalid_argument());
        assert!(txn.pending().is_empty());
    }

    #[test]
    fn run_applies_options() {
        let db = Datastore::new();
        let txn = db
            .transaction(TransactionOptions::default())
            .run(TransactionOptions::read_only().resume(TransactionId::new("prev")))
            .unwrap();
        assert_eq!(txn.mode(), TransactionMode::ReadOnly);
        assert_eq!(txn.id().as_str(), "prev");
        assert!(db.is_empty());
    }

    #[test]
    fn commit_assigns_ids_to_incomplete_keys() {
        let db = Datastore::new();
        let mut txn = db.transaction(TransactionOptions::default());
        txn.insert(vec![EntityWrite::new(Key::incomplete("Person"), Properties::new())])
            .unwrap();
        let response = txn.commit().unwrap();
        let key = response.keys().next().cloned().unwrap();
        assert!(key.is_complete());
        assert_eq!(db.get(&[key]).unwrap().len(), 1);
    }
}
