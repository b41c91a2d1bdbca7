//! The in-memory datastore facade.

use crate::allocation::AllocateIdsResponse;
use crate::config::Config;
use crate::entity::{Entity, EntityTable, EntityWrite};
use crate::error::{CoreError, CoreResult};
use crate::external::{EnvProjectId, LegacyKeyCodec, ProjectIdResolver, StaticProjectId};
use crate::key::{IdAllocator, Identifier, Key, KeyCodec};
use crate::mutation::{CommitResponse, MutationResult, PendingMutation};
use crate::query::{Query, QueryEngine, QueryInfo};
use crate::transaction::{Transaction, TransactionOptions};
use crate::types::SequenceNumber;
use dsim_codec::Timestamp;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, trace};

/// Everything a write touches, kept behind one lock.
#[derive(Debug)]
struct StoreState {
    table: EntityTable,
    ids: IdAllocator,
    versions: SequenceNumber,
}

impl StoreState {
    fn new(config: &Config) -> Self {
        Self {
            table: EntityTable::new(),
            ids: IdAllocator::new(config.id_base),
            versions: SequenceNumber::new(1),
        }
    }

    fn save(&mut self, writes: Vec<EntityWrite>) -> CoreResult<CommitResponse> {
        // Validate every key before the table is touched.
        let keys = writes
            .iter()
            .map(|w| KeyCodec::canonicalize(&w.key))
            .collect::<CoreResult<Vec<_>>>()?;

        let mut results = Vec::with_capacity(writes.len());
        for (write, key) in writes.into_iter().zip(keys) {
            let key = KeyCodec::complete(&key, &mut self.ids)?;
            let canonical = KeyCodec::serialize(&key)?;
            let now = Timestamp::now();
            trace!(key = %key, mode = %write.mode(), "writing entity");
            let created = self
                .table
                .put(canonical, Entity::new(key.clone(), write.data), now);
            results.push(MutationResult {
                key: Some(key),
                version: self.versions.advance().as_u64(),
                conflict_detected: false,
                create_time: Some(created),
                update_time: now,
            });
        }
        Ok(CommitResponse::from_results(results))
    }

    fn delete(&mut self, keys: &[Key]) -> CoreResult<CommitResponse> {
        let canonical = keys
            .iter()
            .map(KeyCodec::serialize)
            .collect::<CoreResult<Vec<_>>>()?;

        let mut results = Vec::with_capacity(canonical.len());
        for key in &canonical {
            if self.table.remove(key).is_none() {
                trace!("delete of absent key ignored");
            }
            results.push(MutationResult {
                key: None,
                version: self.versions.advance().as_u64(),
                conflict_detected: false,
                create_time: None,
                update_time: Timestamp::now(),
            });
        }
        Ok(CommitResponse::from_results(results))
    }

    fn apply(&mut self, mutation: PendingMutation) -> CoreResult<CommitResponse> {
        match mutation {
            PendingMutation::Insert(writes)
            | PendingMutation::Update(writes)
            | PendingMutation::Upsert(writes) => self.save(writes),
            PendingMutation::Delete(keys) => self.delete(&keys),
        }
    }

    fn wipe(&mut self) {
        self.table.clear();
        self.ids.reset();
        self.versions = SequenceNumber::new(1);
    }
}

/// An in-memory emulation of a hierarchical document store.
///
/// Writes made directly through the store apply immediately. Writes made
/// through a [`Transaction`] are queued and applied on commit.
///
/// ```
/// use dsim_core::{path, Datastore, EntityWrite, Properties};
///
/// let db = Datastore::new();
/// let key = db.key(path!["Person", 2]).unwrap();
/// db.save(vec![EntityWrite::new(key.clone(), Properties::new())]).unwrap();
///
/// let found = db.get(&[key]).unwrap();
/// assert_eq!(found[0].key().path(), vec!["Person", "2"]);
/// ```
pub struct Datastore {
    config: Config,
    state: RwLock<StoreState>,
    legacy_codec: Option<Arc<dyn LegacyKeyCodec>>,
    project_ids: Arc<dyn ProjectIdResolver>,
}

impl Datastore {
    /// Creates an empty store with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates an empty store configured from the environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::with_config(Config::from_env())
    }

    /// Creates an empty store with `config`.
    ///
    /// A configured project id is used as is; otherwise the project id is
    /// read from `DATASTORE_PROJECT_ID` when needed.
    #[must_use]
    pub fn with_config(config: Config) -> Self {
        let project_ids: Arc<dyn ProjectIdResolver> = match &config.project_id {
            Some(id) => Arc::new(StaticProjectId::new(id.clone())),
            None => Arc::new(EnvProjectId::default()),
        };
        Self {
            state: RwLock::new(StoreState::new(&config)),
            config,
            legacy_codec: None,
            project_ids,
        }
    }

    /// Installs the codec used for legacy url-safe keys.
    #[must_use]
    pub fn legacy_key_codec(mut self, codec: impl LegacyKeyCodec + 'static) -> Self {
        self.legacy_codec = Some(Arc::new(codec));
        self
    }

    /// Replaces the project id source.
    #[must_use]
    pub fn project_id_resolver(mut self, resolver: impl ProjectIdResolver + 'static) -> Self {
        self.project_ids = Arc::new(resolver);
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Default namespace applied by [`Datastore::key`] and
    /// [`Datastore::create_query`].
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.config.namespace.as_deref()
    }

    /// Resolves the project id.
    ///
    /// # Errors
    ///
    /// Fails with `ProjectId` if the resolver cannot produce one.
    pub fn project_id(&self) -> CoreResult<String> {
        self.project_ids.project_id()
    }

    /// Number of stored entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().table.len()
    }

    /// Whether the store holds no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.read().table.is_empty()
    }

    /// Builds a key from a flat path in the default namespace.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidArgument` for an empty path or a non-text kind.
    pub fn key<I>(&self, path: I) -> CoreResult<Key>
    where
        I: IntoIterator<Item = Identifier>,
    {
        self.key_in(self.config.namespace.clone(), path)
    }

    /// Builds a key from a flat path in `namespace`.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidArgument` for an empty path or a non-text kind.
    pub fn key_in<I>(&self, namespace: Option<String>, path: I) -> CoreResult<Key>
    where
        I: IntoIterator<Item = Identifier>,
    {
        Ok(Key::from_path(path)?.with_namespace(namespace))
    }

    /// Starts a query over `kind` in the default namespace.
    pub fn create_query(&self, kind: impl Into<String>) -> Query {
        Query::in_namespace(self.config.namespace.clone(), kind)
    }

    /// Allocates `count` complete keys shaped like `key`.
    ///
    /// The keys share `key`'s parent path, kind, and namespace; each gets a
    /// fresh id. A count of zero allocates one key.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidArgument` if `key` is malformed, or with
    /// `InvalidOperation` when the id space is exhausted.
    pub fn allocate_ids(&self, key: &Key, count: usize) -> CoreResult<AllocateIdsResponse> {
        let key = KeyCodec::canonicalize(key)?;
        let parent = key.parent();
        let namespace = key.namespace().map(str::to_string);
        let project_id = self.project_id().unwrap_or_default();
        let count = count.max(1);

        let mut response = AllocateIdsResponse::with_capacity(count);
        let mut state = self.state.write();
        for _ in 0..count {
            let id = state.ids.next_id()?;
            let allocated = match &parent {
                Some(parent) => parent.child(key.kind(), id),
                None => Key::new(key.kind(), id),
            };
            response.push(allocated.with_namespace(namespace.clone()), &project_id, id);
        }
        debug!(kind = key.kind(), count, "allocated ids");
        Ok(response)
    }

    /// Looks up entities by key.
    ///
    /// See [`EntityTable::lookup`] for duplicate and missing key handling.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidArgument` if `keys` is empty or a key is
    /// malformed.
    pub fn get(&self, keys: &[Key]) -> CoreResult<Vec<Entity>> {
        let found = self.state.read().table.lookup(keys)?;
        trace!(requested = keys.len(), found = found.len(), "get");
        Ok(found)
    }

    /// Writes entities, assigning ids to incomplete keys.
    ///
    /// Every mode overwrites unconditionally. Either all keys are valid and
    /// every entity is written, or nothing is.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidArgument` if any key is malformed.
    pub fn save(&self, writes: Vec<EntityWrite>) -> CoreResult<CommitResponse> {
        let count = writes.len();
        let response = self.state.write().save(writes)?;
        debug!(count, "saved entities");
        Ok(response)
    }

    /// Deletes entities. Absent keys are ignored.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidArgument` if any key is malformed.
    pub fn delete(&self, keys: &[Key]) -> CoreResult<CommitResponse> {
        let response = self.state.write().delete(keys)?;
        debug!(count = keys.len(), "deleted entities");
        Ok(response)
    }

    /// Partial updates are not emulated.
    ///
    /// # Errors
    ///
    /// Always fails with `NotImplemented`.
    pub fn merge(&self, _writes: Vec<EntityWrite>) -> CoreResult<CommitResponse> {
        Err(CoreError::not_implemented("merge"))
    }

    /// Runs a query.
    ///
    /// # Errors
    ///
    /// See [`QueryEngine::run`].
    pub fn run_query(&self, query: &Query) -> CoreResult<(Vec<Entity>, QueryInfo)> {
        QueryEngine::run(&self.state.read().table, query)
    }

    /// Opens a transaction handle.
    #[must_use]
    pub fn transaction(&self, options: TransactionOptions) -> Transaction<'_> {
        Transaction::new(self, options)
    }

    /// Runs `f` in a fresh transaction, committing on success and rolling
    /// back on error.
    ///
    /// # Errors
    ///
    /// Returns the error from `f` or from the commit.
    pub fn run_in_transaction<F, T>(&self, f: F) -> CoreResult<T>
    where
        F: FnOnce(&mut Transaction<'_>) -> CoreResult<T>,
    {
        let mut txn = self.transaction(TransactionOptions::default());
        match f(&mut txn) {
            Ok(value) => {
                txn.commit()?;
                Ok(value)
            }
            Err(err) => {
                txn.rollback()?;
                Err(err)
            }
        }
    }

    /// Drops every entity and restarts id and version sequences.
    pub fn wipe(&self) {
        self.state.write().wipe();
        debug!("store wiped");
    }

    /// Encodes `key` in the legacy url-safe form.
    ///
    /// # Errors
    ///
    /// Fails with `NotImplemented` when no codec is installed, `ProjectId`
    /// when the project id cannot be resolved, or with the codec's error.
    pub fn key_to_legacy_url_safe(
        &self,
        key: &Key,
        location_prefix: Option<&str>,
    ) -> CoreResult<String> {
        let codec = self.legacy_codec()?;
        let project_id = self.project_id()?;
        codec.encode(&project_id, key, location_prefix)
    }

    /// Decodes a legacy url-safe key.
    ///
    /// # Errors
    ///
    /// Fails with `NotImplemented` when no codec is installed, or with the
    /// codec's error.
    pub fn key_from_legacy_url_safe(&self, text: &str) -> CoreResult<Key> {
        self.legacy_codec()?.decode(text)
    }

    fn legacy_codec(&self) -> CoreResult<&dyn LegacyKeyCodec> {
        self.legacy_codec
            .as_deref()
            .ok_or_else(|| CoreError::not_implemented("legacy url-safe keys"))
    }

    /// Replays queued mutations in order under one write lock.
    pub(crate) fn apply(&self, mutations: Vec<PendingMutation>) -> CoreResult<CommitResponse> {
        let mut response = CommitResponse::default();
        let mut state = self.state.write();
        for mutation in mutations {
            response.extend(state.apply(mutation)?);
        }
        Ok(response)
    }
}

impl Default for Datastore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Datastore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Datastore")
            .field("config", &self.config)
            .field("entity_count", &self.len())
            .field("legacy_codec", &self.legacy_codec.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_ID_BASE;
    use crate::entity::{MutationMode, Properties};
    use crate::path;
    use dsim_codec::Value;

    fn create_db() -> Datastore {
        Datastore::with_config(Config::new().namespace("test").project_id("project-id"))
    }

    fn write(key: Key, props: &[(&str, Value)]) -> EntityWrite {
        let data: Properties = props
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect();
        EntityWrite::new(key, data)
    }

    #[test]
    fn save_and_get() {
        let db = create_db();
        let key = db.key(path!["Person", 2]).unwrap();
        db.save(vec![write(key.clone(), &[("name", "ada".into())])])
            .unwrap();

        let found = db.get(&[key]).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].key().path(), vec!["Person", "2"]);
        assert_eq!(found[0].key().namespace(), Some("test"));
        assert_eq!(found[0].get("name"), Some(&Value::from("ada")));
    }

    #[test]
    fn save_completes_incomplete_keys() {
        let db = create_db();
        let key = db.key(path!["Person"]).unwrap();
        let response = db.save(vec![write(key, &[])]).unwrap();

        let saved = response.mutation_results[0].key.clone().unwrap();
        assert_eq!(saved.id(), Some(DEFAULT_ID_BASE));
        assert_eq!(db.get(&[saved]).unwrap().len(), 1);
    }

    #[test]
    fn save_is_all_or_nothing() {
        let db = create_db();
        let good = write(Key::new("Person", 1), &[]);
        let bad = write(Key::new("Person", Identifier::Int("x".into())), &[]);

        assert!(db.save(vec![good, bad]).is_err());
        assert!(db.is_empty());
    }

    #[test]
    fn overwrite_preserves_create_time_and_bumps_version() {
        let db = create_db();
        let key = Key::new("Person", 1);
        let first = db.save(vec![write(key.clone(), &[])]).unwrap();
        let second = db
            .save(vec![write(key, &[]).with_method(MutationMode::Insert)])
            .unwrap();

        let a = &first.mutation_results[0];
        let b = &second.mutation_results[0];
        assert_eq!(a.create_time, b.create_time);
        assert!(b.version > a.version);
        assert!(!b.conflict_detected);
        assert_eq!(db.len(), 1);
    }

    #[test]
    fn delete_absent_is_noop() {
        let db = create_db();
        let response = db.delete(&[Key::new("Nope", 1)]).unwrap();
        assert_eq!(response.mutation_results.len(), 1);
        assert!(response.mutation_results[0].key.is_none());
        assert!(response.mutation_results[0].create_time.is_none());
    }

    #[test]
    fn stored_copies_are_independent() {
        let db = create_db();
        let key = Key::new("Person", 1);
        let mut original = write(key.clone(), &[("n", Value::Integer(1))]);
        db.save(vec![original.clone()]).unwrap();
        original.data.insert("n".into(), Value::Integer(2));

        let mut found = db.get(&[key.clone()]).unwrap();
        assert_eq!(found[0].get("n"), Some(&Value::Integer(1)));
        found[0].set("n", 3);
        assert_eq!(db.get(&[key]).unwrap()[0].get("n"), Some(&Value::Integer(1)));
    }

    #[test]
    fn allocate_ids_shares_parent_and_kind() {
        let db = create_db();
        let partial = db.key(path!["Team", "red", "Person"]).unwrap();
        let response = db.allocate_ids(&partial, 2).unwrap();

        assert_eq!(response.keys.len(), 2);
        assert_eq!(response.keys[0].id(), Some(DEFAULT_ID_BASE));
        assert_eq!(response.keys[1].id(), Some(DEFAULT_ID_BASE + 1));
        assert_eq!(response.keys[0].parent(), partial.parent());
        assert_eq!(response.metadata[1].path[0].kind, "Person");
        assert_eq!(response.metadata[1].path[0].id_type, "id");
        assert_eq!(response.metadata[0].partition_id.namespace_id, "test");
        assert_eq!(response.metadata[0].partition_id.project_id, "project-id");
        assert_eq!(response.metadata[0].partition_id.database_id, "");
    }

    #[test]
    fn allocate_zero_ids_allocates_one() {
        let db = create_db();
        let response = db.allocate_ids(&Key::incomplete("Person"), 0).unwrap();
        assert_eq!(response.keys.len(), 1);
    }

    #[test]
    fn wipe_resets_everything() {
        let db = create_db();
        db.save(vec![write(Key::incomplete("Person"), &[])]).unwrap();
        db.wipe();

        assert!(db.is_empty());
        let response = db.save(vec![write(Key::incomplete("Person"), &[])]).unwrap();
        let result = &response.mutation_results[0];
        assert_eq!(result.key.as_ref().and_then(Key::id), Some(DEFAULT_ID_BASE));
        assert_eq!(result.version, 1);
    }

    #[test]
    fn merge_is_not_implemented() {
        let db = create_db();
        let err = db.merge(Vec::new()).unwrap_err();
        assert!(matches!(err, CoreError::NotImplemented { .. }));
    }

    #[test]
    fn legacy_keys_need_a_codec() {
        let db = create_db();
        let err = db
            .key_to_legacy_url_safe(&Key::new("Person", 1), None)
            .unwrap_err();
        assert!(matches!(err, CoreError::NotImplemented { .. }));
        assert!(db.key_from_legacy_url_safe("abc").is_err());
    }

    struct PathCodec;

    impl LegacyKeyCodec for PathCodec {
        fn encode(&self, project_id: &str, key: &Key, prefix: Option<&str>) -> CoreResult<String> {
            Ok(format!("{}{project_id}|{}", prefix.unwrap_or(""), key.path().join("/")))
        }

        fn decode(&self, text: &str) -> CoreResult<Key> {
            let (_, path) = text
                .split_once('|')
                .ok_or_else(|| CoreError::invalid_argument("bad key"))?;
            let mut parts = path.split('/');
            let kind = parts.next().unwrap_or_default();
            let name = parts.next().unwrap_or_default();
            Ok(Key::new(kind, name))
        }
    }

    #[test]
    fn legacy_keys_delegate_to_codec() {
        let db = create_db().legacy_key_codec(PathCodec);
        let text = db
            .key_to_legacy_url_safe(&Key::new("Person", "ada"), Some("s~"))
            .unwrap();
        assert_eq!(text, "s~project-id|Person/ada");
        assert_eq!(
            db.key_from_legacy_url_safe(&text).unwrap(),
            Key::new("Person", "ada")
        );
    }

    #[test]
    fn create_query_uses_default_namespace() {
        let db = create_db();
        db.save(vec![write(db.key(path!["Person", 1]).unwrap(), &[])])
            .unwrap();
        db.save(vec![write(Key::new("Person", 2), &[])]).unwrap();

        let (results, _) = db.run_query(&db.create_query("Person")).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].key().id(), Some(1));
    }

    #[test]
    fn run_in_transaction_commits_on_ok() {
        let db = create_db();
        let key = Key::new("Person", 1);
        db.run_in_transaction(|txn| txn.upsert(vec![write(key.clone(), &[])]))
            .unwrap();
        assert_eq!(db.get(&[key]).unwrap().len(), 1);
    }

    #[test]
    fn run_in_transaction_rolls_back_on_err() {
        let db = create_db();
        let result: CoreResult<()> = db.run_in_transaction(|txn| {
            txn.upsert(vec![write(Key::new("Person", 1), &[])])?;
            Err(CoreError::invalid_argument("boom"))
        });
        assert!(result.is_err());
        assert!(db.is_empty());
    }

    #[test]
    fn allocate_ids_reports_exhausted_id_space() {
        let db = Datastore::with_config(Config::new().id_base(i64::MAX));
        let first = db.allocate_ids(&Key::incomplete("Person"), 1).unwrap();
        assert_eq!(first.keys[0].id(), Some(i64::MAX));

        let err = db.allocate_ids(&Key::incomplete("Person"), 1).unwrap_err();
        assert!(matches!(err, CoreError::InvalidOperation { .. }));
    }
}
