//! Model-checking harness.
//!
//! Mirrors every write into a plain map so tests can compare the store
//! against the expected contents.

use dsim_core::{Datastore, EntityWrite, Key, KeyCodec, Properties};
use std::collections::HashMap;

/// A store plus a shadow model of what it should contain.
pub struct ModelHarness {
    /// The store instance.
    pub db: Datastore,
    model: HashMap<Vec<u8>, (Key, Properties)>,
}

impl ModelHarness {
    /// Creates a harness over an empty default store.
    pub fn new() -> Self {
        Self::with_store(Datastore::new())
    }

    /// Creates a harness over `db`, which must be empty.
    pub fn with_store(db: Datastore) -> Self {
        assert!(db.is_empty(), "Harness store must start empty");
        Self {
            db,
            model: HashMap::new(),
        }
    }

    fn model_key(key: &Key) -> Vec<u8> {
        KeyCodec::serialize(key)
            .expect("Invalid key")
            .as_bytes()
            .to_vec()
    }

    /// Saves an entity and records it, returning the completed key.
    pub fn save(&mut self, key: Key, data: Properties) -> Key {
        let response = self
            .db
            .save(vec![EntityWrite::new(key, data.clone())])
            .expect("Failed to save entity");
        let key = response
            .keys()
            .next()
            .cloned()
            .expect("Save should report the completed key");
        self.model.insert(Self::model_key(&key), (key.clone(), data));
        key
    }

    /// Deletes an entity and forgets it.
    pub fn delete(&mut self, key: &Key) {
        self.db
            .delete(std::slice::from_ref(key))
            .expect("Failed to delete entity");
        self.model.remove(&Self::model_key(key));
    }

    /// Reads `key` and checks it against the model.
    pub fn get_and_verify(&self, key: &Key) -> Option<Properties> {
        let found = self
            .db
            .get(std::slice::from_ref(key))
            .expect("Failed to get entity");
        let actual = found.into_iter().next().map(|e| e.into_parts().1);
        let expected = self.model.get(&Self::model_key(key)).map(|(_, p)| p);
        assert_eq!(actual.as_ref(), expected, "Entity mismatch for {key}");
        actual
    }

    /// Checks every tracked entity and the entity count.
    pub fn verify_all(&self) {
        for (key, _) in self.model.values() {
            self.get_and_verify(key);
        }
        assert_eq!(self.db.len(), self.model.len(), "Entity count mismatch");
    }

    /// Number of tracked entities.
    pub fn tracked_count(&self) -> usize {
        self.model.len()
    }
}

impl Default for ModelHarness {
    fn default() -> Self {
        Self::new()
    }
}
