//! Test fixtures and datastore helpers.
//!
//! Provides a preconfigured store, JSON seeding, and tracing setup for
//! tests.

use dsim_core::{
    CommitResponse, Config, CoreError, CoreResult, Datastore, EntityWrite, Identifier, Key,
    Properties, Value,
};
use std::collections::BTreeMap;
use std::sync::Once;
use tracing_subscriber::EnvFilter;

/// Namespace used by [`TestDatastore`].
pub const TEST_NAMESPACE: &str = "test";

/// Project id used by [`TestDatastore`].
pub const TEST_PROJECT_ID: &str = "project-id";

/// Installs a `tracing` subscriber for tests.
///
/// Honors `RUST_LOG` and defaults to `warn`. Safe to call from every test.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// A store in the `test` namespace with a fixed project id.
pub struct TestDatastore {
    /// The store instance.
    pub db: Datastore,
}

impl TestDatastore {
    /// Creates an empty test store.
    pub fn new() -> Self {
        init_tracing();
        Self {
            db: Datastore::with_config(
                Config::new()
                    .namespace(TEST_NAMESPACE)
                    .project_id(TEST_PROJECT_ID),
            ),
        }
    }

    /// Creates a test store seeded from a JSON document.
    ///
    /// See [`seed_json`] for the format.
    pub fn seeded(json: &str) -> Self {
        let store = Self::new();
        seed_json(&store.db, json).expect("Failed to seed test store");
        store
    }

    /// Builds a key in the test namespace.
    pub fn key(&self, path: Vec<Identifier>) -> Key {
        self.db.key(path).expect("Invalid test key path")
    }
}

impl Default for TestDatastore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestDatastore {
    type Target = Datastore;

    fn deref(&self) -> &Self::Target {
        &self.db
    }
}

/// Runs a test with a fresh [`TestDatastore`].
pub fn with_test_store<F, R>(f: F) -> R
where
    F: FnOnce(&Datastore) -> R,
{
    let store = TestDatastore::new();
    f(&store.db)
}

/// Converts a JSON value into a property value.
///
/// Integral numbers become integers, other numbers doubles; objects become
/// maps.
pub fn json_to_value(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => n
            .as_i64()
            .map(Value::Integer)
            .or_else(|| n.as_f64().map(Value::Double))
            .unwrap_or(Value::Null),
        serde_json::Value::String(s) => Value::Text(s.clone()),
        serde_json::Value::Array(items) => Value::Array(items.iter().map(json_to_value).collect()),
        serde_json::Value::Object(fields) => Value::Map(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), json_to_value(v)))
                .collect::<BTreeMap<_, _>>(),
        ),
    }
}

fn json_to_identifier(json: &serde_json::Value) -> CoreResult<Identifier> {
    match json {
        serde_json::Value::String(s) => Ok(Identifier::Name(s.clone())),
        serde_json::Value::Number(n) => n
            .as_i64()
            .map(Identifier::Id)
            .ok_or_else(|| CoreError::invalid_argument(format!("invalid id {n}"))),
        other => Err(CoreError::invalid_argument(format!(
            "invalid path element {other}"
        ))),
    }
}

/// Saves the entities described by a JSON array into `db`.
///
/// Each element is `{"path": [kind, id, ...], "data": {...}}`; keys are
/// placed in the store's default namespace.
///
/// ```
/// use dsim_testkit::{seed_json, TestDatastore};
///
/// let store = TestDatastore::new();
/// seed_json(&store, r#"[{"path": ["Person", 1], "data": {"name": "ada"}}]"#).unwrap();
/// assert_eq!(store.len(), 1);
/// ```
///
/// # Errors
///
/// Fails with `InvalidArgument` on malformed JSON or keys.
pub fn seed_json(db: &Datastore, json: &str) -> CoreResult<CommitResponse> {
    let doc: serde_json::Value = serde_json::from_str(json)
        .map_err(|e| CoreError::invalid_argument(format!("invalid seed JSON: {e}")))?;
    let items = doc
        .as_array()
        .ok_or_else(|| CoreError::invalid_argument("seed JSON must be an array"))?;

    let mut writes = Vec::with_capacity(items.len());
    for item in items {
        let path = item
            .get("path")
            .and_then(serde_json::Value::as_array)
            .ok_or_else(|| CoreError::invalid_argument("seed entry needs a path array"))?
            .iter()
            .map(json_to_identifier)
            .collect::<CoreResult<Vec<_>>>()?;
        let data: Properties = match item.get("data") {
            Some(serde_json::Value::Object(fields)) => fields
                .iter()
                .map(|(k, v)| (k.clone(), json_to_value(v)))
                .collect(),
            None => Properties::new(),
            Some(_) => return Err(CoreError::invalid_argument("seed data must be an object")),
        };
        writes.push(EntityWrite::new(db.key(path)?, data));
    }
    db.save(writes)
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;

    /// A store holding `count` `Person` entities with ids `1..=count` and an
    /// `age` property equal to `20 + id`.
    pub fn people(count: i64) -> TestDatastore {
        let store = TestDatastore::new();
        let writes = (1..=count)
            .map(|id| {
                let mut data = Properties::new();
                data.insert("age".into(), Value::Integer(20 + id));
                EntityWrite::new(store.key(dsim_core::path!["Person", id]), data)
            })
            .collect();
        store.save(writes).expect("Failed to save people");
        store
    }

    /// A `Person` with pets and a `Person` whose id shares a decimal prefix.
    ///
    /// Layout: `Person/1` with pets `Pet/1` and `Pet/2`, the grandchild
    /// `Person/1/Pet/1/Toy/"ball"`, and `Person/10` with `Pet/3`.
    pub fn family() -> TestDatastore {
        TestDatastore::seeded(
            r#"[
                {"path": ["Person", 1], "data": {"name": "ada"}},
                {"path": ["Person", 1, "Pet", 1], "data": {"name": "rex"}},
                {"path": ["Person", 1, "Pet", 2], "data": {"name": "tom"}},
                {"path": ["Person", 1, "Pet", 1, "Toy", "ball"], "data": {}},
                {"path": ["Person", 10], "data": {"name": "bob"}},
                {"path": ["Person", 10, "Pet", 3], "data": {"name": "fin"}}
            ]"#,
        )
    }
}
