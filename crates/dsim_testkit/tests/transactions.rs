//! Transaction queueing, commit, and rollback.

use dsim_core::{
    path, CoreError, EntityWrite, PendingMutation, Properties, TransactionOptions,
    TransactionState, Value,
};
use dsim_testkit::{scenarios, TestDatastore};

fn write(store: &TestDatastore, id: i64, n: i64) -> EntityWrite {
    let mut data = Properties::new();
    data.insert("n".into(), Value::Integer(n));
    EntityWrite::new(store.key(path!["Person", id]), data)
}

#[test]
fn commit_applies_queue_in_order() {
    let store = TestDatastore::new();
    let mut txn = store.transaction(TransactionOptions::default());
    txn.upsert(vec![write(&store, 1, 1)]).unwrap();
    txn.upsert(vec![write(&store, 1, 2)]).unwrap();
    txn.insert(vec![write(&store, 2, 1)]).unwrap();
    txn.delete(&[store.key(path!["Person", 2])]).unwrap();

    assert!(store.is_empty());
    let response = txn.commit().unwrap();

    assert_eq!(response.index_updates, 4);
    let found = store.get(&[store.key(path!["Person", 1])]).unwrap();
    assert_eq!(found[0].get("n"), Some(&Value::Integer(2)));
    assert!(store.get(&[store.key(path!["Person", 2])]).unwrap().is_empty());
}

#[test]
fn reads_are_not_isolated() {
    let store = scenarios::people(1);
    let txn = store.transaction(TransactionOptions::read_only());
    store.delete(&[store.key(path!["Person", 1])]).unwrap();

    assert!(txn.get(&[store.key(path!["Person", 1])]).unwrap().is_empty());
    assert!(txn.run_query(&store.create_query("Person")).unwrap().0.is_empty());
}

#[test]
fn rollback_then_commit_is_noop() {
    let store = TestDatastore::new();
    let mut txn = store.transaction(TransactionOptions::default());
    txn.save(vec![write(&store, 1, 1)]).unwrap();
    txn.rollback().unwrap();

    let response = txn.commit().unwrap();
    assert!(response.mutation_results.is_empty());
    assert_eq!(txn.state(), TransactionState::RolledBack);
    assert!(store.is_empty());
}

#[test]
fn second_commit_fails() {
    let store = TestDatastore::new();
    let mut txn = store.transaction(TransactionOptions::default());
    txn.save(vec![write(&store, 1, 1)]).unwrap();
    txn.commit().unwrap();

    assert!(matches!(
        txn.commit(),
        Err(CoreError::InvalidOperation { .. })
    ));
    assert!(txn.save(vec![write(&store, 2, 1)]).is_err());
    assert_eq!(store.len(), 1);
}

#[test]
fn save_respects_declared_modes() {
    let store = TestDatastore::new();
    let mut txn = store.transaction(TransactionOptions::default());
    txn.save(vec![
        write(&store, 1, 1).with_method("insert".parse().unwrap()),
        write(&store, 2, 1).with_method("update".parse().unwrap()),
        write(&store, 3, 1),
    ])
    .unwrap();

    let kinds: Vec<&str> = txn
        .pending()
        .iter()
        .map(|m| match m {
            PendingMutation::Insert(_) => "insert",
            PendingMutation::Update(_) => "update",
            PendingMutation::Upsert(_) => "upsert",
            PendingMutation::Delete(_) => "delete",
        })
        .collect();
    assert_eq!(kinds, vec!["insert", "update", "upsert"]);
    assert_eq!(txn.commit().unwrap().mutation_results.len(), 3);
}

#[test]
fn incomplete_keys_complete_on_commit() {
    let store = TestDatastore::new();
    let mut txn = store.transaction(TransactionOptions::default());
    txn.insert(vec![EntityWrite::new(store.key(path!["Person"]), Properties::new())])
        .unwrap();
    assert!(store.is_empty());

    let response = txn.commit().unwrap();
    let key = response.keys().next().cloned().unwrap();
    assert!(key.is_complete());
    assert_eq!(store.get(&[key]).unwrap().len(), 1);
}

#[test]
fn run_returns_usable_handle() {
    let store = TestDatastore::new();
    let mut txn = store
        .transaction(TransactionOptions::default())
        .run(TransactionOptions::default())
        .unwrap();
    txn.upsert(vec![write(&store, 1, 1)]).unwrap();
    txn.commit().unwrap();
    assert_eq!(store.len(), 1);
}
