//! Query behavior against seeded stores.

use dsim_core::{path, FilterOp, MoreResults, Query, Value};
use dsim_testkit::{scenarios, TestDatastore};

fn names(entities: &[dsim_core::Entity]) -> Vec<String> {
    entities
        .iter()
        .filter_map(|e| e.get("name").and_then(Value::as_text).map(str::to_string))
        .collect()
}

#[test]
fn ancestor_filter_is_segment_aware() {
    let store = scenarios::family();
    let query = store
        .create_query("Pet")
        .has_ancestor(store.key(path!["Person", 1]));
    let (pets, _) = store.run_query(&query).unwrap();
    assert_eq!(names(&pets), vec!["rex", "tom"]);

    let query = store
        .create_query("Pet")
        .has_ancestor(store.key(path!["Person", 10]));
    let (pets, _) = store.run_query(&query).unwrap();
    assert_eq!(names(&pets), vec!["fin"]);
}

#[test]
fn ancestor_filter_reaches_grandchildren() {
    let store = scenarios::family();
    let query = store
        .create_query("Toy")
        .has_ancestor(store.key(path!["Person", 1]));
    let (toys, _) = store.run_query(&query).unwrap();
    assert_eq!(toys.len(), 1);
    assert_eq!(toys[0].key().name(), Some("ball"));
}

#[test]
fn incomplete_ancestor_matches_every_descendant_of_kind() {
    let store = scenarios::family();
    let query = store
        .create_query("Pet")
        .has_ancestor(store.key(path!["Person"]));
    let (pets, _) = store.run_query(&query).unwrap();
    assert_eq!(names(&pets), vec!["rex", "tom", "fin"]);

    let query = store
        .create_query("Toy")
        .has_ancestor(store.key(path!["Person", 1, "Pet"]));
    let (toys, _) = store.run_query(&query).unwrap();
    assert_eq!(toys.len(), 1);
}

#[test]
fn ancestor_excludes_itself() {
    let store = scenarios::family();
    let query = store
        .create_query("Person")
        .has_ancestor(store.key(path!["Person", 1]));
    assert!(store.run_query(&query).unwrap().0.is_empty());
}

#[test]
fn range_filters() {
    let store = scenarios::people(5);
    let run = |q: Query| {
        store
            .run_query(&q)
            .unwrap()
            .0
            .iter()
            .filter_map(|e| e.key().id())
            .collect::<Vec<_>>()
    };

    assert_eq!(run(store.create_query("Person").filter("age", ">=", 24)), vec![4, 5]);
    assert_eq!(run(store.create_query("Person").filter("age", "<", 23)), vec![1, 2]);
    assert_eq!(run(store.create_query("Person").filter("age", "=", 23)), vec![3]);
}

#[test]
fn multiple_filters_union() {
    let store = scenarios::people(5);
    let query = store
        .create_query("Person")
        .filter("age", "<", 23)
        .filter("age", ">=", 22);
    let (results, _) = store.run_query(&query).unwrap();
    let ids: Vec<_> = results.iter().filter_map(|e| e.key().id()).collect();
    assert_eq!(ids, vec![1, 2, 2, 3, 4, 5]);
}

#[test]
fn ignored_operators_and_options() {
    let store = scenarios::people(3);
    let query = store
        .create_query("Person")
        .filter("age", FilterOp::NotEqual, 21)
        .filter("age", "IN", 21)
        .limit(1)
        .select(["age"])
        .unwrap();
    let (results, info) = store.run_query(&query).unwrap();
    assert!(results.is_empty());
    assert_eq!(info.more_results, MoreResults::MoreResultsAfterLimit);
    assert!(info.end_cursor.is_none());

    let (all, _) = store
        .run_query(&store.create_query("Person").limit(1))
        .unwrap();
    assert_eq!(all.len(), 3);
}

#[test]
fn queries_are_scoped_to_kind_and_namespace() {
    let store = scenarios::family();
    let outside = Query::new("Person");
    assert!(store.run_query(&outside).unwrap().0.is_empty());

    let (people, _) = store.run_query(&store.create_query("Person")).unwrap();
    assert_eq!(names(&people), vec!["ada", "bob"]);
}

#[test]
fn multi_kind_query_is_rejected() {
    let store = TestDatastore::new();
    let query = store.create_query("Person").kind("Pet");
    assert!(store.run_query(&query).unwrap_err().is_invalid_argument());
}
