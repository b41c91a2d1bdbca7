//! Property-based test generators using proptest.
//!
//! Provides strategies for keys, property values, and property maps that
//! satisfy the store's invariants.

use dsim_core::{Identifier, Key, PathSegment, Properties, Timestamp, Value};
use proptest::prelude::*;

/// Strategy for generating entity kinds.
pub fn kind_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Z][a-zA-Z]{0,11}").expect("Invalid regex")
}

/// Strategy for generating namespaces, including none.
pub fn namespace_strategy() -> impl Strategy<Value = Option<String>> {
    prop::option::of(prop::string::string_regex("[a-z]{1,8}").expect("Invalid regex"))
}

/// Strategy for generating identifiers in every authoring form.
pub fn identifier_strategy() -> impl Strategy<Value = Identifier> {
    prop_oneof![
        any::<i64>().prop_map(Identifier::Id),
        prop::string::string_regex("[a-z0-9_-]{1,12}")
            .expect("Invalid regex")
            .prop_map(Identifier::Name),
        any::<i64>().prop_map(|n| Identifier::Int(n.to_string())),
    ]
}

/// Strategy for generating complete keys with up to `max_depth` segments.
pub fn key_strategy(max_depth: usize) -> impl Strategy<Value = Key> {
    (
        namespace_strategy(),
        prop::collection::vec(
            (kind_strategy(), identifier_strategy()),
            1..=max_depth.max(1),
        ),
    )
        .prop_map(|(namespace, segments)| {
            let segments = segments
                .into_iter()
                .map(|(kind, id)| PathSegment::new(kind, Some(id)))
                .collect();
            Key::from_segments(namespace, segments)
        })
}

/// Strategy for generating incomplete keys with a complete ancestor path.
pub fn incomplete_key_strategy(max_depth: usize) -> impl Strategy<Value = Key> {
    (key_strategy(max_depth), kind_strategy())
        .prop_map(|(parent, kind)| parent.incomplete_child(kind))
}

/// Strategy for generating timestamps with microsecond precision.
pub fn timestamp_strategy() -> impl Strategy<Value = Timestamp> {
    (-62_135_596_800i64..253_402_300_799i64, 0i64..1_000_000)
        .prop_map(|(seconds, micros)| Timestamp::new(seconds, micros * 1_000))
}

/// Strategy for generating scalar property values.
pub fn scalar_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Integer),
        prop::num::f64::NORMAL.prop_map(Value::Double),
        prop::string::string_regex("[ -~]{0,24}")
            .expect("Invalid regex")
            .prop_map(Value::Text),
        prop::collection::vec(any::<u8>(), 0..32).prop_map(Value::Bytes),
        timestamp_strategy().prop_map(Value::Timestamp),
    ]
}

/// Strategy for generating property values, nested up to three levels.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    scalar_value_strategy().prop_recursive(3, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..6).prop_map(Value::Map),
        ]
    })
}

/// Strategy for generating entity property maps.
pub fn properties_strategy() -> impl Strategy<Value = Properties> {
    prop::collection::btree_map("[a-z][a-z0-9_]{0,9}", value_strategy(), 0..8)
}
