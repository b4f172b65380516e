//! # Property-Based Tests
//!
//! Invariants of the mutation operators and the log header codec over
//! generated inputs.

use kestrel_core::{
    Database, EntityKind, ExecutionContext, Expression, KernelConfig, LogFormat, LogHeader,
    MutationOperation, QueryState, SetNodePropertiesFromMap, StoreId, Value, encode_log_header,
    read_log_header,
};
use proptest::collection::btree_map;
use proptest::option;
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::io::Cursor;

// =============================================================================
// STRATEGIES
// =============================================================================

fn format() -> impl Strategy<Value = LogFormat> {
    prop_oneof![
        Just(LogFormat::Compact),
        Just(LogFormat::Extended),
        Just(LogFormat::StoreBound),
    ]
}

fn storable() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        "[a-z]{0,8}".prop_map(Value::String),
    ]
}

/// A map entry is either a storable value or null.
fn entries() -> impl Strategy<Value = BTreeMap<String, Option<Value>>> {
    btree_map("[a-e]", option::of(storable()), 0..5)
}

fn map_expression(entries: &BTreeMap<String, Option<Value>>) -> Expression {
    Expression::map(entries.iter().map(|(k, v)| {
        let expr = v.clone().map_or_else(Expression::null, Expression::Literal);
        (k.clone(), expr)
    }))
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Replace leaves exactly the non-null keys of the map, with their values.
    #[test]
    fn replace_leaves_exactly_non_null_entries(before in entries(), after in entries()) {
        let db = Database::new(&KernelConfig::default());
        let tx = db.begin();
        let node = tx.create_node(&[]).expect("create");
        let mut state = QueryState::new(&tx);
        let mut row = ExecutionContext::new().with("n", Value::Node(node));

        SetNodePropertiesFromMap::new("n", map_expression(&before), false)
            .apply(&mut row, &mut state)
            .expect("seed");
        SetNodePropertiesFromMap::new("n", map_expression(&after), true)
            .apply(&mut row, &mut state)
            .expect("replace");

        let expected: BTreeMap<String, Value> = after
            .into_iter()
            .filter_map(|(k, v)| v.map(|v| (k, v)))
            .collect();
        prop_assert_eq!(
            tx.properties_by_name(EntityKind::Node, node.0).expect("read"),
            expected
        );
    }

    /// Merge keeps every key the map does not mention.
    #[test]
    fn merge_preserves_unmentioned_keys(before in entries(), after in entries()) {
        let db = Database::new(&KernelConfig::default());
        let tx = db.begin();
        let node = tx.create_node(&[]).expect("create");
        let mut state = QueryState::new(&tx);
        let mut row = ExecutionContext::new().with("n", Value::Node(node));

        SetNodePropertiesFromMap::new("n", map_expression(&before), false)
            .apply(&mut row, &mut state)
            .expect("seed");
        let changes = SetNodePropertiesFromMap::new("n", map_expression(&after), false)
            .apply(&mut row, &mut state)
            .expect("merge");

        let props = tx.properties_by_name(EntityKind::Node, node.0).expect("read");
        for (key, value) in &before {
            if let (false, Some(value)) = (after.contains_key(key), value) {
                prop_assert_eq!(props.get(key), Some(value));
            }
        }
        let writes = after.values().filter(|v| v.is_some()).count() as u64;
        prop_assert!(changes >= writes);
    }

    /// Every header decodes to what was encoded.
    #[test]
    fn header_round_trip(
        format in format(),
        log_version in 0u64..(1 << 56),
        last_tx in any::<u64>(),
        random in any::<u64>(),
    ) {
        let store_id = format
            .has_store_id()
            .then(|| StoreId::new(1, random, "record", "standard", 1, 0).expect("store id"));
        let header = LogHeader::new(format, log_version, last_tx, store_id);
        let bytes = encode_log_header(&header).expect("encode");

        let decoded = read_log_header(&mut Cursor::new(&bytes[..]), true, None).expect("read");
        prop_assert_eq!(decoded, Some(header));
    }

    /// Any truncation of a header is incomplete in strict mode and absent
    /// in lenient mode.
    #[test]
    fn truncation_is_incomplete(format in format(), cut in 0usize..128) {
        let store_id = format
            .has_store_id()
            .then(|| StoreId::new(1, 2, "record", "standard", 1, 0).expect("store id"));
        let header = LogHeader::new(format, 3, 4, store_id);
        let bytes = encode_log_header(&header).expect("encode");
        let cut = cut % format.header_size();

        let strict = read_log_header(&mut Cursor::new(&bytes[..cut]), true, None);
        prop_assert!(strict.is_err());
        let lenient = read_log_header(&mut Cursor::new(&bytes[..cut]), false, None);
        prop_assert_eq!(lenient.expect("lenient read"), None);
    }
}
