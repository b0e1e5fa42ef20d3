//! Inverse properties for the list/map transcoder.

use std::collections::BTreeSet;

use formwork_core::{array_to_object, deep_array_to_object, object_to_array};
use proptest::prelude::*;
use serde_json::{Value, json};

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(|n| json!(n)),
        "[a-z]{0,8}".prop_map(Value::String),
    ]
}

/// Model-shaped values: identifier keys (never all-digit), non-empty lists.
fn model() -> impl Strategy<Value = Value> {
    scalar().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 1..4).prop_map(Value::Array),
            proptest::collection::btree_map("[a-z]{1,6}", inner, 1..4)
                .prop_map(|entries| Value::Object(entries.into_iter().collect())),
        ]
    })
}

/// Keys whose value is an array somewhere in `value`: the set a caller
/// would declare as logical lists.
fn collect_list_keys(value: &Value, keys: &mut BTreeSet<String>) {
    match value {
        Value::Object(entries) => {
            for (key, entry) in entries {
                if entry.is_array() {
                    keys.insert(key.clone());
                }
                collect_list_keys(entry, keys);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_list_keys(item, keys);
            }
        }
        _ => {}
    }
}

fn has_arrays(value: &Value) -> bool {
    match value {
        Value::Array(_) => true,
        Value::Object(entries) => entries.values().any(has_arrays),
        _ => false,
    }
}

proptest! {
    #[test]
    fn deep_conversion_then_restore_is_identity(left in model(), right in model()) {
        let original = json!({"alpha": left, "beta": right});

        let converted = deep_array_to_object(&original);
        prop_assert!(!has_arrays(&converted), "arrays survived deep conversion");

        let mut keys = BTreeSet::new();
        collect_list_keys(&original, &mut keys);
        let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
        prop_assert_eq!(object_to_array(&converted, &keys), original);
    }

    #[test]
    fn plain_list_round_trips_when_targeted(
        items in proptest::collection::vec(scalar(), 1..6)
    ) {
        let as_map = array_to_object(&items);
        let restored = object_to_array(&json!({"tags": as_map}), &["tags"]);
        prop_assert_eq!(restored, json!({"tags": items}));
    }
}

#[test]
fn numeric_contiguous_map_round_trips() {
    let wrapped = json!({"tags": {"0": "a", "1": "b", "2": "c"}});
    let restored = object_to_array(&wrapped, &["tags"]);
    let items = restored["tags"].as_array().expect("restored list");
    assert_eq!(
        array_to_object(items),
        json!({"0": "a", "1": "b", "2": "c"})
    );
}

#[test]
fn untargeted_map_never_converts() {
    // No explicit key, no cascade, no changed children: stays a map even
    // though its keys look like indices.
    let value = json!({"0": "a", "1": "b", "2": "c"});
    assert_eq!(object_to_array(&value, &["x"]), value);
}
