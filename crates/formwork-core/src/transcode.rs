//! Standalone list/map transcoding functions.
//!
//! A host form representation without a first-class list type stores ordered
//! lists as numeric-keyed maps (`{"0": …, "1": …}`). These functions convert
//! between the two shapes at the model's input/output boundary. They are
//! pure: inputs are never mutated, and nothing here fails — ambiguous shapes
//! stay objects.
//!
//! `object_to_array` is selective: callers declare *which* keys hold logical
//! lists so that record keys which merely look numeric (postal codes, years)
//! are not mistaken for indices. Once a targeted key is found, conversion
//! cascades through everything nested beneath it.

use serde_json::{Map, Value};

/// Convert a list to a numeric-keyed map, one level deep.
///
/// Index order follows the list's iteration order. No recursion.
pub fn array_to_object(items: &[Value]) -> Value {
    let mut map = Map::new();
    for (index, item) in items.iter().enumerate() {
        map.insert(index.to_string(), item.clone());
    }
    Value::Object(map)
}

/// Convert every array reachable inside `value` to a numeric-keyed map.
///
/// Arrays nested in maps nested in arrays are all converted; non-array,
/// non-object values pass through unchanged.
pub fn deep_array_to_object(value: &Value) -> Value {
    match value {
        Value::Array(items) => {
            let mut map = Map::new();
            for (index, item) in items.iter().enumerate() {
                map.insert(index.to_string(), deep_array_to_object(item));
            }
            Value::Object(map)
        }
        Value::Object(entries) => {
            let mut map = Map::new();
            for (key, entry) in entries {
                map.insert(key.clone(), deep_array_to_object(entry));
            }
            Value::Object(map)
        }
        other => other.clone(),
    }
}

/// Restore numeric-keyed maps under the targeted keys to ordered lists.
///
/// A numeric-keyed map converts iff its own key is in `list_keys`
/// ("explicit"), an ancestor map converted ("cascade"), or any of its nested
/// values changed during the walk ("children changed"). Maps with
/// non-numeric keys are walked but never themselves converted.
///
/// If the final result is a single-entry map whose one value is an array of
/// object elements and whose key was explicitly targeted, that array is
/// returned directly rather than the wrapping map.
pub fn object_to_array(value: &Value, list_keys: &[&str]) -> Value {
    let (restored, _) = restore(value, None, list_keys, false);
    collapse_single_list(restored, list_keys)
}

fn restore(
    value: &Value,
    own_key: Option<&str>,
    list_keys: &[&str],
    cascade: bool,
) -> (Value, bool) {
    match value {
        Value::Object(entries) => {
            let explicit = own_key.is_some_and(|key| list_keys.contains(&key));
            let child_cascade = cascade || explicit;
            let mut children = Vec::with_capacity(entries.len());
            let mut any_child_changed = false;
            for (key, entry) in entries {
                let (child, changed) = restore(entry, Some(key), list_keys, child_cascade);
                any_child_changed |= changed;
                children.push((key.clone(), child));
            }
            if is_numeric_keyed(entries) && (explicit || cascade || any_child_changed) {
                children.sort_by_key(|(key, _)| numeric_key(key).unwrap_or(usize::MAX));
                let items = children.into_iter().map(|(_, child)| child).collect();
                (Value::Array(items), true)
            } else {
                let map: Map<String, Value> = children.into_iter().collect();
                (Value::Object(map), any_child_changed)
            }
        }
        Value::Array(items) => {
            let mut changed = false;
            let restored = items
                .iter()
                .map(|item| {
                    let (child, child_changed) = restore(item, None, list_keys, cascade);
                    changed |= child_changed;
                    child
                })
                .collect();
            (Value::Array(restored), changed)
        }
        other => (other.clone(), false),
    }
}

/// All-digit keys within `usize` range count as indices; anything else
/// (including an empty map) leaves the shape ambiguous.
fn is_numeric_keyed(entries: &Map<String, Value>) -> bool {
    !entries.is_empty() && entries.keys().all(|key| numeric_key(key).is_some())
}

fn numeric_key(key: &str) -> Option<usize> {
    if !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit()) {
        key.parse::<usize>().ok()
    } else {
        None
    }
}

fn collapse_single_list(value: Value, list_keys: &[&str]) -> Value {
    if let Value::Object(entries) = &value
        && entries.len() == 1
        && let Some((key, inner)) = entries.iter().next()
        && list_keys.contains(&key.as_str())
        && let Value::Array(items) = inner
        && items.iter().all(Value::is_object)
    {
        return inner.clone();
    }
    value
}
