//! Deep merge of configuration values.
//!
//! # Precedence
//!
//! The overlay always wins. Values are combined as follows:
//!
//! | base      | overlay   | result                                   |
//! |-----------|-----------|------------------------------------------|
//! | mapping   | mapping   | merged key by key, recursively           |
//! | sequence  | sequence  | base items followed by overlay items     |
//! | anything  | anything  | overlay replaces base (including `null`) |

use serde_json::{Map, Value};

/// Merge `overlay` into `base` in place.
pub fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => merge_maps(base, overlay),
        (Value::Array(base), Value::Array(overlay)) => base.extend(overlay),
        (base, overlay) => *base = overlay,
    }
}

/// Merge the entries of `overlay` into `base` in place.
pub fn merge_maps(base: &mut Map<String, Value>, overlay: Map<String, Value>) {
    for (key, value) in overlay {
        match base.get_mut(&key) {
            Some(existing) => deep_merge(existing, value),
            None => {
                base.insert(key, value);
            }
        }
    }
}

/// Human-readable kind of a value, for error messages.
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}

/// Look up the value at `path`, descending through mappings only.
pub fn get_path<'a>(root: &'a Map<String, Value>, path: &[String]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    let mut current = root.get(first)?;
    for key in rest {
        current = current.as_object()?.get(key)?;
    }
    Some(current)
}

/// Store `value` at `path`, replacing whatever is there.
///
/// Missing intermediate mappings are created; intermediate non-mappings are
/// replaced by empty mappings. An empty path is a no-op.
pub fn set_path(root: &mut Map<String, Value>, path: &[String], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut current = root;
    for key in parents {
        let slot = current
            .entry(key.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        current = match slot {
            Value::Object(map) => map,
            _ => unreachable!("slot was just replaced by a mapping"),
        };
    }
    current.insert(last.clone(), value);
}

/// Whether merging `overlay` would overwrite the value stored at `path`.
///
/// True when the overlay sets `path` itself, or sets a non-mapping value on
/// one of its ancestors (which replaces the whole subtree).
pub fn assigns_path(overlay: &Map<String, Value>, path: &[String]) -> bool {
    let Some((first, rest)) = path.split_first() else {
        return false;
    };
    let mut current = match overlay.get(first) {
        Some(value) => value,
        None => return false,
    };
    for key in rest {
        match current {
            Value::Object(map) => match map.get(key) {
                Some(value) => current = value,
                None => return false,
            },
            _ => return true,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(s: &str) -> Vec<String> {
        s.split('.').map(str::to_owned).collect()
    }

    #[test]
    fn mappings_merge_recursively() {
        let mut base = json!({"tera": {"partials": {"a": "A"}, "keep": 1}});
        deep_merge(&mut base, json!({"tera": {"partials": {"b": "B"}}}));
        assert_eq!(
            base,
            json!({"tera": {"partials": {"a": "A", "b": "B"}, "keep": 1}})
        );
    }

    #[test]
    fn sequences_concatenate() {
        let mut base = json!({"scss": {"main": ["a.scss"]}});
        deep_merge(&mut base, json!({"scss": {"main": ["b.scss"]}}));
        assert_eq!(base, json!({"scss": {"main": ["a.scss", "b.scss"]}}));
    }

    #[test]
    fn scalars_and_mismatches_replace() {
        let mut base = json!({"a": 1, "b": {"x": 1}, "c": [1]});
        deep_merge(&mut base, json!({"a": "one", "b": null, "c": {"y": 2}}));
        assert_eq!(base, json!({"a": "one", "b": null, "c": {"y": 2}}));
    }

    #[test]
    fn set_path_creates_intermediate_mappings() {
        let mut root = Map::new();
        set_path(&mut root, &path("tera.data"), json!({"title": "Hello"}));
        assert_eq!(Value::Object(root), json!({"tera": {"data": {"title": "Hello"}}}));
    }

    #[test]
    fn set_path_replaces_non_mapping_parent() {
        let mut root = json!({"tera": "oops"}).as_object().cloned().unwrap();
        set_path(&mut root, &path("tera.data"), json!(1));
        assert_eq!(Value::Object(root), json!({"tera": {"data": 1}}));
    }

    #[test]
    fn get_path_descends_mappings_only() {
        let root = json!({"tera": {"data": [1, 2]}}).as_object().cloned().unwrap();
        assert_eq!(get_path(&root, &path("tera.data")), Some(&json!([1, 2])));
        assert_eq!(get_path(&root, &path("tera.data.0")), None);
        assert_eq!(get_path(&root, &[]), None);
    }

    #[test]
    fn assigns_path_detects_direct_and_ancestor_writes() {
        let direct = json!({"tera": {"data": {}}}).as_object().cloned().unwrap();
        let ancestor = json!({"tera": false}).as_object().cloned().unwrap();
        let sibling = json!({"tera": {"partials": {}}}).as_object().cloned().unwrap();
        assert!(assigns_path(&direct, &path("tera.data")));
        assert!(assigns_path(&ancestor, &path("tera.data")));
        assert!(!assigns_path(&sibling, &path("tera.data")));
    }
}
