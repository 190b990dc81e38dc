//! Deep merge of JSON manifests.

use serde_json::Value;

/// Merge `patch` into `target`.
///
/// Objects merge key by key, recursively. Anything else in `patch`
/// (scalars, `null`, arrays) replaces the value in `target`; arrays are
/// never concatenated.
pub fn deep_merge(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                match target.get_mut(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        target.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (target, patch) => *target = patch.clone(),
    }
}

/// Return a copy of `base` with `patch` merged in.
pub fn merged(base: &Value, patch: &Value) -> Value {
    let mut out = base.clone();
    deep_merge(&mut out, patch);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_objects_merge() {
        let base = json!({"a": 1, "b": {"c": 2}});
        let out = merged(&base, &json!({"b": {"d": 3}}));
        assert_eq!(out, json!({"a": 1, "b": {"c": 2, "d": 3}}));
    }

    #[test]
    fn patch_leaves_win() {
        let base = json!({"metadata": {"name": "old", "tags": {"x": 1}}});
        let out = merged(&base, &json!({"metadata": {"name": "new"}}));
        assert_eq!(out, json!({"metadata": {"name": "new", "tags": {"x": 1}}}));
    }

    #[test]
    fn arrays_are_replaced() {
        let base = json!({"components": ["b1", "b2", "b3"]});
        let out = merged(&base, &json!({"components": ["b4"]}));
        assert_eq!(out, json!({"components": ["b4"]}));
    }

    #[test]
    fn null_overwrites_and_object_replaces_scalar() {
        let base = json!({"a": {"b": 1}, "c": 5});
        let out = merged(&base, &json!({"a": null, "c": {"d": 1}}));
        assert_eq!(out, json!({"a": null, "c": {"d": 1}}));
    }

    #[test]
    fn base_is_untouched() {
        let base = json!({"a": 1});
        let _ = merged(&base, &json!({"a": 2}));
        assert_eq!(base, json!({"a": 1}));
    }
}
