//! Recursive content merge.

use crate::models::StructuredContent;
use serde_json::Value;

/// Merge `source` into `target`, source over target.
///
/// Keys whose values are objects on both sides merge recursively; every
/// other value in `source` overwrites (or creates) the key in `target`.
pub fn merge_content(target: &mut StructuredContent, source: &StructuredContent) {
    for (key, value) in source {
        match (target.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                merge_content(existing, incoming);
            }
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn content(value: Value) -> StructuredContent {
        value.as_object().cloned().unwrap()
    }

    fn merged(target: Value, source: Value) -> Value {
        let mut target = content(target);
        merge_content(&mut target, &content(source));
        Value::Object(target)
    }

    #[test]
    fn test_empty_source_is_identity() {
        let cases = [
            json!({}),
            json!({"vision": "Lead the market"}),
            json!({"a": {"b": {"c": [1, 2]}}, "d": null}),
        ];

        for target in cases {
            assert_eq!(merged(target.clone(), json!({})), target);
        }
    }

    #[test]
    fn test_deep_merge_overwrites_leaves() {
        assert_eq!(
            merged(json!({"a": {"b": 1, "c": 2}}), json!({"a": {"b": 9}})),
            json!({"a": {"b": 9, "c": 2}})
        );
    }

    #[test]
    fn test_source_value_replaces_mismatched_shapes() {
        assert_eq!(
            merged(json!({"a": "text"}), json!({"a": {"b": 1}})),
            json!({"a": {"b": 1}})
        );
        assert_eq!(
            merged(json!({"a": {"b": 1}}), json!({"a": "text"})),
            json!({"a": "text"})
        );
    }

    #[test]
    fn test_merge_is_not_commutative() {
        let left = json!({"vision": "A", "approach": "B"});
        let right = json!({"vision": "C"});

        assert_eq!(merged(left.clone(), right.clone())["vision"], "C");
        assert_eq!(merged(right, left)["vision"], "A");
    }

    #[test]
    fn test_arbitrary_depth() {
        assert_eq!(
            merged(
                json!({"a": {"b": {"c": {"d": 1, "e": 2}}}}),
                json!({"a": {"b": {"c": {"d": 3}, "f": 4}}})
            ),
            json!({"a": {"b": {"c": {"d": 3, "e": 2}, "f": 4}}})
        );
    }
}
