use serde_json::{Map, Value};

/// Overlays `override_value` onto `base`. Objects merge key by key; any
/// other override replaces the base unless it is null. Null members of an
/// override object are copied through.
pub fn merge_deep(base: &Value, override_value: &Value) -> Value {
    let (Value::Object(base_map), Value::Object(override_map)) = (base, override_value) else {
        if !override_value.is_null() {
            return override_value.clone();
        }
        return base.clone();
    };

    let mut result: Map<String, Value> = base_map.clone();
    for (key, value) in override_map {
        let merged = match (result.get(key), value) {
            (Some(existing @ Value::Object(_)), Value::Object(_)) => merge_deep(existing, value),
            _ => value.clone(),
        };
        result.insert(key.clone(), merged);
    }
    Value::Object(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_objects_merge_and_scalars_replace() {
        let base = json!({"clientId": "a", "extra": {"keep": 1, "swap": 1}, "other": true});
        let patch = json!({"clientId": "b", "extra": {"swap": 2}});
        assert_eq!(
            merge_deep(&base, &patch),
            json!({"clientId": "b", "extra": {"keep": 1, "swap": 2}, "other": true})
        );
    }

    #[test]
    fn non_object_base_is_replaced() {
        assert_eq!(merge_deep(&json!([1]), &json!({"a": 1})), json!({"a": 1}));
        assert_eq!(merge_deep(&json!({"a": 1}), &Value::Null), json!({"a": 1}));
    }
}
