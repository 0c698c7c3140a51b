//! Deep merge of JSON values.
//!
//! Used for both layers of defaults in the program: configuration tiers
//! (YAML files converted to JSON) and the persisted settings/filter
//! documents, which are merged over their hardcoded defaults on load.

use serde_json::Value;

/// Deep merge two JSON values, with `overlay` taking precedence over `base`.
///
/// - Objects are merged recursively: keys in overlay override keys in base
/// - Arrays, strings, numbers, booleans are replaced entirely
/// - If overlay is null, the base value is preserved (null means "not specified")
///
/// # Example
/// ```
/// use serde_json::json;
/// use focus_tasks::config::deep_merge;
///
/// let defaults = json!({ "idleReminderInterval": 2, "notificationsEnabled": false });
/// let stored = json!({ "notificationsEnabled": true });
/// let merged = deep_merge(defaults, stored);
/// assert_eq!(merged, json!({ "idleReminderInterval": 2, "notificationsEnabled": true }));
/// ```
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged_value = if let Some(base_value) = base_map.remove(&key) {
                    deep_merge(base_value, overlay_value)
                } else {
                    overlay_value
                };
                base_map.insert(key, merged_value);
            }
            Value::Object(base_map)
        }
        (base, Value::Null) => base,
        (_, overlay) => overlay,
    }
}

/// Merge multiple values in order, with later values taking precedence.
pub fn deep_merge_all(values: impl IntoIterator<Item = Value>) -> Value {
    values.into_iter().fold(Value::Null, deep_merge)
}
