//! Reading and writing the three persisted documents.
//!
//! A missing or malformed entry is logged and replaced by its defaults (an
//! empty task list, default settings, default filters). Backend errors are
//! returned on both reads and writes: loading an empty list after a failed
//! read would let the next save overwrite the stored tasks.

use crate::config::deep_merge;
use crate::store::{FILTERS_KEY, KeyValueStore, SETTINGS_KEY, StoreError, TASKS_KEY};
use crate::types::{FilterState, Settings, Task};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

/// Load the task list. Elements that do not parse as a task are skipped.
pub fn load_tasks(store: &dyn KeyValueStore) -> Result<Vec<Task>, StoreError> {
    let Some(raw) = read_raw(store, TASKS_KEY)? else {
        return Ok(Vec::new());
    };

    let items = match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Array(items)) => items,
        Ok(Value::Null) => return Ok(Vec::new()),
        Ok(other) => {
            warn!(
                key = TASKS_KEY,
                kind = %json_kind(&other),
                "Stored task list is not an array, starting empty"
            );
            return Ok(Vec::new());
        }
        Err(e) => {
            warn!(key = TASKS_KEY, error = %e, "Malformed task list, starting empty");
            return Ok(Vec::new());
        }
    };

    let tasks = items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value::<Task>(item) {
            Ok(task) => Some(task),
            Err(e) => {
                warn!(key = TASKS_KEY, index, error = %e, "Skipping unreadable task entry");
                None
            }
        })
        .collect();
    Ok(tasks)
}

/// Load settings merged over the defaults.
pub fn load_settings(store: &dyn KeyValueStore) -> Result<Settings, StoreError> {
    load_merged(store, SETTINGS_KEY)
}

/// Load list filters merged over the defaults.
pub fn load_filters(store: &dyn KeyValueStore) -> Result<FilterState, StoreError> {
    load_merged(store, FILTERS_KEY)
}

pub fn save_tasks(store: &dyn KeyValueStore, tasks: &[Task]) -> Result<(), StoreError> {
    save_document(store, TASKS_KEY, tasks)
}

pub fn save_settings(store: &dyn KeyValueStore, settings: &Settings) -> Result<(), StoreError> {
    save_document(store, SETTINGS_KEY, settings)
}

pub fn save_filters(store: &dyn KeyValueStore, filters: &FilterState) -> Result<(), StoreError> {
    save_document(store, FILTERS_KEY, filters)
}

fn save_document<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    let json = serde_json::to_string(value)?;
    store.set(key, &json)
}

/// Read `key` and merge it over `T::default()`. Unknown fields survive
/// when `T` keeps them (see [`Settings::extra`]).
fn load_merged<T>(store: &dyn KeyValueStore, key: &str) -> Result<T, StoreError>
where
    T: Serialize + DeserializeOwned + Default,
{
    let Some(raw) = read_raw(store, key)? else {
        return Ok(T::default());
    };

    let stored: Value = match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(e) => {
            warn!(key, error = %e, "Malformed document in storage, using defaults");
            return Ok(T::default());
        }
    };

    let defaults = match serde_json::to_value(T::default()) {
        Ok(value) => value,
        Err(e) => {
            warn!(key, error = %e, "Failed to encode defaults");
            return Ok(T::default());
        }
    };

    match serde_json::from_value(deep_merge(defaults, stored)) {
        Ok(value) => Ok(value),
        Err(e) => {
            warn!(key, error = %e, "Stored document has invalid fields, using defaults");
            Ok(T::default())
        }
    }
}

/// Raw value of `key`; `None` when absent or blank.
fn read_raw(store: &dyn KeyValueStore, key: &str) -> Result<Option<String>, StoreError> {
    let raw = store.get(key)?;
    Ok(raw.filter(|raw| !raw.trim().is_empty()))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
