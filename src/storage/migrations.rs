use std::path::PathBuf;

use serde_json::Value;

use crate::storage::StorageError;

type MigrationFn = fn(Value) -> Result<Value, StorageError>;

fn get_migrations() -> Vec<MigrationFn> {
    vec![migrate_v1_to_v2]
}

/// Returns 1 if the version field is missing: the v1 layout (tasks plus the
/// id counter, no specifications) predates versioned schemas.
pub fn detect_version(content: &str) -> Result<u32, StorageError> {
    let value: Value = serde_json::from_str(content).map_err(|e| StorageError::ParseFailed {
        path: PathBuf::from("<unknown>"),
        source: e,
    })?;

    match value.get("version") {
        Some(v) => v.as_u64().map(|n| n as u32).ok_or_else(|| {
            // serde_json::Error has no public constructor, so manufacture one
            let dummy_err = serde_json::from_str::<Value>("invalid").unwrap_err();
            StorageError::ParseFailed {
                path: PathBuf::from("<unknown>"),
                source: dummy_err,
            }
        }),
        None => Ok(1),
    }
}

/// Migrations are applied sequentially: v1 -> v2 -> ... -> target
pub fn apply_migrations(
    mut data: Value,
    from_version: u32,
    to_version: u32,
) -> Result<Value, StorageError> {
    if from_version == to_version {
        return Ok(data);
    }

    if from_version > to_version {
        return Err(StorageError::FutureVersion(from_version));
    }

    let migrations = get_migrations();

    for version in from_version..to_version {
        let migration_idx = (version - 1) as usize; // v1 -> v2 is at index 0

        if migration_idx >= migrations.len() {
            return Err(StorageError::UnsupportedVersion(version));
        }

        data = migrations[migration_idx](data)?;
    }

    Ok(data)
}

/// v1 stores carried only tasks and the id counter. v2 adds the
/// specification list and gives every task a checklist and an optional
/// specification reference.
fn migrate_v1_to_v2(mut value: Value) -> Result<Value, StorageError> {
    if let Some(obj) = value.as_object_mut() {
        obj.insert("version".to_string(), Value::from(2));

        if !obj.contains_key("task_id_counter") {
            obj.insert("task_id_counter".to_string(), Value::from(0));
        }

        if !obj.contains_key("specifications") {
            obj.insert("specifications".to_string(), Value::Array(vec![]));
        }

        if let Some(tasks) = obj.get_mut("tasks").and_then(|t| t.as_array_mut()) {
            for task in tasks {
                if let Some(task_obj) = task.as_object_mut() {
                    if !task_obj.contains_key("subtasks") {
                        task_obj.insert("subtasks".to_string(), Value::Array(vec![]));
                    }
                    if !task_obj.contains_key("specification_id") {
                        task_obj.insert("specification_id".to_string(), Value::Null);
                    }
                }
            }
        }
    }

    Ok(value)
}
