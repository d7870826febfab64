use std::path::{Path, PathBuf};

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    models::{store::Store, task::Task},
    storage::{Storage, StorageError},
};

/// Format version of the export document
pub const EXPORT_VERSION: &str = "1.0";

#[derive(Serialize, Deserialize)]
pub struct ExportDocument {
    pub tasks: Vec<Task>,
    #[serde(rename = "exportDate")]
    pub export_date: Timestamp,
    pub version: String,
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to serialize export document: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write export file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Write the full task list to `path` as a standalone JSON document.
/// Returns the number of exported tasks.
pub fn export_tasks(store: &Store, path: &Path) -> Result<usize, ExportError> {
    let document = ExportDocument {
        tasks: store.tasks.clone(),
        export_date: Timestamp::now(),
        version: EXPORT_VERSION.to_string(),
    };

    let json = serde_json::to_string_pretty(&document)?;
    std::fs::write(path, json).map_err(|e| ExportError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(document.tasks.len())
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Failed to read import file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Import file is not a valid export document: {0}")]
    InvalidFormat(#[from] serde_json::Error),

    #[error("Unsupported export document version '{0}'")]
    UnsupportedVersion(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Replace the task list with the document's contents. The id counter is
/// bumped past the highest imported id so later creations cannot collide,
/// and the task/specification association is rebuilt from the imported
/// records.
pub fn import_tasks(
    store: &mut Store,
    storage: &impl Storage,
    path: &Path,
) -> Result<usize, ImportError> {
    let content = std::fs::read_to_string(path).map_err(|e| ImportError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    let document: ExportDocument = serde_json::from_str(&content)?;

    if document.version != EXPORT_VERSION {
        return Err(ImportError::UnsupportedVersion(document.version));
    }

    let imported = document.tasks.len();
    store.tasks = document.tasks;

    let max_id = store.tasks.iter().map(|t| t.id).max().unwrap_or(0);
    if store.task_id_counter < max_id {
        store.task_id_counter = max_id;
    }

    rebuild_associations(store);

    storage.save(store)?;

    Ok(imported)
}

/// Recompute every specification's task set from the imported task records,
/// clearing references to specifications that no longer exist.
fn rebuild_associations(store: &mut Store) {
    for spec in &mut store.specifications {
        spec.task_ids.clear();
    }

    let links: Vec<(u64, String)> = store
        .tasks
        .iter()
        .filter_map(|t| t.specification_id.clone().map(|s| (t.id, s)))
        .collect();

    for (task_id, spec_id) in links {
        match store.get_specification_mut(&spec_id) {
            Some(spec) => spec.task_ids.push(task_id),
            None => {
                if let Some(task) = store.get_task_mut(task_id) {
                    task.specification_id = None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use jiff::civil::date;

    use crate::models::{
        specification::Specification,
        task::{Status, UNASSIGNED},
    };

    struct NoopStorage;

    impl Storage for NoopStorage {
        fn load(&self) -> Result<Store, StorageError> {
            Ok(Store::default())
        }

        fn save(&self, _store: &Store) -> Result<(), StorageError> {
            Ok(())
        }
    }

    fn task(id: u64, spec: Option<&str>) -> Task {
        Task {
            id,
            title: format!("Task {id}"),
            deadline: date(2026, 4, 1),
            status: Status::NotStarted,
            domain: "development".to_string(),
            condition: None,
            duration: "1d".to_string(),
            difficulty: 5,
            priority: 50,
            assignee: UNASSIGNED.to_string(),
            created_at: Timestamp::now(),
            progress: 0,
            subtasks: vec![],
            specification_id: spec.map(|s| s.to_string()),
        }
    }

    #[test]
    fn test_export_then_import_round_trips_tasks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.json");

        let mut store = Store::default();
        store.tasks.push(task(1, None));
        store.tasks.push(task(2, None));
        store.task_id_counter = 2;

        let exported = export_tasks(&store, &path).unwrap();
        assert_eq!(exported, 2);

        let mut fresh = Store::default();
        let imported = import_tasks(&mut fresh, &NoopStorage, &path).unwrap();

        assert_eq!(imported, 2);
        assert_eq!(fresh.tasks.len(), 2);
        assert_eq!(fresh.tasks[0].deadline, date(2026, 4, 1));
        // counter bumped so new ids cannot collide with imported ones
        assert_eq!(fresh.task_id_counter, 2);
    }

    #[test]
    fn test_export_document_carries_version_and_date() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.json");

        let store = Store::default();
        export_tasks(&store, &path).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["version"], "1.0");
        assert!(raw["exportDate"].is_string());
        assert!(raw["tasks"].is_array());
    }

    #[test]
    fn test_import_rejects_malformed_documents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bogus.json");
        std::fs::write(&path, r#"{"not": "an export"}"#).unwrap();

        let mut store = Store::default();
        store.tasks.push(task(1, None));

        let result = import_tasks(&mut store, &NoopStorage, &path);
        assert!(matches!(result, Err(ImportError::InvalidFormat(_))));
        // store untouched on failure
        assert_eq!(store.tasks.len(), 1);
    }

    #[test]
    fn test_import_rebuilds_specification_links() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.json");

        let mut source = Store::default();
        source.tasks.push(task(1, Some("alpha")));
        source.tasks.push(task(2, Some("ghost-spec")));
        export_tasks(&source, &path).unwrap();

        let mut store = Store::default();
        store.specifications.push(Specification {
            id: "alpha".to_string(),
            title: "Alpha".to_string(),
            description: "spec".to_string(),
            category: "features".to_string(),
            priority: 50,
            status: Status::NotStarted,
            task_ids: vec![99],
            created_at: Timestamp::now(),
        });

        import_tasks(&mut store, &NoopStorage, &path).unwrap();

        assert_eq!(store.get_specification("alpha").unwrap().task_ids, vec![1]);
        // a reference to a spec this store never knew gets cleared
        assert!(store.get_task(2).unwrap().specification_id.is_none());
    }
}
