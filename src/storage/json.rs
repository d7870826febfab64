use std::{
    fs::{self, OpenOptions, rename, write},
    path::{Path, PathBuf},
};

use fs2::FileExt;
use serde_json::to_string_pretty;
use uuid::Uuid;

use crate::{
    models::store::Store,
    storage::{Storage, StorageError},
};

/// Number of timestamped backups kept next to the store file
const MAX_BACKUPS: usize = 5;

pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn create_backup_dir(&self) -> Result<(), StorageError> {
        let backups_dir = self.get_backup_dir();
        fs::create_dir(&backups_dir).map_err(|e| StorageError::BackupFailed {
            path: backups_dir,
            source: e,
        })?;
        Ok(())
    }

    fn create_backup(&self) -> Result<u64, StorageError> {
        let file_exists = fs::exists(&self.path).map_err(|e| StorageError::BackupFailed {
            path: self.path.clone(),
            source: e,
        })?;
        if !file_exists {
            return Ok(0);
        }

        let backup_path = self.get_backup_path();
        match fs::copy(&self.path, &backup_path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.create_backup_dir()?;
                self.create_backup()
            }
            Err(e) => Err(StorageError::BackupFailed {
                path: backup_path,
                source: e,
            }),
            Ok(bytes) => Ok(bytes),
        }
    }

    fn cleanup_old_backups(&self) -> Result<(), StorageError> {
        let backup_dir = self.get_backup_dir();
        let backup_dir_exists =
            fs::exists(&backup_dir).map_err(|e| StorageError::CleanupFailed {
                dir: backup_dir.clone(),
                source: e,
            })?;
        if !backup_dir_exists {
            return Ok(());
        }

        let mut file_entries = fs::read_dir(&backup_dir)
            .map_err(|e| StorageError::CleanupFailed {
                dir: backup_dir.clone(),
                source: e,
            })?
            .flatten()
            .filter(|entry| entry.metadata().map(|m| m.is_file()).unwrap_or(false))
            .map(|entry| entry.path())
            .collect::<Vec<_>>();

        file_entries.sort();

        let excess = file_entries.len().saturating_sub(MAX_BACKUPS);
        for file_path in &file_entries[0..excess] {
            fs::remove_file(file_path).map_err(|e| StorageError::CleanupFailed {
                dir: backup_dir.clone(),
                source: e,
            })?;
        }

        Ok(())
    }

    fn get_backup_dir(&self) -> PathBuf {
        let parent_store_path = self.path.parent().unwrap_or(Path::new("."));
        parent_store_path.join("backups")
    }

    fn get_backup_path(&self) -> PathBuf {
        let backups_dir = self.get_backup_dir();

        let timestamp = jiff::Timestamp::now().to_string();
        let filename = format!("{:?}-{}", self.path.file_name(), timestamp);

        backups_dir.join(filename)
    }
}

impl Storage for JsonFileStorage {
    fn load(&self) -> Result<Store, StorageError> {
        use crate::models::store::CURRENT_VERSION;
        use crate::storage::migrations::{apply_migrations, detect_version};

        match std::fs::read_to_string(&self.path) {
            Ok(content) => {
                let file_version = detect_version(&content)?;

                if file_version > CURRENT_VERSION {
                    return Err(StorageError::FutureVersion(file_version));
                }

                let mut data: serde_json::Value =
                    serde_json::from_str(&content).map_err(|e| StorageError::ParseFailed {
                        path: self.path.clone(),
                        source: e,
                    })?;

                if file_version < CURRENT_VERSION {
                    log::info!(
                        "Migrating store from schema v{} to v{}",
                        file_version,
                        CURRENT_VERSION
                    );
                    data = apply_migrations(data, file_version, CURRENT_VERSION)?;
                }

                if let Some(obj) = data.as_object_mut() {
                    obj.insert("version".to_string(), serde_json::json!(CURRENT_VERSION));
                }

                let store: Store =
                    serde_json::from_value(data).map_err(|e| StorageError::ParseFailed {
                        path: self.path.clone(),
                        source: e,
                    })?;
                Ok(store)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Store::default()),
            Err(e) => Err(StorageError::LoadFailed {
                path: self.path.clone(),
                source: e,
            }),
        }
    }

    fn save(&self, store: &Store) -> Result<(), StorageError> {
        let json =
            to_string_pretty(store).map_err(|e| StorageError::SerializeFailed { source: e })?;

        // Write to a unique temp file, then rename under an exclusive lock so
        // concurrent invocations never interleave partial writes.
        let unique_temp = format!("{}.tmp.{}", self.path.display(), Uuid::new_v4());
        let temp_path = PathBuf::from(&unique_temp);
        write(&temp_path, json).map_err(|e| StorageError::SaveFailed {
            path: temp_path.clone(),
            source: e,
        })?;

        let lock_file_path = self.path.with_extension("lock");
        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .open(&lock_file_path)
            .map_err(|e| StorageError::SaveFailed {
                path: lock_file_path.clone(),
                source: e,
            })?;
        lock_file
            .lock_exclusive()
            .map_err(|e| StorageError::SaveFailed {
                path: lock_file_path,
                source: e,
            })?;

        self.create_backup()?;
        self.cleanup_old_backups()?;

        rename(&temp_path, &self.path).map_err(|e| StorageError::SaveFailed {
            path: self.path.clone(),
            source: e,
        })?;

        lock_file.unlock().map_err(|e| StorageError::SaveFailed {
            path: self.path.clone(),
            source: e,
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use jiff::Timestamp;
    use jiff::civil::date;

    use crate::models::{
        specification::Specification,
        task::{Status, Task, UNASSIGNED},
    };

    fn sample_task(id: u64, title: &str) -> Task {
        Task {
            id,
            title: title.to_string(),
            deadline: date(2026, 3, 1),
            status: Status::InProgress,
            domain: "development".to_string(),
            condition: None,
            duration: "2d".to_string(),
            difficulty: 4,
            priority: 92,
            assignee: UNASSIGNED.to_string(),
            created_at: Timestamp::now(),
            progress: 25,
            subtasks: vec![],
            specification_id: None,
        }
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("store.json"));

        let spec = Specification {
            id: "task-management".to_string(),
            title: "Task Management System".to_string(),
            description: "Complete CRUD".to_string(),
            category: "features".to_string(),
            priority: 98,
            status: Status::Completed,
            task_ids: vec![1],
            created_at: Timestamp::now(),
        };
        let mut task = sample_task(1, "Wire up the store");
        task.specification_id = Some(spec.id.clone());

        let store = Store {
            version: crate::models::store::CURRENT_VERSION,
            task_id_counter: 1,
            tasks: vec![task],
            specifications: vec![spec],
        };

        storage.save(&store).unwrap();
        let loaded = storage.load().unwrap();

        assert_eq!(loaded.task_id_counter, 1);
        assert_eq!(loaded.tasks[0].id, 1);
        assert_eq!(loaded.tasks[0].title, "Wire up the store");
        // dates rehydrate to equivalent values
        assert_eq!(loaded.tasks[0].deadline, date(2026, 3, 1));
        assert_eq!(
            loaded.tasks[0].created_at.as_second(),
            store.tasks[0].created_at.as_second()
        );
        assert_eq!(loaded.specifications[0].task_ids, vec![1]);
    }

    #[test]
    fn test_load_missing_file_yields_default_store() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("absent.json"));

        let store = storage.load().unwrap();
        assert!(store.tasks.is_empty());
        assert_eq!(store.task_id_counter, 0);
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "{ this is not valid json }").unwrap();

        let storage = JsonFileStorage::new(path);
        let result = storage.load();

        match result {
            Err(StorageError::ParseFailed { .. }) => {}
            _ => panic!("Expected ParseFailed error, got something else"),
        }
    }

    #[test]
    fn test_load_v1_store_migrates_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let v1_json = r#"{
            "task_id_counter": 2,
            "tasks": [
                {
                    "id": 2,
                    "title": "Legacy task",
                    "deadline": "2025-12-24",
                    "status": "not-started",
                    "domain": "design",
                    "condition": null,
                    "duration": "1w",
                    "difficulty": 6,
                    "priority": 85,
                    "assignee": "unassigned",
                    "created_at": "2025-12-01T09:00:00Z",
                    "progress": 0
                }
            ]
        }"#;
        std::fs::write(&path, v1_json).unwrap();

        let storage = JsonFileStorage::new(path);
        let store = storage.load().unwrap();

        assert_eq!(store.version, crate::models::store::CURRENT_VERSION);
        assert_eq!(store.task_id_counter, 2);
        assert!(store.specifications.is_empty());
        assert!(store.tasks[0].subtasks.is_empty());
        assert!(store.tasks[0].specification_id.is_none());
    }

    #[test]
    fn test_load_future_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let future_json = r#"{
            "version": 999,
            "task_id_counter": 0,
            "tasks": [],
            "specifications": []
        }"#;
        std::fs::write(&path, future_json).unwrap();

        let storage = JsonFileStorage::new(path);
        match storage.load() {
            Err(StorageError::FutureVersion(999)) => {}
            _ => panic!("Expected FutureVersion(999) error"),
        }
    }

    #[test]
    fn test_backup_creation_and_cleanup() {
        let dir = tempfile::tempdir().unwrap();
        let store_path = dir.path().join("store.json");
        let storage = JsonFileStorage::new(store_path.clone());

        for i in 1..=7 {
            let mut store = Store::default();
            store.task_id_counter = i;

            storage.save(&store).unwrap();

            std::thread::sleep(std::time::Duration::from_millis(10));
        }

        let backups_dir = dir.path().join("backups");
        let backup_count = fs::read_dir(&backups_dir)
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.metadata().map(|m| m.is_file()).unwrap_or(false))
            .count();

        assert_eq!(backup_count, MAX_BACKUPS, "Should keep exactly {} backups", MAX_BACKUPS);
    }
}
