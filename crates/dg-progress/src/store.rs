//! Reading and writing `plot/progress.json`.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::error::{ProgressError, ProgressResult};
use crate::record::{CURRENT_FORMAT_VERSION, ProgressRecord};

/// Directory under the runtime root that holds the record.
pub const PLOT_DIR: &str = "plot";
/// File name of the record.
pub const PROGRESS_FILE: &str = "progress.json";

/// The progress record of one runtime directory.
#[derive(Debug, Clone)]
pub struct ProgressStore {
    runtime_dir: PathBuf,
    path: PathBuf,
}

impl ProgressStore {
    /// Store for a runtime directory.
    pub fn new(runtime_dir: impl AsRef<Path>) -> Self {
        let runtime_dir = runtime_dir.as_ref().to_path_buf();
        let path = runtime_dir.join(PLOT_DIR).join(PROGRESS_FILE);
        Self { runtime_dir, path }
    }

    /// Runtime directory.
    pub fn runtime_dir(&self) -> &Path {
        &self.runtime_dir
    }

    /// Path of the record file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a record file exists.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Load the record.
    ///
    /// A missing file yields the default record. A file that does not parse,
    /// or parses into something this build cannot use, is moved aside to
    /// `progress.corrupted_<timestamp>.json` and a default record flagged as
    /// corrupted is returned. Nothing is ever guessed from a broken file.
    pub fn load(&self) -> ProgressRecord {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return ProgressRecord::default(),
            Err(e) => {
                tracing::error!(path = %self.path.display(), error = %e, "progress unreadable");
                return ProgressRecord::corrupted(None);
            }
        };

        match serde_json::from_slice::<ProgressRecord>(&bytes) {
            Ok(record) if record.is_supported() => record,
            Ok(record) => {
                tracing::error!(
                    path = %self.path.display(),
                    version = record.format_version,
                    current = record.current_scene_id,
                    next = record.next_scene_id,
                    "progress record unusable"
                );
                ProgressRecord::corrupted(self.quarantine())
            }
            Err(e) => {
                tracing::error!(path = %self.path.display(), error = %e, "progress record corrupted");
                ProgressRecord::corrupted(self.quarantine())
            }
        }
    }

    fn quarantine(&self) -> Option<PathBuf> {
        let dir = self.path.parent()?;
        let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let mut backup = dir.join(format!("progress.corrupted_{stamp}.json"));
        let mut n = 1;
        while backup.exists() {
            backup = dir.join(format!("progress.corrupted_{stamp}_{n}.json"));
            n += 1;
        }

        match fs::rename(&self.path, &backup) {
            Ok(()) => {
                tracing::warn!(backup = %backup.display(), "corrupted progress quarantined");
                Some(backup)
            }
            Err(e) => {
                tracing::error!(error = %e, "could not quarantine corrupted progress");
                None
            }
        }
    }

    /// Write the record, replacing the old file atomically.
    ///
    /// The record is stamped with the current format version; its
    /// `updated_at` is written as given. Returns the record path.
    pub fn save(&self, record: &ProgressRecord) -> ProgressResult<PathBuf> {
        if !record.scenes_ordered() {
            return Err(ProgressError::SceneOrder {
                current: record.current_scene_id,
                next: record.next_scene_id,
            });
        }

        let dir = self.path.parent().unwrap_or(&self.runtime_dir);
        fs::create_dir_all(dir).map_err(|e| ProgressError::io(dir, e))?;

        let on_disk = ProgressRecord {
            format_version: CURRENT_FORMAT_VERSION,
            corrupted: false,
            quarantined_to: None,
            ..record.clone()
        };
        let mut json = serde_json::to_string_pretty(&on_disk)?;
        json.push('\n');

        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| ProgressError::io(dir, e))?;
        tmp.write_all(json.as_bytes())
            .map_err(|e| ProgressError::io(tmp.path(), e))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| ProgressError::io(tmp.path(), e))?;
        tmp.persist(&self.path)
            .map_err(|e| ProgressError::io(&self.path, e.error))?;

        tracing::debug!(
            path = %self.path.display(),
            scene = on_disk.current_scene_id,
            turns = on_disk.turn_count,
            safe = on_disk.safe_to_switch_engine,
            "progress saved"
        );
        Ok(self.path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::EngineType;
    use tempfile::TempDir;

    #[test]
    fn missing_file_loads_default() {
        let dir = TempDir::new().unwrap();
        let store = ProgressStore::new(dir.path());
        assert!(!store.exists());
        let record = store.load();
        assert!(!record.corrupted);
        assert_eq!(record.current_scene_id, 1);
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = ProgressStore::new(dir.path());
        let record = ProgressRecord::new(3, 4, 17, EngineType::Linear, true);
        let path = store.save(&record).unwrap();
        assert_eq!(path, dir.path().join("plot").join("progress.json"));

        let loaded = store.load();
        assert_eq!(loaded, record);
    }

    #[test]
    fn save_rejects_scene_order() {
        let dir = TempDir::new().unwrap();
        let store = ProgressStore::new(dir.path());
        let err = store.save(&ProgressRecord::new(5, 5, 0, EngineType::Orchestrated, false));
        assert!(matches!(err, Err(ProgressError::SceneOrder { current: 5, next: 5 })));
        assert!(!store.exists());
    }

    #[test]
    fn file_is_pretty_json() {
        let dir = TempDir::new().unwrap();
        let store = ProgressStore::new(dir.path());
        store.save(&ProgressRecord::default()).unwrap();
        let text = fs::read_to_string(store.path()).unwrap();
        assert!(text.contains("\n  \"current_scene_id\": 1"));
        assert!(text.contains("\"safe_to_switch_engine\": false"));
        assert!(text.contains("\"engine_type\": \"orchestrated\""));
    }

    #[test]
    fn garbage_is_quarantined_once() {
        let dir = TempDir::new().unwrap();
        let store = ProgressStore::new(dir.path());
        fs::create_dir_all(dir.path().join("plot")).unwrap();
        fs::write(store.path(), b"{ not json").unwrap();

        let record = store.load();
        assert!(record.corrupted);
        let backup = record.quarantined_to.clone().unwrap();
        assert!(backup.exists());
        assert!(
            backup
                .file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("progress.corrupted_")
        );
        assert_eq!(fs::read(&backup).unwrap(), b"{ not json");
        assert!(!store.exists());

        let again = store.load();
        assert!(!again.corrupted);
        let backups = fs::read_dir(dir.path().join("plot")).unwrap().count();
        assert_eq!(backups, 1);
    }

    #[test]
    fn out_of_order_scenes_are_quarantined() {
        let dir = TempDir::new().unwrap();
        let store = ProgressStore::new(dir.path());
        fs::create_dir_all(dir.path().join("plot")).unwrap();
        fs::write(
            store.path(),
            br#"{"format_version": 2, "current_scene_id": 4, "next_scene_id": 2}"#,
        )
        .unwrap();
        let record = store.load();
        assert!(record.corrupted);
        assert!(record.quarantined_to.is_some());
    }

    #[test]
    fn quarantine_names_do_not_collide() {
        let dir = TempDir::new().unwrap();
        let store = ProgressStore::new(dir.path());
        fs::create_dir_all(dir.path().join("plot")).unwrap();
        let mut backups = Vec::new();
        for _ in 0..3 {
            fs::write(store.path(), b"\xff\xfe").unwrap();
            backups.push(store.load().quarantined_to.unwrap());
        }
        backups.sort();
        backups.dedup();
        assert_eq!(backups.len(), 3);
    }
}
