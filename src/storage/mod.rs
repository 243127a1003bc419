//! Persistence layer.
//!
//! Writes one JSON file per scan run into an output directory. Each file
//! is named `<run_id>.json` and holds `{ "<run_id>": { "<term>": price } }`
//! with prices at full precision.

use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::debug;

use crate::types::{ItemEstimate, StorageError};

/// Default output directory for result files.
pub const DEFAULT_OUTPUT_DIR: &str = "prices";

/// Destination for per-run estimate sets.
#[cfg_attr(test, mockall::automock)]
pub trait ResultStore: Send + Sync {
    /// Persist the estimates of one run. Returns where they were written.
    fn save(&self, run_id: &str, estimates: &ItemEstimate) -> Result<PathBuf, StorageError>;
}

/// JSON-file result store.
#[derive(Debug, Clone)]
pub struct JsonResultStore {
    dir: PathBuf,
}

impl JsonResultStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the result file for a run.
    pub fn path_for(&self, run_id: &str) -> PathBuf {
        self.dir.join(format!("{run_id}.json"))
    }

    /// Read back the estimates saved for a run.
    pub fn load(&self, run_id: &str) -> Result<ItemEstimate, StorageError> {
        let path = self.path_for(run_id);
        let json = std::fs::read_to_string(&path).map_err(|source| StorageError::Read {
            path: path.clone(),
            source,
        })?;

        let mut wrapped: BTreeMap<String, ItemEstimate> = serde_json::from_str(&json)?;
        wrapped
            .remove(run_id)
            .ok_or_else(|| StorageError::MissingRun {
                path,
                run_id: run_id.to_string(),
            })
    }
}

impl ResultStore for JsonResultStore {
    fn save(&self, run_id: &str, estimates: &ItemEstimate) -> Result<PathBuf, StorageError> {
        std::fs::create_dir_all(&self.dir).map_err(|source| StorageError::CreateDir {
            path: self.dir.clone(),
            source,
        })?;

        let mut wrapped = BTreeMap::new();
        wrapped.insert(run_id, estimates);
        let json = serde_json::to_string(&wrapped)?;

        let path = self.path_for(run_id);
        std::fs::write(&path, json).map_err(|source| StorageError::Write {
            path: path.clone(),
            source,
        })?;

        debug!(path = %path.display(), items = estimates.len(), "Results saved");
        Ok(path)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ItemEstimate {
        let mut est = ItemEstimate::new();
        est.insert("rtx 4090", 1612.3456789);
        est.insert("gtx 1080", 118.5);
        est
    }

    #[test]
    fn test_save_writes_nested_object() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonResultStore::new(dir.path());

        let path = store.save("1700000000000", &sample()).unwrap();
        assert_eq!(path, dir.path().join("1700000000000.json"));

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let run = &raw["1700000000000"];
        assert!((run["rtx 4090"].as_f64().unwrap() - 1612.3456789).abs() < 1e-9);
        assert_eq!(run["gtx 1080"].as_f64(), Some(118.5));
        assert_eq!(raw.as_object().unwrap().len(), 1);
    }

    #[test]
    fn test_save_creates_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join(format!("out_{}", uuid::Uuid::new_v4())).join("prices");
        let store = JsonResultStore::new(&nested);

        store.save("42", &sample()).unwrap();
        assert!(nested.join("42.json").is_file());
    }

    #[test]
    fn test_load_reads_back_saved_run() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonResultStore::new(dir.path());
        store.save("7", &sample()).unwrap();

        let loaded = store.load("7").unwrap();
        assert_eq!(loaded.len(), 2);
        assert!((loaded.get("rtx 4090").unwrap() - 1612.3456789).abs() < 1e-9);
        assert_eq!(loaded.get("gtx 1080"), Some(118.5));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonResultStore::new(dir.path());
        assert!(matches!(store.load("nope"), Err(StorageError::Read { .. })));
    }

    #[test]
    fn test_load_wrong_run_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonResultStore::new(dir.path());
        std::fs::write(store.path_for("1"), r#"{"2": {"x": 1.0}}"#).unwrap();
        assert!(matches!(store.load("1"), Err(StorageError::MissingRun { .. })));
    }

    #[test]
    fn test_save_into_file_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a dir").unwrap();

        let store = JsonResultStore::new(&blocker);
        assert!(matches!(
            store.save("1", &sample()),
            Err(StorageError::CreateDir { .. })
        ));
    }
}
