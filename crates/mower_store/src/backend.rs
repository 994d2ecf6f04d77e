use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::StoreError;

/// Key/value persistence for last-known states. Values are host state strings.
pub trait StateBackend: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn save(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Volatile backend. Writes can be made to fail for exercising error paths.
#[derive(Default)]
pub struct MemoryBackend {
    values: Mutex<BTreeMap<String, String>>,
    reject_writes: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values<'a>(values: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let backend = Self::new();
        backend.values.lock().extend(
            values
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string())),
        );
        backend
    }

    pub fn set_reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.values.lock().clone()
    }
}

impl StateBackend for MemoryBackend {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.reject_writes.load(Ordering::Relaxed) {
            return Err(StoreError::Rejected(format!("{key} is read-only")));
        }
        self.values.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One JSON object on disk, rewritten whole on every save.
///
/// Writes go to a sibling temp file first and are renamed into place.
pub struct JsonFileBackend {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl JsonFileBackend {
    /// Opens `path`, starting empty if it does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => serde_json::from_str(&text).map_err(|source| StoreError::Parse {
                path: path.clone(),
                source,
            })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StoreError::Read { path, source }),
        };
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_all(&self, values: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let body = serde_json::to_string_pretty(values)?;
        let tmp = self.path.with_extension("json.tmp");
        let write_err = |source| StoreError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(write_err)?;
        }
        std::fs::write(&tmp, body).map_err(write_err)?;
        std::fs::rename(&tmp, &self.path).map_err(write_err)
    }
}

impl StateBackend for JsonFileBackend {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut values = self.values.lock();
        values.insert(key.to_string(), value.to_string());
        self.write_all(&values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonFileBackend::open(dir.path().join("state.json")).unwrap();
        assert_eq!(backend.load("robby_stuck").unwrap(), None);
    }

    #[test]
    fn saved_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");
        {
            let backend = JsonFileBackend::open(&path).unwrap();
            backend.save("robby_stuck", "on").unwrap();
            backend
                .save("robby_start_mowing_cycle", "2026-05-01T08:10:00+00:00")
                .unwrap();
        }
        let reopened = JsonFileBackend::open(&path).unwrap();
        assert_eq!(reopened.load("robby_stuck").unwrap().as_deref(), Some("on"));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn corrupt_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            JsonFileBackend::open(&path),
            Err(StoreError::Parse { .. })
        ));
    }

    #[test]
    fn memory_backend_can_reject_writes() {
        let backend = MemoryBackend::with_values([("k", "v")]);
        backend.set_reject_writes(true);
        assert!(backend.save("k", "w").is_err());
        assert_eq!(backend.load("k").unwrap().as_deref(), Some("v"));
    }
}
