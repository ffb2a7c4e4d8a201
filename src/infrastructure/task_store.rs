use crate::domain::models::TaskRecord;
use crate::infrastructure::error::InfraError;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;

/// Local task store: one JSON document holding the whole map from normalized
/// task name to record. The map is read and written as a unit; there are no
/// partial-key writes.
pub trait TaskStoreRepository: Send + Sync {
    fn load_all(&self) -> Result<BTreeMap<String, TaskRecord>, InfraError>;
    fn save_all(&self, records: &BTreeMap<String, TaskRecord>) -> Result<(), InfraError>;
}

#[derive(Debug, Clone)]
pub struct JsonFileTaskStore {
    path: PathBuf,
}

impl JsonFileTaskStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parent_dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

impl TaskStoreRepository for JsonFileTaskStore {
    fn load_all(&self) -> Result<BTreeMap<String, TaskRecord>, InfraError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let raw = fs::read_to_string(&self.path)?;
        // A present but unparsable document is an error the caller must see,
        // not an empty map.
        let records: BTreeMap<String, TaskRecord> = serde_json::from_str(&raw)?;
        Ok(records)
    }

    fn save_all(&self, records: &BTreeMap<String, TaskRecord>) -> Result<(), InfraError> {
        let formatted = serde_json::to_string_pretty(records)?;
        // Temp file in the same directory, then rename: the previous document
        // stays intact unless the whole write lands.
        let mut staged = NamedTempFile::new_in(self.parent_dir())?;
        staged.write_all(formatted.as_bytes())?;
        staged.write_all(b"\n")?;
        staged
            .persist(&self.path)
            .map_err(|error| InfraError::Io(error.error))?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    records: Mutex<BTreeMap<String, TaskRecord>>,
}

impl InMemoryTaskStore {
    pub fn with_records(records: BTreeMap<String, TaskRecord>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }
}

impl TaskStoreRepository for InMemoryTaskStore {
    fn load_all(&self) -> Result<BTreeMap<String, TaskRecord>, InfraError> {
        let records = self
            .records
            .lock()
            .map_err(|error| InfraError::InvalidRecord(format!("task store lock poisoned: {error}")))?;
        Ok(records.clone())
    }

    fn save_all(&self, records: &BTreeMap<String, TaskRecord>) -> Result<(), InfraError> {
        let mut guard = self
            .records
            .lock()
            .map_err(|error| InfraError::InvalidRecord(format!("task store lock poisoned: {error}")))?;
        *guard = records.clone();
        Ok(())
    }
}
