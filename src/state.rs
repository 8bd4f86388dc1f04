//! JSON state file
//!
//! The whole state lives in one file that is rewritten atomically (temp
//! file plus rename) on every change. A copy of the entries is cached in
//! memory; a failed write leaves both the cache and the file untouched.

use chrono::{DateTime, Utc};
use declarative::{ManagedObject, ObjectLocks, StateStore, StoreError, check_identity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

const STATE_VERSION: u32 = 1;

/// On-disk layout
#[derive(Debug, Serialize, Deserialize)]
struct StateFile {
    version: u32,
    last_updated: DateTime<Utc>,
    /// Entries keyed by external ID
    #[serde(default)]
    objects: BTreeMap<String, ManagedObject>,
}

/// State store persisted to a JSON file
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    objects: RwLock<BTreeMap<String, ManagedObject>>,
    locks: ObjectLocks,
}

impl JsonFileStore {
    /// Open the store at `path`; a missing file is an empty store
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let objects = match fs::read_to_string(&path) {
            Ok(content) => parse(&path, &content)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("State file {} does not exist, starting empty", path.display());
                BTreeMap::new()
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        log::debug!("Loaded {} object(s) from {}", objects.len(), path.display());
        Ok(Self {
            path,
            objects: RwLock::new(objects),
            locks: ObjectLocks::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `change` to a copy of the entries, persist it, then publish it
    fn modify<F>(&self, change: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut BTreeMap<String, ManagedObject>) -> Result<(), StoreError>,
    {
        let mut objects = self.objects.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = objects.clone();
        change(&mut next)?;
        self.persist(&next)?;
        *objects = next;
        Ok(())
    }

    fn persist(&self, objects: &BTreeMap<String, ManagedObject>) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|source| StoreError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let file = StateFile {
            version: STATE_VERSION,
            last_updated: Utc::now(),
            objects: objects.clone(),
        };
        let content = serde_json::to_string_pretty(&file).map_err(|e| StoreError::Corrupt {
            path: self.path.clone(),
            message: e.to_string(),
        })?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;

        log::debug!("Saved state to {}", self.path.display());
        Ok(())
    }
}

fn parse(path: &Path, content: &str) -> Result<BTreeMap<String, ManagedObject>, StoreError> {
    let corrupt = |message: String| StoreError::Corrupt {
        path: path.to_path_buf(),
        message,
    };

    let file: StateFile = serde_json::from_str(content).map_err(|e| corrupt(e.to_string()))?;
    if file.version != STATE_VERSION {
        return Err(corrupt(format!("unsupported state version {}", file.version)));
    }
    for (id, object) in &file.objects {
        if *id != object.external_id {
            return Err(corrupt(format!(
                "entry {id} holds object {}",
                object.external_id
            )));
        }
    }
    Ok(file.objects)
}

impl StateStore for JsonFileStore {
    fn load(&self, external_id: &str) -> Result<Option<ManagedObject>, StoreError> {
        let objects = self.objects.read().unwrap_or_else(PoisonError::into_inner);
        Ok(objects.get(external_id).cloned())
    }

    fn save(&self, object: &ManagedObject) -> Result<(), StoreError> {
        self.modify(|objects| {
            check_identity(object, objects.values())?;
            objects.insert(object.external_id.clone(), object.clone());
            Ok(())
        })
    }

    fn delete(&self, external_id: &str) -> Result<(), StoreError> {
        if self.load(external_id)?.is_none() {
            return Ok(());
        }
        self.modify(|objects| {
            objects.remove(external_id);
            Ok(())
        })
    }

    fn list(&self) -> Result<Vec<ManagedObject>, StoreError> {
        let objects = self.objects.read().unwrap_or_else(PoisonError::into_inner);
        Ok(objects.values().cloned().collect())
    }

    fn locks(&self) -> &ObjectLocks {
        &self.locks
    }
}
