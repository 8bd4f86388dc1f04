//! State store - last-known view of every managed object
//!
//! Entries are keyed by external ID. Writes are wholesale overwrites
//! (last writer wins); the single-writer-per-object rule is enforced by the
//! reconciler through [`ObjectLocks`].

use crate::types::ManagedObject;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use thiserror::Error;

/// Errors raised by state store implementations
#[derive(Debug, Error)]
pub enum StoreError {
    /// The address is already bound to another external ID
    #[error("{address} is already tracked as {existing}, refusing to record {attempted}")]
    IdentityConflict {
        address: String,
        existing: String,
        attempted: String,
    },

    /// The external ID is already tracked under another address
    #[error("{external_id} is already tracked as {existing}, refusing to record it as {attempted}")]
    AddressConflict {
        external_id: String,
        existing: String,
        attempted: String,
    },

    /// Only objects that exist remotely carry an ID and can be stored
    #[error("{address} has no external ID")]
    MissingId { address: String },

    #[error("state I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("state file {} is corrupt: {message}", path.display())]
    Corrupt { path: PathBuf, message: String },
}

/// Persistent view of managed objects
pub trait StateStore: Send + Sync {
    /// Load the object tracked under an external ID
    fn load(&self, external_id: &str) -> Result<Option<ManagedObject>, StoreError>;

    /// Store an object, replacing any previous entry for its ID
    fn save(&self, object: &ManagedObject) -> Result<(), StoreError>;

    /// Remove an entry; removing an absent entry is not an error
    fn delete(&self, external_id: &str) -> Result<(), StoreError>;

    /// Every tracked object, ordered by external ID
    fn list(&self) -> Result<Vec<ManagedObject>, StoreError>;

    /// Per-object lock table
    fn locks(&self) -> &ObjectLocks;

    /// Find the object declared under a local address
    fn find_by_address(&self, address: &str) -> Result<Option<ManagedObject>, StoreError> {
        Ok(self.list()?.into_iter().find(|o| o.address == address))
    }
}

/// Check that saving `object` binds neither its address to a new ID nor its
/// ID to a new address
pub fn check_identity<'a>(
    object: &ManagedObject,
    existing: impl IntoIterator<Item = &'a ManagedObject>,
) -> Result<(), StoreError> {
    if object.external_id.is_empty() {
        return Err(StoreError::MissingId {
            address: object.address.clone(),
        });
    }

    for other in existing {
        if other.address == object.address && other.external_id != object.external_id {
            return Err(StoreError::IdentityConflict {
                address: object.address.clone(),
                existing: other.external_id.clone(),
                attempted: object.external_id.clone(),
            });
        }
        if other.external_id == object.external_id && other.address != object.address {
            return Err(StoreError::AddressConflict {
                external_id: object.external_id.clone(),
                existing: other.address.clone(),
                attempted: object.address.clone(),
            });
        }
    }
    Ok(())
}

/// Table of per-object mutexes
///
/// Handing out one mutex per key serializes operations on the same object
/// while leaving distinct objects free to run in parallel.
#[derive(Debug, Default)]
pub struct ObjectLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ObjectLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the mutex for a key, creating it on first use
    pub fn handle(&self, key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(key.to_string()).or_default())
    }
}

/// In-memory state store
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: RwLock<BTreeMap<String, ManagedObject>>,
    locks: ObjectLocks,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked objects
    pub fn len(&self) -> usize {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StateStore for MemoryStore {
    fn load(&self, external_id: &str) -> Result<Option<ManagedObject>, StoreError> {
        let objects = self.objects.read().unwrap_or_else(PoisonError::into_inner);
        Ok(objects.get(external_id).cloned())
    }

    fn save(&self, object: &ManagedObject) -> Result<(), StoreError> {
        let mut objects = self.objects.write().unwrap_or_else(PoisonError::into_inner);
        check_identity(object, objects.values())?;
        objects.insert(object.external_id.clone(), object.clone());
        Ok(())
    }

    fn delete(&self, external_id: &str) -> Result<(), StoreError> {
        let mut objects = self.objects.write().unwrap_or_else(PoisonError::into_inner);
        objects.remove(external_id);
        Ok(())
    }

    fn list(&self) -> Result<Vec<ManagedObject>, StoreError> {
        let objects = self.objects.read().unwrap_or_else(PoisonError::into_inner);
        Ok(objects.values().cloned().collect())
    }

    fn locks(&self) -> &ObjectLocks {
        &self.locks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs;

    fn object(address: &str, id: &str) -> ManagedObject {
        ManagedObject::observed("archive", address, id, attrs! { "name" => "a" })
    }

    #[test]
    fn test_save_then_load() {
        let store = MemoryStore::new();
        store.save(&object("archive.a", "archive/a")).unwrap();

        let loaded = store.load("archive/a").unwrap().unwrap();
        assert_eq!(loaded.address, "archive.a");
        assert!(store.load("archive/missing").unwrap().is_none());
    }

    #[test]
    fn test_save_overwrites_wholesale() {
        let store = MemoryStore::new();
        store.save(&object("archive.a", "archive/a")).unwrap();

        let mut replacement = object("archive.a", "archive/a");
        replacement.attributes = attrs! { "description" => "new" };
        store.save(&replacement).unwrap();

        let loaded = store.load("archive/a").unwrap().unwrap();
        assert_eq!(loaded.attributes, attrs! { "description" => "new" });
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let store = MemoryStore::new();
        store.save(&object("archive.a", "archive/a")).unwrap();

        store.delete("archive/a").unwrap();
        store.delete("archive/a").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_address_cannot_rebind_to_new_id() {
        let store = MemoryStore::new();
        store.save(&object("archive.a", "archive/a")).unwrap();

        let err = store.save(&object("archive.a", "archive/other")).unwrap_err();
        assert!(matches!(err, StoreError::IdentityConflict { .. }));

        store.delete("archive/a").unwrap();
        store.save(&object("archive.a", "archive/other")).unwrap();
    }

    #[test]
    fn test_id_cannot_rebind_to_new_address() {
        let store = MemoryStore::new();
        store.save(&object("archive.a", "archive/a")).unwrap();

        let err = store.save(&object("archive.b", "archive/a")).unwrap_err();
        assert!(matches!(err, StoreError::AddressConflict { .. }));
        assert_eq!(store.load("archive/a").unwrap().unwrap().address, "archive.a");
    }

    #[test]
    fn test_save_requires_id() {
        let store = MemoryStore::new();
        let err = store.save(&object("archive.a", "")).unwrap_err();
        assert!(matches!(err, StoreError::MissingId { .. }));
    }

    #[test]
    fn test_find_by_address() {
        let store = MemoryStore::new();
        store.save(&object("archive.a", "archive/a")).unwrap();
        store.save(&object("archive.b", "archive/b")).unwrap();

        let found = store.find_by_address("archive.b").unwrap().unwrap();
        assert_eq!(found.external_id, "archive/b");
    }

    #[test]
    fn test_lock_handles_are_shared_per_key() {
        let locks = ObjectLocks::new();
        let a1 = locks.handle("archive.a");
        let a2 = locks.handle("archive.a");
        let b = locks.handle("archive.b");

        assert!(Arc::ptr_eq(&a1, &a2));
        assert!(!Arc::ptr_eq(&a1, &b));
    }
}
