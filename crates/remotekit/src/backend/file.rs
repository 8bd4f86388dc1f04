//! Local file backend.
//!
//! Emulates the remote management API with one JSON document per object,
//! so configurations can be planned and applied offline. Identifiers are
//! `<kind>/<name>` when the object has a `name` attribute and
//! `<kind>/<hash>` otherwise, where the hash covers a sequence number that
//! is never reused. Every object gets a computed `arn`.

use crate::backend::{Backend, apply_changes, kind_of};
use crate::error::{Error, Result};
use declarative::{AttributeUpdate, Attributes, Value};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Number of hash characters used in generated identifiers
const HASH_LEN: usize = 16;

/// Last sequence number handed out, kept next to the documents
const SEQUENCE_FILE: &str = "sequence";

/// Directory-backed emulation of the remote system.
pub struct FileBackend {
    root: PathBuf,
    sequence: Mutex<()>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Document {
    id: String,
    resource_type: String,
    attributes: Attributes,
}

impl FileBackend {
    /// Open (creating if needed) a backend rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| Error::io(&root, e))?;
        Ok(Self {
            root,
            sequence: Mutex::new(()),
        })
    }

    /// Get the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Derive the identifier for a new object
    fn identify(&self, resource_type: &str, attributes: &Attributes) -> Result<String> {
        let kind = kind_of(resource_type);
        if let Some(name) = attributes.get("name").and_then(Value::as_str) {
            return Ok(format!("{kind}/{name}"));
        }

        let sequence = self.next_sequence()?;
        let mut hasher = blake3::Hasher::new();
        hasher.update(resource_type.as_bytes());
        hasher.update(&sequence.to_le_bytes());
        let hash = hasher.finalize().to_hex();
        Ok(format!("{kind}/{}", &hash.as_str()[..HASH_LEN]))
    }

    fn next_sequence(&self) -> Result<u64> {
        let _guard = self.sequence.lock().unwrap_or_else(PoisonError::into_inner);
        let path = self.root.join(SEQUENCE_FILE);
        let last = match fs::read_to_string(&path) {
            Ok(content) => content.trim().parse::<u64>().map_err(|e| {
                Error::InvalidResponse(format!("{}: {e}", path.display()))
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => 0,
            Err(e) => return Err(Error::io(&path, e)),
        };
        let next = last + 1;
        fs::write(&path, next.to_string()).map_err(|e| Error::io(&path, e))?;
        Ok(next)
    }

    /// Claim the document file for a new identifier
    ///
    /// Returns false when another object already holds it.
    fn reserve(&self, id: &str) -> Result<bool> {
        let path = self.path_for(id);
        match fs::OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(Error::io(&path, e)),
        }
    }

    /// File holding one object; identifiers contain `/` so they are hashed
    fn path_for(&self, external_id: &str) -> PathBuf {
        let digest = blake3::hash(external_id.as_bytes()).to_hex();
        self.root.join(format!("{}.json", &digest.as_str()[..HASH_LEN * 2]))
    }

    fn load(&self, resource_type: &str, external_id: &str) -> Result<Document> {
        let path = self.path_for(external_id);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(Error::NotFound),
            Err(e) => return Err(Error::io(&path, e)),
        };
        let document: Document = serde_json::from_str(&content)?;
        if document.resource_type != resource_type || document.id != external_id {
            return Err(Error::NotFound);
        }
        Ok(document)
    }

    fn store(&self, document: &Document) -> Result<()> {
        let path = self.path_for(&document.id);
        let tmp = path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(document)?;
        fs::write(&tmp, content).map_err(|e| Error::io(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| Error::io(&path, e))
    }
}

impl Backend for FileBackend {
    fn create(&self, resource_type: &str, attributes: &Attributes) -> Result<(String, Attributes)> {
        let id = self.identify(resource_type, attributes)?;
        if !self.reserve(&id)? {
            return Err(Error::Rejected(format!("{id} already exists")));
        }

        let computed =
            Attributes::from([("arn".to_string(), Value::from(format!("arn:local:{id}")))]);
        let mut stored = attributes.clone();
        stored.extend(computed.clone());

        let document = Document {
            id: id.clone(),
            resource_type: resource_type.to_string(),
            attributes: stored,
        };
        if let Err(e) = self.store(&document) {
            let _ = fs::remove_file(self.path_for(&id));
            return Err(e);
        }
        log::debug!("Emulated create of {id} in {}", self.root.display());
        Ok((id, computed))
    }

    fn read(&self, resource_type: &str, external_id: &str) -> Result<Attributes> {
        Ok(self.load(resource_type, external_id)?.attributes)
    }

    fn update(
        &self,
        resource_type: &str,
        external_id: &str,
        changes: &AttributeUpdate,
    ) -> Result<Attributes> {
        let mut document = self.load(resource_type, external_id)?;
        apply_changes(&mut document.attributes, changes);
        self.store(&document)?;

        Ok(document
            .attributes
            .get("arn")
            .map(|arn| Attributes::from([("arn".to_string(), arn.clone())]))
            .unwrap_or_default())
    }

    fn delete(&self, resource_type: &str, external_id: &str) -> Result<()> {
        self.load(resource_type, external_id)?;
        let path = self.path_for(external_id);
        fs::remove_file(&path).map_err(|e| Error::io(&path, e))
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::attrs;
    use tempfile::TempDir;

    const ARCHIVE: &str = "aws_cloudwatch_event_archive";
    const RULE: &str = "aws_securityhub_automation_rule";

    fn backend() -> (TempDir, FileBackend) {
        let dir = TempDir::new().unwrap();
        let backend = FileBackend::open(dir.path().join("remote")).unwrap();
        (dir, backend)
    }

    #[test]
    fn test_create_read_round_trip() {
        let (_dir, backend) = backend();
        let (id, computed) = backend
            .create(ARCHIVE, &attrs! { "name" => "orders", "retention_days" => 7_i64 })
            .unwrap();

        assert_eq!(id, "archive/orders");
        assert_eq!(computed["arn"], Value::from("arn:local:archive/orders"));

        let attributes = backend.read(ARCHIVE, &id).unwrap();
        assert_eq!(attributes["retention_days"], Value::Int(7));
        assert_eq!(attributes["arn"], computed["arn"]);
    }

    #[test]
    fn test_nameless_objects_get_hash_ids() {
        let (_dir, backend) = backend();
        let (first, _) = backend
            .create(RULE, &attrs! { "rule_name" => "a", "description" => "d" })
            .unwrap();
        let (second, _) = backend
            .create(RULE, &attrs! { "rule_name" => "b", "description" => "d" })
            .unwrap();

        assert!(first.starts_with("rule/"));
        assert_eq!(first.len(), "rule/".len() + HASH_LEN);
        assert_ne!(first, second);
    }

    #[test]
    fn test_hash_ids_are_never_reused() {
        let (_dir, backend) = backend();
        let original = attrs! { "rule_name" => "a", "description" => "d" };
        let (first, _) = backend.create(RULE, &original).unwrap();

        let changes = AttributeUpdate::from([("rule_name".to_string(), Some(Value::from("b")))]);
        backend.update(RULE, &first, &changes).unwrap();

        let (second, _) = backend.create(RULE, &original).unwrap();
        assert_ne!(first, second);
        assert_eq!(backend.read(RULE, &first).unwrap()["rule_name"], Value::from("b"));

        let reopened = FileBackend::open(backend.root()).unwrap();
        let (third, _) = reopened.create(RULE, &original).unwrap();
        assert_ne!(third, first);
        assert_ne!(third, second);
    }

    #[test]
    fn test_duplicate_create_is_rejected() {
        let (_dir, backend) = backend();
        backend.create(ARCHIVE, &attrs! { "name" => "a" }).unwrap();
        let err = backend.create(ARCHIVE, &attrs! { "name" => "a" }).unwrap_err();
        assert!(matches!(err, Error::Rejected(_)));
    }

    #[test]
    fn test_update_applies_and_clears() {
        let (_dir, backend) = backend();
        let (id, _) = backend
            .create(ARCHIVE, &attrs! { "name" => "a", "event_pattern" => "{}" })
            .unwrap();

        let changes = AttributeUpdate::from([
            ("description".to_string(), Some(Value::from("hello"))),
            ("event_pattern".to_string(), None),
        ]);
        let computed = backend.update(ARCHIVE, &id, &changes).unwrap();
        assert!(computed.contains_key("arn"));

        let attributes = backend.read(ARCHIVE, &id).unwrap();
        assert_eq!(attributes["description"], Value::from("hello"));
        assert!(!attributes.contains_key("event_pattern"));
    }

    #[test]
    fn test_missing_objects_are_not_found() {
        let (_dir, backend) = backend();
        assert!(matches!(backend.read(ARCHIVE, "archive/x"), Err(Error::NotFound)));
        assert!(matches!(backend.delete(ARCHIVE, "archive/x"), Err(Error::NotFound)));
        assert!(matches!(
            backend.update(ARCHIVE, "archive/x", &AttributeUpdate::new()),
            Err(Error::NotFound)
        ));
    }

    #[test]
    fn test_delete_then_read() {
        let (_dir, backend) = backend();
        let (id, _) = backend.create(ARCHIVE, &attrs! { "name" => "a" }).unwrap();

        backend.delete(ARCHIVE, &id).unwrap();
        assert!(matches!(backend.read(ARCHIVE, &id), Err(Error::NotFound)));
    }

    #[test]
    fn test_type_mismatch_is_not_found() {
        let (_dir, backend) = backend();
        let (id, _) = backend.create(ARCHIVE, &attrs! { "name" => "a" }).unwrap();
        assert!(matches!(backend.read(RULE, &id), Err(Error::NotFound)));
    }
}
