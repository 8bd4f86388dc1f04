//! Backend traits and implementations for the remote management API.
//!
//! - [`http::HttpBackend`] talks JSON over HTTP to a management endpoint
//! - [`file::FileBackend`] emulates the remote system in a local directory
//! - [`MockBackend`] keeps objects in memory and can be scripted to fail
//!
//! # Testing
//!
//! ```
//! use remotekit::backend::{Backend, MockBackend};
//! use remotekit::Error;
//! use declarative::attrs;
//!
//! let mock = MockBackend::new();
//! mock.fail_next(Error::Http { status: 503, message: "busy".into() });
//! assert!(mock.read("queue", "queue/a").is_err());
//!
//! let (id, _) = mock.create("queue", &attrs! { "name" => "a" }).unwrap();
//! assert_eq!(id, "queue/a");
//! ```

pub mod file;
pub mod http;

use crate::error::{Error, Result};
use declarative::{AttributeUpdate, Attributes, Value};
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, PoisonError};

/// Backend trait for remote object operations.
///
/// Every method is a single attempt; retries belong to [`crate::Client`].
pub trait Backend: Send + Sync {
    /// Create an object, returning its identifier and computed attributes.
    fn create(&self, resource_type: &str, attributes: &Attributes) -> Result<(String, Attributes)>;

    /// Read an object's current attributes.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the object doesn't exist.
    fn read(&self, resource_type: &str, external_id: &str) -> Result<Attributes>;

    /// Apply changes in place; `None` clears an attribute.
    fn update(
        &self,
        resource_type: &str,
        external_id: &str,
        changes: &AttributeUpdate,
    ) -> Result<Attributes>;

    /// Delete an object.
    fn delete(&self, resource_type: &str, external_id: &str) -> Result<()>;

    /// Human-readable backend name for logs.
    fn name(&self) -> &'static str;
}

/// Short kind used in emulated identifiers: the last `_`-separated word of
/// the resource type (`aws_cloudwatch_event_archive` -> `archive`)
pub(crate) fn kind_of(resource_type: &str) -> &str {
    resource_type.rsplit('_').next().unwrap_or(resource_type)
}

/// Apply an update to a stored attribute set
pub(crate) fn apply_changes(attributes: &mut Attributes, changes: &AttributeUpdate) {
    for (name, value) in changes {
        match value {
            Some(value) => {
                attributes.insert(name.clone(), value.clone());
            }
            None => {
                attributes.remove(name);
            }
        }
    }
}

#[derive(Default)]
struct MockState {
    objects: BTreeMap<String, Attributes>,
    failures: VecDeque<Error>,
    attempts: usize,
}

/// Mock backend for testing without a remote system.
///
/// Identifiers are `<kind>/<name>`; every object gets a computed `arn`.
#[derive(Default)]
pub struct MockBackend {
    state: Mutex<MockState>,
}

impl MockBackend {
    /// Create a new empty mock backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call fail with `error`.
    pub fn fail_next(&self, error: Error) {
        self.lock().failures.push_back(error);
    }

    /// Number of calls made so far, failed ones included.
    pub fn attempts(&self) -> usize {
        self.lock().attempts
    }

    /// Stored attributes for an object.
    pub fn object(&self, external_id: &str) -> Option<Attributes> {
        self.lock().objects.get(external_id).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self) -> Result<std::sync::MutexGuard<'_, MockState>> {
        let mut state = self.lock();
        state.attempts += 1;
        match state.failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(state),
        }
    }
}

impl Backend for MockBackend {
    fn create(&self, resource_type: &str, attributes: &Attributes) -> Result<(String, Attributes)> {
        let mut state = self.begin()?;
        let name = attributes
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("unnamed");
        let id = format!("{}/{name}", kind_of(resource_type));
        if state.objects.contains_key(&id) {
            return Err(Error::Rejected(format!("{id} already exists")));
        }

        let computed = Attributes::from([("arn".to_string(), Value::from(format!("arn:mock:{id}")))]);
        let mut stored = attributes.clone();
        stored.extend(computed.clone());
        state.objects.insert(id.clone(), stored);
        Ok((id, computed))
    }

    fn read(&self, _resource_type: &str, external_id: &str) -> Result<Attributes> {
        let state = self.begin()?;
        state.objects.get(external_id).cloned().ok_or(Error::NotFound)
    }

    fn update(
        &self,
        _resource_type: &str,
        external_id: &str,
        changes: &AttributeUpdate,
    ) -> Result<Attributes> {
        let mut state = self.begin()?;
        let object = state.objects.get_mut(external_id).ok_or(Error::NotFound)?;
        apply_changes(object, changes);
        Ok(object
            .get("arn")
            .map(|arn| Attributes::from([("arn".to_string(), arn.clone())]))
            .unwrap_or_default())
    }

    fn delete(&self, _resource_type: &str, external_id: &str) -> Result<()> {
        let mut state = self.begin()?;
        state
            .objects
            .remove(external_id)
            .map(|_| ())
            .ok_or(Error::NotFound)
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::attrs;

    #[test]
    fn test_kind_of() {
        assert_eq!(kind_of("aws_cloudwatch_event_archive"), "archive");
        assert_eq!(kind_of("aws_securityhub_automation_rule"), "rule");
        assert_eq!(kind_of("queue"), "queue");
    }

    #[test]
    fn test_apply_changes() {
        let mut attributes = attrs! { "a" => "1", "b" => "2" };
        let changes = AttributeUpdate::from([
            ("a".to_string(), Some(Value::from("x"))),
            ("b".to_string(), None),
        ]);
        apply_changes(&mut attributes, &changes);
        assert_eq!(attributes, attrs! { "a" => "x" });
    }

    #[test]
    fn test_mock_backend_lifecycle() {
        let mock = MockBackend::new();
        let (id, computed) = mock.create("queue", &attrs! { "name" => "a" }).unwrap();
        assert_eq!(id, "queue/a");
        assert_eq!(computed["arn"], Value::from("arn:mock:queue/a"));

        assert!(matches!(
            mock.create("queue", &attrs! { "name" => "a" }),
            Err(Error::Rejected(_))
        ));

        mock.delete("queue", &id).unwrap();
        assert!(matches!(mock.read("queue", &id), Err(Error::NotFound)));
        assert!(matches!(mock.delete("queue", &id), Err(Error::NotFound)));
    }

    #[test]
    fn test_mock_backend_scripted_failure() {
        let mock = MockBackend::new();
        mock.fail_next(Error::Transport("reset".into()));
        assert!(mock.read("queue", "queue/a").is_err());
        assert_eq!(mock.attempts(), 1);
    }
}
