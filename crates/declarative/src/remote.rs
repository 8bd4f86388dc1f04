//! Remote management API collaborator
//!
//! The reconciler's only boundary. Implementations live outside this crate
//! (HTTP client, local emulation, test fakes) and own their retry policy;
//! the reconciler never retries on its own.

use crate::value::{Attributes, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Changed attributes sent to an update; `None` clears the attribute
pub type AttributeUpdate = BTreeMap<String, Option<Value>>;

/// Response of a successful create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Created {
    /// Identifier assigned by the remote system
    pub external_id: String,
    /// Attributes only the remote system can produce (e.g. an ARN)
    pub computed: Attributes,
}

/// The four remote operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Errors reported by the remote API collaborator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The object does not exist remotely
    #[error("object not found")]
    NotFound,

    /// Rate limited by the remote system
    #[error("throttled: {0}")]
    Throttled(String),

    /// Network failure or server-side outage
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// The remote system rejected the request as invalid
    #[error("request rejected: {0}")]
    Rejected(String),

    /// The call did not complete in time; its outcome is unknown
    #[error("timed out: {0}")]
    Timeout(String),
}

impl RemoteError {
    /// Whether a retry policy may try the call again
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Throttled(_) | Self::Unavailable(_))
    }
}

/// Remote management API, parameterized by resource type tag
pub trait RemoteApi: Send + Sync {
    fn create(&self, resource_type: &str, attributes: &Attributes) -> Result<Created, RemoteError>;

    /// Returns the full observed attribute set
    fn read(&self, resource_type: &str, external_id: &str) -> Result<Attributes, RemoteError>;

    /// Returns the computed attributes after the update
    fn update(
        &self,
        resource_type: &str,
        external_id: &str,
        changes: &AttributeUpdate,
    ) -> Result<Attributes, RemoteError>;

    fn delete(&self, resource_type: &str, external_id: &str) -> Result<(), RemoteError>;
}

impl<T: RemoteApi + ?Sized> RemoteApi for Arc<T> {
    fn create(&self, resource_type: &str, attributes: &Attributes) -> Result<Created, RemoteError> {
        (**self).create(resource_type, attributes)
    }

    fn read(&self, resource_type: &str, external_id: &str) -> Result<Attributes, RemoteError> {
        (**self).read(resource_type, external_id)
    }

    fn update(
        &self,
        resource_type: &str,
        external_id: &str,
        changes: &AttributeUpdate,
    ) -> Result<Attributes, RemoteError> {
        (**self).update(resource_type, external_id, changes)
    }

    fn delete(&self, resource_type: &str, external_id: &str) -> Result<(), RemoteError> {
        (**self).delete(resource_type, external_id)
    }
}
