//! # remotekit
//!
//! Clients for the remote management API that the reconciler drives.
//!
//! This crate provides:
//! - An HTTP backend speaking JSON to a management endpoint
//! - A local file backend that emulates the remote system offline
//! - Retry with exponential backoff for throttling and unavailability
//! - [`Client`], which implements [`declarative::RemoteApi`]
//!
//! ## Example
//!
//! ```no_run
//! use remotekit::{Client, RetryConfig};
//! use std::time::Duration;
//!
//! let client = Client::http("https://manage.example.com", Some("token".into()), Duration::from_secs(30))
//!     .with_retry(RetryConfig::new(3, Duration::from_secs(1), 2.0));
//! ```
//!
//! ## Retry Logic
//!
//! Only throttling (HTTP 429) and unavailability (5xx, connection failures)
//! are retried. Not-found, rejections and timeouts are returned at once;
//! a timed-out request may still have been applied, so the caller has to
//! re-read before trying again.

pub mod backend;
pub mod error;
pub mod retry;
pub mod types;

pub use error::{Error, ErrorCategory, Result};
pub use types::RetryConfig;

use backend::Backend;
use backend::file::FileBackend;
use backend::http::HttpBackend;
use declarative::{AttributeUpdate, Attributes, Created, RemoteApi, RemoteError};
use std::path::PathBuf;
use std::time::Duration;

/// High-level client for the remote management API.
///
/// The client wraps a backend and retries transient failures.
pub struct Client {
    backend: Box<dyn Backend>,
    retry: RetryConfig,
    callback: Box<dyn retry::RetryCallback>,
}

impl Client {
    /// Client for an HTTP management endpoint.
    pub fn http(base_url: impl Into<String>, token: Option<String>, timeout: Duration) -> Self {
        Self::with_backend(Box::new(HttpBackend::new(base_url, timeout).with_token(token)))
    }

    /// Client emulating the remote system in a local directory.
    pub fn file(root: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self::with_backend(Box::new(FileBackend::open(root)?)))
    }

    /// Create a client with a custom backend (useful for testing).
    pub fn with_backend(backend: Box<dyn Backend>) -> Self {
        Self {
            backend,
            retry: RetryConfig::default(),
            callback: Box::new(retry::LogCallback),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Name of the underlying backend.
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    fn run<T>(&self, operation: impl FnMut() -> Result<T>) -> std::result::Result<T, RemoteError> {
        retry::with_retry(&self.retry, Some(self.callback.as_ref()), operation).map_err(Into::into)
    }
}

impl RemoteApi for Client {
    fn create(&self, resource_type: &str, attributes: &Attributes) -> std::result::Result<Created, RemoteError> {
        let (external_id, computed) = self.run(|| self.backend.create(resource_type, attributes))?;
        Ok(Created {
            external_id,
            computed,
        })
    }

    fn read(&self, resource_type: &str, external_id: &str) -> std::result::Result<Attributes, RemoteError> {
        self.run(|| self.backend.read(resource_type, external_id))
    }

    fn update(
        &self,
        resource_type: &str,
        external_id: &str,
        changes: &AttributeUpdate,
    ) -> std::result::Result<Attributes, RemoteError> {
        self.run(|| self.backend.update(resource_type, external_id, changes))
    }

    fn delete(&self, resource_type: &str, external_id: &str) -> std::result::Result<(), RemoteError> {
        self.run(|| self.backend.delete(resource_type, external_id))
    }
}
