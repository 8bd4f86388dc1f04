//! Error taxonomy for reconciliation
//!
//! The diff engine and schema only ever raise [`ReconcileError::Validation`];
//! every other kind originates in the reconciler.

use crate::remote::{Operation, RemoteError};
use crate::schema::ValidationError;
use crate::store::StoreError;
use std::time::Duration;
use thiserror::Error;

/// Result type for reconciliation
pub type Result<T> = std::result::Result<T, ReconcileError>;

/// Broad class of a [`ReconcileError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    TransientRemote,
    PermanentRemote,
    Indeterminate,
    ImportNotFound,
    Conflict,
    Cancelled,
    Internal,
}

impl ErrorKind {
    /// Get actionable advice for this kind of failure.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Validation => "Fix the configuration and run again",
            Self::TransientRemote => "The remote system is busy or unreachable, try again later",
            Self::PermanentRemote => "The remote system refused the request; check the values",
            Self::Indeterminate => {
                "Run `refresh` before deciding the next step; an object created meanwhile is not tracked and needs `import`"
            }
            Self::ImportNotFound => "Check the external ID and resource type",
            Self::Conflict => "Remove the existing state entry first",
            Self::Cancelled => "Run `apply` again to finish the remaining steps",
            Self::Internal => "Check the state file and its permissions",
        }
    }
}

/// Errors raised while planning or applying changes
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Desired configuration fails its schema; raised before any remote call
    #[error("invalid configuration for {address}: {}", join_errors(.errors))]
    Validation {
        address: String,
        errors: Vec<ValidationError>,
    },

    /// Rate limit or network failure; the caller's retry policy may try again
    #[error("{operation} {address} failed temporarily: {message}")]
    TransientRemote {
        operation: Operation,
        address: String,
        message: String,
    },

    /// Rejected request or missing object; never retried
    #[error("{operation} {address} failed: {message}")]
    PermanentRemote {
        operation: Operation,
        address: String,
        message: String,
    },

    /// Timed out mid-operation; the remote outcome is unknown
    #[error("{operation} {address} did not finish within {timeout:?}; outcome unknown")]
    Indeterminate {
        operation: Operation,
        address: String,
        timeout: Duration,
    },

    /// Import read found nothing
    #[error("cannot import {resource_type} {external_id}: object does not exist")]
    ImportNotFound {
        resource_type: String,
        external_id: String,
    },

    /// Import target is already tracked in state
    #[error("{address} is already managed as {external_id}")]
    AlreadyManaged {
        address: String,
        external_id: String,
    },

    #[error("unknown resource type: {0}")]
    UnknownResourceType(String),

    /// Cancelled between steps; `deleted` records a completed Delete
    #[error("{address} cancelled{}", cancel_suffix(.deleted))]
    Cancelled { address: String, deleted: bool },

    /// Plan does not fit the operation requested
    #[error("invalid plan for {address}: {message}")]
    InvalidPlan { address: String, message: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ReconcileError {
    /// Classify a remote failure for the given operation
    pub fn from_remote(
        operation: Operation,
        address: impl Into<String>,
        err: RemoteError,
        timeout: Duration,
    ) -> Self {
        let address = address.into();
        match err {
            RemoteError::Throttled(message) | RemoteError::Unavailable(message) => {
                Self::TransientRemote {
                    operation,
                    address,
                    message,
                }
            }
            RemoteError::Timeout(_) => Self::Indeterminate {
                operation,
                address,
                timeout,
            },
            RemoteError::NotFound => Self::PermanentRemote {
                operation,
                address,
                message: "object not found".to_string(),
            },
            RemoteError::Rejected(message) => Self::PermanentRemote {
                operation,
                address,
                message,
            },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::TransientRemote { .. } => ErrorKind::TransientRemote,
            Self::PermanentRemote { .. } | Self::UnknownResourceType(_) => {
                ErrorKind::PermanentRemote
            }
            Self::Indeterminate { .. } => ErrorKind::Indeterminate,
            Self::ImportNotFound { .. } => ErrorKind::ImportNotFound,
            Self::AlreadyManaged { .. } => ErrorKind::Conflict,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::InvalidPlan { .. } | Self::Store(_) => ErrorKind::Internal,
        }
    }

    /// Advice for this particular failure
    ///
    /// A create that timed out may have produced an object the state does not
    /// know about, which `refresh` cannot find.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Indeterminate {
                operation: Operation::Create,
                ..
            } => "The object may exist without being tracked; find its ID and run `import` before applying again",
            _ => self.kind().advice(),
        }
    }

    /// Whether the caller's retry policy may try again
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::TransientRemote)
    }

    /// Whether the caller must re-read before deciding the next action
    pub fn requires_refresh(&self) -> bool {
        matches!(self.kind(), ErrorKind::Indeterminate)
    }
}

fn cancel_suffix(deleted: &bool) -> &'static str {
    if *deleted {
        " after delete; object is now absent"
    } else {
        ""
    }
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
