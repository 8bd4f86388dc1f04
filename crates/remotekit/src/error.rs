//! Error types for remote API operations.
//!
//! Errors are categorized so the client can decide what to retry and the
//! reconciler can decide what the failure means for the managed object.

use declarative::RemoteError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Categories of remote errors for retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The object does not exist
    NotFound,
    /// Rate limited by the remote system (transient)
    Throttled,
    /// Remote system or network unavailable (transient)
    Unavailable,
    /// The request was rejected as invalid or forbidden
    Rejected,
    /// No response before the deadline; outcome unknown
    Timeout,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Whether this error category is typically transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Throttled | Self::Unavailable)
    }

    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::NotFound => "Object not found",
            Self::Throttled => "Rate limited",
            Self::Unavailable => "Remote system unavailable",
            Self::Rejected => "Request rejected",
            Self::Timeout => "Request timed out",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::NotFound => "Refresh state; the object may have been deleted out-of-band",
            Self::Throttled => "Wait a moment and try again, or lower --jobs",
            Self::Unavailable => "Check the endpoint and your network, then try again",
            Self::Rejected => "Check the attribute values and your credentials",
            Self::Timeout => "Refresh state before retrying; the change may have been applied",
            Self::Other => "Check the error details for more information",
        }
    }
}

/// Errors that can occur while talking to a remote backend.
#[derive(Debug, Error)]
pub enum Error {
    #[error("object not found")]
    NotFound,

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("rejected: {0}")]
    Rejected(String),

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl Error {
    /// Create an IO error with path context.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Get the error category for retry logic.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::NotFound => ErrorCategory::NotFound,
            Error::Http { status: 404, .. } => ErrorCategory::NotFound,
            Error::Http { status: 429, .. } => ErrorCategory::Throttled,
            Error::Http { status, .. } if *status >= 500 => ErrorCategory::Unavailable,
            Error::Http { .. } | Error::Rejected(_) => ErrorCategory::Rejected,
            Error::Transport(_) => ErrorCategory::Unavailable,
            Error::Timeout(_) => ErrorCategory::Timeout,
            Error::Io { .. } | Error::InvalidResponse(_) => ErrorCategory::Other,
        }
    }

    /// Whether this error is typically transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(404) => Self::NotFound,
            ureq::Error::StatusCode(code) => Self::Http {
                status: code,
                message: format!("HTTP {code}"),
            },
            ureq::Error::Timeout(t) => Self::Timeout(t.to_string()),
            ureq::Error::Io(e) if e.kind() == io::ErrorKind::TimedOut => {
                Self::Timeout(e.to_string())
            }
            ureq::Error::Json(e) => Self::InvalidResponse(e.to_string()),
            other => Self::Transport(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}

impl From<Error> for RemoteError {
    fn from(err: Error) -> Self {
        let message = err.to_string();
        match err.category() {
            ErrorCategory::NotFound => RemoteError::NotFound,
            ErrorCategory::Throttled => RemoteError::Throttled(message),
            ErrorCategory::Unavailable => RemoteError::Unavailable(message),
            ErrorCategory::Timeout => RemoteError::Timeout(message),
            ErrorCategory::Rejected | ErrorCategory::Other => RemoteError::Rejected(message),
        }
    }
}

/// Result type for remote operations.
pub type Result<T> = std::result::Result<T, Error>;
