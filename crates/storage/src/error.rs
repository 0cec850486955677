//! Storage Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A storage error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
/// Remote paths and item identifiers are carried as plain strings; they are
/// drive paths (`/Camera/2023`), not local filesystem paths.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Item or folder does not exist
    #[display("not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// Access denied by the storage service
    #[display("permission denied: {_0}")]
    PermissionDenied(#[error(not(source))] String),
    /// Item already exists (name conflict the service refused to resolve)
    #[display("already exists: {_0}")]
    AlreadyExists(#[error(not(source))] String),
    /// No usable bearer token could be obtained, or the service rejected it
    #[display("authentication failed: {_0}")]
    Auth(#[error(not(source))] String),
    /// Network-related error (connection reset, timeout, 5xx)
    #[display("network error: {_0}")]
    Network(#[error(not(source))] String),
    /// The service asked us to slow down (HTTP 429)
    #[display("throttled by storage service")]
    Throttled,
    /// Path contains invalid characters or escapes root
    #[display("invalid path: {_0}")]
    InvalidPath(#[error(not(source))] String),
    /// The service answered with something we could not make sense of
    #[display("invalid response: {_0}")]
    InvalidResponse(#[error(not(source))] String),
    /// Backend-specific error
    #[display("backend error: {_0}")]
    BackendError(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Throttled | Self::BackendError(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ErrorKind::Network("reset".into()), true)]
    #[case(ErrorKind::Throttled, true)]
    #[case(ErrorKind::BackendError("500".into()), true)]
    #[case(ErrorKind::NotFound("/Camera".into()), false)]
    #[case(ErrorKind::PermissionDenied("/Camera".into()), false)]
    #[case(ErrorKind::Auth("expired".into()), false)]
    #[case(ErrorKind::InvalidPath("/..".into()), false)]
    fn error_kind_retryable(#[case] kind: ErrorKind, #[case] expected: bool) {
        assert_eq!(kind.is_retryable(), expected);
    }

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::NotFound("/Camera/2023".to_string()).to_string(), "not found: /Camera/2023");
        assert_eq!(ErrorKind::Throttled.to_string(), "throttled by storage service");
    }
}
