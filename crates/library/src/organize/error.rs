//! Error types for the [`organize`](super) module.
//!
//! Uses [`exn`] for automatic location tracking and error tree construction:
//! every kind here sits on top of the storage error that caused it, so the
//! full chain is available when the error is printed with `{:?}`.

use derive_more::{Display, Error};
use drivesort_storage::error::{Error as StorageError, ErrorKind as StorageErrorKind};
use std::ops::Deref;

/// An organize error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for organize operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies why organizing stopped.
///
/// ### Run Errors
/// - [`ErrorKind::AuthFailed`]
/// - [`ErrorKind::Listing`]
/// - [`ErrorKind::Stalled`]
///
/// ### Item Errors
/// - [`ErrorKind::Item`] wrapping one of
///   - [`ErrorKind::MissingTimestamp`]
///   - [`ErrorKind::RemoteOperationFailed`]
///   - [`ErrorKind::MoveFailed`]
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// No valid access token could be obtained, or the service rejected it.
    #[display("authentication failed")]
    AuthFailed,
    /// The item has neither a capture nor a creation timestamp.
    #[display("{_0} has no photo or creation timestamp")]
    MissingTimestamp(#[error(not(source))] String),
    /// Listing or folder provisioning failed for the given path.
    #[display("remote operation failed for {_0}")]
    RemoteOperationFailed(#[error(not(source))] String),
    /// The named item could not be moved, even after retrying.
    #[display("could not move {_0}")]
    MoveFailed(#[error(not(source))] String),
    /// The source folder could not be listed.
    #[display("could not list {_0}")]
    Listing(#[error(not(source))] String),
    /// The source folder keeps listing items that were already handled.
    #[display("no progress organizing {_0}")]
    Stalled(#[error(not(source))] String),
    /// Organizing the named item failed; the cause is the next error down.
    #[display("failed to organize {_0}")]
    Item(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RemoteOperationFailed(_) | Self::MoveFailed(_) | Self::Listing(_) => true,
            Self::AuthFailed | Self::MissingTimestamp(_) | Self::Stalled(_) | Self::Item(_) => false,
        }
    }
}

/// Raise a storage error into the organize taxonomy.
///
/// Authentication problems always surface as [`ErrorKind::AuthFailed`] no
/// matter which operation hit them; everything else becomes `kind`.
pub(crate) fn from_storage(err: StorageError, kind: impl FnOnce() -> ErrorKind) -> Error {
    if matches!(err.deref(), StorageErrorKind::Auth(_)) {
        err.raise(ErrorKind::AuthFailed)
    } else {
        err.raise(kind())
    }
}
