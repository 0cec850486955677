//! Storage backend trait and implementations.
//!
//! This module defines the `StorageBackend` trait, the minimal capability
//! surface the organizer needs from a remote drive: list a folder, make sure a
//! folder exists, move an item.

#[cfg(feature = "graph")]
mod graph;
#[cfg(feature = "mock")]
mod mock;
mod ro;

#[cfg(feature = "graph")]
pub use self::graph::GraphBackend;
#[cfg(feature = "mock")]
pub use self::mock::MockBackend;
pub use self::ro::ReadOnlyBackend;
use crate::error::Result;
use crate::models::{FolderReference, Listing, RemoteItem};
use async_trait::async_trait;

/// Unified interface for remote drives.
///
/// All operations are single network round-trips from the caller's point of
/// view. Implementations do not retry; retry policy belongs to the caller.
///
/// # Path Handling
/// Paths are absolute drive paths (`/Camera/2023/04/02`). Implementations
/// must normalize them with [`validate_path`](crate::validate_path) before
/// use.
///
/// # Examples
///
/// ```
/// use drivesort_storage::{StorageBackend, error::Result};
///
/// async fn count_files(backend: &dyn StorageBackend) -> Result<usize> {
///     let listing = backend.list_children("/Pictures/Camera Roll").await?;
///     Ok(listing.items.len())
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the configured backend, used for logging only.
    fn name(&self) -> &str;

    /// Fetch the current children of `folder`.
    ///
    /// The returned [`Listing`] never contains folders and may hold only part
    /// of the children; its `total` is the child count reported by the folder
    /// itself. Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the
    /// folder does not exist.
    async fn list_children(&self, folder: &str) -> Result<Listing>;

    /// Make sure the folder at `path` exists, creating every missing level of
    /// the hierarchy in one call.
    ///
    /// Idempotent: calling it for a folder that already exists succeeds and
    /// returns a reference to that same folder.
    async fn ensure_folder(&self, path: &str) -> Result<FolderReference>;

    /// Move the item `item_id` into the folder `destination_id`, giving it
    /// `name`. Returns the item as the service reports it after the move.
    ///
    /// No partial success: if this returns an error the move must be treated
    /// as not having happened.
    async fn move_item(&self, item_id: &str, destination_id: &str, name: &str) -> Result<RemoteItem>;
}
