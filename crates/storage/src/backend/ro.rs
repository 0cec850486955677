//! Read-only (dry-run) storage backend.
//!
//! This module provides a storage backend implementation that wraps other
//! implementations and prevents write operations from executing, but
//! indicating success on return.

use async_trait::async_trait;
use std::collections::HashSet;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::models::{FolderReference, Listing, RemoteItem};
use crate::{BackendHandle, StorageBackend, validate_path};

/// Read-only storage backend.
///
/// Wraps another backend and silently drops all write operations, logging an
/// [`info event`](tracing::Event). Folders that would have been created get a
/// synthetic identifier derived from their path, and items that would have been
/// moved are hidden from subsequent listings so that a caller looping until the
/// source folder is empty still terminates.
///
/// # Partial listings
/// Nothing is ever moved, so a backend that returns only the first page of a
/// folder (Graph caps inline children at roughly 200) keeps returning that
/// same page. Once all of it is hidden the folder looks empty, and a dry run
/// over a larger folder stops after the first page.
pub struct ReadOnlyBackend {
    inner: BackendHandle,
    moved: RwLock<HashSet<String>>,
}
impl ReadOnlyBackend {
    pub fn new(inner: BackendHandle) -> Self {
        Self { inner, moved: RwLock::new(HashSet::new()) }
    }
}

#[async_trait]
impl StorageBackend for ReadOnlyBackend {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn list_children(&self, folder: &str) -> Result<Listing> {
        let listing = self.inner.list_children(folder).await?;
        let moved = self.moved.read().await;
        if moved.is_empty() {
            return Ok(listing);
        }
        let hidden = listing.items.iter().filter(|i| moved.contains(&i.id)).count() as u64;
        Ok(Listing {
            items: listing.items.into_iter().filter(|i| !moved.contains(&i.id)).collect(),
            total: listing.total.saturating_sub(hidden),
        })
    }

    async fn ensure_folder(&self, path: &str) -> Result<FolderReference> {
        let path = validate_path(path)?;
        tracing::info!(path = %path, "Skipping folder creation during read-only mode");
        Ok(FolderReference { id: format!("dry-run:{path}"), path })
    }

    async fn move_item(&self, item_id: &str, destination_id: &str, name: &str) -> Result<RemoteItem> {
        tracing::info!(item = item_id, name, destination = destination_id, "Skipping move during read-only mode");
        self.moved.write().await.insert(item_id.to_string());
        // The wrapped backend never saw the move; all we can report back is
        // what we were asked to do.
        Ok(RemoteItem {
            id: item_id.to_string(),
            name: name.to_string(),
            mime_type: None,
            created: None,
            taken: None,
            folder: None,
        })
    }
}
