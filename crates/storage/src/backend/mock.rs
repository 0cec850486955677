//! In-memory storage backend for testing.

use crate::StorageBackend;
use crate::error::{ErrorKind, Result};
use crate::models::{FolderReference, Listing, RemoteItem};
use crate::path::validate as validate_path;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

struct Entry {
    parent: String,
    item: RemoteItem,
}

#[derive(Default)]
struct Inner {
    /// Files in insertion order, which is also listing order.
    entries: Vec<Entry>,
    /// Folder path to reference.
    folders: HashMap<String, FolderReference>,
    next_folder: u64,
    /// Number of upcoming move calls that will fail.
    failing_moves: usize,
}
impl Inner {
    fn register_folder(&mut self, path: &str) -> FolderReference {
        if let Some(existing) = self.folders.get(path) {
            return existing.clone();
        }
        self.next_folder += 1;
        let folder = FolderReference {
            id: format!("folder-{}", self.next_folder),
            path: path.to_string(),
        };
        self.folders.insert(path.to_string(), folder.clone());
        folder
    }
}

/// In-memory drive for testing.
///
/// Files live in a `Vec` behind a [`RwLock`], so all trait methods can operate
/// on `&self` without external synchronisation. Besides behaving like a real
/// drive, it can be told to misbehave in the ways the organizer has to cope
/// with: partial listings, failing moves, refused folders, and listings that
/// keep reporting items that were already moved.
///
/// # Examples
///
/// ```
/// use drivesort_storage::backend::MockBackend;
/// use drivesort_storage::{RemoteItem, StorageBackend};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::with_items("/Pictures", [
///     RemoteItem::file("1", "a.jpg", "image/jpeg"),
/// ]);
/// let folder = backend.ensure_folder("/Camera/2023/04/02").await.unwrap();
/// backend.move_item("1", &folder.id, "a.jpg").await.unwrap();
/// assert!(backend.list_children("/Pictures").await.unwrap().is_empty());
/// # Ok(())
/// # }
/// ```
pub struct MockBackend {
    name: String,
    page_size: Option<usize>,
    fail_all_moves: bool,
    stale_listings: bool,
    denied: HashSet<String>,
    state: RwLock<Inner>,
    list_calls: AtomicUsize,
    ensure_calls: AtomicUsize,
    move_calls: AtomicUsize,
}

impl MockBackend {
    /// Create a mock drive whose `folder` holds `items`.
    ///
    /// Panics if `folder` fails validation. If test setup is wrong, then test
    /// should not pass.
    pub fn with_items(folder: impl AsRef<str>, items: impl IntoIterator<Item = RemoteItem>) -> Self {
        let Ok(folder) = validate_path(folder.as_ref()) else {
            // The panic here is DELIBERATE. MockBackend is intended to be
            // used in tests; panics are expected. There is no error result.
            panic!("MockBackend::with_items: invalid path {}", folder.as_ref());
        };
        let mut inner = Inner::default();
        inner.register_folder(&folder);
        inner.entries = items.into_iter().map(|item| Entry { parent: folder.clone(), item }).collect();
        Self {
            name: "mock".to_string(),
            page_size: None,
            fail_all_moves: false,
            stale_listings: false,
            denied: HashSet::new(),
            state: RwLock::new(inner),
            list_calls: AtomicUsize::new(0),
            ensure_calls: AtomicUsize::new(0),
            move_calls: AtomicUsize::new(0),
        }
    }

    /// Change the name of the mock backend.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Return at most `size` items per listing, like the real service does
    /// when children are expanded inline.
    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = Some(size);
        self
    }

    /// Fail the next `count` move calls with a network error.
    pub fn with_failing_moves(mut self, count: usize) -> Self {
        self.state.get_mut().failing_moves = count;
        self
    }

    /// Fail every move call with a network error.
    pub fn with_all_moves_failing(mut self) -> Self {
        self.fail_all_moves = true;
        self
    }

    /// Refuse to create (or return) the folder at `path` and anything below it.
    pub fn with_denied_folder(mut self, path: impl AsRef<str>) -> Self {
        self.denied.insert(validate_path(path.as_ref()).unwrap_or_else(|_| path.as_ref().to_string()));
        self
    }

    /// Acknowledge moves without actually relocating anything, so listings
    /// keep reporting the same items forever.
    pub fn with_stale_listings(mut self) -> Self {
        self.stale_listings = true;
        self
    }

    /// Folder path the item currently lives in, if the item exists.
    pub async fn location_of(&self, id: &str) -> Option<String> {
        self.state.read().await.entries.iter().find(|e| e.item.id == id).map(|e| e.parent.clone())
    }

    /// All known folder paths, sorted.
    pub async fn folder_paths(&self) -> Vec<String> {
        let mut paths: Vec<_> = self.state.read().await.folders.keys().cloned().collect();
        paths.sort();
        paths
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn ensure_calls(&self) -> usize {
        self.ensure_calls.load(Ordering::SeqCst)
    }

    pub fn move_calls(&self) -> usize {
        self.move_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_children(&self, folder: &str) -> Result<Listing> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let folder = validate_path(folder)?;
        let guard = self.state.read().await;
        if !guard.folders.contains_key(&folder) {
            exn::bail!(ErrorKind::NotFound(folder));
        }
        let files: Vec<RemoteItem> =
            guard.entries.iter().filter(|e| e.parent == folder).map(|e| e.item.clone()).collect();
        let subfolders = guard.folders.keys().filter(|path| parent_of(path) == Some(folder.as_str())).count();
        let total = (files.len() + subfolders) as u64;
        let page = match self.page_size {
            Some(size) => files.into_iter().take(size).collect(),
            None => files,
        };
        Ok(Listing::new(page, total))
    }

    async fn ensure_folder(&self, path: &str) -> Result<FolderReference> {
        self.ensure_calls.fetch_add(1, Ordering::SeqCst);
        let path = validate_path(path)?;
        if self.denied.iter().any(|denied| path == *denied || path.starts_with(&format!("{denied}/"))) {
            exn::bail!(ErrorKind::PermissionDenied(path));
        }
        let mut guard = self.state.write().await;
        // Every ancestor first, so the whole hierarchy exists afterwards.
        let mut prefix = String::new();
        let mut folder = None;
        for segment in path.trim_start_matches('/').split('/') {
            prefix.push('/');
            prefix.push_str(segment);
            folder = Some(guard.register_folder(&prefix));
        }
        // Infallible: validated paths always have at least one segment.
        folder.ok_or_else(|| exn::Exn::from(ErrorKind::InvalidPath(path)))
    }

    async fn move_item(&self, item_id: &str, destination_id: &str, name: &str) -> Result<RemoteItem> {
        self.move_calls.fetch_add(1, Ordering::SeqCst);
        let mut guard = self.state.write().await;
        if self.fail_all_moves {
            exn::bail!(ErrorKind::Network("connection reset by mock".to_string()));
        }
        if guard.failing_moves > 0 {
            guard.failing_moves -= 1;
            exn::bail!(ErrorKind::Network("connection reset by mock".to_string()));
        }
        let destination = guard
            .folders
            .values()
            .find(|f| f.id == destination_id)
            .map(|f| f.path.clone())
            .ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(destination_id.to_string())))?;
        let stale = self.stale_listings;
        let entry = guard
            .entries
            .iter_mut()
            .find(|e| e.item.id == item_id)
            .ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(item_id.to_string())))?;
        let mut moved = entry.item.clone();
        moved.name = name.to_string();
        if !stale {
            entry.parent = destination;
            entry.item = moved.clone();
        }
        Ok(moved)
    }
}

fn parent_of(path: &str) -> Option<&str> {
    match path.rfind('/') {
        Some(0) if path.len() > 1 => Some("/"),
        Some(idx) if idx > 0 => Some(&path[..idx]),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn photos() -> MockBackend {
        MockBackend::with_items(
            "/Pictures",
            [
                RemoteItem::file("1", "a.jpg", "image/jpeg"),
                RemoteItem::file("2", "b.mp4", "video/mp4"),
                RemoteItem::file("3", "c.png", "image/png"),
            ],
        )
    }

    #[tokio::test]
    async fn test_list_children() {
        let backend = photos();
        let listing = backend.list_children("/Pictures").await.unwrap();
        assert_eq!(listing.len(), 3);
        assert_eq!(listing.total, 3);
        assert_eq!(backend.list_calls(), 1);
    }

    #[tokio::test]
    async fn test_list_not_found() {
        let err = photos().list_children("/Nope").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_page_size() {
        let backend = photos().with_page_size(2);
        let listing = backend.list_children("/Pictures").await.unwrap();
        assert_eq!(listing.len(), 2);
        assert_eq!(listing.total, 3);
    }

    #[tokio::test]
    async fn test_ensure_folder_creates_hierarchy() {
        let backend = photos();
        let folder = backend.ensure_folder("/Camera/2023/04/02").await.unwrap();
        assert_eq!(folder.path, "/Camera/2023/04/02");
        assert_eq!(
            backend.folder_paths().await,
            vec!["/Camera", "/Camera/2023", "/Camera/2023/04", "/Camera/2023/04/02", "/Pictures"]
        );
    }

    #[tokio::test]
    async fn test_ensure_folder_idempotent() {
        let backend = photos();
        let first = backend.ensure_folder("/Camera/2023").await.unwrap();
        let second = backend.ensure_folder("/Camera/2023/").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(backend.ensure_calls(), 2);
    }

    #[tokio::test]
    async fn test_ensure_folder_denied() {
        let backend = photos().with_denied_folder("/Camera/2023");
        let err = backend.ensure_folder("/Camera/2023").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn test_move_item() {
        let backend = photos();
        let folder = backend.ensure_folder("/Camera/2023/04/02").await.unwrap();
        let moved = backend.move_item("1", &folder.id, "a.jpg").await.unwrap();
        assert_eq!(moved.id, "1");
        assert_eq!(backend.location_of("1").await.as_deref(), Some("/Camera/2023/04/02"));
        let listing = backend.list_children("/Pictures").await.unwrap();
        assert_eq!(listing.len(), 2);
    }

    #[tokio::test]
    async fn test_move_unknown_destination() {
        let err = photos().move_item("1", "folder-404", "a.jpg").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_failing_moves() {
        let backend = photos().with_failing_moves(1);
        let folder = backend.ensure_folder("/Camera").await.unwrap();
        let err = backend.move_item("1", &folder.id, "a.jpg").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Network(_)));
        backend.move_item("1", &folder.id, "a.jpg").await.unwrap();
        assert_eq!(backend.move_calls(), 2);
    }

    #[tokio::test]
    async fn test_stale_listings() {
        let backend = photos().with_stale_listings();
        let folder = backend.ensure_folder("/Camera").await.unwrap();
        backend.move_item("1", &folder.id, "a.jpg").await.unwrap();
        assert_eq!(backend.location_of("1").await.as_deref(), Some("/Pictures"));
    }

    #[tokio::test]
    async fn test_total_counts_subfolders() {
        let backend = photos();
        backend.ensure_folder("/Pictures/Albums").await.unwrap();
        let listing = backend.list_children("/Pictures").await.unwrap();
        assert_eq!(listing.len(), 3);
        assert_eq!(listing.total, 4);
    }

    #[test]
    fn test_parent_of() {
        assert_eq!(parent_of("/Camera/2023"), Some("/Camera"));
        assert_eq!(parent_of("/Camera"), Some("/"));
        assert_eq!(parent_of("/"), None);
    }

    #[test]
    #[should_panic(expected = "invalid path")]
    fn test_with_items_panics_on_bad_path() {
        MockBackend::with_items("../escape", Vec::new());
    }
}
