//! Remote drive models.
//!
//! These types are snapshots of what the storage service reported at the time
//! of a call. Nothing in here is ever mutated in place to reflect a change on
//! the remote side; a move returns a fresh [`RemoteItem`] instead.

use time::OffsetDateTime;

/// Marker carried by folder items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FolderFacet {
    /// Number of direct children, as reported by the service
    pub child_count: u64,
}

/// A file or folder record as reported by the storage service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteItem {
    /// Opaque identifier, stable across moves
    pub id: String,
    /// Display name (file name including extension)
    pub name: String,
    /// MIME type, present for files
    pub mime_type: Option<String>,
    /// When the item was created on the drive
    pub created: Option<OffsetDateTime>,
    /// When the photo (or video) was taken, if the service extracted it
    pub taken: Option<OffsetDateTime>,
    /// Present only for folders
    pub folder: Option<FolderFacet>,
}
impl RemoteItem {
    /// Create a file item with no timestamps; use the `with_*` builders to add
    /// the rest.
    pub fn file(id: impl Into<String>, name: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            mime_type: Some(mime_type.into()),
            created: None,
            taken: None,
            folder: None,
        }
    }

    /// Create a folder item.
    pub fn folder(id: impl Into<String>, name: impl Into<String>, child_count: u64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            mime_type: None,
            created: None,
            taken: None,
            folder: Some(FolderFacet { child_count }),
        }
    }

    pub fn with_created(mut self, created: OffsetDateTime) -> Self {
        self.created = Some(created);
        self
    }

    pub fn with_taken(mut self, taken: OffsetDateTime) -> Self {
        self.taken = Some(taken);
        self
    }

    pub fn is_folder(&self) -> bool {
        self.folder.is_some()
    }
}

/// Identifier and path of a remote folder, used as a move destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderReference {
    pub id: String,
    pub path: String,
}

/// The children of a folder, paired with the folder's total child count at
/// query time.
///
/// `items` never contains folders. `total` is whatever the parent folder
/// reported and counts *all* children (folders included), so it can be larger
/// than `items.len()` both because of folders and because the service only
/// returned part of the children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    pub items: Vec<RemoteItem>,
    pub total: u64,
}
impl Listing {
    /// Build a listing from raw children, dropping folders.
    pub fn new(children: impl IntoIterator<Item = RemoteItem>, total: u64) -> Self {
        let items = children.into_iter().filter(|c| !c.is_folder()).collect();
        Self { items, total }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}
impl IntoIterator for Listing {
    type Item = RemoteItem;
    type IntoIter = std::vec::IntoIter<RemoteItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_excludes_folders() {
        let listing = Listing::new(
            [
                RemoteItem::file("1", "a.jpg", "image/jpeg"),
                RemoteItem::folder("2", "Albums", 4),
                RemoteItem::file("3", "b.mp4", "video/mp4"),
            ],
            3,
        );
        assert_eq!(listing.len(), 2);
        assert_eq!(listing.total, 3);
        assert!(listing.items.iter().all(|i| !i.is_folder()));
    }

    #[test]
    fn test_empty_listing() {
        let listing = Listing::new([RemoteItem::folder("2", "Albums", 0)], 1);
        assert!(listing.is_empty());
        assert_eq!(listing.total, 1);
    }
}
