use crate::Context;
use crate::category::{FileCategory, classify};
use crate::destination::{DestinationPath, resolve_date};
use crate::organize::error::{ErrorKind, Result};
use crate::organize::mover::Mover;
use crate::organize::provision::FolderProvisioner;
use drivesort_storage::{BackendHandle, RemoteItem};
use exn::ResultExt;
use time::UtcOffset;

/// The outcome of (successfully) organizing a single item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Moved {
    /// The item as the service reported it after the move.
    pub item: RemoteItem,
    pub category: FileCategory,
    pub destination: DestinationPath,
}

/// Moves a single item into its dated destination folder.
///
/// Classifies the item, resolves its local date, makes sure the destination
/// folder exists and then moves the item there, retrying the move according
/// to the [`Context`]'s retry policy.
///
/// # Errors
/// Returns [`Exn<ErrorKind::Item>`](ErrorKind::Item) naming the item, raised
/// from the step that failed.
pub async fn organize_item(backend: &BackendHandle, ctx: &Context, item: &RemoteItem) -> Result<Moved> {
    Pipeline::new(backend, ctx).run(item).await
}

/// Per-run wiring of the steps every item goes through.
pub(crate) struct Pipeline<'a> {
    provisioner: FolderProvisioner<'a>,
    mover: Mover<'a>,
    offset: UtcOffset,
}

impl<'a> Pipeline<'a> {
    pub(crate) fn new(backend: &'a BackendHandle, ctx: &Context) -> Self {
        Self {
            provisioner: FolderProvisioner::new(backend),
            mover: Mover::new(backend, ctx.retry),
            offset: ctx.offset,
        }
    }

    pub(crate) async fn run(&self, item: &RemoteItem) -> Result<Moved> {
        self.run_inner(item).await.or_raise(|| ErrorKind::Item(item.name.clone()))
    }

    #[tracing::instrument(level = "debug", skip_all, fields(item = %item.name))]
    async fn run_inner(&self, item: &RemoteItem) -> Result<Moved> {
        let category = classify(item);
        if category == FileCategory::Unknown {
            tracing::warn!(
                mime_type = item.mime_type.as_deref().unwrap_or("none"),
                root = category.root(),
                "Item is neither photo nor video, filing it with the photos"
            );
        }
        let date = resolve_date(item, self.offset)?;
        let destination = DestinationPath::new(category, date);
        let folder = self.provisioner.provision(&destination).await?;
        let moved = self.mover.relocate(item, &folder).await?;
        tracing::info!(%category, destination = %destination, "Organized");
        Ok(Moved { item: moved, category, destination })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drivesort_storage::backend::MockBackend;
    use std::sync::Arc;
    use time::macros::{datetime, offset};

    fn setup(items: Vec<RemoteItem>) -> (Arc<MockBackend>, BackendHandle) {
        let mock = Arc::new(MockBackend::with_items("/Pictures", items));
        let backend: BackendHandle = mock.clone();
        (mock, backend)
    }

    #[tokio::test]
    async fn test_photo_goes_to_taken_date() {
        let item = RemoteItem::file("1", "a.jpg", "image/jpeg")
            .with_taken(datetime!(2023-03-30 12:00 UTC))
            .with_created(datetime!(2023-04-05 12:00 UTC));
        let (mock, backend) = setup(vec![item.clone()]);

        let moved = organize_item(&backend, &Context::new("/Pictures"), &item).await.unwrap();
        assert_eq!(moved.category, FileCategory::Photo);
        assert_eq!(moved.destination.as_str(), "/Camera/2023/03/30");
        assert_eq!(mock.location_of("1").await.as_deref(), Some("/Camera/2023/03/30"));
    }

    #[tokio::test]
    async fn test_local_offset_decides_the_day() {
        let item = RemoteItem::file("1", "b.mp4", "video/mp4").with_created(datetime!(2023-04-01 23:30 UTC));
        let (_, backend) = setup(vec![item.clone()]);
        let ctx = Context::new("/Pictures").with_offset(offset!(+2));

        let moved = organize_item(&backend, &ctx, &item).await.unwrap();
        assert_eq!(moved.destination.as_str(), "/Camera - Video/2023/04/02");
    }

    #[tokio::test]
    async fn test_unknown_files_with_photos() {
        let item = RemoteItem::file("1", "notes.pdf", "application/pdf").with_created(datetime!(2023-04-02 08:00 UTC));
        let (_, backend) = setup(vec![item.clone()]);

        let moved = organize_item(&backend, &Context::new("/Pictures"), &item).await.unwrap();
        assert_eq!(moved.category, FileCategory::Unknown);
        assert_eq!(moved.destination.as_str(), "/Camera/2023/04/02");
    }

    #[tokio::test]
    async fn test_missing_timestamp_touches_nothing() {
        let item = RemoteItem::file("1", "a.jpg", "image/jpeg");
        let (mock, backend) = setup(vec![item.clone()]);

        let err = organize_item(&backend, &Context::new("/Pictures"), &item).await.unwrap_err();
        assert_eq!(*err, ErrorKind::Item("a.jpg".into()));
        assert!(format!("{err:?}").contains("a.jpg has no photo or creation timestamp"));
        assert_eq!(mock.ensure_calls(), 0);
        assert_eq!(mock.move_calls(), 0);
    }
}
