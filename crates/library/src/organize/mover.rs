use crate::organize::error::{ErrorKind, Result, from_storage};
use crate::retry::RetryPolicy;
use drivesort_storage::{BackendHandle, FolderReference, RemoteItem};
use std::ops::Deref;

/// Moves items into their destination folder, retrying according to a
/// [`RetryPolicy`].
pub struct Mover<'a> {
    backend: &'a BackendHandle,
    policy: RetryPolicy,
}

impl<'a> Mover<'a> {
    pub fn new(backend: &'a BackendHandle, policy: RetryPolicy) -> Self {
        Self { backend, policy }
    }

    /// Move `item` into `destination`, keeping its name.
    ///
    /// Every failed attempt is logged. Between attempts the mover sleeps for
    /// the policy's backoff; a failure the policy does not consider retryable
    /// ends the loop straight away. No attempt is made to find out whether a
    /// failed request went through anyway.
    ///
    /// # Errors
    /// [`MoveFailed`](ErrorKind::MoveFailed) naming the item, with the last
    /// storage error as its cause, or [`AuthFailed`](ErrorKind::AuthFailed).
    #[tracing::instrument(level = "debug", skip_all, fields(item = %item.name, destination = %destination.path))]
    pub async fn relocate(&self, item: &RemoteItem, destination: &FolderReference) -> Result<RemoteItem> {
        let mut attempt = 1;
        loop {
            match self.backend.move_item(&item.id, &destination.id, &item.name).await {
                Ok(moved) => {
                    tracing::debug!(attempt, "Moved");
                    return Ok(moved);
                },
                Err(e) if self.policy.should_retry(attempt, e.deref()) => {
                    let delay = self.policy.delay_before(attempt + 1);
                    tracing::warn!(
                        attempt,
                        max_attempts = self.policy.max_attempts(),
                        delay_ms = delay.as_millis() as u64,
                        error = %e.deref(),
                        "Move failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                },
                Err(e) => {
                    tracing::warn!(attempt, error = %e.deref(), "Move failed, giving up");
                    return Err(from_storage(e, || ErrorKind::MoveFailed(item.name.clone())));
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::Backoff;
    use drivesort_storage::StorageBackend;
    use drivesort_storage::backend::MockBackend;
    use std::sync::Arc;
    use std::time::Duration;

    fn instant(attempts: u32) -> RetryPolicy {
        RetryPolicy::new(attempts, Backoff::Fixed(Duration::ZERO))
    }

    async fn setup(mock: MockBackend) -> (Arc<MockBackend>, BackendHandle, FolderReference) {
        let mock = Arc::new(mock);
        let folder = mock.ensure_folder("/Camera/2023/03/30").await.unwrap();
        let backend: BackendHandle = mock.clone();
        (mock, backend, folder)
    }

    fn items() -> Vec<RemoteItem> {
        vec![RemoteItem::file("1", "a.jpg", "image/jpeg")]
    }

    #[tokio::test]
    async fn test_succeeds_after_two_failures() {
        let (mock, backend, folder) = setup(MockBackend::with_items("/Pictures", items()).with_failing_moves(2)).await;
        let item = &items()[0];

        let moved = Mover::new(&backend, instant(3)).relocate(item, &folder).await.unwrap();
        assert_eq!(moved.name, "a.jpg");
        assert_eq!(mock.move_calls(), 3);
        assert_eq!(mock.location_of("1").await.as_deref(), Some("/Camera/2023/03/30"));
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let (mock, backend, folder) = setup(MockBackend::with_items("/Pictures", items()).with_all_moves_failing()).await;

        let err = Mover::new(&backend, instant(3)).relocate(&items()[0], &folder).await.unwrap_err();
        assert_eq!(*err, ErrorKind::MoveFailed("a.jpg".into()));
        assert_eq!(mock.move_calls(), 3);
        assert_eq!(mock.location_of("1").await.as_deref(), Some("/Pictures"));
    }

    #[tokio::test]
    async fn test_non_retryable_failure_stops_immediately() {
        let (mock, backend, _) = setup(MockBackend::with_items("/Pictures", items())).await;
        let missing = FolderReference { id: "nowhere".into(), path: "/Camera/2023/03/31".into() };
        let policy = instant(3).only_retryable_errors();

        let err = Mover::new(&backend, policy).relocate(&items()[0], &missing).await.unwrap_err();
        assert_eq!(*err, ErrorKind::MoveFailed("a.jpg".into()));
        assert_eq!(mock.move_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_between_attempts() {
        let (_, backend, folder) = setup(MockBackend::with_items("/Pictures", items()).with_failing_moves(2)).await;
        let started = tokio::time::Instant::now();

        Mover::new(&backend, RetryPolicy::default()).relocate(&items()[0], &folder).await.unwrap();
        assert_eq!(started.elapsed(), Duration::from_secs(6));
    }
}
