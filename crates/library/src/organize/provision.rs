use crate::destination::DestinationPath;
use crate::organize::error::{ErrorKind, Result, from_storage};
use drivesort_storage::{BackendHandle, FolderReference};

/// Makes sure destination folders exist before anything is moved into them.
///
/// Provisioning is idempotent: asking for the same path twice yields the same
/// folder. There is no retry here; a rejected request surfaces immediately.
pub struct FolderProvisioner<'a> {
    backend: &'a BackendHandle,
}

impl<'a> FolderProvisioner<'a> {
    pub fn new(backend: &'a BackendHandle) -> Self {
        Self { backend }
    }

    /// Create (or look up) the folder at `path`, including every missing
    /// ancestor.
    ///
    /// # Errors
    /// [`RemoteOperationFailed`](ErrorKind::RemoteOperationFailed) carrying
    /// the path, or [`AuthFailed`](ErrorKind::AuthFailed).
    #[tracing::instrument(level = "debug", skip_all, fields(path = %path))]
    pub async fn provision(&self, path: &DestinationPath) -> Result<FolderReference> {
        let folder = self
            .backend
            .ensure_folder(path.as_str())
            .await
            .map_err(|e| from_storage(e, || ErrorKind::RemoteOperationFailed(path.to_string())))?;
        tracing::debug!(id = %folder.id, "Destination folder ready");
        Ok(folder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::FileCategory;
    use drivesort_storage::backend::MockBackend;
    use std::sync::Arc;
    use time::macros::date;

    #[tokio::test]
    async fn test_provision_is_idempotent() {
        let mock = Arc::new(MockBackend::with_items("/Pictures", Vec::new()));
        let backend: BackendHandle = mock.clone();
        let provisioner = FolderProvisioner::new(&backend);
        let path = DestinationPath::new(FileCategory::Photo, date!(2023 - 03 - 30));

        let first = provisioner.provision(&path).await.unwrap();
        let second = provisioner.provision(&path).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.path, "/Camera/2023/03/30");
        assert_eq!(mock.folder_paths().await, vec!["/Camera", "/Camera/2023", "/Camera/2023/03", "/Camera/2023/03/30", "/Pictures"]);
    }

    #[tokio::test]
    async fn test_rejection_is_not_retried() {
        let mock = Arc::new(MockBackend::with_items("/Pictures", Vec::new()).with_denied_folder("/Camera - Video"));
        let backend: BackendHandle = mock.clone();
        let path = DestinationPath::new(FileCategory::Video, date!(2023 - 04 - 02));

        let err = FolderProvisioner::new(&backend).provision(&path).await.unwrap_err();
        assert_eq!(*err, ErrorKind::RemoteOperationFailed("/Camera - Video/2023/04/02".into()));
        assert_eq!(mock.ensure_calls(), 1);
    }
}
