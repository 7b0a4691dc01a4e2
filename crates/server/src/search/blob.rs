//! Document uploads to blob storage.

use tracing::{info, instrument};

use searchgate_core::{BlobHandle, ContainerName, blob_name_from_filename};

use super::error::SearchError;
use super::services::BlobStorageService;

/// Stores raw documents where the indexer will pick them up.
pub struct BlobStoreGateway<'a> {
    blobs: &'a dyn BlobStorageService,
}

impl<'a> BlobStoreGateway<'a> {
    pub const fn new(blobs: &'a dyn BlobStorageService) -> Self {
        Self { blobs }
    }

    /// Store `payload` under a name derived from `filename`.
    ///
    /// The blob name is the final path component of `filename`. An existing
    /// blob with the same name is replaced.
    ///
    /// # Errors
    ///
    /// - [`SearchError::InvalidDocument`] if no usable name can be derived
    /// - [`SearchError::StorageUnavailable`] if the store cannot be reached
    #[instrument(skip(self, payload), fields(container = %container, size = payload.len()))]
    pub async fn upload(
        &self,
        container: &ContainerName,
        filename: &str,
        payload: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<BlobHandle, SearchError> {
        let name = blob_name_from_filename(filename)
            .map_err(|e| SearchError::invalid_document(e.to_string()))?;
        let handle = BlobHandle::new(container.clone(), name);

        self.blobs.put_blob(&handle, payload, content_type).await?;

        info!(blob = %handle.name, "Document uploaded");
        Ok(handle)
    }

    /// Read back a stored document.
    ///
    /// # Errors
    ///
    /// - [`SearchError::NotFound`] if nothing is stored at `handle`
    /// - [`SearchError::StorageUnavailable`] if the store cannot be reached
    #[instrument(skip(self), fields(container = %handle.container, blob = %handle.name))]
    pub async fn download(&self, handle: &BlobHandle) -> Result<Vec<u8>, SearchError> {
        self.blobs.get_blob(handle).await?.ok_or_else(|| {
            SearchError::not_found(format!(
                "blob '{}' in container '{}'",
                handle.name, handle.container
            ))
        })
    }
}
