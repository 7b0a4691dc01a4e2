//! Collaborator interfaces consumed by the pipeline.
//!
//! Each trait is one external service. Implementations are injected into
//! [`SearchPipeline`](super::SearchPipeline) as `Arc<dyn ...>` so the REST
//! clients and the in-memory services are interchangeable.

use async_trait::async_trait;

use searchgate_core::{BlobHandle, DataSourceConnection, IndexSchema, IndexerDefinition, ResourceName};

use super::error::SearchError;

/// Index definitions on the search service.
#[async_trait]
pub trait SearchIndexService: Send + Sync {
    /// Fetch the deployed definition of an index.
    ///
    /// Returns `Ok(None)` if the index does not exist.
    async fn get_index(&self, name: &ResourceName) -> Result<Option<IndexSchema>, SearchError>;

    /// Create or update an index. Returns the accepted index name.
    async fn upsert_index(&self, schema: &IndexSchema) -> Result<ResourceName, SearchError>;
}

/// Data sources and indexers on the search service.
#[async_trait]
pub trait SearchIndexerService: Send + Sync {
    /// Whether a data source with this name exists.
    async fn data_source_exists(&self, name: &ResourceName) -> Result<bool, SearchError>;

    /// Create or update a data source. Returns the accepted name.
    async fn upsert_data_source(
        &self,
        data_source: &DataSourceConnection,
    ) -> Result<ResourceName, SearchError>;

    /// Whether an indexer with this name exists.
    async fn indexer_exists(&self, name: &ResourceName) -> Result<bool, SearchError>;

    /// Create or update an indexer. Returns the accepted name.
    ///
    /// Fails with [`SearchError::MissingDependency`] if the referenced data
    /// source or index is absent.
    async fn upsert_indexer(
        &self,
        indexer: &IndexerDefinition,
    ) -> Result<ResourceName, SearchError>;

    /// Trigger a run. Success means the run was accepted, not completed.
    ///
    /// Fails with [`SearchError::NotFound`] for an unknown indexer and
    /// [`SearchError::IndexerBusy`] if a run is already in progress.
    async fn run_indexer(&self, name: &ResourceName) -> Result<(), SearchError>;
}

/// Blob storage.
#[async_trait]
pub trait BlobStorageService: Send + Sync {
    /// Store `payload` at `handle`, replacing any existing content.
    async fn put_blob(
        &self,
        handle: &BlobHandle,
        payload: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<(), SearchError>;

    /// Read the current content at `handle`, or `None` if absent.
    async fn get_blob(&self, handle: &BlobHandle) -> Result<Option<Vec<u8>>, SearchError>;
}
