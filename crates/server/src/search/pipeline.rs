//! Pipeline orchestration.
//!
//! [`SearchPipeline`] holds the collaborator handles and the configured
//! resource names, and sequences the components so that dependencies are
//! satisfied before anything that references them.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{info, instrument};

use searchgate_core::{BlobHandle, IndexSchema, IndexerDefinition, ResourceName};

use super::blob::BlobStoreGateway;
use super::datasource::DataSourceRegistrar;
use super::error::SearchError;
use super::indexer::IndexerJobController;
use super::schema::{SchemaManager, default_schema};
use super::services::{BlobStorageService, SearchIndexService, SearchIndexerService};
use crate::config::PipelineNames;

/// External service handles. Any of them may be absent.
#[derive(Clone, Default)]
pub struct Collaborators {
    pub indexes: Option<Arc<dyn SearchIndexService>>,
    pub indexers: Option<Arc<dyn SearchIndexerService>>,
    pub blobs: Option<Arc<dyn BlobStorageService>>,
    /// Connection descriptor registered with the data source.
    pub storage_connection: Option<SecretString>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("indexes", &self.indexes.is_some())
            .field("indexers", &self.indexers.is_some())
            .field("blobs", &self.blobs.is_some())
            .field("storage_connection", &self.storage_connection.is_some())
            .finish()
    }
}

/// Names of everything [`SearchPipeline::provision`] created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionReport {
    pub index: ResourceName,
    pub data_source: ResourceName,
    pub indexer: ResourceName,
}

/// Orchestrates schema, data source, indexer and upload operations.
#[derive(Debug, Clone)]
pub struct SearchPipeline {
    collaborators: Collaborators,
    names: PipelineNames,
}

impl SearchPipeline {
    #[must_use]
    pub const fn new(collaborators: Collaborators, names: PipelineNames) -> Self {
        Self {
            collaborators,
            names,
        }
    }

    /// The configured resource names.
    #[must_use]
    pub const fn names(&self) -> &PipelineNames {
        &self.names
    }

    /// The index layout used when the caller supplies none.
    #[must_use]
    pub fn default_schema(&self) -> IndexSchema {
        default_schema(self.names.index_name.clone())
    }

    /// Whether every collaborator handle is configured.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.collaborators.indexes.is_some()
            && self.collaborators.indexers.is_some()
            && self.collaborators.blobs.is_some()
            && self.collaborators.storage_connection.is_some()
    }

    fn indexes(&self) -> Result<&dyn SearchIndexService, SearchError> {
        self.collaborators
            .indexes
            .as_deref()
            .ok_or(SearchError::CollaboratorUnconfigured("index_client"))
    }

    fn indexers(&self) -> Result<&dyn SearchIndexerService, SearchError> {
        self.collaborators
            .indexers
            .as_deref()
            .ok_or(SearchError::CollaboratorUnconfigured("indexer_client"))
    }

    fn blobs(&self) -> Result<&dyn BlobStorageService, SearchError> {
        self.collaborators
            .blobs
            .as_deref()
            .ok_or(SearchError::CollaboratorUnconfigured("blob_service_client"))
    }

    fn storage_connection(&self) -> Result<&str, SearchError> {
        self.collaborators
            .storage_connection
            .as_ref()
            .map(|secret| secret.expose_secret())
            .ok_or(SearchError::CollaboratorUnconfigured(
                "storage_connection_string",
            ))
    }

    /// Create or update an index. `None` applies the default layout.
    ///
    /// # Errors
    ///
    /// See [`SchemaManager::upsert_index`].
    pub async fn upsert_index(
        &self,
        schema: Option<IndexSchema>,
    ) -> Result<ResourceName, SearchError> {
        let schema = schema.unwrap_or_else(|| self.default_schema());
        SchemaManager::new(self.indexes()?)
            .upsert_index(&schema)
            .await
    }

    /// Register the configured data source against the configured container.
    ///
    /// # Errors
    ///
    /// See [`DataSourceRegistrar::upsert_data_source`].
    pub async fn upsert_data_source(&self) -> Result<ResourceName, SearchError> {
        let connection = self.storage_connection()?;
        DataSourceRegistrar::new(self.indexers()?)
            .upsert_data_source(
                &self.names.data_source_name,
                &self.names.container_name,
                connection,
            )
            .await
    }

    /// Define the configured indexer. The data source and index must exist.
    ///
    /// # Errors
    ///
    /// See [`IndexerJobController::upsert_indexer`].
    pub async fn upsert_indexer(&self) -> Result<ResourceName, SearchError> {
        IndexerJobController::new(self.indexes()?, self.indexers()?)
            .upsert_indexer(&self.indexer_definition())
            .await
    }

    /// Register the data source, then define the indexer over it.
    ///
    /// The index is not created here; it must already exist.
    ///
    /// # Errors
    ///
    /// Fails with the first step's error. A failed indexer step leaves the
    /// data source registered.
    #[instrument(skip(self), fields(indexer = %self.names.indexer_name))]
    pub async fn register_indexer(&self) -> Result<ResourceName, SearchError> {
        // Both handles up front so nothing is written when either is absent.
        self.indexes()?;
        self.indexers()?;

        self.upsert_data_source().await?;
        self.upsert_indexer().await
    }

    /// Upload a document into the configured container.
    ///
    /// # Errors
    ///
    /// See [`BlobStoreGateway::upload`].
    pub async fn upload_document(
        &self,
        filename: &str,
        payload: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<BlobHandle, SearchError> {
        BlobStoreGateway::new(self.blobs()?)
            .upload(&self.names.container_name, filename, payload, content_type)
            .await
    }

    /// Read back a document from the configured container.
    ///
    /// # Errors
    ///
    /// See [`BlobStoreGateway::download`].
    pub async fn download_document(&self, handle: &BlobHandle) -> Result<Vec<u8>, SearchError> {
        BlobStoreGateway::new(self.blobs()?).download(handle).await
    }

    /// Trigger a run of the configured indexer.
    ///
    /// # Errors
    ///
    /// See [`IndexerJobController::run_indexer`].
    pub async fn run_indexer(&self) -> Result<ResourceName, SearchError> {
        IndexerJobController::new(self.indexes()?, self.indexers()?)
            .run_indexer(&self.names.indexer_name)
            .await?;
        Ok(self.names.indexer_name.clone())
    }

    /// Bring up the whole pipeline: index and data source concurrently,
    /// then the indexer once both exist.
    ///
    /// Every step is an upsert, so a failed call can be retried as a whole.
    ///
    /// # Errors
    ///
    /// Fails with the first error from any step. Steps that already
    /// succeeded are not rolled back.
    #[instrument(skip(self, schema))]
    pub async fn provision(
        &self,
        schema: Option<IndexSchema>,
    ) -> Result<ProvisionReport, SearchError> {
        self.indexes()?;
        self.indexers()?;
        self.storage_connection()?;

        let (index, data_source) =
            tokio::try_join!(self.upsert_index(schema), self.upsert_data_source())?;

        let definition = IndexerDefinition {
            target_index_name: index.clone(),
            ..self.indexer_definition()
        };
        let indexer = IndexerJobController::new(self.indexes()?, self.indexers()?)
            .upsert_indexer(&definition)
            .await?;

        info!(%index, %data_source, %indexer, "Pipeline provisioned");
        Ok(ProvisionReport {
            index,
            data_source,
            indexer,
        })
    }

    fn indexer_definition(&self) -> IndexerDefinition {
        IndexerDefinition {
            name: self.names.indexer_name.clone(),
            data_source_name: self.names.data_source_name.clone(),
            target_index_name: self.names.index_name.clone(),
            schedule: self.names.schedule.clone(),
        }
    }
}
