//! Search indexing pipeline.
//!
//! Provisions a search index, registers a blob container as its data source,
//! defines an indexer linking the two, uploads documents into the container
//! and triggers indexer runs.
//!
//! # Components
//!
//! - [`SchemaManager`] - index definitions
//! - [`DataSourceRegistrar`] - data source definitions
//! - [`IndexerJobController`] - indexer definitions and runs
//! - [`BlobStoreGateway`] - document uploads
//! - [`SearchPipeline`] - sequences the above over injected collaborators
//!
//! Collaborators are either the REST clients in [`azure`] or the in-process
//! services in [`memory`], chosen by [`SearchBackend`].

pub mod azure;
mod blob;
mod datasource;
mod error;
mod indexer;
pub mod memory;
mod pipeline;
mod schema;
mod services;

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tracing::{info, warn};

use searchgate_core::ConnectionString;

use crate::config::{SearchBackend, ServerConfig};

pub use blob::BlobStoreGateway;
pub use datasource::DataSourceRegistrar;
pub use error::SearchError;
pub use indexer::IndexerJobController;
pub use pipeline::{Collaborators, ProvisionReport, SearchPipeline};
pub use schema::{SchemaManager, default_schema};
pub use services::{BlobStorageService, SearchIndexService, SearchIndexerService};

/// Descriptor registered with data sources when running in memory.
const MEMORY_CONNECTION_STRING: &str = "BlobEndpoint=memory://searchgate";

/// Build collaborator handles for the configured backend.
///
/// With the Azure backend, a handle is only present when its settings are;
/// absent handles surface as [`SearchError::CollaboratorUnconfigured`] when
/// an operation needs them.
///
/// # Errors
///
/// Returns [`SearchError::InvalidConnection`] if configured credentials are
/// unusable.
pub fn build_collaborators(config: &ServerConfig) -> Result<Collaborators, SearchError> {
    match config.search_backend {
        SearchBackend::Memory => {
            info!("Using in-memory search and blob services");
            let search = Arc::new(memory::InMemorySearchService::new());
            let storage_connection = config.storage.as_ref().map_or_else(
                || SecretString::from(MEMORY_CONNECTION_STRING),
                |storage| storage.connection_string.clone(),
            );
            Ok(Collaborators {
                indexes: Some(search.clone()),
                indexers: Some(search),
                blobs: Some(Arc::new(memory::InMemoryBlobStore::new())),
                storage_connection: Some(storage_connection),
            })
        }
        SearchBackend::Azure => {
            let mut collaborators = Collaborators::default();

            if let Some(search) = &config.search {
                let client = Arc::new(azure::AzureSearchClient::new(search, config.http_timeout)?);
                collaborators.indexes = Some(client.clone());
                collaborators.indexers = Some(client);
            } else {
                warn!("AZURE_SEARCH_ENDPOINT not set, search operations disabled");
            }

            if let Some(storage) = &config.storage {
                let connection =
                    ConnectionString::parse(storage.connection_string.expose_secret())
                        .map_err(|e| SearchError::invalid_connection(e.to_string()))?;
                let client =
                    azure::AzureBlobClient::from_connection_string(&connection, config.http_timeout)?;
                collaborators.blobs = Some(Arc::new(client));
                collaborators.storage_connection = Some(storage.connection_string.clone());
            } else {
                warn!("AZURE_STORAGE_CONNECTION_STRING not set, uploads disabled");
            }

            Ok(collaborators)
        }
    }
}

/// Build the pipeline for `config`.
///
/// # Errors
///
/// See [`build_collaborators`].
pub fn build_pipeline(config: &ServerConfig) -> Result<SearchPipeline, SearchError> {
    Ok(SearchPipeline::new(
        build_collaborators(config)?,
        config.pipeline.clone(),
    ))
}
