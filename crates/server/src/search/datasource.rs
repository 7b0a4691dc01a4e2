//! Data source registration.

use tracing::{info, instrument};

use searchgate_core::{ConnectionString, ContainerName, DataSourceConnection, ResourceName};

use super::error::SearchError;
use super::services::SearchIndexerService;

/// Registers named blob-container data sources with the search service.
pub struct DataSourceRegistrar<'a> {
    indexers: &'a dyn SearchIndexerService,
}

impl<'a> DataSourceRegistrar<'a> {
    pub const fn new(indexers: &'a dyn SearchIndexerService) -> Self {
        Self { indexers }
    }

    /// Create or update the data source `name` pointing at `container`.
    ///
    /// The connection descriptor is parsed here so malformed strings never
    /// reach the service. It is not logged.
    ///
    /// # Errors
    ///
    /// - [`SearchError::InvalidConnection`] if the descriptor is malformed or rejected
    /// - [`SearchError::Upstream`] if the search service fails
    #[instrument(skip(self, connection), fields(data_source = %name, container = %container))]
    pub async fn upsert_data_source(
        &self,
        name: &ResourceName,
        container: &ContainerName,
        connection: &str,
    ) -> Result<ResourceName, SearchError> {
        let connection = ConnectionString::parse(connection)
            .map_err(|e| SearchError::invalid_connection(e.to_string()))?;

        let data_source =
            DataSourceConnection::blob(name.clone(), container.clone(), connection);
        let registered = self.indexers.upsert_data_source(&data_source).await?;

        info!("Data source registered");
        Ok(registered)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::search::memory::InMemorySearchService;

    const CONNECTION: &str =
        "DefaultEndpointsProtocol=https;AccountName=docstore;AccountKey=c2VjcmV0;EndpointSuffix=core.windows.net";

    fn names() -> (ResourceName, ContainerName) {
        (
            ResourceName::parse("ds-01").unwrap(),
            ContainerName::parse("uploads").unwrap(),
        )
    }

    #[tokio::test]
    async fn test_upsert_data_source_twice_is_one_resource() {
        let service = InMemorySearchService::new();
        let registrar = DataSourceRegistrar::new(&service);
        let (name, container) = names();

        registrar
            .upsert_data_source(&name, &container, CONNECTION)
            .await
            .unwrap();
        registrar
            .upsert_data_source(&name, &container, CONNECTION)
            .await
            .unwrap();

        assert_eq!(service.data_source_names().await, vec![name.clone()]);
        let stored = service.data_source(&name).await.unwrap();
        assert_eq!(stored.container.name, container);
        assert_eq!(stored.source_type.as_str(), "azureblob");
    }

    #[tokio::test]
    async fn test_upsert_data_source_rejects_malformed_connection() {
        let service = InMemorySearchService::new();
        let registrar = DataSourceRegistrar::new(&service);
        let (name, container) = names();

        for bad in ["", "not a connection string", "AccountKey=abc"] {
            let err = registrar
                .upsert_data_source(&name, &container, bad)
                .await
                .unwrap_err();
            assert!(matches!(err, SearchError::InvalidConnection(_)), "{bad}");
        }
        assert!(service.data_source_names().await.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_connection_message_hides_secret() {
        let service = InMemorySearchService::new();
        let registrar = DataSourceRegistrar::new(&service);
        let (name, container) = names();

        let err = registrar
            .upsert_data_source(&name, &container, "AccountKey=topsecret;garbage")
            .await
            .unwrap_err();

        assert!(!err.to_string().contains("topsecret"));
    }
}
