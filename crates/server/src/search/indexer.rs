//! Indexer definitions and on-demand runs.

use tracing::{info, instrument};

use searchgate_core::{IndexerDefinition, ResourceName};

use super::error::SearchError;
use super::services::{SearchIndexService, SearchIndexerService};

/// Defines indexers and triggers their runs.
pub struct IndexerJobController<'a> {
    indexes: &'a dyn SearchIndexService,
    indexers: &'a dyn SearchIndexerService,
}

impl<'a> IndexerJobController<'a> {
    pub const fn new(
        indexes: &'a dyn SearchIndexService,
        indexers: &'a dyn SearchIndexerService,
    ) -> Self {
        Self { indexes, indexers }
    }

    /// Create or update an indexer linking a data source to an index.
    ///
    /// Both referenced resources must already exist. A schedule, if any, is
    /// stored with the definition; nothing here runs it.
    ///
    /// # Errors
    ///
    /// - [`SearchError::MissingDependency`] naming every absent reference
    /// - [`SearchError::Upstream`] if the search service fails
    #[instrument(
        skip(self, definition),
        fields(
            indexer = %definition.name,
            data_source = %definition.data_source_name,
            index = %definition.target_index_name,
        )
    )]
    pub async fn upsert_indexer(
        &self,
        definition: &IndexerDefinition,
    ) -> Result<ResourceName, SearchError> {
        let (data_source_exists, index) = tokio::try_join!(
            self.indexers
                .data_source_exists(&definition.data_source_name),
            self.indexes.get_index(&definition.target_index_name),
        )?;

        let mut missing = Vec::new();
        if !data_source_exists {
            missing.push(format!(
                "data source '{}' does not exist",
                definition.data_source_name
            ));
        }
        if index.is_none() {
            missing.push(format!(
                "index '{}' does not exist",
                definition.target_index_name
            ));
        }
        if !missing.is_empty() {
            return Err(SearchError::missing_dependency(missing.join("; ")));
        }

        let name = self.indexers.upsert_indexer(definition).await?;
        info!("Indexer defined");
        Ok(name)
    }

    /// Ask the service to start a run of `name` now.
    ///
    /// Returns once the run is accepted; completion is not awaited.
    ///
    /// # Errors
    ///
    /// - [`SearchError::NotFound`] if the indexer does not exist
    /// - [`SearchError::IndexerBusy`] if a run is already in progress
    /// - [`SearchError::Upstream`] if the search service fails
    #[instrument(skip(self), fields(indexer = %name))]
    pub async fn run_indexer(&self, name: &ResourceName) -> Result<(), SearchError> {
        self.indexers.run_indexer(name).await?;
        info!("Indexer run requested");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::search::memory::InMemorySearchService;
    use crate::search::schema::{SchemaManager, default_schema};
    use searchgate_core::{ConnectionString, ContainerName, DataSourceConnection, IndexerStatus};

    fn name(s: &str) -> ResourceName {
        ResourceName::parse(s).unwrap()
    }

    fn definition() -> IndexerDefinition {
        IndexerDefinition {
            name: name("idx-01"),
            data_source_name: name("ds-01"),
            target_index_name: name("docs-01"),
            schedule: None,
        }
    }

    async fn register_data_source(service: &InMemorySearchService) {
        let connection =
            ConnectionString::parse("AccountName=docstore;AccountKey=c2VjcmV0").unwrap();
        service
            .upsert_data_source(&DataSourceConnection::blob(
                name("ds-01"),
                ContainerName::parse("uploads").unwrap(),
                connection,
            ))
            .await
            .unwrap();
    }

    async fn create_index(service: &InMemorySearchService) {
        SchemaManager::new(service)
            .upsert_index(&default_schema(name("docs-01")))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_upsert_indexer_requires_data_source() {
        let service = InMemorySearchService::new();
        create_index(&service).await;
        let controller = IndexerJobController::new(&service, &service);

        let err = controller.upsert_indexer(&definition()).await.unwrap_err();

        assert!(matches!(err, SearchError::MissingDependency(ref msg) if msg.contains("ds-01")));
        assert!(!service.indexer_exists(&name("idx-01")).await.unwrap());
    }

    #[tokio::test]
    async fn test_upsert_indexer_names_every_missing_reference() {
        let service = InMemorySearchService::new();
        let controller = IndexerJobController::new(&service, &service);

        let err = controller.upsert_indexer(&definition()).await.unwrap_err();

        let SearchError::MissingDependency(msg) = err else {
            panic!("expected MissingDependency");
        };
        assert!(msg.contains("ds-01"));
        assert!(msg.contains("docs-01"));
    }

    #[tokio::test]
    async fn test_upsert_indexer_then_run() {
        let service = InMemorySearchService::new();
        register_data_source(&service).await;
        create_index(&service).await;
        let controller = IndexerJobController::new(&service, &service);

        let indexer = controller.upsert_indexer(&definition()).await.unwrap();
        assert_eq!(
            service.indexer_status(&indexer).await,
            IndexerStatus::Created
        );

        controller.run_indexer(&indexer).await.unwrap();
        assert_eq!(
            service.indexer_status(&indexer).await,
            IndexerStatus::Running
        );
    }

    #[tokio::test]
    async fn test_run_unknown_indexer_is_not_found() {
        let service = InMemorySearchService::new();
        let controller = IndexerJobController::new(&service, &service);

        let err = controller.run_indexer(&name("ghost")).await.unwrap_err();

        assert!(matches!(err, SearchError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_run_while_running_is_busy() {
        let service = InMemorySearchService::new();
        register_data_source(&service).await;
        create_index(&service).await;
        let controller = IndexerJobController::new(&service, &service);
        let indexer = controller.upsert_indexer(&definition()).await.unwrap();

        controller.run_indexer(&indexer).await.unwrap();
        let err = controller.run_indexer(&indexer).await.unwrap_err();
        assert!(matches!(err, SearchError::IndexerBusy(_)));

        service.finish_runs().await;
        controller.run_indexer(&indexer).await.unwrap();
        assert_eq!(service.run_count(&indexer).await, 2);
    }
}
