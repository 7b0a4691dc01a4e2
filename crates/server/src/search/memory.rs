//! In-process search and blob services.
//!
//! Selected with `SEARCH_BACKEND=memory`. They enforce the same rules the
//! remote services do (schema conflicts, missing references, busy indexers)
//! so the pipeline behaves identically without network access. State lives
//! for the lifetime of the process.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use searchgate_core::{
    BlobHandle, ContainerName, DataSourceConnection, IndexSchema, IndexerDefinition,
    IndexerStatus, ResourceName, SchemaChange,
};

use super::error::SearchError;
use super::services::{BlobStorageService, SearchIndexService, SearchIndexerService};

#[derive(Debug)]
struct IndexerRecord {
    definition: IndexerDefinition,
    status: IndexerStatus,
    runs: u32,
}

#[derive(Debug, Default)]
struct SearchState {
    indexes: BTreeMap<ResourceName, IndexSchema>,
    index_writes: usize,
    data_sources: BTreeMap<ResourceName, DataSourceConnection>,
    indexers: BTreeMap<ResourceName, IndexerRecord>,
}

/// Index, data source and indexer definitions held in memory.
///
/// Runs never complete on their own; call [`finish_runs`](Self::finish_runs)
/// to move every running indexer to idle.
#[derive(Debug, Default)]
pub struct InMemorySearchService {
    state: RwLock<SearchState>,
}

impl InMemorySearchService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored definition of an index.
    pub async fn index(&self, name: &ResourceName) -> Option<IndexSchema> {
        self.state.read().await.indexes.get(name).cloned()
    }

    /// How many index writes have been accepted.
    pub async fn index_write_count(&self) -> usize {
        self.state.read().await.index_writes
    }

    /// The stored definition of a data source.
    pub async fn data_source(&self, name: &ResourceName) -> Option<DataSourceConnection> {
        self.state.read().await.data_sources.get(name).cloned()
    }

    /// Names of every registered data source, sorted.
    pub async fn data_source_names(&self) -> Vec<ResourceName> {
        self.state.read().await.data_sources.keys().cloned().collect()
    }

    /// The stored definition of an indexer.
    pub async fn indexer(&self, name: &ResourceName) -> Option<IndexerDefinition> {
        self.state
            .read()
            .await
            .indexers
            .get(name)
            .map(|record| record.definition.clone())
    }

    /// Current lifecycle state of an indexer.
    pub async fn indexer_status(&self, name: &ResourceName) -> IndexerStatus {
        self.state
            .read()
            .await
            .indexers
            .get(name)
            .map_or(IndexerStatus::Undefined, |record| record.status)
    }

    /// How many runs of an indexer have been accepted.
    pub async fn run_count(&self, name: &ResourceName) -> u32 {
        self.state
            .read()
            .await
            .indexers
            .get(name)
            .map_or(0, |record| record.runs)
    }

    /// Complete every in-progress run.
    pub async fn finish_runs(&self) {
        let mut state = self.state.write().await;
        for record in state.indexers.values_mut() {
            if record.status == IndexerStatus::Running {
                record.status = IndexerStatus::Idle;
            }
        }
    }
}

#[async_trait]
impl SearchIndexService for InMemorySearchService {
    async fn get_index(&self, name: &ResourceName) -> Result<Option<IndexSchema>, SearchError> {
        Ok(self.index(name).await)
    }

    async fn upsert_index(&self, schema: &IndexSchema) -> Result<ResourceName, SearchError> {
        schema
            .validate()
            .map_err(|e| SearchError::invalid_schema(e.to_string()))?;

        let mut state = self.state.write().await;
        if let Some(existing) = state.indexes.get(&schema.name)
            && let SchemaChange::Incompatible { field, reason } = schema.compare(existing)
        {
            return Err(SearchError::schema_conflict(format!(
                "existing field '{field}' cannot be changed: {reason}"
            )));
        }

        state.indexes.insert(schema.name.clone(), schema.clone());
        state.index_writes += 1;
        Ok(schema.name.clone())
    }
}

#[async_trait]
impl SearchIndexerService for InMemorySearchService {
    async fn data_source_exists(&self, name: &ResourceName) -> Result<bool, SearchError> {
        Ok(self.state.read().await.data_sources.contains_key(name))
    }

    async fn upsert_data_source(
        &self,
        data_source: &DataSourceConnection,
    ) -> Result<ResourceName, SearchError> {
        let mut state = self.state.write().await;
        state
            .data_sources
            .insert(data_source.name.clone(), data_source.clone());
        Ok(data_source.name.clone())
    }

    async fn indexer_exists(&self, name: &ResourceName) -> Result<bool, SearchError> {
        Ok(self.state.read().await.indexers.contains_key(name))
    }

    async fn upsert_indexer(
        &self,
        indexer: &IndexerDefinition,
    ) -> Result<ResourceName, SearchError> {
        let mut state = self.state.write().await;

        if !state.data_sources.contains_key(&indexer.data_source_name) {
            return Err(SearchError::missing_dependency(format!(
                "data source '{}' does not exist",
                indexer.data_source_name
            )));
        }
        if !state.indexes.contains_key(&indexer.target_index_name) {
            return Err(SearchError::missing_dependency(format!(
                "index '{}' does not exist",
                indexer.target_index_name
            )));
        }

        let record = state
            .indexers
            .entry(indexer.name.clone())
            .or_insert_with(|| IndexerRecord {
                definition: indexer.clone(),
                status: IndexerStatus::Undefined,
                runs: 0,
            });
        record.definition = indexer.clone();
        record.status = record.status.after_upsert();

        Ok(indexer.name.clone())
    }

    async fn run_indexer(&self, name: &ResourceName) -> Result<(), SearchError> {
        let mut state = self.state.write().await;
        let record = state
            .indexers
            .get_mut(name)
            .ok_or_else(|| SearchError::not_found(format!("indexer '{name}'")))?;

        if !record.status.can_run() {
            return Err(SearchError::indexer_busy(format!(
                "indexer '{name}' is already running"
            )));
        }

        record.status = IndexerStatus::Running;
        record.runs += 1;
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct StoredBlob {
    payload: Vec<u8>,
    content_type: Option<String>,
}

/// Blob containers held in memory. Containers are created on first write.
#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    blobs: RwLock<BTreeMap<(ContainerName, String), StoredBlob>>,
}

impl InMemoryBlobStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs across all containers.
    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    /// Whether nothing has been stored yet.
    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }

    /// Content type recorded for a blob at upload.
    pub async fn content_type(&self, handle: &BlobHandle) -> Option<String> {
        self.blobs
            .read()
            .await
            .get(&(handle.container.clone(), handle.name.clone()))
            .and_then(|blob| blob.content_type.clone())
    }
}

#[async_trait]
impl BlobStorageService for InMemoryBlobStore {
    async fn put_blob(
        &self,
        handle: &BlobHandle,
        payload: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<(), SearchError> {
        self.blobs.write().await.insert(
            (handle.container.clone(), handle.name.clone()),
            StoredBlob {
                payload,
                content_type: content_type.map(str::to_string),
            },
        );
        Ok(())
    }

    async fn get_blob(&self, handle: &BlobHandle) -> Result<Option<Vec<u8>>, SearchError> {
        Ok(self
            .blobs
            .read()
            .await
            .get(&(handle.container.clone(), handle.name.clone()))
            .map(|blob| blob.payload.clone()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use searchgate_core::{FieldDefinition, FieldType};

    fn name(s: &str) -> ResourceName {
        ResourceName::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_upsert_index_refuses_type_change() {
        let service = InMemorySearchService::new();
        let schema = IndexSchema::new(
            name("docs-01"),
            vec![
                FieldDefinition::simple("id", FieldType::String).key(),
                FieldDefinition::simple("pages", FieldType::Int32),
            ],
        );
        service.upsert_index(&schema).await.unwrap();

        let mut changed = schema.clone();
        changed.fields.last_mut().unwrap().field_type = FieldType::Int64;
        let err = service.upsert_index(&changed).await.unwrap_err();

        assert!(matches!(err, SearchError::SchemaConflict(ref msg) if msg.contains("pages")));
    }

    #[tokio::test]
    async fn test_unknown_indexer_is_undefined() {
        let service = InMemorySearchService::new();
        assert_eq!(
            service.indexer_status(&name("ghost")).await,
            IndexerStatus::Undefined
        );
        assert_eq!(service.run_count(&name("ghost")).await, 0);
    }

    #[tokio::test]
    async fn test_blob_store_records_content_type() {
        let store = InMemoryBlobStore::new();
        let handle = BlobHandle::new(
            ContainerName::parse("uploads").unwrap(),
            "report.pdf".to_string(),
        );

        assert!(store.is_empty().await);
        store
            .put_blob(&handle, b"%PDF".to_vec(), Some("application/pdf"))
            .await
            .unwrap();

        assert_eq!(
            store.content_type(&handle).await.as_deref(),
            Some("application/pdf")
        );
        assert_eq!(store.get_blob(&handle).await.unwrap().unwrap(), b"%PDF");
    }
}
