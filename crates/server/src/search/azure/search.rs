//! Search service REST client.
//!
//! Covers the index, data source and indexer collections. Every request
//! carries the admin `api-key` header and the configured `api-version`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use searchgate_core::{DataSourceConnection, IndexSchema, IndexerDefinition, ResourceName};

use super::types::{DataSourceBody, ServiceErrorResponse};
use crate::config::SearchServiceConfig;
use crate::search::error::SearchError;
use crate::search::services::{SearchIndexService, SearchIndexerService};

/// Which kind of request produced an error status.
///
/// The same status means different things per collection: a 400 on an index
/// is a bad schema, on a data source a bad connection string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Index,
    DataSource,
    Indexer,
    RunIndexer,
}

/// Search service client.
#[derive(Clone)]
pub struct AzureSearchClient {
    inner: Arc<AzureSearchClientInner>,
}

struct AzureSearchClientInner {
    client: reqwest::Client,
    endpoint: String,
    api_version: String,
}

impl AzureSearchClient {
    /// Create a new search client.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidConnection`] if the API key is not a
    /// valid header value, or [`SearchError::Upstream`] if the HTTP client
    /// cannot be built.
    pub fn new(config: &SearchServiceConfig, timeout: Duration) -> Result<Self, SearchError> {
        let mut api_key = HeaderValue::from_str(config.api_key.expose_secret())
            .map_err(|_| SearchError::invalid_connection("search API key is not a valid header value"))?;
        api_key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("api-key", api_key);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| SearchError::upstream(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            inner: Arc::new(AzureSearchClientInner {
                client,
                endpoint: config.endpoint.as_str().trim_end_matches('/').to_string(),
                api_version: config.api_version.clone(),
            }),
        })
    }

    fn url(&self, collection: &str, name: &ResourceName) -> String {
        format!("{}/{collection}/{name}", self.inner.endpoint)
    }

    /// GET a resource. `Ok(None)` on 404.
    async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        operation: Operation,
    ) -> Result<Option<T>, SearchError> {
        let response = self
            .inner
            .client
            .get(url)
            .query(&[("api-version", &self.inner.api_version)])
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(read_error(status, response, operation).await);
        }

        let body = response.text().await.map_err(transport_error)?;
        serde_json::from_str(&body)
            .map(Some)
            .map_err(|e| SearchError::upstream(format!("failed to parse response: {e}")))
    }

    /// PUT a resource definition (create or replace).
    async fn put<T: Serialize + ?Sized + Sync>(
        &self,
        url: &str,
        body: &T,
        operation: Operation,
    ) -> Result<(), SearchError> {
        let response = self
            .inner
            .client
            .put(url)
            .query(&[("api-version", &self.inner.api_version)])
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status.is_success() {
            debug!(%status, "Definition accepted");
            Ok(())
        } else {
            Err(read_error(status, response, operation).await)
        }
    }

    async fn exists(&self, url: &str, operation: Operation) -> Result<bool, SearchError> {
        Ok(self
            .get::<serde_json::Value>(url, operation)
            .await?
            .is_some())
    }
}

#[async_trait]
impl SearchIndexService for AzureSearchClient {
    #[instrument(skip(self), fields(index = %name))]
    async fn get_index(&self, name: &ResourceName) -> Result<Option<IndexSchema>, SearchError> {
        self.get(&self.url("indexes", name), Operation::Index).await
    }

    #[instrument(skip(self, schema), fields(index = %schema.name))]
    async fn upsert_index(&self, schema: &IndexSchema) -> Result<ResourceName, SearchError> {
        self.put(&self.url("indexes", &schema.name), schema, Operation::Index)
            .await?;
        Ok(schema.name.clone())
    }
}

#[async_trait]
impl SearchIndexerService for AzureSearchClient {
    #[instrument(skip(self), fields(data_source = %name))]
    async fn data_source_exists(&self, name: &ResourceName) -> Result<bool, SearchError> {
        self.exists(&self.url("datasources", name), Operation::DataSource)
            .await
    }

    #[instrument(skip(self, data_source), fields(data_source = %data_source.name))]
    async fn upsert_data_source(
        &self,
        data_source: &DataSourceConnection,
    ) -> Result<ResourceName, SearchError> {
        self.put(
            &self.url("datasources", &data_source.name),
            &DataSourceBody::from(data_source),
            Operation::DataSource,
        )
        .await?;
        Ok(data_source.name.clone())
    }

    #[instrument(skip(self), fields(indexer = %name))]
    async fn indexer_exists(&self, name: &ResourceName) -> Result<bool, SearchError> {
        self.exists(&self.url("indexers", name), Operation::Indexer)
            .await
    }

    #[instrument(skip(self, indexer), fields(indexer = %indexer.name))]
    async fn upsert_indexer(
        &self,
        indexer: &IndexerDefinition,
    ) -> Result<ResourceName, SearchError> {
        self.put(&self.url("indexers", &indexer.name), indexer, Operation::Indexer)
            .await?;
        Ok(indexer.name.clone())
    }

    #[instrument(skip(self), fields(indexer = %name))]
    async fn run_indexer(&self, name: &ResourceName) -> Result<(), SearchError> {
        let url = format!("{}/run", self.url("indexers", name));
        let response = self
            .inner
            .client
            .post(&url)
            .query(&[("api-version", &self.inner.api_version)])
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(read_error(status, response, Operation::RunIndexer).await)
        }
    }
}

fn transport_error(e: reqwest::Error) -> SearchError {
    SearchError::upstream(e.to_string())
}

async fn read_error(
    status: StatusCode,
    response: reqwest::Response,
    operation: Operation,
) -> SearchError {
    match response.text().await {
        Ok(body) => map_error_status(status, &body, operation),
        Err(e) => transport_error(e),
    }
}

/// Translate a non-success response into a [`SearchError`].
fn map_error_status(status: StatusCode, body: &str, operation: Operation) -> SearchError {
    let message = serde_json::from_str::<ServiceErrorResponse>(body)
        .map_or_else(|_| body.to_string(), |r| r.error.message);

    match (status, operation) {
        (StatusCode::NOT_FOUND, _) => SearchError::not_found(message),
        (StatusCode::BAD_REQUEST, Operation::Index) if message.contains("cannot be changed") => {
            SearchError::schema_conflict(message)
        }
        (StatusCode::BAD_REQUEST, Operation::Index) => SearchError::invalid_schema(message),
        (StatusCode::BAD_REQUEST, Operation::DataSource) => {
            SearchError::invalid_connection(message)
        }
        (StatusCode::BAD_REQUEST, Operation::Indexer)
            if message.contains("does not exist") || message.contains("doesn't exist") =>
        {
            SearchError::missing_dependency(message)
        }
        (StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED, Operation::Index) => {
            SearchError::schema_conflict(message)
        }
        (StatusCode::CONFLICT, Operation::RunIndexer) => SearchError::indexer_busy(message),
        (StatusCode::FORBIDDEN, Operation::DataSource) => SearchError::invalid_connection(message),
        _ => SearchError::upstream(format!("{status}: {message}")),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::SecretString;
    use url::Url;

    fn config() -> SearchServiceConfig {
        SearchServiceConfig {
            endpoint: Url::parse("https://docs.search.windows.net/").unwrap(),
            api_key: SecretString::from("k3yWithEnoughEntropy9f8e7d6c5b4a"),
            api_version: "2024-07-01".to_string(),
        }
    }

    #[test]
    fn test_resource_url() {
        let client = AzureSearchClient::new(&config(), Duration::from_secs(5)).unwrap();
        let name = ResourceName::parse("docs-01").unwrap();

        assert_eq!(
            client.url("indexes", &name),
            "https://docs.search.windows.net/indexes/docs-01"
        );
    }

    #[test]
    fn test_rejects_unprintable_api_key() {
        let mut config = config();
        config.api_key = SecretString::from("bad\nkey");

        let result = AzureSearchClient::new(&config, Duration::from_secs(5));

        assert!(matches!(result, Err(SearchError::InvalidConnection(_))));
    }

    #[test]
    fn test_map_not_found() {
        let err = map_error_status(
            StatusCode::NOT_FOUND,
            r#"{"error":{"code":"","message":"Indexer 'ghost' was not found"}}"#,
            Operation::RunIndexer,
        );
        assert_eq!(err, SearchError::not_found("Indexer 'ghost' was not found"));
    }

    #[test]
    fn test_map_bad_request_by_operation() {
        let body = r#"{"error":{"message":"bad"}}"#;
        assert!(matches!(
            map_error_status(StatusCode::BAD_REQUEST, body, Operation::Index),
            SearchError::InvalidSchema(_)
        ));
        assert!(matches!(
            map_error_status(StatusCode::BAD_REQUEST, body, Operation::DataSource),
            SearchError::InvalidConnection(_)
        ));
        assert!(matches!(
            map_error_status(StatusCode::BAD_REQUEST, body, Operation::Indexer),
            SearchError::Upstream(_)
        ));
    }

    #[test]
    fn test_map_schema_conflict() {
        let err = map_error_status(
            StatusCode::BAD_REQUEST,
            r#"{"error":{"message":"Existing field 'category' cannot be changed."}}"#,
            Operation::Index,
        );
        assert!(matches!(err, SearchError::SchemaConflict(ref msg) if msg.contains("category")));
    }

    #[test]
    fn test_map_missing_data_source() {
        let err = map_error_status(
            StatusCode::BAD_REQUEST,
            r#"{"error":{"message":"This indexer refers to a data source 'ds-01' that doesn't exist"}}"#,
            Operation::Indexer,
        );
        assert!(matches!(err, SearchError::MissingDependency(_)));
    }

    #[test]
    fn test_map_busy_indexer() {
        let err = map_error_status(
            StatusCode::CONFLICT,
            r#"{"error":{"message":"Another indexer invocation is currently in progress"}}"#,
            Operation::RunIndexer,
        );
        assert!(matches!(err, SearchError::IndexerBusy(_)));
    }

    #[test]
    fn test_map_unparseable_body() {
        let err = map_error_status(
            StatusCode::SERVICE_UNAVAILABLE,
            "upstream connect error",
            Operation::Index,
        );
        assert_eq!(
            err,
            SearchError::upstream("503 Service Unavailable: upstream connect error")
        );
    }

    #[test]
    fn test_search_client_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + Clone>() {}
        assert_send_sync::<AzureSearchClient>();
    }
}
