//! Wire shapes for the search and blob REST APIs.
//!
//! Index and indexer definitions serialize directly from the core types;
//! only shapes that differ from them live here.

use serde::{Deserialize, Serialize};

use searchgate_core::{DataSourceConnection, DataSourceContainer, DataSourceType, ResourceName};

/// Body of `PUT /datasources/{name}`.
#[derive(Debug, Serialize)]
pub struct DataSourceBody<'a> {
    pub name: &'a ResourceName,
    #[serde(rename = "type")]
    pub source_type: &'a DataSourceType,
    pub credentials: DataSourceCredentials<'a>,
    pub container: &'a DataSourceContainer,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'a str>,
}

/// Credentials block of a data source.
#[derive(Serialize)]
pub struct DataSourceCredentials<'a> {
    #[serde(rename = "connectionString")]
    pub connection_string: &'a str,
}

impl std::fmt::Debug for DataSourceCredentials<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataSourceCredentials")
            .field("connection_string", &"[REDACTED]")
            .finish()
    }
}

impl<'a> From<&'a DataSourceConnection> for DataSourceBody<'a> {
    fn from(data_source: &'a DataSourceConnection) -> Self {
        Self {
            name: &data_source.name,
            source_type: &data_source.source_type,
            credentials: DataSourceCredentials {
                connection_string: data_source.connection.expose(),
            },
            container: &data_source.container,
            description: data_source.description.as_deref(),
        }
    }
}

/// Error envelope returned by the search service.
#[derive(Debug, Deserialize)]
pub struct ServiceErrorResponse {
    pub error: ServiceError,
}

/// Error details returned by the search service.
#[derive(Debug, Deserialize)]
pub struct ServiceError {
    #[serde(default)]
    pub code: Option<String>,
    pub message: String,
}
