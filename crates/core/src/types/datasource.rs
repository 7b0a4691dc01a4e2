//! Data source connections for indexer jobs.
//!
//! A data source tells an indexer where raw content lives. Here the origin is
//! a blob container reached through a storage connection string.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::name::{ContainerName, ResourceName};

const DEFAULT_PROTOCOL: &str = "https";
const DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";

/// Errors that can occur when parsing a [`ConnectionString`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("connection string cannot be empty")]
    Empty,
    #[error("segment {0} is not a key=value pair")]
    MalformedSegment(usize),
    #[error("segment {0} has an empty key")]
    EmptyKey(usize),
    #[error(
        "connection string names no account: expected AccountName+AccountKey, BlobEndpoint, or ResourceId"
    )]
    MissingAccount,
}

/// A storage connection string (`Key=Value;Key=Value`).
///
/// The raw value is a credential: `Debug` is redacted and the string is only
/// reachable through [`ConnectionString::expose`].
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionString {
    raw: String,
    pairs: Vec<(String, String)>,
}

impl fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionString")
            .field("account_name", &self.account_name())
            .field("raw", &"[REDACTED]")
            .finish()
    }
}

impl ConnectionString {
    /// Parse and syntactically validate a connection string.
    ///
    /// Values may themselves contain `=` (base64 keys); only the first `=` of
    /// each segment separates key from value. Keys are case-insensitive.
    ///
    /// # Errors
    ///
    /// Returns a [`ConnectionError`] if the string is empty, a segment is
    /// malformed, or no account can be derived.
    pub fn parse(s: &str) -> Result<Self, ConnectionError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ConnectionError::Empty);
        }

        let mut pairs = Vec::new();
        for (idx, segment) in trimmed.split(';').enumerate() {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            let (key, value) = segment
                .split_once('=')
                .ok_or(ConnectionError::MalformedSegment(idx))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(ConnectionError::EmptyKey(idx));
            }
            pairs.push((key.to_string(), value.trim().to_string()));
        }

        let parsed = Self {
            raw: trimmed.to_string(),
            pairs,
        };

        let has_shared_key = parsed.account_name().is_some() && parsed.account_key().is_some();
        let has_endpoint = parsed.get("BlobEndpoint").is_some();
        let has_resource_id = parsed.get("ResourceId").is_some();
        if !(has_shared_key || has_endpoint || has_resource_id) {
            return Err(ConnectionError::MissingAccount);
        }

        Ok(parsed)
    }

    /// Look up a value by key (case-insensitive). Empty values count as absent.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
            .filter(|v| !v.is_empty())
    }

    #[must_use]
    pub fn account_name(&self) -> Option<&str> {
        self.get("AccountName")
    }

    #[must_use]
    pub fn account_key(&self) -> Option<&str> {
        self.get("AccountKey")
    }

    /// SAS token, without a leading `?`.
    #[must_use]
    pub fn shared_access_signature(&self) -> Option<&str> {
        self.get("SharedAccessSignature")
            .map(|sas| sas.trim_start_matches('?'))
    }

    /// Blob service endpoint without a trailing slash.
    ///
    /// Uses `BlobEndpoint` when present, otherwise builds
    /// `{DefaultEndpointsProtocol}://{AccountName}.blob.{EndpointSuffix}`.
    #[must_use]
    pub fn blob_endpoint(&self) -> Option<String> {
        if let Some(endpoint) = self.get("BlobEndpoint") {
            return Some(endpoint.trim_end_matches('/').to_string());
        }
        let account = self.account_name()?;
        let protocol = self
            .get("DefaultEndpointsProtocol")
            .unwrap_or(DEFAULT_PROTOCOL);
        let suffix = self.get("EndpointSuffix").unwrap_or(DEFAULT_ENDPOINT_SUFFIX);
        Some(format!("{protocol}://{account}.blob.{suffix}"))
    }

    /// The raw connection string, for sending to the search service.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.raw
    }
}

impl std::str::FromStr for ConnectionString {
    type Err = ConnectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Kind of content origin a data source points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DataSourceType {
    /// A blob storage container.
    AzureBlob,
    /// Any other origin kind, passed through verbatim.
    Other(String),
}

impl DataSourceType {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::AzureBlob => "azureblob",
            Self::Other(kind) => kind,
        }
    }
}

impl From<String> for DataSourceType {
    fn from(s: String) -> Self {
        if s == "azureblob" {
            Self::AzureBlob
        } else {
            Self::Other(s)
        }
    }
}

impl From<DataSourceType> for String {
    fn from(kind: DataSourceType) -> Self {
        kind.as_str().to_string()
    }
}

/// Container a data source reads from, with an optional virtual folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSourceContainer {
    pub name: ContainerName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

/// A named data source definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSourceConnection {
    pub name: ResourceName,
    pub source_type: DataSourceType,
    pub connection: ConnectionString,
    pub container: DataSourceContainer,
    pub description: Option<String>,
}

impl DataSourceConnection {
    /// A blob-container data source with no folder filter.
    #[must_use]
    pub const fn blob(
        name: ResourceName,
        container: ContainerName,
        connection: ConnectionString,
    ) -> Self {
        Self {
            name,
            source_type: DataSourceType::AzureBlob,
            connection,
            container: DataSourceContainer {
                name: container,
                query: None,
            },
            description: None,
        }
    }
}
