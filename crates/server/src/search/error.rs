//! Error types for the search pipeline.

use thiserror::Error;

/// Errors that can occur anywhere in the search pipeline.
///
/// Every variant carries the underlying message so callers see why a remote
/// call failed. Nothing in the pipeline retries; these propagate as-is.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SearchError {
    /// The index schema breaks a structural rule (key field, field names, types).
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// The schema change cannot be applied in place; the index must be rebuilt.
    #[error("schema conflict: {0}")]
    SchemaConflict(String),

    /// The data source connection descriptor is malformed or rejected.
    #[error("invalid connection: {0}")]
    InvalidConnection(String),

    /// An indexer references a data source or index that does not exist.
    #[error("missing dependency: {0}")]
    MissingDependency(String),

    /// The named resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The indexer is still running and cannot be started again.
    #[error("indexer busy: {0}")]
    IndexerBusy(String),

    /// The uploaded document cannot be stored under a valid blob name.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// Blob storage could not be reached or refused the request.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// The search service could not be reached or failed unexpectedly.
    #[error("search service error: {0}")]
    Upstream(String),

    /// A collaborator handle was never configured.
    #[error("{0} not initialized")]
    CollaboratorUnconfigured(&'static str),
}

impl SearchError {
    pub fn invalid_schema(msg: impl Into<String>) -> Self {
        Self::InvalidSchema(msg.into())
    }

    pub fn schema_conflict(msg: impl Into<String>) -> Self {
        Self::SchemaConflict(msg.into())
    }

    pub fn invalid_connection(msg: impl Into<String>) -> Self {
        Self::InvalidConnection(msg.into())
    }

    pub fn missing_dependency(msg: impl Into<String>) -> Self {
        Self::MissingDependency(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn indexer_busy(msg: impl Into<String>) -> Self {
        Self::IndexerBusy(msg.into())
    }

    pub fn invalid_document(msg: impl Into<String>) -> Self {
        Self::InvalidDocument(msg.into())
    }

    pub fn storage_unavailable(msg: impl Into<String>) -> Self {
        Self::StorageUnavailable(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream(msg.into())
    }

    /// Whether the caller sent something the pipeline rejects outright.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidSchema(_) | Self::InvalidConnection(_) | Self::InvalidDocument(_)
        )
    }

    /// Whether the request conflicts with the current state of a resource.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::SchemaConflict(_) | Self::MissingDependency(_) | Self::IndexerBusy(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_error_display() {
        let err = SearchError::CollaboratorUnconfigured("index_client");
        assert_eq!(err.to_string(), "index_client not initialized");

        let err = SearchError::missing_dependency("data source 'ds-01' does not exist");
        assert_eq!(
            err.to_string(),
            "missing dependency: data source 'ds-01' does not exist"
        );
    }

    #[test]
    fn test_search_error_classification() {
        assert!(SearchError::invalid_schema("x").is_client_error());
        assert!(SearchError::invalid_document("x").is_client_error());
        assert!(!SearchError::upstream("x").is_client_error());
        assert!(SearchError::indexer_busy("x").is_conflict());
        assert!(SearchError::schema_conflict("x").is_conflict());
        assert!(!SearchError::not_found("x").is_conflict());
    }
}
