//! Search pipeline route handlers.
//!
//! Paths keep their historical names; every create is an upsert.

use axum::{
    Json,
    body::Bytes,
    extract::{Multipart, State},
};
use serde::Serialize;
use tracing::instrument;

use searchgate_core::{IndexSchema, ResourceName};

use crate::error::AppError;
use crate::search::ProvisionReport;
use crate::state::AppState;

/// Multipart field carrying the uploaded document.
const FILE_FIELD: &str = "file";

/// Largest accepted upload body.
pub const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Response naming one resource.
#[derive(Debug, Serialize)]
pub struct ResourceResponse {
    pub status: &'static str,
    pub name: ResourceName,
}

/// Response for an upload.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub status: &'static str,
    pub filename: String,
}

/// Response for a full provision.
#[derive(Debug, Serialize)]
pub struct ProvisionResponse {
    pub status: &'static str,
    #[serde(flatten)]
    pub report: ProvisionReport,
}

/// Parse an optional schema body. Empty or `null` means the default.
fn optional_schema(body: &Bytes) -> Result<Option<IndexSchema>, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("invalid index schema: {e}")))
}

/// Create or update the search index.
#[instrument(skip(state, body))]
pub async fn create_index(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ResourceResponse>, AppError> {
    let schema = optional_schema(&body)?;
    let name = state.pipeline().upsert_index(schema).await?;

    Ok(Json(ResourceResponse {
        status: "created",
        name,
    }))
}

/// Register the configured data source.
#[instrument(skip(state))]
pub async fn register_data_source(
    State(state): State<AppState>,
) -> Result<Json<ResourceResponse>, AppError> {
    let name = state.pipeline().upsert_data_source().await?;

    Ok(Json(ResourceResponse {
        status: "registered",
        name,
    }))
}

/// Register the data source, then create or update the indexer.
#[instrument(skip(state))]
pub async fn create_indexer(
    State(state): State<AppState>,
) -> Result<Json<ResourceResponse>, AppError> {
    let name = state.pipeline().register_indexer().await?;

    Ok(Json(ResourceResponse {
        status: "created",
        name,
    }))
}

/// Upload a document from the `file` multipart field.
#[instrument(skip(state, multipart))]
pub async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::BadRequest("file field has no filename".to_string()))?;
        let content_type = field.content_type().map(str::to_string);
        let payload = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        let handle = state
            .pipeline()
            .upload_document(&filename, payload.to_vec(), content_type.as_deref())
            .await?;

        return Ok(Json(UploadResponse {
            status: "uploaded",
            filename: handle.name,
        }));
    }

    Err(AppError::BadRequest(format!(
        "multipart field '{FILE_FIELD}' is required"
    )))
}

/// Trigger a run of the configured indexer.
#[instrument(skip(state))]
pub async fn run_indexer(
    State(state): State<AppState>,
) -> Result<Json<ResourceResponse>, AppError> {
    let name = state.pipeline().run_indexer().await?;

    Ok(Json(ResourceResponse {
        status: "indexer started",
        name,
    }))
}

/// Create the index and data source, then the indexer.
#[instrument(skip(state, body))]
pub async fn provision(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ProvisionResponse>, AppError> {
    let schema = optional_schema(&body)?;
    let report = state.pipeline().provision(schema).await?;

    Ok(Json(ProvisionResponse {
        status: "provisioned",
        report,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_schema_empty_body() {
        assert!(optional_schema(&Bytes::new()).unwrap().is_none());
        assert!(optional_schema(&Bytes::from_static(b"  \n")).unwrap().is_none());
        assert!(optional_schema(&Bytes::from_static(b"null")).unwrap().is_none());
    }

    #[test]
    fn test_optional_schema_parses_fields() {
        let body = Bytes::from_static(
            br#"{"name":"docs-01","fields":[{"name":"id","type":"Edm.String","key":true}]}"#,
        );

        let schema = optional_schema(&body).unwrap().unwrap();

        assert_eq!(schema.name.as_str(), "docs-01");
        assert_eq!(schema.key_field().unwrap().name, "id");
    }

    #[test]
    fn test_optional_schema_rejects_bad_name() {
        let body = Bytes::from_static(br#"{"name":"Docs","fields":[]}"#);

        let err = optional_schema(&body).unwrap_err();

        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_provision_response_is_flat() {
        let response = ProvisionResponse {
            status: "provisioned",
            report: ProvisionReport {
                index: ResourceName::parse("docs-01").unwrap(),
                data_source: ResourceName::parse("ds-01").unwrap(),
                indexer: ResourceName::parse("idx-01").unwrap(),
            },
        };

        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            serde_json::json!({
                "status": "provisioned",
                "index": "docs-01",
                "data_source": "ds-01",
                "indexer": "idx-01"
            })
        );
    }
}
