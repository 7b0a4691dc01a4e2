//! Blob storage REST client.
//!
//! Authorises with the SAS token from the connection string when present,
//! otherwise signs each request with the account key.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use tracing::{debug, instrument};

use searchgate_core::{BlobHandle, ConnectionString};

use super::shared_key::{SharedKeyCredential, SignedRequest};
use crate::search::error::SearchError;
use crate::search::services::BlobStorageService;

const STORAGE_API_VERSION: &str = "2021-08-06";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone)]
enum BlobAuth {
    SharedKey(SharedKeyCredential),
    Sas(String),
}

/// Blob storage client.
#[derive(Clone)]
pub struct AzureBlobClient {
    inner: Arc<AzureBlobClientInner>,
}

struct AzureBlobClientInner {
    client: reqwest::Client,
    endpoint: String,
    auth: BlobAuth,
}

impl AzureBlobClient {
    /// Create a client from a storage connection string.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidConnection`] if the string yields no
    /// endpoint or no usable credential, or [`SearchError::StorageUnavailable`]
    /// if the HTTP client cannot be built.
    pub fn from_connection_string(
        connection: &ConnectionString,
        timeout: Duration,
    ) -> Result<Self, SearchError> {
        let endpoint = connection.blob_endpoint().ok_or_else(|| {
            SearchError::invalid_connection("connection string names no blob endpoint")
        })?;

        let auth = if let Some(sas) = connection.shared_access_signature() {
            BlobAuth::Sas(sas.to_string())
        } else if let (Some(account), Some(key)) =
            (connection.account_name(), connection.account_key())
        {
            BlobAuth::SharedKey(SharedKeyCredential::new(account, key)?)
        } else {
            return Err(SearchError::invalid_connection(
                "uploads need an AccountKey or SharedAccessSignature",
            ));
        };

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                SearchError::storage_unavailable(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            inner: Arc::new(AzureBlobClientInner {
                client,
                endpoint,
                auth,
            }),
        })
    }

    /// Encoded `/{container}/{blob}` path.
    fn path(handle: &BlobHandle) -> String {
        format!(
            "/{}/{}",
            handle.container,
            urlencoding::encode(&handle.name)
        )
    }

    fn url(&self, path: &str) -> String {
        match &self.inner.auth {
            BlobAuth::Sas(sas) => format!("{}{path}?{sas}", self.inner.endpoint),
            BlobAuth::SharedKey(_) => format!("{}{path}", self.inner.endpoint),
        }
    }

    /// Apply date, version and authorisation headers.
    fn authorize(
        &self,
        builder: reqwest::RequestBuilder,
        signed: &SignedRequest<'_>,
    ) -> Result<reqwest::RequestBuilder, SearchError> {
        let mut builder = builder;
        for (name, value) in signed.ms_headers {
            builder = builder.header(*name, *value);
        }
        if let BlobAuth::SharedKey(credential) = &self.inner.auth {
            builder = builder.header(AUTHORIZATION, credential.authorization(signed)?);
        }
        Ok(builder)
    }
}

fn ms_date() -> String {
    Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

#[async_trait]
impl BlobStorageService for AzureBlobClient {
    #[instrument(skip(self, payload), fields(container = %handle.container, blob = %handle.name))]
    async fn put_blob(
        &self,
        handle: &BlobHandle,
        payload: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<(), SearchError> {
        let path = Self::path(handle);
        let content_type = content_type.unwrap_or(DEFAULT_CONTENT_TYPE);
        let date = ms_date();
        let ms_headers = [
            ("x-ms-blob-type", "BlockBlob"),
            ("x-ms-date", date.as_str()),
            ("x-ms-version", STORAGE_API_VERSION),
        ];
        let signed = SignedRequest {
            method: "PUT",
            content_length: payload.len(),
            content_type: Some(content_type),
            ms_headers: &ms_headers,
            path: &path,
        };

        let request = self
            .inner
            .client
            .put(self.url(&path))
            .header(CONTENT_TYPE, content_type);
        let response = self
            .authorize(request, &signed)?
            .body(payload)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status.is_success() {
            debug!(%status, "Blob stored");
            Ok(())
        } else {
            Err(read_error(status, response).await)
        }
    }

    #[instrument(skip(self), fields(container = %handle.container, blob = %handle.name))]
    async fn get_blob(&self, handle: &BlobHandle) -> Result<Option<Vec<u8>>, SearchError> {
        let path = Self::path(handle);
        let date = ms_date();
        let ms_headers = [
            ("x-ms-date", date.as_str()),
            ("x-ms-version", STORAGE_API_VERSION),
        ];
        let signed = SignedRequest {
            method: "GET",
            content_length: 0,
            content_type: None,
            ms_headers: &ms_headers,
            path: &path,
        };

        let request = self.inner.client.get(self.url(&path));
        let response = self
            .authorize(request, &signed)?
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(read_error(status, response).await);
        }

        let bytes = response.bytes().await.map_err(transport_error)?;
        Ok(Some(bytes.to_vec()))
    }
}

fn transport_error(e: reqwest::Error) -> SearchError {
    SearchError::storage_unavailable(e.to_string())
}

async fn read_error(status: StatusCode, response: reqwest::Response) -> SearchError {
    let error_code = response
        .headers()
        .get("x-ms-error-code")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let detail = match (error_code, response.text().await) {
        (Some(code), _) => code,
        (None, Ok(body)) if !body.is_empty() => body,
        (None, _) => status.to_string(),
    };

    map_error_status(status, detail)
}

fn map_error_status(status: StatusCode, detail: String) -> SearchError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            SearchError::invalid_connection(format!("storage rejected credentials: {detail}"))
        }
        StatusCode::BAD_REQUEST => SearchError::invalid_document(detail),
        _ => SearchError::storage_unavailable(format!("{status}: {detail}")),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use searchgate_core::ContainerName;

    fn handle(name: &str) -> BlobHandle {
        BlobHandle::new(ContainerName::parse("uploads").unwrap(), name.to_string())
    }

    fn client(connection: &str) -> Result<AzureBlobClient, SearchError> {
        AzureBlobClient::from_connection_string(
            &ConnectionString::parse(connection).unwrap(),
            Duration::from_secs(5),
        )
    }

    #[test]
    fn test_path_encodes_blob_name() {
        assert_eq!(
            AzureBlobClient::path(&handle("annual report.pdf")),
            "/uploads/annual%20report.pdf"
        );
    }

    #[test]
    fn test_shared_key_url() {
        let client =
            client("DefaultEndpointsProtocol=https;AccountName=docstore;AccountKey=c2VjcmV0").unwrap();

        assert_eq!(
            client.url("/uploads/a.txt"),
            "https://docstore.blob.core.windows.net/uploads/a.txt"
        );
    }

    #[test]
    fn test_sas_url() {
        let client = client(
            "BlobEndpoint=https://docstore.blob.core.windows.net/;SharedAccessSignature=?sv=2022-11-02&sig=abc",
        )
        .unwrap();

        assert_eq!(
            client.url("/uploads/a.txt"),
            "https://docstore.blob.core.windows.net/uploads/a.txt?sv=2022-11-02&sig=abc"
        );
    }

    #[test]
    fn test_requires_credential() {
        let result = client("BlobEndpoint=https://docstore.blob.core.windows.net");
        assert!(matches!(result, Err(SearchError::InvalidConnection(_))));
    }

    #[test]
    fn test_ms_date_format() {
        let date = ms_date();
        assert!(date.ends_with(" GMT"));
        assert!(chrono::DateTime::parse_from_rfc2822(&date.replace("GMT", "+0000")).is_ok());
    }

    #[test]
    fn test_map_error_status() {
        assert!(matches!(
            map_error_status(StatusCode::FORBIDDEN, "AuthenticationFailed".to_string()),
            SearchError::InvalidConnection(_)
        ));
        assert!(matches!(
            map_error_status(StatusCode::NOT_FOUND, "ContainerNotFound".to_string()),
            SearchError::StorageUnavailable(ref msg) if msg.contains("ContainerNotFound")
        ));
    }
}
