//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                   - Liveness check
//! GET    /health/ready             - Readiness check (product database)
//!
//! # Search pipeline
//! POST   /search/create_index      - Upsert the index (optional schema body)
//! POST   /search/data_source       - Upsert the blob data source
//! GET    /search/create_indexer    - Upsert data source, then indexer
//! POST   /search/upload_document   - Upload multipart `file` to the container
//! GET    /search/run_indexer       - Trigger an indexer run
//! POST   /search/provision         - Index and data source, then indexer
//!
//! # Chat
//! POST   /chat                     - Chat completion
//!
//! # Products
//! GET    /products                 - List products
//! POST   /products                 - Create product
//! GET    /products/{id}            - Show product
//! PUT    /products/{id}            - Rename product
//! DELETE /products/{id}            - Delete product
//! ```

pub mod chat;
pub mod products;
pub mod search;

use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    routing::{get, post},
};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::db;
use crate::state::AppState;

/// Build the API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/search", search_routes())
        .nest("/products", product_routes())
        .route("/chat", post(chat::chat))
}

fn search_routes() -> Router<AppState> {
    Router::new()
        .route("/create_index", post(search::create_index))
        .route("/data_source", post(search::register_data_source))
        .route("/create_indexer", get(search::create_indexer))
        .route(
            "/upload_document",
            post(search::upload_document).layer(DefaultBodyLimit::max(search::MAX_UPLOAD_BYTES)),
        )
        .route("/run_indexer", get(search::run_indexer))
        .route("/provision", post(search::provision))
}

fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route(
            "/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::delete),
        )
}

/// Build the full application: health checks, API routes and request tracing.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the product database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match db::ping(state.pool()).await {
        Ok(()) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::Request;
    use secrecy::SecretString;
    use tower::ServiceExt;

    use super::*;
    use crate::config::PipelineNames;
    use crate::search::memory::{InMemoryBlobStore, InMemorySearchService};
    use crate::search::{Collaborators, SearchPipeline};

    async fn state(collaborators: Collaborators) -> AppState {
        let pool = db::create_pool(&SecretString::from("sqlite::memory:"))
            .await
            .unwrap();
        db::ensure_schema(&pool).await.unwrap();
        AppState::new(
            pool,
            SearchPipeline::new(collaborators, PipelineNames::default()),
            None,
        )
    }

    fn memory_collaborators() -> Collaborators {
        let search = Arc::new(InMemorySearchService::new());
        Collaborators {
            indexes: Some(search.clone()),
            indexers: Some(search),
            blobs: Some(Arc::new(InMemoryBlobStore::new())),
            storage_connection: Some(SecretString::from("BlobEndpoint=memory://test")),
        }
    }

    async fn send(app: Router, method: &str, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_health_routes() {
        let app = app(state(Collaborators::default()).await);

        let (status, body) = send(app.clone(), "GET", "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");

        let (status, _) = send(app, "GET", "/health/ready").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unconfigured_pipeline_routes() {
        let app = app(state(Collaborators::default()).await);

        let (status, body) = send(app.clone(), "POST", "/search/create_index").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.contains("index_client not initialized"));

        let (status, body) = send(app, "POST", "/search/data_source").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.contains("storage_connection_string not initialized"));
    }

    #[tokio::test]
    async fn test_indexer_before_index_conflicts() {
        let app = app(state(memory_collaborators()).await);

        let (status, body) = send(app.clone(), "GET", "/search/create_indexer").await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body.contains("documents-index-01"));

        let (status, _) = send(app.clone(), "POST", "/search/create_index").await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(app, "GET", "/search/create_indexer").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("my-indexer-01"));
    }

    #[tokio::test]
    async fn test_run_unknown_indexer_is_not_found() {
        let app = app(state(memory_collaborators()).await);

        let (status, _) = send(app, "GET", "/search/run_indexer").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_chat_unconfigured() {
        let app = app(state(Collaborators::default()).await);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/chat")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"messages":[{"role":"user","content":"hi"}]}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_missing_product_is_not_found() {
        let app = app(state(Collaborators::default()).await);

        let (status, body) = send(app, "GET", "/products/42").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("Product not found"));
    }
}
