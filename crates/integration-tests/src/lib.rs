//! Integration tests for SearchGate.
//!
//! Each test spawns the full router on `127.0.0.1:0` with in-memory search
//! and blob services and an in-memory product database, then drives it over
//! real HTTP with `reqwest`.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p searchgate-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::net::SocketAddr;
use std::sync::Arc;

use secrecy::SecretString;

use searchgate_core::{ContainerName, ResourceName};
use searchgate_server::config::PipelineNames;
use searchgate_server::llm::ChatModel;
use searchgate_server::search::memory::{InMemoryBlobStore, InMemorySearchService};
use searchgate_server::search::{Collaborators, SearchPipeline};
use searchgate_server::state::AppState;
use searchgate_server::{db, routes};

/// Resource names used by the scenario tests.
///
/// # Panics
///
/// Panics if the naming rules reject one of the literals.
#[must_use]
#[allow(clippy::unwrap_used)]
pub fn scenario_names() -> PipelineNames {
    PipelineNames {
        index_name: ResourceName::parse("docs-01").unwrap(),
        indexer_name: ResourceName::parse("idx-01").unwrap(),
        data_source_name: ResourceName::parse("ds-01").unwrap(),
        container_name: ContainerName::parse("docs").unwrap(),
        schedule: None,
    }
}

/// Which collaborators a test server gets.
pub enum Backend {
    /// In-memory search and blob services.
    Memory,
    /// No collaborators at all.
    Unconfigured,
}

/// A running server plus handles to its in-memory collaborators.
pub struct TestContext {
    pub client: reqwest::Client,
    pub base_url: String,
    pub search: Arc<InMemorySearchService>,
    pub blobs: Arc<InMemoryBlobStore>,
}

impl TestContext {
    /// Start a server with in-memory collaborators and no chat model.
    pub async fn start() -> Self {
        Self::start_with(Backend::Memory, None).await
    }

    /// Start a server with the given backend and chat model.
    ///
    /// # Panics
    ///
    /// Panics if the database or listener cannot be set up.
    #[allow(clippy::expect_used)]
    pub async fn start_with(backend: Backend, chat: Option<Arc<dyn ChatModel>>) -> Self {
        let search = Arc::new(InMemorySearchService::new());
        let blobs = Arc::new(InMemoryBlobStore::new());

        let collaborators = match backend {
            Backend::Memory => Collaborators {
                indexes: Some(search.clone()),
                indexers: Some(search.clone()),
                blobs: Some(blobs.clone()),
                storage_connection: Some(SecretString::from("BlobEndpoint=memory://integration")),
            },
            Backend::Unconfigured => Collaborators::default(),
        };

        let pool = db::create_pool(&SecretString::from("sqlite::memory:"))
            .await
            .expect("Failed to create database pool");
        db::ensure_schema(&pool)
            .await
            .expect("Failed to create product table");

        let state = AppState::new(
            pool,
            SearchPipeline::new(collaborators, scenario_names()),
            chat,
        );

        let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Listener has no address");

        tokio::spawn(async move {
            axum::serve(listener, routes::app(state))
                .await
                .expect("Test server failed");
        });

        Self {
            client: reqwest::Client::new(),
            base_url: format!("http://{addr}"),
            search,
            blobs,
        }
    }

    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}
