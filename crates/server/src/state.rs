//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::warn;

use crate::config::ServerConfig;
use crate::llm::{ChatCompletionClient, ChatError, ChatModel};
use crate::search::{SearchError, SearchPipeline, build_pipeline};

/// Error building state from configuration.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("search collaborators: {0}")]
    Search(#[from] SearchError),
    #[error("chat client: {0}")]
    Chat(#[from] ChatError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. Collaborators are injected
/// through [`AppState::new`]; nothing is looked up at request time.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    pool: SqlitePool,
    pipeline: SearchPipeline,
    chat: Option<Arc<dyn ChatModel>>,
}

impl AppState {
    /// Create state from already-built parts.
    #[must_use]
    pub fn new(
        pool: SqlitePool,
        pipeline: SearchPipeline,
        chat: Option<Arc<dyn ChatModel>>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                pool,
                pipeline,
                chat,
            }),
        }
    }

    /// Build collaborators from `config` and wrap them with `pool`.
    ///
    /// # Errors
    ///
    /// Returns an error if configured credentials cannot be used.
    pub fn from_config(config: &ServerConfig, pool: SqlitePool) -> Result<Self, StateError> {
        let pipeline = build_pipeline(config)?;

        let chat: Option<Arc<dyn ChatModel>> = match &config.chat {
            Some(chat) => Some(Arc::new(ChatCompletionClient::new(
                chat,
                config.http_timeout,
            )?)),
            None => {
                warn!("AZURE_OPENAI_* not set, chat disabled");
                None
            }
        };

        Ok(Self::new(pool, pipeline, chat))
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.inner.pool
    }

    /// Get a reference to the search pipeline.
    #[must_use]
    pub fn pipeline(&self) -> &SearchPipeline {
        &self.inner.pipeline
    }

    /// Get the chat model.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Unconfigured`] if no chat deployment is set.
    pub fn chat(&self) -> Result<&dyn ChatModel, ChatError> {
        self.inner.chat.as_deref().ok_or(ChatError::Unconfigured)
    }
}
