//! Chat with a hosted language model.
//!
//! Conversations are stateless: the caller sends the full message list each
//! time and gets back the assistant's reply.

mod client;
mod error;
mod types;

use async_trait::async_trait;

pub use client::ChatCompletionClient;
pub use error::ChatError;
pub use types::{ChatMessage, ChatRole};

/// A language model that answers a conversation.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Return the next assistant message for `messages`.
    ///
    /// # Errors
    ///
    /// Returns a [`ChatError`] if the model cannot be reached or returns
    /// no content.
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String, ChatError>;
}
