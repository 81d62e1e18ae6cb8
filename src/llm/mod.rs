//! Hosted chat-completion models used to phrase grounded answers

pub mod client;

use async_trait::async_trait;

use crate::errors::Result;

pub use client::{classify_error, GroqClient, DEFAULT_GROQ_URL};

/// A chat model that answers one system + user exchange
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String>;

    /// Model identifier for logs
    fn model_name(&self) -> &str;
}
