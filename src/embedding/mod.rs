//! Text embedding
//!
//! Model inference is synchronous and CPU bound; async callers go through
//! [`embed_blocking`] so the runtime's worker threads are not stalled.

pub mod engine;

use std::sync::Arc;

use crate::errors::{RagError, Result};

pub use engine::{BertEmbedder, Embedder};

/// Embed `texts` on the blocking thread pool
pub async fn embed_blocking(embedder: Arc<dyn Embedder>, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
    tokio::task::spawn_blocking(move || {
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        embedder.embed_batch(&refs)
    })
    .await
    .map_err(RagError::embedding)?
}
