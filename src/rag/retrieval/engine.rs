// Retrieval engine: embed the question, search one scope of the vector store
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::document::{normalize_scope, ScoredChunk};
use crate::embedding::{embed_blocking, Embedder};
use crate::errors::{RagError, Result};
use crate::vector_db::VectorStore;

/// Search parameters for retrieval
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchParams {
    /// Maximum number of candidates to retrieve
    pub top_k: usize,
    /// Scope to search; blank means the default scope
    pub scope: String,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            top_k: 12,
            scope: crate::document::DEFAULT_SCOPE.to_string(),
        }
    }
}

/// Retrieval engine for semantic search
pub struct RetrievalEngine {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    default_top_k: usize,
}

impl RetrievalEngine {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>, default_top_k: usize) -> Self {
        Self {
            embedder,
            store,
            default_top_k,
        }
    }

    /// Retrieve candidates for `query` within `scope`
    pub async fn retrieve(&self, query: &str, scope: &str) -> Result<Vec<ScoredChunk>> {
        let params = SearchParams {
            top_k: self.default_top_k,
            scope: scope.to_string(),
        };
        self.retrieve_with_params(query, &params).await
    }

    /// Retrieve with custom parameters
    pub async fn retrieve_with_params(&self, query: &str, params: &SearchParams) -> Result<Vec<ScoredChunk>> {
        if params.top_k == 0 {
            return Ok(Vec::new());
        }

        let scope = normalize_scope(Some(&params.scope));
        let query_vector = embed_blocking(self.embedder.clone(), vec![query.to_string()])
            .await?
            .pop()
            .ok_or_else(|| RagError::Embedding("model returned no vector".to_string()))?;

        let results = self.store.search(&query_vector, &scope, params.top_k).await?;
        debug!(scope = %scope, retrieved = results.len(), backend = self.store.backend(), "retrieval complete");
        Ok(results)
    }

    pub fn default_top_k(&self) -> usize {
        self.default_top_k
    }
}
