//! Vector storage for embedded chunks
//!
//! Every stored chunk carries its scope and every search is restricted to
//! a single scope, so uploads in one scope are never visible from another.

pub mod memory;
pub mod qdrant;

use async_trait::async_trait;

use crate::document::{Chunk, ScoredChunk};
use crate::errors::Result;

pub use memory::MemoryStore;
pub use qdrant::QdrantStore;

/// Storage and similarity search over chunk embeddings
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the backing collection if it does not exist yet
    async fn ensure_collection(&self, dimension: usize) -> Result<()>;

    /// Insert or replace chunks; each chunk must carry its embedding
    async fn upsert(&self, chunks: &[Chunk]) -> Result<()>;

    /// Most similar chunks within `scope`, best first, at most `limit`
    async fn search(&self, embedding: &[f32], scope: &str, limit: usize) -> Result<Vec<ScoredChunk>>;

    /// Remove every chunk in `scope`
    async fn delete_scope(&self, scope: &str) -> Result<()>;

    /// Number of chunks stored in `scope`
    async fn count(&self, scope: &str) -> Result<u64>;

    /// Short backend name for logs and errors
    fn backend(&self) -> &'static str;
}
