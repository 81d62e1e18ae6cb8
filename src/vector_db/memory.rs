// In-process vector store with brute-force scoring
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::DistanceMetric;
use crate::document::{Chunk, ScoredChunk};
use crate::errors::{RagError, Result};
use crate::vector_db::VectorStore;

/// On-disk form of the store; vectors are kept beside each chunk
#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    dimension: Option<usize>,
    points: Vec<SnapshotPoint>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotPoint {
    #[serde(flatten)]
    chunk: Chunk,
    vector: Vec<f32>,
}

/// Vector store kept entirely in memory
///
/// Scores follow "higher is better" for every metric; Euclidean distance is
/// reported negated. A store created with [`MemoryStore::open`] rewrites its
/// snapshot file after every change and reloads it on the next open.
pub struct MemoryStore {
    chunks: RwLock<Vec<Chunk>>,
    distance: DistanceMetric,
    dimension: RwLock<Option<usize>>,
    snapshot: Option<PathBuf>,
}

impl MemoryStore {
    pub fn new(distance: DistanceMetric) -> Self {
        Self {
            chunks: RwLock::new(Vec::new()),
            distance,
            dimension: RwLock::new(None),
            snapshot: None,
        }
    }

    /// Open a store persisted at `path`, loading its snapshot if present
    pub fn open(path: impl Into<PathBuf>, distance: DistanceMetric) -> Result<Self> {
        let path = path.into();
        let snapshot = if path.exists() {
            let bytes = std::fs::read(&path)?;
            serde_json::from_slice::<Snapshot>(&bytes)
                .map_err(|e| Self::local_error(&path, e.to_string()))?
        } else {
            Snapshot::default()
        };

        let chunks: Vec<Chunk> = snapshot
            .points
            .into_iter()
            .map(|p| Chunk {
                embedding: p.vector,
                ..p.chunk
            })
            .collect();
        info!(path = %path.display(), points = chunks.len(), "opened local vector store");

        Ok(Self {
            chunks: RwLock::new(chunks),
            distance,
            dimension: RwLock::new(snapshot.dimension),
            snapshot: Some(path),
        })
    }

    /// Rewrite the snapshot file, if this store has one
    async fn persist(&self, chunks: &[Chunk]) -> Result<()> {
        let Some(path) = &self.snapshot else {
            return Ok(());
        };

        let snapshot = Snapshot {
            dimension: *self.dimension.read().await,
            points: chunks
                .iter()
                .map(|c| SnapshotPoint {
                    chunk: c.clone(),
                    vector: c.embedding.clone(),
                })
                .collect(),
        };
        let bytes = serde_json::to_vec(&snapshot)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, path).await?;
        debug!(path = %path.display(), points = chunks.len(), "wrote local store snapshot");
        Ok(())
    }

    fn local_error(path: &Path, message: String) -> RagError {
        RagError::VectorStore {
            backend: "local".to_string(),
            message: format!("{}: {}", path.display(), message),
        }
    }

    fn score(&self, a: &[f32], b: &[f32]) -> f32 {
        match self.distance {
            DistanceMetric::Dot => dot(a, b),
            DistanceMetric::Cosine => {
                let denom = (dot(a, a).sqrt() * dot(b, b).sqrt()).max(f32::EPSILON);
                dot(a, b) / denom
            }
            DistanceMetric::Euclid => {
                let sq: f32 = a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum();
                -sq.sqrt()
            }
        }
    }

    fn mismatch(&self, expected: usize, got: usize) -> RagError {
        RagError::VectorStore {
            backend: self.backend().to_string(),
            message: format!("expected {}-dimensional vector, got {}", expected, got),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(DistanceMetric::Cosine)
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn ensure_collection(&self, dimension: usize) -> Result<()> {
        let mut current = self.dimension.write().await;
        if current.is_none() {
            *current = Some(dimension);
        }
        Ok(())
    }

    async fn upsert(&self, chunks: &[Chunk]) -> Result<()> {
        if let Some(expected) = *self.dimension.read().await {
            if let Some(bad) = chunks.iter().find(|c| c.embedding.len() != expected) {
                return Err(self.mismatch(expected, bad.embedding.len()));
            }
        }

        let mut stored = self.chunks.write().await;
        for chunk in chunks {
            match stored.iter_mut().find(|c| c.id == chunk.id) {
                Some(existing) => *existing = chunk.clone(),
                None => stored.push(chunk.clone()),
            }
        }
        debug!(count = chunks.len(), backend = self.backend(), "upserted chunks");
        self.persist(&stored).await
    }

    async fn search(&self, embedding: &[f32], scope: &str, limit: usize) -> Result<Vec<ScoredChunk>> {
        if let Some(expected) = *self.dimension.read().await {
            if embedding.len() != expected {
                return Err(self.mismatch(expected, embedding.len()));
            }
        }

        let stored = self.chunks.read().await;
        let mut results: Vec<ScoredChunk> = stored
            .iter()
            .filter(|c| c.scope == scope)
            .map(|c| ScoredChunk {
                score: self.score(embedding, &c.embedding),
                chunk: Chunk {
                    embedding: Vec::new(),
                    ..c.clone()
                },
            })
            .collect();

        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(limit);
        Ok(results)
    }

    async fn delete_scope(&self, scope: &str) -> Result<()> {
        let mut stored = self.chunks.write().await;
        let before = stored.len();
        stored.retain(|c| c.scope != scope);
        debug!(scope, removed = before - stored.len(), backend = self.backend(), "cleared scope");
        self.persist(&stored).await
    }

    async fn count(&self, scope: &str) -> Result<u64> {
        let stored = self.chunks.read().await;
        Ok(stored.iter().filter(|c| c.scope == scope).count() as u64)
    }

    fn backend(&self) -> &'static str {
        if self.snapshot.is_some() {
            "local"
        } else {
            "memory"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, scope: &str, embedding: Vec<f32>) -> Chunk {
        Chunk {
            id: id.to_string(),
            chunk_id: Chunk::make_chunk_id(scope, "doc.txt", 0),
            text: format!("text {}", id),
            source: "doc.txt".to_string(),
            scope: scope.to_string(),
            section: None,
            position: 0,
            ingested_at: String::new(),
            embedding,
        }
    }

    #[tokio::test]
    async fn test_search_is_scoped_and_ordered() {
        let store = MemoryStore::default();
        store.ensure_collection(2).await.unwrap();
        store
            .upsert(&[
                chunk("a", "one", vec![1.0, 0.0]),
                chunk("b", "one", vec![0.6, 0.8]),
                chunk("c", "two", vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let results = store.search(&[1.0, 0.0], "one", 10).await.unwrap();
        let ids: Vec<_> = results.iter().map(|r| r.chunk.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(results[0].score > results[1].score);
        assert!(results.iter().all(|r| r.chunk.embedding.is_empty()));
    }

    #[tokio::test]
    async fn test_limit_and_delete_scope() {
        let store = MemoryStore::default();
        store
            .upsert(&[
                chunk("a", "one", vec![1.0, 0.0]),
                chunk("b", "one", vec![0.0, 1.0]),
                chunk("c", "two", vec![1.0, 1.0]),
            ])
            .await
            .unwrap();

        assert_eq!(store.search(&[1.0, 0.0], "one", 1).await.unwrap().len(), 1);

        store.delete_scope("one").await.unwrap();
        assert_eq!(store.count("one").await.unwrap(), 0);
        assert_eq!(store.count("two").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_upsert_replaces_same_id() {
        let store = MemoryStore::default();
        store.upsert(&[chunk("a", "one", vec![1.0, 0.0])]).await.unwrap();
        store.upsert(&[chunk("a", "one", vec![0.0, 1.0])]).await.unwrap();
        assert_eq!(store.count("one").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_dimension_mismatch() {
        let store = MemoryStore::default();
        store.ensure_collection(3).await.unwrap();
        let err = store
            .upsert(&[chunk("a", "one", vec![1.0, 0.0])])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("3-dimensional"));
    }

    #[tokio::test]
    async fn test_local_store_survives_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("store").join("mini_rag.json");

        {
            let store = MemoryStore::open(&path, DistanceMetric::Cosine).unwrap();
            assert_eq!(store.backend(), "local");
            store.ensure_collection(2).await.unwrap();
            store
                .upsert(&[
                    chunk("a", "one", vec![1.0, 0.0]),
                    chunk("b", "one", vec![0.0, 1.0]),
                    chunk("c", "two", vec![1.0, 1.0]),
                ])
                .await
                .unwrap();
            store.delete_scope("two").await.unwrap();
        }

        let reopened = MemoryStore::open(&path, DistanceMetric::Cosine).unwrap();
        assert_eq!(reopened.count("one").await.unwrap(), 2);
        assert_eq!(reopened.count("two").await.unwrap(), 0);

        let results = reopened.search(&[0.0, 1.0], "one", 10).await.unwrap();
        assert_eq!(results[0].chunk.id, "b");
        assert_eq!(results[0].chunk.text, "text b");
        assert!(results.iter().all(|r| r.chunk.scope == "one"));

        let err = reopened.search(&[1.0, 0.0, 0.0], "one", 10).await.unwrap_err();
        assert!(err.to_string().contains("2-dimensional"));
    }

    #[test]
    fn test_corrupt_snapshot_is_store_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("mini_rag.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = MemoryStore::open(&path, DistanceMetric::Cosine).err().unwrap();
        assert!(matches!(err, RagError::VectorStore { .. }));
    }

    #[tokio::test]
    async fn test_euclid_prefers_nearest() {
        let store = MemoryStore::new(DistanceMetric::Euclid);
        store
            .upsert(&[
                chunk("far", "s", vec![5.0, 5.0]),
                chunk("near", "s", vec![1.0, 1.0]),
            ])
            .await
            .unwrap();
        let results = store.search(&[0.0, 0.0], "s", 2).await.unwrap();
        assert_eq!(results[0].chunk.id, "near");
    }
}
