// Qdrant-backed vector store (gRPC)
use async_trait::async_trait;
use qdrant_client::qdrant::{
    point_id::PointIdOptions, value::Kind, Condition, CountPointsBuilder,
    CreateCollectionBuilder, CreateFieldIndexCollectionBuilder, DeletePointsBuilder, Distance,
    FieldType, Filter, PointId, PointStruct, ScoredPoint, SearchPointsBuilder,
    UpsertPointsBuilder, Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant, QdrantError};
use serde_json::json;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::config::{DistanceMetric, QdrantConfig};
use crate::document::{Chunk, ScoredChunk};
use crate::errors::{RagError, Result};
use crate::vector_db::VectorStore;

/// Payload key holding the scope name; indexed as a keyword
const SCOPE_KEY: &str = "scope";

/// Vector store using a Qdrant collection
pub struct QdrantStore {
    client: Qdrant,
    collection: String,
    distance: DistanceMetric,
}

impl QdrantStore {
    /// Connect to the Qdrant server described by `config`
    pub fn connect(config: &QdrantConfig) -> Result<Self> {
        let client = Qdrant::from_url(&config.url).build().map_err(map_err)?;
        Ok(Self {
            client,
            collection: config.collection.clone(),
            distance: config.distance,
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn qdrant_distance(&self) -> Distance {
        match self.distance {
            DistanceMetric::Cosine => Distance::Cosine,
            DistanceMetric::Dot => Distance::Dot,
            DistanceMetric::Euclid => Distance::Euclid,
        }
    }

    fn to_point(chunk: &Chunk) -> Result<PointStruct> {
        let payload = Payload::try_from(json!({
            "text": chunk.text,
            "scope": chunk.scope,
            "chunk_id": chunk.chunk_id,
            "source": chunk.source,
            "section": chunk.section,
            "position": chunk.position,
            "ingested_at": chunk.ingested_at,
        }))
        .map_err(map_err)?;

        Ok(PointStruct::new(
            chunk.id.clone(),
            chunk.embedding.clone(),
            payload,
        ))
    }

    fn from_point(point: ScoredPoint) -> ScoredChunk {
        let payload = &point.payload;
        let chunk = Chunk {
            id: point_id_to_string(&point.id),
            chunk_id: string_field(payload, "chunk_id"),
            text: string_field(payload, "text"),
            source: string_field(payload, "source"),
            scope: string_field(payload, SCOPE_KEY),
            section: int_field(payload, "section").map(|v| v as u32),
            position: int_field(payload, "position").unwrap_or(0) as usize,
            ingested_at: string_field(payload, "ingested_at"),
            embedding: Vec::new(),
        };

        ScoredChunk {
            chunk,
            score: point.score,
        }
    }
}

fn scope_filter(scope: &str) -> Filter {
    Filter::must([Condition::matches(SCOPE_KEY, scope.to_string())])
}

fn map_err(e: QdrantError) -> RagError {
    RagError::VectorStore {
        backend: "qdrant".to_string(),
        message: e.to_string(),
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn ensure_collection(&self, dimension: usize) -> Result<()> {
        let collections = self.client.list_collections().await.map_err(map_err)?;
        let exists = collections
            .collections
            .iter()
            .any(|c| c.name == self.collection);

        if exists {
            debug!(collection = %self.collection, "qdrant collection already exists");
            return Ok(());
        }

        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection).vectors_config(
                    VectorParamsBuilder::new(dimension as u64, self.qdrant_distance()),
                ),
            )
            .await
            .map_err(map_err)?;

        self.client
            .create_field_index(
                CreateFieldIndexCollectionBuilder::new(
                    &self.collection,
                    SCOPE_KEY,
                    FieldType::Keyword,
                )
                .wait(true),
            )
            .await
            .map_err(map_err)?;

        info!(collection = %self.collection, dimension, "created qdrant collection");
        Ok(())
    }

    async fn upsert(&self, chunks: &[Chunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        let points = chunks
            .iter()
            .map(Self::to_point)
            .collect::<Result<Vec<_>>>()?;

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points).wait(true))
            .await
            .map_err(map_err)?;

        debug!(collection = %self.collection, count = chunks.len(), "upserted chunks to qdrant");
        Ok(())
    }

    async fn search(&self, embedding: &[f32], scope: &str, limit: usize) -> Result<Vec<ScoredChunk>> {
        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, embedding.to_vec(), limit as u64)
                    .filter(scope_filter(scope))
                    .with_payload(true),
            )
            .await
            .map_err(map_err)?;

        Ok(response.result.into_iter().map(Self::from_point).collect())
    }

    async fn delete_scope(&self, scope: &str) -> Result<()> {
        self.client
            .delete_points(
                DeletePointsBuilder::new(&self.collection)
                    .points(scope_filter(scope))
                    .wait(true),
            )
            .await
            .map_err(map_err)?;

        debug!(collection = %self.collection, scope, "cleared scope in qdrant");
        Ok(())
    }

    async fn count(&self, scope: &str) -> Result<u64> {
        let response = self
            .client
            .count(
                CountPointsBuilder::new(&self.collection)
                    .filter(scope_filter(scope))
                    .exact(true),
            )
            .await
            .map_err(map_err)?;

        Ok(response.result.map(|r| r.count).unwrap_or(0))
    }

    fn backend(&self) -> &'static str {
        "qdrant"
    }
}

fn string_field(payload: &HashMap<String, QdrantValue>, key: &str) -> String {
    payload
        .get(key)
        .and_then(|v| match &v.kind {
            Some(Kind::StringValue(s)) => Some(s.clone()),
            _ => None,
        })
        .unwrap_or_default()
}

fn int_field(payload: &HashMap<String, QdrantValue>, key: &str) -> Option<i64> {
    payload.get(key).and_then(|v| match &v.kind {
        Some(Kind::IntegerValue(i)) => Some(*i),
        Some(Kind::DoubleValue(f)) => Some(*f as i64),
        _ => None,
    })
}

fn point_id_to_string(point_id: &Option<PointId>) -> String {
    point_id
        .as_ref()
        .and_then(|id| match &id.point_id_options {
            Some(PointIdOptions::Num(n)) => Some(n.to_string()),
            Some(PointIdOptions::Uuid(u)) => Some(u.clone()),
            None => None,
        })
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_chunk() -> Chunk {
        Chunk {
            id: "6f9619ff-8b86-4d11-b42d-00c04fc964ff".to_string(),
            chunk_id: "default:guide.pdf:2".to_string(),
            text: "Install with cargo.".to_string(),
            source: "guide.pdf".to_string(),
            scope: "default".to_string(),
            section: Some(3),
            position: 2,
            ingested_at: "2026-01-01T00:00:00Z".to_string(),
            embedding: vec![0.1, 0.2],
        }
    }

    #[test]
    fn test_point_payload_round_trips_through_scored_point() {
        let chunk = sample_chunk();
        let point = QdrantStore::to_point(&chunk).unwrap();

        let scored = ScoredPoint {
            id: point.id.clone(),
            payload: point.payload.clone(),
            score: 0.42,
            ..Default::default()
        };

        let restored = QdrantStore::from_point(scored);
        assert_eq!(restored.score, 0.42);
        assert_eq!(
            restored.chunk,
            Chunk {
                embedding: Vec::new(),
                ..chunk
            }
        );
    }

    #[test]
    fn test_missing_section_stays_none() {
        let chunk = Chunk {
            section: None,
            ..sample_chunk()
        };
        let point = QdrantStore::to_point(&chunk).unwrap();
        let restored = QdrantStore::from_point(ScoredPoint {
            id: point.id,
            payload: point.payload,
            ..Default::default()
        });
        assert_eq!(restored.chunk.section, None);
    }

    #[tokio::test]
    #[ignore] // Integration test - requires Qdrant on localhost:6334
    async fn test_scoped_search_against_server() {
        let config = QdrantConfig {
            collection: format!("minirag_test_{}", uuid::Uuid::new_v4().simple()),
            ..Default::default()
        };
        let store = QdrantStore::connect(&config).unwrap();
        store.ensure_collection(2).await.unwrap();

        let mut other = sample_chunk();
        other.id = uuid::Uuid::new_v4().to_string();
        other.scope = "other".to_string();
        store.upsert(&[sample_chunk(), other]).await.unwrap();

        let results = store.search(&[0.1, 0.2], "default", 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.scope, "default");

        store.delete_scope("default").await.unwrap();
        assert_eq!(store.count("default").await.unwrap(), 0);
        assert_eq!(store.count("other").await.unwrap(), 1);
    }
}
