// End-to-end RAG pipeline: ingest documents into a scope, answer questions from it
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{Config, RerankerKind, StoreBackend};
use crate::document::{load_document, normalize_scope, Chunk, Citation, RecursiveSplitter};
use crate::embedding::{embed_blocking, BertEmbedder, Embedder};
use crate::errors::{RagError, Result};
use crate::llm::{ChatModel, GroqClient};
use crate::rag::context::{ContextBuilder, ContextConfig};
use crate::rag::reranking::{CrossEncoderReranker, LexicalReranker, Reranker};
use crate::rag::retrieval::RetrievalEngine;
use crate::vector_db::{MemoryStore, QdrantStore, VectorStore};

/// Chunks embedded per model call during ingestion
pub const EMBED_BATCH_SIZE: usize = 32;

/// Answer returned when nothing in the scope matches the question
pub const NO_CONTEXT_ANSWER: &str = "I don't know based on the indexed documents.";

/// Outcome of indexing one file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestReport {
    pub chunks: usize,
    pub source: String,
    pub scope: String,
    pub message: String,
}

/// Timing and counts for one query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryMetrics {
    pub latency_ms: u64,
    pub retrieved: usize,
    pub reranked: usize,
}

/// Grounded answer with its supporting citations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    pub citations: Vec<Citation>,
    pub metrics: QueryMetrics,
}

/// Tunables that do not depend on which models are plugged in
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub retrieve_k: usize,
    pub top_n: usize,
    pub max_context_chars: usize,
}

impl From<&Config> for PipelineSettings {
    fn from(config: &Config) -> Self {
        Self {
            chunk_size: config.chunking.chunk_size,
            chunk_overlap: config.chunking.chunk_overlap,
            retrieve_k: config.retrieval.retrieve_k,
            top_n: config.reranker.top_n,
            max_context_chars: config.retrieval.max_context_chars,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

/// End-to-end RAG pipeline
pub struct RagPipeline {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    reranker: Arc<dyn Reranker>,
    llm: Option<Arc<dyn ChatModel>>,
    retrieval_engine: RetrievalEngine,
    splitter: RecursiveSplitter,
    context_builder: ContextBuilder,
    top_n: usize,
}

impl RagPipeline {
    /// Assemble a pipeline from ready components
    ///
    /// `llm` may be `None`; ingestion still works and queries fail with
    /// [`RagError::MissingApiKey`].
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        reranker: Arc<dyn Reranker>,
        llm: Option<Arc<dyn ChatModel>>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            retrieval_engine: RetrievalEngine::new(embedder.clone(), store.clone(), settings.retrieve_k),
            splitter: RecursiveSplitter::new(settings.chunk_size, settings.chunk_overlap),
            context_builder: ContextBuilder::with_config(ContextConfig {
                max_context_chars: settings.max_context_chars,
            }),
            top_n: settings.top_n,
            embedder,
            store,
            reranker,
            llm,
        }
    }

    /// Load models, connect the vector store and create the collection
    pub async fn from_config(config: &Config) -> Result<Self> {
        let embedding = config.embedding.clone();
        let embedder: Arc<dyn Embedder> = tokio::task::spawn_blocking(move || {
            BertEmbedder::load(&embedding.model, embedding.dimension)
        })
        .await
        .map_err(RagError::embedding)?
        .map(Arc::new)?;

        let reranker: Arc<dyn Reranker> = match config.reranker.kind {
            RerankerKind::CrossEncoder => {
                let model = config.reranker.model.clone();
                tokio::task::spawn_blocking(move || CrossEncoderReranker::load(&model))
                    .await
                    .map_err(RagError::reranker)?
                    .map(Arc::new)?
            }
            RerankerKind::Lexical => Arc::new(LexicalReranker::new()),
        };

        let store: Arc<dyn VectorStore> = match config.qdrant.backend {
            StoreBackend::Qdrant => Arc::new(QdrantStore::connect(&config.qdrant)?),
            StoreBackend::Local => Arc::new(MemoryStore::open(
                config.local_store_path(),
                config.qdrant.distance,
            )?),
            StoreBackend::Memory => Arc::new(MemoryStore::new(config.qdrant.distance)),
        };
        store.ensure_collection(embedder.dimension()).await?;

        let llm: Option<Arc<dyn ChatModel>> = match GroqClient::new(&config.llm) {
            Ok(client) => Some(Arc::new(client)),
            Err(RagError::MissingApiKey(_)) => {
                warn!("GROQ_API_KEY is not set; queries will be rejected until it is configured");
                None
            }
            Err(e) => return Err(e),
        };

        info!(
            store = store.backend(),
            embedding = %config.embedding.model,
            reranker = ?config.reranker.kind,
            llm = %config.llm.model,
            "RAG pipeline ready"
        );

        Ok(Self::new(embedder, store, reranker, llm, PipelineSettings::from(config)))
    }

    /// Load, split, embed and store one file
    pub async fn ingest_file(&self, path: &Path, scope: Option<&str>) -> Result<IngestReport> {
        let scope = normalize_scope(scope);
        let source = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        let owned_path = path.to_path_buf();
        let load_scope = scope.clone();
        let documents = tokio::task::spawn_blocking(move || load_document(&owned_path, &load_scope))
            .await
            .map_err(|e| RagError::DocumentLoad {
                path: path.display().to_string(),
                message: e.to_string(),
            })??;

        let ingested_at = Utc::now().to_rfc3339();
        let mut chunks: Vec<Chunk> = self
            .splitter
            .split_documents(&documents)
            .into_iter()
            .enumerate()
            .map(|(position, (document, text))| Chunk {
                id: uuid::Uuid::new_v4().to_string(),
                chunk_id: Chunk::make_chunk_id(&scope, &source, position),
                text,
                source: source.clone(),
                scope: scope.clone(),
                section: document.section,
                position,
                ingested_at: ingested_at.clone(),
                embedding: Vec::new(),
            })
            .collect();

        if chunks.is_empty() {
            return Err(RagError::EmptyDocument("No text extracted from document.".to_string()));
        }

        for batch in chunks.chunks_mut(EMBED_BATCH_SIZE) {
            let texts = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = embed_blocking(self.embedder.clone(), texts).await?;
            if vectors.len() != batch.len() {
                return Err(RagError::Embedding(format!(
                    "expected {} vectors, got {}",
                    batch.len(),
                    vectors.len()
                )));
            }
            for (chunk, vector) in batch.iter_mut().zip(vectors) {
                chunk.embedding = vector;
            }
        }

        self.store.ensure_collection(self.embedder.dimension()).await?;
        self.store.upsert(&chunks).await?;

        let count = chunks.len();
        info!(source = %source, scope = %scope, chunks = count, "indexed document");

        Ok(IngestReport {
            message: format!("Indexed {} chunks for {} in scope '{}'.", count, source, scope),
            chunks: count,
            source,
            scope,
        })
    }

    /// Save pasted text as `pasted_{8 hex}.txt` under `upload_dir` and ingest it
    pub async fn ingest_text(&self, text: &str, scope: Option<&str>, upload_dir: &Path) -> Result<IngestReport> {
        if text.trim().is_empty() {
            return Err(RagError::InvalidInput("Text is required.".to_string()));
        }

        tokio::fs::create_dir_all(upload_dir).await?;
        let path = pasted_text_path(upload_dir);
        tokio::fs::write(&path, text).await?;
        debug!(path = %path.display(), "saved pasted text");

        self.ingest_file(&path, scope).await
    }

    /// Delete every stored chunk in `scope`
    pub async fn reset_scope(&self, scope: Option<&str>) -> Result<String> {
        let scope = normalize_scope(scope);
        self.store.delete_scope(&scope).await?;
        info!(scope = %scope, "scope cleared");
        Ok(scope)
    }

    /// Number of chunks currently stored in `scope`
    pub async fn scope_size(&self, scope: Option<&str>) -> Result<u64> {
        self.store.count(&normalize_scope(scope)).await
    }

    /// Answer `question` from the documents in `scope`
    pub async fn query(&self, question: &str, scope: Option<&str>) -> Result<QueryResponse> {
        let question = question.trim();
        if question.is_empty() {
            return Err(RagError::InvalidInput("Question is required.".to_string()));
        }
        let llm = self
            .llm
            .as_ref()
            .ok_or_else(|| RagError::MissingApiKey("GROQ_API_KEY is not set".to_string()))?;

        let scope = normalize_scope(scope);
        let started = Instant::now();

        let candidates = self.retrieval_engine.retrieve(question, &scope).await?;
        let retrieved = candidates.len();

        if candidates.is_empty() {
            debug!(scope = %scope, "no candidates retrieved");
            return Ok(QueryResponse {
                answer: NO_CONTEXT_ANSWER.to_string(),
                citations: Vec::new(),
                metrics: QueryMetrics {
                    latency_ms: started.elapsed().as_millis() as u64,
                    retrieved: 0,
                    reranked: 0,
                },
            });
        }

        let reranker = self.reranker.clone();
        let owned_question = question.to_string();
        let top_n = self.top_n;
        let ranked = tokio::task::spawn_blocking(move || reranker.rerank(&owned_question, candidates, top_n))
            .await
            .map_err(RagError::reranker)??;

        let context = self.context_builder.build(&ranked);
        let citations = self.context_builder.citations(&ranked, context.document_count);
        let user_prompt = self.context_builder.user_prompt(question, &context);

        let answer = llm
            .complete(self.context_builder.system_prompt(), &user_prompt)
            .await?;

        let latency_ms = started.elapsed().as_millis() as u64;
        info!(
            scope = %scope,
            retrieved,
            reranked = ranked.len(),
            cited = citations.len(),
            latency_ms,
            model = llm.model_name(),
            "query answered"
        );

        Ok(QueryResponse {
            answer: answer.trim().to_string(),
            citations,
            metrics: QueryMetrics {
                latency_ms,
                retrieved,
                reranked: ranked.len(),
            },
        })
    }

    pub fn has_llm(&self) -> bool {
        self.llm.is_some()
    }

    pub fn store_backend(&self) -> &'static str {
        self.store.backend()
    }
}

fn pasted_text_path(upload_dir: &Path) -> PathBuf {
    let tag = uuid::Uuid::new_v4().simple().to_string();
    upload_dir.join(format!("pasted_{}.txt", &tag[..8]))
}
