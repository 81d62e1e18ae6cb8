//! Retrieval-augmented generation
//!
//! Components:
//! - Retrieval: embed the question and search one scope
//! - Re-ranking: rescore candidates and keep the best few
//! - Context: numbered passages plus the prompts sent to the LLM
//! - Pipeline: ingestion and question answering end to end

pub mod context;
pub mod pipeline;
pub mod reranking;
pub mod retrieval;

pub use context::{AssembledContext, ContextBuilder, ContextConfig};
pub use pipeline::{IngestReport, PipelineSettings, QueryMetrics, QueryResponse, RagPipeline};
pub use reranking::{CrossEncoderReranker, LexicalReranker, RankedChunk, Reranker};
pub use retrieval::{RetrievalEngine, SearchParams};
