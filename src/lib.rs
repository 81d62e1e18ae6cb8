//! minirag - retrieval-augmented Q&A over uploaded documents
//!
//! Documents (.txt, .pdf, .docx) are split into overlapping chunks, embedded
//! with a local BERT model and stored in Qdrant under a named scope.
//! Questions retrieve candidates from one scope, a cross-encoder reranks
//! them, and a hosted LLM answers from the numbered passages with `[n]`
//! citations.
//!
//! # Architecture
//!
//! - `document`: loading, MIME checks, recursive text splitting
//! - `embedding`: sentence embeddings (Candle)
//! - `vector_db`: scoped vector storage (Qdrant or in-memory)
//! - `rag`: retrieval, reranking, context assembly, pipeline
//! - `llm`: Groq chat completions
//! - `server`: HTTP API (axum)
//! - `client`, `chat`: terminal chat against a running backend

pub mod chat;
pub mod cli;
pub mod client;
pub mod config;
pub mod document;
pub mod embedding;
pub mod errors;
pub mod llm;
pub mod rag;
pub mod server;
pub mod telemetry;
pub mod vector_db;

// Re-export commonly used types
pub use config::Config;
pub use errors::{RagError, Result};
pub use rag::{IngestReport, QueryResponse, RagPipeline};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
