//! Document ingestion: file loading, text splitting and the chunk types
//! shared with the vector store and the RAG pipeline.

pub mod loader;
pub mod splitter;
pub mod types;

pub use loader::{is_mime_allowed, load_bytes, load_document, safe_filename, validate_upload, FileKind};
pub use splitter::RecursiveSplitter;
pub use types::{normalize_scope, Chunk, Citation, Document, ScoredChunk, DEFAULT_SCOPE, SNIPPET_CHARS};
