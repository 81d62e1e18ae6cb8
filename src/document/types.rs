use serde::{Deserialize, Serialize};

/// Scope used when a caller does not name one
pub const DEFAULT_SCOPE: &str = "default";

/// Maximum characters of chunk text echoed back in a citation
pub const SNIPPET_CHARS: usize = 400;

/// Resolve an optional, possibly blank scope name
pub fn normalize_scope(scope: Option<&str>) -> String {
    match scope.map(str::trim) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => DEFAULT_SCOPE.to_string(),
    }
}

/// Text loaded from one source, before splitting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    /// File name the text came from
    pub source: String,
    pub scope: String,
    /// Page number for paginated formats
    pub section: Option<u32>,
}

/// A split piece of a document, as stored in the vector index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Point id in the vector store (UUID v4)
    pub id: String,
    /// `{scope}:{source}:{position}`
    pub chunk_id: String,
    pub text: String,
    pub source: String,
    pub scope: String,
    pub section: Option<u32>,
    pub position: usize,
    /// RFC 3339 timestamp
    pub ingested_at: String,
    #[serde(skip)]
    pub embedding: Vec<f32>,
}

impl Chunk {
    pub fn make_chunk_id(scope: &str, source: &str, position: usize) -> String {
        format!("{}:{}:{}", scope, source, position)
    }
}

/// A chunk returned by similarity search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Reference from an answer back to the chunk that supported it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// `[n]`, 1-based in reranked order
    pub marker: String,
    pub source: String,
    pub section: Option<u32>,
    pub chunk_id: String,
    pub position: usize,
    pub snippet: String,
}

impl Citation {
    pub fn from_chunk(index: usize, chunk: &Chunk) -> Self {
        Self {
            marker: format!("[{}]", index),
            source: chunk.source.clone(),
            section: chunk.section,
            chunk_id: chunk.chunk_id.clone(),
            position: chunk.position,
            snippet: chunk.text.chars().take(SNIPPET_CHARS).collect(),
        }
    }
}
