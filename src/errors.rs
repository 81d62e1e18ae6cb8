//! Error types for minirag
//!
//! Library code returns [`Result`]; the binary wraps these in `anyhow`
//! at the edges and the HTTP layer maps them onto status codes.

use thiserror::Error;

/// Main error type for ingestion and question answering
#[derive(Error, Debug)]
pub enum RagError {
    /// Caller supplied a missing or malformed value
    #[error("{0}")]
    InvalidInput(String),

    /// File extension is not one of .txt, .pdf, .docx
    #[error("Only .txt, .pdf, and .docx files are supported.")]
    UnsupportedFile { extension: String },

    /// MIME type does not match the file extension
    #[error("Invalid MIME '{mime}' for extension {extension}.")]
    InvalidMime { mime: String, extension: String },

    /// Document parsed but produced no text
    #[error("{0}")]
    EmptyDocument(String),

    /// Document could not be parsed
    #[error("Failed to load document {path}: {message}")]
    DocumentLoad { path: String, message: String },

    /// LLM credentials are not configured
    #[error("{0}")]
    MissingApiKey(String),

    /// LLM rejected the API key
    #[error("Groq authentication failed: check GROQ_API_KEY.")]
    LlmAuth,

    /// LLM model identifier is retired or unknown
    #[error("Groq model deprecated/unsupported. Update GROQ_MODEL_ID.")]
    LlmModelUnsupported,

    /// Any other LLM failure
    #[error("LLM error: {0}")]
    Llm(String),

    /// Embedding model errors
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Reranker model errors
    #[error("Reranker error: {0}")]
    Reranker(String),

    /// Vector store errors
    #[error("Vector store error ({backend}): {message}")]
    VectorStore { backend: String, message: String },

    /// Non-success answer from a remote minirag backend
    #[error("Backend returned {status}: {detail}")]
    Backend { status: u16, detail: String },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RagError {
    /// Whether the failure was caused by the request rather than the server
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            RagError::InvalidInput(_)
                | RagError::UnsupportedFile { .. }
                | RagError::InvalidMime { .. }
                | RagError::EmptyDocument(_)
                | RagError::DocumentLoad { .. }
                | RagError::MissingApiKey(_)
                | RagError::LlmAuth
                | RagError::LlmModelUnsupported
        )
    }

    /// HTTP status the API layer answers with
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            RagError::Llm(_) | RagError::Http(_) | RagError::Backend { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub(crate) fn embedding(err: impl std::fmt::Display) -> Self {
        RagError::Embedding(err.to_string())
    }

    pub(crate) fn reranker(err: impl std::fmt::Display) -> Self {
        RagError::Reranker(err.to_string())
    }
}

/// Result type alias for minirag operations
pub type Result<T> = std::result::Result<T, RagError>;
