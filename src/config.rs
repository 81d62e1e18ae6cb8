//! Configuration management for minirag
//!
//! TOML file (default location `~/.minirag/config.toml`) layered under
//! environment variable overrides.

use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::{RagError, Result};

/// Complete configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub qdrant: QdrantConfig,
    pub embedding: EmbeddingConfig,
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
    pub reranker: RerankerConfig,
    pub llm: LlmConfig,
    pub paths: PathsConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}

/// Which vector store implementation backs the index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Qdrant server at `qdrant.url`
    Qdrant,
    /// In-process store persisted as a JSON snapshot under `qdrant.local_path`
    Local,
    /// In-process store, lost on exit
    Memory,
}

/// Similarity metric for the collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    Cosine,
    Dot,
    Euclid,
}

impl DistanceMetric {
    /// Parse a metric name; unknown names fall back to cosine
    pub fn parse(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "dot" => DistanceMetric::Dot,
            "euclid" => DistanceMetric::Euclid,
            _ => DistanceMetric::Cosine,
        }
    }
}

impl<'de> Deserialize<'de> for DistanceMetric {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        Ok(DistanceMetric::parse(&name))
    }
}

/// Vector store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QdrantConfig {
    pub backend: StoreBackend,
    pub url: String,
    pub local_path: String,
    pub collection: String,
    pub distance: DistanceMetric,
}

/// Sentence embedding model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model: String,
    pub dimension: usize,
}

/// Text splitting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

/// Vector retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub retrieve_k: usize,
    pub max_context_chars: usize,
}

/// Reranker implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RerankerKind {
    CrossEncoder,
    Lexical,
}

/// Reranker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankerConfig {
    pub kind: RerankerKind,
    pub model: String,
    pub top_n: usize,
}

/// Hosted LLM configuration (OpenAI-compatible chat completions)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
}

/// File system paths configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub upload_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            max_upload_bytes: 25 * 1024 * 1024,
        }
    }
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Local,
            url: "http://localhost:6334".to_string(),
            local_path: "data/qdrant_local".to_string(),
            collection: "mini_rag".to_string(),
            distance: DistanceMetric::Cosine,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            dimension: 384,
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 120,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            retrieve_k: 12,
            max_context_chars: 12_000,
        }
    }
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self {
            kind: RerankerKind::CrossEncoder,
            model: "cross-encoder/ms-marco-MiniLM-L-6-v2".to_string(),
            top_n: 4,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.groq.com/openai/v1".to_string(),
            api_key: String::new(),
            model: "llama-3.3-70b-versatile".to_string(),
            temperature: 0.0,
            timeout_secs: 60,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            upload_dir: "data/uploads".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file or defaults, then apply environment overrides
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let mut config = match path {
            Some(config_path) => Self::load_from_file(&config_path)?,
            None => Self::load_default()?,
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| RagError::Config(format!("Failed to read config: {}", e)))?;

        toml::from_str(&contents)
            .map_err(|e| RagError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load from the standard location or use built-in defaults
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(config_path) if config_path.exists() => Self::load_from_file(&config_path),
            _ => Ok(Config::default()),
        }
    }

    /// `~/.minirag/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".minirag").join("config.toml"))
    }

    /// Apply overrides using the given variable lookup; blank values are ignored
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("BACKEND_HOST") {
            self.server.host = v;
        }
        if let Some(v) = get("BACKEND_PORT") {
            self.server.port = parse_env("BACKEND_PORT", &v)?;
        }
        if let Some(v) = get("QDRANT_URL") {
            self.qdrant.url = v;
            self.qdrant.backend = StoreBackend::Qdrant;
        }
        if let Some(v) = get("QDRANT_LOCAL_PATH") {
            self.qdrant.local_path = v;
        }
        if let Some(v) = get("QDRANT_COLLECTION") {
            self.qdrant.collection = v;
        }
        if let Some(v) = get("QDRANT_DISTANCE") {
            self.qdrant.distance = DistanceMetric::parse(&v);
        }
        if let Some(v) = get("EMBEDDING_MODEL") {
            self.embedding.model = v;
        }
        if let Some(v) = get("EMBEDDING_DIM") {
            self.embedding.dimension = parse_env("EMBEDDING_DIM", &v)?;
        }
        if let Some(v) = get("CHUNK_SIZE") {
            self.chunking.chunk_size = parse_env("CHUNK_SIZE", &v)?;
        }
        if let Some(v) = get("CHUNK_OVERLAP") {
            self.chunking.chunk_overlap = parse_env("CHUNK_OVERLAP", &v)?;
        }
        if let Some(v) = get("RETRIEVE_K") {
            self.retrieval.retrieve_k = parse_env("RETRIEVE_K", &v)?;
        }
        if let Some(v) = get("RERANK_TOP_N") {
            self.reranker.top_n = parse_env("RERANK_TOP_N", &v)?;
        }
        if let Some(v) = get("RERANKER_MODEL") {
            self.reranker.model = v;
        }
        if let Some(v) = get("GROQ_API_KEY") {
            self.llm.api_key = v;
        }
        if let Some(v) = get("GROQ_MODEL_ID") {
            self.llm.model = v;
        }
        if let Some(v) = get("UPLOAD_DIR") {
            self.paths.upload_dir = v;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(RagError::Config(
                "chunk_size must be greater than 0".to_string(),
            ));
        }

        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(RagError::Config(
                "chunk_overlap must be less than chunk_size".to_string(),
            ));
        }

        if self.retrieval.retrieve_k == 0 {
            return Err(RagError::Config(
                "retrieve_k must be greater than 0".to_string(),
            ));
        }

        if self.reranker.top_n == 0 {
            return Err(RagError::Config(
                "rerank top_n must be greater than 0".to_string(),
            ));
        }

        if self.embedding.dimension == 0 {
            return Err(RagError::Config(
                "embedding dimension must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| RagError::Config(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| RagError::Config(format!("Failed to create config dir: {}", e)))?;
        }

        std::fs::write(path, contents)
            .map_err(|e| RagError::Config(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Expand tilde in paths
    pub fn expand_path(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
        PathBuf::from(path)
    }

    /// Upload directory path
    pub fn upload_dir(&self) -> PathBuf {
        Self::expand_path(&self.paths.upload_dir)
    }

    /// Snapshot file of the local store, one per collection
    pub fn local_store_path(&self) -> PathBuf {
        Self::expand_path(&self.qdrant.local_path).join(format!("{}.json", self.qdrant.collection))
    }

    /// Create directories the service writes into
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(self.upload_dir())?;
        if self.qdrant.backend == StoreBackend::Local {
            std::fs::create_dir_all(Self::expand_path(&self.qdrant.local_path))?;
        }
        Ok(())
    }

    /// Socket address string the server binds to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| RagError::Config(format!("{} has invalid value '{}'", key, value)))
}
