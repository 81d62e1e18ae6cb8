//! Sentence embeddings via a BERT model run locally with Candle
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config};
use hf_hub::{api::sync::Api, Repo, RepoType};
use tokenizers::{Tokenizer, TruncationParams};
use tracing::{debug, info};

use crate::errors::{RagError, Result};

/// Tokens kept per input; longer chunks are truncated
const MAX_TOKENS: usize = 256;

/// Turns text into fixed-size vectors
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts, one vector per input in order
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Output vector size
    fn dimension(&self) -> usize;

    /// Embed a single text
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])?
            .pop()
            .ok_or_else(|| RagError::Embedding("model returned no vector".to_string()))
    }
}

/// Files that make up a Hugging Face BERT checkpoint
pub(crate) struct BertFiles {
    pub config: Config,
    pub tokenizer: Tokenizer,
    pub weights: std::path::PathBuf,
}

/// Download (or reuse from the local cache) a BERT checkpoint
pub(crate) fn fetch_bert(model_id: &str, max_tokens: usize) -> Result<BertFiles> {
    let api = Api::new().map_err(|e| RagError::Config(format!("HuggingFace API client: {}", e)))?;
    let repo = api.repo(Repo::new(model_id.to_string(), RepoType::Model));

    let fetch = |file: &str| {
        repo.get(file)
            .map_err(|e| RagError::Config(format!("Failed to download {}/{}: {}", model_id, file, e)))
    };
    let config_path = fetch("config.json")?;
    let tokenizer_path = fetch("tokenizer.json")?;
    let weights = fetch("model.safetensors")?;

    let config: Config = serde_json::from_str(&std::fs::read_to_string(config_path)?)?;

    let mut tokenizer = Tokenizer::from_file(tokenizer_path)
        .map_err(|e| RagError::Config(format!("Failed to load tokenizer: {}", e)))?;
    tokenizer.with_padding(None);
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length: max_tokens,
            ..Default::default()
        }))
        .map_err(|e| RagError::Config(format!("Failed to configure truncation: {}", e)))?;

    Ok(BertFiles {
        config,
        tokenizer,
        weights,
    })
}

/// Right-pad token rows into `(batch, max_len)` tensors
pub(crate) fn pad_batch(rows: Vec<Vec<u32>>, device: &Device) -> candle_core::Result<Tensor> {
    let max_len = rows.iter().map(Vec::len).max().unwrap_or(0);
    let batch_size = rows.len();
    let flat: Vec<u32> = rows
        .into_iter()
        .flat_map(|mut row| {
            row.resize(max_len, 0);
            row
        })
        .collect();
    Tensor::from_vec(flat, (batch_size, max_len), device)
}

/// Embedding engine using a sentence-transformers BERT model via Candle
pub struct BertEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dimension: usize,
}

impl BertEmbedder {
    /// Load the model (downloads on first use) and check its output size
    pub fn load(model_id: &str, expected_dimension: usize) -> Result<Self> {
        let device = Device::Cpu;
        let files = fetch_bert(model_id, MAX_TOKENS)?;

        if files.config.hidden_size != expected_dimension {
            return Err(RagError::Embedding(format!(
                "{} produces {}-dimensional vectors but embedding.dimension is {}",
                model_id, files.config.hidden_size, expected_dimension
            )));
        }

        // SAFETY: the weights file is owned by the hub cache and not mutated while mapped
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[files.weights], DType::F32, &device)
                .map_err(RagError::embedding)?
        };
        let model = BertModel::load(vb, &files.config).map_err(RagError::embedding)?;

        info!(model = model_id, dimension = expected_dimension, "embedding model loaded");

        Ok(Self {
            model,
            tokenizer: files.tokenizer,
            device,
            dimension: expected_dimension,
        })
    }

    fn forward(&self, texts: &[&str]) -> candle_core::Result<Vec<Vec<f32>>> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(candle_core::Error::msg)?;

        let ids = encodings.iter().map(|e| e.get_ids().to_vec()).collect();
        let masks = encodings
            .iter()
            .map(|e| e.get_attention_mask().to_vec())
            .collect();

        let token_ids = pad_batch(ids, &self.device)?;
        let attention_mask = pad_batch(masks, &self.device)?;
        let token_type_ids = token_ids.zeros_like()?;

        let hidden = self
            .model
            .forward(&token_ids, &token_type_ids, Some(&attention_mask))?;

        let pooled = Self::mean_pool(&hidden, &attention_mask)?;
        let normalized = Self::l2_normalize(&pooled)?;
        normalized.to_vec2::<f32>()
    }

    /// Mean pooling with attention mask
    fn mean_pool(embeddings: &Tensor, attention_mask: &Tensor) -> candle_core::Result<Tensor> {
        let mask_expanded = attention_mask
            .unsqueeze(2)?
            .expand(embeddings.shape())?
            .to_dtype(embeddings.dtype())?;

        let sum_embeddings = (embeddings * &mask_expanded)?.sum(1)?;
        let sum_mask = mask_expanded.sum(1)?.clamp(1e-9, f64::MAX)?;

        sum_embeddings.broadcast_div(&sum_mask)
    }

    fn l2_normalize(v: &Tensor) -> candle_core::Result<Tensor> {
        let norm = v.sqr()?.sum_keepdim(1)?.sqrt()?.clamp(1e-12, f64::MAX)?;
        v.broadcast_div(&norm)
    }
}

impl Embedder for BertEmbedder {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(batch_size = texts.len(), "embedding batch");
        self.forward(texts).map_err(RagError::embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

    #[test]
    fn test_pad_batch() {
        let tensor = pad_batch(vec![vec![1, 2, 3], vec![4]], &Device::Cpu).unwrap();
        assert_eq!(tensor.dims(), &[2, 3]);
        assert_eq!(
            tensor.to_vec2::<u32>().unwrap(),
            vec![vec![1, 2, 3], vec![4, 0, 0]]
        );
    }

    #[test]
    fn test_l2_normalize() {
        let v = Tensor::new(&[[3f32, 4.0], [0.0, 2.0]], &Device::Cpu).unwrap();
        let n = BertEmbedder::l2_normalize(&v).unwrap().to_vec2::<f32>().unwrap();
        assert!((n[0][0] - 0.6).abs() < 1e-6);
        assert!((n[0][1] - 0.8).abs() < 1e-6);
        assert!((n[1][1] - 1.0).abs() < 1e-6);
    }

    #[test]
    #[ignore] // Integration test - requires model download
    fn test_embed_single_text() {
        let engine = BertEmbedder::load(MODEL, 384).expect("Failed to create engine");
        let embedding = engine.embed("Hello world").expect("Failed to embed");
        assert_eq!(embedding.len(), 384);
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-3);
    }

    #[test]
    #[ignore] // Integration test - requires model download
    fn test_embed_batch() {
        let engine = BertEmbedder::load(MODEL, 384).expect("Failed to create engine");
        let embeddings = engine
            .embed_batch(&["Hello", "World", "Test"])
            .expect("Failed to embed batch");
        assert_eq!(embeddings.len(), 3);
        assert!(embeddings.iter().all(|e| e.len() == 384));
    }

    #[test]
    #[ignore] // Integration test - requires model download
    fn test_dimension_mismatch_rejected() {
        assert!(BertEmbedder::load(MODEL, 768).is_err());
    }
}
