// Cross-encoder reranker: a BERT sequence classifier scoring (query, passage) pairs
use candle_core::{DType, Device, Tensor};
use candle_nn::{linear, Linear, Module, VarBuilder};
use candle_transformers::models::bert::BertModel;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use crate::document::ScoredChunk;
use crate::embedding::engine::{fetch_bert, pad_batch};
use crate::errors::{RagError, Result};
use crate::rag::reranking::{keep_top, RankedChunk, Reranker};

/// Query plus passage tokens kept per pair
const MAX_PAIR_TOKENS: usize = 512;

/// Reranker backed by a Hugging Face cross-encoder checkpoint
pub struct CrossEncoderReranker {
    model: BertModel,
    pooler: Linear,
    classifier: Linear,
    tokenizer: Tokenizer,
    device: Device,
}

impl CrossEncoderReranker {
    /// Load the model, downloading it on first use
    pub fn load(model_id: &str) -> Result<Self> {
        let device = Device::Cpu;
        let files = fetch_bert(model_id, MAX_PAIR_TOKENS)?;

        match files.config.model_type.as_deref() {
            None | Some("bert") => {}
            Some(other) => {
                return Err(RagError::Config(format!(
                    "{} is a '{}' model; only BERT cross-encoders are supported",
                    model_id, other
                )))
            }
        }

        let hidden = files.config.hidden_size;

        // SAFETY: the weights file is owned by the hub cache and not mutated while mapped
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[files.weights], DType::F32, &device)
                .map_err(RagError::reranker)?
        };
        let model = BertModel::load(vb.clone(), &files.config).map_err(RagError::reranker)?;
        let pooler = linear(hidden, hidden, vb.pp("bert.pooler.dense")).map_err(RagError::reranker)?;
        let classifier = linear(hidden, 1, vb.pp("classifier")).map_err(RagError::reranker)?;

        info!(model = model_id, "reranker model loaded");

        Ok(Self {
            model,
            pooler,
            classifier,
            tokenizer: files.tokenizer,
            device,
        })
    }

    fn score_pairs(&self, query: &str, passages: &[&str]) -> candle_core::Result<Vec<f32>> {
        let pairs: Vec<(&str, &str)> = passages.iter().map(|p| (query, *p)).collect();
        let encodings = self
            .tokenizer
            .encode_batch(pairs, true)
            .map_err(candle_core::Error::msg)?;

        let ids = encodings.iter().map(|e| e.get_ids().to_vec()).collect();
        let type_ids = encodings.iter().map(|e| e.get_type_ids().to_vec()).collect();
        let masks = encodings
            .iter()
            .map(|e| e.get_attention_mask().to_vec())
            .collect();

        let token_ids = pad_batch(ids, &self.device)?;
        let token_type_ids = pad_batch(type_ids, &self.device)?;
        let attention_mask = pad_batch(masks, &self.device)?;

        let hidden = self
            .model
            .forward(&token_ids, &token_type_ids, Some(&attention_mask))?;

        // [CLS] token -> pooler -> tanh -> single relevance logit
        let cls = hidden.narrow(1, 0, 1)?.squeeze(1)?;
        let pooled = self.pooler.forward(&cls)?.tanh()?;
        let logits: Tensor = self.classifier.forward(&pooled)?;
        logits.squeeze(1)?.to_vec1::<f32>()
    }
}

impl Reranker for CrossEncoderReranker {
    fn rerank(&self, query: &str, candidates: Vec<ScoredChunk>, top_n: usize) -> Result<Vec<RankedChunk>> {
        if candidates.is_empty() || top_n == 0 {
            return Ok(Vec::new());
        }

        debug!(candidates = candidates.len(), top_n, "cross-encoder rerank");
        let passages: Vec<&str> = candidates.iter().map(|c| c.chunk.text.as_str()).collect();
        let scores = self
            .score_pairs(query, &passages)
            .map_err(RagError::reranker)?;

        Ok(keep_top(candidates, scores, top_n))
    }
}
