// Context builder for grounded, citation-bearing prompts
use serde::{Deserialize, Serialize};

use crate::document::{Chunk, Citation};
use crate::rag::reranking::RankedChunk;

const SYSTEM_PROMPT: &str = "You are a helpful assistant answering questions about the user's documents. \
Use only the numbered context passages to answer. \
Cite every passage you rely on with its marker, for example [1] or [2][3]. \
If the context does not contain the answer, say that you don't know; do not make up an answer.";

/// Context assembly configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Upper bound on the characters of assembled context
    pub max_context_chars: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_context_chars: 12_000,
        }
    }
}

/// Assembled context for prompt augmentation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssembledContext {
    /// The formatted context text
    pub text: String,
    /// Number of passages included; markers run 1..=document_count
    pub document_count: usize,
    /// Characters of context text
    pub char_count: usize,
}

/// Context builder for assembling RAG context
pub struct ContextBuilder {
    config: ContextConfig,
}

impl ContextBuilder {
    /// Create new context builder with default config
    pub fn new() -> Self {
        Self {
            config: ContextConfig::default(),
        }
    }

    /// Create with custom configuration
    pub fn with_config(config: ContextConfig) -> Self {
        Self { config }
    }

    /// Build numbered context from ranked chunks, best first
    ///
    /// Passages are added until the character budget would be exceeded; the
    /// first passage is always kept.
    pub fn build(&self, chunks: &[RankedChunk]) -> AssembledContext {
        let mut parts: Vec<String> = Vec::new();
        let mut total_chars = 0;

        for (idx, ranked) in chunks.iter().enumerate() {
            let formatted = Self::format_chunk(idx + 1, &ranked.chunk);
            let separator = if parts.is_empty() { 0 } else { 2 };
            let chars = formatted.chars().count() + separator;

            if !parts.is_empty() && total_chars + chars > self.config.max_context_chars {
                break;
            }

            total_chars += chars;
            parts.push(formatted);
        }

        AssembledContext {
            document_count: parts.len(),
            text: parts.join("\n\n"),
            char_count: total_chars,
        }
    }

    fn format_chunk(index: usize, chunk: &Chunk) -> String {
        let section = chunk
            .section
            .map(|s| s.to_string())
            .unwrap_or_else(|| "n/a".to_string());
        format!(
            "[{}] (source: {}, section: {})\n{}",
            index, chunk.source, section, chunk.text
        )
    }

    pub fn system_prompt(&self) -> &'static str {
        SYSTEM_PROMPT
    }

    /// User turn: the assembled context followed by the question
    pub fn user_prompt(&self, question: &str, context: &AssembledContext) -> String {
        format!("Context:\n{}\n\nQuestion: {}", context.text, question.trim())
    }

    /// Citations for the first `count` ranked chunks, numbered like the context
    pub fn citations(&self, chunks: &[RankedChunk], count: usize) -> Vec<Citation> {
        chunks
            .iter()
            .take(count)
            .enumerate()
            .map(|(idx, ranked)| Citation::from_chunk(idx + 1, &ranked.chunk))
            .collect()
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}
