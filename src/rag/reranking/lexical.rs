// Model-free reranker: vector similarity plus a keyword overlap boost
use serde::{Deserialize, Serialize};

use crate::document::ScoredChunk;
use crate::errors::Result;
use crate::rag::reranking::{keep_top, RankedChunk, Reranker};

/// Lexical reranking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LexicalConfig {
    /// Maximum boost for exact keyword matches
    pub keyword_boost: f32,
    /// Query words shorter than this are ignored
    pub min_word_len: usize,
}

impl Default for LexicalConfig {
    fn default() -> Self {
        Self {
            keyword_boost: 0.2,
            min_word_len: 4,
        }
    }
}

/// Reranker that needs no model download
pub struct LexicalReranker {
    config: LexicalConfig,
}

impl LexicalReranker {
    pub fn new() -> Self {
        Self {
            config: LexicalConfig::default(),
        }
    }

    pub fn with_config(config: LexicalConfig) -> Self {
        Self { config }
    }

    fn compute_score(&self, candidate: &ScoredChunk, query: &str) -> f32 {
        candidate.score + self.compute_keyword_boost(&candidate.chunk.text, query)
    }

    /// Boost proportional to the share of query words found in the text
    fn compute_keyword_boost(&self, text: &str, query: &str) -> f32 {
        let query_lower = query.to_lowercase();
        let content_lower = text.to_lowercase();

        let query_words: Vec<&str> = query_lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        if query_words.is_empty() {
            return 0.0;
        }

        let matches = query_words
            .iter()
            .filter(|word| word.chars().count() >= self.config.min_word_len && content_lower.contains(*word))
            .count();

        let boost_per_match = self.config.keyword_boost / query_words.len() as f32;
        (matches as f32 * boost_per_match).min(self.config.keyword_boost)
    }
}

impl Default for LexicalReranker {
    fn default() -> Self {
        Self::new()
    }
}

impl Reranker for LexicalReranker {
    fn rerank(&self, query: &str, candidates: Vec<ScoredChunk>, top_n: usize) -> Result<Vec<RankedChunk>> {
        let scores = candidates
            .iter()
            .map(|c| self.compute_score(c, query))
            .collect();
        Ok(keep_top(candidates, scores, top_n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::reranking::test_support::candidate;

    #[test]
    fn test_keyword_boost() {
        let ranker = LexicalReranker::new();
        let boost = ranker.compute_keyword_boost("Rust programming language", "rust programming?");
        assert!(boost > 0.0);
        assert!(boost <= 0.2);
    }

    #[test]
    fn test_short_words_ignored() {
        let ranker = LexicalReranker::new();
        assert_eq!(ranker.compute_keyword_boost("the cat sat", "the cat"), 0.0);
    }

    #[test]
    fn test_boost_can_reorder() {
        let ranker = LexicalReranker::new();
        let candidates = vec![
            candidate("1", "unrelated filler text", 0.80),
            candidate("2", "ownership and borrowing rules", 0.75),
        ];

        let ranked = ranker.rerank("explain ownership borrowing", candidates, 4).unwrap();
        assert_eq!(ranked[0].chunk.id, "2");
        assert_eq!(ranked[0].retrieval_score, 0.75);
    }

    #[test]
    fn test_rerank_respects_top_n() {
        let ranker = LexicalReranker::new();
        let candidates = (0..10)
            .map(|i| candidate(&i.to_string(), "content", 1.0 - i as f32 * 0.05))
            .collect();

        let ranked = ranker.rerank("query", candidates, 4).unwrap();
        assert_eq!(ranked.len(), 4);
        assert_eq!(ranked[0].chunk.id, "0");
        assert!(ranked.windows(2).all(|w| w[0].rerank_score >= w[1].rerank_score));
    }
}
