// Second-pass relevance scoring of retrieved chunks
pub mod cross_encoder;
pub mod lexical;

use serde::{Deserialize, Serialize};

use crate::document::{Chunk, ScoredChunk};
use crate::errors::Result;

pub use cross_encoder::CrossEncoderReranker;
pub use lexical::{LexicalConfig, LexicalReranker};

/// Chunk with both its retrieval and rerank scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedChunk {
    pub chunk: Chunk,
    pub retrieval_score: f32,
    pub rerank_score: f32,
}

/// Reorders retrieval candidates against the query
pub trait Reranker: Send + Sync {
    /// Score every candidate, sort best first and keep at most `top_n`
    fn rerank(&self, query: &str, candidates: Vec<ScoredChunk>, top_n: usize) -> Result<Vec<RankedChunk>>;
}

/// Pair candidates with scores, sort descending and truncate
///
/// The sort is stable, so equal scores keep retrieval order.
pub(crate) fn keep_top(candidates: Vec<ScoredChunk>, scores: Vec<f32>, top_n: usize) -> Vec<RankedChunk> {
    let mut ranked: Vec<RankedChunk> = candidates
        .into_iter()
        .zip(scores)
        .map(|(candidate, rerank_score)| RankedChunk {
            retrieval_score: candidate.score,
            chunk: candidate.chunk,
            rerank_score,
        })
        .collect();

    ranked.sort_by(|a, b| b.rerank_score.total_cmp(&a.rerank_score));
    ranked.truncate(top_n);
    ranked
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::document::{Chunk, ScoredChunk};

    pub fn candidate(id: &str, text: &str, score: f32) -> ScoredChunk {
        ScoredChunk {
            chunk: Chunk {
                id: id.to_string(),
                chunk_id: format!("default:doc.txt:{}", id),
                text: text.to_string(),
                source: "doc.txt".to_string(),
                scope: "default".to_string(),
                section: None,
                position: 0,
                ingested_at: String::new(),
                embedding: Vec::new(),
            },
            score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::candidate;
    use super::*;

    #[test]
    fn test_keep_top_sorts_and_truncates() {
        let candidates = vec![
            candidate("1", "a", 0.9),
            candidate("2", "b", 0.8),
            candidate("3", "c", 0.7),
        ];
        let ranked = keep_top(candidates, vec![0.1, 0.5, 0.3], 2);

        let ids: Vec<_> = ranked.iter().map(|r| r.chunk.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "3"]);
        assert_eq!(ranked[0].retrieval_score, 0.8);
        assert_eq!(ranked[0].rerank_score, 0.5);
    }

    #[test]
    fn test_keep_top_ties_keep_retrieval_order() {
        let candidates = vec![candidate("1", "a", 0.9), candidate("2", "b", 0.8)];
        let ranked = keep_top(candidates, vec![1.0, 1.0], 5);
        assert_eq!(ranked[0].chunk.id, "1");
        assert_eq!(ranked.len(), 2);
    }
}
