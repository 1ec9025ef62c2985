//! Reranking stage: re-score retrieved chunks with a pairwise relevance
//! model and keep the best few.

use crate::error::Result;
use crate::llm::Reranker;
use crate::rag::types::Chunk;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;

/// Score every chunk against the query and keep the `final_top_k` best,
/// highest score first.
pub async fn rerank_chunks(
    reranker: &Arc<dyn Reranker>,
    query: &str,
    chunks: Vec<Chunk>,
    final_top_k: usize,
) -> Result<Vec<Chunk>> {
    let mut scored = Vec::with_capacity(chunks.len());
    for mut chunk in chunks {
        chunk.score = reranker.score(query, &chunk.text).await?;
        scored.push(chunk);
    }
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(final_top_k);
    Ok(scored)
}

/// Token-overlap relevance scorer. Stands in for a cross-encoder service
/// when none is configured; same contract, cheaper signal.
pub struct LexicalReranker;

#[async_trait]
impl Reranker for LexicalReranker {
    async fn score(&self, query: &str, candidate: &str) -> Result<f32> {
        let query_tokens: HashSet<String> =
            query.to_lowercase().split_whitespace().map(String::from).collect();
        if query_tokens.is_empty() {
            return Ok(0.0);
        }
        let candidate_tokens: HashSet<String> =
            candidate.to_lowercase().split_whitespace().map(String::from).collect();
        let overlap = query_tokens.intersection(&candidate_tokens).count();
        Ok(overlap as f32 / query_tokens.len() as f32)
    }
}
