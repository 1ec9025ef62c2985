//! Hallucination detection: is the generated answer supported by the
//! retrieved context?
//!
//! Two signals: a token-overlap floor, and an optional learned scorer fed
//! with embedding-similarity features. Either signal alone can flag.

use crate::error::Result;
use crate::llm::Embedder;
use crate::rag::types::HallucinationCheck;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;

/// Features handed to the learned scorer, in training order.
#[derive(Debug, Clone)]
pub struct HallucinationFeatures {
    pub question_context_similarity: f64,
    pub answer_context_similarity: f64,
    pub question_answer_similarity: f64,
    pub token_overlap: f64,
    pub context_tokens: usize,
    pub answer_tokens: usize,
}

/// External classifier over the feature vector; returns the probability
/// that the answer is a hallucination.
#[async_trait]
pub trait HallucinationScorer: Send + Sync {
    async fn score(&self, features: &HallucinationFeatures) -> Result<f64>;
}

/// Fraction of answer tokens that also appear in the context.
pub fn token_overlap_ratio(answer: &str, context: &str) -> f64 {
    let answer_tokens: HashSet<String> =
        answer.to_lowercase().split_whitespace().map(String::from).collect();
    if answer_tokens.is_empty() {
        return 0.0;
    }
    let context_tokens: HashSet<String> =
        context.to_lowercase().split_whitespace().map(String::from).collect();
    let overlap = answer_tokens.intersection(&context_tokens).count();
    overlap as f64 / answer_tokens.len() as f64
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)) as f64
}

pub struct HallucinationDetector {
    embedder: Arc<dyn Embedder>,
    scorer: Option<Arc<dyn HallucinationScorer>>,
    min_token_overlap: f64,
    score_threshold: f64,
}

impl HallucinationDetector {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        scorer: Option<Arc<dyn HallucinationScorer>>,
        min_token_overlap: f64,
        score_threshold: f64,
    ) -> Self {
        Self {
            embedder,
            scorer,
            min_token_overlap,
            score_threshold,
        }
    }

    pub async fn detect(
        &self,
        question: &str,
        context: &str,
        answer: &str,
    ) -> Result<HallucinationCheck> {
        let mut check = HallucinationCheck::default();

        let overlap = token_overlap_ratio(answer, context);
        if overlap < self.min_token_overlap {
            check.is_hallucination = true;
            check.reasons.push(format!("Low overlap: {:.0}%", overlap * 100.0));
        }

        if let Some(scorer) = &self.scorer {
            let q_emb = self.embedder.embed(question).await?;
            let c_emb = self.embedder.embed(context).await?;
            let a_emb = self.embedder.embed(answer).await?;

            let features = HallucinationFeatures {
                question_context_similarity: cosine_similarity(&q_emb, &c_emb),
                answer_context_similarity: cosine_similarity(&a_emb, &c_emb),
                question_answer_similarity: cosine_similarity(&q_emb, &a_emb),
                token_overlap: overlap,
                context_tokens: context.split_whitespace().count(),
                answer_tokens: answer.split_whitespace().count(),
            };

            let score = scorer.score(&features).await?;
            check.score = score;
            if score > self.score_threshold {
                check.is_hallucination = true;
                check.reasons.push(format!("Classifier score: {:.0}%", score * 100.0));
            }
        }

        Ok(check)
    }
}
