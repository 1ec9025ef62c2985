//! State threaded through the retrieval pipeline.
//!
//! Each stage takes a `RagState` and returns a new one; nothing mutates
//! shared state, which keeps every stage testable in isolation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A bounded span of policy text with its provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub metadata: ChunkMetadata,
    /// L2 distance from the query embedding (lower is closer).
    pub distance: f32,
    /// Reranker relevance score (higher is better); set after rerank.
    pub score: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source: String,
    pub page: u32,
}

/// Question category driving context selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyIntent {
    Procedure,
    Permission,
    Penalty,
    Definition,
    General,
}

/// Chunk buckets by rhetorical function. A chunk may land in several
/// buckets; every chunk also lands in `general`.
#[derive(Debug, Clone, Default)]
pub struct ChunkCategories {
    pub mandatory: Vec<Chunk>,
    pub restriction: Vec<Chunk>,
    pub penalty: Vec<Chunk>,
    pub procedure: Vec<Chunk>,
    pub general: Vec<Chunk>,
}

/// Hallucination verdict for one generated answer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HallucinationCheck {
    pub is_hallucination: bool,
    pub score: f64,
    pub reasons: Vec<String>,
}

/// Per-invocation pipeline state. Created fresh per call, discarded after
/// the final answer is extracted.
#[derive(Debug, Clone, Default)]
pub struct RagState {
    pub question: String,
    pub intent: Option<PolicyIntent>,
    pub retrieved: Vec<Chunk>,
    pub reranked: Vec<Chunk>,
    pub categories: ChunkCategories,
    pub context: String,
    pub sources: BTreeSet<String>,
    pub answer: String,
    pub hallucination_check: HallucinationCheck,
    pub retry_count: u32,
}

impl RagState {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Default::default()
        }
    }
}

/// What the pipeline hands back to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagAnswer {
    pub text: String,
    pub sources: Vec<String>,
    /// Still flagged after retries were exhausted. Surfaced so the caller
    /// can annotate the answer instead of silently passing it through.
    pub low_confidence: bool,
}
