//! Retrieval-augmented generation as a fixed-sequence state machine.
//!
//! `intent -> retrieve -> rerank -> categorize -> context -> generate ->
//! validate -> {retry -> generate | finalize}`. Each stage is a pure
//! transformation of `RagState`; the only loop is the bounded
//! hallucination retry, which always terminates in `finalize` regardless
//! of the final verdict.

use crate::config::AssistantConfig;
use crate::error::Result;
use crate::llm::{Embedder, Reranker, TextGenerator};
use crate::rag::hallucination::{HallucinationDetector, HallucinationScorer};
use crate::rag::index::DocumentStore;
use crate::rag::prompts::{answer_prompt, NOT_FOUND_ANSWER};
use crate::rag::rerank::rerank_chunks;
use crate::rag::retrieval::Retriever;
use crate::rag::types::{Chunk, ChunkCategories, PolicyIntent, RagAnswer, RagState};
use itertools::Itertools;
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

/// Classify the question into a policy intent. Ordered keyword rules,
/// first match wins.
pub fn detect_policy_intent(question: &str) -> PolicyIntent {
    let q = question.trim().to_lowercase();

    if ["how to", "procedure", "process", "steps"].iter().any(|k| q.contains(k)) {
        return PolicyIntent::Procedure;
    }
    if ["can i", "is it allowed", "allowed", "permitted"].iter().any(|k| q.contains(k)) {
        return PolicyIntent::Permission;
    }
    if ["penalty", "consequence", "violate", "disciplinary"].iter().any(|k| q.contains(k)) {
        return PolicyIntent::Penalty;
    }
    if q.starts_with("what is") || q.starts_with("define") {
        return PolicyIntent::Definition;
    }
    PolicyIntent::General
}

/// Bucket chunks by rhetorical function. Membership is keyword-based and
/// non-exclusive; everything also lands in `general`.
pub fn categorize_chunks(chunks: &[Chunk]) -> ChunkCategories {
    let mut categories = ChunkCategories::default();

    for chunk in chunks {
        let text = chunk.text.to_lowercase();

        if ["must", "shall", "required", "mandatory"].iter().any(|w| text.contains(w)) {
            categories.mandatory.push(chunk.clone());
        }
        if ["not allowed", "prohibited", "restricted", "cannot"].iter().any(|w| text.contains(w)) {
            categories.restriction.push(chunk.clone());
        }
        if ["disciplinary", "termination", "warning", "penalty"].iter().any(|w| text.contains(w)) {
            categories.penalty.push(chunk.clone());
        }
        if ["procedure", "process", "step"].iter().any(|w| text.contains(w)) {
            categories.procedure.push(chunk.clone());
        }
        categories.general.push(chunk.clone());
    }

    categories
}

fn take(chunks: &[Chunk], n: usize) -> Vec<Chunk> {
    chunks.iter().take(n).cloned().collect()
}

/// Select a bucket-dependent subset and concatenate with inline citations.
pub fn build_context(state: &RagState) -> (String, Vec<String>) {
    let categories = &state.categories;
    let selected: Vec<Chunk> = match state.intent.unwrap_or(PolicyIntent::General) {
        PolicyIntent::Penalty => {
            let mut v = take(&categories.penalty, 3);
            v.extend(take(&categories.mandatory, 2));
            v
        }
        PolicyIntent::Permission => {
            let mut v = take(&categories.restriction, 3);
            v.extend(take(&categories.mandatory, 2));
            v
        }
        PolicyIntent::Procedure => take(&categories.procedure, 4),
        PolicyIntent::Definition => take(&state.reranked, 3),
        PolicyIntent::General => take(&state.reranked, 5),
    };

    let context = selected
        .iter()
        .map(|chunk| {
            format!(
                "[{}, Page {}]\n{}\n",
                chunk.metadata.source, chunk.metadata.page, chunk.text
            )
        })
        .join("\n");
    let sources: std::collections::BTreeSet<String> = selected
        .iter()
        .map(|chunk| format!("{} (Page {})", chunk.metadata.source, chunk.metadata.page))
        .collect();

    (context, sources.into_iter().collect())
}

/// The document-retrieval pipeline.
pub struct RagPipeline {
    retriever: Retriever,
    reranker: Arc<dyn Reranker>,
    generator: Arc<dyn TextGenerator>,
    detector: HallucinationDetector,
    final_top_k: usize,
    max_retries: u32,
}

impl RagPipeline {
    pub fn new(
        config: &AssistantConfig,
        embedder: Arc<dyn Embedder>,
        reranker: Arc<dyn Reranker>,
        generator: Arc<dyn TextGenerator>,
        scorer: Option<Arc<dyn HallucinationScorer>>,
        store: Arc<RwLock<DocumentStore>>,
    ) -> Self {
        let retriever = Retriever::new(
            Arc::clone(&embedder),
            store,
            config.top_k,
            config.similarity_threshold,
        );
        let detector = HallucinationDetector::new(
            embedder,
            scorer,
            config.min_token_overlap,
            config.hallucination_threshold,
        );
        Self {
            retriever,
            reranker,
            generator,
            detector,
            final_top_k: config.final_top_k,
            max_retries: config.max_retries,
        }
    }

    async fn generate_answer(&self, state: &RagState) -> Result<String> {
        let prompt = answer_prompt(&state.question, &state.context);
        Ok(self.generator.generate(&prompt).await?.trim().to_string())
    }

    /// Run the full state machine for one question.
    pub async fn run(&self, question: &str) -> Result<RagAnswer> {
        let mut state = RagState::new(question);

        // intent
        state.intent = Some(detect_policy_intent(&state.question));

        // retrieve
        state.retrieved = self.retriever.retrieve(&state.question).await?;

        // rerank
        state.reranked = rerank_chunks(
            &self.reranker,
            &state.question,
            state.retrieved.clone(),
            self.final_top_k,
        )
        .await?;

        // categorize
        state.categories = categorize_chunks(&state.reranked);

        // context
        let (context, sources) = build_context(&state);
        state.context = context;
        state.sources = sources.into_iter().collect();

        // Nothing retrieved means nothing to ground an answer in. The
        // sentinel finalizes immediately; running it through the validation
        // loop would only mislabel a fixed text as low confidence.
        if state.context.trim().is_empty() {
            info!("No context retrieved, finalizing with the not-found sentinel");
            return Ok(RagAnswer {
                text: NOT_FOUND_ANSWER.to_string(),
                sources: Vec::new(),
                low_confidence: false,
            });
        }

        // generate -> validate -> retry-or-finalize
        loop {
            state.answer = self.generate_answer(&state).await?;

            state.hallucination_check = self
                .detector
                .detect(&state.question, &state.context, &state.answer)
                .await?;

            if state.hallucination_check.is_hallucination {
                warn!(
                    "Hallucination flagged: {:?}",
                    state.hallucination_check.reasons
                );
                state.retry_count += 1;
                if state.retry_count <= self.max_retries {
                    continue;
                }
            }
            break;
        }

        // finalize: the answer passes through unchanged; a residual flag is
        // surfaced to the caller rather than swallowed.
        let low_confidence = state.hallucination_check.is_hallucination;
        info!(
            "RAG finalized after {} retries (low_confidence: {})",
            state.retry_count, low_confidence
        );
        Ok(RagAnswer {
            text: state.answer,
            sources: state.sources.iter().cloned().collect(),
            low_confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::rerank::LexicalReranker;
    use crate::rag::types::ChunkMetadata;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn chunk(text: &str, source: &str, page: u32) -> Chunk {
        Chunk {
            text: text.to_string(),
            metadata: ChunkMetadata {
                source: source.to_string(),
                page,
            },
            distance: 0.5,
            score: 1.0,
        }
    }

    #[test]
    fn intent_rules_are_ordered_first_match_wins() {
        assert_eq!(detect_policy_intent("How to apply for leave?"), PolicyIntent::Procedure);
        assert_eq!(detect_policy_intent("Can I work remotely?"), PolicyIntent::Permission);
        assert_eq!(
            detect_policy_intent("What is the penalty for violations?"),
            PolicyIntent::Penalty
        );
        assert_eq!(detect_policy_intent("What is probation?"), PolicyIntent::Definition);
        assert_eq!(detect_policy_intent("tell me about leave"), PolicyIntent::General);
    }

    #[test]
    fn every_chunk_lands_in_general() {
        let chunks = vec![
            chunk("Employees must submit forms", "hr.pdf", 1),
            chunk("Smoking is prohibited", "hr.pdf", 2),
        ];
        let categories = categorize_chunks(&chunks);
        assert_eq!(categories.general.len(), 2);
        assert_eq!(categories.mandatory.len(), 1);
        assert_eq!(categories.restriction.len(), 1);
    }

    #[test]
    fn chunk_can_land_in_multiple_buckets() {
        let chunks = vec![chunk(
            "Violations must be reported; disciplinary action follows",
            "hr.pdf",
            3,
        )];
        let categories = categorize_chunks(&chunks);
        assert_eq!(categories.mandatory.len(), 1);
        assert_eq!(categories.penalty.len(), 1);
        assert_eq!(categories.general.len(), 1);
    }

    #[test]
    fn penalty_intent_selects_penalty_chunks() {
        let mut state = RagState::new("What is the penalty for late arrival?");
        state.intent = Some(PolicyIntent::Penalty);
        state.reranked = (0..6)
            .map(|i| chunk(&format!("penalty clause {}", i), "hr.pdf", i))
            .collect();
        state.categories = categorize_chunks(&state.reranked);

        let (context, sources) = build_context(&state);
        // 3 penalty chunks + up to 2 mandatory (none here).
        assert_eq!(context.matches("penalty clause").count(), 3);
        assert!(!sources.is_empty());
    }

    #[test]
    fn context_carries_citations() {
        let mut state = RagState::new("leave rules");
        state.intent = Some(PolicyIntent::General);
        state.reranked = vec![chunk("Leave accrues monthly", "leave.pdf", 4)];
        state.categories = categorize_chunks(&state.reranked);

        let (context, sources) = build_context(&state);
        assert!(context.contains("[leave.pdf, Page 4]"));
        assert_eq!(sources, vec!["leave.pdf (Page 4)".to_string()]);
    }

    struct FlatEmbedder;

    #[async_trait]
    impl crate::llm::Embedder for FlatEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0, 0.0])
        }
    }

    struct CountingLlm {
        calls: AtomicUsize,
        reply: &'static str,
    }

    impl CountingLlm {
        fn new(reply: &'static str) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                reply,
            })
        }
    }

    #[async_trait]
    impl TextGenerator for CountingLlm {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.to_string())
        }
    }

    fn pipeline_with(
        generator: Arc<CountingLlm>,
        store: DocumentStore,
    ) -> RagPipeline {
        RagPipeline::new(
            &AssistantConfig::default(),
            Arc::new(FlatEmbedder),
            Arc::new(LexicalReranker),
            generator,
            None,
            Arc::new(RwLock::new(store)),
        )
    }

    fn indexed_store() -> DocumentStore {
        let mut store = DocumentStore::new(2);
        store
            .add(
                vec![1.0, 0.0],
                "Employees are allowed twelve sick leave days per year.".to_string(),
                ChunkMetadata {
                    source: "hr_policy.pdf".to_string(),
                    page: 4,
                },
            )
            .unwrap();
        store
    }

    #[tokio::test]
    async fn unsupported_answer_retries_a_bounded_number_of_times() {
        // Zero overlap with the indexed chunk, so every generation is
        // flagged and the retry loop runs to its cap.
        let generator = CountingLlm::new("xyzzy quux plugh");
        let pipeline = pipeline_with(Arc::clone(&generator), indexed_store());

        let answer = pipeline.run("how many sick leave days do employees get").await.unwrap();

        let max_retries = AssistantConfig::default().max_retries as usize;
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1 + max_retries);
        assert!(answer.low_confidence);
        assert_eq!(answer.text, "xyzzy quux plugh");
    }

    #[tokio::test]
    async fn supported_answer_finalizes_on_the_first_generation() {
        let generator = CountingLlm::new("twelve sick leave days per year");
        let pipeline = pipeline_with(Arc::clone(&generator), indexed_store());

        let answer = pipeline.run("how many sick leave days do employees get").await.unwrap();

        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
        assert!(!answer.low_confidence);
    }

    #[tokio::test]
    async fn empty_index_finalizes_with_the_sentinel_without_generating() {
        let generator = CountingLlm::new("anything");
        let pipeline = pipeline_with(Arc::clone(&generator), DocumentStore::new(2));

        let answer = pipeline.run("what is the parking policy").await.unwrap();

        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
        assert_eq!(answer.text, NOT_FOUND_ANSWER);
        assert!(!answer.low_confidence);
        assert!(answer.sources.is_empty());
    }
}
