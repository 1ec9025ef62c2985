//! Request boundary. Everything below this returns typed errors; here they
//! become user-visible text, because the caller must always have something
//! to render.

use crate::config::AssistantConfig;
use crate::error::{AssistantError, Result};
use crate::llm::{Embedder, Reranker, TextGenerator};
use crate::memory::MemoryManager;
use crate::query::{QueryPipeline, TabularStore, UserContext};
use crate::rag::hallucination::HallucinationScorer;
use crate::rag::index::DocumentStore;
use crate::rag::RagPipeline;
use crate::router::dependency::detect_dependency;
use crate::router::entity::resolve_entity;
use crate::router::executor::HybridExecutor;
use crate::router::intent::IntentClassifier;
use crate::router::planner::split_multi_part_question;
use crate::session::SessionContext;
use std::sync::{Arc, RwLock};
use tracing::{error, info};

const DENIAL_ANSWER: &str = "You are not authorized to access employee data.";
const GENERIC_FAILURE_ANSWER: &str =
    "Sorry, something went wrong while answering your question. Please try again.";

/// External collaborators the assistant is wired with.
pub struct Collaborators {
    pub rag_generator: Arc<dyn TextGenerator>,
    pub sql_generator: Arc<dyn TextGenerator>,
    pub embedder: Arc<dyn Embedder>,
    pub reranker: Arc<dyn Reranker>,
    pub hallucination_scorer: Option<Arc<dyn HallucinationScorer>>,
}

pub struct ComplianceAssistant {
    classifier: IntentClassifier,
    executor: HybridExecutor,
}

impl ComplianceAssistant {
    pub fn new(
        config: &AssistantConfig,
        collaborators: Collaborators,
        document_store: Arc<RwLock<DocumentStore>>,
        tabular_store: Arc<TabularStore>,
    ) -> Self {
        let rag = Arc::new(RagPipeline::new(
            config,
            Arc::clone(&collaborators.embedder),
            Arc::clone(&collaborators.reranker),
            Arc::clone(&collaborators.rag_generator),
            collaborators.hallucination_scorer.clone(),
            document_store,
        ));
        let query = Arc::new(QueryPipeline::new(
            config,
            Arc::clone(&collaborators.sql_generator),
            Arc::clone(&collaborators.rag_generator),
            Arc::clone(&tabular_store),
        ));
        let executor = HybridExecutor::new(
            rag,
            query,
            tabular_store,
            config.policy_value_min,
            config.policy_value_max,
        );
        Self {
            classifier: IntentClassifier::new(collaborators.sql_generator),
            executor,
        }
    }

    /// Answer one question within a session. Never fails: every error
    /// becomes renderable text.
    pub async fn ask(
        &self,
        session: &mut SessionContext,
        question: &str,
        user: Option<&UserContext>,
    ) -> String {
        match self.answer(session, question, user).await {
            Ok(answer) => answer,
            Err(AssistantError::Underspecified(message)) => message,
            Err(AssistantError::Unauthorized(_)) => DENIAL_ANSWER.to_string(),
            Err(e) => {
                error!("Request failed: {}", e);
                GENERIC_FAILURE_ANSWER.to_string()
            }
        }
    }

    async fn answer(
        &self,
        session: &mut SessionContext,
        question: &str,
        user: Option<&UserContext>,
    ) -> Result<String> {
        let (_, sanitized) = resolve_entity(question, &mut session.entity)?;
        let intents = self.classifier.classify(&sanitized).await?;
        info!("Intents: {:?}", intents);

        let sub_questions = split_multi_part_question(&sanitized);
        let mut answers = Vec::with_capacity(sub_questions.len());

        for sub_question in &sub_questions {
            let enriched = enrich_with_memory(&session.memory, sub_question)?;
            let verdict = detect_dependency(sub_question);
            let answer = self
                .executor
                .execute(&enriched, &intents, user, verdict)
                .await?;
            answers.push(answer);
        }

        let final_answer = answers.join("\n\n");
        session.memory.add_chat(question, &final_answer)?;
        Ok(final_answer)
    }
}

/// Wrap the question with the remembered turns that match it, when any exist.
fn enrich_with_memory(memory: &MemoryManager, question: &str) -> Result<String> {
    let turns = memory.recall(question)?;
    if turns.is_empty() {
        return Ok(question.to_string());
    }
    info!("Memory matches found: {}", turns.len());
    let context = turns
        .iter()
        .map(|(q, a)| format!("Q: {}\nA: {}", q, a))
        .collect::<Vec<_>>()
        .join("\n");
    Ok(format!(
        "Previous Memory Context:\n{}\n\nNow answer the new question:\n{}",
        context, question
    ))
}
