//! End-to-end routing scenarios with scripted collaborators.
//!
//! The fakes stand in for the embedding, reranking, and generation
//! services; everything else is the real orchestration stack.

use async_trait::async_trait;
use hr_compliance::llm::{Embedder, Reranker, TextGenerator};
use hr_compliance::memory::SqliteMemoryStore;
use hr_compliance::rag::index::DocumentStore;
use hr_compliance::rag::rerank::LexicalReranker;
use hr_compliance::rag::types::ChunkMetadata;
use hr_compliance::{
    AssistantConfig, AssistantError, Collaborators, ComplianceAssistant, Result, Role,
    SessionContext, TabularStore, UserContext,
};
use polars::prelude::*;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, RwLock};

const EMBED_DIM: usize = 16;

/// Deterministic bag-of-words embedding; similar texts land close together.
struct HashEmbedder;

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0.0f32; EMBED_DIM];
        for token in text.to_lowercase().split_whitespace() {
            let mut h = DefaultHasher::new();
            token.hash(&mut h);
            v[(h.finish() as usize) % EMBED_DIM] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }
        Ok(v)
    }
}

/// Scripted generator covering every prompt the core can send.
struct ScriptedLlm;

impl ScriptedLlm {
    fn sql_for(prompt: &str) -> String {
        if let Some(rest) = prompt.split("MUST contain exactly: ").nth(1) {
            let condition = rest.lines().next().unwrap_or("").trim();
            return format!("SELECT COUNT(*) FROM employee WHERE {}", condition);
        }
        if prompt.to_lowercase().contains("salary") {
            return "SELECT salary, employeename FROM employee".to_string();
        }
        "SELECT COUNT(*) FROM employee".to_string()
    }

    fn rows_from(prompt: &str) -> String {
        prompt
            .split("Rows:\n")
            .nth(1)
            .and_then(|rest| rest.split("\n\nDescription:").next())
            .unwrap_or("")
            .to_string()
    }
}

#[async_trait]
impl TextGenerator for ScriptedLlm {
    async fn generate(&self, prompt: &str) -> Result<String> {
        if prompt.contains("intent classifier") {
            return Ok("sql".to_string());
        }
        if prompt.contains("SQL-only generator") {
            return Ok(Self::sql_for(prompt));
        }
        if prompt.contains("Describe the following query result") {
            return Ok(Self::rows_from(prompt));
        }
        // Policy answer drawn from the indexed chunks so the hallucination
        // check sees real overlap.
        Ok("The policy allows a maximum of 12 sick leave days per year.".to_string())
    }
}

/// Generator whose backend is down; every call errors.
struct FailingLlm;

#[async_trait]
impl TextGenerator for FailingLlm {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        Err(AssistantError::Collaborator(
            "generation backend unreachable".to_string(),
        ))
    }
}

async fn policy_index() -> Arc<RwLock<DocumentStore>> {
    let embedder = HashEmbedder;
    let chunks = [
        (
            "Employees are allowed a maximum of 12 sick leave days per year.",
            4u32,
        ),
        ("Unused sick leave does not carry over to the next year.", 5),
        ("Smoking is prohibited inside the office premises.", 9),
    ];
    let mut store = DocumentStore::new(EMBED_DIM);
    for (text, page) in chunks {
        let embedding = embedder.embed(text).await.unwrap();
        store
            .add(
                embedding,
                text.to_string(),
                ChunkMetadata {
                    source: "hr_policy.pdf".to_string(),
                    page,
                },
            )
            .unwrap();
    }
    Arc::new(RwLock::new(store))
}

fn employee_table() -> Arc<TabularStore> {
    let store = TabularStore::new();
    let df = df!(
        "EmployeeID" => &[2001i64, 2002, 2003],
        "Employee Name" => &["Asha Rao", "Vikram Mehta", "Divya Nair"],
        "SickLeavesLastYear" => &[4i64, 9, 14],
        "Salary" => &[52000i64, 61000, 58000],
    )
    .unwrap();
    store.register("employee", df).unwrap();
    Arc::new(store)
}

async fn setup() -> (ComplianceAssistant, SessionContext) {
    let config = AssistantConfig::default();
    let collaborators = Collaborators {
        rag_generator: Arc::new(ScriptedLlm),
        sql_generator: Arc::new(ScriptedLlm),
        embedder: Arc::new(HashEmbedder),
        reranker: Arc::new(LexicalReranker),
        hallucination_scorer: None,
    };
    let assistant = ComplianceAssistant::new(
        &config,
        collaborators,
        policy_index().await,
        employee_table(),
    );
    let session = SessionContext::new(
        &config,
        Arc::new(SqliteMemoryStore::open_in_memory().unwrap()),
    );
    (assistant, session)
}

fn employee_user(id: u64) -> UserContext {
    UserContext::new(Role::Employee, Some(id))
}

#[tokio::test]
async fn greeting_bypasses_both_pipelines() {
    let (assistant, mut session) = setup().await;
    let answer = assistant.ask(&mut session, "hello", None).await;
    assert!(answer.starts_with("Hello!"));
}

#[tokio::test]
async fn policy_question_is_answered_from_documents() {
    let (assistant, mut session) = setup().await;
    let answer = assistant
        .ask(&mut session, "What is the sick leave policy?", None)
        .await;
    assert!(answer.contains("Policy Answer:"));
    assert!(answer.contains("maximum of 12"));
    assert!(!answer.contains("Data Answer:"));
}

#[tokio::test]
async fn exceeded_limit_threads_policy_value_into_the_data_query() {
    let (assistant, mut session) = setup().await;
    let answer = assistant
        .ask(
            &mut session,
            "How many employees exceeded the allowed sick leave limit as per policy?",
            Some(&employee_user(2001)),
        )
        .await;
    // Limit 12 extracted from the policy answer; only one employee is above.
    assert!(answer.contains("Policy Answer:"));
    assert!(answer.contains("Analytical Result:"));
    assert!(answer.contains("There are 1 matching records."));
}

#[tokio::test]
async fn remaining_leaves_show_both_operands() {
    let (assistant, mut session) = setup().await;
    let answer = assistant
        .ask(
            &mut session,
            "How many sick leaves are left for employee id 2002?",
            Some(&employee_user(2002)),
        )
        .await;
    assert!(answer.contains("Vikram Mehta"));
    assert!(answer.contains("policy limit 12 minus 9 used"));
    assert!(answer.contains("3 sick leave days remaining"));
}

#[tokio::test]
async fn personal_lookup_is_scoped_to_the_caller() {
    let (assistant, mut session) = setup().await;
    let answer = assistant
        .ask(&mut session, "What is my salary?", Some(&employee_user(2002)))
        .await;
    assert!(answer.contains("Vikram Mehta"));
    assert!(!answer.contains("Asha Rao"));
    assert!(!answer.contains("Divya Nair"));
}

#[tokio::test]
async fn data_question_without_user_context_is_denied() {
    let (assistant, mut session) = setup().await;
    let answer = assistant
        .ask(&mut session, "What is my salary?", None)
        .await;
    assert_eq!(answer, "You are not authorized to access employee data.");
}

#[tokio::test]
async fn underspecified_question_asks_for_clarification() {
    let (assistant, mut session) = setup().await;
    let answer = assistant
        .ask(&mut session, "what is the salary?", Some(&employee_user(2001)))
        .await;
    assert!(answer.contains("specify which employee"));
}

#[tokio::test]
async fn pronoun_inherits_the_active_entity_across_turns() {
    let (assistant, mut session) = setup().await;
    assistant
        .ask(
            &mut session,
            "How many sick leaves are left for employee id 2002?",
            Some(&employee_user(2002)),
        )
        .await;
    // "her" now resolves to employee id 2002.
    let answer = assistant
        .ask(
            &mut session,
            "How many sick leaves are left for her?",
            Some(&employee_user(2002)),
        )
        .await;
    assert!(answer.contains("Vikram Mehta"));
}

#[tokio::test]
async fn collaborator_failure_becomes_the_generic_message() {
    let config = AssistantConfig::default();
    let collaborators = Collaborators {
        rag_generator: Arc::new(FailingLlm),
        sql_generator: Arc::new(FailingLlm),
        embedder: Arc::new(HashEmbedder),
        reranker: Arc::new(LexicalReranker),
        hallucination_scorer: None,
    };
    let assistant = ComplianceAssistant::new(
        &config,
        collaborators,
        policy_index().await,
        employee_table(),
    );
    let mut session = SessionContext::new(
        &config,
        Arc::new(SqliteMemoryStore::open_in_memory().unwrap()),
    );

    let answer = assistant
        .ask(&mut session, "What is the sick leave policy?", None)
        .await;
    assert_eq!(
        answer,
        "Sorry, something went wrong while answering your question. Please try again."
    );
}

#[tokio::test]
async fn stored_turn_is_found_by_substring_in_file_backed_memory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chat_memory.db");
    let store = SqliteMemoryStore::open(path.to_str().unwrap()).unwrap();

    use hr_compliance::memory::{MemoryEntry, MemoryStore};
    store
        .put(&MemoryEntry::new(
            "what is the sick leave policy",
            "12 days per year",
        ))
        .unwrap();
    let hits = store.search("sick leave", 3).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].1, "12 days per year");
}
