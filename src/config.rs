//! Tuned constants for the routing core and both pipelines.
//!
//! Values carry over from the production deployment; `from_env` lets a host
//! override the collaborator endpoints without recompiling.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AssistantConfig {
    /// Candidates fetched from the vector index per retrieval.
    pub top_k: usize,
    /// Candidates kept after reranking.
    pub final_top_k: usize,
    /// L2 distance cutoff; chunks at or above this are discarded.
    pub similarity_threshold: f32,
    /// Minimum answer/context token overlap before the answer is flagged.
    pub min_token_overlap: f64,
    /// Learned-scorer probability above which the answer is flagged.
    pub hallucination_threshold: f64,
    /// Extra generation attempts after a flagged answer.
    pub max_retries: u32,

    /// Short-term conversation buffer capacity.
    pub short_term_limit: usize,
    /// Durable memory matches returned per search.
    pub memory_matches: usize,
    /// SQLite path for the durable memory log.
    pub memory_db_path: String,

    /// Accepted range for a numeric policy limit (days per year).
    pub policy_value_min: u32,
    pub policy_value_max: u32,

    /// Jaro-Winkler acceptance thresholds for name repair.
    pub table_fix_threshold: f64,
    pub column_fix_threshold: f64,

    /// Ollama endpoint and models.
    pub ollama_url: String,
    pub rag_model: String,
    pub sql_model: String,
    pub embed_model: String,
    /// Upper bound on any single collaborator call.
    pub http_timeout: Duration,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            top_k: 20,
            final_top_k: 5,
            similarity_threshold: 2.5,
            min_token_overlap: 0.15,
            hallucination_threshold: 0.65,
            max_retries: 2,
            short_term_limit: 20,
            memory_matches: 3,
            memory_db_path: "memory/chat_memory.db".to_string(),
            policy_value_min: 1,
            policy_value_max: 365,
            table_fix_threshold: 0.80,
            column_fix_threshold: 0.90,
            ollama_url: "http://localhost:11434".to_string(),
            rag_model: "llama3:latest".to_string(),
            sql_model: "qwen2:7b".to_string(),
            embed_model: "nomic-embed-text".to_string(),
            http_timeout: Duration::from_secs(120),
        }
    }
}

impl AssistantConfig {
    /// Default config with environment overrides for the collaborator endpoints.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("OLLAMA_URL") {
            config.ollama_url = url;
        }
        if let Ok(model) = std::env::var("RAG_MODEL") {
            config.rag_model = model;
        }
        if let Ok(model) = std::env::var("SQL_MODEL") {
            config.sql_model = model;
        }
        if let Ok(path) = std::env::var("MEMORY_DB_PATH") {
            config.memory_db_path = path;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_deployment_tuning() {
        let config = AssistantConfig::default();
        assert_eq!(config.top_k, 20);
        assert_eq!(config.final_top_k, 5);
        assert_eq!(config.max_retries, 2);
        assert!(config.policy_value_min <= config.policy_value_max);
    }
}
