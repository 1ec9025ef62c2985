//! Per-conversation state. Each session owns its active entity and its
//! memory; nothing here is shared across unrelated users.

use crate::config::AssistantConfig;
use crate::error::Result;
use crate::memory::{MemoryManager, MemoryStore, SqliteMemoryStore};
use crate::router::entity::ActiveEntityContext;
use std::sync::Arc;
use uuid::Uuid;

pub struct SessionContext {
    pub id: String,
    pub entity: ActiveEntityContext,
    pub memory: MemoryManager,
}

impl SessionContext {
    pub fn new(config: &AssistantConfig, store: Arc<dyn MemoryStore>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            entity: ActiveEntityContext::default(),
            memory: MemoryManager::new(config.short_term_limit, config.memory_matches, store),
        }
    }

    /// Session backed by the configured SQLite memory path.
    pub fn open(config: &AssistantConfig) -> Result<Self> {
        let store = Arc::new(SqliteMemoryStore::open(&config.memory_db_path)?);
        Ok(Self::new(config, store))
    }
}
