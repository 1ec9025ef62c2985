//! Two-tier conversation memory: recent turns in a bounded buffer, the
//! overflow flushed into the durable store. Retrieval checks the buffer
//! first, then the store.

use crate::error::Result;
use crate::memory::long_term::MemoryStore;
use crate::memory::short_term::ShortTermMemory;
use std::sync::Arc;
use tracing::debug;

pub struct MemoryManager {
    stm: ShortTermMemory,
    store: Arc<dyn MemoryStore>,
    matches: usize,
}

impl MemoryManager {
    pub fn new(limit: usize, matches: usize, store: Arc<dyn MemoryStore>) -> Self {
        Self {
            stm: ShortTermMemory::new(limit),
            store,
            matches,
        }
    }

    /// Record a finished turn. An evicted buffer entry moves to the
    /// durable store.
    pub fn add_chat(&mut self, question: &str, answer: &str) -> Result<()> {
        if let Some(evicted) = self.stm.add(question, answer) {
            debug!("Short-term buffer full, flushing oldest turn to durable store");
            self.store.put(&evicted)?;
        }
        Ok(())
    }

    /// Past turns matching `question`, newest first. A buffer hit wins over
    /// the store; the store contributes up to the configured match count.
    pub fn recall(&self, question: &str) -> Result<Vec<(String, String)>> {
        if let Some(hit) = self.stm.find(question) {
            return Ok(vec![(hit.question.clone(), hit.answer.clone())]);
        }
        self.store.search(question, self.matches)
    }
}
