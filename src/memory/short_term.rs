//! Bounded recent-turns buffer. Overflow hands the evicted entry back to
//! the caller for durable storage.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub id: String,
    pub question: String,
    pub answer: String,
}

impl MemoryEntry {
    pub fn new(question: &str, answer: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            question: question.to_string(),
            answer: answer.to_string(),
        }
    }
}

pub struct ShortTermMemory {
    limit: usize,
    buffer: VecDeque<MemoryEntry>,
}

impl ShortTermMemory {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            buffer: VecDeque::new(),
        }
    }

    /// Push a turn; returns the evicted oldest entry when the buffer was
    /// already full.
    pub fn add(&mut self, question: &str, answer: &str) -> Option<MemoryEntry> {
        self.buffer.push_back(MemoryEntry::new(question, answer));
        if self.buffer.len() > self.limit {
            self.buffer.pop_front()
        } else {
            None
        }
    }

    /// Newest-first scan for a turn whose question contains `needle`.
    pub fn find(&self, needle: &str) -> Option<&MemoryEntry> {
        let needle = needle.to_lowercase();
        self.buffer
            .iter()
            .rev()
            .find(|entry| entry.question.to_lowercase().contains(&needle))
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
