//! Conversation memory.

pub mod long_term;
pub mod manager;
pub mod short_term;

pub use long_term::{MemoryStore, SqliteMemoryStore};
pub use manager::MemoryManager;
pub use short_term::{MemoryEntry, ShortTermMemory};
