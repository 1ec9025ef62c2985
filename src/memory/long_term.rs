//! Durable memory log: an append/replace keyed store over SQLite,
//! searchable by substring, newest first.

use crate::error::{AssistantError, Result};
use crate::memory::short_term::MemoryEntry;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;

/// Narrow contract the orchestration layer depends on; the SQLite
/// implementation below is the production one, tests may substitute.
pub trait MemoryStore: Send + Sync {
    fn put(&self, entry: &MemoryEntry) -> Result<()>;
    /// Up to `limit` most-recent (question, answer) pairs whose question
    /// contains `needle`.
    fn search(&self, needle: &str, limit: usize) -> Result<Vec<(String, String)>>;
}

pub struct SqliteMemoryStore {
    conn: Mutex<Connection>,
}

impl SqliteMemoryStore {
    pub fn open(path: &str) -> Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS memory (
                id TEXT PRIMARY KEY,
                question TEXT,
                answer TEXT
            )",
            [],
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl MemoryStore for SqliteMemoryStore {
    fn put(&self, entry: &MemoryEntry) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| AssistantError::Memory("connection lock poisoned".to_string()))?;
        conn.execute(
            "INSERT OR REPLACE INTO memory VALUES (?1, ?2, ?3)",
            params![entry.id, entry.question, entry.answer],
        )?;
        Ok(())
    }

    fn search(&self, needle: &str, limit: usize) -> Result<Vec<(String, String)>> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| AssistantError::Memory("connection lock poisoned".to_string()))?;
        let mut stmt = conn.prepare(
            "SELECT question, answer FROM memory
             WHERE question LIKE ?1
             ORDER BY rowid DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![format!("%{}%", needle), limit as i64], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }
}
