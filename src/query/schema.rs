//! Known tables and their columns, plus the in-process tabular store that
//! executes read-only SQL against registered frames.

use crate::error::{AssistantError, Result};
use polars::prelude::*;
use polars::sql::SQLContext;
use std::collections::BTreeMap;
use std::sync::Mutex;
use tracing::info;

/// Lowercase, spaces to underscores. Applied to every registered column so
/// generated SQL never has to quote identifiers.
pub fn normalize_column(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

/// Snapshot of the registered tables, used to build generation prompts and
/// to validate constraint columns.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    tables: BTreeMap<String, Vec<String>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_table(&mut self, name: &str, columns: Vec<String>) {
        self.tables.insert(name.to_lowercase(), columns);
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(&name.to_lowercase())
    }

    pub fn has_column(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.tables.values().any(|cols| cols.iter().any(|c| c == &name))
    }

    pub fn all_columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = self
            .tables
            .values()
            .flat_map(|cols| cols.iter().cloned())
            .collect();
        columns.sort();
        columns.dedup();
        columns
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Schema block embedded verbatim in the SQL generation prompt.
    pub fn schema_text(&self) -> String {
        let mut out = String::new();
        for (table, columns) in &self.tables {
            out.push_str(&format!("\nTable: {}\nColumns: {}\n", table, columns.join(", ")));
        }
        out
    }
}

/// Registered dataset tables behind a SQL interface. Concurrent readers are
/// serialized through the mutex; last-write-wins on re-registration.
pub struct TabularStore {
    ctx: Mutex<SQLContext>,
    registry: Mutex<SchemaRegistry>,
}

impl TabularStore {
    pub fn new() -> Self {
        Self {
            ctx: Mutex::new(SQLContext::new()),
            registry: Mutex::new(SchemaRegistry::new()),
        }
    }

    /// Register a named table. Column names are normalized before
    /// registration; the schema registry is updated to match.
    pub fn register(&self, name: &str, df: DataFrame) -> Result<()> {
        let name = name.to_lowercase();
        let mut df = df;
        let normalized: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|c| normalize_column(c))
            .collect();
        df.set_column_names(&normalized)?;

        info!("Registered table: {} ({} rows)", name, df.height());

        let mut registry = self
            .registry
            .lock()
            .map_err(|_| AssistantError::Execution("schema registry lock poisoned".to_string()))?;
        registry.add_table(&name, normalized);

        let mut ctx = self
            .ctx
            .lock()
            .map_err(|_| AssistantError::Execution("sql context lock poisoned".to_string()))?;
        ctx.register(&name, df.lazy());
        Ok(())
    }

    /// Register a table from a CSV file; the table name is the file stem.
    pub fn register_csv(&self, path: &std::path::Path) -> Result<()> {
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| AssistantError::Schema(format!("bad dataset path: {}", path.display())))?
            .to_lowercase();
        let df = LazyCsvReader::new(path)
            .with_try_parse_dates(true)
            .with_infer_schema_length(Some(1000))
            .finish()?
            .collect()?;
        self.register(&name, df)
    }

    /// Execute a read-only statement and collect the result.
    pub fn execute(&self, sql: &str) -> Result<DataFrame> {
        let mut ctx = self
            .ctx
            .lock()
            .map_err(|_| AssistantError::Execution("sql context lock poisoned".to_string()))?;
        let df = ctx.execute(sql)?.collect()?;
        Ok(df)
    }

    pub fn registry(&self) -> Result<SchemaRegistry> {
        let registry = self
            .registry
            .lock()
            .map_err(|_| AssistantError::Execution("schema registry lock poisoned".to_string()))?;
        Ok(registry.clone())
    }
}

impl Default for TabularStore {
    fn default() -> Self {
        Self::new()
    }
}
