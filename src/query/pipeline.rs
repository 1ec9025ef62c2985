//! NL to query to execution.
//!
//! Generation, repair, structural validation, constraint verification,
//! access control, execution, and narration are separate stages; a failure
//! in one statement only poisons that statement's result slot.

use crate::config::AssistantConfig;
use crate::error::{AssistantError, Result};
use crate::llm::TextGenerator;
use crate::query::access::{apply_access_control, UserContext};
use crate::query::constraint::PolicyConstraint;
use crate::query::generator::SqlGenerator;
use crate::query::narrate::narrate;
use crate::query::repair::{clean_sql, fix_column_names, fix_table_names, reject_destructive, split_statements};
use crate::query::schema::TabularStore;
use crate::query::validate::validate_sql;
use std::sync::Arc;
use tracing::{debug, info};

pub struct QueryPipeline {
    sql_generator: SqlGenerator,
    narrator: Arc<dyn TextGenerator>,
    store: Arc<TabularStore>,
    table_fix_threshold: f64,
    column_fix_threshold: f64,
}

impl QueryPipeline {
    pub fn new(
        config: &AssistantConfig,
        generator: Arc<dyn TextGenerator>,
        narrator: Arc<dyn TextGenerator>,
        store: Arc<TabularStore>,
    ) -> Self {
        Self {
            sql_generator: SqlGenerator::new(generator),
            narrator,
            store,
            table_fix_threshold: config.table_fix_threshold,
            column_fix_threshold: config.column_fix_threshold,
        }
    }

    /// Translate, repair, authorize, execute, and narrate. Multiple
    /// generated statements run independently; each gets its own labeled
    /// result slot.
    pub async fn run(
        &self,
        question: &str,
        user: &UserContext,
        constraint: Option<&PolicyConstraint>,
    ) -> Result<String> {
        let registry = self.store.registry()?;
        if registry.is_empty() {
            return Err(AssistantError::Schema("no tables registered".to_string()));
        }

        let raw = self.sql_generator.generate(question, &registry, constraint).await?;
        let statements = split_statements(&clean_sql(&raw));
        if statements.is_empty() {
            return Err(AssistantError::Execution("no SQL generated".to_string()));
        }

        let mut sections = Vec::with_capacity(statements.len());
        for (i, statement) in statements.iter().enumerate() {
            let slot = match self.run_statement(statement, question, user, constraint).await {
                Ok(text) => text,
                Err(e) => format!("Error: {}", e),
            };
            if statements.len() > 1 {
                sections.push(format!("Result {}:\n{}", i + 1, slot));
            } else {
                sections.push(slot);
            }
        }
        Ok(sections.join("\n\n"))
    }

    async fn run_statement(
        &self,
        statement: &str,
        question: &str,
        user: &UserContext,
        constraint: Option<&PolicyConstraint>,
    ) -> Result<String> {
        let registry = self.store.registry()?;

        let mut sql = fix_table_names(statement, &registry, self.table_fix_threshold);
        sql = fix_column_names(&sql, &registry, self.column_fix_threshold);
        debug!("SQL after repair: {}", sql);

        reject_destructive(&sql)?;
        validate_sql(&sql)?;

        if let Some(constraint) = constraint {
            if !constraint.is_honored_by(&sql) {
                return Err(AssistantError::InvalidConstraint(format!(
                    "generated query does not contain the mandated condition: {}",
                    constraint.condition()
                )));
            }
        }

        let sql = apply_access_control(&sql, user, constraint.is_some())?;
        info!("Executing: {}", sql);

        let df = self.store.execute(&sql)?;
        narrate(&sql, &df, question, &self.narrator).await
    }
}
