//! Schema-constrained SQL generation.
//!
//! The prompt embeds the exact registered schema and a fixed rule set:
//! count questions get a bare COUNT(*), single-superlative questions get
//! ORDER BY + LIMIT 1 rather than an aggregate, same-entity conditions are
//! ANDed, and a mandated policy condition is spelled out verbatim. The
//! output is verified downstream; the prompt only stacks the odds.

use crate::error::Result;
use crate::llm::TextGenerator;
use crate::query::constraint::PolicyConstraint;
use crate::query::schema::SchemaRegistry;
use std::sync::Arc;

pub fn sql_prompt(
    question: &str,
    registry: &SchemaRegistry,
    constraint: Option<&PolicyConstraint>,
) -> String {
    let mut rules = String::from(
        "- Output ONLY SQL, no explanation\n\
         - Must start with SELECT\n\
         - Use table and column names exactly as given\n\
         - For \"how many\" questions output SELECT COUNT(*) with no other columns\n\
         - For \"highest\"/\"lowest\"/\"most\" questions about one row, use ORDER BY ... LIMIT 1, not MAX or MIN\n\
         - Multiple conditions about the same person are combined with AND, never OR\n",
    );
    if let Some(constraint) = constraint {
        rules.push_str(&format!(
            "- The WHERE clause MUST contain exactly: {}\n",
            constraint.condition()
        ));
    }

    format!(
        "You are a SQL-only generator.\n\n\
         Available Database Schema:\n{}\n\
         Rules:\n{}\n\
         Question: {}\n\nSQL:",
        registry.schema_text(),
        rules,
        question
    )
}

pub struct SqlGenerator {
    generator: Arc<dyn TextGenerator>,
}

impl SqlGenerator {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Raw generator output for one question; repair and validation happen
    /// downstream.
    pub async fn generate(
        &self,
        question: &str,
        registry: &SchemaRegistry,
        constraint: Option<&PolicyConstraint>,
    ) -> Result<String> {
        let prompt = sql_prompt(question, registry, constraint);
        self.generator.generate(&prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> SchemaRegistry {
        let mut r = SchemaRegistry::new();
        r.add_table(
            "employee",
            vec!["employeeid".into(), "sickleaveslastyear".into()],
        );
        r
    }

    #[test]
    fn prompt_embeds_schema_and_question() {
        let prompt = sql_prompt("How many employees are there?", &registry(), None);
        assert!(prompt.contains("Table: employee"));
        assert!(prompt.contains("How many employees are there?"));
        assert!(!prompt.contains("MUST contain exactly"));
    }

    #[test]
    fn prompt_spells_out_mandated_condition() {
        let r = registry();
        let constraint = PolicyConstraint::new("sickleaveslastyear", ">", 12, &r).unwrap();
        let prompt = sql_prompt("How many exceeded the limit?", &r, Some(&constraint));
        assert!(prompt.contains("MUST contain exactly: sickleaveslastyear > 12"));
    }
}
