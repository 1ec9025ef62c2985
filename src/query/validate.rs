//! Structural validation: the statement must parse, and it must be a plain
//! query. Anything else is refused before it reaches the store.

use crate::error::{AssistantError, Result};
use sqlparser::ast::Statement;
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

pub fn validate_sql(sql: &str) -> Result<()> {
    let statements = Parser::parse_sql(&GenericDialect {}, sql)
        .map_err(|e| AssistantError::UnsafeSql(format!("parse error: {}", e)))?;

    if statements.is_empty() {
        return Err(AssistantError::UnsafeSql("empty statement".to_string()));
    }
    for statement in &statements {
        match statement {
            Statement::Query(_) => {}
            other => {
                return Err(AssistantError::UnsafeSql(format!(
                    "only SELECT is allowed, got: {}",
                    statement_kind(other)
                )));
            }
        }
    }
    Ok(())
}

fn statement_kind(statement: &Statement) -> &'static str {
    match statement {
        Statement::Insert { .. } => "INSERT",
        Statement::Update { .. } => "UPDATE",
        Statement::Delete { .. } => "DELETE",
        Statement::Drop { .. } => "DROP",
        Statement::AlterTable { .. } => "ALTER",
        Statement::Truncate { .. } => "TRUNCATE",
        _ => "non-query statement",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_passes() {
        assert!(validate_sql("SELECT COUNT(*) FROM employee WHERE salary > 50000").is_ok());
    }

    #[test]
    fn malformed_sql_fails_with_parser_error() {
        let err = validate_sql("SELEC * FRM employee").unwrap_err();
        assert!(matches!(err, AssistantError::UnsafeSql(_)));
    }

    #[test]
    fn non_query_statements_fail() {
        assert!(validate_sql("DELETE FROM employee").is_err());
        assert!(validate_sql("DROP TABLE employee").is_err());
        assert!(validate_sql("UPDATE employee SET salary = 0").is_err());
    }

    #[test]
    fn empty_input_fails() {
        assert!(validate_sql("   ").is_err());
    }
}
