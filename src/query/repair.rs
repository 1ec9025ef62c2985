//! Post-generation SQL repair: strip formatting artifacts, fuzzy-correct
//! table and column name drift against the known schema, and reject
//! destructive statements outright.

use crate::error::{AssistantError, Result};
use crate::query::schema::SchemaRegistry;
use lazy_static::lazy_static;
use regex::Regex;
use strsim::jaro_winkler;
use tracing::info;

lazy_static! {
    static ref IDENTIFIER: Regex = Regex::new(r"\b[A-Za-z_]+\b").unwrap();
    static ref TABLE_POSITION: Regex =
        Regex::new(r"(?i)\b(?:from|join)\s+([A-Za-z_]+)").unwrap();
    static ref DESTRUCTIVE: Regex =
        Regex::new(r"(?i)\b(drop|delete|update|insert|alter|truncate)\b").unwrap();
}

/// SQL keywords that must never be "corrected" into a schema name.
const SQL_KEYWORDS: &[&str] = &[
    "select", "from", "where", "and", "or", "not", "order", "by", "group", "having", "limit",
    "offset", "as", "count", "max", "min", "avg", "sum", "distinct", "asc", "desc", "in", "like",
    "between", "null", "is", "on", "join", "inner", "left", "right",
];

/// Strip markdown fences and backticks the generator tends to emit.
pub fn clean_sql(sql: &str) -> String {
    sql.replace("```sql", "")
        .replace("```", "")
        .replace('`', "")
        .trim()
        .to_string()
}

/// Split generator output into individual statements.
pub fn split_statements(sql: &str) -> Vec<String> {
    sql.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Fail on any destructive verb. Repair never rewrites these away.
pub fn reject_destructive(sql: &str) -> Result<()> {
    if let Some(m) = DESTRUCTIVE.find(sql) {
        return Err(AssistantError::UnsafeSql(format!(
            "destructive verb: {}",
            m.as_str().to_uppercase()
        )));
    }
    Ok(())
}

fn best_match<'a>(token: &str, candidates: impl Iterator<Item = &'a str>) -> Option<(String, f64)> {
    let token = token.to_lowercase();
    let mut best: Option<(String, f64)> = None;
    for candidate in candidates {
        let score = jaro_winkler(&token, candidate);
        if best.as_ref().map_or(true, |(_, s)| score > *s) {
            best = Some((candidate.to_string(), score));
        }
    }
    best
}

fn replace_token(sql: &str, token: &str, replacement: &str) -> String {
    let pattern = format!(r"\b{}\b", regex::escape(token));
    match Regex::new(&pattern) {
        Ok(re) => re.replace_all(sql, replacement).to_string(),
        Err(_) => sql.to_string(),
    }
}

/// Fuzzy-correct near-miss table names, e.g. `employees` into `employee`.
/// Only tokens in table position (after FROM/JOIN) are candidates, and only
/// corrections above `threshold` are accepted, so already-valid tokens are
/// never disturbed.
pub fn fix_table_names(sql: &str, registry: &SchemaRegistry, threshold: f64) -> String {
    let tables = registry.table_names();
    let mut fixed = sql.to_string();

    for caps in TABLE_POSITION.captures_iter(sql) {
        let token = &caps[1];
        let lower = token.to_lowercase();
        if registry.has_table(&lower) || SQL_KEYWORDS.contains(&lower.as_str()) {
            continue;
        }
        if let Some((best, score)) = best_match(token, tables.iter().map(String::as_str)) {
            if score > threshold {
                info!("Fixed table name: {} -> {}", token, best);
                fixed = replace_token(&fixed, token, &best);
            }
        }
    }
    fixed
}

/// Fuzzy-correct near-miss column names across all registered tables. The
/// threshold here is higher than the table one; columns are short and easy
/// to corrupt.
pub fn fix_column_names(sql: &str, registry: &SchemaRegistry, threshold: f64) -> String {
    let columns = registry.all_columns();
    if columns.is_empty() {
        return sql.to_string();
    }
    let mut fixed = sql.to_string();

    for token in IDENTIFIER.find_iter(sql) {
        let token = token.as_str();
        let lower = token.to_lowercase();
        if registry.has_column(&lower)
            || registry.has_table(&lower)
            || SQL_KEYWORDS.contains(&lower.as_str())
        {
            continue;
        }
        if let Some((best, score)) = best_match(token, columns.iter().map(String::as_str)) {
            if score > threshold {
                info!("Fixed column name: {} -> {}", token, best);
                fixed = replace_token(&fixed, token, &best);
            }
        }
    }
    fixed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> SchemaRegistry {
        let mut r = SchemaRegistry::new();
        r.add_table(
            "employee",
            vec![
                "employeeid".into(),
                "employeename".into(),
                "sickleaveslastyear".into(),
                "salary".into(),
            ],
        );
        r
    }

    #[test]
    fn clean_strips_fences_and_backticks() {
        let raw = "```sql\nSELECT * FROM `employee`\n```";
        assert_eq!(clean_sql(raw), "SELECT * FROM employee");
    }

    #[test]
    fn split_drops_empty_fragments() {
        let statements = split_statements("SELECT 1; ; SELECT 2;");
        assert_eq!(statements, vec!["SELECT 1".to_string(), "SELECT 2".to_string()]);
    }

    #[test]
    fn destructive_verbs_are_rejected_not_repaired() {
        assert!(reject_destructive("DELETE FROM employee").is_err());
        assert!(reject_destructive("drop table employee").is_err());
        assert!(reject_destructive("SELECT * FROM employee").is_ok());
    }

    #[test]
    fn near_miss_table_is_corrected() {
        let fixed = fix_table_names("SELECT * FROM employees", &registry(), 0.80);
        assert_eq!(fixed, "SELECT * FROM employee");
    }

    #[test]
    fn valid_tokens_are_left_alone() {
        let sql = "SELECT salary FROM employee WHERE employeeid = 2002";
        assert_eq!(fix_table_names(sql, &registry(), 0.80), sql);
        assert_eq!(fix_column_names(sql, &registry(), 0.90), sql);
    }

    #[test]
    fn near_miss_column_is_corrected() {
        let fixed = fix_column_names(
            "SELECT employename FROM employee",
            &registry(),
            0.90,
        );
        assert_eq!(fixed, "SELECT employeename FROM employee");
    }

    #[test]
    fn unrelated_token_is_not_forced_into_schema() {
        let sql = "SELECT department FROM employee";
        assert_eq!(fix_column_names(sql, &registry(), 0.90), sql);
    }
}
