//! Result narration. Deterministic templates take precedence; the external
//! narrator only sees result shapes no template covers, and even then it is
//! constrained to the visible rows.

use crate::error::Result;
use crate::llm::TextGenerator;
use chrono::{Datelike, NaiveDate};
use lazy_static::lazy_static;
use polars::prelude::*;
use regex::Regex;
use std::sync::Arc;

pub const NO_DATA_ANSWER: &str = "No data found.";

lazy_static! {
    static ref COUNT_QUERY: Regex = Regex::new(r"(?i)\bcount\s*\(").unwrap();
    static ref MINMAX_QUERY: Regex =
        Regex::new(r"(?i)\b(max|min)\s*\(\s*([A-Za-z_]+)\s*\)").unwrap();
    static ref RANKING_QUERY: Regex = Regex::new(r"(?i)\border\s+by\b.*\blimit\b").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryShape {
    Count,
    MinMax,
    Ranking,
    Other,
}

pub fn classify_query(sql: &str) -> QueryShape {
    if COUNT_QUERY.is_match(sql) {
        QueryShape::Count
    } else if MINMAX_QUERY.is_match(sql) {
        QueryShape::MinMax
    } else if RANKING_QUERY.is_match(sql) {
        QueryShape::Ranking
    } else {
        QueryShape::Other
    }
}

fn ordinal_suffix(day: u32) -> &'static str {
    match day {
        11..=13 => "th",
        _ => match day % 10 {
            1 => "st",
            2 => "nd",
            3 => "rd",
            _ => "th",
        },
    }
}

/// "2024-03-03" rendered as "3rd March 2024".
pub fn ordinal_date(date: NaiveDate) -> String {
    format!(
        "{}{} {}",
        date.day(),
        ordinal_suffix(date.day()),
        date.format("%B %Y")
    )
}

// Days between 0001-01-01 and 1970-01-01; polars dates count from the
// Unix epoch, chrono counts from CE.
const EPOCH_DAYS_FROM_CE: i32 = 719_163;

fn render_value(value: &AnyValue) -> String {
    match value {
        AnyValue::String(s) => s.to_string(),
        AnyValue::StringOwned(s) => s.to_string(),
        AnyValue::Date(days) => NaiveDate::from_num_days_from_ce_opt(EPOCH_DAYS_FROM_CE + days)
            .map(ordinal_date)
            .unwrap_or_else(|| days.to_string()),
        AnyValue::Null => "unknown".to_string(),
        other => format!("{}", other),
    }
}

/// Render every row as "col: val" pairs, one row per line.
pub fn rows_to_text(df: &DataFrame) -> Result<String> {
    let columns = df.get_columns();
    let mut lines = Vec::with_capacity(df.height());
    for row in 0..df.height() {
        let mut pairs = Vec::with_capacity(columns.len());
        for series in columns {
            let value = series.get(row)?;
            pairs.push(format!("{}: {}", series.name(), render_value(&value)));
        }
        lines.push(pairs.join(", "));
    }
    Ok(lines.join("\n"))
}

fn first_cell_as_i64(df: &DataFrame) -> Option<i64> {
    let series = df.get_columns().first()?;
    match series.get(0).ok()? {
        AnyValue::Int64(v) => Some(v),
        AnyValue::Int32(v) => Some(v as i64),
        AnyValue::UInt32(v) => Some(v as i64),
        AnyValue::UInt64(v) => Some(v as i64),
        _ => None,
    }
}

fn narrator_prompt(question: &str, rows: &str) -> String {
    format!(
        "Describe the following query result in one or two plain sentences.\n\
         Use ONLY the rows shown. Do not add totals, guesses, or context.\n\n\
         Question: {}\n\nRows:\n{}\n\nDescription:",
        question, rows
    )
}

/// Narrate one executed statement. Empty results short-circuit; templated
/// shapes never reach the external narrator.
pub async fn narrate(
    sql: &str,
    df: &DataFrame,
    question: &str,
    generator: &Arc<dyn TextGenerator>,
) -> Result<String> {
    if df.height() == 0 {
        return Ok(NO_DATA_ANSWER.to_string());
    }

    match classify_query(sql) {
        QueryShape::Count => {
            if let Some(count) = first_cell_as_i64(df) {
                return Ok(format!("There are {} matching records.", count));
            }
            fallback_narration(df, question, generator).await
        }
        QueryShape::MinMax => {
            if let Some(caps) = MINMAX_QUERY.captures(sql) {
                let which = if caps[1].to_lowercase() == "max" { "maximum" } else { "minimum" };
                let column = caps[2].to_lowercase();
                if let Some(series) = df.get_columns().first() {
                    if let Ok(value) = series.get(0) {
                        return Ok(format!(
                            "The {} {} is {}.",
                            which,
                            column,
                            render_value(&value)
                        ));
                    }
                }
            }
            fallback_narration(df, question, generator).await
        }
        QueryShape::Ranking => {
            let mut lines = Vec::with_capacity(df.height());
            let rows = rows_to_text(df)?;
            for (i, row) in rows.lines().enumerate() {
                lines.push(format!("{}. {}", i + 1, row));
            }
            Ok(lines.join("\n"))
        }
        QueryShape::Other => fallback_narration(df, question, generator).await,
    }
}

async fn fallback_narration(
    df: &DataFrame,
    question: &str,
    generator: &Arc<dyn TextGenerator>,
) -> Result<String> {
    let rows = rows_to_text(df)?;
    let answer = generator.generate(&narrator_prompt(question, &rows)).await?;
    Ok(answer.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AssistantError;
    use async_trait::async_trait;

    struct EchoNarrator;

    #[async_trait]
    impl TextGenerator for EchoNarrator {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            Err(AssistantError::Collaborator(
                "narrator should not be called".to_string(),
            ))
        }
    }

    fn narrator() -> Arc<dyn TextGenerator> {
        Arc::new(EchoNarrator)
    }

    #[test]
    fn query_shapes_classify_in_precedence_order() {
        assert_eq!(classify_query("SELECT COUNT(*) FROM employee"), QueryShape::Count);
        assert_eq!(classify_query("SELECT MAX(salary) FROM employee"), QueryShape::MinMax);
        assert_eq!(
            classify_query("SELECT employeename FROM employee ORDER BY salary DESC LIMIT 1"),
            QueryShape::Ranking
        );
        assert_eq!(classify_query("SELECT salary FROM employee"), QueryShape::Other);
    }

    #[test]
    fn ordinal_dates_read_naturally() {
        assert_eq!(ordinal_date(NaiveDate::from_ymd_opt(2024, 3, 3).unwrap()), "3rd March 2024");
        assert_eq!(ordinal_date(NaiveDate::from_ymd_opt(2024, 3, 11).unwrap()), "11th March 2024");
        assert_eq!(ordinal_date(NaiveDate::from_ymd_opt(2024, 3, 21).unwrap()), "21st March 2024");
    }

    #[tokio::test]
    async fn empty_result_is_no_data() {
        let df = DataFrame::new(vec![Series::new_empty("salary", &DataType::Int64)]).unwrap();
        let out = narrate("SELECT salary FROM employee", &df, "salary?", &narrator())
            .await
            .unwrap();
        assert_eq!(out, NO_DATA_ANSWER);
    }

    #[tokio::test]
    async fn count_result_is_templated() {
        let df = df!("count" => &[3i64]).unwrap();
        let out = narrate("SELECT COUNT(*) FROM employee", &df, "count?", &narrator())
            .await
            .unwrap();
        assert_eq!(out, "There are 3 matching records.");
    }

    #[tokio::test]
    async fn minmax_result_names_column_and_value() {
        let df = df!("max" => &[61000i64]).unwrap();
        let out = narrate(
            "SELECT MAX(salary) FROM employee",
            &df,
            "highest salary?",
            &narrator(),
        )
        .await
        .unwrap();
        assert_eq!(out, "The maximum salary is 61000.");
    }

    #[tokio::test]
    async fn ranking_result_is_listed_row_by_row() {
        let df = df!(
            "employeename" => &["Vikram Mehta"],
            "salary" => &[61000i64],
        )
        .unwrap();
        let out = narrate(
            "SELECT employeename, salary FROM employee ORDER BY salary DESC LIMIT 1",
            &df,
            "highest paid?",
            &narrator(),
        )
        .await
        .unwrap();
        assert_eq!(out, "1. employeename: Vikram Mehta, salary: 61000");
    }
}
