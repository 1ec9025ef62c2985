//! Structured policy constraints handed from the document pipeline to the
//! data pipeline.
//!
//! A constraint is validated at construction (operator vocabulary, column
//! existence) and later verified against the generated SQL by exact
//! condition matching. A query that does not honor its constraint is
//! refused, never executed unconstrained.

use crate::error::{AssistantError, Result};
use crate::query::schema::SchemaRegistry;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintOp {
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
}

impl ConstraintOp {
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim() {
            ">" => Ok(Self::Gt),
            ">=" => Ok(Self::Ge),
            "<" => Ok(Self::Lt),
            "<=" => Ok(Self::Le),
            "=" => Ok(Self::Eq),
            other => Err(AssistantError::InvalidConstraint(format!(
                "unsupported operator: {}",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Eq => "=",
        }
    }
}

impl fmt::Display for ConstraintOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A verified numeric condition derived from policy text, e.g.
/// `sickleaveslastyear > 12`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConstraint {
    pub column: String,
    pub operator: ConstraintOp,
    pub value: i64,
}

impl PolicyConstraint {
    /// Build a constraint, rejecting unknown columns and operators outside
    /// the allowed vocabulary.
    pub fn new(
        column: &str,
        operator: &str,
        value: i64,
        registry: &SchemaRegistry,
    ) -> Result<Self> {
        let operator = ConstraintOp::parse(operator)?;
        let column = column.to_lowercase();
        if !registry.has_column(&column) {
            return Err(AssistantError::InvalidConstraint(format!(
                "unknown column: {}",
                column
            )));
        }
        Ok(Self {
            column,
            operator,
            value,
        })
    }

    /// The exact WHERE condition the generated SQL must contain.
    pub fn condition(&self) -> String {
        format!("{} {} {}", self.column, self.operator, self.value)
    }

    /// Check that `sql` contains the mandated condition, tolerating
    /// whitespace drift around the operator.
    pub fn is_honored_by(&self, sql: &str) -> bool {
        let pattern = format!(
            r"(?i)\b{}\s*{}\s*{}\b",
            regex::escape(&self.column),
            regex::escape(self.operator.as_str()),
            self.value
        );
        match Regex::new(&pattern) {
            Ok(re) => re.is_match(sql),
            Err(_) => false,
        }
    }
}

impl fmt::Display for PolicyConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.condition())
    }
}
