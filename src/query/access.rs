//! Row-level access control: rewrite a generated query to the caller's
//! authorized scope.
//!
//! Ordered rules, first match wins. Scoping is idempotent: running the
//! rewrite on its own output changes nothing, because an injected identity
//! filter satisfies the existing-filter rule on the second pass.

use crate::error::{AssistantError, Result};
use crate::query::repair::reject_destructive;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    Employee,
}

impl Role {
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "manager" => Ok(Self::Manager),
            "employee" => Ok(Self::Employee),
            other => Err(AssistantError::Unauthorized(format!("unknown role: {}", other))),
        }
    }
}

/// Caller identity, supplied by the host's authentication layer and
/// trusted as given.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserContext {
    pub role: Role,
    pub employee_id: Option<u64>,
}

impl UserContext {
    pub fn new(role: Role, employee_id: Option<u64>) -> Self {
        Self { role, employee_id }
    }
}

lazy_static! {
    static ref AGGREGATE: Regex =
        Regex::new(r"(?i)\b(count|max|min|avg|sum)\s*\(").unwrap();
    static ref RANKING: Regex = Regex::new(r"(?i)\border\s+by\b.*\blimit\b").unwrap();
    static ref IDENTITY_FILTER: Regex =
        Regex::new(r"(?i)\bemployeeid\s*=\s*\d+").unwrap();
    static ref IDENTITY_COLUMN: Regex =
        Regex::new(r"(?i)\b(employeeid|employeename)\b").unwrap();
    static ref TRAILING_CLAUSE: Regex =
        Regex::new(r"(?i)\b(order\s+by|limit)\b").unwrap();
    static ref HAS_WHERE: Regex = Regex::new(r"(?i)\bwhere\b").unwrap();
}

/// Rewrite `sql` to the caller's scope.
///
/// A policy-constrained statement already carries its authorized scope, so
/// it passes through byte-for-byte unchanged. Aggregates and rankings are
/// global analytics and stay unscoped for every role. Only a personal
/// single-employee lookup with no existing scope gets an identity filter
/// injected, and non-admin roles are restricted to their own row.
pub fn apply_access_control(
    sql: &str,
    user: &UserContext,
    has_policy_constraint: bool,
) -> Result<String> {
    reject_destructive(sql)?;

    if has_policy_constraint {
        return Ok(sql.to_string());
    }
    if user.role == Role::Admin {
        return Ok(sql.to_string());
    }
    if AGGREGATE.is_match(sql) || RANKING.is_match(sql) {
        return Ok(sql.to_string());
    }
    if IDENTITY_FILTER.is_match(sql) {
        return Ok(sql.to_string());
    }
    if !IDENTITY_COLUMN.is_match(sql) {
        // No identity columns referenced; there is no scope to justify.
        return Ok(sql.to_string());
    }

    let employee_id = user.employee_id.ok_or_else(|| {
        AssistantError::Unauthorized("user context has no employee id".to_string())
    })?;

    Ok(inject_identity_filter(sql, employee_id))
}

/// Append `employeeid = {id}`, splicing before any trailing ORDER BY/LIMIT
/// clause and reusing an existing WHERE with AND.
fn inject_identity_filter(sql: &str, employee_id: u64) -> String {
    let (head, tail) = match TRAILING_CLAUSE.find(sql) {
        Some(m) => (sql[..m.start()].trim_end(), &sql[m.start()..]),
        None => (sql.trim_end(), ""),
    };
    let keyword = if HAS_WHERE.is_match(head) { "AND" } else { "WHERE" };
    let condition = format!("{} {} employeeid = {}", head, keyword, employee_id);
    if tail.is_empty() {
        condition
    } else {
        format!("{} {}", condition, tail)
    }
}
