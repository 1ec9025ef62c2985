//! Hybrid execution: run the document pipeline and/or the data pipeline in
//! the order the dependency verdict requires, threading structured policy
//! constraints between them.

use crate::error::{AssistantError, Result};
use crate::query::{PolicyConstraint, QueryPipeline, TabularStore, UserContext};
use crate::rag::RagPipeline;
use crate::router::dependency::DependencyVerdict;
use crate::router::entity::extract_employee_id;
use crate::router::intent::{Intent, IntentSet};
use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;
use tracing::{info, warn};

pub const GREETING_ANSWER: &str =
    "Hello! How can I help you with HR policies or employee data today?";

const LOW_CONFIDENCE_NOTE: &str =
    "(Note: this answer may not be fully supported by the policy documents.)";

/// Column holding recorded leave usage; policy thresholds apply to it.
const LEAVE_USAGE_COLUMN: &str = "sickleaveslastyear";

lazy_static! {
    /// Ordered numeric patterns tried against a policy answer. The first
    /// capture in [min, max] wins.
    static ref NUMERIC_POLICY_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)\bis\s+(\d{1,3})\b").unwrap(),
        Regex::new(r"(?i)\b(\d{1,3})\s+days\b").unwrap(),
        Regex::new(r"(?i)\bmaximum\D{0,40}?(\d{1,3})\b").unwrap(),
        Regex::new(r"(?i)\blimit\D{0,40}?(\d{1,3})\b").unwrap(),
        Regex::new(r"(?i)\ballowed\D{0,40}?(\d{1,3})\b").unwrap(),
        Regex::new(r"(?i)\bup\s+to\s+(\d{1,3})\b").unwrap(),
        Regex::new(r"(?i)\b(\d{1,3})\s+(?:sick\s+)?leaves?\b").unwrap(),
    ];

    static ref REMAINING_WORDS: Regex =
        Regex::new(r"(?i)\b(left|remaining|available|balance)\b").unwrap();
}

/// Scan a free-text policy answer for a numeric limit. Only values in
/// `[min, max]` are accepted; extraction never guesses.
pub fn extract_numeric_policy_value(answer: &str, min: u32, max: u32) -> Option<u32> {
    for pattern in NUMERIC_POLICY_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(answer) {
            if let Ok(value) = caps[1].parse::<u32>() {
                if value >= min && value <= max {
                    return Some(value);
                }
            }
        }
    }
    None
}

/// A remaining/left calculation, as opposed to an exceeded-threshold one.
fn is_remaining_question(question: &str) -> bool {
    let q = question.to_lowercase();
    REMAINING_WORDS.is_match(&q) && !q.contains("exceed")
}

fn leave_type(question: &str) -> &'static str {
    let q = question.to_lowercase();
    if q.contains("casual") {
        "casual leave"
    } else if q.contains("privilege") {
        "privilege leave"
    } else {
        "sick leave"
    }
}

pub struct HybridExecutor {
    rag: Arc<RagPipeline>,
    query: Arc<QueryPipeline>,
    store: Arc<TabularStore>,
    policy_value_min: u32,
    policy_value_max: u32,
}

impl HybridExecutor {
    pub fn new(
        rag: Arc<RagPipeline>,
        query: Arc<QueryPipeline>,
        store: Arc<TabularStore>,
        policy_value_min: u32,
        policy_value_max: u32,
    ) -> Self {
        Self {
            rag,
            query,
            store,
            policy_value_min,
            policy_value_max,
        }
    }

    async fn run_rag(&self, question: &str) -> Result<String> {
        let answer = self.rag.run(question).await?;
        if answer.low_confidence {
            Ok(format!("{}\n{}", answer.text, LOW_CONFIDENCE_NOTE))
        } else {
            Ok(answer.text)
        }
    }

    async fn run_sql(
        &self,
        question: &str,
        user: Option<&UserContext>,
        constraint: Option<&PolicyConstraint>,
    ) -> Result<String> {
        let user = user.ok_or_else(|| {
            AssistantError::Unauthorized("data access requires a user context".to_string())
        })?;
        self.query.run(question, user, constraint).await
    }

    /// Run one sub-question through the required pipelines.
    pub async fn execute(
        &self,
        question: &str,
        intents: &IntentSet,
        user: Option<&UserContext>,
        verdict: DependencyVerdict,
    ) -> Result<String> {
        if intents.contains(&Intent::Greet) {
            return Ok(GREETING_ANSWER.to_string());
        }

        info!("Executing with verdict: {}", verdict);
        match verdict {
            DependencyVerdict::Independent => self.run_independent(question, intents, user).await,
            DependencyVerdict::SqlDependsOnRag => {
                if is_remaining_question(question) {
                    self.run_leave_balance(question).await
                } else {
                    self.run_sql_after_rag(question, user).await
                }
            }
            DependencyVerdict::RagDependsOnSql => self.run_rag_after_sql(question, user).await,
        }
    }

    async fn run_independent(
        &self,
        question: &str,
        intents: &IntentSet,
        user: Option<&UserContext>,
    ) -> Result<String> {
        let mut sections = Vec::new();
        if intents.contains(&Intent::Rag) {
            sections.push(format!("Policy Answer:\n{}", self.run_rag(question).await?));
        }
        if intents.contains(&Intent::Sql) {
            sections.push(format!(
                "Data Answer:\n{}",
                self.run_sql(question, user, None).await?
            ));
        }
        Ok(sections.join("\n\n"))
    }

    /// Policy limit first, then the threshold query with a mandated
    /// constraint. Extraction failure reports the policy text as-is; a
    /// number is never fabricated.
    async fn run_sql_after_rag(
        &self,
        question: &str,
        user: Option<&UserContext>,
    ) -> Result<String> {
        let policy_answer = self.run_rag(question).await?;

        let limit = match extract_numeric_policy_value(
            &policy_answer,
            self.policy_value_min,
            self.policy_value_max,
        ) {
            Some(limit) => limit,
            None => {
                warn!("No numeric policy value found in policy answer");
                return Ok(format!(
                    "Policy Answer:\n{}\n\nCould not extract a numeric policy limit from the policy answer, so the data query was not run.",
                    policy_answer
                ));
            }
        };
        info!("Extracted policy limit: {}", limit);

        let registry = self.store.registry()?;
        let constraint = PolicyConstraint::new(LEAVE_USAGE_COLUMN, ">", limit as i64, &registry)?;
        let data_answer = self.run_sql(question, user, Some(&constraint)).await?;

        Ok(format!(
            "Policy Answer:\n{}\n\nAnalytical Result:\n{}",
            policy_answer, data_answer
        ))
    }

    /// Data result first, then a policy explanation of that result.
    async fn run_rag_after_sql(
        &self,
        question: &str,
        user: Option<&UserContext>,
    ) -> Result<String> {
        let data_answer = self.run_sql(question, user, None).await?;
        let augmented = format!(
            "Employee Data Result:\n{}\n\nNow answer using policy documents:\n{}",
            data_answer, question
        );
        let policy_answer = self.run_rag(&augmented).await?;

        Ok(format!(
            "Data Answer:\n{}\n\nPolicy Explanation:\n{}",
            data_answer, policy_answer
        ))
    }

    /// Remaining-balance calculation: policy limit minus recorded usage,
    /// via a direct lookup rather than generated SQL.
    async fn run_leave_balance(&self, question: &str) -> Result<String> {
        let employee_id = extract_employee_id(question).ok_or_else(|| {
            AssistantError::Underspecified(
                "Please specify the employee id for the balance calculation.".to_string(),
            )
        })?;

        let leave_type = leave_type(question);
        let policy_question = format!(
            "What is the maximum allowed {} days per year according to the HR policy?",
            leave_type
        );
        let policy_answer = self.run_rag(&policy_question).await?;

        let limit = match extract_numeric_policy_value(
            &policy_answer,
            self.policy_value_min,
            self.policy_value_max,
        ) {
            Some(limit) => limit,
            None => {
                return Ok(format!(
                    "Could not determine the {} limit from the policy documents.\n\nPolicy Answer:\n{}",
                    leave_type, policy_answer
                ));
            }
        };

        let sql = format!(
            "SELECT employeename, {} FROM employee WHERE employeeid = {}",
            LEAVE_USAGE_COLUMN, employee_id
        );
        let df = self.store.execute(&sql)?;
        if df.height() == 0 {
            return Ok(format!("Employee with id {} not found.", employee_id));
        }

        let name = df
            .column("employeename")?
            .get(0)?
            .get_str()
            .unwrap_or("")
            .to_string();
        let used: i64 = df
            .column(LEAVE_USAGE_COLUMN)?
            .cast(&polars::prelude::DataType::Int64)?
            .i64()?
            .get(0)
            .ok_or_else(|| AssistantError::Execution("missing usage value".to_string()))?;
        let balance = limit as i64 - used;

        Ok(format!(
            "{} (employee id {}) has {} {} days remaining: policy limit {} minus {} used.",
            name, employee_id, balance, leave_type, limit, used
        ))
    }
}
