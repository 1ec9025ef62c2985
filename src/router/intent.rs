//! Intent classification: which pipelines does this question need?
//!
//! Deterministic keyword layers run first and short-circuit; only genuinely
//! ambiguous questions fall through to the external classifier, which is
//! constrained to a four-label vocabulary.

use crate::error::Result;
use crate::llm::TextGenerator;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Intent {
    Greet,
    Rag,
    Sql,
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Intent::Greet => write!(f, "greet"),
            Intent::Rag => write!(f, "rag"),
            Intent::Sql => write!(f, "sql"),
        }
    }
}

pub type IntentSet = BTreeSet<Intent>;

const GREETINGS: &[&str] = &["hi", "hello", "good morning", "hey"];

/// Strong analytic triggers decided without any lookup.
const STRONG_SQL_TRIGGERS: &[&str] = &["count", "average", "total employees"];

/// Policy vocabulary forces the document pipeline.
const POLICY_KEYWORDS: &[&str] = &[
    "policy",
    "posh",
    "dress code",
    "leave policy",
    "procedure",
    "procedures",
    "compliance",
    "rules",
    "regulations",
    "guidelines",
    "harassment",
    "maternity",
    "privilege leave",
    "casual leave",
    "sick leave policy",
    "annual leave",
    "probation",
    "termination",
    "resignation",
    "notice period",
    "code of conduct",
    "ethics",
    "prevention",
    "workplace",
];

/// Pure ranking asks are analytics, no policy lookup needed.
const RANKING_KEYWORDS: &[&str] = &[
    "highest", "lowest", "most", "least", "top", "bottom", "maximum", "minimum", "best", "worst",
    "greatest", "smallest",
];

const AGGREGATE_KEYWORDS: &[&str] = &[
    "how many",
    "total number",
    "count of",
    "total employees",
    "number of employees",
    "all employees",
    "total",
    "sum of",
    "average",
    "exceeded",
];

const REMAINING_KEYWORDS: &[&str] = &["left", "remaining", "available", "balance"];
const LEAVE_KEYWORDS: &[&str] = &["leave", "leaves", "sick", "casual", "privilege"];

const EMPLOYEE_DATA_ATTRIBUTES: &[&str] = &[
    "salary",
    "monthly salary",
    "annual salary",
    "joining date",
    "date of joining",
    "work hours",
    "overtime",
    "overtime hours",
    "employee id",
    "employeeid",
    "employee name",
    "employeename",
    "manager",
    "manager code",
    "years at company",
    "years in role",
    "years in current role",
    "leave balance",
    "sick leaves",
    "sick leave",
    "performance rating",
    "compliance risk",
];

const ENTITY_REFERENCE_MARKERS: &[&str] = &["employee id", "id is", "whose id", "with id"];

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Exact-match greeting and strong analytic triggers; `None` means unknown.
pub fn rule_based_intent(question: &str) -> Option<IntentSet> {
    let q = question.trim().to_lowercase();

    if GREETINGS.contains(&q.as_str()) {
        return Some(IntentSet::from([Intent::Greet]));
    }

    if contains_any(&q, STRONG_SQL_TRIGGERS) {
        return Some(IntentSet::from([Intent::Sql]));
    }

    None
}

/// Keyword-priority layer applied before the classifier fallback.
/// Each rule short-circuits; rule order is authoritative.
pub fn keyword_priority_intent(question: &str) -> Option<IntentSet> {
    let q = question.to_lowercase();

    // Policy vocabulary wins over everything else.
    if contains_any(&q, POLICY_KEYWORDS) {
        return Some(IntentSet::from([Intent::Rag]));
    }

    if contains_any(&q, RANKING_KEYWORDS) {
        return Some(IntentSet::from([Intent::Sql]));
    }

    // Remaining/left balance questions route to SQL here; the dependency
    // detector later recognizes them as cross-pipeline.
    if contains_any(&q, REMAINING_KEYWORDS) && contains_any(&q, LEAVE_KEYWORDS) {
        return Some(IntentSet::from([Intent::Sql]));
    }

    if contains_any(&q, AGGREGATE_KEYWORDS) {
        if q.contains("policy") || q.contains("according to") || q.contains("as per") {
            return Some(IntentSet::from([Intent::Rag, Intent::Sql]));
        }
        return Some(IntentSet::from([Intent::Sql]));
    }

    // Specific employee attribute plus an explicit entity reference.
    if contains_any(&q, EMPLOYEE_DATA_ATTRIBUTES) && contains_any(&q, ENTITY_REFERENCE_MARKERS) {
        return Some(IntentSet::from([Intent::Sql]));
    }

    None
}

fn classifier_prompt(question: &str) -> String {
    format!(
        r#"You are an HR compliance intent classifier.

Classify the user question into one intent:
- greet: greetings like hi/hello
- rag: HR policy/compliance/company rules questions
- sql: employee dataset/analytics/count/salary questions
- both: if both rag and sql are needed

Examples:
"What is posh policy?" -> rag
"What is Priya's salary?" -> sql
"How many employees?" -> sql
"How many exceeded as per policy?" -> both

Return ONLY one label: greet, rag, sql or both.

Question: {}
Label:"#,
        question
    )
}

/// Classifier with rules first and an external fallback.
pub struct IntentClassifier {
    generator: Arc<dyn TextGenerator>,
}

impl IntentClassifier {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    pub async fn classify(&self, question: &str) -> Result<IntentSet> {
        if let Some(intents) = rule_based_intent(question) {
            info!("Intent decided by rules: {:?}", intents);
            return Ok(intents);
        }

        if let Some(intents) = keyword_priority_intent(question) {
            info!("Intent decided by keyword priority: {:?}", intents);
            return Ok(intents);
        }

        let label = self
            .generator
            .generate(&classifier_prompt(question))
            .await?
            .trim()
            .to_lowercase();
        debug!("Classifier label: {}", label);

        let intents = match label.as_str() {
            "greet" => IntentSet::from([Intent::Greet]),
            "rag" => IntentSet::from([Intent::Rag]),
            "sql" => IntentSet::from([Intent::Sql]),
            "both" => IntentSet::from([Intent::Rag, Intent::Sql]),
            // Out-of-vocabulary labels default to the data pipeline.
            _ => IntentSet::from([Intent::Sql]),
        };
        info!("Intent decided by classifier: {:?}", intents);
        Ok(intents)
    }
}
