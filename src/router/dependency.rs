//! Dependency detection: in which order must the pipelines run?
//!
//! Pure function over the question text. The rules live in an ordered table
//! evaluated first-match-wins so every rule can be enumerated and tested on
//! its own.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DependencyVerdict {
    /// Pipelines run independently (or only one runs).
    Independent,
    /// The data pipeline needs a policy value first.
    SqlDependsOnRag,
    /// The document pipeline explains a data result.
    RagDependsOnSql,
}

impl fmt::Display for DependencyVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DependencyVerdict::Independent => write!(f, "independent"),
            DependencyVerdict::SqlDependsOnRag => write!(f, "sql_depends_on_rag"),
            DependencyVerdict::RagDependsOnSql => write!(f, "rag_depends_on_sql"),
        }
    }
}

/// One row of the rule table: the verdict applies when a trigger phrase is
/// present, a companion phrase (if any) is present, and no excluded phrase
/// appears.
struct DependencyRule {
    trigger_any: &'static [&'static str],
    companion_any: Option<&'static [&'static str]>,
    absent_all: Option<&'static [&'static str]>,
    verdict: DependencyVerdict,
}

const POLICY_LOOKUP_TRIGGERS: &[&str] = &[
    "what is the policy",
    "according to the policy",
    "policy says",
    "what is the maximum",
    "what is the allowed",
    "maximum allowed sick leaves",
    "allowed sick leaves",
    "allowed limit",
    "policy limit",
];

const DATA_ACTION_WORDS: &[&str] = &[
    "how many",
    "count",
    "number of",
    "employees",
    "who",
    "list",
    "exceeded",
];

const REMAINING_TRIGGERS: &[&str] = &["left", "remaining", "available", "balance"];

const RESOURCE_TYPES: &[&str] = &[
    "sick leave",
    "casual leave",
    "privilege leave",
    "leave",
    "leaves",
    "days off",
];

const POLICY_APPLICATION_TRIGGERS: &[&str] = &[
    "as per policy",
    "according to policy",
    "based on policy",
    "maximum allowed",
    "allowed limit",
    "policy limit",
    "exceeded allowed",
    "exceeded maximum",
    "more than allowed",
    "above allowed",
];

const ANALYTICS_TRIGGERS: &[&str] = &[
    "how many",
    "count",
    "number of employees",
    "employees exceeded",
    "who exceeded",
    "list employees",
];

const EXPLANATION_TRIGGERS: &[&str] = &[
    "based on employee data",
    "according to dataset",
    "explain this",
    "what does this mean",
    "policy implication",
    "interpret this",
    "is this allowed",
];

/// Ordered rule table; the first matching row decides.
const RULES: &[DependencyRule] = &[
    // Pure policy lookup with no data action stays independent so the
    // intent layer can run RAG alone.
    DependencyRule {
        trigger_any: POLICY_LOOKUP_TRIGGERS,
        companion_any: None,
        absent_all: Some(DATA_ACTION_WORDS),
        verdict: DependencyVerdict::Independent,
    },
    // Remaining/left balance needs the policy limit before arithmetic.
    DependencyRule {
        trigger_any: REMAINING_TRIGGERS,
        companion_any: Some(RESOURCE_TYPES),
        absent_all: None,
        verdict: DependencyVerdict::SqlDependsOnRag,
    },
    // Policy threshold applied to analytics.
    DependencyRule {
        trigger_any: POLICY_APPLICATION_TRIGGERS,
        companion_any: Some(ANALYTICS_TRIGGERS),
        absent_all: None,
        verdict: DependencyVerdict::SqlDependsOnRag,
    },
    // Data result interpreted through policy.
    DependencyRule {
        trigger_any: EXPLANATION_TRIGGERS,
        companion_any: None,
        absent_all: None,
        verdict: DependencyVerdict::RagDependsOnSql,
    },
];

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Decide the execution order for one sub-question. Stateless and
/// deterministic: identical text always yields the identical verdict.
pub fn detect_dependency(question: &str) -> DependencyVerdict {
    let q = question.trim().to_lowercase();

    for rule in RULES {
        if !contains_any(&q, rule.trigger_any) {
            continue;
        }
        if let Some(companion) = rule.companion_any {
            if !contains_any(&q, companion) {
                continue;
            }
        }
        if let Some(absent) = rule.absent_all {
            if contains_any(&q, absent) {
                continue;
            }
        }
        return rule.verdict;
    }

    DependencyVerdict::Independent
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detection_is_pure_and_deterministic() {
        let q = "How many employees exceeded the allowed sick leave limit as per policy?";
        let first = detect_dependency(q);
        for _ in 0..5 {
            assert_eq!(detect_dependency(q), first);
        }
    }

    #[test]
    fn policy_lookup_is_independent() {
        assert_eq!(
            detect_dependency("What is the policy limit for sick leaves?"),
            DependencyVerdict::Independent
        );
    }

    #[test]
    fn policy_lookup_with_data_action_is_not_shortcircuited() {
        // "employees" pushes this out of the pure-lookup rule.
        assert_eq!(
            detect_dependency("policy limit exceeded by how many employees"),
            DependencyVerdict::SqlDependsOnRag
        );
    }

    #[test]
    fn remaining_leave_needs_policy_first() {
        assert_eq!(
            detect_dependency("How many sick leaves are left for employee id 2002?"),
            DependencyVerdict::SqlDependsOnRag
        );
        assert_eq!(
            detect_dependency("remaining casual leaves for Priya Sharma"),
            DependencyVerdict::SqlDependsOnRag
        );
    }

    #[test]
    fn threshold_plus_analytics_needs_policy_first() {
        assert_eq!(
            detect_dependency("How many employees exceeded the maximum allowed sick leaves as per policy?"),
            DependencyVerdict::SqlDependsOnRag
        );
    }

    #[test]
    fn explanation_runs_data_first() {
        assert_eq!(
            detect_dependency("Based on employee data, is this allowed under the policy?"),
            DependencyVerdict::RagDependsOnSql
        );
    }

    #[test]
    fn plain_questions_are_independent() {
        assert_eq!(
            detect_dependency("What is the dress code?"),
            DependencyVerdict::Independent
        );
        assert_eq!(
            detect_dependency("How many employees are in the company?"),
            DependencyVerdict::Independent
        );
    }

    #[test]
    fn first_match_wins_over_later_rules() {
        // Contains both a remaining trigger and an explanation trigger;
        // the remaining rule sits earlier in the table.
        assert_eq!(
            detect_dependency("explain this: how many leaves are left"),
            DependencyVerdict::SqlDependsOnRag
        );
    }
}
